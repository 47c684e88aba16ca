// src/ingest/providers/social_search.rs
use anyhow::{Context, Result};
use async_trait::async_trait;
use serde::Deserialize;
use std::collections::HashMap;

use crate::ingest::extract::first_non_empty;
use crate::ingest::normalize_text;
use crate::ingest::providers::{http_client, parse_timestamp};
use crate::ingest::types::{NormalizedItem, SourceAdapter, SourceKind};

pub const X_SEARCH_ENDPOINT: &str = "https://api.twitter.com/2/tweets/search/recent";
/// The recent-search API rejects anything below 10.
pub const X_MAX_RESULTS: usize = 10;

#[derive(Debug, Deserialize)]
struct SearchResp {
    #[serde(default)]
    data: Vec<Tweet>,
    includes: Option<Includes>,
}

#[derive(Debug, Deserialize)]
struct Tweet {
    id: String,
    #[serde(default)]
    text: String,
    author_id: Option<String>,
    created_at: Option<String>,
}

#[derive(Debug, Deserialize)]
struct Includes {
    #[serde(default)]
    users: Vec<User>,
}

#[derive(Debug, Deserialize)]
struct User {
    id: String,
    username: Option<String>,
}

/// Keyword search over recent posts (retweets excluded).
pub struct SocialSearchAdapter {
    mode: Mode,
}

enum Mode {
    Fixture(String),
    Http {
        client: reqwest::Client,
        bearer: String,
        query: String,
    },
}

pub fn build_query(keywords: &[String]) -> String {
    let terms: Vec<&str> = keywords
        .iter()
        .map(|k| k.trim())
        .filter(|k| !k.is_empty())
        .collect();
    format!("({}) -is:retweet lang:en", terms.join(" OR "))
}

impl SocialSearchAdapter {
    pub fn new(bearer: String, keywords: &[String]) -> Result<Self> {
        Ok(Self {
            mode: Mode::Http {
                client: http_client(10)?,
                bearer,
                query: build_query(keywords),
            },
        })
    }

    pub fn from_fixture(json: &str) -> Self {
        Self {
            mode: Mode::Fixture(json.to_string()),
        }
    }

    pub fn parse_items(json: &str) -> Result<Vec<NormalizedItem>> {
        let resp: SearchResp = serde_json::from_str(json).context("parsing search json")?;
        let users: HashMap<&str, &str> = resp
            .includes
            .as_ref()
            .map(|inc| {
                inc.users
                    .iter()
                    .filter_map(|u| Some((u.id.as_str(), u.username.as_deref()?)))
                    .collect()
            })
            .unwrap_or_default();

        let out = resp
            .data
            .iter()
            .map(|t| {
                let handle = t.author_id.as_deref().and_then(|id| users.get(id).copied());
                let title = format!("Tweet from @{}", handle.unwrap_or("unknown"));
                let url_user = first_non_empty([handle, Some("i")]).unwrap_or_default();
                let url = format!("https://twitter.com/{url_user}/status/{}", t.id);
                NormalizedItem::new(SourceKind::SocialSearch, "Twitter", title, url)
                    .with_body(&normalize_text(&t.text))
                    .published(t.created_at.as_deref().and_then(parse_timestamp))
            })
            .collect();
        Ok(out)
    }
}

#[async_trait]
impl SourceAdapter for SocialSearchAdapter {
    async fn fetch_latest(&self) -> Result<Vec<NormalizedItem>> {
        match &self.mode {
            Mode::Fixture(s) => Self::parse_items(s),
            Mode::Http {
                client,
                bearer,
                query,
            } => {
                let max = X_MAX_RESULTS.to_string();
                let body = client
                    .get(X_SEARCH_ENDPOINT)
                    .bearer_auth(bearer)
                    .query(&[
                        ("query", query.as_str()),
                        ("max_results", max.as_str()),
                        ("tweet.fields", "created_at"),
                        ("expansions", "author_id"),
                        ("user.fields", "username"),
                    ])
                    .send()
                    .await
                    .context("x search http get")?
                    .error_for_status()
                    .context("x search non-2xx")?
                    .text()
                    .await
                    .context("x search http .text()")?;
                Self::parse_items(&body)
            }
        }
    }

    fn name(&self) -> &'static str {
        "twitter"
    }

    fn kind(&self) -> SourceKind {
        SourceKind::SocialSearch
    }

    fn max_items(&self) -> usize {
        X_MAX_RESULTS
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn query_joins_keywords_and_drops_retweets() {
        let q = build_query(&["bitcoin".into(), " ETH ".into(), "".into()]);
        assert_eq!(q, "(bitcoin OR ETH) -is:retweet lang:en");
    }

    #[test]
    fn tweets_resolve_author_handles() {
        let json = r#"{
          "data": [
            {"id": "111", "text": "BTC breaking out", "author_id": "9", "created_at": "2025-06-10T10:00:00.000Z"},
            {"id": "222", "text": "gm", "author_id": "404"}
          ],
          "includes": {"users": [{"id": "9", "username": "satoshi"}]}
        }"#;
        let items = SocialSearchAdapter::parse_items(json).unwrap();
        assert_eq!(items.len(), 2);
        assert_eq!(items[0].title, "Tweet from @satoshi");
        assert_eq!(items[0].source_url, "https://twitter.com/satoshi/status/111");
        assert_eq!(items[0].body, "BTC breaking out");
        assert_eq!(items[1].title, "Tweet from @unknown");
        assert_eq!(items[1].source_url, "https://twitter.com/i/status/222");
    }

    #[test]
    fn empty_result_set_has_no_data_key() {
        let items = SocialSearchAdapter::parse_items(r#"{"meta":{"result_count":0}}"#).unwrap();
        assert!(items.is_empty());
    }
}
