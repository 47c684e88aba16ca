// src/ingest/providers/news_api.rs
use anyhow::{bail, Context, Result};
use async_trait::async_trait;
use serde::Deserialize;
use serde_json::Value;

use crate::ingest::extract::json_first;
use crate::ingest::normalize_text;
use crate::ingest::providers::{http_client, parse_timestamp};
use crate::ingest::types::{NormalizedItem, SourceAdapter, SourceKind};

pub const NEWSAPI_ENDPOINT: &str = "https://newsapi.org/v2/everything";
pub const NEWSAPI_QUERY: &str = "cryptocurrency OR bitcoin OR ethereum OR crypto";

#[derive(Debug, Deserialize)]
struct Resp {
    status: Option<String>,
    message: Option<String>,
    #[serde(default)]
    articles: Vec<Value>,
}

/// NewsAPI `/v2/everything` search, newest first.
pub struct NewsApiAdapter {
    mode: Mode,
    page_size: usize,
}

enum Mode {
    Fixture(String),
    Http {
        client: reqwest::Client,
        endpoint: String,
        api_key: String,
    },
}

impl NewsApiAdapter {
    pub fn new(api_key: String, page_size: usize) -> Result<Self> {
        Ok(Self {
            mode: Mode::Http {
                client: http_client(10)?,
                endpoint: NEWSAPI_ENDPOINT.to_string(),
                api_key,
            },
            page_size: page_size.clamp(1, 50),
        })
    }

    pub fn from_fixture(json: &str) -> Self {
        Self {
            mode: Mode::Fixture(json.to_string()),
            page_size: 5,
        }
    }

    pub fn parse_items(json: &str) -> Result<Vec<NormalizedItem>> {
        let resp: Resp = serde_json::from_str(json).context("parsing newsapi json")?;
        if resp.status.as_deref() == Some("error") {
            bail!(
                "newsapi error: {}",
                resp.message.unwrap_or_else(|| "unknown".to_string())
            );
        }

        let mut out = Vec::with_capacity(resp.articles.len());
        for a in &resp.articles {
            let title = json_first(a, &[&["title"]]).unwrap_or_default();
            // Articles pulled by the publisher come back as "[Removed]" stubs.
            if title == "[Removed]" {
                continue;
            }
            let body = json_first(a, &[&["description"], &["content"]]).unwrap_or_default();
            let label = json_first(a, &[&["source", "name"]]).unwrap_or_else(|| "NewsAPI".to_string());
            let url = json_first(a, &[&["url"]]).unwrap_or_default();
            let published = json_first(a, &[&["publishedAt"]])
                .as_deref()
                .and_then(parse_timestamp);

            out.push(
                NormalizedItem::new(SourceKind::RestSearch, label, normalize_text(&title), url)
                    .with_body(&normalize_text(&body))
                    .published(published),
            );
        }
        Ok(out)
    }
}

#[async_trait]
impl SourceAdapter for NewsApiAdapter {
    async fn fetch_latest(&self) -> Result<Vec<NormalizedItem>> {
        match &self.mode {
            Mode::Fixture(s) => Self::parse_items(s),
            Mode::Http {
                client,
                endpoint,
                api_key,
            } => {
                let page_size = self.page_size.to_string();
                // Key in the header, never in the query string.
                let body = client
                    .get(endpoint)
                    .header("X-Api-Key", api_key)
                    .query(&[
                        ("q", NEWSAPI_QUERY),
                        ("sortBy", "publishedAt"),
                        ("language", "en"),
                        ("pageSize", page_size.as_str()),
                    ])
                    .send()
                    .await
                    .context("newsapi http get")?
                    .text()
                    .await
                    .context("newsapi http .text()")?;
                Self::parse_items(&body)
            }
        }
    }

    fn name(&self) -> &'static str {
        "newsapi"
    }

    fn kind(&self) -> SourceKind {
        SourceKind::RestSearch
    }

    fn max_items(&self) -> usize {
        self.page_size
    }
}
