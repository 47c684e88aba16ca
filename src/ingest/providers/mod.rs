// src/ingest/providers/mod.rs
pub mod chain;
pub mod feed;
pub mod news_api;
pub mod social_search;

use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use std::time::Duration;
use time::format_description::well_known::{Rfc2822, Rfc3339};
use time::OffsetDateTime;

pub const USER_AGENT: &str = concat!("crypto-alert-notifier/", env!("CARGO_PKG_VERSION"));

/// Shared reqwest client with a bounded request timeout.
pub fn http_client(timeout_secs: u64) -> Result<reqwest::Client> {
    reqwest::Client::builder()
        .user_agent(USER_AGENT)
        .connect_timeout(Duration::from_secs(4))
        .timeout(Duration::from_secs(timeout_secs))
        .build()
        .context("building http client")
}

/// GET `url` and return the body; non-2xx is an error.
pub async fn get_text(client: &reqwest::Client, url: &str, what: &'static str) -> Result<String> {
    client
        .get(url)
        .send()
        .await
        .with_context(|| format!("{what} http get"))?
        .error_for_status()
        .with_context(|| format!("{what} non-2xx"))?
        .text()
        .await
        .with_context(|| format!("{what} http .text()"))
}

/// RFC 2822 (RSS) or RFC 3339 (Atom, JSON APIs) to UTC.
pub fn parse_timestamp(ts: &str) -> Option<DateTime<Utc>> {
    let ts = ts.trim();
    let odt = OffsetDateTime::parse(ts, &Rfc2822)
        .or_else(|_| OffsetDateTime::parse(ts, &Rfc3339))
        .ok()?;
    DateTime::<Utc>::from_timestamp(odt.unix_timestamp(), odt.nanosecond())
}

pub fn from_unix(secs: i64) -> Option<DateTime<Utc>> {
    if secs <= 0 {
        return None;
    }
    DateTime::<Utc>::from_timestamp(secs, 0)
}
