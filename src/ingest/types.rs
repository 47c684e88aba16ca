// src/ingest/types.rs
use anyhow::Result;
use chrono::{DateTime, Utc};
use metrics::counter;
use serde::{Deserialize, Serialize};
use std::fmt;

use crate::fingerprint::{text_fingerprint, transfer_fingerprint, Fingerprint};

/// Max body length in Unicode scalar values.
pub const BODY_MAX_CHARS: usize = 300;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum SourceKind {
    FeedReader,
    RestSearch,
    SocialSearch,
    ChainExplorer,
}

impl fmt::Display for SourceKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            SourceKind::FeedReader => "feed-reader",
            SourceKind::RestSearch => "rest-search",
            SourceKind::SocialSearch => "social-search",
            SourceKind::ChainExplorer => "chain-explorer",
        })
    }
}

/// On-chain specifics carried by chain-explorer items.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TransferDetails {
    pub symbol: String,    // e.g. "BTC"
    pub coin_name: String, // e.g. "Bitcoin"
    pub chain: String,
    pub from: String,
    pub to: String,
    pub amount: f64,    // display units
    pub usd_value: f64, // amount * spot price
    pub tx_hash: String,
}

/// Upstream-agnostic candidate notification.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NormalizedItem {
    pub title: String,
    pub body: String,
    pub source_url: String,
    pub source_label: String,
    pub source_kind: SourceKind,
    pub published_at: DateTime<Utc>,
    pub transfer: Option<TransferDetails>,
}

impl NormalizedItem {
    pub fn new(
        kind: SourceKind,
        label: impl Into<String>,
        title: impl Into<String>,
        url: impl Into<String>,
    ) -> Self {
        Self {
            title: title.into().trim().to_string(),
            body: String::new(),
            source_url: url.into().trim().to_string(),
            source_label: label.into(),
            source_kind: kind,
            published_at: Utc::now(),
            transfer: None,
        }
    }

    pub fn with_body(mut self, body: &str) -> Self {
        self.body = truncate_chars(body.trim(), BODY_MAX_CHARS);
        self
    }

    /// Keeps the ingestion time when the upstream gave no timestamp.
    pub fn published(mut self, at: Option<DateTime<Utc>>) -> Self {
        if let Some(ts) = at {
            self.published_at = ts;
        }
        self
    }

    pub fn with_transfer(mut self, transfer: TransferDetails) -> Self {
        self.transfer = Some(transfer);
        self
    }

    /// Title and URL are required for anything that reaches the sink.
    pub fn is_dispatchable(&self) -> bool {
        !self.title.trim().is_empty() && !self.source_url.trim().is_empty()
    }

    pub fn fingerprint(&self) -> Fingerprint {
        match &self.transfer {
            Some(t) => transfer_fingerprint(&t.tx_hash, &t.symbol, t.amount),
            None => text_fingerprint(&self.title, &self.body),
        }
    }
}

pub fn truncate_chars(s: &str, max: usize) -> String {
    s.chars().take(max).collect()
}

#[async_trait::async_trait]
pub trait SourceAdapter: Send + Sync {
    /// Raw fallible fetch. Errors stop at `fetch`.
    async fn fetch_latest(&self) -> Result<Vec<NormalizedItem>>;

    fn name(&self) -> &'static str;

    fn kind(&self) -> SourceKind;

    /// Per-call result cap.
    fn max_items(&self) -> usize {
        50
    }

    /// Adapter boundary: never fails, an upstream outage yields an empty batch.
    async fn fetch(&self) -> Vec<NormalizedItem> {
        match self.fetch_latest().await {
            Ok(mut items) => {
                items.truncate(self.max_items());
                counter!("notifier_items_fetched_total", "source" => self.name())
                    .increment(items.len() as u64);
                items
            }
            Err(e) => {
                tracing::error!(error = ?e, provider = self.name(), kind = %self.kind(), "provider error");
                counter!("notifier_adapter_errors_total", "source" => self.name()).increment(1);
                Vec::new()
            }
        }
    }
}
