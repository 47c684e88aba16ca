// src/ingest/mod.rs
pub mod extract;
pub mod providers;
pub mod types;

use crate::ingest::types::{NormalizedItem, SourceAdapter};
use futures::future::join_all;
use futures::FutureExt;
use std::panic::AssertUnwindSafe;

/// Normalize upstream text: decode entities, strip markup, collapse whitespace.
pub fn normalize_text(s: &str) -> String {
    // 1) HTML entity decode
    let mut out = html_escape::decode_html_entities(s).to_string();

    // 2) Strip HTML tags
    static RE_TAGS: once_cell::sync::OnceCell<regex::Regex> = once_cell::sync::OnceCell::new();
    let re_tags = RE_TAGS.get_or_init(|| {
        regex::Regex::new(r"(?is)</?[a-z][^>]*>").expect("static tag regex")
    });
    out = re_tags.replace_all(&out, " ").to_string();

    // 3) Normalize curly quotes to ASCII
    out = out
        .replace(['\u{201C}', '\u{201D}', '\u{00AB}', '\u{00BB}'], "\"")
        .replace(['\u{2018}', '\u{2019}'], "'");

    // 4) Collapse whitespace
    static RE_WS: once_cell::sync::OnceCell<regex::Regex> = once_cell::sync::OnceCell::new();
    let re_ws = RE_WS.get_or_init(|| regex::Regex::new(r"\s+").expect("static ws regex"));
    out = re_ws.replace_all(&out, " ").to_string();
    out.trim().to_string()
}

/// Fan out to every adapter and concatenate in adapter order.
///
/// Fetches run concurrently; a panicking adapter counts as an empty batch.
/// Items without a title or URL are dropped here. No dedup.
pub async fn collect_all(adapters: &[Box<dyn SourceAdapter>]) -> Vec<NormalizedItem> {
    crate::metrics::ensure_metrics_described();

    let batches = join_all(adapters.iter().map(|a| async move {
        match AssertUnwindSafe(a.fetch()).catch_unwind().await {
            Ok(items) => items,
            Err(_) => {
                tracing::error!(provider = a.name(), "provider panicked during fetch");
                metrics::counter!("notifier_adapter_errors_total", "source" => a.name())
                    .increment(1);
                Vec::new()
            }
        }
    }))
    .await;

    let mut out = Vec::with_capacity(batches.iter().map(Vec::len).sum());
    let mut dropped = 0usize;
    for item in batches.into_iter().flatten() {
        if item.is_dispatchable() {
            out.push(item);
        } else {
            dropped += 1;
        }
    }
    if dropped > 0 {
        tracing::debug!(dropped, "dropped items without title or url");
    }
    out
}
