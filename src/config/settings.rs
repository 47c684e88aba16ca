// src/config/settings.rs
//! Tunables from an optional TOML file.

use anyhow::{anyhow, Context, Result};
use serde::Deserialize;
use std::fs;
use std::path::{Path, PathBuf};

pub const ENV_PATH: &str = "NOTIFIER_CONFIG_PATH";
pub const DEFAULT_PATH: &str = "config/notifier.toml";

pub const DEFAULT_FEEDS: &[&str] = &[
    "https://cointelegraph.com/feed",
    "https://www.coindesk.com/arc/outboundfeeds/rss/",
];

pub const DEFAULT_KEYWORDS: &[&str] = &[
    "bitcoin",
    "ethereum",
    "crypto",
    "cryptocurrency",
    "blockchain",
    "NFT",
    "DeFi",
    "altcoin",
    "BTC",
    "ETH",
];

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct NewsSettings {
    pub poll_secs: u64,
    pub feeds: Vec<String>,
    pub keywords: Vec<String>,
    pub dispatch_pause_ms: u64,
    pub newsapi_page_size: usize,
}

impl Default for NewsSettings {
    fn default() -> Self {
        Self {
            poll_secs: 30,
            feeds: DEFAULT_FEEDS.iter().map(|s| s.to_string()).collect(),
            keywords: DEFAULT_KEYWORDS.iter().map(|s| s.to_string()).collect(),
            dispatch_pause_ms: 2_000,
            newsapi_page_size: 5,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct WhaleSettings {
    pub poll_secs: u64,
    pub min_usd: f64,
    pub dispatch_pause_ms: u64,
}

impl Default for WhaleSettings {
    fn default() -> Self {
        Self {
            poll_secs: 60,
            min_usd: 1_000_000.0,
            dispatch_pause_ms: 1_000,
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct Settings {
    pub news: NewsSettings,
    pub whale: WhaleSettings,
}

impl Settings {
    pub fn parse(s: &str) -> Result<Self> {
        let mut v: Settings = toml::from_str(s).context("parsing settings toml")?;
        v.news.feeds = clean_list(v.news.feeds);
        v.news.keywords = clean_list(v.news.keywords);
        Ok(v)
    }
}

/// Load settings from an explicit path.
pub fn load_settings_from(path: &Path) -> Result<Settings> {
    let content = fs::read_to_string(path)
        .with_context(|| format!("reading settings from {}", path.display()))?;
    Settings::parse(&content).with_context(|| format!("in {}", path.display()))
}

/// Load settings using env var + fallbacks:
/// 1) $NOTIFIER_CONFIG_PATH (must exist)
/// 2) config/notifier.toml
/// 3) built-in defaults
pub fn load_settings_default() -> Result<Settings> {
    if let Ok(p) = std::env::var(ENV_PATH) {
        let pb = PathBuf::from(p);
        if pb.exists() {
            return load_settings_from(&pb);
        }
        return Err(anyhow!("{ENV_PATH} points to non-existent path {}", pb.display()));
    }
    let default_p = PathBuf::from(DEFAULT_PATH);
    if default_p.exists() {
        return load_settings_from(&default_p);
    }
    Ok(Settings::default())
}

/// Trim, drop blanks and repeats, keep order.
fn clean_list(items: Vec<String>) -> Vec<String> {
    let mut out: Vec<String> = Vec::with_capacity(items.len());
    for it in items {
        let t = it.trim();
        if !t.is_empty() && !out.iter().any(|o| o == t) {
            out.push(t.to_string());
        }
    }
    out
}
