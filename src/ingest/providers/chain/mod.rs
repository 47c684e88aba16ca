// src/ingest/providers/chain/mod.rs
//! Chain-explorer adapters: large on-chain transfers valued in USD.
//!
//! Shared pieces live here:
//! - native-unit to display-unit conversion via the asset's decimal exponent
//! - spot price lookup (`PriceOracle`) with a non-zero sentinel on failure
//! - the inclusive USD threshold filter
//! - mapping a transfer onto a `NormalizedItem`

pub mod bitcoin;
pub mod ethereum;
pub mod solana;

use anyhow::{Context, Result};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde_json::Value;

use crate::ingest::providers::{get_text, http_client};
use crate::ingest::types::{NormalizedItem, SourceKind, TransferDetails};

pub use bitcoin::BitcoinExplorer;
pub use ethereum::EthereumExplorer;
pub use solana::SolanaExplorer;

/// Returned when a price cannot be fetched. Non-zero so valuations never
/// divide by or collapse to zero downstream.
pub const PRICE_SENTINEL: f64 = 1.0;
/// Transactions inspected per poll.
pub const MAX_SCAN: usize = 50;
pub const DEFAULT_MIN_USD: f64 = 1_000_000.0;

pub const COINGECKO_PRICE_URL: &str = "https://api.coingecko.com/api/v3/simple/price";

#[async_trait]
pub trait PriceOracle: Send + Sync {
    /// USD spot price for a CoinGecko coin id. Never fails.
    async fn usd_price(&self, coin_id: &str) -> f64;
}

/// CoinGecko simple-price lookup.
pub struct CoinGecko {
    client: reqwest::Client,
    base_url: String,
}

impl CoinGecko {
    pub fn new() -> Result<Self> {
        Ok(Self {
            client: http_client(5)?,
            base_url: COINGECKO_PRICE_URL.to_string(),
        })
    }

    async fn fetch_price(&self, coin_id: &str) -> Result<f64> {
        let v: Value = self
            .client
            .get(&self.base_url)
            .query(&[("ids", coin_id), ("vs_currencies", "usd")])
            .send()
            .await
            .context("coingecko http get")?
            .error_for_status()
            .context("coingecko non-2xx")?
            .json()
            .await
            .context("coingecko json")?;
        Ok(price_from_json(&v, coin_id))
    }
}

#[async_trait]
impl PriceOracle for CoinGecko {
    async fn usd_price(&self, coin_id: &str) -> f64 {
        match self.fetch_price(coin_id).await {
            Ok(p) => p,
            Err(e) => {
                tracing::error!(error = ?e, coin = coin_id, "price lookup failed, using sentinel");
                PRICE_SENTINEL
            }
        }
    }
}

/// Fixed price, for fixtures and offline runs.
pub struct FixedPrice(pub f64);

#[async_trait]
impl PriceOracle for FixedPrice {
    async fn usd_price(&self, _coin_id: &str) -> f64 {
        sanitize_price(self.0)
    }
}

fn sanitize_price(p: f64) -> f64 {
    if p.is_finite() && p > 0.0 {
        p
    } else {
        PRICE_SENTINEL
    }
}

pub fn price_from_json(v: &Value, coin_id: &str) -> f64 {
    let p = v
        .get(coin_id)
        .and_then(|c| c.get("usd"))
        .and_then(Value::as_f64)
        .unwrap_or(0.0);
    sanitize_price(p)
}

/// Smallest-denomination integer to display units (e.g. satoshi to BTC).
pub fn to_display_units(raw: u128, decimals: u32) -> f64 {
    raw as f64 / 10f64.powi(decimals as i32)
}

/// Threshold boundary is inclusive.
pub fn meets_threshold(usd_value: f64, min_usd: f64) -> bool {
    usd_value >= min_usd
}

/// Static description of one chain.
#[derive(Debug, Clone, Copy)]
pub struct ChainInfo {
    pub symbol: &'static str,
    pub coin_name: &'static str,
    pub chain: &'static str,
    pub coingecko_id: &'static str,
    pub explorer_label: &'static str,
    pub explorer_tx_base: &'static str,
}

/// One qualifying transfer before it becomes an item.
#[derive(Debug, Clone)]
pub struct RawTransfer {
    pub tx_hash: String,
    pub from: String,
    pub to: String,
    pub amount: f64,
    pub at: Option<DateTime<Utc>>,
}

impl ChainInfo {
    pub fn to_item(&self, t: RawTransfer, price: f64) -> NormalizedItem {
        let usd_value = t.amount * price;
        let title = format!("{} whale transfer - {}", self.symbol, self.coin_name);
        let body = format!(
            "{:.2} {} (~${:.0}) moved on {}",
            t.amount, self.symbol, usd_value, self.chain
        );
        let url = format!("{}{}", self.explorer_tx_base, t.tx_hash);
        NormalizedItem::new(SourceKind::ChainExplorer, self.explorer_label, title, url)
            .with_body(&body)
            .published(t.at)
            .with_transfer(TransferDetails {
                symbol: self.symbol.to_string(),
                coin_name: self.coin_name.to_string(),
                chain: self.chain.to_string(),
                from: t.from,
                to: t.to,
                amount: t.amount,
                usd_value,
                tx_hash: t.tx_hash,
            })
    }

    /// Value every transfer, keep those at or above `min_usd`.
    pub fn select(&self, raw: Vec<RawTransfer>, price: f64, min_usd: f64) -> Vec<NormalizedItem> {
        let kept: Vec<NormalizedItem> = raw
            .into_iter()
            .filter(|t| meets_threshold(t.amount * price, min_usd))
            .map(|t| self.to_item(t, price))
            .collect();
        if !kept.is_empty() {
            tracing::info!(chain = self.chain, count = kept.len(), "whale transfers found");
        }
        kept
    }
}

/// Where an explorer body comes from.
pub(crate) enum Mode {
    Fixture(String),
    Http { url: String, client: reqwest::Client },
}

impl Mode {
    pub(crate) fn http(url: &str) -> Result<Self> {
        Ok(Mode::Http {
            url: url.to_string(),
            client: http_client(10)?,
        })
    }

    pub(crate) async fn body(&self, what: &'static str) -> Result<String> {
        match self {
            Mode::Fixture(s) => Ok(s.clone()),
            Mode::Http { url, client } => get_text(client, url, what).await,
        }
    }
}

pub(crate) fn addr_or_unknown(v: Option<&str>) -> String {
    match v.map(str::trim) {
        Some(s) if !s.is_empty() => s.to_string(),
        _ => "Unknown".to_string(),
    }
}

/// Integer amounts arrive as JSON numbers or decimal strings.
pub fn json_u128(v: &Value) -> Option<u128> {
    match v {
        Value::Number(n) => n.as_u64().map(u128::from),
        Value::String(s) => s.trim().parse().ok(),
        _ => None,
    }
}

pub fn json_f64(v: &Value) -> Option<f64> {
    match v {
        Value::Number(n) => n.as_f64(),
        Value::String(s) => s.trim().parse().ok(),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn converts_native_units() {
        assert_eq!(to_display_units(150_000_000, 8), 1.5);
        assert_eq!(to_display_units(2_000_000_000_000_000_000, 18), 2.0);
        assert_eq!(to_display_units(42, 0), 42.0);
    }

    #[test]
    fn price_falls_back_to_sentinel() {
        assert_eq!(price_from_json(&json!({"bitcoin": {"usd": 65000.5}}), "bitcoin"), 65000.5);
        assert_eq!(price_from_json(&json!({"bitcoin": {"usd": 0}}), "bitcoin"), PRICE_SENTINEL);
        assert_eq!(price_from_json(&json!({}), "bitcoin"), PRICE_SENTINEL);
    }

    #[test]
    fn threshold_is_inclusive() {
        assert!(meets_threshold(1_000_000.0, 1_000_000.0));
        assert!(!meets_threshold(999_999.0, 1_000_000.0));
    }

    #[test]
    fn amounts_parse_from_numbers_and_strings() {
        assert_eq!(json_u128(&json!("1000000000000000000000")), Some(1_000_000_000_000_000_000_000));
        assert_eq!(json_u128(&json!(12)), Some(12));
        assert_eq!(json_f64(&json!("3.5")), Some(3.5));
        assert_eq!(json_u128(&json!(null)), None);
    }

    #[tokio::test]
    async fn fixed_price_rejects_non_positive() {
        assert_eq!(FixedPrice(-3.0).usd_price("x").await, PRICE_SENTINEL);
        assert_eq!(FixedPrice(2.5).usd_price("x").await, 2.5);
    }
}
