// src/ingest/providers/chain/solana.rs
use anyhow::{Context, Result};
use async_trait::async_trait;
use serde_json::Value;
use std::sync::Arc;

use super::{
    addr_or_unknown, json_f64, json_u128, to_display_units, ChainInfo, Mode, PriceOracle,
    RawTransfer, MAX_SCAN,
};
use crate::ingest::providers::from_unix;
use crate::ingest::types::{NormalizedItem, SourceAdapter, SourceKind};

pub const SOLSCAN_URL: &str = "https://api.solscan.io/api/v2/transfer?fromAddress=&toAddress=&limit=50";

pub const SOLANA: ChainInfo = ChainInfo {
    symbol: "SOL",
    coin_name: "Solana",
    chain: "Solana",
    coingecko_id: "solana",
    explorer_label: "Solscan",
    explorer_tx_base: "https://solscan.io/tx/",
};

/// Recent transfers from Solscan.
pub struct SolanaExplorer {
    mode: Mode,
    oracle: Arc<dyn PriceOracle>,
    min_usd: f64,
}

/// Amount scaled by the record's own `decimals` (absent means already display units).
fn record_amount(tx: &Value) -> Option<f64> {
    let raw = tx.get("amount")?;
    let decimals = tx
        .get("decimals")
        .and_then(Value::as_u64)
        .and_then(|d| u32::try_from(d).ok())
        .unwrap_or(0);
    if decimals == 0 {
        return json_f64(raw);
    }
    json_u128(raw).map(|n| to_display_units(n, decimals))
}

impl SolanaExplorer {
    pub fn new(oracle: Arc<dyn PriceOracle>, min_usd: f64) -> Result<Self> {
        Ok(Self {
            mode: Mode::http(SOLSCAN_URL)?,
            oracle,
            min_usd,
        })
    }

    pub fn from_fixture(json: &str, oracle: Arc<dyn PriceOracle>, min_usd: f64) -> Self {
        Self {
            mode: Mode::Fixture(json.to_string()),
            oracle,
            min_usd,
        }
    }

    pub fn parse_transfers(json: &str) -> Result<Vec<RawTransfer>> {
        let v: Value = serde_json::from_str(json).context("parsing solscan json")?;
        let data = v
            .get("result")
            .and_then(|r| r.get("data"))
            .and_then(Value::as_array)
            .cloned()
            .unwrap_or_default();

        let out = data
            .iter()
            .take(MAX_SCAN)
            .filter_map(|tx| {
                let sig = tx.get("signature").and_then(Value::as_str).filter(|s| !s.is_empty())?;
                Some(RawTransfer {
                    tx_hash: sig.to_string(),
                    from: addr_or_unknown(tx.get("from").and_then(Value::as_str)),
                    to: addr_or_unknown(tx.get("to").and_then(Value::as_str)),
                    amount: record_amount(tx).unwrap_or(0.0),
                    at: tx.get("blockTime").and_then(Value::as_i64).and_then(from_unix),
                })
            })
            .collect();
        Ok(out)
    }
}

#[async_trait]
impl SourceAdapter for SolanaExplorer {
    async fn fetch_latest(&self) -> Result<Vec<NormalizedItem>> {
        let body = self.mode.body("solscan").await?;
        let raw = Self::parse_transfers(&body)?;
        let price = self.oracle.usd_price(SOLANA.coingecko_id).await;
        Ok(SOLANA.select(raw, price, self.min_usd))
    }

    fn name(&self) -> &'static str {
        "solana"
    }

    fn kind(&self) -> SourceKind {
        SourceKind::ChainExplorer
    }

    fn max_items(&self) -> usize {
        MAX_SCAN
    }
}
