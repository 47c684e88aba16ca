// src/ingest/providers/chain/ethereum.rs
use anyhow::{Context, Result};
use async_trait::async_trait;
use serde_json::Value;
use std::sync::Arc;

use super::{
    addr_or_unknown, json_u128, to_display_units, ChainInfo, Mode, PriceOracle, RawTransfer,
    MAX_SCAN,
};
use crate::ingest::providers::parse_timestamp;
use crate::ingest::types::{NormalizedItem, SourceAdapter, SourceKind};

pub const BLOCKSCOUT_URL: &str = "https://eth.blockscout.com/api/v2/transactions?sort=desc";

pub const ETHEREUM: ChainInfo = ChainInfo {
    symbol: "ETH",
    coin_name: "Ethereum",
    chain: "Ethereum",
    coingecko_id: "ethereum",
    explorer_label: "Blockscout",
    explorer_tx_base: "https://etherscan.io/tx/",
};

const WEI_DECIMALS: u32 = 18;

/// Latest mainnet transactions from Blockscout.
pub struct EthereumExplorer {
    mode: Mode,
    oracle: Arc<dyn PriceOracle>,
    min_usd: f64,
}

impl EthereumExplorer {
    pub fn new(oracle: Arc<dyn PriceOracle>, min_usd: f64) -> Result<Self> {
        Ok(Self {
            mode: Mode::http(BLOCKSCOUT_URL)?,
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

    /// Only successful transactions count.
    pub fn parse_transfers(json: &str) -> Result<Vec<RawTransfer>> {
        let v: Value = serde_json::from_str(json).context("parsing blockscout json")?;
        let items = v.get("items").and_then(Value::as_array).cloned().unwrap_or_default();

        let out = items
            .iter()
            .take(MAX_SCAN)
            .filter(|tx| tx.get("status").and_then(Value::as_str) == Some("ok"))
            .filter_map(|tx| {
                let hash = tx.get("hash").and_then(Value::as_str).filter(|h| !h.is_empty())?;
                let wei = tx.get("value").and_then(json_u128).unwrap_or(0);
                let party = |k: &str| {
                    addr_or_unknown(tx.get(k).and_then(|p| p.get("hash")).and_then(Value::as_str))
                };
                Some(RawTransfer {
                    tx_hash: hash.to_string(),
                    from: party("from"),
                    to: party("to"),
                    amount: to_display_units(wei, WEI_DECIMALS),
                    at: tx.get("timestamp").and_then(Value::as_str).and_then(parse_timestamp),
                })
            })
            .collect();
        Ok(out)
    }
}

#[async_trait]
impl SourceAdapter for EthereumExplorer {
    async fn fetch_latest(&self) -> Result<Vec<NormalizedItem>> {
        let body = self.mode.body("blockscout").await?;
        let raw = Self::parse_transfers(&body)?;
        let price = self.oracle.usd_price(ETHEREUM.coingecko_id).await;
        Ok(ETHEREUM.select(raw, price, self.min_usd))
    }

    fn name(&self) -> &'static str {
        "ethereum"
    }

    fn kind(&self) -> SourceKind {
        SourceKind::ChainExplorer
    }

    fn max_items(&self) -> usize {
        MAX_SCAN
    }
}
