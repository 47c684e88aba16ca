// src/ingest/providers/chain/bitcoin.rs
use anyhow::{Context, Result};
use async_trait::async_trait;
use serde_json::Value;
use std::sync::Arc;

use super::{
    addr_or_unknown, json_u128, to_display_units, ChainInfo, Mode, PriceOracle, RawTransfer,
    MAX_SCAN,
};
use crate::ingest::providers::from_unix;
use crate::ingest::types::{NormalizedItem, SourceAdapter, SourceKind};

pub const BLOCKCHAIN_INFO_URL: &str = "https://blockchain.info/unconfirmed-transactions?format=json";

pub const BITCOIN: ChainInfo = ChainInfo {
    symbol: "BTC",
    coin_name: "Bitcoin",
    chain: "Bitcoin",
    coingecko_id: "bitcoin",
    explorer_label: "Blockchain.com",
    explorer_tx_base: "https://www.blockchain.com/btc/tx/",
};

const SATOSHI_DECIMALS: u32 = 8;

/// Unconfirmed mempool transactions from blockchain.info.
pub struct BitcoinExplorer {
    mode: Mode,
    oracle: Arc<dyn PriceOracle>,
    min_usd: f64,
}

impl BitcoinExplorer {
    pub fn new(oracle: Arc<dyn PriceOracle>, min_usd: f64) -> Result<Self> {
        Ok(Self {
            mode: Mode::http(BLOCKCHAIN_INFO_URL)?,
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

    /// Largest output is the transfer; the first input is its sender.
    pub fn parse_transfers(json: &str) -> Result<Vec<RawTransfer>> {
        let v: Value = serde_json::from_str(json).context("parsing blockchain.info json")?;
        let txs = v.get("txs").and_then(Value::as_array).cloned().unwrap_or_default();

        let mut out = Vec::new();
        for tx in txs.iter().take(MAX_SCAN) {
            let hash = tx.get("hash").and_then(Value::as_str).unwrap_or_default();
            let outputs = tx.get("out").and_then(Value::as_array);
            let first_input = tx
                .get("inputs")
                .and_then(Value::as_array)
                .and_then(|ins| ins.first());
            let (Some(outputs), Some(first_input)) = (outputs, first_input) else {
                continue;
            };
            if hash.is_empty() {
                continue;
            }
            let largest = outputs
                .iter()
                .filter_map(|o| Some((json_u128(o.get("value")?)?, o)))
                .max_by_key(|(value, _)| *value);
            let Some((sats, out_entry)) = largest else {
                continue;
            };

            out.push(RawTransfer {
                tx_hash: hash.to_string(),
                from: addr_or_unknown(
                    first_input
                        .get("prev_out")
                        .and_then(|p| p.get("addr"))
                        .and_then(Value::as_str),
                ),
                to: addr_or_unknown(out_entry.get("addr").and_then(Value::as_str)),
                amount: to_display_units(sats, SATOSHI_DECIMALS),
                at: tx.get("time").and_then(Value::as_i64).and_then(from_unix),
            });
        }
        Ok(out)
    }
}

#[async_trait]
impl SourceAdapter for BitcoinExplorer {
    async fn fetch_latest(&self) -> Result<Vec<NormalizedItem>> {
        let body = self.mode.body("blockchain.info").await?;
        let raw = Self::parse_transfers(&body)?;
        let price = self.oracle.usd_price(BITCOIN.coingecko_id).await;
        Ok(BITCOIN.select(raw, price, self.min_usd))
    }

    fn name(&self) -> &'static str {
        "bitcoin"
    }

    fn kind(&self) -> SourceKind {
        SourceKind::ChainExplorer
    }

    fn max_items(&self) -> usize {
        MAX_SCAN
    }
}
