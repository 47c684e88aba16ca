// src/fingerprint.rs
//! Dedup keys for candidate notifications.
//!
//! A fingerprint is a SHA-256 hex digest over case-folded, trimmed fields, so
//! the same headline delivered by two different adapters collapses to one key.

use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::fmt;

#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Fingerprint(String);

impl Fingerprint {
    /// Wrap an already computed digest (e.g. one loaded from disk).
    pub fn from_hex(hex: impl Into<String>) -> Self {
        Self(hex.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for Fingerprint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

fn canonical(s: &str) -> String {
    s.trim().to_lowercase()
}

fn digest(parts: &[&str]) -> Fingerprint {
    let mut hasher = Sha256::new();
    for (i, p) in parts.iter().enumerate() {
        if i > 0 {
            hasher.update(b":");
        }
        hasher.update(p.as_bytes());
    }
    let out = hasher.finalize();
    let mut hex = String::with_capacity(64);
    for b in out.iter() {
        use std::fmt::Write as _;
        let _ = write!(&mut hex, "{:02x}", b);
    }
    Fingerprint(hex)
}

/// Fingerprint of a text item (news article, tweet).
pub fn text_fingerprint(title: &str, body: &str) -> Fingerprint {
    digest(&[&canonical(title), &canonical(body)])
}

/// Fingerprint of an on-chain transfer.
pub fn transfer_fingerprint(tx_hash: &str, symbol: &str, amount: f64) -> Fingerprint {
    digest(&[
        &canonical(tx_hash),
        &canonical(symbol),
        &canonical(&amount.to_string()),
    ])
}
