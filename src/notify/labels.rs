// src/notify/labels.rs
//! Deterministic display lookups for embeds.

use chrono::{DateTime, Utc};

use crate::analyze::{Importance, Recommendation, Sentiment, Tier};

pub const COLOR_GREEN: u32 = 0x00FF00;
pub const COLOR_RED: u32 = 0xFF0000;
pub const COLOR_GREY: u32 = 0x808080;
pub const COLOR_BLUE: u32 = 0x3498DB;

pub fn sentiment_color(s: Sentiment) -> u32 {
    match s {
        Sentiment::Positive => COLOR_GREEN,
        Sentiment::Negative => COLOR_RED,
        Sentiment::Neutral => COLOR_GREY,
    }
}

pub fn sentiment_emoji(s: Sentiment) -> &'static str {
    match s {
        Sentiment::Positive => "🟢",
        Sentiment::Negative => "🔴",
        Sentiment::Neutral => "⚪",
    }
}

pub fn sentiment_label(s: Sentiment) -> &'static str {
    match s {
        Sentiment::Positive => "Positive 📈",
        Sentiment::Negative => "Negative 📉",
        Sentiment::Neutral => "Neutral ➡️",
    }
}

pub fn importance_badge(i: Importance) -> &'static str {
    match i {
        Importance::Critical => "🚨 CRITICAL",
        Importance::High => "⚠️ HIGH",
        Importance::Medium => "ℹ️ MEDIUM",
        Importance::Low => "💡 LOW",
        // Never dispatched; shown as the neutral badge if it ever is.
        Importance::Skippable => "ℹ️ MEDIUM",
    }
}

pub fn impact_label(t: Tier) -> &'static str {
    match t {
        Tier::High => "High 🔥",
        Tier::Medium => "Medium ⚡",
        Tier::Low => "Low 💤",
    }
}

pub fn risk_label(t: Tier) -> &'static str {
    match t {
        Tier::High => "High 🔴",
        Tier::Medium => "Medium 🟡",
        Tier::Low => "Low 🟢",
    }
}

pub fn recommendation_label(r: Recommendation) -> &'static str {
    match r {
        Recommendation::Buy => "🟢 BUY",
        Recommendation::Sell => "🔴 SELL",
        Recommendation::Wait => "🟡 WAIT",
        Recommendation::Hold => "🔵 HOLD",
    }
}

/// Whale embed color by USD size.
pub fn transfer_color(usd: f64) -> u32 {
    if usd >= 10_000_000.0 {
        0xFF0000
    } else if usd >= 5_000_000.0 {
        0xFF6600
    } else if usd >= 2_000_000.0 {
        0xFFCC00
    } else {
        0xFF6B9D
    }
}

/// `bc1qxy2k...fjhx0wlh` style; short addresses pass through.
pub fn short_address(addr: &str) -> String {
    let addr = addr.trim();
    if addr.is_empty() {
        return "Unknown".to_string();
    }
    let n = addr.chars().count();
    if n <= 16 {
        return addr.to_string();
    }
    let head: String = addr.chars().take(8).collect();
    let tail: String = addr.chars().skip(n - 8).collect();
    format!("{head}...{tail}")
}

/// Whole dollars with thousands separators: `1234567.8` -> `$1,234,568`.
pub fn usd(value: f64) -> String {
    let whole = value.round().max(0.0) as u128;
    let digits = whole.to_string();
    let mut out = String::with_capacity(digits.len() + digits.len() / 3 + 1);
    for (i, ch) in digits.chars().enumerate() {
        if i > 0 && (digits.len() - i) % 3 == 0 {
            out.push(',');
        }
        out.push(ch);
    }
    format!("${out}")
}

pub fn published(at: &DateTime<Utc>) -> String {
    at.format("%Y-%m-%d %H:%M UTC").to_string()
}

/// Discord rejects empty field values.
pub fn or_placeholder(s: &str, placeholder: &str) -> String {
    let s = s.trim();
    if s.is_empty() {
        placeholder.to_string()
    } else {
        s.to_string()
    }
}
