// src/analyze/classification.rs
//! Structured verdict returned by the classifier, plus the tolerant parser
//! that digs it out of free-form model output.

use serde::{Deserialize, Deserializer, Serialize};

use super::Enrichment;

fn tag(s: Option<String>) -> String {
    s.unwrap_or_default().trim().to_ascii_uppercase()
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(from = "Option<String>")]
pub enum Sentiment {
    Positive,
    Negative,
    #[default]
    Neutral,
}

impl From<Option<String>> for Sentiment {
    fn from(s: Option<String>) -> Self {
        match tag(s).as_str() {
            "POSITIVE" => Sentiment::Positive,
            "NEGATIVE" => Sentiment::Negative,
            _ => Sentiment::Neutral,
        }
    }
}

/// Ordered: `Skippable < Low < Medium < High < Critical`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Default, Serialize, Deserialize)]
#[serde(from = "Option<String>")]
pub enum Importance {
    Skippable,
    Low,
    #[default]
    Medium,
    High,
    Critical,
}

impl From<Option<String>> for Importance {
    fn from(s: Option<String>) -> Self {
        match tag(s).as_str() {
            "CRITICAL" => Importance::Critical,
            "HIGH" => Importance::High,
            "LOW" => Importance::Low,
            "SKIPPABLE" => Importance::Skippable,
            _ => Importance::Medium,
        }
    }
}

/// Shared by market impact and risk.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(from = "Option<String>")]
pub enum Tier {
    High,
    #[default]
    Medium,
    Low,
}

impl From<Option<String>> for Tier {
    fn from(s: Option<String>) -> Self {
        match tag(s).as_str() {
            "HIGH" => Tier::High,
            "LOW" => Tier::Low,
            _ => Tier::Medium,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(from = "Option<String>")]
pub enum Recommendation {
    Buy,
    Sell,
    #[default]
    Wait,
    Hold,
}

impl From<Option<String>> for Recommendation {
    fn from(s: Option<String>) -> Self {
        match tag(s).as_str() {
            "BUY" => Recommendation::Buy,
            "SELL" => Recommendation::Sell,
            "HOLD" => Recommendation::Hold,
            _ => Recommendation::Wait,
        }
    }
}

fn text<'de, D: Deserializer<'de>>(d: D) -> Result<String, D::Error> {
    Ok(Option::<String>::deserialize(d)?
        .unwrap_or_default()
        .trim()
        .to_string())
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct Classification {
    #[serde(default)]
    pub sentiment: Sentiment,
    #[serde(default, alias = "news_importance")]
    pub importance: Importance,
    #[serde(default)]
    pub market_impact: Tier,
    #[serde(default, alias = "risk_level")]
    pub risk: Tier,
    #[serde(default)]
    pub recommendation: Recommendation,
    #[serde(default, deserialize_with = "text", alias = "title_tr")]
    pub headline: String,
    #[serde(default, deserialize_with = "text", alias = "summary_tr")]
    pub summary: String,
    #[serde(default, deserialize_with = "text")]
    pub price_movement: String,
    #[serde(default, deserialize_with = "text")]
    pub psychology: String,
    #[serde(default, deserialize_with = "text")]
    pub whale_behavior: String,
    #[serde(default, deserialize_with = "text", alias = "analysis_tr")]
    pub analysis: String,
    #[serde(default, deserialize_with = "text")]
    pub emoji: String,
}

/// First balanced `{...}` span in `text`. Braces inside string literals
/// (including escaped quotes) do not count.
pub fn extract_json_object(text: &str) -> Option<&str> {
    let start = text.find('{')?;
    let mut depth = 0usize;
    let mut in_str = false;
    let mut escaped = false;

    for (i, ch) in text[start..].char_indices() {
        if in_str {
            match ch {
                _ if escaped => escaped = false,
                '\\' => escaped = true,
                '"' => in_str = false,
                _ => {}
            }
            continue;
        }
        match ch {
            '"' => in_str = true,
            '{' => depth += 1,
            '}' => {
                depth -= 1;
                if depth == 0 {
                    return Some(&text[start..start + i + 1]);
                }
            }
            _ => {}
        }
    }
    None
}

/// Model output to an enrichment decision. Anything unusable is a skip.
pub fn parse_classification(text: &str) -> Enrichment {
    let Some(span) = extract_json_object(text) else {
        tracing::warn!(preview = %preview(text), "no json object in classifier output");
        return Enrichment::Skip;
    };
    match serde_json::from_str::<Classification>(span) {
        Ok(c) if c.importance == Importance::Skippable => {
            tracing::debug!(headline = %c.headline, "classified as skippable");
            Enrichment::Skip
        }
        Ok(c) => Enrichment::Classified(c),
        Err(e) => {
            tracing::warn!(error = ?e, "classifier json did not decode");
            Enrichment::Skip
        }
    }
}

fn preview(text: &str) -> String {
    text.chars().take(80).collect()
}
