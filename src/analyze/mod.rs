// src/analyze/mod.rs
//! Optional enrichment stage: classify a news item or signal that it should
//! not be dispatched.

pub mod budget;
pub mod classification;
pub mod claude;

use async_trait::async_trait;

pub use budget::BudgetedEnricher;
pub use classification::{
    extract_json_object, parse_classification, Classification, Importance, Recommendation,
    Sentiment, Tier,
};
pub use claude::ClaudeEnricher;

#[derive(Debug, Clone, PartialEq)]
pub enum Enrichment {
    Classified(Classification),
    /// Not worth sending, or the classifier could not be used.
    Skip,
}

#[async_trait]
pub trait Enricher: Send + Sync {
    /// Never fails: transport and decode problems come back as `Skip`.
    async fn classify(&self, title: &str, body: &str) -> Enrichment;

    fn name(&self) -> &'static str;
}
