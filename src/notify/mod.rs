// src/notify/mod.rs
pub mod discord;
pub mod labels;

use async_trait::async_trait;

use crate::analyze::Classification;
use crate::ingest::types::NormalizedItem;

pub use discord::{DiscordDispatcher, DiscordWebhookPayload};

/// Delivers one notification. Failures are contained and reported as `false`.
#[async_trait]
pub trait Dispatcher: Send + Sync {
    async fn send(&self, item: &NormalizedItem, analysis: Option<&Classification>) -> bool;

    fn name(&self) -> &'static str;
}
