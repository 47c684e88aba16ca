use anyhow::{bail, Context, Result};
use async_trait::async_trait;
use reqwest::Client;
use serde::Serialize;
use std::time::Duration;

use super::labels::{self, or_placeholder};
use super::Dispatcher;
use crate::analyze::Classification;
use crate::ingest::providers::USER_AGENT;
use crate::ingest::types::{truncate_chars, NormalizedItem, TransferDetails};

pub const NEWS_FOOTER: &str = "Crypto news analysis";
pub const WHALE_FOOTER: &str = "On-chain whale alert tracker";

// Discord rejects embeds over these limits with a 400.
pub const TITLE_MAX_CHARS: usize = 256;
pub const DESCRIPTION_MAX_CHARS: usize = 4096;
pub const FIELD_NAME_MAX_CHARS: usize = 256;
pub const FIELD_VALUE_MAX_CHARS: usize = 1024;

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct EmbedField {
    pub name: String,
    pub value: String,
    pub inline: bool,
}

impl EmbedField {
    fn new(name: impl Into<String>, value: impl Into<String>, inline: bool) -> Self {
        Self {
            name: truncate_chars(&name.into(), FIELD_NAME_MAX_CHARS),
            value: truncate_chars(&value.into(), FIELD_VALUE_MAX_CHARS),
            inline,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct EmbedFooter {
    pub text: String,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DiscordEmbed {
    pub title: String,
    pub description: String,
    pub url: String,
    pub color: u32,
    pub fields: Vec<EmbedField>,
    pub footer: EmbedFooter,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DiscordWebhookPayload {
    pub embeds: Vec<DiscordEmbed>,
}

impl DiscordWebhookPayload {
    /// Picks the layout: transfer, analyzed news or plain news.
    pub fn for_item(item: &NormalizedItem, analysis: Option<&Classification>) -> Self {
        let embed = match (&item.transfer, analysis) {
            (Some(t), _) => transfer_embed(item, t),
            (None, Some(c)) => analyzed_embed(item, c),
            (None, None) => plain_embed(item),
        };
        Self {
            embeds: vec![embed.clamped()],
        }
    }
}

impl DiscordEmbed {
    fn clamped(mut self) -> Self {
        self.title = truncate_chars(&self.title, TITLE_MAX_CHARS);
        self.description = truncate_chars(&self.description, DESCRIPTION_MAX_CHARS);
        self
    }
}

fn analyzed_embed(item: &NormalizedItem, c: &Classification) -> DiscordEmbed {
    let headline = if c.headline.is_empty() {
        &item.title
    } else {
        &c.headline
    };
    let emoji = if c.emoji.is_empty() {
        labels::sentiment_emoji(c.sentiment)
    } else {
        c.emoji.as_str()
    };
    let description = if c.summary.is_empty() {
        item.body.clone()
    } else {
        c.summary.clone()
    };
    DiscordEmbed {
        title: format!("{emoji} {headline}"),
        description,
        url: item.source_url.clone(),
        color: labels::sentiment_color(c.sentiment),
        fields: vec![
            EmbedField::new(labels::importance_badge(c.importance), "Importance", true),
            EmbedField::new("⚠️ Risk", labels::risk_label(c.risk), true),
            EmbedField::new("💡 Recommendation", labels::recommendation_label(c.recommendation), true),
            EmbedField::new("💭 Sentiment", labels::sentiment_label(c.sentiment), true),
            EmbedField::new("💹 Market impact", labels::impact_label(c.market_impact), true),
            EmbedField::new("📊 Price movement", or_placeholder(&c.price_movement, "Unknown"), true),
            EmbedField::new("🧠 Market psychology", or_placeholder(&c.psychology, "No analysis"), false),
            EmbedField::new("🐋 Whale behaviour", or_placeholder(&c.whale_behavior, "No estimate"), false),
            EmbedField::new("💬 Analysis", or_placeholder(&c.analysis, "No analysis"), false),
            EmbedField::new("📌 Source", or_placeholder(&item.source_label, "Unknown"), true),
            EmbedField::new("📅 Published", labels::published(&item.published_at), true),
        ],
        footer: EmbedFooter {
            text: NEWS_FOOTER.to_string(),
        },
    }
}

fn plain_embed(item: &NormalizedItem) -> DiscordEmbed {
    DiscordEmbed {
        title: format!("📰 {}", item.title),
        description: item.body.clone(),
        url: item.source_url.clone(),
        color: labels::COLOR_BLUE,
        fields: vec![
            EmbedField::new("📌 Source", or_placeholder(&item.source_label, "Unknown"), true),
            EmbedField::new("📅 Published", labels::published(&item.published_at), true),
        ],
        footer: EmbedFooter {
            text: NEWS_FOOTER.to_string(),
        },
    }
}

fn transfer_embed(item: &NormalizedItem, t: &TransferDetails) -> DiscordEmbed {
    DiscordEmbed {
        title: format!("🐋 {} Whale Alert - {}", t.symbol, t.coin_name),
        description: "**Large Transfer Detected**".to_string(),
        url: item.source_url.clone(),
        color: labels::transfer_color(t.usd_value),
        fields: vec![
            EmbedField::new("📊 Amount", format!("`{:.2} {}`", t.amount, t.symbol), true),
            EmbedField::new("💵 USD value", format!("`{}`", labels::usd(t.usd_value)), true),
            EmbedField::new("⛓️ Chain", format!("`{}`", t.chain), true),
            EmbedField::new("📤 From", format!("`{}`", labels::short_address(&t.from)), false),
            EmbedField::new("📥 To", format!("`{}`", labels::short_address(&t.to)), false),
            EmbedField::new("🔗 Transaction", format!("[View]({})", item.source_url), false),
            EmbedField::new("⏰ Time", format!("`{}`", labels::published(&item.published_at)), true),
        ],
        footer: EmbedFooter {
            text: WHALE_FOOTER.to_string(),
        },
    }
}

#[derive(Clone)]
pub struct DiscordDispatcher {
    webhook: String,
    client: Client,
    timeout: Duration,
}

impl DiscordDispatcher {
    pub fn new(webhook: String) -> Result<Self> {
        let client = Client::builder()
            .user_agent(USER_AGENT)
            .build()
            .context("building discord http client")?;
        Ok(Self {
            webhook,
            client,
            timeout: Duration::from_secs(10),
        })
    }

    pub fn with_timeout(mut self, secs: u64) -> Self {
        self.timeout = Duration::from_secs(secs);
        self
    }

    /// Single attempt; any 2xx is delivered.
    pub async fn post(&self, payload: &DiscordWebhookPayload) -> Result<()> {
        let rsp = self
            .client
            .post(&self.webhook)
            .timeout(self.timeout)
            .json(payload)
            .send()
            .await
            .context("discord webhook request failed")?;
        let status = rsp.status();
        if !status.is_success() {
            bail!("discord webhook HTTP error: {status}");
        }
        Ok(())
    }
}

#[async_trait]
impl Dispatcher for DiscordDispatcher {
    async fn send(&self, item: &NormalizedItem, analysis: Option<&Classification>) -> bool {
        let payload = DiscordWebhookPayload::for_item(item, analysis);
        match self.post(&payload).await {
            Ok(()) => {
                tracing::info!(title = %item.title, source = %item.source_label, "sent to discord");
                true
            }
            Err(e) => {
                tracing::error!(error = ?e, title = %item.title, "discord dispatch failed");
                false
            }
        }
    }

    fn name(&self) -> &'static str {
        "discord"
    }
}
