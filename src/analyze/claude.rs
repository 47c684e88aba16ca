// src/analyze/claude.rs
//! Anthropic Messages API classifier.

use anyhow::{anyhow, bail, Context, Result};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::time::Duration;

use super::{parse_classification, Enricher, Enrichment};
use crate::ingest::providers::USER_AGENT;

pub const ANTHROPIC_MESSAGES_URL: &str = "https://api.anthropic.com/v1/messages";
pub const ANTHROPIC_VERSION: &str = "2023-06-01";
pub const DEFAULT_MODEL: &str = "claude-3-5-haiku-20241022";
const MAX_TOKENS: u32 = 800;
const TIMEOUT_SECS: u64 = 15;

const PROMPT_HEAD: &str = "You are a crypto market analyst who studies market psychology.
Judge how the news below moves prices and investor behaviour. Only notable news matters; mark trivia SKIPPABLE.

Importance: CRITICAL (10%+ move), HIGH (5-10%), MEDIUM (2-5%), LOW (<2%), SKIPPABLE (not worth sending).
Risk: HIGH (very volatile, uncertain), MEDIUM, LOW.
Recommendation: BUY, SELL, WAIT, HOLD.
";

const PROMPT_TAIL: &str = r#"Reply with ONLY this JSON object:
{"headline": "short headline", "summary": "summary (max 150 chars)", "sentiment": "POSITIVE|NEGATIVE|NEUTRAL", "market_impact": "HIGH|MEDIUM|LOW", "news_importance": "CRITICAL|HIGH|MEDIUM|LOW|SKIPPABLE", "price_movement": "expected move, e.g. +3-5%", "risk_level": "HIGH|MEDIUM|LOW", "recommendation": "BUY|SELL|WAIT|HOLD", "psychology": "market psychology (max 80 chars)", "whale_behavior": "likely whale behaviour (max 80 chars)", "analysis": "short rationale (max 100 chars)", "emoji": "one fitting emoji"}"#;

pub fn build_prompt(title: &str, body: &str) -> String {
    format!("{PROMPT_HEAD}\nNEWS:\nTitle: {title}\nSummary: {body}\n\n{PROMPT_TAIL}")
}

#[derive(Serialize)]
struct Msg<'a> {
    role: &'a str,
    content: &'a str,
}

#[derive(Serialize)]
struct Req<'a> {
    model: &'a str,
    max_tokens: u32,
    messages: Vec<Msg<'a>>,
}

#[derive(Deserialize)]
struct Resp {
    #[serde(default)]
    content: Vec<Block>,
}

#[derive(Deserialize)]
struct Block {
    #[serde(default)]
    text: String,
}

pub struct ClaudeEnricher {
    http: reqwest::Client,
    api_key: String,
    model: String,
    endpoint: String,
}

impl ClaudeEnricher {
    pub fn new(api_key: impl Into<String>, model: Option<&str>) -> Result<Self> {
        let http = reqwest::Client::builder()
            .user_agent(USER_AGENT)
            .connect_timeout(Duration::from_secs(4))
            .timeout(Duration::from_secs(TIMEOUT_SECS))
            .build()
            .context("building classifier http client")?;
        Ok(Self {
            http,
            api_key: api_key.into(),
            model: model.unwrap_or(DEFAULT_MODEL).to_string(),
            endpoint: ANTHROPIC_MESSAGES_URL.to_string(),
        })
    }

    pub fn with_endpoint(mut self, endpoint: impl Into<String>) -> Self {
        self.endpoint = endpoint.into();
        self
    }

    pub fn model(&self) -> &str {
        &self.model
    }

    async fn complete(&self, prompt: &str) -> Result<String> {
        let req = Req {
            model: &self.model,
            max_tokens: MAX_TOKENS,
            messages: vec![Msg {
                role: "user",
                content: prompt,
            }],
        };
        let resp = self
            .http
            .post(&self.endpoint)
            .header("x-api-key", &self.api_key)
            .header("anthropic-version", ANTHROPIC_VERSION)
            .json(&req)
            .send()
            .await
            .context("classifier http post")?;

        let status = resp.status();
        if !status.is_success() {
            bail!("classifier returned {status}");
        }
        let body: Resp = resp.json().await.context("classifier response json")?;
        body.content
            .into_iter()
            .next()
            .map(|b| b.text.trim().to_string())
            .ok_or_else(|| anyhow!("classifier response has no content"))
    }
}

#[async_trait]
impl Enricher for ClaudeEnricher {
    async fn classify(&self, title: &str, body: &str) -> Enrichment {
        match self.complete(&build_prompt(title, body)).await {
            Ok(text) => {
                tracing::debug!(model = %self.model, reply = %text.chars().take(80).collect::<String>(), "classifier replied");
                parse_classification(&text)
            }
            Err(e) => {
                tracing::error!(error = ?e, enricher = self.name(), "classification failed");
                Enrichment::Skip
            }
        }
    }

    fn name(&self) -> &'static str {
        "claude"
    }
}
