// src/app.rs
//! Wires configuration into runnable drivers.

use anyhow::{Context, Result};
use std::sync::Arc;
use tracing::{info, warn};

use crate::analyze::{BudgetedEnricher, ClaudeEnricher, Enricher};
use crate::config::{AppConfig, NewsConfig, WhaleConfig};
use crate::driver::{Driver, Pipeline};
use crate::ingest::providers::chain::{
    BitcoinExplorer, CoinGecko, EthereumExplorer, PriceOracle, SolanaExplorer,
};
use crate::ingest::providers::feed::FeedAdapter;
use crate::ingest::providers::news_api::NewsApiAdapter;
use crate::ingest::providers::social_search::SocialSearchAdapter;
use crate::ingest::types::SourceAdapter;
use crate::notify::{DiscordDispatcher, Dispatcher};
use crate::store::{DurableStore, FingerprintStore, MemoryStore};

fn open_store(path: Option<&std::path::Path>, pipeline: &str) -> Box<dyn FingerprintStore> {
    match path {
        Some(p) => Box::new(DurableStore::open(p)),
        None => {
            info!(pipeline, "dedup memory is per session");
            Box::new(MemoryStore::new())
        }
    }
}

/// Adapter order is dispatch order: NewsAPI, social search, then feeds.
pub fn news_adapters(cfg: &NewsConfig) -> Result<Vec<Box<dyn SourceAdapter>>> {
    let mut adapters: Vec<Box<dyn SourceAdapter>> = Vec::new();

    match &cfg.newsapi_key {
        Some(key) => adapters.push(Box::new(NewsApiAdapter::new(key.clone(), cfg.newsapi_page_size)?)),
        None => warn!(provider = "newsapi", "NEWSAPI_KEY not set; adapter disabled"),
    }

    match &cfg.twitter_bearer {
        Some(token) if !cfg.keywords.is_empty() => {
            adapters.push(Box::new(SocialSearchAdapter::new(token.clone(), &cfg.keywords)?))
        }
        Some(_) => warn!(provider = "twitter", "no search keywords configured; adapter disabled"),
        None => warn!(provider = "twitter", "TWITTER_BEARER_TOKEN not set; adapter disabled"),
    }

    for url in &cfg.feeds {
        match FeedAdapter::from_url(url) {
            Ok(a) => adapters.push(Box::new(a)),
            Err(e) => warn!(error = ?e, provider = "feed", "skipping feed"),
        }
    }
    Ok(adapters)
}

pub fn news_pipeline(cfg: &NewsConfig) -> Result<Pipeline> {
    let dispatcher: Arc<dyn Dispatcher> = Arc::new(DiscordDispatcher::new(cfg.webhook_url.clone())?);
    let mut pipeline = Pipeline::new(
        "news",
        news_adapters(cfg)?,
        open_store(cfg.seen_path.as_deref(), "news"),
        dispatcher,
    )
    .with_dispatch_pause(cfg.dispatch_pause);

    match &cfg.enricher {
        Some(e) => {
            let claude = ClaudeEnricher::new(e.api_key.clone(), e.model.as_deref())?;
            info!(model = claude.model(), daily_limit = e.daily_limit, "news classification enabled");
            let enricher: Arc<dyn Enricher> =
                Arc::new(BudgetedEnricher::new(Arc::new(claude), e.daily_limit));
            pipeline = pipeline.with_enricher(enricher);
        }
        None => warn!("CLAUDE_API_KEY not set; news items go out unclassified"),
    }
    Ok(pipeline)
}

pub fn whale_pipeline(cfg: &WhaleConfig) -> Result<Pipeline> {
    let oracle: Arc<dyn PriceOracle> = Arc::new(CoinGecko::new()?);
    let adapters: Vec<Box<dyn SourceAdapter>> = vec![
        Box::new(BitcoinExplorer::new(oracle.clone(), cfg.min_usd)?),
        Box::new(EthereumExplorer::new(oracle.clone(), cfg.min_usd)?),
        Box::new(SolanaExplorer::new(oracle, cfg.min_usd)?),
    ];
    let dispatcher: Arc<dyn Dispatcher> = Arc::new(DiscordDispatcher::new(cfg.webhook_url.clone())?);
    Ok(Pipeline::new(
        "whale",
        adapters,
        open_store(cfg.seen_path.as_deref(), "whale"),
        dispatcher,
    )
    .with_dispatch_pause(cfg.dispatch_pause))
}

/// One driver per enabled pipeline.
pub fn build_drivers(cfg: &AppConfig) -> Result<Vec<Driver>> {
    let mut drivers = Vec::new();
    if let Some(n) = &cfg.news {
        let p = news_pipeline(n).context("building news pipeline")?;
        info!(adapters = p.adapter_count(), poll_secs = n.poll_interval.as_secs(), "news pipeline ready");
        drivers.push(Driver::new(p, n.poll_interval));
    }
    if let Some(w) = &cfg.whale {
        let p = whale_pipeline(w).context("building whale pipeline")?;
        info!(min_usd = w.min_usd, poll_secs = w.poll_interval.as_secs(), "whale pipeline ready");
        drivers.push(Driver::new(p, w.poll_interval));
    }
    Ok(drivers)
}
