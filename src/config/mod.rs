// src/config/mod.rs
//! Process configuration: environment (secrets, sinks, overrides) layered
//! over the TOML settings file.

pub mod settings;

use anyhow::{anyhow, bail, Context, Result};
use std::fmt;
use std::net::SocketAddr;
use std::path::PathBuf;
use std::str::FromStr;
use std::time::Duration;

use crate::analyze::budget::DEFAULT_DAILY_LIMIT;
pub use settings::{load_settings_default, load_settings_from, Settings};

/// Which pipelines to run, from the first CLI argument.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum PipelineMode {
    News,
    Whale,
    #[default]
    All,
}

impl PipelineMode {
    pub fn from_args<I: IntoIterator<Item = String>>(args: I) -> Result<Self> {
        match args.into_iter().next() {
            Some(a) => a.parse(),
            None => Ok(PipelineMode::All),
        }
    }

    pub fn runs_news(self) -> bool {
        matches!(self, PipelineMode::News | PipelineMode::All)
    }

    pub fn runs_whale(self) -> bool {
        matches!(self, PipelineMode::Whale | PipelineMode::All)
    }
}

impl FromStr for PipelineMode {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "news" => Ok(PipelineMode::News),
            "whale" => Ok(PipelineMode::Whale),
            "all" | "" => Ok(PipelineMode::All),
            other => Err(anyhow!("unknown pipeline {other:?} (expected news, whale or all)")),
        }
    }
}

impl fmt::Display for PipelineMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            PipelineMode::News => "news",
            PipelineMode::Whale => "whale",
            PipelineMode::All => "all",
        })
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct EnricherConfig {
    pub api_key: String,
    pub model: Option<String>,
    pub daily_limit: u32,
}

#[derive(Debug, Clone, PartialEq)]
pub struct NewsConfig {
    pub webhook_url: String,
    pub newsapi_key: Option<String>,
    pub newsapi_page_size: usize,
    pub twitter_bearer: Option<String>,
    pub feeds: Vec<String>,
    pub keywords: Vec<String>,
    /// `None` runs unclassified.
    pub enricher: Option<EnricherConfig>,
    /// `None` keeps dedup memory for the session only.
    pub seen_path: Option<PathBuf>,
    pub poll_interval: Duration,
    pub dispatch_pause: Duration,
}

#[derive(Debug, Clone, PartialEq)]
pub struct WhaleConfig {
    pub webhook_url: String,
    pub min_usd: f64,
    pub seen_path: Option<PathBuf>,
    pub poll_interval: Duration,
    pub dispatch_pause: Duration,
}

#[derive(Debug, Clone, PartialEq)]
pub struct AppConfig {
    pub mode: PipelineMode,
    pub news: Option<NewsConfig>,
    pub whale: Option<WhaleConfig>,
    pub metrics_addr: Option<SocketAddr>,
}

impl AppConfig {
    pub fn from_env(mode: PipelineMode, settings: Settings) -> Result<Self> {
        Self::from_lookup(mode, settings, |k| std::env::var(k).ok())
    }

    /// Build from any key lookup. Blank values count as unset.
    pub fn from_lookup<F>(mode: PipelineMode, settings: Settings, lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |k: &str| {
            lookup(k)
                .map(|v| v.trim().to_string())
                .filter(|v| !v.is_empty())
        };

        let news = if mode.runs_news() {
            let s = settings.news;
            let webhook_url = get("DISCORD_WEBHOOK_URL")
                .ok_or_else(|| anyhow!("DISCORD_WEBHOOK_URL is required for the news pipeline"))?;
            let poll_secs = parse_opt::<u64>(get("NEWS_POLL_SECS"), "NEWS_POLL_SECS")?
                .unwrap_or(s.poll_secs);
            let enricher = match get("CLAUDE_API_KEY") {
                Some(api_key) => Some(EnricherConfig {
                    api_key,
                    model: get("CLAUDE_MODEL"),
                    daily_limit: parse_opt::<u32>(get("ENRICH_DAILY_LIMIT"), "ENRICH_DAILY_LIMIT")?
                        .unwrap_or(DEFAULT_DAILY_LIMIT),
                }),
                None => None,
            };
            Some(NewsConfig {
                webhook_url,
                newsapi_key: get("NEWSAPI_KEY"),
                newsapi_page_size: s.newsapi_page_size,
                twitter_bearer: get("TWITTER_BEARER_TOKEN"),
                feeds: s.feeds,
                keywords: s.keywords,
                enricher,
                seen_path: get("NEWS_SEEN_PATH").map(PathBuf::from),
                poll_interval: poll_interval(poll_secs, "news")?,
                dispatch_pause: Duration::from_millis(s.dispatch_pause_ms),
            })
        } else {
            None
        };

        let whale = if mode.runs_whale() {
            let s = settings.whale;
            let webhook_url = get("WHALE_DISCORD_WEBHOOK_URL").ok_or_else(|| {
                anyhow!("WHALE_DISCORD_WEBHOOK_URL is required for the whale pipeline")
            })?;
            let poll_secs = parse_opt::<u64>(get("WHALE_POLL_SECS"), "WHALE_POLL_SECS")?
                .unwrap_or(s.poll_secs);
            let min_usd = parse_opt::<f64>(get("WHALE_MIN_USD"), "WHALE_MIN_USD")?
                .unwrap_or(s.min_usd);
            if !min_usd.is_finite() || min_usd < 0.0 {
                bail!("whale min_usd must be a non-negative number, got {min_usd}");
            }
            Some(WhaleConfig {
                webhook_url,
                min_usd,
                seen_path: get("WHALE_SEEN_PATH").map(PathBuf::from),
                poll_interval: poll_interval(poll_secs, "whale")?,
                dispatch_pause: Duration::from_millis(s.dispatch_pause_ms),
            })
        } else {
            None
        };

        // Two durable stores on one file would overwrite each other.
        if let (Some(n), Some(w)) = (
            news.as_ref().and_then(|n| n.seen_path.as_ref()),
            whale.as_ref().and_then(|w| w.seen_path.as_ref()),
        ) {
            if n == w {
                bail!("NEWS_SEEN_PATH and WHALE_SEEN_PATH must differ, both are {}", n.display());
            }
        }

        let metrics_addr = parse_opt::<SocketAddr>(get("METRICS_ADDR"), "METRICS_ADDR")?;

        Ok(Self {
            mode,
            news,
            whale,
            metrics_addr,
        })
    }
}

fn parse_opt<T>(v: Option<String>, key: &str) -> Result<Option<T>>
where
    T: FromStr,
    T::Err: std::error::Error + Send + Sync + 'static,
{
    v.map(|s| s.parse::<T>().with_context(|| format!("invalid {key}={s:?}")))
        .transpose()
}

fn poll_interval(secs: u64, pipeline: &str) -> Result<Duration> {
    if secs == 0 {
        bail!("{pipeline} poll interval must be at least 1 second");
    }
    Ok(Duration::from_secs(secs))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn env(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let m: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |k| m.get(k).cloned()
    }

    #[test]
    fn mode_from_args() {
        assert_eq!(PipelineMode::from_args(Vec::<String>::new()).unwrap(), PipelineMode::All);
        assert_eq!(PipelineMode::from_args(vec!["WHALE".to_string()]).unwrap(), PipelineMode::Whale);
        assert!(PipelineMode::from_args(vec!["both".to_string()]).is_err());
        assert!(PipelineMode::News.runs_news() && !PipelineMode::News.runs_whale());
    }

    #[test]
    fn whale_only_needs_only_whale_sink() {
        let cfg = AppConfig::from_lookup(
            PipelineMode::Whale,
            Settings::default(),
            env(&[("WHALE_DISCORD_WEBHOOK_URL", "https://discord.test/w"), ("WHALE_MIN_USD", "500000")]),
        )
        .unwrap();
        assert!(cfg.news.is_none());
        let w = cfg.whale.unwrap();
        assert_eq!(w.min_usd, 500_000.0);
        assert_eq!(w.poll_interval, Duration::from_secs(60));
        assert!(w.seen_path.is_none());
    }

    #[test]
    fn missing_sink_is_fatal() {
        let err = AppConfig::from_lookup(PipelineMode::All, Settings::default(), env(&[(
            "DISCORD_WEBHOOK_URL",
            "https://discord.test/n",
        )]))
        .unwrap_err();
        assert!(err.to_string().contains("WHALE_DISCORD_WEBHOOK_URL"));

        let blank = env(&[("DISCORD_WEBHOOK_URL", "   ")]);
        assert!(AppConfig::from_lookup(PipelineMode::News, Settings::default(), blank).is_err());
    }

    #[test]
    fn optional_credentials_and_overrides() {
        let cfg = AppConfig::from_lookup(
            PipelineMode::News,
            Settings::default(),
            env(&[
                ("DISCORD_WEBHOOK_URL", "https://discord.test/n"),
                ("CLAUDE_API_KEY", "sk-test"),
                ("ENRICH_DAILY_LIMIT", "25"),
                ("NEWS_POLL_SECS", "15"),
                ("NEWS_SEEN_PATH", "/var/lib/notifier/news.json"),
                ("METRICS_ADDR", "127.0.0.1:9000"),
            ]),
        )
        .unwrap();
        let n = cfg.news.unwrap();
        assert!(n.newsapi_key.is_none());
        assert!(n.twitter_bearer.is_none());
        let e = n.enricher.unwrap();
        assert_eq!(e.daily_limit, 25);
        assert!(e.model.is_none());
        assert_eq!(n.poll_interval, Duration::from_secs(15));
        assert_eq!(n.dispatch_pause, Duration::from_millis(2_000));
        assert_eq!(n.seen_path, Some(PathBuf::from("/var/lib/notifier/news.json")));
        assert_eq!(cfg.metrics_addr, Some("127.0.0.1:9000".parse().unwrap()));
    }

    #[test]
    fn shared_seen_path_is_rejected() {
        let mut vars = vec![
            ("DISCORD_WEBHOOK_URL", "https://discord.test/n"),
            ("WHALE_DISCORD_WEBHOOK_URL", "https://discord.test/w"),
            ("NEWS_SEEN_PATH", "/var/lib/notifier/seen.json"),
            ("WHALE_SEEN_PATH", "/var/lib/notifier/seen.json"),
        ];
        let err = AppConfig::from_lookup(PipelineMode::All, Settings::default(), env(&vars)).unwrap_err();
        assert!(err.to_string().contains("must differ"));

        // Only one pipeline running: no conflict.
        assert!(AppConfig::from_lookup(PipelineMode::Whale, Settings::default(), env(&vars)).is_ok());

        vars[3] = ("WHALE_SEEN_PATH", "/var/lib/notifier/whale.json");
        assert!(AppConfig::from_lookup(PipelineMode::All, Settings::default(), env(&vars)).is_ok());
    }

    #[test]
    fn bad_numbers_are_errors() {
        let base = [("DISCORD_WEBHOOK_URL", "https://discord.test/n")];
        let mut bad = base.to_vec();
        bad.push(("NEWS_POLL_SECS", "soon"));
        assert!(AppConfig::from_lookup(PipelineMode::News, Settings::default(), env(&bad)).is_err());

        let mut zero = base.to_vec();
        zero.push(("NEWS_POLL_SECS", "0"));
        assert!(AppConfig::from_lookup(PipelineMode::News, Settings::default(), env(&zero)).is_err());
    }
}
