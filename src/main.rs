//! crypto-alert-notifier binary entrypoint.
//! Loads configuration, starts one driver per enabled pipeline and runs
//! until Ctrl-C / SIGTERM.

use anyhow::{Context, Result};
use tokio_util::sync::CancellationToken;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use crypto_alert_notifier::app::build_drivers;
use crypto_alert_notifier::config::{load_settings_default, AppConfig, PipelineMode};
use crypto_alert_notifier::metrics::{ensure_metrics_described, install_exporter};

/// Compact human logs by default; JSON lines when LOG_FORMAT=json.
fn init_tracing() {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("crypto_alert_notifier=info,warn"));

    let json = std::env::var("LOG_FORMAT")
        .map(|v| v.eq_ignore_ascii_case("json"))
        .unwrap_or(false);

    let registry = tracing_subscriber::registry().with(filter);
    if json {
        registry.with(fmt::layer().json()).init();
    } else {
        registry.with(fmt::layer().compact()).init();
    }
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            tracing::error!(error = ?e, "cannot listen for ctrl-c");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut s) => {
                s.recv().await;
            }
            Err(e) => {
                tracing::error!(error = ?e, "cannot listen for SIGTERM");
                std::future::pending::<()>().await;
            }
        }
    };
    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    // Load .env when present; no-op otherwise.
    let _ = dotenvy::dotenv();
    init_tracing();

    let mode = PipelineMode::from_args(std::env::args().skip(1))?;
    let settings = load_settings_default().context("loading settings")?;
    let cfg = AppConfig::from_env(mode, settings).context("loading configuration")?;

    match cfg.metrics_addr {
        Some(addr) => install_exporter(addr)?,
        None => ensure_metrics_described(),
    }

    let drivers = build_drivers(&cfg)?;
    tracing::info!(%mode, pipelines = drivers.len(), "crypto alert notifier starting");

    let cancel = CancellationToken::new();
    let handles: Vec<_> = drivers
        .into_iter()
        .map(|d| tokio::spawn(d.run(cancel.child_token())))
        .collect();

    shutdown_signal().await;
    tracing::info!("shutdown requested; finishing in-flight cycles");
    cancel.cancel();

    for h in handles {
        if let Err(e) = h.await {
            tracing::error!(error = ?e, "driver task ended abnormally");
        }
    }
    tracing::info!("stopped");
    Ok(())
}
