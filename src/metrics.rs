// src/metrics.rs
use anyhow::{Context, Result};
use metrics::{describe_counter, describe_gauge, describe_histogram};
use metrics_exporter_prometheus::PrometheusBuilder;
use once_cell::sync::OnceCell;
use std::net::SocketAddr;

/// One-time metrics registration (so series show up on the scrape endpoint).
pub fn ensure_metrics_described() {
    static ONCE: OnceCell<()> = OnceCell::new();
    ONCE.get_or_init(|| {
        describe_counter!(
            "notifier_items_fetched_total",
            "Items returned by source adapters."
        );
        describe_counter!(
            "notifier_adapter_errors_total",
            "Adapter fetch/parse failures converted to empty results."
        );
        describe_counter!(
            "notifier_items_new_total",
            "Items whose fingerprint was not seen before."
        );
        describe_counter!(
            "notifier_items_duplicate_total",
            "Items dropped because their fingerprint was already recorded."
        );
        describe_counter!(
            "notifier_enrich_skipped_total",
            "Items the enricher marked as skip."
        );
        describe_counter!(
            "notifier_dispatch_total",
            "Dispatch attempts by outcome."
        );
        describe_counter!(
            "notifier_store_persist_errors_total",
            "Failed writes of the durable fingerprint store."
        );
        describe_histogram!("notifier_cycle_ms", "Cycle duration in milliseconds.");
        describe_gauge!(
            "notifier_cycle_last_run_ts",
            "Unix ts when the pipeline last completed a cycle."
        );
    });
}

/// Install the Prometheus recorder with its own HTTP listener on `addr`.
/// Must be called from within a tokio runtime.
pub fn install_exporter(addr: SocketAddr) -> Result<()> {
    PrometheusBuilder::new()
        .with_http_listener(addr)
        .install()
        .with_context(|| format!("installing prometheus exporter on {addr}"))?;
    ensure_metrics_described();
    tracing::info!(%addr, "prometheus exporter listening");
    Ok(())
}
