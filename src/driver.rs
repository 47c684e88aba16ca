// src/driver.rs
//! One pipeline = adapters -> dedup -> optional enrichment -> dispatch,
//! run on a fixed interval by a `Driver` until cancelled.

use futures::FutureExt;
use metrics::{counter, gauge, histogram};
use std::panic::AssertUnwindSafe;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::time::MissedTickBehavior;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info};

use crate::analyze::{Enricher, Enrichment};
use crate::ingest::collect_all;
use crate::ingest::types::SourceAdapter;
use crate::notify::Dispatcher;
use crate::store::FingerprintStore;

/// Per-cycle tallies.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CycleReport {
    pub fetched: usize,
    pub new: usize,
    pub duplicates: usize,
    pub skipped: usize,
    pub dispatched: usize,
    pub failed: usize,
}

pub struct Pipeline {
    name: &'static str,
    adapters: Vec<Box<dyn SourceAdapter>>,
    store: Box<dyn FingerprintStore>,
    enricher: Option<Arc<dyn Enricher>>,
    dispatcher: Arc<dyn Dispatcher>,
    dispatch_pause: Duration,
}

impl Pipeline {
    pub fn new(
        name: &'static str,
        adapters: Vec<Box<dyn SourceAdapter>>,
        store: Box<dyn FingerprintStore>,
        dispatcher: Arc<dyn Dispatcher>,
    ) -> Self {
        Self {
            name,
            adapters,
            store,
            enricher: None,
            dispatcher,
            dispatch_pause: Duration::ZERO,
        }
    }

    pub fn with_enricher(mut self, enricher: Arc<dyn Enricher>) -> Self {
        self.enricher = Some(enricher);
        self
    }

    /// Pause before each new item after the first, so enrichment calls and
    /// sends are both spaced out.
    pub fn with_dispatch_pause(mut self, pause: Duration) -> Self {
        self.dispatch_pause = pause;
        self
    }

    pub fn name(&self) -> &'static str {
        self.name
    }

    pub fn adapter_count(&self) -> usize {
        self.adapters.len()
    }

    pub fn has_enricher(&self) -> bool {
        self.enricher.is_some()
    }

    pub fn seen(&self) -> usize {
        self.store.len()
    }

    /// One pass. The fingerprint is recorded before enrichment, so an item
    /// that is skipped or fails to send is never retried.
    pub async fn run_cycle(&mut self) -> CycleReport {
        let started = Instant::now();
        let items = collect_all(&self.adapters).await;
        let mut report = CycleReport {
            fetched: items.len(),
            ..CycleReport::default()
        };

        for item in items {
            let fp = item.fingerprint();
            if self.store.contains(&fp) {
                report.duplicates += 1;
                counter!("notifier_items_duplicate_total", "pipeline" => self.name).increment(1);
                continue;
            }
            if report.new > 0 && !self.dispatch_pause.is_zero() {
                tokio::time::sleep(self.dispatch_pause).await;
            }
            self.store.add(fp);
            report.new += 1;
            counter!("notifier_items_new_total", "pipeline" => self.name).increment(1);
            debug!(pipeline = self.name, title = %item.title, source = %item.source_label, "new item");

            let analysis = match &self.enricher {
                Some(enricher) => match enricher.classify(&item.title, &item.body).await {
                    Enrichment::Classified(c) => Some(c),
                    Enrichment::Skip => {
                        report.skipped += 1;
                        counter!("notifier_enrich_skipped_total", "pipeline" => self.name)
                            .increment(1);
                        info!(pipeline = self.name, title = %item.title, "skipped by enricher");
                        continue;
                    }
                },
                None => None,
            };

            if self.dispatcher.send(&item, analysis.as_ref()).await {
                report.dispatched += 1;
                counter!("notifier_dispatch_total", "pipeline" => self.name, "outcome" => "ok")
                    .increment(1);
            } else {
                report.failed += 1;
                counter!("notifier_dispatch_total", "pipeline" => self.name, "outcome" => "error")
                    .increment(1);
            }
        }

        histogram!("notifier_cycle_ms", "pipeline" => self.name)
            .record(started.elapsed().as_secs_f64() * 1000.0);
        gauge!("notifier_cycle_last_run_ts", "pipeline" => self.name)
            .set(chrono::Utc::now().timestamp() as f64);
        report
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DriverState {
    Idle,
    Running,
}

/// Shared view of a driver's state, readable while `run` owns the driver.
#[derive(Debug, Clone, Default)]
pub struct DriverStatus(Arc<AtomicBool>);

impl DriverStatus {
    pub fn state(&self) -> DriverState {
        if self.0.load(Ordering::Acquire) {
            DriverState::Running
        } else {
            DriverState::Idle
        }
    }

    fn set(&self, state: DriverState) {
        self.0.store(state == DriverState::Running, Ordering::Release);
    }
}

pub struct Driver {
    pipeline: Pipeline,
    interval: Duration,
    status: DriverStatus,
}

impl Driver {
    pub fn new(pipeline: Pipeline, interval: Duration) -> Self {
        Self {
            pipeline,
            interval,
            status: DriverStatus::default(),
        }
    }

    pub fn status(&self) -> DriverStatus {
        self.status.clone()
    }

    pub fn pipeline(&self) -> &Pipeline {
        &self.pipeline
    }

    /// Runs a cycle on every tick until `cancel` fires. The first tick is
    /// immediate. Cancellation is observed only between cycles. Ticks that
    /// fall due while a cycle runs are dropped; the next cycle starts one
    /// full interval after the previous one finished. Returns the number of
    /// cycles started.
    pub async fn run(mut self, cancel: CancellationToken) -> u64 {
        let name = self.pipeline.name;
        let mut ticker = tokio::time::interval(self.interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);
        info!(pipeline = name, interval_secs = self.interval.as_secs(), "driver started");

        let mut cycles = 0u64;
        loop {
            tokio::select! {
                biased;
                _ = cancel.cancelled() => {
                    info!(pipeline = name, cycles, "driver shutting down");
                    break;
                }
                _ = ticker.tick() => {}
            }

            self.status.set(DriverState::Running);
            cycles += 1;
            match AssertUnwindSafe(self.pipeline.run_cycle()).catch_unwind().await {
                Ok(r) => info!(
                    pipeline = name,
                    fetched = r.fetched,
                    new = r.new,
                    duplicates = r.duplicates,
                    skipped = r.skipped,
                    dispatched = r.dispatched,
                    failed = r.failed,
                    "cycle complete"
                ),
                Err(_) => error!(pipeline = name, "cycle panicked; waiting for next tick"),
            }
            self.status.set(DriverState::Idle);
            ticker.reset();
        }
        cycles
    }
}
