// tests/pipeline.rs
mod common;

use std::sync::Arc;
use std::time::Duration;

use common::{item, FixedEnricher, RecordingDispatcher, StaticAdapter};
use crypto_alert_notifier::analyze::Importance;
use crypto_alert_notifier::driver::{Driver, DriverState, Pipeline};
use crypto_alert_notifier::ingest::types::{NormalizedItem, SourceAdapter, SourceKind};
use crypto_alert_notifier::store::{DurableStore, FingerprintStore, MemoryStore};
use tokio_util::sync::CancellationToken;

fn two_sources() -> Vec<Box<dyn SourceAdapter>> {
    vec![
        StaticAdapter::boxed("wire", vec![item("ETF approved", "SEC signs off"), item("Miners sell", "")]),
        // Same story with different case and padding from a second source.
        StaticAdapter::boxed("search", vec![item("  etf APPROVED ", "sec signs off  ")]),
    ]
}

#[tokio::test]
async fn dedup_holds_across_cycles_and_adapters() {
    let sink = RecordingDispatcher::new();
    let mut p = Pipeline::new("news", two_sources(), Box::new(MemoryStore::new()), sink.clone());

    let first = p.run_cycle().await;
    assert_eq!(first.fetched, 3);
    assert_eq!(first.new, 2);
    assert_eq!(first.duplicates, 1);
    assert_eq!(first.dispatched, 2);

    let second = p.run_cycle().await;
    assert_eq!(second.new, 0);
    assert_eq!(second.duplicates, 3);

    assert_eq!(sink.titles(), vec!["ETF approved", "Miners sell"]);
    assert_eq!(p.seen(), 2);
}

#[tokio::test]
async fn skippable_items_are_never_dispatched() {
    let sink = RecordingDispatcher::new();
    let enricher = FixedEnricher::new(Importance::Skippable);
    let mut p = Pipeline::new("news", two_sources(), Box::new(MemoryStore::new()), sink.clone())
        .with_enricher(enricher.clone());

    let r = p.run_cycle().await;
    assert_eq!(r.skipped, 2);
    assert_eq!(sink.count(), 0);
    assert_eq!(*enricher.calls.lock(), 2);

    // Skipped items stay recorded and are not re-classified.
    p.run_cycle().await;
    assert_eq!(*enricher.calls.lock(), 2);
}

#[tokio::test]
async fn classification_travels_with_the_item() {
    let sink = RecordingDispatcher::new();
    let mut p = Pipeline::new("news", two_sources(), Box::new(MemoryStore::new()), sink.clone())
        .with_enricher(FixedEnricher::new(Importance::High));
    p.run_cycle().await;

    let sent = sink.sent.lock();
    assert_eq!(sent.len(), 2);
    assert!(sent
        .iter()
        .all(|(_, c)| c.as_ref().map(|c| c.importance) == Some(Importance::High)));
}

#[tokio::test]
async fn failed_dispatch_is_not_retried() {
    let sink = RecordingDispatcher::failing();
    let mut p = Pipeline::new("news", two_sources(), Box::new(MemoryStore::new()), sink.clone());
    let r = p.run_cycle().await;
    assert_eq!(r.failed, 2);
    p.run_cycle().await;
    assert_eq!(sink.count(), 2);
}

#[tokio::test]
async fn durable_store_survives_restart() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("news_seen.json");

    let sink = RecordingDispatcher::new();
    let mut p = Pipeline::new("news", two_sources(), Box::new(DurableStore::open(&path)), sink.clone());
    p.run_cycle().await;
    assert_eq!(sink.count(), 2);
    drop(p);

    // Fresh process: new pipeline, same file.
    let reopened = DurableStore::open(&path);
    assert_eq!(reopened.len(), 2);
    let sink2 = RecordingDispatcher::new();
    let mut p2 = Pipeline::new("news", two_sources(), Box::new(reopened), sink2.clone());
    let r = p2.run_cycle().await;
    assert_eq!(r.new, 0);
    assert_eq!(sink2.count(), 0);
}

#[tokio::test]
async fn preloaded_fingerprint_is_never_dispatched() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("seen.json");
    let fp = item("Miners sell", "").fingerprint();
    std::fs::write(&path, serde_json::to_string(&vec![fp.as_str()]).unwrap()).unwrap();

    let sink = RecordingDispatcher::new();
    let mut p = Pipeline::new("news", two_sources(), Box::new(DurableStore::open(&path)), sink.clone());
    p.run_cycle().await;
    assert_eq!(sink.titles(), vec!["ETF approved"]);
}

#[tokio::test]
async fn dispatches_are_paced() {
    let sink = RecordingDispatcher::new();
    let mut p = Pipeline::new("news", two_sources(), Box::new(MemoryStore::new()), sink.clone())
        .with_dispatch_pause(Duration::from_millis(50));
    let started = std::time::Instant::now();
    p.run_cycle().await;
    // Two sends, one pause between them.
    assert!(started.elapsed() >= Duration::from_millis(50));
}

#[tokio::test]
async fn skipped_items_are_paced_too() {
    let sink = RecordingDispatcher::new();
    let enricher = FixedEnricher::new(Importance::Skippable);
    let mut p = Pipeline::new("news", two_sources(), Box::new(MemoryStore::new()), sink.clone())
        .with_enricher(enricher.clone())
        .with_dispatch_pause(Duration::from_millis(50));
    let started = std::time::Instant::now();
    p.run_cycle().await;
    // Two classifier calls, one pause between them, nothing sent.
    assert!(started.elapsed() >= Duration::from_millis(50));
    assert_eq!(*enricher.calls.lock(), 2);
    assert_eq!(sink.count(), 0);
}

/// Takes `delay` per fetch and records when each fetch started.
struct SlowAdapter {
    delay: Duration,
    starts: Arc<parking_lot::Mutex<Vec<std::time::Instant>>>,
}

#[async_trait::async_trait]
impl SourceAdapter for SlowAdapter {
    async fn fetch_latest(&self) -> anyhow::Result<Vec<NormalizedItem>> {
        self.starts.lock().push(std::time::Instant::now());
        tokio::time::sleep(self.delay).await;
        Ok(Vec::new())
    }
    fn name(&self) -> &'static str {
        "slow"
    }
    fn kind(&self) -> SourceKind {
        SourceKind::FeedReader
    }
}

fn slow_pipeline(delay: Duration) -> (Pipeline, Arc<parking_lot::Mutex<Vec<std::time::Instant>>>) {
    let starts = Arc::new(parking_lot::Mutex::new(Vec::new()));
    let adapter = SlowAdapter {
        delay,
        starts: starts.clone(),
    };
    let p = Pipeline::new(
        "news",
        vec![Box::new(adapter) as Box<dyn SourceAdapter>],
        Box::new(MemoryStore::new()),
        RecordingDispatcher::new(),
    );
    (p, starts)
}

#[tokio::test]
async fn ticks_due_during_a_long_cycle_are_dropped() {
    // Each cycle overruns the interval.
    let (p, starts) = slow_pipeline(Duration::from_millis(150));
    let cancel = CancellationToken::new();
    let handle = tokio::spawn(Driver::new(p, Duration::from_millis(100)).run(cancel.clone()));
    tokio::time::sleep(Duration::from_millis(1_000)).await;
    cancel.cancel();
    handle.await.unwrap();

    let starts = starts.lock();
    assert!(starts.len() >= 2, "cycles={}", starts.len());
    // Next cycle waits a full interval after the previous one ends.
    for pair in starts.windows(2) {
        let gap = pair[1] - pair[0];
        assert!(gap >= Duration::from_millis(240), "start-to-start {gap:?}");
    }
}

#[tokio::test]
async fn status_tracks_idle_and_running() {
    let (p, starts) = slow_pipeline(Duration::from_millis(200));
    let driver = Driver::new(p, Duration::from_secs(10));
    let status = driver.status();
    assert_eq!(status.state(), DriverState::Idle);

    let cancel = CancellationToken::new();
    let handle = tokio::spawn(driver.run(cancel.clone()));
    tokio::time::sleep(Duration::from_millis(50)).await;
    assert_eq!(status.state(), DriverState::Running);

    tokio::time::sleep(Duration::from_millis(300)).await;
    assert_eq!(status.state(), DriverState::Idle);
    cancel.cancel();
    assert_eq!(handle.await.unwrap(), 1);
    assert_eq!(starts.lock().len(), 1);
}

#[tokio::test]
async fn driver_runs_until_cancelled() {
    let sink = RecordingDispatcher::new();
    let p = Pipeline::new("news", two_sources(), Box::new(MemoryStore::new()), sink.clone());
    let driver = Driver::new(p, Duration::from_millis(20));

    let cancel = CancellationToken::new();
    let handle = tokio::spawn(driver.run(cancel.clone()));
    tokio::time::sleep(Duration::from_millis(120)).await;
    cancel.cancel();

    let cycles = tokio::time::timeout(Duration::from_secs(2), handle)
        .await
        .expect("driver stops after cancel")
        .unwrap();
    assert!(cycles >= 2);
    // Repeated cycles never re-send.
    assert_eq!(sink.count(), 2);
}

#[tokio::test]
async fn panicking_dispatcher_does_not_stop_the_driver() {
    use async_trait::async_trait;
    use crypto_alert_notifier::analyze::Classification;
    use crypto_alert_notifier::ingest::types::NormalizedItem;
    use crypto_alert_notifier::notify::Dispatcher;

    struct Boom(parking_lot::Mutex<usize>);

    #[async_trait]
    impl Dispatcher for Boom {
        async fn send(&self, _item: &NormalizedItem, _c: Option<&Classification>) -> bool {
            *self.0.lock() += 1;
            panic!("sink bug");
        }
        fn name(&self) -> &'static str {
            "boom"
        }
    }

    let boom = Arc::new(Boom(parking_lot::Mutex::new(0)));
    let p = Pipeline::new("news", two_sources(), Box::new(MemoryStore::new()), boom.clone());
    let cancel = CancellationToken::new();
    let handle = tokio::spawn(Driver::new(p, Duration::from_millis(20)).run(cancel.clone()));
    tokio::time::sleep(Duration::from_millis(120)).await;
    cancel.cancel();
    let cycles = handle.await.unwrap();

    assert!(cycles >= 2);
    // Each panic happens after the fingerprint is recorded, so every item
    // reaches the sink once.
    assert_eq!(*boom.0.lock(), 2);
}
