// tests/common/mod.rs
// Shared stubs for integration tests.
#![allow(dead_code)]

use anyhow::{anyhow, Result};
use async_trait::async_trait;
use parking_lot::Mutex;
use std::sync::Arc;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::TcpListener;

use crypto_alert_notifier::analyze::{Classification, Enricher, Enrichment, Importance};
use crypto_alert_notifier::ingest::types::{NormalizedItem, SourceAdapter, SourceKind};
use crypto_alert_notifier::notify::Dispatcher;

pub fn item(title: &str, body: &str) -> NormalizedItem {
    let slug: String = title
        .chars()
        .map(|c| if c.is_ascii_alphanumeric() { c.to_ascii_lowercase() } else { '-' })
        .collect();
    NormalizedItem::new(
        SourceKind::FeedReader,
        "stub",
        title,
        format!("https://news.test/{slug}"),
    )
    .with_body(body)
}

/// Returns the same batch on every call.
pub struct StaticAdapter {
    pub name: &'static str,
    pub items: Vec<NormalizedItem>,
}

impl StaticAdapter {
    pub fn boxed(name: &'static str, items: Vec<NormalizedItem>) -> Box<dyn SourceAdapter> {
        Box::new(Self { name, items })
    }
}

#[async_trait]
impl SourceAdapter for StaticAdapter {
    async fn fetch_latest(&self) -> Result<Vec<NormalizedItem>> {
        Ok(self.items.clone())
    }
    fn name(&self) -> &'static str {
        self.name
    }
    fn kind(&self) -> SourceKind {
        SourceKind::FeedReader
    }
}

pub struct FailingAdapter;

#[async_trait]
impl SourceAdapter for FailingAdapter {
    async fn fetch_latest(&self) -> Result<Vec<NormalizedItem>> {
        Err(anyhow!("upstream 503"))
    }
    fn name(&self) -> &'static str {
        "failing"
    }
    fn kind(&self) -> SourceKind {
        SourceKind::RestSearch
    }
}

pub struct PanickingAdapter;

#[async_trait]
impl SourceAdapter for PanickingAdapter {
    async fn fetch_latest(&self) -> Result<Vec<NormalizedItem>> {
        panic!("adapter bug");
    }
    fn name(&self) -> &'static str {
        "panicking"
    }
    fn kind(&self) -> SourceKind {
        SourceKind::SocialSearch
    }
}

/// Records every send; answers with `ok`.
#[derive(Default)]
pub struct RecordingDispatcher {
    pub sent: Mutex<Vec<(NormalizedItem, Option<Classification>)>>,
    pub fail: bool,
}

impl RecordingDispatcher {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn failing() -> Arc<Self> {
        Arc::new(Self {
            fail: true,
            ..Self::default()
        })
    }

    pub fn titles(&self) -> Vec<String> {
        self.sent.lock().iter().map(|(i, _)| i.title.clone()).collect()
    }

    pub fn count(&self) -> usize {
        self.sent.lock().len()
    }
}

#[async_trait]
impl Dispatcher for RecordingDispatcher {
    async fn send(&self, item: &NormalizedItem, analysis: Option<&Classification>) -> bool {
        self.sent.lock().push((item.clone(), analysis.cloned()));
        !self.fail
    }
    fn name(&self) -> &'static str {
        "recording"
    }
}

/// Classifies every item with a fixed importance and counts calls.
pub struct FixedEnricher {
    pub importance: Importance,
    pub calls: Mutex<usize>,
}

impl FixedEnricher {
    pub fn new(importance: Importance) -> Arc<Self> {
        Arc::new(Self {
            importance,
            calls: Mutex::new(0),
        })
    }
}

#[async_trait]
impl Enricher for FixedEnricher {
    async fn classify(&self, _title: &str, _body: &str) -> Enrichment {
        *self.calls.lock() += 1;
        if self.importance == Importance::Skippable {
            return Enrichment::Skip;
        }
        Enrichment::Classified(Classification {
            importance: self.importance,
            ..Classification::default()
        })
    }
    fn name(&self) -> &'static str {
        "fixed"
    }
}

/// Minimal HTTP/1.1 server: answers every request with `status` and an
/// empty body, recording request bodies. Returns the base URL.
pub async fn http_stub(status: u16) -> (String, Arc<Mutex<Vec<String>>>) {
    http_stub_with(status, "").await
}

/// Same as `http_stub`, replying with a JSON `body`.
pub async fn http_stub_with(status: u16, body: &str) -> (String, Arc<Mutex<Vec<String>>>) {
    let reply = body.to_string();
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    let bodies = Arc::new(Mutex::new(Vec::new()));
    let seen = bodies.clone();

    tokio::spawn(async move {
        loop {
            let Ok((mut sock, _)) = listener.accept().await else {
                break;
            };
            let seen = seen.clone();
            let reply = reply.clone();
            tokio::spawn(async move {
                let body = read_request_body(&mut sock).await;
                seen.lock().push(body);
                let reason = if status < 300 { "OK" } else { "ERR" };
                let resp = format!(
                    "HTTP/1.1 {status} {reason}\r\ncontent-type: application/json\r\ncontent-length: {}\r\nconnection: close\r\n\r\n{reply}",
                    reply.len()
                );
                let _ = sock.write_all(resp.as_bytes()).await;
                let _ = sock.shutdown().await;
            });
        }
    });

    (format!("http://{addr}"), bodies)
}

async fn read_request_body(sock: &mut tokio::net::TcpStream) -> String {
    let mut buf = Vec::new();
    let mut chunk = [0u8; 4096];
    loop {
        let n = match sock.read(&mut chunk).await {
            Ok(0) | Err(_) => break,
            Ok(n) => n,
        };
        buf.extend_from_slice(&chunk[..n]);
        if let Some(end) = find_header_end(&buf) {
            let head = String::from_utf8_lossy(&buf[..end]).to_ascii_lowercase();
            let len = head
                .lines()
                .find_map(|l| l.strip_prefix("content-length:"))
                .and_then(|v| v.trim().parse::<usize>().ok())
                .unwrap_or(0);
            if buf.len() >= end + 4 + len {
                return String::from_utf8_lossy(&buf[end + 4..end + 4 + len]).into_owned();
            }
        }
    }
    String::new()
}

fn find_header_end(buf: &[u8]) -> Option<usize> {
    buf.windows(4).position(|w| w == b"\r\n\r\n")
}
