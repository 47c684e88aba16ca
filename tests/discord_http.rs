// tests/discord_http.rs
mod common;

use common::{http_stub, item};
use crypto_alert_notifier::notify::{DiscordDispatcher, Dispatcher};

#[tokio::test]
async fn no_content_counts_as_delivered() {
    let (url, bodies) = http_stub(204).await;
    let d = DiscordDispatcher::new(format!("{url}/api/webhooks/1/abc")).unwrap();
    assert!(d.send(&item("Bitcoin tops 100k", "ETF flows"), None).await);

    let bodies = bodies.lock();
    assert_eq!(bodies.len(), 1);
    let v: serde_json::Value = serde_json::from_str(&bodies[0]).unwrap();
    assert_eq!(v["embeds"][0]["title"], "📰 Bitcoin tops 100k");
    assert_eq!(v["embeds"][0]["description"], "ETF flows");
}

#[tokio::test]
async fn ok_counts_as_delivered() {
    let (url, _) = http_stub(200).await;
    let d = DiscordDispatcher::new(url).unwrap();
    assert!(d.send(&item("t", "b"), None).await);
}

#[tokio::test]
async fn server_error_is_a_failure_without_retry() {
    let (url, bodies) = http_stub(500).await;
    let d = DiscordDispatcher::new(url).unwrap();
    assert!(!d.send(&item("t", "b"), None).await);
    assert_eq!(bodies.lock().len(), 1);
}

#[tokio::test]
async fn unreachable_sink_is_a_failure() {
    // Bind then drop to get a port nothing listens on.
    let port = {
        let l = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
        l.local_addr().unwrap().port()
    };
    let d = DiscordDispatcher::new(format!("http://127.0.0.1:{port}/hook"))
        .unwrap()
        .with_timeout(2);
    assert!(!d.send(&item("t", "b"), None).await);
}
