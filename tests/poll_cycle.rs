//! Integration tests for the poll cycle engine: since-last-check detection,
//! global delivery ordering, and failure isolation per feed.
//!
//! Each test stands up its own wiremock server(s) and an in-memory registry;
//! deliveries are captured with the recording transport.

use chrono::{DateTime, Duration as ChronoDuration, Utc};
use feedwatch::feed::FeedFetcher;
use feedwatch::poller::run_cycle;
use feedwatch::registry::Registry;
use feedwatch::transport::{Destination, RecordingTransport};
use pretty_assertions::assert_eq;
use std::sync::Arc;
use std::time::Duration;
use wiremock::matchers::method;
use wiremock::{Mock, MockServer, ResponseTemplate};

/// Build an RSS document with the given (title, link, pub date) items.
/// A `None` date emits an item without a pubDate element.
fn rss_feed(title: &str, items: &[(&str, &str, Option<DateTime<Utc>>)]) -> String {
    let mut body = format!(
        "<?xml version=\"1.0\"?>\n<rss version=\"2.0\"><channel><title>{}</title>",
        title
    );
    for (item_title, link, published) in items {
        body.push_str("<item>");
        body.push_str(&format!("<title>{}</title>", item_title));
        body.push_str(&format!("<link>{}</link>", link));
        body.push_str(&format!("<guid>{}</guid>", link));
        if let Some(ts) = published {
            body.push_str(&format!("<pubDate>{}</pubDate>", ts.to_rfc2822()));
        }
        body.push_str("</item>");
    }
    body.push_str("</channel></rss>");
    body
}

async fn serve_feed(server: &MockServer, body: String) {
    Mock::given(method("GET"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_string(body)
                .insert_header("Content-Type", "application/xml"),
        )
        .mount(server)
        .await;
}

fn quick_fetcher() -> FeedFetcher {
    FeedFetcher::with_retry_policy(reqwest::Client::new(), 3, Duration::ZERO)
}

/// A base time safely in the past so every entry humanizes as "ago".
fn base_time() -> DateTime<Utc> {
    Utc::now() - ChronoDuration::hours(2)
}

#[tokio::test]
async fn test_cycle_delivers_entries_newer_than_last_check() {
    let t0 = base_time();
    let server = MockServer::start().await;
    serve_feed(
        &server,
        rss_feed(
            "Example Feed",
            &[
                ("Old", "https://example.com/old", Some(t0 - ChronoDuration::seconds(10))),
                ("Mid", "https://example.com/mid", Some(t0 + ChronoDuration::seconds(5))),
                ("New", "https://example.com/new", Some(t0 + ChronoDuration::seconds(15))),
            ],
        ),
    )
    .await;

    let registry = Registry::new();
    registry.join(
        "Example Feed",
        &format!("{}/feed", server.uri()),
        None,
        t0,
        Destination::group("room-a"),
    );

    let transport = RecordingTransport::new();
    run_cycle(&registry, &quick_fetcher(), &transport).await;

    let sent = transport.sent();
    assert_eq!(sent.len(), 2);
    assert!(sent[0].text.starts_with("[Mid](https://example.com/mid)"));
    assert!(sent[1].text.starts_with("[New](https://example.com/new)"));
    assert_eq!(sent[0].destination, "room-a");

    // The high-water mark advances to the newest entry overall.
    assert_eq!(
        registry.get("Example Feed").unwrap().last_check,
        t0 + ChronoDuration::seconds(15)
    );
}

#[tokio::test]
async fn test_delivery_order_is_global_across_feeds() {
    let t0 = base_time();
    let server_a = MockServer::start().await;
    let server_b = MockServer::start().await;

    // Feed A's entries straddle feed B's in time; feeds also emit their
    // entries newest-first, so delivery order must come from sorting.
    serve_feed(
        &server_a,
        rss_feed(
            "Feed A",
            &[
                ("A2", "https://a.example.com/2", Some(t0 + ChronoDuration::seconds(30))),
                ("A1", "https://a.example.com/1", Some(t0 + ChronoDuration::seconds(10))),
            ],
        ),
    )
    .await;
    serve_feed(
        &server_b,
        rss_feed(
            "Feed B",
            &[
                ("B2", "https://b.example.com/2", Some(t0 + ChronoDuration::seconds(40))),
                ("B1", "https://b.example.com/1", Some(t0 + ChronoDuration::seconds(20))),
            ],
        ),
    )
    .await;

    let registry = Registry::new();
    registry.join(
        "Feed A",
        &format!("{}/feed", server_a.uri()),
        None,
        t0,
        Destination::group("room-a"),
    );
    registry.join(
        "Feed B",
        &format!("{}/feed", server_b.uri()),
        None,
        t0,
        Destination::group("room-b"),
    );

    let transport = RecordingTransport::new();
    run_cycle(&registry, &quick_fetcher(), &transport).await;

    let titles: Vec<String> = transport
        .sent()
        .iter()
        .map(|m| m.text.split(']').next().unwrap().trim_start_matches('[').to_string())
        .collect();
    assert_eq!(titles, vec!["A1", "B1", "A2", "B2"]);
}

#[tokio::test]
async fn test_quiet_cycle_leaves_last_check_unchanged() {
    let t0 = base_time();
    let server = MockServer::start().await;
    serve_feed(
        &server,
        rss_feed(
            "Quiet Feed",
            &[
                ("Seen 1", "https://example.com/1", Some(t0 - ChronoDuration::minutes(10))),
                ("Seen 2", "https://example.com/2", Some(t0 - ChronoDuration::minutes(5))),
            ],
        ),
    )
    .await;

    let registry = Registry::new();
    registry.join(
        "Quiet Feed",
        &format!("{}/feed", server.uri()),
        None,
        t0,
        Destination::group("room-a"),
    );

    let transport = RecordingTransport::new();
    run_cycle(&registry, &quick_fetcher(), &transport).await;

    assert!(transport.sent().is_empty());
    assert_eq!(registry.get("Quiet Feed").unwrap().last_check, t0);
}

#[tokio::test]
async fn test_failed_fetch_leaves_subscription_untouched() {
    let t0 = base_time();
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(500))
        .expect(3) // The fetcher burns its whole retry budget
        .mount(&server)
        .await;

    let registry = Registry::new();
    let url = format!("{}/feed", server.uri());
    registry.join("Broken Feed", &url, None, t0, Destination::group("room-a"));
    let before = registry.get("Broken Feed").unwrap();

    let transport = RecordingTransport::new();
    run_cycle(&registry, &quick_fetcher(), &transport).await;

    assert!(transport.sent().is_empty());
    let after = registry.get("Broken Feed").unwrap();
    assert_eq!(after.url, before.url);
    assert_eq!(after.last_check, before.last_check);
    assert_eq!(after.destinations.len(), before.destinations.len());
}

#[tokio::test]
async fn test_one_bad_feed_does_not_abort_the_cycle() {
    let t0 = base_time();
    let bad = MockServer::start().await;
    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(404))
        .mount(&bad)
        .await;

    let good = MockServer::start().await;
    serve_feed(
        &good,
        rss_feed(
            "Good Feed",
            &[("Fresh", "https://example.com/fresh", Some(t0 + ChronoDuration::seconds(5)))],
        ),
    )
    .await;

    let registry = Registry::new();
    registry.join(
        "Bad Feed",
        &format!("{}/feed", bad.uri()),
        None,
        t0,
        Destination::group("room-a"),
    );
    registry.join(
        "Good Feed",
        &format!("{}/feed", good.uri()),
        None,
        t0,
        Destination::group("room-a"),
    );

    let transport = RecordingTransport::new();
    run_cycle(&registry, &quick_fetcher(), &transport).await;

    let sent = transport.sent();
    assert_eq!(sent.len(), 1);
    assert!(sent[0].text.starts_with("[Fresh]"));
}

#[tokio::test]
async fn test_every_destination_receives_each_entry() {
    let t0 = base_time();
    let server = MockServer::start().await;
    serve_feed(
        &server,
        rss_feed(
            "Shared Feed",
            &[("Hot", "https://example.com/hot", Some(t0 + ChronoDuration::seconds(5)))],
        ),
    )
    .await;

    let registry = Registry::new();
    let url = format!("{}/feed", server.uri());
    registry.join("Shared Feed", &url, None, t0, Destination::group("room-a"));
    registry.join("Shared Feed", &url, None, t0, Destination::direct("user-b"));

    let transport = RecordingTransport::new();
    run_cycle(&registry, &quick_fetcher(), &transport).await;

    let sent = transport.sent();
    assert_eq!(sent.len(), 2);
    let mut destinations: Vec<&str> = sent.iter().map(|m| m.destination.as_str()).collect();
    destinations.sort();
    assert_eq!(destinations, vec!["room-a", "user-b"]);
}

#[tokio::test]
async fn test_entries_without_timestamps_are_excluded() {
    let t0 = base_time();
    let server = MockServer::start().await;
    serve_feed(
        &server,
        rss_feed(
            "Mixed Feed",
            &[
                ("Dated", "https://example.com/dated", Some(t0 + ChronoDuration::seconds(5))),
                ("Undated", "https://example.com/undated", None),
            ],
        ),
    )
    .await;

    let registry = Registry::new();
    registry.join(
        "Mixed Feed",
        &format!("{}/feed", server.uri()),
        None,
        t0,
        Destination::group("room-a"),
    );

    let transport = RecordingTransport::new();
    run_cycle(&registry, &quick_fetcher(), &transport).await;

    let sent = transport.sent();
    assert_eq!(sent.len(), 1);
    assert!(sent[0].text.starts_with("[Dated]"));
    assert_eq!(
        registry.get("Mixed Feed").unwrap().last_check,
        t0 + ChronoDuration::seconds(5)
    );
}

#[tokio::test]
async fn test_empty_feed_is_skipped_without_state_change() {
    let t0 = base_time();
    let server = MockServer::start().await;
    serve_feed(&server, rss_feed("Empty Feed", &[])).await;

    let registry = Registry::new();
    registry.join(
        "Empty Feed",
        &format!("{}/feed", server.uri()),
        None,
        t0,
        Destination::group("room-a"),
    );

    let transport = RecordingTransport::new();
    run_cycle(&registry, &quick_fetcher(), &transport).await;

    assert!(transport.sent().is_empty());
    assert_eq!(registry.get("Empty Feed").unwrap().last_check, t0);
}

#[tokio::test]
async fn test_second_cycle_delivers_nothing_new() {
    let t0 = base_time();
    let server = MockServer::start().await;
    serve_feed(
        &server,
        rss_feed(
            "Steady Feed",
            &[("Once", "https://example.com/once", Some(t0 + ChronoDuration::seconds(5)))],
        ),
    )
    .await;

    let registry = Registry::new();
    registry.join(
        "Steady Feed",
        &format!("{}/feed", server.uri()),
        None,
        t0,
        Destination::group("room-a"),
    );

    let fetcher = quick_fetcher();
    let transport = RecordingTransport::new();
    run_cycle(&registry, &fetcher, &transport).await;
    assert_eq!(transport.take().len(), 1);

    // Same body again: everything is at or below the high-water mark now.
    run_cycle(&registry, &fetcher, &transport).await;
    assert!(transport.sent().is_empty());
    assert_eq!(
        registry.get("Steady Feed").unwrap().last_check,
        t0 + ChronoDuration::seconds(5)
    );
}

#[tokio::test]
async fn test_new_entries_appearing_between_cycles_are_delivered() {
    let t0 = base_time();
    let server = MockServer::start().await;
    let url = format!("{}/feed", server.uri());

    serve_feed(
        &server,
        rss_feed(
            "Live Feed",
            &[("First", "https://example.com/1", Some(t0 + ChronoDuration::seconds(5)))],
        ),
    )
    .await;

    let registry = Arc::new(Registry::new());
    registry.join("Live Feed", &url, None, t0, Destination::group("room-a"));

    let fetcher = quick_fetcher();
    let transport = RecordingTransport::new();
    run_cycle(&registry, &fetcher, &transport).await;
    assert_eq!(transport.take().len(), 1);

    // The feed publishes a newer entry between cycles.
    server.reset().await;
    serve_feed(
        &server,
        rss_feed(
            "Live Feed",
            &[
                ("Second", "https://example.com/2", Some(t0 + ChronoDuration::seconds(60))),
                ("First", "https://example.com/1", Some(t0 + ChronoDuration::seconds(5))),
            ],
        ),
    )
    .await;

    run_cycle(&registry, &fetcher, &transport).await;
    let sent = transport.sent();
    assert_eq!(sent.len(), 1);
    assert!(sent[0].text.starts_with("[Second]"));
    assert_eq!(
        registry.get("Live Feed").unwrap().last_check,
        t0 + ChronoDuration::seconds(60)
    );
}
