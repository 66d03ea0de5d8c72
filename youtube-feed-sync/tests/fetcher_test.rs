mod common;

use chrono_tz::Tz;
use common::{init_tracing, youtube_atom, StubResponse, TestServer};
use std::time::Duration;
use youtube_feed_sync::{FeedFetcher, FetchConfig, FetchError, Fetcher, Source};

fn quick_config() -> FetchConfig {
    FetchConfig {
        timeout_seconds: 2,
        max_retries: 2,
        retry_delay_seconds: 0,
        ..Default::default()
    }
}

fn source_for(server: &TestServer, id: &str) -> Source {
    Source::new(id, format!("{}/feeds/videos.xml?channel_id={}", server.base_url, id))
}

#[tokio::test]
async fn test_fetch_and_parse_feed() {
    init_tracing();
    let body = youtube_atom("UCabc", "Stub Channel", &[("vid00000001", "2024-03-01T10:00:00+00:00")]);
    let server = TestServer::start(vec![StubResponse::ok(body)]).await;
    let fetcher = Fetcher::new(quick_config()).unwrap();

    let feed = fetcher.fetch(&source_for(&server, "UCabc")).await.unwrap();

    assert_eq!(feed.channel_title.as_deref(), Some("Stub Channel"));
    assert_eq!(feed.entries.len(), 1);
    assert_eq!(server.hit_count(), 1);

    let request = &server.recorded_requests()[0];
    assert!(request.starts_with("GET /feeds/videos.xml?channel_id=UCabc"));
    assert!(request.contains("YouTube RSS Feed Fetcher/1.0"));
}

#[tokio::test]
async fn test_server_errors_are_retried() {
    init_tracing();
    let body = youtube_atom("UCabc", "Flaky", &[("vid00000001", "2024-03-01T10:00:00+00:00")]);
    let server = TestServer::start(vec![
        StubResponse::status(503, "busy"),
        StubResponse::status(502, "bad gateway"),
        StubResponse::ok(body),
    ])
    .await;
    let fetcher = Fetcher::new(quick_config()).unwrap();

    let feed = fetcher.fetch(&source_for(&server, "UCabc")).await.unwrap();

    assert_eq!(feed.entries.len(), 1);
    assert_eq!(server.hit_count(), 3);
}

#[tokio::test]
async fn test_retries_are_bounded() {
    init_tracing();
    let server = TestServer::start(vec![StubResponse::status(500, "down")]).await;
    let fetcher = Fetcher::new(quick_config()).unwrap();

    let result = fetcher.fetch(&source_for(&server, "UCdown")).await;

    match result {
        Err(FetchError::Network { source_id, cause }) => {
            assert_eq!(source_id, "UCdown");
            assert!(cause.contains("500"));
        }
        other => panic!("expected Network error, got {:?}", other.map(|f| f.entries.len())),
    }
    assert_eq!(server.hit_count(), 3);
}

#[tokio::test]
async fn test_not_found_is_not_retried() {
    init_tracing();
    let server = TestServer::start(vec![StubResponse::status(404, "no such channel")]).await;
    let fetcher = Fetcher::new(quick_config()).unwrap();

    let err = fetcher.fetch(&source_for(&server, "UCgone")).await.unwrap_err();

    assert!(matches!(err, FetchError::Network { .. }));
    assert!(err.to_string().contains("404"));
    assert_eq!(server.hit_count(), 1);
}

#[tokio::test]
async fn test_slow_source_times_out() {
    init_tracing();
    let server = TestServer::start(vec![StubResponse::ok("<feed/>").delayed(Duration::from_secs(5))]).await;
    let config = FetchConfig {
        timeout_seconds: 1,
        max_retries: 0,
        ..quick_config()
    };
    let fetcher = Fetcher::new(config).unwrap();

    let started = std::time::Instant::now();
    let err = fetcher.fetch(&source_for(&server, "UCslow")).await.unwrap_err();

    assert!(matches!(err, FetchError::Network { .. }));
    assert_eq!(err.source_id(), "UCslow");
    assert!(started.elapsed() < Duration::from_secs(4));
}

#[tokio::test]
async fn test_html_page_is_malformed() {
    init_tracing();
    let server = TestServer::start(vec![StubResponse::ok("<html><body>Consent required</body></html>")]).await;
    let fetcher = Fetcher::new(quick_config()).unwrap();

    let err = fetcher.fetch(&source_for(&server, "UChtml")).await.unwrap_err();

    assert!(matches!(err, FetchError::Malformed { .. }));
    assert_eq!(server.hit_count(), 1);
}

#[tokio::test]
async fn test_oversized_feed_is_rejected() {
    init_tracing();
    let server = TestServer::start(vec![StubResponse::ok("x".repeat(2 * 1024 * 1024))]).await;
    let config = FetchConfig {
        max_feed_size_mb: 1,
        ..quick_config()
    };
    let fetcher = Fetcher::new(config).unwrap();

    let err = fetcher.fetch(&source_for(&server, "UCbig")).await.unwrap_err();

    assert!(err.to_string().contains("too large"));
    assert_eq!(server.hit_count(), 1);
}

#[tokio::test]
async fn test_oversized_feed_without_length_is_rejected() {
    init_tracing();
    let server = TestServer::start(vec![StubResponse::ok("x".repeat(2 * 1024 * 1024)).chunked()]).await;
    let config = FetchConfig {
        max_feed_size_mb: 1,
        ..quick_config()
    };
    let fetcher = Fetcher::new(config).unwrap();

    let err = fetcher.fetch(&source_for(&server, "UCstream")).await.unwrap_err();

    assert!(err.to_string().contains("too large"));
    assert_eq!(server.hit_count(), 1);
}

#[tokio::test]
async fn test_chunked_feed_within_limit_is_read() {
    init_tracing();
    let body = youtube_atom("UCabc", "Chunked", &[("vid00000001", "2024-03-01T10:00:00+00:00")]);
    let server = TestServer::start(vec![StubResponse::ok(body).chunked()]).await;
    let fetcher = Fetcher::new(quick_config()).unwrap();

    let feed = fetcher.fetch(&source_for(&server, "UCabc")).await.unwrap();

    assert_eq!(feed.channel_title.as_deref(), Some("Chunked"));
    assert_eq!(feed.entries.len(), 1);
}

#[tokio::test]
async fn test_naive_pub_date_uses_fetcher_timezone() {
    init_tracing();
    let body = r#"<?xml version="1.0"?>
<rss version="2.0"><channel><title>Local Times</title><link>https://example.com</link>
<item><title>One</title><link>https://www.youtube.com/watch?v=abcdefghijk</link>
<pubDate>2024-05-01 10:00:00</pubDate></item>
</channel></rss>"#;
    let server = TestServer::start(vec![StubResponse::ok(body)]).await;
    let fetcher = Fetcher::new(quick_config()).unwrap().with_timezone(Tz::America__New_York);

    let feed = fetcher.fetch(&source_for(&server, "UClocal")).await.unwrap();

    // 10:00 EDT is 14:00 UTC.
    assert_eq!(feed.entries[0].published.as_deref(), Some("2024-05-01T14:00:00+00:00"));
}
