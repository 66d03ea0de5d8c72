#![allow(dead_code)]

use async_trait::async_trait;
use chrono::{DateTime, FixedOffset};
use std::collections::{HashMap, HashSet};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex, Once};
use std::time::Duration;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::TcpListener;
use youtube_feed_sync::record_store::StoreRecord;
use youtube_feed_sync::{
    FeedFetcher, FetchError, FetchedFeed, InMemoryRecordStore, RawEntry, RecordStore, Source, SyncError,
    VideoRecord,
};

static INIT: Once = Once::new();

pub fn init_tracing() {
    INIT.call_once(|| {
        let _ = tracing_subscriber::fmt()
            .with_max_level(tracing::Level::DEBUG)
            .with_test_writer()
            .try_init();
    });
}

pub fn ts(value: &str) -> DateTime<FixedOffset> {
    DateTime::parse_from_rfc3339(value).unwrap()
}

pub fn words(n: usize) -> String {
    (1..=n).map(|i| format!("word{}", i)).collect::<Vec<_>>().join(" ")
}

pub fn raw_entry(video_id: &str, published: &str) -> RawEntry {
    RawEntry {
        title: Some(format!("Video {}", video_id)),
        link: Some(format!("https://www.youtube.com/watch?v={}", video_id)),
        published: Some(published.to_string()),
        description: Some(format!("Description of {}", video_id)),
        thumbnail_url: None,
        guid: Some(format!("yt:video:{}", video_id)),
    }
}

pub fn fetched(channel_title: &str, entries: Vec<RawEntry>) -> FetchedFeed {
    FetchedFeed {
        channel_title: Some(channel_title.to_string()),
        channel_link: Some(format!("https://www.youtube.com/channel/{}", channel_title)),
        entries,
        warning: None,
    }
}

pub fn video(id: &str, channel: &str, published: &str) -> VideoRecord {
    VideoRecord {
        id: id.to_string(),
        title: format!("Video {}", id),
        channel_title: channel.to_string(),
        channel_link: format!("https://www.youtube.com/channel/{}", channel),
        published_at: ts(published),
        description: format!("Full description of {}\nSecond line", id),
        summary: format!("Full description of {} Second line", id),
        preview_link: format!("https://www.youtube.com/watch?v={}", id),
        app_link: format!("vnd.youtube://{}", id),
        thumbnail_url: Some(format!("https://i.ytimg.com/vi/{}/hqdefault.jpg", id)),
    }
}

/// A YouTube-style Atom document with one `<entry>` per `(video_id, published)` pair.
pub fn youtube_atom(channel_id: &str, channel_title: &str, videos: &[(&str, &str)]) -> String {
    let entries: String = videos
        .iter()
        .map(|(id, published)| {
            format!(
                r#"
 <entry>
  <id>yt:video:{id}</id>
  <yt:videoId>{id}</yt:videoId>
  <yt:channelId>{channel_id}</yt:channelId>
  <title>Video {id}</title>
  <link rel="alternate" href="https://www.youtube.com/watch?v={id}"/>
  <author>
   <name>{channel_title}</name>
   <uri>https://www.youtube.com/channel/{channel_id}</uri>
  </author>
  <published>{published}</published>
  <updated>{published}</updated>
  <media:group>
   <media:title>Video {id}</media:title>
   <media:content url="https://www.youtube.com/v/{id}?version=3" type="application/x-shockwave-flash" width="640" height="390"/>
   <media:thumbnail url="https://i4.ytimg.com/vi/{id}/hqdefault.jpg" width="480" height="360"/>
   <media:description>About {id}.
Check it out: https://example.com/{id}
#tag #video</media:description>
  </media:group>
 </entry>"#
            )
        })
        .collect();

    format!(
        r#"<?xml version="1.0" encoding="UTF-8"?>
<feed xmlns:yt="http://www.youtube.com/xml/schemas/2015" xmlns:media="http://search.yahoo.com/mrss/" xmlns="http://www.w3.org/2005/Atom">
 <link rel="self" href="http://www.youtube.com/feeds/videos.xml?channel_id={channel_id}"/>
 <id>yt:channel:{channel_id}</id>
 <yt:channelId>{channel_id}</yt:channelId>
 <title>{channel_title}</title>
 <link rel="alternate" href="https://www.youtube.com/channel/{channel_id}"/>
 <published>2020-01-01T00:00:00+00:00</published>{entries}
</feed>"#
    )
}

/// Returns canned results per source id; unknown sources time out.
#[derive(Default)]
pub struct StubFetcher {
    results: HashMap<String, Result<FetchedFeed, FetchError>>,
    pub calls: AtomicUsize,
}

impl StubFetcher {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_feed(mut self, source_id: &str, feed: FetchedFeed) -> Self {
        self.results.insert(source_id.to_string(), Ok(feed));
        self
    }

    pub fn with_error(mut self, source_id: &str, error: FetchError) -> Self {
        self.results.insert(source_id.to_string(), Err(error));
        self
    }
}

#[async_trait]
impl FeedFetcher for StubFetcher {
    async fn fetch(&self, source: &Source) -> Result<FetchedFeed, FetchError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.results.get(&source.id).cloned().unwrap_or_else(|| {
            Err(FetchError::Network {
                source_id: source.id.clone(),
                cause: "operation timed out".to_string(),
            })
        })
    }
}

/// In-memory store that refuses to create the listed keys.
pub struct FlakyStore {
    pub inner: InMemoryRecordStore,
    failing: HashSet<String>,
}

impl FlakyStore {
    pub fn failing_on(keys: &[&str]) -> Self {
        Self {
            inner: InMemoryRecordStore::new(),
            failing: keys.iter().map(|k| k.to_string()).collect(),
        }
    }
}

#[async_trait]
impl RecordStore for FlakyStore {
    fn store_name(&self) -> String {
        "flaky".to_string()
    }

    async fn exists(&self, key: &str) -> Result<bool, SyncError> {
        self.inner.exists(key).await
    }

    async fn create(&self, record: &StoreRecord) -> Result<(), SyncError> {
        if self.failing.contains(&record.key) {
            return Err(SyncError::Unreachable("connection reset".to_string()));
        }
        self.inner.create(record).await
    }
}

/// Canned HTTP response served by [`TestServer`].
#[derive(Clone)]
pub struct StubResponse {
    pub status: u16,
    pub body: String,
    pub delay: Duration,
    /// Send the body with chunked transfer encoding and no `Content-Length`.
    pub chunked: bool,
}

impl StubResponse {
    pub fn ok(body: impl Into<String>) -> Self {
        Self {
            status: 200,
            body: body.into(),
            delay: Duration::ZERO,
            chunked: false,
        }
    }

    pub fn status(status: u16, body: impl Into<String>) -> Self {
        Self {
            status,
            body: body.into(),
            delay: Duration::ZERO,
            chunked: false,
        }
    }

    pub fn delayed(mut self, delay: Duration) -> Self {
        self.delay = delay;
        self
    }

    pub fn chunked(mut self) -> Self {
        self.chunked = true;
        self
    }

    fn to_http(&self) -> String {
        if !self.chunked {
            return format!(
                "HTTP/1.1 {} Stub\r\nContent-Type: application/xml\r\nContent-Length: {}\r\nConnection: close\r\n\r\n{}",
                self.status,
                self.body.len(),
                self.body
            );
        }

        let mut reply = format!(
            "HTTP/1.1 {} Stub\r\nContent-Type: application/xml\r\nTransfer-Encoding: chunked\r\nConnection: close\r\n\r\n",
            self.status
        );
        for piece in self.body.as_bytes().chunks(64 * 1024) {
            reply.push_str(&format!("{:x}\r\n{}\r\n", piece.len(), String::from_utf8_lossy(piece)));
        }
        reply.push_str("0\r\n\r\n");
        reply
    }
}

/// Minimal HTTP/1.1 server on a loopback port. Responses are served in order;
/// the last one repeats once the list runs out.
pub struct TestServer {
    pub base_url: String,
    pub hits: Arc<AtomicUsize>,
    pub requests: Arc<Mutex<Vec<String>>>,
}

impl TestServer {
    pub async fn start(responses: Vec<StubResponse>) -> Self {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        let hits = Arc::new(AtomicUsize::new(0));
        let requests = Arc::new(Mutex::new(Vec::new()));

        let server_hits = hits.clone();
        let server_requests = requests.clone();
        tokio::spawn(async move {
            loop {
                let Ok((mut socket, _)) = listener.accept().await else {
                    break;
                };
                let n = server_hits.fetch_add(1, Ordering::SeqCst);
                let response = responses
                    .get(n)
                    .or_else(|| responses.last())
                    .cloned()
                    .unwrap_or_else(|| StubResponse::status(500, "no response configured"));
                let requests = server_requests.clone();

                tokio::spawn(async move {
                    let request = read_request(&mut socket).await;
                    requests.lock().unwrap().push(request);
                    tokio::time::sleep(response.delay).await;
                    let _ = socket.write_all(response.to_http().as_bytes()).await;
                    let _ = socket.shutdown().await;
                });
            }
        });

        Self {
            base_url: format!("http://{}", addr),
            hits,
            requests,
        }
    }

    pub fn hit_count(&self) -> usize {
        self.hits.load(Ordering::SeqCst)
    }

    pub fn recorded_requests(&self) -> Vec<String> {
        self.requests.lock().unwrap().clone()
    }
}

/// Reads headers plus a `Content-Length` body, returning the raw request text.
async fn read_request(socket: &mut tokio::net::TcpStream) -> String {
    let mut buffer = Vec::new();
    let mut chunk = [0u8; 4096];
    loop {
        let Ok(n) = socket.read(&mut chunk).await else {
            break;
        };
        if n == 0 {
            break;
        }
        buffer.extend_from_slice(&chunk[..n]);

        let text = String::from_utf8_lossy(&buffer);
        if let Some(header_end) = text.find("\r\n\r\n") {
            let content_length = text[..header_end]
                .lines()
                .find_map(|line| {
                    let (name, value) = line.split_once(':')?;
                    name.eq_ignore_ascii_case("content-length")
                        .then(|| value.trim().parse::<usize>().ok())
                        .flatten()
                })
                .unwrap_or(0);
            if buffer.len() >= header_end + 4 + content_length {
                break;
            }
        }
    }
    String::from_utf8_lossy(&buffer).into_owned()
}
