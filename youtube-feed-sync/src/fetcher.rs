use crate::error::FetchError;
use crate::parser::FeedParser;
use crate::traits::FeedFetcher;
use crate::types::{FetchConfig, FetchedFeed, Source};
use async_trait::async_trait;
use backoff::{backoff::Backoff, exponential::ExponentialBackoff};
use chrono_tz::Tz;
use reqwest::{Client, StatusCode};
use std::time::{Duration, Instant};
use tracing::{debug, error, info, warn};

/// Outcome of a single HTTP attempt.
enum Attempt {
    Body(String),
    Retryable(String),
    Fatal(String),
}

/// Fetches feeds over HTTP. Each request carries its own timeout, so a slow
/// source never holds up the others.
pub struct Fetcher {
    client: Client,
    config: FetchConfig,
    parser: FeedParser,
}

impl Fetcher {
    pub fn new(config: FetchConfig) -> reqwest::Result<Self> {
        let client = Client::builder()
            .user_agent(&config.user_agent)
            .timeout(Duration::from_secs(config.timeout_seconds))
            .gzip(true)
            .deflate(true)
            .brotli(true)
            .redirect(reqwest::redirect::Policy::limited(config.max_redirects))
            .build()?;

        Ok(Self {
            client,
            config,
            parser: FeedParser::default(),
        })
    }

    /// Timezone applied to feed timestamps that carry no offset.
    pub fn with_timezone(mut self, timezone: Tz) -> Self {
        self.parser = FeedParser::new(timezone);
        self
    }

    /// Download the raw feed document, retrying transient failures.
    pub async fn fetch_document(&self, source: &Source) -> Result<String, FetchError> {
        let start_time = Instant::now();
        debug!("Fetching feed: {} ({})", source.feed_url, source.id);

        let mut backoff: ExponentialBackoff<backoff::SystemClock> = ExponentialBackoff {
            current_interval: Duration::from_secs(self.config.retry_delay_seconds),
            initial_interval: Duration::from_secs(self.config.retry_delay_seconds),
            max_interval: Duration::from_secs(self.config.retry_delay_seconds * 32),
            multiplier: 2.0,
            max_elapsed_time: None,
            ..Default::default()
        };

        let mut last_error = String::from("no attempt made");

        for attempt in 0..=self.config.max_retries {
            match self.attempt(&source.feed_url).await {
                Attempt::Body(content) => {
                    info!(
                        "Fetched feed for {} ({} bytes in {}ms)",
                        source.id,
                        content.len(),
                        start_time.elapsed().as_millis()
                    );
                    return Ok(content);
                }
                Attempt::Fatal(cause) => {
                    last_error = cause;
                    break;
                }
                Attempt::Retryable(cause) => {
                    last_error = cause;
                    if attempt < self.config.max_retries {
                        if let Some(delay) = backoff.next_backoff() {
                            warn!(
                                "Attempt {} failed for {} ({}), retrying in {:?}",
                                attempt + 1,
                                source.id,
                                last_error,
                                delay
                            );
                            tokio::time::sleep(delay).await;
                            continue;
                        }
                    }
                }
            }
        }

        error!("Failed to fetch feed for {}: {}", source.id, last_error);
        Err(FetchError::Network {
            source_id: source.id.clone(),
            cause: last_error,
        })
    }

    async fn attempt(&self, url: &str) -> Attempt {
        let mut response = match self.client.get(url).send().await {
            Ok(response) => response,
            Err(e) if e.is_builder() => return Attempt::Fatal(e.to_string()),
            Err(e) => return Attempt::Retryable(e.to_string()),
        };

        let status = response.status();
        if !status.is_success() {
            let cause = format!("HTTP {}: {}", status.as_u16(), status.canonical_reason().unwrap_or("Unknown"));
            return if status.is_server_error() || status == StatusCode::TOO_MANY_REQUESTS {
                Attempt::Retryable(cause)
            } else {
                Attempt::Fatal(cause)
            };
        }

        let max_bytes = self.config.max_feed_size_mb * 1024 * 1024;
        if let Some(content_length) = response.content_length() {
            if content_length as usize > max_bytes {
                return Attempt::Fatal(format!("feed too large: {} bytes", content_length));
            }
        }

        // Content-Length may be absent or wrong; stop reading once past the cap.
        let mut body: Vec<u8> = Vec::new();
        loop {
            match response.chunk().await {
                Ok(Some(chunk)) => {
                    body.extend_from_slice(&chunk);
                    if body.len() > max_bytes {
                        return Attempt::Fatal(format!("feed too large: more than {} bytes", max_bytes));
                    }
                }
                Ok(None) => break,
                Err(e) => return Attempt::Retryable(e.to_string()),
            }
        }

        Attempt::Body(String::from_utf8_lossy(&body).into_owned())
    }
}

#[async_trait]
impl FeedFetcher for Fetcher {
    async fn fetch(&self, source: &Source) -> Result<FetchedFeed, FetchError> {
        let content = self.fetch_document(source).await?;
        self.parser.parse_feed(&source.id, &content)
    }
}
