use chrono::{DateTime, FixedOffset, Utc};
use serde::{Deserialize, Serialize};

pub const YOUTUBE_FEED_BASE: &str = "https://www.youtube.com/feeds/videos.xml";
pub const UNKNOWN_CHANNEL: &str = "Unknown Channel";

/// A configured channel whose feed gets polled.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Source {
    pub id: String,
    pub feed_url: String,
}

impl Source {
    pub fn new(id: impl Into<String>, feed_url: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            feed_url: feed_url.into(),
        }
    }

    /// Source for a YouTube channel id, pointing at the public videos feed.
    pub fn youtube_channel(channel_id: &str) -> Self {
        let channel_id = channel_id.trim();
        Self {
            id: channel_id.to_string(),
            feed_url: format!("{}?channel_id={}", YOUTUBE_FEED_BASE, channel_id),
        }
    }
}

/// A feed item as it came off the wire. Every field may be missing.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RawEntry {
    pub title: Option<String>,
    pub link: Option<String>,
    pub published: Option<String>,
    pub description: Option<String>,
    pub thumbnail_url: Option<String>,
    pub guid: Option<String>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct ChannelContext {
    pub source_id: String,
    pub channel_title: String,
    pub channel_link: String,
}

/// Result of fetching one source: channel metadata plus entries in document order.
#[derive(Debug, Clone)]
pub struct FetchedFeed {
    pub channel_title: Option<String>,
    pub channel_link: Option<String>,
    pub entries: Vec<RawEntry>,
    /// Set when the document was malformed but some entries were salvaged.
    pub warning: Option<crate::FetchError>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VideoRecord {
    pub id: String,
    pub title: String,
    pub channel_title: String,
    pub channel_link: String,
    #[serde(rename = "published")]
    pub published_at: DateTime<FixedOffset>,
    pub description: String,
    pub summary: String,
    #[serde(rename = "link")]
    pub preview_link: String,
    pub app_link: String,
    #[serde(rename = "thumbnail")]
    pub thumbnail_url: Option<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SourceStatus {
    Ok,
    /// Fetched fine but the channel had nothing to offer.
    Empty,
    Failed,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SourceResult {
    pub source_id: String,
    pub channel_title: String,
    pub channel_link: String,
    pub last_updated: DateTime<Utc>,
    pub status: SourceStatus,
    #[serde(default)]
    pub videos: Vec<VideoRecord>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub warning: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl SourceResult {
    pub fn failed(source_id: &str, error: String) -> Self {
        Self {
            source_id: source_id.to_string(),
            channel_title: UNKNOWN_CHANNEL.to_string(),
            channel_link: String::new(),
            last_updated: Utc::now(),
            status: SourceStatus::Failed,
            videos: Vec::new(),
            warning: None,
            error: Some(error),
        }
    }

    pub fn is_failed(&self) -> bool {
        self.status == SourceStatus::Failed
    }
}

/// Everything one run collected. Built once by the aggregator, read-only afterwards.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FeedAggregate {
    pub fetched_at: DateTime<Utc>,
    pub total_sources: usize,
    pub sources: Vec<SourceResult>,
}

impl FeedAggregate {
    pub fn new(fetched_at: DateTime<Utc>, sources: Vec<SourceResult>) -> Self {
        Self {
            fetched_at,
            total_sources: sources.len(),
            sources,
        }
    }

    /// All videos across successful sources, in source then fetch order.
    pub fn videos(&self) -> impl Iterator<Item = &VideoRecord> {
        self.sources.iter().flat_map(|s| s.videos.iter())
    }

    pub fn video_count(&self) -> usize {
        self.sources.iter().map(|s| s.videos.len()).sum()
    }

    pub fn failed_count(&self) -> usize {
        self.sources.iter().filter(|s| s.is_failed()).count()
    }

    pub fn succeeded_count(&self) -> usize {
        self.total_sources - self.failed_count()
    }

    /// True when sources were configured and not a single one succeeded.
    pub fn all_failed(&self) -> bool {
        self.total_sources > 0 && self.failed_count() == self.total_sources
    }
}

#[derive(Debug, Clone)]
pub struct FetchConfig {
    pub user_agent: String,
    pub timeout_seconds: u64,
    pub max_retries: u32,
    pub retry_delay_seconds: u64,
    pub max_feed_size_mb: usize,
    pub max_redirects: usize,
    pub concurrency: usize,
}

impl Default for FetchConfig {
    fn default() -> Self {
        Self {
            user_agent: "YouTube RSS Feed Fetcher/1.0".to_string(),
            timeout_seconds: 30,
            max_retries: 2,
            retry_delay_seconds: 5,
            max_feed_size_mb: 10,
            max_redirects: 5,
            concurrency: 4,
        }
    }
}

/// Stages of a single run, in order. Nothing carries over between runs.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RunPhase {
    Idle,
    Fetching,
    Normalizing,
    Aggregated,
    Sinking,
    Done,
}

impl std::fmt::Display for RunPhase {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            RunPhase::Idle => "idle",
            RunPhase::Fetching => "fetching",
            RunPhase::Normalizing => "normalizing",
            RunPhase::Aggregated => "aggregated",
            RunPhase::Sinking => "sinking",
            RunPhase::Done => "done",
        };
        f.write_str(name)
    }
}
