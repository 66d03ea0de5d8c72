pub mod memory;
pub mod notion;

pub use memory::InMemoryRecordStore;
pub use notion::NotionStore;

use crate::sinks::rss_feed::NO_DESCRIPTION;
use crate::types::{FeedAggregate, VideoRecord};
use crate::utils::{text, url};
use chrono::{DateTime, FixedOffset, NaiveDate};

pub const DEFAULT_STATUS: &str = "New";
pub const DIGEST_STATUS: &str = "Summary";
pub const NO_VIDEOS_FETCHED: &str = "No videos were fetched for this period.";
/// Longest text a single content block may carry.
pub const MAX_BLOCK_CHARS: usize = 2000;
const MAX_DESCRIPTION_BLOCKS: usize = 20;

/// Store-agnostic body content of a record.
#[derive(Debug, Clone, PartialEq)]
pub enum ContentBlock {
    Heading(String),
    /// Smaller heading, optionally linked.
    Subheading { text: String, url: Option<String> },
    Paragraph(String),
    Bullet(String),
    Link { label: String, url: String },
    Image(String),
    /// Embedded player for an external video URL.
    Video(String),
    Divider,
}

/// A record as the store should create it.
#[derive(Debug, Clone, PartialEq)]
pub struct StoreRecord {
    /// Idempotency key; the video id for video records.
    pub key: String,
    pub title: String,
    pub channel: String,
    pub published: NaiveDate,
    /// Full timestamp behind `published`.
    pub timestamp: DateTime<FixedOffset>,
    pub status: String,
    pub blocks: Vec<ContentBlock>,
}

impl StoreRecord {
    pub fn from_video(video: &VideoRecord) -> Self {
        let summary = if video.summary.is_empty() {
            NO_DESCRIPTION.to_string()
        } else {
            video.summary.clone()
        };

        let mut blocks = vec![ContentBlock::Heading("Video Summary".to_string())];
        blocks.extend(
            text::chunk_chars(&summary, MAX_BLOCK_CHARS)
                .into_iter()
                .map(ContentBlock::Paragraph),
        );
        blocks.extend([
            ContentBlock::Heading("Links".to_string()),
            ContentBlock::Link {
                label: "Preview Link".to_string(),
                url: video.preview_link.clone(),
            },
            ContentBlock::Link {
                label: "YouTube App Link".to_string(),
                url: open_in_app_url(video),
            },
        ]);

        if let Some(thumbnail) = &video.thumbnail_url {
            blocks.push(ContentBlock::Image(thumbnail.clone()));
        }

        if !video.description.trim().is_empty() {
            blocks.push(ContentBlock::Heading("Full Description".to_string()));
            blocks.extend(
                text::chunk_chars(&video.description, MAX_BLOCK_CHARS)
                    .into_iter()
                    .take(MAX_DESCRIPTION_BLOCKS)
                    .map(ContentBlock::Paragraph),
            );
        }

        Self {
            key: video.id.clone(),
            title: video.title.clone(),
            channel: video.channel_title.clone(),
            published: video.published_at.date_naive(),
            timestamp: video.published_at,
            status: DEFAULT_STATUS.to_string(),
            blocks,
        }
    }

    /// One overview record per day, keyed so reruns on the same day are skipped.
    /// Totals and a per-channel breakdown come first, then a section per channel
    /// with every video of the run.
    pub fn daily_digest(aggregate: &FeedAggregate, title_prefix: &str, date: NaiveDate) -> Self {
        let day = date.format("%Y-%m-%d").to_string();

        let mut blocks = vec![
            ContentBlock::Heading(format!("YouTube Feed Summary - {}", day)),
            ContentBlock::Paragraph(format!(
                "Total Channels: {}\nTotal Videos: {}\nFetched at: {}",
                aggregate.total_sources,
                aggregate.video_count(),
                aggregate.fetched_at.format("%Y-%m-%d %H:%M:%S UTC")
            )),
            ContentBlock::Heading("Channel Breakdown".to_string()),
        ];

        for source in &aggregate.sources {
            let line = match &source.error {
                Some(error) => format!("{}: failed ({})", source.source_id, error),
                None => format!("{}: {} videos", source.channel_title, source.videos.len()),
            };
            blocks.push(ContentBlock::Bullet(text::truncate_chars(&line, MAX_BLOCK_CHARS - 3)));
        }

        let mut sections = Vec::new();
        for source in aggregate.sources.iter().filter(|s| !s.videos.is_empty()) {
            sections.push(ContentBlock::Heading(clip(&source.channel_title)));
            for video in &source.videos {
                sections.extend(digest_entry(video));
                sections.push(ContentBlock::Divider);
            }
        }
        if sections.last() == Some(&ContentBlock::Divider) {
            sections.pop();
        }
        if sections.is_empty() {
            sections.push(ContentBlock::Paragraph(NO_VIDEOS_FETCHED.to_string()));
        }
        blocks.extend(sections);

        Self {
            key: digest_key(date),
            title: format!("{} - {}", title_prefix, day),
            channel: "Daily Summary".to_string(),
            published: date,
            timestamp: aggregate.fetched_at.fixed_offset(),
            status: DIGEST_STATUS.to_string(),
            blocks,
        }
    }
}

fn digest_entry(video: &VideoRecord) -> Vec<ContentBlock> {
    let summary = if video.summary.is_empty() {
        NO_DESCRIPTION
    } else {
        video.summary.as_str()
    };
    let app_url = open_in_app_url(video);

    let mut blocks = vec![
        ContentBlock::Subheading {
            text: clip(&video.title),
            url: Some(app_url.clone()),
        },
        ContentBlock::Paragraph(clip(&format!("Channel: {}", video.channel_title))),
        ContentBlock::Paragraph(clip(&format!("Summary: {}", summary))),
    ];
    if let Some(id) = url::video_id_from_app_link(&video.app_link) {
        blocks.push(ContentBlock::Video(url::embed_url(id)));
    }
    blocks.push(ContentBlock::Link {
        label: "Preview link".to_string(),
        url: video.preview_link.clone(),
    });
    blocks.push(ContentBlock::Link {
        label: "Open in YouTube app".to_string(),
        url: app_url,
    });
    blocks
}

/// Web link that opens the video in the YouTube app on mobile. Record stores
/// only accept http(s) links, so the `vnd.youtube://` form is not used here.
fn open_in_app_url(video: &VideoRecord) -> String {
    match url::video_id_from_app_link(&video.app_link) {
        Some(id) => url::short_url(id),
        None => video.preview_link.clone(),
    }
}

fn clip(value: &str) -> String {
    text::truncate_chars(value, MAX_BLOCK_CHARS - 3)
}

pub fn digest_key(date: NaiveDate) -> String {
    format!("digest-{}", date.format("%Y-%m-%d"))
}
