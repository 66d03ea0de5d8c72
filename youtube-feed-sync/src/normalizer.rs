use crate::error::NormalizeError;
use crate::types::{ChannelContext, RawEntry, VideoRecord};
use crate::utils::{text, time, url};
use chrono_tz::Tz;

pub const UNTITLED_VIDEO: &str = "Untitled video";

/// Converts raw feed entries into [`VideoRecord`]s. No network access.
#[derive(Debug, Clone)]
pub struct RecordNormalizer {
    timezone: Tz,
    max_summary_words: usize,
}

impl RecordNormalizer {
    pub fn new(timezone: Tz, max_summary_words: usize) -> Self {
        Self {
            timezone,
            max_summary_words,
        }
    }

    pub fn normalize(&self, entry: &RawEntry, channel: &ChannelContext) -> Result<VideoRecord, NormalizeError> {
        let link = non_blank(entry.link.as_deref());
        let guid = non_blank(entry.guid.as_deref());

        let video_id = link
            .and_then(url::extract_video_id)
            .or_else(|| guid.and_then(url::video_id_from_guid));
        let id = video_id
            .clone()
            .or_else(|| guid.map(|g| g.trim().to_string()))
            .or_else(|| link.map(|l| l.trim().to_string()))
            .ok_or(NormalizeError::MissingId)?;

        let published_at = entry
            .published
            .as_deref()
            .and_then(|p| time::parse_published(p, self.timezone))
            .ok_or_else(|| NormalizeError::BadTimestamp {
                value: entry.published.clone(),
            })?;

        let (preview_link, app_link) = match &video_id {
            Some(video_id) => (url::watch_url(video_id), url::app_link(video_id)),
            None => {
                // Not a YouTube entry; the original link is the best we can do for both.
                let fallback = link.unwrap_or(id.as_str()).trim().to_string();
                (fallback.clone(), fallback)
            }
        };

        let thumbnail_url = non_blank(entry.thumbnail_url.as_deref())
            .map(str::to_string)
            .or_else(|| video_id.as_deref().map(url::thumbnail_url));

        let raw_description = entry.description.as_deref().unwrap_or("");
        let description = text::strip_markup_keep_lines(raw_description);
        let summary = text::summarize(raw_description, self.max_summary_words);

        Ok(VideoRecord {
            id,
            title: non_blank(entry.title.as_deref())
                .map(|t| t.trim().to_string())
                .unwrap_or_else(|| UNTITLED_VIDEO.to_string()),
            channel_title: channel.channel_title.clone(),
            channel_link: channel.channel_link.clone(),
            published_at,
            description,
            summary,
            preview_link,
            app_link,
            thumbnail_url,
        })
    }
}

fn non_blank(value: Option<&str>) -> Option<&str> {
    value.filter(|v| !v.trim().is_empty())
}
