use super::atomic_write;
use crate::error::SinkError;
use crate::types::{FeedAggregate, VideoRecord};
use crate::utils::{text, time};
use chrono::Utc;
use quick_xml::escape::escape;
use rss::extension::{Extension, ExtensionMap};
use rss::{Channel, ChannelBuilder, GuidBuilder, Item, ItemBuilder};
use std::collections::BTreeMap;
use std::path::Path;
use tracing::{error, info};

const ATOM_NS: &str = "http://www.w3.org/2005/Atom";
const MEDIA_NS: &str = "http://search.yahoo.com/mrss/";
const YT_NS: &str = "http://www.youtube.com/xml/schemas/2015";

const ORIGINAL_DESCRIPTION_CHARS: usize = 500;
pub const NO_DESCRIPTION: &str = "No description available.";

/// Renders every successfully normalized video as one RSS 2.0 document.
#[derive(Debug, Clone)]
pub struct FeedSink {
    pub title: String,
    pub description: String,
    pub link: String,
}

impl Default for FeedSink {
    fn default() -> Self {
        Self::new("My YouTube Feeds")
    }
}

impl FeedSink {
    pub fn new(title: impl Into<String>) -> Self {
        Self {
            title: title.into(),
            description: "Curated YouTube feeds with clean summaries".to_string(),
            link: "https://www.youtube.com".to_string(),
        }
    }

    pub async fn write(&self, aggregate: &FeedAggregate, path: &Path) -> Result<(), SinkError> {
        let document = self.render(aggregate)?;

        match atomic_write(path, document.as_bytes()).await {
            Ok(()) => {
                info!("RSS feed with {} items saved to {}", aggregate.video_count(), path.display());
                Ok(())
            }
            Err(e) => {
                error!("Error saving RSS feed to {}: {}", path.display(), e);
                Err(e)
            }
        }
    }

    /// Items are ordered newest first across all sources.
    pub fn render(&self, aggregate: &FeedAggregate) -> Result<String, SinkError> {
        let mut videos: Vec<&VideoRecord> = aggregate.videos().collect();
        videos.sort_by(|a, b| b.published_at.cmp(&a.published_at).then_with(|| a.id.cmp(&b.id)));

        let channel = self.channel(videos.into_iter().map(video_item).collect());
        let buffer = channel
            .pretty_write_to(Vec::new(), b' ', 2)
            .map_err(|e| SinkError::Encode(e.to_string()))?;
        String::from_utf8(buffer).map_err(|e| SinkError::Encode(e.to_string()))
    }

    fn channel(&self, items: Vec<Item>) -> Channel {
        let namespaces: BTreeMap<String, String> = [("atom", ATOM_NS), ("media", MEDIA_NS), ("yt", YT_NS)]
            .into_iter()
            .map(|(prefix, uri)| (prefix.to_string(), uri.to_string()))
            .collect();

        let self_link = element(
            "atom:link",
            None,
            &[("href", &self.link), ("rel", "self"), ("type", "application/rss+xml")],
        );
        let mut extensions = ExtensionMap::new();
        insert(&mut extensions, "atom", "link", self_link);

        ChannelBuilder::default()
            .title(self.title.clone())
            .link(self.link.clone())
            .description(self.description.clone())
            .language(Some("en-us".to_string()))
            .last_build_date(Some(Utc::now().to_rfc2822()))
            .namespaces(namespaces)
            .extensions(extensions)
            .items(items)
            .build()
    }
}

fn video_item(video: &VideoRecord) -> Item {
    let mut extensions = ExtensionMap::new();
    if let Some(thumbnail) = &video.thumbnail_url {
        insert(&mut extensions, "media", "thumbnail", element("media:thumbnail", None, &[("url", thumbnail)]));
    }
    insert(&mut extensions, "yt", "videoId", element("yt:videoId", Some(&video.id), &[]));
    insert(&mut extensions, "yt", "previewLink", element("yt:previewLink", Some(&video.preview_link), &[]));
    insert(&mut extensions, "yt", "appLink", element("yt:appLink", Some(&video.app_link), &[]));

    ItemBuilder::default()
        .title(Some(video.title.clone()))
        .link(Some(video.preview_link.clone()))
        .author(Some(video.channel_title.clone()))
        .description(Some(item_description(video)))
        .pub_date(Some(time::format_rfc2822(&video.published_at)))
        .guid(Some(GuidBuilder::default().value(video.id.clone()).permalink(false).build()))
        .extensions(extensions)
        .build()
}

/// HTML block shown by feed readers: channel, summary, id and the start of the original text.
pub fn item_description(video: &VideoRecord) -> String {
    let summary = if video.summary.is_empty() {
        NO_DESCRIPTION
    } else {
        video.summary.as_str()
    };
    let original = text::truncate_chars(&text::strip_markup(&video.description), ORIGINAL_DESCRIPTION_CHARS);

    [
        format!("<strong>Channel:</strong> {}", escape(video.channel_title.as_str())),
        format!("<strong>Summary:</strong> {}", escape(summary)),
        format!("<strong>Video ID:</strong> {}", escape(video.id.as_str())),
        format!("<strong>Original Description:</strong> {}", escape(original.as_str())),
        format!(
            "<a href=\"{}\">Watch</a> | <a href=\"{}\">Open in app</a>",
            escape(video.preview_link.as_str()),
            escape(video.app_link.as_str())
        ),
    ]
    .join("<br/><br/>")
}

fn element(name: &str, value: Option<&str>, attrs: &[(&str, &str)]) -> Extension {
    Extension {
        name: name.to_string(),
        value: value.map(str::to_string),
        attrs: attrs.iter().map(|(k, v)| (k.to_string(), v.to_string())).collect(),
        ..Default::default()
    }
}

fn insert(map: &mut ExtensionMap, prefix: &str, local: &str, ext: Extension) {
    map.entry(prefix.to_string())
        .or_default()
        .entry(local.to_string())
        .or_default()
        .push(ext);
}
