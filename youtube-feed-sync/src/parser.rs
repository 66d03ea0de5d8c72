use crate::error::FetchError;
use crate::types::{FetchedFeed, RawEntry};
use crate::utils::time;
use chrono::Utc;
use chrono_tz::Tz;
use feed_rs::model::{Entry, Feed, Link};
use feed_rs::parser;
use regex::Regex;
use std::sync::LazyLock;
use tracing::{debug, info, warn};

static ATOM_ENTRY: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"(?s)<entry[\s>].*?</entry>").unwrap());
static RSS_ITEM: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"(?s)<item[\s>].*?</item>").unwrap());
static FIRST_TITLE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"(?s)<title[^>]*>(.*?)</title>").unwrap());

const ATOM_WRAPPER_OPEN: &str = r#"<feed xmlns="http://www.w3.org/2005/Atom" xmlns:yt="http://www.youtube.com/xml/schemas/2015" xmlns:media="http://search.yahoo.com/mrss/">"#;
const RSS_WRAPPER_OPEN: &str = r#"<rss version="2.0" xmlns:media="http://search.yahoo.com/mrss/"><channel>"#;

/// Turns feed documents into [`RawEntry`] lists.
///
/// Parsing is permissive: when the whole document is rejected, each
/// `<entry>`/`<item>` block is retried on its own and whatever parses is kept.
/// Timestamps without an offset are read in the parser's timezone.
#[derive(Debug, Clone, Copy)]
pub struct FeedParser {
    timezone: Tz,
}

impl Default for FeedParser {
    fn default() -> Self {
        Self::new(Tz::UTC)
    }
}

impl FeedParser {
    pub fn new(timezone: Tz) -> Self {
        Self { timezone }
    }

    pub fn parse_feed(&self, source_id: &str, content: &str) -> Result<FetchedFeed, FetchError> {
        debug!("Parsing feed content for {} ({} bytes)", source_id, content.len());

        match self.parse_document(content) {
            Ok(feed) => {
                let fetched = Self::from_feed(feed);
                info!("Parsed feed {} with {} entries", source_id, fetched.entries.len());
                Ok(fetched)
            }
            Err(cause) => {
                warn!("Feed {} failed to parse as a whole ({}), salvaging entries", source_id, cause);
                self.salvage(source_id, content, cause)
            }
        }
    }

    fn parse_document(&self, content: &str) -> Result<Feed, String> {
        let timezone = self.timezone;
        // Missing ids must stay missing; the default generator would invent one.
        parser::Builder::new()
            .id_generator(|_links, _title, _uri| String::new())
            .timestamp_parser(move |value| time::parse_published(value, timezone).map(|dt| dt.with_timezone(&Utc)))
            .build()
            .parse(content.as_bytes())
            .map_err(|e| e.to_string())
    }

    fn from_feed(feed: Feed) -> FetchedFeed {
        let channel_title = feed.title.map(|t| t.content).filter(|t| !t.trim().is_empty());
        let channel_link = preferred_link(&feed.links);
        let entries = feed.entries.into_iter().map(Self::raw_entry).collect();

        FetchedFeed {
            channel_title,
            channel_link,
            entries,
            warning: None,
        }
    }

    fn salvage(&self, source_id: &str, content: &str, cause: String) -> Result<FetchedFeed, FetchError> {
        let mut entries = Vec::new();
        let mut rejected = 0usize;

        let blocks = ATOM_ENTRY
            .find_iter(content)
            .map(|m| format!("{}{}</feed>", ATOM_WRAPPER_OPEN, m.as_str()))
            .chain(
                RSS_ITEM
                    .find_iter(content)
                    .map(|m| format!("{}{}</channel></rss>", RSS_WRAPPER_OPEN, m.as_str())),
            );

        for block in blocks {
            match self.parse_document(&block) {
                Ok(feed) => entries.extend(feed.entries.into_iter().map(Self::raw_entry)),
                Err(e) => {
                    rejected += 1;
                    debug!("Dropping unparseable entry block in {}: {}", source_id, e);
                }
            }
        }

        if entries.is_empty() {
            return Err(FetchError::Malformed {
                source_id: source_id.to_string(),
                cause,
            });
        }

        warn!(
            "Salvaged {} entries from malformed feed {} ({} blocks rejected)",
            entries.len(),
            source_id,
            rejected
        );

        Ok(FetchedFeed {
            channel_title: salvage_channel_title(content),
            channel_link: None,
            entries,
            warning: Some(FetchError::Malformed {
                source_id: source_id.to_string(),
                cause,
            }),
        })
    }

    fn raw_entry(entry: Entry) -> RawEntry {
        let link = preferred_link(&entry.links);
        let guid = Some(entry.id).filter(|id| !id.trim().is_empty());
        let published = entry.published.or(entry.updated).map(|dt| dt.to_rfc3339());

        let media_description = entry
            .media
            .iter()
            .find_map(|m| m.description.as_ref().map(|d| d.content.clone()));
        let description = entry
            .summary
            .map(|s| s.content)
            .or(media_description)
            .or_else(|| entry.content.and_then(|c| c.body))
            .filter(|d| !d.trim().is_empty());

        let thumbnail_url = entry
            .media
            .iter()
            .flat_map(|m| m.thumbnails.iter())
            .map(|t| t.image.uri.clone())
            .next();

        RawEntry {
            title: entry.title.map(|t| t.content),
            link,
            published,
            description,
            thumbnail_url,
            guid,
        }
    }
}

/// The `alternate` link if there is one, otherwise the first link.
fn preferred_link(links: &[Link]) -> Option<String> {
    links
        .iter()
        .find(|l| l.rel.as_deref() == Some("alternate"))
        .or_else(|| links.first())
        .map(|l| l.href.clone())
        .filter(|href| !href.trim().is_empty())
}

fn salvage_channel_title(content: &str) -> Option<String> {
    let head_end = ATOM_ENTRY
        .find(content)
        .or_else(|| RSS_ITEM.find(content))
        .map(|m| m.start())
        .unwrap_or(content.len());
    FIRST_TITLE
        .captures(&content[..head_end])
        .and_then(|c| c.get(1))
        .map(|m| m.as_str().trim().to_string())
        .filter(|t| !t.is_empty())
}
