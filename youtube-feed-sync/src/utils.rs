/// Text processing utilities
pub mod text {
    use regex::Regex;
    use std::sync::LazyLock;

    pub const DEFAULT_SUMMARY_WORDS: usize = 200;
    pub const ELLIPSIS: &str = "...";

    static LINE_BREAK_TAG: LazyLock<Regex> =
        LazyLock::new(|| Regex::new(r"(?i)<br\s*/?>|</p\s*>|</div\s*>|</li\s*>").unwrap());
    static MARKUP_TAG: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"<[^>]+>").unwrap());
    // Optional short label ("Instagram:", "► Merch -") followed by nothing but URLs.
    static LINK_ONLY_LINE: LazyLock<Regex> = LazyLock::new(|| {
        Regex::new(r"(?i)^(?:[^\s:]{0,3}\s*)?(?:[\w&'’ ]{1,40}\s*[:\-–|]\s*)?(?:(?:https?://|www\.)\S+\s*)+$").unwrap()
    });
    static HASHTAG_ONLY_LINE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"^(?:#[\w-]+\s*)+$").unwrap());

    /// Removes markup and boilerplate lines from a feed description and collapses whitespace.
    pub fn clean_description(raw: &str) -> String {
        let with_breaks = LINE_BREAK_TAG.replace_all(raw, "\n");
        let stripped = MARKUP_TAG.replace_all(&with_breaks, " ");

        let prose: Vec<&str> = stripped
            .lines()
            .map(str::trim)
            .filter(|line| !line.is_empty())
            .filter(|line| !LINK_ONLY_LINE.is_match(line))
            .filter(|line| !HASHTAG_ONLY_LINE.is_match(line))
            .collect();

        collapse_whitespace(&prose.join(" "))
    }

    /// Markup removed, but no line filtering.
    pub fn strip_markup(raw: &str) -> String {
        let with_breaks = LINE_BREAK_TAG.replace_all(raw, "\n");
        collapse_whitespace(&MARKUP_TAG.replace_all(&with_breaks, " "))
    }

    /// Markup removed, line structure kept (blank-line runs squeezed to one).
    pub fn strip_markup_keep_lines(raw: &str) -> String {
        let with_breaks = LINE_BREAK_TAG.replace_all(raw, "\n");
        let stripped = MARKUP_TAG.replace_all(&with_breaks, "");

        let mut lines: Vec<String> = Vec::new();
        for line in stripped.lines().map(collapse_whitespace) {
            if line.is_empty() && lines.last().map_or(true, |l| l.is_empty()) {
                continue;
            }
            lines.push(line);
        }
        while lines.last().is_some_and(|l| l.is_empty()) {
            lines.pop();
        }
        lines.join("\n")
    }

    pub fn collapse_whitespace(text: &str) -> String {
        text.split_whitespace().collect::<Vec<_>>().join(" ")
    }

    pub fn word_count(text: &str) -> usize {
        text.split_whitespace().count()
    }

    /// Builds a summary of at most `max_words` words.
    ///
    /// Longer text is cut on a word boundary and gets [`ELLIPSIS`] appended to
    /// the last kept word, so the word count never exceeds the limit. A
    /// non-empty description always yields a non-empty summary as long as
    /// `max_words > 0`.
    pub fn summarize(description: &str, max_words: usize) -> String {
        if description.trim().is_empty() || max_words == 0 {
            return String::new();
        }

        let mut text = clean_description(description);
        if text.is_empty() {
            // Everything was boilerplate; keep the links rather than saying nothing.
            text = strip_markup(description);
        }
        if text.is_empty() {
            text = collapse_whitespace(description);
        }

        let words: Vec<&str> = text.split_whitespace().collect();
        if words.len() <= max_words {
            return text;
        }

        format!("{}{}", words[..max_words].join(" "), ELLIPSIS)
    }

    /// Truncate to at most `max_chars` characters on a char boundary, marking the cut.
    pub fn truncate_chars(text: &str, max_chars: usize) -> String {
        if text.chars().count() <= max_chars {
            return text.to_string();
        }
        let cut: String = text.chars().take(max_chars).collect();
        format!("{}{}", cut.trim_end(), ELLIPSIS)
    }

    /// Split text into pieces of at most `max_chars` characters.
    pub fn chunk_chars(text: &str, max_chars: usize) -> Vec<String> {
        if max_chars == 0 {
            return Vec::new();
        }
        let chars: Vec<char> = text.chars().collect();
        chars.chunks(max_chars).map(|c| c.iter().collect()).collect()
    }
}

/// YouTube URL utilities
pub mod url {
    use url::Url;

    const WATCH_BASE: &str = "https://www.youtube.com/watch?v=";

    fn is_youtube_host(host: &str) -> bool {
        let host = host.trim_start_matches("www.").trim_start_matches("m.");
        matches!(
            host,
            "youtube.com" | "youtu.be" | "youtube-nocookie.com" | "music.youtube.com"
        )
    }

    fn valid_id(candidate: &str) -> Option<String> {
        let ok = !candidate.is_empty()
            && candidate
                .chars()
                .all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_');
        ok.then(|| candidate.to_string())
    }

    /// Extract the video id from any of the usual YouTube URL shapes.
    pub fn extract_video_id(link: &str) -> Option<String> {
        let url = Url::parse(link.trim()).ok()?;
        let host = url.host_str()?;
        if !is_youtube_host(host) {
            return None;
        }

        if let Some((_, v)) = url.query_pairs().find(|(k, _)| k == "v") {
            return valid_id(&v);
        }

        let segments: Vec<&str> = url.path_segments()?.filter(|s| !s.is_empty()).collect();
        match segments.as_slice() {
            [id] if host.ends_with("youtu.be") => valid_id(id),
            ["shorts" | "embed" | "live" | "v", id, ..] => valid_id(id),
            _ => None,
        }
    }

    /// Video id carried by a feed GUID, e.g. `yt:video:dQw4w9WgXcQ` or a YouTube URL.
    pub fn video_id_from_guid(guid: &str) -> Option<String> {
        let guid = guid.trim();
        if guid.is_empty() {
            return None;
        }
        if let Some(id) = guid.strip_prefix("yt:video:") {
            return valid_id(id);
        }
        extract_video_id(guid)
    }

    /// Canonical web URL for a video.
    pub fn watch_url(video_id: &str) -> String {
        format!("{}{}", WATCH_BASE, video_id)
    }

    pub const APP_SCHEME: &str = "vnd.youtube://";

    /// Deep link that hands the video to the native YouTube app.
    pub fn app_link(video_id: &str) -> String {
        format!("{}{}", APP_SCHEME, video_id)
    }

    /// Video id behind an app link built by [`app_link`].
    pub fn video_id_from_app_link(app_link: &str) -> Option<&str> {
        app_link.strip_prefix(APP_SCHEME).filter(|id| !id.is_empty())
    }

    /// Short https link; mobile clients open it in the app.
    pub fn short_url(video_id: &str) -> String {
        format!("https://youtu.be/{}", video_id)
    }

    pub fn embed_url(video_id: &str) -> String {
        format!("https://www.youtube.com/embed/{}", video_id)
    }

    pub fn is_web_url(link: &str) -> bool {
        Url::parse(link).is_ok_and(|u| matches!(u.scheme(), "http" | "https"))
    }

    pub fn thumbnail_url(video_id: &str) -> String {
        format!("https://i.ytimg.com/vi/{}/hqdefault.jpg", video_id)
    }
}

/// Time utilities
pub mod time {
    use chrono::{DateTime, FixedOffset, NaiveDate, NaiveDateTime, TimeZone};
    use chrono_tz::Tz;

    const NAIVE_FORMATS: &[&str] = &["%Y-%m-%d %H:%M:%S", "%Y-%m-%dT%H:%M:%S", "%Y-%m-%dT%H:%M:%S%.f"];

    /// Parse a feed timestamp. Values without an offset are read in `default_tz`.
    pub fn parse_published(value: &str, default_tz: Tz) -> Option<DateTime<FixedOffset>> {
        let value = value.trim();
        if value.is_empty() {
            return None;
        }

        if let Ok(dt) = DateTime::parse_from_rfc3339(value) {
            return Some(dt);
        }
        if let Ok(dt) = DateTime::parse_from_rfc2822(value) {
            return Some(dt);
        }

        let naive = NAIVE_FORMATS
            .iter()
            .find_map(|fmt| NaiveDateTime::parse_from_str(value, fmt).ok())
            .or_else(|| {
                NaiveDate::parse_from_str(value, "%Y-%m-%d")
                    .ok()
                    .and_then(|d| d.and_hms_opt(0, 0, 0))
            })?;

        default_tz
            .from_local_datetime(&naive)
            .earliest()
            .map(|dt| dt.fixed_offset())
    }

    pub fn format_rfc2822(dt: &DateTime<FixedOffset>) -> String {
        dt.to_rfc2822()
    }
}
