use crate::error::ConfigError;
use crate::types::{FetchConfig, Source};
use crate::utils::text::DEFAULT_SUMMARY_WORDS;
use chrono::NaiveTime;
use chrono_tz::Tz;
use std::path::{Path, PathBuf};
use std::str::FromStr;

pub const DEFAULT_CHANNELS: &str = "UCBJycsmduvYEL83R_U4JriQ,UCrqM0Ym_NbK1fqeQG2VIohg";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogFormat {
    Pretty,
    Json,
}

#[derive(Debug, Clone)]
pub struct NotionConfig {
    pub api_key: String,
    pub database_id: String,
    pub page_title_prefix: String,
    pub daily_digest: bool,
    /// Date property filled with the record's timestamp, when the database has one.
    pub date_property: Option<String>,
}

/// Everything a run needs, already validated.
#[derive(Debug, Clone)]
pub struct Config {
    pub sources: Vec<Source>,
    pub output_file: PathBuf,
    pub rss_output_file: PathBuf,
    pub timezone: Tz,
    pub summary_max_words: usize,
    pub schedule_time: NaiveTime,
    pub fetch: FetchConfig,
    pub rss_feed_title: String,
    /// `None` unless both the API key and the database id are set.
    pub notion: Option<NotionConfig>,
    pub log_format: LogFormat,
}

impl Config {
    /// Load from the process environment (and `.env`, if present).
    pub fn from_env() -> Result<Self, ConfigError> {
        dotenvy::dotenv().ok();
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    /// Build from any key/value source; used by `from_env` and tests.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let var = |name: &str, default: &str| {
            lookup(name)
                .map(|v| v.trim().to_string())
                .filter(|v| !v.is_empty())
                .unwrap_or_else(|| default.to_string())
        };

        let sources = parse_channels(&var("YOUTUBE_CHANNELS", DEFAULT_CHANNELS));

        let timezone_name = var("TIMEZONE", "UTC");
        let timezone = Tz::from_str(&timezone_name).map_err(|_| ConfigError::InvalidTimezone(timezone_name.clone()))?;

        let schedule_raw = var("SCHEDULE_TIME", "09:00");
        let schedule_time = NaiveTime::parse_from_str(&schedule_raw, "%H:%M")
            .map_err(|_| ConfigError::InvalidRunTime(schedule_raw.clone()))?;

        let defaults = FetchConfig::default();
        let fetch = FetchConfig {
            timeout_seconds: parse_number("FETCH_TIMEOUT_SECONDS", &var("FETCH_TIMEOUT_SECONDS", "30"))?,
            max_retries: parse_number("FETCH_MAX_RETRIES", &var("FETCH_MAX_RETRIES", "2"))?,
            concurrency: parse_number("FETCH_CONCURRENCY", &var("FETCH_CONCURRENCY", "4"))?,
            ..defaults
        };

        let api_key = var("NOTION_API_KEY", "");
        let database_id = var("NOTION_DATABASE_ID", "");
        // Half a Notion setup is a mistake, not an opt-out.
        match (api_key.is_empty(), database_id.is_empty()) {
            (false, true) => return Err(ConfigError::MissingCredential("NOTION_DATABASE_ID")),
            (true, false) => return Err(ConfigError::MissingCredential("NOTION_API_KEY")),
            _ => {}
        }
        let notion = (!api_key.is_empty()).then(|| NotionConfig {
            api_key,
            database_id,
            page_title_prefix: var("NOTION_PAGE_TITLE_PREFIX", "Daily YouTube Feed"),
            daily_digest: var("NOTION_DAILY_DIGEST", "false").eq_ignore_ascii_case("true"),
            date_property: Some(var("NOTION_DATE_PROPERTY", "")).filter(|name| !name.is_empty()),
        });

        let log_format = match var("LOG_FORMAT", "pretty").to_lowercase().as_str() {
            "json" => LogFormat::Json,
            _ => LogFormat::Pretty,
        };

        let config = Config {
            sources,
            output_file: PathBuf::from(var("OUTPUT_FILE", "feeds.json")),
            rss_output_file: PathBuf::from(var("RSS_OUTPUT_FILE", "youtube_feeds.rss")),
            timezone,
            summary_max_words: parse_number(
                "SUMMARY_MAX_WORDS",
                &var("SUMMARY_MAX_WORDS", &DEFAULT_SUMMARY_WORDS.to_string()),
            )?,
            schedule_time,
            fetch,
            rss_feed_title: var("RSS_FEED_TITLE", "My YouTube Feeds"),
            notion,
            log_format,
        };

        config.validate_values()?;
        Ok(config)
    }

    /// Replace the configured sources with the given channel ids.
    pub fn with_channels(mut self, channels: &str) -> Self {
        self.sources = parse_channels(channels);
        self
    }

    fn validate_values(&self) -> Result<(), ConfigError> {
        if self.sources.is_empty() {
            return Err(ConfigError::NoSources);
        }
        if self.summary_max_words == 0 {
            return Err(ConfigError::InvalidNumber {
                name: "SUMMARY_MAX_WORDS",
                value: "0".to_string(),
            });
        }
        if self.fetch.concurrency == 0 {
            return Err(ConfigError::InvalidNumber {
                name: "FETCH_CONCURRENCY",
                value: "0".to_string(),
            });
        }
        Ok(())
    }

    /// Checks that must pass before any fetch starts: sources present and both
    /// output locations writable.
    pub fn validate(&self) -> Result<(), ConfigError> {
        self.validate_values()?;
        ensure_writable_dir(&self.output_file)?;
        ensure_writable_dir(&self.rss_output_file)?;
        Ok(())
    }
}

pub fn parse_channels(list: &str) -> Vec<Source> {
    list.split(',')
        .map(str::trim)
        .filter(|id| !id.is_empty())
        .map(Source::youtube_channel)
        .collect()
}

fn parse_number<T: FromStr>(name: &'static str, value: &str) -> Result<T, ConfigError> {
    value.parse().map_err(|_| ConfigError::InvalidNumber {
        name,
        value: value.to_string(),
    })
}

fn ensure_writable_dir(file: &Path) -> Result<(), ConfigError> {
    let dir = match file.parent().filter(|p| !p.as_os_str().is_empty()) {
        Some(dir) => dir.to_path_buf(),
        None => PathBuf::from("."),
    };

    std::fs::create_dir_all(&dir).map_err(|e| ConfigError::OutputDirUnwritable {
        path: dir.clone(),
        reason: e.to_string(),
    })?;

    let metadata = std::fs::metadata(&dir).map_err(|e| ConfigError::OutputDirUnwritable {
        path: dir.clone(),
        reason: e.to_string(),
    })?;

    if !metadata.is_dir() {
        return Err(ConfigError::OutputDirUnwritable {
            path: dir,
            reason: "not a directory".to_string(),
        });
    }
    // Permission bits alone miss ACLs and ownership; try an actual write.
    tempfile::NamedTempFile::new_in(&dir).map_err(|e| ConfigError::OutputDirUnwritable {
        path: dir.clone(),
        reason: e.to_string(),
    })?;
    Ok(())
}
