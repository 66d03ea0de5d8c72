use std::path::PathBuf;

/// Failure to obtain entries for one source.
#[derive(Debug, Clone, thiserror::Error)]
pub enum FetchError {
    #[error("network error fetching {source_id}: {cause}")]
    Network { source_id: String, cause: String },

    #[error("malformed feed for {source_id}: {cause}")]
    Malformed { source_id: String, cause: String },
}

impl FetchError {
    pub fn source_id(&self) -> &str {
        match self {
            FetchError::Network { source_id, .. } | FetchError::Malformed { source_id, .. } => source_id,
        }
    }
}

/// Reason a single feed entry could not become a [`crate::VideoRecord`].
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum NormalizeError {
    #[error("entry has neither a link nor a guid")]
    MissingId,

    #[error("unparseable publish timestamp: {value:?}")]
    BadTimestamp { value: Option<String> },
}

#[derive(Debug, thiserror::Error)]
pub enum SinkError {
    #[error("permission denied writing {path}")]
    WritePermission {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("invalid output path {path}: {reason}")]
    PathInvalid { path: PathBuf, reason: String },

    #[error("IO error on {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("encoding error: {0}")]
    Encode(String),
}

impl SinkError {
    pub(crate) fn from_io(path: &std::path::Path, source: std::io::Error) -> Self {
        match source.kind() {
            std::io::ErrorKind::PermissionDenied => SinkError::WritePermission {
                path: path.to_path_buf(),
                source,
            },
            std::io::ErrorKind::NotFound | std::io::ErrorKind::InvalidInput => SinkError::PathInvalid {
                path: path.to_path_buf(),
                reason: source.to_string(),
            },
            _ => SinkError::Io {
                path: path.to_path_buf(),
                source,
            },
        }
    }
}

impl From<serde_json::Error> for SinkError {
    fn from(e: serde_json::Error) -> Self {
        SinkError::Encode(e.to_string())
    }
}

/// Failure talking to the external record store.
#[derive(Debug, Clone, thiserror::Error)]
pub enum SyncError {
    #[error("record store unreachable: {0}")]
    Unreachable(String),

    #[error("record store rejected request (HTTP {status}): {body}")]
    Rejected { status: u16, body: String },

    #[error("unexpected record store response: {0}")]
    Decode(String),
}

impl From<reqwest::Error> for SyncError {
    fn from(e: reqwest::Error) -> Self {
        if e.is_decode() {
            SyncError::Decode(e.to_string())
        } else {
            SyncError::Unreachable(e.to_string())
        }
    }
}

/// Fatal problems detected before any fetch starts.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("no sources configured")]
    NoSources,

    #[error("invalid timezone: {0}")]
    InvalidTimezone(String),

    #[error("invalid schedule time {0:?}, expected HH:MM")]
    InvalidRunTime(String),

    #[error("invalid value for {name}: {value:?}")]
    InvalidNumber { name: &'static str, value: String },

    #[error("output directory {path} is not writable: {reason}")]
    OutputDirUnwritable { path: PathBuf, reason: String },

    #[error("missing credential: {0}")]
    MissingCredential(&'static str),
}
