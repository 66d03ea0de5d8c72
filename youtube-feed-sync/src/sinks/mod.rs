pub mod rss_feed;
pub mod snapshot;

pub use rss_feed::FeedSink;
pub use snapshot::FileSink;

use crate::error::SinkError;
use std::path::{Path, PathBuf};
use tracing::debug;

/// Sibling path the content is staged in before the rename.
fn staging_path(path: &Path) -> Result<PathBuf, SinkError> {
    let file_name = path
        .file_name()
        .and_then(|n| n.to_str())
        .filter(|n| !n.is_empty())
        .ok_or_else(|| SinkError::PathInvalid {
            path: path.to_path_buf(),
            reason: "path has no file name".to_string(),
        })?;
    Ok(path.with_file_name(format!(".{}.tmp", file_name)))
}

/// Replace `path` with `contents` so readers see either the old or the new file, never a partial one.
pub(crate) async fn atomic_write(path: &Path, contents: &[u8]) -> Result<(), SinkError> {
    let staging = staging_path(path)?;

    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        tokio::fs::create_dir_all(parent)
            .await
            .map_err(|e| SinkError::from_io(parent, e))?;
    }

    tokio::fs::write(&staging, contents)
        .await
        .map_err(|e| SinkError::from_io(&staging, e))?;

    if let Err(e) = tokio::fs::rename(&staging, path).await {
        let _ = tokio::fs::remove_file(&staging).await;
        return Err(SinkError::from_io(path, e));
    }

    debug!("Wrote {} bytes to {}", contents.len(), path.display());
    Ok(())
}
