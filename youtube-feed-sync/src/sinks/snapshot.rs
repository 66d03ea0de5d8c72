use super::atomic_write;
use crate::error::SinkError;
use crate::types::FeedAggregate;
use std::path::Path;
use tracing::{error, info};

/// Writes the whole aggregate, failure markers included, as pretty JSON.
pub struct FileSink;

impl FileSink {
    pub async fn write(aggregate: &FeedAggregate, path: &Path) -> Result<(), SinkError> {
        let json = serde_json::to_vec_pretty(aggregate)?;

        match atomic_write(path, &json).await {
            Ok(()) => {
                info!(
                    "Snapshot with {} sources and {} videos saved to {}",
                    aggregate.total_sources,
                    aggregate.video_count(),
                    path.display()
                );
                Ok(())
            }
            Err(e) => {
                error!("Error saving snapshot to {}: {}", path.display(), e);
                Err(e)
            }
        }
    }

    pub async fn read(path: &Path) -> Result<FeedAggregate, SinkError> {
        let bytes = tokio::fs::read(path).await.map_err(|e| SinkError::from_io(path, e))?;
        Ok(serde_json::from_slice(&bytes)?)
    }
}
