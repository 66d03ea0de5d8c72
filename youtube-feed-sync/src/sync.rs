use crate::error::SyncError;
use crate::record_store::StoreRecord;
use crate::traits::RecordStore;
use crate::types::FeedAggregate;
use chrono::NaiveDate;
use serde::Serialize;
use tracing::{error, info, warn};

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SyncFailure {
    pub id: String,
    pub reason: String,
}

/// Tally of one sync pass; what callers inspect to judge the run.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct SyncReport {
    pub created: usize,
    pub skipped: usize,
    pub failed: usize,
    pub failures: Vec<SyncFailure>,
}

impl SyncReport {
    pub fn total(&self) -> usize {
        self.created + self.skipped + self.failed
    }

    fn record_failure(&mut self, id: &str, reason: &SyncError) {
        self.failed += 1;
        self.failures.push(SyncFailure {
            id: id.to_string(),
            reason: reason.to_string(),
        });
    }
}

enum Upsert {
    Created,
    Skipped,
}

/// Optional daily overview record created alongside the video records.
#[derive(Debug, Clone)]
pub struct DigestOptions {
    pub title_prefix: String,
    pub date: NaiveDate,
}

/// Creates one store record per video id, leaving existing ones alone.
pub struct RecordStoreSync<'a> {
    store: &'a dyn RecordStore,
    digest: Option<DigestOptions>,
}

impl<'a> RecordStoreSync<'a> {
    pub fn new(store: &'a dyn RecordStore) -> Self {
        Self { store, digest: None }
    }

    pub fn with_digest(mut self, digest: DigestOptions) -> Self {
        self.digest = Some(digest);
        self
    }

    /// Sync every video in the aggregate. Running this any number of times
    /// over the same aggregate leaves exactly one record per video id.
    pub async fn sync(&self, aggregate: &FeedAggregate) -> SyncReport {
        let mut report = SyncReport::default();
        info!("Syncing {} videos to {}", aggregate.video_count(), self.store.store_name());

        for video in aggregate.videos() {
            let record = StoreRecord::from_video(video);
            self.upsert_into(&record, &mut report).await;
        }

        if let Some(digest) = &self.digest {
            let record = StoreRecord::daily_digest(aggregate, &digest.title_prefix, digest.date);
            self.upsert_into(&record, &mut report).await;
        }

        if report.failed > 0 {
            error!(
                "Sync finished with failures: created={} skipped={} failed={}",
                report.created, report.skipped, report.failed
            );
        } else {
            info!(
                "Sync finished: {} records, created={} skipped={}",
                report.total(),
                report.created,
                report.skipped
            );
        }
        report
    }

    async fn upsert_into(&self, record: &StoreRecord, report: &mut SyncReport) {
        match self.upsert(record).await {
            Ok(Upsert::Created) => report.created += 1,
            Ok(Upsert::Skipped) => report.skipped += 1,
            Err(e) => {
                error!("Failed to sync record {}: {}", record.key, e);
                report.record_failure(&record.key, &e);
            }
        }
    }

    async fn upsert(&self, record: &StoreRecord) -> Result<Upsert, SyncError> {
        if self.store.exists(&record.key).await? {
            warn!("Skipping duplicate record {} ({})", record.key, record.title);
            return Ok(Upsert::Skipped);
        }
        self.store.create(record).await?;
        info!("Created record for {} ({})", record.key, record.title);
        Ok(Upsert::Created)
    }
}
