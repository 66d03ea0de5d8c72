use crate::aggregator::Aggregator;
use crate::error::SinkError;
use crate::sinks::{FeedSink, FileSink};
use crate::sync::{DigestOptions, RecordStoreSync, SyncReport};
use crate::traits::RecordStore;
use crate::types::{FeedAggregate, RunPhase, Source};
use chrono_tz::Tz;
use std::path::PathBuf;
use std::sync::Arc;
use tracing::info;

/// Outcome of one full run: the aggregate plus what each sink made of it.
#[derive(Debug)]
pub struct RunReport {
    pub aggregate: FeedAggregate,
    pub snapshot: Result<(), SinkError>,
    pub feed: Result<(), SinkError>,
    /// `None` when no record store is configured.
    pub sync: Option<SyncReport>,
}

impl RunReport {
    /// 1 when every configured source failed, 0 otherwise.
    pub fn exit_code(&self) -> i32 {
        if self.aggregate.all_failed() {
            1
        } else {
            0
        }
    }

    pub fn sinks_ok(&self) -> bool {
        self.snapshot.is_ok() && self.feed.is_ok() && self.sync.as_ref().map_or(true, |s| s.failed == 0)
    }
}

/// One run is: aggregate every source, then hand the aggregate to each sink.
/// Sinks run one after another but a failing sink never stops the next one.
pub struct Pipeline {
    aggregator: Aggregator,
    snapshot_path: PathBuf,
    feed_path: PathBuf,
    feed_sink: FeedSink,
    store: Option<Arc<dyn RecordStore>>,
    digest_prefix: Option<String>,
    timezone: Tz,
}

impl Pipeline {
    pub fn new(
        aggregator: Aggregator,
        snapshot_path: impl Into<PathBuf>,
        feed_path: impl Into<PathBuf>,
        feed_sink: FeedSink,
    ) -> Self {
        Self {
            aggregator,
            snapshot_path: snapshot_path.into(),
            feed_path: feed_path.into(),
            feed_sink,
            store: None,
            digest_prefix: None,
            timezone: Tz::UTC,
        }
    }

    pub fn with_store(mut self, store: Arc<dyn RecordStore>) -> Self {
        self.store = Some(store);
        self
    }

    /// Also upsert a daily digest record titled `"{prefix} - YYYY-MM-DD"`.
    pub fn with_daily_digest(mut self, title_prefix: impl Into<String>) -> Self {
        self.digest_prefix = Some(title_prefix.into());
        self
    }

    /// Timezone the digest date is taken in.
    pub fn with_timezone(mut self, timezone: Tz) -> Self {
        self.timezone = timezone;
        self
    }

    pub async fn run_once(&self, sources: &[Source]) -> RunReport {
        info!(phase = %RunPhase::Idle, "Starting run over {} sources", sources.len());
        let aggregate = self.aggregator.run_once(sources).await;

        info!(phase = %RunPhase::Sinking, "Writing {} videos to sinks", aggregate.video_count());

        // Each sink logs its own failure.
        let snapshot = FileSink::write(&aggregate, &self.snapshot_path).await;
        let feed = self.feed_sink.write(&aggregate, &self.feed_path).await;

        let sync = match &self.store {
            Some(store) => Some(self.sync_store(store.as_ref(), &aggregate).await),
            None => None,
        };

        let report = RunReport {
            aggregate,
            snapshot,
            feed,
            sync,
        };

        info!(
            phase = %RunPhase::Done,
            "Run finished: {} videos, {}/{} sources ok, sinks ok: {}",
            report.aggregate.video_count(),
            report.aggregate.succeeded_count(),
            report.aggregate.total_sources,
            report.sinks_ok()
        );
        report
    }

    async fn sync_store(&self, store: &dyn RecordStore, aggregate: &FeedAggregate) -> SyncReport {
        let mut sync = RecordStoreSync::new(store);
        if let Some(prefix) = &self.digest_prefix {
            sync = sync.with_digest(DigestOptions {
                title_prefix: prefix.clone(),
                date: aggregate.fetched_at.with_timezone(&self.timezone).date_naive(),
            });
        }
        sync.sync(aggregate).await
    }
}
