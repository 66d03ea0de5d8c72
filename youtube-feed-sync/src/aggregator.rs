use crate::error::FetchError;
use crate::normalizer::RecordNormalizer;
use crate::traits::FeedFetcher;
use crate::types::{
    ChannelContext, FeedAggregate, FetchedFeed, RunPhase, Source, SourceResult, SourceStatus, UNKNOWN_CHANNEL,
};
use chrono::Utc;
use futures::stream::{self, StreamExt};
use std::collections::HashSet;
use std::sync::Arc;
use tracing::{error, info, warn};

/// Fans fetching and normalization out over all configured sources.
pub struct Aggregator {
    fetcher: Arc<dyn FeedFetcher>,
    normalizer: RecordNormalizer,
    concurrency: usize,
}

impl Aggregator {
    pub fn new(fetcher: Arc<dyn FeedFetcher>, normalizer: RecordNormalizer, concurrency: usize) -> Self {
        Self {
            fetcher,
            normalizer,
            concurrency: concurrency.max(1),
        }
    }

    /// Fetch and normalize every source, always returning an aggregate.
    ///
    /// Per-source failures become failure markers; the aggregate is only built
    /// once every fetch has finished or failed.
    pub async fn run_once(&self, sources: &[Source]) -> FeedAggregate {
        let fetched_at = Utc::now();

        info!(phase = %RunPhase::Fetching, "Fetching {} sources", sources.len());
        let fetched = self.fetch_all(sources).await;

        info!(phase = %RunPhase::Normalizing, "Normalizing entries");
        let mut seen_ids = HashSet::new();
        let results: Vec<SourceResult> = sources
            .iter()
            .zip(fetched)
            .map(|(source, outcome)| match outcome {
                Ok(feed) => self.normalize_source(source, feed, &mut seen_ids),
                Err(e) => {
                    error!("Source {} failed: {}", source.id, e);
                    SourceResult::failed(&source.id, e.to_string())
                }
            })
            .collect();

        let aggregate = FeedAggregate::new(fetched_at, results);
        info!(
            phase = %RunPhase::Aggregated,
            "Aggregated {} videos from {}/{} sources",
            aggregate.video_count(),
            aggregate.succeeded_count(),
            aggregate.total_sources
        );
        if aggregate.all_failed() {
            error!("All {} sources failed", aggregate.total_sources);
        } else if aggregate.failed_count() > 0 {
            warn!("{} of {} sources failed", aggregate.failed_count(), aggregate.total_sources);
        }

        aggregate
    }

    /// One result slot per source, in the order given.
    async fn fetch_all(&self, sources: &[Source]) -> Vec<Result<FetchedFeed, FetchError>> {
        stream::iter(sources)
            .map(|source| self.fetcher.fetch(source))
            .buffered(self.concurrency)
            .collect()
            .await
    }

    fn normalize_source(&self, source: &Source, feed: FetchedFeed, seen_ids: &mut HashSet<String>) -> SourceResult {
        let channel = ChannelContext {
            source_id: source.id.clone(),
            channel_title: feed.channel_title.clone().unwrap_or_else(|| UNKNOWN_CHANNEL.to_string()),
            channel_link: feed.channel_link.clone().unwrap_or_default(),
        };

        let mut videos = Vec::with_capacity(feed.entries.len());
        for (position, entry) in feed.entries.iter().enumerate() {
            match self.normalizer.normalize(entry, &channel) {
                Ok(video) if seen_ids.insert(video.id.clone()) => videos.push(video),
                Ok(video) => warn!("Skipping duplicate video {} in source {}", video.id, source.id),
                Err(e) => warn!("Skipping entry {} of source {}: {}", position, source.id, e),
            }
        }

        let status = if feed.entries.is_empty() {
            info!("Source {} returned no entries", source.id);
            SourceStatus::Empty
        } else {
            SourceStatus::Ok
        };

        info!(
            "Source {} ({}): {} of {} entries normalized",
            source.id,
            channel.channel_title,
            videos.len(),
            feed.entries.len()
        );

        SourceResult {
            source_id: source.id.clone(),
            channel_title: channel.channel_title,
            channel_link: channel.channel_link,
            last_updated: Utc::now(),
            status,
            videos,
            warning: feed.warning.map(|w| w.to_string()),
            error: None,
        }
    }
}
