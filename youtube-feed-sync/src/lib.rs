pub mod types;
pub mod error;
pub mod utils;
pub mod traits;
pub mod parser;
pub mod fetcher;
pub mod normalizer;
pub mod aggregator;
pub mod sinks;
pub mod record_store;
pub mod sync;
pub mod config;
pub mod pipeline;
pub mod scheduler;

pub use types::*;
pub use error::{ConfigError, FetchError, NormalizeError, SinkError, SyncError};
pub use traits::{FeedFetcher, RecordStore};
pub use parser::FeedParser;
pub use fetcher::Fetcher;
pub use normalizer::RecordNormalizer;
pub use aggregator::Aggregator;
pub use sinks::{FeedSink, FileSink};
pub use record_store::{InMemoryRecordStore, NotionStore, StoreRecord};
pub use sync::{DigestOptions, RecordStoreSync, SyncReport};
pub use config::Config;
pub use pipeline::{Pipeline, RunReport};
pub use scheduler::DailyScheduler;
