//! In-memory [`RecordStore`] for tests and local dry runs.

use std::collections::HashMap;
use std::sync::RwLock;

use async_trait::async_trait;

use super::StoreRecord;
use crate::error::SyncError;
use crate::traits::RecordStore;

#[derive(Default)]
pub struct InMemoryRecordStore {
    records: RwLock<HashMap<String, StoreRecord>>,
}

impl InMemoryRecordStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.records.read().map(|r| r.len()).unwrap_or(0)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn get(&self, key: &str) -> Option<StoreRecord> {
        self.records.read().ok().and_then(|r| r.get(key).cloned())
    }

    pub fn keys(&self) -> Vec<String> {
        let mut keys: Vec<String> = self
            .records
            .read()
            .map(|r| r.keys().cloned().collect())
            .unwrap_or_default();
        keys.sort();
        keys
    }
}

#[async_trait]
impl RecordStore for InMemoryRecordStore {
    fn store_name(&self) -> String {
        "in-memory".to_string()
    }

    async fn exists(&self, key: &str) -> Result<bool, SyncError> {
        let records = self
            .records
            .read()
            .map_err(|_| SyncError::Unreachable("store lock poisoned".to_string()))?;
        Ok(records.contains_key(key))
    }

    async fn create(&self, record: &StoreRecord) -> Result<(), SyncError> {
        let mut records = self
            .records
            .write()
            .map_err(|_| SyncError::Unreachable("store lock poisoned".to_string()))?;
        if records.contains_key(&record.key) {
            return Err(SyncError::Rejected {
                status: 409,
                body: format!("record {} already exists", record.key),
            });
        }
        records.insert(record.key.clone(), record.clone());
        Ok(())
    }
}
