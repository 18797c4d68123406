//! InMemoryStatusStore - 開発・テスト用の Status Store
//!
//! - HashMap<TaskId, StatusRecord> を RwLock で保護
//! - write は upsert（同じキーは丸ごと上書き）

use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::RwLock;

use crate::domain::{StatusRecord, StatusUpdate, StoreError, TaskId};
use crate::ports::{Clock, StatusStore, SystemClock};

pub struct InMemoryStatusStore {
    records: RwLock<HashMap<TaskId, StatusRecord>>,
    clock: Arc<dyn Clock>,
}

impl InMemoryStatusStore {
    pub fn new() -> Self {
        Self::with_clock(Arc::new(SystemClock))
    }

    pub fn with_clock(clock: Arc<dyn Clock>) -> Self {
        Self {
            records: RwLock::new(HashMap::new()),
            clock,
        }
    }

    pub async fn len(&self) -> usize {
        self.records.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.records.read().await.is_empty()
    }
}

impl Default for InMemoryStatusStore {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl StatusStore for InMemoryStatusStore {
    async fn write(&self, update: StatusUpdate) -> Result<StatusRecord, StoreError> {
        let record = StatusRecord::from_update(update, self.clock.now());
        let mut records = self.records.write().await;
        records.insert(record.task_id.clone(), record.clone());
        Ok(record)
    }

    async fn read(&self, task_id: &TaskId) -> Result<StatusRecord, StoreError> {
        let records = self.records.read().await;
        records
            .get(task_id)
            .cloned()
            .ok_or_else(|| StoreError::NotFound(task_id.to_string()))
    }

    async fn scan(&self, limit: usize) -> Result<Vec<StatusRecord>, StoreError> {
        let records = self.records.read().await;
        Ok(records.values().take(limit).cloned().collect())
    }
}
