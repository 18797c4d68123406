//! Status - 運用向けの読み取り専用クエリ
//!
//! Status Store への point lookup と件数上限付きの一覧だけを提供します。
//! 処理コアの一部ではありません。

use serde::{Deserialize, Serialize};
use std::sync::Arc;

use crate::domain::{StatusRecord, StoreError, TaskId, TaskStatus};
use crate::ports::StatusStore;

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct StatusCounts {
    pub processing: usize,
    pub completed: usize,
    pub failed: usize,
}

pub struct StatusQuery {
    store: Arc<dyn StatusStore>,
}

impl StatusQuery {
    pub fn new(store: Arc<dyn StatusStore>) -> Self {
        Self { store }
    }

    /// `Ok(None)` when the task has never been seen.
    pub async fn get(&self, task_id: &TaskId) -> Result<Option<StatusRecord>, StoreError> {
        match self.store.read(task_id).await {
            Ok(record) => Ok(Some(record)),
            Err(StoreError::NotFound(_)) => Ok(None),
            Err(e) => Err(e),
        }
    }

    /// Scan up to `limit` records and order them newest first.
    ///
    /// The scan itself is unordered, so this is "recent among the scanned",
    /// not a global top-N.
    pub async fn list_recent(&self, limit: usize) -> Result<Vec<StatusRecord>, StoreError> {
        let mut records = self.store.scan(limit).await?;
        records.sort_by(|a, b| {
            b.timestamp
                .cmp(&a.timestamp)
                .then_with(|| b.updated_at.cmp(&a.updated_at))
        });
        Ok(records)
    }

    pub async fn counts(&self, limit: usize) -> Result<StatusCounts, StoreError> {
        let mut counts = StatusCounts::default();
        for record in self.store.scan(limit).await? {
            match record.status {
                TaskStatus::Processing => counts.processing += 1,
                TaskStatus::Completed => counts.completed += 1,
                TaskStatus::Failed => counts.failed += 1,
            }
        }
        Ok(counts)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{StatusUpdate, TaskType};
    use crate::impls::InMemoryStatusStore;
    use crate::ports::FixedClock;
    use chrono::{TimeZone, Utc};
    use serde_json::json;

    fn id(s: &str) -> TaskId {
        TaskId::new(s).unwrap()
    }

    #[tokio::test]
    async fn get_missing_is_none() {
        let query = StatusQuery::new(Arc::new(InMemoryStatusStore::new()));
        assert!(query.get(&id("missing")).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn list_recent_is_newest_first() {
        let clock = Arc::new(FixedClock::new(Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap()));
        let store = Arc::new(InMemoryStatusStore::with_clock(clock.clone()));

        for name in ["old", "mid", "new"] {
            store
                .write(StatusUpdate::completed(id(name), json!({})))
                .await
                .unwrap();
            clock.advance(chrono::Duration::seconds(10));
        }

        let query = StatusQuery::new(store);
        let names: Vec<String> = query
            .list_recent(10)
            .await
            .unwrap()
            .into_iter()
            .map(|r| r.task_id.to_string())
            .collect();
        assert_eq!(names, vec!["new", "mid", "old"]);
    }

    #[tokio::test]
    async fn counts_by_status() {
        let store = Arc::new(InMemoryStatusStore::new());
        store
            .write(StatusUpdate::processing(id("a"), &TaskType::send_email()))
            .await
            .unwrap();
        store
            .write(StatusUpdate::completed(id("b"), json!({})))
            .await
            .unwrap();
        store.write(StatusUpdate::failed(id("c"), "x")).await.unwrap();
        store.write(StatusUpdate::failed(id("d"), "y")).await.unwrap();

        let counts = StatusQuery::new(store).counts(100).await.unwrap();
        assert_eq!(
            counts,
            StatusCounts {
                processing: 1,
                completed: 1,
                failed: 2,
            }
        );
    }
}
