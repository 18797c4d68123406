//! StatusStore port - taskId -> 現在のステータスレコード
//!
//! # 設計原則
//! - 書き込みは upsert（last-write-wins）。既存レコードの上書きはエラーではない
//! - `updatedAt` は store 側で打刻する
//! - 個々の upsert の原子性は store が保証する。core 側はロックも
//!   複数キーのトランザクションも行わない
//! - 書き込みは即座に外部（ステータス確認ツール）から観測できる

use async_trait::async_trait;

use crate::domain::{StatusRecord, StatusUpdate, StoreError, TaskId};

#[async_trait]
pub trait StatusStore: Send + Sync {
    /// Upsert the record for `update.task_id`, stamping `updatedAt`.
    async fn write(&self, update: StatusUpdate) -> Result<StatusRecord, StoreError>;

    /// `StoreError::NotFound` when no record exists.
    async fn read(&self, task_id: &TaskId) -> Result<StatusRecord, StoreError>;

    /// Up to `limit` records, in no particular order.
    async fn scan(&self, limit: usize) -> Result<Vec<StatusRecord>, StoreError>;
}
