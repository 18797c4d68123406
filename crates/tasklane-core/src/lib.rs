//! tasklane-core
//!
//! Core building blocks for the Tasklane pipeline: typed messages come off a
//! queue, are dispatched to a handler by task type, and their lifecycle is
//! recorded in a status store.
//!
//! # モジュール構成
//! - **domain**: ドメインモデル（ids, task_type, message, status, outcome, errors）
//! - **ports**: 抽象化レイヤー（StatusStore, QueueTransport, Clock, IdGenerator）
//! - **typed**: 型付き Task API（Task trait, Handler trait, TypedRegistry）
//! - **handlers**: 組み込み handler（IMAGE_RESIZE, SEND_EMAIL, PROCESS_DATA）
//! - **app**: アプリケーションロジック（builder, dispatcher, intake, worker_pool, submit, status）
//! - **impls**: 実装（InMemoryTransport / InMemoryStatusStore、開発・テスト用）
//! - **aws**: SQS / DynamoDB アダプタ（feature `aws`）
//! - **config**: 環境変数からのワーカー設定
//!
//! # 配送モデル
//! at-least-once。Dispatcher は同じ task_id の再配送を冪等に扱い、
//! 最後の書き込みが勝つ（last-write-wins）。

pub mod app;
pub mod config;
pub mod domain;
pub mod handlers;
pub mod impls;
pub mod ports;
pub mod typed;

#[cfg(feature = "aws")]
pub mod aws;

pub use app::{App, AppBuilder, Dispatcher, IntakeLoop, WorkerPool};
pub use config::WorkerConfig;
pub use domain::{Outcome, Priority, StatusRecord, TaskId, TaskMessage, TaskStatus, TaskType};
