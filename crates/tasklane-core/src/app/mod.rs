//! App - アプリケーション層
//!
//! このモジュールは、ports を組み合わせてパイプラインを実装します。
//!
//! # 主要コンポーネント
//! - **AppBuilder**: アプリケーションの構築とワイヤリング
//! - **Dispatcher**: 1 メッセージの処理（PROCESSING → handler → COMPLETED / FAILED）
//! - **IntakeLoop**: バッチ受信と acknowledge の判断
//! - **WorkerPool**: IntakeLoop を並行に回すワーカー群と graceful shutdown
//! - **Submitter**: producer 側の投入
//! - **StatusQuery**: 運用向けの読み取り

pub mod builder;
pub mod dispatcher;
pub mod intake;
pub mod status;
pub mod submit;
pub mod worker_pool;

// 主要な型を再エクスポート
pub use self::builder::{App, AppBuilder, BuildError};
pub use self::dispatcher::Dispatcher;
pub use self::intake::{BatchReport, IntakeConfig, IntakeLoop};
pub use self::status::{StatusCounts, StatusQuery};
pub use self::submit::{SubmitError, Submitter};
pub use self::worker_pool::{WorkerPool, WorkerPoolConfig};
