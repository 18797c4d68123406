//! Impls - ports の実装（開発用・テスト用）
//!
//! # 含まれる実装
//! - **InMemoryTransport**: SQS 風の配送セマンティクスを持つキュー
//! - **InMemoryStatusStore**: HashMap ベースの Status Store
//!
//! 本番用の実装（SQS / DynamoDB）は `aws` feature の `crate::aws` にあります。

pub mod inmem_status;
pub mod inmem_transport;

pub use self::inmem_status::InMemoryStatusStore;
pub use self::inmem_transport::{InMemoryTransport, InMemoryTransportConfig};
