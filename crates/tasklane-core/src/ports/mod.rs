//! Ports - 抽象化レイヤー
//!
//! 外部システム（Queue Transport, Status Store）へのインターフェースです。
//! 実装はプロセス起動時に一度だけ構築され、Dispatcher / IntakeLoop の
//! コンストラクタに注入されます（グローバルなクライアントは持たない）。

pub mod clock;
pub mod id_generator;
pub mod queue_transport;
pub mod status_store;

pub use self::clock::{Clock, FixedClock, SystemClock};
pub use self::id_generator::{IdGenerator, UlidGenerator};
pub use self::queue_transport::{QueueTransport, RawMessage, ReceiptToken};
pub use self::status_store::StatusStore;
