//! Errors - 境界ごとのエラー型
//!
//! # 分類
//! - DecodeError: 壊れた envelope
//!   - `Malformed`: task_id が無いのでステータスを書けない
//!   - `InvalidEnvelope`: task_id はあるので FAILED を記録できる
//! - HandlerError: handler の失敗（payload decode 失敗を含む）
//! - StoreError: Status Store の障害（インフラ系、唯一 Intake まで伝播する）
//! - QueueError: Queue Transport の障害
//! - RegistryError: 起動時の handler 登録エラー
//! - ConfigError: 環境変数の読み込みエラー

use thiserror::Error;

use super::ids::TaskId;
use super::task_type::TaskType;

/// The raw message body is not a valid task envelope.
#[derive(Debug, Error)]
pub enum DecodeError {
    /// Not JSON, or no usable `task_id`.
    #[error("malformed task message: {0}")]
    Malformed(#[from] serde_json::Error),

    /// `task_id` is readable but the rest of the envelope is not.
    #[error("invalid task message {task_id}: {reason}")]
    InvalidEnvelope {
        task_id: TaskId,
        task_type: Option<TaskType>,
        reason: String,
    },
}

/// Failure reported by (or on behalf of) a handler.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum HandlerError {
    /// `data` did not match the payload type of the handler.
    #[error("invalid payload: {0}")]
    InvalidPayload(String),

    /// The handler ran and declared a failure.
    #[error("{0}")]
    Failed(String),
}

impl HandlerError {
    pub fn failed(message: impl Into<String>) -> Self {
        Self::Failed(message.into())
    }
}

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("status record not found for task_id={0}")]
    NotFound(String),

    #[error("status store backend error: {message}")]
    Backend {
        message: String,
        #[source]
        source: Option<Box<dyn std::error::Error + Send + Sync>>,
    },
}

impl StoreError {
    pub fn backend(message: impl Into<String>) -> Self {
        Self::Backend {
            message: message.into(),
            source: None,
        }
    }
}

#[derive(Debug, Error)]
pub enum QueueError {
    /// The receipt does not belong to a message that is currently in flight.
    #[error("invalid or expired receipt: {0}")]
    InvalidReceipt(String),

    #[error("queue operation failed: {message}")]
    OperationFailed {
        message: String,
        #[source]
        source: Option<Box<dyn std::error::Error + Send + Sync>>,
    },
}

impl QueueError {
    pub fn operation(message: impl Into<String>) -> Self {
        Self::OperationFailed {
            message: message.into(),
            source: None,
        }
    }
}

#[derive(Debug, Error)]
pub enum RegistryError {
    #[error("Handler for task type '{0}' is already registered")]
    AlreadyRegistered(String),
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("{0} environment variable must be set")]
    Missing(&'static str),

    #[error("{key} has an invalid value {value:?}: {reason}")]
    Invalid {
        key: &'static str,
        value: String,
        reason: String,
    },
}
