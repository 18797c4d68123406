//! Outcome model: the result of processing one delivery of a task.
//!
//! `Dispatcher::process` never fails past its own boundary; every path ends in
//! an `Outcome`. The intake loop turns it into an acknowledge / leave-for-retry
//! decision, so retry is an explicit policy rather than a side effect of an
//! unhandled error.

use serde::{Deserialize, Serialize};
use std::fmt;

use super::errors::{HandlerError, StoreError};

/// Why a delivery failed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum FailureKind {
    /// No handler registered for the task type.
    UnregisteredType,

    /// `data` could not be decoded into the handler's payload type.
    InvalidPayload,

    /// The handler declared a failure.
    Handler,

    /// The status store rejected a write. The only infrastructural kind.
    Storage,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Failure {
    pub kind: FailureKind,
    pub message: String,
}

impl Failure {
    pub fn new(kind: FailureKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
        }
    }

    pub fn unregistered(task_type: &str) -> Self {
        Self::new(
            FailureKind::UnregisteredType,
            format!("Unknown task type: {task_type}"),
        )
    }

    pub fn storage(err: &StoreError) -> Self {
        Self::new(FailureKind::Storage, err.to_string())
    }

    pub fn is_infrastructure(&self) -> bool {
        self.kind == FailureKind::Storage
    }
}

impl From<HandlerError> for Failure {
    fn from(err: HandlerError) -> Self {
        match err {
            HandlerError::InvalidPayload(_) => Self::new(FailureKind::InvalidPayload, err.to_string()),
            // handler の失敗メッセージはそのまま記録する
            HandlerError::Failed(message) => Self::new(FailureKind::Handler, message),
        }
    }
}

impl fmt::Display for Failure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.message)
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum Outcome {
    Completed(serde_json::Value),
    Failed(Failure),
}

impl Outcome {
    pub fn is_completed(&self) -> bool {
        matches!(self, Outcome::Completed(_))
    }

    pub fn failure(&self) -> Option<&Failure> {
        match self {
            Outcome::Completed(_) => None,
            Outcome::Failed(failure) => Some(failure),
        }
    }
}
