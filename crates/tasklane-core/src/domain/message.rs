//! TaskMessage - queue 上を流れる wire format
//!
//! ```json
//! {"task_id": "SEND_EMAIL-01HZX...", "type": "SEND_EMAIL", "data": "user@example.com", "priority": "NORMAL"}
//! ```
//!
//! `data` の形は handler ごとに異なり、Dispatcher からは不透明です。
//!
//! # decode は二段階
//! 1. JSON として読めて `task_id` が取れるか（取れなければ `Malformed`）
//! 2. envelope 全体（取れなければ `InvalidEnvelope`、task_id 付き）
//!
//! `priority` は補助情報なので、読めない値は NORMAL として扱います。

use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Value;
use std::fmt;

use super::errors::DecodeError;
use super::ids::TaskId;
use super::task_type::TaskType;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Priority {
    Low,
    #[default]
    Normal,
    High,
}

impl fmt::Display for Priority {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Priority::Low => "LOW",
            Priority::Normal => "NORMAL",
            Priority::High => "HIGH",
        };
        f.write_str(s)
    }
}

impl std::str::FromStr for Priority {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_uppercase().as_str() {
            "LOW" => Ok(Priority::Low),
            "NORMAL" => Ok(Priority::Normal),
            "HIGH" => Ok(Priority::High),
            other => Err(format!("unknown priority: {other}")),
        }
    }
}

/// A task message as received from (or sent to) the transport.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TaskMessage {
    pub task_id: TaskId,

    #[serde(rename = "type")]
    pub task_type: TaskType,

    pub data: serde_json::Value,

    /// Older producers omit it.
    #[serde(default, deserialize_with = "lenient_priority")]
    pub priority: Priority,
}

/// Only the key is needed to record a failure.
#[derive(Deserialize)]
struct EnvelopeKey {
    task_id: TaskId,
}

fn lenient_priority<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Priority, D::Error> {
    let raw = Option::<Value>::deserialize(deserializer)?;
    let priority = match &raw {
        None => Priority::default(),
        Some(Value::String(s)) => s.parse::<Priority>().unwrap_or_else(|e: String| {
            tracing::warn!(error = %e, "unreadable priority, using NORMAL");
            Priority::default()
        }),
        Some(other) => {
            tracing::warn!(priority = %other, "unreadable priority, using NORMAL");
            Priority::default()
        }
    };
    Ok(priority)
}

impl TaskMessage {
    pub fn new(task_id: TaskId, task_type: TaskType, data: serde_json::Value) -> Self {
        Self {
            task_id,
            task_type,
            data,
            priority: Priority::default(),
        }
    }

    pub fn with_priority(mut self, priority: Priority) -> Self {
        self.priority = priority;
        self
    }

    /// Decode a raw message body.
    pub fn decode(body: &str) -> Result<Self, DecodeError> {
        let value: Value = serde_json::from_str(body)?;
        let EnvelopeKey { task_id } = EnvelopeKey::deserialize(&value)?;

        TaskMessage::deserialize(&value).map_err(|e| DecodeError::InvalidEnvelope {
            task_id,
            task_type: value
                .get("type")
                .and_then(|t| TaskType::deserialize(t).ok()),
            reason: e.to_string(),
        })
    }

    pub fn encode(&self) -> Result<String, DecodeError> {
        Ok(serde_json::to_string(self)?)
    }
}
