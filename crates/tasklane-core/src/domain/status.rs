//! Lifecycle status of a task.
//!
//! One current record exists per task id. Writes overwrite (last-write-wins);
//! no history of earlier states is kept.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

use super::ids::TaskId;
use super::task_type::TaskType;

/// State transitions per delivery attempt:
/// - (received) -> Processing -> Completed
/// - (received) -> Processing -> Failed
///
/// A redelivered task starts over at Processing, so a Failed record can be
/// replaced by Completed on retry (and vice versa).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum TaskStatus {
    Processing,
    Completed,
    Failed,
}

impl TaskStatus {
    pub fn is_terminal(self) -> bool {
        matches!(self, TaskStatus::Completed | TaskStatus::Failed)
    }

    pub fn as_str(self) -> &'static str {
        match self {
            TaskStatus::Processing => "PROCESSING",
            TaskStatus::Completed => "COMPLETED",
            TaskStatus::Failed => "FAILED",
        }
    }

    /// Single-character marker used by status listings.
    pub fn symbol(self) -> char {
        match self {
            TaskStatus::Completed => '✓',
            TaskStatus::Processing => '⟳',
            TaskStatus::Failed => '✗',
        }
    }
}

impl fmt::Display for TaskStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for TaskStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "PROCESSING" => Ok(TaskStatus::Processing),
            "COMPLETED" => Ok(TaskStatus::Completed),
            "FAILED" => Ok(TaskStatus::Failed),
            other => Err(format!("unknown task status: {other}")),
        }
    }
}

/// A write request for the status store. The store stamps the time.
#[derive(Debug, Clone, PartialEq)]
pub struct StatusUpdate {
    pub task_id: TaskId,
    pub status: TaskStatus,
    pub result: Option<serde_json::Value>,
    pub error: Option<String>,
}

impl StatusUpdate {
    /// The PROCESSING write carries the declared task type as context.
    pub fn processing(task_id: TaskId, task_type: &TaskType) -> Self {
        Self {
            task_id,
            status: TaskStatus::Processing,
            result: Some(serde_json::json!({ "type": task_type.as_str() })),
            error: None,
        }
    }

    pub fn completed(task_id: TaskId, result: serde_json::Value) -> Self {
        Self {
            task_id,
            status: TaskStatus::Completed,
            result: Some(result),
            error: None,
        }
    }

    pub fn failed(task_id: TaskId, error: impl Into<String>) -> Self {
        Self {
            task_id,
            status: TaskStatus::Failed,
            result: None,
            error: Some(error.into()),
        }
    }
}

/// The current record for a task, as persisted.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StatusRecord {
    pub task_id: TaskId,
    pub status: TaskStatus,
    pub updated_at: DateTime<Utc>,

    /// Epoch seconds of `updated_at`; listings sort on it.
    pub timestamp: i64,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub result: Option<serde_json::Value>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl StatusRecord {
    pub fn from_update(update: StatusUpdate, now: DateTime<Utc>) -> Self {
        Self {
            task_id: update.task_id,
            status: update.status,
            updated_at: now,
            timestamp: now.timestamp(),
            result: update.result,
            error: update.error,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn status_serializes_as_screaming_names() {
        assert_eq!(
            serde_json::to_string(&TaskStatus::Processing).unwrap(),
            "\"PROCESSING\""
        );
        assert_eq!(
            serde_json::to_string(&TaskStatus::Completed).unwrap(),
            "\"COMPLETED\""
        );
        assert_eq!(serde_json::to_string(&TaskStatus::Failed).unwrap(), "\"FAILED\"");
    }

    #[test]
    fn processing_update_carries_task_type() {
        let id = TaskId::new("t-1").unwrap();
        let update = StatusUpdate::processing(id, &TaskType::image_resize());
        assert_eq!(update.status, TaskStatus::Processing);
        assert_eq!(update.result, Some(serde_json::json!({"type": "IMAGE_RESIZE"})));
        assert!(update.error.is_none());
    }

    #[test]
    fn record_uses_camel_case_and_omits_empty_fields() {
        let now = Utc.with_ymd_and_hms(2024, 1, 1, 12, 0, 0).unwrap();
        let id = TaskId::new("t-1").unwrap();
        let record = StatusRecord::from_update(StatusUpdate::failed(id, "boom"), now);

        let v = serde_json::to_value(&record).unwrap();
        assert_eq!(v["taskId"], "t-1");
        assert_eq!(v["status"], "FAILED");
        assert_eq!(v["error"], "boom");
        assert_eq!(v["timestamp"], now.timestamp());
        assert!(v.get("result").is_none());
    }

    #[test]
    fn only_completed_and_failed_are_terminal() {
        assert!(!TaskStatus::Processing.is_terminal());
        assert!(TaskStatus::Completed.is_terminal());
        assert!(TaskStatus::Failed.is_terminal());
    }
}
