//! Domain identifiers.
//!
//! `TaskId` は producer が投入時に一度だけ割り当てる文字列 ID です。
//! consumer 側はこれを信頼して、ステータス追跡の唯一のキーとして使います。
//!
//! ## 形式
//! - 生成される ID は `{TASK_TYPE}-{ULID}`（例: `SEND_EMAIL-01HZX...`）
//! - 受信側は形式を検証しない（空文字列だけを拒否する）

use serde::{Deserialize, Serialize};
use std::fmt;
use ulid::Ulid;

use super::task_type::TaskType;

/// Identifier of a task for its whole lifetime.
///
/// Deserialization rejects the empty string, so a decoded `TaskMessage`
/// always carries a usable key.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct TaskId(String);

impl TaskId {
    /// Wrap a producer-assigned id. Returns `None` for an empty/blank value.
    pub fn new(value: impl Into<String>) -> Option<Self> {
        let value = value.into();
        if value.trim().is_empty() {
            None
        } else {
            Some(Self(value))
        }
    }

    /// `{task_type}-{ulid}`
    pub fn from_parts(task_type: &TaskType, ulid: Ulid) -> Self {
        Self(format!("{}-{}", task_type, ulid))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl TryFrom<String> for TaskId {
    type Error = String;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::new(value).ok_or_else(|| "task_id must not be empty".to_string())
    }
}

impl From<TaskId> for String {
    fn from(id: TaskId) -> Self {
        id.0
    }
}

impl fmt::Display for TaskId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn blank_ids_are_rejected() {
        assert!(TaskId::new("").is_none());
        assert!(TaskId::new("   ").is_none());
        assert!(TaskId::new("abc").is_some());
    }

    #[test]
    fn from_parts_prefixes_task_type() {
        let ulid = Ulid::new();
        let id = TaskId::from_parts(&TaskType::send_email(), ulid);
        assert_eq!(id.as_str(), format!("SEND_EMAIL-{ulid}"));
    }

    #[test]
    fn deserialize_rejects_empty_string() {
        let err = serde_json::from_str::<TaskId>("\"\"").unwrap_err();
        assert!(err.to_string().contains("must not be empty"));

        let id: TaskId = serde_json::from_str("\"t-1\"").unwrap();
        assert_eq!(id.as_str(), "t-1");
    }
}
