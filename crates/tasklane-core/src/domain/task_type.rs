//! TaskType - handler を選ぶためのタグ
//!
//! 完全一致でのみ解決します（ワイルドカードや継承ベースのマッチングはしない）。
//! 新しい task type の追加は handler の登録だけで済み、Dispatcher や
//! IntakeLoop の変更は不要です。

use serde::{Deserialize, Serialize};
use std::fmt;

pub const IMAGE_RESIZE: &str = "IMAGE_RESIZE";
pub const SEND_EMAIL: &str = "SEND_EMAIL";
pub const PROCESS_DATA: &str = "PROCESS_DATA";

/// Open set of task type tags. Well-known tags have constructors, anything
/// else is still representable so an unknown type can be reported back.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct TaskType(String);

impl TaskType {
    pub fn new(s: impl Into<String>) -> Self {
        Self(s.into())
    }

    pub fn image_resize() -> Self {
        Self::new(IMAGE_RESIZE)
    }

    pub fn send_email() -> Self {
        Self::new(SEND_EMAIL)
    }

    pub fn process_data() -> Self {
        Self::new(PROCESS_DATA)
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl From<&str> for TaskType {
    fn from(s: &str) -> Self {
        Self::new(s)
    }
}

impl fmt::Display for TaskType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}
