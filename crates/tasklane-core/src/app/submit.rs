//! Submitter - producer 側の投入インターフェース
//!
//! TaskId は投入ごとに一意に生成し、wire format にエンコードして送ります。

use serde_json::Value;
use std::sync::Arc;
use thiserror::Error;

use crate::domain::{DecodeError, Priority, QueueError, TaskId, TaskMessage, TaskType};
use crate::ports::{IdGenerator, QueueTransport};
use crate::typed::Task;

#[derive(Debug, Error)]
pub enum SubmitError {
    #[error("failed to encode task: {0}")]
    Encode(#[from] DecodeError),

    #[error("failed to encode payload: {0}")]
    Payload(#[from] serde_json::Error),

    #[error(transparent)]
    Queue(#[from] QueueError),
}

pub struct Submitter {
    transport: Arc<dyn QueueTransport>,
    ids: Arc<dyn IdGenerator>,
}

impl Submitter {
    pub fn new(transport: Arc<dyn QueueTransport>, ids: Arc<dyn IdGenerator>) -> Self {
        Self { transport, ids }
    }

    pub async fn submit(
        &self,
        task_type: TaskType,
        data: Value,
        priority: Priority,
    ) -> Result<TaskId, SubmitError> {
        let task_id = self.ids.generate_task_id(&task_type);
        let message = TaskMessage::new(task_id.clone(), task_type, data).with_priority(priority);
        self.transport.send(message.encode()?).await?;

        tracing::info!(
            task_id = %task_id,
            task_type = %message.task_type,
            priority = %priority,
            "task submitted"
        );
        Ok(task_id)
    }

    /// Submit a typed payload; the type tag comes from `T::TYPE`.
    pub async fn submit_task<T: Task>(
        &self,
        task: &T,
        priority: Priority,
    ) -> Result<TaskId, SubmitError> {
        let data = serde_json::to_value(task)?;
        self.submit(TaskType::new(T::TYPE), data, priority).await
    }
}
