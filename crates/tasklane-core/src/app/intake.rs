//! IntakeLoop - transport のバッチを Dispatcher 呼び出しに変換する
//!
//! # メッセージごとの判断（互いに独立）
//! - decode 失敗（task_id が無い）: Dispatcher は呼ばない（書き込むキーが無い）。
//!   ログを出し、`drop_malformed` なら acknowledge して捨てる
//! - decode 失敗（task_id はある）: `Dispatcher::reject` で FAILED を書き、
//!   acknowledge しない
//! - `Outcome::Completed`: acknowledge（transport から削除）
//! - `Outcome::Failed`: acknowledge しない（transport の再配送 / dead-letter に任せる）

use std::sync::Arc;

use crate::app::Dispatcher;
use crate::domain::{DecodeError, Outcome, QueueError, TaskMessage};
use crate::ports::{QueueTransport, RawMessage, ReceiptToken};

#[derive(Debug, Clone)]
pub struct IntakeConfig {
    /// Upper bound for one `receive_batch` call.
    pub batch_size: usize,

    /// Acknowledge (drop) messages whose envelope cannot be decoded.
    pub drop_malformed: bool,
}

impl Default for IntakeConfig {
    fn default() -> Self {
        Self {
            batch_size: 10,
            drop_malformed: true,
        }
    }
}

/// What happened to one message of a batch.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Handled {
    Completed { acknowledged: bool },
    Failed,
    Malformed { dropped: bool },
}

/// Per-batch summary. `retained` lists the receipts left for redelivery.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct BatchReport {
    pub completed: usize,
    pub failed: usize,
    pub malformed: usize,
    pub acknowledged: usize,
    pub retained: Vec<ReceiptToken>,
}

impl BatchReport {
    pub fn received(&self) -> usize {
        self.completed + self.failed + self.malformed
    }
}

pub struct IntakeLoop {
    dispatcher: Arc<Dispatcher>,
    transport: Arc<dyn QueueTransport>,
    config: IntakeConfig,
}

impl IntakeLoop {
    pub fn new(
        dispatcher: Arc<Dispatcher>,
        transport: Arc<dyn QueueTransport>,
        config: IntakeConfig,
    ) -> Self {
        Self {
            dispatcher,
            transport,
            config,
        }
    }

    pub fn config(&self) -> &IntakeConfig {
        &self.config
    }

    pub async fn receive(&self) -> Result<Vec<RawMessage>, QueueError> {
        self.transport.receive_batch(self.config.batch_size).await
    }

    /// Receive one batch and handle it.
    pub async fn poll_once(&self) -> Result<BatchReport, QueueError> {
        let batch = self.receive().await?;
        Ok(self.handle_batch(batch).await)
    }

    /// One message's failure never affects its siblings.
    pub async fn handle_batch(&self, batch: Vec<RawMessage>) -> BatchReport {
        let mut report = BatchReport::default();

        for message in batch {
            let receipt = message.receipt.clone();
            match self.handle_message(message).await {
                Handled::Completed { acknowledged } => {
                    report.completed += 1;
                    if acknowledged {
                        report.acknowledged += 1;
                    } else {
                        report.retained.push(receipt);
                    }
                }
                Handled::Failed => {
                    report.failed += 1;
                    report.retained.push(receipt);
                }
                Handled::Malformed { dropped } => {
                    report.malformed += 1;
                    if dropped {
                        report.acknowledged += 1;
                    } else {
                        report.retained.push(receipt);
                    }
                }
            }
        }

        if report.received() > 0 {
            tracing::debug!(
                completed = report.completed,
                failed = report.failed,
                malformed = report.malformed,
                retained = report.retained.len(),
                "batch handled"
            );
        }
        report
    }

    async fn handle_message(&self, message: RawMessage) -> Handled {
        let task = match TaskMessage::decode(&message.body) {
            Ok(task) => task,
            Err(DecodeError::InvalidEnvelope {
                task_id,
                task_type,
                reason,
            }) => {
                // key は読めるので FAILED を記録し、再配送に任せる
                tracing::warn!(task_id = %task_id, reason = %reason, "invalid task envelope");
                let outcome = self
                    .dispatcher
                    .reject(&task_id, task_type.as_ref(), &reason)
                    .await;
                if let Some(failure) = outcome.failure() {
                    tracing::info!(
                        task_id = %task_id,
                        kind = ?failure.kind,
                        "leaving message for redelivery"
                    );
                }
                return Handled::Failed;
            }
            Err(e @ DecodeError::Malformed(_)) => {
                tracing::warn!(error = %e, drop = self.config.drop_malformed, "malformed message");
                if !self.config.drop_malformed {
                    // transport の dead-letter に任せる
                    return Handled::Malformed { dropped: false };
                }
                let dropped = match self.transport.acknowledge(&message.receipt).await {
                    Ok(()) => true,
                    Err(e) => {
                        tracing::error!(error = %e, "failed to drop malformed message");
                        false
                    }
                };
                return Handled::Malformed { dropped };
            }
        };

        match self.dispatcher.process(&task).await {
            Outcome::Completed(_) => {
                let acknowledged = match self.transport.acknowledge(&message.receipt).await {
                    Ok(()) => true,
                    Err(e) => {
                        // 再配送されても handler は冪等なので結果は変わらない
                        tracing::error!(task_id = %task.task_id, error = %e, "acknowledge failed");
                        false
                    }
                };
                Handled::Completed { acknowledged }
            }
            Outcome::Failed(failure) => {
                tracing::info!(
                    task_id = %task.task_id,
                    kind = ?failure.kind,
                    "leaving message for redelivery"
                );
                Handled::Failed
            }
        }
    }
}
