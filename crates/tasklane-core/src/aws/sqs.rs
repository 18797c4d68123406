use async_trait::async_trait;
use aws_config::SdkConfig;
use aws_sdk_sqs::Client;

use crate::config::MAX_BATCH_SIZE;
use crate::domain::QueueError;
use crate::ports::{QueueTransport, RawMessage, ReceiptToken};

/// SQS queue transport.
///
/// Visibility timeout, receive counting and dead-lettering are configured on
/// the queue itself (redrive policy); this adapter only receives, deletes and
/// sends.
#[derive(Debug, Clone)]
pub struct SqsTransport {
    client: Client,
    queue_url: String,
    wait_time_secs: u32,
}

impl SqsTransport {
    pub fn new(client: Client, queue_url: impl Into<String>, wait_time_secs: u32) -> Self {
        Self {
            client,
            queue_url: queue_url.into(),
            // SQS accepts 0..=20
            wait_time_secs: wait_time_secs.min(20),
        }
    }

    pub fn from_sdk_config(
        config: &SdkConfig,
        queue_url: impl Into<String>,
        wait_time_secs: u32,
    ) -> Self {
        Self::new(Client::new(config), queue_url, wait_time_secs)
    }

    pub fn queue_url(&self) -> &str {
        &self.queue_url
    }
}

fn map_sdk_error(err: impl std::error::Error + Send + Sync + 'static, op: &str) -> QueueError {
    QueueError::OperationFailed {
        message: format!("SQS {op} failed: {err}"),
        source: Some(Box::new(err)),
    }
}

#[async_trait]
impl QueueTransport for SqsTransport {
    async fn receive_batch(&self, max_messages: usize) -> Result<Vec<RawMessage>, QueueError> {
        let max = max_messages.clamp(1, MAX_BATCH_SIZE) as i32;
        let output = self
            .client
            .receive_message()
            .queue_url(&self.queue_url)
            .max_number_of_messages(max)
            .wait_time_seconds(self.wait_time_secs as i32)
            .send()
            .await
            .map_err(|e| map_sdk_error(e, "ReceiveMessage"))?;

        let mut batch = Vec::new();
        for message in output.messages() {
            let Some(receipt) = message.receipt_handle() else {
                tracing::warn!(message_id = ?message.message_id(), "SQS message without receipt handle");
                continue;
            };
            batch.push(RawMessage {
                // 空 body は decode 側で malformed として扱われる
                body: message.body().unwrap_or_default().to_string(),
                receipt: ReceiptToken::new(receipt),
            });
        }
        Ok(batch)
    }

    async fn acknowledge(&self, receipt: &ReceiptToken) -> Result<(), QueueError> {
        self.client
            .delete_message()
            .queue_url(&self.queue_url)
            .receipt_handle(receipt.as_str())
            .send()
            .await
            .map_err(|e| map_sdk_error(e, "DeleteMessage"))?;
        Ok(())
    }

    async fn send(&self, body: String) -> Result<(), QueueError> {
        let output = self
            .client
            .send_message()
            .queue_url(&self.queue_url)
            .message_body(body)
            .send()
            .await
            .map_err(|e| map_sdk_error(e, "SendMessage"))?;
        tracing::debug!(message_id = ?output.message_id(), "sent to SQS");
        Ok(())
    }
}
