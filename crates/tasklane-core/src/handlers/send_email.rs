use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::time::Duration;

use super::{SUCCESS, simulate};
use crate::domain::HandlerError;
use crate::domain::task_type::SEND_EMAIL;
use crate::typed::{Handler, Task};

/// `data` is the recipient address.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SendEmail {
    pub recipient: String,
}

impl Task for SendEmail {
    const TYPE: &'static str = SEND_EMAIL;
}

#[derive(Debug, Clone, Serialize)]
pub struct EmailSent {
    pub status: &'static str,
    pub message: String,
    pub recipient: String,
}

#[derive(Debug, Clone)]
pub struct SendEmailHandler {
    latency: Duration,
}

impl SendEmailHandler {
    pub const DEFAULT_LATENCY: Duration = Duration::from_millis(500);

    pub fn new(latency: Duration) -> Self {
        Self { latency }
    }
}

impl Default for SendEmailHandler {
    fn default() -> Self {
        Self::new(Self::DEFAULT_LATENCY)
    }
}

#[async_trait]
impl Handler<SendEmail> for SendEmailHandler {
    type Output = EmailSent;

    async fn handle(&self, task: SendEmail) -> Result<EmailSent, HandlerError> {
        if task.recipient.trim().is_empty() {
            return Err(HandlerError::failed("recipient must not be empty"));
        }
        tracing::info!(recipient = %task.recipient, "sending email");
        simulate(self.latency).await;

        Ok(EmailSent {
            status: SUCCESS,
            message: "Email sent successfully".to_string(),
            recipient: task.recipient,
        })
    }
}
