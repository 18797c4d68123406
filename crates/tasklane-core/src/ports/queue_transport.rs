//! QueueTransport port - 配送キュー（SQS または InMemory）
//!
//! # 配送の契約
//! - at-least-once: 同じメッセージが複数回届くことがある
//! - visibility timeout までに acknowledge されなかったメッセージは再配送対象になる
//! - 最大受信回数を超えたメッセージの dead-letter は transport 側の責務

use async_trait::async_trait;
use std::fmt;

use crate::domain::QueueError;

/// Opaque token identifying one delivery of a message.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ReceiptToken(String);

impl ReceiptToken {
    pub fn new(token: impl Into<String>) -> Self {
        Self(token.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for ReceiptToken {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

/// A message as delivered by the transport, not yet decoded.
#[derive(Debug, Clone)]
pub struct RawMessage {
    pub body: String,
    pub receipt: ReceiptToken,
}

#[async_trait]
pub trait QueueTransport: Send + Sync {
    /// Receive up to `max_messages`. An empty batch means nothing was visible.
    async fn receive_batch(&self, max_messages: usize) -> Result<Vec<RawMessage>, QueueError>;

    /// Remove the delivered message for good.
    async fn acknowledge(&self, receipt: &ReceiptToken) -> Result<(), QueueError>;

    /// Enqueue a message body (producer side).
    async fn send(&self, body: String) -> Result<(), QueueError>;
}
