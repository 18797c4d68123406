//! InMemoryTransport - 開発用の Queue Transport
//!
//! SQS の配送セマンティクスを最小限に再現します。
//! - receive したメッセージは visibility timeout の間見えなくなる
//! - acknowledge されなければ timeout 後に再配送される
//! - 受信回数が `max_receive_count` を超えるメッセージは dead-letter に移す
//! - 配送ごとに新しい receipt を発行する（古い receipt での acknowledge は失敗）

use async_trait::async_trait;
use std::collections::BTreeMap;
use std::time::Duration;
use tokio::sync::Mutex;
use tokio::time::Instant;
use ulid::Ulid;

use crate::domain::QueueError;
use crate::ports::{QueueTransport, RawMessage, ReceiptToken};

#[derive(Debug, Clone)]
pub struct InMemoryTransportConfig {
    pub visibility_timeout: Duration,

    /// `None` disables dead-lettering.
    pub max_receive_count: Option<u32>,
}

impl Default for InMemoryTransportConfig {
    fn default() -> Self {
        Self {
            visibility_timeout: Duration::from_secs(30),
            max_receive_count: Some(3),
        }
    }
}

#[derive(Debug)]
struct Entry {
    body: String,
    receive_count: u32,
    invisible_until: Option<Instant>,
    receipt: Option<ReceiptToken>,
}

impl Entry {
    fn is_visible(&self, now: Instant) -> bool {
        self.invisible_until.is_none_or(|until| until <= now)
    }
}

#[derive(Debug, Default)]
struct TransportState {
    /// Keyed by send sequence so receive order follows send order.
    entries: BTreeMap<u64, Entry>,
    next_seq: u64,
    dead_letters: Vec<String>,
}

pub struct InMemoryTransport {
    state: Mutex<TransportState>,
    config: InMemoryTransportConfig,
}

impl InMemoryTransport {
    pub fn new(config: InMemoryTransportConfig) -> Self {
        Self {
            state: Mutex::new(TransportState::default()),
            config,
        }
    }

    /// Messages not yet acknowledged or dead-lettered (including in-flight ones).
    pub async fn len(&self) -> usize {
        self.state.lock().await.entries.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.state.lock().await.entries.is_empty()
    }

    pub async fn dead_letters(&self) -> Vec<String> {
        self.state.lock().await.dead_letters.clone()
    }
}

impl Default for InMemoryTransport {
    fn default() -> Self {
        Self::new(InMemoryTransportConfig::default())
    }
}

#[async_trait]
impl QueueTransport for InMemoryTransport {
    async fn receive_batch(&self, max_messages: usize) -> Result<Vec<RawMessage>, QueueError> {
        let now = Instant::now();
        let mut state = self.state.lock().await;
        let mut batch = Vec::new();
        let mut exhausted = Vec::new();

        for (seq, entry) in state.entries.iter_mut() {
            if batch.len() >= max_messages {
                break;
            }
            if !entry.is_visible(now) {
                continue;
            }
            if let Some(max) = self.config.max_receive_count
                && entry.receive_count >= max
            {
                exhausted.push(*seq);
                continue;
            }

            let receipt = ReceiptToken::new(Ulid::new().to_string());
            entry.receive_count += 1;
            entry.invisible_until = Some(now + self.config.visibility_timeout);
            entry.receipt = Some(receipt.clone());
            batch.push(RawMessage {
                body: entry.body.clone(),
                receipt,
            });
        }

        for seq in exhausted {
            if let Some(entry) = state.entries.remove(&seq) {
                tracing::warn!(
                    receive_count = entry.receive_count,
                    "message exceeded max receive count, moved to dead-letter"
                );
                state.dead_letters.push(entry.body);
            }
        }

        Ok(batch)
    }

    async fn acknowledge(&self, receipt: &ReceiptToken) -> Result<(), QueueError> {
        let mut state = self.state.lock().await;
        let seq = state
            .entries
            .iter()
            .find(|(_, entry)| entry.receipt.as_ref() == Some(receipt))
            .map(|(seq, _)| *seq)
            .ok_or_else(|| QueueError::InvalidReceipt(receipt.to_string()))?;
        state.entries.remove(&seq);
        Ok(())
    }

    async fn send(&self, body: String) -> Result<(), QueueError> {
        let mut state = self.state.lock().await;
        let seq = state.next_seq;
        state.next_seq += 1;
        state.entries.insert(
            seq,
            Entry {
                body,
                receive_count: 0,
                invisible_until: None,
                receipt: None,
            },
        );
        Ok(())
    }
}
