//! WorkerPool - IntakeLoop を N 本並行に回す
//!
//! - ワーカー間で共有する可変状態は無い（Registry は読み取り専用）
//! - `request_shutdown()` で新しいバッチの受信を止める
//! - 受信済みのバッチは最後まで処理する（Dispatcher の書き込みも含めて）
//! - `shutdown_and_join()` で全ワーカーの終了を待つ

use std::sync::Arc;
use std::time::Duration;

use tokio::sync::watch;
use tokio::task::JoinHandle;

use crate::app::IntakeLoop;

#[derive(Debug, Clone)]
pub struct WorkerPoolConfig {
    pub workers: usize,

    /// Pause after an empty batch or a transport error.
    pub poll_interval: Duration,
}

impl Default for WorkerPoolConfig {
    fn default() -> Self {
        Self {
            workers: 2,
            poll_interval: Duration::from_secs(1),
        }
    }
}

pub struct WorkerPool {
    shutdown_tx: watch::Sender<bool>,
    joins: Vec<JoinHandle<()>>,
}

impl WorkerPool {
    pub fn spawn(config: WorkerPoolConfig, intake: Arc<IntakeLoop>) -> Self {
        let (shutdown_tx, shutdown_rx) = watch::channel(false);

        let workers = config.workers.max(1);
        tracing::info!(
            workers,
            poll_interval_ms = config.poll_interval.as_millis() as u64,
            batch_size = intake.config().batch_size,
            "worker pool started"
        );

        let mut joins = Vec::with_capacity(workers);
        for worker_id in 0..workers {
            let intake = Arc::clone(&intake);
            let rx = shutdown_rx.clone();
            let poll_interval = config.poll_interval;
            joins.push(tokio::spawn(async move {
                worker_loop(worker_id, intake, poll_interval, rx).await;
            }));
        }

        Self { shutdown_tx, joins }
    }

    pub fn len(&self) -> usize {
        self.joins.len()
    }

    pub fn is_empty(&self) -> bool {
        self.joins.is_empty()
    }

    /// Stop taking new batches. In-flight dispatches are not cancelled.
    pub fn request_shutdown(&self) {
        // receivers may already be gone
        let _ = self.shutdown_tx.send(true);
    }

    pub async fn shutdown_and_join(self) {
        self.request_shutdown();
        for join in self.joins {
            if let Err(e) = join.await {
                tracing::error!(error = %e, "worker terminated abnormally");
            }
        }
        tracing::info!("worker pool stopped");
    }
}

async fn worker_loop(
    worker_id: usize,
    intake: Arc<IntakeLoop>,
    poll_interval: Duration,
    mut shutdown_rx: watch::Receiver<bool>,
) {
    tracing::debug!(worker_id, "worker started");
    loop {
        if *shutdown_rx.borrow() {
            break;
        }

        // 受信だけを shutdown と競合させる。handle_batch は中断しない
        let received = tokio::select! {
            changed = shutdown_rx.changed() => {
                if changed.is_err() {
                    break;
                }
                continue;
            }
            received = intake.receive() => received,
        };

        let idle = match received {
            Ok(batch) if batch.is_empty() => true,
            Ok(batch) => {
                intake.handle_batch(batch).await;
                false
            }
            Err(e) => {
                tracing::error!(worker_id, error = %e, "receive failed");
                true
            }
        };

        if idle {
            tokio::select! {
                changed = shutdown_rx.changed() => {
                    if changed.is_err() {
                        break;
                    }
                }
                _ = tokio::time::sleep(poll_interval) => {}
            }
        }
    }
    tracing::debug!(worker_id, "worker stopped");
}
