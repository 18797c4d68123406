//! Dispatcher - 1 件の TaskMessage をライフサイクルに沿って処理する
//!
//! # フロー
//! 1. PROCESSING を書き込む（task type を補助コンテキストとして含める）
//! 2. TypedRegistry から handler を解決して実行
//! 3. COMPLETED（handler の結果）または FAILED（エラー内容）を書き込む
//!
//! # 不変条件
//! - 1 回の呼び出しにつき PROCESSING 1 回 + 終端 1 回（0 回も 2 回もない）
//! - PROCESSING の書き込みに失敗した場合は handler を呼ばず、終端も書かない
//! - handler の失敗は必ず FAILED + `Outcome::Failed` に変換され、外へ漏れない
//! - task_id だけ読める envelope は `reject()` で同じ 2 回の書き込みを行う
//! - 再配送の判断は transport 側の責務なので、ここではリトライしない

use serde_json::{Value, json};
use std::sync::Arc;

use crate::domain::{
    Failure, FailureKind, HandlerError, Outcome, StatusUpdate, TaskId, TaskMessage, TaskStatus,
    TaskType,
};
use crate::ports::StatusStore;
use crate::typed::{DynHandler, TypedRegistry};

pub struct Dispatcher {
    registry: Arc<TypedRegistry>,
    store: Arc<dyn StatusStore>,
}

impl Dispatcher {
    pub fn new(registry: Arc<TypedRegistry>, store: Arc<dyn StatusStore>) -> Self {
        Self { registry, store }
    }

    /// Drive one decoded message through PROCESSING -> COMPLETED | FAILED.
    #[tracing::instrument(
        name = "dispatch",
        skip(self, message),
        fields(task_id = %message.task_id, task_type = %message.task_type)
    )]
    pub async fn process(&self, message: &TaskMessage) -> Outcome {
        let processing = StatusUpdate::processing(message.task_id.clone(), &message.task_type);
        if let Err(failure) = self.begin(processing).await {
            return Outcome::Failed(failure);
        }

        let executed = match self.registry.resolve(&message.task_type) {
            Some(handler) => execute(handler, message.data.clone()).await,
            None => Err(Failure::unregistered(message.task_type.as_str())),
        };
        self.finish(&message.task_id, executed).await
    }

    /// Record a message whose key is readable but whose envelope is not.
    ///
    /// Same two writes as `process`; no handler is resolved.
    #[tracing::instrument(name = "dispatch", skip(self, task_type, reason), fields(task_id = %task_id))]
    pub async fn reject(
        &self,
        task_id: &TaskId,
        task_type: Option<&TaskType>,
        reason: &str,
    ) -> Outcome {
        let processing = match task_type {
            Some(task_type) => StatusUpdate::processing(task_id.clone(), task_type),
            None => StatusUpdate {
                task_id: task_id.clone(),
                status: TaskStatus::Processing,
                result: Some(json!({ "type": null })),
                error: None,
            },
        };
        if let Err(failure) = self.begin(processing).await {
            return Outcome::Failed(failure);
        }

        let failure = Failure::from(HandlerError::InvalidPayload(reason.to_string()));
        self.finish(task_id, Err(failure)).await
    }

    /// PROCESSING write. On failure the handler must not run.
    async fn begin(&self, processing: StatusUpdate) -> Result<(), Failure> {
        self.store.write(processing).await.map(|_| ()).map_err(|e| {
            tracing::error!(error = %e, "failed to record PROCESSING, handler not invoked");
            Failure::storage(&e)
        })
    }

    /// Exactly one terminal write.
    async fn finish(&self, task_id: &TaskId, executed: Result<Value, Failure>) -> Outcome {
        match executed {
            Ok(result) => {
                let update = StatusUpdate::completed(task_id.clone(), result.clone());
                match self.store.write(update).await {
                    Ok(_) => {
                        tracing::info!("task completed");
                        Outcome::Completed(result)
                    }
                    Err(e) => {
                        tracing::error!(error = %e, "failed to record COMPLETED");
                        Outcome::Failed(Failure::storage(&e))
                    }
                }
            }
            Err(failure) => {
                let update = StatusUpdate::failed(task_id.clone(), failure.message.clone());
                if let Err(e) = self.store.write(update).await {
                    tracing::error!(error = %e, failure = %failure, "failed to record FAILED");
                    return Outcome::Failed(Failure::storage(&e));
                }
                tracing::warn!(kind = ?failure.kind, error = %failure, "task failed");
                Outcome::Failed(failure)
            }
        }
    }
}

/// Run the handler on its own task so a panic becomes a handler failure
/// instead of tearing down the worker.
async fn execute(handler: Arc<dyn DynHandler>, data: Value) -> Result<Value, Failure> {
    match tokio::spawn(async move { handler.handle_dyn(data).await }).await {
        Ok(result) => result.map_err(Failure::from),
        Err(join_err) if join_err.is_panic() => {
            Err(Failure::new(FailureKind::Handler, "handler panicked"))
        }
        Err(join_err) => Err(Failure::new(FailureKind::Handler, join_err.to_string())),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{StatusRecord, StoreError};
    use crate::handlers::{SendEmail, register_builtin};
    use crate::impls::InMemoryStatusStore;
    use async_trait::async_trait;
    use std::sync::Mutex;
    use std::sync::atomic::{AtomicUsize, Ordering};

    /// Keeps every write in order on top of an in-memory store.
    #[derive(Default)]
    struct RecordingStore {
        inner: InMemoryStatusStore,
        writes: Mutex<Vec<StatusUpdate>>,
        fail_on: Option<TaskStatus>,
    }

    impl RecordingStore {
        fn failing_on(status: TaskStatus) -> Self {
            Self {
                fail_on: Some(status),
                ..Default::default()
            }
        }

        fn statuses(&self) -> Vec<TaskStatus> {
            self.writes.lock().unwrap().iter().map(|w| w.status).collect()
        }
    }

    #[async_trait]
    impl StatusStore for RecordingStore {
        async fn write(&self, update: StatusUpdate) -> Result<StatusRecord, StoreError> {
            if self.fail_on == Some(update.status) {
                return Err(StoreError::backend("injected write failure"));
            }
            self.writes.lock().unwrap().push(update.clone());
            self.inner.write(update).await
        }

        async fn read(&self, task_id: &TaskId) -> Result<StatusRecord, StoreError> {
            self.inner.read(task_id).await
        }

        async fn scan(&self, limit: usize) -> Result<Vec<StatusRecord>, StoreError> {
            self.inner.scan(limit).await
        }
    }

    fn builtin_registry() -> TypedRegistry {
        let mut registry = TypedRegistry::new();
        register_builtin(&mut registry, false).unwrap();
        registry
    }

    fn message(id: &str, task_type: &str, data: serde_json::Value) -> TaskMessage {
        TaskMessage::new(TaskId::new(id).unwrap(), TaskType::new(task_type), data)
    }

    #[tokio::test]
    async fn registered_type_writes_processing_then_completed() {
        let store = Arc::new(RecordingStore::default());
        let dispatcher = Dispatcher::new(Arc::new(builtin_registry()), store.clone());

        let outcome = dispatcher
            .process(&message("t-1", "PROCESS_DATA", json!({"records": 1000})))
            .await;

        assert!(outcome.is_completed());
        assert_eq!(
            store.statuses(),
            vec![TaskStatus::Processing, TaskStatus::Completed]
        );
        {
            let writes = store.writes.lock().unwrap();
            assert_eq!(writes[0].result, Some(json!({"type": "PROCESS_DATA"})));
        }

        let record = store.read(&TaskId::new("t-1").unwrap()).await.unwrap();
        assert_eq!(record.status, TaskStatus::Completed);
        assert_eq!(record.result.unwrap()["records_processed"], 1000);
    }

    #[tokio::test]
    async fn unregistered_type_fails_without_invoking_any_handler() {
        let calls = Arc::new(AtomicUsize::new(0));
        let mut registry = TypedRegistry::new();
        let counter = calls.clone();
        registry
            .register_fn(move |_: SendEmail| {
                let counter = counter.clone();
                async move {
                    counter.fetch_add(1, Ordering::SeqCst);
                    Ok::<_, HandlerError>(json!({}))
                }
            })
            .unwrap();

        let store = Arc::new(RecordingStore::default());
        let dispatcher = Dispatcher::new(Arc::new(registry), store.clone());
        let outcome = dispatcher
            .process(&message("t-2", "UNKNOWN_TYPE", json!("x")))
            .await;

        let failure = outcome.failure().unwrap();
        assert_eq!(failure.kind, FailureKind::UnregisteredType);
        assert_eq!(calls.load(Ordering::SeqCst), 0);
        assert_eq!(store.statuses(), vec![TaskStatus::Processing, TaskStatus::Failed]);

        let record = store.read(&TaskId::new("t-2").unwrap()).await.unwrap();
        assert_eq!(record.error.as_deref(), Some("Unknown task type: UNKNOWN_TYPE"));
    }

    #[tokio::test]
    async fn handler_failure_is_recorded_verbatim() {
        let mut registry = TypedRegistry::new();
        registry
            .register_fn(|_: SendEmail| async move {
                Err::<serde_json::Value, _>(HandlerError::failed("mailbox full"))
            })
            .unwrap();

        let store = Arc::new(RecordingStore::default());
        let dispatcher = Dispatcher::new(Arc::new(registry), store.clone());
        let outcome = dispatcher
            .process(&message("t-3", "SEND_EMAIL", json!("a@b.c")))
            .await;

        assert_eq!(outcome.failure().unwrap().kind, FailureKind::Handler);
        let record = store.read(&TaskId::new("t-3").unwrap()).await.unwrap();
        assert_eq!(record.status, TaskStatus::Failed);
        assert_eq!(record.error.as_deref(), Some("mailbox full"));
    }

    #[tokio::test]
    async fn invalid_payload_is_a_failed_write() {
        let store = Arc::new(RecordingStore::default());
        let dispatcher = Dispatcher::new(Arc::new(builtin_registry()), store.clone());

        let outcome = dispatcher
            .process(&message("t-4", "PROCESS_DATA", json!("not an object")))
            .await;

        assert_eq!(outcome.failure().unwrap().kind, FailureKind::InvalidPayload);
        assert_eq!(store.statuses(), vec![TaskStatus::Processing, TaskStatus::Failed]);
        let record = store.read(&TaskId::new("t-4").unwrap()).await.unwrap();
        assert!(record.error.unwrap().starts_with("invalid payload"));
    }

    #[tokio::test]
    async fn panicking_handler_becomes_failure() {
        let mut registry = TypedRegistry::new();
        registry
            .register_fn(|task: SendEmail| async move {
                if task.recipient == "boom" {
                    panic!("handler blew up");
                }
                Ok::<_, HandlerError>(json!({}))
            })
            .unwrap();

        let store = Arc::new(RecordingStore::default());
        let dispatcher = Dispatcher::new(Arc::new(registry), store.clone());
        let outcome = dispatcher
            .process(&message("t-5", "SEND_EMAIL", json!("boom")))
            .await;

        assert_eq!(outcome.failure().unwrap().kind, FailureKind::Handler);
        assert_eq!(store.statuses(), vec![TaskStatus::Processing, TaskStatus::Failed]);
    }

    #[tokio::test]
    async fn processing_write_failure_skips_handler_and_terminal_write() {
        let calls = Arc::new(AtomicUsize::new(0));
        let mut registry = TypedRegistry::new();
        let counter = calls.clone();
        registry
            .register_fn(move |_: SendEmail| {
                let counter = counter.clone();
                async move {
                    counter.fetch_add(1, Ordering::SeqCst);
                    Ok::<_, HandlerError>(json!({}))
                }
            })
            .unwrap();

        let store = Arc::new(RecordingStore::failing_on(TaskStatus::Processing));
        let dispatcher = Dispatcher::new(Arc::new(registry), store.clone());
        let outcome = dispatcher
            .process(&message("t-6", "SEND_EMAIL", json!("a@b.c")))
            .await;

        let failure = outcome.failure().unwrap();
        assert!(failure.is_infrastructure());
        assert_eq!(calls.load(Ordering::SeqCst), 0);
        assert!(store.statuses().is_empty());
    }

    #[tokio::test]
    async fn terminal_write_failure_is_a_storage_failure() {
        let store = Arc::new(RecordingStore::failing_on(TaskStatus::Completed));
        let dispatcher = Dispatcher::new(Arc::new(builtin_registry()), store.clone());

        let outcome = dispatcher
            .process(&message("t-7", "SEND_EMAIL", json!("a@b.c")))
            .await;

        assert_eq!(outcome.failure().unwrap().kind, FailureKind::Storage);
        // PROCESSING は書けている。終端の可視性は保証されない
        assert_eq!(store.statuses(), vec![TaskStatus::Processing]);
    }

    #[tokio::test]
    async fn redelivery_leaves_single_record_from_latest_attempt() {
        let attempts = Arc::new(AtomicUsize::new(0));
        let mut registry = TypedRegistry::new();
        let counter = attempts.clone();
        registry
            .register_fn(move |task: SendEmail| {
                let counter = counter.clone();
                async move {
                    if counter.fetch_add(1, Ordering::SeqCst) == 0 {
                        return Err(HandlerError::failed("transient smtp error"));
                    }
                    Ok(json!({ "recipient": task.recipient }))
                }
            })
            .unwrap();

        let store = Arc::new(InMemoryStatusStore::new());
        let dispatcher = Dispatcher::new(Arc::new(registry), store.clone());
        let msg = message("t-8", "SEND_EMAIL", json!("user@example.com"));

        assert!(!dispatcher.process(&msg).await.is_completed());
        assert!(dispatcher.process(&msg).await.is_completed());

        assert_eq!(store.len().await, 1);
        let record = store.read(&msg.task_id).await.unwrap();
        assert_eq!(record.status, TaskStatus::Completed);
        assert!(record.error.is_none());
        assert_eq!(record.result, Some(json!({ "recipient": "user@example.com" })));
    }

    #[tokio::test]
    async fn rejected_envelope_writes_processing_then_invalid_payload() {
        let store = Arc::new(RecordingStore::default());
        let dispatcher = Dispatcher::new(Arc::new(builtin_registry()), store.clone());
        let task_id = TaskId::new("t-9").unwrap();

        let outcome = dispatcher
            .reject(&task_id, Some(&TaskType::send_email()), "missing field `data`")
            .await;

        assert_eq!(outcome.failure().unwrap().kind, FailureKind::InvalidPayload);
        assert_eq!(store.statuses(), vec![TaskStatus::Processing, TaskStatus::Failed]);
        {
            let writes = store.writes.lock().unwrap();
            assert_eq!(writes[0].result, Some(json!({"type": "SEND_EMAIL"})));
        }
        let record = store.read(&task_id).await.unwrap();
        assert_eq!(
            record.error.as_deref(),
            Some("invalid payload: missing field `data`")
        );
    }

    #[tokio::test]
    async fn rejected_envelope_without_type_records_null_type() {
        let store = Arc::new(RecordingStore::default());
        let dispatcher = Dispatcher::new(Arc::new(builtin_registry()), store.clone());

        dispatcher
            .reject(&TaskId::new("t-10").unwrap(), None, "missing field `type`")
            .await;

        let writes = store.writes.lock().unwrap();
        assert_eq!(writes.len(), 2);
        assert_eq!(writes[0].result, Some(json!({"type": null})));
        assert_eq!(writes[1].status, TaskStatus::Failed);
    }
}
