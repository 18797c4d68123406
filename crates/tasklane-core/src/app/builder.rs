//! AppBuilder - アプリケーションの構築とワイヤリング
//!
//! - handler の登録と起動時検証（Fail-fast）
//! - Status Store / Queue Transport の差し込み
//! - Dispatcher / IntakeLoop / Submitter / StatusQuery を組み立てる

use serde_json::Value;
use std::future::Future;
use std::sync::Arc;

use crate::app::{
    Dispatcher, IntakeConfig, IntakeLoop, StatusQuery, Submitter, WorkerPool, WorkerPoolConfig,
};
use crate::domain::{HandlerError, RegistryError};
use crate::handlers::register_builtin;
use crate::ports::{IdGenerator, QueueTransport, StatusStore, SystemClock, UlidGenerator};
use crate::typed::{Handler, Task, TypedRegistry};

/// AppBuilder はアプリケーションを構築
///
/// # 使用例
/// ```ignore
/// let app = AppBuilder::new()
///     .with_builtin_handlers(true)?
///     .expect_tasks(&["IMAGE_RESIZE", "SEND_EMAIL", "PROCESS_DATA"])
///     .store(store)
///     .transport(transport)
///     .build()?;
/// ```
///
/// # Fail-fast 設計
/// - build() 時に「期待集合 ⊆ 登録済み集合」をチェック
/// - store / transport が無ければ BuildError を返す
pub struct AppBuilder {
    registry: TypedRegistry,
    expected_tasks: Option<Vec<String>>,
    store: Option<Arc<dyn StatusStore>>,
    transport: Option<Arc<dyn QueueTransport>>,
    intake_config: IntakeConfig,
    ids: Option<Arc<dyn IdGenerator>>,
}

/// BuildError はアプリケーション構築時のエラー
#[derive(Debug, thiserror::Error)]
pub enum BuildError {
    #[error("Missing task types: {0:?}. These tasks were expected but not registered.")]
    MissingTaskTypes(Vec<String>),

    #[error("no status store configured")]
    MissingStore,

    #[error("no queue transport configured")]
    MissingTransport,
}

impl AppBuilder {
    pub fn new() -> Self {
        Self {
            registry: TypedRegistry::new(),
            expected_tasks: None,
            store: None,
            transport: None,
            intake_config: IntakeConfig::default(),
            ids: None,
        }
    }

    /// Handler を登録
    pub fn register<T: Task, H: Handler<T> + 'static>(
        mut self,
        handler: H,
    ) -> Result<Self, RegistryError> {
        self.registry.register::<T, H>(handler)?;
        Ok(self)
    }

    pub fn register_fn<T, F, Fut>(mut self, f: F) -> Result<Self, RegistryError>
    where
        T: Task,
        F: Fn(T) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Result<Value, HandlerError>> + Send + 'static,
    {
        self.registry.register_fn::<T, F, Fut>(f)?;
        Ok(self)
    }

    /// IMAGE_RESIZE / SEND_EMAIL / PROCESS_DATA を登録
    pub fn with_builtin_handlers(mut self, simulate_latency: bool) -> Result<Self, RegistryError> {
        register_builtin(&mut self.registry, simulate_latency)?;
        Ok(self)
    }

    /// 期待される task_type のリストを設定
    pub fn expect_tasks(mut self, task_types: &[&str]) -> Self {
        self.expected_tasks = Some(task_types.iter().map(|t| t.to_string()).collect());
        self
    }

    pub fn store(mut self, store: Arc<dyn StatusStore>) -> Self {
        self.store = Some(store);
        self
    }

    pub fn transport(mut self, transport: Arc<dyn QueueTransport>) -> Self {
        self.transport = Some(transport);
        self
    }

    pub fn intake_config(mut self, config: IntakeConfig) -> Self {
        self.intake_config = config;
        self
    }

    /// 省略時は SystemClock ベースの UlidGenerator
    pub fn id_generator(mut self, ids: Arc<dyn IdGenerator>) -> Self {
        self.ids = Some(ids);
        self
    }

    /// AppBuilder を構築して App を生成
    ///
    /// # 検証
    /// - expect_tasks() で設定された task_type が全て登録されているかチェック
    /// - store / transport が設定されているかチェック
    pub fn build(self) -> Result<App, BuildError> {
        if let Some(expected_tasks) = &self.expected_tasks {
            let registered_types = self.registry.registered_types();
            let missing_tasks: Vec<String> = expected_tasks
                .iter()
                .filter(|x| !registered_types.contains(x))
                .cloned()
                .collect();
            if !missing_tasks.is_empty() {
                return Err(BuildError::MissingTaskTypes(missing_tasks));
            }
        }
        let store = self.store.ok_or(BuildError::MissingStore)?;
        let transport = self.transport.ok_or(BuildError::MissingTransport)?;
        let ids: Arc<dyn IdGenerator> = match self.ids {
            Some(ids) => ids,
            None => Arc::new(UlidGenerator::new(SystemClock)),
        };

        let registry = Arc::new(self.registry);
        tracing::debug!(task_types = ?registry.registered_types(), "app built");

        let dispatcher = Arc::new(Dispatcher::new(Arc::clone(&registry), Arc::clone(&store)));
        let intake = Arc::new(IntakeLoop::new(
            Arc::clone(&dispatcher),
            Arc::clone(&transport),
            self.intake_config,
        ));

        Ok(App {
            registry,
            dispatcher,
            intake,
            submitter: Submitter::new(transport, ids),
            status: StatusQuery::new(store),
        })
    }
}

impl Default for AppBuilder {
    fn default() -> Self {
        Self::new()
    }
}

/// App は組み立て済みのパイプライン
pub struct App {
    registry: Arc<TypedRegistry>,
    dispatcher: Arc<Dispatcher>,
    intake: Arc<IntakeLoop>,
    submitter: Submitter,
    status: StatusQuery,
}

impl App {
    pub fn registry(&self) -> &TypedRegistry {
        &self.registry
    }

    pub fn dispatcher(&self) -> &Arc<Dispatcher> {
        &self.dispatcher
    }

    pub fn intake(&self) -> &Arc<IntakeLoop> {
        &self.intake
    }

    pub fn submitter(&self) -> &Submitter {
        &self.submitter
    }

    pub fn status(&self) -> &StatusQuery {
        &self.status
    }

    pub fn spawn_workers(&self, config: WorkerPoolConfig) -> WorkerPool {
        WorkerPool::spawn(config, Arc::clone(&self.intake))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{Priority, TaskStatus, TaskType};
    use crate::handlers::{ProcessData, ProcessDataHandler, SendEmail};
    use crate::impls::{InMemoryStatusStore, InMemoryTransport};
    use serde_json::json;

    fn wired(builder: AppBuilder) -> AppBuilder {
        builder
            .store(Arc::new(InMemoryStatusStore::new()))
            .transport(Arc::new(InMemoryTransport::default()))
    }

    #[test]
    fn test_build_success() {
        let app = wired(AppBuilder::new())
            .register::<ProcessData, _>(ProcessDataHandler::default())
            .unwrap()
            .expect_tasks(&[ProcessData::TYPE])
            .build()
            .unwrap();
        assert_eq!(app.registry().registered_types(), vec![ProcessData::TYPE.to_string()]);
    }

    #[test]
    fn test_build_missing_task_types() {
        let app = wired(AppBuilder::new())
            .register::<ProcessData, _>(ProcessDataHandler::default())
            .unwrap()
            .expect_tasks(&[ProcessData::TYPE, SendEmail::TYPE])
            .build();
        assert!(matches!(
            app,
            Err(BuildError::MissingTaskTypes(missing)) if missing == vec![SendEmail::TYPE.to_string()]
        ));
    }

    #[test]
    fn test_build_no_expect_tasks() {
        let app = wired(AppBuilder::new())
            .register::<ProcessData, _>(ProcessDataHandler::default())
            .unwrap()
            .build();
        assert!(app.is_ok());
    }

    #[test]
    fn test_build_requires_store_and_transport() {
        let app = AppBuilder::new()
            .transport(Arc::new(InMemoryTransport::default()))
            .build();
        assert!(matches!(app, Err(BuildError::MissingStore)));

        let app = AppBuilder::new()
            .store(Arc::new(InMemoryStatusStore::new()))
            .build();
        assert!(matches!(app, Err(BuildError::MissingTransport)));
    }

    #[test]
    fn test_duplicate_registration_is_rejected() {
        let result = AppBuilder::new()
            .with_builtin_handlers(false)
            .unwrap()
            .register::<ProcessData, _>(ProcessDataHandler::default());
        assert!(matches!(result, Err(RegistryError::AlreadyRegistered(t)) if t == ProcessData::TYPE));
    }

    #[tokio::test]
    async fn test_submit_then_poll() {
        let app = wired(AppBuilder::new())
            .with_builtin_handlers(false)
            .unwrap()
            .build()
            .unwrap();

        let task_id = app
            .submitter()
            .submit(TaskType::send_email(), json!("user@example.com"), Priority::Normal)
            .await
            .unwrap();
        let report = app.intake().poll_once().await.unwrap();
        assert_eq!(report.completed, 1);

        let record = app.status().get(&task_id).await.unwrap().unwrap();
        assert_eq!(record.status, TaskStatus::Completed);
        assert_eq!(record.result.unwrap()["recipient"], "user@example.com");
    }
}
