//! TypedRegistry - Handler の登録と解決
//!
//! - 起動時に構築（mutable）
//! - 実行時は `Arc<TypedRegistry>` として読み取り専用で共有（ロック不要）

use serde_json::Value;
use std::collections::HashMap;
use std::future::Future;
use std::sync::Arc;

use super::handler::{DynHandler, FnHandler, Handler, TypedHandler};
use super::task::Task;
use crate::domain::{HandlerError, RegistryError, TaskType};

/// TypedRegistry は型付き Handler を登録・管理
///
/// # 使用例
/// ```ignore
/// let mut registry = TypedRegistry::new();
/// registry.register::<SendEmail, _>(SendEmailHandler::default())?;
///
/// let handler = registry.resolve(&TaskType::send_email());
/// ```
///
/// # 内部実装
/// - `register::<T: Task>(handler: impl Handler<T>)` で登録
/// - 内部的に TypedHandler でラップして DynHandler に変換
/// - 解決は task type 文字列の完全一致のみ
#[derive(Default)]
pub struct TypedRegistry {
    handlers: HashMap<String, Arc<dyn DynHandler>>,
}

impl TypedRegistry {
    pub fn new() -> Self {
        Self {
            handlers: HashMap::new(),
        }
    }

    pub fn register<T: Task, H: Handler<T> + 'static>(
        &mut self,
        handler: H,
    ) -> Result<(), RegistryError> {
        let task_type = T::TYPE.to_string();
        if self.handlers.contains_key(&task_type) {
            return Err(RegistryError::AlreadyRegistered(task_type));
        }
        self.handlers
            .insert(task_type, Arc::new(TypedHandler::new(handler)));
        Ok(())
    }

    /// Register an async closure as the handler for `T`.
    pub fn register_fn<T, F, Fut>(&mut self, f: F) -> Result<(), RegistryError>
    where
        T: Task,
        F: Fn(T) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Result<Value, HandlerError>> + Send + 'static,
    {
        self.register::<T, _>(FnHandler::new(f))
    }

    /// `None` means the type is unregistered.
    pub fn resolve(&self, task_type: &TaskType) -> Option<Arc<dyn DynHandler>> {
        self.handlers.get(task_type.as_str()).cloned()
    }

    /// Sorted for stable output.
    pub fn registered_types(&self) -> Vec<String> {
        let mut types: Vec<String> = self.handlers.keys().cloned().collect();
        types.sort();
        types
    }

    pub fn len(&self) -> usize {
        self.handlers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.handlers.is_empty()
    }
}
