//! Handler trait - Task を実行する Handler の定義
//!
//! - ジェネリック trait (Handler<T>)
//! - Object-safe trait (DynHandler)
//! - Type erasure パターン (TypedHandler<T, H> → DynHandler)

use async_trait::async_trait;
use serde::Serialize;
use std::future::Future;
use std::marker::PhantomData;

use super::task::Task;
use crate::domain::HandlerError;

/// Handler は Task を実行して構造化された結果を返す
///
/// Handler はステートレスで、同じ taskId に対して複数回呼ばれても
/// 安全でなければならない（at-least-once 配送のため再実行があり得る）。
///
/// # ジェネリクスによる型安全性
/// - `Handler<SendEmail>` は `SendEmail` しか受け取れない
/// - コンパイル時に Task と Handler の対応が保証される
#[async_trait]
pub trait Handler<T: Task>: Send + Sync {
    type Output: Serialize + Send;

    async fn handle(&self, task: T) -> Result<Self::Output, HandlerError>;
}

/// DynHandler は object-safe な Handler の抽象化
///
/// TypedHandler<T> を DynHandler に変換することで、
/// HashMap<String, Arc<dyn DynHandler>> に格納可能にします。
#[async_trait]
pub trait DynHandler: Send + Sync {
    async fn handle_dyn(&self, payload: serde_json::Value)
        -> Result<serde_json::Value, HandlerError>;

    fn task_type(&self) -> &str;
}

pub struct TypedHandler<T: Task, H: Handler<T>> {
    handler: H,
    _marker: PhantomData<T>,
}

impl<T: Task, H: Handler<T>> TypedHandler<T, H> {
    pub fn new(handler: H) -> Self {
        Self {
            handler,
            _marker: PhantomData,
        }
    }
}

#[async_trait]
impl<T: Task, H: Handler<T>> DynHandler for TypedHandler<T, H> {
    async fn handle_dyn(
        &self,
        payload: serde_json::Value,
    ) -> Result<serde_json::Value, HandlerError> {
        let task: T = serde_json::from_value(payload)
            .map_err(|e| HandlerError::InvalidPayload(e.to_string()))?;
        let output = self.handler.handle(task).await?;
        serde_json::to_value(output)
            .map_err(|e| HandlerError::failed(format!("result encode: {e}")))
    }

    fn task_type(&self) -> &str {
        T::TYPE
    }
}

/// Adapts an async closure `Fn(T) -> Future<Output = Result<Value, HandlerError>>`.
pub struct FnHandler<F> {
    f: F,
}

impl<F> FnHandler<F> {
    pub fn new(f: F) -> Self {
        Self { f }
    }
}

#[async_trait]
impl<T, F, Fut> Handler<T> for FnHandler<F>
where
    T: Task,
    F: Fn(T) -> Fut + Send + Sync,
    Fut: Future<Output = Result<serde_json::Value, HandlerError>> + Send + 'static,
{
    type Output = serde_json::Value;

    async fn handle(&self, task: T) -> Result<Self::Output, HandlerError> {
        (self.f)(task).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde::Deserialize;
    use serde_json::json;

    #[derive(Debug, Serialize, Deserialize)]
    struct Echo {
        value: i32,
    }

    impl Task for Echo {
        const TYPE: &'static str = "ECHO";
    }

    #[derive(Serialize)]
    struct Echoed {
        doubled: i32,
    }

    struct EchoHandler;

    #[async_trait]
    impl Handler<Echo> for EchoHandler {
        type Output = Echoed;

        async fn handle(&self, task: Echo) -> Result<Echoed, HandlerError> {
            if task.value < 0 {
                return Err(HandlerError::failed("negative value"));
            }
            Ok(Echoed {
                doubled: task.value * 2,
            })
        }
    }

    #[tokio::test]
    async fn typed_handler_decodes_and_encodes() {
        let handler = TypedHandler::<Echo, _>::new(EchoHandler);
        let out = handler.handle_dyn(json!({ "value": 21 })).await.unwrap();
        assert_eq!(out, json!({ "doubled": 42 }));
        assert_eq!(handler.task_type(), "ECHO");
    }

    #[tokio::test]
    async fn typed_handler_rejects_mismatched_payload() {
        let handler = TypedHandler::<Echo, _>::new(EchoHandler);
        let err = handler.handle_dyn(json!("not an object")).await.unwrap_err();
        assert!(matches!(err, HandlerError::InvalidPayload(_)));
    }

    #[tokio::test]
    async fn typed_handler_passes_failure_through() {
        let handler = TypedHandler::<Echo, _>::new(EchoHandler);
        let err = handler.handle_dyn(json!({ "value": -1 })).await.unwrap_err();
        assert_eq!(err, HandlerError::failed("negative value"));
    }

    #[tokio::test]
    async fn fn_handler_wraps_closure() {
        let handler = TypedHandler::<Echo, _>::new(FnHandler::new(|task: Echo| async move {
            Ok::<_, HandlerError>(json!({ "seen": task.value }))
        }));
        let out = handler.handle_dyn(json!({ "value": 7 })).await.unwrap();
        assert_eq!(out, json!({ "seen": 7 }));
    }
}
