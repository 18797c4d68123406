//! Task trait - 型付き Task の定義
//!
//! payload の形を実行時に調べる代わりに、task type ごとに payload 型を
//! 定義し、decode 時に検証します。

use serde::de::DeserializeOwned;
use serde::Serialize;

/// Task は task_type と payload 型を対応付ける
///
/// # 使用例
/// ```ignore
/// #[derive(Serialize, Deserialize)]
/// #[serde(transparent)]
/// struct SendEmail {
///     recipient: String,
/// }
///
/// impl Task for SendEmail {
///     const TYPE: &'static str = "SEND_EMAIL";
/// }
/// ```
///
/// # Trait Bounds
/// - `Serialize`: producer 側で `data` にエンコードするため
/// - `DeserializeOwned`: `data` からの復元のため
/// - `Send + Sync + 'static`: ワーカー間で共有される handler から使うため
pub trait Task: Serialize + DeserializeOwned + Send + Sync + 'static {
    /// wire format の `type` と完全一致で照合される
    const TYPE: &'static str;
}
