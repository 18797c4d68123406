//! Built-in leaf handlers.
//!
//! 実際の画像処理やメール送信は対象外です。各 handler は処理時間を
//! シミュレートし、構造化された結果を返します。

mod image_resize;
mod process_data;
mod send_email;

use std::time::Duration;

pub use image_resize::{ImageResize, ImageResizeHandler, ImageResized, TARGET_HEIGHT, TARGET_WIDTH};
pub use process_data::{DataProcessed, ProcessData, ProcessDataHandler};
pub use send_email::{EmailSent, SendEmail, SendEmailHandler};

use crate::domain::RegistryError;
use crate::typed::TypedRegistry;

/// `status` field shared by every built-in result.
pub(crate) const SUCCESS: &str = "success";

/// Register the three built-in handlers.
///
/// With `simulate_latency = false` the handlers return immediately.
pub fn register_builtin(
    registry: &mut TypedRegistry,
    simulate_latency: bool,
) -> Result<(), RegistryError> {
    let pick = |d: Duration| if simulate_latency { d } else { Duration::ZERO };

    registry.register::<ImageResize, _>(ImageResizeHandler::new(pick(
        ImageResizeHandler::DEFAULT_LATENCY,
    )))?;
    registry.register::<SendEmail, _>(SendEmailHandler::new(pick(
        SendEmailHandler::DEFAULT_LATENCY,
    )))?;
    registry.register::<ProcessData, _>(ProcessDataHandler::new(pick(
        ProcessDataHandler::DEFAULT_LATENCY,
    )))?;
    Ok(())
}

async fn simulate(latency: Duration) {
    if !latency.is_zero() {
        tokio::time::sleep(latency).await;
    }
}
