use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::time::Duration;

use super::{SUCCESS, simulate};
use crate::domain::HandlerError;
use crate::domain::task_type::IMAGE_RESIZE;
use crate::typed::{Handler, Task};

pub const TARGET_WIDTH: u32 = 800;
pub const TARGET_HEIGHT: u32 = 600;

/// `data` is the key of the uploaded image.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ImageResize {
    pub file: String,
}

impl Task for ImageResize {
    const TYPE: &'static str = IMAGE_RESIZE;
}

#[derive(Debug, Clone, Serialize)]
pub struct ImageResized {
    pub status: &'static str,
    pub message: String,
    pub file: String,
}

/// Resizes to a fixed 800x600 target.
#[derive(Debug, Clone)]
pub struct ImageResizeHandler {
    latency: Duration,
}

impl ImageResizeHandler {
    pub const DEFAULT_LATENCY: Duration = Duration::from_secs(1);

    pub fn new(latency: Duration) -> Self {
        Self { latency }
    }
}

impl Default for ImageResizeHandler {
    fn default() -> Self {
        Self::new(Self::DEFAULT_LATENCY)
    }
}

#[async_trait]
impl Handler<ImageResize> for ImageResizeHandler {
    type Output = ImageResized;

    async fn handle(&self, task: ImageResize) -> Result<ImageResized, HandlerError> {
        if task.file.trim().is_empty() {
            return Err(HandlerError::failed("image key must not be empty"));
        }
        tracing::info!(file = %task.file, "resizing image");
        simulate(self.latency).await;

        Ok(ImageResized {
            status: SUCCESS,
            message: format!("Image resized to {TARGET_WIDTH}x{TARGET_HEIGHT}"),
            file: task.file,
        })
    }
}
