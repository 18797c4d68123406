use async_trait::async_trait;
use serde::{Deserialize, Deserializer, Serialize};
use std::time::Duration;

use super::{SUCCESS, simulate};
use crate::domain::HandlerError;
use crate::domain::task_type::PROCESS_DATA;
use crate::typed::{Handler, Task};

/// `data` is an object; a missing or null `records` counts as zero.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProcessData {
    #[serde(default, deserialize_with = "null_as_zero")]
    pub records: u64,
}

fn null_as_zero<'de, D: Deserializer<'de>>(deserializer: D) -> Result<u64, D::Error> {
    Ok(Option::<u64>::deserialize(deserializer)?.unwrap_or(0))
}

impl Task for ProcessData {
    const TYPE: &'static str = PROCESS_DATA;
}

#[derive(Debug, Clone, Serialize)]
pub struct DataProcessed {
    pub status: &'static str,
    pub message: String,
    pub records_processed: u64,
}

#[derive(Debug, Clone)]
pub struct ProcessDataHandler {
    latency: Duration,
}

impl ProcessDataHandler {
    pub const DEFAULT_LATENCY: Duration = Duration::from_secs(2);

    pub fn new(latency: Duration) -> Self {
        Self { latency }
    }
}

impl Default for ProcessDataHandler {
    fn default() -> Self {
        Self::new(Self::DEFAULT_LATENCY)
    }
}

#[async_trait]
impl Handler<ProcessData> for ProcessDataHandler {
    type Output = DataProcessed;

    async fn handle(&self, task: ProcessData) -> Result<DataProcessed, HandlerError> {
        tracing::info!(records = task.records, "processing data");
        simulate(self.latency).await;

        Ok(DataProcessed {
            status: SUCCESS,
            message: "Data processed".to_string(),
            records_processed: task.records,
        })
    }
}
