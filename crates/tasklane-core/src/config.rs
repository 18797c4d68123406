//! Worker configuration loaded from the environment.
//!
//! `.env` は `dotenvy` で読み込みます（存在しなくてもエラーにしない）。

use std::env;
use std::str::FromStr;
use std::time::Duration;

use crate::app::{IntakeConfig, WorkerPoolConfig};
use crate::domain::ConfigError;

const DEFAULT_REGION: &str = "us-east-2";
const DEFAULT_TABLE: &str = "task-status";
const DEFAULT_WORKER_COUNT: usize = 2;
const DEFAULT_BATCH_SIZE: usize = 10;
const DEFAULT_POLL_INTERVAL_MS: u64 = 1000;
const DEFAULT_WAIT_TIME_SECS: u32 = 10;

/// SQS caps a single receive at 10 messages.
pub const MAX_BATCH_SIZE: usize = 10;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WorkerConfig {
    pub region: String,
    pub queue_url: Option<String>,
    pub table_name: String,
    pub worker_count: usize,
    pub batch_size: usize,
    pub poll_interval: Duration,
    /// Long-polling wait for a receive call.
    pub wait_time_secs: u32,
    pub drop_malformed: bool,
}

impl Default for WorkerConfig {
    fn default() -> Self {
        Self {
            region: DEFAULT_REGION.to_string(),
            queue_url: None,
            table_name: DEFAULT_TABLE.to_string(),
            worker_count: DEFAULT_WORKER_COUNT,
            batch_size: DEFAULT_BATCH_SIZE,
            poll_interval: Duration::from_millis(DEFAULT_POLL_INTERVAL_MS),
            wait_time_secs: DEFAULT_WAIT_TIME_SECS,
            drop_malformed: true,
        }
    }
}

impl WorkerConfig {
    pub fn from_env() -> Result<Self, ConfigError> {
        dotenvy::dotenv().ok();
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Build from an arbitrary key lookup. Empty values count as unset.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let get = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());
        let defaults = Self::default();

        let worker_count: usize = parse(&get, "WORKER_COUNT", defaults.worker_count)?;
        if worker_count == 0 {
            return Err(ConfigError::Invalid {
                key: "WORKER_COUNT",
                value: "0".into(),
                reason: "must be at least 1".into(),
            });
        }

        let batch_size: usize = parse(&get, "BATCH_SIZE", defaults.batch_size)?;
        let poll_interval_ms: u64 = parse(&get, "POLL_INTERVAL_MS", DEFAULT_POLL_INTERVAL_MS)?;

        Ok(Self {
            region: get("AWS_REGION").unwrap_or(defaults.region),
            queue_url: get("QUEUE_URL"),
            table_name: get("DYNAMO_TABLE").unwrap_or(defaults.table_name),
            worker_count,
            batch_size: batch_size.clamp(1, MAX_BATCH_SIZE),
            poll_interval: Duration::from_millis(poll_interval_ms),
            wait_time_secs: parse(&get, "WAIT_TIME_SECS", defaults.wait_time_secs)?,
            drop_malformed: parse_bool(&get, "DROP_MALFORMED", defaults.drop_malformed)?,
        })
    }

    pub fn require_queue_url(&self) -> Result<&str, ConfigError> {
        self.queue_url
            .as_deref()
            .ok_or(ConfigError::Missing("QUEUE_URL"))
    }

    pub fn intake(&self) -> IntakeConfig {
        IntakeConfig {
            batch_size: self.batch_size,
            drop_malformed: self.drop_malformed,
        }
    }

    pub fn worker_pool(&self) -> WorkerPoolConfig {
        WorkerPoolConfig {
            workers: self.worker_count,
            poll_interval: self.poll_interval,
        }
    }
}

fn parse<T>(
    get: &impl Fn(&str) -> Option<String>,
    key: &'static str,
    default: T,
) -> Result<T, ConfigError>
where
    T: FromStr,
    T::Err: std::fmt::Display,
{
    match get(key) {
        None => Ok(default),
        Some(raw) => raw.trim().parse().map_err(|e: T::Err| ConfigError::Invalid {
            key,
            value: raw.clone(),
            reason: e.to_string(),
        }),
    }
}

fn parse_bool(
    get: &impl Fn(&str) -> Option<String>,
    key: &'static str,
    default: bool,
) -> Result<bool, ConfigError> {
    let Some(raw) = get(key) else {
        return Ok(default);
    };
    match raw.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Ok(true),
        "0" | "false" | "no" | "off" => Ok(false),
        _ => Err(ConfigError::Invalid {
            key,
            value: raw,
            reason: "expected a boolean".into(),
        }),
    }
}
