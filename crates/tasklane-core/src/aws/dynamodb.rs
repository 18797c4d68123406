//! DynamoDB status store.
//!
//! | Attribute   | Type   | Description                          |
//! |-------------|--------|--------------------------------------|
//! | `taskId`    | String | Partition key                        |
//! | `status`    | String | `PROCESSING` / `COMPLETED` / `FAILED` |
//! | `updatedAt` | String | RFC 3339 UTC                         |
//! | `timestamp` | Number | Epoch seconds                        |
//! | `result`    | Map    | Optional, native JSON mapping        |
//! | `error`     | String | Optional                             |
//!
//! `PutItem` replaces the whole item, which is exactly last-write-wins.

use async_trait::async_trait;
use aws_config::SdkConfig;
use aws_sdk_dynamodb::Client;
use aws_sdk_dynamodb::types::AttributeValue;
use chrono::{DateTime, Utc};
use serde_json::{Map, Number, Value};
use std::collections::HashMap;
use std::sync::Arc;

use crate::domain::{StatusRecord, StatusUpdate, StoreError, TaskId, TaskStatus};
use crate::ports::{Clock, StatusStore, SystemClock};

type Item = HashMap<String, AttributeValue>;

#[derive(Clone)]
pub struct DynamoDbStatusStore {
    client: Client,
    table_name: String,
    clock: Arc<dyn Clock>,
}

impl DynamoDbStatusStore {
    pub fn new(client: Client, table_name: impl Into<String>) -> Self {
        Self {
            client,
            table_name: table_name.into(),
            clock: Arc::new(SystemClock),
        }
    }

    pub fn from_sdk_config(config: &SdkConfig, table_name: impl Into<String>) -> Self {
        Self::new(Client::new(config), table_name)
    }

    pub fn table_name(&self) -> &str {
        &self.table_name
    }
}

/// Maps an AWS SDK error to a [`StoreError::Backend`].
fn map_sdk_error(err: impl std::error::Error + Send + Sync + 'static, op: &str) -> StoreError {
    StoreError::Backend {
        message: format!("DynamoDB {op} failed: {err}"),
        source: Some(Box::new(err)),
    }
}

#[async_trait]
impl StatusStore for DynamoDbStatusStore {
    async fn write(&self, update: StatusUpdate) -> Result<StatusRecord, StoreError> {
        let record = StatusRecord::from_update(update, self.clock.now());
        self.client
            .put_item()
            .table_name(&self.table_name)
            .set_item(Some(record_to_item(&record)))
            .send()
            .await
            .map_err(|e| map_sdk_error(e, "PutItem"))?;
        Ok(record)
    }

    async fn read(&self, task_id: &TaskId) -> Result<StatusRecord, StoreError> {
        let output = self
            .client
            .get_item()
            .table_name(&self.table_name)
            .key("taskId", AttributeValue::S(task_id.to_string()))
            .consistent_read(true)
            .send()
            .await
            .map_err(|e| map_sdk_error(e, "GetItem"))?;

        let item = output
            .item()
            .ok_or_else(|| StoreError::NotFound(task_id.to_string()))?;
        item_to_record(item)
    }

    async fn scan(&self, limit: usize) -> Result<Vec<StatusRecord>, StoreError> {
        let mut records = Vec::new();
        let mut exclusive_start_key = None;

        while records.len() < limit {
            let remaining = i32::try_from(limit - records.len()).unwrap_or(i32::MAX);
            let output = self
                .client
                .scan()
                .table_name(&self.table_name)
                .limit(remaining)
                .set_exclusive_start_key(exclusive_start_key.take())
                .send()
                .await
                .map_err(|e| map_sdk_error(e, "Scan"))?;

            for item in output.items() {
                match item_to_record(item) {
                    Ok(record) => records.push(record),
                    Err(e) => tracing::warn!(error = %e, "skipping unreadable status item"),
                }
            }

            match output.last_evaluated_key() {
                Some(last_key) if !last_key.is_empty() => {
                    exclusive_start_key = Some(last_key.clone());
                }
                _ => break,
            }
        }

        records.truncate(limit);
        Ok(records)
    }
}

fn record_to_item(record: &StatusRecord) -> Item {
    let mut item = Item::new();
    item.insert("taskId".into(), AttributeValue::S(record.task_id.to_string()));
    item.insert("status".into(), AttributeValue::S(record.status.to_string()));
    item.insert(
        "updatedAt".into(),
        AttributeValue::S(record.updated_at.to_rfc3339()),
    );
    item.insert(
        "timestamp".into(),
        AttributeValue::N(record.timestamp.to_string()),
    );
    if let Some(result) = &record.result {
        item.insert("result".into(), json_to_attr(result));
    }
    if let Some(error) = &record.error {
        item.insert("error".into(), AttributeValue::S(error.clone()));
    }
    item
}

fn item_to_record(item: &Item) -> Result<StatusRecord, StoreError> {
    let string = |name: &str| {
        item.get(name)
            .and_then(|v| v.as_s().ok())
            .ok_or_else(|| StoreError::backend(format!("missing or invalid {name} attribute")))
    };

    let task_id = TaskId::new(string("taskId")?.as_str())
        .ok_or_else(|| StoreError::backend("empty taskId attribute"))?;
    let status: TaskStatus = string("status")?.parse().map_err(StoreError::backend)?;
    let updated_at = DateTime::parse_from_rfc3339(string("updatedAt")?)
        .map_err(|e| StoreError::backend(format!("invalid updatedAt: {e}")))?
        .with_timezone(&Utc);
    let timestamp = item
        .get("timestamp")
        .and_then(|v| v.as_n().ok())
        .and_then(|n| n.parse::<i64>().ok())
        .unwrap_or_else(|| updated_at.timestamp());

    Ok(StatusRecord {
        task_id,
        status,
        updated_at,
        timestamp,
        result: item.get("result").map(attr_to_json),
        error: item.get("error").and_then(|v| v.as_s().ok()).cloned(),
    })
}

fn json_to_attr(value: &Value) -> AttributeValue {
    match value {
        Value::Null => AttributeValue::Null(true),
        Value::Bool(b) => AttributeValue::Bool(*b),
        Value::Number(n) => AttributeValue::N(n.to_string()),
        Value::String(s) => AttributeValue::S(s.clone()),
        Value::Array(items) => AttributeValue::L(items.iter().map(json_to_attr).collect()),
        Value::Object(fields) => AttributeValue::M(
            fields
                .iter()
                .map(|(k, v)| (k.clone(), json_to_attr(v)))
                .collect(),
        ),
    }
}

fn attr_to_json(attr: &AttributeValue) -> Value {
    match attr {
        AttributeValue::Null(_) => Value::Null,
        AttributeValue::Bool(b) => Value::Bool(*b),
        AttributeValue::N(n) => parse_number(n),
        AttributeValue::S(s) => Value::String(s.clone()),
        AttributeValue::L(items) => Value::Array(items.iter().map(attr_to_json).collect()),
        AttributeValue::M(fields) => Value::Object(
            fields
                .iter()
                .map(|(k, v)| (k.clone(), attr_to_json(v)))
                .collect::<Map<_, _>>(),
        ),
        AttributeValue::Ss(items) => Value::Array(items.iter().cloned().map(Value::String).collect()),
        AttributeValue::Ns(items) => Value::Array(items.iter().map(|n| parse_number(n)).collect()),
        // binary / unknown は status record では使わない
        _ => Value::Null,
    }
}

fn parse_number(n: &str) -> Value {
    if let Ok(i) = n.parse::<i64>() {
        return Value::Number(i.into());
    }
    if let Ok(u) = n.parse::<u64>() {
        return Value::Number(u.into());
    }
    n.parse::<f64>()
        .ok()
        .and_then(Number::from_f64)
        .map(Value::Number)
        .unwrap_or_else(|| Value::String(n.to_string()))
}
