//! AWS adapters (feature `aws`).
//!
//! - [`SqsTransport`]: `QueueTransport` over Amazon SQS
//! - [`DynamoDbStatusStore`]: `StatusStore` over a DynamoDB table keyed by `taskId`
//!
//! どちらも薄いアダプタで、ドメインの判断は持ちません。

mod dynamodb;
mod sqs;

pub use self::dynamodb::DynamoDbStatusStore;
pub use self::sqs::SqsTransport;

use aws_config::{BehaviorVersion, Region, SdkConfig};

/// Load the standard credential chain pinned to `region`.
pub async fn load_sdk_config(region: impl Into<String>) -> SdkConfig {
    aws_config::defaults(BehaviorVersion::latest())
        .region(Region::new(region.into()))
        .load()
        .await
}
