//! Domain model (ids, task types, wire messages, status records, outcomes).

pub mod errors;
pub mod ids;
pub mod message;
pub mod outcome;
pub mod status;
pub mod task_type;

pub use errors::{ConfigError, DecodeError, HandlerError, QueueError, RegistryError, StoreError};
pub use ids::TaskId;
pub use message::{Priority, TaskMessage};
pub use outcome::{Failure, FailureKind, Outcome};
pub use status::{StatusRecord, StatusUpdate, TaskStatus};
pub use task_type::TaskType;
