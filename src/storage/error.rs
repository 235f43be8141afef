//! Storage error types.

use thiserror::Error;
use uuid::Uuid;

/// Errors that can occur while storing or restoring workflows
#[derive(Debug, Error)]
pub enum StorageError {
    /// Serialization to JSON or binary format failed
    #[error("serialization failed: {0}")]
    SerializationFailed(String),

    /// Deserialization from JSON or binary format failed
    #[error("deserialization failed: {0}")]
    DeserializationFailed(String),

    /// Snapshot was written by an incompatible format version
    #[error("unsupported snapshot version {found}, supported: {supported}")]
    UnsupportedVersion { found: u32, supported: u32 },

    /// Only active workflows can be snapshotted and resumed
    #[error("workflow {0} is not active")]
    NotActive(Uuid),

    #[error("no stored workflow with id {0}")]
    NotFound(Uuid),

    #[error("storage lock poisoned")]
    Poisoned,
}
