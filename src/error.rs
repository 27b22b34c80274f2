//! Error types for bridgewire-client.

use std::path::PathBuf;
use std::time::Duration;

use thiserror::Error;

/// Main error type for all bridge operations.
#[derive(Debug, Error)]
pub enum BridgeError {
    /// I/O error on the bridge socket or the local filesystem.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// BSON serialization error.
    #[error("BSON encode error: {0}")]
    BsonEncode(#[from] bson::ser::Error),

    /// BSON deserialization error.
    #[error("BSON decode error: {0}")]
    BsonDecode(#[from] bson::de::Error),

    /// Bytes did not form a valid self-delimited document.
    #[error("Format error: {0}")]
    Format(String),

    /// No reply containing the expected text arrived in time.
    #[error("Timed out after {after:?} waiting for {waiting_for:?}")]
    Timeout {
        /// Substring the wait was looking for.
        waiting_for: String,
        /// Deadline that expired.
        after: Duration,
    },

    /// The bridge closed the connection.
    #[error("Connection closed")]
    ConnectionClosed,

    /// An expected artifact never appeared on disk.
    #[error("Artifact {path:?} did not appear within {after:?}")]
    ArtifactTimeout {
        /// Path that was polled.
        path: PathBuf,
        /// Total time spent waiting.
        after: Duration,
    },

    /// The generation engine or post-processor reported a failure.
    #[error("Collaborator error: {0}")]
    Collaborator(String),
}

impl BridgeError {
    /// Whether this error is a format problem the matcher may absorb.
    #[inline]
    pub fn is_format(&self) -> bool {
        matches!(self, BridgeError::Format(_) | BridgeError::BsonDecode(_))
    }
}

/// Result type alias using BridgeError.
pub type Result<T> = std::result::Result<T, BridgeError>;
