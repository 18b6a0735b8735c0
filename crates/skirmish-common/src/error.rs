//! Error types shared across the Skirmish crates.

use thiserror::Error;

use crate::version::SchemaVersion;

/// Errors raised by the snapshot save/load hooks.
#[derive(Debug, Error)]
pub enum SnapshotError {
    /// Snapshot was written by an incompatible schema.
    #[error("Snapshot version mismatch: expected {expected}, got {actual}")]
    VersionMismatch {
        /// Version this build understands
        expected: SchemaVersion,
        /// Version found in the snapshot
        actual: SchemaVersion,
    },

    /// JSON encode/decode failure.
    #[error("Snapshot serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

/// Result type alias for snapshot operations.
pub type SnapshotResult<T> = Result<T, SnapshotError>;
