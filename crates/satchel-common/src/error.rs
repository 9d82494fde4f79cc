//! Error types for snapshot persistence.

use thiserror::Error;

use crate::SchemaVersion;

/// Errors that can occur while encoding, decoding or storing a snapshot.
#[derive(Debug, Error)]
pub enum SaveError {
    /// I/O error
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Serialization error
    #[error("Serialization error: {0}")]
    Serialization(String),

    /// Invalid magic bytes
    #[error("Invalid snapshot format")]
    InvalidFormat,

    /// Schema version mismatch
    #[error("Incompatible snapshot version: expected {expected}, found {found}")]
    VersionMismatch {
        /// Version this build writes
        expected: SchemaVersion,
        /// Version found in the data
        found: SchemaVersion,
    },

    /// Save file not found
    #[error("Save not found: {0}")]
    NotFound(String),

    /// Slot name unusable as a file name
    #[error("Invalid save slot name: {0}")]
    InvalidSlotName(String),

    /// Snapshot data corrupted
    #[error("Snapshot corrupted: {0}")]
    Corrupted(String),
}

/// Result type for save operations.
pub type SaveResult<T> = Result<T, SaveError>;
