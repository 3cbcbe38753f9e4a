use std::io;
use std::path::PathBuf;

use thiserror::Error;

/// Errors produced by the settlement journal.
#[derive(Debug, Error)]
pub enum JournalError {
    /// I/O error during segment operations.
    #[error("io error: {0}")]
    Io(#[from] io::Error),

    /// Serialization or deserialization failure.
    #[error("serialization error: {0}")]
    Serialization(String),

    /// Segment file not found or inaccessible.
    #[error("segment path not found: {0}")]
    SegmentPathNotFound(PathBuf),

    /// The recovered or in-memory stream violates the append-only
    /// sequence contract.
    #[error("journal integrity violation at seq {seq}: {reason}")]
    IntegrityViolation { seq: u64, reason: String },
}

/// Convenience alias used throughout the journal crate.
pub type JournalResult<T> = std::result::Result<T, JournalError>;
