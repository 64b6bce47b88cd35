//! Storage errors.

use thiserror::Error;

/// Errors from the data directory, genesis file, or block log.
#[derive(Error, Debug)]
pub enum StorageError {
    /// The genesis file is missing required content or unparsable.
    #[error("invalid genesis: {0}")]
    InvalidGenesis(String),

    /// Disk I/O failed.
    #[error("i/o error: {0}")]
    Io(#[from] std::io::Error),

    /// A block log line failed to decode.
    #[error("decode error: {0}")]
    Decode(#[from] serde_json::Error),

    /// A block was requested by a height or hash the log does not contain.
    #[error("unknown block: {0}")]
    UnknownBlock(String),
}

/// Result type for storage operations.
pub type StorageResult<T> = Result<T, StorageError>;
