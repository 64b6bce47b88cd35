//! Sync errors.

use thiserror::Error;

/// Errors from talking to peers.
#[derive(Error, Debug)]
pub enum SyncError {
    /// The peer was unreachable or answered with garbage.
    #[error("peer request failed: {0}")]
    Http(#[from] reqwest::Error),

    /// The peer answered but refused the request.
    #[error("peer rejected request: {0}")]
    Rejected(String),

    /// The peer would not add us to its known-peers table.
    #[error("unable to join known peers of {0}")]
    UnknownPeer(String),
}

/// Result type for sync operations.
pub type SyncResult<T> = Result<T, SyncError>;
