//! State engine errors.

use opb_chain::{Address, ChainError, Hash};
use opb_storage::StorageError;
use thiserror::Error;

/// Errors from applying transactions and blocks.
#[derive(Error, Debug)]
pub enum StateError {
    /// The signature does not recover to the claimed sender.
    #[error("forged txn: sender {0} was forged")]
    ForgedTxn(Address),

    /// The sender's nonce is not the next expected one.
    #[error("invalid txn: sender {account} next nonce should be {expected} not {got}")]
    BadNonce {
        account: Address,
        expected: u64,
        got: u64,
    },

    /// The sender cannot cover value plus fee.
    #[error("account {account} has insufficient balance for {needed}")]
    InsufficientFunds { account: Address, needed: u64 },

    /// Gas fields disagree with the fork state.
    #[error("invalid gas config: {0}")]
    InvalidGasConfig(String),

    /// The block does not extend the local tip.
    #[error("next block parent hash must be {expected} not {got}")]
    BadParent { expected: Hash, got: Hash },

    /// The block height does not follow the local tip.
    #[error("next expected block height must be {expected} not {got}")]
    BadHeight { expected: u64, got: u64 },

    /// The block hash fails the difficulty predicate.
    #[error("invalid block hash {0}")]
    BadDifficulty(Hash),

    /// Encoding or signature plumbing failed.
    #[error(transparent)]
    Chain(#[from] ChainError),

    /// The block log or genesis file failed.
    #[error(transparent)]
    Storage(#[from] StorageError),
}

/// Result type for state operations.
pub type StateResult<T> = Result<T, StateError>;
