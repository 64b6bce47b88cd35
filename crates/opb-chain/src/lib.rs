//! # opb-chain
//!
//! Core data model for the OPB ledger: accounts, hashes, transactions,
//! blocks, and the structural Proof-of-Work difficulty predicate.
//!
//! Canonical encoding is JSON with struct-declaration field order; hashes
//! are SHA-256 over exactly the bytes that go on the wire and into the
//! block log.

mod address;
mod block;
mod hash;
mod transaction;

pub use address::Address;
pub use block::{is_block_hash_valid, Block, BlockFs, BlockHeader, BLOCK_DIFFICULTY};
pub use hash::Hash;
pub use transaction::{SignedTxn, Txn};

use thiserror::Error;

/// Block subsidy credited to the miner of every block.
pub const REWARD: u64 = 100;

/// Flat per-transaction fee charged before the OIP-1 fork.
pub const TXN_FEE: u64 = 20;

/// Fixed gas amount every transaction must carry once OIP-1 is active.
pub const TXN_GAS: u64 = 10;

/// Minimum gas price once OIP-1 is active.
pub const DEFAULT_GAS_PRICE: u64 = 1;

/// Marker value in `Txn::data` for legacy reward-typed transactions.
pub const REWARD_DATA: &str = "reward";

/// Errors from encoding, decoding, and authenticity checks.
#[derive(Error, Debug)]
pub enum ChainError {
    /// Canonical JSON encoding or decoding failed.
    #[error("codec error: {0}")]
    Codec(#[from] serde_json::Error),

    /// A hex-rendered field failed to parse.
    #[error("invalid hex value: {0}")]
    InvalidHex(String),

    /// Signature handling failed.
    #[error(transparent)]
    Crypto(#[from] opb_crypto::CryptoError),
}

/// Result type for chain model operations.
pub type ChainResult<T> = Result<T, ChainError>;
