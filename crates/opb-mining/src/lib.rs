//! # opb-mining
//!
//! Proof-of-Work search for the OPB chain. The miner takes a candidate
//! block, samples a fresh 32-bit nonce per attempt, and returns the first
//! block whose hash carries the required leading-zero prefix. The loop
//! holds no locks and checks its cancellation token once per hash, so a
//! faster peer can pre-empt an attempt within one iteration.

mod miner;

pub use miner::{mine, PendingBlock};

use thiserror::Error;

/// Seconds between mining ticks.
pub const MINING_INTERVAL_SECS: u64 = 10;

/// Mining errors.
#[derive(Error, Debug)]
pub enum MiningError {
    /// Mining empty blocks is not allowed.
    #[error("mining empty blocks is not allowed")]
    EmptyBlock,

    /// The attempt was cancelled; a normal, silent outcome.
    #[error("mining cancelled")]
    Cancelled,

    /// Hashing the candidate failed.
    #[error(transparent)]
    Chain(#[from] opb_chain::ChainError),
}

/// Result type for mining operations.
pub type MiningResult<T> = Result<T, MiningError>;
