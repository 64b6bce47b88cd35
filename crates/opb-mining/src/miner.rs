//! The nonce search loop.

use crate::{MiningError, MiningResult};
use opb_chain::{is_block_hash_valid, Address, Block, Hash, SignedTxn};
use rand::Rng;
use std::time::{Instant, SystemTime, UNIX_EPOCH};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info};

/// Log cadence for long searches.
const ATTEMPT_LOG_INTERVAL: u64 = 1_000_000;

/// A candidate block waiting for a valid nonce.
#[derive(Clone, Debug)]
pub struct PendingBlock {
    pub parent: Hash,
    pub height: u64,
    pub time: u64,
    pub miner: Address,
    pub txns: Vec<SignedTxn>,
}

impl PendingBlock {
    /// Candidate stamped with the current time.
    pub fn new(parent: Hash, height: u64, miner: Address, txns: Vec<SignedTxn>) -> Self {
        let time = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .unwrap_or_default()
            .as_secs();
        Self {
            parent,
            height,
            time,
            miner,
            txns,
        }
    }
}

/// Search the nonce space until the block hash satisfies difficulty.
///
/// Blocking; run it on a dedicated blocking task. Returns
/// [`MiningError::Cancelled`] promptly after the token trips.
pub fn mine(cancel: &CancellationToken, pending: PendingBlock) -> MiningResult<Block> {
    if pending.txns.is_empty() {
        return Err(MiningError::EmptyBlock);
    }

    let started = Instant::now();
    let mut rng = rand::thread_rng();
    let mut attempts: u64 = 0;

    loop {
        if cancel.is_cancelled() {
            debug!(height = pending.height, attempts, "mining cancelled");
            return Err(MiningError::Cancelled);
        }

        attempts += 1;
        if attempts == 1 || attempts % ATTEMPT_LOG_INTERVAL == 0 {
            debug!(
                txns = pending.txns.len(),
                height = pending.height,
                attempts,
                "mining pending txns"
            );
        }

        let block = Block::new(
            pending.height,
            pending.parent,
            pending.time,
            rng.gen::<u32>(),
            pending.miner,
            pending.txns.clone(),
        );
        let hash = block.hash()?;

        if is_block_hash_valid(&hash) {
            info!(
                hash = %hash,
                height = block.header.height,
                nonce = block.header.nonce,
                miner = %block.header.miner,
                attempts,
                elapsed = ?started.elapsed(),
                "mined new block"
            );
            return Ok(block);
        }
    }
}
