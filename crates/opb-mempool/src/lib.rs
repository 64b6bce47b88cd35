//! # opb-mempool
//!
//! In-memory transaction bookkeeping for the OPB node: the pool of admitted
//! but unmined signed transactions, and the archive of transactions already
//! sealed in a local block. A hash is in at most one of the two at any
//! observable moment; the archive is the node's replay defense.

mod pool;

pub use pool::{Mempool, MempoolStats};

/// Buffer size of the new-pending-txn channel fed by admissions.
pub const NEW_TXN_CHANNEL_CAPACITY: usize = 10_000;
