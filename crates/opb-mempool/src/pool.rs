//! Pool and archive implementation.

use opb_chain::{Block, Hash, SignedTxn};
use parking_lot::RwLock;
use std::collections::HashMap;
use tracing::debug;

#[derive(Default)]
struct Inner {
    pending: HashMap<Hash, SignedTxn>,
    archived: HashMap<Hash, SignedTxn>,
}

/// Mempool counters.
#[derive(Debug, Clone, Copy, Default)]
pub struct MempoolStats {
    pub pending: usize,
    pub archived: usize,
}

/// Admitted-txn pool plus mined-txn archive.
///
/// Both maps sit behind one lock so moves between them are atomic and the
/// disjointness invariant holds for every reader.
#[derive(Default)]
pub struct Mempool {
    inner: RwLock<Inner>,
}

impl Mempool {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert an admitted transaction. Returns `false` when the hash is
    /// already pending or archived, which makes re-submission a no-op.
    pub fn insert(&self, hash: Hash, txn: SignedTxn) -> bool {
        let mut inner = self.inner.write();
        if inner.pending.contains_key(&hash) || inner.archived.contains_key(&hash) {
            return false;
        }
        debug!(txn = %hash, "txn added to mempool");
        inner.pending.insert(hash, txn);
        true
    }

    /// Whether the hash is pending or archived.
    pub fn knows(&self, hash: &Hash) -> bool {
        let inner = self.inner.read();
        inner.pending.contains_key(hash) || inner.archived.contains_key(hash)
    }

    pub fn is_pending(&self, hash: &Hash) -> bool {
        self.inner.read().pending.contains_key(hash)
    }

    pub fn is_archived(&self, hash: &Hash) -> bool {
        self.inner.read().archived.contains_key(hash)
    }

    pub fn is_empty(&self) -> bool {
        self.inner.read().pending.is_empty()
    }

    /// Snapshot of the pending pool, ordered by txn time so mined blocks
    /// carry transactions in application order.
    pub fn pending_txns(&self) -> Vec<SignedTxn> {
        let mut txns: Vec<SignedTxn> = self.inner.read().pending.values().cloned().collect();
        txns.sort_by_key(|txn| txn.time);
        txns
    }

    /// Move every transaction sealed in `block` from the pool to the
    /// archive. Transactions this node never saw are archived too, so a
    /// later gossip of the same txn is still refused.
    pub fn remove_mined(&self, block: &Block) {
        let mut inner = self.inner.write();
        for txn in &block.txns {
            let Ok(hash) = txn.hash() else { continue };
            if inner.pending.remove(&hash).is_some() {
                debug!(txn = %hash, "archiving mined txn");
            }
            inner.archived.insert(hash, txn.clone());
        }
    }

    pub fn stats(&self) -> MempoolStats {
        let inner = self.inner.read();
        MempoolStats {
            pending: inner.pending.len(),
            archived: inner.archived.len(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use opb_chain::{Address, Txn};

    fn signed(nonce: u64, time: u64) -> SignedTxn {
        let key = opb_crypto::generate_key();
        let from = Address::new(opb_crypto::address_of(key.verifying_key()));
        let mut txn = Txn::new(from, Address::ZERO, 1, nonce, "");
        txn.time = time;
        let sig = opb_crypto::sign_digest(&key, &txn.digest().unwrap()).unwrap();
        SignedTxn::new(txn, sig.to_vec())
    }

    #[test]
    fn insert_is_idempotent() {
        let pool = Mempool::new();
        let txn = signed(1, 100);
        let hash = txn.hash().unwrap();

        assert!(pool.insert(hash, txn.clone()));
        assert!(!pool.insert(hash, txn));
        assert_eq!(pool.stats().pending, 1);
    }

    #[test]
    fn remove_mined_moves_txns_to_archive() {
        let pool = Mempool::new();
        let t1 = signed(1, 100);
        let t2 = signed(1, 200);
        let h1 = t1.hash().unwrap();
        let h2 = t2.hash().unwrap();
        pool.insert(h1, t1.clone());
        pool.insert(h2, t2.clone());

        // The block seals only t1.
        let block = Block::new(0, Hash::ZERO, 0, 0, Address::ZERO, vec![t1]);
        pool.remove_mined(&block);

        assert!(pool.is_archived(&h1));
        assert!(!pool.is_pending(&h1));
        assert!(pool.is_pending(&h2));

        // Disjointness: a hash is never in both.
        assert!(pool.knows(&h1) && pool.knows(&h2));
        let stats = pool.stats();
        assert_eq!((stats.pending, stats.archived), (1, 1));
    }

    #[test]
    fn archived_txn_cannot_reenter_the_pool() {
        let pool = Mempool::new();
        let txn = signed(1, 100);
        let hash = txn.hash().unwrap();
        pool.insert(hash, txn.clone());

        let block = Block::new(0, Hash::ZERO, 0, 0, Address::ZERO, vec![txn.clone()]);
        pool.remove_mined(&block);

        assert!(!pool.insert(hash, txn));
        assert!(pool.is_empty());
    }

    #[test]
    fn synced_block_txns_are_archived_even_if_never_pending() {
        let pool = Mempool::new();
        let txn = signed(1, 100);
        let hash = txn.hash().unwrap();

        let block = Block::new(0, Hash::ZERO, 0, 0, Address::ZERO, vec![txn.clone()]);
        pool.remove_mined(&block);

        assert!(pool.is_archived(&hash));
        assert!(!pool.insert(hash, txn));
    }

    #[test]
    fn pending_snapshot_is_time_ordered() {
        let pool = Mempool::new();
        let late = signed(1, 300);
        let early = signed(1, 100);
        pool.insert(late.hash().unwrap(), late.clone());
        pool.insert(early.hash().unwrap(), early.clone());

        let snapshot = pool.pending_txns();
        assert_eq!(snapshot, vec![early, late]);
    }
}
