//! Shared application state and transaction admission.

use opb_chain::SignedTxn;
use opb_mempool::Mempool;
use opb_state::{Ledger, StateResult};
use opb_sync::PeerTable;
use std::path::PathBuf;
use std::sync::Arc;
use tokio::sync::mpsc;
use tracing::{debug, info};

/// Shared state for API handlers and the sync loop.
#[derive(Clone)]
pub struct AppState {
    /// Canonical + pending dual state over the block log.
    pub ledger: Arc<Ledger>,
    /// Admitted-txn pool and mined-txn archive.
    pub mempool: Arc<Mempool>,
    /// Known peers.
    pub peers: Arc<PeerTable>,
    /// Data dir holding the keystore for server-side signing.
    pub data_dir: PathBuf,
    /// Best-effort signal of freshly admitted transactions.
    pub new_txns: mpsc::Sender<SignedTxn>,
}

impl AppState {
    pub fn new(
        ledger: Arc<Ledger>,
        mempool: Arc<Mempool>,
        peers: Arc<PeerTable>,
        data_dir: PathBuf,
        new_txns: mpsc::Sender<SignedTxn>,
    ) -> Self {
        Self {
            ledger,
            mempool,
            peers,
            data_dir,
            new_txns,
        }
    }

    /// Admit a signed transaction: an idempotent no-op when the hash is
    /// already pending or archived, otherwise validated against the
    /// pending state, inserted into the mempool, and announced.
    ///
    /// Returns whether the transaction was newly admitted.
    pub fn admit_txn(&self, txn: SignedTxn) -> StateResult<bool> {
        let hash = txn.hash()?;
        if self.mempool.knows(&hash) {
            debug!(txn = %hash, "txn already pending or archived");
            return Ok(false);
        }

        self.ledger.admit_txn(&txn)?;
        self.mempool.insert(hash, txn.clone());
        info!(txn = %hash, from = %txn.from, "added pending txn");

        // The channel is a bounded signal; a full buffer is not an error.
        let _ = self.new_txns.try_send(txn);
        Ok(true)
    }
}
