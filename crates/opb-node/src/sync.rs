//! The periodic peer sync loop.

use opb_api::AppState;
use opb_chain::Block;
use opb_state::StateError;
use opb_storage::StorageError;
use opb_sync::{PeerNode, StatusResponse, SyncClient, SYNC_INTERVAL_SECS};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::mpsc;
use tokio::time::MissedTickBehavior;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

/// Drives one sync cycle per tick: probe each known peer's status, join it
/// once, backfill its blocks, merge its peer table, and gossip its pending
/// transactions through the normal admission path.
pub(crate) struct SyncRunner {
    app: AppState,
    info: PeerNode,
    client: SyncClient,
    synced_blocks: mpsc::UnboundedSender<Block>,
    fatal: Arc<AtomicBool>,
}

impl SyncRunner {
    pub fn new(
        app: AppState,
        info: PeerNode,
        synced_blocks: mpsc::UnboundedSender<Block>,
        fatal: Arc<AtomicBool>,
    ) -> Self {
        Self {
            app,
            info,
            client: SyncClient::new(),
            synced_blocks,
            fatal,
        }
    }

    pub async fn run(self, root: CancellationToken) {
        let mut ticker = tokio::time::interval(Duration::from_secs(SYNC_INTERVAL_SECS));
        ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);

        loop {
            tokio::select! {
                _ = ticker.tick() => {
                    debug!("searching for new peers and blocks");
                    self.cycle(&root).await;
                }
                _ = root.cancelled() => {
                    debug!("sync loop stopping");
                    return;
                }
            }
        }
    }

    async fn cycle(&self, root: &CancellationToken) {
        for (addr, peer) in self.app.peers.snapshot() {
            let status = match self.client.status(&peer).await {
                Ok(status) => status,
                Err(e) => {
                    warn!(peer = %addr, error = %e, "status probe failed, removing peer");
                    self.app.peers.remove(&addr);
                    continue;
                }
            };

            if !peer.connected {
                match self.client.join(&peer, &self.info).await {
                    Ok(()) => self.app.peers.mark_connected(&addr),
                    Err(e) => {
                        warn!(peer = %addr, error = %e, "join failed");
                        continue;
                    }
                }
            }

            if self.sync_blocks(&addr, &peer, &status).await.is_err() {
                // Disk failure: the in-memory tip must not outrun the log.
                self.fatal.store(true, Ordering::SeqCst);
                root.cancel();
                return;
            }

            self.merge_peers(&status);
            self.gossip_pending_txns(&status);
        }
    }

    /// Backfill blocks from a peer that is at or ahead of our height.
    /// `Err` only for disk failures; protocol problems drop the peer.
    async fn sync_blocks(
        &self,
        addr: &str,
        peer: &PeerNode,
        status: &StatusResponse,
    ) -> Result<(), StorageError> {
        let local_height = self.app.ledger.latest_height();
        let local_hash = self.app.ledger.latest_hash();

        // Nothing to pull from an empty peer, a shorter peer, or a peer
        // whose only block we already have.
        if status.block_hash.is_zero() {
            return Ok(());
        }
        if status.block_height < local_height {
            return Ok(());
        }
        if status.block_height == 0 && !local_hash.is_zero() {
            return Ok(());
        }

        let blocks = match self.client.blocks_after(peer, local_hash).await {
            Ok(blocks) => blocks,
            Err(e) => {
                warn!(peer = %addr, error = %e, "block fetch failed, removing peer");
                self.app.peers.remove(addr);
                return Ok(());
            }
        };

        if !blocks.is_empty() {
            info!(count = blocks.len(), peer = %addr, "importing blocks from peer");
        }

        for block in blocks {
            match self.app.ledger.append_block(block.clone()) {
                Ok(hash) => {
                    self.app.mempool.remove_mined(&block);
                    debug!(%hash, height = block.header.height, "synced block appended");
                    let _ = self.synced_blocks.send(block);
                }
                Err(StateError::Storage(StorageError::Io(e))) => return Err(StorageError::Io(e)),
                Err(e) => {
                    warn!(peer = %addr, error = %e, "peer served an invalid block, removing peer");
                    self.app.peers.remove(addr);
                    break;
                }
            }
        }
        Ok(())
    }

    fn merge_peers(&self, status: &StatusResponse) {
        for peer in status.known_peers.values() {
            if !self.app.peers.is_known(peer) {
                info!(peer = %peer.tcp_address(), "discovered new peer");
                self.app.peers.add(peer.clone());
            }
        }
    }

    fn gossip_pending_txns(&self, status: &StatusResponse) {
        for txn in &status.pending_txns {
            if let Err(e) = self.app.admit_txn(txn.clone()) {
                debug!(error = %e, "gossiped txn not admitted");
            }
        }
    }
}
