//! The node orchestrator.
//!
//! Owns the ledger, mempool, and peer table through a shared [`AppState`],
//! and drives three loops under one root cancellation token: the HTTP
//! server, the periodic peer sync, and the mining ticker. Mining is
//! single-flight: one attempt at a time, gated by `is_mining`, each attempt
//! scoped by its own child token so a faster peer can pre-empt it.

use crate::config::NodeConfig;
use crate::sync::SyncRunner;
use anyhow::Result;
use opb_api::{build_router, AppState};
use opb_chain::{Address, Block, SignedTxn};
use opb_mempool::{Mempool, NEW_TXN_CHANNEL_CAPACITY};
use opb_mining::{MiningError, PendingBlock, MINING_INTERVAL_SECS};
use opb_state::{Ledger, StateError};
use opb_storage::StorageError;
use opb_sync::{PeerNode, PeerTable};
use parking_lot::Mutex;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::mpsc;
use tokio::time::MissedTickBehavior;
use tokio_util::sync::CancellationToken;
use tracing::{error, info, warn};

pub struct Node {
    config: NodeConfig,
    info: PeerNode,
    app: AppState,
    fatal: Arc<AtomicBool>,
    synced_blocks_tx: mpsc::UnboundedSender<Block>,
    synced_blocks_rx: mpsc::UnboundedReceiver<Block>,
    // Admissions signal here; nothing consumes it beyond this sink.
    _new_txns_rx: mpsc::Receiver<SignedTxn>,
}

impl Node {
    /// Load the ledger from disk and wire up the shared state.
    pub fn new(config: NodeConfig) -> Result<Self> {
        let ledger = Arc::new(Ledger::open(&config.data_dir)?);
        info!(
            height = ledger.latest_height(),
            hash = %ledger.latest_hash(),
            "blockchain state loaded"
        );

        let mempool = Arc::new(Mempool::new());
        let peers = Arc::new(PeerTable::new(
            config.ip.clone(),
            config.port,
            config.bootstrap.clone(),
        ));

        let (new_txns_tx, new_txns_rx) = mpsc::channel(NEW_TXN_CHANNEL_CAPACITY);
        let (synced_blocks_tx, synced_blocks_rx) = mpsc::unbounded_channel();

        let info = PeerNode::new(config.ip.clone(), config.port, false, config.miner, true);
        let app = AppState::new(
            ledger,
            mempool,
            peers,
            config.data_dir.clone(),
            new_txns_tx,
        );

        Ok(Self {
            config,
            info,
            app,
            fatal: Arc::new(AtomicBool::new(false)),
            synced_blocks_tx,
            synced_blocks_rx,
            _new_txns_rx: new_txns_rx,
        })
    }

    /// Shared state handle.
    pub fn app(&self) -> &AppState {
        &self.app
    }

    /// Serve HTTP, sync with peers, and mine until the root token trips.
    pub async fn run(self, root: CancellationToken) -> Result<()> {
        let Node {
            config,
            info,
            app,
            fatal,
            synced_blocks_tx,
            synced_blocks_rx,
            _new_txns_rx,
        } = self;

        let addr = format!("{}:{}", config.ip, config.port);
        let listener = tokio::net::TcpListener::bind(&addr).await?;
        info!(%addr, "listening");

        let router = build_router(app.clone());
        let server_shutdown = root.clone();
        tokio::spawn(async move {
            let served = axum::serve(listener, router)
                .with_graceful_shutdown(async move { server_shutdown.cancelled().await })
                .await;
            if let Err(e) = served {
                error!(error = %e, "http server failed");
            }
        });

        let sync = SyncRunner::new(app.clone(), info, synced_blocks_tx, Arc::clone(&fatal));
        tokio::spawn(sync.run(root.clone()));

        let miner = MineRunner::new(app, config.miner, Arc::clone(&fatal));
        miner.run(root, synced_blocks_rx).await;

        if fatal.load(Ordering::SeqCst) {
            anyhow::bail!("stopped after a fatal disk error; see log");
        }
        Ok(())
    }
}

/// The 10-second mining ticker plus pre-emption by synced blocks.
struct MineRunner {
    app: AppState,
    miner: Address,
    is_mining: Arc<AtomicBool>,
    mining_cancel: Arc<Mutex<Option<CancellationToken>>>,
    fatal: Arc<AtomicBool>,
}

impl MineRunner {
    fn new(app: AppState, miner: Address, fatal: Arc<AtomicBool>) -> Self {
        Self {
            app,
            miner,
            is_mining: Arc::new(AtomicBool::new(false)),
            mining_cancel: Arc::new(Mutex::new(None)),
            fatal,
        }
    }

    async fn run(self, root: CancellationToken, mut synced_blocks: mpsc::UnboundedReceiver<Block>) {
        let mut ticker = tokio::time::interval(Duration::from_secs(MINING_INTERVAL_SECS));
        ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);

        loop {
            tokio::select! {
                _ = ticker.tick() => self.maybe_start_mining(&root),
                Some(block) = synced_blocks.recv() => self.on_synced_block(&block),
                _ = root.cancelled() => {
                    info!("node stopping");
                    return;
                }
            }
        }
    }

    /// Kick off one mining attempt when there is work and none is running.
    fn maybe_start_mining(&self, root: &CancellationToken) {
        if self.app.mempool.is_empty() {
            return;
        }
        if self.is_mining.swap(true, Ordering::SeqCst) {
            return;
        }

        let attempt = root.child_token();
        *self.mining_cancel.lock() = Some(attempt.clone());

        let app = self.app.clone();
        let miner = self.miner;
        let is_mining = Arc::clone(&self.is_mining);
        let mining_cancel = Arc::clone(&self.mining_cancel);
        let fatal = Arc::clone(&self.fatal);
        let fatal_cancel = root.clone();

        tokio::spawn(async move {
            let pending = PendingBlock::new(
                app.ledger.latest_hash(),
                app.ledger.next_block_height(),
                miner,
                app.mempool.pending_txns(),
            );

            let token = attempt.clone();
            let mined = tokio::task::spawn_blocking(move || opb_mining::mine(&token, pending)).await;

            match mined {
                Ok(Ok(block)) => match app.ledger.append_block(block.clone()) {
                    Ok(hash) => {
                        app.mempool.remove_mined(&block);
                        info!(%hash, height = block.header.height, "mined block appended");
                    }
                    Err(StateError::Storage(StorageError::Io(e))) => {
                        error!(error = %e, "disk append failed, stopping node");
                        fatal.store(true, Ordering::SeqCst);
                        fatal_cancel.cancel();
                    }
                    Err(e) => warn!(error = %e, "mined block rejected"),
                },
                // Pre-empted by a peer's block; the next tick picks up
                // whatever is still pending.
                Ok(Err(MiningError::Cancelled)) => {}
                Ok(Err(e)) => warn!(error = %e, "mining attempt failed"),
                Err(e) => warn!(error = %e, "mining task aborted"),
            }

            mining_cancel.lock().take();
            is_mining.store(false, Ordering::SeqCst);
        });
    }

    /// A block arrived through sync; if an attempt is in flight it is now
    /// stale, so trip its token and evict the sealed txns.
    fn on_synced_block(&self, block: &Block) {
        if !self.is_mining.load(Ordering::SeqCst) {
            return;
        }

        if let Ok(hash) = block.hash() {
            info!(%hash, "peer mined next block faster, cancelling local attempt");
        }
        self.app.mempool.remove_mined(block);
        if let Some(token) = self.mining_cancel.lock().take() {
            token.cancel();
        }
    }
}
