//! Test fixtures: funded chains in temp directories and block solving.

use opb_api::AppState;
use opb_chain::{is_block_hash_valid, Address, Block, SignedTxn, Txn};
use opb_mempool::Mempool;
use opb_state::Ledger;
use opb_sync::PeerTable;
use std::fs;
use std::path::Path;
use std::sync::Arc;
use tempfile::TempDir;
use tokio::sync::mpsc;

/// A keypair with its derived address.
pub struct TestAccount {
    pub key: k256::ecdsa::SigningKey,
    pub address: Address,
}

impl TestAccount {
    pub fn generate() -> Self {
        let key = opb_crypto::generate_key();
        let address = Address::new(opb_crypto::address_of(key.verifying_key()));
        Self { key, address }
    }

    /// Sign a legacy transfer at a fixed time.
    pub fn transfer(&self, to: Address, value: u64, nonce: u64, time: u64) -> SignedTxn {
        let mut txn = Txn::new(self.address, to, value, nonce, "");
        txn.time = time;
        self.seal(txn)
    }

    /// Sign a gas-carrying transfer at a fixed time.
    pub fn transfer_with_gas(
        &self,
        to: Address,
        value: u64,
        nonce: u64,
        time: u64,
        gas: u64,
        gas_price: u64,
    ) -> SignedTxn {
        let mut txn = Txn::with_gas(self.address, to, value, nonce, gas, gas_price, "");
        txn.time = time;
        self.seal(txn)
    }

    pub fn seal(&self, txn: Txn) -> SignedTxn {
        let sig = opb_crypto::sign_digest(&self.key, &txn.digest().unwrap()).unwrap();
        SignedTxn::new(txn, sig.to_vec())
    }
}

/// A node's worth of state in a temp directory, without the network loops.
pub struct TestChain {
    pub app: AppState,
    pub new_txns: mpsc::Receiver<SignedTxn>,
    tmp: TempDir,
}

impl TestChain {
    /// Fresh chain whose genesis funds the given accounts.
    pub fn new(funded: &[(Address, u64)], fork_oip_1: u64) -> Self {
        let tmp = TempDir::new().unwrap();
        write_genesis(tmp.path(), funded, fork_oip_1);
        Self::open(tmp)
    }

    fn open(tmp: TempDir) -> Self {
        let ledger = Arc::new(Ledger::open(tmp.path()).unwrap());
        let (tx, rx) = mpsc::channel(opb_mempool::NEW_TXN_CHANNEL_CAPACITY);
        let app = AppState::new(
            ledger,
            Arc::new(Mempool::new()),
            Arc::new(PeerTable::new("127.0.0.1", 8081, None)),
            tmp.path().to_path_buf(),
            tx,
        );
        Self {
            app,
            new_txns: rx,
            tmp,
        }
    }

    pub fn data_dir(&self) -> &Path {
        self.tmp.path()
    }

    /// Drop all in-memory state and replay the log from disk.
    pub fn reopen(self) -> Self {
        let TestChain { app, tmp, .. } = self;
        drop(app);
        Self::open(tmp)
    }

    /// Solve and append a block over the current mempool, as one mining
    /// tick would; returns the appended block.
    pub fn mine_tick(&self, miner: Address) -> Block {
        let pending = self.app.mempool.pending_txns();
        let block = solve_block(Block::new(
            self.app.ledger.next_block_height(),
            self.app.ledger.latest_hash(),
            1_650_000_000 + self.app.ledger.next_block_height(),
            0,
            miner,
            pending,
        ));
        self.app.ledger.append_block(block.clone()).unwrap();
        self.app.mempool.remove_mined(&block);
        block
    }
}

/// Write a genesis funding the given accounts.
pub fn write_genesis(data_dir: &Path, funded: &[(Address, u64)], fork_oip_1: u64) {
    opb_storage::init_data_dir(data_dir).unwrap();

    let balances: Vec<String> = funded
        .iter()
        .map(|(address, amount)| format!("\"{address}\":{amount}"))
        .collect();
    let genesis = format!(
        r#"{{"genesis_time":"2022-04-19T00:00:00Z","chain_id":"opb-test","symbol":"OPB","balances":{{{}}},"fork_oip_1":{fork_oip_1}}}"#,
        balances.join(",")
    );
    fs::write(opb_storage::genesis_path(data_dir), genesis).unwrap();
}

/// Deterministically search the nonce space until difficulty is met.
pub fn solve_block(mut block: Block) -> Block {
    for nonce in 0u32.. {
        block.header.nonce = nonce;
        if is_block_hash_valid(&block.hash().unwrap()) {
            return block;
        }
    }
    unreachable!("nonce space exhausted");
}
