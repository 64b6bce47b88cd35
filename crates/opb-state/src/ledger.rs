//! Canonical + pending dual state over the block log.

use crate::{State, StateError, StateResult};
use opb_chain::{Address, Block, BlockFs, Hash, SignedTxn};
use opb_storage::{init_data_dir, load_genesis, BlockLog, Genesis};
use parking_lot::RwLock;
use std::collections::HashMap;
use std::path::Path;
use tracing::{info, warn};

struct DualState {
    canonical: State,
    pending: State,
}

/// The node's ledger.
///
/// Owns the block log handle for the node lifetime and the two state
/// copies: the canonical state extended only by [`Ledger::append_block`],
/// and the pending state that screens incoming transactions and is reset
/// from canonical after every accepted block.
pub struct Ledger {
    log: BlockLog,
    genesis: Genesis,
    inner: RwLock<DualState>,
}

impl Ledger {
    /// Bootstrap the data directory if needed, then replay the block log
    /// into a fresh canonical state.
    pub fn open(data_dir: &Path) -> StateResult<Self> {
        init_data_dir(data_dir)?;
        let genesis = load_genesis(&opb_storage::genesis_path(data_dir))?;

        let log = BlockLog::open(data_dir)?;
        let mut canonical = State::from_genesis(&genesis);
        log.replay::<StateError, _>(|block_fs| {
            canonical.apply_block(&block_fs.block)?;
            if canonical.latest_hash() != block_fs.hash {
                warn!(
                    stored = %block_fs.hash,
                    computed = %canonical.latest_hash(),
                    height = block_fs.block.header.height,
                    "stored block hash disagrees with replay"
                );
            }
            Ok(())
        })?;

        info!(
            height = canonical.latest_block().header.height,
            hash = %canonical.latest_hash(),
            has_blocks = canonical.has_genesis_block(),
            "ledger loaded"
        );

        let pending = canonical.clone();
        Ok(Self {
            log,
            genesis,
            inner: RwLock::new(DualState { canonical, pending }),
        })
    }

    /// Validate a block against canonical state, durably append it, then
    /// commit and reset the pending state.
    ///
    /// Validation runs on a scratch copy, so a rejected block leaves the
    /// canonical state untouched. The log line is written before memory is
    /// updated: an I/O failure here must stop the node rather than let the
    /// in-memory tip run ahead of disk.
    pub fn append_block(&self, block: Block) -> StateResult<Hash> {
        let mut inner = self.inner.write();

        let mut scratch = inner.canonical.clone();
        scratch.apply_block(&block)?;
        let hash = scratch.latest_hash();

        self.log.append(&BlockFs { hash, block })?;

        inner.pending = scratch.clone();
        inner.canonical = scratch;
        Ok(hash)
    }

    /// Validate a transaction against the pending state, consuming its
    /// nonce there so chained submissions line up before mining.
    pub fn admit_txn(&self, txn: &SignedTxn) -> StateResult<()> {
        self.inner.write().pending.apply_txn(txn)
    }

    pub fn latest_hash(&self) -> Hash {
        self.inner.read().canonical.latest_hash()
    }

    pub fn latest_block(&self) -> Block {
        self.inner.read().canonical.latest_block().clone()
    }

    pub fn latest_height(&self) -> u64 {
        self.inner.read().canonical.latest_block().header.height
    }

    pub fn next_block_height(&self) -> u64 {
        self.inner.read().canonical.next_block_height()
    }

    /// Canonical balances snapshot.
    pub fn balances(&self) -> HashMap<Address, u64> {
        self.inner.read().canonical.balances().clone()
    }

    pub fn balance(&self, account: &Address) -> u64 {
        self.inner.read().canonical.balance(account)
    }

    /// Next nonce for an account as seen by the pending state.
    pub fn pending_next_nonce(&self, account: &Address) -> u64 {
        self.inner.read().pending.next_nonce(account)
    }

    /// Whether OIP-1 rules apply to the next block, as seen by the pending
    /// state; drives the gas fields of server-constructed transactions.
    pub fn pending_fork_active(&self) -> bool {
        self.inner.read().pending.is_fork_active()
    }

    pub fn genesis(&self) -> &Genesis {
        &self.genesis
    }

    /// Stored blocks after the given hash, exclusive.
    pub fn blocks_after(&self, from: &Hash) -> StateResult<Vec<Block>> {
        Ok(self.log.blocks_after(from)?)
    }

    pub fn block_by_height(&self, height: u64) -> StateResult<BlockFs> {
        Ok(self.log.block_by_height(height)?)
    }

    pub fn block_by_hash(&self, hash: &Hash) -> StateResult<BlockFs> {
        Ok(self.log.block_by_hash(hash)?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use opb_chain::{is_block_hash_valid, Txn, REWARD, TXN_FEE};
    use std::fs;
    use tempfile::TempDir;

    struct Account {
        key: k256::ecdsa::SigningKey,
        address: Address,
    }

    fn account() -> Account {
        let key = opb_crypto::generate_key();
        let address = Address::new(opb_crypto::address_of(key.verifying_key()));
        Account { key, address }
    }

    fn write_genesis(data_dir: &Path, funded: Address, amount: u64, fork: u64) {
        init_data_dir(data_dir).unwrap();
        let genesis = format!(
            r#"{{"symbol":"OPB","balances":{{"{funded}":{amount}}},"fork_oip_1":{fork}}}"#
        );
        fs::write(opb_storage::genesis_path(data_dir), genesis).unwrap();
    }

    fn signed(account: &Account, to: Address, value: u64, nonce: u64, time: u64) -> SignedTxn {
        let mut txn = Txn::new(account.address, to, value, nonce, "");
        txn.time = time;
        let sig = opb_crypto::sign_digest(&account.key, &txn.digest().unwrap()).unwrap();
        SignedTxn::new(txn, sig.to_vec())
    }

    fn solve(mut block: Block) -> Block {
        for nonce in 0u32.. {
            block.header.nonce = nonce;
            if is_block_hash_valid(&block.hash().unwrap()) {
                return block;
            }
        }
        unreachable!()
    }

    #[test]
    fn append_resets_pending_from_canonical() {
        let tmp = TempDir::new().unwrap();
        let sender = account();
        let miner = account();
        write_genesis(tmp.path(), sender.address, 1_000_000, 10);

        let ledger = Ledger::open(tmp.path()).unwrap();

        // Two chained txns are admitted against pending state pre-mining.
        let t1 = signed(&sender, miner.address, 1, 1, 100);
        let t2 = signed(&sender, miner.address, 2, 2, 101);
        ledger.admit_txn(&t1).unwrap();
        ledger.admit_txn(&t2).unwrap();
        assert_eq!(ledger.pending_next_nonce(&sender.address), 3);

        // Canonical state is untouched until a block lands.
        assert_eq!(ledger.balance(&sender.address), 1_000_000);

        let block = solve(Block::new(
            0,
            Hash::ZERO,
            1_650_000_000,
            0,
            miner.address,
            vec![t1, t2],
        ));
        ledger.append_block(block).unwrap();

        assert_eq!(ledger.balance(&sender.address), 1_000_000 - 3 - 2 * TXN_FEE);
        assert_eq!(ledger.balance(&miner.address), 3 + REWARD + 2 * TXN_FEE);
        // Pending is a fresh copy of canonical again.
        assert_eq!(ledger.pending_next_nonce(&sender.address), 3);
        assert_eq!(ledger.next_block_height(), 1);
    }

    #[test]
    fn rejected_block_leaves_canonical_untouched() {
        let tmp = TempDir::new().unwrap();
        let sender = account();
        let miner = account();
        write_genesis(tmp.path(), sender.address, 100, 10);

        let ledger = Ledger::open(tmp.path()).unwrap();

        // Second txn overdraws once the first one and its fee are paid.
        let t1 = signed(&sender, miner.address, 50, 1, 100);
        let t2 = signed(&sender, miner.address, 50, 2, 101);
        let block = solve(Block::new(
            0,
            Hash::ZERO,
            1_650_000_000,
            0,
            miner.address,
            vec![t1, t2],
        ));

        assert!(matches!(
            ledger.append_block(block),
            Err(StateError::InsufficientFunds { .. })
        ));
        assert_eq!(ledger.balance(&sender.address), 100);
        assert_eq!(ledger.latest_hash(), Hash::ZERO);
        assert!(ledger.blocks_after(&Hash::ZERO).unwrap().is_empty());
    }

    #[test]
    fn reopen_replays_to_the_same_state() {
        let tmp = TempDir::new().unwrap();
        let sender = account();
        let miner = account();
        write_genesis(tmp.path(), sender.address, 1_000_000, 10);

        let (hash, balances) = {
            let ledger = Ledger::open(tmp.path()).unwrap();
            let t1 = signed(&sender, miner.address, 5, 1, 100);
            let b0 = solve(Block::new(
                0,
                Hash::ZERO,
                1_650_000_000,
                0,
                miner.address,
                vec![t1],
            ));
            ledger.append_block(b0).unwrap();

            let t2 = signed(&sender, miner.address, 7, 2, 200);
            let b1 = solve(Block::new(
                1,
                ledger.latest_hash(),
                1_650_000_010,
                0,
                miner.address,
                vec![t2],
            ));
            let hash = ledger.append_block(b1).unwrap();
            (hash, ledger.balances())
        };

        let reopened = Ledger::open(tmp.path()).unwrap();
        assert_eq!(reopened.latest_hash(), hash);
        assert_eq!(reopened.latest_height(), 1);
        assert_eq!(reopened.balances(), balances);

        // Indexed lookups work after replay.
        assert_eq!(reopened.block_by_height(1).unwrap().hash, hash);
        assert_eq!(reopened.block_by_hash(&hash).unwrap().hash, hash);
    }

    #[test]
    fn admission_failure_does_not_corrupt_pending() {
        let tmp = TempDir::new().unwrap();
        let sender = account();
        let other = account();
        write_genesis(tmp.path(), sender.address, 1_000, 10);

        let ledger = Ledger::open(tmp.path()).unwrap();

        let wrong_nonce = signed(&sender, other.address, 1, 5, 100);
        assert!(ledger.admit_txn(&wrong_nonce).is_err());

        // The failed admission consumed nothing.
        assert_eq!(ledger.pending_next_nonce(&sender.address), 1);
        ledger
            .admit_txn(&signed(&sender, other.address, 1, 1, 100))
            .unwrap();
    }
}
