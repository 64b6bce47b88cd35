//! Balance and nonce replay machine.

use crate::{StateError, StateResult};
use opb_chain::{
    is_block_hash_valid, Address, Block, Hash, SignedTxn, DEFAULT_GAS_PRICE, REWARD, TXN_FEE,
    TXN_GAS,
};
use opb_storage::Genesis;
use std::collections::HashMap;

/// The account map derived by replaying the block log, plus the chain tip.
///
/// `apply_block` and `apply_txn` mutate `self` as they validate; callers
/// that need atomicity apply on a scratch clone and commit the clone only
/// on success, which is exactly what [`crate::Ledger`] does.
#[derive(Clone, Debug)]
pub struct State {
    balances: HashMap<Address, u64>,
    nonces: HashMap<Address, u64>,
    latest_block: Block,
    latest_hash: Hash,
    has_genesis_block: bool,
    fork_oip_1: u64,
}

impl State {
    /// Fresh state seeded from genesis balances.
    pub fn from_genesis(genesis: &Genesis) -> Self {
        Self {
            balances: genesis.balances.clone(),
            nonces: HashMap::new(),
            latest_block: Block::default(),
            latest_hash: Hash::ZERO,
            has_genesis_block: false,
            fork_oip_1: genesis.fork_oip_1,
        }
    }

    pub fn latest_block(&self) -> &Block {
        &self.latest_block
    }

    pub fn latest_hash(&self) -> Hash {
        self.latest_hash
    }

    pub fn has_genesis_block(&self) -> bool {
        self.has_genesis_block
    }

    /// Height of the next block to be appended; 0 before any block exists.
    pub fn next_block_height(&self) -> u64 {
        if !self.has_genesis_block {
            return 0;
        }
        self.latest_block.header.height + 1
    }

    /// The nonce the given account must use on its next transaction.
    pub fn next_nonce(&self, account: &Address) -> u64 {
        self.nonces.get(account).copied().unwrap_or(0) + 1
    }

    /// Whether OIP-1 fee accounting applies to the next block.
    pub fn is_fork_active(&self) -> bool {
        self.next_block_height() >= self.fork_oip_1
    }

    pub fn balance(&self, account: &Address) -> u64 {
        self.balances.get(account).copied().unwrap_or(0)
    }

    pub fn balances(&self) -> &HashMap<Address, u64> {
        &self.balances
    }

    /// Apply one signed transaction.
    ///
    /// All checks run before any mutation, so a failed application leaves
    /// the state untouched.
    pub fn apply_txn(&mut self, txn: &SignedTxn) -> StateResult<()> {
        if !txn.is_authentic()? {
            return Err(StateError::ForgedTxn(txn.from));
        }

        let expected = self.next_nonce(&txn.from);
        if txn.nonce != expected {
            return Err(StateError::BadNonce {
                account: txn.from,
                expected,
                got: txn.nonce,
            });
        }

        let fork_active = self.is_fork_active();
        if fork_active {
            if txn.gas != TXN_GAS {
                return Err(StateError::InvalidGasConfig(format!(
                    "requires {} gas, got {}",
                    TXN_GAS, txn.gas
                )));
            }
            if txn.gas_price < DEFAULT_GAS_PRICE {
                return Err(StateError::InvalidGasConfig(format!(
                    "gas price must be at least {}",
                    DEFAULT_GAS_PRICE
                )));
            }
        } else if txn.gas != 0 || txn.gas_price != 0 {
            // Legacy peers would crash on gas-carrying txns.
            return Err(StateError::InvalidGasConfig(
                "gas and gasPrice cannot be populated before the OIP-1 fork".to_string(),
            ));
        }

        let cost = txn.total_cost(fork_active);
        if cost > self.balance(&txn.from) {
            return Err(StateError::InsufficientFunds {
                account: txn.from,
                needed: cost,
            });
        }

        *self.balances.entry(txn.from).or_insert(0) -= cost;
        *self.balances.entry(txn.to).or_insert(0) += txn.value;
        self.nonces.insert(txn.from, txn.nonce);
        Ok(())
    }

    /// Validate and apply one block: linkage, difficulty, every transaction
    /// in ascending time order, then the miner credit.
    pub fn apply_block(&mut self, block: &Block) -> StateResult<()> {
        if self.has_genesis_block {
            let expected = self.latest_block.header.height + 1;
            if block.header.height != expected {
                return Err(StateError::BadHeight {
                    expected,
                    got: block.header.height,
                });
            }
        } else if block.header.height != 0 {
            return Err(StateError::BadHeight {
                expected: 0,
                got: block.header.height,
            });
        }

        if self.has_genesis_block
            && self.latest_block.header.height > 0
            && block.header.parent != self.latest_hash
        {
            return Err(StateError::BadParent {
                expected: self.latest_hash,
                got: block.header.parent,
            });
        }

        let hash = block.hash()?;
        if !is_block_hash_valid(&hash) {
            return Err(StateError::BadDifficulty(hash));
        }

        let mut txns = block.txns.clone();
        txns.sort_by_key(|txn| txn.time);
        for txn in &txns {
            self.apply_txn(txn)?;
        }

        // Fork state is judged while the tip still points at the parent, so
        // the switch applies to the block at exactly the fork height.
        let miner_fees = if self.is_fork_active() {
            block.gas_reward()
        } else {
            block.txns.len() as u64 * TXN_FEE
        };
        *self.balances.entry(block.header.miner).or_insert(0) += REWARD + miner_fees;

        self.latest_block = block.clone();
        self.latest_hash = hash;
        self.has_genesis_block = true;
        Ok(())
    }
}
