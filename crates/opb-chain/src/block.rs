//! Blocks and the Proof-of-Work difficulty predicate.

use crate::{Address, ChainResult, Hash, SignedTxn};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

/// Required number of leading zero nibbles in a valid block hash. The count
/// must be exact: a fourth leading zero makes the hash invalid.
pub const BLOCK_DIFFICULTY: usize = 3;

/// Block metadata. Field order is the canonical encoding.
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq, Eq, Default)]
pub struct BlockHeader {
    pub height: u64,
    pub parent: Hash,
    pub time: u64,
    pub nonce: u32,
    pub miner: Address,
}

/// A block: header plus the signed transactions it seals.
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq, Eq, Default)]
pub struct Block {
    pub header: BlockHeader,
    pub txns: Vec<SignedTxn>,
}

/// One line of the block log: the block keyed by its hash.
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq, Eq)]
pub struct BlockFs {
    pub hash: Hash,
    pub block: Block,
}

impl Block {
    pub fn new(
        height: u64,
        parent: Hash,
        time: u64,
        nonce: u32,
        miner: Address,
        txns: Vec<SignedTxn>,
    ) -> Self {
        Self {
            header: BlockHeader {
                height,
                parent,
                time,
                nonce,
                miner,
            },
            txns,
        }
    }

    /// SHA-256 of the canonical block encoding.
    pub fn hash(&self) -> ChainResult<Hash> {
        let encoded = serde_json::to_vec(self)?;
        let mut hasher = Sha256::new();
        hasher.update(&encoded);
        Ok(Hash::new(hasher.finalize().into()))
    }

    /// Total gas fees sealed in this block, credited to the miner once
    /// OIP-1 is active.
    pub fn gas_reward(&self) -> u64 {
        self.txns.iter().map(|txn| txn.gas_cost()).sum()
    }
}

/// Structural difficulty check: the lowercase hex rendering starts with
/// exactly [`BLOCK_DIFFICULTY`] zeros.
pub fn is_block_hash_valid(hash: &Hash) -> bool {
    let hex = hash.to_hex();
    hex.bytes().take_while(|b| *b == b'0').count() == BLOCK_DIFFICULTY
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::Txn;

    fn hash_from_prefix(prefix: &str) -> Hash {
        let mut hex = String::from(prefix);
        while hex.len() < 64 {
            hex.push('f');
        }
        Hash::from_hex(&hex).unwrap()
    }

    #[test]
    fn three_leading_zeros_is_valid() {
        assert!(is_block_hash_valid(&hash_from_prefix("000")));
        assert!(is_block_hash_valid(&hash_from_prefix("0001234")));
    }

    #[test]
    fn other_prefix_lengths_are_invalid() {
        assert!(!is_block_hash_valid(&hash_from_prefix("")));
        assert!(!is_block_hash_valid(&hash_from_prefix("00")));
        assert!(!is_block_hash_valid(&hash_from_prefix("0000")));
        assert!(!is_block_hash_valid(&Hash::ZERO));
    }

    #[test]
    fn block_hash_is_stable_over_roundtrip() {
        let key = opb_crypto::generate_key();
        let from = Address::new(opb_crypto::address_of(key.verifying_key()));
        let mut txn = Txn::new(from, Address::new([9; 20]), 3, 1, "");
        txn.time = 1_650_000_000;
        let sig = opb_crypto::sign_digest(&key, &txn.digest().unwrap()).unwrap();

        let block = Block::new(
            1,
            Hash::new([0xaa; 32]),
            1_650_000_100,
            42,
            Address::new([5; 20]),
            vec![SignedTxn::new(txn, sig.to_vec())],
        );

        let json = serde_json::to_vec(&block).unwrap();
        let back: Block = serde_json::from_slice(&json).unwrap();

        assert_eq!(back, block);
        assert_eq!(back.hash().unwrap(), block.hash().unwrap());
    }

    #[test]
    fn header_encoding_field_order() {
        let header = BlockHeader {
            height: 2,
            parent: Hash::new([1; 32]),
            time: 10,
            nonce: 7,
            miner: Address::new([2; 20]),
        };

        let json = serde_json::to_string(&header).unwrap();
        assert!(json.starts_with("{\"height\":2,\"parent\":\""));
        assert!(json.contains("\",\"time\":10,\"nonce\":7,\"miner\":\""));
    }

    #[test]
    fn gas_reward_sums_txn_gas_costs() {
        let mut t1 = Txn::with_gas(Address::ZERO, Address::ZERO, 1, 1, 10, 1, "");
        let mut t2 = Txn::with_gas(Address::ZERO, Address::ZERO, 1, 2, 10, 3, "");
        t1.time = 0;
        t2.time = 0;

        let block = Block::new(
            0,
            Hash::ZERO,
            0,
            0,
            Address::ZERO,
            vec![
                SignedTxn::new(t1, vec![0; 65]),
                SignedTxn::new(t2, vec![0; 65]),
            ],
        );

        assert_eq!(block.gas_reward(), 10 + 30);
    }

    #[test]
    fn block_fs_line_shape() {
        let block = Block::default();
        let fs = BlockFs {
            hash: block.hash().unwrap(),
            block,
        };

        let json = serde_json::to_string(&fs).unwrap();
        assert!(json.starts_with("{\"hash\":\""));
        assert!(json.contains("\"block\":{\"header\":"));
    }
}
