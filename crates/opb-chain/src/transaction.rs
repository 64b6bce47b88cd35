//! Signed value transfers.
//!
//! A transaction has two wire shapes selected by its gas fields: the legacy
//! shape (`gas == 0`) omits `gas`/`gasPrice`, the OIP-1 shape carries them.
//! Hashing always runs over the shape that is transmitted and stored, so a
//! transaction re-encodes byte-for-byte and signature recovery stays sound.

use crate::{Address, ChainResult, Hash, TXN_FEE};
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use sha2::{Digest, Sha256};
use std::time::{SystemTime, UNIX_EPOCH};

/// An unsigned value transfer.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Txn {
    pub from: Address,
    pub to: Address,
    pub value: u64,
    pub nonce: u64,
    pub gas: u64,
    pub gas_price: u64,
    pub data: String,
    pub time: u64,
}

impl Txn {
    /// Build a legacy (pre-OIP-1) transaction stamped with the current time.
    pub fn new(from: Address, to: Address, value: u64, nonce: u64, data: impl Into<String>) -> Self {
        Self {
            from,
            to,
            value,
            nonce,
            gas: 0,
            gas_price: 0,
            data: data.into(),
            time: unix_now(),
        }
    }

    /// Build a gas-carrying (OIP-1) transaction stamped with the current time.
    #[allow(clippy::too_many_arguments)]
    pub fn with_gas(
        from: Address,
        to: Address,
        value: u64,
        nonce: u64,
        gas: u64,
        gas_price: u64,
        data: impl Into<String>,
    ) -> Self {
        Self {
            from,
            to,
            value,
            nonce,
            gas,
            gas_price,
            data: data.into(),
            time: unix_now(),
        }
    }

    /// Legacy reward-typed transaction. Kept for decoding old logs; the
    /// state engine never credits by it.
    pub fn is_reward(&self) -> bool {
        self.data == crate::REWARD_DATA
    }

    /// Whether this transaction uses the gas-carrying wire shape.
    pub fn carries_gas(&self) -> bool {
        self.gas != 0
    }

    /// Fee paid to the miner under OIP-1 accounting.
    pub fn gas_cost(&self) -> u64 {
        self.gas * self.gas_price
    }

    /// Total amount debited from the sender.
    pub fn total_cost(&self, fork_active: bool) -> u64 {
        if fork_active {
            self.value + self.gas_cost()
        } else {
            self.value + TXN_FEE
        }
    }

    /// Canonical JSON bytes in the shape selected by the gas fields.
    pub fn encode(&self) -> ChainResult<Vec<u8>> {
        Ok(serde_json::to_vec(self)?)
    }

    /// The 32-byte signing digest: SHA-256 of the canonical encoding.
    pub fn digest(&self) -> ChainResult<[u8; 32]> {
        Ok(sha256(&self.encode()?))
    }

    /// The transaction hash.
    pub fn hash(&self) -> ChainResult<Hash> {
        Ok(Hash::new(self.digest()?))
    }
}

/// A transaction plus its 65-byte recoverable signature.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct SignedTxn {
    pub txn: Txn,
    pub sig: Vec<u8>,
}

impl SignedTxn {
    pub fn new(txn: Txn, sig: Vec<u8>) -> Self {
        Self { txn, sig }
    }

    /// The hash of the underlying transaction; signed txns are keyed by it
    /// in the mempool and the archive.
    pub fn hash(&self) -> ChainResult<Hash> {
        self.txn.hash()
    }

    /// Whether the signature recovers to the claimed sender.
    pub fn is_authentic(&self) -> ChainResult<bool> {
        let digest = self.txn.digest()?;
        let recovered = opb_crypto::recover_address(&digest, &self.sig)?;
        Ok(&recovered == self.txn.from.as_bytes())
    }
}

impl std::ops::Deref for SignedTxn {
    type Target = Txn;

    fn deref(&self) -> &Txn {
        &self.txn
    }
}

fn unix_now() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap_or_default()
        .as_secs()
}

fn sha256(bytes: &[u8]) -> [u8; 32] {
    let mut hasher = Sha256::new();
    hasher.update(bytes);
    hasher.finalize().into()
}

// Wire shapes. Field order here is the canonical encoding; do not reorder.

#[derive(Serialize)]
struct LegacyTxn<'a> {
    from: &'a Address,
    to: &'a Address,
    value: u64,
    nonce: u64,
    data: &'a str,
    time: u64,
}

#[derive(Serialize)]
struct Oip1Txn<'a> {
    from: &'a Address,
    to: &'a Address,
    gas: u64,
    #[serde(rename = "gasPrice")]
    gas_price: u64,
    value: u64,
    nonce: u64,
    data: &'a str,
    time: u64,
}

#[derive(Serialize)]
struct LegacySignedTxn<'a> {
    from: &'a Address,
    to: &'a Address,
    value: u64,
    nonce: u64,
    data: &'a str,
    time: u64,
    signature: String,
}

#[derive(Serialize)]
struct Oip1SignedTxn<'a> {
    from: &'a Address,
    to: &'a Address,
    gas: u64,
    #[serde(rename = "gasPrice")]
    gas_price: u64,
    value: u64,
    nonce: u64,
    data: &'a str,
    time: u64,
    signature: String,
}

#[derive(Deserialize)]
struct RawTxn {
    from: Address,
    to: Address,
    #[serde(default)]
    gas: u64,
    #[serde(default, rename = "gasPrice")]
    gas_price: u64,
    value: u64,
    nonce: u64,
    #[serde(default)]
    data: String,
    time: u64,
    #[serde(default)]
    signature: Option<String>,
}

impl RawTxn {
    fn into_txn(self) -> Txn {
        Txn {
            from: self.from,
            to: self.to,
            value: self.value,
            nonce: self.nonce,
            gas: self.gas,
            gas_price: self.gas_price,
            data: self.data,
            time: self.time,
        }
    }
}

impl Serialize for Txn {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        if self.carries_gas() {
            Oip1Txn {
                from: &self.from,
                to: &self.to,
                gas: self.gas,
                gas_price: self.gas_price,
                value: self.value,
                nonce: self.nonce,
                data: &self.data,
                time: self.time,
            }
            .serialize(serializer)
        } else {
            LegacyTxn {
                from: &self.from,
                to: &self.to,
                value: self.value,
                nonce: self.nonce,
                data: &self.data,
                time: self.time,
            }
            .serialize(serializer)
        }
    }
}

impl<'de> Deserialize<'de> for Txn {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        Ok(RawTxn::deserialize(deserializer)?.into_txn())
    }
}

impl Serialize for SignedTxn {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let signature = hex::encode(&self.sig);
        if self.txn.carries_gas() {
            Oip1SignedTxn {
                from: &self.txn.from,
                to: &self.txn.to,
                gas: self.txn.gas,
                gas_price: self.txn.gas_price,
                value: self.txn.value,
                nonce: self.txn.nonce,
                data: &self.txn.data,
                time: self.txn.time,
                signature,
            }
            .serialize(serializer)
        } else {
            LegacySignedTxn {
                from: &self.txn.from,
                to: &self.txn.to,
                value: self.txn.value,
                nonce: self.txn.nonce,
                data: &self.txn.data,
                time: self.txn.time,
                signature,
            }
            .serialize(serializer)
        }
    }
}

impl<'de> Deserialize<'de> for SignedTxn {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let raw = RawTxn::deserialize(deserializer)?;
        let sig_hex = raw
            .signature
            .as_deref()
            .ok_or_else(|| serde::de::Error::missing_field("signature"))?;
        let sig = hex::decode(sig_hex)
            .map_err(|_| serde::de::Error::custom("signature is not valid hex"))?;
        Ok(SignedTxn {
            txn: raw.into_txn(),
            sig,
        })
    }
}
