//! # opb-wallet
//!
//! On-disk keystore for OPB accounts: one encrypted JSON file per account
//! under `<dataDir>/keystore/`, holding a secp256k1 private key sealed with
//! AES-256-GCM under a scrypt-derived password key. The node reads the
//! keystore when `/txn/add` asks it to sign on the submitter's behalf.

mod keystore;

pub use keystore::{create_account, list_accounts, load_key, sign_txn, EncryptedKey};

use opb_chain::{Address, ChainError};
use std::path::{Path, PathBuf};
use thiserror::Error;

/// Keystore directory of a data dir.
pub fn keystore_dir(data_dir: &Path) -> PathBuf {
    data_dir.join("keystore")
}

/// Wallet errors.
#[derive(Error, Debug)]
pub enum WalletError {
    /// Keystore file I/O failed.
    #[error("keystore i/o error: {0}")]
    Io(#[from] std::io::Error),

    /// A keystore file failed to parse.
    #[error("keystore decode error: {0}")]
    Decode(#[from] serde_json::Error),

    /// No keystore file for the account.
    #[error("no keystore entry for account {0}")]
    UnknownAccount(Address),

    /// Decryption failed; almost always a wrong password.
    #[error("could not decrypt key, password may be wrong")]
    InvalidPassword,

    /// Key derivation parameters were rejected.
    #[error("key derivation failed: {0}")]
    KeyDerivation(String),

    /// Key or signature handling failed.
    #[error(transparent)]
    Crypto(#[from] opb_crypto::CryptoError),

    /// Transaction encoding failed.
    #[error(transparent)]
    Chain(#[from] ChainError),
}

/// Result type for wallet operations.
pub type WalletResult<T> = Result<T, WalletError>;
