//! Encrypted key files.

use crate::{keystore_dir, WalletError, WalletResult};
use aes_gcm::aead::{Aead, KeyInit};
use aes_gcm::{Aes256Gcm, Nonce};
use k256::ecdsa::SigningKey;
use opb_chain::{Address, SignedTxn, Txn};
use rand::RngCore;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;
use tracing::info;

/// Version of the keystore file format.
const KEYSTORE_VERSION: u8 = 1;

/// scrypt cost parameters: N = 2^15, r = 8, p = 1.
const SCRYPT_LOG_N: u8 = 15;
const SCRYPT_R: u32 = 8;
const SCRYPT_P: u32 = 1;

/// One keystore file: a private key sealed with AES-256-GCM under a
/// scrypt-derived password key. KDF parameters are stored alongside so old
/// files stay readable if the defaults change.
#[derive(Serialize, Deserialize, Clone, Debug)]
pub struct EncryptedKey {
    pub version: u8,
    pub address: Address,
    pub ciphertext: String,
    pub salt: String,
    pub nonce: String,
    pub scrypt_log_n: u8,
    pub scrypt_r: u32,
    pub scrypt_p: u32,
}

/// Generate a fresh account and write its encrypted key file. Returns the
/// new address.
pub fn create_account(data_dir: &Path, password: &str) -> WalletResult<Address> {
    let dir = keystore_dir(data_dir);
    fs::create_dir_all(&dir)?;

    let key = opb_crypto::generate_key();
    let address = Address::new(opb_crypto::address_of(key.verifying_key()));

    let mut salt = [0u8; 16];
    let mut nonce = [0u8; 12];
    rand::thread_rng().fill_bytes(&mut salt);
    rand::thread_rng().fill_bytes(&mut nonce);

    let cipher_key = derive_key(password, &salt, SCRYPT_LOG_N, SCRYPT_R, SCRYPT_P)?;
    let cipher = Aes256Gcm::new_from_slice(&cipher_key)
        .map_err(|e| WalletError::KeyDerivation(e.to_string()))?;
    let ciphertext = cipher
        .encrypt(Nonce::from_slice(&nonce), key.to_bytes().as_slice())
        .map_err(|e| WalletError::KeyDerivation(e.to_string()))?;

    let entry = EncryptedKey {
        version: KEYSTORE_VERSION,
        address,
        ciphertext: hex::encode(ciphertext),
        salt: hex::encode(salt),
        nonce: hex::encode(nonce),
        scrypt_log_n: SCRYPT_LOG_N,
        scrypt_r: SCRYPT_R,
        scrypt_p: SCRYPT_P,
    };

    let path = dir.join(key_file_name(&address));
    fs::write(&path, serde_json::to_vec_pretty(&entry)?)?;
    info!(account = %address, path = %path.display(), "created keystore entry");

    Ok(address)
}

/// Decrypt the private key of an account.
pub fn load_key(data_dir: &Path, address: &Address, password: &str) -> WalletResult<SigningKey> {
    let path = keystore_dir(data_dir).join(key_file_name(address));
    if !path.exists() {
        return Err(WalletError::UnknownAccount(*address));
    }

    let entry: EncryptedKey = serde_json::from_str(&fs::read_to_string(&path)?)?;
    let salt = hex::decode(&entry.salt).map_err(|_| WalletError::InvalidPassword)?;
    let nonce = hex::decode(&entry.nonce).map_err(|_| WalletError::InvalidPassword)?;
    let ciphertext = hex::decode(&entry.ciphertext).map_err(|_| WalletError::InvalidPassword)?;

    let cipher_key = derive_key(password, &salt, entry.scrypt_log_n, entry.scrypt_r, entry.scrypt_p)?;
    let cipher = Aes256Gcm::new_from_slice(&cipher_key)
        .map_err(|e| WalletError::KeyDerivation(e.to_string()))?;
    let plaintext = cipher
        .decrypt(Nonce::from_slice(&nonce), ciphertext.as_slice())
        .map_err(|_| WalletError::InvalidPassword)?;

    Ok(opb_crypto::signing_key_from_bytes(&plaintext)?)
}

/// Sign a transaction with the stored key of its sender.
pub fn sign_txn(
    data_dir: &Path,
    txn: Txn,
    password: &str,
) -> WalletResult<SignedTxn> {
    let key = load_key(data_dir, &txn.from, password)?;
    let sig = opb_crypto::sign_digest(&key, &txn.digest()?)?;
    Ok(SignedTxn::new(txn, sig.to_vec()))
}

/// Addresses with a keystore entry, in directory order.
pub fn list_accounts(data_dir: &Path) -> WalletResult<Vec<Address>> {
    let dir = keystore_dir(data_dir);
    if !dir.exists() {
        return Ok(Vec::new());
    }

    let mut accounts = Vec::new();
    for entry in fs::read_dir(dir)? {
        let path = entry?.path();
        if path.extension().is_some_and(|ext| ext == "json") {
            let parsed: EncryptedKey = serde_json::from_str(&fs::read_to_string(&path)?)?;
            accounts.push(parsed.address);
        }
    }
    Ok(accounts)
}

fn key_file_name(address: &Address) -> String {
    format!("{}.json", hex::encode(address.as_bytes()))
}

fn derive_key(
    password: &str,
    salt: &[u8],
    log_n: u8,
    r: u32,
    p: u32,
) -> WalletResult<[u8; 32]> {
    let params = scrypt::Params::new(log_n, r, p, 32)
        .map_err(|e| WalletError::KeyDerivation(e.to_string()))?;

    let mut out = [0u8; 32];
    scrypt::scrypt(password.as_bytes(), salt, &params, &mut out)
        .map_err(|e| WalletError::KeyDerivation(e.to_string()))?;
    Ok(out)
}
