//! # opb-crypto
//!
//! secp256k1 key handling for the OPB ledger.
//!
//! Accounts are identified by the last 20 bytes of the Keccak-256 digest of
//! the uncompressed public key. Transactions are signed over a 32-byte
//! SHA-256 digest and carry a 65-byte `(r, s, v)` recoverable signature, so
//! verification recovers the signer instead of requiring the public key on
//! the wire.

use k256::ecdsa::{RecoveryId, Signature, SigningKey, VerifyingKey};
use sha3::{Digest, Keccak256};
use thiserror::Error;

/// Length of a recoverable `(r, s, v)` signature.
pub const SIGNATURE_LEN: usize = 65;

/// Length of a raw account identifier.
pub const ADDRESS_LEN: usize = 20;

/// Crypto errors.
#[derive(Error, Debug)]
pub enum CryptoError {
    /// Signature bytes are malformed.
    #[error("invalid signature: {0}")]
    InvalidSignature(String),

    /// The recovery byte is out of range.
    #[error("invalid recovery id: {0}")]
    InvalidRecoveryId(u8),

    /// No public key could be recovered from the signature.
    #[error("public key recovery failed")]
    RecoveryFailed,

    /// Private key bytes do not form a valid scalar.
    #[error("invalid private key")]
    InvalidPrivateKey,
}

/// Result type for crypto operations.
pub type CryptoResult<T> = Result<T, CryptoError>;

/// Generate a fresh secp256k1 signing key.
pub fn generate_key() -> SigningKey {
    SigningKey::random(&mut rand::thread_rng())
}

/// Rebuild a signing key from its 32 raw scalar bytes.
pub fn signing_key_from_bytes(bytes: &[u8]) -> CryptoResult<SigningKey> {
    SigningKey::from_slice(bytes).map_err(|_| CryptoError::InvalidPrivateKey)
}

/// Derive the 20-byte account identifier for a public key.
///
/// Keccak-256 over the uncompressed SEC1 encoding without the `0x04` prefix,
/// keeping the last 20 bytes.
pub fn address_of(key: &VerifyingKey) -> [u8; ADDRESS_LEN] {
    let encoded = key.to_encoded_point(false);
    let digest = keccak256(&encoded.as_bytes()[1..]);

    let mut address = [0u8; ADDRESS_LEN];
    address.copy_from_slice(&digest[12..]);
    address
}

/// Sign a 32-byte digest, producing a 65-byte `r || s || v` signature.
///
/// `v` is the raw recovery id (0 or 1).
pub fn sign_digest(key: &SigningKey, digest: &[u8; 32]) -> CryptoResult<[u8; SIGNATURE_LEN]> {
    let (signature, recovery_id) = key
        .sign_prehash_recoverable(digest)
        .map_err(|e| CryptoError::InvalidSignature(e.to_string()))?;

    let mut out = [0u8; SIGNATURE_LEN];
    out[..64].copy_from_slice(&signature.to_bytes());
    out[64] = recovery_id.to_byte();
    Ok(out)
}

/// Recover the signing account from a digest and a 65-byte signature.
///
/// Returns the address that produced the signature; callers compare it
/// against the claimed sender.
pub fn recover_address(digest: &[u8; 32], sig: &[u8]) -> CryptoResult<[u8; ADDRESS_LEN]> {
    if sig.len() != SIGNATURE_LEN {
        return Err(CryptoError::InvalidSignature(format!(
            "expected {} bytes, got {}",
            SIGNATURE_LEN,
            sig.len()
        )));
    }

    let signature = Signature::from_slice(&sig[..64])
        .map_err(|e| CryptoError::InvalidSignature(e.to_string()))?;
    let recovery_id = match sig[64] {
        v @ (0 | 1) => RecoveryId::try_from(v).map_err(|_| CryptoError::InvalidRecoveryId(v))?,
        v => return Err(CryptoError::InvalidRecoveryId(v)),
    };

    let key = VerifyingKey::recover_from_prehash(digest, &signature, recovery_id)
        .map_err(|_| CryptoError::RecoveryFailed)?;

    Ok(address_of(&key))
}

/// Keccak-256 digest.
pub fn keccak256(data: &[u8]) -> [u8; 32] {
    let mut hasher = Keccak256::new();
    hasher.update(data);
    hasher.finalize().into()
}
