//! 20-byte account identifiers.

use crate::{ChainError, ChainResult};
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::fmt;
use std::str::FromStr;

/// A 20-byte account identifier derived from a secp256k1 public key.
///
/// Rendered as `0x`-prefixed lowercase hex; parsing accepts any case and an
/// optional prefix, so comparison is effectively case-insensitive.
#[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Default)]
pub struct Address([u8; opb_crypto::ADDRESS_LEN]);

impl Address {
    /// The all-zero address.
    pub const ZERO: Address = Address([0u8; opb_crypto::ADDRESS_LEN]);

    /// Wrap raw address bytes.
    pub fn new(bytes: [u8; opb_crypto::ADDRESS_LEN]) -> Self {
        Self(bytes)
    }

    /// Raw bytes.
    pub fn as_bytes(&self) -> &[u8; opb_crypto::ADDRESS_LEN] {
        &self.0
    }

    /// True for the all-zero address.
    pub fn is_zero(&self) -> bool {
        self.0.iter().all(|b| *b == 0)
    }

    /// Parse from hex, with or without a `0x` prefix, any case.
    pub fn from_hex(s: &str) -> ChainResult<Self> {
        let raw = s.strip_prefix("0x").or_else(|| s.strip_prefix("0X")).unwrap_or(s);
        let bytes = hex::decode(raw).map_err(|_| ChainError::InvalidHex(s.to_string()))?;
        let bytes: [u8; opb_crypto::ADDRESS_LEN] = bytes
            .try_into()
            .map_err(|_| ChainError::InvalidHex(s.to_string()))?;
        Ok(Self(bytes))
    }
}

impl From<[u8; opb_crypto::ADDRESS_LEN]> for Address {
    fn from(bytes: [u8; opb_crypto::ADDRESS_LEN]) -> Self {
        Self(bytes)
    }
}

impl fmt::Display for Address {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "0x{}", hex::encode(self.0))
    }
}

impl fmt::Debug for Address {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Address({})", self)
    }
}

impl FromStr for Address {
    type Err = ChainError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::from_hex(s)
    }
}

impl Serialize for Address {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.to_string())
    }
}

impl<'de> Deserialize<'de> for Address {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let s = String::deserialize(deserializer)?;
        Address::from_hex(&s).map_err(serde::de::Error::custom)
    }
}
