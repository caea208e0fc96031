//! Account addresses and owner keys.

use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha512_256};
use std::fmt;

use crate::error::{DidError, DidResult, ErrorCode};

/// Application identifier on the ledger.
pub type AppId = u64;

/// Length of an account address and of an owner public key.
pub const KEY_LENGTH: usize = 32;

/// A ledger account address.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct Address([u8; KEY_LENGTH]);

impl Address {
    pub const fn new(bytes: [u8; KEY_LENGTH]) -> Self {
        Self(bytes)
    }

    /// Derives a deterministic address from a human readable name.
    pub fn from_name(name: &str) -> Self {
        Self(digest(&[b"account", name.as_bytes()]))
    }

    /// The escrow account of an application.
    pub fn for_application(app_id: AppId) -> Self {
        Self(digest(&[b"appID", &app_id.to_be_bytes()]))
    }

    pub fn as_bytes(&self) -> &[u8; KEY_LENGTH] {
        &self.0
    }
}

impl fmt::Display for Address {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&hex::encode(self.0))
    }
}

/// The public key a DID document belongs to; keys the metadata registry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct OwnerKey([u8; KEY_LENGTH]);

impl OwnerKey {
    pub const fn new(bytes: [u8; KEY_LENGTH]) -> Self {
        Self(bytes)
    }

    /// Parses a hex encoded 32-byte public key.
    pub fn from_hex(s: &str) -> DidResult<Self> {
        let bytes = hex::decode(s).map_err(|e| {
            DidError::with_message(
                ErrorCode::InvalidPublicKey,
                format!("invalid public key, expected hex, got {}: {}", s, e),
            )
        })?;
        Self::from_slice(&bytes)
    }

    pub fn from_slice(bytes: &[u8]) -> DidResult<Self> {
        let key: [u8; KEY_LENGTH] = bytes.try_into().map_err(|_| {
            DidError::with_message(
                ErrorCode::InvalidPublicKey,
                format!(
                    "invalid public key, expected {} bytes, got {}",
                    KEY_LENGTH,
                    bytes.len()
                ),
            )
        })?;
        Ok(Self(key))
    }

    /// Derives a deterministic key from a human readable name.
    pub fn from_name(name: &str) -> Self {
        Self(digest(&[b"owner", name.as_bytes()]))
    }

    pub fn as_bytes(&self) -> &[u8; KEY_LENGTH] {
        &self.0
    }

    pub fn to_hex(&self) -> String {
        hex::encode(self.0)
    }
}

impl fmt::Display for OwnerKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.to_hex())
    }
}

fn digest(parts: &[&[u8]]) -> [u8; KEY_LENGTH] {
    let mut hasher = Sha512_256::new();
    for part in parts {
        hasher.update(part);
    }
    hasher.finalize().into()
}
