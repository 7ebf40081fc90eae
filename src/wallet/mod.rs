// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Wallet key provider integration.
//!
//! The exchange never touches private keys directly. It asks a
//! [`WalletKeyProvider`] for an account's public encryption key and for
//! decryption of payloads addressed to that account. Both calls may be
//! refused (locked or dismissed wallet), which ends the current operation.
//!
//! - `envelope` - public-key encryption envelope for stored payloads
//! - `keyring` - custodial keyring backed by encrypted storage
//! - `session` - active account + signing capability for ledger writes
//! - `signing` - secp256k1 key generation and PEM handling

pub mod envelope;
pub mod keyring;
pub mod session;
pub mod signing;

use std::fmt;

use alloy::primitives::Address;
use async_trait::async_trait;
use base64ct::{Base64, Encoding};
use serde::{Deserialize, Serialize};

pub use envelope::{EncryptedEnvelope, EnvelopeError, ENVELOPE_VERSION};
pub use keyring::LocalKeyring;
pub use session::Session;

/// Base64-encoded X25519 public key used to encrypt data *to* an account.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct EncryptionPublicKey([u8; 32]);

impl EncryptionPublicKey {
    pub fn from_bytes(bytes: [u8; 32]) -> Self {
        Self(bytes)
    }

    /// Parse the base64 form published on the identity ledger.
    pub fn parse(encoded: &str) -> Result<Self, WalletError> {
        let raw = Base64::decode_vec(encoded.trim())
            .map_err(|e| WalletError::InvalidPublicKey(format!("invalid base64: {e}")))?;
        let bytes: [u8; 32] = raw.try_into().map_err(|raw: Vec<u8>| {
            WalletError::InvalidPublicKey(format!("expected 32 bytes, got {}", raw.len()))
        })?;
        Ok(Self(bytes))
    }

    pub fn as_bytes(&self) -> &[u8; 32] {
        &self.0
    }

    pub fn to_base64(&self) -> String {
        Base64::encode_string(&self.0)
    }
}

impl fmt::Display for EncryptionPublicKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.to_base64())
    }
}

impl TryFrom<String> for EncryptionPublicKey {
    type Error = WalletError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::parse(&value)
    }
}

impl From<EncryptionPublicKey> for String {
    fn from(value: EncryptionPublicKey) -> Self {
        value.to_base64()
    }
}

/// Errors raised by wallet key providers.
#[derive(Debug, thiserror::Error)]
pub enum WalletError {
    #[error("Unknown account: {0}")]
    UnknownAccount(Address),

    #[error("Wallet request rejected: {0}")]
    Rejected(String),

    #[error("Wallet {0} belongs to another user")]
    NotOwner(Address),

    #[error("Payload was not encrypted for account {0}")]
    KeyMismatch(Address),

    #[error("Invalid public key: {0}")]
    InvalidPublicKey(String),

    #[error("Invalid private key: {0}")]
    InvalidPrivateKey(String),

    #[error(transparent)]
    Envelope(#[from] EnvelopeError),

    #[error("Key storage error: {0}")]
    Storage(String),
}

pub type WalletResult<T> = Result<T, WalletError>;

/// Holder of account decryption keys.
#[async_trait]
pub trait WalletKeyProvider: Send + Sync {
    /// Public encryption key for `address`.
    async fn public_key(&self, address: Address) -> WalletResult<EncryptionPublicKey>;

    /// Decrypt a payload addressed to `address`.
    async fn decrypt(&self, envelope: &EncryptedEnvelope, address: Address) -> WalletResult<Vec<u8>>;
}
