// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Public-key encryption envelope for stored payloads.
//!
//! A payload is sealed to a recipient's X25519 public key:
//!
//! 1. Generate an ephemeral X25519 key pair
//! 2. `shared = X25519(ephemeral_secret, recipient_public)`
//! 3. `key = HKDF-SHA256(salt = ephemeral_public || recipient_public, ikm = shared)`
//! 4. `ciphertext = XChaCha20-Poly1305(key, random 24-byte nonce, plaintext)`
//!
//! The envelope serializes to JSON with base64 fields, the same shape wallet
//! encryption envelopes use (`version`, `nonce`, `ephemPublicKey`, `ciphertext`).

use base64ct::{Base64, Encoding};
use chacha20poly1305::aead::{Aead, KeyInit};
use chacha20poly1305::{XChaCha20Poly1305, XNonce};
use hkdf::Hkdf;
use rand::rngs::OsRng;
use rand::RngCore;
use serde::{Deserialize, Serialize};
use sha2::Sha256;
use x25519_dalek::{EphemeralSecret, PublicKey, StaticSecret};

use super::EncryptionPublicKey;

pub const ENVELOPE_VERSION: &str = "x25519-xchacha20-poly1305";
const KEY_INFO: &[u8] = b"consent-exchange/envelope/v1";
const NONCE_BYTES: usize = 24;

#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum EnvelopeError {
    #[error("Unsupported envelope version: {0}")]
    UnsupportedVersion(String),

    #[error("Malformed envelope: {0}")]
    Malformed(String),

    #[error("Encryption failed: {0}")]
    EncryptFailed(String),

    #[error("Decryption failed")]
    DecryptFailed,
}

/// Ciphertext sealed to a single recipient.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EncryptedEnvelope {
    pub version: String,
    pub nonce: String,
    pub ephem_public_key: String,
    pub ciphertext: String,
}

impl EncryptedEnvelope {
    /// Seal `plaintext` so that only the holder of `recipient`'s secret can open it.
    pub fn seal(recipient: &EncryptionPublicKey, plaintext: &[u8]) -> Result<Self, EnvelopeError> {
        let recipient_public = PublicKey::from(*recipient.as_bytes());
        let ephemeral = EphemeralSecret::random_from_rng(OsRng);
        let ephemeral_public = PublicKey::from(&ephemeral);

        let shared = ephemeral.diffie_hellman(&recipient_public);
        if !shared.was_contributory() {
            return Err(EnvelopeError::EncryptFailed(
                "recipient public key is a low-order point".to_string(),
            ));
        }

        let key = derive_key(shared.as_bytes(), ephemeral_public.as_bytes(), recipient.as_bytes())?;

        let mut nonce = [0u8; NONCE_BYTES];
        OsRng.fill_bytes(&mut nonce);

        let cipher = XChaCha20Poly1305::new(&key.into());
        let ciphertext = cipher
            .encrypt(XNonce::from_slice(&nonce), plaintext)
            .map_err(|_| EnvelopeError::EncryptFailed("aead encrypt failed".to_string()))?;

        Ok(Self {
            version: ENVELOPE_VERSION.to_string(),
            nonce: Base64::encode_string(&nonce),
            ephem_public_key: Base64::encode_string(ephemeral_public.as_bytes()),
            ciphertext: Base64::encode_string(&ciphertext),
        })
    }

    /// Open the envelope with the recipient's secret.
    pub fn open(&self, secret: &StaticSecret) -> Result<Vec<u8>, EnvelopeError> {
        if self.version != ENVELOPE_VERSION {
            return Err(EnvelopeError::UnsupportedVersion(self.version.clone()));
        }

        let nonce: [u8; NONCE_BYTES] = decode_fixed(&self.nonce, "nonce")?;
        let ephemeral_bytes: [u8; 32] = decode_fixed(&self.ephem_public_key, "ephemPublicKey")?;
        let ciphertext = Base64::decode_vec(&self.ciphertext)
            .map_err(|e| EnvelopeError::Malformed(format!("ciphertext: {e}")))?;

        let ephemeral_public = PublicKey::from(ephemeral_bytes);
        let recipient_public = PublicKey::from(secret);
        let shared = secret.diffie_hellman(&ephemeral_public);
        if !shared.was_contributory() {
            return Err(EnvelopeError::DecryptFailed);
        }

        let key = derive_key(shared.as_bytes(), &ephemeral_bytes, recipient_public.as_bytes())?;
        let cipher = XChaCha20Poly1305::new(&key.into());
        cipher
            .decrypt(XNonce::from_slice(&nonce), ciphertext.as_slice())
            .map_err(|_| EnvelopeError::DecryptFailed)
    }

    /// JSON bytes as stored in the content store.
    pub fn to_bytes(&self) -> Result<Vec<u8>, EnvelopeError> {
        serde_json::to_vec(self).map_err(|e| EnvelopeError::Malformed(e.to_string()))
    }

    pub fn from_bytes(bytes: &[u8]) -> Result<Self, EnvelopeError> {
        serde_json::from_slice(bytes).map_err(|e| EnvelopeError::Malformed(e.to_string()))
    }
}

fn derive_key(
    shared: &[u8; 32],
    ephemeral_public: &[u8; 32],
    recipient_public: &[u8; 32],
) -> Result<[u8; 32], EnvelopeError> {
    let mut salt = [0u8; 64];
    salt[..32].copy_from_slice(ephemeral_public);
    salt[32..].copy_from_slice(recipient_public);

    let mut key = [0u8; 32];
    Hkdf::<Sha256>::new(Some(&salt[..]), shared)
        .expand(KEY_INFO, &mut key)
        .map_err(|_| EnvelopeError::EncryptFailed("key derivation failed".to_string()))?;
    Ok(key)
}

fn decode_fixed<const N: usize>(encoded: &str, field: &str) -> Result<[u8; N], EnvelopeError> {
    let raw = Base64::decode_vec(encoded)
        .map_err(|e| EnvelopeError::Malformed(format!("{field}: {e}")))?;
    raw.try_into().map_err(|raw: Vec<u8>| {
        EnvelopeError::Malformed(format!("{field}: expected {N} bytes, got {}", raw.len()))
    })
}
