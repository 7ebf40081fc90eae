// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! secp256k1 key handling for ledger signing.
//!
//! Signing keys are stored in PKCS#8 PEM format. This module generates new
//! keys, derives their Ethereum addresses, and turns stored PEM back into an
//! alloy signer.

use alloy::{primitives::Address, signers::local::PrivateKeySigner};
use k256::SecretKey;

use super::WalletError;

/// Generate a secp256k1 keypair and derive its Ethereum address.
///
/// Ethereum addresses are derived by:
/// 1. Generate secp256k1 private key
/// 2. Get uncompressed public key (65 bytes: 0x04 || x || y)
/// 3. Take keccak256 hash of the public key without the 0x04 prefix
/// 4. Take the last 20 bytes of the hash
///
/// # Returns
/// A tuple of (private_key_pem, address) where `private_key_pem` is the
/// PKCS#8 PEM-encoded private key for encrypted storage.
pub fn generate_secp256k1_keypair() -> Result<(String, Address), WalletError> {
    use alloy::primitives::keccak256;
    use k256::ecdsa::SigningKey;
    use k256::elliptic_curve::rand_core::OsRng;
    use k256::pkcs8::EncodePrivateKey;

    let signing_key = SigningKey::random(&mut OsRng);
    let verifying_key = signing_key.verifying_key();

    let private_key_pem = signing_key
        .to_pkcs8_pem(k256::pkcs8::LineEnding::LF)
        .map_err(|e| WalletError::InvalidPrivateKey(format!("Failed to encode private key: {e}")))?;

    let public_key_uncompressed = verifying_key.to_encoded_point(false);
    let public_key_bytes = public_key_uncompressed.as_bytes();

    let hash = keccak256(&public_key_bytes[1..]);
    let address = Address::from_slice(&hash[12..]);

    Ok((private_key_pem.to_string(), address))
}

/// Parse a private key from PEM format to hex string (64 characters, no 0x prefix).
pub fn pem_to_hex(pem_bytes: &[u8]) -> Result<String, WalletError> {
    let pem_str = std::str::from_utf8(pem_bytes)
        .map_err(|e| WalletError::InvalidPrivateKey(format!("Invalid UTF-8: {e}")))?;

    let pem = pem::parse(pem_str)
        .map_err(|e| WalletError::InvalidPrivateKey(format!("Invalid PEM: {e}")))?;

    let secret_key = SecretKey::from_sec1_der(pem.contents())
        .or_else(|_| parse_pkcs8_to_secret_key(pem.contents()))
        .map_err(|e| WalletError::InvalidPrivateKey(format!("Invalid key format: {e}")))?;

    Ok(alloy::hex::encode(secret_key.to_bytes()))
}

fn parse_pkcs8_to_secret_key(der: &[u8]) -> Result<SecretKey, String> {
    use k256::pkcs8::DecodePrivateKey;
    SecretKey::from_pkcs8_der(der).map_err(|e| e.to_string())
}

/// Create a signer from PEM-encoded private key.
pub fn signer_from_pem(pem_bytes: &[u8]) -> Result<PrivateKeySigner, WalletError> {
    let hex_key = pem_to_hex(pem_bytes)?;
    let key_bytes = alloy::hex::decode(&hex_key)
        .map_err(|e| WalletError::InvalidPrivateKey(e.to_string()))?;

    PrivateKeySigner::from_slice(&key_bytes)
        .map_err(|e| WalletError::InvalidPrivateKey(e.to_string()))
}
