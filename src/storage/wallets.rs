// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Wallet repository.
//!
//! Each custodial wallet holds two secrets: the secp256k1 key that signs
//! ledger writes and the X25519 secret that opens envelopes addressed to the
//! wallet. Neither is ever returned via the API.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use super::{SecureStorage, StorageError, StorageResult};

/// Wallet status.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "lowercase")]
pub enum WalletStatus {
    /// Signs and decrypts on request
    #[default]
    Active,
    /// Refuses every signing and decryption request
    Locked,
}

/// Wallet metadata stored in meta.json.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct WalletMetadata {
    /// Checksummed account address
    pub address: String,
    /// User who created the wallet; the only caller allowed to use it
    pub owner_user_id: String,
    /// X25519 public encryption key, base64
    pub encryption_public_key: String,
    pub created_at: DateTime<Utc>,
    pub status: WalletStatus,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub label: Option<String>,
}

/// Repository for wallet records on the key store.
pub struct WalletRepository<'a> {
    storage: &'a SecureStorage,
}

impl<'a> WalletRepository<'a> {
    pub fn new(storage: &'a SecureStorage) -> Self {
        Self { storage }
    }

    pub fn exists(&self, address: &str) -> bool {
        self.storage.exists(self.storage.paths().wallet_meta(address))
    }

    pub fn get(&self, address: &str) -> StorageResult<WalletMetadata> {
        let path = self.storage.paths().wallet_meta(address);
        if !self.storage.exists(&path) {
            return Err(StorageError::NotFound(format!("Wallet {address}")));
        }
        self.storage.read_json(path)
    }

    /// Store a new wallet with both of its secrets.
    ///
    /// Key files are written before metadata, so a wallet is only visible
    /// through `exists` once it is complete.
    pub fn create(
        &self,
        metadata: &WalletMetadata,
        signing_key_pem: &[u8],
        encryption_secret: &[u8; 32],
    ) -> StorageResult<()> {
        let address = metadata.address.as_str();
        if self.exists(address) {
            return Err(StorageError::AlreadyExists(format!("Wallet {address}")));
        }

        let paths = self.storage.paths();
        self.storage.create_dir(paths.wallet_dir(address))?;
        self.storage
            .write_raw(paths.wallet_signing_key(address), signing_key_pem)?;
        self.storage
            .write_raw(paths.wallet_encryption_key(address), encryption_secret)?;
        self.storage.write_json(paths.wallet_meta(address), metadata)
    }

    /// Update metadata only. Key files are immutable.
    pub fn update(&self, metadata: &WalletMetadata) -> StorageResult<()> {
        let address = metadata.address.as_str();
        if !self.exists(address) {
            return Err(StorageError::NotFound(format!("Wallet {address}")));
        }
        self.storage
            .write_json(self.storage.paths().wallet_meta(address), metadata)
    }

    pub fn signing_key_pem(&self, address: &str) -> StorageResult<Vec<u8>> {
        self.storage
            .read_raw(self.storage.paths().wallet_signing_key(address))
    }

    pub fn encryption_secret(&self, address: &str) -> StorageResult<[u8; 32]> {
        let bytes = self
            .storage
            .read_raw(self.storage.paths().wallet_encryption_key(address))?;
        bytes.try_into().map_err(|bytes: Vec<u8>| {
            StorageError::IntegrityViolation(format!(
                "Encryption key for {address} is {} bytes, expected 32",
                bytes.len()
            ))
        })
    }

    /// Wallets owned by `user_id`, ordered by directory name.
    pub fn list_for_owner(&self, user_id: &str) -> StorageResult<Vec<WalletMetadata>> {
        Ok(self
            .list_all()?
            .into_iter()
            .filter(|wallet| wallet.owner_user_id == user_id)
            .collect())
    }

    /// All wallets, ordered by directory name.
    pub fn list_all(&self) -> StorageResult<Vec<WalletMetadata>> {
        let mut wallets = Vec::new();
        for dir in self.storage.list_dirs(self.storage.paths().wallets_dir())? {
            match self.get(&dir) {
                Ok(meta) => wallets.push(meta),
                Err(StorageError::NotFound(_)) => continue,
                Err(e) => return Err(e),
            }
        }
        Ok(wallets)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::StoragePaths;
    use tempfile::TempDir;

    fn setup() -> (TempDir, SecureStorage) {
        let temp = TempDir::new().unwrap();
        let mut storage = SecureStorage::new(StoragePaths::new(temp.path()));
        storage.initialize().unwrap();
        (temp, storage)
    }

    fn metadata(address: &str) -> WalletMetadata {
        WalletMetadata {
            address: address.to_string(),
            owner_user_id: "user_alice".to_string(),
            encryption_public_key: "AAAA".to_string(),
            created_at: Utc::now(),
            status: WalletStatus::Active,
            label: Some("test".to_string()),
        }
    }

    const ADDRESS: &str = "0x00000000000000000000000000000000000000Aa";

    #[test]
    fn create_and_read_back() {
        let (_temp, storage) = setup();
        let repo = WalletRepository::new(&storage);

        repo.create(&metadata(ADDRESS), b"pem", &[7u8; 32]).unwrap();

        assert!(repo.exists(ADDRESS));
        assert!(repo.exists(&ADDRESS.to_ascii_lowercase()));
        assert_eq!(repo.get(ADDRESS).unwrap().label.as_deref(), Some("test"));
        assert_eq!(repo.signing_key_pem(ADDRESS).unwrap(), b"pem");
        assert_eq!(repo.encryption_secret(ADDRESS).unwrap(), [7u8; 32]);
    }

    #[test]
    fn create_twice_fails() {
        let (_temp, storage) = setup();
        let repo = WalletRepository::new(&storage);

        repo.create(&metadata(ADDRESS), b"pem", &[1u8; 32]).unwrap();
        let err = repo
            .create(&metadata(ADDRESS), b"pem", &[2u8; 32])
            .unwrap_err();
        assert!(matches!(err, StorageError::AlreadyExists(_)));
        assert_eq!(repo.encryption_secret(ADDRESS).unwrap(), [1u8; 32]);
    }

    #[test]
    fn update_changes_status() {
        let (_temp, storage) = setup();
        let repo = WalletRepository::new(&storage);
        repo.create(&metadata(ADDRESS), b"pem", &[1u8; 32]).unwrap();

        let mut meta = repo.get(ADDRESS).unwrap();
        meta.status = WalletStatus::Locked;
        repo.update(&meta).unwrap();

        assert_eq!(repo.get(ADDRESS).unwrap().status, WalletStatus::Locked);
    }

    #[test]
    fn get_missing_is_not_found() {
        let (_temp, storage) = setup();
        let repo = WalletRepository::new(&storage);
        assert!(matches!(repo.get(ADDRESS), Err(StorageError::NotFound(_))));
        assert!(matches!(
            repo.update(&metadata(ADDRESS)),
            Err(StorageError::NotFound(_))
        ));
    }

    #[test]
    fn truncated_encryption_key_is_integrity_violation() {
        let (_temp, storage) = setup();
        let repo = WalletRepository::new(&storage);
        repo.create(&metadata(ADDRESS), b"pem", &[1u8; 32]).unwrap();
        storage
            .write_raw(storage.paths().wallet_encryption_key(ADDRESS), &[1u8; 5])
            .unwrap();

        assert!(matches!(
            repo.encryption_secret(ADDRESS),
            Err(StorageError::IntegrityViolation(_))
        ));
    }

    #[test]
    fn list_all_returns_every_wallet() {
        let (_temp, storage) = setup();
        let repo = WalletRepository::new(&storage);
        repo.create(&metadata(ADDRESS), b"pem", &[1u8; 32]).unwrap();
        repo.create(
            &metadata("0x00000000000000000000000000000000000000Bb"),
            b"pem",
            &[2u8; 32],
        )
        .unwrap();

        assert_eq!(repo.list_all().unwrap().len(), 2);
    }

    #[test]
    fn list_for_owner_filters_other_users() {
        let (_temp, storage) = setup();
        let repo = WalletRepository::new(&storage);
        repo.create(&metadata(ADDRESS), b"pem", &[1u8; 32]).unwrap();
        let mut bobs = metadata("0x00000000000000000000000000000000000000Bb");
        bobs.owner_user_id = "user_bob".to_string();
        repo.create(&bobs, b"pem", &[2u8; 32]).unwrap();

        let alices = repo.list_for_owner("user_alice").unwrap();
        assert_eq!(alices.len(), 1);
        assert_eq!(alices[0].address, ADDRESS);
        assert!(repo.list_for_owner("user_carol").unwrap().is_empty());
    }
}
