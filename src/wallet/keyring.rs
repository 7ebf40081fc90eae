// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Custodial keyring.
//!
//! Holds, per account, a secp256k1 signing key and an X25519 decryption
//! secret on the key store. A locked wallet refuses both signing sessions
//! and decryption, which is how a user (or operator) withholds consent at
//! the wallet level.

use std::sync::Arc;

use alloy::primitives::Address;
use async_trait::async_trait;
use chrono::Utc;
use rand::rngs::OsRng;
use tracing::{info, warn};
use x25519_dalek::{PublicKey, StaticSecret};

use super::{
    signing, EncryptedEnvelope, EncryptionPublicKey, Session, WalletError, WalletKeyProvider,
    WalletResult,
};
use crate::auth::AuthenticatedUser;
use crate::storage::{
    audit, AuditEvent, AuditEventType, OwnershipEnforcer, SecureStorage, StorageError,
    WalletMetadata, WalletRepository, WalletStatus,
};

/// Wallet key provider backed by the local key store.
#[derive(Clone)]
pub struct LocalKeyring {
    storage: Arc<SecureStorage>,
}

impl LocalKeyring {
    pub fn new(storage: Arc<SecureStorage>) -> Self {
        Self { storage }
    }

    /// Generate a new wallet owned by `owner_user_id`, with fresh signing
    /// and encryption keys.
    pub fn create_wallet(
        &self,
        owner_user_id: &str,
        label: Option<String>,
    ) -> WalletResult<WalletMetadata> {
        let (signing_pem, address) = signing::generate_secp256k1_keypair()?;

        let secret = StaticSecret::random_from_rng(OsRng);
        let public = PublicKey::from(&secret);

        let metadata = WalletMetadata {
            address: address.to_checksum(None),
            owner_user_id: owner_user_id.to_string(),
            encryption_public_key: EncryptionPublicKey::from_bytes(public.to_bytes()).to_base64(),
            created_at: Utc::now(),
            status: WalletStatus::Active,
            label,
        };

        self.repo()
            .create(&metadata, signing_pem.as_bytes(), &secret.to_bytes())
            .map_err(|e| storage_error(address, e))?;

        audit::record(
            &self.storage,
            AuditEvent::new(AuditEventType::WalletCreated)
                .with_actor(owner_user_id)
                .with_resource("wallet", address),
        );
        info!(%address, owner = owner_user_id, "Created custodial wallet");

        Ok(metadata)
    }

    pub fn wallet(&self, address: Address) -> WalletResult<WalletMetadata> {
        self.repo()
            .get(&address.to_string())
            .map_err(|e| storage_error(address, e))
    }

    /// Metadata for `address`, provided `user` owns it.
    pub fn owned_wallet(
        &self,
        address: Address,
        user: &AuthenticatedUser,
    ) -> WalletResult<WalletMetadata> {
        let metadata = self.wallet(address)?;
        metadata.verify_ownership(user).map_err(|e| {
            warn!(%address, user_id = %user.user_id, "Refused wallet access by non-owner");
            storage_error(address, e)
        })?;
        Ok(metadata)
    }

    pub fn wallets_owned_by(&self, user_id: &str) -> WalletResult<Vec<WalletMetadata>> {
        self.repo()
            .list_for_owner(user_id)
            .map_err(|e| WalletError::Storage(e.to_string()))
    }

    pub fn set_status(&self, address: Address, status: WalletStatus) -> WalletResult<WalletMetadata> {
        let repo = self.repo();
        let mut metadata = repo
            .get(&address.to_string())
            .map_err(|e| storage_error(address, e))?;

        if metadata.status != status {
            metadata.status = status;
            repo.update(&metadata)
                .map_err(|e| storage_error(address, e))?;

            let event_type = match status {
                WalletStatus::Active => AuditEventType::WalletUnlocked,
                WalletStatus::Locked => AuditEventType::WalletLocked,
            };
            audit::record(
                &self.storage,
                AuditEvent::new(event_type)
                    .with_actor(address)
                    .with_resource("wallet", address),
            );
            info!(%address, ?status, "Wallet status changed");
        }

        Ok(metadata)
    }

    /// Open a signing session for an active wallet.
    pub fn session(&self, address: Address) -> WalletResult<Session> {
        self.require_active(address)?;

        let pem = self
            .repo()
            .signing_key_pem(&address.to_string())
            .map_err(|e| storage_error(address, e))?;
        let signer = signing::signer_from_pem(&pem)?;

        if signer.address() != address {
            return Err(WalletError::Storage(format!(
                "Signing key on disk does not belong to {address}"
            )));
        }

        Ok(Session::new(signer))
    }

    fn require_active(&self, address: Address) -> WalletResult<WalletMetadata> {
        let metadata = self.wallet(address)?;
        if metadata.status == WalletStatus::Locked {
            warn!(%address, "Refused request for locked wallet");
            return Err(WalletError::Rejected(format!("wallet {address} is locked")));
        }
        Ok(metadata)
    }

    fn repo(&self) -> WalletRepository<'_> {
        WalletRepository::new(&self.storage)
    }
}

fn storage_error(address: Address, error: StorageError) -> WalletError {
    match error {
        StorageError::NotFound(_) => WalletError::UnknownAccount(address),
        StorageError::PermissionDenied { .. } => WalletError::NotOwner(address),
        other => WalletError::Storage(other.to_string()),
    }
}

#[async_trait]
impl WalletKeyProvider for LocalKeyring {
    async fn public_key(&self, address: Address) -> WalletResult<EncryptionPublicKey> {
        let metadata = self.require_active(address)?;
        EncryptionPublicKey::parse(&metadata.encryption_public_key)
    }

    async fn decrypt(&self, envelope: &EncryptedEnvelope, address: Address) -> WalletResult<Vec<u8>> {
        self.require_active(address)?;

        let secret = self
            .repo()
            .encryption_secret(&address.to_string())
            .map_err(|e| storage_error(address, e))?;

        envelope
            .open(&StaticSecret::from(secret))
            .map_err(|_| WalletError::KeyMismatch(address))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::StoragePaths;
    use tempfile::TempDir;

    fn keyring() -> (TempDir, LocalKeyring) {
        let temp = TempDir::new().unwrap();
        let mut storage = SecureStorage::new(StoragePaths::new(temp.path()));
        storage.initialize().unwrap();
        (temp, LocalKeyring::new(Arc::new(storage)))
    }

    const OWNER: &str = "user_alice";

    fn address_of(meta: &WalletMetadata) -> Address {
        meta.address.parse().unwrap()
    }

    #[tokio::test]
    async fn created_wallet_decrypts_its_own_envelopes() {
        let (_temp, keyring) = keyring();
        let meta = keyring.create_wallet(OWNER, Some("alice".to_string())).unwrap();
        let address = address_of(&meta);

        let key = keyring.public_key(address).await.unwrap();
        let envelope = EncryptedEnvelope::seal(&key, b"{\"name\":\"Alice\"}").unwrap();

        let plaintext = keyring.decrypt(&envelope, address).await.unwrap();
        assert_eq!(plaintext, b"{\"name\":\"Alice\"}");
    }

    #[tokio::test]
    async fn envelope_for_other_wallet_is_key_mismatch() {
        let (_temp, keyring) = keyring();
        let alice = address_of(&keyring.create_wallet(OWNER, None).unwrap());
        let bob = address_of(&keyring.create_wallet(OWNER, None).unwrap());

        let bob_key = keyring.public_key(bob).await.unwrap();
        let envelope = EncryptedEnvelope::seal(&bob_key, b"secret").unwrap();

        let err = keyring.decrypt(&envelope, alice).await.unwrap_err();
        assert!(matches!(err, WalletError::KeyMismatch(a) if a == alice));
    }

    #[tokio::test]
    async fn locked_wallet_refuses_everything() {
        let (_temp, keyring) = keyring();
        let address = address_of(&keyring.create_wallet(OWNER, None).unwrap());
        let key = keyring.public_key(address).await.unwrap();
        let envelope = EncryptedEnvelope::seal(&key, b"secret").unwrap();

        keyring.set_status(address, WalletStatus::Locked).unwrap();

        assert!(matches!(
            keyring.decrypt(&envelope, address).await,
            Err(WalletError::Rejected(_))
        ));
        assert!(matches!(
            keyring.public_key(address).await,
            Err(WalletError::Rejected(_))
        ));
        assert!(matches!(keyring.session(address), Err(WalletError::Rejected(_))));

        keyring.set_status(address, WalletStatus::Active).unwrap();
        assert!(keyring.decrypt(&envelope, address).await.is_ok());
    }

    #[test]
    fn session_signs_as_wallet_address() {
        let (_temp, keyring) = keyring();
        let address = address_of(&keyring.create_wallet(OWNER, None).unwrap());

        let session = keyring.session(address).unwrap();
        assert_eq!(session.address(), address);
        assert_eq!(session.signer().address(), address);
    }

    #[tokio::test]
    async fn unknown_account_is_reported() {
        let (_temp, keyring) = keyring();
        let stranger = Address::repeat_byte(0x42);

        assert!(matches!(
            keyring.public_key(stranger).await,
            Err(WalletError::UnknownAccount(a)) if a == stranger
        ));
        assert!(matches!(
            keyring.session(stranger),
            Err(WalletError::UnknownAccount(_))
        ));
    }

    #[test]
    fn wallets_are_listed_per_owner() {
        let (_temp, keyring) = keyring();
        keyring.create_wallet(OWNER, None).unwrap();
        keyring.create_wallet(OWNER, None).unwrap();
        keyring.create_wallet("user_bob", None).unwrap();

        assert_eq!(keyring.wallets_owned_by(OWNER).unwrap().len(), 2);
        assert_eq!(keyring.wallets_owned_by("user_bob").unwrap().len(), 1);
    }

    #[test]
    fn owned_wallet_rejects_other_users() {
        let (_temp, keyring) = keyring();
        let address = address_of(&keyring.create_wallet(OWNER, None).unwrap());

        let owner = AuthenticatedUser::new(OWNER);
        assert_eq!(
            keyring.owned_wallet(address, &owner).unwrap().owner_user_id,
            OWNER
        );

        let mallory = AuthenticatedUser::new("user_mallory");
        assert!(matches!(
            keyring.owned_wallet(address, &mallory),
            Err(WalletError::NotOwner(a)) if a == address
        ));
    }
}
