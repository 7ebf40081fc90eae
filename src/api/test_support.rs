// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! In-memory application state for handler tests.

use std::collections::BTreeMap;
use std::sync::Arc;

use alloy::primitives::Address;
use jsonwebtoken::{encode, EncodingKey, Header};
use tempfile::TempDir;

use crate::auth::{AuthConfig, AuthenticatedUser, TokenVerifier};
use crate::blockchain::LOCAL_DEV;
use crate::content::InMemoryContentStore;
use crate::exchange::Profile;
use crate::ledger::{InMemoryIdentityLedger, InMemoryRequestLedger};
use crate::state::AppState;
use crate::storage::{SecureStorage, StoragePaths};
use crate::wallet::Session;

pub(crate) const TEST_JWT_SECRET: &[u8] = b"consent-exchange-test-secret-0123456789";

/// Owner of wallets created through [`TestApp::wallet`].
pub(crate) const TEST_USER: &str = "user_alice";

pub(crate) struct TestApp {
    _temp: TempDir,
    pub state: AppState,
    pub content: Arc<InMemoryContentStore>,
    pub identity: Arc<InMemoryIdentityLedger>,
    pub requests: Arc<InMemoryRequestLedger>,
}

impl TestApp {
    pub fn new() -> Self {
        let temp = TempDir::new().unwrap();
        let mut storage = SecureStorage::new(StoragePaths::new(temp.path()));
        storage.initialize().unwrap();

        let content = Arc::new(InMemoryContentStore::new());
        let identity = Arc::new(InMemoryIdentityLedger::new());
        let requests = Arc::new(InMemoryRequestLedger::new());
        let state = AppState::new(
            Arc::new(storage),
            content.clone(),
            identity.clone(),
            requests.clone(),
            LOCAL_DEV,
            AuthConfig::new(TokenVerifier::shared_secret(TEST_JWT_SECRET)),
        );

        Self {
            _temp: temp,
            state,
            content,
            identity,
            requests,
        }
    }

    /// Create a custodial wallet owned by [`TEST_USER`] and return its address.
    pub fn wallet(&self) -> Address {
        self.wallet_for(TEST_USER)
    }

    pub fn wallet_for(&self, owner: &str) -> Address {
        let meta = self.state.keyring.create_wallet(owner, None).unwrap();
        meta.address.parse().unwrap()
    }

    pub fn session(&self, address: Address) -> Session {
        self.state.keyring.session(address).unwrap()
    }

    /// Create a wallet and register `entries` as its profile.
    pub async fn registered(&self, entries: &[(&str, &str)]) -> Address {
        let address = self.wallet();
        self.state
            .exchange
            .register(&self.session(address), &profile(entries))
            .await
            .unwrap();
        address
    }
}

pub(crate) fn user(user_id: &str) -> AuthenticatedUser {
    AuthenticatedUser::new(user_id)
}

/// HS256 token for `user_id`, signed with [`TEST_JWT_SECRET`].
pub(crate) fn token_for(user_id: &str) -> String {
    encode(
        &Header::default(),
        &serde_json::json!({ "sub": user_id, "exp": 9_999_999_999i64, "sid": "sess_test" }),
        &EncodingKey::from_secret(TEST_JWT_SECRET),
    )
    .unwrap()
}

pub(crate) fn profile_map(entries: &[(&str, &str)]) -> BTreeMap<String, String> {
    entries
        .iter()
        .map(|(k, v)| (k.to_string(), v.to_string()))
        .collect()
}

pub(crate) fn profile(entries: &[(&str, &str)]) -> Profile {
    Profile::from_map(profile_map(entries)).unwrap()
}

/// Audit file date for events written now.
pub(crate) fn today() -> String {
    chrono::Utc::now().format("%Y-%m-%d").to_string()
}
