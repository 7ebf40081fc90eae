// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

use std::sync::Arc;

use crate::auth::AuthConfig;
use crate::blockchain::NetworkConfig;
use crate::content::ContentStore;
use crate::exchange::ConsentExchange;
use crate::ledger::{IdentityLedger, RequestLedger};
use crate::storage::SecureStorage;
use crate::wallet::LocalKeyring;

#[derive(Clone)]
pub struct AppState {
    pub exchange: ConsentExchange,
    pub keyring: LocalKeyring,
    pub content: Arc<dyn ContentStore>,
    pub storage: Arc<SecureStorage>,
    pub network: NetworkConfig,
    pub auth: AuthConfig,
}

impl AppState {
    /// Wire the keyring and backends into a consent exchange.
    pub fn new(
        storage: Arc<SecureStorage>,
        content: Arc<dyn ContentStore>,
        identity: Arc<dyn IdentityLedger>,
        requests: Arc<dyn RequestLedger>,
        network: NetworkConfig,
        auth: AuthConfig,
    ) -> Self {
        let keyring = LocalKeyring::new(storage.clone());
        let exchange = ConsentExchange::new(
            Arc::new(keyring.clone()),
            content.clone(),
            identity,
            requests,
        );
        Self {
            exchange,
            keyring,
            content,
            storage,
            network,
            auth,
        }
    }
}
