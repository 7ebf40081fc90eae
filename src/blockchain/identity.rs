// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Identity ledger backed by the identity registry contract.

use alloy::primitives::{Address, B256};
use alloy::providers::DynProvider;
use async_trait::async_trait;
use tracing::{debug, info};

use super::client::{classify, revert_reason, ChainClient};
use super::contracts::{IIdentityRegistry, RegisteredUser};
use crate::content::ContentId;
use crate::ledger::{IdentityLedger, IdentityRecord, LedgerError, LedgerResult, TxReceipt};
use crate::wallet::{EncryptionPublicKey, Session};

type Registry = IIdentityRegistry::IIdentityRegistryInstance<DynProvider>;

/// Revert string the registry uses for unknown users.
const NOT_REGISTERED: &str = "User not registered";

pub struct EvmIdentityLedger {
    client: ChainClient,
    address: Address,
}

impl EvmIdentityLedger {
    pub fn new(client: ChainClient, address: Address) -> Self {
        Self { client, address }
    }

    fn reader(&self) -> Registry {
        IIdentityRegistry::new(self.address, self.client.provider().clone())
    }

    fn writer(&self, session: &Session) -> Registry {
        IIdentityRegistry::new(self.address, self.client.signing_provider(session))
    }
}

fn record_from(user: RegisteredUser) -> LedgerResult<IdentityRecord> {
    let public_key = EncryptionPublicKey::parse(&user.publicKey).map_err(|e| {
        LedgerError::InvalidResponse(format!(
            "public key for {} is not usable: {e}",
            user.userAddress
        ))
    })?;

    Ok(IdentityRecord {
        user_id: user.userId.saturating_to(),
        subject: user.userAddress,
        content_id: ContentId::new(user.ipfsHash),
        data_hash: user.dataHash,
        public_key,
    })
}

#[async_trait]
impl IdentityLedger for EvmIdentityLedger {
    async fn check_hash_owner(&self, data_hash: B256) -> LedgerResult<Address> {
        self.reader()
            .checkHashOwner(data_hash)
            .call()
            .await
            .map_err(|e| classify(e, "checkHashOwner"))
    }

    async fn register_user(
        &self,
        session: &Session,
        data_hash: B256,
        content_id: &ContentId,
        public_key: &EncryptionPublicKey,
    ) -> LedgerResult<TxReceipt> {
        debug!(subject = %session.address(), %data_hash, %content_id, "Sending registerUser");

        let pending = self
            .writer(session)
            .registerUser(
                data_hash,
                content_id.as_str().to_string(),
                public_key.to_base64(),
            )
            .send()
            .await
            .map_err(|e| classify(e, "registerUser"))?;

        let (receipt, _) = self.client.await_finality(pending, "registerUser").await?;
        info!(subject = %session.address(), tx_hash = %receipt.tx_hash, "Identity registered on chain");
        Ok(receipt)
    }

    async fn get_user(&self, subject: Address) -> LedgerResult<Option<IdentityRecord>> {
        match self.reader().getUser(subject).call().await {
            Ok(user) if user.userAddress == Address::ZERO => Ok(None),
            Ok(user) => record_from(user).map(Some),
            Err(e) => match revert_reason(&e) {
                Some(reason) if reason.contains(NOT_REGISTERED) => Ok(None),
                _ => Err(classify(e, "getUser")),
            },
        }
    }

    async fn set_requester_ipfs_hash(
        &self,
        session: &Session,
        requester: Address,
        content_id: &ContentId,
    ) -> LedgerResult<TxReceipt> {
        debug!(subject = %session.address(), %requester, %content_id, "Sending setRequesterIpfsHash");

        let pending = self
            .writer(session)
            .setRequesterIpfsHash(requester, content_id.as_str().to_string())
            .send()
            .await
            .map_err(|e| classify(e, "setRequesterIpfsHash"))?;

        let (receipt, _) = self
            .client
            .await_finality(pending, "setRequesterIpfsHash")
            .await?;
        Ok(receipt)
    }

    async fn requester_ipfs_hash(
        &self,
        subject: Address,
        requester: Address,
    ) -> LedgerResult<Option<ContentId>> {
        let raw = self
            .reader()
            .getRequesterIpfsHash(subject, requester)
            .call()
            .await
            .map_err(|e| classify(e, "getRequesterIpfsHash"))?;

        let content_id = ContentId::new(raw);
        Ok((!content_id.is_empty()).then_some(content_id))
    }

    async fn health_check(&self) -> LedgerResult<()> {
        self.client.block_number().await.map(|_| ())
    }
}
