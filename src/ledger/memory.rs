// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! In-process ledgers.
//!
//! Writes are final as soon as they return and revert with the same reasons
//! the deployed contracts use. Both ledgers accept injected faults so callers
//! can exercise failure paths.

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};

use alloy::primitives::{keccak256, Address, B256};
use async_trait::async_trait;
use tokio::sync::{Mutex, RwLock};

use super::{
    DataRequest, IdentityLedger, IdentityRecord, LedgerError, LedgerResult, RequestLedger,
    RequestStatus, TxReceipt,
};
use crate::content::ContentId;
use crate::wallet::{EncryptionPublicKey, Session};

/// Fault switches and a block counter shared by both ledgers.
#[derive(Debug, Default)]
struct Chain {
    block: AtomicU64,
    unavailable: AtomicBool,
    revert_next: Mutex<Option<String>>,
}

impl Chain {
    fn ensure_available(&self) -> LedgerResult<()> {
        if self.unavailable.load(Ordering::SeqCst) {
            Err(LedgerError::Unavailable("in-memory ledger offline".to_string()))
        } else {
            Ok(())
        }
    }

    /// Gate for every write: availability, then any queued revert.
    async fn begin_write(&self) -> LedgerResult<()> {
        self.ensure_available()?;
        if let Some(reason) = self.revert_next.lock().await.take() {
            return Err(LedgerError::Reverted {
                reason,
                tx_hash: Some(self.next_receipt().tx_hash),
            });
        }
        Ok(())
    }

    fn next_receipt(&self) -> TxReceipt {
        let block = self.block.fetch_add(1, Ordering::SeqCst) + 1;
        TxReceipt {
            tx_hash: keccak256(block.to_be_bytes()),
            block_number: Some(block),
        }
    }

    fn revert(reason: &str) -> LedgerError {
        LedgerError::Reverted {
            reason: reason.to_string(),
            tx_hash: None,
        }
    }
}

#[derive(Debug, Default)]
struct IdentityState {
    users: HashMap<Address, IdentityRecord>,
    hash_owners: HashMap<B256, Address>,
    deliveries: HashMap<(Address, Address), ContentId>,
    next_user_id: u64,
}

/// Identity ledger held in memory.
#[derive(Debug, Default)]
pub struct InMemoryIdentityLedger {
    state: RwLock<IdentityState>,
    chain: Chain,
}

impl InMemoryIdentityLedger {
    pub fn new() -> Self {
        Self::default()
    }

    /// Make the next write revert with `reason`.
    pub async fn revert_next_write(&self, reason: impl Into<String>) {
        *self.chain.revert_next.lock().await = Some(reason.into());
    }

    /// Toggle simulated loss of connectivity for reads and writes.
    pub fn set_unavailable(&self, unavailable: bool) {
        self.chain.unavailable.store(unavailable, Ordering::SeqCst);
    }

    pub async fn delivery_count(&self) -> usize {
        self.state.read().await.deliveries.len()
    }
}

#[async_trait]
impl IdentityLedger for InMemoryIdentityLedger {
    async fn check_hash_owner(&self, data_hash: B256) -> LedgerResult<Address> {
        self.chain.ensure_available()?;
        Ok(self
            .state
            .read()
            .await
            .hash_owners
            .get(&data_hash)
            .copied()
            .unwrap_or(Address::ZERO))
    }

    async fn register_user(
        &self,
        session: &Session,
        data_hash: B256,
        content_id: &ContentId,
        public_key: &EncryptionPublicKey,
    ) -> LedgerResult<TxReceipt> {
        self.chain.begin_write().await?;
        let subject = session.address();

        let mut state = self.state.write().await;
        if state.hash_owners.contains_key(&data_hash) {
            return Err(Chain::revert("Hash already registered"));
        }

        let existing = state.users.get(&subject).map(|r| (r.user_id, r.data_hash));
        let user_id = match existing {
            Some((user_id, previous_hash)) => {
                state.hash_owners.remove(&previous_hash);
                user_id
            }
            None => {
                state.next_user_id += 1;
                state.next_user_id
            }
        };

        state.hash_owners.insert(data_hash, subject);
        state.users.insert(
            subject,
            IdentityRecord {
                user_id,
                subject,
                content_id: content_id.clone(),
                data_hash,
                public_key: public_key.clone(),
            },
        );

        Ok(self.chain.next_receipt())
    }

    async fn get_user(&self, subject: Address) -> LedgerResult<Option<IdentityRecord>> {
        self.chain.ensure_available()?;
        Ok(self.state.read().await.users.get(&subject).cloned())
    }

    async fn set_requester_ipfs_hash(
        &self,
        session: &Session,
        requester: Address,
        content_id: &ContentId,
    ) -> LedgerResult<TxReceipt> {
        self.chain.begin_write().await?;
        let subject = session.address();

        let mut state = self.state.write().await;
        if !state.users.contains_key(&subject) {
            return Err(Chain::revert("User not registered"));
        }
        state
            .deliveries
            .insert((subject, requester), content_id.clone());

        Ok(self.chain.next_receipt())
    }

    async fn requester_ipfs_hash(
        &self,
        subject: Address,
        requester: Address,
    ) -> LedgerResult<Option<ContentId>> {
        self.chain.ensure_available()?;
        Ok(self
            .state
            .read()
            .await
            .deliveries
            .get(&(subject, requester))
            .cloned())
    }

    async fn health_check(&self) -> LedgerResult<()> {
        self.chain.ensure_available()
    }
}

/// Request ledger held in memory.
#[derive(Debug, Default)]
pub struct InMemoryRequestLedger {
    requests: RwLock<Vec<DataRequest>>,
    chain: Chain,
}

impl InMemoryRequestLedger {
    pub fn new() -> Self {
        Self::default()
    }

    /// Make the next write revert with `reason`.
    pub async fn revert_next_write(&self, reason: impl Into<String>) {
        *self.chain.revert_next.lock().await = Some(reason.into());
    }

    /// Toggle simulated loss of connectivity for reads and writes.
    pub fn set_unavailable(&self, unavailable: bool) {
        self.chain.unavailable.store(unavailable, Ordering::SeqCst);
    }

    async fn transition(
        &self,
        session: &Session,
        id: u64,
        next: RequestStatus,
    ) -> LedgerResult<TxReceipt> {
        self.chain.begin_write().await?;

        let mut requests = self.requests.write().await;
        let request = requests
            .iter_mut()
            .find(|r| r.id == id)
            .ok_or_else(|| Chain::revert("Request does not exist"))?;

        if request.subject != session.address() {
            return Err(Chain::revert("Not authorized"));
        }
        if !request.status.can_transition_to(next) {
            return Err(Chain::revert("Request not pending"));
        }

        request.status = next;
        Ok(self.chain.next_receipt())
    }
}

#[async_trait]
impl RequestLedger for InMemoryRequestLedger {
    async fn create_request(
        &self,
        session: &Session,
        subject: Address,
        fields: &[String],
    ) -> LedgerResult<DataRequest> {
        self.chain.begin_write().await?;
        if fields.is_empty() {
            return Err(Chain::revert("No fields requested"));
        }
        if subject == Address::ZERO {
            return Err(Chain::revert("Invalid subject"));
        }

        let mut requests = self.requests.write().await;
        let request = DataRequest {
            id: requests.len() as u64 + 1,
            requester: session.address(),
            subject,
            fields: fields.to_vec(),
            status: RequestStatus::Pending,
        };
        requests.push(request.clone());
        self.chain.next_receipt();

        Ok(request)
    }

    async fn get_request(&self, id: u64) -> LedgerResult<Option<DataRequest>> {
        self.chain.ensure_available()?;
        Ok(self
            .requests
            .read()
            .await
            .iter()
            .find(|r| r.id == id)
            .cloned())
    }

    async fn requests_for_subject(&self, subject: Address) -> LedgerResult<Vec<DataRequest>> {
        self.chain.ensure_available()?;
        Ok(self
            .requests
            .read()
            .await
            .iter()
            .filter(|r| r.subject == subject)
            .cloned()
            .collect())
    }

    async fn approve_request(&self, session: &Session, id: u64) -> LedgerResult<TxReceipt> {
        self.transition(session, id, RequestStatus::Approved).await
    }

    async fn reject_request(&self, session: &Session, id: u64) -> LedgerResult<TxReceipt> {
        self.transition(session, id, RequestStatus::Rejected).await
    }

    async fn health_check(&self) -> LedgerResult<()> {
        self.chain.ensure_available()
    }
}
