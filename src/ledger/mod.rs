// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Identity and request ledgers.
//!
//! Both ledgers are external, append-mostly state with eventual finality.
//! Writes take a [`Session`] (the account that signs) and only return once
//! the write is final. Reads reflect finalized state only.
//!
//! - `types` - records and the request status lifecycle
//! - `memory` - in-process ledgers for tests and local runs
//!
//! The EVM contract bindings live in `crate::blockchain`.

pub mod memory;
pub mod types;

use alloy::primitives::{Address, B256};
use async_trait::async_trait;

use crate::content::ContentId;
use crate::wallet::{EncryptionPublicKey, Session};

pub use memory::{InMemoryIdentityLedger, InMemoryRequestLedger};
pub use types::{did_for, DataRequest, IdentityRecord, RequestStatus, TxReceipt};

/// Errors raised by ledger backends.
#[derive(Debug, Clone, thiserror::Error)]
pub enum LedgerError {
    #[error("Ledger unavailable: {0}")]
    Unavailable(String),

    #[error("Transaction reverted: {reason}")]
    Reverted {
        reason: String,
        tx_hash: Option<B256>,
    },

    #[error("Invalid ledger response: {0}")]
    InvalidResponse(String),
}

pub type LedgerResult<T> = Result<T, LedgerError>;

/// Registry of subjects, their encrypted profiles and delivery slots.
#[async_trait]
pub trait IdentityLedger: Send + Sync {
    /// Owner of a profile hash, or the zero address when unclaimed.
    async fn check_hash_owner(&self, data_hash: B256) -> LedgerResult<Address>;

    /// Register (or re-register) the session account.
    ///
    /// Reverts when `data_hash` is already claimed, including by the caller.
    /// Re-registering with a new hash replaces the record and releases the
    /// previous hash, which another account may then claim.
    async fn register_user(
        &self,
        session: &Session,
        data_hash: B256,
        content_id: &ContentId,
        public_key: &EncryptionPublicKey,
    ) -> LedgerResult<TxReceipt>;

    /// `None` when the address never registered.
    async fn get_user(&self, subject: Address) -> LedgerResult<Option<IdentityRecord>>;

    /// Point the (session subject, requester) delivery slot at a payload.
    async fn set_requester_ipfs_hash(
        &self,
        session: &Session,
        requester: Address,
        content_id: &ContentId,
    ) -> LedgerResult<TxReceipt>;

    /// Latest payload delivered from `subject` to `requester`.
    async fn requester_ipfs_hash(
        &self,
        subject: Address,
        requester: Address,
    ) -> LedgerResult<Option<ContentId>>;

    async fn health_check(&self) -> LedgerResult<()> {
        Ok(())
    }
}

/// Data access requests and their status transitions.
#[async_trait]
pub trait RequestLedger: Send + Sync {
    /// File a request as the session account. The ledger assigns the id.
    async fn create_request(
        &self,
        session: &Session,
        subject: Address,
        fields: &[String],
    ) -> LedgerResult<DataRequest>;

    async fn get_request(&self, id: u64) -> LedgerResult<Option<DataRequest>>;

    /// Every request addressed to `subject`, oldest first.
    async fn requests_for_subject(&self, subject: Address) -> LedgerResult<Vec<DataRequest>>;

    /// Only the subject may approve, and only while Pending.
    async fn approve_request(&self, session: &Session, id: u64) -> LedgerResult<TxReceipt>;

    /// Only the subject may reject, and only while Pending.
    async fn reject_request(&self, session: &Session, id: u64) -> LedgerResult<TxReceipt>;

    async fn health_check(&self) -> LedgerResult<()> {
        Ok(())
    }
}
