// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Failures surfaced by the consent workflow.
//!
//! Nothing here is retried automatically. Every failure leaves requests in
//! their prior status, so callers may simply re-invoke the operation.

use alloy::primitives::{Address, B256};

use super::profile::ProfileError;
use crate::content::{ContentError, ContentId};
use crate::ledger::{LedgerError, RequestStatus};
use crate::wallet::WalletError;

#[derive(Debug, thiserror::Error)]
pub enum ExchangeError {
    #[error("Profile hash {hash} is already registered")]
    AlreadyRegistered { hash: B256 },

    #[error("Registration failed: {0}")]
    RegistrationFailed(String),

    #[error("Ledger unavailable: {0}")]
    LedgerUnavailable(String),

    #[error("Content not found: {0}")]
    ContentNotFound(ContentId),

    #[error("Content store unavailable: {0}")]
    ContentStoreUnavailable(String),

    #[error("Decryption denied: {0}")]
    DecryptionDenied(String),

    #[error("Stored payload is corrupt: {0}")]
    CorruptPayload(String),

    #[error("Requester {0} is not registered")]
    RequesterNotRegistered(Address),

    #[error("Subject {0} is not registered")]
    SubjectNotRegistered(Address),

    #[error("Request {0} not found")]
    RequestNotFound(u64),

    #[error("Request {id} is {status}, not Pending")]
    InvalidState { id: u64, status: RequestStatus },

    #[error("Account {caller} is not the subject of request {id}")]
    NotAuthorized { id: u64, caller: Address },

    #[error("Transaction reverted: {0}")]
    TransactionReverted(String),

    #[error("Encryption key unavailable: {0}")]
    KeyUnavailable(String),

    #[error("Encryption failed: {0}")]
    EncryptionFailed(String),

    #[error("No payload delivered from {subject} to {requester}")]
    NoDelivery { subject: Address, requester: Address },

    #[error(transparent)]
    InvalidProfile(#[from] ProfileError),
}

impl ExchangeError {
    /// Stable machine-readable code for API responses.
    pub fn error_code(&self) -> &'static str {
        match self {
            ExchangeError::AlreadyRegistered { .. } => "ALREADY_REGISTERED",
            ExchangeError::RegistrationFailed(_) => "REGISTRATION_FAILED",
            ExchangeError::LedgerUnavailable(_) => "LEDGER_UNAVAILABLE",
            ExchangeError::ContentNotFound(_) => "CONTENT_NOT_FOUND",
            ExchangeError::ContentStoreUnavailable(_) => "CONTENT_STORE_UNAVAILABLE",
            ExchangeError::DecryptionDenied(_) => "DECRYPTION_DENIED",
            ExchangeError::CorruptPayload(_) => "CORRUPT_PAYLOAD",
            ExchangeError::RequesterNotRegistered(_) => "REQUESTER_NOT_REGISTERED",
            ExchangeError::SubjectNotRegistered(_) => "SUBJECT_NOT_REGISTERED",
            ExchangeError::RequestNotFound(_) => "REQUEST_NOT_FOUND",
            ExchangeError::InvalidState { .. } => "INVALID_STATE",
            ExchangeError::NotAuthorized { .. } => "NOT_AUTHORIZED",
            ExchangeError::TransactionReverted(_) => "TRANSACTION_REVERTED",
            ExchangeError::KeyUnavailable(_) => "KEY_UNAVAILABLE",
            ExchangeError::EncryptionFailed(_) => "ENCRYPTION_FAILED",
            ExchangeError::NoDelivery { .. } => "NO_DELIVERY",
            ExchangeError::InvalidProfile(e) => e.error_code(),
        }
    }

    /// Ledger read failure.
    pub(crate) fn from_ledger_read(error: LedgerError) -> Self {
        match error {
            LedgerError::Reverted { reason, .. } => ExchangeError::TransactionReverted(reason),
            other => ExchangeError::LedgerUnavailable(other.to_string()),
        }
    }

    /// Ledger write failure outside registration.
    pub(crate) fn from_ledger_write(error: LedgerError) -> Self {
        match error {
            LedgerError::Reverted { reason, tx_hash } => match tx_hash {
                Some(hash) => ExchangeError::TransactionReverted(format!("{reason} (tx {hash})")),
                None => ExchangeError::TransactionReverted(reason),
            },
            other => ExchangeError::LedgerUnavailable(other.to_string()),
        }
    }

    pub(crate) fn from_content(error: ContentError) -> Self {
        match error {
            ContentError::NotFound(id) => ExchangeError::ContentNotFound(id),
            other => ExchangeError::ContentStoreUnavailable(other.to_string()),
        }
    }

    /// Wallet failure while decrypting. Every refusal is a denial.
    pub(crate) fn from_decrypt(error: WalletError) -> Self {
        match error {
            WalletError::Envelope(e) => ExchangeError::CorruptPayload(e.to_string()),
            other => ExchangeError::DecryptionDenied(other.to_string()),
        }
    }
}

pub type ExchangeResult<T> = Result<T, ExchangeError>;
