// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Ledger record types shared by every backend.

use std::fmt;

use alloy::primitives::{Address, B256};
use serde::{Deserialize, Serialize};

use crate::content::ContentId;
use crate::wallet::EncryptionPublicKey;

/// A subject's registration on the identity ledger.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IdentityRecord {
    pub user_id: u64,
    pub subject: Address,
    /// Self-encrypted full profile.
    pub content_id: ContentId,
    /// keccak256 of the canonical plaintext profile.
    pub data_hash: B256,
    pub public_key: EncryptionPublicKey,
}

/// Lifecycle of a data request.
///
/// `Pending` moves to exactly one of `Approved` or `Rejected`. Both are terminal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum RequestStatus {
    Pending,
    Approved,
    Rejected,
}

impl RequestStatus {
    pub fn can_transition_to(self, next: RequestStatus) -> bool {
        matches!(
            (self, next),
            (RequestStatus::Pending, RequestStatus::Approved)
                | (RequestStatus::Pending, RequestStatus::Rejected)
        )
    }

    pub fn is_terminal(self) -> bool {
        !matches!(self, RequestStatus::Pending)
    }

    pub fn as_str(self) -> &'static str {
        match self {
            RequestStatus::Pending => "Pending",
            RequestStatus::Approved => "Approved",
            RequestStatus::Rejected => "Rejected",
        }
    }
}

impl fmt::Display for RequestStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// On-chain encoding of the status enum.
impl TryFrom<u8> for RequestStatus {
    type Error = u8;

    fn try_from(value: u8) -> Result<Self, Self::Error> {
        match value {
            0 => Ok(RequestStatus::Pending),
            1 => Ok(RequestStatus::Approved),
            2 => Ok(RequestStatus::Rejected),
            other => Err(other),
        }
    }
}

impl From<RequestStatus> for u8 {
    fn from(status: RequestStatus) -> Self {
        match status {
            RequestStatus::Pending => 0,
            RequestStatus::Approved => 1,
            RequestStatus::Rejected => 2,
        }
    }
}

/// A requester's ask for specific fields of a subject's profile.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DataRequest {
    pub id: u64,
    pub requester: Address,
    pub subject: Address,
    /// Requested field names, in the order the requester listed them.
    pub fields: Vec<String>,
    pub status: RequestStatus,
}

/// A finalized ledger write.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TxReceipt {
    pub tx_hash: B256,
    pub block_number: Option<u64>,
}

/// `did:ethr` identifier for an account on the named network.
pub fn did_for(network: &str, address: Address) -> String {
    format!("did:ethr:{network}:{address}")
}
