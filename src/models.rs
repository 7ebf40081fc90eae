// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! # API Data Models
//!
//! Request and response bodies for the REST API. All types derive
//! `Serialize`/`Deserialize` and `ToSchema` for JSON handling and the
//! OpenAPI document.
//!
//! Addresses, hashes and content identifiers cross the API as strings:
//! addresses are 0x-prefixed and EIP-55 checksummed on output, hashes are
//! 0x-prefixed 32-byte hex, and content identifiers are IPFS CIDs.
//!
//! ## Model Categories
//!
//! - **Wallets**: custodial wallet creation and encryption keys
//! - **Identity**: registration and identity lookups
//! - **Requests**: data requests and consent decisions
//! - **Deliveries**: decrypted payloads received by a requester
//! - **Upload**: file relay to the content store

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use crate::blockchain::NetworkConfig;
use crate::exchange::{Decision, Delivery, Registration};
use crate::ledger::{did_for, DataRequest, IdentityRecord, RequestStatus, TxReceipt};
use crate::storage::{WalletMetadata, WalletStatus};

// =============================================================================
// Wallet Models
// =============================================================================

/// Request body for creating a custodial wallet.
#[derive(Debug, Clone, Default, Serialize, Deserialize, ToSchema)]
pub struct CreateWalletRequest {
    /// Optional human-readable label.
    #[serde(default)]
    pub label: Option<String>,
}

/// A custodial wallet. Secrets are never included.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct WalletResponse {
    pub address: String,
    /// X25519 public encryption key, base64.
    pub encryption_public_key: String,
    pub status: WalletStatus,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub label: Option<String>,
    pub created_at: String,
}

impl From<WalletMetadata> for WalletResponse {
    fn from(meta: WalletMetadata) -> Self {
        Self {
            address: meta.address,
            encryption_public_key: meta.encryption_public_key,
            status: meta.status,
            label: meta.label,
            created_at: meta.created_at.to_rfc3339(),
        }
    }
}

/// Request body for locking or unlocking a wallet.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct SetWalletStatusRequest {
    pub status: WalletStatus,
}

/// Public encryption key of a wallet.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct EncryptionKeyResponse {
    pub address: String,
    pub encryption_public_key: String,
}

// =============================================================================
// Identity Models
// =============================================================================

/// Request body for registering the session account's profile.
///
/// Keys must be known profile fields (`aadhaar_number`, `address`, `dob`,
/// `gender`, `name`, `phone`). Values must be non-empty.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct RegisterRequest {
    pub profile: BTreeMap<String, String>,
}

/// Result of a registration.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct RegistrationResponse {
    pub subject: String,
    pub did: String,
    pub data_hash: String,
    pub content_id: String,
    pub transaction: TransactionInfo,
}

impl RegistrationResponse {
    pub fn new(registration: &Registration, network: &NetworkConfig) -> Self {
        Self {
            subject: registration.subject.to_string(),
            did: did_for(network.did_network, registration.subject),
            data_hash: registration.data_hash.to_string(),
            content_id: registration.content_id.to_string(),
            transaction: TransactionInfo::new(&registration.receipt, network),
        }
    }
}

/// Identity record of a registered account.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct IdentityResponse {
    pub user_id: u64,
    pub address: String,
    pub did: String,
    /// Content identifier of the self-encrypted profile.
    pub content_id: String,
    pub data_hash: String,
    /// X25519 public encryption key, base64.
    pub public_key: String,
}

impl IdentityResponse {
    pub fn new(record: &IdentityRecord, network: &NetworkConfig) -> Self {
        Self {
            user_id: record.user_id,
            address: record.subject.to_string(),
            did: did_for(network.did_network, record.subject),
            content_id: record.content_id.to_string(),
            data_hash: record.data_hash.to_string(),
            public_key: record.public_key.to_base64(),
        }
    }
}

/// Owner of a profile hash.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct HashOwnerResponse {
    pub data_hash: String,
    /// `null` when nobody has claimed the hash.
    pub owner: Option<String>,
}

// =============================================================================
// Request Models
// =============================================================================

/// Request body for asking a subject for profile fields.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct CreateDataRequest {
    /// Subject account address.
    pub subject: String,
    /// Requested profile field names.
    pub fields: Vec<String>,
}

/// A data request as recorded on the request ledger.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct DataRequestResponse {
    pub id: u64,
    pub requester: String,
    pub subject: String,
    pub fields: Vec<String>,
    /// `Pending`, `Approved` or `Rejected`.
    pub status: String,
}

impl From<&DataRequest> for DataRequestResponse {
    fn from(request: &DataRequest) -> Self {
        Self {
            id: request.id,
            requester: request.requester.to_string(),
            subject: request.subject.to_string(),
            fields: request.fields.clone(),
            status: request.status.to_string(),
        }
    }
}

/// Requests addressed to the session account.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct RequestListResponse {
    pub requests: Vec<DataRequestResponse>,
    pub pending: usize,
}

impl RequestListResponse {
    pub fn new(requests: &[DataRequest]) -> Self {
        Self {
            pending: requests
                .iter()
                .filter(|r| r.status == RequestStatus::Pending)
                .count(),
            requests: requests.iter().map(DataRequestResponse::from).collect(),
        }
    }
}

/// Outcome of an approval or rejection.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct DecisionResponse {
    pub request: DataRequestResponse,
    /// Content identifier of the payload delivered to the requester.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub delivery_content_id: Option<String>,
    pub transaction: TransactionInfo,
}

impl DecisionResponse {
    pub fn new(decision: &Decision, network: &NetworkConfig) -> Self {
        Self {
            request: DataRequestResponse::from(&decision.request),
            delivery_content_id: decision.delivery.as_ref().map(|id| id.to_string()),
            transaction: TransactionInfo::new(&decision.receipt, network),
        }
    }
}

/// A finalized ledger transaction.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct TransactionInfo {
    pub tx_hash: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub block_number: Option<u64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub explorer_url: Option<String>,
}

impl TransactionInfo {
    pub fn new(receipt: &TxReceipt, network: &NetworkConfig) -> Self {
        let tx_hash = receipt.tx_hash.to_string();
        Self {
            explorer_url: network.tx_url(&tx_hash),
            block_number: receipt.block_number,
            tx_hash,
        }
    }
}

// =============================================================================
// Delivery Models
// =============================================================================

/// Fields a subject delivered to the session account, decrypted.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct DeliveryResponse {
    pub subject: String,
    pub content_id: String,
    pub profile: BTreeMap<String, String>,
}

impl From<Delivery> for DeliveryResponse {
    fn from(delivery: Delivery) -> Self {
        Self {
            subject: delivery.subject.to_string(),
            content_id: delivery.content_id.to_string(),
            profile: delivery.profile.into_map(),
        }
    }
}

// =============================================================================
// Upload Models
// =============================================================================

/// Result of relaying a file to the content store.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct UploadResponse {
    pub ipfs_hash: String,
    pub file_name: String,
    pub size: usize,
}
