// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! # Custodial Key Store
//!
//! Persistent storage for the wallets this server holds on behalf of users,
//! plus the audit trail of consent decisions.
//!
//! ## Storage Layout
//!
//! ```text
//! {DATA_DIR}/
//!   wallets/{address}/
//!     meta.json          # Owner, label, status, X25519 public key
//!     signing_key.pem    # secp256k1 key (NEVER exposed via API)
//!     encryption.key     # X25519 secret (NEVER exposed via API)
//!   audit/
//!     {date}/events.jsonl
//! ```
//!
//! Run `DATA_DIR` on an encrypted mount; nothing here encrypts at rest.

pub mod audit;
pub mod ownership;
pub mod paths;
pub mod secure_fs;
pub mod wallets;

pub use audit::{AuditEvent, AuditEventType, AuditRepository};
pub use ownership::{OwnedResource, OwnershipEnforcer};
pub use paths::StoragePaths;
pub use secure_fs::{SecureStorage, StorageError, StorageResult};
pub use wallets::{WalletMetadata, WalletRepository, WalletStatus};
