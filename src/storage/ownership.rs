// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Ownership enforcement for stored resources.
//!
//! Every wallet access made on behalf of a caller passes through
//! [`OwnershipEnforcer::verify_ownership`].

use crate::auth::AuthenticatedUser;

use super::{StorageError, StorageResult, WalletMetadata};

/// A resource that belongs to exactly one user.
pub trait OwnedResource {
    fn owner_user_id(&self) -> &str;

    /// Human-readable name used in denial messages.
    fn resource_name(&self) -> String;
}

pub trait OwnershipEnforcer {
    /// Returns `StorageError::PermissionDenied` unless `user` owns this resource.
    fn verify_ownership(&self, user: &AuthenticatedUser) -> StorageResult<()>;
}

impl<T: OwnedResource> OwnershipEnforcer for T {
    fn verify_ownership(&self, user: &AuthenticatedUser) -> StorageResult<()> {
        if self.owner_user_id() == user.user_id {
            Ok(())
        } else {
            Err(StorageError::PermissionDenied {
                user_id: user.user_id.clone(),
                resource: self.resource_name(),
            })
        }
    }
}

impl OwnedResource for WalletMetadata {
    fn owner_user_id(&self) -> &str {
        &self.owner_user_id
    }

    fn resource_name(&self) -> String {
        format!("wallet {}", self.address)
    }
}
