// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! # Content Store
//!
//! Content-addressed blob storage for encrypted payloads. The store only
//! ever sees ciphertext; ownership of a blob is tracked on the identity
//! ledger through the content identifier, never in the store itself.
//!
//! ## Backends
//!
//! - [`PinataClient`] - IPFS pinning service plus a public gateway for reads
//! - [`InMemoryContentStore`] - process-local store for development and tests

pub mod memory;
pub mod pinata;

use std::fmt;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

pub use memory::InMemoryContentStore;
pub use pinata::{PinataClient, PinataConfig};

/// File name used when a payload is pinned without an explicit name.
pub const DEFAULT_PAYLOAD_NAME: &str = "payload.json";

/// Identifier returned by the content store for a stored blob (an IPFS CID).
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ContentId(String);

impl ContentId {
    /// Wrap a raw identifier. Surrounding whitespace is trimmed.
    pub fn new(raw: impl Into<String>) -> Self {
        let raw: String = raw.into();
        Self(raw.trim().to_string())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl fmt::Display for ContentId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for ContentId {
    fn from(value: &str) -> Self {
        ContentId::new(value)
    }
}

impl From<String> for ContentId {
    fn from(value: String) -> Self {
        ContentId::new(value)
    }
}

/// Errors raised by content store backends.
#[derive(Debug, thiserror::Error)]
pub enum ContentError {
    #[error("Content not found: {0}")]
    NotFound(ContentId),

    #[error("Content store unavailable: {0}")]
    Unavailable(String),

    #[error("Content store response was invalid: {0}")]
    InvalidResponse(String),
}

pub type ContentResult<T> = Result<T, ContentError>;

/// Content-addressed blob storage.
///
/// `get` on an identifier that was never stored must fail with
/// [`ContentError::NotFound`].
#[async_trait]
pub trait ContentStore: Send + Sync {
    /// Store a named file and return its identifier.
    async fn put_file(&self, file_name: &str, bytes: Vec<u8>) -> ContentResult<ContentId>;

    /// Fetch the bytes stored under `id`.
    async fn get(&self, id: &ContentId) -> ContentResult<Vec<u8>>;

    /// Store an anonymous payload.
    async fn put(&self, bytes: Vec<u8>) -> ContentResult<ContentId> {
        self.put_file(DEFAULT_PAYLOAD_NAME, bytes).await
    }

    /// Cheap reachability probe used by the readiness endpoint.
    async fn health_check(&self) -> ContentResult<()> {
        Ok(())
    }
}
