// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Process-local content store.
//!
//! Identifiers are derived from the SHA-256 of the stored bytes, so storing
//! the same payload twice yields the same identifier.

use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};

use async_trait::async_trait;
use sha2::{Digest, Sha256};
use tokio::sync::RwLock;

use super::{ContentError, ContentId, ContentResult, ContentStore};

#[derive(Default)]
pub struct InMemoryContentStore {
    blobs: RwLock<HashMap<ContentId, Vec<u8>>>,
    puts: AtomicUsize,
}

impl InMemoryContentStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of successful `put` calls since creation.
    pub fn put_count(&self) -> usize {
        self.puts.load(Ordering::SeqCst)
    }
}

/// Derive the identifier for a blob.
pub fn content_id_for(bytes: &[u8]) -> ContentId {
    let digest = Sha256::digest(bytes);
    ContentId::new(format!("sha256-{}", alloy::hex::encode(digest)))
}

#[async_trait]
impl ContentStore for InMemoryContentStore {
    async fn put_file(&self, file_name: &str, bytes: Vec<u8>) -> ContentResult<ContentId> {
        let id = content_id_for(&bytes);
        tracing::debug!(content_id = %id, file_name, size = bytes.len(), "Storing blob in memory");
        self.blobs.write().await.insert(id.clone(), bytes);
        self.puts.fetch_add(1, Ordering::SeqCst);
        Ok(id)
    }

    async fn get(&self, id: &ContentId) -> ContentResult<Vec<u8>> {
        self.blobs
            .read()
            .await
            .get(id)
            .cloned()
            .ok_or_else(|| ContentError::NotFound(id.clone()))
    }
}
