// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Audit trail for custody and consent decisions.
//!
//! Every wallet lifecycle change and every registration, request, approval
//! and rejection that passes through this server is appended to a daily
//! JSONL file. Payload contents are never logged.

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use super::{SecureStorage, StorageError, StorageResult};

/// Types of auditable events.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, ToSchema)]
#[serde(rename_all = "snake_case")]
pub enum AuditEventType {
    // Custody
    WalletCreated,
    WalletLocked,
    WalletUnlocked,

    // Consent workflow
    IdentityRegistered,
    RequestCreated,
    RequestApproved,
    RequestRejected,
    DeliveryRead,

    // Content
    ContentUploaded,
}

/// An audit log entry.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct AuditEvent {
    pub event_id: String,
    pub timestamp: DateTime<Utc>,
    pub event_type: AuditEventType,
    /// Account that triggered the event.
    pub actor: Option<String>,
    /// Kind of resource affected (wallet, identity, request, content).
    pub resource_type: Option<String>,
    pub resource_id: Option<String>,
    #[schema(value_type = Option<Object>)]
    pub details: Option<serde_json::Value>,
    pub success: bool,
    pub error: Option<String>,
}

impl AuditEvent {
    pub fn new(event_type: AuditEventType) -> Self {
        Self {
            event_id: uuid::Uuid::new_v4().to_string(),
            timestamp: Utc::now(),
            event_type,
            actor: None,
            resource_type: None,
            resource_id: None,
            details: None,
            success: true,
            error: None,
        }
    }

    pub fn with_actor(mut self, actor: impl ToString) -> Self {
        self.actor = Some(actor.to_string());
        self
    }

    pub fn with_resource(
        mut self,
        resource_type: impl Into<String>,
        resource_id: impl ToString,
    ) -> Self {
        self.resource_type = Some(resource_type.into());
        self.resource_id = Some(resource_id.to_string());
        self
    }

    pub fn with_details(mut self, details: serde_json::Value) -> Self {
        self.details = Some(details);
        self
    }

    /// Mark as failed with error message.
    pub fn failed(mut self, error: impl ToString) -> Self {
        self.success = false;
        self.error = Some(error.to_string());
        self
    }
}

/// Repository for audit events.
pub struct AuditRepository<'a> {
    storage: &'a SecureStorage,
}

impl<'a> AuditRepository<'a> {
    pub fn new(storage: &'a SecureStorage) -> Self {
        Self { storage }
    }

    /// Append an event to the file for its UTC date.
    pub fn log(&self, event: &AuditEvent) -> StorageResult<()> {
        let date = event.timestamp.format("%Y-%m-%d").to_string();
        let line = serde_json::to_string(event)?;
        self.storage
            .append_line(self.storage.paths().audit_events_file(&date), &line)
    }

    /// Events for one date (`YYYY-MM-DD`). A day with no file yields nothing.
    pub fn read_events(&self, date: &str) -> StorageResult<Vec<AuditEvent>> {
        NaiveDate::parse_from_str(date, "%Y-%m-%d").map_err(|e| {
            StorageError::NotFound(format!("Audit date {date}: {e}"))
        })?;

        let content = match self
            .storage
            .read_raw(self.storage.paths().audit_events_file(date))
        {
            Ok(bytes) => bytes,
            Err(StorageError::NotFound(_)) => return Ok(Vec::new()),
            Err(e) => return Err(e),
        };

        content
            .split(|b| *b == b'\n')
            .filter(|line| !line.iter().all(u8::is_ascii_whitespace))
            .map(|line| serde_json::from_slice(line).map_err(StorageError::from))
            .collect()
    }

    /// Events for one date touching one resource.
    pub fn events_for_resource(
        &self,
        date: &str,
        resource_type: &str,
        resource_id: &str,
    ) -> StorageResult<Vec<AuditEvent>> {
        Ok(self
            .read_events(date)?
            .into_iter()
            .filter(|e| {
                e.resource_type.as_deref() == Some(resource_type)
                    && e.resource_id.as_deref() == Some(resource_id)
            })
            .collect())
    }
}

/// Best-effort audit write. Failures are logged, never propagated.
pub fn record(storage: &SecureStorage, event: AuditEvent) {
    if let Err(e) = AuditRepository::new(storage).log(&event) {
        tracing::warn!(
            event_type = ?event.event_type,
            error = %e,
            "Failed to write audit event"
        );
    }
}
