// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Consent Exchange Server - Consent-Gated Encrypted Data Exchange
//!
//! Subjects register an identity profile that is encrypted to their own key,
//! pinned to IPFS and recorded on an EVM identity ledger. Requesters ask for
//! named fields. A subject who approves re-encrypts exactly those fields to
//! the requester; a rejection moves no data.
//!
//! ## Modules
//!
//! - `api` - HTTP API handlers (Axum)
//! - `auth` - Bearer token verification (JWKS or shared secret)
//! - `blockchain` - EVM identity and request ledgers (alloy)
//! - `content` - Content-addressed payload storage (IPFS via Pinata)
//! - `exchange` - The register / approve / reject workflow
//! - `ledger` - Ledger traits, record types and in-memory backends
//! - `storage` - Key store and audit log on the data directory
//! - `wallet` - Custodial keyring and encryption envelopes

pub mod api;
pub mod auth;
pub mod blockchain;
pub mod config;
pub mod content;
pub mod error;
pub mod exchange;
pub mod ledger;
pub mod models;
pub mod state;
pub mod storage;
pub mod wallet;
