// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! EVM backends for the identity and request ledgers.
//!
//! - `client` - RPC connection, chain guard, finality and revert handling
//! - `contracts` - `sol!` bindings for both registries
//! - `identity` / `requests` - ledger trait implementations

pub mod client;
pub mod contracts;
pub mod identity;
pub mod requests;
pub mod types;

pub use client::{ChainClient, ChainClientError};
pub use identity::EvmIdentityLedger;
pub use requests::EvmRequestLedger;
pub use types::*;
