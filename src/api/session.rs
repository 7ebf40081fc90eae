// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Axum extractors for the calling wallet.
//!
//! Callers authenticate with a bearer token and name the custodial wallet
//! they act as in the `X-Wallet-Address` header. The wallet must belong to
//! the token's user:
//!
//! ```rust,ignore
//! async fn approve(ActiveSession(session): ActiveSession) -> impl IntoResponse {
//!     // session signs ledger writes as the header's wallet
//! }
//! ```

use alloy::primitives::Address;
use axum::{
    extract::FromRequestParts,
    http::{request::Parts, StatusCode},
};

use crate::auth::Auth;
use crate::error::ApiError;
use crate::state::AppState;
use crate::wallet::Session;

pub const WALLET_ADDRESS_HEADER: &str = "x-wallet-address";

/// Wallet named by `X-Wallet-Address`, owned by the authenticated caller.
///
/// Locked wallets pass; read-only endpoints use this.
#[derive(Debug, Clone, Copy)]
pub struct OwnedWallet(pub Address);

/// Signing session for the caller's active wallet.
///
/// Rejects unknown wallets with 404, and other users' or locked wallets
/// with 403.
pub struct ActiveSession(pub Session);

impl FromRequestParts<AppState> for OwnedWallet {
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, state: &AppState) -> Result<Self, Self::Rejection> {
        let Auth(user) = Auth::from_request_parts(parts, state).await?;
        let address = header_address(parts)?;
        state.keyring.owned_wallet(address, &user)?;
        Ok(OwnedWallet(address))
    }
}

impl FromRequestParts<AppState> for ActiveSession {
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, state: &AppState) -> Result<Self, Self::Rejection> {
        let OwnedWallet(address) = OwnedWallet::from_request_parts(parts, state).await?;
        let session = state.keyring.session(address)?;
        Ok(ActiveSession(session))
    }
}

fn header_address(parts: &Parts) -> Result<Address, ApiError> {
    let raw = parts
        .headers
        .get(WALLET_ADDRESS_HEADER)
        .ok_or_else(|| {
            ApiError::new(
                StatusCode::BAD_REQUEST,
                "MISSING_WALLET_HEADER",
                "X-Wallet-Address header is required",
            )
        })?
        .to_str()
        .map_err(|_| ApiError::bad_request("X-Wallet-Address header is not valid text"))?;

    parse_address(raw)
}

/// Parse a 0x-prefixed account address from a header or path segment.
pub fn parse_address(raw: &str) -> Result<Address, ApiError> {
    raw.trim()
        .parse::<Address>()
        .map_err(|_| ApiError::bad_request(format!("Invalid address: {raw}")))
}
