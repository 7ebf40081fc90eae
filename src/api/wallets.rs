// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Custodial wallet endpoints.
//!
//! A wallet is a secp256k1 signing key (the account address) plus an X25519
//! encryption key. Private material never leaves the key store. Each wallet
//! belongs to the user who created it; only that user can see, lock or act
//! as it. Encryption public keys are readable by anyone.

use axum::{
    extract::{Path, State},
    http::StatusCode,
    Json,
};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use super::session::parse_address;
use crate::{
    auth::Auth,
    error::ApiError,
    models::{CreateWalletRequest, EncryptionKeyResponse, SetWalletStatusRequest, WalletResponse},
    state::AppState,
    wallet::WalletKeyProvider,
};

/// Response containing the caller's custodial wallets.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct WalletListResponse {
    pub wallets: Vec<WalletResponse>,
    pub total: usize,
}

/// Create a custodial wallet.
#[utoipa::path(
    post,
    path = "/v1/wallets",
    tag = "Wallets",
    request_body = CreateWalletRequest,
    responses(
        (status = 201, description = "Wallet created", body = WalletResponse),
        (status = 401, description = "Unauthorized"),
        (status = 500, description = "Key generation or storage failed")
    ),
    security(("bearer_auth" = []))
)]
pub async fn create_wallet(
    Auth(user): Auth,
    State(state): State<AppState>,
    Json(request): Json<CreateWalletRequest>,
) -> Result<(StatusCode, Json<WalletResponse>), ApiError> {
    let label = request
        .label
        .map(|l| l.trim().to_string())
        .filter(|l| !l.is_empty());
    let metadata = state.keyring.create_wallet(&user.user_id, label)?;
    Ok((StatusCode::CREATED, Json(metadata.into())))
}

/// List the caller's custodial wallets.
#[utoipa::path(
    get,
    path = "/v1/wallets",
    tag = "Wallets",
    responses(
        (status = 200, description = "Wallets owned by the caller", body = WalletListResponse),
        (status = 401, description = "Unauthorized")
    ),
    security(("bearer_auth" = []))
)]
pub async fn list_wallets(
    Auth(user): Auth,
    State(state): State<AppState>,
) -> Result<Json<WalletListResponse>, ApiError> {
    let wallets: Vec<WalletResponse> = state
        .keyring
        .wallets_owned_by(&user.user_id)?
        .into_iter()
        .map(Into::into)
        .collect();
    let total = wallets.len();
    Ok(Json(WalletListResponse { wallets, total }))
}

#[utoipa::path(
    get,
    path = "/v1/wallets/{address}",
    tag = "Wallets",
    params(("address" = String, Path, description = "Wallet address")),
    responses(
        (status = 200, description = "Wallet details", body = WalletResponse),
        (status = 400, description = "Malformed address"),
        (status = 401, description = "Unauthorized"),
        (status = 403, description = "Wallet belongs to another user"),
        (status = 404, description = "Wallet not found")
    ),
    security(("bearer_auth" = []))
)]
pub async fn get_wallet(
    Auth(user): Auth,
    State(state): State<AppState>,
    Path(address): Path<String>,
) -> Result<Json<WalletResponse>, ApiError> {
    let address = parse_address(&address)?;
    Ok(Json(state.keyring.owned_wallet(address, &user)?.into()))
}

/// Public encryption key of a wallet.
///
/// Anyone encrypting data for this account uses this key.
#[utoipa::path(
    get,
    path = "/v1/wallets/{address}/encryption-key",
    tag = "Wallets",
    params(("address" = String, Path, description = "Wallet address")),
    responses(
        (status = 200, description = "Encryption public key", body = EncryptionKeyResponse),
        (status = 403, description = "Wallet is locked"),
        (status = 404, description = "Wallet not found")
    )
)]
pub async fn get_encryption_key(
    State(state): State<AppState>,
    Path(address): Path<String>,
) -> Result<Json<EncryptionKeyResponse>, ApiError> {
    let address = parse_address(&address)?;
    let key = state.keyring.public_key(address).await?;
    Ok(Json(EncryptionKeyResponse {
        address: address.to_string(),
        encryption_public_key: key.to_base64(),
    }))
}

/// Lock or unlock a wallet. A locked wallet refuses to sign or decrypt.
#[utoipa::path(
    put,
    path = "/v1/wallets/{address}/status",
    tag = "Wallets",
    params(("address" = String, Path, description = "Wallet address")),
    request_body = SetWalletStatusRequest,
    responses(
        (status = 200, description = "Updated wallet", body = WalletResponse),
        (status = 401, description = "Unauthorized"),
        (status = 403, description = "Wallet belongs to another user"),
        (status = 404, description = "Wallet not found")
    ),
    security(("bearer_auth" = []))
)]
pub async fn set_wallet_status(
    Auth(user): Auth,
    State(state): State<AppState>,
    Path(address): Path<String>,
    Json(request): Json<SetWalletStatusRequest>,
) -> Result<Json<WalletResponse>, ApiError> {
    let address = parse_address(&address)?;
    state.keyring.owned_wallet(address, &user)?;
    let metadata = state.keyring.set_status(address, request.status)?;
    Ok(Json(metadata.into()))
}
