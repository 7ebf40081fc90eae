// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Identity registration and lookup endpoints.

use alloy::primitives::B256;
use axum::{
    extract::{Path, State},
    http::StatusCode,
    Json,
};
use serde_json::json;

use super::{record_outcome, session::parse_address, ActiveSession};
use crate::{
    error::ApiError,
    exchange::{ExchangeError, Profile},
    models::{HashOwnerResponse, IdentityResponse, RegisterRequest, RegistrationResponse},
    state::AppState,
    storage::{AuditEvent, AuditEventType},
};

/// Register the session wallet's profile.
///
/// The profile is hashed, self-encrypted to the wallet's own key, pinned to
/// the content store and recorded on the identity ledger. A profile whose
/// hash another account already claimed is refused.
#[utoipa::path(
    post,
    path = "/v1/identity",
    tag = "Identity",
    params(("X-Wallet-Address" = String, Header, description = "Subject wallet")),
    request_body = RegisterRequest,
    responses(
        (status = 201, description = "Identity registered", body = RegistrationResponse),
        (status = 401, description = "Missing or invalid bearer token"),
        (status = 403, description = "Wallet belongs to another user"),
        (status = 409, description = "Profile hash already registered"),
        (status = 422, description = "Invalid profile"),
        (status = 502, description = "Upload or ledger write failed"),
        (status = 503, description = "Ledger unavailable")
    ),
    security(("bearer_auth" = []))
)]
pub async fn register(
    ActiveSession(session): ActiveSession,
    State(state): State<AppState>,
    Json(request): Json<RegisterRequest>,
) -> Result<(StatusCode, Json<RegistrationResponse>), ApiError> {
    let subject = session.address();
    let profile = Profile::from_map(request.profile).map_err(ExchangeError::from)?;

    let result = state.exchange.register(&session, &profile).await;
    record_outcome(
        &state,
        AuditEvent::new(AuditEventType::IdentityRegistered)
            .with_actor(subject)
            .with_resource("identity", subject)
            .with_details(json!({ "fields": profile.len() })),
        &result,
    );

    let registration = result?;
    Ok((
        StatusCode::CREATED,
        Json(RegistrationResponse::new(&registration, &state.network)),
    ))
}

/// Identity record of an account.
#[utoipa::path(
    get,
    path = "/v1/identity/{address}",
    tag = "Identity",
    params(("address" = String, Path, description = "Account address")),
    responses(
        (status = 200, description = "Identity record", body = IdentityResponse),
        (status = 404, description = "Account not registered")
    )
)]
pub async fn get_identity(
    State(state): State<AppState>,
    Path(address): Path<String>,
) -> Result<Json<IdentityResponse>, ApiError> {
    let address = parse_address(&address)?;
    let record = state
        .exchange
        .identity(address)
        .await?
        .ok_or(ExchangeError::SubjectNotRegistered(address))?;
    Ok(Json(IdentityResponse::new(&record, &state.network)))
}

/// Account that claimed a profile hash.
#[utoipa::path(
    get,
    path = "/v1/hashes/{hash}/owner",
    tag = "Identity",
    params(("hash" = String, Path, description = "0x-prefixed keccak256 profile hash")),
    responses(
        (status = 200, description = "Hash owner, null when unclaimed", body = HashOwnerResponse),
        (status = 400, description = "Malformed hash")
    )
)]
pub async fn hash_owner(
    State(state): State<AppState>,
    Path(hash): Path<String>,
) -> Result<Json<HashOwnerResponse>, ApiError> {
    let data_hash: B256 = hash
        .trim()
        .parse()
        .map_err(|_| ApiError::bad_request(format!("Invalid hash: {hash}")))?;
    let owner = state.exchange.hash_owner(data_hash).await?;
    Ok(Json(HashOwnerResponse {
        data_hash: data_hash.to_string(),
        owner: owner.map(|o| o.to_string()),
    }))
}
