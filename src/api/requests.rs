// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Data request and consent endpoints.
//!
//! Requesters file requests for named profile fields of a subject. The
//! subject approves (re-encrypting just those fields to the requester) or
//! rejects. Approved payloads are read back through `/v1/deliveries`.

use axum::{
    extract::{Path, State},
    http::StatusCode,
    Json,
};
use serde_json::json;

use super::{record_outcome, session::parse_address, ActiveSession, OwnedWallet};
use crate::{
    error::ApiError,
    models::{
        CreateDataRequest, DataRequestResponse, DecisionResponse, DeliveryResponse,
        RequestListResponse,
    },
    state::AppState,
    storage::{AuditEvent, AuditEventType},
};

/// Requests addressed to the calling wallet, oldest first.
#[utoipa::path(
    get,
    path = "/v1/requests",
    tag = "Requests",
    params(("X-Wallet-Address" = String, Header, description = "Subject wallet")),
    responses(
        (status = 200, description = "Requests for the subject", body = RequestListResponse),
        (status = 401, description = "Missing or invalid bearer token"),
        (status = 403, description = "Wallet belongs to another user"),
        (status = 503, description = "Ledger unavailable")
    ),
    security(("bearer_auth" = []))
)]
pub async fn list_requests(
    OwnedWallet(subject): OwnedWallet,
    State(state): State<AppState>,
) -> Result<Json<RequestListResponse>, ApiError> {
    let requests = state.exchange.list_requests(subject).await?;
    Ok(Json(RequestListResponse::new(&requests)))
}

/// Ask a subject for profile fields as the calling wallet.
#[utoipa::path(
    post,
    path = "/v1/requests",
    tag = "Requests",
    params(("X-Wallet-Address" = String, Header, description = "Requester wallet")),
    request_body = CreateDataRequest,
    responses(
        (status = 201, description = "Request created", body = DataRequestResponse),
        (status = 401, description = "Missing or invalid bearer token"),
        (status = 403, description = "Wallet belongs to another user"),
        (status = 404, description = "Subject or requester not registered"),
        (status = 422, description = "Unknown or empty field list")
    ),
    security(("bearer_auth" = []))
)]
pub async fn create_request(
    ActiveSession(session): ActiveSession,
    State(state): State<AppState>,
    Json(request): Json<CreateDataRequest>,
) -> Result<(StatusCode, Json<DataRequestResponse>), ApiError> {
    let subject = parse_address(&request.subject)?;

    let result = state
        .exchange
        .create_request(&session, subject, &request.fields)
        .await;
    let mut event = AuditEvent::new(AuditEventType::RequestCreated)
        .with_actor(session.address())
        .with_details(json!({ "subject": subject.to_string(), "fields": request.fields }));
    if let Ok(created) = &result {
        event = event.with_resource("request", created.id);
    }
    record_outcome(&state, event, &result);

    let created = result?;
    Ok((StatusCode::CREATED, Json(DataRequestResponse::from(&created))))
}

/// Approve a pending request and deliver the requested fields.
#[utoipa::path(
    post,
    path = "/v1/requests/{id}/approve",
    tag = "Requests",
    params(
        ("id" = u64, Path, description = "Request id"),
        ("X-Wallet-Address" = String, Header, description = "Subject wallet")
    ),
    responses(
        (status = 200, description = "Request approved", body = DecisionResponse),
        (status = 401, description = "Missing or invalid bearer token"),
        (status = 403, description = "Caller does not own the wallet or is not the subject, or decryption was refused"),
        (status = 404, description = "Request, profile or requester not found"),
        (status = 409, description = "Request is no longer pending"),
        (status = 502, description = "Ledger write reverted")
    ),
    security(("bearer_auth" = []))
)]
pub async fn approve_request(
    ActiveSession(session): ActiveSession,
    State(state): State<AppState>,
    Path(id): Path<u64>,
) -> Result<Json<DecisionResponse>, ApiError> {
    let result = state.exchange.approve(&session, id).await;
    let mut event = AuditEvent::new(AuditEventType::RequestApproved)
        .with_actor(session.address())
        .with_resource("request", id);
    if let Ok(decision) = &result {
        event = event.with_details(json!({
            "requester": decision.request.requester.to_string(),
            "fields": decision.request.fields,
        }));
    }
    record_outcome(&state, event, &result);

    Ok(Json(DecisionResponse::new(&result?, &state.network)))
}

/// Reject a pending request. Nothing is delivered.
#[utoipa::path(
    post,
    path = "/v1/requests/{id}/reject",
    tag = "Requests",
    params(
        ("id" = u64, Path, description = "Request id"),
        ("X-Wallet-Address" = String, Header, description = "Subject wallet")
    ),
    responses(
        (status = 200, description = "Request rejected", body = DecisionResponse),
        (status = 401, description = "Missing or invalid bearer token"),
        (status = 403, description = "Caller does not own the wallet or is not the subject"),
        (status = 404, description = "Request not found"),
        (status = 409, description = "Request is no longer pending")
    ),
    security(("bearer_auth" = []))
)]
pub async fn reject_request(
    ActiveSession(session): ActiveSession,
    State(state): State<AppState>,
    Path(id): Path<u64>,
) -> Result<Json<DecisionResponse>, ApiError> {
    let result = state.exchange.reject(&session, id).await;
    record_outcome(
        &state,
        AuditEvent::new(AuditEventType::RequestRejected)
            .with_actor(session.address())
            .with_resource("request", id),
        &result,
    );

    Ok(Json(DecisionResponse::new(&result?, &state.network)))
}

/// Decrypt the fields a subject delivered to the calling wallet.
#[utoipa::path(
    get,
    path = "/v1/deliveries/{subject}",
    tag = "Requests",
    params(
        ("subject" = String, Path, description = "Subject address"),
        ("X-Wallet-Address" = String, Header, description = "Requester wallet")
    ),
    responses(
        (status = 200, description = "Delivered fields", body = DeliveryResponse),
        (status = 401, description = "Missing or invalid bearer token"),
        (status = 403, description = "Wallet belongs to another user, or decryption refused"),
        (status = 404, description = "Nothing delivered")
    ),
    security(("bearer_auth" = []))
)]
pub async fn read_delivery(
    ActiveSession(session): ActiveSession,
    State(state): State<AppState>,
    Path(subject): Path<String>,
) -> Result<Json<DeliveryResponse>, ApiError> {
    let subject = parse_address(&subject)?;

    let result = state.exchange.read_delivery(&session, subject).await;
    record_outcome(
        &state,
        AuditEvent::new(AuditEventType::DeliveryRead)
            .with_actor(session.address())
            .with_resource("delivery", subject),
        &result,
    );

    Ok(Json(DeliveryResponse::from(result?)))
}
