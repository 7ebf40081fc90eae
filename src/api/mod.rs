// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

use axum::{
    extract::DefaultBodyLimit,
    routing::{get, post, put},
    Router,
};
use tower::ServiceBuilder;
use tower_http::{
    cors::CorsLayer,
    request_id::{MakeRequestUuid, PropagateRequestIdLayer, SetRequestIdLayer},
    trace::TraceLayer,
};
use utoipa::{
    openapi::security::{HttpAuthScheme, HttpBuilder, SecurityScheme},
    Modify, OpenApi,
};
use utoipa_swagger_ui::SwaggerUi;

use crate::{
    models::{
        CreateDataRequest, CreateWalletRequest, DataRequestResponse, DecisionResponse,
        DeliveryResponse, EncryptionKeyResponse, HashOwnerResponse, IdentityResponse,
        RegisterRequest, RegistrationResponse, RequestListResponse, SetWalletStatusRequest,
        TransactionInfo, UploadResponse, WalletResponse,
    },
    state::AppState,
    storage::{audit, AuditEvent, WalletStatus},
};

pub mod health;
pub mod identity;
pub mod requests;
pub mod session;
pub mod upload;
pub mod wallets;

#[cfg(test)]
pub(crate) mod test_support;

pub use session::{ActiveSession, OwnedWallet, WALLET_ADDRESS_HEADER};

/// Multipart framing allowance on top of the file size limit.
const MULTIPART_OVERHEAD: usize = 64 * 1024;

pub fn router(state: AppState) -> Router {
    let v1_routes = Router::new()
        .route(
            "/wallets",
            get(wallets::list_wallets).post(wallets::create_wallet),
        )
        .route("/wallets/{address}", get(wallets::get_wallet))
        .route(
            "/wallets/{address}/encryption-key",
            get(wallets::get_encryption_key),
        )
        .route("/wallets/{address}/status", put(wallets::set_wallet_status))
        .route("/identity", post(identity::register))
        .route("/identity/{address}", get(identity::get_identity))
        .route("/hashes/{hash}/owner", get(identity::hash_owner))
        .route(
            "/requests",
            get(requests::list_requests).post(requests::create_request),
        )
        .route("/requests/{id}/approve", post(requests::approve_request))
        .route("/requests/{id}/reject", post(requests::reject_request))
        .route("/deliveries/{subject}", get(requests::read_delivery))
        .route(
            "/upload",
            post(upload::upload_file)
                .layer(DefaultBodyLimit::max(upload::MAX_UPLOAD_BYTES + MULTIPART_OVERHEAD)),
        );

    Router::new()
        .route("/health", get(health::health))
        .route("/health/live", get(health::liveness))
        .route("/health/ready", get(health::readiness))
        .nest("/v1", v1_routes)
        .with_state(state)
        .merge(SwaggerUi::new("/docs").url("/api-doc/openapi.json", ApiDoc::openapi()))
        .layer(
            ServiceBuilder::new()
                .layer(SetRequestIdLayer::x_request_id(MakeRequestUuid))
                .layer(TraceLayer::new_for_http())
                .layer(PropagateRequestIdLayer::x_request_id()),
        )
        .layer(CorsLayer::permissive())
}

/// Append an audit event marked with the outcome of `result`.
pub(crate) fn record_outcome<T, E: std::fmt::Display>(
    state: &AppState,
    event: AuditEvent,
    result: &Result<T, E>,
) {
    let event = match result {
        Ok(_) => event,
        Err(e) => event.failed(e),
    };
    audit::record(&state.storage, event);
}

#[derive(OpenApi)]
#[openapi(
    paths(
        health::health,
        health::liveness,
        health::readiness,
        wallets::create_wallet,
        wallets::list_wallets,
        wallets::get_wallet,
        wallets::get_encryption_key,
        wallets::set_wallet_status,
        identity::register,
        identity::get_identity,
        identity::hash_owner,
        requests::list_requests,
        requests::create_request,
        requests::approve_request,
        requests::reject_request,
        requests::read_delivery,
        upload::upload_file
    ),
    components(
        schemas(
            health::ReadyResponse,
            health::HealthChecks,
            health::HealthResponse,
            wallets::WalletListResponse,
            CreateWalletRequest,
            WalletResponse,
            WalletStatus,
            SetWalletStatusRequest,
            EncryptionKeyResponse,
            RegisterRequest,
            RegistrationResponse,
            IdentityResponse,
            HashOwnerResponse,
            CreateDataRequest,
            DataRequestResponse,
            RequestListResponse,
            DecisionResponse,
            TransactionInfo,
            DeliveryResponse,
            UploadResponse
        )
    ),
    tags(
        (name = "Health", description = "Liveness and readiness probes"),
        (name = "Wallets", description = "Custodial wallets and encryption keys"),
        (name = "Identity", description = "Profile registration and identity lookup"),
        (name = "Requests", description = "Data requests, consent decisions and deliveries"),
        (name = "Upload", description = "File relay to the content store")
    ),
    modifiers(&SecurityAddon)
)]
struct ApiDoc;

struct SecurityAddon;

impl Modify for SecurityAddon {
    fn modify(&self, openapi: &mut utoipa::openapi::OpenApi) {
        if let Some(components) = openapi.components.as_mut() {
            components.add_security_scheme(
                "bearer_auth",
                SecurityScheme::Http(
                    HttpBuilder::new()
                        .scheme(HttpAuthScheme::Bearer)
                        .bearer_format("JWT")
                        .build(),
                ),
            );
        }
    }
}
