// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;
use tracing::error;

use crate::auth::AuthError;
use crate::content::ContentError;
use crate::exchange::ExchangeError;
use crate::wallet::WalletError;

#[derive(Debug)]
pub struct ApiError {
    pub status: StatusCode,
    pub message: String,
    pub error_code: &'static str,
}

#[derive(Serialize)]
struct ErrorBody {
    error: String,
    error_code: &'static str,
}

impl ApiError {
    pub fn new(status: StatusCode, error_code: &'static str, message: impl Into<String>) -> Self {
        Self {
            status,
            message: message.into(),
            error_code,
        }
    }

    pub fn bad_request(message: impl Into<String>) -> Self {
        Self::new(StatusCode::BAD_REQUEST, "BAD_REQUEST", message)
    }

    pub fn unprocessable(message: impl Into<String>) -> Self {
        Self::new(StatusCode::UNPROCESSABLE_ENTITY, "VALIDATION_FAILED", message)
    }

    pub fn internal(message: impl Into<String>) -> Self {
        Self::new(StatusCode::INTERNAL_SERVER_ERROR, "INTERNAL_ERROR", message)
    }
}

impl From<ExchangeError> for ApiError {
    fn from(err: ExchangeError) -> Self {
        let status = match &err {
            ExchangeError::AlreadyRegistered { .. } | ExchangeError::InvalidState { .. } => {
                StatusCode::CONFLICT
            }
            ExchangeError::NotAuthorized { .. }
            | ExchangeError::DecryptionDenied(_)
            | ExchangeError::KeyUnavailable(_) => StatusCode::FORBIDDEN,
            ExchangeError::ContentNotFound(_)
            | ExchangeError::RequestNotFound(_)
            | ExchangeError::RequesterNotRegistered(_)
            | ExchangeError::SubjectNotRegistered(_)
            | ExchangeError::NoDelivery { .. } => StatusCode::NOT_FOUND,
            ExchangeError::CorruptPayload(_) | ExchangeError::InvalidProfile(_) => {
                StatusCode::UNPROCESSABLE_ENTITY
            }
            ExchangeError::LedgerUnavailable(_) | ExchangeError::ContentStoreUnavailable(_) => {
                StatusCode::SERVICE_UNAVAILABLE
            }
            ExchangeError::RegistrationFailed(_) | ExchangeError::TransactionReverted(_) => {
                StatusCode::BAD_GATEWAY
            }
            ExchangeError::EncryptionFailed(_) => StatusCode::INTERNAL_SERVER_ERROR,
        };
        Self::new(status, err.error_code(), err.to_string())
    }
}

impl From<WalletError> for ApiError {
    fn from(err: WalletError) -> Self {
        match err {
            WalletError::UnknownAccount(_) => {
                Self::new(StatusCode::NOT_FOUND, "UNKNOWN_WALLET", err.to_string())
            }
            WalletError::Rejected(_) => {
                Self::new(StatusCode::FORBIDDEN, "WALLET_LOCKED", err.to_string())
            }
            WalletError::NotOwner(_) => {
                Self::new(StatusCode::FORBIDDEN, "WALLET_NOT_OWNED", err.to_string())
            }
            other => {
                error!(error = %other, "Wallet operation failed");
                Self::internal("Wallet operation failed")
            }
        }
    }
}

impl From<AuthError> for ApiError {
    fn from(err: AuthError) -> Self {
        let status = err.status_code();
        if status.is_server_error() {
            error!(error = %err, "Token verification failed");
        }
        Self::new(status, err.error_code(), err.to_string())
    }
}

impl From<ContentError> for ApiError {
    fn from(err: ContentError) -> Self {
        match err {
            ContentError::NotFound(_) => {
                Self::new(StatusCode::NOT_FOUND, "CONTENT_NOT_FOUND", err.to_string())
            }
            other => Self::new(
                StatusCode::SERVICE_UNAVAILABLE,
                "CONTENT_STORE_UNAVAILABLE",
                other.to_string(),
            ),
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let body = Json(ErrorBody {
            error: self.message,
            error_code: self.error_code,
        });
        (self.status, body).into_response()
    }
}
