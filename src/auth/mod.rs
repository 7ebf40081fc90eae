// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! # Authentication
//!
//! Every custodial wallet belongs to one user. Callers prove who they are
//! with `Authorization: Bearer <JWT>`; the `sub` claim is the canonical
//! `user_id` that wallet ownership is checked against.
//!
//! ## Token verification
//!
//! - **JWKS**: signature checked against keys fetched over HTTPS and cached
//! - **Shared secret**: HS256 signature checked against a configured secret
//! - **Unverified**: structure and expiry only. Development use, opt-in.
//!
//! Issuer and audience are validated when configured. Clock skew tolerance
//! is 60 seconds.

use jsonwebtoken::DecodingKey;
use serde::{Deserialize, Serialize};

pub mod error;
pub mod extractor;
pub mod jwks;

pub use error::AuthError;
pub use extractor::Auth;
pub use jwks::JwksManager;

/// Caller identity taken from a verified token.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AuthenticatedUser {
    /// Canonical user ID (`sub` claim)
    pub user_id: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub session_id: Option<String>,

    /// Token expiry, Unix seconds. Zero when the token carries none.
    #[serde(skip)]
    pub expires_at: i64,
}

impl AuthenticatedUser {
    pub fn new(user_id: impl Into<String>) -> Self {
        Self {
            user_id: user_id.into(),
            session_id: None,
            expires_at: 0,
        }
    }
}

/// How bearer token signatures are checked.
#[derive(Clone)]
pub enum TokenVerifier {
    Jwks(JwksManager),
    SharedSecret(DecodingKey),
    /// Accept any well-formed, unexpired token.
    Unverified,
}

impl TokenVerifier {
    pub fn shared_secret(secret: &[u8]) -> Self {
        TokenVerifier::SharedSecret(DecodingKey::from_secret(secret))
    }

    pub fn describe(&self) -> &'static str {
        match self {
            TokenVerifier::Jwks(_) => "jwks",
            TokenVerifier::SharedSecret(_) => "shared-secret",
            TokenVerifier::Unverified => "unverified",
        }
    }
}

/// Token verification settings held in [`crate::state::AppState`].
#[derive(Clone)]
pub struct AuthConfig {
    pub verifier: TokenVerifier,
    pub issuer: Option<String>,
    pub audience: Option<String>,
}

impl AuthConfig {
    pub fn new(verifier: TokenVerifier) -> Self {
        Self {
            verifier,
            issuer: None,
            audience: None,
        }
    }

    pub fn with_issuer(mut self, issuer: Option<String>) -> Self {
        self.issuer = issuer;
        self
    }

    pub fn with_audience(mut self, audience: Option<String>) -> Self {
        self.audience = audience;
        self
    }
}
