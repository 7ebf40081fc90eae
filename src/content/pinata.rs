// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Pinata IPFS pinning integration.
//!
//! Writes go through the Pinata `pinFileToIPFS` endpoint with API-key
//! headers; reads go through an IPFS HTTP gateway (`{gateway}/ipfs/{cid}`).

use std::time::Duration;

use async_trait::async_trait;
use reqwest::{multipart, Client, StatusCode};
use serde::Deserialize;
use tracing::info;

use super::{ContentError, ContentId, ContentResult, ContentStore};

pub const DEFAULT_API_BASE_URL: &str = "https://api.pinata.cloud";
pub const DEFAULT_GATEWAY_URL: &str = "https://gateway.pinata.cloud";
const PIN_FILE_PATH: &str = "/pinning/pinFileToIPFS";
const AUTH_TEST_PATH: &str = "/data/testAuthentication";
const REQUEST_TIMEOUT: Duration = Duration::from_secs(30);

/// Credentials and endpoints for the pinning service.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PinataConfig {
    pub api_key: String,
    pub secret_api_key: String,
    pub api_base_url: String,
    pub gateway_url: String,
}

impl PinataConfig {
    pub fn new(api_key: impl Into<String>, secret_api_key: impl Into<String>) -> Self {
        Self {
            api_key: api_key.into(),
            secret_api_key: secret_api_key.into(),
            api_base_url: DEFAULT_API_BASE_URL.to_string(),
            gateway_url: DEFAULT_GATEWAY_URL.to_string(),
        }
    }

    pub fn with_gateway(mut self, gateway_url: impl Into<String>) -> Self {
        self.gateway_url = gateway_url.into();
        self
    }
}

#[derive(Debug, Deserialize)]
struct PinResponse {
    #[serde(rename = "IpfsHash")]
    ipfs_hash: String,
}

#[derive(Debug, Clone)]
pub struct PinataClient {
    config: PinataConfig,
    http: Client,
}

impl PinataClient {
    pub fn new(config: PinataConfig) -> ContentResult<Self> {
        let http = Client::builder()
            .timeout(REQUEST_TIMEOUT)
            .build()
            .map_err(|e| ContentError::Unavailable(format!("failed to build HTTP client: {e}")))?;

        Ok(Self { config, http })
    }

    fn api_url(&self, path: &str) -> String {
        format!("{}{}", self.config.api_base_url.trim_end_matches('/'), path)
    }

    fn gateway_url(&self, id: &ContentId) -> String {
        format!("{}/ipfs/{}", self.config.gateway_url.trim_end_matches('/'), id)
    }
}

#[async_trait]
impl ContentStore for PinataClient {
    async fn put_file(&self, file_name: &str, bytes: Vec<u8>) -> ContentResult<ContentId> {
        let size = bytes.len();
        let part = multipart::Part::bytes(bytes).file_name(file_name.to_string());
        let form = multipart::Form::new().part("file", part);

        let response = self
            .http
            .post(self.api_url(PIN_FILE_PATH))
            .header("pinata_api_key", &self.config.api_key)
            .header("pinata_secret_api_key", &self.config.secret_api_key)
            .multipart(form)
            .send()
            .await
            .map_err(|e| ContentError::Unavailable(format!("pin request failed: {e}")))?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            return Err(ContentError::Unavailable(format!(
                "pin request returned {status}: {body}"
            )));
        }

        let pinned: PinResponse = response
            .json()
            .await
            .map_err(|e| ContentError::InvalidResponse(format!("invalid pin response: {e}")))?;

        let id = ContentId::new(pinned.ipfs_hash);
        if id.is_empty() {
            return Err(ContentError::InvalidResponse(
                "pin response did not include IpfsHash".to_string(),
            ));
        }

        info!(content_id = %id, file_name, size, "Pinned file to IPFS");
        Ok(id)
    }

    async fn get(&self, id: &ContentId) -> ContentResult<Vec<u8>> {
        let response = self
            .http
            .get(self.gateway_url(id))
            .send()
            .await
            .map_err(|e| ContentError::Unavailable(format!("gateway request failed: {e}")))?;

        match response.status() {
            status if status.is_success() => {}
            StatusCode::NOT_FOUND | StatusCode::GONE => {
                return Err(ContentError::NotFound(id.clone()))
            }
            status => {
                return Err(ContentError::Unavailable(format!(
                    "gateway returned {status} for {id}"
                )))
            }
        }

        let bytes = response
            .bytes()
            .await
            .map_err(|e| ContentError::Unavailable(format!("gateway body read failed: {e}")))?;
        Ok(bytes.to_vec())
    }

    async fn health_check(&self) -> ContentResult<()> {
        let response = self
            .http
            .get(self.api_url(AUTH_TEST_PATH))
            .header("pinata_api_key", &self.config.api_key)
            .header("pinata_secret_api_key", &self.config.secret_api_key)
            .send()
            .await
            .map_err(|e| ContentError::Unavailable(format!("auth probe failed: {e}")))?;

        if response.status().is_success() {
            Ok(())
        } else {
            Err(ContentError::Unavailable(format!(
                "auth probe returned {}",
                response.status()
            )))
        }
    }
}
