// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! # Runtime Configuration
//!
//! This module defines environment variable names and default values used
//! throughout the application. Configuration is loaded from the environment
//! once at startup by [`AppConfig::from_env`].
//!
//! ## Environment Variables
//!
//! | Variable | Description | Default |
//! |----------|-------------|---------|
//! | `HOST` | Server bind address | `0.0.0.0` |
//! | `PORT` | Server bind port | `8080` |
//! | `DATA_DIR` | Root directory for wallet keys and audit logs | `/data` |
//! | `LOG_FORMAT` | Logging format (`json` or `pretty`) | `pretty` |
//! | `RUST_LOG` | Log level filter | `info,tower_http=debug` |
//! | `LEDGER_BACKEND` | `memory` or `evm` | `memory` |
//! | `CONTENT_BACKEND` | `memory` or `pinata` | `memory` |
//! | `CHAIN_ID` | Expected EVM chain id | `11155111` (Sepolia) |
//! | `RPC_URL` | EVM JSON-RPC endpoint | Network default |
//! | `CONFIRMATIONS` | Blocks to wait after inclusion | `1` |
//! | `IDENTITY_CONTRACT` | Identity registry address | Required for `evm` |
//! | `DATA_REQUEST_CONTRACT` | Data request registry address | Required for `evm` |
//! | `PINATA_API_KEY` | Pinata API key | Required for `pinata` |
//! | `PINATA_SECRET_API_KEY` | Pinata secret key | Required for `pinata` |
//! | `PINATA_GATEWAY_URL` | IPFS gateway for reads | Pinata public gateway |
//! | `TLS_CERT_PATH` | PEM certificate chain | Plain HTTP when unset |
//! | `TLS_KEY_PATH` | PEM private key | Plain HTTP when unset |
//! | `AUTH_JWKS_URL` | HTTPS JWKS endpoint for bearer tokens | One auth source required |
//! | `AUTH_JWT_SECRET` | HS256 secret, at least 32 bytes | One auth source required |
//! | `AUTH_ALLOW_UNVERIFIED` | Accept unsigned tokens (development only) | `false` |
//! | `AUTH_ISSUER` | Required `iss` claim | Not checked |
//! | `AUTH_AUDIENCE` | Required `aud` claim | Not checked |

use std::net::SocketAddr;
use std::path::PathBuf;
use std::str::FromStr;

use alloy::primitives::Address;

use crate::blockchain::{NetworkConfig, LOCAL_DEV};
use crate::storage::paths::DATA_ROOT;

pub const HOST_ENV: &str = "HOST";
pub const PORT_ENV: &str = "PORT";

/// Environment variable name for the data directory path.
///
/// All wallet keys and audit logs are stored here. Mount it on an encrypted
/// volume in production.
pub const DATA_DIR_ENV: &str = "DATA_DIR";

pub const LOG_FORMAT_ENV: &str = "LOG_FORMAT";
pub const LEDGER_BACKEND_ENV: &str = "LEDGER_BACKEND";
pub const CONTENT_BACKEND_ENV: &str = "CONTENT_BACKEND";
pub const CHAIN_ID_ENV: &str = "CHAIN_ID";
pub const RPC_URL_ENV: &str = "RPC_URL";
pub const CONFIRMATIONS_ENV: &str = "CONFIRMATIONS";
pub const IDENTITY_CONTRACT_ENV: &str = "IDENTITY_CONTRACT";
pub const DATA_REQUEST_CONTRACT_ENV: &str = "DATA_REQUEST_CONTRACT";
pub const PINATA_API_KEY_ENV: &str = "PINATA_API_KEY";
pub const PINATA_SECRET_API_KEY_ENV: &str = "PINATA_SECRET_API_KEY";
pub const PINATA_GATEWAY_URL_ENV: &str = "PINATA_GATEWAY_URL";
pub const TLS_CERT_PATH_ENV: &str = "TLS_CERT_PATH";
pub const TLS_KEY_PATH_ENV: &str = "TLS_KEY_PATH";
pub const AUTH_JWKS_URL_ENV: &str = "AUTH_JWKS_URL";
pub const AUTH_JWT_SECRET_ENV: &str = "AUTH_JWT_SECRET";
pub const AUTH_ALLOW_UNVERIFIED_ENV: &str = "AUTH_ALLOW_UNVERIFIED";
pub const AUTH_ISSUER_ENV: &str = "AUTH_ISSUER";
pub const AUTH_AUDIENCE_ENV: &str = "AUTH_AUDIENCE";

pub const DEFAULT_HOST: &str = "0.0.0.0";
pub const DEFAULT_PORT: u16 = 8080;
pub const DEFAULT_LOG_FILTER: &str = "info,tower_http=debug";
pub const DEFAULT_CONFIRMATIONS: u64 = 1;

/// Shortest accepted HS256 secret.
pub const MIN_JWT_SECRET_BYTES: usize = 32;

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("{name} has invalid value {value:?}: {reason}")]
    Invalid {
        name: &'static str,
        value: String,
        reason: String,
    },

    #[error("{0} is required by the selected backend")]
    Missing(&'static str),

    #[error("Chain id {0} is not supported")]
    UnsupportedChain(u64),

    #[error("TLS_CERT_PATH and TLS_KEY_PATH must be set together")]
    IncompleteTls,

    #[error("No token verification configured: set AUTH_JWKS_URL or AUTH_JWT_SECRET")]
    MissingAuth,

    #[error("AUTH_JWKS_URL and AUTH_JWT_SECRET are mutually exclusive")]
    ConflictingAuth,
}

/// Log output format.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum LogFormat {
    #[default]
    Pretty,
    Json,
}

impl FromStr for LogFormat {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "pretty" => Ok(LogFormat::Pretty),
            "json" => Ok(LogFormat::Json),
            _ => Err("expected `json` or `pretty`".to_string()),
        }
    }
}

/// Identity and request ledger settings.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LedgerBackend {
    /// Process-local ledgers. Nothing survives a restart.
    Memory,
    Evm {
        network: NetworkConfig,
        rpc_url: String,
        confirmations: u64,
        identity_contract: Address,
        data_request_contract: Address,
    },
}

impl LedgerBackend {
    /// Network used for DIDs and explorer links.
    pub fn network(&self) -> NetworkConfig {
        match self {
            LedgerBackend::Memory => LOCAL_DEV,
            LedgerBackend::Evm { network, .. } => network.clone(),
        }
    }
}

/// Content store settings.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ContentBackend {
    Memory,
    Pinata {
        api_key: String,
        secret_api_key: String,
        gateway_url: Option<String>,
    },
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TlsConfig {
    pub cert_path: PathBuf,
    pub key_path: PathBuf,
}

/// Where bearer token signatures are checked.
#[derive(Clone, PartialEq, Eq)]
pub enum TokenSource {
    Jwks(String),
    SharedSecret(String),
    Unverified,
}

impl std::fmt::Debug for TokenSource {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            TokenSource::Jwks(url) => f.debug_tuple("Jwks").field(url).finish(),
            TokenSource::SharedSecret(_) => f.write_str("SharedSecret(<redacted>)"),
            TokenSource::Unverified => f.write_str("Unverified"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AuthSettings {
    pub source: TokenSource,
    pub issuer: Option<String>,
    pub audience: Option<String>,
}

/// Validated startup configuration.
#[derive(Debug, Clone)]
pub struct AppConfig {
    pub bind_addr: SocketAddr,
    pub data_dir: PathBuf,
    pub log_format: LogFormat,
    pub ledger: LedgerBackend,
    pub content: ContentBackend,
    pub tls: Option<TlsConfig>,
    pub auth: AuthSettings,
}

impl AppConfig {
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    /// Build the configuration from an arbitrary variable source.
    ///
    /// Empty values are treated as unset.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |name: &str| {
            lookup(name)
                .map(|v| v.trim().to_string())
                .filter(|v| !v.is_empty())
        };

        let host = get(HOST_ENV).unwrap_or_else(|| DEFAULT_HOST.to_string());
        let port = match get(PORT_ENV) {
            Some(raw) => parse(PORT_ENV, &raw)?,
            None => DEFAULT_PORT,
        };
        let bind_addr = format!("{host}:{port}")
            .parse::<SocketAddr>()
            .map_err(|e| invalid(HOST_ENV, &host, e))?;

        let data_dir = PathBuf::from(get(DATA_DIR_ENV).unwrap_or_else(|| DATA_ROOT.to_string()));

        let log_format = match get(LOG_FORMAT_ENV) {
            Some(raw) => parse(LOG_FORMAT_ENV, &raw)?,
            None => LogFormat::default(),
        };

        let ledger = match get(LEDGER_BACKEND_ENV).as_deref() {
            None | Some("memory") => LedgerBackend::Memory,
            Some("evm") => {
                let chain_id = match get(CHAIN_ID_ENV) {
                    Some(raw) => parse(CHAIN_ID_ENV, &raw)?,
                    None => NetworkConfig::default().chain_id,
                };
                let network = NetworkConfig::for_chain_id(chain_id)
                    .ok_or(ConfigError::UnsupportedChain(chain_id))?;
                let rpc_url = get(RPC_URL_ENV).unwrap_or_else(|| network.rpc_url.to_string());
                let confirmations = match get(CONFIRMATIONS_ENV) {
                    Some(raw) => parse(CONFIRMATIONS_ENV, &raw)?,
                    None => DEFAULT_CONFIRMATIONS,
                };
                let identity_contract = required(&get, IDENTITY_CONTRACT_ENV)?;
                let data_request_contract = required(&get, DATA_REQUEST_CONTRACT_ENV)?;

                LedgerBackend::Evm {
                    network,
                    rpc_url,
                    confirmations,
                    identity_contract: parse(IDENTITY_CONTRACT_ENV, &identity_contract)?,
                    data_request_contract: parse(
                        DATA_REQUEST_CONTRACT_ENV,
                        &data_request_contract,
                    )?,
                }
            }
            Some(other) => {
                return Err(invalid(LEDGER_BACKEND_ENV, other, "expected `memory` or `evm`"))
            }
        };

        let content = match get(CONTENT_BACKEND_ENV).as_deref() {
            None | Some("memory") => ContentBackend::Memory,
            Some("pinata") => ContentBackend::Pinata {
                api_key: required(&get, PINATA_API_KEY_ENV)?,
                secret_api_key: required(&get, PINATA_SECRET_API_KEY_ENV)?,
                gateway_url: get(PINATA_GATEWAY_URL_ENV),
            },
            Some(other) => {
                return Err(invalid(
                    CONTENT_BACKEND_ENV,
                    other,
                    "expected `memory` or `pinata`",
                ))
            }
        };

        let tls = match (get(TLS_CERT_PATH_ENV), get(TLS_KEY_PATH_ENV)) {
            (Some(cert), Some(key)) => Some(TlsConfig {
                cert_path: PathBuf::from(cert),
                key_path: PathBuf::from(key),
            }),
            (None, None) => None,
            _ => return Err(ConfigError::IncompleteTls),
        };

        let allow_unverified = match get(AUTH_ALLOW_UNVERIFIED_ENV) {
            Some(raw) => parse(AUTH_ALLOW_UNVERIFIED_ENV, &raw)?,
            None => false,
        };
        let source = match (get(AUTH_JWKS_URL_ENV), get(AUTH_JWT_SECRET_ENV)) {
            (Some(_), Some(_)) => return Err(ConfigError::ConflictingAuth),
            (Some(url), None) => {
                if !url.starts_with("https://") {
                    return Err(invalid(AUTH_JWKS_URL_ENV, &url, "must be an https:// URL"));
                }
                TokenSource::Jwks(url)
            }
            (None, Some(secret)) => {
                if secret.len() < MIN_JWT_SECRET_BYTES {
                    return Err(invalid(
                        AUTH_JWT_SECRET_ENV,
                        "<redacted>",
                        format!("must be at least {MIN_JWT_SECRET_BYTES} bytes"),
                    ));
                }
                TokenSource::SharedSecret(secret)
            }
            (None, None) if allow_unverified => TokenSource::Unverified,
            (None, None) => return Err(ConfigError::MissingAuth),
        };
        let auth = AuthSettings {
            source,
            issuer: get(AUTH_ISSUER_ENV),
            audience: get(AUTH_AUDIENCE_ENV),
        };

        Ok(Self {
            bind_addr,
            data_dir,
            log_format,
            ledger,
            content,
            tls,
            auth,
        })
    }
}

fn required(get: &impl Fn(&str) -> Option<String>, name: &'static str) -> Result<String, ConfigError> {
    get(name).ok_or(ConfigError::Missing(name))
}

fn parse<T>(name: &'static str, raw: &str) -> Result<T, ConfigError>
where
    T: FromStr,
    T::Err: std::fmt::Display,
{
    raw.parse().map_err(|e| invalid(name, raw, e))
}

fn invalid(name: &'static str, value: &str, reason: impl std::fmt::Display) -> ConfigError {
    ConfigError::Invalid {
        name,
        value: value.to_string(),
        reason: reason.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    const SECRET: &str = "an-hs256-secret-of-at-least-32-bytes";

    fn raw_config(vars: &[(&str, &str)]) -> Result<AppConfig, ConfigError> {
        let vars: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        AppConfig::from_lookup(|name| vars.get(name).cloned())
    }

    /// `vars` plus a shared-secret auth source.
    fn config(vars: &[(&str, &str)]) -> Result<AppConfig, ConfigError> {
        let mut vars = vars.to_vec();
        vars.push((AUTH_JWT_SECRET_ENV, SECRET));
        raw_config(&vars)
    }

    #[test]
    fn defaults_use_memory_backends() {
        let cfg = config(&[]).unwrap();
        assert_eq!(cfg.bind_addr, "0.0.0.0:8080".parse().unwrap());
        assert_eq!(cfg.data_dir, PathBuf::from("/data"));
        assert_eq!(cfg.log_format, LogFormat::Pretty);
        assert_eq!(cfg.ledger, LedgerBackend::Memory);
        assert_eq!(cfg.content, ContentBackend::Memory);
        assert!(cfg.tls.is_none());
    }

    #[test]
    fn evm_backend_requires_contracts() {
        let err = config(&[("LEDGER_BACKEND", "evm")]).unwrap_err();
        assert!(matches!(err, ConfigError::Missing(IDENTITY_CONTRACT_ENV)));
    }

    #[test]
    fn evm_backend_defaults_to_sepolia() {
        let cfg = config(&[
            ("LEDGER_BACKEND", "evm"),
            ("IDENTITY_CONTRACT", "0x1111111111111111111111111111111111111111"),
            ("DATA_REQUEST_CONTRACT", "0x2222222222222222222222222222222222222222"),
        ])
        .unwrap();

        match cfg.ledger {
            LedgerBackend::Evm {
                network,
                rpc_url,
                confirmations,
                ..
            } => {
                assert_eq!(network.chain_id, 11155111);
                assert_eq!(rpc_url, network.rpc_url);
                assert_eq!(confirmations, DEFAULT_CONFIRMATIONS);
            }
            other => panic!("unexpected backend {other:?}"),
        }
    }

    #[test]
    fn unsupported_chain_is_rejected() {
        let err = config(&[
            ("LEDGER_BACKEND", "evm"),
            ("CHAIN_ID", "137"),
            ("IDENTITY_CONTRACT", "0x1111111111111111111111111111111111111111"),
            ("DATA_REQUEST_CONTRACT", "0x2222222222222222222222222222222222222222"),
        ])
        .unwrap_err();
        assert!(matches!(err, ConfigError::UnsupportedChain(137)));
    }

    #[test]
    fn invalid_values_name_the_variable() {
        let err = config(&[("PORT", "eighty")]).unwrap_err();
        assert!(err.to_string().contains("PORT"));

        let err = config(&[("CONTENT_BACKEND", "s3")]).unwrap_err();
        assert!(err.to_string().contains("CONTENT_BACKEND"));

        let err = config(&[("LOG_FORMAT", "xml")]).unwrap_err();
        assert!(err.to_string().contains("LOG_FORMAT"));
    }

    #[test]
    fn pinata_backend_reads_credentials() {
        let cfg = config(&[
            ("CONTENT_BACKEND", "pinata"),
            ("PINATA_API_KEY", "key"),
            ("PINATA_SECRET_API_KEY", "secret"),
        ])
        .unwrap();
        assert_eq!(
            cfg.content,
            ContentBackend::Pinata {
                api_key: "key".to_string(),
                secret_api_key: "secret".to_string(),
                gateway_url: None,
            }
        );
    }

    #[test]
    fn tls_paths_must_be_paired() {
        let err = config(&[("TLS_CERT_PATH", "/certs/cert.pem")]).unwrap_err();
        assert!(matches!(err, ConfigError::IncompleteTls));

        let cfg = config(&[
            ("TLS_CERT_PATH", "/certs/cert.pem"),
            ("TLS_KEY_PATH", "/certs/key.pem"),
        ])
        .unwrap();
        assert!(cfg.tls.is_some());
    }

    #[test]
    fn blank_values_fall_back_to_defaults() {
        let cfg = config(&[("PORT", "  "), ("HOST", "")]).unwrap();
        assert_eq!(cfg.bind_addr.port(), DEFAULT_PORT);
    }

    #[test]
    fn auth_source_is_required() {
        let err = raw_config(&[]).unwrap_err();
        assert!(matches!(err, ConfigError::MissingAuth));

        let cfg = raw_config(&[("AUTH_ALLOW_UNVERIFIED", "true")]).unwrap();
        assert_eq!(cfg.auth.source, TokenSource::Unverified);

        let err = raw_config(&[("AUTH_ALLOW_UNVERIFIED", "yes")]).unwrap_err();
        assert!(err.to_string().contains("AUTH_ALLOW_UNVERIFIED"));
    }

    #[test]
    fn jwks_url_must_be_https() {
        let err = raw_config(&[("AUTH_JWKS_URL", "http://issuer.example/jwks")]).unwrap_err();
        assert!(err.to_string().contains("AUTH_JWKS_URL"));

        let cfg = raw_config(&[
            ("AUTH_JWKS_URL", "https://issuer.example/.well-known/jwks.json"),
            ("AUTH_ISSUER", "https://issuer.example"),
        ])
        .unwrap();
        assert_eq!(
            cfg.auth.source,
            TokenSource::Jwks("https://issuer.example/.well-known/jwks.json".to_string())
        );
        assert_eq!(cfg.auth.issuer.as_deref(), Some("https://issuer.example"));
        assert!(cfg.auth.audience.is_none());

        let err = config(&[("AUTH_JWKS_URL", "https://issuer.example/jwks")]).unwrap_err();
        assert!(matches!(err, ConfigError::ConflictingAuth));
    }

    #[test]
    fn short_secret_is_rejected_without_echoing_it() {
        let err = raw_config(&[("AUTH_JWT_SECRET", "hunter2")]).unwrap_err();
        let message = err.to_string();
        assert!(message.contains("AUTH_JWT_SECRET"));
        assert!(!message.contains("hunter2"));

        let cfg = config(&[]).unwrap();
        assert!(!format!("{cfg:?}").contains(SECRET));
    }
}
