// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

use std::sync::Arc;
use std::time::Duration;

use axum_server::{tls_rustls::RustlsConfig, Handle};
use thiserror::Error;
use tokio::signal;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};
use tracing_subscriber::EnvFilter;

use consent_exchange_server::{
    api::router,
    auth::{AuthConfig, AuthError, JwksManager, TokenVerifier},
    blockchain::{ChainClient, ChainClientError, EvmIdentityLedger, EvmRequestLedger},
    config::{
        AppConfig, AuthSettings, ConfigError, ContentBackend, LedgerBackend, LogFormat,
        TokenSource, DEFAULT_LOG_FILTER,
    },
    content::{ContentError, ContentStore, InMemoryContentStore, PinataClient, PinataConfig},
    ledger::{IdentityLedger, InMemoryIdentityLedger, InMemoryRequestLedger, RequestLedger},
    state::AppState,
    storage::{SecureStorage, StorageError, StoragePaths},
};

/// Time allowed for in-flight requests after a shutdown signal.
const SHUTDOWN_GRACE: Duration = Duration::from_secs(10);

#[derive(Debug, Error)]
enum StartupError {
    #[error("configuration error: {0}")]
    Config(#[from] ConfigError),
    #[error("storage error: {0}")]
    Storage(#[from] StorageError),
    #[error("content store error: {0}")]
    Content(#[from] ContentError),
    #[error("chain client error: {0}")]
    Chain(#[from] ChainClientError),
    #[error("auth setup error: {0}")]
    Auth(#[from] AuthError),
    #[error("server error: {0}")]
    Server(#[from] std::io::Error),
}

#[tokio::main]
async fn main() {
    if let Err(err) = run().await {
        error!(error = %err, "consent exchange server terminated with error");
        std::process::exit(1);
    }
}

async fn run() -> Result<(), StartupError> {
    let config = AppConfig::from_env();
    init_logging(
        config
            .as_ref()
            .map(|c| c.log_format)
            .unwrap_or_default(),
    );
    let config = config?;

    // Required by axum-server's rustls acceptor; reqwest brings its own.
    if rustls::crypto::ring::default_provider()
        .install_default()
        .is_err()
    {
        debug!("rustls crypto provider already installed");
    }

    let mut storage = SecureStorage::new(StoragePaths::new(&config.data_dir));
    storage.initialize()?;
    let storage = Arc::new(storage);
    info!(data_dir = %config.data_dir.display(), "Key store initialized");

    let content: Arc<dyn ContentStore> = match &config.content {
        ContentBackend::Memory => {
            warn!("Using in-memory content store; payloads are lost on restart");
            Arc::new(InMemoryContentStore::new())
        }
        ContentBackend::Pinata {
            api_key,
            secret_api_key,
            gateway_url,
        } => {
            let mut pinata = PinataConfig::new(api_key, secret_api_key);
            if let Some(gateway) = gateway_url {
                pinata = pinata.with_gateway(gateway);
            }
            info!(gateway = %pinata.gateway_url, "Using Pinata content store");
            Arc::new(PinataClient::new(pinata)?)
        }
    };

    let (identity, requests): (Arc<dyn IdentityLedger>, Arc<dyn RequestLedger>) =
        match &config.ledger {
            LedgerBackend::Memory => {
                warn!("Using in-memory ledgers; identities and requests are lost on restart");
                (
                    Arc::new(InMemoryIdentityLedger::new()),
                    Arc::new(InMemoryRequestLedger::new()),
                )
            }
            LedgerBackend::Evm {
                network,
                rpc_url,
                confirmations,
                identity_contract,
                data_request_contract,
            } => {
                let client =
                    ChainClient::new(network.clone(), rpc_url)?.with_confirmations(*confirmations);
                client.verify_chain_id().await?;
                info!(
                    network = network.name,
                    chain_id = network.chain_id,
                    %identity_contract,
                    %data_request_contract,
                    "Connected to EVM ledgers"
                );
                (
                    Arc::new(EvmIdentityLedger::new(client.clone(), *identity_contract)),
                    Arc::new(EvmRequestLedger::new(client, *data_request_contract)),
                )
            }
        };

    let auth = auth_config(&config.auth)?;

    let state = AppState::new(
        storage,
        content,
        identity,
        requests,
        config.ledger.network(),
        auth,
    );
    let app = router(state);

    let shutdown = CancellationToken::new();
    let handle = Handle::new();
    tokio::spawn(watch_signals(shutdown.clone()));
    tokio::spawn({
        let shutdown = shutdown.clone();
        let handle = handle.clone();
        async move {
            shutdown.cancelled().await;
            info!(grace_secs = SHUTDOWN_GRACE.as_secs(), "Draining connections");
            handle.graceful_shutdown(Some(SHUTDOWN_GRACE));
        }
    });

    let addr = config.bind_addr;
    match &config.tls {
        Some(tls) => {
            let tls_config = RustlsConfig::from_pem_file(&tls.cert_path, &tls.key_path).await?;
            info!(%addr, "Consent exchange server listening on https (docs at /docs)");
            axum_server::bind_rustls(addr, tls_config)
                .handle(handle)
                .serve(app.into_make_service())
                .await?;
        }
        None => {
            info!(%addr, "Consent exchange server listening on http (docs at /docs)");
            axum_server::bind(addr)
                .handle(handle)
                .serve(app.into_make_service())
                .await?;
        }
    }

    info!("Server stopped");
    Ok(())
}

fn auth_config(settings: &AuthSettings) -> Result<AuthConfig, AuthError> {
    let verifier = match &settings.source {
        TokenSource::Jwks(url) => {
            info!(jwks_url = %url, "Verifying bearer tokens against JWKS");
            TokenVerifier::Jwks(JwksManager::new(url.as_str())?)
        }
        TokenSource::SharedSecret(secret) => {
            info!("Verifying bearer tokens with a shared HS256 secret");
            TokenVerifier::shared_secret(secret.as_bytes())
        }
        TokenSource::Unverified => {
            warn!("Bearer token signatures are NOT verified; do not run this in production");
            TokenVerifier::Unverified
        }
    };

    Ok(AuthConfig::new(verifier)
        .with_issuer(settings.issuer.clone())
        .with_audience(settings.audience.clone()))
}

fn init_logging(format: LogFormat) {
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(DEFAULT_LOG_FILTER));
    match format {
        LogFormat::Json => tracing_subscriber::fmt()
            .with_env_filter(filter)
            .json()
            .init(),
        LogFormat::Pretty => tracing_subscriber::fmt()
            .with_env_filter(filter)
            .with_target(false)
            .init(),
    }
}

/// Cancel `shutdown` on Ctrl-C or SIGTERM.
async fn watch_signals(shutdown: CancellationToken) {
    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            error!(error = %e, "Failed to listen for Ctrl-C");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut sigterm) => {
                sigterm.recv().await;
            }
            Err(e) => {
                error!(error = %e, "Failed to listen for SIGTERM");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => info!("Received Ctrl-C"),
        _ = terminate => info!("Received SIGTERM"),
    }
    shutdown.cancel();
}
