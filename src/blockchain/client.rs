// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! EVM RPC client shared by the contract-backed ledgers.

use alloy::{
    contract::Error as ContractError,
    network::Ethereum,
    providers::{DynProvider, PendingTransactionBuilder, Provider, ProviderBuilder},
    rpc::types::TransactionReceipt,
    sol_types::decode_revert_reason,
};
use tracing::{debug, info, warn};

use super::types::NetworkConfig;
use crate::ledger::{LedgerError, TxReceipt};
use crate::wallet::Session;

/// Connection to one EVM chain.
///
/// Reads go through a shared provider. Writes build a short-lived provider
/// carrying the session's signer so every transaction is signed by the
/// account the caller acts as.
#[derive(Clone)]
pub struct ChainClient {
    network: NetworkConfig,
    rpc_url: url::Url,
    provider: DynProvider,
    confirmations: u64,
}

impl ChainClient {
    pub fn new(network: NetworkConfig, rpc_url: &str) -> Result<Self, ChainClientError> {
        let rpc_url: url::Url = rpc_url
            .parse()
            .map_err(|e: url::ParseError| ChainClientError::InvalidRpcUrl(e.to_string()))?;

        let provider = ProviderBuilder::new()
            .connect_http(rpc_url.clone())
            .erased();

        Ok(Self {
            network,
            rpc_url,
            provider,
            confirmations: 1,
        })
    }

    /// Blocks to wait on top of inclusion before a write counts as final.
    pub fn with_confirmations(mut self, confirmations: u64) -> Self {
        self.confirmations = confirmations.max(1);
        self
    }

    pub fn network(&self) -> &NetworkConfig {
        &self.network
    }

    pub fn provider(&self) -> &DynProvider {
        &self.provider
    }

    /// Provider that signs with the session's key.
    pub fn signing_provider(&self, session: &Session) -> DynProvider {
        ProviderBuilder::new()
            .wallet(session.wallet())
            .connect_http(self.rpc_url.clone())
            .erased()
    }

    /// Refuse to run against a chain other than the configured one.
    pub async fn verify_chain_id(&self) -> Result<(), ChainClientError> {
        let remote = self
            .provider
            .get_chain_id()
            .await
            .map_err(|e| ChainClientError::RpcError(e.to_string()))?;

        if remote != self.network.chain_id {
            return Err(ChainClientError::WrongChain {
                expected: self.network.chain_id,
                actual: remote,
            });
        }

        info!(
            network = self.network.name,
            chain_id = remote,
            "Connected to EVM network"
        );
        Ok(())
    }

    pub async fn block_number(&self) -> Result<u64, LedgerError> {
        self.provider
            .get_block_number()
            .await
            .map_err(|e| LedgerError::Unavailable(e.to_string()))
    }

    /// Wait for a sent transaction to reach finality and require success.
    pub async fn await_finality(
        &self,
        pending: PendingTransactionBuilder<Ethereum>,
        action: &'static str,
    ) -> Result<(TxReceipt, TransactionReceipt), LedgerError> {
        let tx_hash = *pending.tx_hash();
        debug!(%tx_hash, action, "Waiting for transaction receipt");

        let receipt = pending
            .with_required_confirmations(self.confirmations)
            .get_receipt()
            .await
            .map_err(|e| LedgerError::Unavailable(format!("{action}: {e}")))?;

        if !receipt.status() {
            warn!(%tx_hash, action, "Transaction reverted");
            return Err(LedgerError::Reverted {
                reason: format!("{action} reverted"),
                tx_hash: Some(tx_hash),
            });
        }

        info!(
            %tx_hash,
            action,
            block_number = ?receipt.block_number,
            "Transaction confirmed"
        );

        let summary = TxReceipt {
            tx_hash: receipt.transaction_hash,
            block_number: receipt.block_number,
        };
        Ok((summary, receipt))
    }
}

/// Map a contract call or send failure to a ledger error.
///
/// Reverts carry their decoded reason. Anything else is a transport problem.
pub fn classify(error: ContractError, action: &'static str) -> LedgerError {
    if let Some(reason) = revert_reason(&error) {
        return LedgerError::Reverted {
            reason,
            tx_hash: None,
        };
    }

    match error {
        ContractError::TransportError(e) => LedgerError::Unavailable(format!("{action}: {e}")),
        other => LedgerError::InvalidResponse(format!("{action}: {other}")),
    }
}

/// Decoded `Error(string)` reason, if the failure was a revert.
pub fn revert_reason(error: &ContractError) -> Option<String> {
    let data = error.as_revert_data()?;
    Some(match decode_revert_reason(&data) {
        Some(reason) => reason
            .strip_prefix("revert: ")
            .map(str::to_string)
            .unwrap_or(reason),
        None => format!("reverted with data {data}"),
    })
}

/// Errors that can occur while connecting to the chain.
#[derive(Debug, thiserror::Error)]
pub enum ChainClientError {
    #[error("Invalid RPC URL: {0}")]
    InvalidRpcUrl(String),

    #[error("RPC error: {0}")]
    RpcError(String),

    #[error("RPC endpoint serves chain {actual}, expected {expected}")]
    WrongChain { expected: u64, actual: u64 },
}
