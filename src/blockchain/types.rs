// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Network constants.

/// EVM network configuration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NetworkConfig {
    /// Network name for display
    pub name: &'static str,
    /// Network segment used in `did:ethr` identifiers
    pub did_network: &'static str,
    /// Chain ID
    pub chain_id: u64,
    /// Public RPC endpoint used when `RPC_URL` is unset
    pub rpc_url: &'static str,
    /// Block explorer URL (empty for local chains)
    pub explorer_url: &'static str,
}

/// Ethereum Sepolia testnet.
pub const ETH_SEPOLIA: NetworkConfig = NetworkConfig {
    name: "Ethereum Sepolia",
    did_network: "sepolia",
    chain_id: 11155111,
    rpc_url: "https://ethereum-sepolia-rpc.publicnode.com",
    explorer_url: "https://sepolia.etherscan.io",
};

/// Ethereum mainnet.
pub const ETH_MAINNET: NetworkConfig = NetworkConfig {
    name: "Ethereum Mainnet",
    did_network: "mainnet",
    chain_id: 1,
    rpc_url: "https://ethereum-rpc.publicnode.com",
    explorer_url: "https://etherscan.io",
};

/// Local development node (anvil / hardhat).
pub const LOCAL_DEV: NetworkConfig = NetworkConfig {
    name: "Local Development",
    did_network: "dev",
    chain_id: 31337,
    rpc_url: "http://127.0.0.1:8545",
    explorer_url: "",
};

pub const SUPPORTED_NETWORKS: [NetworkConfig; 3] = [ETH_SEPOLIA, ETH_MAINNET, LOCAL_DEV];

impl NetworkConfig {
    pub fn for_chain_id(chain_id: u64) -> Option<NetworkConfig> {
        SUPPORTED_NETWORKS
            .into_iter()
            .find(|network| network.chain_id == chain_id)
    }

    /// Explorer link for a transaction, when the network has an explorer.
    pub fn tx_url(&self, tx_hash: &str) -> Option<String> {
        if self.explorer_url.is_empty() {
            None
        } else {
            Some(format!("{}/tx/{tx_hash}", self.explorer_url))
        }
    }
}

impl Default for NetworkConfig {
    fn default() -> Self {
        ETH_SEPOLIA
    }
}
