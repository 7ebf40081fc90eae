// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Path layout for the custodial key store.

use std::path::{Path, PathBuf};

/// Default data directory when `DATA_DIR` is unset.
pub const DATA_ROOT: &str = "/data";

/// Storage path utilities.
///
/// Wallet directories are keyed by the lowercase hex address, so lookups
/// are insensitive to EIP-55 checksum casing.
#[derive(Debug, Clone)]
pub struct StoragePaths {
    root: PathBuf,
}

impl Default for StoragePaths {
    fn default() -> Self {
        Self::new(DATA_ROOT)
    }
}

impl StoragePaths {
    pub fn new(root: impl AsRef<Path>) -> Self {
        Self {
            root: root.as_ref().to_path_buf(),
        }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    // ========== Wallet Paths ==========

    pub fn wallets_dir(&self) -> PathBuf {
        self.root.join("wallets")
    }

    pub fn wallet_dir(&self, address: &str) -> PathBuf {
        self.wallets_dir().join(address.to_ascii_lowercase())
    }

    /// Wallet metadata (label, status, public encryption key).
    pub fn wallet_meta(&self, address: &str) -> PathBuf {
        self.wallet_dir(address).join("meta.json")
    }

    /// secp256k1 signing key, PKCS#8 PEM.
    pub fn wallet_signing_key(&self, address: &str) -> PathBuf {
        self.wallet_dir(address).join("signing_key.pem")
    }

    /// X25519 decryption secret, raw 32 bytes.
    pub fn wallet_encryption_key(&self, address: &str) -> PathBuf {
        self.wallet_dir(address).join("encryption.key")
    }

    // ========== Audit Log Paths ==========

    pub fn audit_dir(&self) -> PathBuf {
        self.root.join("audit")
    }

    pub fn audit_date_dir(&self, date: &str) -> PathBuf {
        self.audit_dir().join(date)
    }

    /// Daily audit events file (JSONL).
    pub fn audit_events_file(&self, date: &str) -> PathBuf {
        self.audit_date_dir(date).join("events.jsonl")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_paths_use_data_root() {
        let paths = StoragePaths::default();
        assert_eq!(paths.root(), Path::new("/data"));
    }

    #[test]
    fn wallet_paths_are_lowercased() {
        let paths = StoragePaths::new("/srv/consent");
        let address = "0xAbC0000000000000000000000000000000000001";
        assert_eq!(
            paths.wallet_dir(address),
            PathBuf::from("/srv/consent/wallets/0xabc0000000000000000000000000000000000001")
        );
        assert_eq!(
            paths.wallet_signing_key(address),
            paths.wallet_dir(address).join("signing_key.pem")
        );
        assert_eq!(
            paths.wallet_encryption_key(address),
            paths.wallet_dir(address).join("encryption.key")
        );
    }

    #[test]
    fn audit_paths_are_correct() {
        let paths = StoragePaths::new("/srv/consent");
        assert_eq!(
            paths.audit_events_file("2026-10-18"),
            PathBuf::from("/srv/consent/audit/2026-10-18/events.jsonl")
        );
    }
}
