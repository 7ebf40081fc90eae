// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Filesystem operations for the custodial key store.
//!
//! The data directory is expected to sit on an encrypted mount in production
//! deployments. This module performs plain filesystem I/O and never layers its
//! own cryptography on top of the mount.

use std::fs::{self, File, OpenOptions};
use std::io::{self, BufReader, BufWriter, Read, Write};
use std::path::Path;

use serde::{de::DeserializeOwned, Serialize};

use super::StoragePaths;

/// Error type for key store operations.
#[derive(Debug)]
pub enum StorageError {
    /// I/O error during file operations
    Io(io::Error),
    /// JSON serialization/deserialization error
    Json(serde_json::Error),
    /// Entity not found
    NotFound(String),
    /// Entity already exists
    AlreadyExists(String),
    /// `initialize()` was never called
    NotInitialized,
    /// Stored bytes did not read back as written
    IntegrityViolation(String),
    /// Caller does not own the resource
    PermissionDenied { user_id: String, resource: String },
}

impl std::fmt::Display for StorageError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            StorageError::Io(e) => write!(f, "I/O error: {e}"),
            StorageError::Json(e) => write!(f, "JSON error: {e}"),
            StorageError::NotFound(entity) => write!(f, "Not found: {entity}"),
            StorageError::AlreadyExists(entity) => write!(f, "Already exists: {entity}"),
            StorageError::NotInitialized => write!(f, "Storage not initialized"),
            StorageError::IntegrityViolation(msg) => write!(f, "Integrity violation: {msg}"),
            StorageError::PermissionDenied { user_id, resource } => {
                write!(f, "User {user_id} does not own {resource}")
            }
        }
    }
}

impl std::error::Error for StorageError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            StorageError::Io(e) => Some(e),
            StorageError::Json(e) => Some(e),
            _ => None,
        }
    }
}

impl From<io::Error> for StorageError {
    fn from(e: io::Error) -> Self {
        if e.kind() == io::ErrorKind::NotFound {
            StorageError::NotFound(e.to_string())
        } else {
            StorageError::Io(e)
        }
    }
}

impl From<serde_json::Error> for StorageError {
    fn from(e: serde_json::Error) -> Self {
        StorageError::Json(e)
    }
}

/// Result type for storage operations.
pub type StorageResult<T> = Result<T, StorageError>;

/// Key store rooted at the configured data directory.
#[derive(Debug, Clone)]
pub struct SecureStorage {
    paths: StoragePaths,
    initialized: bool,
}

impl SecureStorage {
    /// Does NOT create the directory layout. Call `initialize()` first.
    pub fn new(paths: StoragePaths) -> Self {
        Self {
            paths,
            initialized: false,
        }
    }

    pub fn paths(&self) -> &StoragePaths {
        &self.paths
    }

    pub fn is_initialized(&self) -> bool {
        self.initialized
    }

    /// Create the directory layout. Idempotent.
    pub fn initialize(&mut self) -> StorageResult<()> {
        for dir in [self.paths.wallets_dir(), self.paths.audit_dir()] {
            fs::create_dir_all(&dir)?;
        }

        self.initialized = true;
        Ok(())
    }

    /// Write, read back and remove a probe file.
    pub fn health_check(&self) -> StorageResult<()> {
        self.ensure_initialized()?;

        let probe = self.paths.root().join(".health_check");
        let expected = b"health_check_data";

        fs::write(&probe, expected)?;
        let actual = fs::read(&probe)?;
        fs::remove_file(&probe)?;

        if actual != expected {
            return Err(StorageError::IntegrityViolation(
                "Health check data mismatch".to_string(),
            ));
        }

        Ok(())
    }

    pub fn read_json<T: DeserializeOwned>(&self, path: impl AsRef<Path>) -> StorageResult<T> {
        self.ensure_initialized()?;

        let reader = BufReader::new(File::open(path.as_ref())?);
        Ok(serde_json::from_reader(reader)?)
    }

    /// Write a JSON file through a temp file and rename.
    pub fn write_json<T: Serialize>(&self, path: impl AsRef<Path>, value: &T) -> StorageResult<()> {
        self.ensure_initialized()?;

        let path = path.as_ref();
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }

        let temp_path = path.with_extension("tmp");
        {
            let mut writer = BufWriter::new(File::create(&temp_path)?);
            serde_json::to_writer_pretty(&mut writer, value)?;
            writer.flush()?;
        }

        fs::rename(&temp_path, path)?;
        Ok(())
    }

    /// Uses `File::open()` rather than `Path::exists()`; some encrypted mounts
    /// fail `stat()` on files that open and read fine.
    pub fn exists(&self, path: impl AsRef<Path>) -> bool {
        File::open(path.as_ref()).is_ok()
    }

    pub fn list_dirs(&self, dir: impl AsRef<Path>) -> StorageResult<Vec<String>> {
        self.ensure_initialized()?;

        let dir = dir.as_ref();
        if !dir.exists() {
            return Ok(Vec::new());
        }

        let mut names = Vec::new();
        for entry in fs::read_dir(dir)? {
            let entry = entry?;
            if entry.path().is_dir() {
                if let Some(name) = entry.file_name().to_str() {
                    names.push(name.to_string());
                }
            }
        }
        names.sort();
        Ok(names)
    }

    /// Write raw bytes, replacing any previous content. Used for key material.
    pub fn write_raw(&self, path: impl AsRef<Path>, data: &[u8]) -> StorageResult<()> {
        self.ensure_initialized()?;

        let path = path.as_ref();
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }

        let mut file = OpenOptions::new()
            .write(true)
            .create(true)
            .truncate(true)
            .open(path)?;
        file.write_all(data)?;
        file.flush()?;
        Ok(())
    }

    pub fn read_raw(&self, path: impl AsRef<Path>) -> StorageResult<Vec<u8>> {
        self.ensure_initialized()?;

        let mut data = Vec::new();
        File::open(path.as_ref())?.read_to_end(&mut data)?;
        Ok(data)
    }

    /// Append one line to a log file, creating it if needed.
    pub fn append_line(&self, path: impl AsRef<Path>, line: &str) -> StorageResult<()> {
        self.ensure_initialized()?;

        let path = path.as_ref();
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }

        let mut file = OpenOptions::new().create(true).append(true).open(path)?;
        file.write_all(line.as_bytes())?;
        file.write_all(b"\n")?;
        file.flush()?;
        Ok(())
    }

    pub fn create_dir(&self, path: impl AsRef<Path>) -> StorageResult<()> {
        self.ensure_initialized()?;
        fs::create_dir_all(path.as_ref())?;
        Ok(())
    }

    fn ensure_initialized(&self) -> StorageResult<()> {
        if self.initialized {
            Ok(())
        } else {
            Err(StorageError::NotInitialized)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde::{Deserialize, Serialize};
    use tempfile::TempDir;

    fn setup() -> (TempDir, SecureStorage) {
        let temp = TempDir::new().unwrap();
        let mut storage = SecureStorage::new(StoragePaths::new(temp.path()));
        storage.initialize().unwrap();
        (temp, storage)
    }

    #[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
    struct Sample {
        id: String,
        value: i32,
    }

    #[test]
    fn initialize_creates_layout() {
        let (_temp, storage) = setup();
        assert!(storage.is_initialized());
        assert!(storage.paths().wallets_dir().is_dir());
        assert!(storage.paths().audit_dir().is_dir());
    }

    #[test]
    fn json_round_trip_leaves_no_temp_file() {
        let (_temp, storage) = setup();
        let sample = Sample {
            id: "s-1".to_string(),
            value: 42,
        };

        let path = storage.paths().wallets_dir().join("w").join("meta.json");
        storage.write_json(&path, &sample).unwrap();

        let read: Sample = storage.read_json(&path).unwrap();
        assert_eq!(read, sample);
        assert!(!path.with_extension("tmp").exists());
    }

    #[test]
    fn raw_write_truncates_previous_content() {
        let (_temp, storage) = setup();
        let path = storage.paths().wallets_dir().join("w").join("key");

        storage.write_raw(&path, b"first, longer content").unwrap();
        storage.write_raw(&path, b"second").unwrap();

        assert_eq!(storage.read_raw(&path).unwrap(), b"second");
    }

    #[test]
    fn append_line_accumulates() {
        let (_temp, storage) = setup();
        let path = storage.paths().audit_dir().join("log.jsonl");

        storage.append_line(&path, "one").unwrap();
        storage.append_line(&path, "two").unwrap();

        assert_eq!(storage.read_raw(&path).unwrap(), b"one\ntwo\n");
    }

    #[test]
    fn list_dirs_is_sorted() {
        let (_temp, storage) = setup();
        for name in ["c", "a", "b"] {
            storage
                .create_dir(storage.paths().wallets_dir().join(name))
                .unwrap();
        }

        let names = storage.list_dirs(storage.paths().wallets_dir()).unwrap();
        assert_eq!(names, vec!["a", "b", "c"]);
    }

    #[test]
    fn missing_file_is_not_found() {
        let (_temp, storage) = setup();
        let err = storage
            .read_raw(storage.paths().wallets_dir().join("absent"))
            .unwrap_err();
        assert!(matches!(err, StorageError::NotFound(_)));
    }

    #[test]
    fn health_check_works() {
        let (_temp, storage) = setup();
        storage.health_check().expect("Health check should pass");
    }

    #[test]
    fn uninitialized_storage_returns_error() {
        let storage = SecureStorage::new(StoragePaths::new("/tmp/never-init"));
        let result = storage.read_json::<Sample>("/tmp/any.json");
        assert!(matches!(result, Err(StorageError::NotInitialized)));
    }
}
