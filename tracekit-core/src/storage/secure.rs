// SPDX-FileCopyrightText: 2026 Mattia Egloff <mattia.egloff@pm.me>
//
// SPDX-License-Identifier: GPL-3.0-or-later

//! Secure Storage Module
//!
//! Holds the key that encrypts daily tracing keys at rest. Uses the OS
//! keychain when the `secure-storage` feature is enabled, with a fallback to
//! encrypted key files.

use std::io::ErrorKind;
use std::path::{Path, PathBuf};

use tracing::info;

use crate::crypto::{decrypt_with_context, encrypt_with_context, SymmetricKey};
use crate::storage::StorageError;

/// Trait for secure storage of cryptographic keys.
pub trait SecureStorage: Send + Sync {
    /// Saves a key to secure storage.
    fn save_key(&self, name: &str, key: &[u8]) -> Result<(), StorageError>;

    /// Loads a key from secure storage.
    /// Returns None if the key doesn't exist.
    fn load_key(&self, name: &str) -> Result<Option<Vec<u8>>, StorageError>;

    /// Deletes a key from secure storage.
    fn delete_key(&self, name: &str) -> Result<(), StorageError>;

    /// Checks if a key exists in secure storage.
    fn has_key(&self, name: &str) -> Result<bool, StorageError> {
        Ok(self.load_key(name)?.is_some())
    }
}

/// Loads the symmetric key stored under `name`, generating and saving a new
/// one on first use.
pub fn load_or_create_key(
    storage: &dyn SecureStorage,
    name: &str,
) -> Result<SymmetricKey, StorageError> {
    match storage.load_key(name)? {
        Some(bytes) => {
            let arr: [u8; 32] = bytes.as_slice().try_into().map_err(|_| {
                StorageError::Encryption(format!(
                    "stored key '{}' has invalid length {}",
                    name,
                    bytes.len()
                ))
            })?;
            Ok(SymmetricKey::from_bytes(arr))
        }
        None => {
            let key = SymmetricKey::generate().map_err(|e| StorageError::Encryption(e.to_string()))?;
            storage.save_key(name, key.as_bytes())?;
            info!(name, "created storage key");
            Ok(key)
        }
    }
}

/// Platform keyring implementation using the `keyring` crate.
#[cfg(feature = "secure-storage")]
pub struct PlatformKeyring {
    service: String,
}

#[cfg(feature = "secure-storage")]
impl PlatformKeyring {
    /// Creates a keyring accessor for entries under `service` (e.g. "tracekit").
    pub fn new(service: impl Into<String>) -> Self {
        Self {
            service: service.into(),
        }
    }

    fn entry(&self, name: &str) -> Result<keyring::Entry, StorageError> {
        keyring::Entry::new(&self.service, name)
            .map_err(|e| StorageError::Encryption(format!("Keyring error: {}", e)))
    }
}

#[cfg(feature = "secure-storage")]
impl SecureStorage for PlatformKeyring {
    fn save_key(&self, name: &str, key: &[u8]) -> Result<(), StorageError> {
        self.entry(name)?
            .set_secret(key)
            .map_err(|e| StorageError::Encryption(format!("Failed to save to keychain: {}", e)))
    }

    fn load_key(&self, name: &str) -> Result<Option<Vec<u8>>, StorageError> {
        match self.entry(name)?.get_secret() {
            Ok(secret) => Ok(Some(secret)),
            Err(keyring::Error::NoEntry) => Ok(None),
            Err(e) => Err(StorageError::Encryption(format!(
                "Failed to load from keychain: {}",
                e
            ))),
        }
    }

    fn delete_key(&self, name: &str) -> Result<(), StorageError> {
        match self.entry(name)?.delete_credential() {
            Ok(()) | Err(keyring::Error::NoEntry) => Ok(()),
            Err(e) => Err(StorageError::Encryption(format!(
                "Failed to delete from keychain: {}",
                e
            ))),
        }
    }
}

/// Key files under a directory, each wrapped with a fixed key.
///
/// Used when no OS keychain is available. A file is bound to its name, so
/// renaming `a.key` to `b.key` makes it unreadable.
pub struct FileKeyStorage {
    dir: PathBuf,
    wrapping_key: SymmetricKey,
}

fn io_error(action: &str, path: &Path, err: std::io::Error) -> StorageError {
    StorageError::Encryption(format!("cannot {} {}: {}", action, path.display(), err))
}

impl FileKeyStorage {
    pub fn new(dir: PathBuf, wrapping_key: SymmetricKey) -> Self {
        FileKeyStorage { dir, wrapping_key }
    }

    /// `<dir>/<name>.key`, with every character outside `[A-Za-z0-9_]`
    /// replaced so names cannot leave the directory.
    fn file_for(&self, name: &str) -> PathBuf {
        let stem: String = name
            .chars()
            .map(|c| if c.is_ascii_alphanumeric() || c == '_' { c } else { '_' })
            .collect();
        self.dir.join(stem + ".key")
    }
}

impl SecureStorage for FileKeyStorage {
    fn save_key(&self, name: &str, key: &[u8]) -> Result<(), StorageError> {
        std::fs::create_dir_all(&self.dir).map_err(|e| io_error("create", &self.dir, e))?;
        let sealed = encrypt_with_context(&self.wrapping_key, key, name.as_bytes())
            .map_err(|e| StorageError::Encryption(e.to_string()))?;
        let path = self.file_for(name);
        std::fs::write(&path, sealed).map_err(|e| io_error("write", &path, e))
    }

    fn load_key(&self, name: &str) -> Result<Option<Vec<u8>>, StorageError> {
        let path = self.file_for(name);
        let sealed = match std::fs::read(&path) {
            Ok(bytes) => bytes,
            Err(e) if e.kind() == ErrorKind::NotFound => return Ok(None),
            Err(e) => return Err(io_error("read", &path, e)),
        };
        decrypt_with_context(&self.wrapping_key, &sealed, name.as_bytes())
            .map(Some)
            .map_err(|e| StorageError::Encryption(format!("{}: {}", path.display(), e)))
    }

    fn delete_key(&self, name: &str) -> Result<(), StorageError> {
        let path = self.file_for(name);
        match std::fs::remove_file(&path) {
            Err(e) if e.kind() != ErrorKind::NotFound => Err(io_error("delete", &path, e)),
            _ => Ok(()),
        }
    }
}

// INLINE_TEST_REQUIRED: MemoryKeyStorage is a test-only implementation of the SecureStorage trait
#[cfg(test)]
#[derive(Default)]
pub struct MemoryKeyStorage {
    keys: parking_lot::Mutex<std::collections::HashMap<String, Vec<u8>>>,
}

#[cfg(test)]
impl SecureStorage for MemoryKeyStorage {
    fn save_key(&self, name: &str, key: &[u8]) -> Result<(), StorageError> {
        self.keys.lock().insert(name.to_string(), key.to_vec());
        Ok(())
    }

    fn load_key(&self, name: &str) -> Result<Option<Vec<u8>>, StorageError> {
        Ok(self.keys.lock().get(name).cloned())
    }

    fn delete_key(&self, name: &str) -> Result<(), StorageError> {
        self.keys.lock().remove(name);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn file_storage(dir: &TempDir) -> FileKeyStorage {
        FileKeyStorage::new(
            dir.path().to_path_buf(),
            SymmetricKey::from_bytes([0x11; 32]),
        )
    }

    #[test]
    fn test_load_or_create_is_stable() {
        let storage = MemoryKeyStorage::default();
        let first = load_or_create_key(&storage, "storage_key").unwrap();
        let second = load_or_create_key(&storage, "storage_key").unwrap();
        assert_eq!(first.as_bytes(), second.as_bytes());
    }

    #[test]
    fn test_load_or_create_rejects_wrong_length() {
        let storage = MemoryKeyStorage::default();
        storage.save_key("storage_key", &[1, 2, 3]).unwrap();
        assert!(load_or_create_key(&storage, "storage_key").is_err());
    }

    #[test]
    fn test_file_storage_roundtrip_and_delete() {
        let dir = TempDir::new().unwrap();
        let storage = file_storage(&dir);

        storage.save_key("storage_key", &[0xAB; 32]).unwrap();
        assert_eq!(storage.load_key("storage_key").unwrap(), Some(vec![0xAB; 32]));

        storage.delete_key("storage_key").unwrap();
        assert!(!storage.has_key("storage_key").unwrap());
    }

    #[test]
    fn test_file_storage_is_encrypted() {
        let dir = TempDir::new().unwrap();
        let storage = file_storage(&dir);

        let secret = vec![0x42; 32];
        storage.save_key("secret", &secret).unwrap();

        let on_disk = std::fs::read(dir.path().join("secret.key")).unwrap();
        assert_ne!(on_disk, secret);
        assert!(on_disk.len() > secret.len());
    }

    #[test]
    fn test_file_storage_wrong_wrapping_key_fails() {
        let dir = TempDir::new().unwrap();
        file_storage(&dir).save_key("k", &[1, 2, 3]).unwrap();

        let other = FileKeyStorage::new(
            dir.path().to_path_buf(),
            SymmetricKey::from_bytes([0x22; 32]),
        );
        assert!(other.load_key("k").is_err());
    }

    #[test]
    fn test_renamed_key_file_is_rejected() {
        let dir = TempDir::new().unwrap();
        let storage = file_storage(&dir);
        storage.save_key("a", &[9; 32]).unwrap();
        std::fs::rename(dir.path().join("a.key"), dir.path().join("b.key")).unwrap();

        assert!(storage.load_key("b").is_err());
        assert_eq!(storage.load_key("a").unwrap(), None);
        storage.delete_key("a").unwrap();
    }

    #[test]
    fn test_file_storage_path_traversal_prevented() {
        let dir = TempDir::new().unwrap();
        let storage = file_storage(&dir);

        storage.save_key("../../../etc/passwd", &[1, 2, 3]).unwrap();
        assert!(dir.path().join("_________etc_passwd.key").exists());
    }
}
