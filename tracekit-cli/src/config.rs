// SPDX-FileCopyrightText: 2026 Mattia Egloff <mattia.egloff@pm.me>
//
// SPDX-License-Identifier: GPL-3.0-or-later

//! CLI Configuration

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{Context, Result};
use tracekit_core::api::{TracingConfig, TracingController};
use tracekit_core::beacon::Radio;
use tracekit_core::crypto::PublicKey;
use tracekit_core::storage::load_or_create_key;
use tracekit_core::time::{Clock, SystemClock};
use tracekit_core::SymmetricKey;

#[cfg(feature = "secure-storage")]
use tracekit_core::storage::{PlatformKeyring, SecureStorage};

#[cfg(not(feature = "secure-storage"))]
use tracekit_core::storage::{FileKeyStorage, SecureStorage};

/// Key name used for SecureStorage.
const KEY_NAME: &str = "storage_key";

/// CLI configuration.
#[derive(Debug, Clone)]
pub struct CliConfig {
    /// Data directory for storage.
    pub data_dir: PathBuf,
    /// Authorities whose signed diagnosis keys are accepted.
    pub authorities: Vec<PublicKey>,
    /// Answer yes to every prompt.
    pub assume_yes: bool,
}

impl CliConfig {
    pub fn new(data_dir: PathBuf, authorities: &[String], assume_yes: bool) -> Result<Self> {
        let authorities = authorities
            .iter()
            .map(|hex| {
                PublicKey::from_hex(hex)
                    .with_context(|| format!("invalid authority public key '{}'", hex))
            })
            .collect::<Result<Vec<_>>>()?;

        Ok(CliConfig {
            data_dir,
            authorities,
            assume_yes,
        })
    }

    /// Directory holding the wrapped storage key.
    pub fn key_dir(&self) -> PathBuf {
        self.data_dir.join("keys")
    }

    /// Returns true once a store has been created in the data directory.
    pub fn is_initialized(&self) -> bool {
        self.tracing_config().database_path().exists()
    }

    fn secure_storage(&self) -> Box<dyn SecureStorage> {
        #[cfg(feature = "secure-storage")]
        {
            Box::new(PlatformKeyring::new("tracekit-cli"))
        }

        #[cfg(not(feature = "secure-storage"))]
        {
            // Fallback key for wrapping the storage key file
            let fallback_key = SymmetricKey::from_bytes([
                0x54, 0x72, 0x61, 0x63, 0x65, 0x6b, 0x69, 0x74, // "Tracekit"
                0x43, 0x6c, 0x69, 0x4b, 0x65, 0x79, 0x46, 0x61, // "CliKeyFa"
                0x6c, 0x6c, 0x62, 0x61, 0x63, 0x6b, 0x56, 0x31, // "llbackV1"
                0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00, // "\0\0\0\0\0\0\0\0"
            ]);
            Box::new(FileKeyStorage::new(self.key_dir(), fallback_key))
        }
    }

    /// Loads or creates the storage encryption key.
    ///
    /// When the `secure-storage` feature is enabled, uses the OS keychain.
    /// Otherwise, falls back to encrypted file storage.
    pub fn storage_key(&self) -> Result<SymmetricKey> {
        let storage = self.secure_storage();
        load_or_create_key(storage.as_ref(), KEY_NAME).context("cannot load storage key")
    }

    /// Forgets the storage key.
    pub fn delete_storage_key(&self) -> Result<()> {
        self.secure_storage()
            .delete_key(KEY_NAME)
            .context("cannot delete storage key")
    }

    /// Controller configuration for this data directory, without a key.
    pub fn tracing_config(&self) -> TracingConfig {
        self.authorities.iter().cloned().fold(
            TracingConfig::with_storage_path(&self.data_dir),
            TracingConfig::with_trusted_authority,
        )
    }

    /// Opens the controller over the on-disk store.
    pub fn open_controller(&self, radio: Arc<dyn Radio>) -> Result<TracingController> {
        let config = self.tracing_config().with_storage_key(self.storage_key()?);
        let clock: Arc<dyn Clock> = Arc::new(SystemClock);
        Ok(TracingController::new(config, radio, clock)?)
    }
}
