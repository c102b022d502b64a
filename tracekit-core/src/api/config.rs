// SPDX-FileCopyrightText: 2026 Mattia Egloff <mattia.egloff@pm.me>
//
// SPDX-License-Identifier: GPL-3.0-or-later

//! API Configuration

use std::path::PathBuf;
use std::time::Duration;

use crate::beacon::BeaconConfig;
use crate::crypto::{PublicKey, SymmetricKey};
use crate::matching::{ExposureConfiguration, MatchingConfig};
use crate::storage::StorageQuota;

/// Database file name inside the storage directory.
pub const DATABASE_FILE: &str = "tracekit.db";

/// Configuration for a `TracingController`.
#[derive(Debug, Clone)]
pub struct TracingConfig {
    /// Directory holding the database.
    pub storage_path: PathBuf,

    /// Storage encryption key.
    /// If None, a random key is generated and stored keys are unreadable in
    /// the next session.
    pub storage_key: Option<SymmetricKey>,

    pub beacon: BeaconConfig,

    pub matching: MatchingConfig,

    /// Scoring used until the key feed delivers one.
    pub exposure: ExposureConfiguration,

    pub quota: StorageQuota,

    /// How long key uploads continue after sharing starts.
    pub sharing_window: Duration,

    /// Time between rollover/purge/expiry checks.
    pub maintenance_interval: Duration,
}

impl Default for TracingConfig {
    fn default() -> Self {
        TracingConfig {
            storage_path: PathBuf::from("./tracekit_data"),
            storage_key: None,
            beacon: BeaconConfig::default(),
            matching: MatchingConfig::default(),
            exposure: ExposureConfiguration::default(),
            quota: StorageQuota::default(),
            sharing_window: Duration::from_secs(14 * 24 * 60 * 60),
            maintenance_interval: Duration::from_secs(60 * 60),
        }
    }
}

impl TracingConfig {
    /// Creates a configuration with the given storage path.
    pub fn with_storage_path(storage_path: impl Into<PathBuf>) -> Self {
        TracingConfig {
            storage_path: storage_path.into(),
            ..Default::default()
        }
    }

    /// Path of the database file.
    pub fn database_path(&self) -> PathBuf {
        self.storage_path.join(DATABASE_FILE)
    }

    /// Sets the storage encryption key.
    pub fn with_storage_key(mut self, key: SymmetricKey) -> Self {
        self.storage_key = Some(key);
        self
    }

    pub fn with_beacon(mut self, beacon: BeaconConfig) -> Self {
        self.beacon = beacon;
        self
    }

    pub fn with_matching(mut self, matching: MatchingConfig) -> Self {
        self.matching = matching;
        self
    }

    /// Accepts diagnosis keys signed by `authority`.
    pub fn with_trusted_authority(mut self, authority: PublicKey) -> Self {
        self.matching.trusted_authorities.push(authority);
        self
    }

    pub fn with_exposure_configuration(mut self, exposure: ExposureConfiguration) -> Self {
        self.exposure = exposure;
        self
    }

    pub fn with_quota(mut self, quota: StorageQuota) -> Self {
        self.quota = quota;
        self
    }

    pub fn with_sharing_window(mut self, window: Duration) -> Self {
        self.sharing_window = window;
        self
    }

    pub fn with_maintenance_interval(mut self, interval: Duration) -> Self {
        self.maintenance_interval = interval;
        self
    }
}
