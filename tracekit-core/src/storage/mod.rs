// SPDX-FileCopyrightText: 2026 Mattia Egloff <mattia.egloff@pm.me>
//
// SPDX-License-Identifier: GPL-3.0-or-later

//! Persistent Storage Module
//!
//! The KeyStore: an append-only ledger of the device's own daily tracing keys,
//! the observations heard from nearby devices, and the exposure records
//! computed from them. Uses SQLite with application-level encryption for key
//! material.
//!
//! The store is the only mutable state shared between the beacon, the matcher
//! and the controller. Callers share it as `Arc<Mutex<KeyStore>>`, so every
//! read under the lock sees a consistent snapshot.

mod consent;
mod error;
mod exposures;
mod keys;
mod observations;
mod settings;

pub mod migration;
pub mod secure;

pub use consent::{AuditEntry, ConsentDecision};
pub use error::StorageError;
pub use exposures::{ExposureRecord, FoldOutcome, MatchFold, RetractOutcome};
pub use observations::{ObservationWrite, ProximityObservation};
pub use secure::{load_or_create_key, FileKeyStorage, SecureStorage};

#[cfg(feature = "secure-storage")]
pub use secure::PlatformKeyring;

use std::path::Path;
use std::sync::Arc;

use rusqlite::Connection;
use tracing::{debug, info};

use crate::crypto::SymmetricKey;
use crate::time::{Clock, DayNumber};

/// Days a key, observation or folded match is kept before being purged.
pub const RETENTION_DAYS: u32 = 14;

/// Upper bounds on the rows the store will accept.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StorageQuota {
    /// Maximum number of stored observations.
    pub max_observations: usize,
    /// Maximum number of stored daily keys.
    pub max_keys: usize,
}

impl Default for StorageQuota {
    fn default() -> Self {
        StorageQuota {
            max_observations: 100_000,
            max_keys: 64,
        }
    }
}

/// Rows removed by a purge.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct PurgeReport {
    pub keys: usize,
    pub observations: usize,
    pub folded_matches: usize,
}

/// SQLite-backed key and observation store.
pub struct KeyStore {
    conn: Connection,
    encryption_key: SymmetricKey,
    clock: Arc<dyn Clock>,
    quota: StorageQuota,
}

impl KeyStore {
    /// Opens or creates a store at the given path.
    pub fn open<P: AsRef<Path>>(
        path: P,
        encryption_key: SymmetricKey,
        clock: Arc<dyn Clock>,
    ) -> Result<Self, StorageError> {
        let conn = Connection::open(path)?;
        Self::from_connection(conn, encryption_key, clock)
    }

    /// Creates an in-memory store (for testing).
    pub fn in_memory(
        encryption_key: SymmetricKey,
        clock: Arc<dyn Clock>,
    ) -> Result<Self, StorageError> {
        let conn = Connection::open_in_memory()?;
        Self::from_connection(conn, encryption_key, clock)
    }

    fn from_connection(
        conn: Connection,
        encryption_key: SymmetricKey,
        clock: Arc<dyn Clock>,
    ) -> Result<Self, StorageError> {
        let store = KeyStore {
            conn,
            encryption_key,
            clock,
            quota: StorageQuota::default(),
        };
        store.run_migrations()?;
        Ok(store)
    }

    /// Replaces the row quota.
    pub fn with_quota(mut self, quota: StorageQuota) -> Self {
        self.quota = quota;
        self
    }

    /// Returns the active row quota.
    pub fn quota(&self) -> StorageQuota {
        self.quota
    }

    fn run_migrations(&self) -> Result<(), StorageError> {
        let migrations = migration::all_migrations();
        migration::MigrationRunner::run(&self.conn, &migrations, self.clock.now())?;
        Ok(())
    }

    /// Returns the current schema version.
    pub fn schema_version(&self) -> Result<u32, StorageError> {
        migration::MigrationRunner::current_version(&self.conn)
    }

    /// Current unix time according to the store's clock.
    pub(crate) fn now(&self) -> u64 {
        self.clock.now()
    }

    /// Current day according to the store's clock.
    pub(crate) fn today(&self) -> DayNumber {
        self.clock.today()
    }

    /// Permanently deletes keys, observations and folded matches older than
    /// `days` days.
    ///
    /// All three expire by calendar day. An observation belongs to the day it
    /// was first seen on, which is the day its folded matches are keyed by,
    /// so a ledger row never outlives the observation it accounts for.
    /// Exposure records are kept until cleared explicitly.
    pub fn purge_older_than(&self, days: u32) -> Result<PurgeReport, StorageError> {
        let cutoff_day = self.today().minus(days);
        let first_kept_secs = cutoff_day.end_timestamp();

        let tx = self.conn.unchecked_transaction()?;
        let keys = tx.execute(
            "DELETE FROM daily_keys WHERE day <= ?1",
            rusqlite::params![cutoff_day.0],
        )?;
        let observations = tx.execute(
            "DELETE FROM observations WHERE first_seen < ?1",
            rusqlite::params![first_kept_secs as i64],
        )?;
        let folded_matches = tx.execute(
            "DELETE FROM folded_matches WHERE date <= ?1",
            rusqlite::params![cutoff_day.0],
        )?;
        tx.commit()?;

        let report = PurgeReport {
            keys,
            observations,
            folded_matches,
        };
        info!(
            cutoff_day = cutoff_day.0,
            keys, observations, folded_matches, "purged expired tracing data"
        );
        Ok(report)
    }

    /// Deletes every stored row, leaving an empty store at the current schema.
    pub fn wipe_all(&self) -> Result<(), StorageError> {
        let tx = self.conn.unchecked_transaction()?;
        tx.execute_batch(
            "DELETE FROM daily_keys;
             DELETE FROM observations;
             DELETE FROM exposure_records;
             DELETE FROM folded_matches;
             DELETE FROM consent_records;
             DELETE FROM settings;
             DELETE FROM audit_log;",
        )?;
        tx.commit()?;
        debug!("wiped key store");
        Ok(())
    }

    /// Returns true if the store holds no keys, observations or exposures.
    pub fn is_empty(&self) -> Result<bool, StorageError> {
        let rows: i64 = self.conn.query_row(
            "SELECT (SELECT COUNT(*) FROM daily_keys)
                  + (SELECT COUNT(*) FROM observations)
                  + (SELECT COUNT(*) FROM exposure_records)",
            [],
            |row| row.get(0),
        )?;
        Ok(rows == 0)
    }
}
