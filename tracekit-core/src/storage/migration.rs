// SPDX-FileCopyrightText: 2026 Mattia Egloff <mattia.egloff@pm.me>
//
// SPDX-License-Identifier: GPL-3.0-or-later

//! Schema Migrations
//!
//! Each store records the versions applied to it in `schema_version`. Opening
//! a store applies every newer migration inside one transaction, so a failed
//! step leaves the schema as it was.

use rusqlite::{params, Connection, OptionalExtension};
use tracing::info;

use super::StorageError;

/// A single schema migration step.
pub struct Migration {
    /// Starts at 1 and increases by step.
    pub version: u32,
    pub name: &'static str,
    pub sql: &'static str,
}

impl Migration {
    fn failed(&self, err: rusqlite::Error) -> StorageError {
        StorageError::Migration(format!("v{} '{}': {}", self.version, self.name, err))
    }
}

/// Applies pending migrations.
pub struct MigrationRunner;

impl MigrationRunner {
    /// Applies every migration newer than the stored version and returns the
    /// resulting version.
    pub fn run(conn: &Connection, migrations: &[Migration], now: u64) -> Result<u32, StorageError> {
        if let Some(pair) = migrations
            .windows(2)
            .find(|pair| pair[0].version >= pair[1].version)
        {
            return Err(StorageError::Migration(format!(
                "v{} is listed before v{}",
                pair[0].version, pair[1].version
            )));
        }

        conn.execute_batch(
            "CREATE TABLE IF NOT EXISTS schema_version (
                version INTEGER PRIMARY KEY,
                applied_at INTEGER NOT NULL
            );",
        )?;

        let from = Self::current_version(conn)?;
        let pending: Vec<&Migration> = migrations.iter().filter(|m| m.version > from).collect();
        let Some(to) = pending.last().map(|m| m.version) else {
            return Ok(from);
        };

        // Dropped without commit on any error, which rolls everything back.
        let tx = conn.unchecked_transaction()?;
        for migration in pending {
            tx.execute_batch(migration.sql)
                .map_err(|e| migration.failed(e))?;
            tx.execute(
                "INSERT INTO schema_version (version, applied_at) VALUES (?1, ?2)",
                params![migration.version, now as i64],
            )
            .map_err(|e| migration.failed(e))?;
        }
        tx.commit()?;

        info!(from, to, "migrated schema");
        Ok(to)
    }

    /// Highest applied version; 0 for a database never migrated.
    pub fn current_version(conn: &Connection) -> Result<u32, StorageError> {
        let tracked = conn
            .query_row(
                "SELECT name FROM sqlite_master WHERE type = 'table' AND name = 'schema_version'",
                [],
                |row| row.get::<_, String>(0),
            )
            .optional()?
            .is_some();
        if !tracked {
            return Ok(0);
        }

        let version: Option<u32> =
            conn.query_row("SELECT MAX(version) FROM schema_version", [], |row| row.get(0))?;
        Ok(version.unwrap_or(0))
    }
}

/// Every migration, oldest first. New ones go at the end.
pub fn all_migrations() -> Vec<Migration> {
    vec![
        Migration {
            version: 1,
            name: "baseline_schema",
            sql: MIGRATION_V1_BASELINE,
        },
        Migration {
            version: 2,
            name: "consent_audit",
            sql: MIGRATION_V2_CONSENT_AUDIT,
        },
        Migration {
            version: 3,
            name: "fold_contributions",
            sql: MIGRATION_V3_FOLD_CONTRIBUTIONS,
        },
    ]
}

/// Migration v1: key ledger, observations and exposure records.
const MIGRATION_V1_BASELINE: &str = "
    -- Own daily tracing keys, one per day (key bytes encrypted at rest)
    CREATE TABLE IF NOT EXISTS daily_keys (
        day INTEGER PRIMARY KEY,
        key_encrypted BLOB NOT NULL,
        rolling_period INTEGER NOT NULL,
        transmission_risk_level INTEGER NOT NULL DEFAULT 0,
        created_at INTEGER NOT NULL
    );

    -- Identifiers heard from nearby devices
    CREATE TABLE IF NOT EXISTS observations (
        id INTEGER PRIMARY KEY AUTOINCREMENT,
        identifier BLOB NOT NULL UNIQUE,
        first_seen INTEGER NOT NULL,
        last_seen INTEGER NOT NULL,
        received_at INTEGER NOT NULL,
        rssi INTEGER NOT NULL,
        attenuation INTEGER NOT NULL,
        distance REAL NOT NULL
    );

    -- Computed exposures, one per contact day
    CREATE TABLE IF NOT EXISTS exposure_records (
        date INTEGER PRIMARY KEY,
        duration_secs INTEGER NOT NULL,
        attenuation INTEGER NOT NULL,
        transmission_risk_level INTEGER NOT NULL,
        total_risk_score INTEGER NOT NULL,
        matched_key_count INTEGER NOT NULL,
        updated_at INTEGER NOT NULL
    );

    -- (diagnosis key, contact day) pairs already folded into a record
    CREATE TABLE IF NOT EXISTS folded_matches (
        key_fingerprint TEXT NOT NULL,
        date INTEGER NOT NULL,
        folded_at INTEGER NOT NULL,
        PRIMARY KEY (key_fingerprint, date)
    );

    CREATE TABLE IF NOT EXISTS settings (
        key TEXT PRIMARY KEY,
        value TEXT NOT NULL
    );

    CREATE INDEX IF NOT EXISTS idx_observations_last_seen ON observations(last_seen);
    CREATE INDEX IF NOT EXISTS idx_folded_date ON folded_matches(date);
";

/// Migration v2: consent records and audit log.
const MIGRATION_V2_CONSENT_AUDIT: &str = "
    CREATE TABLE IF NOT EXISTS consent_records (
        id TEXT PRIMARY KEY,
        consent_type TEXT NOT NULL,
        granted INTEGER NOT NULL,
        decided_at INTEGER NOT NULL
    );

    CREATE TABLE IF NOT EXISTS audit_log (
        id INTEGER PRIMARY KEY AUTOINCREMENT,
        event_type TEXT NOT NULL,
        details TEXT,
        timestamp INTEGER NOT NULL
    );

    CREATE INDEX IF NOT EXISTS idx_audit_timestamp ON audit_log(timestamp);
    CREATE INDEX IF NOT EXISTS idx_audit_event_type ON audit_log(event_type);
";

/// Migration v3: each ledger row keeps what it added to its record, so a
/// withdrawn key can be taken back out.
const MIGRATION_V3_FOLD_CONTRIBUTIONS: &str = "
    ALTER TABLE folded_matches ADD COLUMN duration_secs INTEGER NOT NULL DEFAULT 0;
    ALTER TABLE folded_matches ADD COLUMN attenuation INTEGER NOT NULL DEFAULT 255;
    ALTER TABLE folded_matches ADD COLUMN transmission_risk_level INTEGER NOT NULL DEFAULT 0;

    CREATE INDEX IF NOT EXISTS idx_folded_fingerprint ON folded_matches(key_fingerprint);
";

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_fresh_database_migrates_to_latest() {
        let conn = Connection::open_in_memory().unwrap();
        let migrations = all_migrations();
        let version = MigrationRunner::run(&conn, &migrations, 1_000).unwrap();

        assert_eq!(version, migrations.last().unwrap().version);
        assert_eq!(MigrationRunner::current_version(&conn).unwrap(), version);
    }

    #[test]
    fn test_v2_ledger_gains_contribution_columns() {
        let conn = Connection::open_in_memory().unwrap();
        let migrations = all_migrations();
        MigrationRunner::run(&conn, &migrations[..2], 1_000).unwrap();
        conn.execute(
            "INSERT INTO folded_matches (key_fingerprint, date, folded_at) VALUES ('ab', 7, 1)",
            [],
        )
        .unwrap();

        assert_eq!(MigrationRunner::run(&conn, &migrations, 2_000).unwrap(), 3);
        let (duration, attenuation): (i64, i64) = conn
            .query_row(
                "SELECT duration_secs, attenuation FROM folded_matches WHERE key_fingerprint = 'ab'",
                [],
                |row| Ok((row.get(0)?, row.get(1)?)),
            )
            .unwrap();
        assert_eq!((duration, attenuation), (0, 255));
    }

    #[test]
    fn test_rerun_is_noop() {
        let conn = Connection::open_in_memory().unwrap();
        let migrations = all_migrations();
        MigrationRunner::run(&conn, &migrations, 1_000).unwrap();
        MigrationRunner::run(&conn, &migrations, 2_000).unwrap();

        let rows: i64 = conn
            .query_row("SELECT COUNT(*) FROM schema_version", [], |row| row.get(0))
            .unwrap();
        assert_eq!(rows as usize, migrations.len());
    }

    #[test]
    fn test_failed_migration_rolls_back() {
        let conn = Connection::open_in_memory().unwrap();
        let migrations = vec![
            Migration {
                version: 1,
                name: "ok",
                sql: "CREATE TABLE a (x INTEGER);",
            },
            Migration {
                version: 2,
                name: "broken",
                sql: "CREATE TABLE nonsense (",
            },
        ];

        assert!(matches!(
            MigrationRunner::run(&conn, &migrations, 1_000),
            Err(StorageError::Migration(_))
        ));
        assert_eq!(MigrationRunner::current_version(&conn).unwrap(), 0);
        let leftover: i64 = conn
            .query_row(
                "SELECT COUNT(*) FROM sqlite_master WHERE name = 'a'",
                [],
                |row| row.get(0),
            )
            .unwrap();
        assert_eq!(leftover, 0);
    }

    #[test]
    fn test_unordered_migrations_rejected() {
        let conn = Connection::open_in_memory().unwrap();
        let migrations = vec![
            Migration {
                version: 2,
                name: "second",
                sql: "SELECT 1;",
            },
            Migration {
                version: 1,
                name: "first",
                sql: "SELECT 1;",
            },
        ];

        assert!(MigrationRunner::run(&conn, &migrations, 1_000).is_err());
    }
}
