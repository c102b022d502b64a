// SPDX-FileCopyrightText: 2026 Mattia Egloff <mattia.egloff@pm.me>
//
// SPDX-License-Identifier: GPL-3.0-or-later

//! Daily tracing key ledger.

use rusqlite::{params, OptionalExtension};
use tracing::debug;
use zeroize::Zeroize;

use super::{KeyStore, StorageError};
use crate::crypto::{decrypt_with_context, encrypt_with_context};
use crate::identity::{DailyTracingKey, DAILY_KEY_LEN};
use crate::time::DayNumber;

/// Associated data binding an encrypted key to its day, so rows cannot be
/// swapped.
fn row_context(day: DayNumber) -> Vec<u8> {
    let mut context = b"tracekit/daily_key/".to_vec();
    context.extend_from_slice(&day.0.to_le_bytes());
    context
}

impl KeyStore {
    // === Daily Key Operations ===

    /// Appends the key for a new day.
    ///
    /// Keys are strictly ordered by day: a second key for a stored day fails
    /// with `AlreadyExists`, a key older than the newest one with `OutOfOrder`.
    pub fn append_daily_key(&self, key: &DailyTracingKey) -> Result<(), StorageError> {
        let day = key.day();

        if let Some(latest) = self.latest_key_day()? {
            if day == latest {
                return Err(StorageError::AlreadyExists(format!(
                    "daily key for {}",
                    day
                )));
            }
            if day < latest {
                return Err(StorageError::OutOfOrder(format!(
                    "daily key for {} precedes {}",
                    day, latest
                )));
            }
        }

        if self.key_count()? >= self.quota.max_keys {
            return Err(StorageError::InsufficientStorage(format!(
                "daily key quota of {} reached",
                self.quota.max_keys
            )));
        }

        let encrypted =
            encrypt_with_context(&self.encryption_key, key.key_data(), &row_context(day))
            .map_err(|e| StorageError::Encryption(e.to_string()))?;

        self.conn.execute(
            "INSERT INTO daily_keys (day, key_encrypted, rolling_period, transmission_risk_level, created_at)
             VALUES (?1, ?2, ?3, ?4, ?5)",
            params![
                day.0,
                encrypted,
                key.rolling_period(),
                key.transmission_risk_level(),
                self.now() as i64
            ],
        )?;

        debug!(day = day.0, "stored daily tracing key");
        Ok(())
    }

    /// Returns the stored keys from the last `days` days (today included),
    /// oldest first.
    pub fn keys_since(&self, days: u32) -> Result<Vec<DailyTracingKey>, StorageError> {
        let first_day = self.today().minus(days.saturating_sub(1));
        self.load_keys(
            "SELECT day, key_encrypted, rolling_period, transmission_risk_level
             FROM daily_keys WHERE day >= ?1 ORDER BY day",
            first_day,
        )
    }

    /// Returns stored keys whose day is strictly before `day`, oldest first.
    pub fn keys_before(&self, day: DayNumber) -> Result<Vec<DailyTracingKey>, StorageError> {
        self.load_keys(
            "SELECT day, key_encrypted, rolling_period, transmission_risk_level
             FROM daily_keys WHERE day < ?1 ORDER BY day",
            day,
        )
    }

    /// Returns the key stored for `day`, if any.
    pub fn key_for_day(&self, day: DayNumber) -> Result<Option<DailyTracingKey>, StorageError> {
        let mut keys = self.load_keys(
            "SELECT day, key_encrypted, rolling_period, transmission_risk_level
             FROM daily_keys WHERE day = ?1",
            day,
        )?;
        Ok(keys.pop())
    }

    /// Day of the newest stored key.
    pub fn latest_key_day(&self) -> Result<Option<DayNumber>, StorageError> {
        let day: Option<u32> = self
            .conn
            .query_row("SELECT MAX(day) FROM daily_keys", [], |row| row.get(0))
            .optional()?
            .flatten();
        Ok(day.map(DayNumber))
    }

    /// Number of stored daily keys.
    pub fn key_count(&self) -> Result<usize, StorageError> {
        let count: i64 = self
            .conn
            .query_row("SELECT COUNT(*) FROM daily_keys", [], |row| row.get(0))?;
        Ok(count as usize)
    }

    fn load_keys(&self, sql: &str, day: DayNumber) -> Result<Vec<DailyTracingKey>, StorageError> {
        let mut stmt = self.conn.prepare(sql)?;
        let rows = stmt
            .query_map(params![day.0], |row| {
                Ok((
                    row.get::<_, u32>(0)?,
                    row.get::<_, Vec<u8>>(1)?,
                    row.get::<_, u32>(2)?,
                    row.get::<_, u8>(3)?,
                ))
            })?
            .collect::<Result<Vec<_>, _>>()?;

        rows.into_iter()
            .map(|(day, encrypted, rolling_period, risk)| {
                let mut plain = decrypt_with_context(
                    &self.encryption_key,
                    &encrypted,
                    &row_context(DayNumber(day)),
                )
                    .map_err(|e| StorageError::Encryption(e.to_string()))?;
                let parsed: Result<[u8; DAILY_KEY_LEN], _> = plain.as_slice().try_into();
                plain.zeroize();
                let key_data = parsed.map_err(|_| {
                    StorageError::Serialization(format!("stored key for day {} is corrupt", day))
                })?;
                DailyTracingKey::from_parts(
                    key_data,
                    DayNumber(day).first_interval(),
                    rolling_period,
                    risk,
                )
                .map_err(|e| StorageError::Serialization(e.to_string()))
            })
            .collect()
    }
}

