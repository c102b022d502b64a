// SPDX-FileCopyrightText: 2026 Mattia Egloff <mattia.egloff@pm.me>
//
// SPDX-License-Identifier: GPL-3.0-or-later

//! Exposure record storage and the folded-match ledger.

use rusqlite::{params, OptionalExtension, Row, Transaction};
use serde::{Deserialize, Serialize};
use tracing::debug;

use super::observations::DURATION_INCREMENT_SECS;
use super::{KeyStore, StorageError};
use crate::time::{DayNumber, SECONDS_PER_DAY};

/// Computed contact with diagnosed peers on one calendar day.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExposureRecord {
    /// Contact day.
    pub date: DayNumber,
    /// Summed contact time in seconds, capped at one day.
    pub duration_secs: u64,
    /// Lowest attenuation observed on this day.
    pub attenuation: u8,
    /// Highest transmission risk level among matched keys.
    pub transmission_risk_level: u8,
    /// Score assigned by the active exposure configuration.
    pub total_risk_score: u8,
    /// Diagnosis keys folded into this record.
    pub matched_key_count: u32,
    pub updated_at: u64,
}

impl ExposureRecord {
    /// Contact duration in whole 5-minute increments.
    pub fn duration(&self) -> u64 {
        self.duration_secs / DURATION_INCREMENT_SECS
    }

    fn from_row(row: &Row<'_>) -> rusqlite::Result<Self> {
        Ok(ExposureRecord {
            date: DayNumber(row.get(0)?),
            duration_secs: row.get::<_, i64>(1)? as u64,
            attenuation: row.get(2)?,
            transmission_risk_level: row.get(3)?,
            total_risk_score: row.get(4)?,
            matched_key_count: row.get(5)?,
            updated_at: row.get::<_, i64>(6)? as u64,
        })
    }
}

/// Contact time attributed to one diagnosis key on one day.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MatchFold {
    /// SHA-256 fingerprint of the diagnosis key.
    pub key_fingerprint: String,
    pub date: DayNumber,
    pub duration_secs: u64,
    pub attenuation: u8,
    pub transmission_risk_level: u8,
}

/// What a fold pass changed.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FoldOutcome {
    /// Folds applied to a record.
    pub folded: usize,
    /// Folds skipped because their (key, day) pair was already applied.
    pub skipped: usize,
    /// Records created or updated, by date.
    pub updated: Vec<ExposureRecord>,
}

/// What a retraction changed.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RetractOutcome {
    /// Ledger rows removed.
    pub retracted: usize,
    /// Records rebuilt from the folds that remain, by date.
    pub updated: Vec<ExposureRecord>,
    /// Days left with no folds, whose records were deleted.
    pub removed: Vec<DayNumber>,
}

const SELECT_RECORD: &str = "SELECT date, duration_secs, attenuation, transmission_risk_level,
            total_risk_score, matched_key_count, updated_at
     FROM exposure_records";

impl KeyStore {
    // === Exposure Operations ===

    /// Folds matched contact time into the exposure records in one
    /// transaction.
    ///
    /// A (key, day) pair is applied at most once, so re-submitting the same
    /// diagnosis keys leaves the records unchanged. `score` assigns the risk
    /// score of every updated record.
    pub fn fold_matches<F>(&self, folds: &[MatchFold], score: F) -> Result<FoldOutcome, StorageError>
    where
        F: Fn(&ExposureRecord) -> u8,
    {
        let now = self.now();
        let tx = self.conn.unchecked_transaction()?;
        let mut outcome = FoldOutcome::default();

        for fold in folds {
            let inserted = tx.execute(
                "INSERT OR IGNORE INTO folded_matches
                 (key_fingerprint, date, folded_at, duration_secs, attenuation,
                  transmission_risk_level)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
                params![
                    fold.key_fingerprint,
                    fold.date.0,
                    now as i64,
                    fold.duration_secs.min(SECONDS_PER_DAY) as i64,
                    fold.attenuation,
                    fold.transmission_risk_level
                ],
            )?;
            if inserted == 0 {
                outcome.skipped += 1;
                continue;
            }

            let mut record = match load_record(&tx, fold.date)? {
                Some(mut existing) => {
                    existing.duration_secs =
                        (existing.duration_secs + fold.duration_secs).min(SECONDS_PER_DAY);
                    existing.attenuation = existing.attenuation.min(fold.attenuation);
                    existing.transmission_risk_level = existing
                        .transmission_risk_level
                        .max(fold.transmission_risk_level);
                    existing.matched_key_count += 1;
                    existing
                }
                None => ExposureRecord {
                    date: fold.date,
                    duration_secs: fold.duration_secs.min(SECONDS_PER_DAY),
                    attenuation: fold.attenuation,
                    transmission_risk_level: fold.transmission_risk_level,
                    total_risk_score: 0,
                    matched_key_count: 1,
                    updated_at: now,
                },
            };
            record.updated_at = now;
            record.total_risk_score = score(&record);
            save_record(&tx, &record)?;

            outcome.updated.retain(|r: &ExposureRecord| r.date != record.date);
            outcome.updated.push(record);
            outcome.folded += 1;
        }

        tx.commit()?;
        outcome.updated.sort_by_key(|r| r.date);

        debug!(
            folded = outcome.folded,
            skipped = outcome.skipped,
            "folded matches into exposure records"
        );
        Ok(outcome)
    }

    /// Takes the folds of withdrawn diagnosis keys back out of the records.
    ///
    /// Every day such a key contributed to is rebuilt from the folds that
    /// remain; a day left with none loses its record. Unknown fingerprints
    /// are ignored. `score` assigns the risk score of every rebuilt record.
    pub fn retract_matches<F>(
        &self,
        fingerprints: &[String],
        score: F,
    ) -> Result<RetractOutcome, StorageError>
    where
        F: Fn(&ExposureRecord) -> u8,
    {
        let now = self.now();
        let tx = self.conn.unchecked_transaction()?;
        let mut outcome = RetractOutcome::default();
        let mut days: Vec<DayNumber> = Vec::new();

        for fingerprint in fingerprints {
            let mut stmt =
                tx.prepare("SELECT date FROM folded_matches WHERE key_fingerprint = ?1")?;
            let dates = stmt
                .query_map(params![fingerprint], |row| row.get::<_, u32>(0))?
                .collect::<Result<Vec<_>, _>>()?;
            drop(stmt);

            outcome.retracted += tx.execute(
                "DELETE FROM folded_matches WHERE key_fingerprint = ?1",
                params![fingerprint],
            )?;
            days.extend(dates.into_iter().map(DayNumber));
        }
        days.sort();
        days.dedup();

        for date in days {
            let (count, duration, attenuation, risk): (u32, i64, u8, u8) = tx.query_row(
                "SELECT COUNT(*), COALESCE(SUM(duration_secs), 0),
                        COALESCE(MIN(attenuation), 255), COALESCE(MAX(transmission_risk_level), 0)
                 FROM folded_matches WHERE date = ?1",
                params![date.0],
                |row| Ok((row.get(0)?, row.get(1)?, row.get(2)?, row.get(3)?)),
            )?;

            if count == 0 {
                tx.execute("DELETE FROM exposure_records WHERE date = ?1", params![date.0])?;
                outcome.removed.push(date);
                continue;
            }

            let mut record = ExposureRecord {
                date,
                duration_secs: (duration as u64).min(SECONDS_PER_DAY),
                attenuation,
                transmission_risk_level: risk,
                total_risk_score: 0,
                matched_key_count: count,
                updated_at: now,
            };
            record.total_risk_score = score(&record);
            save_record(&tx, &record)?;
            outcome.updated.push(record);
        }

        tx.commit()?;

        debug!(
            retracted = outcome.retracted,
            removed = outcome.removed.len(),
            "retracted withdrawn diagnosis keys"
        );
        Ok(outcome)
    }

    /// Recomputes the risk score of every record.
    pub fn rescore_exposures<F>(&self, score: F) -> Result<(), StorageError>
    where
        F: Fn(&ExposureRecord) -> u8,
    {
        let tx = self.conn.unchecked_transaction()?;
        for mut record in load_all(&tx)? {
            record.total_risk_score = score(&record);
            save_record(&tx, &record)?;
        }
        tx.commit()?;
        Ok(())
    }

    /// Returns all exposure records, oldest day first.
    pub fn exposure_records(&self) -> Result<Vec<ExposureRecord>, StorageError> {
        let mut stmt = self
            .conn
            .prepare(&format!("{} ORDER BY date", SELECT_RECORD))?;
        let records = stmt
            .query_map([], ExposureRecord::from_row)?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(records)
    }

    /// Returns the record for `date`, if any.
    pub fn exposure_record(&self, date: DayNumber) -> Result<Option<ExposureRecord>, StorageError> {
        Ok(self
            .conn
            .query_row(
                &format!("{} WHERE date = ?1", SELECT_RECORD),
                params![date.0],
                ExposureRecord::from_row,
            )
            .optional()?)
    }

    /// Number of (key, day) pairs in the folded-match ledger.
    pub fn folded_match_count(&self) -> Result<usize, StorageError> {
        let count: i64 =
            self.conn
                .query_row("SELECT COUNT(*) FROM folded_matches", [], |row| row.get(0))?;
        Ok(count as usize)
    }

    /// Deletes all exposure records and the folded-match ledger.
    ///
    /// Returns the number of records removed.
    pub fn clear_exposures(&self) -> Result<usize, StorageError> {
        let tx = self.conn.unchecked_transaction()?;
        let removed = tx.execute("DELETE FROM exposure_records", [])?;
        tx.execute("DELETE FROM folded_matches", [])?;
        tx.commit()?;
        Ok(removed)
    }
}

fn load_record(tx: &Transaction<'_>, date: DayNumber) -> Result<Option<ExposureRecord>, StorageError> {
    Ok(tx
        .query_row(
            &format!("{} WHERE date = ?1", SELECT_RECORD),
            params![date.0],
            ExposureRecord::from_row,
        )
        .optional()?)
}

fn load_all(tx: &Transaction<'_>) -> Result<Vec<ExposureRecord>, StorageError> {
    let mut stmt = tx.prepare(&format!("{} ORDER BY date", SELECT_RECORD))?;
    let records = stmt
        .query_map([], ExposureRecord::from_row)?
        .collect::<Result<Vec<_>, _>>()?;
    Ok(records)
}

fn save_record(tx: &Transaction<'_>, record: &ExposureRecord) -> Result<(), StorageError> {
    tx.execute(
        "INSERT OR REPLACE INTO exposure_records
         (date, duration_secs, attenuation, transmission_risk_level,
          total_risk_score, matched_key_count, updated_at)
         VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)",
        params![
            record.date.0,
            record.duration_secs as i64,
            record.attenuation,
            record.transmission_risk_level,
            record.total_risk_score,
            record.matched_key_count,
            record.updated_at as i64
        ],
    )?;
    Ok(())
}
