// SPDX-FileCopyrightText: 2026 Mattia Egloff <mattia.egloff@pm.me>
//
// SPDX-License-Identifier: GPL-3.0-or-later

//! Consent decisions and the tracing audit log.

use rusqlite::{params, OptionalExtension, Row};

use super::{KeyStore, StorageError};

/// One opt-in or opt-out, as stored.
///
/// `consent_type` stays a plain string here; the api layer owns the enum.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConsentDecision {
    pub id: String,
    pub consent_type: String,
    pub granted: bool,
    pub decided_at: u64,
}

impl ConsentDecision {
    fn from_row(row: &Row<'_>) -> rusqlite::Result<Self> {
        Ok(ConsentDecision {
            id: row.get(0)?,
            consent_type: row.get(1)?,
            granted: row.get::<_, i64>(2)? != 0,
            decided_at: row.get::<_, i64>(3)? as u64,
        })
    }
}

/// A logged tracing lifecycle event.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AuditEntry {
    pub event_type: String,
    pub details: Option<String>,
    pub timestamp: u64,
}

impl KeyStore {
    /// Appends a decision. A decision with an existing id replaces it.
    pub fn record_consent(&self, decision: &ConsentDecision) -> Result<(), StorageError> {
        self.conn.execute(
            "INSERT OR REPLACE INTO consent_records (id, consent_type, granted, decided_at)
             VALUES (?1, ?2, ?3, ?4)",
            params![
                decision.id,
                decision.consent_type,
                decision.granted as i64,
                decision.decided_at as i64
            ],
        )?;
        Ok(())
    }

    /// Most recent decision for `consent_type`; ties go to the later insert.
    pub fn latest_consent(
        &self,
        consent_type: &str,
    ) -> Result<Option<ConsentDecision>, StorageError> {
        Ok(self
            .conn
            .query_row(
                "SELECT id, consent_type, granted, decided_at FROM consent_records
                 WHERE consent_type = ?1
                 ORDER BY decided_at DESC, rowid DESC LIMIT 1",
                params![consent_type],
                ConsentDecision::from_row,
            )
            .optional()?)
    }

    /// True if the latest decision for `consent_type` granted it.
    pub fn is_consent_granted(&self, consent_type: &str) -> Result<bool, StorageError> {
        Ok(self
            .latest_consent(consent_type)?
            .is_some_and(|decision| decision.granted))
    }

    /// Every decision, oldest first.
    pub fn consent_history(&self) -> Result<Vec<ConsentDecision>, StorageError> {
        let mut stmt = self.conn.prepare(
            "SELECT id, consent_type, granted, decided_at FROM consent_records
             ORDER BY decided_at, rowid",
        )?;
        let decisions = stmt
            .query_map([], ConsentDecision::from_row)?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(decisions)
    }

    // === Audit Log ===

    /// Logs an audit event stamped with the store's clock.
    pub fn log_audit_event(
        &self,
        event_type: &str,
        details: Option<&str>,
    ) -> Result<(), StorageError> {
        self.conn.execute(
            "INSERT INTO audit_log (event_type, details, timestamp) VALUES (?1, ?2, ?3)",
            params![event_type, details, self.now() as i64],
        )?;
        Ok(())
    }

    /// Returns the audit log, oldest entry first.
    pub fn audit_log(&self) -> Result<Vec<AuditEntry>, StorageError> {
        let mut stmt = self
            .conn
            .prepare("SELECT event_type, details, timestamp FROM audit_log ORDER BY id")?;

        let entries = stmt
            .query_map([], |row| {
                Ok(AuditEntry {
                    event_type: row.get(0)?,
                    details: row.get(1)?,
                    timestamp: row.get::<_, i64>(2)? as u64,
                })
            })?
            .collect::<Result<Vec<_>, _>>()?;

        Ok(entries)
    }
}
