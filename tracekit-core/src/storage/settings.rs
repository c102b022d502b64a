// SPDX-FileCopyrightText: 2026 Mattia Egloff <mattia.egloff@pm.me>
//
// SPDX-License-Identifier: GPL-3.0-or-later

//! Key/value settings persisted next to the tracing data.

use rusqlite::{params, OptionalExtension};

use super::{KeyStore, StorageError};

impl KeyStore {
    // === Settings ===

    /// Stores a setting, replacing any previous value.
    pub fn set_setting(&self, key: &str, value: &str) -> Result<(), StorageError> {
        self.conn.execute(
            "INSERT OR REPLACE INTO settings (key, value) VALUES (?1, ?2)",
            params![key, value],
        )?;
        Ok(())
    }

    /// Loads a setting.
    pub fn get_setting(&self, key: &str) -> Result<Option<String>, StorageError> {
        Ok(self
            .conn
            .query_row(
                "SELECT value FROM settings WHERE key = ?1",
                params![key],
                |row| row.get(0),
            )
            .optional()?)
    }

    /// Removes a setting. Missing keys are ignored.
    pub fn delete_setting(&self, key: &str) -> Result<(), StorageError> {
        self.conn
            .execute("DELETE FROM settings WHERE key = ?1", params![key])?;
        Ok(())
    }

    /// Stores a numeric setting.
    pub fn set_u64_setting(&self, key: &str, value: u64) -> Result<(), StorageError> {
        self.set_setting(key, &value.to_string())
    }

    /// Loads a numeric setting.
    pub fn get_u64_setting(&self, key: &str) -> Result<Option<u64>, StorageError> {
        match self.get_setting(key)? {
            Some(raw) => raw.parse::<u64>().map(Some).map_err(|e| {
                StorageError::Serialization(format!("setting '{}' is not a number: {}", key, e))
            }),
            None => Ok(None),
        }
    }

    /// Stores a setting as JSON.
    pub fn set_json_setting<T: serde::Serialize>(
        &self,
        key: &str,
        value: &T,
    ) -> Result<(), StorageError> {
        let json = serde_json::to_string(value)
            .map_err(|e| StorageError::Serialization(e.to_string()))?;
        self.set_setting(key, &json)
    }

    /// Loads a JSON setting.
    pub fn get_json_setting<T: serde::de::DeserializeOwned>(
        &self,
        key: &str,
    ) -> Result<Option<T>, StorageError> {
        match self.get_setting(key)? {
            Some(raw) => serde_json::from_str(&raw)
                .map(Some)
                .map_err(|e| StorageError::Serialization(e.to_string())),
            None => Ok(None),
        }
    }
}
