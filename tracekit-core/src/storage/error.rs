// SPDX-FileCopyrightText: 2026 Mattia Egloff <mattia.egloff@pm.me>
//
// SPDX-License-Identifier: GPL-3.0-or-later

//! Storage error types.

use rusqlite::ErrorCode;
use thiserror::Error;

/// Storage error types.
#[derive(Error, Debug)]
pub enum StorageError {
    #[error("Database error: {0}")]
    Database(#[source] rusqlite::Error),

    /// Backing storage or the configured quota is exhausted.
    #[error("Insufficient storage: {0}")]
    InsufficientStorage(String),

    #[error("Serialization error: {0}")]
    Serialization(String),

    #[error("Encryption error: {0}")]
    Encryption(String),

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Already exists: {0}")]
    AlreadyExists(String),

    /// An append would break the ledger's time ordering.
    #[error("Out of order: {0}")]
    OutOfOrder(String),

    #[error("Migration error: {0}")]
    Migration(String),
}

impl From<rusqlite::Error> for StorageError {
    fn from(err: rusqlite::Error) -> Self {
        match err.sqlite_error_code() {
            Some(ErrorCode::DiskFull) => StorageError::InsufficientStorage(err.to_string()),
            _ => StorageError::Database(err),
        }
    }
}

impl StorageError {
    /// Returns true for failures caused by exhausted storage.
    pub fn is_insufficient_storage(&self) -> bool {
        matches!(self, StorageError::InsufficientStorage(_))
    }
}
