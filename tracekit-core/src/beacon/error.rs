// SPDX-FileCopyrightText: 2026 Mattia Egloff <mattia.egloff@pm.me>
//
// SPDX-License-Identifier: GPL-3.0-or-later

//! Beacon Error Types

use thiserror::Error;

use crate::identity::IdentityError;
use crate::storage::StorageError;

/// Failures reported by the radio collaborator.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum RadioError {
    #[error("Bluetooth is disabled")]
    Disabled,

    #[error("Radio unavailable: {0}")]
    Unavailable(String),

    #[error("Radio operation timed out")]
    Timeout,
}

/// Errors that stop the broadcast/scan cycle.
#[derive(Error, Debug)]
pub enum BeaconError {
    #[error("Radio error: {0}")]
    Radio(#[from] RadioError),

    #[error("Storage error: {0}")]
    Storage(#[from] StorageError),

    #[error("Identity error: {0}")]
    Identity(#[from] IdentityError),
}
