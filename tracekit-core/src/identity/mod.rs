// SPDX-FileCopyrightText: 2026 Mattia Egloff <mattia.egloff@pm.me>
//
// SPDX-License-Identifier: GPL-3.0-or-later

//! Rotating Identity Module
//!
//! Daily tracing keys and the short-lived identifiers broadcast from them.

pub mod generator;
pub mod key;

pub use generator::RotatingIdentityGenerator;
pub use key::{
    DailyTracingKey, RollingProximityIdentifier, DAILY_KEY_LEN, IDENTIFIER_LEN,
    MAX_TRANSMISSION_RISK_LEVEL,
};

use thiserror::Error;

use crate::crypto::KDFError;

/// Identity-related errors.
#[derive(Error, Debug)]
pub enum IdentityError {
    #[error("System entropy source unavailable")]
    EntropyUnavailable,

    #[error("Interval {interval} is outside the validity of the key for day {day}")]
    IntervalOutsideKey { interval: u32, day: u32 },

    #[error("Invalid daily tracing key: {0}")]
    InvalidKey(String),

    #[error("Invalid identifier: {0}")]
    InvalidIdentifier(String),

    #[error("Key derivation failed: {0}")]
    Derivation(#[from] KDFError),
}
