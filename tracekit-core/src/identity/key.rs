// SPDX-FileCopyrightText: 2026 Mattia Egloff <mattia.egloff@pm.me>
//
// SPDX-License-Identifier: GPL-3.0-or-later

//! Daily tracing keys and the rolling identifiers derived from them.

use serde::{Deserialize, Serialize};
use zeroize::Zeroize;

use super::IdentityError;
use crate::time::{DayNumber, IntervalNumber, INTERVALS_PER_DAY};

/// Length of a daily tracing key in bytes.
pub const DAILY_KEY_LEN: usize = 16;

/// Length of a rolling proximity identifier in bytes.
pub const IDENTIFIER_LEN: usize = 16;

/// Highest transmission risk level a key may carry.
pub const MAX_TRANSMISSION_RISK_LEVEL: u8 = 7;

/// Device-local secret valid for one calendar day.
///
/// Key bytes are zeroed on drop and never printed by `Debug`.
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DailyTracingKey {
    #[serde(with = "base64_key")]
    key_data: [u8; DAILY_KEY_LEN],
    rolling_start_number: IntervalNumber,
    rolling_period: u32,
    #[serde(default)]
    transmission_risk_level: u8,
}

impl Drop for DailyTracingKey {
    fn drop(&mut self) {
        self.key_data.zeroize();
    }
}

impl std::fmt::Debug for DailyTracingKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DailyTracingKey")
            .field("key_data", &"[REDACTED]")
            .field("day", &self.day())
            .field("rolling_period", &self.rolling_period)
            .field("transmission_risk_level", &self.transmission_risk_level)
            .finish()
    }
}

impl DailyTracingKey {
    /// Creates a full-day key for `day`.
    pub fn new(key_data: [u8; DAILY_KEY_LEN], day: DayNumber) -> Self {
        DailyTracingKey {
            key_data,
            rolling_start_number: day.first_interval(),
            rolling_period: INTERVALS_PER_DAY,
            transmission_risk_level: 0,
        }
    }

    /// Creates a key from its wire fields, validating alignment and period.
    pub fn from_parts(
        key_data: [u8; DAILY_KEY_LEN],
        rolling_start_number: IntervalNumber,
        rolling_period: u32,
        transmission_risk_level: u8,
    ) -> Result<Self, IdentityError> {
        let key = DailyTracingKey {
            key_data,
            rolling_start_number,
            rolling_period,
            transmission_risk_level,
        };
        key.validate()?;
        Ok(key)
    }

    /// Sets the transmission risk level assigned by the diagnosing authority.
    pub fn with_transmission_risk_level(mut self, level: u8) -> Self {
        self.transmission_risk_level = level;
        self
    }

    /// Checks the structural invariants of the key.
    pub fn validate(&self) -> Result<(), IdentityError> {
        if self.rolling_start_number.index_in_day() != 0 {
            return Err(IdentityError::InvalidKey(format!(
                "rolling start {} is not aligned to a day boundary",
                self.rolling_start_number.0
            )));
        }
        if self.rolling_period == 0 || self.rolling_period > INTERVALS_PER_DAY {
            return Err(IdentityError::InvalidKey(format!(
                "rolling period {} outside 1..={}",
                self.rolling_period, INTERVALS_PER_DAY
            )));
        }
        if self
            .rolling_start_number
            .0
            .checked_add(self.rolling_period)
            .is_none()
        {
            return Err(IdentityError::InvalidKey(format!(
                "rolling start {} with period {} runs past the last interval",
                self.rolling_start_number.0, self.rolling_period
            )));
        }
        if self.transmission_risk_level > MAX_TRANSMISSION_RISK_LEVEL {
            return Err(IdentityError::InvalidKey(format!(
                "transmission risk level {} above {}",
                self.transmission_risk_level, MAX_TRANSMISSION_RISK_LEVEL
            )));
        }
        Ok(())
    }

    /// Raw key bytes.
    pub fn key_data(&self) -> &[u8; DAILY_KEY_LEN] {
        &self.key_data
    }

    /// Calendar day this key is valid for.
    pub fn day(&self) -> DayNumber {
        self.rolling_start_number.day()
    }

    /// First rotation window covered by this key.
    pub fn rolling_start_number(&self) -> IntervalNumber {
        self.rolling_start_number
    }

    /// Number of rotation windows covered by this key.
    pub fn rolling_period(&self) -> u32 {
        self.rolling_period
    }

    /// Transmission risk level (0..=7).
    pub fn transmission_risk_level(&self) -> u8 {
        self.transmission_risk_level
    }

    /// Returns true if `interval` lies inside this key's validity period.
    pub fn covers(&self, interval: IntervalNumber) -> bool {
        interval >= self.rolling_start_number && interval.0 < self.end()
    }

    /// Iterates over all rotation windows covered by this key.
    pub fn intervals(&self) -> impl Iterator<Item = IntervalNumber> {
        (self.rolling_start_number.0..self.end()).map(IntervalNumber)
    }

    // Saturates for keys that have not been validated.
    fn end(&self) -> u32 {
        self.rolling_start_number.0.saturating_add(self.rolling_period)
    }

    /// Canonical byte encoding used for authority signatures.
    pub fn signing_bytes(&self) -> Vec<u8> {
        let mut out = Vec::with_capacity(DAILY_KEY_LEN + 9);
        out.extend_from_slice(&self.key_data);
        out.extend_from_slice(&self.rolling_start_number.0.to_be_bytes());
        out.extend_from_slice(&self.rolling_period.to_be_bytes());
        out.push(self.transmission_risk_level);
        out
    }
}

/// Short-lived broadcast identifier derived from a daily tracing key.
#[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct RollingProximityIdentifier([u8; IDENTIFIER_LEN]);

impl RollingProximityIdentifier {
    /// Wraps raw identifier bytes.
    pub fn from_bytes(bytes: [u8; IDENTIFIER_LEN]) -> Self {
        RollingProximityIdentifier(bytes)
    }

    /// Parses identifier bytes from a slice of exactly 16 bytes.
    pub fn from_slice(bytes: &[u8]) -> Result<Self, IdentityError> {
        let arr: [u8; IDENTIFIER_LEN] = bytes.try_into().map_err(|_| {
            IdentityError::InvalidIdentifier(format!("expected 16 bytes, got {}", bytes.len()))
        })?;
        Ok(RollingProximityIdentifier(arr))
    }

    /// Returns the raw identifier bytes.
    pub fn as_bytes(&self) -> &[u8; IDENTIFIER_LEN] {
        &self.0
    }

    /// Lowercase hex rendering.
    pub fn to_hex(&self) -> String {
        hex::encode(self.0)
    }
}

impl std::fmt::Display for RollingProximityIdentifier {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.to_hex())
    }
}

impl std::fmt::Debug for RollingProximityIdentifier {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "Rpi({})", self.to_hex())
    }
}

mod base64_key {
    use base64::engine::general_purpose::STANDARD;
    use base64::Engine;
    use serde::{de::Error, Deserialize, Deserializer, Serializer};

    use super::DAILY_KEY_LEN;

    pub fn serialize<S: Serializer>(
        bytes: &[u8; DAILY_KEY_LEN],
        serializer: S,
    ) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&STANDARD.encode(bytes))
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(
        deserializer: D,
    ) -> Result<[u8; DAILY_KEY_LEN], D::Error> {
        let s = String::deserialize(deserializer)?;
        let raw = STANDARD.decode(s.as_bytes()).map_err(D::Error::custom)?;
        raw.try_into()
            .map_err(|_| D::Error::custom("daily tracing key must be 16 bytes"))
    }
}
