// SPDX-FileCopyrightText: 2026 Mattia Egloff <mattia.egloff@pm.me>
//
// SPDX-License-Identifier: GPL-3.0-or-later

//! Rotating Identity Generator
//!
//! Derives broadcast identifiers from daily tracing keys:
//!
//! - identifier_key = HKDF-SHA256(daily_key, salt = none, info = "EN-RPIK")[..16]
//! - identifier     = HMAC-SHA256(identifier_key, "EN-RPI" || 0x00 * 6 || interval_le32)[..16]
//!
//! Both steps are one-way, so an observer holding identifiers cannot recover
//! the daily key or link identifiers from different windows.

use ring::rand::{SecureRandom, SystemRandom};
use tracing::debug;
use zeroize::Zeroize;

use super::key::{DailyTracingKey, RollingProximityIdentifier, DAILY_KEY_LEN, IDENTIFIER_LEN};
use super::IdentityError;
use crate::crypto::{hmac_sha256, HKDF};
use crate::time::{DayNumber, IntervalNumber};

const IDENTIFIER_KEY_INFO: &[u8] = b"EN-RPIK";
const IDENTIFIER_PREFIX: &[u8; 6] = b"EN-RPI";

/// Per-day key from which that day's identifiers are computed.
struct IdentifierKey([u8; 16]);

impl Drop for IdentifierKey {
    fn drop(&mut self) {
        self.0.zeroize();
    }
}

impl IdentifierKey {
    fn derive(key: &DailyTracingKey) -> Result<Self, IdentityError> {
        let bytes: [u8; 16] = HKDF::derive_array(None, key.key_data(), IDENTIFIER_KEY_INFO)?;
        Ok(IdentifierKey(bytes))
    }

    fn identifier(&self, interval: IntervalNumber) -> RollingProximityIdentifier {
        let mut padded = [0u8; 16];
        padded[..6].copy_from_slice(IDENTIFIER_PREFIX);
        padded[12..].copy_from_slice(&interval.0.to_le_bytes());

        let mac = hmac_sha256(&self.0, &padded);
        let mut out = [0u8; IDENTIFIER_LEN];
        out.copy_from_slice(&mac[..IDENTIFIER_LEN]);
        RollingProximityIdentifier::from_bytes(out)
    }
}

/// Generates daily keys and derives their rolling identifiers.
pub struct RotatingIdentityGenerator {
    rng: SystemRandom,
}

impl Default for RotatingIdentityGenerator {
    fn default() -> Self {
        Self::new()
    }
}

impl RotatingIdentityGenerator {
    /// Creates a generator backed by the system random number generator.
    pub fn new() -> Self {
        RotatingIdentityGenerator {
            rng: SystemRandom::new(),
        }
    }

    /// Generates a fresh random key for `day`.
    ///
    /// Fails only when the system entropy source is unavailable.
    pub fn new_daily_key(&self, day: DayNumber) -> Result<DailyTracingKey, IdentityError> {
        let mut key_data = [0u8; DAILY_KEY_LEN];
        self.rng
            .fill(&mut key_data)
            .map_err(|_| IdentityError::EntropyUnavailable)?;

        let key = DailyTracingKey::new(key_data, day);
        key_data.zeroize();
        debug!(day = day.0, "generated daily tracing key");
        Ok(key)
    }

    /// Returns the identifier broadcast during `interval` under `key`.
    pub fn current_identifier(
        &self,
        key: &DailyTracingKey,
        interval: IntervalNumber,
    ) -> Result<RollingProximityIdentifier, IdentityError> {
        if !key.covers(interval) {
            return Err(IdentityError::IntervalOutsideKey {
                interval: interval.0,
                day: key.day().0,
            });
        }

        Ok(IdentifierKey::derive(key)?.identifier(interval))
    }

    /// Recomputes every identifier `key` could have produced, in window order.
    pub fn identifiers_for_key(
        &self,
        key: &DailyTracingKey,
    ) -> Result<Vec<(IntervalNumber, RollingProximityIdentifier)>, IdentityError> {
        let identifier_key = IdentifierKey::derive(key)?;
        Ok(key
            .intervals()
            .map(|interval| (interval, identifier_key.identifier(interval)))
            .collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::time::INTERVALS_PER_DAY;

    #[test]
    fn test_identifier_is_deterministic() {
        let generator = RotatingIdentityGenerator::new();
        let key = DailyTracingKey::new([1u8; 16], DayNumber(19_000));
        let interval = DayNumber(19_000).first_interval();

        let a = generator.current_identifier(&key, interval).unwrap();
        let b = generator.current_identifier(&key, interval).unwrap();
        assert_eq!(a, b);
    }

    #[test]
    fn test_identifiers_for_key_matches_current_identifier() {
        let generator = RotatingIdentityGenerator::new();
        let key = generator.new_daily_key(DayNumber(19_001)).unwrap();
        let all = generator.identifiers_for_key(&key).unwrap();

        assert_eq!(all.len(), INTERVALS_PER_DAY as usize);
        for (interval, id) in all.iter().step_by(17) {
            assert_eq!(generator.current_identifier(&key, *interval).unwrap(), *id);
        }
    }

    #[test]
    fn test_interval_outside_key_rejected() {
        let generator = RotatingIdentityGenerator::new();
        let key = DailyTracingKey::new([2u8; 16], DayNumber(19_000));
        let next_day = DayNumber(19_001).first_interval();

        assert!(matches!(
            generator.current_identifier(&key, next_day),
            Err(IdentityError::IntervalOutsideKey { .. })
        ));
    }
}
