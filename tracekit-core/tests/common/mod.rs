// SPDX-FileCopyrightText: 2026 Mattia Egloff <mattia.egloff@pm.me>
//
// SPDX-License-Identifier: GPL-3.0-or-later

//! Common Test Utilities
//!
//! Shared clocks, stores and observation fixtures used across test modules.

#![allow(dead_code)]

pub mod strategies;

use std::sync::Arc;

use parking_lot::Mutex;
use tracekit_core::identity::{DailyTracingKey, RollingProximityIdentifier};
use tracekit_core::storage::{KeyStore, ProximityObservation};
use tracekit_core::time::{DayNumber, IntervalNumber, ManualClock, SECONDS_PER_DAY};
use tracekit_core::{RotatingIdentityGenerator, SymmetricKey};

/// A fixed calendar day used as "day D" in scenarios.
pub const DAY: DayNumber = DayNumber(19_675);

/// Noon (UTC) on `day`.
pub fn noon(day: DayNumber) -> u64 {
    day.start_timestamp() + SECONDS_PER_DAY / 2
}

/// Clock frozen at noon on `DAY`.
pub fn clock() -> Arc<ManualClock> {
    Arc::new(ManualClock::new(noon(DAY)))
}

pub fn store(clock: &Arc<ManualClock>) -> KeyStore {
    KeyStore::in_memory(SymmetricKey::generate().unwrap(), clock.clone()).unwrap()
}

pub fn shared_store(clock: &Arc<ManualClock>) -> Arc<Mutex<KeyStore>> {
    Arc::new(Mutex::new(store(clock)))
}

/// Identifier broadcast by `key` during the window `index` of its day.
pub fn identifier(key: &DailyTracingKey, index: u32) -> (IntervalNumber, RollingProximityIdentifier) {
    let interval = IntervalNumber(key.rolling_start_number().0 + index);
    let id = RotatingIdentityGenerator::new()
        .current_identifier(key, interval)
        .unwrap();
    (interval, id)
}

/// An observation of window `index` of `key`, starting a minute into the
/// window and lasting `secs` seconds.
pub fn observation_of(key: &DailyTracingKey, index: u32, secs: u64) -> ProximityObservation {
    let (interval, id) = identifier(key, index);
    let first = interval.start_timestamp() + 60;
    ProximityObservation::new(id, first, first + secs, -60, 1, 1.1)
}

/// Random key for `day`.
pub fn key_for(day: DayNumber) -> DailyTracingKey {
    RotatingIdentityGenerator::new().new_daily_key(day).unwrap()
}
