// SPDX-FileCopyrightText: 2026 Mattia Egloff <mattia.egloff@pm.me>
//
// SPDX-License-Identifier: GPL-3.0-or-later

//! Proptest Strategies

use proptest::prelude::*;
use tracekit_core::identity::DailyTracingKey;
use tracekit_core::time::{DayNumber, INTERVALS_PER_DAY};

/// Days between 2020 and 2050.
pub fn day_strategy() -> impl Strategy<Value = DayNumber> {
    (18_262u32..29_220).prop_map(DayNumber)
}

/// Arbitrary daily tracing key.
pub fn key_strategy() -> impl Strategy<Value = DailyTracingKey> {
    (any::<[u8; 16]>(), day_strategy()).prop_map(|(bytes, day)| DailyTracingKey::new(bytes, day))
}

/// Two distinct window indices within one day.
pub fn distinct_windows_strategy() -> impl Strategy<Value = (u32, u32)> {
    (0..INTERVALS_PER_DAY, 0..INTERVALS_PER_DAY).prop_filter("distinct", |(a, b)| a != b)
}
