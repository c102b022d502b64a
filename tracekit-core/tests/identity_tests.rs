// SPDX-FileCopyrightText: 2026 Mattia Egloff <mattia.egloff@pm.me>
//
// SPDX-License-Identifier: GPL-3.0-or-later

//! Tests for identity: daily keys and rolling identifiers

mod common;

use std::collections::HashSet;

use common::strategies::{distinct_windows_strategy, key_strategy};
use proptest::prelude::*;
use tracekit_core::identity::{DailyTracingKey, IdentityError, RotatingIdentityGenerator};
use tracekit_core::time::{DayNumber, IntervalNumber, INTERVALS_PER_DAY};

#[test]
fn test_every_window_of_a_day_has_a_distinct_identifier() {
    let generator = RotatingIdentityGenerator::new();
    let key = generator.new_daily_key(common::DAY).unwrap();

    let ids: HashSet<_> = key
        .intervals()
        .map(|interval| generator.current_identifier(&key, interval).unwrap())
        .collect();
    assert_eq!(ids.len(), INTERVALS_PER_DAY as usize);
}

#[test]
fn test_fresh_keys_are_random_and_valid() {
    let generator = RotatingIdentityGenerator::new();
    let a = generator.new_daily_key(common::DAY).unwrap();
    let b = generator.new_daily_key(common::DAY).unwrap();

    assert_ne!(a.key_data(), b.key_data());
    assert!(a.validate().is_ok());
    assert_eq!(a.day(), common::DAY);
    assert_eq!(a.rolling_start_number(), common::DAY.first_interval());
    assert_eq!(a.rolling_period(), INTERVALS_PER_DAY);
}

#[test]
fn test_identifier_outside_the_key_day_is_rejected() {
    let generator = RotatingIdentityGenerator::new();
    let key = generator.new_daily_key(common::DAY).unwrap();
    let next_day = common::DAY.plus(1).first_interval();

    assert!(matches!(
        generator.current_identifier(&key, next_day),
        Err(IdentityError::IntervalOutsideKey { .. })
    ));
}

#[test]
fn test_different_keys_give_different_identifiers() {
    let generator = RotatingIdentityGenerator::new();
    let interval = common::DAY.first_interval();
    let a = DailyTracingKey::new([1u8; 16], common::DAY);
    let b = DailyTracingKey::new([2u8; 16], common::DAY);

    assert_ne!(
        generator.current_identifier(&a, interval).unwrap(),
        generator.current_identifier(&b, interval).unwrap()
    );
}

#[test]
fn test_key_debug_is_redacted() {
    let key = DailyTracingKey::new([0xAB; 16], DayNumber(19_000));
    let debug = format!("{:?}", key);
    assert!(!debug.to_lowercase().contains("abab"));
}

#[test]
fn test_invalid_risk_level_fails_validation() {
    let key = DailyTracingKey::new([1u8; 16], common::DAY).with_transmission_risk_level(8);
    assert!(matches!(key.validate(), Err(IdentityError::InvalidKey(_))));
}

#[test]
fn test_key_running_past_last_interval_fails_validation() {
    let last_day_start = IntervalNumber(u32::MAX - u32::MAX % INTERVALS_PER_DAY);
    assert_eq!(last_day_start.0, 4_294_967_184);

    let result = DailyTracingKey::from_parts([9u8; 16], last_day_start, INTERVALS_PER_DAY, 0);
    assert!(matches!(result, Err(IdentityError::InvalidKey(_))));

    // A shorter period on the same day still fits.
    let short = DailyTracingKey::from_parts([9u8; 16], last_day_start, 100, 0).unwrap();
    assert_eq!(short.intervals().count(), 100);
}

proptest! {
    #[test]
    fn prop_windows_are_unlinkable(key in key_strategy(), (w1, w2) in distinct_windows_strategy()) {
        let generator = RotatingIdentityGenerator::new();
        let start = key.rolling_start_number().0;
        let a = generator.current_identifier(&key, IntervalNumber(start + w1)).unwrap();
        let b = generator.current_identifier(&key, IntervalNumber(start + w2)).unwrap();

        prop_assert_ne!(a, b);
        prop_assert_ne!(a.as_bytes(), key.key_data());
        prop_assert_ne!(b.as_bytes(), key.key_data());
    }

    #[test]
    fn prop_derivation_is_deterministic(key in key_strategy(), window in 0..INTERVALS_PER_DAY) {
        let interval = IntervalNumber(key.rolling_start_number().0 + window);
        let a = RotatingIdentityGenerator::new().current_identifier(&key, interval).unwrap();
        let b = RotatingIdentityGenerator::new().current_identifier(&key, interval).unwrap();
        prop_assert_eq!(a, b);
    }
}
