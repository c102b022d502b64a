// SPDX-FileCopyrightText: 2026 Mattia Egloff <mattia.egloff@pm.me>
//
// SPDX-License-Identifier: GPL-3.0-or-later

//! Time Windows
//!
//! Interval and day arithmetic shared by key rotation, scanning and matching,
//! plus the `Clock` abstraction every time-dependent component reads from.

use std::sync::atomic::{AtomicU64, Ordering};

use serde::{Deserialize, Serialize};

/// Length of one rotation window in seconds (10 minutes).
pub const INTERVAL_SECONDS: u64 = 600;

/// Number of rotation windows in one day.
pub const INTERVALS_PER_DAY: u32 = 144;

/// Seconds in one calendar day (UTC).
pub const SECONDS_PER_DAY: u64 = 86_400;

/// Source of the current Unix time in seconds.
pub trait Clock: Send + Sync {
    /// Returns the current Unix timestamp in seconds.
    fn now(&self) -> u64;

    /// Returns the current rotation window.
    fn interval(&self) -> IntervalNumber {
        IntervalNumber::from_timestamp(self.now())
    }

    /// Returns the current calendar day.
    fn today(&self) -> DayNumber {
        DayNumber::from_timestamp(self.now())
    }
}

/// Wall clock backed by `SystemTime`.
#[derive(Debug, Default, Clone, Copy)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> u64 {
        std::time::SystemTime::now()
            .duration_since(std::time::UNIX_EPOCH)
            .map(|d| d.as_secs())
            .unwrap_or(0)
    }
}

/// Manually driven clock for tests and simulations.
#[derive(Debug, Default)]
pub struct ManualClock {
    now: AtomicU64,
}

impl ManualClock {
    /// Creates a clock frozen at `now`.
    pub fn new(now: u64) -> Self {
        ManualClock {
            now: AtomicU64::new(now),
        }
    }

    /// Moves the clock to an absolute timestamp.
    pub fn set(&self, now: u64) {
        self.now.store(now, Ordering::SeqCst);
    }

    /// Advances the clock by `secs` seconds.
    pub fn advance(&self, secs: u64) {
        self.now.fetch_add(secs, Ordering::SeqCst);
    }

    /// Advances the clock by whole days.
    pub fn advance_days(&self, days: u64) {
        self.advance(days * SECONDS_PER_DAY);
    }
}

impl Clock for ManualClock {
    fn now(&self) -> u64 {
        self.now.load(Ordering::SeqCst)
    }
}

/// Index of a 10-minute rotation window since the Unix epoch.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct IntervalNumber(pub u32);

impl IntervalNumber {
    /// Returns the window containing `timestamp`.
    pub fn from_timestamp(timestamp: u64) -> Self {
        IntervalNumber((timestamp / INTERVAL_SECONDS) as u32)
    }

    /// Returns the Unix timestamp at which this window starts.
    pub fn start_timestamp(self) -> u64 {
        u64::from(self.0) * INTERVAL_SECONDS
    }

    /// Returns the day this window belongs to.
    pub fn day(self) -> DayNumber {
        DayNumber(self.0 / INTERVALS_PER_DAY)
    }

    /// Returns the position of this window inside its day (0..144).
    pub fn index_in_day(self) -> u32 {
        self.0 % INTERVALS_PER_DAY
    }
}

/// Calendar day (UTC) counted from the Unix epoch.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct DayNumber(pub u32);

impl DayNumber {
    /// Returns the day containing `timestamp`.
    pub fn from_timestamp(timestamp: u64) -> Self {
        DayNumber((timestamp / SECONDS_PER_DAY) as u32)
    }

    /// First rotation window of the day (the key's rolling start number).
    ///
    /// Saturates for days past the last representable interval.
    pub fn first_interval(self) -> IntervalNumber {
        IntervalNumber(self.0.saturating_mul(INTERVALS_PER_DAY))
    }

    /// Unix timestamp of midnight at the start of the day.
    pub fn start_timestamp(self) -> u64 {
        u64::from(self.0) * SECONDS_PER_DAY
    }

    /// Unix timestamp of midnight at the end of the day.
    pub fn end_timestamp(self) -> u64 {
        self.start_timestamp() + SECONDS_PER_DAY
    }

    /// Returns the day `days` before this one, saturating at the epoch.
    pub fn minus(self, days: u32) -> Self {
        DayNumber(self.0.saturating_sub(days))
    }

    /// Returns the day `days` after this one.
    pub fn plus(self, days: u32) -> Self {
        DayNumber(self.0.saturating_add(days))
    }

    /// Whole days elapsed from `self` until `later` (zero if `later` is earlier).
    pub fn days_until(self, later: DayNumber) -> u32 {
        later.0.saturating_sub(self.0)
    }
}

impl std::fmt::Display for DayNumber {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "day {}", self.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_interval_and_day_alignment() {
        let ts = 1_700_000_123;
        let interval = IntervalNumber::from_timestamp(ts);
        let day = DayNumber::from_timestamp(ts);

        assert_eq!(interval.day(), day);
        assert!(interval.start_timestamp() <= ts);
        assert!(ts < interval.start_timestamp() + INTERVAL_SECONDS);
        assert_eq!(day.first_interval().index_in_day(), 0);
        assert_eq!(day.first_interval().day(), day);
    }

    #[test]
    fn test_first_interval_saturates() {
        assert_eq!(DayNumber(u32::MAX).first_interval(), IntervalNumber(u32::MAX));
    }

    #[test]
    fn test_manual_clock_advance() {
        let clock = ManualClock::new(1_000);
        clock.advance(500);
        assert_eq!(clock.now(), 1_500);
        clock.advance_days(1);
        assert_eq!(clock.now(), 1_500 + SECONDS_PER_DAY);
    }

    #[test]
    fn test_days_until_saturates() {
        assert_eq!(DayNumber(10).days_until(DayNumber(14)), 4);
        assert_eq!(DayNumber(14).days_until(DayNumber(10)), 0);
        assert_eq!(DayNumber(3).minus(5), DayNumber(0));
    }
}
