// SPDX-FileCopyrightText: 2026 Mattia Egloff <mattia.egloff@pm.me>
//
// SPDX-License-Identifier: GPL-3.0-or-later

//! Exposure Risk Scoring
//!
//! Each exposure is placed into one of eight buckets along four dimensions
//! (attenuation, days since exposure, duration, transmission risk). Every
//! dimension maps its bucket to a score, scaled by the dimension's weight.
//! The total risk score is the product of the four weighted scores, clamped
//! to 0..=255.

use serde::{Deserialize, Serialize};

use super::MatchingError;
use crate::storage::ExposureRecord;
use crate::time::DayNumber;

/// Number of buckets per dimension.
pub const BUCKET_COUNT: usize = 8;

/// Weight and per-bucket scores for one dimension.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BucketConfig {
    /// Percentage weight, 0..=100.
    pub weight: f64,
    /// Score for each bucket, lowest risk first.
    pub scores: Vec<u8>,
}

impl BucketConfig {
    pub fn new(weight: f64, scores: [u8; BUCKET_COUNT]) -> Self {
        BucketConfig {
            weight,
            scores: scores.to_vec(),
        }
    }

    fn validate(&self, name: &str) -> Result<(), MatchingError> {
        if !(0.0..=100.0).contains(&self.weight) {
            return Err(MatchingError::InvalidConfiguration(format!(
                "{} weight {} must be in the range 0..=100",
                name, self.weight
            )));
        }
        if self.scores.len() != BUCKET_COUNT {
            return Err(MatchingError::InvalidConfiguration(format!(
                "{} must have exactly {} scores, got {}",
                name,
                BUCKET_COUNT,
                self.scores.len()
            )));
        }
        Ok(())
    }

    fn weighted(&self, bucket: usize) -> f64 {
        let score = self.scores.get(bucket).copied().unwrap_or(0);
        score as f64 * self.weight / 100.0
    }
}

/// Parameters used to score exposures.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ExposureConfiguration {
    /// Exposures scoring below this are not reported as contacts.
    pub minimum_risk_score: u8,
    pub attenuation: BucketConfig,
    pub days_since_last_exposure: BucketConfig,
    pub duration: BucketConfig,
    pub transmission_risk: BucketConfig,
}

impl Default for ExposureConfiguration {
    fn default() -> Self {
        ExposureConfiguration {
            minimum_risk_score: 1,
            attenuation: BucketConfig::new(100.0, [1; BUCKET_COUNT]),
            days_since_last_exposure: BucketConfig::new(100.0, [1; BUCKET_COUNT]),
            duration: BucketConfig::new(100.0, [0, 1, 2, 3, 4, 5, 6, 7]),
            transmission_risk: BucketConfig::new(100.0, [1; BUCKET_COUNT]),
        }
    }
}

impl ExposureConfiguration {
    /// Parses and validates a JSON configuration.
    pub fn from_json(json: &str) -> Result<Self, MatchingError> {
        let config: ExposureConfiguration = serde_json::from_str(json)
            .map_err(|e| MatchingError::InvalidConfiguration(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    /// Serializes the configuration to JSON.
    pub fn to_json(&self) -> Result<String, MatchingError> {
        serde_json::to_string_pretty(self)
            .map_err(|e| MatchingError::InvalidConfiguration(e.to_string()))
    }

    /// Checks weights and bucket counts.
    pub fn validate(&self) -> Result<(), MatchingError> {
        self.attenuation.validate("attenuation")?;
        self.days_since_last_exposure
            .validate("daysSinceLastExposure")?;
        self.duration.validate("duration")?;
        self.transmission_risk.validate("transmissionRisk")?;
        Ok(())
    }

    /// Total risk score of `record` as of `today`.
    pub fn score(&self, record: &ExposureRecord, today: DayNumber) -> u8 {
        let days = record.date.days_until(today);
        let total = self.attenuation.weighted(attenuation_bucket(record.attenuation))
            * self
                .days_since_last_exposure
                .weighted(days_since_bucket(days))
            * self
                .duration
                .weighted(duration_bucket(record.duration_secs / 60))
            * self
                .transmission_risk
                .weighted(record.transmission_risk_level.min(7) as usize);

        total.round().clamp(0.0, u8::MAX as f64) as u8
    }

    /// Returns true if `record` scores at least the minimum risk score.
    pub fn is_reportable(&self, record: &ExposureRecord) -> bool {
        record.total_risk_score >= self.minimum_risk_score
    }
}

/// Coarse classification of a risk score.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum SimplifiedRisk {
    Low,
    Medium,
    High,
}

impl SimplifiedRisk {
    pub fn from_score(score: u8) -> Self {
        match score {
            7.. => SimplifiedRisk::High,
            5..=6 => SimplifiedRisk::Medium,
            _ => SimplifiedRisk::Low,
        }
    }
}

impl std::fmt::Display for SimplifiedRisk {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            SimplifiedRisk::Low => write!(f, "low"),
            SimplifiedRisk::Medium => write!(f, "medium"),
            SimplifiedRisk::High => write!(f, "high"),
        }
    }
}

/// Attenuation in dB: weaker signal, lower bucket.
fn attenuation_bucket(attenuation: u8) -> usize {
    match attenuation {
        74.. => 0,
        64..=73 => 1,
        52..=63 => 2,
        34..=51 => 3,
        28..=33 => 4,
        16..=27 => 5,
        11..=15 => 6,
        _ => 7,
    }
}

/// Days since the exposure: older, lower bucket.
fn days_since_bucket(days: u32) -> usize {
    match days {
        14.. => 0,
        12..=13 => 1,
        10..=11 => 2,
        8..=9 => 3,
        6..=7 => 4,
        4..=5 => 5,
        2..=3 => 6,
        _ => 7,
    }
}

/// Duration in minutes: longer, higher bucket.
fn duration_bucket(minutes: u64) -> usize {
    match minutes {
        0 => 0,
        1..=5 => 1,
        6..=10 => 2,
        11..=15 => 3,
        16..=20 => 4,
        21..=25 => 5,
        26..=30 => 6,
        _ => 7,
    }
}
