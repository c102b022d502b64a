// SPDX-FileCopyrightText: 2026 Mattia Egloff <mattia.egloff@pm.me>
//
// SPDX-License-Identifier: GPL-3.0-or-later

//! Exposure Matcher
//!
//! Recomputes every identifier a diagnosis key could have broadcast, looks
//! them up in the stored observations, and folds matched contact time into
//! per-day exposure records.
//!
//! A pass reads one snapshot of the observations taken at its start and
//! writes all of its folds in a single transaction, so it either commits in
//! full or leaves the records untouched.

mod diagnosis;
mod feed;
mod risk;

pub use diagnosis::{AuthoritySignature, DiagnosisKey, DiagnosisKeySet, SignatureProblem};
pub use feed::{
    DiagnosisKeyFeed, FeedError, FeedListType, FeedResponse, FileKeyFeed, MockKeyFeed,
};
pub use risk::{BucketConfig, ExposureConfiguration, SimplifiedRisk, BUCKET_COUNT};

use std::collections::{BTreeMap, HashMap};
use std::sync::Arc;
use std::time::Duration;

use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::{debug, info, warn};

use crate::crypto::PublicKey;
use crate::identity::{IdentityError, RollingProximityIdentifier, RotatingIdentityGenerator};
use crate::storage::{
    ExposureRecord, KeyStore, MatchFold, ProximityObservation, RetractOutcome, StorageError,
    RETENTION_DAYS,
};
use crate::time::{Clock, DayNumber, INTERVAL_SECONDS, SECONDS_PER_DAY};

/// Maximum number of diagnosis keys accepted per matching call.
pub const MAX_DIAGNOSIS_KEYS: usize = 1000;

/// Returns the maximum number of diagnosis keys accepted per call.
pub fn max_diagnosis_keys() -> usize {
    MAX_DIAGNOSIS_KEYS
}

/// Matching errors.
#[derive(Error, Debug)]
pub enum MatchingError {
    #[error("Too many diagnosis keys: {count} exceeds the maximum of {max}")]
    TooManyKeys { count: usize, max: usize },

    #[error("Diagnosis key {index} is not signed")]
    MissingSignature { index: usize },

    #[error("Diagnosis key {index} is signed by an untrusted authority")]
    UntrustedAuthority { index: usize },

    #[error("Diagnosis key {index} has an invalid signature")]
    InvalidSignature { index: usize },

    #[error("Invalid diagnosis key {index}: {source}")]
    InvalidKey {
        index: usize,
        #[source]
        source: IdentityError,
    },

    #[error("Diagnosis key {index} is for day {day}, which has not started yet")]
    FutureKey { index: usize, day: u32 },

    #[error("Invalid exposure configuration: {0}")]
    InvalidConfiguration(String),

    #[error("Identity error: {0}")]
    Identity(#[from] IdentityError),

    #[error("Storage error: {0}")]
    Storage(#[from] StorageError),
}

impl MatchingError {
    /// True for errors caused by the caller's input rather than the device.
    pub fn is_bad_parameter(&self) -> bool {
        matches!(
            self,
            MatchingError::TooManyKeys { .. }
                | MatchingError::MissingSignature { .. }
                | MatchingError::UntrustedAuthority { .. }
                | MatchingError::InvalidSignature { .. }
                | MatchingError::InvalidKey { .. }
                | MatchingError::FutureKey { .. }
                | MatchingError::InvalidConfiguration(_)
        )
    }
}

/// Matching parameters.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MatchingConfig {
    /// Days of observations considered.
    pub retention_days: u32,
    /// Allowed clock skew between an identifier's window and its sighting.
    pub interval_tolerance: Duration,
    /// Authorities whose signatures are accepted. When empty, unsigned keys
    /// are accepted.
    pub trusted_authorities: Vec<PublicKey>,
}

impl Default for MatchingConfig {
    fn default() -> Self {
        MatchingConfig {
            retention_days: RETENTION_DAYS,
            interval_tolerance: Duration::from_secs(2 * 60 * 60),
            trusted_authorities: Vec::new(),
        }
    }
}

/// Result of one matching pass.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExposureSummary {
    /// Days since the most recent matched contact, if any matched.
    pub days_since_last_exposure: Option<u32>,
    /// Keys in the set that matched at least one observation.
    pub matched_key_count: u32,
    /// Highest risk score among the days the set matched.
    pub maximum_risk_score: u8,
    /// Records created or extended by this pass.
    #[serde(skip)]
    pub updated: Vec<ExposureRecord>,
}

/// Matches diagnosis keys against stored observations.
pub struct ExposureMatcher {
    store: Arc<Mutex<KeyStore>>,
    clock: Arc<dyn Clock>,
    generator: RotatingIdentityGenerator,
    config: MatchingConfig,
}

impl ExposureMatcher {
    pub fn new(store: Arc<Mutex<KeyStore>>, clock: Arc<dyn Clock>, config: MatchingConfig) -> Self {
        ExposureMatcher {
            store,
            clock,
            generator: RotatingIdentityGenerator::new(),
            config,
        }
    }

    pub fn config(&self) -> &MatchingConfig {
        &self.config
    }

    /// Checks size, structure and signatures without touching the store.
    pub fn validate(&self, keys: &DiagnosisKeySet) -> Result<(), MatchingError> {
        if keys.len() > MAX_DIAGNOSIS_KEYS {
            return Err(MatchingError::TooManyKeys {
                count: keys.len(),
                max: MAX_DIAGNOSIS_KEYS,
            });
        }

        let trusted = &self.config.trusted_authorities;
        if trusted.is_empty() && !keys.is_empty() {
            warn!("no trusted authorities configured; accepting unsigned diagnosis keys");
        }

        let today = self.clock.today();
        for (index, dk) in keys.iter().enumerate() {
            dk.key
                .validate()
                .map_err(|source| MatchingError::InvalidKey { index, source })?;
            if dk.key.day() > today {
                return Err(MatchingError::FutureKey {
                    index,
                    day: dk.key.day().0,
                });
            }

            if trusted.is_empty() {
                continue;
            }
            dk.verify(trusted).map_err(|problem| match problem {
                SignatureProblem::Missing => MatchingError::MissingSignature { index },
                SignatureProblem::UntrustedAuthority => MatchingError::UntrustedAuthority { index },
                SignatureProblem::Invalid => MatchingError::InvalidSignature { index },
            })?;
        }
        Ok(())
    }

    /// Runs a full matching pass and folds the result into the store.
    ///
    /// Fails fast, without mutating anything, if the set does not validate.
    /// Re-submitting keys that were already folded leaves the records
    /// unchanged.
    pub fn match_keys(
        &self,
        keys: &DiagnosisKeySet,
        exposure_config: &ExposureConfiguration,
    ) -> Result<ExposureSummary, MatchingError> {
        self.validate(keys)?;

        let today = self.clock.today();
        let expired = today.minus(self.config.retention_days);
        let snapshot = self
            .store
            .lock()
            .observations_since(self.config.retention_days)?;
        // Days the purge expires have no ledger rows left to guard them.
        let index: HashMap<RollingProximityIdentifier, &ProximityObservation> = snapshot
            .iter()
            .filter(|o| o.day() > expired)
            .map(|o| (o.identifier, o))
            .collect();

        let (folds, matched_keys) = self.collect_folds(keys, &index)?;

        let store = self.store.lock();
        let outcome = store.fold_matches(&folds, |record| exposure_config.score(record, today))?;

        let mut summary = ExposureSummary {
            matched_key_count: matched_keys,
            updated: outcome.updated,
            ..ExposureSummary::default()
        };

        let mut days: Vec<DayNumber> = folds.iter().map(|f| f.date).collect();
        days.sort();
        days.dedup();
        for day in days {
            if let Some(record) = store.exposure_record(day)? {
                summary.maximum_risk_score = summary.maximum_risk_score.max(record.total_risk_score);
                let since = record.date.days_until(today);
                summary.days_since_last_exposure = Some(
                    summary
                        .days_since_last_exposure
                        .map_or(since, |d| d.min(since)),
                );
            }
        }
        drop(store);

        info!(
            keys = keys.len(),
            observations = snapshot.len(),
            matched_keys,
            folded = outcome.folded,
            skipped = outcome.skipped,
            "matching pass complete"
        );
        Ok(summary)
    }

    /// Takes keys the server withdrew back out of the exposure records.
    pub fn retract_keys(
        &self,
        keys: &[DiagnosisKey],
        exposure_config: &ExposureConfiguration,
    ) -> Result<RetractOutcome, MatchingError> {
        let today = self.clock.today();
        let fingerprints: Vec<String> = keys.iter().map(DiagnosisKey::fingerprint).collect();
        let outcome = self
            .store
            .lock()
            .retract_matches(&fingerprints, |record| exposure_config.score(record, today))?;

        if outcome.retracted > 0 {
            info!(
                keys = keys.len(),
                retracted = outcome.retracted,
                removed = outcome.removed.len(),
                "withdrawn diagnosis keys retracted"
            );
        }
        Ok(outcome)
    }

    fn collect_folds(
        &self,
        keys: &DiagnosisKeySet,
        index: &HashMap<RollingProximityIdentifier, &ProximityObservation>,
    ) -> Result<(Vec<MatchFold>, u32), MatchingError> {
        let tolerance = self.config.interval_tolerance.as_secs();
        let mut folds: Vec<MatchFold> = Vec::new();
        let mut matched_keys = 0u32;

        if index.is_empty() {
            return Ok((folds, matched_keys));
        }

        for dk in keys.iter() {
            let fingerprint = dk.fingerprint();
            let risk = dk.key.transmission_risk_level();
            let mut per_day: BTreeMap<DayNumber, (u64, u8)> = BTreeMap::new();

            for (interval, identifier) in self.generator.identifiers_for_key(&dk.key)? {
                let Some(observation) = index.get(&identifier) else {
                    continue;
                };

                let window_start = interval.start_timestamp().saturating_sub(tolerance);
                let window_end = interval.start_timestamp() + INTERVAL_SECONDS + tolerance;
                if observation.first_seen < window_start || observation.first_seen > window_end {
                    debug!(
                        interval = interval.0,
                        "identifier matched outside its window; ignoring"
                    );
                    continue;
                }

                let entry = per_day
                    .entry(observation.day())
                    .or_insert((0, u8::MAX));
                entry.0 = (entry.0 + observation.duration_secs()).min(SECONDS_PER_DAY);
                entry.1 = entry.1.min(observation.attenuation);
            }

            if per_day.is_empty() {
                continue;
            }
            matched_keys += 1;
            folds.extend(
                per_day
                    .into_iter()
                    .map(|(date, (duration_secs, attenuation))| MatchFold {
                        key_fingerprint: fingerprint.clone(),
                        date,
                        duration_secs,
                        attenuation,
                        transmission_risk_level: risk,
                    }),
            );
        }

        Ok((folds, matched_keys))
    }
}
