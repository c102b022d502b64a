// SPDX-FileCopyrightText: 2026 Mattia Egloff <mattia.egloff@pm.me>
//
// SPDX-License-Identifier: GPL-3.0-or-later

//! Tracekit Core Library
//!
//! Decentralized proximity key exchange and exposure matching.
//! All cryptographic operations use the audited `ring` crate.

pub mod api;
pub mod beacon;
pub mod crypto;
pub mod identity;
pub mod matching;
pub mod storage;
pub mod time;

pub use api::{
    Status, Task, TaskOutcome, TracingConfig, TracingController, TracingError, TracingEvent,
    TracingResult, TracingState,
};
pub use beacon::{BeaconConfig, BeaconTransceiver, MockRadio, Radio, SimulatedRadio};
pub use crypto::{PublicKey, Signature, SigningKeyPair, SymmetricKey};
pub use identity::{DailyTracingKey, RollingProximityIdentifier, RotatingIdentityGenerator};
pub use matching::{
    max_diagnosis_keys, DiagnosisKey, DiagnosisKeySet, ExposureConfiguration, ExposureMatcher,
    ExposureSummary, MAX_DIAGNOSIS_KEYS,
};
pub use storage::{ExposureRecord, KeyStore, ProximityObservation, StorageError};
pub use time::{Clock, DayNumber, IntervalNumber, ManualClock, SystemClock};
