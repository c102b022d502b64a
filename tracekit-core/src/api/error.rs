// SPDX-FileCopyrightText: 2026 Mattia Egloff <mattia.egloff@pm.me>
//
// SPDX-License-Identifier: GPL-3.0-or-later

//! API Error Types
//!
//! Unified error type for the tracing API layer and the `Status` codes every
//! asynchronous operation resolves to.

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::beacon::{BeaconError, RadioError};
use crate::crypto::EncryptionError;
use crate::identity::IdentityError;
use crate::matching::{FeedError, MatchingError};
use crate::storage::StorageError;

/// Unified error type for tracing operations.
#[derive(Error, Debug)]
pub enum TracingError {
    /// The user declined the opt-in prompt.
    #[error("user rejected the opt-in request")]
    RejectedOptIn,

    /// The operation needs tracing to be enabled.
    #[error("contact tracing is not enabled")]
    ServiceDisabled,

    /// No consent prompt is waiting for an answer.
    #[error("no consent request is pending")]
    NoPendingConsent,

    /// Radio operation failed.
    #[error("radio error: {0}")]
    Radio(#[from] RadioError),

    /// Storage operation failed.
    #[error("storage error: {0}")]
    Storage(#[from] StorageError),

    /// Diagnosis key matching failed.
    #[error("matching error: {0}")]
    Matching(#[from] MatchingError),

    /// Key feed could not be read.
    #[error("feed error: {0}")]
    Feed(#[from] FeedError),

    /// Key generation or derivation failed.
    #[error("identity error: {0}")]
    Identity(#[from] IdentityError),

    /// Storage key could not be created.
    #[error("crypto error: {0}")]
    Crypto(#[from] EncryptionError),

    /// Unexpected failure.
    #[error("internal error: {0}")]
    Internal(String),
}

impl From<BeaconError> for TracingError {
    fn from(err: BeaconError) -> Self {
        match err {
            BeaconError::Radio(e) => TracingError::Radio(e),
            BeaconError::Storage(e) => TracingError::Storage(e),
            BeaconError::Identity(e) => TracingError::Identity(e),
        }
    }
}

impl TracingError {
    /// True when a collaborator (radio, storage, entropy) failed, as opposed
    /// to the caller asking for something invalid.
    pub fn is_dependency_failure(&self) -> bool {
        match self {
            TracingError::Radio(_)
            | TracingError::Storage(_)
            | TracingError::Identity(_)
            | TracingError::Crypto(_)
            | TracingError::Internal(_) => true,
            TracingError::Matching(e) => !e.is_bad_parameter(),
            TracingError::RejectedOptIn
            | TracingError::ServiceDisabled
            | TracingError::NoPendingConsent
            | TracingError::Feed(_) => false,
        }
    }
}

/// Result type for tracing operations.
pub type TracingResult<T> = Result<T, TracingError>;

/// Terminal status of an asynchronous operation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[repr(i32)]
pub enum Status {
    Success = 0,
    FailedRejectedOptIn = 1,
    FailedServiceDisabled = 2,
    FailedBluetoothScanningDisabled = 3,
    FailedTemporarilyDisabled = 4,
    FailedInsufficentStorage = 5,
    FailedInternal = 6,
    FailedBadParameter = 7,
}

impl Status {
    /// Numeric status code.
    pub fn code(self) -> i32 {
        self as i32
    }

    /// Parses a numeric status code.
    pub fn from_code(code: i32) -> Option<Self> {
        match code {
            0 => Some(Status::Success),
            1 => Some(Status::FailedRejectedOptIn),
            2 => Some(Status::FailedServiceDisabled),
            3 => Some(Status::FailedBluetoothScanningDisabled),
            4 => Some(Status::FailedTemporarilyDisabled),
            5 => Some(Status::FailedInsufficentStorage),
            6 => Some(Status::FailedInternal),
            7 => Some(Status::FailedBadParameter),
            _ => None,
        }
    }

    pub fn is_success(self) -> bool {
        self == Status::Success
    }

    /// Canonical upper-case name.
    pub fn name(self) -> &'static str {
        match self {
            Status::Success => "SUCCESS",
            Status::FailedRejectedOptIn => "FAILED_REJECTED_OPT_IN",
            Status::FailedServiceDisabled => "FAILED_SERVICE_DISABLED",
            Status::FailedBluetoothScanningDisabled => "FAILED_BLUETOOTH_SCANNING_DISABLED",
            Status::FailedTemporarilyDisabled => "FAILED_TEMPORARILY_DISABLED",
            Status::FailedInsufficentStorage => "FAILED_INSUFFICENT_STORAGE",
            Status::FailedInternal => "FAILED_INTERNAL",
            Status::FailedBadParameter => "FAILED_BAD_PARAMETER",
        }
    }
}

impl std::fmt::Display for Status {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.name())
    }
}

fn storage_status(err: &StorageError) -> Status {
    if err.is_insufficient_storage() {
        Status::FailedInsufficentStorage
    } else {
        Status::FailedInternal
    }
}

impl From<&TracingError> for Status {
    fn from(err: &TracingError) -> Self {
        match err {
            TracingError::RejectedOptIn => Status::FailedRejectedOptIn,
            TracingError::ServiceDisabled | TracingError::NoPendingConsent => {
                Status::FailedServiceDisabled
            }
            TracingError::Radio(RadioError::Disabled) => Status::FailedBluetoothScanningDisabled,
            TracingError::Radio(RadioError::Unavailable(_)) => Status::FailedServiceDisabled,
            TracingError::Radio(RadioError::Timeout) => Status::FailedInternal,
            TracingError::Storage(e) => storage_status(e),
            TracingError::Matching(MatchingError::Storage(e)) => storage_status(e),
            TracingError::Matching(e) if e.is_bad_parameter() => Status::FailedBadParameter,
            TracingError::Matching(_) => Status::FailedInternal,
            TracingError::Feed(_) => Status::FailedServiceDisabled,
            TracingError::Identity(_) | TracingError::Crypto(_) | TracingError::Internal(_) => {
                Status::FailedInternal
            }
        }
    }
}
