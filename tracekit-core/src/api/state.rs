// SPDX-FileCopyrightText: 2026 Mattia Egloff <mattia.egloff@pm.me>
//
// SPDX-License-Identifier: GPL-3.0-or-later

//! Tracing State

use serde::{Deserialize, Serialize};

use super::Status;

/// Lifecycle state owned by the controller.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum TracingState {
    #[default]
    Disabled,
    AwaitingConsent,
    Active,
    /// Beaconing continues; key uploads are suppressed until sharing is
    /// started again.
    TemporarilyDisabled,
    ErrorInternal,
    ErrorInsufficientStorage,
    ErrorServiceDisabled,
    ErrorBluetoothScanningDisabled,
}

impl TracingState {
    /// True while broadcasting and scanning.
    pub fn is_enabled(self) -> bool {
        matches!(self, TracingState::Active | TracingState::TemporarilyDisabled)
    }

    /// True for the terminal error states.
    pub fn is_error(self) -> bool {
        matches!(
            self,
            TracingState::ErrorInternal
                | TracingState::ErrorInsufficientStorage
                | TracingState::ErrorServiceDisabled
                | TracingState::ErrorBluetoothScanningDisabled
        )
    }

    /// Error state entered when a dependency fails with `status`.
    pub fn for_failure(status: Status) -> Self {
        match status {
            Status::FailedInsufficentStorage => TracingState::ErrorInsufficientStorage,
            Status::FailedServiceDisabled => TracingState::ErrorServiceDisabled,
            Status::FailedBluetoothScanningDisabled => {
                TracingState::ErrorBluetoothScanningDisabled
            }
            _ => TracingState::ErrorInternal,
        }
    }

    /// Status reported for this state by a status query.
    pub fn status(self) -> Status {
        match self {
            TracingState::Active => Status::Success,
            TracingState::TemporarilyDisabled => Status::FailedTemporarilyDisabled,
            TracingState::Disabled
            | TracingState::AwaitingConsent
            | TracingState::ErrorServiceDisabled => Status::FailedServiceDisabled,
            TracingState::ErrorInternal => Status::FailedInternal,
            TracingState::ErrorInsufficientStorage => Status::FailedInsufficentStorage,
            TracingState::ErrorBluetoothScanningDisabled => {
                Status::FailedBluetoothScanningDisabled
            }
        }
    }
}

impl std::fmt::Display for TracingState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            TracingState::Disabled => "disabled",
            TracingState::AwaitingConsent => "awaiting consent",
            TracingState::Active => "active",
            TracingState::TemporarilyDisabled => "temporarily disabled",
            TracingState::ErrorInternal => "error: internal",
            TracingState::ErrorInsufficientStorage => "error: insufficient storage",
            TracingState::ErrorServiceDisabled => "error: service disabled",
            TracingState::ErrorBluetoothScanningDisabled => "error: bluetooth scanning disabled",
        };
        f.write_str(name)
    }
}

/// Progress of this device's own diagnosis keys through the key server.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SubmissionStatus {
    #[default]
    NotSubmitted,
    /// Sharing is open but no key has been handed out yet.
    Pending,
    /// Keys were handed out for upload and have not come back in a feed.
    SubmittedUnapproved,
    /// At least one handed-out key was published back by the server.
    SubmittedApproved,
}

impl SubmissionStatus {
    /// True while waiting for handed-out keys to be published.
    pub fn awaiting_approval(self) -> bool {
        matches!(
            self,
            SubmissionStatus::Pending | SubmissionStatus::SubmittedUnapproved
        )
    }
}

impl std::fmt::Display for SubmissionStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            SubmissionStatus::NotSubmitted => "not submitted",
            SubmissionStatus::Pending => "pending",
            SubmissionStatus::SubmittedUnapproved => "submitted, not yet published",
            SubmissionStatus::SubmittedApproved => "published",
        };
        f.write_str(name)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_failure_states() {
        assert_eq!(
            TracingState::for_failure(Status::FailedInsufficentStorage),
            TracingState::ErrorInsufficientStorage
        );
        assert_eq!(
            TracingState::for_failure(Status::FailedBadParameter),
            TracingState::ErrorInternal
        );
        for state in [
            TracingState::ErrorInternal,
            TracingState::ErrorInsufficientStorage,
            TracingState::ErrorServiceDisabled,
            TracingState::ErrorBluetoothScanningDisabled,
        ] {
            assert!(state.is_error());
            assert!(!state.is_enabled());
            assert_eq!(TracingState::for_failure(state.status()), state);
        }
    }

    #[test]
    fn test_temporarily_disabled_is_enabled() {
        assert!(TracingState::TemporarilyDisabled.is_enabled());
        assert!(!TracingState::AwaitingConsent.is_enabled());
    }
}
