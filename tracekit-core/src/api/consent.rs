// SPDX-FileCopyrightText: 2026 Mattia Egloff <mattia.egloff@pm.me>
//
// SPDX-License-Identifier: GPL-3.0-or-later

//! Consent Management
//!
//! Records the user's opt-in decisions. The latest decision per type wins.

use serde::{Deserialize, Serialize};

use crate::storage::{ConsentDecision, KeyStore, StorageError};

/// Things the user can opt in to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ConsentType {
    /// Broadcasting and scanning for contacts.
    ContactTracing,
    /// Handing own daily keys to a health authority.
    KeySharing,
}

impl ConsentType {
    fn as_str(&self) -> &'static str {
        match self {
            ConsentType::ContactTracing => "contact_tracing",
            ConsentType::KeySharing => "key_sharing",
        }
    }

    /// Parses a consent type from its string representation.
    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "contact_tracing" => Some(ConsentType::ContactTracing),
            "key_sharing" => Some(ConsentType::KeySharing),
            _ => None,
        }
    }
}

/// A recorded consent decision.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConsentRecord {
    pub id: String,
    pub consent_type: ConsentType,
    /// Whether consent was granted (true) or revoked (false).
    pub granted: bool,
    pub timestamp: u64,
}

/// Reads and writes the user's opt-in decisions.
pub struct ConsentManager<'a> {
    store: &'a KeyStore,
}

impl<'a> ConsentManager<'a> {
    pub fn new(store: &'a KeyStore) -> Self {
        ConsentManager { store }
    }

    pub fn grant(&self, consent_type: ConsentType) -> Result<(), StorageError> {
        self.decide(consent_type, true)
    }

    pub fn revoke(&self, consent_type: ConsentType) -> Result<(), StorageError> {
        self.decide(consent_type, false)
    }

    fn decide(&self, consent_type: ConsentType, granted: bool) -> Result<(), StorageError> {
        self.store.record_consent(&ConsentDecision {
            id: uuid::Uuid::new_v4().to_string(),
            consent_type: consent_type.as_str().to_string(),
            granted,
            decided_at: self.store.now(),
        })
    }

    /// Whether the latest decision for `consent_type` granted it.
    pub fn check(&self, consent_type: ConsentType) -> Result<bool, StorageError> {
        self.store.is_consent_granted(consent_type.as_str())
    }

    /// All decisions, oldest first. Rows of unknown types are skipped.
    pub fn export_consent_log(&self) -> Result<Vec<ConsentRecord>, StorageError> {
        Ok(self
            .store
            .consent_history()?
            .into_iter()
            .filter_map(|decision| {
                Some(ConsentRecord {
                    consent_type: ConsentType::parse(&decision.consent_type)?,
                    id: decision.id,
                    granted: decision.granted,
                    timestamp: decision.decided_at,
                })
            })
            .collect())
    }
}
