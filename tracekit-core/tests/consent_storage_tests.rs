// SPDX-FileCopyrightText: 2026 Mattia Egloff <mattia.egloff@pm.me>
//
// SPDX-License-Identifier: GPL-3.0-or-later

//! Tests for storage::consent

mod common;

use tracekit_core::api::{ConsentManager, ConsentType};
use tracekit_core::storage::ConsentDecision;
use tracekit_core::KeyStore;

fn test_store() -> KeyStore {
    common::store(&common::clock())
}

fn decision(id: &str, consent_type: &str, granted: bool, decided_at: u64) -> ConsentDecision {
    ConsentDecision {
        id: id.to_string(),
        consent_type: consent_type.to_string(),
        granted,
        decided_at,
    }
}

#[test]
fn test_no_decision_means_not_granted() {
    let store = test_store();
    assert_eq!(store.latest_consent("contact_tracing").unwrap(), None);
    assert!(!store.is_consent_granted("contact_tracing").unwrap());
}

#[test]
fn test_latest_decision_wins() {
    let store = test_store();
    store
        .record_consent(&decision("c1", "key_sharing", true, 1000))
        .unwrap();
    store
        .record_consent(&decision("c2", "key_sharing", false, 2000))
        .unwrap();
    assert!(!store.is_consent_granted("key_sharing").unwrap());

    store
        .record_consent(&decision("c3", "key_sharing", true, 2000))
        .unwrap();
    let latest = store.latest_consent("key_sharing").unwrap().unwrap();
    assert_eq!(latest.id, "c3");
    assert!(store.is_consent_granted("key_sharing").unwrap());
}

#[test]
fn test_decisions_are_scoped_by_type() {
    let store = test_store();
    store
        .record_consent(&decision("c1", "contact_tracing", true, 1000))
        .unwrap();

    assert!(store.is_consent_granted("contact_tracing").unwrap());
    assert!(!store.is_consent_granted("key_sharing").unwrap());
}

#[test]
fn test_history_is_oldest_first() {
    let store = test_store();
    store
        .record_consent(&decision("late", "key_sharing", false, 2000))
        .unwrap();
    store
        .record_consent(&decision("early", "contact_tracing", true, 1000))
        .unwrap();

    let history = store.consent_history().unwrap();
    assert_eq!(history.len(), 2);
    assert_eq!(history[0], decision("early", "contact_tracing", true, 1000));
    assert_eq!(history[1].decided_at, 2000);
}

#[test]
fn test_consent_manager_ignores_unknown_types() {
    let store = test_store();
    store
        .record_consent(&decision("legacy", "marketing", true, 500))
        .unwrap();
    let consent = ConsentManager::new(&store);
    consent.grant(ConsentType::KeySharing).unwrap();

    let log = consent.export_consent_log().unwrap();
    assert_eq!(log.len(), 1);
    assert_eq!(log[0].consent_type, ConsentType::KeySharing);
    assert!(consent.check(ConsentType::KeySharing).unwrap());
}

// === Audit Log ===

#[test]
fn test_audit_log_is_ordered_and_stamped() {
    let clock = common::clock();
    let store = common::store(&clock);

    store.log_audit_event("tracing_started", None).unwrap();
    clock.advance(30);
    store
        .log_audit_event("exposures_cleared", Some("3 records"))
        .unwrap();

    let log = store.audit_log().unwrap();
    assert_eq!(log.len(), 2);
    assert_eq!(log[0].event_type, "tracing_started");
    assert_eq!(log[0].details, None);
    assert_eq!(log[1].details.as_deref(), Some("3 records"));
    assert_eq!(log[1].timestamp, log[0].timestamp + 30);
}
