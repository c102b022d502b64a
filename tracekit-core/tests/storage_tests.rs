// SPDX-FileCopyrightText: 2026 Mattia Egloff <mattia.egloff@pm.me>
//
// SPDX-License-Identifier: GPL-3.0-or-later

//! Tests for storage: the key store ledger

mod common;

use tracekit_core::storage::{
    KeyStore, MatchFold, ObservationWrite, ProximityObservation, StorageError, StorageQuota,
    RETENTION_DAYS,
};
use tracekit_core::time::{Clock, SECONDS_PER_DAY};
use tracekit_core::SymmetricKey;

// === Daily keys ===

#[test]
fn test_append_and_read_daily_keys() {
    let clock = common::clock();
    let store = common::store(&clock);

    let yesterday = common::key_for(common::DAY.minus(1));
    let today = common::key_for(common::DAY);
    store.append_daily_key(&yesterday).unwrap();
    store.append_daily_key(&today).unwrap();

    let keys = store.keys_since(2).unwrap();
    assert_eq!(keys, vec![yesterday.clone(), today.clone()]);
    assert_eq!(store.keys_since(1).unwrap(), vec![today.clone()]);
    assert_eq!(store.keys_before(common::DAY).unwrap(), vec![yesterday]);
    assert_eq!(store.key_for_day(common::DAY).unwrap(), Some(today));
    assert_eq!(store.latest_key_day().unwrap(), Some(common::DAY));
}

#[test]
fn test_one_key_per_day() {
    let clock = common::clock();
    let store = common::store(&clock);

    store.append_daily_key(&common::key_for(common::DAY)).unwrap();
    let result = store.append_daily_key(&common::key_for(common::DAY));
    assert!(matches!(result, Err(StorageError::AlreadyExists(_))));
    assert_eq!(store.key_count().unwrap(), 1);
}

#[test]
fn test_keys_are_append_only_in_day_order() {
    let clock = common::clock();
    let store = common::store(&clock);

    store.append_daily_key(&common::key_for(common::DAY)).unwrap();
    let result = store.append_daily_key(&common::key_for(common::DAY.minus(3)));
    assert!(matches!(result, Err(StorageError::OutOfOrder(_))));
}

#[test]
fn test_keys_survive_reopen_with_same_storage_key() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("tracekit.db");
    let clock = common::clock();
    let storage_key = SymmetricKey::generate().unwrap();
    let key = common::key_for(common::DAY);

    {
        let store = KeyStore::open(&path, storage_key.clone(), clock.clone()).unwrap();
        store.append_daily_key(&key).unwrap();
    }

    let store = KeyStore::open(&path, storage_key, clock.clone()).unwrap();
    assert_eq!(store.key_for_day(common::DAY).unwrap(), Some(key));

    let wrong = KeyStore::open(&path, SymmetricKey::generate().unwrap(), clock).unwrap();
    assert!(matches!(
        wrong.key_for_day(common::DAY),
        Err(StorageError::Encryption(_))
    ));
}

// === Observations ===

#[test]
fn test_repeated_sightings_merge() {
    let clock = common::clock();
    let store = common::store(&clock);
    let key = common::key_for(common::DAY);

    let first = common::observation_of(&key, 10, 120);
    assert_eq!(
        store.append_observation(&first).unwrap(),
        ObservationWrite::Inserted
    );

    let later = ProximityObservation::new(
        first.identifier,
        first.last_seen + 60,
        first.last_seen + 240,
        -50,
        0,
        0.5,
    );
    assert_eq!(
        store.append_observation(&later).unwrap(),
        ObservationWrite::Merged
    );

    let merged = store.observation(&first.identifier).unwrap().unwrap();
    assert_eq!(store.observation_count().unwrap(), 1);
    assert_eq!(merged.first_seen, first.first_seen);
    assert_eq!(merged.last_seen, later.last_seen);
    assert_eq!(merged.rssi, -50);
    assert_eq!(merged.attenuation, 0);
    assert_eq!(merged.duration_secs(), 360);
    assert_eq!(merged.duration_bucket(), 1);
}

#[test]
fn test_observations_are_totally_ordered() {
    let clock = common::clock();
    let store = common::store(&clock);
    let key = common::key_for(common::DAY);

    store
        .append_observation(&common::observation_of(&key, 20, 400))
        .unwrap();
    let earlier = common::observation_of(&key, 5, 400);
    assert!(matches!(
        store.append_observation(&earlier),
        Err(StorageError::OutOfOrder(_))
    ));
    assert_eq!(store.observation_count().unwrap(), 1);
}

#[test]
fn test_observations_since_window() {
    let clock = common::clock();
    let store = common::store(&clock);
    let old_key = common::key_for(common::DAY.minus(20));
    let key = common::key_for(common::DAY);

    store
        .append_observation(&common::observation_of(&old_key, 0, 400))
        .unwrap();
    store
        .append_observation(&common::observation_of(&key, 0, 400))
        .unwrap();

    let recent = store.observations_since(RETENTION_DAYS).unwrap();
    assert_eq!(recent.len(), 1);
    assert_eq!(recent[0].day(), common::DAY);
}

// === Retention ===

#[test]
fn test_purge_removes_everything_outside_retention() {
    let clock = common::clock();
    let store = common::store(&clock);

    for offset in (0..20).rev() {
        let day = common::DAY.minus(offset);
        let key = common::key_for(day);
        store.append_daily_key(&key).unwrap();
        store
            .append_observation(&common::observation_of(&key, 0, 400))
            .unwrap();
    }

    let report = store.purge_older_than(RETENTION_DAYS).unwrap();
    assert!(report.keys > 0);
    assert!(report.observations > 0);

    let cutoff = clock.now() - RETENTION_DAYS as u64 * SECONDS_PER_DAY;
    assert!(store
        .keys_since(100)
        .unwrap()
        .iter()
        .all(|k| k.day() > common::DAY.minus(RETENTION_DAYS)));
    assert!(store
        .observations_since(100)
        .unwrap()
        .iter()
        .all(|o| o.last_seen >= cutoff));
    assert!(store.key_for_day(common::DAY).unwrap().is_some());
}

#[test]
fn test_purge_expires_observations_by_calendar_day() {
    let clock = common::clock();
    let store = common::store(&clock);
    let expired = common::key_for(common::DAY.minus(RETENTION_DAYS));
    let kept = common::key_for(common::DAY.minus(RETENTION_DAYS - 1));

    // Late on the expired day, so within 14 x 24h of noon today.
    store
        .append_observation(&common::observation_of(&expired, 140, 400))
        .unwrap();
    store
        .append_observation(&common::observation_of(&kept, 0, 400))
        .unwrap();

    let report = store.purge_older_than(RETENTION_DAYS).unwrap();
    assert_eq!(report.observations, 1);

    let left = store.observations_since(100).unwrap();
    assert_eq!(left.len(), 1);
    assert_eq!(left[0].day(), common::DAY.minus(RETENTION_DAYS - 1));
}

#[test]
fn test_purge_keeps_exposure_records() {
    let clock = common::clock();
    let store = common::store(&clock);
    let fold = MatchFold {
        key_fingerprint: "abc".into(),
        date: common::DAY.minus(20),
        duration_secs: 600,
        attenuation: 10,
        transmission_risk_level: 0,
    };
    store.fold_matches(&[fold], |_| 5).unwrap();

    let report = store.purge_older_than(RETENTION_DAYS).unwrap();
    assert_eq!(report.folded_matches, 1);
    assert_eq!(store.exposure_records().unwrap().len(), 1);
}

#[test]
fn test_retracted_key_is_taken_out_of_its_days() {
    let clock = common::clock();
    let store = common::store(&clock);
    let fold = |fingerprint: &str, days_ago: u32, duration_secs: u64, attenuation: u8, risk: u8| {
        MatchFold {
            key_fingerprint: fingerprint.into(),
            date: common::DAY.minus(days_ago),
            duration_secs,
            attenuation,
            transmission_risk_level: risk,
        }
    };
    store
        .fold_matches(
            &[
                fold("withdrawn", 1, 900, 5, 7),
                fold("kept", 1, 600, 20, 2),
                fold("withdrawn", 2, 300, 9, 7),
            ],
            |record| record.matched_key_count as u8,
        )
        .unwrap();

    let outcome = store
        .retract_matches(&["withdrawn".into(), "unknown".into()], |record| {
            record.matched_key_count as u8
        })
        .unwrap();
    assert_eq!(outcome.retracted, 2);
    assert_eq!(outcome.removed, vec![common::DAY.minus(2)]);
    assert_eq!(outcome.updated.len(), 1);

    let records = store.exposure_records().unwrap();
    assert_eq!(records.len(), 1);
    let rebuilt = &records[0];
    assert_eq!(rebuilt.date, common::DAY.minus(1));
    assert_eq!(rebuilt.duration_secs, 600);
    assert_eq!(rebuilt.attenuation, 20);
    assert_eq!(rebuilt.transmission_risk_level, 2);
    assert_eq!(rebuilt.matched_key_count, 1);
    assert_eq!(rebuilt.total_risk_score, 1);
    assert_eq!(store.folded_match_count().unwrap(), 1);

    // A withdrawn key published again folds as new.
    let refolded = store
        .fold_matches(&[fold("withdrawn", 1, 900, 5, 7)], |_| 0)
        .unwrap();
    assert_eq!(refolded.folded, 1);
}

#[test]
fn test_wipe_all_empties_the_store() {
    let clock = common::clock();
    let store = common::store(&clock);
    let key = common::key_for(common::DAY);
    store.append_daily_key(&key).unwrap();
    store
        .append_observation(&common::observation_of(&key, 1, 400))
        .unwrap();
    store.set_setting("feed_last_date", "1").unwrap();
    store.log_audit_event("tracing_started", None).unwrap();

    assert!(!store.is_empty().unwrap());
    store.wipe_all().unwrap();

    assert!(store.is_empty().unwrap());
    assert_eq!(store.get_setting("feed_last_date").unwrap(), None);
    assert!(store.audit_log().unwrap().is_empty());
}

// === Quota ===

#[test]
fn test_quota_exhaustion_reports_insufficient_storage() {
    let clock = common::clock();
    let store = common::store(&clock).with_quota(StorageQuota {
        max_observations: 1,
        max_keys: 1,
    });
    let key = common::key_for(common::DAY.minus(1));
    store.append_daily_key(&key).unwrap();

    let err = store
        .append_daily_key(&common::key_for(common::DAY))
        .unwrap_err();
    assert!(err.is_insufficient_storage());

    store
        .append_observation(&common::observation_of(&key, 0, 400))
        .unwrap();
    let err = store
        .append_observation(&common::observation_of(&key, 1, 400))
        .unwrap_err();
    assert!(err.is_insufficient_storage());

    // Committed rows are untouched.
    assert_eq!(store.key_count().unwrap(), 1);
    assert_eq!(store.observation_count().unwrap(), 1);
}

#[test]
fn test_settings_roundtrip() {
    let clock = common::clock();
    let store = common::store(&clock);

    store.set_u64_setting("n", 42).unwrap();
    assert_eq!(store.get_u64_setting("n").unwrap(), Some(42));
    store.delete_setting("n").unwrap();
    assert_eq!(store.get_u64_setting("n").unwrap(), None);

    store.set_json_setting("list", &vec![1, 2, 3]).unwrap();
    assert_eq!(
        store.get_json_setting::<Vec<u32>>("list").unwrap(),
        Some(vec![1, 2, 3])
    );
}

#[test]
fn test_shared_clock_drives_retention() {
    let clock = common::clock();
    let store = KeyStore::in_memory(SymmetricKey::generate().unwrap(), clock.clone()).unwrap();
    let key = common::key_for(common::DAY);
    store.append_daily_key(&key).unwrap();

    clock.advance_days(RETENTION_DAYS as u64);
    store.purge_older_than(RETENTION_DAYS).unwrap();
    assert_eq!(store.key_count().unwrap(), 0);
}
