// SPDX-FileCopyrightText: 2026 Mattia Egloff <mattia.egloff@pm.me>
//
// SPDX-License-Identifier: GPL-3.0-or-later

//! Tests for the diagnosis key feed

mod common;

use std::io::Write;

use tracekit_core::crypto::SigningKeyPair;
use tracekit_core::matching::{
    DiagnosisKey, DiagnosisKeyFeed, DiagnosisKeySet, ExposureConfiguration, FeedError,
    FeedResponse, FileKeyFeed,
};

#[tokio::test]
async fn test_file_feed_carries_signatures_and_configuration() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("export.json");
    let authority = SigningKeyPair::generate().unwrap();
    let key = common::key_for(common::DAY.minus(1)).with_transmission_risk_level(4);

    let response = FeedResponse {
        keys: vec![DiagnosisKey::sign(key, &authority, 42)],
        date: 1_700_000_000,
        configuration: Some(ExposureConfiguration::default()),
        ..FeedResponse::default()
    };
    FileKeyFeed::publish(&path, &response).unwrap();

    let fetched = FileKeyFeed::new(&path).fetch(None).await.unwrap();
    assert_eq!(fetched, response);
    assert!(fetched.keys[0].verify(&[authority.public_key()]).is_ok());
}

#[tokio::test]
async fn test_file_feed_returns_only_newer_exports() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("export.json");
    let response = FeedResponse {
        keys: vec![DiagnosisKey::unsigned(common::key_for(common::DAY))],
        date: 2_000,
        ..FeedResponse::default()
    };
    FileKeyFeed::publish(&path, &response).unwrap();
    let feed = FileKeyFeed::new(&path);

    assert_eq!(feed.fetch(Some(1_999)).await.unwrap().keys.len(), 1);
    assert!(feed.fetch(Some(2_000)).await.unwrap().keys.is_empty());
}

#[tokio::test]
async fn test_file_feed_rejects_malformed_json() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("export.json");
    let mut file = std::fs::File::create(&path).unwrap();
    file.write_all(b"{\"keys\": 5}").unwrap();

    let result = FileKeyFeed::new(&path).fetch(None).await;
    assert!(matches!(result, Err(FeedError::Malformed(_))));
}

#[test]
fn test_key_set_batches_preserve_order() {
    let keys: Vec<DiagnosisKey> = (0..5)
        .map(|i| DiagnosisKey::unsigned(common::key_for(common::DAY.minus(i))))
        .collect();
    let set = DiagnosisKeySet::new(keys.clone());

    let batches = set.into_batches(2);
    assert_eq!(batches.len(), 3);
    assert_eq!(batches[2].len(), 1);
    let flattened: Vec<DiagnosisKey> = batches.into_iter().flat_map(|b| b.keys).collect();
    assert_eq!(flattened, keys);

    assert!(DiagnosisKeySet::default().into_batches(10).is_empty());
}
