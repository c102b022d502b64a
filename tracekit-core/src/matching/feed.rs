// SPDX-FileCopyrightText: 2026 Mattia Egloff <mattia.egloff@pm.me>
//
// SPDX-License-Identifier: GPL-3.0-or-later

//! Diagnosis Key Feed
//!
//! Source of published diagnosis keys. The key server itself is a host
//! collaborator; `FileKeyFeed` reads a JSON export of it and `MockKeyFeed`
//! scripts responses for tests.

use std::collections::VecDeque;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicUsize, Ordering};

use async_trait::async_trait;
use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use super::{DiagnosisKey, ExposureConfiguration};

/// Feed errors.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum FeedError {
    #[error("Feed unavailable: {0}")]
    Unavailable(String),

    #[error("Malformed feed: {0}")]
    Malformed(String),

    #[error("I/O error: {0}")]
    Io(String),
}

/// Whether a response replaces or extends what was received before.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum FeedListType {
    /// Keys published since the requested date.
    #[default]
    Partial,
    /// Every key the server still publishes; earlier results are discarded.
    Full,
}

/// One response from the key feed.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FeedResponse {
    /// Keys published since the requested date.
    pub keys: Vec<DiagnosisKey>,
    /// Keys withdrawn by the server since the requested date.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub deleted_keys: Vec<DiagnosisKey>,
    #[serde(default)]
    pub list_type: FeedListType,
    /// Publication date of this response (unix seconds); pass it as `since`
    /// on the next fetch.
    pub date: u64,
    /// The server asks not to be contacted again before this time.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub earliest_retry_at: Option<u64>,
    /// Replacement scoring parameters, if the server publishes them.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub configuration: Option<ExposureConfiguration>,
}

/// Source of diagnosis keys.
#[async_trait]
pub trait DiagnosisKeyFeed: Send + Sync {
    /// Fetches keys published after `since` (all keys when `None`).
    async fn fetch(&self, since: Option<u64>) -> Result<FeedResponse, FeedError>;
}

/// Feed backed by a JSON file.
#[derive(Debug, Clone)]
pub struct FileKeyFeed {
    path: PathBuf,
}

impl FileKeyFeed {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        FileKeyFeed { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Writes `response` to `path` in the format this feed reads.
    pub fn publish(path: &Path, response: &FeedResponse) -> Result<(), FeedError> {
        let json = serde_json::to_string_pretty(response)
            .map_err(|e| FeedError::Malformed(e.to_string()))?;
        std::fs::write(path, json).map_err(|e| FeedError::Io(e.to_string()))
    }
}

#[async_trait]
impl DiagnosisKeyFeed for FileKeyFeed {
    async fn fetch(&self, since: Option<u64>) -> Result<FeedResponse, FeedError> {
        let raw = tokio::fs::read_to_string(&self.path)
            .await
            .map_err(|e| FeedError::Io(format!("{}: {}", self.path.display(), e)))?;
        let mut response: FeedResponse =
            serde_json::from_str(&raw).map_err(|e| FeedError::Malformed(e.to_string()))?;

        if matches!(since, Some(since) if response.date <= since) {
            response.keys.clear();
            response.deleted_keys.clear();
        }
        Ok(response)
    }
}

/// Scripted feed for tests.
#[derive(Default)]
pub struct MockKeyFeed {
    responses: Mutex<VecDeque<Result<FeedResponse, FeedError>>>,
    requests: Mutex<Vec<Option<u64>>>,
    calls: AtomicUsize,
}

impl MockKeyFeed {
    pub fn new() -> Self {
        Self::default()
    }

    /// Queues the next response.
    pub fn push_response(&self, response: FeedResponse) {
        self.responses.lock().push_back(Ok(response));
    }

    /// Queues a failure.
    pub fn push_error(&self, error: FeedError) {
        self.responses.lock().push_back(Err(error));
    }

    /// Number of fetches made.
    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    /// `since` argument of each fetch, in order.
    pub fn requests(&self) -> Vec<Option<u64>> {
        self.requests.lock().clone()
    }
}

#[async_trait]
impl DiagnosisKeyFeed for MockKeyFeed {
    async fn fetch(&self, since: Option<u64>) -> Result<FeedResponse, FeedError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.requests.lock().push(since);
        self.responses
            .lock()
            .pop_front()
            .unwrap_or_else(|| Err(FeedError::Unavailable("no scripted response".into())))
    }
}
