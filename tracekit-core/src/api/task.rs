// SPDX-FileCopyrightText: 2026 Mattia Egloff <mattia.egloff@pm.me>
//
// SPDX-License-Identifier: GPL-3.0-or-later

//! Cancellable handle to an asynchronous tracing operation.

use std::future::Future;

use tokio::task::JoinHandle;
use tracing::warn;

use super::{Status, TracingResult};

/// How an operation ended.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TaskOutcome<T> {
    Success(T),
    Failed { status: Status, message: String },
    Cancelled,
}

impl<T> TaskOutcome<T> {
    /// Status of a finished operation; `None` if it was cancelled.
    pub fn status(&self) -> Option<Status> {
        match self {
            TaskOutcome::Success(_) => Some(Status::Success),
            TaskOutcome::Failed { status, .. } => Some(*status),
            TaskOutcome::Cancelled => None,
        }
    }

    pub fn is_success(&self) -> bool {
        matches!(self, TaskOutcome::Success(_))
    }

    /// The value, if the operation succeeded.
    pub fn ok(self) -> Option<T> {
        match self {
            TaskOutcome::Success(value) => Some(value),
            _ => None,
        }
    }
}

/// A running operation.
///
/// Must be created inside a Tokio runtime.
pub struct Task<T> {
    handle: JoinHandle<TracingResult<T>>,
}

impl<T: Send + 'static> Task<T> {
    pub(crate) fn spawn<F>(future: F) -> Self
    where
        F: Future<Output = TracingResult<T>> + Send + 'static,
    {
        Task {
            handle: tokio::spawn(future),
        }
    }

    /// Runs `f` on the blocking pool.
    ///
    /// Cancelling the task stops waiting for `f` but lets it run to
    /// completion.
    pub(crate) fn blocking<F>(f: F) -> Self
    where
        F: FnOnce() -> TracingResult<T> + Send + 'static,
    {
        Task {
            handle: tokio::task::spawn_blocking(f),
        }
    }

    pub(crate) fn ready(result: TracingResult<T>) -> Self {
        Self::spawn(async move { result })
    }

    /// Requests cancellation.
    pub fn cancel(&self) {
        self.handle.abort();
    }

    pub fn is_finished(&self) -> bool {
        self.handle.is_finished()
    }

    /// Waits for the operation to end.
    pub async fn outcome(self) -> TaskOutcome<T> {
        match self.handle.await {
            Ok(Ok(value)) => TaskOutcome::Success(value),
            Ok(Err(err)) => TaskOutcome::Failed {
                status: Status::from(&err),
                message: err.to_string(),
            },
            Err(join) if join.is_cancelled() => TaskOutcome::Cancelled,
            Err(join) => {
                warn!(error = %join, "tracing task panicked");
                TaskOutcome::Failed {
                    status: Status::FailedInternal,
                    message: join.to_string(),
                }
            }
        }
    }
}
