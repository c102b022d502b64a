// SPDX-FileCopyrightText: 2026 Mattia Egloff <mattia.egloff@pm.me>
//
// SPDX-License-Identifier: GPL-3.0-or-later

//! Provide Command
//!
//! Matches diagnosis keys published by a health authority.

use std::path::Path;
use std::sync::Arc;

use anyhow::{bail, Result};
use tracekit_core::api::{FeedRefresh, TaskOutcome, TracingController};
use tracekit_core::beacon::MockRadio;
use tracekit_core::matching::FileKeyFeed;

use super::session::Session;
use crate::config::CliConfig;
use crate::display;

/// Refreshes from the export at `path` through a running controller.
pub async fn refresh(controller: &TracingController, path: &Path) -> Result<()> {
    let feed = Arc::new(FileKeyFeed::new(path));
    match controller.refresh_from_feed(feed).outcome().await {
        TaskOutcome::Success(FeedRefresh::Completed {
            keys,
            batches,
            withdrawn,
            summary,
        }) => {
            display::success(&format!(
                "Checked {} diagnosis key(s) in {} batch(es)",
                keys, batches
            ));
            if withdrawn > 0 {
                display::info(&format!("Withdrew {} diagnosis key(s)", withdrawn));
            }
            if summary.matched_key_count > 0 {
                display::warning(&display::summary_line(&summary));
            } else {
                display::info(&display::summary_line(&summary));
            }
            Ok(())
        }
        TaskOutcome::Success(FeedRefresh::Deferred { until }) => {
            display::info(&format!(
                "The feed asked not to be checked again before {} (unix time)",
                until
            ));
            Ok(())
        }
        TaskOutcome::Failed { status, message } => {
            bail!("matching failed: {} ({})", message, status)
        }
        TaskOutcome::Cancelled => bail!("matching was cancelled"),
    }
}

/// Starts tracing without a radio, checks the feed and stops again.
pub async fn run(config: &CliConfig, path: &Path) -> Result<()> {
    if !path.exists() {
        bail!("No diagnosis key export at {}", path.display());
    }

    let session = Session::start(config, Arc::new(MockRadio::new())).await?;
    let result = refresh(&session.controller, path).await;
    session.stop().await?;
    result
}
