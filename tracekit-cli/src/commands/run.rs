// SPDX-FileCopyrightText: 2026 Mattia Egloff <mattia.egloff@pm.me>
//
// SPDX-License-Identifier: GPL-3.0-or-later

//! Run Command
//!
//! Traces against a simulated neighbourhood of peers for a while.

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use anyhow::Result;
use indicatif::{ProgressBar, ProgressStyle};
use tracekit_core::beacon::SimulatedRadio;
use tracekit_core::time::SystemClock;
use tracing::info;

use super::provide;
use super::session::Session;
use crate::config::CliConfig;
use crate::display;

/// Runs tracing for `minutes` with `peers` simulated devices nearby.
pub async fn run(
    config: &CliConfig,
    peers: usize,
    minutes: u64,
    feed: Option<PathBuf>,
) -> Result<()> {
    let radio = Arc::new(SimulatedRadio::new(Arc::new(SystemClock)));
    for i in 0..peers {
        // Spread peers between one and a few metres.
        radio.add_peer(-55 - 5 * (i % 6) as i16);
    }
    info!(peers, minutes, "starting simulated run");

    let mut session = Session::start(config, radio.clone()).await?;
    display::success(&format!(
        "Contact tracing {} with {} simulated peer(s)",
        display::state(session.controller.state()),
        radio.peer_count()
    ));

    let total = minutes * 60;
    let progress = ProgressBar::new(total);
    progress.set_style(
        ProgressStyle::with_template("{spinner} [{elapsed_precise}] {bar:40} {pos}/{len}s")?,
    );

    let mut ticker = tokio::time::interval(Duration::from_secs(1));
    let mut elapsed = 0;
    while elapsed < total {
        tokio::select! {
            _ = ticker.tick() => {
                elapsed += 1;
                progress.set_position(elapsed);
            }
            Some(event) = session.events.recv() => {
                if let Some(line) = display::event_line(&event) {
                    progress.println(line);
                }
            }
            _ = tokio::signal::ctrl_c() => {
                progress.println("interrupted");
                break;
            }
        }
    }
    progress.finish_and_clear();

    if let Some(path) = feed {
        provide::refresh(&session.controller, &path).await?;
    }

    let state = session.controller.state();
    session.stop().await?;
    display::success(&format!("Stopped ({} while running)", display::state(state)));
    Ok(())
}
