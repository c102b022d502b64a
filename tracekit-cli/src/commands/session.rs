// SPDX-FileCopyrightText: 2026 Mattia Egloff <mattia.egloff@pm.me>
//
// SPDX-License-Identifier: GPL-3.0-or-later

//! Starts contact tracing and walks the user through the opt-in prompt.

use std::sync::Arc;

use anyhow::{bail, Result};
use dialoguer::Confirm;
use tokio::sync::mpsc::UnboundedReceiver;
use tracekit_core::api::{events, TaskOutcome, TracingController, TracingEvent};
use tracekit_core::beacon::Radio;

use crate::config::CliConfig;
use crate::display;

/// A controller with tracing running and its event stream.
pub struct Session {
    pub controller: TracingController,
    pub events: UnboundedReceiver<TracingEvent>,
}

impl Session {
    /// Opens the store and starts tracing, asking for consent if none is
    /// recorded.
    pub async fn start(config: &CliConfig, radio: Arc<dyn Radio>) -> Result<Self> {
        let controller = config.open_controller(radio)?;
        let (handler, mut events) = events::channel();
        let started = controller.start_contact_tracing(Arc::new(handler));
        let mut outcome = Box::pin(started.outcome());

        loop {
            tokio::select! {
                result = &mut outcome => {
                    return match result {
                        TaskOutcome::Success(()) => Ok(Session { controller, events }),
                        TaskOutcome::Failed { status, message } => {
                            bail!("could not start contact tracing: {} ({})", message, status)
                        }
                        TaskOutcome::Cancelled => bail!("start was cancelled"),
                    };
                }
                Some(event) = events.recv() => {
                    if let TracingEvent::ConsentRequested = event {
                        let granted = ask_consent(config).await?;
                        controller.resolve_consent(granted)?;
                    } else if let Some(line) = display::event_line(&event) {
                        display::info(&line);
                    }
                }
            }
        }
    }

    /// Prints every event that arrived so far.
    pub fn print_pending_events(&mut self) {
        while let Ok(event) = self.events.try_recv() {
            if let Some(line) = display::event_line(&event) {
                display::info(&line);
            }
        }
    }

    /// Stops tracing; stored data is kept.
    pub async fn stop(mut self) -> Result<()> {
        let outcome = self.controller.stop_contact_tracing().outcome().await;
        self.print_pending_events();
        match outcome.status() {
            Some(status) if status.is_success() => Ok(()),
            Some(status) => bail!("could not stop contact tracing ({})", status),
            None => bail!("stop was cancelled"),
        }
    }
}

async fn ask_consent(config: &CliConfig) -> Result<bool> {
    if config.assume_yes {
        return Ok(true);
    }

    println!();
    println!("Tracekit broadcasts rotating random identifiers and records the");
    println!("identifiers it hears nearby. Nothing leaves this device unless you");
    println!("choose to share your keys after a positive diagnosis.");
    println!();

    // The prompt blocks on stdin; keep it off the runtime workers.
    let granted = tokio::task::spawn_blocking(|| {
        Confirm::new()
            .with_prompt("Enable contact tracing?")
            .default(false)
            .interact()
    })
    .await??;
    Ok(granted)
}
