// SPDX-FileCopyrightText: 2026 Mattia Egloff <mattia.egloff@pm.me>
//
// SPDX-License-Identifier: GPL-3.0-or-later

//! Uninstall Command
//!
//! Wipes every stored key, observation and exposure record.

use std::sync::Arc;

use anyhow::{bail, Result};
use dialoguer::Confirm;
use tracekit_core::beacon::MockRadio;

use crate::config::CliConfig;
use crate::display;

pub async fn run(config: &CliConfig) -> Result<()> {
    if !config.is_initialized() {
        display::info("Nothing to remove");
        return Ok(());
    }

    if !config.assume_yes
        && !Confirm::new()
            .with_prompt("Permanently delete all tracing data?")
            .default(false)
            .interact()?
    {
        return Ok(());
    }

    let controller = config.open_controller(Arc::new(MockRadio::new()))?;
    let outcome = controller.uninstall().outcome().await;
    if let Some(status) = outcome.status().filter(|s| !s.is_success()) {
        bail!("could not wipe data ({})", status);
    }
    drop(controller);

    config.delete_storage_key()?;
    display::success("All tracing data removed");
    Ok(())
}
