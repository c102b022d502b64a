// SPDX-FileCopyrightText: 2026 Mattia Egloff <mattia.egloff@pm.me>
//
// SPDX-License-Identifier: GPL-3.0-or-later

//! Exposures Command
//!
//! Shows, clears and rescores exposure records.

use std::fs;
use std::path::Path;
use std::sync::Arc;

use anyhow::{bail, Context, Result};
use dialoguer::Confirm;
use tracekit_core::beacon::MockRadio;
use tracekit_core::matching::ExposureConfiguration;
use tracekit_core::time::{Clock, SystemClock};

use crate::config::CliConfig;
use crate::display;

/// Lists exposure records reaching the minimum risk score.
pub async fn list(config: &CliConfig) -> Result<()> {
    if !config.is_initialized() {
        display::info("No exposures recorded");
        return Ok(());
    }

    let controller = config.open_controller(Arc::new(MockRadio::new()))?;
    let outcome = controller.get_contact_information().outcome().await;
    let status = outcome.status();
    let Some(records) = outcome.ok() else {
        bail!("could not read exposures ({:?})", status);
    };

    if records.is_empty() {
        display::success("No exposures found");
        return Ok(());
    }

    println!();
    println!("Possible exposures ({}):", records.len());
    display::display_exposures_table(&records, SystemClock.today());
    println!();
    display::info("Scores below the minimum risk score are hidden");
    Ok(())
}

/// Deletes every exposure record after confirmation.
pub fn clear(config: &CliConfig) -> Result<()> {
    if !config.is_initialized() {
        display::info("No exposures recorded");
        return Ok(());
    }

    if !config.assume_yes
        && !Confirm::new()
            .with_prompt("Delete all exposure records?")
            .default(false)
            .interact()?
    {
        return Ok(());
    }

    let controller = config.open_controller(Arc::new(MockRadio::new()))?;
    let cleared = controller.clear_exposures()?;
    display::success(&format!("Cleared {} exposure record(s)", cleared));
    Ok(())
}

/// Prints the active risk scoring, or replaces it with the JSON at `path`.
pub fn configuration(config: &CliConfig, path: Option<&Path>) -> Result<()> {
    let controller = config.open_controller(Arc::new(MockRadio::new()))?;

    match path {
        Some(path) => {
            let json = fs::read_to_string(path)
                .with_context(|| format!("cannot read {}", path.display()))?;
            let exposure = ExposureConfiguration::from_json(&json)?;
            controller.set_exposure_configuration(exposure)?;
            display::success("Risk scoring updated; stored records were rescored");
        }
        None => println!("{}", controller.exposure_configuration().to_json()?),
    }
    Ok(())
}
