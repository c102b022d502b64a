// SPDX-FileCopyrightText: 2026 Mattia Egloff <mattia.egloff@pm.me>
//
// SPDX-License-Identifier: GPL-3.0-or-later

//! Status Command

use std::sync::Arc;

use anyhow::Result;
use console::style;
use tracekit_core::api::{ConsentManager, ConsentType};
use tracekit_core::beacon::MockRadio;

use crate::config::CliConfig;
use crate::display;

/// Shows what is stored in the data directory.
pub fn show(config: &CliConfig) -> Result<()> {
    if !config.is_initialized() {
        display::info("Nothing stored yet. Start tracing with: tracekit run");
        return Ok(());
    }

    let controller = config.open_controller(Arc::new(MockRadio::new()))?;
    let exposure = controller.exposure_configuration();
    let last_feed_date = controller.last_feed_date()?;
    let submission = controller.submission_status()?;
    let store = controller.store();
    let store = store.lock();
    let consent = ConsentManager::new(&store);

    let yes_no = |granted: bool| {
        if granted {
            style("granted").green()
        } else {
            style("not granted").dim()
        }
    };

    println!();
    println!("  {}", style("Tracekit Status").bold().cyan());
    println!();
    println!("  Data dir:            {}", config.data_dir.display());
    println!("  Schema version:      {}", store.schema_version()?);
    println!(
        "  Tracing consent:     {}",
        yes_no(consent.check(ConsentType::ContactTracing)?)
    );
    println!(
        "  Sharing consent:     {}",
        yes_no(consent.check(ConsentType::KeySharing)?)
    );
    println!("  Key submission:      {}", submission);
    println!("  Daily keys:          {}", store.key_count()?);
    println!("  Observations:        {}", store.observation_count()?);
    println!("  Exposure records:    {}", store.exposure_records()?.len());
    println!("  Matched keys:        {}", store.folded_match_count()?);
    println!("  Minimum risk score:  {}", exposure.minimum_risk_score);
    match last_feed_date {
        Some(date) => println!("  Last feed export:    {}", date),
        None => println!("  Last feed export:    {}", style("never").dim()),
    }
    println!(
        "  Trusted authorities: {}",
        controller.config().matching.trusted_authorities.len()
    );
    println!();

    Ok(())
}
