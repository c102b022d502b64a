// SPDX-FileCopyrightText: 2026 Mattia Egloff <mattia.egloff@pm.me>
//
// SPDX-License-Identifier: GPL-3.0-or-later

//! Keys Command
//!
//! Lists own daily keys and shares them after a positive diagnosis.

use std::path::Path;
use std::sync::Arc;

use anyhow::{bail, Context, Result};
use dialoguer::Confirm;
use tracekit_core::api::TracingEvent;
use tracekit_core::beacon::MockRadio;
use tracekit_core::crypto::SigningKeyPair;
use tracekit_core::matching::{DiagnosisKey, FeedResponse, FileKeyFeed};
use tracekit_core::storage::RETENTION_DAYS;
use tracekit_core::time::{Clock, SystemClock};
use tracekit_core::DailyTracingKey;

use super::session::Session;
use crate::config::CliConfig;
use crate::display;

/// Lists the daily keys kept in the store.
pub fn list(config: &CliConfig) -> Result<()> {
    if !config.is_initialized() {
        display::info("No keys yet. Start tracing with: tracekit run");
        return Ok(());
    }

    let controller = config.open_controller(Arc::new(MockRadio::new()))?;
    let keys = controller.store().lock().keys_since(RETENTION_DAYS)?;

    if keys.is_empty() {
        display::info("No daily keys stored");
        return Ok(());
    }

    println!();
    println!("Daily keys ({}):", keys.len());
    display::display_keys_table(&keys, SystemClock.today());
    println!();
    Ok(())
}

fn parse_seed(seed_hex: &str) -> Result<SigningKeyPair> {
    let bytes = hex::decode(seed_hex).context("authority seed must be hex")?;
    let seed: [u8; 32] = bytes
        .as_slice()
        .try_into()
        .map_err(|_| anyhow::anyhow!("authority seed must be 32 bytes"))?;
    Ok(SigningKeyPair::from_seed(&seed)?)
}

/// Builds the export a health authority would publish for `keys`.
pub fn export_response(
    keys: Vec<DailyTracingKey>,
    risk_level: u8,
    authority: Option<&SigningKeyPair>,
    now: u64,
) -> FeedResponse {
    let keys = keys
        .into_iter()
        .map(|key| key.with_transmission_risk_level(risk_level))
        .map(|key| match authority {
            Some(authority) => DiagnosisKey::sign(key, authority, now),
            None => DiagnosisKey::unsigned(key),
        })
        .collect();

    FeedResponse {
        keys,
        date: now,
        ..FeedResponse::default()
    }
}

/// Starts sharing and writes the keys handed over for upload to `output`.
pub async fn share(
    config: &CliConfig,
    output: &Path,
    risk_level: u8,
    authority_seed: Option<&str>,
) -> Result<()> {
    let authority = authority_seed.map(parse_seed).transpose()?;

    if !config.assume_yes
        && !Confirm::new()
            .with_prompt("Share your daily keys from the last 14 days?")
            .default(false)
            .interact()?
    {
        display::info("Nothing shared");
        return Ok(());
    }

    let mut session = Session::start(config, Arc::new(MockRadio::new())).await?;
    let outcome = session
        .controller
        .start_sharing_daily_tracing_keys()
        .outcome()
        .await;
    if let Some(status) = outcome.status().filter(|s| !s.is_success()) {
        session.stop().await?;
        bail!("could not start sharing ({})", status);
    }

    let mut uploads = Vec::new();
    while let Ok(event) = session.events.try_recv() {
        match event {
            TracingEvent::UploadRequested { keys } => uploads.extend(keys),
            other => {
                if let Some(line) = display::event_line(&other) {
                    display::info(&line);
                }
            }
        }
    }
    session.stop().await?;

    if uploads.is_empty() {
        display::warning("No keys old enough to share yet; keys are shared once their day is over");
        return Ok(());
    }

    let response = export_response(uploads, risk_level, authority.as_ref(), SystemClock.now());
    FileKeyFeed::publish(output, &response)?;

    display::success(&format!(
        "Wrote {} key(s) to {}",
        response.keys.len(),
        output.display()
    ));
    if let Some(authority) = authority {
        println!(
            "  Authority public key: {}",
            hex::encode(authority.public_key().as_bytes())
        );
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use tracekit_core::time::DayNumber;
    use tracekit_core::RotatingIdentityGenerator;

    #[test]
    fn test_export_response_signs_every_key() {
        let generator = RotatingIdentityGenerator::new();
        let keys = vec![
            generator.new_daily_key(DayNumber(100)).unwrap(),
            generator.new_daily_key(DayNumber(101)).unwrap(),
        ];
        let authority = parse_seed(&"07".repeat(32)).unwrap();

        let response = export_response(keys, 6, Some(&authority), 1_000);

        assert_eq!(response.date, 1_000);
        assert_eq!(response.keys.len(), 2);
        for key in &response.keys {
            assert_eq!(key.key.transmission_risk_level(), 6);
            assert!(key.verify(&[authority.public_key()]).is_ok());
        }
    }

    #[test]
    fn test_export_response_without_authority_is_unsigned() {
        let key = RotatingIdentityGenerator::new()
            .new_daily_key(DayNumber(100))
            .unwrap();
        let response = export_response(vec![key], 0, None, 1);
        assert!(response.keys[0].signature.is_none());
    }

    #[test]
    fn test_parse_seed_rejects_short_input() {
        assert!(parse_seed("abcd").is_err());
        assert!(parse_seed("not hex").is_err());
    }
}
