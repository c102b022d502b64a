// SPDX-FileCopyrightText: 2026 Mattia Egloff <mattia.egloff@pm.me>
//
// SPDX-License-Identifier: GPL-3.0-or-later

//! Beacon Transceiver
//!
//! Broadcasts the identifier of the current rotation window and scans for
//! identifiers broadcast by nearby devices. Sightings are held in memory until
//! a contact has lasted at least `min_contact_duration`; shorter encounters
//! are discarded and never reach the store.

mod distance;
mod error;
mod radio;

pub use distance::SignalModel;
pub use error::{BeaconError, RadioError};
pub use radio::{DutyCycle, MockRadio, Radio, Sighting, SimulatedRadio};

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::identity::{DailyTracingKey, RollingProximityIdentifier, RotatingIdentityGenerator};
use crate::storage::{KeyStore, ObservationWrite, ProximityObservation};
use crate::time::{Clock, DayNumber, IntervalNumber};

/// Broadcast/scan timing and contact filtering.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct BeaconConfig {
    /// Time between scans.
    pub scan_interval: Duration,
    /// Length of each scan.
    pub scan_window: Duration,
    /// Advertising interval handed to the radio.
    pub advertise_interval: Duration,
    /// Contacts shorter than this are discarded.
    pub min_contact_duration: Duration,
    /// A contact not heard for longer than this has ended.
    pub max_sighting_gap: Duration,
    /// RSSI calibration.
    pub signal: SignalModel,
}

impl Default for BeaconConfig {
    fn default() -> Self {
        BeaconConfig {
            scan_interval: Duration::from_secs(60),
            scan_window: Duration::from_secs(4),
            advertise_interval: Duration::from_millis(250),
            min_contact_duration: Duration::from_secs(300),
            max_sighting_gap: Duration::from_secs(300),
            signal: SignalModel::default(),
        }
    }
}

impl BeaconConfig {
    /// Duty cycle handed to the radio.
    pub fn duty_cycle(&self) -> DutyCycle {
        DutyCycle {
            advertise_interval: self.advertise_interval,
            scan_interval: self.scan_interval,
            scan_window: self.scan_window,
        }
    }
}

/// Loads today's key, generating and storing it if the day has none yet.
///
/// Returns the key and whether it was newly created.
pub fn ensure_daily_key(
    store: &KeyStore,
    generator: &RotatingIdentityGenerator,
    day: DayNumber,
) -> Result<(DailyTracingKey, bool), BeaconError> {
    if let Some(key) = store.key_for_day(day)? {
        return Ok((key, false));
    }

    let key = generator.new_daily_key(day)?;
    store.append_daily_key(&key)?;
    info!(day = day.0, "rolled over daily tracing key");
    Ok((key, true))
}

/// A peer identifier heard recently but not yet committed.
#[derive(Debug, Clone)]
struct PendingContact {
    first_seen: u64,
    last_seen: u64,
    rssi: i16,
}

/// What one scan did.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ScanReport {
    /// Sightings returned by the radio.
    pub sightings: usize,
    /// Contacts that crossed the duration threshold and were stored.
    pub committed: usize,
    /// Sightings merged into already stored observations.
    pub merged: usize,
    /// Pending contacts dropped for being too short.
    pub discarded: usize,
}

/// Periodic broadcaster and scanner.
pub struct BeaconTransceiver {
    radio: Arc<dyn Radio>,
    store: Arc<Mutex<KeyStore>>,
    clock: Arc<dyn Clock>,
    generator: RotatingIdentityGenerator,
    config: BeaconConfig,
    advertising: Option<(IntervalNumber, RollingProximityIdentifier)>,
    pending: HashMap<RollingProximityIdentifier, PendingContact>,
    /// Stored contacts still in range, with the time they were last heard.
    committed: HashMap<RollingProximityIdentifier, u64>,
}

impl BeaconTransceiver {
    pub fn new(
        radio: Arc<dyn Radio>,
        store: Arc<Mutex<KeyStore>>,
        clock: Arc<dyn Clock>,
        config: BeaconConfig,
    ) -> Self {
        BeaconTransceiver {
            radio,
            store,
            clock,
            generator: RotatingIdentityGenerator::new(),
            config,
            advertising: None,
            pending: HashMap::new(),
            committed: HashMap::new(),
        }
    }

    /// Identifier currently being advertised.
    pub fn current_identifier(&self) -> Option<RollingProximityIdentifier> {
        self.advertising.map(|(_, id)| id)
    }

    /// Number of contacts heard but not yet long enough to store.
    pub fn pending_count(&self) -> usize {
        self.pending.len()
    }

    /// Advertises the identifier for the current window if it changed.
    ///
    /// Returns the new identifier, or `None` when the window is unchanged.
    pub async fn refresh_advertisement(
        &mut self,
    ) -> Result<Option<RollingProximityIdentifier>, BeaconError> {
        let interval = self.clock.interval();
        if matches!(self.advertising, Some((current, _)) if current == interval) {
            return Ok(None);
        }

        let identifier = {
            let store = self.store.lock();
            let (key, _) = ensure_daily_key(&store, &self.generator, interval.day())?;
            self.generator.current_identifier(&key, interval)?
        };

        self.radio
            .advertise(identifier, self.config.duty_cycle())
            .await?;
        self.advertising = Some((interval, identifier));
        debug!(interval = interval.0, "advertising new identifier");
        Ok(Some(identifier))
    }

    /// Runs one scan window and folds its sightings into pending contacts and
    /// the store.
    pub async fn scan_once(&mut self) -> Result<ScanReport, BeaconError> {
        let sightings = self.radio.scan(self.config.scan_window).await?;
        let now = self.clock.now();
        let min_duration = self.config.min_contact_duration.as_secs();
        let max_gap = self.config.max_sighting_gap.as_secs();
        let own = self.current_identifier();

        let mut report = ScanReport {
            sightings: sightings.len(),
            ..ScanReport::default()
        };

        let store = self.store.lock();
        // Commits stay ordered when the wall clock steps backwards.
        let received_at = match store.latest_received_at()? {
            Some(latest) if latest > now => {
                debug!(now, latest, "clock behind last commit; holding commit time");
                latest
            }
            _ => now,
        };

        for sighting in sightings {
            if Some(sighting.identifier) == own {
                continue;
            }

            if let Some(last_heard) = self.committed.get_mut(&sighting.identifier) {
                *last_heard = (*last_heard).max(sighting.timestamp);
                let observation = self.observation(
                    sighting.identifier,
                    sighting.timestamp,
                    sighting.timestamp,
                    sighting.rssi,
                    received_at,
                );
                if store.append_observation(&observation)? == ObservationWrite::Merged {
                    report.merged += 1;
                }
                continue;
            }

            let contact = self
                .pending
                .entry(sighting.identifier)
                .or_insert(PendingContact {
                    first_seen: sighting.timestamp,
                    last_seen: sighting.timestamp,
                    rssi: sighting.rssi,
                });
            if sighting.timestamp.saturating_sub(contact.last_seen) > max_gap {
                // Contact broke off; start a fresh one.
                *contact = PendingContact {
                    first_seen: sighting.timestamp,
                    last_seen: sighting.timestamp,
                    rssi: sighting.rssi,
                };
            }
            contact.first_seen = contact.first_seen.min(sighting.timestamp);
            contact.last_seen = contact.last_seen.max(sighting.timestamp);
            contact.rssi = contact.rssi.max(sighting.rssi);
        }

        let ready: Vec<RollingProximityIdentifier> = self
            .pending
            .iter()
            .filter(|(_, c)| c.last_seen - c.first_seen >= min_duration)
            .map(|(id, _)| *id)
            .collect();

        for identifier in ready {
            if let Some(contact) = self.pending.remove(&identifier) {
                let observation = self.observation(
                    identifier,
                    contact.first_seen,
                    contact.last_seen,
                    contact.rssi,
                    received_at,
                );
                store.append_observation(&observation)?;
                self.committed.insert(identifier, contact.last_seen);
                report.committed += 1;
            }
        }
        drop(store);

        let before = self.pending.len();
        self.pending
            .retain(|_, c| now.saturating_sub(c.last_seen) <= max_gap);
        report.discarded = before - self.pending.len();
        self.committed
            .retain(|_, last_heard| now.saturating_sub(*last_heard) <= max_gap);

        if report.committed > 0 || report.discarded > 0 {
            debug!(
                sightings = report.sightings,
                committed = report.committed,
                merged = report.merged,
                discarded = report.discarded,
                "scan complete"
            );
        }
        Ok(report)
    }

    /// Broadcasts and scans until an error occurs or the task is cancelled.
    ///
    /// The advertised identifier is refreshed at every window boundary and
    /// before every scan.
    pub async fn run(mut self) -> Result<(), BeaconError> {
        let mut scan_tick = tokio::time::interval(self.config.scan_interval);
        scan_tick.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);

        self.refresh_advertisement().await?;
        loop {
            let until_rotation = self.seconds_until_next_window();
            tokio::select! {
                _ = scan_tick.tick() => {
                    self.refresh_advertisement().await?;
                    self.scan_once().await?;
                }
                _ = tokio::time::sleep(Duration::from_secs(until_rotation)) => {
                    self.refresh_advertisement().await?;
                }
            }
        }
    }

    /// Stops the radio broadcast.
    pub async fn shutdown(&mut self) -> Result<(), BeaconError> {
        self.radio.stop_advertising().await?;
        self.advertising = None;
        self.pending.clear();
        Ok(())
    }

    fn seconds_until_next_window(&self) -> u64 {
        let next = IntervalNumber(self.clock.interval().0 + 1).start_timestamp();
        next.saturating_sub(self.clock.now()).max(1)
    }

    fn observation(
        &self,
        identifier: RollingProximityIdentifier,
        first_seen: u64,
        last_seen: u64,
        rssi: i16,
        received_at: u64,
    ) -> ProximityObservation {
        let signal = self.config.signal;
        ProximityObservation::new(
            identifier,
            first_seen,
            last_seen,
            rssi,
            signal.attenuation(rssi),
            signal.distance(rssi),
        )
        .received_at(received_at)
    }
}
