// SPDX-FileCopyrightText: 2026 Mattia Egloff <mattia.egloff@pm.me>
//
// SPDX-License-Identifier: GPL-3.0-or-later

//! Radio Abstraction
//!
//! The Bluetooth Low Energy stack is a host collaborator. The beacon only
//! needs to broadcast an identifier and to collect the identifiers heard
//! during a scan window. `MockRadio` scripts those results for tests;
//! `SimulatedRadio` synthesises peers that rotate their own identifiers.

use std::collections::hash_map::Entry;
use std::collections::{HashMap, VecDeque};
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use parking_lot::Mutex;

use super::RadioError;
use crate::identity::{DailyTracingKey, RollingProximityIdentifier, RotatingIdentityGenerator};
use crate::time::{Clock, DayNumber};

/// How often the radio advertises and scans.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DutyCycle {
    pub advertise_interval: Duration,
    pub scan_interval: Duration,
    pub scan_window: Duration,
}

/// One identifier heard during a scan.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Sighting {
    pub identifier: RollingProximityIdentifier,
    /// Received signal strength (dBm).
    pub rssi: i16,
    /// Unix seconds.
    pub timestamp: u64,
}

impl Sighting {
    pub fn new(identifier: RollingProximityIdentifier, rssi: i16, timestamp: u64) -> Self {
        Sighting {
            identifier,
            rssi,
            timestamp,
        }
    }
}

/// Broadcast and scan access to the host radio.
#[async_trait]
pub trait Radio: Send + Sync {
    /// Starts (or replaces) the advertised identifier.
    async fn advertise(
        &self,
        identifier: RollingProximityIdentifier,
        duty_cycle: DutyCycle,
    ) -> Result<(), RadioError>;

    /// Stops advertising. Idempotent.
    async fn stop_advertising(&self) -> Result<(), RadioError>;

    /// Scans for `window` and returns every identifier heard.
    async fn scan(&self, window: Duration) -> Result<Vec<Sighting>, RadioError>;
}

/// Scripted radio for tests.
///
/// Each scan pops the next queued batch; an empty queue yields no sightings.
#[derive(Default)]
pub struct MockRadio {
    scans: Mutex<VecDeque<Result<Vec<Sighting>, RadioError>>>,
    advertised: Mutex<Vec<RollingProximityIdentifier>>,
    disabled: AtomicBool,
    advertising: AtomicBool,
    scan_count: AtomicUsize,
}

impl MockRadio {
    pub fn new() -> Self {
        Self::default()
    }

    /// Queues the result of a future scan.
    pub fn push_scan(&self, sightings: Vec<Sighting>) {
        self.scans.lock().push_back(Ok(sightings));
    }

    /// Makes a future scan fail with `error`.
    pub fn push_scan_error(&self, error: RadioError) {
        self.scans.lock().push_back(Err(error));
    }

    /// Makes every radio call fail with `RadioError::Disabled`.
    pub fn set_disabled(&self, disabled: bool) {
        self.disabled.store(disabled, Ordering::SeqCst);
    }

    /// Identifiers advertised so far, in order.
    pub fn advertised(&self) -> Vec<RollingProximityIdentifier> {
        self.advertised.lock().clone()
    }

    pub fn is_advertising(&self) -> bool {
        self.advertising.load(Ordering::SeqCst)
    }

    /// Number of completed scans.
    pub fn scan_count(&self) -> usize {
        self.scan_count.load(Ordering::SeqCst)
    }

    fn check_enabled(&self) -> Result<(), RadioError> {
        if self.disabled.load(Ordering::SeqCst) {
            Err(RadioError::Disabled)
        } else {
            Ok(())
        }
    }
}

#[async_trait]
impl Radio for MockRadio {
    async fn advertise(
        &self,
        identifier: RollingProximityIdentifier,
        _duty_cycle: DutyCycle,
    ) -> Result<(), RadioError> {
        self.check_enabled()?;
        self.advertised.lock().push(identifier);
        self.advertising.store(true, Ordering::SeqCst);
        Ok(())
    }

    async fn stop_advertising(&self) -> Result<(), RadioError> {
        self.advertising.store(false, Ordering::SeqCst);
        Ok(())
    }

    async fn scan(&self, _window: Duration) -> Result<Vec<Sighting>, RadioError> {
        self.check_enabled()?;
        self.scan_count.fetch_add(1, Ordering::SeqCst);
        self.scans.lock().pop_front().unwrap_or(Ok(Vec::new()))
    }
}

/// A nearby device in a simulation.
struct SimulatedPeer {
    rssi: i16,
    keys: HashMap<DayNumber, DailyTracingKey>,
}

/// Radio that hears a fixed set of simulated peers on every scan.
///
/// Each peer draws its own daily keys and broadcasts the identifier for the
/// current window, so the simulation exercises the same derivation as a real
/// device.
pub struct SimulatedRadio {
    clock: Arc<dyn Clock>,
    generator: RotatingIdentityGenerator,
    peers: Mutex<Vec<SimulatedPeer>>,
    advertising: Mutex<Option<RollingProximityIdentifier>>,
}

impl SimulatedRadio {
    pub fn new(clock: Arc<dyn Clock>) -> Self {
        SimulatedRadio {
            clock,
            generator: RotatingIdentityGenerator::new(),
            peers: Mutex::new(Vec::new()),
            advertising: Mutex::new(None),
        }
    }

    /// Adds a peer heard at the given signal strength.
    pub fn add_peer(&self, rssi: i16) {
        self.peers.lock().push(SimulatedPeer {
            rssi,
            keys: HashMap::new(),
        });
    }

    /// Number of simulated peers.
    pub fn peer_count(&self) -> usize {
        self.peers.lock().len()
    }

    /// Daily keys drawn so far by peer `index`, oldest first.
    pub fn peer_keys(&self, index: usize) -> Vec<DailyTracingKey> {
        let peers = self.peers.lock();
        let mut keys: Vec<DailyTracingKey> = peers
            .get(index)
            .map(|p| p.keys.values().cloned().collect())
            .unwrap_or_default();
        keys.sort_by_key(|k| k.day());
        keys
    }

    /// Identifier currently advertised by this device.
    pub fn advertising(&self) -> Option<RollingProximityIdentifier> {
        *self.advertising.lock()
    }
}

#[async_trait]
impl Radio for SimulatedRadio {
    async fn advertise(
        &self,
        identifier: RollingProximityIdentifier,
        _duty_cycle: DutyCycle,
    ) -> Result<(), RadioError> {
        *self.advertising.lock() = Some(identifier);
        Ok(())
    }

    async fn stop_advertising(&self) -> Result<(), RadioError> {
        *self.advertising.lock() = None;
        Ok(())
    }

    async fn scan(&self, window: Duration) -> Result<Vec<Sighting>, RadioError> {
        tokio::time::sleep(window).await;

        let now = self.clock.now();
        let interval = self.clock.interval();
        let today = self.clock.today();

        let mut peers = self.peers.lock();
        let mut sightings = Vec::with_capacity(peers.len());
        for peer in peers.iter_mut() {
            let key = match peer.keys.entry(today) {
                Entry::Occupied(entry) => entry.into_mut(),
                Entry::Vacant(entry) => entry.insert(
                    self.generator
                        .new_daily_key(today)
                        .map_err(|e| RadioError::Unavailable(e.to_string()))?,
                ),
            };
            let identifier = self
                .generator
                .current_identifier(key, interval)
                .map_err(|e| RadioError::Unavailable(e.to_string()))?;
            sightings.push(Sighting::new(identifier, peer.rssi, now));
        }
        Ok(sightings)
    }
}
