// SPDX-FileCopyrightText: 2026 Mattia Egloff <mattia.egloff@pm.me>
//
// SPDX-License-Identifier: GPL-3.0-or-later

//! Proximity observation storage operations.

use rusqlite::{params, OptionalExtension, Row};
use tracing::trace;

use super::{KeyStore, StorageError};
use crate::identity::RollingProximityIdentifier;
use crate::time::{DayNumber, SECONDS_PER_DAY};

/// Seconds in one reported duration increment.
pub const DURATION_INCREMENT_SECS: u64 = 300;

/// A peer identifier heard over a contiguous stretch of time.
#[derive(Debug, Clone, PartialEq)]
pub struct ProximityObservation {
    pub identifier: RollingProximityIdentifier,
    /// First sighting (unix seconds).
    pub first_seen: u64,
    /// Latest sighting (unix seconds).
    pub last_seen: u64,
    /// When the observation was committed to the store.
    pub received_at: u64,
    /// Strongest received signal strength (dBm).
    pub rssi: i16,
    /// Lowest attenuation (dB) across sightings.
    pub attenuation: u8,
    /// Closest estimated distance in metres.
    pub distance_m: f64,
}

impl ProximityObservation {
    pub fn new(
        identifier: RollingProximityIdentifier,
        first_seen: u64,
        last_seen: u64,
        rssi: i16,
        attenuation: u8,
        distance_m: f64,
    ) -> Self {
        ProximityObservation {
            identifier,
            first_seen,
            last_seen: last_seen.max(first_seen),
            received_at: last_seen.max(first_seen),
            rssi,
            attenuation,
            distance_m,
        }
    }

    /// Overrides the commit timestamp.
    pub fn received_at(mut self, timestamp: u64) -> Self {
        self.received_at = timestamp;
        self
    }

    /// Cumulative contact duration in seconds, capped at one day.
    pub fn duration_secs(&self) -> u64 {
        self.last_seen.saturating_sub(self.first_seen).min(SECONDS_PER_DAY)
    }

    /// Contact duration in whole 5-minute increments.
    pub fn duration_bucket(&self) -> u64 {
        self.duration_secs() / DURATION_INCREMENT_SECS
    }

    /// Day the contact started on.
    pub fn day(&self) -> DayNumber {
        DayNumber::from_timestamp(self.first_seen)
    }

    /// Combines a repeated sighting of the same identifier into this one.
    fn merge(&mut self, other: &ProximityObservation) {
        self.first_seen = self.first_seen.min(other.first_seen);
        self.last_seen = self.last_seen.max(other.last_seen);
        self.received_at = other.received_at;
        self.rssi = self.rssi.max(other.rssi);
        self.attenuation = self.attenuation.min(other.attenuation);
        self.distance_m = self.distance_m.min(other.distance_m);
    }

    fn from_row(row: &Row<'_>) -> rusqlite::Result<(Vec<u8>, Self)> {
        let identifier: Vec<u8> = row.get(0)?;
        Ok((
            identifier,
            ProximityObservation {
                identifier: RollingProximityIdentifier::from_bytes([0u8; 16]),
                first_seen: row.get::<_, i64>(1)? as u64,
                last_seen: row.get::<_, i64>(2)? as u64,
                received_at: row.get::<_, i64>(3)? as u64,
                rssi: row.get(4)?,
                attenuation: row.get(5)?,
                distance_m: row.get(6)?,
            },
        ))
    }
}

/// Result of appending an observation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ObservationWrite {
    /// A new identifier was recorded.
    Inserted,
    /// The identifier was already known; its duration was extended.
    Merged,
}

const SELECT_OBSERVATION: &str = "SELECT identifier, first_seen, last_seen, received_at, rssi, attenuation, distance
     FROM observations";

impl KeyStore {
    // === Observation Operations ===

    /// Appends an observation, merging it into an existing one for the same
    /// identifier.
    ///
    /// Commits are totally ordered by `received_at`; an observation older than
    /// the newest commit fails with `OutOfOrder`.
    pub fn append_observation(
        &self,
        observation: &ProximityObservation,
    ) -> Result<ObservationWrite, StorageError> {
        if let Some(latest) = self.latest_received_at()? {
            if observation.received_at < latest {
                return Err(StorageError::OutOfOrder(format!(
                    "observation received at {} precedes {}",
                    observation.received_at, latest
                )));
            }
        }

        let tx = self.conn.unchecked_transaction()?;
        let existing = tx
            .query_row(
                &format!("{} WHERE identifier = ?1", SELECT_OBSERVATION),
                params![observation.identifier.as_bytes().as_slice()],
                ProximityObservation::from_row,
            )
            .optional()?;

        let write = match existing {
            Some((_, mut stored)) => {
                stored.identifier = observation.identifier;
                stored.merge(observation);
                tx.execute(
                    "UPDATE observations
                     SET first_seen = ?2, last_seen = ?3, received_at = ?4,
                         rssi = ?5, attenuation = ?6, distance = ?7
                     WHERE identifier = ?1",
                    params![
                        stored.identifier.as_bytes().as_slice(),
                        stored.first_seen as i64,
                        stored.last_seen as i64,
                        stored.received_at as i64,
                        stored.rssi,
                        stored.attenuation,
                        stored.distance_m
                    ],
                )?;
                ObservationWrite::Merged
            }
            None => {
                let count: i64 =
                    tx.query_row("SELECT COUNT(*) FROM observations", [], |row| row.get(0))?;
                if count as usize >= self.quota.max_observations {
                    return Err(StorageError::InsufficientStorage(format!(
                        "observation quota of {} reached",
                        self.quota.max_observations
                    )));
                }

                tx.execute(
                    "INSERT INTO observations
                     (identifier, first_seen, last_seen, received_at, rssi, attenuation, distance)
                     VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)",
                    params![
                        observation.identifier.as_bytes().as_slice(),
                        observation.first_seen as i64,
                        observation.last_seen as i64,
                        observation.received_at as i64,
                        observation.rssi,
                        observation.attenuation,
                        observation.distance_m
                    ],
                )?;
                ObservationWrite::Inserted
            }
        };
        tx.commit()?;

        trace!(identifier = %observation.identifier, ?write, "stored observation");
        Ok(write)
    }

    /// Commit time of the most recent observation.
    pub fn latest_received_at(&self) -> Result<Option<u64>, StorageError> {
        let latest: Option<i64> = self
            .conn
            .query_row("SELECT MAX(received_at) FROM observations", [], |row| {
                row.get(0)
            })?;
        Ok(latest.map(|t| t as u64))
    }

    /// Returns observations last seen within the last `days` days, in commit
    /// order.
    pub fn observations_since(&self, days: u32) -> Result<Vec<ProximityObservation>, StorageError> {
        let since = self.now().saturating_sub(days as u64 * SECONDS_PER_DAY);
        self.load_observations(
            &format!(
                "{} WHERE last_seen >= ?1 ORDER BY received_at, id",
                SELECT_OBSERVATION
            ),
            since,
        )
    }

    /// Returns the stored observation of `identifier`, if any.
    pub fn observation(
        &self,
        identifier: &RollingProximityIdentifier,
    ) -> Result<Option<ProximityObservation>, StorageError> {
        let row = self
            .conn
            .query_row(
                &format!("{} WHERE identifier = ?1", SELECT_OBSERVATION),
                params![identifier.as_bytes().as_slice()],
                ProximityObservation::from_row,
            )
            .optional()?;

        Ok(row.map(|(_, mut observation)| {
            observation.identifier = *identifier;
            observation
        }))
    }

    /// Number of stored observations.
    pub fn observation_count(&self) -> Result<usize, StorageError> {
        let count: i64 = self
            .conn
            .query_row("SELECT COUNT(*) FROM observations", [], |row| row.get(0))?;
        Ok(count as usize)
    }

    fn load_observations(
        &self,
        sql: &str,
        since: u64,
    ) -> Result<Vec<ProximityObservation>, StorageError> {
        let mut stmt = self.conn.prepare(sql)?;
        let rows = stmt
            .query_map(params![since as i64], ProximityObservation::from_row)?
            .collect::<Result<Vec<_>, _>>()?;

        rows.into_iter()
            .map(|(raw, mut observation)| {
                observation.identifier = RollingProximityIdentifier::from_slice(&raw)
                    .map_err(|e| StorageError::Serialization(e.to_string()))?;
                Ok(observation)
            })
            .collect()
    }
}
