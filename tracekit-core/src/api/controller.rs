// SPDX-FileCopyrightText: 2026 Mattia Egloff <mattia.egloff@pm.me>
//
// SPDX-License-Identifier: GPL-3.0-or-later

//! Tracing Controller
//!
//! Owns the tracing state machine and coordinates the beacon, the matcher
//! and the store. Broadcast/scan and periodic maintenance run as background
//! tasks; matching passes run on the blocking pool so they never stall the
//! beacon.
//!
//! Events are never dispatched while the store lock is held, so handlers may
//! call back into the controller.

use std::sync::{Arc, Weak};

use parking_lot::{Mutex, RwLock};
use tokio::sync::oneshot;
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;
use tracing::{debug, error, info, warn};

use super::consent::{ConsentManager, ConsentType};
use super::{
    EventDispatcher, EventHandler, Status, SubmissionStatus, Task, TracingConfig, TracingError,
    TracingEvent, TracingResult, TracingState,
};
use crate::beacon::{ensure_daily_key, BeaconTransceiver, Radio};
use crate::crypto::SymmetricKey;
use crate::identity::{DailyTracingKey, RotatingIdentityGenerator};
use crate::matching::{
    max_diagnosis_keys, DiagnosisKey, DiagnosisKeyFeed, DiagnosisKeySet, ExposureConfiguration,
    ExposureMatcher, ExposureSummary, FeedListType,
};
use crate::storage::{ExposureRecord, KeyStore, PurgeReport};
use crate::time::{Clock, DayNumber, SECONDS_PER_DAY};

const SHARING_STARTED_AT: &str = "sharing_started_at";
const SHARING_EXPIRED_AT: &str = "sharing_expired_at";
const LAST_UPLOADED_DAY: &str = "last_uploaded_day";
const LAST_PURGE_DAY: &str = "last_purge_day";
const LAST_PROVIDE_REQUEST_DAY: &str = "last_provide_request_day";
const FEED_LAST_DATE: &str = "feed_last_date";
const FEED_EARLIEST_RETRY_AT: &str = "feed_earliest_retry_at";
const EXPOSURE_CONFIGURATION: &str = "exposure_configuration";
const SUBMISSION_STATUS: &str = "submission_status";
const SUBMITTED_KEYS: &str = "submitted_key_fingerprints";

/// Furthest ahead a feed may push back the next refresh.
const MAX_RETRY_DELAY_SECS: u64 = SECONDS_PER_DAY;

/// What one maintenance run did.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MaintenanceReport {
    /// A key for a new day was generated.
    pub key_created: bool,
    /// Set when the daily purge ran.
    pub purged: Option<PurgeReport>,
    /// The sharing window ran out during this run.
    pub sharing_expired: bool,
    /// Keys handed to the host for upload.
    pub uploaded_keys: usize,
    /// The host was asked for fresh diagnosis keys.
    pub provide_requested: bool,
}

/// Result of a key feed refresh.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FeedRefresh {
    /// The feed asked not to be contacted before `until`.
    Deferred { until: u64 },
    Completed {
        keys: usize,
        batches: usize,
        /// Keys the server withdrew.
        withdrawn: usize,
        summary: ExposureSummary,
    },
}

#[derive(Default)]
struct Workers {
    beacon: Option<JoinHandle<()>>,
    scheduler: Option<JoinHandle<()>>,
    consent: Option<oneshot::Sender<bool>>,
}

impl Workers {
    fn abort(&mut self) {
        if let Some(handle) = self.beacon.take() {
            handle.abort();
        }
        if let Some(handle) = self.scheduler.take() {
            handle.abort();
        }
        self.consent = None;
    }
}

struct Shared {
    store: Arc<Mutex<KeyStore>>,
    radio: Arc<dyn Radio>,
    clock: Arc<dyn Clock>,
    config: TracingConfig,
    matcher: ExposureMatcher,
    generator: RotatingIdentityGenerator,
    events: EventDispatcher,
    state: Mutex<TracingState>,
    workers: Mutex<Workers>,
    exposure: RwLock<ExposureConfiguration>,
}

/// Entry point for hosts.
///
/// Cheap to clone; clones share one state machine. Operations returning a
/// [`Task`] must be called inside a Tokio runtime.
#[derive(Clone)]
pub struct TracingController {
    shared: Arc<Shared>,
}

impl TracingController {
    /// Opens (or creates) the store under `config.storage_path`.
    pub fn new(
        config: TracingConfig,
        radio: Arc<dyn Radio>,
        clock: Arc<dyn Clock>,
    ) -> TracingResult<Self> {
        std::fs::create_dir_all(&config.storage_path).map_err(|e| {
            TracingError::Internal(format!(
                "cannot create {}: {}",
                config.storage_path.display(),
                e
            ))
        })?;
        let key = Self::storage_key(&config)?;
        let store =
            KeyStore::open(config.database_path(), key, clock.clone())?.with_quota(config.quota);
        Self::with_store(store, config, radio, clock)
    }

    /// Creates a controller backed by an in-memory store.
    pub fn in_memory(
        config: TracingConfig,
        radio: Arc<dyn Radio>,
        clock: Arc<dyn Clock>,
    ) -> TracingResult<Self> {
        let key = Self::storage_key(&config)?;
        let store = KeyStore::in_memory(key, clock.clone())?.with_quota(config.quota);
        Self::with_store(store, config, radio, clock)
    }

    /// Creates a controller around an already opened store.
    pub fn with_store(
        store: KeyStore,
        config: TracingConfig,
        radio: Arc<dyn Radio>,
        clock: Arc<dyn Clock>,
    ) -> TracingResult<Self> {
        let exposure = store
            .get_json_setting::<ExposureConfiguration>(EXPOSURE_CONFIGURATION)?
            .unwrap_or_else(|| config.exposure.clone());
        exposure.validate()?;

        let store = Arc::new(Mutex::new(store));
        let matcher = ExposureMatcher::new(store.clone(), clock.clone(), config.matching.clone());

        Ok(TracingController {
            shared: Arc::new(Shared {
                store,
                radio,
                clock,
                config,
                matcher,
                generator: RotatingIdentityGenerator::new(),
                events: EventDispatcher::new(),
                state: Mutex::new(TracingState::Disabled),
                workers: Mutex::new(Workers::default()),
                exposure: RwLock::new(exposure),
            }),
        })
    }

    fn storage_key(config: &TracingConfig) -> TracingResult<SymmetricKey> {
        match &config.storage_key {
            Some(key) => Ok(key.clone()),
            None => {
                warn!("no storage key configured; stored keys will not survive this session");
                Ok(SymmetricKey::generate()?)
            }
        }
    }

    // === Lifecycle ===

    /// Starts broadcasting and scanning.
    ///
    /// `handler` replaces any previously registered handler. Without a
    /// recorded opt-in the state moves to `AwaitingConsent`, a
    /// `ConsentRequested` event is sent, and the task completes once
    /// [`resolve_consent`](Self::resolve_consent) is called.
    pub fn start_contact_tracing(&self, handler: Arc<dyn EventHandler>) -> Task<()> {
        let shared = self.shared.clone();
        shared.events.set_handler(handler);

        if shared.state().is_enabled() {
            debug!("contact tracing already running");
            return Task::ready(Ok(()));
        }

        let consented =
            ConsentManager::new(&shared.store.lock()).check(ConsentType::ContactTracing);
        match consented {
            Err(err) => {
                let err = TracingError::from(err);
                shared.fail(&err);
                Task::ready(Err(err))
            }
            Ok(true) => Task::spawn(shared.activate()),
            Ok(false) => {
                let (sender, receiver) = oneshot::channel();
                shared.workers.lock().consent = Some(sender);
                shared.set_state(TracingState::AwaitingConsent);
                shared.events.dispatch(TracingEvent::ConsentRequested);

                Task::spawn(async move {
                    match receiver.await {
                        Ok(true) => {
                            let granted = ConsentManager::new(&shared.store.lock())
                                .grant(ConsentType::ContactTracing);
                            if let Err(err) = granted {
                                let err = TracingError::from(err);
                                shared.fail(&err);
                                return Err(err);
                            }
                            info!("tracing consent granted");
                            shared.activate().await
                        }
                        Ok(false) => {
                            let revoked = ConsentManager::new(&shared.store.lock())
                                .revoke(ConsentType::ContactTracing);
                            shared.set_state(TracingState::Disabled);
                            revoked?;
                            info!("tracing consent rejected");
                            Err(TracingError::RejectedOptIn)
                        }
                        Err(_) => Err(TracingError::ServiceDisabled),
                    }
                })
            }
        }
    }

    /// Answers a pending consent request.
    pub fn resolve_consent(&self, granted: bool) -> TracingResult<()> {
        let sender = self
            .shared
            .workers
            .lock()
            .consent
            .take()
            .ok_or(TracingError::NoPendingConsent)?;
        sender
            .send(granted)
            .map_err(|_| TracingError::NoPendingConsent)
    }

    /// Stops broadcasting and scanning. Stored keys and observations are
    /// kept. A matching pass already running completes on its own.
    pub fn stop_contact_tracing(&self) -> Task<()> {
        self.shared.workers.lock().abort();
        let shared = self.shared.clone();
        Task::spawn(async move {
            if let Err(err) = shared.radio.stop_advertising().await {
                warn!(error = %err, "failed to stop advertising");
            }
            shared.store.lock().log_audit_event("tracing_stopped", None)?;
            if !shared.state().is_error() {
                shared.set_state(TracingState::Disabled);
            }
            Ok(())
        })
    }

    /// Handles the app-uninstall signal: stops everything and wipes the store.
    pub fn uninstall(&self) -> Task<()> {
        self.shared.workers.lock().abort();
        let shared = self.shared.clone();
        Task::spawn(async move {
            if let Err(err) = shared.radio.stop_advertising().await {
                warn!(error = %err, "failed to stop advertising");
            }
            let wiped = shared.store.lock().wipe_all();
            shared.check(wiped.map_err(TracingError::from))?;
            *shared.exposure.write() = shared.config.exposure.clone();
            shared.set_state(TracingState::Disabled);
            shared.events.clear_handlers();
            info!("tracing data wiped");
            Ok(())
        })
    }

    pub fn is_contact_tracing_enabled(&self) -> bool {
        self.shared.state().is_enabled()
    }

    pub fn state(&self) -> TracingState {
        self.shared.state()
    }

    // === Key sharing ===

    /// Opens the key-sharing window.
    ///
    /// Keys at least a day old are sent with `UploadRequested` now, and
    /// newly eligible keys daily, until the window expires. Restarting
    /// sharing from `TemporarilyDisabled` returns to `Active`.
    pub fn start_sharing_daily_tracing_keys(&self) -> Task<()> {
        let shared = self.shared.clone();
        Task::spawn(async move {
            let result = shared.start_sharing();
            shared.check(result)
        })
    }

    // === Matching ===

    /// Matches diagnosis keys against stored observations.
    pub fn provide_diagnosis_keys(&self, keys: DiagnosisKeySet) -> Task<ExposureSummary> {
        let shared = self.shared.clone();
        Task::blocking(move || {
            let result = shared.match_batch(&keys);
            shared.check(result)
        })
    }

    /// Maximum keys accepted by one `provide_diagnosis_keys` call.
    pub fn get_max_diagnosis_keys(&self) -> usize {
        max_diagnosis_keys()
    }

    /// Fetches new keys from `feed` and matches them in batches.
    pub fn refresh_from_feed(&self, feed: Arc<dyn DiagnosisKeyFeed>) -> Task<FeedRefresh> {
        let shared = self.shared.clone();
        Task::spawn(async move {
            let result = shared.refresh(feed.as_ref()).await;
            shared.check(result)
        })
    }

    /// True if any exposure record reaches the minimum risk score.
    pub fn has_contact(&self) -> Task<bool> {
        let shared = self.shared.clone();
        Task::blocking(move || Ok(!shared.reportable_records()?.is_empty()))
    }

    /// Exposure records reaching the minimum risk score, oldest first.
    pub fn get_contact_information(&self) -> Task<Vec<ExposureRecord>> {
        let shared = self.shared.clone();
        Task::blocking(move || shared.reportable_records())
    }

    /// Deletes all exposure records and the folded-match ledger.
    pub fn clear_exposures(&self) -> TracingResult<usize> {
        let store = self.shared.store.lock();
        let cleared = store.clear_exposures()?;
        store.log_audit_event("exposures_cleared", Some(&cleared.to_string()))?;
        Ok(cleared)
    }

    pub fn exposure_configuration(&self) -> ExposureConfiguration {
        self.shared.exposure.read().clone()
    }

    /// Replaces the scoring parameters and rescores stored records.
    pub fn set_exposure_configuration(&self, config: ExposureConfiguration) -> TracingResult<()> {
        let result = self.shared.apply_exposure_configuration(config);
        self.shared.check(result)
    }

    /// Whether this device's shared keys have come back from the server.
    pub fn submission_status(&self) -> TracingResult<SubmissionStatus> {
        load_submission_status(&self.shared.store.lock())
    }

    /// Date of the last export received from a key feed.
    pub fn last_feed_date(&self) -> TracingResult<Option<u64>> {
        Ok(self.shared.store.lock().get_u64_setting(FEED_LAST_DATE)?)
    }

    // === Maintenance ===

    /// Runs one maintenance pass: key rollover, daily purge, sharing expiry
    /// and the daily request for diagnosis keys.
    ///
    /// Runs automatically every `maintenance_interval` while tracing.
    pub fn run_maintenance(&self) -> TracingResult<MaintenanceReport> {
        let result = self.shared.maintain();
        self.shared.check(result)
    }

    pub fn store(&self) -> Arc<Mutex<KeyStore>> {
        self.shared.store.clone()
    }

    pub fn config(&self) -> &TracingConfig {
        &self.shared.config
    }

    pub fn events(&self) -> &EventDispatcher {
        &self.shared.events
    }
}

impl Shared {
    fn state(&self) -> TracingState {
        *self.state.lock()
    }

    fn set_state(&self, to: TracingState) {
        let from = std::mem::replace(&mut *self.state.lock(), to);
        if from != to {
            info!(%from, %to, "tracing state changed");
            self.events
                .dispatch(TracingEvent::StateChanged { from, to });
        }
    }

    /// Enters the error state for `err` if a dependency failed.
    fn fail(&self, err: &TracingError) {
        if !err.is_dependency_failure() {
            return;
        }
        let status = Status::from(err);
        error!(%status, error = %err, "tracing dependency failed");
        self.workers.lock().abort();
        self.set_state(TracingState::for_failure(status));
        self.events.dispatch(TracingEvent::Error {
            status,
            message: err.to_string(),
        });
    }

    fn check<T>(&self, result: TracingResult<T>) -> TracingResult<T> {
        if let Err(err) = &result {
            self.fail(err);
        }
        result
    }

    async fn activate(self: Arc<Self>) -> TracingResult<()> {
        let mut beacon = BeaconTransceiver::new(
            self.radio.clone(),
            self.store.clone(),
            self.clock.clone(),
            self.config.beacon,
        );
        if let Err(err) = beacon.refresh_advertisement().await {
            let err = TracingError::from(err);
            self.fail(&err);
            return Err(err);
        }

        // Active before the workers exist: a beacon failing on its first tick
        // must be the last state change, not be overwritten by this one.
        self.set_state(TracingState::Active);
        self.spawn_workers(beacon);

        let started = self
            .store
            .lock()
            .log_audit_event("tracing_started", None)
            .map_err(TracingError::from);
        self.check(started.and_then(|()| self.maintain()))?;
        Ok(())
    }

    fn spawn_workers(self: &Arc<Self>, beacon: BeaconTransceiver) {
        // Held while spawning so a worker failing at once waits for its
        // handle to be recorded before aborting.
        let mut workers = self.workers.lock();

        let weak = Arc::downgrade(self);
        let radio = self.radio.clone();
        workers.beacon = Some(tokio::spawn(async move {
            if let Err(err) = beacon.run().await {
                let err = TracingError::from(err);
                if !matches!(err, TracingError::Radio(_)) {
                    if let Err(stop_err) = radio.stop_advertising().await {
                        warn!(error = %stop_err, "failed to stop advertising");
                    }
                }
                if let Some(shared) = weak.upgrade() {
                    shared.fail(&err);
                }
            }
        }));

        let weak: Weak<Shared> = Arc::downgrade(self);
        let period = self.config.maintenance_interval;
        workers.scheduler = Some(tokio::spawn(async move {
            let mut tick = tokio::time::interval_at(tokio::time::Instant::now() + period, period);
            tick.set_missed_tick_behavior(MissedTickBehavior::Delay);
            loop {
                tick.tick().await;
                let Some(shared) = weak.upgrade() else {
                    break;
                };
                let result = shared.maintain();
                if shared.check(result).is_err() {
                    break;
                }
            }
        }));
    }

    fn maintain(&self) -> TracingResult<MaintenanceReport> {
        let now = self.clock.now();
        let today = self.clock.today();
        let enabled = self.state().is_enabled();
        let mut report = MaintenanceReport::default();

        let (uploads, sharing_expired) = {
            let store = self.store.lock();

            if enabled {
                let (_, created) = ensure_daily_key(&store, &self.generator, today)?;
                report.key_created = created;
            }

            let last_purge = store.get_u64_setting(LAST_PURGE_DAY)?;
            if last_purge.map_or(true, |day| day < u64::from(today.0)) {
                let purged = store.purge_older_than(self.config.matching.retention_days)?;
                store.set_u64_setting(LAST_PURGE_DAY, u64::from(today.0))?;
                store.log_audit_event(
                    "purge",
                    Some(&format!(
                        "keys={} observations={}",
                        purged.keys, purged.observations
                    )),
                )?;
                report.purged = Some(purged);
            }

            let mut uploads = Vec::new();
            if let Some(started) = store.get_u64_setting(SHARING_STARTED_AT)? {
                if now >= started + self.config.sharing_window.as_secs() {
                    store.delete_setting(SHARING_STARTED_AT)?;
                    store.set_u64_setting(SHARING_EXPIRED_AT, now)?;
                    store.log_audit_event("sharing_expired", None)?;
                    report.sharing_expired = true;
                    info!("key sharing window expired");
                } else {
                    uploads = self.take_uploads(&store, today)?;
                }
            }

            let last_request = store.get_u64_setting(LAST_PROVIDE_REQUEST_DAY)?;
            if enabled && last_request.map_or(true, |day| day < u64::from(today.0)) {
                store.set_u64_setting(LAST_PROVIDE_REQUEST_DAY, u64::from(today.0))?;
                report.provide_requested = true;
            }

            (uploads, store.get_u64_setting(SHARING_EXPIRED_AT)?.is_some())
        };

        if sharing_expired && self.state() == TracingState::Active {
            self.set_state(TracingState::TemporarilyDisabled);
        }
        if !uploads.is_empty() {
            report.uploaded_keys = uploads.len();
            self.events
                .dispatch(TracingEvent::UploadRequested { keys: uploads });
        }
        if report.provide_requested {
            self.events.dispatch(TracingEvent::ProvideKeysRequested);
        }

        debug!(
            key_created = report.key_created,
            purged = report.purged.is_some(),
            uploaded = report.uploaded_keys,
            "maintenance complete"
        );
        Ok(report)
    }

    /// Keys older than today not yet handed out, marked as handed out.
    fn take_uploads(
        &self,
        store: &KeyStore,
        today: DayNumber,
    ) -> TracingResult<Vec<DailyTracingKey>> {
        let last = store.get_u64_setting(LAST_UPLOADED_DAY)?;
        let keys: Vec<DailyTracingKey> = store
            .keys_before(today)?
            .into_iter()
            .filter(|key| last.map_or(true, |day| u64::from(key.day().0) > day))
            .collect();
        if let Some(newest) = keys.iter().map(|key| key.day().0).max() {
            store.set_u64_setting(LAST_UPLOADED_DAY, u64::from(newest))?;
            record_submission(store, &keys)?;
        }
        Ok(keys)
    }

    /// Marks the submission published once any of its keys shows up in
    /// received diagnosis keys.
    fn confirm_submission(&self, keys: &[DiagnosisKey]) -> TracingResult<()> {
        let store = self.store.lock();
        if !load_submission_status(&store)?.awaiting_approval() {
            return Ok(());
        }

        let submitted = load_submitted_keys(&store)?;
        if keys.iter().any(|dk| submitted.contains(&dk.fingerprint())) {
            store.set_json_setting(SUBMISSION_STATUS, &SubmissionStatus::SubmittedApproved)?;
            store.log_audit_event("submission_published", None)?;
            info!("own diagnosis keys published by the server");
        }
        Ok(())
    }

    fn start_sharing(&self) -> TracingResult<()> {
        if !self.state().is_enabled() {
            return Err(TracingError::ServiceDisabled);
        }

        let keys = {
            let store = self.store.lock();
            ConsentManager::new(&store).grant(ConsentType::KeySharing)?;
            store.set_u64_setting(SHARING_STARTED_AT, self.clock.now())?;
            store.delete_setting(SHARING_EXPIRED_AT)?;
            store.delete_setting(LAST_UPLOADED_DAY)?;
            store.delete_setting(SUBMITTED_KEYS)?;
            store.set_json_setting(SUBMISSION_STATUS, &SubmissionStatus::Pending)?;
            store.log_audit_event("sharing_started", None)?;
            self.take_uploads(&store, self.clock.today())?
        };

        if self.state() == TracingState::TemporarilyDisabled {
            self.set_state(TracingState::Active);
        }
        info!(keys = keys.len(), "key sharing started");
        self.events
            .dispatch(TracingEvent::UploadRequested { keys });
        Ok(())
    }

    fn match_batch(&self, keys: &DiagnosisKeySet) -> TracingResult<ExposureSummary> {
        if !self.state().is_enabled() {
            return Err(TracingError::ServiceDisabled);
        }

        let exposure = self.exposure.read().clone();
        let summary = self.matcher.match_keys(keys, &exposure)?;
        self.confirm_submission(&keys.keys)?;
        if summary.updated.iter().any(|r| exposure.is_reportable(r)) {
            self.events.dispatch(TracingEvent::Contact {
                summary: summary.clone(),
            });
        }
        Ok(summary)
    }

    async fn refresh(self: &Arc<Self>, feed: &dyn DiagnosisKeyFeed) -> TracingResult<FeedRefresh> {
        if !self.state().is_enabled() {
            return Err(TracingError::ServiceDisabled);
        }

        let now = self.clock.now();
        let (since, retry_at) = {
            let store = self.store.lock();
            (
                store.get_u64_setting(FEED_LAST_DATE)?,
                store.get_u64_setting(FEED_EARLIEST_RETRY_AT)?,
            )
        };
        if let Some(until) = retry_at.filter(|until| *until > now) {
            debug!(until, "key feed refresh deferred");
            return Ok(FeedRefresh::Deferred { until });
        }

        let response = feed.fetch(since).await?;
        if let Some(configuration) = response.configuration.clone() {
            self.apply_exposure_configuration(configuration)?;
        }

        if response.list_type == FeedListType::Full {
            let store = self.store.lock();
            let cleared = store.clear_exposures()?;
            store.log_audit_event("exposures_replaced", Some(&cleared.to_string()))?;
            debug!(cleared, "full key list received; previous exposures discarded");
        }

        let keys = response.keys.len();
        let batches = DiagnosisKeySet::new(response.keys).into_batches(max_diagnosis_keys());
        let batch_count = batches.len();

        let mut summary = ExposureSummary::default();
        for batch in batches {
            let shared = self.clone();
            let part = tokio::task::spawn_blocking(move || shared.match_batch(&batch))
                .await
                .map_err(|e| TracingError::Internal(e.to_string()))??;
            merge_summary(&mut summary, part);
        }

        let withdrawn = response.deleted_keys.len();
        if withdrawn > 0 {
            let exposure = self.exposure.read().clone();
            self.matcher
                .retract_keys(&response.deleted_keys, &exposure)?;
        }

        {
            let store = self.store.lock();
            store.set_u64_setting(FEED_LAST_DATE, response.date)?;
            match response.earliest_retry_at {
                Some(at) => store
                    .set_u64_setting(FEED_EARLIEST_RETRY_AT, at.min(now + MAX_RETRY_DELAY_SECS))?,
                None => store.delete_setting(FEED_EARLIEST_RETRY_AT)?,
            }
        }

        info!(
            keys,
            withdrawn,
            batches = batch_count,
            "refreshed diagnosis keys from feed"
        );
        Ok(FeedRefresh::Completed {
            keys,
            batches: batch_count,
            withdrawn,
            summary,
        })
    }

    fn apply_exposure_configuration(&self, config: ExposureConfiguration) -> TracingResult<()> {
        config.validate()?;
        let today = self.clock.today();
        {
            let store = self.store.lock();
            store.set_json_setting(EXPOSURE_CONFIGURATION, &config)?;
            store.rescore_exposures(|record| config.score(record, today))?;
        }
        *self.exposure.write() = config;
        debug!("exposure configuration updated");
        Ok(())
    }

    fn reportable_records(&self) -> TracingResult<Vec<ExposureRecord>> {
        let exposure = self.exposure.read().clone();
        let records = self.store.lock().exposure_records()?;
        Ok(records
            .into_iter()
            .filter(|record| exposure.is_reportable(record))
            .collect())
    }
}

fn load_submission_status(store: &KeyStore) -> TracingResult<SubmissionStatus> {
    Ok(store
        .get_json_setting(SUBMISSION_STATUS)?
        .unwrap_or_default())
}

fn load_submitted_keys(store: &KeyStore) -> TracingResult<Vec<String>> {
    Ok(store.get_json_setting(SUBMITTED_KEYS)?.unwrap_or_default())
}

/// Remembers handed-out keys so the feed can confirm their publication.
fn record_submission(store: &KeyStore, keys: &[DailyTracingKey]) -> TracingResult<()> {
    let mut submitted = load_submitted_keys(store)?;
    submitted.extend(
        keys.iter()
            .map(|key| DiagnosisKey::unsigned(key.clone()).fingerprint()),
    );
    submitted.sort();
    submitted.dedup();
    store.set_json_setting(SUBMITTED_KEYS, &submitted)?;

    if load_submission_status(store)? != SubmissionStatus::SubmittedApproved {
        store.set_json_setting(SUBMISSION_STATUS, &SubmissionStatus::SubmittedUnapproved)?;
    }
    Ok(())
}

fn merge_summary(total: &mut ExposureSummary, part: ExposureSummary) {
    total.matched_key_count += part.matched_key_count;
    total.maximum_risk_score = total.maximum_risk_score.max(part.maximum_risk_score);
    total.days_since_last_exposure = match (
        total.days_since_last_exposure,
        part.days_since_last_exposure,
    ) {
        (Some(a), Some(b)) => Some(a.min(b)),
        (a, b) => a.or(b),
    };
    total.updated.extend(part.updated);
}
