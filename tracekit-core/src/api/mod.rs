// SPDX-FileCopyrightText: 2026 Mattia Egloff <mattia.egloff@pm.me>
//
// SPDX-License-Identifier: GPL-3.0-or-later

//! Tracekit API Layer
//!
//! High-level API for hosts embedding the exposure-notification core.
//!
//! # Example
//!
//! ```ignore
//! use std::sync::Arc;
//! use tracekit_core::api::{events, TracingConfig, TracingController, TracingEvent};
//! use tracekit_core::beacon::MockRadio;
//! use tracekit_core::time::SystemClock;
//!
//! let controller = TracingController::new(
//!     TracingConfig::with_storage_path("./tracekit_data"),
//!     Arc::new(MockRadio::new()),
//!     Arc::new(SystemClock),
//! )?;
//!
//! let (handler, mut events) = events::channel();
//! let started = controller.start_contact_tracing(Arc::new(handler));
//! if let Some(TracingEvent::ConsentRequested) = events.recv().await {
//!     controller.resolve_consent(true)?;
//! }
//! assert!(started.outcome().await.is_success());
//! ```
//!
//! # Module Structure
//!
//! - [`error`] - `TracingError` and `Status` codes
//! - [`config`] - `TracingConfig`
//! - [`events`] - Notifications to the host
//! - [`consent`] - Opt-in records
//! - [`state`] - `TracingState` and `SubmissionStatus`
//! - [`task`] - Cancellable operation handles
//! - [`controller`] - The `TracingController` state machine

pub mod config;
pub mod consent;
pub mod controller;
pub mod error;
pub mod events;
pub mod state;
pub mod task;

pub use config::TracingConfig;
pub use consent::{ConsentManager, ConsentRecord, ConsentType};
pub use controller::{FeedRefresh, MaintenanceReport, TracingController};
pub use error::{Status, TracingError, TracingResult};
pub use events::{CallbackHandler, ChannelHandler, EventDispatcher, EventHandler, TracingEvent};
pub use state::{SubmissionStatus, TracingState};
pub use task::{Task, TaskOutcome};
