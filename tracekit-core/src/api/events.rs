// SPDX-FileCopyrightText: 2026 Mattia Egloff <mattia.egloff@pm.me>
//
// SPDX-License-Identifier: GPL-3.0-or-later

//! Event System
//!
//! Notifications the controller sends to the host application. Handlers are
//! registered by `start_contact_tracing` and do not survive a restart.

use std::sync::Arc;

use parking_lot::RwLock;
use tokio::sync::mpsc;

use super::{Status, TracingState};
use crate::identity::DailyTracingKey;
use crate::matching::ExposureSummary;

/// Events emitted by the controller.
#[derive(Debug, Clone)]
pub enum TracingEvent {
    /// A matching pass found a reportable exposure.
    Contact {
        summary: ExposureSummary,
    },

    /// Keys to hand to the health authority for signing and upload.
    UploadRequested {
        keys: Vec<DailyTracingKey>,
    },

    /// The host should fetch fresh diagnosis keys and provide them.
    ProvideKeysRequested,

    /// The user must be asked to opt in; answer with `resolve_consent`.
    ConsentRequested,

    StateChanged {
        from: TracingState,
        to: TracingState,
    },

    /// A background operation failed.
    Error {
        status: Status,
        message: String,
    },
}

/// Event handler trait.
pub trait EventHandler: Send + Sync {
    /// Called when an event occurs.
    fn on_event(&self, event: TracingEvent);
}

/// Closure-based event handler.
pub struct CallbackHandler<F>
where
    F: Fn(TracingEvent) + Send + Sync,
{
    callback: F,
}

impl<F> CallbackHandler<F>
where
    F: Fn(TracingEvent) + Send + Sync,
{
    pub fn new(callback: F) -> Self {
        CallbackHandler { callback }
    }
}

impl<F> EventHandler for CallbackHandler<F>
where
    F: Fn(TracingEvent) + Send + Sync,
{
    fn on_event(&self, event: TracingEvent) {
        (self.callback)(event);
    }
}

/// Forwards events into an unbounded channel.
pub struct ChannelHandler {
    sender: mpsc::UnboundedSender<TracingEvent>,
}

impl EventHandler for ChannelHandler {
    fn on_event(&self, event: TracingEvent) {
        // A closed receiver means the host stopped listening.
        let _ = self.sender.send(event);
    }
}

/// Creates a handler and the receiver its events arrive on.
pub fn channel() -> (ChannelHandler, mpsc::UnboundedReceiver<TracingEvent>) {
    let (sender, receiver) = mpsc::unbounded_channel();
    (ChannelHandler { sender }, receiver)
}

/// Fans events out to the registered handlers.
#[derive(Default)]
pub struct EventDispatcher {
    handlers: RwLock<Vec<Arc<dyn EventHandler>>>,
}

impl EventDispatcher {
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds an event handler.
    pub fn add_handler(&self, handler: Arc<dyn EventHandler>) {
        self.handlers.write().push(handler);
    }

    /// Replaces every handler with `handler`.
    pub fn set_handler(&self, handler: Arc<dyn EventHandler>) {
        *self.handlers.write() = vec![handler];
    }

    /// Removes all handlers.
    pub fn clear_handlers(&self) {
        self.handlers.write().clear();
    }

    /// Returns the number of registered handlers.
    pub fn handler_count(&self) -> usize {
        self.handlers.read().len()
    }

    /// Dispatches an event to all handlers.
    pub fn dispatch(&self, event: TracingEvent) {
        let handlers = self.handlers.read().clone();
        for handler in &handlers {
            handler.on_event(event.clone());
        }
    }
}
