//! Host-callback channel.
//!
//! The host application embeds the overlay and exposes a small API: a
//! readiness flag, a handler-call primitive that answers through a
//! per-call callback, a slot for the overlay's inbound event handler, and
//! a session-finalization call. [`HostEnvironment`] models that API;
//! [`EventPort`] is the handler the bridge installs into it.
//!
//! # Lifecycle
//!
//! 1. Bridge starts in `Connecting` and polls [`HostEnvironment::is_ready`]
//!    every `poll_interval`, with no upper bound
//! 2. Once ready, the bridge installs its [`EventPort`]
//! 3. Queued messages are handed to [`HostEnvironment::call_handler`] in
//!    arrival order, each with its own [`Responder`]
//! 4. Bridge reports `Ready`; later sends go straight to the host

// ============================================================================
// Imports
// ============================================================================

use std::fmt;
use std::sync::{Arc, Weak};

use async_trait::async_trait;
use serde_json::Value;
use tokio::sync::oneshot;
use tokio::time::sleep;
use tracing::error;

use crate::bridge::shared::Shared;
use crate::error::{Error, Result};
use crate::logger::{info_unless_quiet, trace_unless_quiet};

// ============================================================================
// HostEnvironment
// ============================================================================

/// API provided by the embedding host application.
#[async_trait]
pub trait HostEnvironment: Send + Sync {
    /// Returns `true` once the host API is available.
    fn is_ready(&self) -> bool;

    /// Installs the bridge's inbound handler.
    ///
    /// The host invokes the port for every broadcast it emits.
    fn install_event_port(&self, port: EventPort);

    /// Passes a serialized message to the host's handler dispatcher.
    ///
    /// The host answers, possibly later, through `responder`.
    fn call_handler(&self, message: String, responder: Responder);

    /// Ends the current encounter.
    async fn end_encounter(&self) -> Result<Value>;
}

// ============================================================================
// Responder
// ============================================================================

/// One-shot reply handle passed alongside each host call.
///
/// Dropping a responder without answering resolves the waiting caller
/// with [`Error::ChannelClosed`].
pub struct Responder {
    tx: Option<oneshot::Sender<Result<Value>>>,
}

impl Responder {
    /// Creates a responder feeding `tx`.
    #[inline]
    pub(crate) fn new(tx: oneshot::Sender<Result<Value>>) -> Self {
        Self { tx: Some(tx) }
    }

    /// Creates a responder nobody is waiting on.
    #[inline]
    #[must_use]
    pub fn detached() -> Self {
        Self { tx: None }
    }

    /// Returns `true` if no caller awaits this response.
    #[inline]
    #[must_use]
    pub fn is_detached(&self) -> bool {
        self.tx.as_ref().is_none_or(oneshot::Sender::is_closed)
    }

    /// Answers with JSON text produced by the host.
    ///
    /// Text that fails to parse is reported and resolves the caller with
    /// [`Error::Json`].
    pub fn respond(self, text: &str) {
        match serde_json::from_str::<Value>(text) {
            Ok(value) => self.finish(Ok(value)),
            Err(e) => {
                error!(error = %e, "Failed to parse host response");
                self.finish(Err(Error::Json(e)));
            }
        }
    }

    /// Answers with an already decoded value.
    pub fn respond_value(self, value: Value) {
        self.finish(Ok(value));
    }

    /// Answers with a host-side failure.
    pub fn reject(self, message: impl Into<String>) {
        self.finish(Err(Error::host(message)));
    }

    pub(crate) fn finish(mut self, outcome: Result<Value>) {
        if let Some(tx) = self.tx.take() {
            let _ = tx.send(outcome);
        }
    }
}

impl fmt::Debug for Responder {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Responder")
            .field("detached", &self.is_detached())
            .finish()
    }
}

// ============================================================================
// EventPort
// ============================================================================

/// Inbound entry point the host calls with broadcast events.
///
/// Holds a weak reference; once the bridge is dropped delivery is a no-op.
#[derive(Clone)]
pub struct EventPort {
    shared: Weak<Shared>,
    quiet: bool,
}

impl EventPort {
    pub(crate) fn new(shared: &Arc<Shared>) -> Self {
        Self {
            shared: Arc::downgrade(shared),
            quiet: shared.options.quiet,
        }
    }

    /// Delivers a JSON-encoded message.
    ///
    /// Unparseable text is reported and discarded.
    pub fn deliver(&self, text: &str) {
        if let Some(shared) = self.shared.upgrade() {
            shared.handle_inbound_text(text);
        } else {
            trace_unless_quiet!(self.quiet, "Event port detached, dropping message");
        }
    }

    /// Delivers an already decoded message.
    pub fn deliver_value(&self, message: Value) {
        if let Some(shared) = self.shared.upgrade() {
            shared.handle_inbound(message);
        } else {
            trace_unless_quiet!(self.quiet, "Event port detached, dropping message");
        }
    }

    /// Returns `true` while the bridge behind this port is alive.
    #[inline]
    #[must_use]
    pub fn is_attached(&self) -> bool {
        self.shared.strong_count() > 0
    }
}

impl fmt::Debug for EventPort {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("EventPort")
            .field("attached", &self.is_attached())
            .finish()
    }
}

// ============================================================================
// Readiness Loop
// ============================================================================

/// Waits for the host, installs the event port and flushes the queue.
pub(crate) async fn run(shared: Arc<Shared>, host: Arc<dyn HostEnvironment>) {
    let quiet = shared.options.quiet;
    shared.begin_connecting();

    let mut polls: u64 = 0;
    while !host.is_ready() {
        polls += 1;
        trace_unless_quiet!(quiet, polls, "Host API not ready");
        sleep(shared.options.poll_interval).await;
    }

    host.install_event_port(EventPort::new(&shared));

    let mut flushed = 0usize;
    loop {
        let batch = shared.drain_or_ready();
        if batch.is_empty() {
            break;
        }
        flushed += batch.len();
        for queued in batch {
            shared.deliver_to_host(host.as_ref(), queued.message, queued.responder);
        }
    }

    info_unless_quiet!(quiet, polls, flushed, "Host API ready");
}

// ============================================================================
// Tests
// ============================================================================
