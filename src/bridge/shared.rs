//! State shared between the bridge handle and its background tasks.
//!
//! Locks here are short: they are never held across an `.await`, while a
//! listener runs, or while the host primitive is invoked.

// ============================================================================
// Imports
// ============================================================================

use std::panic::{AssertUnwindSafe, catch_unwind};
use std::sync::Arc;

use parking_lot::Mutex;
use serde_json::Value;
use tokio::sync::{mpsc, oneshot};
use tracing::{error, warn};

use crate::error::{Error, Result};
use crate::identifiers::SequenceNumber;
use crate::logger::{debug_unless_quiet, trace_unless_quiet};
use crate::options::Options;
use crate::protocol::{BroadcastEvent, Inbound, SubscribeCall, tag_request};
use crate::transport::{HostEnvironment, Responder, TransportMode};

use super::registry::{Listener, SubscriberRegistry};
use super::state::{ConnectionState, LinkState, Queued};

// ============================================================================
// Link
// ============================================================================

/// Outbound half of the active channel.
pub(crate) enum Link {
    /// Messages for the socket task.
    Socket {
        outbound: mpsc::UnboundedSender<Value>,
    },
    /// The host API.
    Host { host: Arc<dyn HostEnvironment> },
}

impl Link {
    fn mode(&self) -> TransportMode {
        match self {
            Self::Socket { .. } => TransportMode::Socket,
            Self::Host { .. } => TransportMode::Host,
        }
    }
}

// ============================================================================
// Shared
// ============================================================================

/// Bridge internals.
pub(crate) struct Shared {
    pub(crate) options: Options,
    pub(crate) link: Link,
    state: Mutex<LinkState>,
    registry: Mutex<SubscriberRegistry>,
}

impl Shared {
    pub(crate) fn new(options: Options, link: Link) -> Self {
        Self {
            options,
            link,
            state: Mutex::new(LinkState::default()),
            registry: Mutex::new(SubscriberRegistry::new()),
        }
    }

    #[inline]
    pub(crate) fn mode(&self) -> TransportMode {
        self.link.mode()
    }

    #[inline]
    pub(crate) fn connection_state(&self) -> ConnectionState {
        self.state.lock().connection
    }

    #[inline]
    pub(crate) fn queued_len(&self) -> usize {
        self.state.lock().queue.len()
    }

    #[inline]
    pub(crate) fn pending_len(&self) -> usize {
        self.state.lock().pending.len()
    }
}

// ============================================================================
// Registry
// ============================================================================

impl Shared {
    pub(crate) fn subscribe(&self, event: String, listener: Listener) {
        self.registry.lock().subscribe(event, listener);
    }

    pub(crate) fn unsubscribe(&self, event: &str, listener: &Listener) -> bool {
        self.registry.lock().unsubscribe(event, listener)
    }

    pub(crate) fn unsubscribe_all(&self, event: &str) {
        self.registry.lock().unsubscribe_all(event);
    }

    pub(crate) fn listeners(&self, event: &str) -> Vec<Listener> {
        self.registry.lock().listeners(event)
    }

    /// Builds the subscription message. Failures are reported and yield
    /// `None`.
    fn subscription(&self) -> Option<Value> {
        let call = SubscribeCall::new(self.registry.lock().event_names());
        match call.into_value() {
            Ok(message) => Some(message),
            Err(e) => {
                error!(error = %e, "Failed to serialize subscription, send abandoned");
                None
            }
        }
    }
}

// ============================================================================
// Outbound
// ============================================================================

impl Shared {
    /// Sends `message` now if ready, otherwise queues it.
    pub(crate) fn send_message(&self, message: Value, responder: Responder) {
        let mut state = self.state.lock();

        if !state.connection.is_ready() {
            state.queue.push_back(Queued::new(message, responder));
            trace_unless_quiet!(
                self.options.quiet,
                queued = state.queue.len(),
                "Transport not ready, message queued"
            );
            return;
        }

        match &self.link {
            // Sent under the lock so a concurrent disconnect cannot reorder it.
            Link::Socket { outbound } => {
                if let Err(mpsc::error::SendError(message)) = outbound.send(message) {
                    warn!("Socket task gone, message queued");
                    state.queue.push_back(Queued::new(message, responder));
                }
            }
            Link::Host { host } => {
                let host = Arc::clone(host);
                drop(state);
                self.deliver_to_host(host.as_ref(), message, responder);
            }
        }
    }

    /// Serializes and hands a message to the host primitive.
    pub(crate) fn deliver_to_host(
        &self,
        host: &dyn HostEnvironment,
        message: Value,
        responder: Responder,
    ) {
        match serde_json::to_string(&message) {
            Ok(text) => host.call_handler(text, responder),
            Err(e) => {
                error!(error = %e, "Failed to serialize message for host");
                responder.finish(Err(Error::Json(e)));
            }
        }
    }

    /// Registers a correlated request and sends it.
    ///
    /// Socket mode tags the body with a fresh `rseq`; host mode relies on
    /// the per-call responder.
    pub(crate) fn request(
        &self,
        body: Value,
    ) -> Result<(Option<SequenceNumber>, oneshot::Receiver<Result<Value>>)> {
        let (tx, rx) = oneshot::channel();

        match self.link {
            Link::Socket { .. } => {
                let (seq, message) = {
                    let mut state = self.state.lock();
                    let seq = state.next_seq.next();
                    let tagged = tag_request(body, seq)?;
                    state.pending.insert(seq, tx);
                    (seq, tagged)
                };
                trace_unless_quiet!(self.options.quiet, %seq, "Request registered");
                self.send_message(message, Responder::detached());
                Ok((Some(seq), rx))
            }
            Link::Host { .. } => {
                self.send_message(body, Responder::new(tx));
                Ok((None, rx))
            }
        }
    }

    /// Drops a pending entry, e.g. after a timeout.
    pub(crate) fn remove_pending(&self, seq: SequenceNumber) {
        if self.state.lock().pending.remove(&seq).is_some() {
            debug_unless_quiet!(self.options.quiet, %seq, "Removed timed-out request");
        }
    }

    /// Fails every pending request with [`Error::ConnectionClosed`].
    pub(crate) fn fail_pending(&self) {
        let pending: Vec<_> = self.state.lock().pending.drain().collect();
        let count = pending.len();

        for (_, tx) in pending {
            let _ = tx.send(Err(Error::ConnectionClosed));
        }

        if count > 0 {
            debug_unless_quiet!(self.options.quiet, count, "Failed pending requests on shutdown");
        }
    }

    /// Marks the link down for good and fails pending requests.
    pub(crate) fn close(&self) {
        self.state.lock().connection = ConnectionState::Disconnected;
        self.fail_pending();
    }

    /// Announces the current subscriptions and remembers that events started.
    pub(crate) fn start_events(&self) {
        self.state.lock().events_started = true;
        if let Some(message) = self.subscription() {
            self.send_message(message, Responder::detached());
        }
    }
}

// ============================================================================
// Transport Hooks
// ============================================================================

impl Shared {
    pub(crate) fn begin_connecting(&self) {
        self.state.lock().connection = ConnectionState::Connecting;
    }

    /// See [`LinkState::drain_or_ready`].
    pub(crate) fn drain_or_ready(&self) -> Vec<Queued> {
        self.state.lock().drain_or_ready()
    }

    /// Puts the subscription at the head of the queue after a reconnect.
    pub(crate) fn requeue_subscription(&self) {
        if !self.state.lock().events_started {
            return;
        }
        if let Some(message) = self.subscription() {
            self.state.lock().queue.push_front(Queued::bare(message));
        }
    }

    /// Marks the socket down and returns unsent work to the queue.
    ///
    /// `unsent` goes first, then anything still buffered for the task.
    pub(crate) fn mark_disconnected(
        &self,
        unsent: Vec<Value>,
        outbound_rx: &mut mpsc::UnboundedReceiver<Value>,
    ) {
        let mut state = self.state.lock();
        state.connection = ConnectionState::Disconnected;
        state.requeue_front(unsent);
        while let Ok(message) = outbound_rx.try_recv() {
            state.queue.push_back(Queued::bare(message));
        }
        trace_unless_quiet!(
            self.options.quiet,
            queued = state.queue.len(),
            "Transport disconnected"
        );
    }
}

// ============================================================================
// Inbound
// ============================================================================

impl Shared {
    /// Parses JSON text from the channel and routes it.
    pub(crate) fn handle_inbound_text(&self, text: &str) {
        match Inbound::parse(text) {
            Ok(inbound) => self.handle_classified(inbound),
            Err(e) => error!(error = %e, "Failed to parse inbound message, discarded"),
        }
    }

    /// Routes a decoded message to a pending request or to subscribers.
    pub(crate) fn handle_inbound(&self, message: Value) {
        self.handle_classified(Inbound::classify(message));
    }

    fn handle_classified(&self, inbound: Inbound) {
        match inbound {
            Inbound::Response { seq, body } => {
                let tx = self.state.lock().pending.remove(&seq);
                match tx {
                    Some(tx) => {
                        trace_unless_quiet!(self.options.quiet, %seq, "Response received");
                        let _ = tx.send(Ok(body));
                    }
                    None => {
                        warn!(%seq, "Response for unknown request");
                        self.route(Inbound::ignoring_seq(body));
                    }
                }
            }
            other => self.route(other),
        }
    }

    fn route(&self, inbound: Inbound) {
        match inbound {
            Inbound::Broadcast { event_type, body } => self.dispatch(event_type, body),
            Inbound::Untyped(_) => {
                debug_unless_quiet!(self.options.quiet, "Inbound message without type, dropped");
            }
            Inbound::Response { seq, .. } => warn!(%seq, "Unmatched response dropped"),
        }
    }

    /// Invokes every listener for `event_type` in registration order.
    ///
    /// A panicking listener is logged and skipped.
    pub(crate) fn dispatch(&self, event_type: String, body: Value) {
        let listeners = self.listeners(&event_type);
        if listeners.is_empty() {
            trace_unless_quiet!(self.options.quiet, event_type, "No subscribers, event dropped");
            return;
        }

        let event = if self.options.enrich_payloads {
            BroadcastEvent::enriched(event_type, body)
        } else {
            BroadcastEvent::raw(event_type, body)
        };

        debug_unless_quiet!(
            self.options.quiet,
            event_type = %event.event_type,
            listeners = listeners.len(),
            "Dispatching event"
        );

        for (index, listener) in listeners.iter().enumerate() {
            if catch_unwind(AssertUnwindSafe(|| listener(&event))).is_err() {
                error!(event_type = %event.event_type, index, "Subscriber panicked");
            }
        }
    }
}
