//! Connection state, outbound queue and pending responses.

// ============================================================================
// Imports
// ============================================================================

use std::collections::VecDeque;
use std::fmt;

use rustc_hash::FxHashMap;
use serde_json::Value;
use tokio::sync::oneshot;

use crate::error::Result;
use crate::identifiers::SequenceNumber;
use crate::transport::Responder;

// ============================================================================
// Types
// ============================================================================

/// Map of sequence numbers to response channels.
pub(crate) type CorrelationMap = FxHashMap<SequenceNumber, oneshot::Sender<Result<Value>>>;

// ============================================================================
// ConnectionState
// ============================================================================

/// Transport lifecycle.
///
/// `Disconnected → Connecting → Ready`; a socket failure drops back to
/// `Disconnected` and a fresh attempt starts after the reconnect delay.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
pub enum ConnectionState {
    #[default]
    Disconnected,
    Connecting,
    Ready,
}

impl ConnectionState {
    /// Returns `true` when messages go straight to the channel.
    #[inline]
    #[must_use]
    pub const fn is_ready(self) -> bool {
        matches!(self, Self::Ready)
    }
}

impl fmt::Display for ConnectionState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Disconnected => f.write_str("disconnected"),
            Self::Connecting => f.write_str("connecting"),
            Self::Ready => f.write_str("ready"),
        }
    }
}

// ============================================================================
// Queued
// ============================================================================

/// An outbound message waiting for the channel.
///
/// The responder is only meaningful in host-callback mode; socket mode
/// correlates through `rseq` and queues detached responders.
#[derive(Debug)]
pub(crate) struct Queued {
    pub(crate) message: Value,
    pub(crate) responder: Responder,
}

impl Queued {
    #[inline]
    pub(crate) fn new(message: Value, responder: Responder) -> Self {
        Self { message, responder }
    }

    #[inline]
    pub(crate) fn bare(message: Value) -> Self {
        Self::new(message, Responder::detached())
    }
}

// ============================================================================
// LinkState
// ============================================================================

/// Mutable transport state, guarded by one lock.
#[derive(Debug, Default)]
pub(crate) struct LinkState {
    pub(crate) connection: ConnectionState,
    pub(crate) queue: VecDeque<Queued>,
    pub(crate) pending: CorrelationMap,
    pub(crate) next_seq: SequenceNumber,
    /// Set once `start_events` has been called.
    pub(crate) events_started: bool,
}

impl LinkState {
    /// Takes everything queued, or marks `Ready` if the queue is empty.
    pub(crate) fn drain_or_ready(&mut self) -> Vec<Queued> {
        if self.queue.is_empty() {
            self.connection = ConnectionState::Ready;
            return Vec::new();
        }
        self.queue.drain(..).collect()
    }

    /// Puts unsent messages back at the head of the queue, keeping order.
    pub(crate) fn requeue_front(&mut self, unsent: Vec<Value>) {
        for message in unsent.into_iter().rev() {
            self.queue.push_front(Queued::bare(message));
        }
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    use serde_json::json;

    fn messages(state: &LinkState) -> Vec<Value> {
        state.queue.iter().map(|q| q.message.clone()).collect()
    }

    #[test]
    fn test_initial_state() {
        let state = LinkState::default();
        assert_eq!(state.connection, ConnectionState::Disconnected);
        assert!(state.queue.is_empty());
        assert!(state.pending.is_empty());
        assert_eq!(state.next_seq.as_u64(), 0);
    }

    #[test]
    fn test_drain_or_ready() {
        let mut state = LinkState {
            connection: ConnectionState::Connecting,
            ..LinkState::default()
        };
        state.queue.push_back(Queued::bare(json!(1)));
        state.queue.push_back(Queued::bare(json!(2)));

        let batch: Vec<Value> = state.drain_or_ready().into_iter().map(|q| q.message).collect();
        assert_eq!(batch, vec![json!(1), json!(2)]);
        assert_eq!(state.connection, ConnectionState::Connecting);

        assert!(state.drain_or_ready().is_empty());
        assert!(state.connection.is_ready());
    }

    #[test]
    fn test_requeue_front_keeps_order() {
        let mut state = LinkState::default();
        state.queue.push_back(Queued::bare(json!("newer")));

        state.requeue_front(vec![json!("a"), json!("b")]);
        assert_eq!(messages(&state), vec![json!("a"), json!("b"), json!("newer")]);
    }

    #[test]
    fn test_display() {
        assert_eq!(ConnectionState::Connecting.to_string(), "connecting");
    }
}
