//! Broadcast events delivered to subscribers.
//!
//! A broadcast is any inbound object with a string `type` that is not a
//! correlated response. Listeners receive it as a [`BroadcastEvent`], with
//! the body either untouched or, for `CombatData` with enrichment enabled,
//! reshaped into a [`CombatDataView`].

// ============================================================================
// Imports
// ============================================================================

use serde_json::Value;

use crate::enrich::{self, CombatDataView};

// ============================================================================
// EventPayload
// ============================================================================

/// Body of a broadcast event.
#[derive(Debug, Clone, PartialEq)]
pub enum EventPayload {
    /// Message exactly as received.
    Raw(Value),
    /// Enriched `CombatData`.
    CombatData(Box<CombatDataView>),
}

impl EventPayload {
    /// Returns the raw body, if not enriched.
    #[inline]
    #[must_use]
    pub fn as_raw(&self) -> Option<&Value> {
        match self {
            Self::Raw(value) => Some(value),
            Self::CombatData(_) => None,
        }
    }

    /// Returns the enriched view, if any.
    #[inline]
    #[must_use]
    pub fn as_combat_data(&self) -> Option<&CombatDataView> {
        match self {
            Self::Raw(_) => None,
            Self::CombatData(view) => Some(view),
        }
    }
}

// ============================================================================
// BroadcastEvent
// ============================================================================

/// An event dispatched to subscribers.
#[derive(Debug, Clone, PartialEq)]
pub struct BroadcastEvent {
    /// Declared `type` of the message.
    pub event_type: String,

    /// Event body.
    pub payload: EventPayload,
}

impl BroadcastEvent {
    /// Wraps a body without enrichment.
    #[inline]
    #[must_use]
    pub fn raw(event_type: impl Into<String>, body: Value) -> Self {
        Self {
            event_type: event_type.into(),
            payload: EventPayload::Raw(body),
        }
    }

    /// Wraps a body, enriching it when its type supports enrichment.
    #[must_use]
    pub fn enriched(event_type: impl Into<String>, body: Value) -> Self {
        let event_type = event_type.into();
        let payload = enrich::enrich(&event_type, body);
        Self {
            event_type,
            payload,
        }
    }
}

// ============================================================================
// Tests
// ============================================================================
