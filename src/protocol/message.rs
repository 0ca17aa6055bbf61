//! Wire messages exchanged with the host.
//!
//! All traffic is JSON objects. Outbound requests carry a caller-defined
//! body; in socket mode the bridge injects an `rseq` field that the host
//! echoes back on the response.
//!
//! # Formats
//!
//! Subscription:
//! ```json
//! { "call": "subscribe", "events": ["CombatData", "LogLine"] }
//! ```
//!
//! Response:
//! ```json
//! { "rseq": 3, "language": "English" }
//! ```
//!
//! Broadcast:
//! ```json
//! { "type": "ChangeZone", "zoneID": 1234 }
//! ```

// ============================================================================
// Imports
// ============================================================================

use std::fmt;
use std::str::FromStr;

use serde::Serialize;
use serde_json::Value;

use crate::error::{Error, Result};
use crate::identifiers::SequenceNumber;

// ============================================================================
// Constants
// ============================================================================

/// Field carrying the correlation number on requests and responses.
pub const RSEQ_FIELD: &str = "rseq";

/// Field naming a broadcast event's type.
pub const TYPE_FIELD: &str = "type";

// ============================================================================
// EventKind
// ============================================================================

/// Broadcast event types known to the host.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EventKind {
    /// Encounter and combatant statistics.
    CombatData,
    /// Single parsed log line.
    LogLine,
    /// Batch of log lines from an imported file.
    ImportedLogLines,
    /// Player changed zone.
    ChangeZone,
    /// Primary player changed.
    ChangePrimaryPlayer,
    /// Map changed within a zone.
    ChangeMap,
    /// Online status of a character changed.
    OnlineStatusChanged,
    /// Party composition changed.
    PartyChanged,
    /// Message broadcast by another overlay.
    BroadcastMessage,
    /// Watched file changed.
    FileChanged,
    /// Current target enmity table.
    EnmityTargetData,
    /// Aggro list for the party.
    EnmityAggroList,
    /// Combat state toggled.
    InCombat,
}

impl EventKind {
    /// All recognized kinds.
    pub const ALL: [Self; 13] = [
        Self::CombatData,
        Self::LogLine,
        Self::ImportedLogLines,
        Self::ChangeZone,
        Self::ChangePrimaryPlayer,
        Self::ChangeMap,
        Self::OnlineStatusChanged,
        Self::PartyChanged,
        Self::BroadcastMessage,
        Self::FileChanged,
        Self::EnmityTargetData,
        Self::EnmityAggroList,
        Self::InCombat,
    ];

    /// Returns the wire name.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::CombatData => "CombatData",
            Self::LogLine => "LogLine",
            Self::ImportedLogLines => "ImportedLogLines",
            Self::ChangeZone => "ChangeZone",
            Self::ChangePrimaryPlayer => "ChangePrimaryPlayer",
            Self::ChangeMap => "ChangeMap",
            Self::OnlineStatusChanged => "OnlineStatusChanged",
            Self::PartyChanged => "PartyChanged",
            Self::BroadcastMessage => "BroadcastMessage",
            Self::FileChanged => "FileChanged",
            Self::EnmityTargetData => "EnmityTargetData",
            Self::EnmityAggroList => "EnmityAggroList",
            Self::InCombat => "InCombat",
        }
    }
}

impl FromStr for EventKind {
    type Err = Error;

    fn from_str(name: &str) -> Result<Self> {
        Self::ALL
            .into_iter()
            .find(|kind| kind.as_str() == name)
            .ok_or_else(|| Error::protocol(format!("unrecognized event type: {name}")))
    }
}

impl fmt::Display for EventKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

// ============================================================================
// SubscribeCall
// ============================================================================

/// Announces the event types this bridge wants delivered.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SubscribeCall {
    call: &'static str,
    /// Event type names.
    pub events: Vec<String>,
}

impl SubscribeCall {
    /// Creates a subscription message for `events`.
    #[must_use]
    pub fn new(events: Vec<String>) -> Self {
        Self {
            call: "subscribe",
            events,
        }
    }

    /// Converts into the JSON object sent on the wire.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Json`] if serialization fails.
    pub fn into_value(self) -> Result<Value> {
        Ok(serde_json::to_value(self)?)
    }
}

// ============================================================================
// Inbound
// ============================================================================

/// Classification of a decoded inbound object.
#[derive(Debug, Clone, PartialEq)]
pub enum Inbound {
    /// Carries an `rseq`; may resolve a pending request.
    Response {
        /// Echoed sequence number.
        seq: SequenceNumber,
        /// Full message, `rseq` included.
        body: Value,
    },
    /// Carries a string `type`.
    Broadcast {
        /// Declared event type.
        event_type: String,
        /// Full message.
        body: Value,
    },
    /// Neither a response nor a typed event.
    Untyped(Value),
}

impl Inbound {
    /// Decodes JSON text and classifies it.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Json`] if the text is not valid JSON.
    pub fn parse(text: &str) -> Result<Self> {
        let value: Value = serde_json::from_str(text)?;
        Ok(Self::classify(value))
    }

    /// Classifies an already decoded value.
    #[must_use]
    pub fn classify(value: Value) -> Self {
        if let Some(seq) = value.get(RSEQ_FIELD).and_then(Value::as_u64) {
            return Self::Response {
                seq: SequenceNumber::new(seq),
                body: value,
            };
        }
        Self::ignoring_seq(value)
    }

    /// Classifies ignoring any `rseq` field.
    ///
    /// Used when a response matches no pending request.
    #[must_use]
    pub fn ignoring_seq(value: Value) -> Self {
        let event_type = value
            .get(TYPE_FIELD)
            .and_then(Value::as_str)
            .map(str::to_owned);

        match event_type {
            Some(event_type) => Self::Broadcast {
                event_type,
                body: value,
            },
            None => Self::Untyped(value),
        }
    }
}

// ============================================================================
// Request Tagging
// ============================================================================

/// Injects `rseq` into a request body.
///
/// # Errors
///
/// Returns [`Error::Protocol`] if the body is not a JSON object.
pub fn tag_request(body: Value, seq: SequenceNumber) -> Result<Value> {
    let Value::Object(mut map) = body else {
        return Err(Error::protocol("request body must be a JSON object"));
    };
    map.insert(RSEQ_FIELD.to_string(), Value::from(seq.as_u64()));
    Ok(Value::Object(map))
}

/// Returns `true` if `value` is a JSON object declaring a recognized type.
#[must_use]
pub fn is_recognized_broadcast(value: &Value) -> bool {
    value
        .as_object()
        .and_then(|map| map.get(TYPE_FIELD))
        .and_then(Value::as_str)
        .is_some_and(|name| name.parse::<EventKind>().is_ok())
}

// ============================================================================
// Tests
// ============================================================================
