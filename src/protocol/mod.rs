//! Message types exchanged with the host.
//!
//! # Protocol Overview
//!
//! | Message | Direction | Purpose |
//! |---------|-----------|---------|
//! | Request | Local → Host | Handler call, optionally tagged with `rseq` |
//! | `SubscribeCall` | Local → Host | Announce wanted event types |
//! | Response | Host → Local | Reply echoing `rseq` |
//! | Broadcast | Host → Local | Telemetry update with a `type` |
//!
//! # Modules
//!
//! | Module | Description |
//! |--------|-------------|
//! | `combat` | Typed raw `CombatData` records |
//! | `event` | Broadcast events as seen by listeners |
//! | `message` | Wire framing and inbound classification |

// ============================================================================
// Submodules
// ============================================================================

/// Raw `CombatData` records.
pub mod combat;

/// Broadcast event types.
pub mod event;

/// Wire messages and classification.
pub mod message;

// ============================================================================
// Re-exports
// ============================================================================

pub use combat::{RawCombatData, RawCombatant, RawEncounter};
pub use event::{BroadcastEvent, EventPayload};
pub use message::{EventKind, Inbound, SubscribeCall, is_recognized_broadcast, tag_request};
