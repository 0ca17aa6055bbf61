//! Overlay Bridge - Client bridge for combat-telemetry overlays.
//!
//! This library connects an overlay to the application that produces
//! combat telemetry, over whichever channel the page was launched with.
//!
//! # Architecture
//!
//! The bridge is a client of its host:
//!
//! - **Overlay (Rust)**: Subscribes to events, sends requests, renders data
//! - **Host**: Emits broadcast events, answers requests
//!
//! Key design principles:
//!
//! - Transport chosen once from the page URL: WebSocket or host callbacks
//! - Nothing sent before the channel is ready is lost or reordered
//! - Socket requests correlated by an `rseq` sequence number
//! - Automatic reconnect with a fixed delay, invisible to callers
//!
//! # Quick Start
//!
//! ```no_run
//! use overlay_bridge::{Bridge, BroadcastEvent, Options, Result, listener};
//!
//! #[tokio::main]
//! async fn main() -> Result<()> {
//!     let bridge = Bridge::builder()
//!         .page_url("http://localhost/overlay.html?OVERLAY_WS=ws://127.0.0.1:10501/ws")
//!         .options(Options::new().with_enrich_payloads())
//!         .build()?;
//!
//!     bridge.subscribe("CombatData", listener(|event: &BroadcastEvent| {
//!         if let Some(view) = event.payload.as_combat_data() {
//!             println!("{} dps", view.encounter.dps);
//!         }
//!     }));
//!     bridge.start_events();
//!
//!     tokio::signal::ctrl_c().await.ok();
//!     Ok(())
//! }
//! ```
//!
//! # Modules
//!
//! | Module | Description |
//! |--------|-------------|
//! | [`bridge`] | [`Bridge`] handle, builder, subscriber registry |
//! | [`enrich`] | `CombatData` reshaping and job roles |
//! | [`error`] | Error types and [`Result`] alias |
//! | [`fake`] | Sample payloads for simulation and tests |
//! | [`identifiers`] | Type-safe ID wrappers |
//! | [`options`] | Bridge [`Options`] |
//! | [`protocol`] | Wire message types and typed telemetry records |
//! | [`transport`] | Socket and host-callback channels |

// ============================================================================
// Modules
// ============================================================================

/// Bridge handle, builder and subscriber registry.
///
/// Use [`Bridge::builder()`] to create a configured bridge.
pub mod bridge;

/// `CombatData` enrichment.
///
/// Pure transform from raw telemetry to a typed view.
pub mod enrich;

/// Error types and result aliases.
///
/// All fallible operations return [`Result<T>`] which uses [`Error`].
pub mod error;

/// Sample telemetry payloads.
pub mod fake;

/// Type-safe identifiers.
///
/// Newtype wrappers prevent mixing incompatible IDs at compile time.
pub mod identifiers;

/// Quiet-aware logging macros.
mod logger;

/// Bridge options.
pub mod options;

/// Wire protocol message types.
///
/// Inbound classification, subscription calls and telemetry records.
pub mod protocol;

/// Transport layer.
///
/// WebSocket reconnect loop and the host environment seam.
pub mod transport;

// ============================================================================
// Re-exports
// ============================================================================

// Bridge types
pub use bridge::{
    Bridge, BridgeBuilder, ConnectionState, Listener, ResponseFuture, SubscriberRegistry,
    listener,
};

// Enrichment types
pub use enrich::{
    CombatDataView, CombatantRecord, EncounterSummary, JobRole, LimitBreakRecord, PlayerRecord,
};

// Error types
pub use error::{Error, Result};

// Identifier types
pub use identifiers::SequenceNumber;

// Options
pub use options::Options;

// Protocol types
pub use protocol::{BroadcastEvent, EventKind, EventPayload};

// Transport types
pub use transport::{Endpoint, EventPort, HostEnvironment, Responder, TransportMode};
