//! Bridge between an overlay and its host.
//!
//! # Components
//!
//! | Type | Description |
//! |------|-------------|
//! | [`Bridge`] | Uniform API over both transports |
//! | [`BridgeBuilder`] | Fluent configuration and transport selection |
//! | [`SubscriberRegistry`] | Event name → ordered listeners |
//! | [`ConnectionState`] | Transport lifecycle |
//!
//! # Ordering
//!
//! Messages sent before the transport is ready wait in a FIFO queue. The
//! transport reports `Ready` only after it has observed the queue empty, so
//! nothing sent later can overtake a queued message.

// ============================================================================
// Submodules
// ============================================================================

/// Fluent builder and transport selection.
pub mod builder;

/// Bridge handle.
pub mod core;

/// Subscriber registry.
pub mod registry;

/// State shared with background tasks.
pub(crate) mod shared;

/// Simulation timer.
mod simulation;

/// Connection state and queues.
pub mod state;

// ============================================================================
// Re-exports
// ============================================================================

pub use builder::BridgeBuilder;
pub use self::core::{Bridge, ResponseFuture};
pub use registry::{Listener, SubscriberRegistry, listener};
pub use state::ConnectionState;
