//! Error types for the overlay bridge.
//!
//! This module defines all error types used throughout the crate.
//!
//! # Usage
//!
//! All fallible operations return [`Result<T>`] which uses [`Error`]:
//!
//! ```ignore
//! use overlay_bridge::{Bridge, Result};
//!
//! async fn example(bridge: &Bridge) -> Result<()> {
//!     let reply = bridge.send_request(&serde_json::json!({ "call": "getLanguage" })).await?;
//!     println!("{reply}");
//!     Ok(())
//! }
//! ```
//!
//! # Error Categories
//!
//! | Category | Variants |
//! |----------|----------|
//! | Configuration | [`Error::Config`], [`Error::InvalidUrl`] |
//! | Connection | [`Error::ConnectionClosed`], [`Error::NotReady`], [`Error::Unsupported`] |
//! | Protocol | [`Error::Protocol`], [`Error::InvalidSample`], [`Error::Host`] |
//! | Execution | [`Error::RequestTimeout`] |
//! | External | [`Error::Json`], [`Error::ChannelClosed`] |
//!
//! Socket failures never surface here: the transport reconnects and only
//! logs them.

// ============================================================================
// Imports
// ============================================================================

use std::result::Result as StdResult;

use thiserror::Error;
use tokio::sync::oneshot::error::RecvError;

use crate::identifiers::SequenceNumber;
use crate::transport::TransportMode;

// ============================================================================
// Result Alias
// ============================================================================

/// Result type alias using crate [`enum@Error`].
pub type Result<T> = StdResult<T, Error>;

// ============================================================================
// Error Enum
// ============================================================================

/// Main error type for the crate.
#[derive(Error, Debug)]
pub enum Error {
    // ========================================================================
    // Configuration Errors
    // ========================================================================
    /// Configuration error.
    ///
    /// Returned when bridge options or builder input are invalid.
    #[error("Configuration error: {message}")]
    Config {
        /// Description of the configuration error.
        message: String,
    },

    /// The page URL could not be parsed.
    #[error("Invalid page URL: {0}")]
    InvalidUrl(#[from] url::ParseError),

    // ========================================================================
    // Connection Errors
    // ========================================================================
    /// The bridge was shut down before the operation completed.
    #[error("Connection closed")]
    ConnectionClosed,

    /// The transport has not reached the ready state.
    #[error("Not ready: {operation}")]
    NotReady {
        /// Operation that required a ready transport.
        operation: String,
    },

    /// Operation is not available in the active transport mode.
    #[error("{operation} is not supported in {mode} mode")]
    Unsupported {
        /// Operation that was attempted.
        operation: String,
        /// Active transport mode.
        mode: TransportMode,
    },

    // ========================================================================
    // Protocol Errors
    // ========================================================================
    /// Protocol violation or unexpected message.
    #[error("Protocol error: {message}")]
    Protocol {
        /// Description of the protocol violation.
        message: String,
    },

    /// Simulation sample is not a well-formed broadcast event.
    #[error("Invalid simulation sample: {message}")]
    InvalidSample {
        /// Why the sample was rejected.
        message: String,
    },

    /// The host environment reported a failure.
    #[error("Host error: {message}")]
    Host {
        /// Message reported by the host.
        message: String,
    },

    // ========================================================================
    // Execution Errors
    // ========================================================================
    /// Correlated request timed out.
    ///
    /// Only produced when `Options::request_timeout` is set.
    #[error("Request {} timed out after {timeout_ms}ms", display_seq(.seq))]
    RequestTimeout {
        /// Sequence number of the request (socket mode only).
        seq: Option<SequenceNumber>,
        /// Milliseconds waited before timeout.
        timeout_ms: u64,
    },

    // ========================================================================
    // External Errors
    // ========================================================================
    /// JSON serialization error.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// Channel receive error.
    #[error("Channel closed")]
    ChannelClosed(#[from] RecvError),
}

fn display_seq(seq: &Option<SequenceNumber>) -> String {
    match seq {
        Some(seq) => seq.to_string(),
        None => "<host>".to_string(),
    }
}

// ============================================================================
// Error Constructors
// ============================================================================

impl Error {
    /// Creates a configuration error.
    #[inline]
    pub fn config(message: impl Into<String>) -> Self {
        Self::Config {
            message: message.into(),
        }
    }

    /// Creates a not-ready error.
    #[inline]
    pub fn not_ready(operation: impl Into<String>) -> Self {
        Self::NotReady {
            operation: operation.into(),
        }
    }

    /// Creates an unsupported-operation error.
    #[inline]
    pub fn unsupported(operation: impl Into<String>, mode: TransportMode) -> Self {
        Self::Unsupported {
            operation: operation.into(),
            mode,
        }
    }

    /// Creates a protocol error.
    #[inline]
    pub fn protocol(message: impl Into<String>) -> Self {
        Self::Protocol {
            message: message.into(),
        }
    }

    /// Creates an invalid simulation sample error.
    #[inline]
    pub fn invalid_sample(message: impl Into<String>) -> Self {
        Self::InvalidSample {
            message: message.into(),
        }
    }

    /// Creates a host error.
    #[inline]
    pub fn host(message: impl Into<String>) -> Self {
        Self::Host {
            message: message.into(),
        }
    }

    /// Creates a request timeout error.
    #[inline]
    pub fn request_timeout(seq: Option<SequenceNumber>, timeout_ms: u64) -> Self {
        Self::RequestTimeout { seq, timeout_ms }
    }
}

// ============================================================================
// Error Predicates
// ============================================================================

impl Error {
    /// Returns `true` if this is a timeout error.
    #[inline]
    #[must_use]
    pub fn is_timeout(&self) -> bool {
        matches!(self, Self::RequestTimeout { .. })
    }

    /// Returns `true` if this is a connection error.
    #[inline]
    #[must_use]
    pub fn is_connection_error(&self) -> bool {
        matches!(
            self,
            Self::ConnectionClosed | Self::NotReady { .. } | Self::ChannelClosed(_)
        )
    }

    /// Returns `true` if this error is recoverable.
    ///
    /// Recoverable errors may succeed on retry.
    #[inline]
    #[must_use]
    pub fn is_recoverable(&self) -> bool {
        matches!(self, Self::NotReady { .. } | Self::RequestTimeout { .. })
    }
}

// ============================================================================
// Tests
// ============================================================================
