//! Transport selection and channels.
//!
//! The bridge talks to its host over exactly one of two channels, chosen
//! once from the page URL:
//!
//! ```text
//! page URL has ?OVERLAY_WS=ws://...      page URL has no such parameter
//!            │                                       │
//!            ▼                                       ▼
//! ┌─────────────────────┐               ┌────────────────────────┐
//! │  socket mode        │               │  host-callback mode    │
//! │  tokio-tungstenite  │               │  HostEnvironment trait │
//! │  reconnect loop     │               │  readiness poll loop   │
//! └─────────────────────┘               └────────────────────────┘
//! ```
//!
//! # Modules
//!
//! | Module | Description |
//! |--------|-------------|
//! | `host` | Host environment seam, responders and the inbound port |
//! | `socket` | WebSocket connection loop |

// ============================================================================
// Submodules
// ============================================================================

/// Host-callback channel.
pub mod host;

/// WebSocket channel.
pub mod socket;

// ============================================================================
// Imports
// ============================================================================

use std::fmt;

use url::Url;

use crate::error::{Error, Result};

// ============================================================================
// Re-exports
// ============================================================================

pub use host::{EventPort, HostEnvironment, Responder};

// ============================================================================
// TransportMode
// ============================================================================

/// Which channel the bridge uses.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TransportMode {
    /// In-process callbacks exposed by the host.
    Host,
    /// WebSocket connection to the host's network service.
    Socket,
}

impl fmt::Display for TransportMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Host => f.write_str("host-callback"),
            Self::Socket => f.write_str("socket"),
        }
    }
}

// ============================================================================
// Endpoint
// ============================================================================

/// Resolved transport target.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Endpoint {
    /// Use the host environment.
    Host,
    /// Connect to this WebSocket URL.
    Socket(Url),
}

impl Endpoint {
    /// Inspects `page_url` for the `param` query parameter.
    ///
    /// An absent or empty parameter selects host-callback mode.
    ///
    /// # Errors
    ///
    /// - [`Error::InvalidUrl`] if the parameter value is not a URL
    /// - [`Error::Config`] if its scheme is not `ws` or `wss`
    pub fn detect(page_url: &Url, param: &str) -> Result<Self> {
        let value = page_url
            .query_pairs()
            .find(|(key, _)| key == param)
            .map(|(_, value)| value.into_owned())
            .filter(|value| !value.is_empty());

        let Some(value) = value else {
            return Ok(Self::Host);
        };

        let endpoint = Url::parse(&value)?;
        match endpoint.scheme() {
            "ws" | "wss" => Ok(Self::Socket(endpoint)),
            other => Err(Error::config(format!(
                "{param} must be a ws:// or wss:// URL, got scheme {other}"
            ))),
        }
    }

    /// Parses `page_url` and detects the endpoint.
    ///
    /// # Errors
    ///
    /// See [`Endpoint::detect`].
    pub fn from_page_url(page_url: &str, param: &str) -> Result<Self> {
        Self::detect(&Url::parse(page_url)?, param)
    }

    /// Returns the mode this endpoint selects.
    #[inline]
    #[must_use]
    pub const fn mode(&self) -> TransportMode {
        match self {
            Self::Host => TransportMode::Host,
            Self::Socket(_) => TransportMode::Socket,
        }
    }
}

// ============================================================================
// Tests
// ============================================================================
