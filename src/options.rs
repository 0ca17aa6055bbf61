//! Bridge configuration.
//!
//! [`Options`] carries defaults for every toggle. A partial record, for
//! example JSON handed over by the overlay page, deserializes over those
//! defaults so caller-supplied values win on conflict.
//!
//! # Example
//!
//! ```ignore
//! use std::time::Duration;
//! use overlay_bridge::Options;
//!
//! let options = Options::new()
//!     .with_enrich_payloads()
//!     .with_reconnect_delay(Duration::from_millis(250));
//!
//! let merged = Options::from_json(r#"{ "quiet": true }"#)?;
//! assert!(merged.quiet);
//! assert!(!merged.enrich_payloads);
//! ```

// ============================================================================
// Imports
// ============================================================================

use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};

// ============================================================================
// Constants
// ============================================================================

/// Query parameter that carries the WebSocket endpoint.
pub const DEFAULT_WS_PARAM: &str = "OVERLAY_WS";

/// Delay between host readiness checks.
pub const DEFAULT_POLL_INTERVAL: Duration = Duration::from_millis(300);

/// Delay before reopening a dropped socket.
pub const DEFAULT_RECONNECT_DELAY: Duration = Duration::from_millis(500);

/// Period of the simulation timer.
pub const DEFAULT_SIMULATION_INTERVAL: Duration = Duration::from_secs(1);

// ============================================================================
// Options
// ============================================================================

/// Bridge options. Immutable once the bridge is built.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct Options {
    /// Reshape `CombatData` events before dispatch.
    pub enrich_payloads: bool,

    /// Suppress informational log output.
    pub quiet: bool,

    /// URL query parameter selecting socket mode.
    pub ws_param: String,

    /// Host readiness poll interval.
    #[serde(with = "millis")]
    pub poll_interval: Duration,

    /// Fixed delay between socket reconnect attempts.
    #[serde(with = "millis")]
    pub reconnect_delay: Duration,

    /// Simulation timer period.
    #[serde(with = "millis")]
    pub simulation_interval: Duration,

    /// Optional deadline for correlated requests. `None` waits forever.
    #[serde(with = "optional_millis")]
    pub request_timeout: Option<Duration>,
}

impl Default for Options {
    fn default() -> Self {
        Self::new()
    }
}

// ============================================================================
// Constructors
// ============================================================================

impl Options {
    /// Creates options with default settings.
    #[inline]
    #[must_use]
    pub fn new() -> Self {
        Self {
            enrich_payloads: false,
            quiet: false,
            ws_param: DEFAULT_WS_PARAM.to_string(),
            poll_interval: DEFAULT_POLL_INTERVAL,
            reconnect_delay: DEFAULT_RECONNECT_DELAY,
            simulation_interval: DEFAULT_SIMULATION_INTERVAL,
            request_timeout: None,
        }
    }

    /// Merges a partial JSON record over the defaults.
    ///
    /// # Errors
    ///
    /// - [`Error::Json`] if the text is not a valid options record
    /// - [`Error::Config`] if the merged options fail validation
    pub fn from_json(text: &str) -> Result<Self> {
        let options: Self = serde_json::from_str(text)?;
        options.validate()?;
        Ok(options)
    }
}

// ============================================================================
// Builder Methods
// ============================================================================

impl Options {
    /// Enables payload enrichment.
    #[inline]
    #[must_use]
    pub fn with_enrich_payloads(mut self) -> Self {
        self.enrich_payloads = true;
        self
    }

    /// Enables quiet mode.
    #[inline]
    #[must_use]
    pub fn with_quiet(mut self) -> Self {
        self.quiet = true;
        self
    }

    /// Sets the query parameter that selects socket mode.
    #[inline]
    #[must_use]
    pub fn with_ws_param(mut self, param: impl Into<String>) -> Self {
        self.ws_param = param.into();
        self
    }

    /// Sets the host readiness poll interval.
    #[inline]
    #[must_use]
    pub fn with_poll_interval(mut self, interval: Duration) -> Self {
        self.poll_interval = interval;
        self
    }

    /// Sets the socket reconnect delay.
    #[inline]
    #[must_use]
    pub fn with_reconnect_delay(mut self, delay: Duration) -> Self {
        self.reconnect_delay = delay;
        self
    }

    /// Sets the simulation timer period.
    #[inline]
    #[must_use]
    pub fn with_simulation_interval(mut self, interval: Duration) -> Self {
        self.simulation_interval = interval;
        self
    }

    /// Sets a deadline for correlated requests.
    #[inline]
    #[must_use]
    pub fn with_request_timeout(mut self, timeout: Duration) -> Self {
        self.request_timeout = Some(timeout);
        self
    }
}

// ============================================================================
// Validation
// ============================================================================

impl Options {
    /// Validates the options.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Config`] for an empty query parameter name or a zero
    /// interval.
    pub fn validate(&self) -> Result<()> {
        if self.ws_param.is_empty() {
            return Err(Error::config("wsParam must not be empty"));
        }

        let intervals = [
            ("pollInterval", self.poll_interval),
            ("reconnectDelay", self.reconnect_delay),
            ("simulationInterval", self.simulation_interval),
        ];
        for (name, value) in intervals {
            if value.is_zero() {
                return Err(Error::config(format!("{name} must be greater than zero")));
            }
        }

        if self.request_timeout.is_some_and(|t| t.is_zero()) {
            return Err(Error::config("requestTimeout must be greater than zero"));
        }

        Ok(())
    }
}

// ============================================================================
// Serde Helpers
// ============================================================================

mod millis {
    use std::time::Duration;

    use serde::{Deserialize, Deserializer, Serializer};

    /// Whole milliseconds, saturating at `u64::MAX`.
    pub fn to_millis(value: &Duration) -> u64 {
        u64::try_from(value.as_millis()).unwrap_or(u64::MAX)
    }

    pub fn serialize<S: Serializer>(value: &Duration, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_u64(to_millis(value))
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Duration, D::Error> {
        u64::deserialize(deserializer).map(Duration::from_millis)
    }
}

mod optional_millis {
    use std::time::Duration;

    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(
        value: &Option<Duration>,
        serializer: S,
    ) -> Result<S::Ok, S::Error> {
        match value {
            Some(d) => serializer.serialize_some(&super::millis::to_millis(d)),
            None => serializer.serialize_none(),
        }
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(
        deserializer: D,
    ) -> Result<Option<Duration>, D::Error> {
        Option::<u64>::deserialize(deserializer).map(|v| v.map(Duration::from_millis))
    }
}

// ============================================================================
// Tests
// ============================================================================
