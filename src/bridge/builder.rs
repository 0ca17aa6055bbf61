//! Builder pattern for bridge configuration.
//!
//! The transport is chosen once, here, from the page URL:
//!
//! - page URL carries the `ws_param` query parameter → socket mode
//! - otherwise → host-callback mode, which requires a [`HostEnvironment`]
//!
//! # Example
//!
//! ```no_run
//! use overlay_bridge::{Bridge, Options};
//!
//! # async fn example() -> overlay_bridge::Result<()> {
//! let bridge = Bridge::builder()
//!     .page_url("http://localhost/overlay.html?OVERLAY_WS=ws://127.0.0.1:10501/ws")
//!     .options(Options::new().with_enrich_payloads())
//!     .build()?;
//! # Ok(())
//! # }
//! ```

// ============================================================================
// Imports
// ============================================================================

use std::fmt;
use std::sync::Arc;

use tokio::runtime::Handle;
use tokio::sync::mpsc;

use crate::error::{Error, Result};
use crate::logger::debug_unless_quiet;
use crate::options::Options;
use crate::transport::{Endpoint, HostEnvironment, host, socket};

use super::core::Bridge;
use super::shared::{Link, Shared};

// ============================================================================
// BridgeBuilder
// ============================================================================

/// Builder for configuring a [`Bridge`].
///
/// Use [`Bridge::builder()`] to create a new builder.
#[derive(Default, Clone)]
pub struct BridgeBuilder {
    /// URL of the page hosting the overlay.
    page_url: Option<String>,
    /// Bridge options.
    options: Options,
    /// Host API, required in host-callback mode.
    host: Option<Arc<dyn HostEnvironment>>,
}

impl fmt::Debug for BridgeBuilder {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("BridgeBuilder")
            .field("page_url", &self.page_url)
            .field("options", &self.options)
            .field("host", &self.host.is_some())
            .finish()
    }
}

// ============================================================================
// BridgeBuilder Implementation
// ============================================================================

impl BridgeBuilder {
    /// Creates a builder with default options and no page URL.
    #[inline]
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the page URL used for transport detection.
    ///
    /// Without a page URL the bridge uses host-callback mode.
    #[inline]
    #[must_use]
    pub fn page_url(mut self, url: impl Into<String>) -> Self {
        self.page_url = Some(url.into());
        self
    }

    /// Sets the bridge options.
    #[inline]
    #[must_use]
    pub fn options(mut self, options: Options) -> Self {
        self.options = options;
        self
    }

    /// Sets the host API used in host-callback mode.
    #[inline]
    #[must_use]
    pub fn host(mut self, host: Arc<dyn HostEnvironment>) -> Self {
        self.host = Some(host);
        self
    }

    /// Builds the bridge and starts its transport task.
    ///
    /// Must be called inside a tokio runtime.
    ///
    /// # Errors
    ///
    /// - [`Error::Config`] if the options are invalid, no runtime is
    ///   running, the endpoint scheme is not `ws`/`wss`, or host-callback
    ///   mode is selected without a host
    /// - [`Error::InvalidUrl`] if the page URL cannot be parsed
    pub fn build(self) -> Result<Bridge> {
        self.options.validate()?;

        let runtime = Handle::try_current().map_err(|_| {
            Error::config(
                "Bridge must be built inside a tokio runtime.\n\
                 Call build() from an async context or after entering a runtime.",
            )
        })?;

        let quiet = self.options.quiet;
        let endpoint = self.resolve_endpoint()?;
        debug_unless_quiet!(quiet, mode = %endpoint.mode(), "Transport selected");

        match endpoint {
            Endpoint::Socket(url) => {
                if self.host.is_some() {
                    debug_unless_quiet!(quiet, "Host API ignored in socket mode");
                }
                let (outbound, outbound_rx) = mpsc::unbounded_channel();
                let shared = Arc::new(Shared::new(self.options, Link::Socket { outbound }));
                let task = runtime.spawn(socket::run(Arc::clone(&shared), url, outbound_rx));
                Ok(Bridge::new(shared, task, runtime))
            }

            Endpoint::Host => {
                let host = self.host.ok_or_else(|| {
                    Error::config(
                        "Host-callback mode requires a host API. Use .host() to set it,\n\
                         or pass a page URL carrying a WebSocket endpoint.",
                    )
                })?;
                let shared = Arc::new(Shared::new(
                    self.options,
                    Link::Host {
                        host: Arc::clone(&host),
                    },
                ));
                let task = runtime.spawn(host::run(Arc::clone(&shared), host));
                Ok(Bridge::new(shared, task, runtime))
            }
        }
    }
}

// ============================================================================
// Validation
// ============================================================================

impl BridgeBuilder {
    fn resolve_endpoint(&self) -> Result<Endpoint> {
        match &self.page_url {
            Some(url) => Endpoint::from_page_url(url, &self.options.ws_param),
            None => Ok(Endpoint::Host),
        }
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    use std::time::Duration;

    use async_trait::async_trait;
    use serde_json::Value;

    use crate::transport::{EventPort, Responder, TransportMode};

    struct NeverReady;

    #[async_trait]
    impl HostEnvironment for NeverReady {
        fn is_ready(&self) -> bool {
            false
        }

        fn install_event_port(&self, _port: EventPort) {}

        fn call_handler(&self, _message: String, _responder: Responder) {}

        async fn end_encounter(&self) -> Result<Value> {
            Ok(Value::Null)
        }
    }

    #[test]
    fn test_new_creates_empty_builder() {
        let builder = BridgeBuilder::new();
        assert!(builder.page_url.is_none());
        assert!(builder.host.is_none());
        assert!(!builder.options.enrich_payloads);
    }

    #[test]
    fn test_build_outside_runtime_fails() {
        let result = BridgeBuilder::new().host(Arc::new(NeverReady)).build();
        assert!(matches!(result, Err(Error::Config { .. })));
    }

    #[tokio::test]
    async fn test_host_mode_without_host_fails() {
        let result = BridgeBuilder::new()
            .page_url("http://localhost/overlay.html")
            .build();
        assert!(matches!(result, Err(Error::Config { .. })));
    }

    #[tokio::test]
    async fn test_host_mode_selected_without_param() {
        let bridge = BridgeBuilder::new()
            .page_url("http://localhost/overlay.html?other=1")
            .host(Arc::new(NeverReady))
            .build()
            .expect("build");
        assert_eq!(bridge.mode(), TransportMode::Host);
    }

    #[tokio::test]
    async fn test_socket_mode_selected_with_param() {
        let bridge = BridgeBuilder::new()
            .page_url("http://localhost/overlay.html?OVERLAY_WS=ws://127.0.0.1:1/ws")
            .build()
            .expect("build");
        assert_eq!(bridge.mode(), TransportMode::Socket);
    }

    #[tokio::test]
    async fn test_custom_param_name() {
        let bridge = BridgeBuilder::new()
            .page_url("http://localhost/overlay.html?HOST_PORT=ws://127.0.0.1:1/ws")
            .options(Options::new().with_ws_param("HOST_PORT"))
            .build()
            .expect("build");
        assert_eq!(bridge.mode(), TransportMode::Socket);
    }

    #[tokio::test]
    async fn test_non_websocket_endpoint_fails() {
        let result = BridgeBuilder::new()
            .page_url("http://localhost/overlay.html?OVERLAY_WS=http://127.0.0.1:1/")
            .build();
        assert!(matches!(result, Err(Error::Config { .. })));
    }

    #[tokio::test]
    async fn test_invalid_options_fail() {
        let result = BridgeBuilder::new()
            .host(Arc::new(NeverReady))
            .options(Options::new().with_poll_interval(Duration::ZERO))
            .build();
        assert!(matches!(result, Err(Error::Config { .. })));
    }
}
