//! Bridge handle.
//!
//! One uniform API over both transports: registry management, correlated
//! requests, event start, simulation and session end.
//!
//! # Example
//!
//! ```no_run
//! use overlay_bridge::{Bridge, BroadcastEvent, listener};
//! use serde_json::json;
//!
//! # async fn example() -> overlay_bridge::Result<()> {
//! let bridge = Bridge::builder()
//!     .page_url("http://localhost/overlay.html?OVERLAY_WS=ws://127.0.0.1:10501/ws")
//!     .build()?;
//!
//! bridge.subscribe("CombatData", listener(|event: &BroadcastEvent| {
//!     println!("{}", event.event_type);
//! }));
//! bridge.start_events();
//!
//! let language = bridge.send_request(&json!({ "call": "getLanguage" })).await?;
//! println!("{language}");
//! # Ok(())
//! # }
//! ```

// ============================================================================
// Imports
// ============================================================================

use std::fmt;
use std::sync::Arc;

use futures_util::FutureExt;
use futures_util::future::{self, BoxFuture};
use serde::Serialize;
use serde_json::Value;
use tokio::runtime::Handle;
use tokio::task::JoinHandle;
use tokio::time::timeout;
use tracing::{error, warn};

use crate::error::{Error, Result};
use crate::logger::{debug_unless_quiet, info_unless_quiet};
use crate::options::Options;
use crate::protocol::is_recognized_broadcast;
use crate::transport::{EventPort, TransportMode};

use super::builder::BridgeBuilder;
use super::registry::Listener;
use super::shared::{Link, Shared};
use super::simulation::Simulation;
use super::state::ConnectionState;

// ============================================================================
// Types
// ============================================================================

/// Future returned by [`Bridge::send_request`].
pub type ResponseFuture = BoxFuture<'static, Result<Value>>;

// ============================================================================
// Bridge
// ============================================================================

/// Handle to a running bridge.
///
/// Cheap to clone. Background tasks stop when the last handle is dropped.
#[derive(Clone)]
pub struct Bridge {
    inner: Arc<BridgeInner>,
}

struct BridgeInner {
    shared: Arc<Shared>,
    transport: JoinHandle<()>,
    simulation: Simulation,
    runtime: Handle,
}

impl Drop for BridgeInner {
    fn drop(&mut self) {
        self.transport.abort();
        self.simulation.stop();
    }
}

impl fmt::Debug for Bridge {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Bridge")
            .field("mode", &self.mode())
            .field("state", &self.connection_state())
            .field("queued", &self.queued_len())
            .finish_non_exhaustive()
    }
}

// ============================================================================
// Bridge - Constructor
// ============================================================================

impl Bridge {
    /// Creates a configuration builder.
    #[inline]
    #[must_use]
    pub fn builder() -> BridgeBuilder {
        BridgeBuilder::new()
    }

    pub(crate) fn new(shared: Arc<Shared>, transport: JoinHandle<()>, runtime: Handle) -> Self {
        info_unless_quiet!(shared.options.quiet, mode = %shared.mode(), "Bridge created");

        Self {
            inner: Arc::new(BridgeInner {
                shared,
                transport,
                simulation: Simulation::default(),
                runtime,
            }),
        }
    }
}

// ============================================================================
// Bridge - Accessors
// ============================================================================

impl Bridge {
    /// Returns the transport chosen at construction.
    #[inline]
    #[must_use]
    pub fn mode(&self) -> TransportMode {
        self.inner.shared.mode()
    }

    /// Returns the options the bridge was built with.
    #[inline]
    #[must_use]
    pub fn options(&self) -> &Options {
        &self.inner.shared.options
    }

    /// Returns the current connection state.
    #[inline]
    #[must_use]
    pub fn connection_state(&self) -> ConnectionState {
        self.inner.shared.connection_state()
    }

    /// Returns the number of messages waiting for the channel.
    #[inline]
    #[must_use]
    pub fn queued_len(&self) -> usize {
        self.inner.shared.queued_len()
    }

    /// Returns the number of socket requests awaiting a response.
    #[inline]
    #[must_use]
    pub fn pending_len(&self) -> usize {
        self.inner.shared.pending_len()
    }

    /// Returns the inbound port the host delivers broadcasts to.
    ///
    /// Works in either mode; delivered messages go through the same
    /// routing as transport traffic.
    #[must_use]
    pub fn event_port(&self) -> EventPort {
        EventPort::new(&self.inner.shared)
    }
}

// ============================================================================
// Bridge - Subscribers
// ============================================================================

impl Bridge {
    /// Registers `listener` for `event`.
    ///
    /// Does not notify the transport; call [`Bridge::start_events`] to
    /// announce the subscription set.
    pub fn subscribe(&self, event: impl Into<String>, listener: Listener) {
        self.inner.shared.subscribe(event.into(), listener);
    }

    /// Removes the first registration of `listener` for `event`.
    ///
    /// Returns `true` if one was removed.
    pub fn unsubscribe(&self, event: &str, listener: &Listener) -> bool {
        self.inner.shared.unsubscribe(event, listener)
    }

    /// Removes every listener for `event`.
    pub fn unsubscribe_all(&self, event: &str) {
        self.inner.shared.unsubscribe_all(event);
    }

    /// Returns the listeners for `event` in registration order.
    #[must_use]
    pub fn list_subscribers(&self, event: &str) -> Vec<Listener> {
        self.inner.shared.listeners(event)
    }

    /// Announces every subscribed event name to the host.
    pub fn start_events(&self) {
        self.inner.shared.start_events();
    }
}

// ============================================================================
// Bridge - Requests
// ============================================================================

impl Bridge {
    /// Sends a correlated request.
    ///
    /// The message is queued if the transport is not ready yet. The
    /// returned future resolves with the host's response object.
    ///
    /// # Errors
    ///
    /// - [`Error::Json`] if `body` cannot be serialized
    /// - [`Error::Protocol`] if `body` is not a JSON object in socket mode
    /// - [`Error::RequestTimeout`] if `Options::request_timeout` elapses
    /// - [`Error::ConnectionClosed`] if the bridge shuts down first
    /// - [`Error::ChannelClosed`] if the host drops the responder
    pub fn send_request<T>(&self, body: &T) -> ResponseFuture
    where
        T: Serialize + ?Sized,
    {
        let body = match serde_json::to_value(body) {
            Ok(body) => body,
            Err(e) => {
                error!(error = %e, "Failed to serialize request, send abandoned");
                return future::ready(Err(Error::Json(e))).boxed();
            }
        };

        let (seq, rx) = match self.inner.shared.request(body) {
            Ok(registered) => registered,
            Err(e) => return future::ready(Err(e)).boxed(),
        };

        let Some(limit) = self.inner.shared.options.request_timeout else {
            return async move { rx.await? }.boxed();
        };

        let shared = Arc::downgrade(&self.inner.shared);
        async move {
            match timeout(limit, rx).await {
                Ok(outcome) => outcome?,
                Err(_) => {
                    if let (Some(seq), Some(shared)) = (seq, shared.upgrade()) {
                        shared.remove_pending(seq);
                    }
                    let timeout_ms = u64::try_from(limit.as_millis()).unwrap_or(u64::MAX);
                    Err(Error::request_timeout(seq, timeout_ms))
                }
            }
        }
        .boxed()
    }

    /// Ends the current encounter through the host.
    ///
    /// # Errors
    ///
    /// - [`Error::NotReady`] if the host API is not ready yet
    /// - [`Error::Unsupported`] in socket mode
    /// - Any error reported by the host
    pub async fn end_session(&self) -> Result<Value> {
        let host = match &self.inner.shared.link {
            Link::Host { host } => Arc::clone(host),
            Link::Socket { .. } => {
                return Err(Error::unsupported("end_session", TransportMode::Socket));
            }
        };

        if !self.connection_state().is_ready() {
            warn!("end_session called before the host API is ready");
            return Err(Error::not_ready("end_session"));
        }

        host.end_encounter().await
    }
}

// ============================================================================
// Bridge - Simulation
// ============================================================================

impl Bridge {
    /// Starts or stops replaying a sample broadcast.
    ///
    /// A sample restarts the timer and is dispatched every
    /// `simulation_interval`, first one interval from now. `None` or a
    /// falsy JSON value (`null`, `false`, `0`, `""`) stops it.
    ///
    /// # Errors
    ///
    /// [`Error::InvalidSample`] if the sample has no recognized `type`; the
    /// running timer, if any, is left alone.
    pub fn set_simulation(&self, sample: Option<Value>) -> Result<()> {
        let Some(sample) = sample.filter(|sample| !is_falsy(sample)) else {
            self.inner.simulation.stop();
            debug_unless_quiet!(self.options().quiet, "Simulation stopped");
            return Ok(());
        };

        if !is_recognized_broadcast(&sample) {
            return Err(Error::invalid_sample(
                "sample must be an object whose type is a known event kind",
            ));
        }

        self.inner.simulation.start(
            &self.inner.runtime,
            Arc::clone(&self.inner.shared),
            sample,
        );
        info_unless_quiet!(
            self.options().quiet,
            interval = ?self.options().simulation_interval,
            "Simulation started"
        );
        Ok(())
    }

    /// Returns `true` while a simulation timer is active.
    #[must_use]
    pub fn is_simulating(&self) -> bool {
        self.inner.simulation.is_running()
    }
}

// ============================================================================
// Bridge - Lifecycle
// ============================================================================

impl Bridge {
    /// Stops the transport and simulation tasks.
    ///
    /// Pending socket requests resolve with [`Error::ConnectionClosed`].
    /// Later messages stay queued.
    pub fn shutdown(&self) {
        self.inner.transport.abort();
        self.inner.simulation.stop();
        self.inner.shared.close();
        info_unless_quiet!(self.options().quiet, "Bridge shut down");
    }
}

fn is_falsy(value: &Value) -> bool {
    match value {
        Value::Null => true,
        Value::Bool(flag) => !flag,
        Value::Number(number) => number.as_f64() == Some(0.0),
        Value::String(text) => text.is_empty(),
        Value::Array(_) | Value::Object(_) => false,
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    use std::collections::BTreeMap;
    use std::io;
    use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
    use std::time::Duration;

    use async_trait::async_trait;
    use futures_util::{SinkExt, StreamExt};
    use parking_lot::Mutex;
    use serde_json::json;
    use tokio::net::TcpListener;
    use tokio_test::{assert_pending, assert_ready_ok, task};
    use tokio_tungstenite::accept_async;
    use tokio_tungstenite::tungstenite::Message;

    use crate::bridge::listener;
    use crate::fake::sample_combat_data;
    use crate::protocol::BroadcastEvent;
    use crate::transport::{HostEnvironment, Responder};

    // ------------------------------------------------------------------------
    // Mock host
    // ------------------------------------------------------------------------

    #[derive(Default)]
    struct MockHost {
        ready: AtomicBool,
        port: Mutex<Option<EventPort>>,
        calls: Mutex<Vec<String>>,
        responders: Mutex<Vec<Responder>>,
    }

    impl MockHost {
        fn ready() -> Arc<Self> {
            let host = Self::default();
            host.ready.store(true, Ordering::SeqCst);
            Arc::new(host)
        }

        fn calls(&self) -> Vec<String> {
            self.calls.lock().clone()
        }

        fn take_responders(&self) -> Vec<Responder> {
            std::mem::take(&mut *self.responders.lock())
        }

        fn port(&self) -> EventPort {
            self.port.lock().clone().expect("event port installed")
        }
    }

    #[async_trait]
    impl HostEnvironment for MockHost {
        fn is_ready(&self) -> bool {
            self.ready.load(Ordering::SeqCst)
        }

        fn install_event_port(&self, port: EventPort) {
            *self.port.lock() = Some(port);
        }

        fn call_handler(&self, message: String, responder: Responder) {
            self.calls.lock().push(message);
            self.responders.lock().push(responder);
        }

        async fn end_encounter(&self) -> Result<Value> {
            Ok(json!({ "ended": true }))
        }
    }

    fn host_bridge(host: &Arc<MockHost>, options: Options) -> Bridge {
        Bridge::builder()
            .host(Arc::clone(host) as Arc<dyn HostEnvironment>)
            .options(options)
            .build()
            .expect("build")
    }

    fn counter(bridge: &Bridge, event: &str) -> Arc<AtomicUsize> {
        let count = Arc::new(AtomicUsize::new(0));
        let seen = Arc::clone(&count);
        bridge.subscribe(
            event,
            listener(move |_| {
                seen.fetch_add(1, Ordering::SeqCst);
            }),
        );
        count
    }

    /// Lets the readiness loop observe the host at least once more.
    async fn settle(bridge: &Bridge) {
        tokio::time::sleep(bridge.options().poll_interval * 2).await;
    }

    async fn wait_for(condition: impl Fn() -> bool) {
        tokio::time::timeout(Duration::from_secs(5), async {
            while !condition() {
                tokio::time::sleep(Duration::from_millis(5)).await;
            }
        })
        .await
        .expect("condition met in time");
    }

    /// Map keys JSON cannot represent.
    fn unserializable() -> BTreeMap<(u8, u8), u8> {
        BTreeMap::from([((1, 2), 3)])
    }

    const UNREACHABLE_PAGE: &str = "http://localhost/overlay.html?OVERLAY_WS=ws://127.0.0.1:1/ws";

    // ------------------------------------------------------------------------
    // Host-callback mode
    // ------------------------------------------------------------------------

    #[tokio::test(start_paused = true)]
    async fn test_request_queued_until_host_ready() {
        let host = Arc::new(MockHost::default());
        let bridge = host_bridge(&host, Options::new());

        let combat = counter(&bridge, "CombatData");
        let mut reply = task::spawn(bridge.send_request(&json!({ "call": "test" })));

        assert_pending!(reply.poll());
        assert_eq!(bridge.queued_len(), 1);

        settle(&bridge).await;
        assert_eq!(bridge.connection_state(), ConnectionState::Connecting);
        assert!(host.calls().is_empty());

        host.ready.store(true, Ordering::SeqCst);
        settle(&bridge).await;

        assert_eq!(bridge.connection_state(), ConnectionState::Ready);
        assert_eq!(bridge.queued_len(), 0);
        assert_eq!(host.calls(), vec![r#"{"call":"test"}"#.to_string()]);
        assert_eq!(combat.load(Ordering::SeqCst), 0);

        settle(&bridge).await;
        assert_eq!(host.calls().len(), 1);
        assert_pending!(reply.poll());

        for responder in host.take_responders() {
            responder.respond(r#"{ "language": "English" }"#);
        }
        assert_eq!(assert_ready_ok!(reply.poll()), json!({ "language": "English" }));
        assert_eq!(combat.load(Ordering::SeqCst), 0);

        host.port().deliver(&sample_combat_data().to_string());
        assert_eq!(combat.load(Ordering::SeqCst), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_queue_flushes_in_arrival_order() {
        let host = Arc::new(MockHost::default());
        let bridge = host_bridge(&host, Options::new());

        bridge.subscribe("LogLine", listener(|_| {}));
        bridge.start_events();
        let _first = bridge.send_request(&json!({ "call": "first" }));
        let _second = bridge.send_request(&json!({ "call": "second" }));
        assert_eq!(bridge.queued_len(), 3);

        host.ready.store(true, Ordering::SeqCst);
        settle(&bridge).await;

        assert_eq!(
            host.calls(),
            vec![
                r#"{"call":"subscribe","events":["LogLine"]}"#.to_string(),
                r#"{"call":"first"}"#.to_string(),
                r#"{"call":"second"}"#.to_string(),
            ]
        );

        let _third = bridge.send_request(&json!({ "call": "third" }));
        assert_eq!(bridge.queued_len(), 0);
        assert_eq!(host.calls().last().map(String::as_str), Some(r#"{"call":"third"}"#));
    }

    #[tokio::test(start_paused = true)]
    async fn test_dropped_responder_closes_request() {
        let host = MockHost::ready();
        let bridge = host_bridge(&host, Options::new());
        settle(&bridge).await;

        let reply = bridge.send_request(&json!({ "call": "ignored" }));
        drop(host.take_responders());

        assert!(matches!(reply.await, Err(Error::ChannelClosed(_))));
    }

    #[tokio::test(start_paused = true)]
    async fn test_host_request_timeout() {
        let host = Arc::new(MockHost::default());
        let options = Options::new().with_request_timeout(Duration::from_millis(250));
        let bridge = host_bridge(&host, options);

        let outcome = bridge.send_request(&json!({ "call": "slow" })).await;
        match outcome {
            Err(Error::RequestTimeout { seq, timeout_ms }) => {
                assert_eq!(seq, None);
                assert_eq!(timeout_ms, 250);
            }
            other => panic!("expected timeout, got {other:?}"),
        }
    }

    #[tokio::test(start_paused = true)]
    async fn test_end_session() {
        let host = Arc::new(MockHost::default());
        let bridge = host_bridge(&host, Options::new());

        let outcome = bridge.end_session().await;
        assert!(matches!(outcome, Err(Error::NotReady { .. })));

        host.ready.store(true, Ordering::SeqCst);
        settle(&bridge).await;

        let value = bridge.end_session().await.expect("ended");
        assert_eq!(value, json!({ "ended": true }));
    }

    // ------------------------------------------------------------------------
    // Socket mode
    // ------------------------------------------------------------------------

    #[tokio::test]
    async fn test_end_session_unsupported_over_socket() {
        let bridge = Bridge::builder()
            .page_url(UNREACHABLE_PAGE)
            .build()
            .expect("build");

        let outcome = bridge.end_session().await;
        assert!(matches!(outcome, Err(Error::Unsupported { .. })));
    }

    #[tokio::test]
    async fn test_socket_request_timeout_clears_pending() {
        // Accepts TCP but never completes the WebSocket handshake.
        let server = tokio::net::TcpListener::bind("127.0.0.1:0")
            .await
            .expect("bind");
        let port = server.local_addr().expect("addr").port();

        let bridge = Bridge::builder()
            .page_url(format!(
                "http://localhost/overlay.html?OVERLAY_WS=ws://127.0.0.1:{port}/ws"
            ))
            .options(Options::new().with_request_timeout(Duration::from_millis(50)))
            .build()
            .expect("build");

        let reply = bridge.send_request(&json!({ "call": "getLanguage" }));
        assert_eq!(bridge.pending_len(), 1);

        let outcome = reply.await;
        assert!(outcome.as_ref().is_err_and(Error::is_timeout));
        assert_eq!(bridge.pending_len(), 0);
        assert_eq!(bridge.queued_len(), 1);
    }

    #[tokio::test]
    async fn test_socket_request_rejects_non_object() {
        let bridge = Bridge::builder()
            .page_url(UNREACHABLE_PAGE)
            .build()
            .expect("build");

        let outcome = bridge.send_request(&json!([1, 2, 3])).await;
        assert!(matches!(outcome, Err(Error::Protocol { .. })));
        assert_eq!(bridge.queued_len(), 0);
    }

    // ------------------------------------------------------------------------
    // Unserializable requests
    // ------------------------------------------------------------------------

    #[tokio::test(start_paused = true)]
    async fn test_unserializable_host_request_rejected() {
        let host = Arc::new(MockHost::default());
        let bridge = host_bridge(&host, Options::new());

        let outcome = bridge.send_request(&unserializable()).await;
        assert!(matches!(outcome, Err(Error::Json(_))));
        assert_eq!(bridge.queued_len(), 0);

        host.ready.store(true, Ordering::SeqCst);
        settle(&bridge).await;
        assert_eq!(bridge.connection_state(), ConnectionState::Ready);

        let outcome = bridge.send_request(&unserializable()).await;
        assert!(matches!(outcome, Err(Error::Json(_))));
        assert!(host.calls().is_empty());
        assert_eq!(bridge.pending_len(), 0);
    }

    #[tokio::test]
    async fn test_unserializable_socket_request_rejected() {
        let bridge = Bridge::builder()
            .page_url(UNREACHABLE_PAGE)
            .build()
            .expect("build");

        let outcome = bridge.send_request(&unserializable()).await;
        assert!(matches!(outcome, Err(Error::Json(_))));
        assert_eq!(bridge.queued_len(), 0);
        assert_eq!(bridge.pending_len(), 0);
    }

    // ------------------------------------------------------------------------
    // Dispatch
    // ------------------------------------------------------------------------

    #[tokio::test]
    async fn test_dispatch_order_and_panic_isolation() {
        let host = Arc::new(MockHost::default());
        let bridge = host_bridge(&host, Options::new());

        let order: Arc<Mutex<Vec<u8>>> = Arc::new(Mutex::new(Vec::new()));
        let first = Arc::clone(&order);
        bridge.subscribe("LogLine", listener(move |_| first.lock().push(1)));
        bridge.subscribe("LogLine", listener(|_| panic!("subscriber failure")));
        let third = Arc::clone(&order);
        bridge.subscribe("LogLine", listener(move |_| third.lock().push(3)));
        let other = counter(&bridge, "ChangeZone");

        let port = bridge.event_port();
        port.deliver_value(json!({ "type": "LogLine", "line": ["00", "hello"] }));
        port.deliver_value(json!({ "type": "LogLine", "line": ["00", "again"] }));

        assert_eq!(*order.lock(), vec![1, 3, 1, 3]);
        assert_eq!(other.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_malformed_text_discarded() {
        let host = Arc::new(MockHost::default());
        let bridge = host_bridge(&host, Options::new());
        let zone = counter(&bridge, "ChangeZone");

        let port = bridge.event_port();
        port.deliver("{broken");
        port.deliver("[1, 2");
        port.deliver(r#"{ "hello": 1 }"#);
        assert_eq!(zone.load(Ordering::SeqCst), 0);

        port.deliver(r#"{ "type": "ChangeZone", "zoneID": 132 }"#);
        assert_eq!(zone.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_unsubscribed_listener_not_invoked() {
        let host = Arc::new(MockHost::default());
        let bridge = host_bridge(&host, Options::new());

        let count = Arc::new(AtomicUsize::new(0));
        let seen = Arc::clone(&count);
        let handle = listener(move |_| {
            seen.fetch_add(1, Ordering::SeqCst);
        });
        bridge.subscribe("InCombat", Arc::clone(&handle));
        assert_eq!(bridge.list_subscribers("InCombat").len(), 1);

        assert!(bridge.unsubscribe("InCombat", &handle));
        assert!(bridge.list_subscribers("InCombat").is_empty());

        bridge.event_port().deliver_value(json!({ "type": "InCombat" }));
        assert_eq!(count.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_enrichment_toggle() {
        for enrich in [false, true] {
            let host = Arc::new(MockHost::default());
            let options = if enrich {
                Options::new().with_enrich_payloads()
            } else {
                Options::new()
            };
            let bridge = host_bridge(&host, options);

            let shaped: Arc<Mutex<Option<bool>>> = Arc::new(Mutex::new(None));
            let slot = Arc::clone(&shaped);
            bridge.subscribe(
                "CombatData",
                listener(move |event: &BroadcastEvent| {
                    *slot.lock() = Some(event.payload.as_combat_data().is_some());
                }),
            );

            bridge.event_port().deliver_value(sample_combat_data());
            assert_eq!(*shaped.lock(), Some(enrich));
        }
    }

    #[tokio::test]
    async fn test_event_port_detaches_on_drop() {
        let host = Arc::new(MockHost::default());
        let bridge = host_bridge(&host, Options::new());
        let port = bridge.event_port();
        assert!(port.is_attached());

        drop(bridge);
        tokio::time::timeout(Duration::from_secs(5), async {
            while port.is_attached() {
                tokio::task::yield_now().await;
            }
        })
        .await
        .expect("bridge released");

        port.deliver_value(json!({ "type": "LogLine" }));
    }

    // ------------------------------------------------------------------------
    // Simulation
    // ------------------------------------------------------------------------

    #[tokio::test(start_paused = true)]
    async fn test_simulation_ticks_and_stops() {
        let host = Arc::new(MockHost::default());
        let bridge = host_bridge(&host, Options::new());
        let combat = counter(&bridge, "CombatData");

        bridge
            .set_simulation(Some(sample_combat_data()))
            .expect("valid sample");
        assert!(bridge.is_simulating());

        tokio::time::sleep(Duration::from_millis(999)).await;
        assert_eq!(combat.load(Ordering::SeqCst), 0);

        tokio::time::sleep(Duration::from_millis(2)).await;
        assert_eq!(combat.load(Ordering::SeqCst), 1);

        tokio::time::sleep(Duration::from_secs(1)).await;
        assert_eq!(combat.load(Ordering::SeqCst), 2);

        bridge.set_simulation(None).expect("stop");
        assert!(!bridge.is_simulating());

        tokio::time::sleep(Duration::from_secs(5)).await;
        assert_eq!(combat.load(Ordering::SeqCst), 2);
    }

    #[tokio::test(start_paused = true)]
    async fn test_simulation_restart_replaces_timer() {
        let host = Arc::new(MockHost::default());
        let bridge = host_bridge(&host, Options::new());
        let combat = counter(&bridge, "CombatData");

        bridge.set_simulation(Some(sample_combat_data())).expect("first");
        tokio::time::sleep(Duration::from_millis(500)).await;
        bridge.set_simulation(Some(sample_combat_data())).expect("second");

        tokio::time::sleep(Duration::from_millis(999)).await;
        assert_eq!(combat.load(Ordering::SeqCst), 0);

        tokio::time::sleep(Duration::from_millis(2)).await;
        assert_eq!(combat.load(Ordering::SeqCst), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_invalid_sample_leaves_timer_running() {
        let host = Arc::new(MockHost::default());
        let bridge = host_bridge(&host, Options::new());

        bridge.set_simulation(Some(sample_combat_data())).expect("valid");

        let outcome = bridge.set_simulation(Some(json!({ "type": "Bogus" })));
        assert!(matches!(outcome, Err(Error::InvalidSample { .. })));
        let outcome = bridge.set_simulation(Some(json!("CombatData")));
        assert!(matches!(outcome, Err(Error::InvalidSample { .. })));
        assert!(bridge.is_simulating());

        bridge.set_simulation(Some(json!(false))).expect("falsy stops");
        assert!(!bridge.is_simulating());
    }

    // ------------------------------------------------------------------------
    // Quiet logging
    // ------------------------------------------------------------------------

    #[derive(Clone, Default)]
    struct LogBuffer(Arc<Mutex<Vec<u8>>>);

    impl io::Write for LogBuffer {
        fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
            self.0.lock().extend_from_slice(buf);
            Ok(buf.len())
        }

        fn flush(&mut self) -> io::Result<()> {
            Ok(())
        }
    }

    impl LogBuffer {
        /// Levels of the lines emitted by this crate, in order.
        fn levels(&self) -> Vec<String> {
            String::from_utf8_lossy(&self.0.lock())
                .lines()
                .filter_map(|line| {
                    let mut fields = line.split_whitespace().skip(1);
                    let level = fields.next()?;
                    let target = fields.next()?;
                    target
                        .starts_with("overlay_bridge")
                        .then(|| level.to_string())
                })
                .collect()
        }
    }

    /// Drives both transports through their logged paths and returns the
    /// captured output.
    async fn capture_session_logs(quiet: bool) -> LogBuffer {
        let logs = LogBuffer::default();
        let writer = logs.clone();
        let subscriber = tracing_subscriber::fmt()
            .with_max_level(tracing::Level::TRACE)
            .with_ansi(false)
            .with_writer(move || writer.clone())
            .finish();
        let _guard = tracing::subscriber::set_default(subscriber);

        let mut options = Options::new()
            .with_poll_interval(Duration::from_millis(10))
            .with_reconnect_delay(Duration::from_millis(20));
        options.quiet = quiet;

        // Host mode: readiness polls, flush, detached port.
        let host = Arc::new(MockHost::default());
        let bridge = host_bridge(&host, options.clone());
        tokio::time::sleep(Duration::from_millis(30)).await;
        host.ready.store(true, Ordering::SeqCst);
        settle(&bridge).await;
        let port = host.port();
        drop(bridge);
        wait_for(|| !port.is_attached()).await;
        port.deliver_value(json!({ "type": "LogLine" }));

        // Socket mode over loopback.
        let server = TcpListener::bind("127.0.0.1:0").await.expect("bind");
        let addr = server.local_addr().expect("addr");
        let bridge = Bridge::builder()
            .page_url(format!("http://localhost/overlay.html?OVERLAY_WS=ws://{addr}/ws"))
            .host(Arc::clone(&host) as Arc<dyn HostEnvironment>)
            .options(options)
            .build()
            .expect("build");

        let lines = counter(&bridge, "LogLine");
        bridge.start_events();
        let reply = bridge.send_request(&json!({ "call": "getLanguage" }));

        let (stream, _) = server.accept().await.expect("accept");
        let mut socket = accept_async(stream).await.expect("upgrade");
        for _ in 0..2 {
            socket.next().await.expect("stream open").expect("frame");
        }

        for frame in [
            json!({ "rseq": 0, "language": "English" }),
            json!({ "hello": 1 }),
            json!({ "type": "ChangeZone", "zoneID": 1 }),
            json!({ "type": "LogLine", "line": [] }),
        ] {
            socket
                .send(Message::Text(frame.to_string().into()))
                .await
                .expect("send");
        }
        reply.await.expect("reply");
        wait_for(|| lines.load(Ordering::SeqCst) == 1).await;

        bridge.set_simulation(Some(sample_combat_data())).expect("start");
        bridge.set_simulation(None).expect("stop");

        socket.close(None).await.expect("close");
        drop(socket);
        wait_for(|| bridge.connection_state() != ConnectionState::Ready).await;

        let pending = bridge.send_request(&json!({ "call": "never" }));
        bridge.shutdown();
        assert!(matches!(pending.await, Err(Error::ConnectionClosed)));

        logs
    }

    #[tokio::test]
    async fn test_quiet_keeps_only_warnings_and_errors() {
        let levels = capture_session_logs(false).await.levels();
        for expected in ["INFO", "DEBUG", "TRACE", "WARN"] {
            assert!(levels.iter().any(|level| level == expected), "{expected} missing: {levels:?}");
        }

        let levels = capture_session_logs(true).await.levels();
        assert!(levels.iter().any(|level| level == "WARN"), "{levels:?}");
        assert!(
            levels.iter().all(|level| level == "WARN" || level == "ERROR"),
            "{levels:?}"
        );
    }

    #[test]
    fn test_is_falsy() {
        assert!(is_falsy(&Value::Null));
        assert!(is_falsy(&json!(false)));
        assert!(is_falsy(&json!(0)));
        assert!(is_falsy(&json!("")));
        assert!(!is_falsy(&json!({})));
        assert!(!is_falsy(&json!("CombatData")));
    }
}
