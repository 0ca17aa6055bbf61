//! WebSocket channel.
//!
//! A single tokio task owns the socket for the bridge's lifetime and runs
//! an unbounded reconnect loop with a fixed delay.
//!
//! # Connection Loop
//!
//! 1. Mark `Connecting`, open the socket
//! 2. On reconnect, re-announce the subscription if events were started
//! 3. Flush the queue in arrival order, then mark `Ready`
//! 4. Pump: inbound frames → bridge, outbound channel → socket
//! 5. On close or error: mark `Disconnected`, return unsent messages to the
//!    queue, sleep `reconnect_delay`, go to 1
//!
//! Transport failures never reach callers; they only show up in the log.
//!
//! The task holds the bridge internals, which own the outbound sender, so
//! the loop only ends when the bridge aborts the task.

// ============================================================================
// Imports
// ============================================================================

use std::sync::Arc;

use futures_util::stream::{SplitSink, SplitStream};
use futures_util::{SinkExt, StreamExt};
use serde_json::Value;
use tokio::net::TcpStream;
use tokio::sync::mpsc;
use tokio::time::sleep;
use tokio_tungstenite::tungstenite::Message;
use tokio_tungstenite::{MaybeTlsStream, WebSocketStream, connect_async};
use tracing::{error, warn};
use url::Url;

use crate::bridge::shared::Shared;
use crate::logger::{debug_unless_quiet, info_unless_quiet, trace_unless_quiet};

// ============================================================================
// Types
// ============================================================================

type Socket = WebSocketStream<MaybeTlsStream<TcpStream>>;
type SocketWriter = SplitSink<Socket, Message>;
type SocketReader = SplitStream<Socket>;

// ============================================================================
// Connection Loop
// ============================================================================

/// Runs the reconnect loop until the task is aborted.
pub(crate) async fn run(
    shared: Arc<Shared>,
    endpoint: Url,
    mut outbound_rx: mpsc::UnboundedReceiver<Value>,
) {
    let quiet = shared.options.quiet;
    let mut connections: u64 = 0;

    loop {
        shared.begin_connecting();

        match connect_async(endpoint.as_str()).await {
            Ok((socket, _response)) => {
                info_unless_quiet!(quiet, url = %endpoint, connections, "WebSocket connected");

                if connections > 0 {
                    shared.requeue_subscription();
                }
                connections += 1;

                let (mut writer, mut reader) = socket.split();
                let unsent = match flush(&shared, &mut writer).await {
                    Ok(()) => pump(&shared, &mut writer, &mut reader, &mut outbound_rx).await,
                    Err(unsent) => unsent,
                };

                shared.mark_disconnected(unsent, &mut outbound_rx);
                warn!(url = %endpoint, "WebSocket connection lost, reconnecting");
            }

            Err(e) => {
                shared.mark_disconnected(Vec::new(), &mut outbound_rx);
                warn!(url = %endpoint, error = %e, "WebSocket connect failed");
            }
        }

        sleep(shared.options.reconnect_delay).await;
    }
}

/// Writes the queue in order until it is observed empty.
///
/// On a write failure returns the failed message followed by the rest of
/// its batch.
async fn flush(shared: &Shared, writer: &mut SocketWriter) -> Result<(), Vec<Value>> {
    loop {
        let batch = shared.drain_or_ready();
        if batch.is_empty() {
            return Ok(());
        }

        let quiet = shared.options.quiet;
        trace_unless_quiet!(quiet, count = batch.len(), "Flushing queued messages");
        let mut batch = batch.into_iter().map(|queued| queued.message);
        while let Some(message) = batch.next() {
            if let Err(message) = write_message(writer, message, quiet).await {
                let mut unsent = vec![message];
                unsent.extend(batch);
                return Err(unsent);
            }
        }
    }
}

/// Routes traffic while connected.
///
/// Returns once the connection is lost, with the message that failed to
/// write, if any.
async fn pump(
    shared: &Shared,
    writer: &mut SocketWriter,
    reader: &mut SocketReader,
    outbound_rx: &mut mpsc::UnboundedReceiver<Value>,
) -> Vec<Value> {
    let quiet = shared.options.quiet;

    loop {
        tokio::select! {
            frame = reader.next() => {
                match frame {
                    Some(Ok(Message::Text(text))) => shared.handle_inbound_text(&text),

                    Some(Ok(Message::Close(_))) => {
                        debug_unless_quiet!(quiet, "WebSocket closed by remote");
                        return Vec::new();
                    }

                    Some(Err(e)) => {
                        warn!(error = %e, "WebSocket read error");
                        return Vec::new();
                    }

                    None => {
                        debug_unless_quiet!(quiet, "WebSocket stream ended");
                        return Vec::new();
                    }

                    // Ignore Binary, Ping, Pong
                    _ => {}
                }
            }

            Some(message) = outbound_rx.recv() => {
                if let Err(message) = write_message(writer, message, quiet).await {
                    return vec![message];
                }
            }
        }
    }
}

/// Serializes and writes one message.
///
/// A message that cannot be serialized is reported and abandoned. On a
/// socket failure the message is handed back.
async fn write_message(
    writer: &mut SocketWriter,
    message: Value,
    quiet: bool,
) -> Result<(), Value> {
    let json = match serde_json::to_string(&message) {
        Ok(json) => json,
        Err(e) => {
            error!(error = %e, "Failed to serialize outbound message");
            return Ok(());
        }
    };

    match writer.send(Message::Text(json.into())).await {
        Ok(()) => {
            trace_unless_quiet!(quiet, "Message sent");
            Ok(())
        }
        Err(e) => {
            warn!(error = %e, "WebSocket write failed");
            Err(message)
        }
    }
}

// ============================================================================
// Tests
// ============================================================================
