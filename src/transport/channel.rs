//! WebSocket channel and event loop.
//!
//! Handles the bidirectional link to the subprocess: request/response
//! correlation by UUID, per-request timeouts, and routing of unsolicited
//! events (page-load notifications) to the session.
//!
//! # Event Loop
//!
//! The channel spawns a tokio task that handles:
//!
//! - Incoming messages from the subprocess (responses, events)
//! - Outgoing requests from the command queue
//! - Request/response correlation by UUID
//! - Failing all pending requests when the link closes

// ============================================================================
// Imports
// ============================================================================

use std::sync::Arc;
use std::time::Duration;

use futures_util::{SinkExt, StreamExt};
use parking_lot::Mutex;
use rustc_hash::FxHashMap;
use serde_json::{from_str, to_string};
use tokio::net::TcpStream;
use tokio::sync::{mpsc, oneshot};
use tokio::time::timeout;
use tokio_tungstenite::WebSocketStream;
use tokio_tungstenite::tungstenite::Message;
use tracing::{debug, error, trace, warn};

use crate::error::{Error, Result};
use crate::identifiers::RequestId;
use crate::protocol::{Event, Request, Response};

// ============================================================================
// Constants
// ============================================================================

/// Default timeout for a single request round trip.
const DEFAULT_REQUEST_TIMEOUT: Duration = Duration::from_secs(30);

/// Maximum pending requests before rejecting new ones.
const MAX_PENDING_REQUESTS: usize = 100;

/// Timeout for the ready handshake.
const READY_TIMEOUT: Duration = Duration::from_secs(30);

// ============================================================================
// Types
// ============================================================================

/// Map of request IDs to response channels.
type CorrelationMap = FxHashMap<RequestId, oneshot::Sender<Result<Response>>>;

/// Event callback type.
///
/// Called for each unsolicited event received from the subprocess.
pub type EventCallback = Box<dyn Fn(Event) + Send + Sync>;

// ============================================================================
// ReadyData
// ============================================================================

/// Data received in the ready handshake message.
///
/// The subprocess sends this immediately after connecting.
#[derive(Debug, Clone)]
pub struct ReadyData {
    /// Protocol version spoken by the subprocess.
    pub protocol_version: u32,
}

// ============================================================================
// ChannelCommand
// ============================================================================

/// Internal commands for the event loop.
enum ChannelCommand {
    /// Send a request and wait for response.
    Send {
        request: Request,
        response_tx: oneshot::Sender<Result<Response>>,
    },
    /// Remove a timed-out correlation entry.
    RemoveCorrelation(RequestId),
    /// Shutdown the channel.
    Shutdown,
}

// ============================================================================
// Channel
// ============================================================================

/// Transport channel to the browser subprocess.
///
/// Handles request/response correlation and event routing. The channel
/// spawns an internal event loop task.
///
/// # Thread Safety
///
/// `Channel` is `Send + Sync` and can be shared across tasks. All
/// operations are non-blocking; higher-level waits are built from repeated
/// round trips through [`Channel::send`], never by blocking a thread.
pub struct Channel {
    /// Channel for sending commands to the event loop.
    command_tx: mpsc::UnboundedSender<ChannelCommand>,
    /// Correlation map (shared with event loop).
    correlation: Arc<Mutex<CorrelationMap>>,
    /// Event callback (shared with event loop).
    events: Arc<Mutex<Option<EventCallback>>>,
}

impl Clone for Channel {
    fn clone(&self) -> Self {
        Self {
            command_tx: self.command_tx.clone(),
            correlation: Arc::clone(&self.correlation),
            events: Arc::clone(&self.events),
        }
    }
}

impl Channel {
    /// Creates a new channel from a WebSocket stream.
    ///
    /// Spawns the event loop task internally.
    pub(crate) fn new(ws_stream: WebSocketStream<TcpStream>) -> Self {
        let (command_tx, command_rx) = mpsc::unbounded_channel();
        let correlation = Arc::new(Mutex::new(CorrelationMap::default()));
        let events: Arc<Mutex<Option<EventCallback>>> = Arc::new(Mutex::new(None));

        tokio::spawn(Self::run_event_loop(
            ws_stream,
            command_rx,
            Arc::clone(&correlation),
            Arc::clone(&events),
        ));

        Self {
            command_tx,
            correlation,
            events,
        }
    }

    /// Waits for the ready handshake message.
    ///
    /// Must be called after the connection is established. The subprocess
    /// sends a success response with the nil UUID immediately after
    /// connecting.
    ///
    /// # Errors
    ///
    /// - [`Error::ConnectionTimeout`] if the handshake doesn't arrive in time
    /// - [`Error::TransportClosed`] if the link closes first
    pub async fn wait_ready(&self) -> Result<ReadyData> {
        let (tx, rx) = oneshot::channel();

        {
            let mut correlation = self.correlation.lock();
            correlation.insert(RequestId::handshake(), tx);
        }

        let response = timeout(READY_TIMEOUT, rx)
            .await
            .map_err(|_| Error::connection_timeout(READY_TIMEOUT.as_millis() as u64))??;

        let response = response?;
        let protocol_version = response.get_u64("protocolVersion").max(1) as u32;

        debug!(protocol_version, "Ready handshake completed");

        Ok(ReadyData { protocol_version })
    }

    /// Sets the event callback.
    ///
    /// The callback is invoked on the event loop task for each unsolicited
    /// event, so it must not block.
    pub fn set_event_callback(&self, callback: EventCallback) {
        let mut guard = self.events.lock();
        *guard = Some(callback);
    }

    /// Sends a request and waits for its response with the default timeout.
    ///
    /// # Errors
    ///
    /// - [`Error::TransportClosed`] if the link is closed
    /// - [`Error::TimedOut`] if no response arrives within the timeout
    /// - [`Error::Protocol`] if too many requests are pending
    pub async fn send(&self, request: Request) -> Result<Response> {
        self.send_with_timeout(request, DEFAULT_REQUEST_TIMEOUT)
            .await
    }

    /// Sends a request and waits for its response with a custom timeout.
    ///
    /// # Errors
    ///
    /// Same as [`Channel::send`].
    pub async fn send_with_timeout(
        &self,
        request: Request,
        request_timeout: Duration,
    ) -> Result<Response> {
        let request_id = request.id;

        {
            let correlation = self.correlation.lock();
            if correlation.len() >= MAX_PENDING_REQUESTS {
                warn!(
                    pending = correlation.len(),
                    max = MAX_PENDING_REQUESTS,
                    "Too many pending requests"
                );
                return Err(Error::protocol(format!(
                    "Too many pending requests: {}/{}",
                    correlation.len(),
                    MAX_PENDING_REQUESTS
                )));
            }
        }

        let (response_tx, response_rx) = oneshot::channel();

        self.command_tx
            .send(ChannelCommand::Send {
                request,
                response_tx,
            })
            .map_err(|_| Error::TransportClosed)?;

        match timeout(request_timeout, response_rx).await {
            Ok(Ok(result)) => result,
            Ok(Err(_)) => Err(Error::TransportClosed),
            Err(_) => {
                // Timeout - clean up correlation entry
                let _ = self
                    .command_tx
                    .send(ChannelCommand::RemoveCorrelation(request_id));

                Err(Error::timed_out(
                    format!("request {request_id}"),
                    request_timeout.as_millis() as u64,
                ))
            }
        }
    }

    /// Returns the number of pending requests.
    #[inline]
    #[must_use]
    pub fn pending_count(&self) -> usize {
        self.correlation.lock().len()
    }

    /// Shuts down the channel.
    ///
    /// All pending requests fail with [`Error::TransportClosed`].
    pub fn shutdown(&self) {
        let _ = self.command_tx.send(ChannelCommand::Shutdown);
    }

    /// Event loop that handles WebSocket I/O.
    async fn run_event_loop(
        ws_stream: WebSocketStream<TcpStream>,
        mut command_rx: mpsc::UnboundedReceiver<ChannelCommand>,
        correlation: Arc<Mutex<CorrelationMap>>,
        events: Arc<Mutex<Option<EventCallback>>>,
    ) {
        let (mut ws_write, mut ws_read) = ws_stream.split();

        loop {
            tokio::select! {
                // Incoming messages from the subprocess
                message = ws_read.next() => {
                    match message {
                        Some(Ok(Message::Text(text))) => {
                            Self::handle_incoming_message(&text, &correlation, &events);
                        }

                        Some(Ok(Message::Close(_))) => {
                            debug!("WebSocket closed by subprocess");
                            break;
                        }

                        Some(Err(e)) => {
                            error!(error = %e, "WebSocket error");
                            break;
                        }

                        None => {
                            debug!("WebSocket stream ended");
                            break;
                        }

                        // Ignore Binary, Ping, Pong
                        _ => {}
                    }
                }

                // Requests from the command queue
                command = command_rx.recv() => {
                    match command {
                        Some(ChannelCommand::Send { request, response_tx }) => {
                            Self::handle_send_command(
                                request,
                                response_tx,
                                &mut ws_write,
                                &correlation,
                            ).await;
                        }

                        Some(ChannelCommand::RemoveCorrelation(request_id)) => {
                            correlation.lock().remove(&request_id);
                            debug!(?request_id, "Removed timed-out correlation");
                        }

                        Some(ChannelCommand::Shutdown) => {
                            debug!("Shutdown command received");
                            let _ = ws_write.close().await;
                            break;
                        }

                        None => {
                            debug!("Command channel closed");
                            break;
                        }
                    }
                }
            }
        }

        // Fail all pending requests on shutdown
        Self::fail_pending_requests(&correlation);

        debug!("Transport event loop terminated");
    }

    /// Handles an incoming text message from the subprocess.
    fn handle_incoming_message(
        text: &str,
        correlation: &Arc<Mutex<CorrelationMap>>,
        events: &Arc<Mutex<Option<EventCallback>>>,
    ) {
        // Try to parse as Response first
        if let Ok(response) = from_str::<Response>(text) {
            let tx = correlation.lock().remove(&response.id);

            if let Some(tx) = tx {
                let _ = tx.send(Ok(response));
            } else {
                warn!(id = %response.id, "Response for unknown request");
            }

            return;
        }

        // Then as Event
        if let Ok(event) = from_str::<Event>(text) {
            trace!(event = %event.event, "Event received");
            let callback = events.lock();
            if let Some(ref callback) = *callback {
                callback(event);
            }
            return;
        }

        warn!(text = %text, "Failed to parse incoming message");
    }

    /// Handles a send command from the queue.
    async fn handle_send_command(
        request: Request,
        response_tx: oneshot::Sender<Result<Response>>,
        ws_write: &mut futures_util::stream::SplitSink<WebSocketStream<TcpStream>, Message>,
        correlation: &Arc<Mutex<CorrelationMap>>,
    ) {
        let request_id = request.id;

        let json = match to_string(&request) {
            Ok(j) => j,
            Err(e) => {
                let _ = response_tx.send(Err(Error::Json(e)));
                return;
            }
        };

        // Store correlation before sending
        correlation.lock().insert(request_id, response_tx);

        if let Err(e) = ws_write.send(Message::Text(json.into())).await {
            // Remove correlation and notify caller
            if let Some(tx) = correlation.lock().remove(&request_id) {
                let _ = tx.send(Err(Error::WebSocket(e)));
            }
            return;
        }

        trace!(?request_id, "Request sent");
    }

    /// Fails all pending requests with [`Error::TransportClosed`].
    fn fail_pending_requests(correlation: &Arc<Mutex<CorrelationMap>>) {
        let pending: Vec<_> = correlation.lock().drain().collect();
        let count = pending.len();

        for (_, tx) in pending {
            let _ = tx.send(Err(Error::TransportClosed));
        }

        if count > 0 {
            debug!(count, "Failed pending requests on shutdown");
        }
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    use futures_util::{SinkExt, StreamExt};
    use serde_json::{Value, json};
    use tokio_tungstenite::connect_async;

    use crate::identifiers::FrameId;
    use crate::protocol::{Command, PageCommand};
    use crate::transport::PendingEndpoint;

    /// Spawns a scripted remote end: connects to the endpoint, sends the
    /// ready handshake, then answers every request with a success echoing
    /// its id.
    async fn scripted_remote(ws_url: String) {
        let (mut ws, _) = connect_async(ws_url.as_str()).await.expect("connect");

        let ready = json!({
            "id": RequestId::handshake(),
            "type": "success",
            "result": { "protocolVersion": 1 }
        });
        ws.send(Message::Text(ready.to_string().into()))
            .await
            .expect("send ready");

        while let Some(Ok(Message::Text(text))) = ws.next().await {
            let request: Value = serde_json::from_str(&text).expect("request json");
            let reply = json!({
                "id": request["id"],
                "type": "success",
                "result": { "echo": request["method"] }
            });
            if ws.send(Message::Text(reply.to_string().into())).await.is_err() {
                break;
            }
        }
    }

    #[tokio::test]
    async fn test_round_trip_through_channel() {
        let endpoint = PendingEndpoint::bind(None).await.expect("bind");
        tokio::spawn(scripted_remote(endpoint.ws_url()));

        let (channel, ready) = endpoint.accept().await.expect("accept");
        assert_eq!(ready.protocol_version, 1);

        let request = Request::new(FrameId::MAIN, Command::Page(PageCommand::Reload));
        let response = channel.send(request).await.expect("round trip");

        assert!(response.is_success());
        assert_eq!(response.get_string("echo"), "page.reload");
        assert_eq!(channel.pending_count(), 0);
    }

    #[tokio::test]
    async fn test_shutdown_fails_pending() {
        let endpoint = PendingEndpoint::bind(None).await.expect("bind");
        let ws_url = endpoint.ws_url();

        // Remote that completes the handshake but never answers requests.
        tokio::spawn(async move {
            let (mut ws, _) = connect_async(ws_url.as_str()).await.expect("connect");
            let ready = json!({
                "id": RequestId::handshake(),
                "type": "success",
                "result": { "protocolVersion": 1 }
            });
            ws.send(Message::Text(ready.to_string().into()))
                .await
                .expect("send ready");
            // Hold the socket open without replying.
            while ws.next().await.is_some() {}
        });

        let (channel, _) = endpoint.accept().await.expect("accept");

        let request = Request::new(FrameId::MAIN, Command::Page(PageCommand::Reload));
        let pending = tokio::spawn({
            let channel = channel.clone();
            async move { channel.send(request).await }
        });

        // Give the send a moment to register its correlation entry.
        tokio::time::sleep(Duration::from_millis(50)).await;
        channel.shutdown();

        let result = pending.await.expect("join");
        assert!(matches!(result, Err(ref e) if e.is_closed()), "{result:?}");
    }
}
