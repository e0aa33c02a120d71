//! In-process scripted remote ends for integration tests.
//!
//! A scripted remote is a `tokio-tungstenite` client task standing in for
//! the browser subprocess: it connects to a bound endpoint, completes the
//! ready handshake, then answers each request according to a test-supplied
//! responder, optionally with artificial latency. Returning `None` from
//! the responder drops the connection, simulating a crash.

// ============================================================================
// Imports
// ============================================================================

use std::sync::Arc;
use std::time::Duration;

use futures_util::{SinkExt, StreamExt};
use serde_json::{Value, json};
use tokio::sync::mpsc;
use tokio_tungstenite::connect_async;
use tokio_tungstenite::tungstenite::Message;

use crate::identifiers::{RequestId, SessionId};
use crate::page::Page;
use crate::session::queue::CommandQueue;
use crate::session::state::SessionShared;
use crate::transport::PendingEndpoint;

// ============================================================================
// Reply
// ============================================================================

/// What the scripted remote answers for one request.
pub(crate) enum Reply {
    /// Success response with the given result object.
    Success(Value),
    /// Error response with the given code and message.
    Error {
        /// Subprocess error code (e.g. `"script error"`).
        code: String,
        /// Error message.
        message: String,
    },
}

impl Reply {
    /// Success reply.
    pub(crate) fn success(result: Value) -> Self {
        Self::Success(result)
    }

    /// Error reply.
    pub(crate) fn error(code: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Error {
            code: code.into(),
            message: message.into(),
        }
    }

    fn into_json(self, id: Value) -> Value {
        match self {
            Self::Success(result) => json!({
                "id": id,
                "type": "success",
                "result": result
            }),
            Self::Error { code, message } => json!({
                "id": id,
                "type": "error",
                "error": code,
                "message": message
            }),
        }
    }
}

// ============================================================================
// Responder
// ============================================================================

/// Per-request behavior: given (method, params), return the reply and an
/// artificial latency, or `None` to drop the connection.
pub(crate) type Responder =
    Arc<dyn Fn(&str, &Value) -> Option<(Reply, Duration)> + Send + Sync>;

// ============================================================================
// Harness
// ============================================================================

/// Spawns a scripted remote and builds a live session around it.
///
/// Returns the shared state, the queue, and a stream of method names in
/// the order the remote saw them.
pub(crate) async fn scripted_session_with(
    responder: Responder,
) -> (
    Arc<SessionShared>,
    CommandQueue,
    mpsc::UnboundedReceiver<String>,
) {
    let endpoint = PendingEndpoint::bind(None).await.expect("bind");
    let ws_url = endpoint.ws_url();
    let (seen_tx, seen_rx) = mpsc::unbounded_channel();

    tokio::spawn(run_remote(ws_url, responder, seen_tx));

    let (channel, _) = endpoint.accept().await.expect("accept");
    let shared = Arc::new(SessionShared::new(
        SessionId::next(),
        channel,
        Duration::from_secs(5),
        Duration::from_millis(50),
    ));
    let queue = CommandQueue::start(Arc::clone(&shared), vec![]);

    (shared, queue, seen_rx)
}

/// [`scripted_session_with`] without the seen-methods stream.
pub(crate) async fn scripted_session(
    responder: impl Fn(&str, &Value) -> Option<(Reply, Duration)> + Send + Sync + 'static,
) -> (Arc<SessionShared>, CommandQueue) {
    let (shared, queue, _) = scripted_session_with(Arc::new(responder)).await;
    (shared, queue)
}

/// Builds a [`Page`] handle over a scripted session.
pub(crate) async fn scripted_page(
    responder: impl Fn(&str, &Value) -> Option<(Reply, Duration)> + Send + Sync + 'static,
) -> (Arc<SessionShared>, Page) {
    let (shared, queue) = scripted_session(responder).await;
    let page = Page::new(Arc::clone(&shared), queue);
    (shared, page)
}

/// The remote task: handshake, then answer requests per the responder.
async fn run_remote(
    ws_url: String,
    responder: Responder,
    seen_tx: mpsc::UnboundedSender<String>,
) {
    let (ws, _) = connect_async(ws_url.as_str()).await.expect("connect");
    let (write, mut read) = ws.split();
    let write = Arc::new(tokio::sync::Mutex::new(write));

    let ready = json!({
        "id": RequestId::handshake(),
        "type": "success",
        "result": { "protocolVersion": 1 }
    });
    write
        .lock()
        .await
        .send(Message::Text(ready.to_string().into()))
        .await
        .expect("send ready");

    while let Some(Ok(Message::Text(text))) = read.next().await {
        let request: Value = serde_json::from_str(&text).expect("request json");
        let method = request["method"].as_str().unwrap_or("").to_string();
        let params = request.get("params").cloned().unwrap_or(Value::Null);
        let _ = seen_tx.send(method.clone());

        match responder(&method, &params) {
            Some((reply, delay)) => {
                let id = request["id"].clone();
                let write = Arc::clone(&write);
                tokio::spawn(async move {
                    if !delay.is_zero() {
                        tokio::time::sleep(delay).await;
                    }
                    let _ = write
                        .lock()
                        .await
                        .send(Message::Text(reply.into_json(id).to_string().into()))
                        .await;
                });
            }
            None => break,
        }
    }
}
