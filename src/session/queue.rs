//! The command queue: strict FIFO serialization of page operations.
//!
//! Every page-affecting operation (navigation, typing, clicking,
//! evaluation, screenshotting, waiting) is enqueued as a job and executed
//! by a single worker task, one at a time, in submission order. Each job's
//! future resolves only after the subprocess confirms completion, or, for
//! wait jobs, when the wait engine reports the condition satisfied.
//!
//! # Failure policy
//!
//! A failed command fails only its own future; the worker moves on to the
//! next job. Once the session is closed (explicitly or by a subprocess
//! crash) every queued and future job fails immediately with the close
//! error, without touching the transport. The queue never retries;
//! re-enqueueing is the caller's decision.

// ============================================================================
// Imports
// ============================================================================

use std::sync::Arc;

use serde_json::Value;
use tokio::sync::{mpsc, oneshot};
use tracing::{debug, trace, warn};

use crate::error::{Error, Result};
use crate::identifiers::FrameId;
use crate::protocol::{Command, PageCommand, Request, ScriptCommand, StorageCommand};
use crate::wait::{self, WaitCondition, WaitParams};

use super::state::{CloseReason, SessionShared};

// ============================================================================
// QueuedOp
// ============================================================================

/// One operation accepted by the queue.
pub(crate) enum QueuedOp {
    /// Plain command round trip against the subprocess.
    Dispatch(Request),

    /// Navigation command: flushes pending configuration first, applies
    /// the session navigation timeout, resets the frame pointer and
    /// re-injects client scripts afterwards.
    Navigate(Request),

    /// Wait condition handled by the wait engine.
    Wait {
        /// Condition to poll.
        condition: WaitCondition,
        /// Timeout and cadence.
        params: WaitParams,
    },
}

/// A queued job: the operation plus its reply slot.
struct Job {
    op: QueuedOp,
    reply: oneshot::Sender<Result<Value>>,
}

// ============================================================================
// CommandQueue
// ============================================================================

/// Handle to the session's command pipeline.
///
/// Cloneable; all clones feed the same worker and therefore the same
/// strict ordering.
#[derive(Clone)]
pub(crate) struct CommandQueue {
    tx: mpsc::UnboundedSender<Job>,
    shared: Arc<SessionShared>,
}

impl CommandQueue {
    /// Starts the worker task and returns the queue handle.
    ///
    /// `client_scripts` are injected into the page after every completed
    /// navigation, in order.
    pub(crate) fn start(shared: Arc<SessionShared>, client_scripts: Vec<String>) -> Self {
        let (tx, rx) = mpsc::unbounded_channel();

        tokio::spawn(run_worker(Arc::clone(&shared), client_scripts, rx));

        Self { tx, shared }
    }

    /// Enqueues an operation and awaits its result.
    ///
    /// May be called from any task at any time; effects are strictly
    /// serialized in call order.
    pub(crate) async fn run(&self, op: QueuedOp) -> Result<Value> {
        if let Some(err) = self.shared.closed_error() {
            return Err(err);
        }

        let (reply_tx, reply_rx) = oneshot::channel();
        self.tx
            .send(Job {
                op,
                reply: reply_tx,
            })
            .map_err(|_| {
                self.shared
                    .closed_error()
                    .unwrap_or(Error::SessionClosed)
            })?;

        match reply_rx.await {
            Ok(result) => result,
            // Worker dropped the reply slot; the session is gone.
            Err(recv_err) => Err(self
                .shared
                .closed_error()
                .unwrap_or(Error::ChannelClosed(recv_err))),
        }
    }
}

// ============================================================================
// Worker
// ============================================================================

/// Single-consumer worker: executes jobs strictly in order.
async fn run_worker(
    shared: Arc<SessionShared>,
    client_scripts: Vec<String>,
    mut rx: mpsc::UnboundedReceiver<Job>,
) {
    debug!(session_id = %shared.id, "Command queue worker started");

    while let Some(job) = rx.recv().await {
        // Closed sessions fail jobs without touching the transport. This
        // check has no await points, so a close drains the backlog fast.
        if let Some(err) = shared.closed_error() {
            let _ = job.reply.send(Err(err));
            continue;
        }

        let result = execute(&shared, &client_scripts, job.op).await;
        let result = normalize_close_error(&shared, result);

        let _ = job.reply.send(result);
    }

    debug!(session_id = %shared.id, "Command queue worker stopped");
}

/// Executes one operation.
async fn execute(
    shared: &SessionShared,
    client_scripts: &[String],
    op: QueuedOp,
) -> Result<Value> {
    match op {
        QueuedOp::Dispatch(request) => {
            trace!(session_id = %shared.id, id = %request.id, "Dispatching command");
            let response = shared.channel.send(request).await?;
            response.into_result()
        }

        QueuedOp::Navigate(request) => {
            flush_pending_config(shared).await?;

            trace!(session_id = %shared.id, id = %request.id, "Dispatching navigation");
            let response = shared
                .channel
                .send_with_timeout(request, shared.timeout)
                .await?;
            let value = response.into_result()?;

            // A completed navigation lands in a fresh document: the frame
            // pointer returns to main and the cached tree is stale.
            {
                let mut state = shared.state.lock();
                state.current_frame = FrameId::MAIN;
                state.frame_tree = None;
            }

            inject_client_scripts(shared, client_scripts).await;

            Ok(value)
        }

        QueuedOp::Wait { condition, params } => {
            wait::run(shared, &condition, params).await?;
            Ok(Value::Null)
        }
    }
}

/// Sends the recorded must-precede-navigation configuration ahead of the
/// first navigation, in a fixed order: proxy, authentication, headers,
/// user agent, cookies.
async fn flush_pending_config(shared: &SessionShared) -> Result<()> {
    let pending = {
        let mut state = shared.state.lock();
        std::mem::take(&mut state.pending)
    };

    if pending.is_empty() {
        return Ok(());
    }

    debug!(session_id = %shared.id, "Applying pre-navigation configuration");

    let mut commands: Vec<Command> = Vec::new();

    if let Some(proxy) = pending.proxy {
        commands.push(Command::Page(proxy.into_command()));
    }
    if let Some((user, password)) = pending.authentication {
        commands.push(Command::Page(PageCommand::SetAuthentication {
            user,
            password,
        }));
    }
    if let Some(headers) = pending.headers {
        commands.push(Command::Page(PageCommand::SetHeaders { headers }));
    }
    if let Some(value) = pending.user_agent {
        commands.push(Command::Page(PageCommand::SetUserAgent { value }));
    }
    if let Some(cookies) = pending.cookies {
        commands.push(Command::Storage(StorageCommand::SetCookies { cookies }));
    }

    for command in commands {
        let request = Request::new(FrameId::MAIN, command);
        shared.channel.send(request).await?.into_result()?;
    }

    Ok(())
}

/// Injects the session's client scripts after a navigation.
///
/// Injection failures are logged, not propagated: a missing helper script
/// should not fail the navigation that already completed.
async fn inject_client_scripts(shared: &SessionShared, client_scripts: &[String]) {
    for source in client_scripts {
        let request = Request::new(
            FrameId::MAIN,
            Command::Script(ScriptCommand::Inject {
                source: source.clone(),
            }),
        );

        match shared.channel.send(request).await.map(|r| r.into_result()) {
            Ok(Ok(_)) => {}
            Ok(Err(e)) | Err(e) => {
                warn!(session_id = %shared.id, error = %e, "Client script injection failed");
                if e.is_closed() {
                    break;
                }
            }
        }
    }
}

/// Translates transport-closed failures into the session close error.
///
/// If the transport died without a recorded reason, the subprocess is
/// gone without `close()` having been called: latch a crash so subsequent
/// jobs fail fast with the same error.
fn normalize_close_error(shared: &SessionShared, result: Result<Value>) -> Result<Value> {
    match result {
        Err(err) if err.is_closed() => {
            if shared.close_reason().is_none() {
                shared.mark_closed(CloseReason::Crashed(None));
            }
            Err(shared.closed_error().unwrap_or(err))
        }
        other => other,
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    use std::sync::Arc;
    use std::time::Duration;

    use parking_lot::Mutex;
    use serde_json::json;
    use tokio::time::Instant;

    use crate::protocol::HttpMethod;
    use crate::testing::{Reply, scripted_session, scripted_session_with};

    fn reload_op() -> QueuedOp {
        QueuedOp::Dispatch(Request::new(FrameId::MAIN, Command::Page(PageCommand::Reload)))
    }

    #[tokio::test]
    async fn test_results_resolve_in_submission_order() {
        // First submissions get the longest remote latency; ordering must
        // still follow submission order, not response readiness.
        let delays = Mutex::new(vec![10u64, 20, 40, 80]);
        let (_shared, queue) = scripted_session(move |_, _| {
            let delay = delays.lock().pop().unwrap_or(10);
            Some((Reply::success(json!({})), Duration::from_millis(delay)))
        })
        .await;

        let order = Arc::new(Mutex::new(Vec::new()));
        let mut handles = Vec::new();

        for i in 0..4u32 {
            let queue = queue.clone();
            let order = Arc::clone(&order);
            handles.push(tokio::spawn(async move {
                queue.run(reload_op()).await.expect("command");
                order.lock().push(i);
            }));
            // Stagger the spawns so submission order is deterministic.
            tokio::time::sleep(Duration::from_millis(5)).await;
        }

        for handle in handles {
            handle.await.expect("join");
        }

        assert_eq!(*order.lock(), vec![0, 1, 2, 3]);
    }

    #[tokio::test]
    async fn test_always_true_predicate_resolves_immediately() {
        let (_shared, queue) = scripted_session(|_, _| {
            Some((Reply::success(json!({ "value": true })), Duration::ZERO))
        })
        .await;

        let started = Instant::now();
        queue
            .run(QueuedOp::Wait {
                condition: WaitCondition::Predicate {
                    script: "function() { return true; }".into(),
                    args: vec![],
                    expected: json!(true),
                },
                params: WaitParams {
                    timeout: Duration::from_secs(5),
                    interval: Duration::from_millis(200),
                },
            })
            .await
            .expect("wait");

        // Resolved on the immediate first check, well inside one interval.
        assert!(started.elapsed() < Duration::from_millis(150));
    }

    #[tokio::test]
    async fn test_always_false_predicate_times_out_in_window() {
        let (_shared, queue) = scripted_session(|_, _| {
            Some((Reply::success(json!({ "value": false })), Duration::ZERO))
        })
        .await;

        let timeout = Duration::from_millis(200);
        let interval = Duration::from_millis(50);

        let started = Instant::now();
        let err = queue
            .run(QueuedOp::Wait {
                condition: WaitCondition::Predicate {
                    script: "function() { return false; }".into(),
                    args: vec![],
                    expected: json!(true),
                },
                params: WaitParams { timeout, interval },
            })
            .await
            .unwrap_err();
        let elapsed = started.elapsed();

        assert!(elapsed >= timeout, "failed early: {elapsed:?}");
        assert!(
            elapsed < timeout + interval + Duration::from_millis(100),
            "failed late: {elapsed:?}"
        );

        match err {
            Error::TimedOut { last_observed, .. } => {
                assert_eq!(last_observed.as_deref(), Some("false"));
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_next_page_baseline_guards_already_loaded_race() {
        let (shared, queue) =
            scripted_session(|_, _| Some((Reply::success(json!({})), Duration::ZERO))).await;

        // The load finished after the baseline was captured but before the
        // wait executes; it must resolve without a single poll interval.
        shared.record_load(Some("https://example.com"), Some(200));

        let started = Instant::now();
        queue
            .run(QueuedOp::Wait {
                condition: WaitCondition::NextPage { baseline: 0 },
                params: WaitParams {
                    timeout: Duration::from_secs(5),
                    interval: Duration::from_millis(500),
                },
            })
            .await
            .expect("wait");

        assert!(started.elapsed() < Duration::from_millis(100));
    }

    #[tokio::test]
    async fn test_close_fails_all_queued_commands() {
        // Remote answers nothing after the handshake, so the first job
        // stays in flight while two more sit in the queue.
        let (shared, queue) = scripted_session(|_, _| {
            Some((Reply::success(json!({})), Duration::from_secs(30)))
        })
        .await;

        let mut handles = Vec::new();
        for _ in 0..3 {
            let queue = queue.clone();
            handles.push(tokio::spawn(async move { queue.run(reload_op()).await }));
        }

        tokio::time::sleep(Duration::from_millis(50)).await;
        shared.mark_closed(CloseReason::Requested);
        shared.channel.shutdown();

        for handle in handles {
            let result = handle.await.expect("join");
            assert!(
                matches!(result, Err(Error::SessionClosed)),
                "expected SessionClosed, got {result:?}"
            );
        }

        // Later enqueues fail without reaching the worker.
        let late = queue.run(reload_op()).await;
        assert!(matches!(late, Err(Error::SessionClosed)));
    }

    #[tokio::test]
    async fn test_dead_transport_latches_a_crash() {
        // Remote drops the connection on the first request.
        let (shared, queue) = scripted_session(|_, _| None).await;

        let result = queue.run(reload_op()).await;
        assert!(
            matches!(result, Err(Error::SubprocessCrashed { .. })),
            "expected SubprocessCrashed, got {result:?}"
        );

        // The crash is latched: the next job fails the same way, fast.
        let next = queue.run(reload_op()).await;
        assert!(matches!(next, Err(Error::SubprocessCrashed { .. })));
        assert_eq!(shared.close_reason(), Some(CloseReason::Crashed(None)));
    }

    #[tokio::test]
    async fn test_navigation_resets_frame_pointer() {
        let (shared, queue) =
            scripted_session(|_, _| Some((Reply::success(json!({})), Duration::ZERO))).await;

        shared.state.lock().current_frame = FrameId::new(4);

        queue
            .run(QueuedOp::Navigate(Request::new(
                FrameId::MAIN,
                Command::Page(PageCommand::Navigate {
                    url: "https://example.com".into(),
                    http_method: HttpMethod::Get,
                    body: None,
                }),
            )))
            .await
            .expect("navigate");

        let state = shared.state.lock();
        assert_eq!(state.current_frame, FrameId::MAIN);
        assert!(state.frame_tree.is_none());
    }

    #[tokio::test]
    async fn test_failed_command_does_not_stop_the_queue() {
        // Remote errors on evaluate but answers everything else.
        let responder = Arc::new(|method: &str, _params: &Value| {
            let reply = if method == "script.evaluate" {
                Reply::error("script error", "boom")
            } else {
                Reply::success(json!({}))
            };
            Some((reply, Duration::ZERO))
        });
        let (_shared, queue, mut seen) = scripted_session_with(responder).await;

        let failing = queue
            .run(QueuedOp::Dispatch(Request::new(
                FrameId::MAIN,
                Command::Script(ScriptCommand::Evaluate {
                    script: "function() { throw new Error('boom'); }".into(),
                    args: vec![],
                }),
            )))
            .await;
        assert!(matches!(failing, Err(Error::ScriptError { .. })));

        // The queue keeps processing after the failure.
        queue.run(reload_op()).await.expect("next command");

        assert_eq!(seen.recv().await.as_deref(), Some("script.evaluate"));
        assert_eq!(seen.recv().await.as_deref(), Some("page.reload"));
    }
}
