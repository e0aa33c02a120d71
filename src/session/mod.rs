//! Session lifecycle and coordination.
//!
//! A [`Session`] is one browser-process + command-queue + page-context
//! triple. It owns the [`ProcessSupervisor`], the transport [`Channel`]
//! and the [`CommandQueue`] worker, and hands out [`Page`] handles backed
//! by that queue.
//!
//! # Lifecycle
//!
//! 1. [`Session::builder`] collects configuration
//! 2. `build()` binds the transport endpoint, launches the subprocess
//!    with the endpoint URL, and completes the ready handshake
//! 3. Page operations flow through the queue, strictly in order
//! 4. [`Session::close`] fails all pending futures with `SessionClosed`
//!    and kills the subprocess; a crash does the same with
//!    `SubprocessCrashed`
//!
//! # Modules
//!
//! | Module | Description |
//! |--------|-------------|
//! | `builder` | Session configuration and factory |
//! | `queue` | FIFO command pipeline |
//! | `state` | Shared per-session state |

// ============================================================================
// Submodules
// ============================================================================

/// Session configuration and factory.
pub mod builder;

/// FIFO command pipeline.
pub(crate) mod queue;

/// Shared per-session state.
pub(crate) mod state;

// ============================================================================
// Imports
// ============================================================================

use std::fmt;
use std::path::PathBuf;
use std::sync::Arc;

use tracing::{debug, info};

use crate::error::Result;
use crate::identifiers::SessionId;
use crate::page::Page;
use crate::process::ProcessSupervisor;
use crate::transport::PendingEndpoint;

use queue::CommandQueue;
use state::{CloseReason, SessionShared};

// ============================================================================
// Re-exports
// ============================================================================

pub use builder::{SessionBuilder, SessionOptions, SslProtocol};

// ============================================================================
// Types
// ============================================================================

/// Internal shared state for a session handle.
pub(crate) struct SessionInner {
    /// State shared with the queue worker and wait engine.
    shared: Arc<SessionShared>,
    /// Command pipeline.
    queue: CommandQueue,
    /// Subprocess supervisor.
    supervisor: ProcessSupervisor,
}

// ============================================================================
// Session
// ============================================================================

/// A handle to one browser automation session.
///
/// Cloneable; all clones refer to the same subprocess and command queue.
/// Multiple sessions run fully in parallel with no shared mutable state.
///
/// # Example
///
/// ```no_run
/// use stirrup::Session;
///
/// # async fn example() -> stirrup::Result<()> {
/// let session = Session::builder()
///     .binary("/usr/local/bin/browser-shim")
///     .build()
///     .await?;
///
/// let page = session.page();
/// page.open("https://example.com").await?;
/// println!("title: {}", page.title().await?);
///
/// session.close().await?;
/// # Ok(())
/// # }
/// ```
#[derive(Clone)]
pub struct Session {
    /// Shared inner state.
    pub(crate) inner: Arc<SessionInner>,
}

// ============================================================================
// Session - Display
// ============================================================================

impl fmt::Debug for Session {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Session")
            .field("id", &self.inner.shared.id)
            .field("pid", &self.inner.supervisor.pid())
            .field("closed", &self.is_closed())
            .finish_non_exhaustive()
    }
}

// ============================================================================
// Session - Public API
// ============================================================================

impl Session {
    /// Creates a configuration builder for a new session.
    #[inline]
    #[must_use]
    pub fn builder() -> SessionBuilder {
        SessionBuilder::new()
    }

    /// Returns the session ID.
    #[inline]
    #[must_use]
    pub fn id(&self) -> SessionId {
        self.inner.shared.id
    }

    /// Returns the subprocess PID.
    #[inline]
    #[must_use]
    pub fn pid(&self) -> u32 {
        self.inner.supervisor.pid()
    }

    /// Returns `true` once the session is closed or crashed.
    #[inline]
    #[must_use]
    pub fn is_closed(&self) -> bool {
        self.inner.shared.close_reason().is_some()
    }

    /// Returns the page handle for this session.
    #[inline]
    #[must_use]
    pub fn page(&self) -> Page {
        Page::new(
            Arc::clone(&self.inner.shared),
            self.inner.queue.clone(),
        )
    }

    /// Closes the session.
    ///
    /// Fails every pending and queued command future with
    /// [`Error::SessionClosed`](crate::Error::SessionClosed), shuts down
    /// the transport and kills the subprocess. Idempotent.
    pub async fn close(&self) -> Result<()> {
        info!(session_id = %self.inner.shared.id, "Closing session");

        self.inner.shared.mark_closed(CloseReason::Requested);
        self.inner.shared.channel.shutdown();
        self.inner.supervisor.shutdown().await;

        Ok(())
    }
}

// ============================================================================
// Session - Internal API
// ============================================================================

impl Session {
    /// Launches a new session: binds the transport, spawns the subprocess
    /// and wires the event/crash plumbing.
    pub(crate) async fn launch(
        binary: PathBuf,
        options: SessionOptions,
        client_scripts: Vec<String>,
    ) -> Result<Self> {
        let id = SessionId::next();

        // Bind first so the launch arguments can carry the endpoint URL.
        let endpoint = PendingEndpoint::bind(options.port).await?;
        let ws_url = endpoint.ws_url();

        let mut args = options.to_args();
        args.push(format!("--control-url={ws_url}"));
        args.push(format!("--session-id={id}"));

        let supervisor = ProcessSupervisor::launch(&binary, &args)?;
        debug!(session_id = %id, pid = supervisor.pid(), url = %ws_url, "Waiting for subprocess to attach");

        let (channel, ready) = endpoint.accept().await?;
        debug!(session_id = %id, protocol_version = ready.protocol_version, "Subprocess attached");

        let shared = Arc::new(SessionShared::new(
            id,
            channel,
            options.timeout,
            options.interval,
        ));

        Self::wire_load_events(&shared);
        Self::wire_crash_watch(&shared, &supervisor);

        let queue = CommandQueue::start(Arc::clone(&shared), client_scripts);

        info!(session_id = %id, pid = supervisor.pid(), "Session established");

        Ok(Self {
            inner: Arc::new(SessionInner {
                shared,
                queue,
                supervisor,
            }),
        })
    }

    /// Routes load-finished events into the session load counter.
    fn wire_load_events(shared: &Arc<SessionShared>) {
        let events_shared = Arc::clone(shared);
        shared.channel.set_event_callback(Box::new(move |event| {
            if event.is_load_finished() {
                events_shared.record_load(event.url(), event.status());
            }
        }));
    }

    /// Fails the session when the subprocess exits.
    ///
    /// For a requested shutdown the close reason is already latched by
    /// `close()` (first reason wins); an unexpected exit latches a crash
    /// and tears down the transport so in-flight commands fail promptly.
    fn wire_crash_watch(shared: &Arc<SessionShared>, supervisor: &ProcessSupervisor) {
        let watch_shared = Arc::clone(shared);
        let mut exit_rx = supervisor.exit_watch();

        tokio::spawn(async move {
            let exit = match exit_rx.wait_for(Option::is_some).await.as_deref() {
                Ok(Some(notice)) => *notice,
                _ => return,
            };

            watch_shared.mark_closed(CloseReason::from_exit(exit));
            watch_shared.channel.shutdown();
        });
    }
}

// ============================================================================
// Tests
// ============================================================================
