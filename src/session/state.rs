//! Shared per-session state.
//!
//! One [`SessionShared`] is created per session and shared by the command
//! queue worker, the wait engine, the page handles and the close path. The
//! page-level mutable state ([`PageState`]) sits behind a `parking_lot`
//! mutex; the load counter and close signal use lock-free primitives
//! because the wait engine reads them on every poll tick.

// ============================================================================
// Imports
// ============================================================================

use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;

use parking_lot::Mutex;
use serde_json::{Map, Value};
use tokio::sync::watch;
use tracing::debug;

use crate::error::Error;
use crate::identifiers::{FrameId, SessionId};
use crate::page::config::ProxyConfig;
use crate::page::frames::FrameTree;
use crate::process::ProcessExit;
use crate::protocol::Cookie;
use crate::transport::Channel;

// ============================================================================
// CloseReason
// ============================================================================

/// Why the session stopped accepting commands.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum CloseReason {
    /// `close()` was called (or the session handle was dropped).
    Requested,
    /// The subprocess terminated on its own.
    Crashed(Option<i32>),
}

impl CloseReason {
    /// The error every affected command fails with.
    #[inline]
    pub(crate) fn to_error(self) -> Error {
        match self {
            Self::Requested => Error::SessionClosed,
            Self::Crashed(code) => Error::crashed(code),
        }
    }

    /// Builds a close reason from a subprocess exit notice.
    #[inline]
    pub(crate) fn from_exit(exit: ProcessExit) -> Self {
        if exit.requested {
            Self::Requested
        } else {
            Self::Crashed(exit.code)
        }
    }
}

// ============================================================================
// PendingConfig
// ============================================================================

/// Configuration recorded before the first navigation.
///
/// The queue worker flushes these as commands ahead of the first
/// `page.navigate`; after that point the corresponding setters are
/// rejected with `UsedAfterNavigation`.
#[derive(Debug, Default)]
pub(crate) struct PendingConfig {
    /// Cookies to install before the first request.
    pub cookies: Option<Vec<Cookie>>,
    /// User-Agent override.
    pub user_agent: Option<String>,
    /// Extra request headers.
    pub headers: Option<Map<String, Value>>,
    /// Basic-auth credentials.
    pub authentication: Option<(String, String)>,
    /// Proxy settings.
    pub proxy: Option<ProxyConfig>,
}

impl PendingConfig {
    /// Returns `true` if nothing was recorded.
    #[inline]
    pub(crate) fn is_empty(&self) -> bool {
        self.cookies.is_none()
            && self.user_agent.is_none()
            && self.headers.is_none()
            && self.authentication.is_none()
            && self.proxy.is_none()
    }
}

// ============================================================================
// PageState
// ============================================================================

/// Mutable page-context state.
pub(crate) struct PageState {
    /// Set once the first navigation has been enqueued.
    pub navigated: bool,
    /// Must-precede-navigation configuration, drained at first navigate.
    pub pending: PendingConfig,
    /// Current frame the queue targets commands at.
    pub current_frame: FrameId,
    /// Frame tree from the last `frame.list`; invalidated by navigation.
    pub frame_tree: Option<FrameTree>,
    /// URL of the last finished load.
    pub last_url: String,
    /// HTTP status of the last finished load.
    pub last_status: Option<u16>,
}

impl PageState {
    fn new() -> Self {
        Self {
            navigated: false,
            pending: PendingConfig::default(),
            current_frame: FrameId::MAIN,
            frame_tree: None,
            last_url: String::new(),
            last_status: None,
        }
    }
}

// ============================================================================
// SessionShared
// ============================================================================

/// State shared between the session handle, queue worker and wait engine.
pub(crate) struct SessionShared {
    /// Session ID for logging.
    pub id: SessionId,
    /// Transport channel to the subprocess.
    pub channel: Channel,
    /// Page-context state.
    pub state: Mutex<PageState>,
    /// Completed page loads since session start.
    loads: AtomicU64,
    /// Close signal; set exactly once.
    close_tx: watch::Sender<Option<CloseReason>>,
    /// Default wait/navigation timeout.
    pub timeout: Duration,
    /// Default wait poll interval.
    pub interval: Duration,
}

impl SessionShared {
    /// Creates shared state for a fresh session.
    pub(crate) fn new(
        id: SessionId,
        channel: Channel,
        timeout: Duration,
        interval: Duration,
    ) -> Self {
        let (close_tx, _) = watch::channel(None);
        Self {
            id,
            channel,
            state: Mutex::new(PageState::new()),
            loads: AtomicU64::new(0),
            close_tx,
            timeout,
            interval,
        }
    }

    // ------------------------------------------------------------------
    // Load counter
    // ------------------------------------------------------------------

    /// Number of completed page loads so far.
    #[inline]
    pub(crate) fn load_count(&self) -> u64 {
        self.loads.load(Ordering::Acquire)
    }

    /// Records a finished load with its URL and HTTP status.
    pub(crate) fn record_load(&self, url: Option<&str>, status: Option<u16>) {
        let count = self.loads.fetch_add(1, Ordering::AcqRel) + 1;

        let mut state = self.state.lock();
        if let Some(url) = url {
            state.last_url = url.to_string();
        }
        state.last_status = status;

        debug!(session_id = %self.id, count, ?status, "Page load finished");
    }

    // ------------------------------------------------------------------
    // Close signal
    // ------------------------------------------------------------------

    /// Marks the session closed with the given reason.
    ///
    /// The first reason wins; later calls are no-ops so a crash racing a
    /// `close()` keeps whichever was observed first.
    pub(crate) fn mark_closed(&self, reason: CloseReason) {
        self.close_tx.send_if_modified(|current| {
            if current.is_none() {
                *current = Some(reason);
                true
            } else {
                false
            }
        });
    }

    /// Returns the close reason, if the session is closed.
    #[inline]
    pub(crate) fn close_reason(&self) -> Option<CloseReason> {
        *self.close_tx.borrow()
    }

    /// Returns a watcher for the close signal.
    #[inline]
    pub(crate) fn close_watch(&self) -> watch::Receiver<Option<CloseReason>> {
        self.close_tx.subscribe()
    }

    /// Convenience: error to fail a command with, if closed.
    #[inline]
    pub(crate) fn closed_error(&self) -> Option<Error> {
        self.close_reason().map(CloseReason::to_error)
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_close_reason_errors() {
        assert!(matches!(
            CloseReason::Requested.to_error(),
            Error::SessionClosed
        ));
        assert!(matches!(
            CloseReason::Crashed(Some(9)).to_error(),
            Error::SubprocessCrashed { exit_code: Some(9) }
        ));
    }

    #[test]
    fn test_close_reason_from_exit() {
        let requested = ProcessExit {
            code: Some(0),
            requested: true,
        };
        assert_eq!(CloseReason::from_exit(requested), CloseReason::Requested);

        let crashed = ProcessExit {
            code: Some(11),
            requested: false,
        };
        assert_eq!(
            CloseReason::from_exit(crashed),
            CloseReason::Crashed(Some(11))
        );
    }

    #[test]
    fn test_pending_config_is_empty() {
        let mut pending = PendingConfig::default();
        assert!(pending.is_empty());

        pending.user_agent = Some("bot/1.0".to_string());
        assert!(!pending.is_empty());
    }
}
