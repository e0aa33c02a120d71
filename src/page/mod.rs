//! Page handle and caller-facing operations.
//!
//! A [`Page`] is a cheap clone handle over the session's command queue
//! and shared state. Every page-affecting method enqueues exactly one
//! operation; effects are strictly serialized in call order, so
//!
//! ```ignore
//! page.open("https://example.com/login").await?;
//! page.type_text("#user", "admin", None).await?;
//! page.click("#submit").await?;
//! page.wait_for_next_page().await?;
//! ```
//!
//! executes in exactly that order against the subprocess.
//!
//! # Modules
//!
//! | Module | Description |
//! |--------|-------------|
//! | `config` | Pre-navigation and live configuration setters |
//! | `evaluate` | Function evaluation in the page context |
//! | `frames` | Frame tree and frame switching |
//! | `interaction` | Clicking, typing, synthetic input |
//! | `navigation` | open/post/put, history, status |
//! | `query` | Canned DOM queries |
//! | `screenshot` | Screenshots, crops, PDF export |
//! | `waiting` | Queued wait operations |

// ============================================================================
// Submodules
// ============================================================================

/// Pre-navigation and live configuration setters.
pub mod config;

/// Function evaluation in the page context.
pub mod evaluate;

/// Frame tree and frame switching.
pub mod frames;

/// Clicking, typing, synthetic input.
pub mod interaction;

/// Navigation operations.
pub mod navigation;

/// Canned DOM queries.
pub mod query;

/// Screenshots, crops, PDF export.
pub mod screenshot;

/// Queued wait operations.
pub mod waiting;

// ============================================================================
// Imports
// ============================================================================

use std::fmt;
use std::sync::Arc;

use serde_json::Value;

use crate::error::Result;
use crate::identifiers::{FrameId, SessionId};
use crate::protocol::{Command, Request};
use crate::session::queue::{CommandQueue, QueuedOp};
use crate::session::state::SessionShared;
use crate::wait::{WaitCondition, WaitParams};

// ============================================================================
// Re-exports
// ============================================================================

pub use config::{ProxyConfig, ProxyType};
pub use frames::{FrameInfo, FrameTarget};
pub use interaction::TypingOptions;
pub use screenshot::{BoundingBox, CropTarget, ImageFormat, PaperSize};

// ============================================================================
// Page
// ============================================================================

/// A handle to the session's page context.
///
/// Obtained from [`Session::page`](crate::Session::page). Clones share
/// the same queue and page state.
#[derive(Clone)]
pub struct Page {
    /// Shared session state.
    pub(crate) shared: Arc<SessionShared>,
    /// Command pipeline.
    pub(crate) queue: CommandQueue,
}

impl fmt::Debug for Page {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Page")
            .field("session_id", &self.shared.id)
            .field("current_frame", &self.current_frame())
            .finish_non_exhaustive()
    }
}

// ============================================================================
// Page - Accessors
// ============================================================================

impl Page {
    /// Creates a new page handle.
    pub(crate) fn new(shared: Arc<SessionShared>, queue: CommandQueue) -> Self {
        Self { shared, queue }
    }

    /// Returns the session ID.
    #[inline]
    #[must_use]
    pub fn session_id(&self) -> SessionId {
        self.shared.id
    }

    /// Returns the frame commands currently target.
    #[inline]
    #[must_use]
    pub fn current_frame(&self) -> FrameId {
        self.shared.state.lock().current_frame
    }

    /// Returns `true` if commands currently target the main frame.
    #[inline]
    #[must_use]
    pub fn is_main_frame(&self) -> bool {
        self.current_frame().is_main()
    }
}

// ============================================================================
// Page - Internal
// ============================================================================

impl Page {
    /// Enqueues a command against the current frame.
    pub(crate) async fn dispatch(&self, command: Command) -> Result<Value> {
        let frame = self.current_frame();
        self.queue
            .run(QueuedOp::Dispatch(Request::new(frame, command)))
            .await
    }

    /// Enqueues a command against the main frame regardless of the
    /// current frame pointer.
    pub(crate) async fn dispatch_main(&self, command: Command) -> Result<Value> {
        self.queue
            .run(QueuedOp::Dispatch(Request::new(FrameId::MAIN, command)))
            .await
    }

    /// Enqueues a navigation command.
    ///
    /// Flips the navigated flag at enqueue time so the
    /// must-precede-navigation boundary is deterministic for the caller.
    pub(crate) async fn enqueue_navigation(&self, command: Command) -> Result<Value> {
        self.shared.state.lock().navigated = true;
        self.queue
            .run(QueuedOp::Navigate(Request::new(FrameId::MAIN, command)))
            .await
    }

    /// Enqueues a wait operation with the session's timeout and interval.
    pub(crate) async fn enqueue_wait(&self, condition: WaitCondition) -> Result<()> {
        let params = WaitParams {
            timeout: self.shared.timeout,
            interval: self.shared.interval,
        };
        self.enqueue_wait_with(condition, params).await
    }

    /// Enqueues a wait operation with explicit timing.
    pub(crate) async fn enqueue_wait_with(
        &self,
        condition: WaitCondition,
        params: WaitParams,
    ) -> Result<()> {
        self.queue
            .run(QueuedOp::Wait { condition, params })
            .await
            .map(|_| ())
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::Page;

    #[test]
    fn test_page_is_clone() {
        fn assert_clone<T: Clone>() {}
        assert_clone::<Page>();
    }

    #[test]
    fn test_page_is_send_sync() {
        fn assert_send_sync<T: Send + Sync>() {}
        assert_send_sync::<Page>();
    }
}
