//! Error types for the stirrup client.
//!
//! All fallible operations return [`Result<T>`] which uses [`Error`]:
//!
//! ```ignore
//! use stirrup::{Result, Session};
//!
//! async fn example(session: &Session) -> Result<()> {
//!     let page = session.page();
//!     page.open("https://example.com").await?;
//!     Ok(())
//! }
//! ```
//!
//! # Error Categories
//!
//! | Category | Variants |
//! |----------|----------|
//! | Configuration | [`Error::Config`], [`Error::BinaryNotFound`], [`Error::LaunchFailed`] |
//! | Lifecycle | [`Error::SessionClosed`], [`Error::SubprocessCrashed`] |
//! | Ordering | [`Error::UsedAfterNavigation`] |
//! | Waits | [`Error::TimedOut`], [`Error::ConnectionTimeout`] |
//! | Page | [`Error::FrameNotFound`], [`Error::NotSerializable`], [`Error::ScriptError`] |
//! | Protocol | [`Error::Protocol`], [`Error::InvalidArgument`] |
//! | External | [`Error::Io`], [`Error::Json`], [`Error::WebSocket`], [`Error::Image`] |

// ============================================================================
// Imports
// ============================================================================

use std::io::Error as IoError;
use std::path::PathBuf;
use std::result::Result as StdResult;

use thiserror::Error;
use tokio::sync::oneshot::error::RecvError;
use tokio_tungstenite::tungstenite::Error as WsError;

// ============================================================================
// Result Alias
// ============================================================================

/// Result type alias using crate [`enum@Error`].
///
/// All fallible operations in this crate return this type.
pub type Result<T> = StdResult<T, Error>;

// ============================================================================
// Error Enum
// ============================================================================

/// Main error type for the crate.
///
/// Each variant includes relevant context for debugging.
#[derive(Error, Debug)]
pub enum Error {
    // ========================================================================
    // Configuration Errors
    // ========================================================================
    /// Session configuration error.
    ///
    /// Returned when builder configuration is invalid.
    #[error("Configuration error: {message}")]
    Config {
        /// Description of the configuration error.
        message: String,
    },

    /// Browser control binary not found at path.
    #[error("Browser binary not found at: {path}")]
    BinaryNotFound {
        /// Path where the binary was expected.
        path: PathBuf,
    },

    /// Failed to launch the browser subprocess.
    #[error("Failed to launch browser subprocess: {message}")]
    LaunchFailed {
        /// Description of the launch failure.
        message: String,
    },

    // ========================================================================
    // Lifecycle Errors
    // ========================================================================
    /// The session was closed.
    ///
    /// Returned for every command still queued or enqueued after
    /// [`Session::close`](crate::Session::close) was called. Pending wait
    /// operations observe the close at their next poll tick.
    #[error("Session closed")]
    SessionClosed,

    /// The browser subprocess terminated abnormally.
    ///
    /// Distinct from [`Error::SessionClosed`]: the subprocess died without
    /// `close()` being called. Every queued and future command fails with
    /// this error until a new session is created.
    #[error("Browser subprocess crashed{}", exit_code.map(|c| format!(" (exit code {c})")).unwrap_or_default())]
    SubprocessCrashed {
        /// Exit code of the subprocess, if one was reported.
        exit_code: Option<i32>,
    },

    // ========================================================================
    // Ordering Errors
    // ========================================================================
    /// A must-precede-navigation setter was called after navigation.
    ///
    /// `cookies`, `user_agent`, `headers`, `authentication` and `set_proxy`
    /// record state that the subprocess applies before the first page
    /// request; once a navigation has been enqueued they are rejected.
    #[error("{setter} must be set before the first navigation")]
    UsedAfterNavigation {
        /// Name of the rejected setter.
        setter: &'static str,
    },

    // ========================================================================
    // Wait / Timeout Errors
    // ========================================================================
    /// A wait or navigation exceeded its deadline.
    #[error("Timeout after {timeout_ms}ms: {operation}")]
    TimedOut {
        /// Description of the operation that timed out.
        operation: String,
        /// Milliseconds waited before timeout.
        timeout_ms: u64,
        /// Last value observed by the wait poll, JSON-rendered.
        last_observed: Option<String>,
    },

    /// Connection timeout waiting for the subprocess to attach.
    #[error("Connection timeout after {timeout_ms}ms")]
    ConnectionTimeout {
        /// Milliseconds waited before timeout.
        timeout_ms: u64,
    },

    // ========================================================================
    // Page Errors
    // ========================================================================
    /// Frame not found by name or index.
    ///
    /// The current frame pointer is left unchanged on this error.
    #[error("Frame not found: {target}")]
    FrameNotFound {
        /// The name or index that matched no child frame.
        target: String,
    },

    /// An evaluated value cannot cross the subprocess boundary.
    ///
    /// DOM nodes, functions and other non-JSON values cannot be returned
    /// from [`Page::evaluate`](crate::Page::evaluate).
    #[error("Evaluation result is not serializable: {detail}")]
    NotSerializable {
        /// Description from the subprocess.
        detail: String,
    },

    /// JavaScript raised inside the page.
    #[error("Script error: {message}")]
    ScriptError {
        /// Error message from script execution.
        message: String,
    },

    // ========================================================================
    // Protocol Errors
    // ========================================================================
    /// Protocol violation or unexpected response.
    #[error("Protocol error: {message}")]
    Protocol {
        /// Description of the protocol violation.
        message: String,
    },

    /// Invalid argument at a call's acceptance point.
    #[error("Invalid argument: {message}")]
    InvalidArgument {
        /// Description of the invalid argument.
        message: String,
    },

    // ========================================================================
    // External Errors
    // ========================================================================
    /// IO error.
    #[error("IO error: {0}")]
    Io(#[from] IoError),

    /// JSON serialization error.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// WebSocket error.
    #[error("WebSocket error: {0}")]
    WebSocket(#[from] WsError),

    /// Image decode/encode error (screenshot cropping).
    #[error("Image error: {0}")]
    Image(#[from] image::ImageError),

    /// The transport link to the subprocess closed.
    ///
    /// The command queue translates this into [`Error::SessionClosed`] or
    /// [`Error::SubprocessCrashed`] depending on why the link went away.
    #[error("Transport closed")]
    TransportClosed,

    /// Channel receive error.
    #[error("Channel closed")]
    ChannelClosed(#[from] RecvError),
}

// ============================================================================
// Error Constructors
// ============================================================================

impl Error {
    /// Creates a configuration error.
    #[inline]
    pub fn config(message: impl Into<String>) -> Self {
        Self::Config {
            message: message.into(),
        }
    }

    /// Creates a binary-not-found error.
    #[inline]
    pub fn binary_not_found(path: impl Into<PathBuf>) -> Self {
        Self::BinaryNotFound { path: path.into() }
    }

    /// Creates a launch failed error.
    #[inline]
    pub fn launch_failed(err: IoError) -> Self {
        Self::LaunchFailed {
            message: err.to_string(),
        }
    }

    /// Creates a subprocess crashed error.
    #[inline]
    pub fn crashed(exit_code: Option<i32>) -> Self {
        Self::SubprocessCrashed { exit_code }
    }

    /// Creates a used-after-navigation error.
    #[inline]
    pub fn used_after_navigation(setter: &'static str) -> Self {
        Self::UsedAfterNavigation { setter }
    }

    /// Creates a timeout error with no observed value.
    #[inline]
    pub fn timed_out(operation: impl Into<String>, timeout_ms: u64) -> Self {
        Self::TimedOut {
            operation: operation.into(),
            timeout_ms,
            last_observed: None,
        }
    }

    /// Creates a timeout error carrying the last observed value.
    #[inline]
    pub fn timed_out_with(
        operation: impl Into<String>,
        timeout_ms: u64,
        last_observed: impl Into<String>,
    ) -> Self {
        Self::TimedOut {
            operation: operation.into(),
            timeout_ms,
            last_observed: Some(last_observed.into()),
        }
    }

    /// Creates a connection timeout error.
    #[inline]
    pub fn connection_timeout(timeout_ms: u64) -> Self {
        Self::ConnectionTimeout { timeout_ms }
    }

    /// Creates a frame not found error.
    #[inline]
    pub fn frame_not_found(target: impl Into<String>) -> Self {
        Self::FrameNotFound {
            target: target.into(),
        }
    }

    /// Creates a not-serializable error.
    #[inline]
    pub fn not_serializable(detail: impl Into<String>) -> Self {
        Self::NotSerializable {
            detail: detail.into(),
        }
    }

    /// Creates a script error.
    #[inline]
    pub fn script_error(message: impl Into<String>) -> Self {
        Self::ScriptError {
            message: message.into(),
        }
    }

    /// Creates a protocol error.
    #[inline]
    pub fn protocol(message: impl Into<String>) -> Self {
        Self::Protocol {
            message: message.into(),
        }
    }

    /// Creates an invalid argument error.
    #[inline]
    pub fn invalid_argument(message: impl Into<String>) -> Self {
        Self::InvalidArgument {
            message: message.into(),
        }
    }
}

// ============================================================================
// Error Predicates
// ============================================================================

impl Error {
    /// Returns `true` if this is a timeout error.
    #[inline]
    #[must_use]
    pub fn is_timeout(&self) -> bool {
        matches!(
            self,
            Self::TimedOut { .. } | Self::ConnectionTimeout { .. }
        )
    }

    /// Returns `true` if the session is unusable and commands can no longer
    /// be executed.
    #[inline]
    #[must_use]
    pub fn is_closed(&self) -> bool {
        matches!(
            self,
            Self::SessionClosed
                | Self::SubprocessCrashed { .. }
                | Self::TransportClosed
                | Self::ChannelClosed(_)
        )
    }

    /// Returns `true` if this is an ordering error the caller can fix by
    /// reordering configuration calls.
    #[inline]
    #[must_use]
    pub fn is_ordering_error(&self) -> bool {
        matches!(self, Self::UsedAfterNavigation { .. })
    }

    /// Returns `true` if this error is recoverable.
    ///
    /// Recoverable errors may succeed if the caller re-enqueues the command;
    /// the queue itself never retries.
    #[inline]
    #[must_use]
    pub fn is_recoverable(&self) -> bool {
        matches!(
            self,
            Self::TimedOut { .. } | Self::ConnectionTimeout { .. } | Self::FrameNotFound { .. }
        )
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    use std::io::ErrorKind;

    #[test]
    fn test_error_display() {
        let err = Error::config("missing binary path");
        assert_eq!(err.to_string(), "Configuration error: missing binary path");
    }

    #[test]
    fn test_used_after_navigation_display() {
        let err = Error::used_after_navigation("cookies");
        assert_eq!(
            err.to_string(),
            "cookies must be set before the first navigation"
        );
    }

    #[test]
    fn test_crashed_display() {
        let with_code = Error::crashed(Some(11));
        assert_eq!(
            with_code.to_string(),
            "Browser subprocess crashed (exit code 11)"
        );

        let without_code = Error::crashed(None);
        assert_eq!(without_code.to_string(), "Browser subprocess crashed");
    }

    #[test]
    fn test_is_timeout() {
        let timeout_err = Error::timed_out("waitForSelector(#pay)", 5000);
        let other_err = Error::protocol("test");

        assert!(timeout_err.is_timeout());
        assert!(!other_err.is_timeout());
    }

    #[test]
    fn test_timed_out_carries_last_observed() {
        let err = Error::timed_out_with("waitFor(fn)", 5000, "false");
        match err {
            Error::TimedOut { last_observed, .. } => {
                assert_eq!(last_observed.as_deref(), Some("false"));
            }
            other => panic!("unexpected variant: {other:?}"),
        }
    }

    #[test]
    fn test_is_closed() {
        assert!(Error::SessionClosed.is_closed());
        assert!(Error::crashed(None).is_closed());
        assert!(!Error::frame_not_found("nav").is_closed());
    }

    #[test]
    fn test_is_recoverable() {
        assert!(Error::timed_out("test", 1000).is_recoverable());
        assert!(!Error::config("test").is_recoverable());
        assert!(!Error::SessionClosed.is_recoverable());
    }

    #[test]
    fn test_from_io_error() {
        let io_err = IoError::new(ErrorKind::NotFound, "file not found");
        let err: Error = io_err.into();
        assert!(matches!(err, Error::Io(_)));
    }

    #[test]
    fn test_from_json_error() {
        let json_err = serde_json::from_str::<String>("invalid").unwrap_err();
        let err: Error = json_err.into();
        assert!(matches!(err, Error::Json(_)));
    }
}
