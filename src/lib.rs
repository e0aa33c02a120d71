//! Stirrup - headless-browser automation client.
//!
//! This library drives a headless-browser control subprocess through a
//! strictly ordered command pipeline: every page-affecting call is queued
//! and executed in submission order, with waits holding their place in
//! the pipeline.
//!
//! # Architecture
//!
//! Each [`Session`] owns one subprocess, one transport channel and one
//! command queue:
//!
//! - **Transport**: the client binds a local WebSocket endpoint; the
//!   subprocess connects back and speaks a correlated request/response
//!   protocol with `module.methodName` commands
//! - **CommandQueue**: all page operations are serialized FIFO; one
//!   failed command fails only its own future
//! - **WaitEngine**: polling waits (selector, next-page, predicate) run
//!   as queued operations with immediate-check and per-operation timeout
//! - **ProcessSupervisor**: launches and monitors the subprocess; a crash
//!   fails every queued and future command until a new session is built
//!
//! # Quick Start
//!
//! ```no_run
//! use stirrup::{Result, Session};
//!
//! #[tokio::main]
//! async fn main() -> Result<()> {
//!     // Sessions are explicit factory products; several can run in
//!     // parallel, each with its own subprocess.
//!     let session = Session::builder()
//!         .binary("/usr/local/bin/browser-shim")
//!         .build()
//!         .await?;
//!
//!     let page = session.page();
//!     page.user_agent("stirrup/0.1")?;
//!     page.open("https://example.com/login").await?;
//!     page.type_text("#user", "admin", None).await?;
//!     page.click("#submit").await?;
//!     page.wait_for_next_page().await?;
//!     println!("landed on {}", page.url().await?);
//!
//!     session.close().await?;
//!     Ok(())
//! }
//! ```
//!
//! # Modules
//!
//! | Module | Description |
//! |--------|-------------|
//! | [`session`] | Session lifecycle, builder, command queue |
//! | [`page`] | Page handle: navigation, queries, interaction, frames |
//! | [`wait`] | Wait conditions and the polling engine |
//! | [`process`] | Subprocess supervision |
//! | [`transport`] | WebSocket endpoint and channel (internal) |
//! | [`protocol`] | Wire message types (internal) |
//! | [`error`] | Error types and [`Result`] alias |
//! | [`identifiers`] | Type-safe ID wrappers |

// ============================================================================
// Modules
// ============================================================================

/// Error types and result aliases.
///
/// All fallible operations return [`Result<T>`] which uses [`Error`].
pub mod error;

/// Type-safe identifiers for session entities.
pub mod identifiers;

/// Page handle and caller-facing operations.
pub mod page;

/// Browser subprocess supervision.
pub mod process;

/// Wire protocol message types.
///
/// Internal module defining command/response/event structures.
pub mod protocol;

/// Session lifecycle and coordination.
pub mod session;

/// WebSocket transport layer.
///
/// Internal module handling endpoint binding and the channel event loop.
pub mod transport;

/// Polling wait engine.
pub mod wait;

#[cfg(test)]
pub(crate) mod testing;

// ============================================================================
// Re-exports
// ============================================================================

// Session types
pub use session::{Session, SessionBuilder, SessionOptions, SslProtocol};

// Page types
pub use page::{
    BoundingBox, CropTarget, FrameInfo, FrameTarget, ImageFormat, Page, PaperSize, ProxyConfig,
    ProxyType, TypingOptions,
};

// Wait types
pub use wait::WaitCondition;

// Protocol types the public API surfaces
pub use protocol::{Cookie, CookieInput, HttpMethod};

// Error types
pub use error::{Error, Result};

// Identifier types
pub use identifiers::{FrameId, RequestId, SessionId};
