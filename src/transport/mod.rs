//! Transport layer to the browser subprocess.
//!
//! # Architecture
//!
//! ```text
//! ┌─────────────────┐                              ┌─────────────────┐
//! │ Session (Rust)  │                              │  Browser        │
//! │                 │         WebSocket            │  Subprocess     │
//! │ PendingEndpoint │◄────────────────────────────►│                 │
//! │ → Channel       │      localhost:PORT          │  Control Shim   │
//! │                 │                              │                 │
//! └─────────────────┘                              └─────────────────┘
//! ```
//!
//! # Connection Lifecycle
//!
//! 1. `PendingEndpoint::bind` - Bind to localhost (ephemeral port)
//! 2. Launch the subprocess with the endpoint's `ws://` URL
//! 3. `PendingEndpoint::accept` - Wait for the subprocess to connect
//! 4. `Channel` - Send requests, receive responses/events
//! 5. `Channel::shutdown` - Close the link, failing pending requests
//!
//! # Modules
//!
//! | Module | Description |
//! |--------|-------------|
//! | `channel` | WebSocket channel and event loop |
//! | `endpoint` | Endpoint binding and acceptance |

// ============================================================================
// Submodules
// ============================================================================

/// WebSocket channel and event loop.
pub mod channel;

/// WebSocket endpoint binding and acceptance.
pub mod endpoint;

// ============================================================================
// Re-exports
// ============================================================================

pub use channel::{Channel, EventCallback, ReadyData};
pub use endpoint::PendingEndpoint;
