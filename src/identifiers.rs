//! Type-safe identifiers for session entities.
//!
//! Newtype wrappers prevent mixing incompatible IDs at compile time:
//! a [`RequestId`] correlates one command with its response, a
//! [`SessionId`] names one subprocess + queue pair, and a [`FrameId`]
//! addresses a frame within the page's frame tree.

// ============================================================================
// Imports
// ============================================================================

use std::fmt;
use std::sync::atomic::{AtomicU32, Ordering};

use serde::{Deserialize, Serialize};
use uuid::Uuid;

// ============================================================================
// RequestId
// ============================================================================

/// Unique identifier correlating a command request with its response.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct RequestId(Uuid);

impl RequestId {
    /// Generates a fresh random request ID.
    #[inline]
    #[must_use]
    pub fn generate() -> Self {
        Self(Uuid::new_v4())
    }

    /// The nil ID used by the subprocess for its ready handshake.
    #[inline]
    #[must_use]
    pub fn handshake() -> Self {
        Self(Uuid::nil())
    }
}

impl fmt::Display for RequestId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

// ============================================================================
// SessionId
// ============================================================================

/// Process-wide unique session identifier.
///
/// Assigned from a monotonically increasing counter; used in logs and in
/// the subprocess launch arguments.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SessionId(u32);

static NEXT_SESSION_ID: AtomicU32 = AtomicU32::new(1);

impl SessionId {
    /// Allocates the next session ID.
    #[inline]
    #[must_use]
    pub fn next() -> Self {
        Self(NEXT_SESSION_ID.fetch_add(1, Ordering::Relaxed))
    }

    /// Returns the raw numeric value.
    #[inline]
    #[must_use]
    pub fn value(self) -> u32 {
        self.0
    }
}

impl fmt::Display for SessionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

// ============================================================================
// FrameId
// ============================================================================

/// Identifier of a frame within the page.
///
/// `0` is always the main (top-level) frame. Subframe IDs are assigned by
/// the subprocess and are only meaningful within the current document;
/// navigation invalidates them.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct FrameId(u64);

impl FrameId {
    /// The main (top-level) frame.
    pub const MAIN: Self = Self(0);

    /// Creates a frame ID from a raw value.
    #[inline]
    #[must_use]
    pub fn new(id: u64) -> Self {
        Self(id)
    }

    /// Returns `true` if this is the main frame.
    #[inline]
    #[must_use]
    pub fn is_main(self) -> bool {
        self.0 == 0
    }

    /// Returns the raw numeric value.
    #[inline]
    #[must_use]
    pub fn value(self) -> u64 {
        self.0
    }
}

impl fmt::Display for FrameId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

// ============================================================================
// Tests
// ============================================================================
