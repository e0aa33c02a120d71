//! Unsolicited event messages pushed by the subprocess.
//!
//! Events are distinguished from responses by the presence of an `event`
//! field instead of a correlation `id`. The session uses
//! `page.loadFinished` to maintain the load counter that backs
//! [`Page::wait_for_next_page`](crate::Page::wait_for_next_page) and to
//! record the last navigation's URL and HTTP status.

// ============================================================================
// Imports
// ============================================================================

use serde::Deserialize;
use serde_json::Value;

// ============================================================================
// Event Names
// ============================================================================

/// A page load started (navigation committed).
pub const PAGE_LOAD_STARTED: &str = "page.loadStarted";

/// A page load finished; params carry `url` and `status`.
pub const PAGE_LOAD_FINISHED: &str = "page.loadFinished";

// ============================================================================
// Event
// ============================================================================

/// An unsolicited notification from the subprocess.
///
/// # Format
///
/// ```json
/// { "event": "page.loadFinished", "params": { "url": "...", "status": 200 } }
/// ```
#[derive(Debug, Clone, Deserialize)]
pub struct Event {
    /// Event name in `module.eventName` form.
    pub event: String,

    /// Event payload.
    #[serde(default)]
    pub params: Value,
}

impl Event {
    /// Returns `true` if this is a load-finished event.
    #[inline]
    #[must_use]
    pub fn is_load_finished(&self) -> bool {
        self.event == PAGE_LOAD_FINISHED
    }

    /// URL carried by the event, if any.
    #[inline]
    #[must_use]
    pub fn url(&self) -> Option<&str> {
        self.params.get("url").and_then(|v| v.as_str())
    }

    /// HTTP status carried by the event, if any.
    #[inline]
    #[must_use]
    pub fn status(&self) -> Option<u16> {
        self.params
            .get("status")
            .and_then(|v| v.as_u64())
            .and_then(|v| u16::try_from(v).ok())
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_load_finished_parsing() {
        let json = r#"{
            "event": "page.loadFinished",
            "params": { "url": "https://example.com", "status": 200 }
        }"#;

        let event: Event = serde_json::from_str(json).expect("parse");
        assert!(event.is_load_finished());
        assert_eq!(event.url(), Some("https://example.com"));
        assert_eq!(event.status(), Some(200));
    }

    #[test]
    fn test_event_without_params() {
        let json = r#"{ "event": "page.loadStarted" }"#;

        let event: Event = serde_json::from_str(json).expect("parse");
        assert_eq!(event.event, PAGE_LOAD_STARTED);
        assert!(!event.is_load_finished());
        assert_eq!(event.url(), None);
        assert_eq!(event.status(), None);
    }
}
