//! Page navigation methods.

// ============================================================================
// Imports
// ============================================================================

use serde_json::Value;
use tracing::debug;
use url::Url;

use crate::error::{Error, Result};
use crate::protocol::{Command, HttpMethod, PageCommand};

use super::Page;

// ============================================================================
// Page - Navigation
// ============================================================================

impl Page {
    /// Loads the page at `url`.
    ///
    /// Any configuration recorded by the must-precede-navigation setters
    /// is applied before the request goes out.
    ///
    /// # Errors
    ///
    /// - [`Error::InvalidArgument`] for an unparsable URL
    /// - [`Error::TimedOut`] if the navigation exceeds the session timeout
    pub async fn open(&self, url: &str) -> Result<()> {
        self.navigate_with(url, HttpMethod::Get, None).await
    }

    /// POSTs form data to the page at `url`.
    ///
    /// `data` must be a JSON object; it is form-encoded into the request
    /// body.
    ///
    /// # Errors
    ///
    /// Same as [`Page::open`], plus [`Error::InvalidArgument`] if `data`
    /// is not an object.
    pub async fn post(&self, url: &str, data: &Value) -> Result<()> {
        let body = form_encode(data)?;
        self.navigate_with(url, HttpMethod::Post, Some(body)).await
    }

    /// PUTs form data to the page at `url`.
    ///
    /// # Errors
    ///
    /// Same as [`Page::post`].
    pub async fn put(&self, url: &str, data: &Value) -> Result<()> {
        let body = form_encode(data)?;
        self.navigate_with(url, HttpMethod::Put, Some(body)).await
    }

    /// Goes back to the previous page.
    pub async fn back(&self) -> Result<()> {
        debug!(session_id = %self.shared.id, "Navigating back");
        self.enqueue_navigation(Command::Page(PageCommand::GoBack))
            .await?;
        Ok(())
    }

    /// Goes forward to the next page.
    pub async fn forward(&self) -> Result<()> {
        debug!(session_id = %self.shared.id, "Navigating forward");
        self.enqueue_navigation(Command::Page(PageCommand::GoForward))
            .await?;
        Ok(())
    }

    /// Refreshes the current page.
    pub async fn reload(&self) -> Result<()> {
        debug!(session_id = %self.shared.id, "Reloading page");
        self.enqueue_navigation(Command::Page(PageCommand::Reload))
            .await?;
        Ok(())
    }

    /// HTTP status code of the last completed load.
    ///
    /// `None` before the first load finishes. Served from session state,
    /// not a live round trip: it describes the page just opened.
    #[inline]
    #[must_use]
    pub fn status(&self) -> Option<u16> {
        self.shared.state.lock().last_status
    }

    /// Shared navigation path for open/post/put.
    async fn navigate_with(
        &self,
        url: &str,
        http_method: HttpMethod,
        body: Option<String>,
    ) -> Result<()> {
        let parsed =
            Url::parse(url).map_err(|e| Error::invalid_argument(format!("bad URL {url:?}: {e}")))?;

        debug!(session_id = %self.shared.id, url = %parsed, ?http_method, "Navigating");

        self.enqueue_navigation(Command::Page(PageCommand::Navigate {
            url: parsed.into(),
            http_method,
            body,
        }))
        .await?;
        Ok(())
    }
}

// ============================================================================
// Helper Functions
// ============================================================================

/// Form-encodes a JSON object into `k=v&k2=v2` with percent escaping.
///
/// Non-string values are rendered as their JSON text.
fn form_encode(data: &Value) -> Result<String> {
    let object = data
        .as_object()
        .ok_or_else(|| Error::invalid_argument("request body must be a JSON object"))?;

    let pairs: Vec<String> = object
        .iter()
        .map(|(key, value)| {
            let rendered = match value {
                Value::String(s) => s.clone(),
                other => other.to_string(),
            };
            format!(
                "{}={}",
                urlencoding::encode(key),
                urlencoding::encode(&rendered)
            )
        })
        .collect();

    Ok(pairs.join("&"))
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    use serde_json::json;

    #[test]
    fn test_form_encode_simple() {
        let body = form_encode(&json!({ "user": "admin", "pin": 1234 })).expect("encode");
        assert_eq!(body, "pin=1234&user=admin");
    }

    #[test]
    fn test_form_encode_escapes() {
        let body = form_encode(&json!({ "q": "a b&c" })).expect("encode");
        assert_eq!(body, "q=a%20b%26c");
    }

    #[test]
    fn test_form_encode_rejects_non_object() {
        assert!(form_encode(&json!([1, 2, 3])).is_err());
        assert!(form_encode(&json!("plain")).is_err());
    }
}
