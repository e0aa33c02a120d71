//! Page configuration setters.
//!
//! Two families with different ordering rules:
//!
//! - **Must precede navigation** — [`Page::cookies`], [`Page::user_agent`],
//!   [`Page::headers`], [`Page::authentication`], [`Page::set_proxy`].
//!   These record intended state that the queue flushes to the subprocess
//!   ahead of the first navigation. Calling one after a navigation has
//!   been enqueued returns
//!   [`Error::UsedAfterNavigation`](crate::Error::UsedAfterNavigation) —
//!   uniformly across all five.
//! - **Live-settable** — [`Page::viewport`], [`Page::scroll_to`],
//!   [`Page::zoom`]. Queued commands that apply immediately, before or
//!   after navigation.

// ============================================================================
// Imports
// ============================================================================

use serde_json::{Map, Value};
use tracing::debug;

use crate::error::Result;
use crate::protocol::{Command, CookieInput, PageCommand};
use crate::session::state::PendingConfig;

use super::Page;

// ============================================================================
// ProxyType
// ============================================================================

/// Proxy protocol for [`ProxyConfig`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ProxyType {
    /// HTTP proxy (default).
    #[default]
    Http,
    /// SOCKS5 proxy.
    Socks5,
}

impl ProxyType {
    /// Wire value for the protocol.
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Http => "http",
            Self::Socks5 => "socks5",
        }
    }
}

// ============================================================================
// ProxyConfig
// ============================================================================

/// Per-page proxy settings.
///
/// # Example
///
/// ```
/// use stirrup::{ProxyConfig, ProxyType};
///
/// let proxy = ProxyConfig::new("10.0.0.1", 3128)
///     .with_type(ProxyType::Socks5)
///     .with_auth("user", "secret");
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProxyConfig {
    /// Proxy host.
    pub host: String,
    /// Proxy port.
    pub port: u16,
    /// Proxy protocol.
    pub proxy_type: ProxyType,
    /// Username for proxy authentication.
    pub username: Option<String>,
    /// Password for proxy authentication.
    pub password: Option<String>,
}

impl ProxyConfig {
    /// Creates an HTTP proxy configuration without authentication.
    #[inline]
    #[must_use]
    pub fn new(host: impl Into<String>, port: u16) -> Self {
        Self {
            host: host.into(),
            port,
            proxy_type: ProxyType::Http,
            username: None,
            password: None,
        }
    }

    /// Sets the proxy protocol.
    #[inline]
    #[must_use]
    pub fn with_type(mut self, proxy_type: ProxyType) -> Self {
        self.proxy_type = proxy_type;
        self
    }

    /// Sets the authentication credentials.
    #[inline]
    #[must_use]
    pub fn with_auth(mut self, username: impl Into<String>, password: impl Into<String>) -> Self {
        self.username = Some(username.into());
        self.password = Some(password.into());
        self
    }

    /// Converts the settings into the wire command.
    pub(crate) fn into_command(self) -> PageCommand {
        PageCommand::SetProxy {
            host: self.host,
            port: self.port,
            proxy_type: self.proxy_type.as_str().to_string(),
            username: self.username,
            password: self.password,
        }
    }
}

// ============================================================================
// Page - Must-precede-navigation setters
// ============================================================================

impl Page {
    /// Sets the cookies used when requesting pages.
    ///
    /// Accepts a single [`Cookie`](crate::Cookie), a `Vec<Cookie>`, or a
    /// `"name=value; other=value"` header string; all forms are normalized
    /// to a list before transmission.
    ///
    /// # Errors
    ///
    /// - [`Error::UsedAfterNavigation`](crate::Error::UsedAfterNavigation)
    ///   once a navigation has been enqueued
    /// - [`Error::InvalidArgument`](crate::Error::InvalidArgument) for a
    ///   malformed header string
    pub fn cookies(&self, input: impl Into<CookieInput>) -> Result<&Self> {
        let cookies = input.into().normalize()?;
        self.record_pending("cookies", |pending| pending.cookies = Some(cookies))
    }

    /// Sets the User-Agent used when requesting pages.
    ///
    /// # Errors
    ///
    /// [`Error::UsedAfterNavigation`](crate::Error::UsedAfterNavigation)
    /// once a navigation has been enqueued.
    pub fn user_agent(&self, user_agent: impl Into<String>) -> Result<&Self> {
        let value = user_agent.into();
        self.record_pending("userAgent", |pending| pending.user_agent = Some(value))
    }

    /// Sets extra headers sent with page requests.
    ///
    /// # Errors
    ///
    /// [`Error::UsedAfterNavigation`](crate::Error::UsedAfterNavigation)
    /// once a navigation has been enqueued.
    pub fn headers(&self, headers: Map<String, Value>) -> Result<&Self> {
        self.record_pending("headers", |pending| pending.headers = Some(headers))
    }

    /// Sets basic-auth credentials for page requests.
    ///
    /// # Errors
    ///
    /// [`Error::UsedAfterNavigation`](crate::Error::UsedAfterNavigation)
    /// once a navigation has been enqueued.
    pub fn authentication(
        &self,
        user: impl Into<String>,
        password: impl Into<String>,
    ) -> Result<&Self> {
        let credentials = (user.into(), password.into());
        self.record_pending("authentication", |pending| {
            pending.authentication = Some(credentials);
        })
    }

    /// Routes page requests through a proxy.
    ///
    /// # Errors
    ///
    /// [`Error::UsedAfterNavigation`](crate::Error::UsedAfterNavigation)
    /// once a navigation has been enqueued.
    pub fn set_proxy(&self, proxy: ProxyConfig) -> Result<&Self> {
        self.record_pending("setProxy", |pending| pending.proxy = Some(proxy))
    }

    /// Records a pending setting, rejecting it once navigated.
    fn record_pending(
        &self,
        setter: &'static str,
        apply: impl FnOnce(&mut PendingConfig),
    ) -> Result<&Self> {
        let mut state = self.shared.state.lock();
        if state.navigated {
            return Err(crate::error::Error::used_after_navigation(setter));
        }

        apply(&mut state.pending);
        debug!(session_id = %self.shared.id, setter, "Recorded pre-navigation setting");
        Ok(self)
    }
}

// ============================================================================
// Page - Live setters
// ============================================================================

impl Page {
    /// Sets the viewport size.
    ///
    /// Live-settable: takes effect immediately, before or after
    /// navigation. Useful for screenshotting.
    pub async fn viewport(&self, width: u32, height: u32) -> Result<()> {
        self.dispatch_main(Command::Page(PageCommand::SetViewport { width, height }))
            .await?;
        Ok(())
    }

    /// Scrolls to a position relative to the top left of the document.
    ///
    /// Live-settable.
    pub async fn scroll_to(&self, top: i64, left: i64) -> Result<()> {
        self.dispatch_main(Command::Page(PageCommand::ScrollTo { top, left }))
            .await?;
        Ok(())
    }

    /// Sets the zoom factor; `1.0` is 100%.
    ///
    /// Live-settable. Combine with [`Page::viewport`] for high-DPI
    /// screenshots.
    pub async fn zoom(&self, factor: f64) -> Result<()> {
        self.dispatch_main(Command::Page(PageCommand::SetZoom { factor }))
            .await?;
        Ok(())
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    use std::time::Duration;

    use serde_json::json;

    use crate::error::Error;
    use crate::protocol::Cookie;
    use crate::testing::{Reply, scripted_page};

    #[tokio::test]
    async fn test_must_precede_setters_reject_after_navigation_uniformly() {
        let (_shared, page) =
            scripted_page(|_, _| Some((Reply::success(json!({})), Duration::ZERO))).await;

        // All five record fine before navigation and chain.
        page.cookies(Cookie::new("session", "abc"))
            .and_then(|p| p.user_agent("bot/1.0"))
            .and_then(|p| p.headers(Map::new()))
            .and_then(|p| p.authentication("user", "pass"))
            .and_then(|p| p.set_proxy(ProxyConfig::new("proxy.local", 8080)))
            .expect("pre-navigation configuration");

        page.open("https://example.com").await.expect("open");

        // And all five reject identically afterwards.
        assert!(matches!(
            page.cookies("a=1"),
            Err(Error::UsedAfterNavigation { setter: "cookies" })
        ));
        assert!(matches!(
            page.user_agent("late/1.0"),
            Err(Error::UsedAfterNavigation { setter: "userAgent" })
        ));
        assert!(matches!(
            page.headers(Map::new()),
            Err(Error::UsedAfterNavigation { setter: "headers" })
        ));
        assert!(matches!(
            page.authentication("u", "p"),
            Err(Error::UsedAfterNavigation { setter: "authentication" })
        ));
        assert!(matches!(
            page.set_proxy(ProxyConfig::new("late.local", 1080)),
            Err(Error::UsedAfterNavigation { setter: "setProxy" })
        ));
    }

    #[tokio::test]
    async fn test_viewport_is_live_settable_around_navigation() {
        let (_shared, page) = scripted_page(|method, params| {
            if method == "page.setViewport" {
                assert!(params["width"].as_u64().is_some());
            }
            Some((Reply::success(json!({})), Duration::ZERO))
        })
        .await;

        page.viewport(800, 600).await.expect("before navigation");
        page.open("https://example.com").await.expect("open");
        page.viewport(1024, 768).await.expect("after navigation");
        page.scroll_to(0, 120).await.expect("scroll");
        page.zoom(2.0).await.expect("zoom");
    }

    #[tokio::test]
    async fn test_pending_configuration_flushes_before_first_navigate() {
        use std::sync::Arc;

        use crate::testing::scripted_session_with;

        let responder = Arc::new(|_: &str, _: &serde_json::Value| {
            Some((Reply::success(json!({})), Duration::ZERO))
        });
        let (shared, queue, mut seen) = scripted_session_with(responder).await;
        let page = Page::new(Arc::clone(&shared), queue);

        page.user_agent("bot/1.0").expect("ua");
        page.cookies("a=1").expect("cookies");
        page.open("https://example.com").await.expect("open");

        // Configuration reaches the wire ahead of the navigation.
        assert_eq!(seen.recv().await.as_deref(), Some("page.setUserAgent"));
        assert_eq!(seen.recv().await.as_deref(), Some("storage.setCookies"));
        assert_eq!(seen.recv().await.as_deref(), Some("page.navigate"));
    }

    #[test]
    fn test_proxy_config_builder() {
        let proxy = ProxyConfig::new("10.0.0.1", 3128)
            .with_type(ProxyType::Socks5)
            .with_auth("user", "secret");

        assert_eq!(proxy.host, "10.0.0.1");
        assert_eq!(proxy.port, 3128);
        assert_eq!(proxy.proxy_type, ProxyType::Socks5);
        assert_eq!(proxy.username.as_deref(), Some("user"));
    }

    #[test]
    fn test_proxy_into_command() {
        let command = ProxyConfig::new("proxy.local", 8080).into_command();
        match command {
            PageCommand::SetProxy {
                host,
                port,
                proxy_type,
                username,
                ..
            } => {
                assert_eq!(host, "proxy.local");
                assert_eq!(port, 8080);
                assert_eq!(proxy_type, "http");
                assert!(username.is_none());
            }
            other => panic!("unexpected command: {other:?}"),
        }
    }
}
