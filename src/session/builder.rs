//! Builder pattern for session configuration.
//!
//! Provides a fluent API for configuring and creating [`Session`]
//! instances. A session is an explicit factory product: there is no
//! process-wide default client.
//!
//! # Example
//!
//! ```no_run
//! use stirrup::Session;
//!
//! # async fn example() -> stirrup::Result<()> {
//! let session = Session::builder()
//!     .binary("/usr/local/bin/browser-shim")
//!     .timeout_ms(8000)
//!     .load_images(false)
//!     .build()
//!     .await?;
//! # Ok(())
//! # }
//! ```

// ============================================================================
// Imports
// ============================================================================

use std::path::PathBuf;
use std::time::Duration;

use crate::error::{Error, Result};

use super::Session;

// ============================================================================
// Constants
// ============================================================================

/// Default wait/navigation timeout (5s).
const DEFAULT_TIMEOUT: Duration = Duration::from_millis(5000);

/// Default wait poll interval (50ms).
const DEFAULT_INTERVAL: Duration = Duration::from_millis(50);

// ============================================================================
// SslProtocol
// ============================================================================

/// SSL protocol accepted for secure connections.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SslProtocol {
    /// Negotiate any protocol (default).
    #[default]
    Any,
    /// TLSv1 only.
    TlsV1,
    /// SSLv3 only.
    SslV3,
    /// SSLv2 only.
    SslV2,
}

impl SslProtocol {
    /// Command-line value for the launch arguments.
    #[must_use]
    pub fn as_arg(self) -> &'static str {
        match self {
            Self::Any => "any",
            Self::TlsV1 => "tlsv1",
            Self::SslV3 => "sslv3",
            Self::SslV2 => "sslv2",
        }
    }
}

// ============================================================================
// SessionOptions
// ============================================================================

/// Launch and runtime options for a session.
///
/// Collected by [`SessionBuilder`]; the launch-relevant subset is turned
/// into subprocess arguments by [`SessionOptions::to_args`].
#[derive(Debug, Clone)]
pub struct SessionOptions {
    /// Wait/navigation timeout.
    pub timeout: Duration,
    /// Wait poll interval.
    pub interval: Duration,
    /// Fixed transport port; `None` = ephemeral.
    pub port: Option<u16>,
    /// Load inlined images.
    pub load_images: bool,
    /// Ignore SSL errors (expired or self-signed certificates).
    pub ignore_ssl_errors: bool,
    /// SSL protocol for secure connections.
    pub ssl_protocol: SslProtocol,
    /// Enforce web security (forbid cross-domain XHR).
    pub web_security: bool,
    /// Process-level proxy in `host:port` form.
    pub proxy: Option<String>,
    /// Process-level proxy type (`http`, `socks5`).
    pub proxy_type: Option<String>,
    /// Process-level proxy credentials in `user:pass` form.
    pub proxy_auth: Option<String>,
}

impl Default for SessionOptions {
    fn default() -> Self {
        Self {
            timeout: DEFAULT_TIMEOUT,
            interval: DEFAULT_INTERVAL,
            port: None,
            load_images: true,
            ignore_ssl_errors: false,
            ssl_protocol: SslProtocol::Any,
            web_security: true,
            proxy: None,
            proxy_type: None,
            proxy_auth: None,
        }
    }
}

impl SessionOptions {
    /// Builds the subprocess launch arguments.
    ///
    /// The control URL is appended separately at launch, once the
    /// transport endpoint is bound.
    #[must_use]
    pub fn to_args(&self) -> Vec<String> {
        fn yes_no(flag: bool) -> &'static str {
            if flag { "yes" } else { "no" }
        }

        let mut args = vec![
            "--headless".to_string(),
            format!("--load-images={}", yes_no(self.load_images)),
            format!("--ignore-ssl-errors={}", yes_no(self.ignore_ssl_errors)),
            format!("--ssl-protocol={}", self.ssl_protocol.as_arg()),
            format!("--web-security={}", yes_no(self.web_security)),
        ];

        if let Some(ref proxy) = self.proxy {
            args.push(format!("--proxy={proxy}"));
        }
        if let Some(ref proxy_type) = self.proxy_type {
            args.push(format!("--proxy-type={proxy_type}"));
        }
        if let Some(ref proxy_auth) = self.proxy_auth {
            args.push(format!("--proxy-auth={proxy_auth}"));
        }

        args
    }
}

// ============================================================================
// SessionBuilder
// ============================================================================

/// Builder for configuring a [`Session`] instance.
///
/// Use [`Session::builder()`] to create a new builder.
#[derive(Debug, Default, Clone)]
pub struct SessionBuilder {
    /// Path to the browser control binary.
    binary: Option<PathBuf>,
    /// Local JavaScript files injected after every page load.
    client_scripts: Vec<PathBuf>,
    /// Collected options.
    options: SessionOptions,
}

impl SessionBuilder {
    /// Creates a new builder with default options.
    #[inline]
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the path to the browser control binary.
    #[inline]
    #[must_use]
    pub fn binary(mut self, path: impl Into<PathBuf>) -> Self {
        self.binary = Some(path.into());
        self
    }

    /// Sets the wait/navigation timeout in milliseconds (default 5000).
    #[inline]
    #[must_use]
    pub fn timeout_ms(mut self, timeout_ms: u64) -> Self {
        self.options.timeout = Duration::from_millis(timeout_ms);
        self
    }

    /// Sets the wait poll interval in milliseconds (default 50).
    #[inline]
    #[must_use]
    pub fn interval_ms(mut self, interval_ms: u64) -> Self {
        self.options.interval = Duration::from_millis(interval_ms);
        self
    }

    /// Pins the transport port (default: ephemeral).
    #[inline]
    #[must_use]
    pub fn port(mut self, port: u16) -> Self {
        self.options.port = Some(port);
        self
    }

    /// Controls whether inlined images are loaded (default true).
    #[inline]
    #[must_use]
    pub fn load_images(mut self, load_images: bool) -> Self {
        self.options.load_images = load_images;
        self
    }

    /// Ignores SSL errors such as self-signed certificates (default false).
    #[inline]
    #[must_use]
    pub fn ignore_ssl_errors(mut self, ignore: bool) -> Self {
        self.options.ignore_ssl_errors = ignore;
        self
    }

    /// Sets the SSL protocol for secure connections (default any).
    #[inline]
    #[must_use]
    pub fn ssl_protocol(mut self, protocol: SslProtocol) -> Self {
        self.options.ssl_protocol = protocol;
        self
    }

    /// Enables or disables web security (default enabled).
    #[inline]
    #[must_use]
    pub fn web_security(mut self, enabled: bool) -> Self {
        self.options.web_security = enabled;
        self
    }

    /// Sets a process-level proxy in `host:port` form.
    #[inline]
    #[must_use]
    pub fn proxy(mut self, proxy: impl Into<String>) -> Self {
        self.options.proxy = Some(proxy.into());
        self
    }

    /// Sets the process-level proxy type (`http`, `socks5`).
    #[inline]
    #[must_use]
    pub fn proxy_type(mut self, proxy_type: impl Into<String>) -> Self {
        self.options.proxy_type = Some(proxy_type.into());
        self
    }

    /// Sets process-level proxy credentials in `user:pass` form.
    #[inline]
    #[must_use]
    pub fn proxy_auth(mut self, proxy_auth: impl Into<String>) -> Self {
        self.options.proxy_auth = Some(proxy_auth.into());
        self
    }

    /// Adds a local JavaScript file to inject after every page load.
    #[inline]
    #[must_use]
    pub fn client_script(mut self, path: impl Into<PathBuf>) -> Self {
        self.client_scripts.push(path.into());
        self
    }

    /// Builds the session: validates configuration, binds the transport,
    /// launches the subprocess and completes the handshake.
    ///
    /// # Errors
    ///
    /// - [`Error::Config`] if the binary is not set
    /// - [`Error::BinaryNotFound`] if the binary path doesn't exist
    /// - [`Error::Io`] if a client script cannot be read
    /// - [`Error::LaunchFailed`] / [`Error::ConnectionTimeout`] on launch
    pub async fn build(self) -> Result<Session> {
        let binary = self.validate_binary()?;
        let client_scripts = self.read_client_scripts()?;

        Session::launch(binary, self.options, client_scripts).await
    }
}

// ============================================================================
// Validation
// ============================================================================

impl SessionBuilder {
    /// Validates the binary path configuration.
    fn validate_binary(&self) -> Result<PathBuf> {
        let binary = self.binary.clone().ok_or_else(|| {
            Error::config(
                "Browser binary path is required. Use .binary() to set it.\n\
                 Example: Session::builder().binary(\"/usr/local/bin/browser-shim\")",
            )
        })?;

        if !binary.exists() {
            return Err(Error::binary_not_found(&binary));
        }

        Ok(binary)
    }

    /// Reads client script files into memory.
    fn read_client_scripts(&self) -> Result<Vec<String>> {
        self.client_scripts
            .iter()
            .map(|path| std::fs::read_to_string(path).map_err(Error::from))
            .collect()
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_options() {
        let options = SessionOptions::default();
        assert_eq!(options.timeout, Duration::from_millis(5000));
        assert_eq!(options.interval, Duration::from_millis(50));
        assert!(options.load_images);
        assert!(options.web_security);
        assert!(options.port.is_none());
    }

    #[test]
    fn test_to_args_defaults() {
        let args = SessionOptions::default().to_args();
        assert!(args.contains(&"--headless".to_string()));
        assert!(args.contains(&"--load-images=yes".to_string()));
        assert!(args.contains(&"--ignore-ssl-errors=no".to_string()));
        assert!(args.contains(&"--ssl-protocol=any".to_string()));
        assert!(args.contains(&"--web-security=yes".to_string()));
        assert!(!args.iter().any(|a| a.starts_with("--proxy")));
    }

    #[test]
    fn test_to_args_with_proxy() {
        let mut options = SessionOptions::default();
        options.proxy = Some("127.0.0.1:8080".to_string());
        options.proxy_type = Some("socks5".to_string());
        options.proxy_auth = Some("user:pass".to_string());

        let args = options.to_args();
        assert!(args.contains(&"--proxy=127.0.0.1:8080".to_string()));
        assert!(args.contains(&"--proxy-type=socks5".to_string()));
        assert!(args.contains(&"--proxy-auth=user:pass".to_string()));
    }

    #[test]
    fn test_builder_collects_options() {
        let builder = SessionBuilder::new()
            .binary("/bin/true")
            .timeout_ms(10_000)
            .interval_ms(25)
            .load_images(false);

        assert_eq!(builder.options.timeout, Duration::from_millis(10_000));
        assert_eq!(builder.options.interval, Duration::from_millis(25));
        assert!(!builder.options.load_images);
    }

    #[tokio::test]
    async fn test_build_fails_without_binary() {
        let result = SessionBuilder::new().build().await;
        assert!(matches!(result, Err(Error::Config { .. })));
    }

    #[tokio::test]
    async fn test_build_fails_with_missing_binary() {
        let result = SessionBuilder::new()
            .binary("/nonexistent/browser-shim")
            .build()
            .await;
        assert!(matches!(result, Err(Error::BinaryNotFound { .. })));
    }
}
