//! Command definitions organized by module.
//!
//! Commands follow `module.methodName` format on the wire.
//!
//! # Command Modules
//!
//! | Module | Commands |
//! |--------|----------|
//! | `page` | Navigation, status, viewport, zoom, scroll, pre-request config |
//! | `script` | JavaScript evaluation and injection |
//! | `input` | Synthetic mouse/keyboard events, file upload |
//! | `storage` | Cookies |
//! | `frame` | Live frame listing |
//! | `render` | Screenshots, PDF export |

// ============================================================================
// Imports
// ============================================================================

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::error::{Error, Result};

// ============================================================================
// Command Wrapper
// ============================================================================

/// All protocol commands organized by module.
///
/// This enum wraps module-specific command enums for unified serialization.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Command {
    /// Page module commands.
    Page(PageCommand),
    /// Script module commands.
    Script(ScriptCommand),
    /// Input module commands.
    Input(InputCommand),
    /// Storage module commands.
    Storage(StorageCommand),
    /// Frame module commands.
    Frame(FrameCommand),
    /// Render module commands.
    Render(RenderCommand),
}

// ============================================================================
// Page Commands
// ============================================================================

/// HTTP method used for a navigation request.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum HttpMethod {
    /// Plain page load.
    #[default]
    Get,
    /// Form submission via POST.
    Post,
    /// Form submission via PUT.
    Put,
}

/// Page module commands for navigation and page-level configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "method", content = "params")]
pub enum PageCommand {
    /// Navigate to a URL, optionally with a request body.
    #[serde(rename = "page.navigate")]
    Navigate {
        /// URL to navigate to.
        url: String,
        /// HTTP method for the request.
        #[serde(rename = "httpMethod", default)]
        http_method: HttpMethod,
        /// Form-encoded request body (POST/PUT only).
        #[serde(skip_serializing_if = "Option::is_none")]
        body: Option<String>,
    },

    /// Reload the current page.
    #[serde(rename = "page.reload")]
    Reload,

    /// Navigate back in history.
    #[serde(rename = "page.goBack")]
    GoBack,

    /// Navigate forward in history.
    #[serde(rename = "page.goForward")]
    GoForward,

    /// Report URL, HTTP status and load state of the current document.
    #[serde(rename = "page.status")]
    Status,

    /// Resize the viewport. Live-settable at any time.
    #[serde(rename = "page.setViewport")]
    SetViewport {
        /// Viewport width in pixels.
        width: u32,
        /// Viewport height in pixels.
        height: u32,
    },

    /// Set the page zoom factor. Live-settable at any time.
    #[serde(rename = "page.setZoom")]
    SetZoom {
        /// Zoom factor; `1.0` is 100%.
        factor: f64,
    },

    /// Scroll to an absolute document position. Live-settable at any time.
    #[serde(rename = "page.scrollTo")]
    ScrollTo {
        /// Offset from the document top in pixels.
        top: i64,
        /// Offset from the document left in pixels.
        left: i64,
    },

    /// Set the User-Agent for subsequent requests.
    #[serde(rename = "page.setUserAgent")]
    SetUserAgent {
        /// User-Agent string.
        value: String,
    },

    /// Set extra request headers for subsequent requests.
    #[serde(rename = "page.setHeaders")]
    SetHeaders {
        /// Header name/value pairs.
        headers: Map<String, Value>,
    },

    /// Set basic-auth credentials for subsequent requests.
    #[serde(rename = "page.setAuthentication")]
    SetAuthentication {
        /// Username.
        user: String,
        /// Password.
        password: String,
    },

    /// Route subsequent requests through a proxy.
    #[serde(rename = "page.setProxy")]
    SetProxy {
        /// Proxy host.
        host: String,
        /// Proxy port.
        port: u16,
        /// Proxy type: `http` or `socks5`.
        #[serde(rename = "type")]
        proxy_type: String,
        /// Username (optional).
        #[serde(skip_serializing_if = "Option::is_none")]
        username: Option<String>,
        /// Password (optional).
        #[serde(skip_serializing_if = "Option::is_none")]
        password: Option<String>,
    },
}

// ============================================================================
// Script Commands
// ============================================================================

/// Script module commands for JavaScript execution.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "method", content = "params")]
pub enum ScriptCommand {
    /// Evaluate a function body in the page and return its JSON value.
    #[serde(rename = "script.evaluate")]
    Evaluate {
        /// JavaScript function source.
        script: String,
        /// Serializable arguments applied positionally.
        #[serde(default)]
        args: Vec<Value>,
    },

    /// Inject inline JavaScript source into the page.
    #[serde(rename = "script.inject")]
    Inject {
        /// Script source text.
        source: String,
    },

    /// Include an external script on the page by URL.
    #[serde(rename = "script.includeUrl")]
    IncludeUrl {
        /// Script URL.
        url: String,
    },
}

// ============================================================================
// Input Commands
// ============================================================================

/// Input module commands for synthetic user interaction.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "method", content = "params")]
pub enum InputCommand {
    /// Dispatch a mouse event as if from real user interaction.
    #[serde(rename = "input.mouseEvent")]
    MouseEvent {
        /// Event type: `click`, `doubleclick`, `mousedown`, `mouseup`, `mousemove`.
        #[serde(rename = "eventType")]
        event_type: String,
        /// X coordinate in page pixels.
        #[serde(skip_serializing_if = "Option::is_none")]
        x: Option<i64>,
        /// Y coordinate in page pixels.
        #[serde(skip_serializing_if = "Option::is_none")]
        y: Option<i64>,
        /// Mouse button: `left`, `middle`, `right`.
        #[serde(default)]
        button: Option<String>,
    },

    /// Dispatch a keyboard event as if from real user interaction.
    #[serde(rename = "input.keyboardEvent")]
    KeyboardEvent {
        /// Event type: `keypress`, `keyup`, `keydown`.
        #[serde(rename = "eventType")]
        event_type: String,
        /// Platform key code.
        key: u32,
        /// Modifier mask in `ctrl+shift+alt` form.
        #[serde(skip_serializing_if = "Option::is_none")]
        modifiers: Option<String>,
    },

    /// Type text into an element, one synthetic key event per character.
    #[serde(rename = "input.typeText")]
    TypeText {
        /// CSS selector of the target element.
        selector: String,
        /// Text to type.
        text: String,
        /// Keyboard event type: `keypress`, `keyup`, `keydown`.
        #[serde(rename = "eventType")]
        event_type: String,
        /// Modifier mask in `ctrl+shift+alt` form.
        #[serde(skip_serializing_if = "Option::is_none")]
        modifiers: Option<String>,
    },

    /// Attach a local file to a file input element.
    #[serde(rename = "input.uploadFile")]
    UploadFile {
        /// CSS selector of the file input.
        selector: String,
        /// Absolute path of the file on the subprocess host.
        path: String,
    },
}

// ============================================================================
// Storage Commands
// ============================================================================

/// Storage module commands for cookie management.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "method", content = "params")]
pub enum StorageCommand {
    /// Replace the cookies used for subsequent requests.
    #[serde(rename = "storage.setCookies")]
    SetCookies {
        /// Normalized cookie list.
        cookies: Vec<Cookie>,
    },

    /// Get all cookies for the current page.
    #[serde(rename = "storage.getCookies")]
    GetCookies,

    /// Delete all cookies.
    #[serde(rename = "storage.clearCookies")]
    ClearCookies,
}

// ============================================================================
// Frame Commands
// ============================================================================

/// Frame module commands.
///
/// Frame *switching* is a client-side pointer move; the subprocess only
/// provides the live frame listing that switches resolve against.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "method", content = "params")]
pub enum FrameCommand {
    /// List all frames in the page as a flat parent-linked table.
    #[serde(rename = "frame.list")]
    List,
}

// ============================================================================
// Render Commands
// ============================================================================

/// Render module commands for page capture.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "method", content = "params")]
pub enum RenderCommand {
    /// Capture the page as a base64-encoded image.
    #[serde(rename = "render.screenshot")]
    Screenshot {
        /// Image format: `png`, `jpeg` or `gif`.
        format: String,
        /// JPEG quality 0-100 (ignored for other formats).
        #[serde(skip_serializing_if = "Option::is_none")]
        quality: Option<u8>,
    },

    /// Export the page as a base64-encoded PDF.
    #[serde(rename = "render.pdf")]
    Pdf {
        /// Paper size description (`format`, `orientation`, margins...).
        #[serde(rename = "paperSize")]
        paper_size: Value,
    },
}

// ============================================================================
// Cookie
// ============================================================================

/// Browser cookie with standard properties.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Cookie {
    /// Cookie name.
    pub name: String,
    /// Cookie value.
    pub value: String,
    /// Domain.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub domain: Option<String>,
    /// Path.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub path: Option<String>,
    /// Secure flag.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub secure: Option<bool>,
    /// HttpOnly flag.
    #[serde(rename = "httponly", skip_serializing_if = "Option::is_none")]
    pub http_only: Option<bool>,
    /// Expiration timestamp (seconds since the epoch).
    #[serde(rename = "expiry", skip_serializing_if = "Option::is_none")]
    pub expiry: Option<f64>,
}

impl Cookie {
    /// Creates a new cookie with name and value.
    #[inline]
    #[must_use]
    pub fn new(name: impl Into<String>, value: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            value: value.into(),
            domain: None,
            path: None,
            secure: None,
            http_only: None,
            expiry: None,
        }
    }

    /// Sets the domain.
    #[inline]
    #[must_use]
    pub fn with_domain(mut self, domain: impl Into<String>) -> Self {
        self.domain = Some(domain.into());
        self
    }

    /// Sets the path.
    #[inline]
    #[must_use]
    pub fn with_path(mut self, path: impl Into<String>) -> Self {
        self.path = Some(path.into());
        self
    }

    /// Sets the secure flag.
    #[inline]
    #[must_use]
    pub fn with_secure(mut self, secure: bool) -> Self {
        self.secure = Some(secure);
        self
    }

    /// Sets the httponly flag.
    #[inline]
    #[must_use]
    pub fn with_http_only(mut self, http_only: bool) -> Self {
        self.http_only = Some(http_only);
        self
    }

    /// Sets the expiration timestamp in seconds since the epoch.
    #[inline]
    #[must_use]
    pub fn with_expiry(mut self, expiry: f64) -> Self {
        self.expiry = Some(expiry);
        self
    }
}

// ============================================================================
// CookieInput
// ============================================================================

/// Accepted cookie input forms.
///
/// [`Page::cookies`](crate::Page::cookies) takes a single cookie, a list,
/// or a `"name=value; other=value"` header string; the session normalizes
/// all three into the list form before transmission.
#[derive(Debug, Clone)]
pub enum CookieInput {
    /// A single cookie.
    One(Cookie),
    /// A list of cookies.
    Many(Vec<Cookie>),
    /// A `Cookie:` header string, `name=value` pairs separated by `;`.
    Header(String),
}

impl CookieInput {
    /// Normalizes the input into a cookie list.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidArgument`] if a header-string pair has an
    /// empty name or no `=` separator.
    pub fn normalize(self) -> Result<Vec<Cookie>> {
        match self {
            Self::One(cookie) => Ok(vec![cookie]),
            Self::Many(cookies) => Ok(cookies),
            Self::Header(header) => parse_cookie_header(&header),
        }
    }
}

impl From<Cookie> for CookieInput {
    fn from(cookie: Cookie) -> Self {
        Self::One(cookie)
    }
}

impl From<Vec<Cookie>> for CookieInput {
    fn from(cookies: Vec<Cookie>) -> Self {
        Self::Many(cookies)
    }
}

impl From<&str> for CookieInput {
    fn from(header: &str) -> Self {
        Self::Header(header.to_string())
    }
}

impl From<String> for CookieInput {
    fn from(header: String) -> Self {
        Self::Header(header)
    }
}

/// Parses a `Cookie:` header string into a cookie list.
///
/// Empty segments (from trailing `;`) are skipped; values may contain `=`.
fn parse_cookie_header(header: &str) -> Result<Vec<Cookie>> {
    let mut cookies = Vec::new();

    for pair in header.split(';') {
        let pair = pair.trim();
        if pair.is_empty() {
            continue;
        }

        let (name, value) = pair.split_once('=').ok_or_else(|| {
            Error::invalid_argument(format!("cookie pair without '=': {pair:?}"))
        })?;

        let name = name.trim();
        if name.is_empty() {
            return Err(Error::invalid_argument(format!(
                "cookie pair with empty name: {pair:?}"
            )));
        }

        cookies.push(Cookie::new(name, value.trim()));
    }

    Ok(cookies)
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_page_navigate_serialization() {
        let cmd = PageCommand::Navigate {
            url: "https://example.com".to_string(),
            http_method: HttpMethod::Get,
            body: None,
        };
        let json = serde_json::to_string(&cmd).expect("serialize");
        assert!(json.contains("page.navigate"));
        assert!(json.contains("https://example.com"));
        assert!(json.contains("GET"));
        assert!(!json.contains("body"));
    }

    #[test]
    fn test_post_navigate_carries_body() {
        let cmd = PageCommand::Navigate {
            url: "https://example.com/form".to_string(),
            http_method: HttpMethod::Post,
            body: Some("a=1&b=2".to_string()),
        };
        let json = serde_json::to_string(&cmd).expect("serialize");
        assert!(json.contains("POST"));
        assert!(json.contains("a=1&b=2"));
    }

    #[test]
    fn test_script_evaluate_serialization() {
        let cmd = ScriptCommand::Evaluate {
            script: "function() { return document.title; }".to_string(),
            args: vec![],
        };
        let json = serde_json::to_string(&cmd).expect("serialize");
        assert!(json.contains("script.evaluate"));
        assert!(json.contains("document.title"));
    }

    #[test]
    fn test_frame_list_serialization() {
        let cmd = FrameCommand::List;
        let json = serde_json::to_string(&cmd).expect("serialize");
        assert!(json.contains("frame.list"));
    }

    #[test]
    fn test_cookie_builder() {
        let cookie = Cookie::new("session", "abc123")
            .with_domain(".example.com")
            .with_path("/")
            .with_secure(true)
            .with_http_only(true)
            .with_expiry(1_900_000_000.0);

        assert_eq!(cookie.name, "session");
        assert_eq!(cookie.value, "abc123");
        assert_eq!(cookie.domain, Some(".example.com".to_string()));
        assert_eq!(cookie.secure, Some(true));
        assert_eq!(cookie.expiry, Some(1_900_000_000.0));
    }

    #[test]
    fn test_cookie_input_one_and_many() {
        let one = CookieInput::from(Cookie::new("a", "1")).normalize().unwrap();
        assert_eq!(one.len(), 1);

        let many = CookieInput::from(vec![Cookie::new("a", "1"), Cookie::new("b", "2")])
            .normalize()
            .unwrap();
        assert_eq!(many.len(), 2);
    }

    #[test]
    fn test_cookie_header_parsing() {
        let cookies = CookieInput::from("a=1; b=2; token=x=y;")
            .normalize()
            .expect("parse");
        assert_eq!(cookies.len(), 3);
        assert_eq!(cookies[0], Cookie::new("a", "1"));
        assert_eq!(cookies[1], Cookie::new("b", "2"));
        // Values may themselves contain '='.
        assert_eq!(cookies[2], Cookie::new("token", "x=y"));
    }

    #[test]
    fn test_cookie_header_rejects_malformed() {
        assert!(CookieInput::from("no-separator").normalize().is_err());
        assert!(CookieInput::from("=orphan-value").normalize().is_err());
    }

    mod properties {
        use super::super::*;
        use proptest::prelude::*;

        proptest! {
            // Well-formed name=value pairs always parse back to the same
            // names and values, regardless of whitespace packing.
            #[test]
            fn header_parsing_preserves_pairs(
                pairs in prop::collection::vec(("[a-zA-Z][a-zA-Z0-9_-]{0,8}", "[a-zA-Z0-9_/+-]{0,12}"), 1..6)
            ) {
                let header = pairs
                    .iter()
                    .map(|(k, v)| format!("{k}={v}"))
                    .collect::<Vec<_>>()
                    .join("; ");

                let cookies = parse_cookie_header(&header).expect("well-formed header");
                prop_assert_eq!(cookies.len(), pairs.len());
                for (cookie, (k, v)) in cookies.iter().zip(&pairs) {
                    prop_assert_eq!(&cookie.name, k);
                    prop_assert_eq!(&cookie.value, v);
                }
            }

            // Arbitrary input must never panic the parser.
            #[test]
            fn header_parsing_never_panics(header in ".{0,64}") {
                let _ = parse_cookie_header(&header);
            }
        }
    }
}
