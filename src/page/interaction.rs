//! Page interaction methods.
//!
//! Form helpers (`click`, `select`, `clear`) are canned evaluates that
//! fail with a script error when the selector matches nothing — unlike
//! the query helpers, interacting with a missing element is a caller bug.
//! Typing and raw mouse/keyboard events go through input commands so the
//! subprocess synthesizes them as real user interaction.

// ============================================================================
// Imports
// ============================================================================

use serde_json::json;
use tracing::debug;

use crate::error::Result;
use crate::protocol::{Command, InputCommand, ScriptCommand};

use super::Page;

// ============================================================================
// Canned Scripts
// ============================================================================

const CLICK: &str = "function(sel) {
    var el = document.querySelector(sel);
    if (!el) { throw new Error('no element matches: ' + sel); }
    el.click();
}";

const SELECT: &str = "function(sel, value) {
    var el = document.querySelector(sel);
    if (!el) { throw new Error('no element matches: ' + sel); }
    el.value = value;
    el.dispatchEvent(new Event('change', { bubbles: true }));
}";

const CLEAR: &str = "function(sel) {
    var el = document.querySelector(sel);
    if (!el) { throw new Error('no element matches: ' + sel); }
    el.value = '';
    el.dispatchEvent(new Event('change', { bubbles: true }));
}";

// ============================================================================
// TypingOptions
// ============================================================================

/// Options for [`Page::type_text`].
#[derive(Debug, Clone, Default)]
pub struct TypingOptions {
    /// Keyboard event type: `keypress` (default), `keyup` or `keydown`.
    pub event_type: Option<String>,
    /// Modifier keys in `ctrl+shift+alt` form.
    pub modifiers: Option<String>,
}

impl TypingOptions {
    fn event_type(&self) -> String {
        self.event_type
            .clone()
            .unwrap_or_else(|| "keypress".to_string())
    }
}

// ============================================================================
// Page - Interaction
// ============================================================================

impl Page {
    /// Clicks the first element matching the selector.
    ///
    /// # Errors
    ///
    /// [`Error::ScriptError`](crate::Error::ScriptError) if the selector
    /// matches nothing.
    pub async fn click(&self, selector: &str) -> Result<()> {
        debug!(session_id = %self.shared.id, selector, "Clicking");
        self.evaluate_value(CLICK, vec![json!(selector)]).await?;
        Ok(())
    }

    /// Sets the value of a select element and fires its change event.
    pub async fn select(&self, selector: &str, value: &str) -> Result<()> {
        debug!(session_id = %self.shared.id, selector, "Selecting");
        self.evaluate_value(SELECT, vec![json!(selector), json!(value)])
            .await?;
        Ok(())
    }

    /// Clears the value of an element.
    pub async fn clear(&self, selector: &str) -> Result<()> {
        debug!(session_id = %self.shared.id, selector, "Clearing");
        self.evaluate_value(CLEAR, vec![json!(selector)]).await?;
        Ok(())
    }

    /// Types text into the selector element, one synthetic key event per
    /// character.
    pub async fn type_text(
        &self,
        selector: &str,
        text: &str,
        options: Option<TypingOptions>,
    ) -> Result<()> {
        let options = options.unwrap_or_default();
        debug!(
            session_id = %self.shared.id,
            selector,
            chars = text.len(),
            "Typing"
        );

        self.dispatch(Command::Input(InputCommand::TypeText {
            selector: selector.to_string(),
            text: text.to_string(),
            event_type: options.event_type(),
            modifiers: options.modifiers,
        }))
        .await?;
        Ok(())
    }

    /// Attaches a local file to a file input element.
    pub async fn upload(&self, selector: &str, path: &str) -> Result<()> {
        debug!(session_id = %self.shared.id, selector, path, "Uploading file");
        self.dispatch(Command::Input(InputCommand::UploadFile {
            selector: selector.to_string(),
            path: path.to_string(),
        }))
        .await?;
        Ok(())
    }

    /// Injects a local JavaScript file onto the page.
    ///
    /// The file is read on the client side and shipped as source.
    pub async fn inject_js(&self, path: &str) -> Result<()> {
        let source = tokio::fs::read_to_string(path).await?;
        debug!(session_id = %self.shared.id, path, bytes = source.len(), "Injecting script file");

        self.dispatch(Command::Script(ScriptCommand::Inject { source }))
            .await?;
        Ok(())
    }

    /// Includes an external JavaScript script on the page via URL.
    pub async fn include_js(&self, url: &str) -> Result<()> {
        debug!(session_id = %self.shared.id, url, "Including remote script");
        self.dispatch(Command::Script(ScriptCommand::IncludeUrl {
            url: url.to_string(),
        }))
        .await?;
        Ok(())
    }

    /// Sends a raw mouse event to the page.
    ///
    /// `event_type` is one of `mouseup`, `mousedown`, `mousemove`,
    /// `doubleclick` or `click`; `button` is `left`, `middle` or `right`.
    pub async fn mouse_event(
        &self,
        event_type: &str,
        x: Option<i64>,
        y: Option<i64>,
        button: Option<&str>,
    ) -> Result<()> {
        self.dispatch(Command::Input(InputCommand::MouseEvent {
            event_type: event_type.to_string(),
            x,
            y,
            button: button.map(str::to_string),
        }))
        .await?;
        Ok(())
    }

    /// Sends a raw keyboard event to the page.
    ///
    /// `event_type` is one of `keyup`, `keydown` or `keypress`; `key` is
    /// the platform key code.
    pub async fn keyboard_event(
        &self,
        event_type: &str,
        key: u32,
        modifiers: Option<&str>,
    ) -> Result<()> {
        self.dispatch(Command::Input(InputCommand::KeyboardEvent {
            event_type: event_type.to_string(),
            key,
            modifiers: modifiers.map(str::to_string),
        }))
        .await?;
        Ok(())
    }
}

// ============================================================================
// Tests
// ============================================================================
