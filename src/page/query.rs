//! Canned DOM queries.
//!
//! Each helper is a fixed evaluate call against a selector, returning a
//! typed scalar. "Not found" recovers into defined values — `exists` and
//! `visible` resolve to `false`, `count` to `0`, text-like helpers to an
//! empty string — rather than failing.

// ============================================================================
// Imports
// ============================================================================

use serde_json::{Value, json};

use crate::error::Result;
use crate::protocol::{Command, Cookie, StorageCommand};

use super::Page;

// ============================================================================
// Canned Scripts
// ============================================================================

const TITLE: &str = "function() { return document.title; }";

const URL: &str = "function() { return document.location.href; }";

const TEXT_OF: &str = "function(sel) {
    var el = document.querySelector(sel);
    return el ? el.textContent : '';
}";

const TEXT_OF_BODY: &str = "function() { return document.body.textContent; }";

const HTML_OF: &str = "function(sel) {
    var el = document.querySelector(sel);
    return el ? el.innerHTML : '';
}";

const HTML_OF_PAGE: &str = "function() { return document.documentElement.outerHTML; }";

const ATTRIBUTE_OF: &str = "function(sel, name) {
    var el = document.querySelector(sel);
    return el ? (el.getAttribute(name) || '') : '';
}";

const CSS_PROPERTY_OF: &str = "function(sel, prop) {
    var el = document.querySelector(sel);
    return el ? window.getComputedStyle(el).getPropertyValue(prop) : '';
}";

const VALUE_OF: &str = "function(sel) {
    var el = document.querySelector(sel);
    return el ? el.value : '';
}";

const SET_VALUE_OF: &str = "function(sel, value) {
    var el = document.querySelector(sel);
    if (el) { el.value = value; }
}";

const EXISTS: &str = "function(sel) { return document.querySelector(sel) !== null; }";

const VISIBLE: &str = "function(sel) {
    var el = document.querySelector(sel);
    if (!el) { return false; }
    var style = window.getComputedStyle(el);
    return style.display !== 'none'
        && style.visibility !== 'hidden'
        && el.offsetWidth > 0
        && el.offsetHeight > 0;
}";

const COUNT: &str = "function(sel) { return document.querySelectorAll(sel).length; }";

const WIDTH_OF: &str = "function(sel) {
    var el = document.querySelector(sel);
    return el ? el.getBoundingClientRect().width : 0;
}";

const HEIGHT_OF: &str = "function(sel) {
    var el = document.querySelector(sel);
    return el ? el.getBoundingClientRect().height : 0;
}";

// ============================================================================
// Page - Queries
// ============================================================================

impl Page {
    /// Gets the title of the current page.
    pub async fn title(&self) -> Result<String> {
        self.string_query(TITLE, vec![]).await
    }

    /// Gets the URL of the current page.
    pub async fn url(&self) -> Result<String> {
        self.string_query(URL, vec![]).await
    }

    /// Gets the text inside an element, or of the whole page body when no
    /// selector is given.
    pub async fn text(&self, selector: Option<&str>) -> Result<String> {
        match selector {
            Some(sel) => self.string_query(TEXT_OF, vec![json!(sel)]).await,
            None => self.string_query(TEXT_OF_BODY, vec![]).await,
        }
    }

    /// Gets the HTML inside an element, or of the entire page when no
    /// selector is given.
    pub async fn html(&self, selector: Option<&str>) -> Result<String> {
        match selector {
            Some(sel) => self.string_query(HTML_OF, vec![json!(sel)]).await,
            None => self.string_query(HTML_OF_PAGE, vec![]).await,
        }
    }

    /// Gets an attribute of an element.
    pub async fn attribute(&self, selector: &str, attribute: &str) -> Result<String> {
        self.string_query(ATTRIBUTE_OF, vec![json!(selector), json!(attribute)])
            .await
    }

    /// Gets a computed CSS property of an element.
    pub async fn css_property(&self, selector: &str, property: &str) -> Result<String> {
        self.string_query(CSS_PROPERTY_OF, vec![json!(selector), json!(property)])
            .await
    }

    /// Gets the value of a form element.
    pub async fn value(&self, selector: &str) -> Result<String> {
        self.string_query(VALUE_OF, vec![json!(selector)]).await
    }

    /// Sets the value of a form element.
    pub async fn set_value(&self, selector: &str, value: &str) -> Result<()> {
        self.evaluate_value(SET_VALUE_OF, vec![json!(selector), json!(value)])
            .await?;
        Ok(())
    }

    /// Determines whether the selector matches any element.
    ///
    /// Resolves to `false` for an unmatched selector; never fails on
    /// "not found".
    pub async fn exists(&self, selector: &str) -> Result<bool> {
        let value = self.evaluate_value(EXISTS, vec![json!(selector)]).await?;
        Ok(value.as_bool().unwrap_or(false))
    }

    /// Determines whether the first matched element is visible.
    ///
    /// Resolves to `false` for an unmatched selector.
    pub async fn visible(&self, selector: &str) -> Result<bool> {
        let value = self.evaluate_value(VISIBLE, vec![json!(selector)]).await?;
        Ok(value.as_bool().unwrap_or(false))
    }

    /// Counts the elements matching the selector.
    ///
    /// Resolves to `0` for an unmatched selector.
    pub async fn count(&self, selector: &str) -> Result<u64> {
        let value = self.evaluate_value(COUNT, vec![json!(selector)]).await?;
        Ok(value.as_u64().unwrap_or(0))
    }

    /// Gets the layout width of an element in pixels.
    pub async fn width(&self, selector: &str) -> Result<f64> {
        let value = self.evaluate_value(WIDTH_OF, vec![json!(selector)]).await?;
        Ok(value.as_f64().unwrap_or(0.0))
    }

    /// Gets the layout height of an element in pixels.
    pub async fn height(&self, selector: &str) -> Result<f64> {
        let value = self.evaluate_value(HEIGHT_OF, vec![json!(selector)]).await?;
        Ok(value.as_f64().unwrap_or(0.0))
    }

    /// Gets all cookies for the current page.
    pub async fn get_cookies(&self) -> Result<Vec<Cookie>> {
        let result = self
            .dispatch_main(Command::Storage(StorageCommand::GetCookies))
            .await?;

        let cookies = result
            .get("cookies")
            .cloned()
            .unwrap_or_else(|| Value::Array(vec![]));

        serde_json::from_value(cookies).map_err(crate::error::Error::Json)
    }

    /// Runs a canned script and coerces the result into a string.
    async fn string_query(&self, script: &str, args: Vec<Value>) -> Result<String> {
        let value = self.evaluate_value(script, args).await?;
        Ok(match value {
            Value::String(s) => s,
            Value::Null => String::new(),
            other => other.to_string(),
        })
    }
}

// ============================================================================
// Tests
// ============================================================================
