//! Function evaluation in the page context.

// ============================================================================
// Imports
// ============================================================================

use serde::de::DeserializeOwned;
use serde_json::Value;
use tracing::debug;

use crate::error::{Error, Result};
use crate::protocol::{Command, ScriptCommand};

use super::Page;

// ============================================================================
// Constants
// ============================================================================

/// Maximum number of arguments accepted by [`Page::evaluate`] and
/// [`Page::wait_for`](Page::wait_for).
pub const MAX_EVALUATE_ARGS: usize = 4;

// ============================================================================
// Page - Evaluation
// ============================================================================

impl Page {
    /// Invokes a JavaScript function on the page with up to four
    /// serializable arguments and returns its deserialized result.
    ///
    /// Useful for extracting information from the page:
    ///
    /// ```ignore
    /// let link_count: u64 = page
    ///     .evaluate(
    ///         "function(tag) { return document.getElementsByTagName(tag).length; }",
    ///         vec![serde_json::json!("a")],
    ///     )
    ///     .await?;
    /// ```
    ///
    /// # Errors
    ///
    /// - [`Error::InvalidArgument`] for more than four arguments
    /// - [`Error::NotSerializable`] if the function returns a DOM node,
    ///   function or other value that cannot cross the boundary
    /// - [`Error::ScriptError`] if the function throws
    pub async fn evaluate<T: DeserializeOwned>(
        &self,
        script: &str,
        args: Vec<Value>,
    ) -> Result<T> {
        let value = self.evaluate_value(script, args).await?;
        serde_json::from_value(value).map_err(Error::Json)
    }

    /// Like [`Page::evaluate`] but returns the raw JSON value.
    pub(crate) async fn evaluate_value(&self, script: &str, args: Vec<Value>) -> Result<Value> {
        check_arity(args.len())?;

        debug!(
            session_id = %self.shared.id,
            script_len = script.len(),
            args = args.len(),
            "Evaluating function"
        );

        let result = self
            .dispatch(Command::Script(ScriptCommand::Evaluate {
                script: script.to_string(),
                args,
            }))
            .await?;

        Ok(result.get("value").cloned().unwrap_or(Value::Null))
    }
}

// ============================================================================
// Helper Functions
// ============================================================================

/// Enforces the argument limit at the call's acceptance point.
pub(crate) fn check_arity(count: usize) -> Result<()> {
    if count > MAX_EVALUATE_ARGS {
        return Err(Error::invalid_argument(format!(
            "at most {MAX_EVALUATE_ARGS} evaluate arguments are supported, got {count}"
        )));
    }
    Ok(())
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_arity_limit() {
        assert!(check_arity(0).is_ok());
        assert!(check_arity(4).is_ok());
        assert!(matches!(
            check_arity(5),
            Err(Error::InvalidArgument { .. })
        ));
    }
}
