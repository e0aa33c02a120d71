//! Queued wait operations.
//!
//! Waits hold their place in the command pipeline: operations enqueued
//! after a wait do not start until the wait resolves. Timeout and poll
//! interval come from the session options (defaults: 5000ms / 50ms).

// ============================================================================
// Imports
// ============================================================================

use std::time::Duration;

use serde_json::Value;
use tracing::debug;

use crate::error::Result;
use crate::wait::WaitCondition;

use super::Page;
use super::evaluate::check_arity;

// ============================================================================
// Page - Waiting
// ============================================================================

impl Page {
    /// Waits for `ms` milliseconds.
    pub async fn wait(&self, ms: u64) -> Result<()> {
        self.enqueue_wait(WaitCondition::Pause(Duration::from_millis(ms)))
            .await
    }

    /// Waits until the selector is present on the page.
    ///
    /// ```ignore
    /// page.wait_for_selector("#pay-button").await?;
    /// ```
    ///
    /// # Errors
    ///
    /// [`Error::TimedOut`](crate::Error::TimedOut) if the selector does
    /// not appear within the session timeout.
    pub async fn wait_for_selector(&self, selector: &str) -> Result<()> {
        self.enqueue_wait(WaitCondition::Selector(selector.to_string()))
            .await
    }

    /// Waits until a page finishes loading, typically after a click.
    ///
    /// The load-count baseline is captured *now*, at enqueue time: a
    /// navigation triggered by an earlier queued command satisfies this
    /// wait even if it finishes before the wait reaches the head of the
    /// queue.
    pub async fn wait_for_next_page(&self) -> Result<()> {
        let baseline = self.shared.load_count();
        debug!(session_id = %self.shared.id, baseline, "Waiting for next page");

        self.enqueue_wait(WaitCondition::NextPage { baseline }).await
    }

    /// Waits until `script`, evaluated on the page with `args`, returns
    /// `expected`.
    ///
    /// ```ignore
    /// page.wait_for(
    ///     "function() { return document.readyState; }",
    ///     vec![],
    ///     serde_json::json!("complete"),
    /// ).await?;
    /// ```
    ///
    /// # Errors
    ///
    /// - [`Error::InvalidArgument`](crate::Error::InvalidArgument) for
    ///   more than four arguments
    /// - [`Error::TimedOut`](crate::Error::TimedOut) carrying the last
    ///   observed value
    pub async fn wait_for(&self, script: &str, args: Vec<Value>, expected: Value) -> Result<()> {
        check_arity(args.len())?;

        self.enqueue_wait(WaitCondition::Predicate {
            script: script.to_string(),
            args,
            expected,
        })
        .await
    }

    /// Like [`Page::wait_for`] but with an explicit timeout and poll
    /// interval for this wait only, overriding the session defaults.
    pub async fn wait_for_with(
        &self,
        script: &str,
        args: Vec<Value>,
        expected: Value,
        timeout_ms: u64,
        interval_ms: u64,
    ) -> Result<()> {
        check_arity(args.len())?;

        self.enqueue_wait_with(
            WaitCondition::Predicate {
                script: script.to_string(),
                args,
                expected,
            },
            crate::wait::WaitParams {
                timeout: Duration::from_millis(timeout_ms),
                interval: Duration::from_millis(interval_ms),
            },
        )
        .await
    }
}

// ============================================================================
// Tests
// ============================================================================
