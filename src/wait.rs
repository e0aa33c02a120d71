//! Polling wait engine.
//!
//! Waits are queued operations like any other command: they hold their
//! place in the pipeline until the condition is satisfied or the deadline
//! passes. The engine never blocks a thread; selector and predicate
//! conditions are repeated evaluate round trips through the transport,
//! and next-page conditions read the session's load counter.
//!
//! # Policy
//!
//! - The condition is checked once immediately: an already-true condition
//!   resolves without waiting a poll interval.
//! - Timeout fires no earlier than the deadline and no later than one
//!   poll interval past it; the resulting [`Error::TimedOut`] carries the
//!   last observed value.
//! - Session close is observed at the next poll tick; the wait fails
//!   promptly with the close error instead of running out its timeout.

// ============================================================================
// Imports
// ============================================================================

use std::time::Duration;

use serde_json::Value;
use tokio::time::{Instant, sleep, sleep_until};
use tracing::{debug, trace};

use crate::error::{Error, Result};
use crate::protocol::{Command, Request, ScriptCommand};
use crate::session::state::SessionShared;

// ============================================================================
// Constants
// ============================================================================

/// Canned existence check behind `wait_for_selector`.
const SELECTOR_PRESENT: &str = "function(sel) { return document.querySelector(sel) !== null; }";

// ============================================================================
// WaitCondition
// ============================================================================

/// A condition the engine polls until satisfied.
#[derive(Debug, Clone)]
pub enum WaitCondition {
    /// Unconditional pause; resolves after the duration elapses.
    Pause(Duration),

    /// A CSS selector matches at least one element.
    Selector(String),

    /// The session load counter exceeds `baseline`.
    ///
    /// The baseline is captured when the wait is *enqueued*, so a
    /// navigation that finishes before this wait reaches the head of the
    /// queue still satisfies it.
    NextPage {
        /// Load count observed at enqueue time.
        baseline: u64,
    },

    /// A page-evaluated function returns `expected`.
    Predicate {
        /// JavaScript function source.
        script: String,
        /// Serializable arguments applied positionally.
        args: Vec<Value>,
        /// Value the function result is compared against.
        expected: Value,
    },
}

impl WaitCondition {
    /// Human-readable description used in timeout errors and logs.
    #[must_use]
    pub fn describe(&self) -> String {
        match self {
            Self::Pause(duration) => format!("wait({}ms)", duration.as_millis()),
            Self::Selector(selector) => format!("waitForSelector({selector})"),
            Self::NextPage { .. } => "waitForNextPage".to_string(),
            Self::Predicate { expected, .. } => format!("waitFor(fn == {expected})"),
        }
    }
}

// ============================================================================
// WaitParams
// ============================================================================

/// Timeout and cadence for one wait operation.
#[derive(Debug, Clone, Copy)]
pub struct WaitParams {
    /// Overall deadline for the wait.
    pub timeout: Duration,
    /// Poll cadence.
    pub interval: Duration,
}

// ============================================================================
// Engine
// ============================================================================

/// Runs a wait condition to completion on the queue worker.
///
/// # Errors
///
/// - [`Error::TimedOut`] when the deadline passes, carrying the last
///   observed value
/// - the session close error if the session closes mid-wait
/// - any transport/evaluation error from a poll round trip
pub(crate) async fn run(
    shared: &SessionShared,
    condition: &WaitCondition,
    params: WaitParams,
) -> Result<()> {
    let mut close_rx = shared.close_watch();

    // A pause is not a poll: it just sleeps, interruptible by close.
    if let WaitCondition::Pause(duration) = condition {
        trace!(session_id = %shared.id, ?duration, "Pausing");
        tokio::select! {
            _ = sleep(*duration) => return Ok(()),
            _ = close_rx.wait_for(Option::is_some) => {
                return Err(shared.closed_error().unwrap_or(Error::SessionClosed));
            }
        }
    }

    let deadline = Instant::now() + params.timeout;
    let timeout_ms = params.timeout.as_millis() as u64;
    let mut last_observed = Value::Null;

    loop {
        if let Some(err) = shared.closed_error() {
            debug!(session_id = %shared.id, condition = %condition.describe(), "Wait cancelled by close");
            return Err(err);
        }

        let observed = check(shared, condition).await?;
        let satisfied = is_satisfied(condition, &observed);

        trace!(
            session_id = %shared.id,
            condition = %condition.describe(),
            satisfied,
            "Wait poll"
        );

        if satisfied {
            return Ok(());
        }
        last_observed = observed;

        if Instant::now() >= deadline {
            break;
        }

        tokio::select! {
            _ = sleep(params.interval) => {}
            _ = sleep_until(deadline) => break,
            _ = close_rx.changed() => {}
        }
    }

    debug!(
        session_id = %shared.id,
        condition = %condition.describe(),
        timeout_ms,
        "Wait timed out"
    );

    Err(Error::timed_out_with(
        condition.describe(),
        timeout_ms,
        last_observed.to_string(),
    ))
}

/// Performs one observation of the condition.
async fn check(shared: &SessionShared, condition: &WaitCondition) -> Result<Value> {
    match condition {
        WaitCondition::Pause(_) => unreachable!("pause handled before the poll loop"),

        WaitCondition::NextPage { .. } => Ok(Value::from(shared.load_count())),

        WaitCondition::Selector(selector) => {
            evaluate_round_trip(shared, SELECTOR_PRESENT, vec![Value::from(selector.clone())])
                .await
        }

        WaitCondition::Predicate { script, args, .. } => {
            evaluate_round_trip(shared, script, args.clone()).await
        }
    }
}

/// Compares one observation against the condition's target.
fn is_satisfied(condition: &WaitCondition, observed: &Value) -> bool {
    match condition {
        WaitCondition::Pause(_) => true,
        WaitCondition::Selector(_) => observed.as_bool().unwrap_or(false),
        WaitCondition::NextPage { baseline } => {
            observed.as_u64().is_some_and(|count| count > *baseline)
        }
        WaitCondition::Predicate { expected, .. } => observed == expected,
    }
}

/// One evaluate round trip against the current frame.
async fn evaluate_round_trip(
    shared: &SessionShared,
    script: &str,
    args: Vec<Value>,
) -> Result<Value> {
    let frame = shared.state.lock().current_frame;
    let request = Request::new(
        frame,
        Command::Script(ScriptCommand::Evaluate {
            script: script.to_string(),
            args,
        }),
    );

    let response = shared.channel.send(request).await?;
    let result = response.into_result()?;
    Ok(result.get("value").cloned().unwrap_or(Value::Null))
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    use serde_json::json;

    #[test]
    fn test_describe() {
        assert_eq!(
            WaitCondition::Pause(Duration::from_millis(250)).describe(),
            "wait(250ms)"
        );
        assert_eq!(
            WaitCondition::Selector("#pay-button".into()).describe(),
            "waitForSelector(#pay-button)"
        );
        assert_eq!(
            WaitCondition::NextPage { baseline: 2 }.describe(),
            "waitForNextPage"
        );
    }

    #[test]
    fn test_selector_satisfaction() {
        let condition = WaitCondition::Selector("#x".into());
        assert!(is_satisfied(&condition, &json!(true)));
        assert!(!is_satisfied(&condition, &json!(false)));
        assert!(!is_satisfied(&condition, &Value::Null));
    }

    #[test]
    fn test_next_page_satisfaction() {
        let condition = WaitCondition::NextPage { baseline: 3 };
        assert!(!is_satisfied(&condition, &json!(3)));
        assert!(is_satisfied(&condition, &json!(4)));
    }

    #[test]
    fn test_predicate_satisfaction_compares_json() {
        let condition = WaitCondition::Predicate {
            script: "function() { return document.readyState; }".into(),
            args: vec![],
            expected: json!("complete"),
        };
        assert!(is_satisfied(&condition, &json!("complete")));
        assert!(!is_satisfied(&condition, &json!("loading")));
    }
}
