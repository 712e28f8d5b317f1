//! # LogWriter: event-to-`tracing` bridge.
//!
//! A minimal subscriber that forwards every [`Event`] to `tracing` under the
//! `fragvisor::events` target. Install any `tracing` subscriber to see it.
//!
//! ## Example output (fmt subscriber)
//! ```text
//! INFO fragvisor::events: task created task=6f1c… owner="billing" job="invoices"
//! DEBUG fragvisor::events: fragment picked task=6f1c… fragment=3 state=working
//! WARN fragvisor::events: attempt failed task="fetch" attempt=1 reason="application: busy"
//! DEBUG fragvisor::events: retry scheduled task="fetch" attempt=1 delay_ms=100
//! ```

use async_trait::async_trait;

use crate::events::{Event, EventKind};
use crate::subscribers::Subscribe;

/// Event writer subscriber.
#[derive(Default)]
pub struct LogWriter;

impl LogWriter {
    /// Construct a new [`LogWriter`].
    #[must_use]
    pub fn new() -> Self {
        Self
    }
}

#[async_trait]
impl Subscribe for LogWriter {
    async fn on_event(&self, e: &Event) {
        let task = e.task.as_deref().unwrap_or("-");
        let reason = e.reason.as_deref().unwrap_or("");

        match e.kind {
            EventKind::AttemptStarting => {
                tracing::trace!(target: "fragvisor::events", task, attempt = e.attempt, "attempt starting");
            }
            EventKind::AttemptFailed => {
                tracing::warn!(target: "fragvisor::events", task, attempt = e.attempt, reason, "attempt failed");
            }
            EventKind::RetryScheduled => {
                tracing::debug!(target: "fragvisor::events", task, attempt = e.attempt, delay_ms = e.delay_ms, "retry scheduled");
            }
            EventKind::RetrySucceeded => {
                tracing::info!(target: "fragvisor::events", task, attempt = e.attempt, "retry succeeded");
            }
            EventKind::RetryExhausted => {
                tracing::warn!(target: "fragvisor::events", task, attempt = e.attempt, reason, "retry exhausted");
            }
            EventKind::RetryEscalated => {
                tracing::error!(target: "fragvisor::events", task, attempt = e.attempt, reason, "retry escalated");
            }
            EventKind::RetryCanceled => {
                tracing::info!(target: "fragvisor::events", task, attempt = e.attempt, "retry canceled");
            }
            EventKind::HitFired => {
                tracing::debug!(target: "fragvisor::events", task, hits = e.attempt, "hit fired");
            }
            EventKind::HitSuppressed => {
                tracing::trace!(target: "fragvisor::events", task, hits = e.attempt, reason, "hit suppressed");
            }
            EventKind::TaskCreated => {
                tracing::info!(target: "fragvisor::events", task, owner = e.owner.as_deref(), job = e.job.as_deref(), "task created");
            }
            EventKind::FragmentPicked => {
                tracing::debug!(target: "fragvisor::events", task, fragment = e.fragment, state = ?e.state, "fragment picked");
            }
            EventKind::FragmentUpdated => {
                tracing::debug!(target: "fragvisor::events", task, fragment = e.fragment, state = ?e.state, "fragment updated");
            }
            EventKind::FragmentRejected => {
                tracing::warn!(target: "fragvisor::events", task, fragment = e.fragment, state = ?e.state, reason, "fragment rejected");
            }
            EventKind::SubscriberPanicked => {
                tracing::error!(target: "fragvisor::events", subscriber = task, reason, "subscriber panicked");
            }
            EventKind::SubscriberOverflow => {
                tracing::warn!(target: "fragvisor::events", subscriber = task, reason, "subscriber overflow");
            }
        }
    }

    fn name(&self) -> &'static str {
        "LogWriter"
    }
}
