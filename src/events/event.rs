//! # Events emitted by retry loops, interceptors and equipartition tasks.
//!
//! The [`EventKind`] enum classifies events in four groups:
//! - **Retry events**: attempts, scheduled waits and final outcomes of a retry loop
//! - **Interceptor events**: hits fired or suppressed by an invocation policy
//! - **Equipartition events**: task creation and fragment transitions
//! - **Subscriber events**: overflow/panic reports from the fan-out workers
//!
//! The [`Event`] struct carries the optional metadata relevant to each kind.
//!
//! ## Ordering guarantees
//! Each event has a globally unique sequence number (`seq`) that increases monotonically.
//!
//! ## Example
//! ```rust
//! use std::time::Duration;
//! use fragvisor::{Event, EventKind};
//!
//! let ev = Event::new(EventKind::RetryScheduled)
//!     .with_task("sync-orders")
//!     .with_attempt(2)
//!     .with_delay(Duration::from_millis(30));
//!
//! assert_eq!(ev.kind, EventKind::RetryScheduled);
//! assert_eq!(ev.task.as_deref(), Some("sync-orders"));
//! assert_eq!(ev.delay_ms, Some(30));
//! ```

use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering as AtomicOrdering};
use std::time::{Duration, SystemTime};

use crate::equipartition::FragmentState;

/// Global sequence counter for event ordering.
static EVENT_SEQ: AtomicU64 = AtomicU64::new(0);

/// Classification of events.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EventKind {
    // === Retry loop ===
    /// An attempt is about to run.
    ///
    /// Sets: `task` (retry task name), `attempt` (1-based)
    AttemptStarting,

    /// An attempt returned an error.
    ///
    /// Sets: `task`, `attempt`, `reason`
    AttemptFailed,

    /// Next attempt scheduled after a wait.
    ///
    /// Sets: `task`, `attempt` (the failed one), `delay_ms`
    RetryScheduled,

    /// The action succeeded.
    ///
    /// Sets: `task`, `attempt`
    RetrySucceeded,

    /// The schedule refused further retries; the result is a failure.
    ///
    /// Sets: `task`, `attempt`, `reason` (last error)
    RetryExhausted,

    /// The error handler demanded a stop.
    ///
    /// Sets: `task`, `attempt`, `reason` (escalated error)
    RetryEscalated,

    /// Cancellation was observed before an attempt or during backoff.
    ///
    /// Sets: `task`, `attempt`
    RetryCanceled,

    // === Interceptor ===
    /// A hit was delivered to the intercepted action.
    ///
    /// Sets: `task` (interceptor name), `attempt` (hits in the batch)
    HitFired,

    /// A hit was dropped, superseded or discarded with its batch.
    ///
    /// Sets: `task`, `reason` (`throttled`, `superseded`, `below_min`, `above_max`, `reset`)
    HitSuppressed,

    // === Equipartition ===
    /// The container materialized a new task.
    ///
    /// Sets: `task` (task id), `owner`, `job`
    TaskCreated,

    /// A fragment was claimed by `pick`.
    ///
    /// Sets: `task`, `job`, `fragment`, `state` (`working` or `retrying`)
    FragmentPicked,

    /// A fragment outcome was recorded.
    ///
    /// Sets: `task`, `job`, `fragment`, `state` (new state)
    FragmentUpdated,

    /// An update was refused (foreign fragment or illegal transition).
    ///
    /// Sets: `task`, `fragment`, `state` (requested), `reason`
    FragmentRejected,

    // === Subscribers ===
    /// Subscriber panicked during event processing.
    ///
    /// Sets: `task` (subscriber name), `reason` (panic message)
    SubscriberPanicked,

    /// Subscriber dropped an event (queue full or worker closed).
    ///
    /// Sets: `task` (subscriber name), `reason`
    SubscriberOverflow,
}

/// Event with optional metadata.
///
/// - `seq`: monotonic global sequence for ordering
/// - `at`: wall-clock timestamp (for logs)
/// - other optional fields are set depending on the [`EventKind`]
#[derive(Clone, Debug)]
pub struct Event {
    /// Globally unique, monotonically increasing sequence number.
    pub seq: u64,
    /// Wall-clock timestamp.
    pub at: SystemTime,
    /// Event classification.
    pub kind: EventKind,

    /// Source name: retry task, interceptor, subscriber or equipartition task id.
    pub task: Option<Arc<str>>,
    /// Owner key of an equipartition task.
    pub owner: Option<Arc<str>>,
    /// Job key of an equipartition task.
    pub job: Option<Arc<str>>,
    /// Fragment ordinal.
    pub fragment: Option<u32>,
    /// Fragment state after (or requested by) the transition.
    pub state: Option<FragmentState>,
    /// Attempt or hit count.
    pub attempt: Option<u32>,
    /// Wait before the next attempt in milliseconds (compact).
    pub delay_ms: Option<u32>,
    /// Human-readable reason (errors, suppression cause, etc.).
    pub reason: Option<Arc<str>>,
}

impl Event {
    /// Creates a new event of the given kind with current timestamp and next sequence number.
    pub fn new(kind: EventKind) -> Self {
        Self {
            seq: EVENT_SEQ.fetch_add(1, AtomicOrdering::Relaxed),
            at: SystemTime::now(),
            kind,
            task: None,
            owner: None,
            job: None,
            fragment: None,
            state: None,
            attempt: None,
            delay_ms: None,
            reason: None,
        }
    }

    /// Attaches a source name.
    #[inline]
    pub fn with_task(mut self, task: impl Into<Arc<str>>) -> Self {
        self.task = Some(task.into());
        self
    }

    /// Attaches an owner key.
    #[inline]
    pub fn with_owner(mut self, owner: impl Into<Arc<str>>) -> Self {
        self.owner = Some(owner.into());
        self
    }

    /// Attaches a job key.
    #[inline]
    pub fn with_job(mut self, job: impl Into<Arc<str>>) -> Self {
        self.job = Some(job.into());
        self
    }

    /// Attaches a fragment ordinal and state.
    #[inline]
    pub fn with_fragment(mut self, index: u32, state: FragmentState) -> Self {
        self.fragment = Some(index);
        self.state = Some(state);
        self
    }

    /// Attaches an attempt count.
    #[inline]
    pub fn with_attempt(mut self, n: u32) -> Self {
        self.attempt = Some(n);
        self
    }

    /// Attaches a wait (stored as milliseconds).
    #[inline]
    pub fn with_delay(mut self, d: Duration) -> Self {
        let ms = d.as_millis().min(u128::from(u32::MAX)) as u32;
        self.delay_ms = Some(ms);
        self
    }

    /// Attaches a human-readable reason.
    #[inline]
    pub fn with_reason(mut self, reason: impl Into<Arc<str>>) -> Self {
        self.reason = Some(reason.into());
        self
    }

    /// Creates a subscriber overflow event.
    #[inline]
    pub fn subscriber_overflow(subscriber: &'static str, reason: &'static str) -> Self {
        Event::new(EventKind::SubscriberOverflow)
            .with_task(subscriber)
            .with_reason(reason)
    }

    /// Creates a subscriber panic event.
    #[inline]
    pub fn subscriber_panicked(subscriber: &'static str, info: String) -> Self {
        Event::new(EventKind::SubscriberPanicked)
            .with_task(subscriber)
            .with_reason(info)
    }

    #[inline]
    pub fn is_subscriber_overflow(&self) -> bool {
        matches!(self.kind, EventKind::SubscriberOverflow)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_seq_is_monotonic() {
        let a = Event::new(EventKind::HitFired);
        let b = Event::new(EventKind::HitFired);
        assert!(b.seq > a.seq);
    }

    #[test]
    fn test_delay_saturates() {
        let ev = Event::new(EventKind::RetryScheduled).with_delay(Duration::MAX);
        assert_eq!(ev.delay_ms, Some(u32::MAX));
    }

    #[test]
    fn test_fragment_metadata() {
        let ev = Event::new(EventKind::FragmentPicked)
            .with_job("job-1")
            .with_fragment(3, FragmentState::Working);
        assert_eq!(ev.job.as_deref(), Some("job-1"));
        assert_eq!(ev.fragment, Some(3));
        assert_eq!(ev.state, Some(FragmentState::Working));
    }
}
