//! # Per-operation retry tracker.
//!
//! [`RetryInstance`] records when each retry was granted and asks its
//! [`RetryPolicy`] for the next wait. One instance serves one operation;
//! the policy it borrows can be shared by any number of instances.
//!
//! ## Rules
//! - `process_time()` only grows, one entry per granted retry
//! - A refused retry (`None`) records nothing
//! - Once disabled, `next()` always refuses
//! - A panicking schedule counts as a refusal

use std::fmt;
use std::panic::{self, AssertUnwindSafe};
use std::time::{Duration, Instant};

use crate::policies::retry::RetryPolicy;

/// Stateful retry tracker bound to a schedule.
pub struct RetryInstance<'p> {
    policy: &'p dyn RetryPolicy,
    history: Vec<Instant>,
    disabled: bool,
}

impl<'p> RetryInstance<'p> {
    /// Creates an empty tracker for `policy`.
    pub fn new(policy: &'p dyn RetryPolicy) -> Self {
        Self {
            policy,
            history: Vec::new(),
            disabled: false,
        }
    }

    /// Grants the next retry: records the current instant and returns the wait.
    ///
    /// Returns `None` (recording nothing) when disabled or when the schedule refuses.
    pub fn next(&mut self) -> Option<Duration> {
        let wait = self.peek()?;
        self.history.push(Instant::now());
        Some(wait)
    }

    /// Whether [`next`](Self::next) would grant a retry right now.
    pub fn need(&self) -> bool {
        self.peek().is_some()
    }

    /// Instants at which retries were granted, oldest first.
    pub fn process_time(&self) -> &[Instant] {
        &self.history
    }

    /// Number of retries granted so far.
    pub fn attempts(&self) -> usize {
        self.history.len()
    }

    /// Stops granting retries for the rest of this instance's life.
    pub fn disable(&mut self) {
        self.disabled = true;
    }

    /// True once [`disable`](Self::disable) was called.
    pub fn is_disabled(&self) -> bool {
        self.disabled
    }

    fn peek(&self) -> Option<Duration> {
        if self.disabled {
            return None;
        }
        match panic::catch_unwind(AssertUnwindSafe(|| {
            self.policy.next_interval(&self.history)
        })) {
            Ok(wait) => wait,
            Err(_) => {
                tracing::warn!(
                    attempts = self.history.len(),
                    "retry schedule panicked; treating as no retry"
                );
                None
            }
        }
    }
}

impl fmt::Debug for RetryInstance<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RetryInstance")
            .field("attempts", &self.history.len())
            .field("disabled", &self.disabled)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::policies::{CustomizedRetryPolicy, LinearRetryPolicy};

    #[test]
    fn test_next_records_history() {
        let policy = LinearRetryPolicy::fixed(2, Duration::from_millis(5));
        let mut instance = policy.create_instance();

        assert!(instance.need());
        assert_eq!(instance.next(), Some(Duration::from_millis(5)));
        assert_eq!(instance.process_time().len(), 1);
        assert_eq!(instance.next(), Some(Duration::from_millis(5)));
        assert!(!instance.need());
        assert_eq!(instance.next(), None);
        assert_eq!(instance.attempts(), 2);
    }

    #[test]
    fn test_need_does_not_mutate() {
        let policy = LinearRetryPolicy::fixed(1, Duration::from_millis(5));
        let instance = policy.create_instance();
        for _ in 0..3 {
            assert!(instance.need());
        }
        assert!(instance.process_time().is_empty());
    }

    #[test]
    fn test_disabled_refuses() {
        let policy = LinearRetryPolicy::fixed(5, Duration::from_millis(5));
        let mut instance = policy.create_instance();
        assert!(instance.next().is_some());

        instance.disable();
        assert!(instance.is_disabled());
        assert!(!instance.need());
        assert_eq!(instance.next(), None);
        assert_eq!(instance.attempts(), 1);
    }

    #[test]
    fn test_panicking_schedule_is_no_retry() {
        let policy = CustomizedRetryPolicy::new(|history: &[Instant]| {
            let waits = [Duration::from_millis(1)];
            Some(waits[history.len()])
        });
        let mut instance = policy.create_instance();

        assert_eq!(instance.next(), Some(Duration::from_millis(1)));
        assert_eq!(instance.next(), None);
        assert_eq!(instance.attempts(), 1);
    }

    #[test]
    fn test_instances_are_independent() {
        let policy = LinearRetryPolicy::fixed(1, Duration::from_millis(5));
        let mut a = policy.create_instance();
        let mut b = policy.create_instance();

        assert!(a.next().is_some());
        assert!(a.next().is_none());
        assert!(b.next().is_some());
    }
}
