//! # Retry schedule trait and the linear / customized schedules.
//!
//! A schedule maps the attempt history of one operation (the instants at
//! which previous retries were granted) to the wait before the next retry,
//! or to `None` when no retry is allowed.
//!
//! # Example
//! ```rust
//! use std::time::Duration;
//! use fragvisor::{LinearRetryPolicy, RetryPolicy};
//!
//! let policy = LinearRetryPolicy::new(3, Duration::from_millis(20), Duration::from_millis(10));
//! let mut instance = policy.create_instance();
//!
//! assert_eq!(instance.next(), Some(Duration::from_millis(20)));
//! assert_eq!(instance.next(), Some(Duration::from_millis(30)));
//! assert_eq!(instance.next(), Some(Duration::from_millis(40)));
//! assert_eq!(instance.next(), None);
//! ```

use std::fmt;
use std::sync::Arc;
use std::time::{Duration, Instant};

use crate::policies::instance::RetryInstance;

/// Stateless retry schedule, shareable across operations.
pub trait RetryPolicy: Send + Sync {
    /// Wait before the next retry, given the instants of the retries granted so far.
    ///
    /// `history.len()` is the 0-based index of the retry being asked for.
    fn next_interval(&self, history: &[Instant]) -> Option<Duration>;

    /// Creates a fresh per-operation tracker bound to this schedule.
    fn create_instance(&self) -> RetryInstance<'_>
    where
        Self: Sized,
    {
        RetryInstance::new(self)
    }
}

/// Arithmetic backoff: retry `n` (0-based) waits `interval + increase × n`.
///
/// At most `count` retries are granted, not counting the first attempt.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct LinearRetryPolicy {
    /// Maximum number of retries.
    pub count: u32,
    /// Wait before the first retry.
    pub interval: Duration,
    /// Growth added per retry.
    pub increase: Duration,
}

impl LinearRetryPolicy {
    /// Creates a linear schedule.
    pub fn new(count: u32, interval: Duration, increase: Duration) -> Self {
        Self {
            count,
            interval,
            increase,
        }
    }

    /// Constant wait between at most `count` retries.
    pub fn fixed(count: u32, interval: Duration) -> Self {
        Self::new(count, interval, Duration::ZERO)
    }
}

impl Default for LinearRetryPolicy {
    /// 3 retries: 100ms, 200ms, 300ms.
    fn default() -> Self {
        Self::new(3, Duration::from_millis(100), Duration::from_millis(100))
    }
}

impl RetryPolicy for LinearRetryPolicy {
    fn next_interval(&self, history: &[Instant]) -> Option<Duration> {
        let n = u32::try_from(history.len()).ok()?;
        if n >= self.count {
            return None;
        }
        Some(self.interval.saturating_add(self.increase.saturating_mul(n)))
    }
}

type Schedule = dyn Fn(&[Instant]) -> Option<Duration> + Send + Sync;

/// Schedule backed by an arbitrary function of the attempt history.
///
/// A panic inside the function is treated as "no retry" by [`RetryInstance`].
#[derive(Clone)]
pub struct CustomizedRetryPolicy {
    f: Arc<Schedule>,
}

impl CustomizedRetryPolicy {
    /// Wraps `f` as a retry schedule.
    pub fn new<F>(f: F) -> Self
    where
        F: Fn(&[Instant]) -> Option<Duration> + Send + Sync + 'static,
    {
        Self { f: Arc::new(f) }
    }
}

impl fmt::Debug for CustomizedRetryPolicy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CustomizedRetryPolicy").finish_non_exhaustive()
    }
}

impl RetryPolicy for CustomizedRetryPolicy {
    fn next_interval(&self, history: &[Instant]) -> Option<Duration> {
        (self.f)(history)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_linear_schedule() {
        let policy = LinearRetryPolicy::new(3, Duration::from_millis(20), Duration::from_millis(10));
        let now = Instant::now();

        assert_eq!(policy.next_interval(&[]), Some(Duration::from_millis(20)));
        assert_eq!(policy.next_interval(&[now]), Some(Duration::from_millis(30)));
        assert_eq!(policy.next_interval(&[now, now]), Some(Duration::from_millis(40)));
        assert_eq!(policy.next_interval(&[now, now, now]), None);
    }

    #[test]
    fn test_linear_zero_count_never_retries() {
        let policy = LinearRetryPolicy::fixed(0, Duration::from_millis(5));
        assert_eq!(policy.next_interval(&[]), None);
    }

    #[test]
    fn test_linear_saturates() {
        let policy = LinearRetryPolicy::new(u32::MAX, Duration::MAX, Duration::MAX);
        let now = Instant::now();
        assert_eq!(policy.next_interval(&[now]), Some(Duration::MAX));
    }

    #[test]
    fn test_customized_delegates() {
        let policy = CustomizedRetryPolicy::new(|history: &[Instant]| {
            (history.len() < 2).then(|| Duration::from_millis(7 * (history.len() as u64 + 1)))
        });
        let now = Instant::now();

        assert_eq!(policy.next_interval(&[]), Some(Duration::from_millis(7)));
        assert_eq!(policy.next_interval(&[now]), Some(Duration::from_millis(14)));
        assert_eq!(policy.next_interval(&[now, now]), None);
    }
}
