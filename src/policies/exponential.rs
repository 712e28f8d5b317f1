//! # Counted exponential schedule.
//!
//! [`ExponentialRetryPolicy`] grants at most `count` retries. The wait for
//! retry `n` is `first × factor^n`, clamped to `max`, then jittered. The base
//! is derived from `n` alone, so jitter never feeds back into later waits,
//! except with [`JitterPolicy::Decorrelated`], which grows from the time
//! elapsed since the previous retry was granted.
//!
//! # Example
//! ```rust
//! use std::time::Duration;
//! use fragvisor::{ExponentialRetryPolicy, JitterPolicy};
//!
//! let policy = ExponentialRetryPolicy {
//!     count: 5,
//!     first: Duration::from_millis(100),
//!     max: Duration::from_secs(1),
//!     factor: 2.0,
//!     jitter: JitterPolicy::None,
//! };
//!
//! assert_eq!(policy.wait(0), Duration::from_millis(100));
//! assert_eq!(policy.wait(1), Duration::from_millis(200));
//! assert_eq!(policy.wait(4), Duration::from_secs(1));
//! ```

use std::time::{Duration, Instant};

use crate::policies::{jitter::JitterPolicy, retry::RetryPolicy};

/// Exponential backoff capped at `max`, at most `count` retries.
#[derive(Clone, Copy, Debug)]
pub struct ExponentialRetryPolicy {
    /// Maximum number of retries.
    pub count: u32,
    /// Wait before the first retry.
    pub first: Duration,
    /// Upper bound for any single wait.
    pub max: Duration,
    /// Multiplicative growth factor (`>= 1.0` recommended).
    pub factor: f64,
    /// Randomization applied to the clamped wait.
    pub jitter: JitterPolicy,
}

impl Default for ExponentialRetryPolicy {
    /// 5 retries, 100ms doubling up to 30s, no jitter.
    fn default() -> Self {
        Self {
            count: 5,
            first: Duration::from_millis(100),
            max: Duration::from_secs(30),
            factor: 2.0,
            jitter: JitterPolicy::None,
        }
    }
}

impl ExponentialRetryPolicy {
    /// Jittered wait for retry `n` (0-based), ignoring `count`.
    ///
    /// Decorrelated jitter takes the un-jittered wait of retry `n - 1` as the
    /// previous delay.
    pub fn wait(&self, n: u32) -> Duration {
        let prev = match n {
            0 => self.floor(),
            n => self.base(n - 1),
        };
        self.jittered(self.base(n), prev)
    }

    fn floor(&self) -> Duration {
        self.first.min(self.max)
    }

    fn jittered(&self, base: Duration, prev: Duration) -> Duration {
        match self.jitter {
            JitterPolicy::Decorrelated => self.jitter.apply(prev, self.floor(), self.max),
            other => other.apply(base, self.floor(), self.max),
        }
    }

    /// Clamped wait for retry `n` before jitter.
    fn base(&self, n: u32) -> Duration {
        let exp = n.min(i32::MAX as u32) as i32;
        let secs = self.first.as_secs_f64() * self.factor.powi(exp);

        if !secs.is_finite() || secs < 0.0 || secs > self.max.as_secs_f64() {
            self.max
        } else {
            Duration::from_secs_f64(secs)
        }
    }
}

impl RetryPolicy for ExponentialRetryPolicy {
    fn next_interval(&self, history: &[Instant]) -> Option<Duration> {
        let n = u32::try_from(history.len()).ok()?;
        if n >= self.count {
            return None;
        }
        let prev = match history.last() {
            Some(granted) => granted.elapsed().clamp(self.floor(), self.max),
            None => self.floor(),
        };
        Some(self.jittered(self.base(n), prev))
    }
}
