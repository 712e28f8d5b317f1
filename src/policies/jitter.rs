//! # Jitter applied to exponential retry waits.
//!
//! [`JitterPolicy`] randomizes a computed wait so that many operations failing
//! together do not retry in lockstep.
//!
//! - [`JitterPolicy::None`] — exact wait
//! - [`JitterPolicy::Full`] — uniform in `[0, wait]`
//! - [`JitterPolicy::Equal`] — `wait/2 + uniform[0, wait/2]`
//! - [`JitterPolicy::Decorrelated`] — uniform in `[floor, min(prev × 3, max)]`, where
//!   `prev` is the delay actually taken before the previous retry
//!
//! Waits are handled in whole milliseconds; anything past `u64::MAX` ms saturates.

use rand::Rng;
use std::time::Duration;

/// Randomization strategy for retry waits.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum JitterPolicy {
    /// Use the computed wait as-is.
    #[default]
    None,
    /// Uniform in `[0, wait]`.
    Full,
    /// Half the wait plus a uniform share of the other half.
    Equal,
    /// Uniform in `[floor, prev × 3]`, capped at `max`.
    ///
    /// Grows from the previous realized delay rather than from the retry
    /// number, so concurrent retry loops drift apart.
    Decorrelated,
}

impl JitterPolicy {
    /// Randomizes `wait`.
    ///
    /// For [`Decorrelated`](Self::Decorrelated) `wait` is the previous delay
    /// and `floor`/`max` bound the range; the other variants ignore them.
    pub fn apply(&self, wait: Duration, floor: Duration, max: Duration) -> Duration {
        let ms = millis(wait);
        match self {
            JitterPolicy::None => wait,
            JitterPolicy::Full => Duration::from_millis(uniform(0, ms)),
            JitterPolicy::Equal => {
                let half = ms / 2;
                Duration::from_millis(half + uniform(0, half))
            }
            JitterPolicy::Decorrelated => {
                let lo = millis(floor);
                let hi = ms.saturating_mul(3).min(millis(max)).max(lo);
                Duration::from_millis(uniform(lo, hi))
            }
        }
    }
}

fn millis(d: Duration) -> u64 {
    u64::try_from(d.as_millis()).unwrap_or(u64::MAX)
}

/// Uniform integer in `[lo, hi]`; returns `lo` for an empty range.
fn uniform(lo: u64, hi: u64) -> u64 {
    if hi <= lo {
        return lo;
    }
    rand::rng().random_range(lo..=hi)
}
