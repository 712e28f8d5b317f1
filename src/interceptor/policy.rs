//! # Invocation-shaping policies
//!
//! An [`Interceptor`](crate::Interceptor) sits between a stream of hits and
//! one action. The policy decides which hits reach the action.
//!
//! ## Variants
//! - `Debounce`: every hit restarts the window; the **latest** value fires once the window stays quiet.
//! - `Throttle`: the first hit fires **immediately**; hits inside the open window are dropped.
//! - `Multiple`: counts hits in a rolling window; fires **at once** on reaching `max`,
//!   otherwise at window end if at least `min` hits arrived.
//! - `Times`: counts hits in a rolling window; fires only after the window stays quiet
//!   and only if `min <= count <= max` (an overshooting batch is discarded).
//!
//! ## Invariants
//! - At most one value fires per window.
//! - A hit replaced by a newer one in the same batch never fires.

use std::time::Duration;

/// Policy controlling which hits reach the action.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum InterceptorPolicy {
    /// Trailing edge: fire the latest value after `window` without hits.
    ///
    /// Use when:
    /// - Only the settled value matters
    /// - Example: save after typing stops
    Debounce {
        /// Quiet period required before firing.
        window: Duration,
    },

    /// Leading edge: fire immediately, then ignore hits for `window`.
    ///
    /// Use when:
    /// - Reaction must be instant but bounded in rate
    /// - Example: refresh button
    Throttle {
        /// Period during which further hits are dropped.
        window: Duration,
    },

    /// Fire the latest value once `min..=max` hits land in a rolling window.
    Multiple {
        /// Hits required for a window-end firing.
        min: u32,
        /// Hits that trigger an immediate firing.
        max: u32,
        /// Rolling window, restarted by every hit.
        window: Duration,
    },

    /// Fire the latest value after a quiet window if the batch held `min..=max` hits.
    ///
    /// Use when:
    /// - Only an exact gesture counts
    /// - Example: double-click detection (`min = max = 2`)
    Times {
        /// Fewest hits accepted.
        min: u32,
        /// Most hits accepted; a larger batch is discarded.
        max: u32,
        /// Rolling window, restarted by every hit.
        window: Duration,
    },
}

impl InterceptorPolicy {
    /// Trailing-edge debounce.
    #[inline]
    pub fn debounce(window: Duration) -> Self {
        Self::Debounce { window }
    }

    /// Leading-edge throttle.
    #[inline]
    pub fn throttle(window: Duration) -> Self {
        Self::Throttle { window }
    }

    /// Count-based firing; `min` is raised to 1 and `max` to `min`.
    pub fn multiple(min: u32, max: u32, window: Duration) -> Self {
        let (min, max) = clamp_counts(min, max);
        Self::Multiple { min, max, window }
    }

    /// Exact-batch firing; `min` is raised to 1 and `max` to `min`.
    pub fn times(min: u32, max: u32, window: Duration) -> Self {
        let (min, max) = clamp_counts(min, max);
        Self::Times { min, max, window }
    }

    /// Window length of this policy.
    pub fn window(&self) -> Duration {
        match *self {
            Self::Debounce { window }
            | Self::Throttle { window }
            | Self::Multiple { window, .. }
            | Self::Times { window, .. } => window,
        }
    }

    /// Short stable name for logs.
    pub fn as_label(&self) -> &'static str {
        match self {
            Self::Debounce { .. } => "debounce",
            Self::Throttle { .. } => "throttle",
            Self::Multiple { .. } => "multiple",
            Self::Times { .. } => "times",
        }
    }
}

fn clamp_counts(min: u32, max: u32) -> (u32, u32) {
    let min = min.max(1);
    (min, max.max(min))
}
