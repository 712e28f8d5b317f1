//! # Coordinator configuration.
//!
//! Provides [`Config`], the settings a [`Coordinator`](crate::Coordinator)
//! is built from.
//!
//! Config is used in two ways:
//! 1. **Coordinator creation**: `Coordinator::builder(config)`
//! 2. **Retry defaults**: `Coordinator::retry_task(name)` runs under `config.retry`

use crate::equipartition::DuplicateKeyPolicy;
use crate::policies::LinearRetryPolicy;

/// Configuration for a coordinator.
///
/// ## Field semantics
/// - `bus_capacity`: event bus ring buffer size (min 1; clamped)
/// - `retry`: schedule used by retry tasks created without an explicit policy
/// - `duplicate_keys`: what the task container does with a repeated `(owner, job)`
///
/// ## Notes
/// All fields are public for flexibility; prefer the helper accessors.
#[derive(Clone, Debug)]
pub struct Config {
    /// Capacity of the event bus broadcast channel.
    ///
    /// A subscriber listener lagging more than `bus_capacity` events behind
    /// skips the oldest ones.
    pub bus_capacity: usize,

    /// Default retry schedule.
    pub retry: LinearRetryPolicy,

    /// Duplicate-key behaviour of the coordinator's task container.
    pub duplicate_keys: DuplicateKeyPolicy,
}

impl Config {
    /// Returns a bus capacity clamped to a minimum of 1.
    #[inline]
    pub fn bus_capacity_clamped(&self) -> usize {
        self.bus_capacity.max(1)
    }
}

impl Default for Config {
    /// Default configuration:
    ///
    /// - `bus_capacity = 1024`
    /// - `retry = LinearRetryPolicy::default()` (3 retries: 100ms, 200ms, 300ms)
    /// - `duplicate_keys = DuplicateKeyPolicy::Reuse`
    fn default() -> Self {
        Self {
            bus_capacity: 1024,
            retry: LinearRetryPolicy::default(),
            duplicate_keys: DuplicateKeyPolicy::default(),
        }
    }
}
