//! Retry schedules.
//!
//! This module groups the knobs that decide **whether** another attempt is
//! allowed and **how long** to wait before it. Policies are immutable and
//! shareable; per-operation progress lives in a [`RetryInstance`].
//!
//! ## Contents
//! - [`RetryPolicy`] the schedule trait (`history -> Option<wait>`)
//! - [`LinearRetryPolicy`] `interval + increase × n`, at most `count` retries
//! - [`ExponentialRetryPolicy`] `first × factor^n` capped at `max`, plus jitter
//! - [`CustomizedRetryPolicy`] any function of the attempt history
//! - [`JitterPolicy`] randomization strategy to avoid thundering herd
//! - [`RetryInstance`] the stateful tracker created per operation
//!
//! ## Quick wiring
//! ```text
//! Arc<dyn RetryPolicy> (shared)
//!      └─► RetryInstance (one per RetryTask::process call)
//!           ├─ next()  → Some(wait) + record attempt time | None
//!           └─ need()  → would next() yield a wait?
//! ```

mod exponential;
mod instance;
mod jitter;
mod retry;

pub use exponential::ExponentialRetryPolicy;
pub use instance::RetryInstance;
pub use jitter::JitterPolicy;
pub use retry::{CustomizedRetryPolicy, LinearRetryPolicy, RetryPolicy};
