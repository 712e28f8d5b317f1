//! Retry loop: runs an action under a [`RetryPolicy`](crate::RetryPolicy)
//! and an [`ErrorHandler`].
//!
//! - [`RetryTask`] drives the loop and publishes attempt events.
//! - [`ErrorHandler`] / [`Verdict`] decide per error whether to keep going.
//! - [`RetryResult`] records every error and the final value.

mod handler;
mod result;
mod task;

pub use handler::{ErrorHandler, RetryAll, RetryOn, Verdict};
pub use result::RetryResult;
pub use task::RetryTask;
