//! Invocation shaping: debounce, throttle and count-based firing for one action.
//!
//! - [`InterceptorPolicy`] names the shaping rule.
//! - [`Interceptor`] applies it to every hit and reports each hit's outcome.

#[allow(clippy::module_inception)]
mod interceptor;
mod policy;

pub use interceptor::Interceptor;
pub use policy::InterceptorPolicy;
