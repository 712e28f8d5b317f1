//! # Error handlers: decide whether a failed attempt is retried.
//!
//! The retry loop shows every attempt error to an [`ErrorHandler`] and acts
//! on its [`Verdict`]:
//!
//! ```text
//! Err(e) ──► handler.handle(&e)
//!              ├─ Retry        → record e, ask the schedule for a wait
//!              ├─ Stop         → return Err(Escalated { error: e })
//!              └─ Replace(e2)  → record e, return Err(Escalated { error: e2 })
//! ```
//!
//! Classification is always supplied by the caller; nothing here hardcodes
//! which failures are transient.
//!
//! # Example
//! ```rust
//! use fragvisor::{ActionError, ErrorHandler, ErrorKind, RetryOn, Verdict};
//!
//! let handler = RetryOn::kinds([ErrorKind::Argument]);
//! assert!(matches!(handler.handle(&ActionError::argument("x")), Verdict::Retry));
//! assert!(matches!(handler.handle(&ActionError::application("x")), Verdict::Stop));
//! ```

use crate::error::{ErrorKind, Kinded};

/// Decision for one failed attempt.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Verdict<E> {
    /// Swallow the error and retry if the schedule allows.
    Retry,
    /// Stop and surface the original error.
    Stop,
    /// Stop and surface this error instead.
    Replace(E),
}

/// Classifies attempt errors for the retry loop.
pub trait ErrorHandler<E>: Send + Sync {
    /// Decides what to do with `error`.
    fn handle(&self, error: &E) -> Verdict<E>;
}

impl<E, F> ErrorHandler<E> for F
where
    F: Fn(&E) -> Verdict<E> + Send + Sync,
{
    fn handle(&self, error: &E) -> Verdict<E> {
        self(error)
    }
}

/// Retries every error.
#[derive(Clone, Copy, Debug, Default)]
pub struct RetryAll;

impl<E> ErrorHandler<E> for RetryAll {
    fn handle(&self, _error: &E) -> Verdict<E> {
        Verdict::Retry
    }
}

/// Retries errors whose kind is, or descends from, one of the listed kinds;
/// stops with the original error otherwise.
#[derive(Clone, Debug, Default)]
pub struct RetryOn {
    kinds: Vec<ErrorKind>,
}

impl RetryOn {
    /// Allow-list of retryable kinds.
    pub fn kinds(kinds: impl IntoIterator<Item = ErrorKind>) -> Self {
        Self {
            kinds: kinds.into_iter().collect(),
        }
    }

    /// True if `kind` is admitted by the allow-list.
    pub fn admits(&self, kind: ErrorKind) -> bool {
        self.kinds.iter().any(|allowed| kind.is(*allowed))
    }
}

impl<E: Kinded> ErrorHandler<E> for RetryOn {
    fn handle(&self, error: &E) -> Verdict<E> {
        if self.admits(error.kind()) {
            Verdict::Retry
        } else {
            Verdict::Stop
        }
    }
}
