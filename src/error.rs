//! Error types used by the retry engine and the fragment codec.
//!
//! This module defines:
//!
//! - [`RetryError`] — the two ways a retry loop ends without a [`RetryResult`](crate::RetryResult).
//! - [`FragmentError`] — failures while parsing a serialized [`Fragment`](crate::Fragment).
//! - [`ErrorKind`] / [`Kinded`] — a closed error taxonomy used by [`RetryOn`](crate::RetryOn).
//! - [`ActionError`] — a ready-made tagged error for user actions.
//!
//! Error enums provide `as_label` (stable snake_case for logs/metrics),
//! mirroring the rest of the crate.

use std::fmt;

use thiserror::Error;

/// # Ways a retry loop stops without producing a result.
///
/// Exhausting the retry schedule is **not** an error: the loop returns
/// `Ok(RetryResult)` with `is_successful() == Some(false)` instead.
#[non_exhaustive]
#[derive(Error, Debug)]
pub enum RetryError<E> {
    /// The error handler demanded a stop; carries the error to surface.
    #[error("escalated after {attempts} attempt(s): {error}")]
    Escalated {
        /// Error chosen by the handler (the original or a replacement).
        error: E,
        /// Number of attempts made, including the one that escalated.
        attempts: u32,
    },

    /// The cancellation token fired before an attempt or during backoff.
    #[error("retry cancelled after {attempts} attempt(s)")]
    Canceled {
        /// Number of attempts made before cancellation was observed.
        attempts: u32,
    },
}

impl<E> RetryError<E> {
    /// Returns a short stable label (snake_case) for use in logs/metrics.
    ///
    /// # Example
    /// ```
    /// use fragvisor::RetryError;
    ///
    /// let err: RetryError<std::io::Error> = RetryError::Canceled { attempts: 2 };
    /// assert_eq!(err.as_label(), "retry_canceled");
    /// ```
    pub fn as_label(&self) -> &'static str {
        match self {
            RetryError::Escalated { .. } => "retry_escalated",
            RetryError::Canceled { .. } => "retry_canceled",
        }
    }

    /// Returns the escalated error, if any.
    pub fn into_escalated(self) -> Option<E> {
        match self {
            RetryError::Escalated { error, .. } => Some(error),
            RetryError::Canceled { .. } => None,
        }
    }

    /// True if the loop stopped because of cancellation.
    pub fn is_canceled(&self) -> bool {
        matches!(self, RetryError::Canceled { .. })
    }
}

/// # Errors produced while decoding a fragment handle.
#[non_exhaustive]
#[derive(Error, Debug)]
pub enum FragmentError {
    /// Input looked like JSON but did not decode.
    #[error("invalid fragment json: {0}")]
    Json(#[from] serde_json::Error),

    /// A required field was absent from the query form.
    #[error("missing fragment field `{0}`")]
    MissingField(&'static str),

    /// A field was present but could not be decoded.
    #[error("invalid value {value:?} for fragment field `{field}`")]
    InvalidValue {
        /// Field name.
        field: &'static str,
        /// Raw value as received.
        value: String,
    },

    /// The state name is not one of the known fragment states.
    #[error("unknown fragment state {0:?}")]
    UnknownState(String),
}

impl FragmentError {
    /// Returns a short stable label (snake_case) for use in logs/metrics.
    pub fn as_label(&self) -> &'static str {
        match self {
            FragmentError::Json(_) => "fragment_json",
            FragmentError::MissingField(_) => "fragment_missing_field",
            FragmentError::InvalidValue { .. } => "fragment_invalid_value",
            FragmentError::UnknownState(_) => "fragment_unknown_state",
        }
    }
}

/// Closed classification of action failures.
///
/// Kinds form a shallow tree: [`ErrorKind::ArgumentNull`] and
/// [`ErrorKind::ArgumentOutOfRange`] descend from [`ErrorKind::Argument`].
/// [`ErrorKind::is`] walks that tree, so an allow-list entry for a parent
/// also admits its descendants.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    /// Application-level failure raised by user code.
    Application,
    /// An argument was invalid.
    Argument,
    /// A required argument was missing.
    ArgumentNull,
    /// An argument was outside its accepted range.
    ArgumentOutOfRange,
    /// The operation is not valid in the current state.
    InvalidOperation,
    /// The operation is not supported.
    NotSupported,
    /// The operation timed out.
    Timeout,
    /// I/O failure.
    Io,
    /// The operation was cancelled.
    Canceled,
    /// Anything else.
    Other,
}

impl ErrorKind {
    /// Direct parent in the kind tree.
    pub fn parent(self) -> Option<ErrorKind> {
        match self {
            ErrorKind::ArgumentNull | ErrorKind::ArgumentOutOfRange => Some(ErrorKind::Argument),
            _ => None,
        }
    }

    /// True if `self` equals `ancestor` or descends from it.
    ///
    /// # Example
    /// ```
    /// use fragvisor::ErrorKind;
    ///
    /// assert!(ErrorKind::ArgumentNull.is(ErrorKind::Argument));
    /// assert!(ErrorKind::Argument.is(ErrorKind::Argument));
    /// assert!(!ErrorKind::Argument.is(ErrorKind::ArgumentNull));
    /// ```
    pub fn is(self, ancestor: ErrorKind) -> bool {
        let mut cur = Some(self);
        while let Some(kind) = cur {
            if kind == ancestor {
                return true;
            }
            cur = kind.parent();
        }
        false
    }

    /// Returns a short stable label (snake_case).
    pub fn as_label(self) -> &'static str {
        match self {
            ErrorKind::Application => "application",
            ErrorKind::Argument => "argument",
            ErrorKind::ArgumentNull => "argument_null",
            ErrorKind::ArgumentOutOfRange => "argument_out_of_range",
            ErrorKind::InvalidOperation => "invalid_operation",
            ErrorKind::NotSupported => "not_supported",
            ErrorKind::Timeout => "timeout",
            ErrorKind::Io => "io",
            ErrorKind::Canceled => "canceled",
            ErrorKind::Other => "other",
        }
    }
}

impl fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_label())
    }
}

/// Errors that can report their [`ErrorKind`].
pub trait Kinded {
    /// Classification of this error.
    fn kind(&self) -> ErrorKind;
}

impl Kinded for std::io::Error {
    fn kind(&self) -> ErrorKind {
        match std::io::Error::kind(self) {
            std::io::ErrorKind::TimedOut => ErrorKind::Timeout,
            std::io::ErrorKind::InvalidInput => ErrorKind::Argument,
            std::io::ErrorKind::Unsupported => ErrorKind::NotSupported,
            _ => ErrorKind::Io,
        }
    }
}

/// Tagged error for user actions driven by the retry loop.
///
/// # Example
/// ```
/// use fragvisor::{ActionError, ErrorKind, Kinded};
///
/// let err = ActionError::argument("name");
/// assert_eq!(err.kind(), ErrorKind::Argument);
/// assert_eq!(err.to_string(), "argument: name");
/// ```
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("{kind}: {message}")]
pub struct ActionError {
    kind: ErrorKind,
    message: String,
}

impl ActionError {
    /// Creates an error of the given kind.
    pub fn new(kind: ErrorKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
        }
    }

    /// Shorthand for [`ErrorKind::Application`].
    pub fn application(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::Application, message)
    }

    /// Shorthand for [`ErrorKind::Argument`].
    pub fn argument(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::Argument, message)
    }

    /// Shorthand for [`ErrorKind::InvalidOperation`].
    pub fn invalid_operation(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::InvalidOperation, message)
    }

    /// Human-readable message.
    pub fn message(&self) -> &str {
        &self.message
    }
}

impl Kinded for ActionError {
    fn kind(&self) -> ErrorKind {
        self.kind
    }
}

/// Best-effort text of a caught panic payload.
pub(crate) fn panic_message(payload: &(dyn std::any::Any + Send)) -> String {
    if let Some(msg) = payload.downcast_ref::<&'static str>() {
        (*msg).to_string()
    } else if let Some(msg) = payload.downcast_ref::<String>() {
        msg.clone()
    } else {
        "unknown panic".to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_kind_tree() {
        assert!(ErrorKind::ArgumentOutOfRange.is(ErrorKind::Argument));
        assert!(!ErrorKind::InvalidOperation.is(ErrorKind::Argument));
        assert!(!ErrorKind::Argument.is(ErrorKind::ArgumentOutOfRange));
        assert_eq!(ErrorKind::Argument.parent(), None);
    }

    #[test]
    fn test_io_error_kinds() {
        let timed_out = std::io::Error::new(std::io::ErrorKind::TimedOut, "slow");
        assert_eq!(Kinded::kind(&timed_out), ErrorKind::Timeout);

        let other = std::io::Error::other("boom");
        assert_eq!(Kinded::kind(&other), ErrorKind::Io);
    }

    #[test]
    fn test_labels() {
        let err: RetryError<ActionError> = RetryError::Escalated {
            error: ActionError::application("x"),
            attempts: 1,
        };
        assert_eq!(err.as_label(), "retry_escalated");
        assert!(!err.is_canceled());
        assert_eq!(err.into_escalated(), Some(ActionError::application("x")));

        assert_eq!(
            FragmentError::MissingField("task").as_label(),
            "fragment_missing_field"
        );
    }
}
