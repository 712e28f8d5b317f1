//! # Outcome record of one retry loop.

/// Outcome of a retry loop: every recorded error plus the final value.
///
/// ## Rules
/// - `errors` is append-only
/// - The outcome resolves once; later `success` / `fail` / `end` calls leave it unchanged
/// - `is_successful()` is `None` until resolved
#[derive(Debug)]
pub struct RetryResult<T, E> {
    processed: bool,
    successful: Option<bool>,
    errors: Vec<E>,
    value: Option<T>,
}

impl<T, E> Default for RetryResult<T, E> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T, E> RetryResult<T, E> {
    /// Creates an unprocessed, unresolved result.
    pub fn new() -> Self {
        Self {
            processed: false,
            successful: None,
            errors: Vec::new(),
            value: None,
        }
    }

    /// True once at least one attempt ran.
    pub fn has_processed(&self) -> bool {
        self.processed
    }

    /// `None` while pending, then whether the loop ended in success.
    pub fn is_successful(&self) -> Option<bool> {
        self.successful
    }

    /// Errors recorded by failed attempts, oldest first.
    pub fn errors(&self) -> &[E] {
        &self.errors
    }

    /// Most recent recorded error.
    pub fn last_error(&self) -> Option<&E> {
        self.errors.last()
    }

    /// Value produced by the successful attempt.
    pub fn result(&self) -> Option<&T> {
        self.value.as_ref()
    }

    /// Consumes the record, yielding the successful value.
    pub fn into_result(self) -> Option<T> {
        self.value
    }

    /// Consumes the record, yielding the recorded errors.
    pub fn into_errors(self) -> Vec<E> {
        self.errors
    }

    /// Marks that an attempt ran.
    pub fn mark_processed(&mut self) {
        self.processed = true;
    }

    /// Records an error without resolving the outcome.
    pub fn push_error(&mut self, error: E) {
        self.processed = true;
        self.errors.push(error);
    }

    /// Resolves as successful with `value`; no-op if already resolved.
    pub fn success(&mut self, value: T) {
        if self.successful.is_some() {
            return;
        }
        self.processed = true;
        self.successful = Some(true);
        self.value = Some(value);
    }

    /// Records `error` and resolves as failed; the resolution is a no-op if already resolved.
    pub fn fail(&mut self, error: E) {
        self.push_error(error);
        if self.successful.is_none() {
            self.successful = Some(false);
        }
    }

    /// Resolves as failed without a new error; no-op if already resolved.
    pub fn end(&mut self) {
        if self.successful.is_none() {
            self.successful = Some(false);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_pending_by_default() {
        let r: RetryResult<u8, String> = RetryResult::new();
        assert!(!r.has_processed());
        assert_eq!(r.is_successful(), None);
        assert!(r.result().is_none());
    }

    #[test]
    fn test_resolution_is_write_once() {
        let mut r: RetryResult<u8, &str> = RetryResult::new();
        r.push_error("a");
        r.success(7);
        r.end();
        r.fail("b");

        assert_eq!(r.is_successful(), Some(true));
        assert_eq!(r.result(), Some(&7));
        assert_eq!(r.errors(), &["a", "b"]);
    }

    #[test]
    fn test_end_then_success_keeps_failure() {
        let mut r: RetryResult<u8, &str> = RetryResult::new();
        r.push_error("a");
        r.end();
        r.success(1);

        assert_eq!(r.is_successful(), Some(false));
        assert!(r.result().is_none());
        assert_eq!(r.last_error(), Some(&"a"));
    }
}
