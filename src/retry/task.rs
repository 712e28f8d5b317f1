//! # RetryTask: runs one action under a retry schedule.
//!
//! Drives a user action until it succeeds, the schedule refuses another
//! retry, the error handler demands a stop, or the token is cancelled.
//!
//! ## Event flow
//! ```text
//! AttemptStarting → [action] → RetrySucceeded (Ok)
//!                            → AttemptFailed (Err)
//!                                 ├─ Stop / Replace  → RetryEscalated
//!                                 └─ Retry
//!                                      ├─ schedule refuses → RetryExhausted
//!                                      └─ RetryScheduled → [sleep] → next attempt
//! (token fired before an attempt or during sleep)       → RetryCanceled
//! ```
//!
//! ## Architecture
//! ```text
//! loop {
//!   ├─► token cancelled? → Err(Canceled)
//!   ├─► attempt += 1, publish AttemptStarting
//!   ├─► action(child token).await
//!   │     ├─ Ok(v)  → result.success(v) → Ok(result)
//!   │     └─ Err(e) → handler.handle(&e)
//!   │                   ├─ Stop        → Err(Escalated{ e })
//!   │                   ├─ Replace(x)  → record e, Err(Escalated{ x })
//!   │                   └─ Retry       → record e, instance.next()
//!   │                                     ├─ None    → result.end() → Ok(result)
//!   │                                     └─ Some(d) → sleep(d) | token.cancelled()
//! }
//! ```
//!
//! ## Rules
//! - Attempts run **sequentially**, never in parallel
//! - Cancellation is checked **before each attempt** and **during the backoff sleep**
//! - Exhausting the schedule is an `Ok` outcome with `is_successful() == Some(false)`
//! - Only the handler can turn an attempt error into an `Err`

use std::fmt;
use std::future::{self, Future};
use std::sync::Arc;

use tokio::{select, time};
use tokio_util::sync::CancellationToken;

use crate::error::RetryError;
use crate::events::{Bus, Event, EventKind};
use crate::policies::{RetryInstance, RetryPolicy};
use crate::retry::handler::{ErrorHandler, Verdict};
use crate::retry::result::RetryResult;

/// Named retry runner bound to a shared schedule.
///
/// Cheap to clone; clones share the schedule and the bus.
#[derive(Clone)]
pub struct RetryTask {
    name: Arc<str>,
    policy: Arc<dyn RetryPolicy>,
    bus: Option<Bus>,
}

impl RetryTask {
    /// Creates a runner named `name` using `policy` for every loop.
    pub fn new(name: impl Into<Arc<str>>, policy: Arc<dyn RetryPolicy>) -> Self {
        Self {
            name: name.into(),
            policy,
            bus: None,
        }
    }

    /// Publishes attempt and outcome events to `bus`.
    #[inline]
    pub fn with_bus(mut self, bus: Bus) -> Self {
        self.bus = Some(bus);
        self
    }

    /// Name used in events and logs.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Schedule shared by every loop of this runner.
    pub fn policy(&self) -> &Arc<dyn RetryPolicy> {
        &self.policy
    }

    /// Runs an async, cancellation-aware action until it settles.
    ///
    /// Each attempt receives a child of `token`.
    ///
    /// ### Returns
    /// - `Ok(result)` with `is_successful() == Some(true)` on success
    /// - `Ok(result)` with `is_successful() == Some(false)` once the schedule refuses
    /// - `Err(RetryError::Escalated)` when the handler stops the loop
    /// - `Err(RetryError::Canceled)` when `token` fires
    ///
    /// # Example
    /// ```
    /// use std::{sync::Arc, time::Duration};
    /// use fragvisor::{ActionError, LinearRetryPolicy, RetryAll, RetryTask};
    /// use tokio_util::sync::CancellationToken;
    ///
    /// # #[tokio::main(flavor = "current_thread")]
    /// # async fn main() {
    /// let task = RetryTask::new("fetch", Arc::new(LinearRetryPolicy::fixed(2, Duration::ZERO)));
    /// let token = CancellationToken::new();
    ///
    /// let mut calls = 0;
    /// let result = task
    ///     .process(&token, &RetryAll, |_| {
    ///         calls += 1;
    ///         let n = calls;
    ///         async move {
    ///             if n < 3 { Err(ActionError::application("busy")) } else { Ok(n) }
    ///         }
    ///     })
    ///     .await
    ///     .unwrap();
    ///
    /// assert_eq!(result.is_successful(), Some(true));
    /// assert_eq!(result.result(), Some(&3));
    /// assert_eq!(result.errors().len(), 2);
    /// # }
    /// ```
    pub async fn process<T, E, H, F, Fut>(
        &self,
        token: &CancellationToken,
        handler: &H,
        mut action: F,
    ) -> Result<RetryResult<T, E>, RetryError<E>>
    where
        E: fmt::Display,
        H: ErrorHandler<E> + ?Sized,
        F: FnMut(CancellationToken) -> Fut,
        Fut: Future<Output = Result<T, E>>,
    {
        let mut instance = RetryInstance::new(self.policy.as_ref());
        let mut result = RetryResult::new();
        let mut attempt: u32 = 0;

        loop {
            if token.is_cancelled() {
                return Err(self.canceled(attempt));
            }

            attempt += 1;
            self.publish(Event::new(EventKind::AttemptStarting).with_attempt(attempt));
            result.mark_processed();

            let error = match action(token.child_token()).await {
                Ok(value) => {
                    result.success(value);
                    self.publish(Event::new(EventKind::RetrySucceeded).with_attempt(attempt));
                    return Ok(result);
                }
                Err(e) => e,
            };

            self.publish(
                Event::new(EventKind::AttemptFailed)
                    .with_attempt(attempt)
                    .with_reason(error.to_string()),
            );
            let escalated = match handler.handle(&error) {
                Verdict::Retry => {
                    result.push_error(error);
                    None
                }
                Verdict::Stop => Some(error),
                Verdict::Replace(other) => {
                    result.push_error(error);
                    Some(other)
                }
            };
            if let Some(error) = escalated {
                tracing::debug!(task = %self.name, attempt, %error, "retry escalated");
                self.publish(
                    Event::new(EventKind::RetryEscalated)
                        .with_attempt(attempt)
                        .with_reason(error.to_string()),
                );
                return Err(RetryError::Escalated {
                    error,
                    attempts: attempt,
                });
            }

            let Some(delay) = instance.next() else {
                result.end();
                tracing::debug!(task = %self.name, attempts = attempt, "retry exhausted");
                let mut ev = Event::new(EventKind::RetryExhausted).with_attempt(attempt);
                if let Some(last) = result.last_error() {
                    ev = ev.with_reason(last.to_string());
                }
                self.publish(ev);
                return Ok(result);
            };

            tracing::trace!(task = %self.name, attempt, ?delay, "retry scheduled");
            self.publish(
                Event::new(EventKind::RetryScheduled)
                    .with_attempt(attempt)
                    .with_delay(delay),
            );

            let sleep = time::sleep(delay);
            tokio::pin!(sleep);
            select! {
                _ = &mut sleep => {}
                _ = token.cancelled() => {
                    return Err(self.canceled(attempt));
                }
            }
        }
    }

    /// Runs a synchronous action under the same loop as [`process`](Self::process).
    pub async fn process_sync<T, E, H, F>(
        &self,
        token: &CancellationToken,
        handler: &H,
        mut action: F,
    ) -> Result<RetryResult<T, E>, RetryError<E>>
    where
        E: fmt::Display,
        H: ErrorHandler<E> + ?Sized,
        F: FnMut() -> Result<T, E>,
    {
        self.process(token, handler, |_| future::ready(action()))
            .await
    }

    /// Like [`process`](Self::process), but a missing action yields a
    /// never-processed result instead of running anything.
    pub async fn process_opt<T, E, H, F, Fut>(
        &self,
        token: &CancellationToken,
        handler: &H,
        action: Option<F>,
    ) -> Result<RetryResult<T, E>, RetryError<E>>
    where
        E: fmt::Display,
        H: ErrorHandler<E> + ?Sized,
        F: FnMut(CancellationToken) -> Fut,
        Fut: Future<Output = Result<T, E>>,
    {
        match action {
            Some(action) => self.process(token, handler, action).await,
            None => Ok(RetryResult::new()),
        }
    }

    fn canceled<E>(&self, attempts: u32) -> RetryError<E> {
        tracing::debug!(task = %self.name, attempts, "retry canceled");
        self.publish(Event::new(EventKind::RetryCanceled).with_attempt(attempts));
        RetryError::Canceled { attempts }
    }

    fn publish(&self, ev: Event) {
        if let Some(bus) = &self.bus {
            bus.publish(ev.with_task(Arc::clone(&self.name)));
        }
    }
}

impl fmt::Debug for RetryTask {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RetryTask")
            .field("name", &self.name)
            .field("bus", &self.bus.is_some())
            .finish_non_exhaustive()
    }
}
