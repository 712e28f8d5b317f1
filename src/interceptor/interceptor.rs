//! # Interceptor: shapes a stream of hits aimed at one action.
//!
//! Every [`invoke`](Interceptor::invoke) is a *hit*. The active
//! [`InterceptorPolicy`] decides whether the hit fires the action now,
//! later, or never.
//!
//! ## Architecture
//! ```text
//! invoke(v) ──► lock state ──► policy
//!                  │             ├─ Throttle: window open?  → false
//!                  │             │            else          → fire(v)
//!                  │             └─ Debounce/Multiple/Times:
//!                  │                  ├─ previous batch waiter → false (superseded)
//!                  │                  ├─ batch = { latest v, count + 1 }
//!                  │                  ├─ Multiple && count == max → fire now
//!                  │                  └─ else arm timer(generation)
//!                  │
//!                  └─► await own outcome (true = this value reached the action)
//!
//! timer(generation) ──► sleep past window ──► generation unchanged?
//!                                            ├─ fire(batch)       if count fits the policy
//!                                            └─ discard(batch)    otherwise
//!
//! fire(v) ──► spawn action(v) ──► catch_unwind ──► firing -= 1 ──► waiter ← true
//! ```
//!
//! ## Rules
//! - State changes happen under one lock, so concurrent hits agree on a single winner
//! - Every hit and every reset bumps `generation`; stale timers exit without effect
//! - Windows are inclusive: a hit landing exactly on the deadline still joins the batch
//! - A window too large to represent never closes on its own (only a reset clears it)
//! - `is_working()` is true while a batch is pending or an action is running
//! - A panicking action is logged and still releases the working state

use std::fmt;
use std::future::Future;
use std::panic::AssertUnwindSafe;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;

use futures::future::BoxFuture;
use futures::FutureExt;
use tokio::sync::{oneshot, watch};
use tokio::time::{self, Instant};

use crate::error::panic_message;
use crate::events::{Bus, Event, EventKind};
use crate::interceptor::policy::InterceptorPolicy;

type Action<T> = Arc<dyn Fn(T) -> BoxFuture<'static, ()> + Send + Sync>;

/// Timer resolution; a batch expires one tick after its window closes.
const TICK: Duration = Duration::from_millis(1);

/// Roughly 30 years, the horizon tokio uses for "never".
const FAR_FUTURE: Duration = Duration::from_secs(86_400 * 365 * 30);

/// `now + window`, saturating to a far-future instant.
fn deadline(now: Instant, window: Duration) -> Instant {
    now.checked_add(window)
        .or_else(|| now.checked_add(FAR_FUTURE))
        .unwrap_or(now)
}

/// Cloneable handle shaping hits aimed at one async action.
///
/// Clones share policy, window state and the action.
pub struct Interceptor<T> {
    inner: Arc<Inner<T>>,
}

struct Inner<T> {
    name: Arc<str>,
    action: Action<T>,
    state: Mutex<State<T>>,
    working: watch::Sender<bool>,
    bus: Option<Bus>,
}

struct State<T> {
    policy: InterceptorPolicy,
    generation: u64,
    batch: Option<Batch<T>>,
    throttled_until: Option<Instant>,
    firing: usize,
}

/// Hits collected in the current window; only the latest value survives.
struct Batch<T> {
    value: T,
    count: u32,
    waiter: oneshot::Sender<bool>,
}

impl<T: Send + 'static> Interceptor<T> {
    /// Creates an interceptor around `action`.
    ///
    /// # Example
    /// ```
    /// use std::time::Duration;
    /// use fragvisor::{Interceptor, InterceptorPolicy};
    ///
    /// # #[tokio::main(flavor = "current_thread")]
    /// # async fn main() {
    /// let save = Interceptor::new(
    ///     "save",
    ///     InterceptorPolicy::throttle(Duration::from_secs(1)),
    ///     |doc: String| async move { println!("saving {doc}") },
    /// );
    ///
    /// assert!(save.invoke("v1".into()).await);
    /// assert!(!save.invoke("v2".into()).await);
    /// # }
    /// ```
    pub fn new<F, Fut>(name: impl Into<Arc<str>>, policy: InterceptorPolicy, action: F) -> Self
    where
        F: Fn(T) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = ()> + Send + 'static,
    {
        Self::build(name.into(), policy, None, action)
    }

    /// Like [`new`](Self::new), publishing `HitFired` / `HitSuppressed` to `bus`.
    pub fn new_with_bus<F, Fut>(
        name: impl Into<Arc<str>>,
        policy: InterceptorPolicy,
        bus: Bus,
        action: F,
    ) -> Self
    where
        F: Fn(T) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = ()> + Send + 'static,
    {
        Self::build(name.into(), policy, Some(bus), action)
    }

    fn build<F, Fut>(name: Arc<str>, policy: InterceptorPolicy, bus: Option<Bus>, action: F) -> Self
    where
        F: Fn(T) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = ()> + Send + 'static,
    {
        let (working, _) = watch::channel(false);
        Self {
            inner: Arc::new(Inner {
                name,
                action: Arc::new(move |value| action(value).boxed()),
                state: Mutex::new(State {
                    policy,
                    generation: 0,
                    batch: None,
                    throttled_until: None,
                    firing: 0,
                }),
                working,
                bus,
            }),
        }
    }

    /// Registers one hit carrying `value`.
    ///
    /// Resolves `true` once `value` has been handed to the action and the
    /// action finished, `false` as soon as the hit is dropped, superseded by
    /// a newer hit, discarded with its batch, or cleared by a reset.
    pub async fn invoke(&self, value: T) -> bool {
        let (tx, rx) = oneshot::channel();
        {
            let mut state = self.inner.lock();
            let policy = state.policy;
            match policy {
                InterceptorPolicy::Throttle { window } => {
                    let now = Instant::now();
                    if state.throttled_until.is_some_and(|until| now < until) {
                        self.inner.suppressed(1, "throttled");
                        return false;
                    }
                    state.throttled_until = Some(deadline(now, window));
                    self.inner.fire(&mut state, value, 1, tx);
                }
                InterceptorPolicy::Debounce { window } | InterceptorPolicy::Times { window, .. } => {
                    self.inner.enqueue(&mut state, value, tx);
                    self.inner.arm(&mut state, window);
                }
                InterceptorPolicy::Multiple { max, window, .. } => {
                    let count = self.inner.enqueue(&mut state, value, tx);
                    if count >= max {
                        state.generation += 1;
                        if let Some(batch) = state.batch.take() {
                            self.inner.fire(&mut state, batch.value, batch.count, batch.waiter);
                        }
                    } else {
                        self.inner.arm(&mut state, window);
                    }
                }
            }
            self.inner.sync_working(&state);
        }
        rx.await.unwrap_or(false)
    }

    /// True while a batch is pending or the action is running.
    pub fn is_working(&self) -> bool {
        *self.inner.working.borrow()
    }

    /// Waits until no batch is pending and no action is running.
    pub async fn wait(&self) {
        let mut rx = self.inner.working.subscribe();
        let _ = rx.wait_for(|busy| !*busy).await;
    }

    /// Active policy.
    pub fn policy(&self) -> InterceptorPolicy {
        self.inner.lock().policy
    }

    /// Swaps the policy; pending hits resolve `false` and window state is cleared.
    pub fn set_policy(&self, policy: InterceptorPolicy) {
        let mut state = self.inner.lock();
        state.policy = policy;
        self.inner.reset(&mut state);
    }

    /// Clears window state: pending hits resolve `false`, the throttle window closes.
    ///
    /// Actions already running are not interrupted.
    pub fn reset_duration(&self) {
        let mut state = self.inner.lock();
        self.inner.reset(&mut state);
    }

    /// Name used in events and logs.
    pub fn name(&self) -> &str {
        &self.inner.name
    }
}

impl<T: Send + 'static> Inner<T> {
    fn lock(&self) -> MutexGuard<'_, State<T>> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Replaces the pending batch with `value`; returns the new hit count.
    fn enqueue(&self, state: &mut State<T>, value: T, waiter: oneshot::Sender<bool>) -> u32 {
        let count = match state.batch.take() {
            Some(prev) => {
                let _ = prev.waiter.send(false);
                self.suppressed(prev.count, "superseded");
                prev.count.saturating_add(1)
            }
            None => 1,
        };
        state.batch = Some(Batch {
            value,
            count,
            waiter,
        });
        count
    }

    fn arm(self: &Arc<Self>, state: &mut State<T>, window: Duration) {
        state.generation += 1;
        let generation = state.generation;
        let due = deadline(Instant::now(), window);
        let inner = Arc::clone(self);
        tokio::spawn(async move {
            time::sleep_until(due).await;
            if Instant::now() <= due {
                // let a hit scheduled for the same instant land first
                time::sleep_until(deadline(due, TICK)).await;
            }
            inner.expire(generation);
        });
    }

    fn expire(self: &Arc<Self>, generation: u64) {
        let mut state = self.lock();
        if state.generation != generation {
            return;
        }
        let Some(batch) = state.batch.take() else {
            return;
        };

        let policy = state.policy;
        let verdict = match policy {
            InterceptorPolicy::Debounce { .. } => None,
            InterceptorPolicy::Multiple { min, .. } if batch.count < min => Some("below_min"),
            InterceptorPolicy::Multiple { .. } => None,
            InterceptorPolicy::Times { min, .. } if batch.count < min => Some("below_min"),
            InterceptorPolicy::Times { max, .. } if batch.count > max => Some("above_max"),
            InterceptorPolicy::Times { .. } => None,
            InterceptorPolicy::Throttle { .. } => Some("reset"),
        };
        match verdict {
            None => self.fire(&mut state, batch.value, batch.count, batch.waiter),
            Some(reason) => {
                let _ = batch.waiter.send(false);
                self.suppressed(batch.count, reason);
            }
        }
        self.sync_working(&state);
    }

    fn fire(self: &Arc<Self>, state: &mut State<T>, value: T, count: u32, waiter: oneshot::Sender<bool>) {
        state.firing += 1;
        if let Some(bus) = &self.bus {
            bus.publish(
                Event::new(EventKind::HitFired)
                    .with_task(Arc::clone(&self.name))
                    .with_attempt(count),
            );
        }

        let inner = Arc::clone(self);
        let action = Arc::clone(&self.action);
        tokio::spawn(async move {
            let run = AssertUnwindSafe(async move { action(value).await });
            if let Err(panic) = run.catch_unwind().await {
                tracing::error!(
                    interceptor = %inner.name,
                    info = %panic_message(panic.as_ref()),
                    "interceptor action panicked"
                );
            }

            {
                let mut state = inner.lock();
                state.firing = state.firing.saturating_sub(1);
                inner.sync_working(&state);
            }
            let _ = waiter.send(true);
        });
    }

    fn reset(&self, state: &mut State<T>) {
        state.generation += 1;
        state.throttled_until = None;
        if let Some(batch) = state.batch.take() {
            let _ = batch.waiter.send(false);
            self.suppressed(batch.count, "reset");
        }
        self.sync_working(state);
    }

    fn sync_working(&self, state: &State<T>) {
        let busy = state.batch.is_some() || state.firing > 0;
        self.working.send_if_modified(|current| {
            if *current == busy {
                return false;
            }
            *current = busy;
            true
        });
    }

    fn suppressed(&self, count: u32, reason: &'static str) {
        tracing::trace!(interceptor = %self.name, count, reason, "hit suppressed");
        if let Some(bus) = &self.bus {
            bus.publish(
                Event::new(EventKind::HitSuppressed)
                    .with_task(Arc::clone(&self.name))
                    .with_attempt(count)
                    .with_reason(reason),
            );
        }
    }
}

impl<T> Clone for Interceptor<T> {
    fn clone(&self) -> Self {
        Self {
            inner: Arc::clone(&self.inner),
        }
    }
}

impl<T> fmt::Debug for Interceptor<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Interceptor")
            .field("name", &self.inner.name)
            .field("working", &*self.inner.working.borrow())
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn recording(policy: InterceptorPolicy) -> (Interceptor<u32>, Arc<Mutex<Vec<u32>>>) {
        let seen = Arc::new(Mutex::new(Vec::new()));
        let sink = Arc::clone(&seen);
        let interceptor = Interceptor::new("test", policy, move |v: u32| {
            let sink = Arc::clone(&sink);
            async move { sink.lock().unwrap().push(v) }
        });
        (interceptor, seen)
    }

    async fn after(ms: u64) {
        time::sleep(Duration::from_millis(ms)).await;
    }

    #[tokio::test(start_paused = true)]
    async fn test_debounce_fires_last_value_once() {
        let (i, seen) = recording(InterceptorPolicy::debounce(Duration::from_millis(100)));

        let (a, b, c) = tokio::join!(
            i.invoke(1),
            async {
                after(60).await;
                i.invoke(2).await
            },
            async {
                after(120).await;
                i.invoke(3).await
            },
        );

        assert_eq!((a, b, c), (false, false, true));
        assert_eq!(*seen.lock().unwrap(), vec![3]);
    }

    #[tokio::test(start_paused = true)]
    async fn test_debounce_hits_on_window_boundary_fire_once() {
        let (i, seen) = recording(InterceptorPolicy::debounce(Duration::from_millis(100)));

        let mut hits = Vec::new();
        for v in 1..=4 {
            let i = i.clone();
            hits.push(tokio::spawn(async move { i.invoke(v).await }));
            after(100).await;
        }
        i.wait().await;

        let mut outcomes = Vec::new();
        for h in hits {
            outcomes.push(h.await.unwrap());
        }
        assert_eq!(outcomes, vec![false, false, false, true]);
        assert_eq!(*seen.lock().unwrap(), vec![4]);
    }

    #[tokio::test(start_paused = true)]
    async fn test_throttle_with_unbounded_window() {
        let (i, seen) = recording(InterceptorPolicy::throttle(Duration::MAX));

        assert!(i.invoke(1).await);
        assert!(!i.invoke(2).await);
        after(60_000).await;
        assert!(!i.invoke(3).await);

        i.reset_duration();
        assert!(i.invoke(4).await);
        assert_eq!(*seen.lock().unwrap(), vec![1, 4]);
    }

    #[tokio::test(start_paused = true)]
    async fn test_throttle_drops_inside_window() {
        let (i, seen) = recording(InterceptorPolicy::throttle(Duration::from_millis(100)));

        assert!(i.invoke(1).await);
        assert!(!i.invoke(2).await);
        after(150).await;
        assert!(i.invoke(3).await);

        assert_eq!(*seen.lock().unwrap(), vec![1, 3]);
    }

    #[tokio::test(start_paused = true)]
    async fn test_multiple_fires_at_max_and_at_window_end() {
        let (i, seen) = recording(InterceptorPolicy::multiple(2, 3, Duration::from_millis(100)));

        let burst = tokio::join!(i.invoke(1), i.invoke(2), i.invoke(3));
        assert_eq!(burst, (false, false, true));

        let pair = tokio::join!(i.invoke(4), i.invoke(5));
        assert_eq!(pair, (false, true));

        assert!(!i.invoke(6).await);
        assert_eq!(*seen.lock().unwrap(), vec![3, 5]);
    }

    #[tokio::test(start_paused = true)]
    async fn test_times_requires_exact_batch() {
        let (i, seen) = recording(InterceptorPolicy::times(2, 2, Duration::from_millis(100)));

        let double = tokio::join!(i.invoke(1), i.invoke(2));
        assert_eq!(double, (false, true));

        let triple = tokio::join!(i.invoke(3), i.invoke(4), i.invoke(5));
        assert_eq!(triple, (false, false, false));

        assert!(!i.invoke(6).await);
        assert_eq!(*seen.lock().unwrap(), vec![2]);
    }

    #[tokio::test(start_paused = true)]
    async fn test_reset_clears_pending_batch() {
        let (i, seen) = recording(InterceptorPolicy::debounce(Duration::from_millis(100)));

        let (fired, ()) = tokio::join!(i.invoke(1), async {
            after(10).await;
            assert!(i.is_working());
            i.reset_duration();
        });

        assert!(!fired);
        assert!(!i.is_working());
        after(200).await;
        assert!(seen.lock().unwrap().is_empty());
    }

    #[tokio::test(start_paused = true)]
    async fn test_set_policy_resets_state() {
        let (i, seen) = recording(InterceptorPolicy::throttle(Duration::from_secs(10)));

        assert!(i.invoke(1).await);
        assert!(!i.invoke(2).await);

        i.set_policy(InterceptorPolicy::throttle(Duration::from_secs(10)));
        assert!(i.invoke(3).await);
        assert_eq!(i.policy(), InterceptorPolicy::throttle(Duration::from_secs(10)));
        assert_eq!(*seen.lock().unwrap(), vec![1, 3]);
    }

    #[tokio::test(start_paused = true)]
    async fn test_wait_drains_pending_work() {
        let (i, seen) = recording(InterceptorPolicy::debounce(Duration::from_millis(50)));

        let handle = tokio::spawn({
            let i = i.clone();
            async move { i.invoke(7).await }
        });
        after(1).await;
        assert!(i.is_working());

        i.wait().await;
        assert!(!i.is_working());
        assert_eq!(*seen.lock().unwrap(), vec![7]);
        assert!(handle.await.unwrap());
    }

    #[tokio::test(start_paused = true)]
    async fn test_panicking_action_is_isolated() {
        let i = Interceptor::new(
            "panicky",
            InterceptorPolicy::throttle(Duration::from_millis(10)),
            |v: u32| async move {
                if v == 1 {
                    panic!("boom");
                }
            },
        );

        assert!(i.invoke(1).await);
        assert!(!i.is_working());
        after(20).await;
        assert!(i.invoke(2).await);
    }

    #[tokio::test(start_paused = true)]
    async fn test_events_published() {
        let bus = Bus::new(16);
        let mut rx = bus.subscribe();
        let i = Interceptor::new_with_bus(
            "hits",
            InterceptorPolicy::throttle(Duration::from_millis(100)),
            bus,
            |_: u32| async {},
        );

        assert!(i.invoke(1).await);
        assert!(!i.invoke(2).await);

        let fired = rx.recv().await.unwrap();
        assert_eq!(fired.kind, EventKind::HitFired);
        assert_eq!(fired.task.as_deref(), Some("hits"));

        let dropped = rx.recv().await.unwrap();
        assert_eq!(dropped.kind, EventKind::HitSuppressed);
        assert_eq!(dropped.reason.as_deref(), Some("throttled"));
    }
}
