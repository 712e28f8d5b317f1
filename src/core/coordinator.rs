//! # Coordinator: owns the event bus and hands out wired components.
//!
//! The [`Coordinator`] is the entry point that ties the crate together:
//! every [`RetryTask`], [`Interceptor`] and [`EquipartitionTask`](crate::EquipartitionTask)
//! it creates publishes to one [`Bus`], and a listener forwards that bus
//! to the registered subscribers.
//!
//! ## Architecture
//! ```text
//! CoordinatorBuilder::build()
//!     ├─► Bus::new(cfg.bus_capacity_clamped())
//!     ├─► SubscriberSet::new(subscribers, bus)
//!     ├─► EquipartitionTaskContainer::new(cfg.duplicate_keys).with_bus(bus)
//!     └─► listener: Bus.subscribe() ─► SubscriberSet::emit(&Event)
//!
//! retry_task(name)          ─► RetryTask(cfg.retry).with_bus(bus)
//! interceptor(name, p, f)   ─► Interceptor::new_with_bus(name, p, bus, f)
//! container().create(..)    ─► EquipartitionTask.with_bus(bus)
//!
//! shutdown()
//!     ├─► token.cancel()          (child tokens handed to retry loops fire)
//!     ├─► listener drains what is already queued on the bus
//!     └─► SubscriberSet::shutdown (workers finish their queues)
//! ```
//!
//! ## Example
//! ```rust
//! use std::time::Duration;
//! use fragvisor::{ActionError, Config, Coordinator, FragmentState, RetryAll};
//!
//! # #[tokio::main(flavor = "current_thread")]
//! # async fn main() {
//! let coord = Coordinator::builder(Config::default()).build();
//!
//! let task = coord.container().create("reports", "2024-q1", 4, "quarterly").await;
//! let retry = coord.retry_task("render");
//! let token = coord.token();
//!
//! while let Some(fragment) = task.pick() {
//!     let outcome = retry
//!         .process_sync(&token, &RetryAll, || Ok::<_, ActionError>(fragment.index()))
//!         .await;
//!     let state = match outcome {
//!         Ok(r) if r.is_successful() == Some(true) => FragmentState::Success,
//!         _ => FragmentState::Failure,
//!     };
//!     task.update_fragment(&fragment, state);
//! }
//!
//! assert!(task.is_done());
//! coord.shutdown().await;
//! # }
//! ```

use std::future::Future;
use std::sync::Arc;

use tokio::sync::broadcast::error::RecvError;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;

use crate::core::{Config, CoordinatorBuilder};
use crate::equipartition::EquipartitionTaskContainer;
use crate::events::Bus;
use crate::interceptor::{Interceptor, InterceptorPolicy};
use crate::policies::RetryPolicy;
use crate::retry::RetryTask;
use crate::subscribers::{Subscribe, SubscriberSet};

/// Shared wiring for retry tasks, interceptors and equipartition tasks.
///
/// ### Responsibilities
/// - **Event delivery**: forwards the bus to subscribers via [`SubscriberSet`]
/// - **Component factory**: retry tasks and interceptors come pre-attached to the bus
/// - **Task registry**: owns the [`EquipartitionTaskContainer`]
/// - **Cancellation**: [`token`](Self::token) children fire on [`shutdown`](Self::shutdown)
pub struct Coordinator {
    cfg: Config,
    bus: Bus,
    container: Arc<EquipartitionTaskContainer>,
    retry: Arc<dyn RetryPolicy>,
    token: CancellationToken,
    listener: JoinHandle<()>,
}

impl Coordinator {
    /// Creates a coordinator with `subscribers`; shorthand for the builder.
    ///
    /// Must be called inside a Tokio runtime.
    pub fn new(cfg: Config, subscribers: Vec<Arc<dyn Subscribe>>) -> Self {
        Self::builder(cfg).with_subscribers(subscribers).build()
    }

    /// Starts a [`CoordinatorBuilder`].
    pub fn builder(cfg: Config) -> CoordinatorBuilder {
        CoordinatorBuilder::new(cfg)
    }

    pub(crate) fn new_internal(
        cfg: Config,
        bus: Bus,
        subs: SubscriberSet,
        container: Arc<EquipartitionTaskContainer>,
        token: CancellationToken,
    ) -> Self {
        let listener = Self::subscriber_listener(&bus, subs, token.clone());
        let retry: Arc<dyn RetryPolicy> = Arc::new(cfg.retry);
        Self {
            cfg,
            bus,
            container,
            retry,
            token,
            listener,
        }
    }

    /// Configuration this coordinator was built from.
    pub fn config(&self) -> &Config {
        &self.cfg
    }

    /// Event bus shared by every component of this coordinator.
    pub fn bus(&self) -> &Bus {
        &self.bus
    }

    /// Equipartition task registry.
    pub fn container(&self) -> &Arc<EquipartitionTaskContainer> {
        &self.container
    }

    /// Cancellation token that fires on [`shutdown`](Self::shutdown).
    ///
    /// Cancelling the returned token does not affect the coordinator.
    pub fn token(&self) -> CancellationToken {
        self.token.child_token()
    }

    /// Retry task using the configured default schedule.
    pub fn retry_task(&self, name: impl Into<Arc<str>>) -> RetryTask {
        RetryTask::new(name, Arc::clone(&self.retry)).with_bus(self.bus.clone())
    }

    /// Retry task using an explicit schedule.
    pub fn retry_task_with(&self, name: impl Into<Arc<str>>, policy: Arc<dyn RetryPolicy>) -> RetryTask {
        RetryTask::new(name, policy).with_bus(self.bus.clone())
    }

    /// Interceptor around `action`, publishing its hits on the bus.
    pub fn interceptor<T, F, Fut>(
        &self,
        name: impl Into<Arc<str>>,
        policy: InterceptorPolicy,
        action: F,
    ) -> Interceptor<T>
    where
        T: Send + 'static,
        F: Fn(T) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = ()> + Send + 'static,
    {
        Interceptor::new_with_bus(name, policy, self.bus.clone(), action)
    }

    /// Cancels outstanding work, delivers queued events and stops subscriber workers.
    pub async fn shutdown(self) {
        self.token.cancel();
        if let Err(e) = self.listener.await {
            tracing::error!(error = %e, "event listener failed");
        }
    }

    /// Forwards bus events to the subscriber set until cancelled, then drains.
    fn subscriber_listener(bus: &Bus, subs: SubscriberSet, token: CancellationToken) -> JoinHandle<()> {
        let mut rx = bus.subscribe();
        tokio::spawn(async move {
            loop {
                tokio::select! {
                    biased;
                    res = rx.recv() => match res {
                        Ok(ev) => subs.emit(&ev),
                        Err(RecvError::Lagged(skipped)) => {
                            tracing::warn!(skipped, "event listener lagged");
                        }
                        Err(RecvError::Closed) => break,
                    },
                    _ = token.cancelled() => break,
                }
            }
            while let Ok(ev) = rx.try_recv() {
                subs.emit(&ev);
            }
            subs.shutdown().await;
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Mutex;
    use std::time::Duration;

    use async_trait::async_trait;

    use crate::equipartition::FragmentState;
    use crate::error::ActionError;
    use crate::events::{Event, EventKind};
    use crate::policies::LinearRetryPolicy;
    use crate::retry::RetryAll;

    #[derive(Default)]
    struct Collect {
        seen: Mutex<Vec<EventKind>>,
    }

    #[async_trait]
    impl Subscribe for Collect {
        async fn on_event(&self, event: &Event) {
            self.seen.lock().unwrap().push(event.kind);
        }
    }

    #[tokio::test]
    async fn test_events_reach_subscribers_before_shutdown_returns() {
        let collect = Arc::new(Collect::default());
        let coord = Coordinator::new(Config::default(), vec![collect.clone() as Arc<dyn Subscribe>]);

        let task = coord.container().create("o", "j", 1, "").await;
        let fragment = task.pick().unwrap();
        assert!(task.update_fragment(&fragment, FragmentState::Success));

        coord.shutdown().await;
        assert_eq!(
            *collect.seen.lock().unwrap(),
            vec![
                EventKind::TaskCreated,
                EventKind::FragmentPicked,
                EventKind::FragmentUpdated,
            ]
        );
    }

    #[tokio::test]
    async fn test_retry_task_uses_configured_schedule() {
        let cfg = Config {
            retry: LinearRetryPolicy::fixed(1, Duration::ZERO),
            ..Config::default()
        };
        let coord = Coordinator::builder(cfg).build();
        let mut rx = coord.bus().subscribe();

        let result = coord
            .retry_task("flaky")
            .process_sync(&coord.token(), &RetryAll, || {
                Err::<(), _>(ActionError::application("down"))
            })
            .await
            .unwrap();

        assert_eq!(result.errors().len(), 2);
        assert_eq!(rx.recv().await.unwrap().kind, EventKind::AttemptStarting);
        coord.shutdown().await;
    }

    #[tokio::test]
    async fn test_shutdown_cancels_handed_out_tokens() {
        let coord = Coordinator::builder(Config::default()).build();
        let token = coord.token();
        let retry = coord.retry_task_with(
            "slow",
            Arc::new(LinearRetryPolicy::fixed(10, Duration::from_secs(60))),
        );

        let run = tokio::spawn(async move {
            retry
                .process_sync(&token, &RetryAll, || Err::<(), _>(ActionError::application("x")))
                .await
        });
        tokio::task::yield_now().await;
        coord.shutdown().await;

        assert!(run.await.unwrap().unwrap_err().is_canceled());
    }

    #[tokio::test]
    async fn test_interceptor_is_attached_to_bus() {
        let coord = Coordinator::builder(Config::default()).build();
        let mut rx = coord.bus().subscribe();
        let hits = coord.interceptor(
            "clicks",
            InterceptorPolicy::throttle(Duration::from_secs(1)),
            |_: ()| async {},
        );

        assert!(hits.invoke(()).await);
        let ev = rx.recv().await.unwrap();
        assert_eq!(ev.kind, EventKind::HitFired);
        assert_eq!(ev.task.as_deref(), Some("clicks"));
        coord.shutdown().await;
    }
}
