//! # Non-blocking event fan-out to subscribers.
//!
//! [`SubscriberSet`] hands each event to every subscriber through its own
//! bounded queue, so a slow progress tracker never delays an audit log.
//!
//! ## Architecture
//! ```text
//! emit(event)
//!     │
//!     ├──► [queue 1] ──► worker 1 ──► subscriber1.on_event()
//!     │    (bounded)         └──────► panic → SubscriberPanicked
//!     ├──► [queue 2] ──► worker 2 ──► subscriber2.on_event()
//!     └──► [queue N] ──► worker N ──► subscriberN.on_event()
//! ```
//!
//! ## Rules
//! - **No cross-subscriber ordering**; per-subscriber FIFO only
//! - **Overflow**: event dropped for that subscriber only, `SubscriberOverflow` published
//! - **Non-blocking**: `emit()` returns immediately (uses `try_send`)
//! - **Isolation**: a panicking subscriber keeps receiving later events
//!
//! **Warning**: `AssertUnwindSafe` is used, which can leave shared state inconsistent
//! if a subscriber panics while holding a lock.

use std::panic::AssertUnwindSafe;
use std::sync::Arc;

use futures::FutureExt;
use tokio::{sync::mpsc, task::JoinHandle};

use crate::error::panic_message;
use crate::events::{Bus, Event};
use crate::subscribers::Subscribe;

struct SubscriberChannel {
    name: &'static str,
    sender: mpsc::Sender<Arc<Event>>,
}

/// Fan-out coordinator for event subscribers.
pub struct SubscriberSet {
    channels: Vec<SubscriberChannel>,
    workers: Vec<JoinHandle<()>>,
    bus: Bus,
}

impl SubscriberSet {
    /// Creates a set and spawns one worker task per subscriber.
    ///
    /// Panics and overflows are reported on `bus`.
    #[must_use]
    pub fn new(subs: Vec<Arc<dyn Subscribe>>, bus: Bus) -> Self {
        let mut channels = Vec::with_capacity(subs.len());
        let mut workers = Vec::with_capacity(subs.len());

        for sub in subs {
            let name = sub.name();
            let (tx, mut rx) = mpsc::channel::<Arc<Event>>(sub.queue_capacity().max(1));
            let worker_bus = bus.clone();

            let handle = tokio::spawn(async move {
                while let Some(ev) = rx.recv().await {
                    let fut = sub.on_event(ev.as_ref());
                    if let Err(panic) = AssertUnwindSafe(fut).catch_unwind().await {
                        let info = panic_message(panic.as_ref());
                        tracing::error!(subscriber = sub.name(), %info, "subscriber panicked");
                        worker_bus.publish(Event::subscriber_panicked(sub.name(), info));
                    }
                }
            });
            channels.push(SubscriberChannel { name, sender: tx });
            workers.push(handle);
        }

        Self {
            channels,
            workers,
            bus,
        }
    }

    /// Number of registered subscribers.
    pub fn len(&self) -> usize {
        self.channels.len()
    }

    /// True if no subscriber is registered.
    pub fn is_empty(&self) -> bool {
        self.channels.is_empty()
    }

    /// Emits an event to all subscribers (clones the event).
    pub fn emit(&self, event: &Event) {
        self.emit_arc(Arc::new(event.clone()));
    }

    /// Emits a shared event to all subscribers.
    ///
    /// A full or closed queue drops the event for that subscriber and
    /// publishes `SubscriberOverflow`, unless the event is itself an overflow.
    pub fn emit_arc(&self, event: Arc<Event>) {
        let is_overflow = event.is_subscriber_overflow();

        for channel in &self.channels {
            let reason = match channel.sender.try_send(Arc::clone(&event)) {
                Ok(()) => continue,
                Err(mpsc::error::TrySendError::Full(_)) => "full",
                Err(mpsc::error::TrySendError::Closed(_)) => "closed",
            };
            if !is_overflow {
                tracing::warn!(subscriber = channel.name, reason, "subscriber dropped event");
                self.bus
                    .publish(Event::subscriber_overflow(channel.name, reason));
            }
        }
    }

    /// Closes every queue and waits for the workers to drain them.
    pub async fn shutdown(self) {
        drop(self.channels);

        for h in self.workers {
            let _ = h.await;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Mutex;

    use async_trait::async_trait;

    use crate::events::EventKind;

    #[derive(Default)]
    struct Collect {
        seen: Mutex<Vec<EventKind>>,
    }

    #[async_trait]
    impl Subscribe for Collect {
        async fn on_event(&self, event: &Event) {
            self.seen.lock().unwrap().push(event.kind);
        }

        fn name(&self) -> &'static str {
            "collect"
        }
    }

    struct Explode;

    #[async_trait]
    impl Subscribe for Explode {
        async fn on_event(&self, _event: &Event) {
            panic!("subscriber boom");
        }

        fn name(&self) -> &'static str {
            "explode"
        }
    }

    #[tokio::test]
    async fn test_delivers_in_order_and_drains_on_shutdown() {
        let collect = Arc::new(Collect::default());
        let set = SubscriberSet::new(vec![collect.clone() as Arc<dyn Subscribe>], Bus::new(8));

        set.emit(&Event::new(EventKind::TaskCreated));
        set.emit(&Event::new(EventKind::FragmentPicked));
        set.shutdown().await;

        assert_eq!(
            *collect.seen.lock().unwrap(),
            vec![EventKind::TaskCreated, EventKind::FragmentPicked]
        );
    }

    #[tokio::test]
    async fn test_panic_is_reported_and_isolated() {
        let bus = Bus::new(8);
        let mut rx = bus.subscribe();
        let collect = Arc::new(Collect::default());
        let subs: Vec<Arc<dyn Subscribe>> = vec![Arc::new(Explode), collect.clone()];
        let set = SubscriberSet::new(subs, bus);

        set.emit(&Event::new(EventKind::HitFired));
        set.shutdown().await;

        let ev = rx.recv().await.unwrap();
        assert_eq!(ev.kind, EventKind::SubscriberPanicked);
        assert_eq!(ev.task.as_deref(), Some("explode"));
        assert_eq!(ev.reason.as_deref(), Some("subscriber boom"));
        assert_eq!(*collect.seen.lock().unwrap(), vec![EventKind::HitFired]);
    }
}
