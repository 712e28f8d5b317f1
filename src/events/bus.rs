//! # Event bus.
//!
//! Every retry task, interceptor and equipartition task of one
//! [`Coordinator`](crate::Coordinator) publishes into the same [`Bus`]; the
//! coordinator's listener and any ad-hoc receiver from [`Bus::subscribe`]
//! read from it.
//!
//! Publishing never waits. Events sent while nobody listens are lost, and a
//! receiver more than `capacity` events behind skips ahead (`RecvError::Lagged`).

use tokio::sync::broadcast;

use super::event::Event;

/// Shared broadcast channel for fragment, retry and hit [`Event`]s.
#[derive(Clone, Debug)]
pub struct Bus {
    tx: broadcast::Sender<Event>,
}

impl Bus {
    /// Creates a bus buffering up to `capacity` events (at least 1).
    pub fn new(capacity: usize) -> Self {
        let (tx, _rx) = broadcast::channel::<Event>(capacity.max(1));
        Self { tx }
    }

    /// Publishes `ev`; a no-op when nobody is subscribed.
    pub fn publish(&self, ev: Event) {
        let _ = self.tx.send(ev);
    }

    /// New receiver for events published from now on.
    pub fn subscribe(&self) -> broadcast::Receiver<Event> {
        self.tx.subscribe()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::events::EventKind;

    #[tokio::test]
    async fn test_publish_reaches_subscribers() {
        let bus = Bus::new(0);
        let mut rx = bus.subscribe();

        bus.publish(Event::new(EventKind::HitFired).with_task("a"));
        let ev = rx.recv().await.unwrap();
        assert_eq!(ev.kind, EventKind::HitFired);
        assert_eq!(ev.task.as_deref(), Some("a"));
    }

    #[test]
    fn test_publish_without_receivers_is_noop() {
        let bus = Bus::new(4);
        bus.publish(Event::new(EventKind::HitSuppressed));
    }

    #[tokio::test]
    async fn test_lagging_receiver_skips_oldest() {
        let bus = Bus::new(2);
        let mut rx = bus.subscribe();
        for index in 0..4 {
            bus.publish(Event::new(EventKind::FragmentPicked).with_attempt(index));
        }

        assert!(matches!(
            rx.recv().await,
            Err(broadcast::error::RecvError::Lagged(2))
        ));
        assert_eq!(rx.recv().await.unwrap().attempt, Some(2));
    }
}
