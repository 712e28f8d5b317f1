//! # Event subscriber trait.
//!
//! Implement [`Subscribe`] to watch fragments, retries and hits of a
//! [`Coordinator`](crate::Coordinator); pass it to
//! [`CoordinatorBuilder::with_subscribers`](crate::CoordinatorBuilder::with_subscribers).
//! Delivery rules live on [`SubscriberSet`](crate::SubscriberSet).
//!
//! ## Example
//! ```rust
//! use async_trait::async_trait;
//! use fragvisor::{Event, EventKind, Subscribe};
//!
//! struct Progress;
//!
//! #[async_trait]
//! impl Subscribe for Progress {
//!     async fn on_event(&self, ev: &Event) {
//!         if matches!(ev.kind, EventKind::FragmentUpdated) {
//!             // advance a progress bar, etc.
//!         }
//!     }
//!
//!     fn name(&self) -> &'static str { "progress" }
//!     fn queue_capacity(&self) -> usize { 2048 }
//! }
//! ```

use async_trait::async_trait;

use crate::events::Event;

/// Observer of coordinator events.
///
/// A panic in [`on_event`](Self::on_event) is caught and reported as
/// `SubscriberPanicked`; later events are still delivered.
#[async_trait]
pub trait Subscribe: Send + Sync + 'static {
    /// Handles one event, on this subscriber's own worker task.
    async fn on_event(&self, event: &Event);

    /// Name used in logs and overflow/panic events; defaults to the type name.
    fn name(&self) -> &'static str {
        std::any::type_name::<Self>()
    }

    /// Events buffered before overflow (at least 1).
    fn queue_capacity(&self) -> usize {
        1024
    }
}
