//! Events: types and broadcast bus.
//!
//! This module groups the event **data model** and the **bus** used to
//! publish/subscribe to events emitted by retry loops, interceptors,
//! equipartition tasks and subscriber workers.
//!
//! ## Contents
//! - [`EventKind`], [`Event`] event classification and payload metadata
//! - [`Bus`] thin wrapper over `tokio::sync::broadcast`
//!
//! ## Quick reference
//! - **Publishers**: `RetryTask`, `Interceptor`, `EquipartitionTask`,
//!   `EquipartitionTaskContainer`, `SubscriberSet` workers (overflow/panic).
//! - **Consumers**: the `Coordinator` listener (fans out to `SubscriberSet`),
//!   or anyone holding a receiver from [`Bus::subscribe`].

mod bus;
mod event;

pub use bus::Bus;
pub use event::{Event, EventKind};
