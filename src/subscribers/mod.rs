//! # Event subscribers.
//!
//! This module provides the [`Subscribe`] trait, the [`SubscriberSet`]
//! fan-out and (with the `logging` feature) the [`LogWriter`] bridge.
//!
//! ## Architecture
//! ```text
//! RetryTask / Interceptor / EquipartitionTask ── publish(Event) ──► Bus
//!                                                                   │
//!                                      Coordinator listener ◄───────┘
//!                                                │
//!                                        SubscriberSet::emit
//!                                                │
//!                                  ┌─────────────┼──────────────┐
//!                                  ▼             ▼              ▼
//!                              LogWriter      Progress        Custom
//! ```

#[cfg(feature = "logging")]
mod log;
mod set;
mod subscriber;

#[cfg(feature = "logging")]
pub use log::LogWriter;
pub use set::SubscriberSet;
pub use subscriber::Subscribe;
