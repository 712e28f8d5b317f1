//! Coordinator: shared wiring for retry tasks, interceptors and the task container.
//!
//! The only public API from this module is [`Coordinator`] (plus its
//! [`Config`] and [`CoordinatorBuilder`]), which owns the event bus, fans
//! events out to subscribers and hands out bus-attached components.
//!
//! Internal modules:
//! - [`config`]: coordinator settings and defaults;
//! - [`builder`]: assembles bus, subscriber set and container;
//! - [`coordinator`]: the handle and its event listener.

mod builder;
mod config;
mod coordinator;

pub use builder::CoordinatorBuilder;
pub use config::Config;
pub use coordinator::Coordinator;
