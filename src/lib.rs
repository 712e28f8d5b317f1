//! # fragvisor
//!
//! **Fragvisor** is a small toolkit for splitting work into fragments and
//! driving unreliable actions to completion in async Rust.
//!
//! It provides three building blocks that share one event bus:
//! - **Equipartition tasks**: a job divided into numbered fragments that
//!   concurrent workers claim with `pick` and settle with `update_fragment`.
//! - **Retry loops**: run an action under a retry schedule with a
//!   caller-supplied error classifier and cooperative cancellation.
//! - **Interceptors**: debounce, throttle or count the hits aimed at an action.
//!
//! ## Architecture
//! ### Overview
//! ```text
//!   ┌────────────────────┐  ┌────────────────────┐  ┌────────────────────┐
//!   │ EquipartitionTask  │  │     RetryTask      │  │    Interceptor     │
//!   │ (fragment arena)   │  │  (retry loop)      │  │ (hit shaping)      │
//!   └─────────┬──────────┘  └─────────┬──────────┘  └─────────┬──────────┘
//!             │ TaskCreated           │ AttemptStarting       │ HitFired
//!             │ FragmentPicked        │ AttemptFailed         │ HitSuppressed
//!             │ FragmentUpdated       │ RetryScheduled        │
//!             │ FragmentRejected      │ RetrySucceeded / ...  │
//!             ▼                       ▼                       ▼
//! ┌──────────────────────────────────────────────────────────────────────┐
//! │                    Bus (broadcast channel)                           │
//! │                 (capacity: Config::bus_capacity)                     │
//! └──────────────────────────────────┬───────────────────────────────────┘
//!                                    ▼
//!                        ┌────────────────────────┐
//!                        │  subscriber_listener   │
//!                        │    (in Coordinator)    │
//!                        └───────────┬────────────┘
//!                                    ▼
//!                              SubscriberSet
//!                             (per-sub queues)
//!                         ┌──────────┼──────────┐
//!                         ▼          ▼          ▼
//!                      worker1    worker2    workerN
//! ```
//!
//! ### Fragment lifecycle
//! ```text
//! Waiting ──pick──► Working ──update──► Success (done)
//!                      │
//!                      └──update──► Failure ──pick──► Retrying ──update──► Success | Fatal (done)
//!                                      ▲                                │
//!                                      └────────────update──────────────┘
//! ```
//!
//! ## Features
//! | Area               | Description                                              | Key types / traits                                   |
//! |--------------------|----------------------------------------------------------|------------------------------------------------------|
//! | **Equipartition**  | Fragment claim/report state machine and task registry.   | [`EquipartitionTask`], [`EquipartitionTaskContainer`] |
//! | **Fragments**      | Lossless JSON and query encodings of fragment handles.   | [`Fragment`], [`FragmentState`], [`QueryData`]       |
//! | **Retry**          | Retry loop with classifier and cancellation.             | [`RetryTask`], [`ErrorHandler`], [`RetryResult`]     |
//! | **Policies**       | Linear, exponential and custom retry schedules.          | [`RetryPolicy`], [`LinearRetryPolicy`]               |
//! | **Interceptors**   | Debounce / throttle / multiple / times hit shaping.      | [`Interceptor`], [`InterceptorPolicy`]               |
//! | **Subscriber API** | Hook into every component's events.                      | [`Subscribe`], [`Event`], [`EventKind`]              |
//! | **Errors**         | Typed errors and a closed error-kind taxonomy.           | [`RetryError`], [`FragmentError`], [`ErrorKind`]     |
//! | **Configuration**  | Centralize bus, retry and registry settings.             | [`Config`], [`Coordinator`]                          |
//!
//! ## Optional features
//! - `logging`: exports [`LogWriter`], a subscriber that forwards events to `tracing`.
//!
//! ## Example
//! ```rust
//! use std::sync::Arc;
//! use fragvisor::{ActionError, Config, Coordinator, ErrorKind, FragmentState, RetryOn};
//!
//! #[tokio::main(flavor = "current_thread")]
//! async fn main() {
//!     // Build subscribers (optional)
//!     #[cfg(feature = "logging")]
//!     let subs: Vec<Arc<dyn fragvisor::Subscribe>> = vec![Arc::new(fragvisor::LogWriter)];
//!     #[cfg(not(feature = "logging"))]
//!     let subs: Vec<Arc<dyn fragvisor::Subscribe>> = Vec::new();
//!
//!     let coord = Coordinator::builder(Config::default())
//!         .with_subscribers(subs)
//!         .build();
//!
//!     let task = coord.container().create("etl", "import-42", 3, "nightly import").await;
//!     let retry = coord.retry_task("import");
//!     let transient = RetryOn::kinds([ErrorKind::Timeout]);
//!     let token = coord.token();
//!
//!     while let Some(fragment) = task.pick() {
//!         let state = match retry
//!             .process_sync(&token, &transient, || Ok::<_, ActionError>(fragment.index() * 2))
//!             .await
//!         {
//!             Ok(r) if r.is_successful() == Some(true) => FragmentState::Success,
//!             _ => FragmentState::Failure,
//!         };
//!         task.update_fragment(&fragment, state);
//!     }
//!
//!     assert!(task.is_done());
//!     coord.shutdown().await;
//! }
//! ```

mod core;
mod equipartition;
mod error;
mod events;
mod interceptor;
mod policies;
mod retry;
mod subscribers;

// ---- Public re-exports ----

pub use crate::core::{Config, Coordinator, CoordinatorBuilder};
pub use crate::equipartition::{
    DuplicateKeyPolicy, EquipartitionTask, EquipartitionTaskContainer, Fragment, FragmentState,
    QueryData,
};
pub use crate::error::{ActionError, ErrorKind, FragmentError, Kinded, RetryError};
pub use crate::events::{Bus, Event, EventKind};
pub use crate::interceptor::{Interceptor, InterceptorPolicy};
pub use crate::policies::{
    CustomizedRetryPolicy, ExponentialRetryPolicy, JitterPolicy, LinearRetryPolicy, RetryInstance,
    RetryPolicy,
};
pub use crate::retry::{ErrorHandler, RetryAll, RetryOn, RetryResult, RetryTask, Verdict};
pub use crate::subscribers::{Subscribe, SubscriberSet};

// Optional: expose the tracing bridge subscriber.
// Enable with: `--features logging`
#[cfg(feature = "logging")]
pub use crate::subscribers::LogWriter;
