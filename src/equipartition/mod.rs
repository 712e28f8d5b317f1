//! Equipartition: a job split into numbered fragments for distribution to workers.
//!
//! ## Contents
//! - [`Fragment`], [`FragmentState`], [`QueryData`] value handles and their encodings
//! - [`EquipartitionTask`] the fragment arena with `pick` / `update_fragment`
//! - [`EquipartitionTaskContainer`], [`DuplicateKeyPolicy`] registry keyed by (owner, job)
//!
//! ## Worker loop
//! ```text
//! container.create(owner, job, n, desc) ──► Arc<EquipartitionTask>
//!
//! loop {
//!   ├─► task.pick()                ─► None → no eligible fragment, stop
//!   ├─► ship fragment.to_string()  ─► remote worker
//!   ├─► Fragment::parse(reply)
//!   └─► task.update_fragment(&f, Success | Failure | Fatal)
//! }
//! ```

mod container;
mod fragment;
mod task;

pub use container::{DuplicateKeyPolicy, EquipartitionTaskContainer};
pub use fragment::{Fragment, FragmentState, QueryData};
pub use task::EquipartitionTask;
