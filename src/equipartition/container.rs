//! # Registry of equipartition tasks keyed by (owner, job).
//!
//! [`EquipartitionTaskContainer`] materializes tasks on demand and announces
//! each new one on the bus as [`EventKind::TaskCreated`].
//!
//! ## Architecture
//! ```text
//! create(owner, job, count, desc)
//!     │
//!     ├─► write lock ─► owner ─► job ─► existing?
//!     │                                  ├─ yes + Reuse   → return existing
//!     │                                  └─ no / Replace  → insert new task
//!     └─► publish TaskCreated{task id, owner, job}   (new tasks only)
//! ```
//!
//! ## Rules
//! - Distinct keys never share fragment state
//! - Lookups and writes go through one `RwLock`; no cross-task locking
//! - A replaced task stays valid for callers still holding its `Arc`

use std::collections::HashMap;
use std::sync::Arc;

use tokio::sync::RwLock;

use crate::equipartition::task::EquipartitionTask;
use crate::events::{Bus, Event, EventKind};

/// What [`EquipartitionTaskContainer::create`] does with a key that already exists.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum DuplicateKeyPolicy {
    /// Return the existing task unchanged (default).
    #[default]
    Reuse,
    /// Build a fresh task and replace the registered one.
    Replace,
}

/// Registry of tasks, grouped by owner then job.
pub struct EquipartitionTaskContainer {
    tasks: RwLock<HashMap<String, HashMap<String, Arc<EquipartitionTask>>>>,
    duplicates: DuplicateKeyPolicy,
    bus: Option<Bus>,
}

impl EquipartitionTaskContainer {
    /// Creates an empty container without event publishing.
    pub fn new(duplicates: DuplicateKeyPolicy) -> Self {
        Self {
            tasks: RwLock::new(HashMap::new()),
            duplicates,
            bus: None,
        }
    }

    /// Publishes task creation and, through the tasks, fragment transitions to `bus`.
    pub fn with_bus(mut self, bus: Bus) -> Self {
        self.bus = Some(bus);
        self
    }

    /// Duplicate-key behaviour of this container.
    pub fn duplicate_policy(&self) -> DuplicateKeyPolicy {
        self.duplicates
    }

    /// Returns the task for `(owner, job)`, creating it with `count` fragments if needed.
    ///
    /// With [`DuplicateKeyPolicy::Replace`] a new task is always built.
    pub async fn create(
        &self,
        owner: &str,
        job: &str,
        count: u32,
        description: impl Into<String>,
    ) -> Arc<EquipartitionTask> {
        let task = {
            let mut tasks = self.tasks.write().await;
            let jobs = tasks.entry(owner.to_string()).or_default();

            if self.duplicates == DuplicateKeyPolicy::Reuse {
                if let Some(existing) = jobs.get(job) {
                    return Arc::clone(existing);
                }
            }

            let mut task = EquipartitionTask::new(owner, job, count, description);
            if let Some(bus) = &self.bus {
                task = task.with_bus(bus.clone());
            }
            let task = Arc::new(task);
            jobs.insert(job.to_string(), Arc::clone(&task));
            task
        };

        tracing::debug!(task = %task.id(), owner, job, count, "equipartition task created");
        if let Some(bus) = &self.bus {
            bus.publish(
                Event::new(EventKind::TaskCreated)
                    .with_task(task.id().to_string())
                    .with_owner(owner)
                    .with_job(job),
            );
        }
        task
    }

    /// Looks up the task for `(owner, job)`.
    pub async fn get(&self, owner: &str, job: &str) -> Option<Arc<EquipartitionTask>> {
        let tasks = self.tasks.read().await;
        tasks.get(owner)?.get(job).cloned()
    }

    /// All tasks of `owner`, sorted by job key.
    pub async fn list(&self, owner: &str) -> Vec<Arc<EquipartitionTask>> {
        let tasks = self.tasks.read().await;
        let mut found: Vec<Arc<EquipartitionTask>> = tasks
            .get(owner)
            .map(|jobs| jobs.values().cloned().collect())
            .unwrap_or_default();
        found.sort_unstable_by(|a, b| a.job_id().cmp(b.job_id()));
        found
    }

    /// Unregisters `(owner, job)`; returns the removed task.
    pub async fn remove(&self, owner: &str, job: &str) -> Option<Arc<EquipartitionTask>> {
        let mut tasks = self.tasks.write().await;
        let jobs = tasks.get_mut(owner)?;
        let removed = jobs.remove(job);
        if jobs.is_empty() {
            tasks.remove(owner);
        }
        removed
    }

    /// Number of registered tasks.
    pub async fn len(&self) -> usize {
        self.tasks.read().await.values().map(HashMap::len).sum()
    }

    /// True if no task is registered.
    pub async fn is_empty(&self) -> bool {
        self.tasks.read().await.is_empty()
    }
}

impl Default for EquipartitionTaskContainer {
    fn default() -> Self {
        Self::new(DuplicateKeyPolicy::default())
    }
}
