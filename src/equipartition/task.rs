//! # EquipartitionTask: one job split into a fixed number of fragments.
//!
//! Fragments live in an arena indexed by ordinal, allocated once at creation
//! and guarded by a single mutex, so the scan-and-claim in [`pick`] is atomic.
//!
//! ## Architecture
//! ```text
//! workers ──pick()──────────► [ Mutex<Arena> ] ──► Fragment handle (value)
//!    │                          states: [W, W, F, S, R, …]
//!    │                          processing, done
//!    └──update_fragment(h, s)─► validate id/index ─► check transition ─► apply
//! ```
//!
//! ## Rules
//! - `pick` prefers the lowest `Waiting` ordinal, then the lowest `Failure` ordinal
//! - Concurrent `pick` calls never return the same fragment
//! - `update_fragment` matches by task id and ordinal, never by reference
//! - A handle whose state no longer matches the arena is stale and refused,
//!   so an earlier claim cannot settle a later one
//! - A refused update returns `false` and mutates nothing
//! - There is no deadline on a picked fragment: a worker that never reports
//!   leaves it processing
//!
//! [`pick`]: EquipartitionTask::pick

use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::SystemTime;

use uuid::Uuid;

use crate::equipartition::fragment::{Fragment, FragmentState};
use crate::events::{Bus, Event, EventKind};

/// Mutable per-task state.
struct Arena {
    states: Vec<FragmentState>,
    processing: usize,
    done: usize,
}

/// A job split into `count` fragments handed out to workers.
pub struct EquipartitionTask {
    id: Uuid,
    owner: Arc<str>,
    job: Arc<str>,
    description: String,
    created_at: SystemTime,
    arena: Mutex<Arena>,
    bus: Option<Bus>,
}

impl EquipartitionTask {
    /// Creates a task with `count` fragments, all `Waiting`.
    pub fn new(
        owner: impl Into<Arc<str>>,
        job: impl Into<Arc<str>>,
        count: u32,
        description: impl Into<String>,
    ) -> Self {
        Self {
            id: Uuid::new_v4(),
            owner: owner.into(),
            job: job.into(),
            description: description.into(),
            created_at: SystemTime::now(),
            arena: Mutex::new(Arena {
                states: vec![FragmentState::Waiting; count as usize],
                processing: 0,
                done: 0,
            }),
            bus: None,
        }
    }

    /// Publishes fragment transitions to `bus`.
    pub fn with_bus(mut self, bus: Bus) -> Self {
        self.bus = Some(bus);
        self
    }

    /// Unique task id carried by every fragment handle.
    pub fn id(&self) -> Uuid {
        self.id
    }

    /// Owner key.
    pub fn owner(&self) -> &str {
        &self.owner
    }

    /// Job key.
    pub fn job_id(&self) -> &str {
        &self.job
    }

    /// Free-form description.
    pub fn description(&self) -> &str {
        &self.description
    }

    /// Creation time.
    pub fn created_at(&self) -> SystemTime {
        self.created_at
    }

    /// Total number of fragments.
    pub fn count(&self) -> u32 {
        self.lock().states.len() as u32
    }

    /// Claims the next eligible fragment.
    ///
    /// `Waiting` fragments go first and become `Working`; failing that, a
    /// `Failure` fragment becomes `Retrying`. Returns `None` when every
    /// fragment is processing or done.
    pub fn pick(&self) -> Option<Fragment> {
        let (index, state) = {
            let mut arena = self.lock();
            let slot = arena
                .states
                .iter()
                .position(|s| *s == FragmentState::Waiting)
                .or_else(|| {
                    arena
                        .states
                        .iter()
                        .position(|s| *s == FragmentState::Failure)
                })?;

            let next = match arena.states[slot] {
                FragmentState::Waiting => FragmentState::Working,
                _ => FragmentState::Retrying,
            };
            arena.states[slot] = next;
            arena.processing += 1;
            (slot as u32, next)
        };

        self.publish(
            Event::new(EventKind::FragmentPicked)
                .with_job(self.job.clone())
                .with_fragment(index, state),
        );
        Some(self.handle(index, state))
    }

    /// Records the outcome of a picked fragment.
    ///
    /// Returns `false`, mutating nothing, when the handle belongs to another
    /// task, was issued for an earlier claim of the fragment, or the
    /// transition is not allowed (see [`FragmentState::can_report`]).
    pub fn update_fragment(&self, fragment: &Fragment, state: FragmentState) -> bool {
        if fragment.task_id() != self.id || fragment.job_id() != &*self.job {
            self.reject(fragment.index(), state, "foreign_fragment");
            return false;
        }

        {
            let mut arena = self.lock();
            let Some(current) = arena.states.get(fragment.index() as usize).copied() else {
                drop(arena);
                self.reject(fragment.index(), state, "index_out_of_range");
                return false;
            };
            if fragment.state() != current {
                drop(arena);
                self.reject(fragment.index(), state, "stale_handle");
                return false;
            }
            if !current.can_report(state) {
                drop(arena);
                self.reject(fragment.index(), state, "illegal_transition");
                return false;
            }

            arena.states[fragment.index() as usize] = state;
            arena.processing -= 1;
            if state.is_done() {
                arena.done += 1;
            }
        }

        self.publish(
            Event::new(EventKind::FragmentUpdated)
                .with_job(self.job.clone())
                .with_fragment(fragment.index(), state),
        );
        true
    }

    /// Handle for ordinal `index` with its current state.
    pub fn fragment(&self, index: u32) -> Option<Fragment> {
        let state = self.lock().states.get(index as usize).copied()?;
        Some(self.handle(index, state))
    }

    /// Handles for every fragment, in ordinal order.
    pub fn fragments(&self) -> Vec<Fragment> {
        self.snapshot(|_| true)
    }

    /// Fragments not yet done: waiting, failed-awaiting-retry, or processing.
    pub fn get_waiting_or_processing_fragments(&self) -> Vec<Fragment> {
        self.snapshot(|s| !s.is_done())
    }

    /// Fragments currently claimed by a worker.
    pub fn get_processing_fragments(&self) -> Vec<Fragment> {
        self.snapshot(FragmentState::is_processing)
    }

    /// Fragments in a terminal state (`Success` or `Fatal`).
    pub fn get_done_fragments(&self) -> Vec<Fragment> {
        self.snapshot(FragmentState::is_done)
    }

    /// Number of fragments currently processing.
    pub fn processing_count(&self) -> usize {
        self.lock().processing
    }

    /// Number of fragments done.
    pub fn done_count(&self) -> usize {
        self.lock().done
    }

    /// True once every fragment is done.
    pub fn is_done(&self) -> bool {
        let arena = self.lock();
        arena.done == arena.states.len()
    }

    fn snapshot(&self, keep: impl Fn(FragmentState) -> bool) -> Vec<Fragment> {
        let states: Vec<(u32, FragmentState)> = self
            .lock()
            .states
            .iter()
            .enumerate()
            .filter(|(_, s)| keep(**s))
            .map(|(i, s)| (i as u32, *s))
            .collect();
        states
            .into_iter()
            .map(|(i, s)| self.handle(i, s))
            .collect()
    }

    fn handle(&self, index: u32, state: FragmentState) -> Fragment {
        Fragment::new(self.id, &*self.job, index, state)
    }

    fn reject(&self, index: u32, state: FragmentState, reason: &'static str) {
        tracing::debug!(task = %self.id, index, %state, reason, "fragment update rejected");
        self.publish(
            Event::new(EventKind::FragmentRejected)
                .with_fragment(index, state)
                .with_reason(reason),
        );
    }

    fn publish(&self, ev: Event) {
        if let Some(bus) = &self.bus {
            bus.publish(ev.with_task(self.id.to_string()));
        }
    }

    fn lock(&self) -> MutexGuard<'_, Arena> {
        self.arena.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

impl std::fmt::Debug for EquipartitionTask {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EquipartitionTask")
            .field("id", &self.id)
            .field("owner", &self.owner)
            .field("job", &self.job)
            .field("description", &self.description)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;

    #[test]
    fn test_pick_until_exhausted() {
        let task = EquipartitionTask::new("o", "j", 3, "three");
        let picked: Vec<u32> = std::iter::from_fn(|| task.pick()).map(|f| f.index()).collect();

        assert_eq!(picked, vec![0, 1, 2]);
        assert_eq!(task.processing_count(), 3);
        assert!(task.pick().is_none());
    }

    #[test]
    fn test_failure_becomes_retrying() {
        let task = EquipartitionTask::new("o", "j", 2, "");
        let a = task.pick().unwrap();
        let b = task.pick().unwrap();

        assert!(task.update_fragment(&a, FragmentState::Failure));
        assert_eq!(task.processing_count(), 1);
        assert_eq!(task.done_count(), 0);

        let again = task.pick().unwrap();
        assert_eq!(again.index(), a.index());
        assert_eq!(again.state(), FragmentState::Retrying);

        assert!(task.update_fragment(&again, FragmentState::Fatal));
        assert!(task.update_fragment(&b, FragmentState::Success));
        assert_eq!(task.done_count(), 2);
        assert_eq!(task.processing_count(), 0);
        assert!(task.is_done());
        assert!(task.pick().is_none());
    }

    #[test]
    fn test_waiting_preferred_over_failure() {
        let task = EquipartitionTask::new("o", "j", 2, "");
        let first = task.pick().unwrap();
        assert!(task.update_fragment(&first, FragmentState::Failure));

        let next = task.pick().unwrap();
        assert_eq!(next.index(), 1);
        assert_eq!(next.state(), FragmentState::Working);
    }

    #[test]
    fn test_cross_task_update_rejected() {
        let task1 = EquipartitionTask::new("o", "j1", 2, "");
        let task3 = EquipartitionTask::new("o", "j3", 2, "");
        let _ = task1.pick().unwrap();
        let foreign = task3.pick().unwrap();

        assert!(!task1.update_fragment(&foreign, FragmentState::Success));
        assert_eq!(task1.processing_count(), 1);
        assert_eq!(task3.processing_count(), 1);
        assert_eq!(task3.done_count(), 0);

        assert!(task3.update_fragment(&task3.fragment(0).unwrap(), FragmentState::Success));
        assert_eq!(task3.processing_count(), 0);
        assert_eq!(task3.done_count(), 1);
    }

    #[test]
    fn test_same_job_key_different_task_rejected() {
        let a = EquipartitionTask::new("o", "same", 1, "");
        let b = EquipartitionTask::new("o", "same", 1, "");
        let f = b.pick().unwrap();
        assert!(!a.update_fragment(&f, FragmentState::Success));
    }

    #[test]
    fn test_illegal_transitions_rejected() {
        let task = EquipartitionTask::new("o", "j", 2, "");

        // not picked yet
        let waiting = task.fragment(0).unwrap();
        assert!(!task.update_fragment(&waiting, FragmentState::Success));

        let picked = task.pick().unwrap();
        assert!(!task.update_fragment(&picked, FragmentState::Fatal));
        assert!(!task.update_fragment(&picked, FragmentState::Waiting));
        assert!(task.update_fragment(&picked, FragmentState::Success));

        // terminal
        assert!(!task.update_fragment(&picked, FragmentState::Failure));
        assert_eq!(task.done_count(), 1);
        assert_eq!(task.processing_count(), 0);
    }

    #[test]
    fn test_stale_handle_cannot_settle_later_claim() {
        let task = EquipartitionTask::new("o", "j", 1, "");
        let first = task.pick().unwrap();
        assert!(task.update_fragment(&first, FragmentState::Failure));

        let second = task.pick().unwrap();
        assert_eq!(second.state(), FragmentState::Retrying);

        assert!(!task.update_fragment(&first, FragmentState::Success));
        assert_eq!(task.done_count(), 0);
        assert_eq!(task.processing_count(), 1);

        assert!(task.update_fragment(&second, FragmentState::Success));
        assert_eq!(task.done_count(), 1);
    }

    #[test]
    fn test_classification_queries() {
        let task = EquipartitionTask::new("o", "j", 4, "");
        let f0 = task.pick().unwrap();
        let f1 = task.pick().unwrap();
        let _f2 = task.pick().unwrap();
        task.update_fragment(&f0, FragmentState::Success);
        task.update_fragment(&f1, FragmentState::Failure);

        let idx = |v: Vec<Fragment>| v.into_iter().map(|f| f.index()).collect::<Vec<_>>();
        assert_eq!(idx(task.get_done_fragments()), vec![0]);
        assert_eq!(idx(task.get_processing_fragments()), vec![2]);
        assert_eq!(idx(task.get_waiting_or_processing_fragments()), vec![1, 2, 3]);
        assert_eq!(task.fragments().len(), 4);
        assert!(task.fragment(4).is_none());
    }

    #[test]
    fn test_parsed_handles_behave_like_originals() {
        let task = EquipartitionTask::new("o", "j", 2, "");
        let a = task.pick().unwrap();
        let b = task.pick().unwrap();

        let a2 = Fragment::parse(&a.to_json_string()).unwrap();
        let b2 = Fragment::parse(&b.to_query_data().to_string()).unwrap();
        assert!(task.update_fragment(&a2, FragmentState::Success));
        assert!(task.update_fragment(&b2, FragmentState::Failure));
        assert_eq!(task.done_count(), 1);
        assert_eq!(task.processing_count(), 0);
    }

    #[test]
    fn test_concurrent_picks_are_distinct() {
        const N: u32 = 64;
        let task = Arc::new(EquipartitionTask::new("o", "j", N, ""));

        let handles: Vec<_> = (0..N + 8)
            .map(|_| {
                let task = Arc::clone(&task);
                std::thread::spawn(move || task.pick().map(|f| f.index()))
            })
            .collect();
        let results: Vec<Option<u32>> = handles.into_iter().map(|h| h.join().unwrap()).collect();

        let picked: HashSet<u32> = results.iter().flatten().copied().collect();
        assert_eq!(picked.len(), N as usize);
        assert_eq!(results.iter().filter(|r| r.is_none()).count(), 8);
        assert_eq!(task.processing_count(), N as usize);
    }

    #[tokio::test]
    async fn test_events_published() {
        let bus = Bus::new(16);
        let mut rx = bus.subscribe();
        let task = EquipartitionTask::new("o", "j", 1, "").with_bus(bus);

        let f = task.pick().unwrap();
        assert!(!task.update_fragment(&f, FragmentState::Fatal));
        assert!(task.update_fragment(&f, FragmentState::Success));

        let kinds: Vec<EventKind> = (0..3).map(|_| rx.try_recv().unwrap().kind).collect();
        assert_eq!(
            kinds,
            vec![
                EventKind::FragmentPicked,
                EventKind::FragmentRejected,
                EventKind::FragmentUpdated
            ]
        );
    }
}
