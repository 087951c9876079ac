//! Async handle to a project.
//!
//! Proposals are synchronous and cheap; `commit_async` yields once before
//! committing so other tasks can stage more proposals into the same
//! generation. Commits are serialized through a FIFO gate: a second
//! concurrent commit queues behind the first and is never interleaved with
//! it. Every non-empty change-set is broadcast to subscribers in commit
//! order.

use std::sync::Arc;

use tokio::sync::{broadcast, Mutex};
use tracing::trace;

use crate::error::SchedulingResult;
use crate::models::RecordId;
use crate::time::{DurationUnit, Timestamp};

use super::{ChangeSet, CommitOutcome, Project};

#[derive(Debug)]
struct Inner {
    project: Mutex<Project>,
    commit_gate: Mutex<()>,
    changes: broadcast::Sender<Arc<ChangeSet>>,
}

/// Cloneable, thread-safe handle to a [`Project`].
#[derive(Debug, Clone)]
pub struct SharedProject {
    inner: Arc<Inner>,
}

impl SharedProject {
    /// Wraps a project. The channel capacity comes from its config.
    pub fn new(project: Project) -> Self {
        let capacity = project.config().broadcast_capacity.max(1);
        let (changes, _) = broadcast::channel(capacity);
        Self {
            inner: Arc::new(Inner {
                project: Mutex::new(project),
                commit_gate: Mutex::new(()),
                changes,
            }),
        }
    }

    /// Receives every change-set published after this call.
    pub fn subscribe(&self) -> broadcast::Receiver<Arc<ChangeSet>> {
        self.inner.changes.subscribe()
    }

    /// Runs `f` with exclusive access to the project.
    pub async fn with<R>(&self, f: impl FnOnce(&mut Project) -> R) -> R {
        let mut project = self.inner.project.lock().await;
        f(&mut project)
    }

    /// Runs `f` with shared access to the project.
    pub async fn read<R>(&self, f: impl FnOnce(&Project) -> R) -> R {
        let project = self.inner.project.lock().await;
        f(&project)
    }

    /// Commits everything staged so far and publishes the change-set.
    pub async fn commit_async(&self) -> CommitOutcome {
        let _gate = self.inner.commit_gate.lock().await;
        tokio::task::yield_now().await;

        let outcome = self.inner.project.lock().await.commit();
        if let Some(change_set) = &outcome.change_set {
            let generation = change_set.generation;
            if self.inner.changes.send(Arc::new(change_set.clone())).is_err() {
                trace!(generation, "no change-set subscribers");
            }
        }
        outcome
    }

    /// Proposes a start date and commits.
    pub async fn set_start(
        &self,
        id: impl Into<RecordId>,
        start: Option<Timestamp>,
        keep_duration: bool,
    ) -> SchedulingResult<CommitOutcome> {
        let id = id.into();
        self.with(|project| project.propose_start(id, start, keep_duration))
            .await?;
        Ok(self.commit_async().await)
    }

    /// Proposes an end date and commits.
    pub async fn set_end(
        &self,
        id: impl Into<RecordId>,
        end: Option<Timestamp>,
        keep_duration: bool,
    ) -> SchedulingResult<CommitOutcome> {
        let id = id.into();
        self.with(|project| project.propose_end(id, end, keep_duration))
            .await?;
        Ok(self.commit_async().await)
    }

    /// Proposes a duration and commits.
    pub async fn set_duration(
        &self,
        id: impl Into<RecordId>,
        duration: Option<f64>,
        unit: Option<DurationUnit>,
        keep_start: bool,
    ) -> SchedulingResult<CommitOutcome> {
        let id = id.into();
        self.with(|project| project.propose_duration(id, duration, unit, keep_start))
            .await?;
        Ok(self.commit_async().await)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::Event;
    use chrono::{TimeZone, Utc};

    fn day(d: u32) -> Timestamp {
        Utc.with_ymd_and_hms(2024, 1, d, 0, 0, 0).unwrap()
    }

    async fn shared_with_events(count: i64) -> SharedProject {
        let mut project = Project::default();
        for id in 0..count {
            project
                .add_event(Event::new(id).with_start(day(1)).with_end(day(2)))
                .unwrap();
        }
        let shared = SharedProject::new(project);
        shared.commit_async().await;
        shared
    }

    #[tokio::test]
    async fn test_second_commit_queues_behind_first() {
        let shared = shared_with_events(1).await;
        let mut rx = shared.subscribe();

        let (first, second) = tokio::join!(
            shared.set_start(0, Some(day(5)), true),
            shared.commit_async()
        );

        let first = first.unwrap();
        assert_eq!(first.change_set.as_ref().unwrap().generation, 2);
        assert!(second.is_noop());

        let published = rx.try_recv().unwrap();
        assert_eq!(published.entity(&RecordId::from(0)).unwrap().end, Some(day(6)));
        assert!(rx.try_recv().is_err());
    }

    #[tokio::test]
    async fn test_proposals_staged_during_yield_join_the_commit() {
        let shared = shared_with_events(2).await;

        let (outcome, staged) = tokio::join!(shared.commit_async(), async {
            shared
                .with(|project| project.propose_duration(1, Some(3.0), None, true))
                .await
        });

        staged.unwrap();
        let change_set = outcome.change_set.unwrap();
        assert_eq!(change_set.entities.len(), 1);
        assert_eq!(
            shared.read(|project| project.event(1).unwrap().end()).await,
            Some(day(4))
        );
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_concurrent_commits_publish_in_order() {
        let shared = shared_with_events(8).await;
        let mut rx = shared.subscribe();

        let tasks: Vec<_> = (0..8)
            .map(|id: i64| {
                let shared = shared.clone();
                tokio::spawn(async move {
                    shared
                        .set_duration(id, Some(2.0 + id as f64), None, true)
                        .await
                        .unwrap()
                })
            })
            .collect();
        for task in tasks {
            task.await.unwrap();
        }

        let mut generations = Vec::new();
        let mut changed = 0;
        while let Ok(change_set) = rx.try_recv() {
            generations.push(change_set.generation);
            changed += change_set.entities.len();
        }
        assert_eq!(changed, 8);
        assert!(generations.windows(2).all(|pair| pair[0] < pair[1]));

        for id in 0..8_i64 {
            let end = shared.read(|project| project.event(id).unwrap().end()).await;
            assert_eq!(end, Some(day(3 + id as u32)));
        }
    }
}
