//! Asynchronous solve coordination.
//!
//! Submissions are stamped with a monotonically increasing generation and
//! handed to a single worker task through a `watch` channel, which keeps
//! only the newest submission. The worker solves one snapshot at a time on
//! the blocking pool. A finished result is published only if its
//! generation is still the latest; otherwise it is dropped and the worker
//! moves on to the newest snapshot. There is no hard abort of an engine
//! check in flight.

use std::sync::Arc;

use tokio::sync::watch;
use tokio::task::JoinHandle;
use tracing::{debug, info};

use super::{ScheduleSolver, SolveState};
use crate::cp::SolverEngine;
use crate::error::{EngineError, Result};
use crate::models::{Course, SchedulingOutcome, Term};

/// Observable state of the coordinator.
#[derive(Debug, Clone, PartialEq)]
pub struct ScheduleStatus {
    /// Generation of the newest submission (0 before the first).
    pub generation: u64,
    /// Lifecycle state of that generation.
    pub state: SolveState,
    /// Result of that generation, once solved.
    pub result: Option<Result<SchedulingOutcome>>,
}

impl ScheduleStatus {
    fn idle() -> Self {
        Self {
            generation: 0,
            state: SolveState::Idle,
            result: None,
        }
    }
}

#[derive(Debug)]
struct Snapshot {
    courses: Vec<Course>,
    terms: Vec<Term>,
}

#[derive(Debug, Clone)]
struct Submission {
    generation: u64,
    snapshot: Arc<Snapshot>,
}

/// "Latest submission wins" front end of a [`ScheduleSolver`].
///
/// # Example
/// ```
/// use u_curriculum::models::{Course, Term, TermPart};
/// use u_curriculum::solver::{ScheduleCoordinator, ScheduleSolver, SolveState};
///
/// # #[tokio::main(flavor = "current_thread")]
/// # async fn main() {
/// let coordinator = ScheduleCoordinator::new(ScheduleSolver::default());
/// let generation = coordinator.submit(
///     vec![Course::new("c1", "100", "Intro")],
///     vec![Term::new(2027, TermPart::A)],
/// );
/// let status = coordinator.wait_for(generation).await;
/// assert_eq!(status.state, SolveState::Satisfied);
/// # }
/// ```
pub struct ScheduleCoordinator {
    requests: watch::Sender<Option<Submission>>,
    status: Arc<watch::Sender<ScheduleStatus>>,
    worker: JoinHandle<()>,
}

impl ScheduleCoordinator {
    /// Starts the worker task.
    ///
    /// # Panics
    /// When called outside a Tokio runtime.
    pub fn new<E>(solver: ScheduleSolver<E>) -> Self
    where
        E: SolverEngine + 'static,
    {
        let (requests, receiver) = watch::channel(None);
        let status = Arc::new(watch::Sender::new(ScheduleStatus::idle()));
        let worker = tokio::spawn(run_worker(Arc::new(solver), receiver, Arc::clone(&status)));
        Self {
            requests,
            status,
            worker,
        }
    }

    /// Submits a snapshot and returns its generation.
    ///
    /// Any solve of an older generation still in flight is superseded.
    pub fn submit(&self, courses: Vec<Course>, terms: Vec<Term>) -> u64 {
        self.enqueue(Arc::new(Snapshot { courses, terms }))
    }

    /// Resubmits the last snapshot under a new generation.
    ///
    /// `None` if nothing was submitted yet.
    pub fn rerun(&self) -> Option<u64> {
        let snapshot = self
            .requests
            .borrow()
            .as_ref()
            .map(|s| Arc::clone(&s.snapshot))?;
        Some(self.enqueue(snapshot))
    }

    fn enqueue(&self, snapshot: Arc<Snapshot>) -> u64 {
        let mut generation = 0;
        self.requests.send_modify(|slot| {
            generation = slot.as_ref().map_or(0, |s| s.generation) + 1;
            *slot = Some(Submission {
                generation,
                snapshot,
            });
        });
        self.status.send_if_modified(|status| {
            if generation <= status.generation {
                return false;
            }
            status.generation = generation;
            status.state = SolveState::Solving;
            status.result = None;
            true
        });
        debug!(generation, "snapshot submitted");
        generation
    }

    /// Current status.
    pub fn status(&self) -> ScheduleStatus {
        self.status.borrow().clone()
    }

    /// Receiver notified on every status change.
    pub fn subscribe(&self) -> watch::Receiver<ScheduleStatus> {
        self.status.subscribe()
    }

    /// Waits until `generation`, or a newer submission, has a result.
    pub async fn wait_for(&self, generation: u64) -> ScheduleStatus {
        let mut receiver = self.status.subscribe();
        let waited = receiver
            .wait_for(|s| s.generation >= generation && s.state.is_terminal())
            .await
            .map(|status| status.clone());
        waited.unwrap_or_else(|_| self.status())
    }
}

impl Drop for ScheduleCoordinator {
    fn drop(&mut self) {
        self.worker.abort();
    }
}

async fn run_worker<E>(
    solver: Arc<ScheduleSolver<E>>,
    mut requests: watch::Receiver<Option<Submission>>,
    status: Arc<watch::Sender<ScheduleStatus>>,
) where
    E: SolverEngine + 'static,
{
    while requests.changed().await.is_ok() {
        let Some(job) = requests.borrow_and_update().clone() else {
            continue;
        };

        let task_solver = Arc::clone(&solver);
        let snapshot = Arc::clone(&job.snapshot);
        let result = tokio::task::spawn_blocking(move || {
            task_solver.solve(&snapshot.courses, &snapshot.terms)
        })
        .await
        .unwrap_or_else(|e| Err(EngineError::Execution(format!("solve task failed: {e}")).into()));

        let state = SolveState::of(&result);
        let published = status.send_if_modified(|current| {
            if current.generation != job.generation {
                return false;
            }
            current.state = state;
            current.result = Some(result);
            true
        });

        if published {
            info!(generation = job.generation, ?state, "result published");
        } else {
            debug!(generation = job.generation, "discarding superseded result");
        }
    }
}
