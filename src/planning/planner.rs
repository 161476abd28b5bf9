//! Asynchronous path planner.
//!
//! Requests go onto a channel and a small pool of worker threads runs
//! the searches. Each request captures the map snapshot current at
//! submission time, so a rebuild that lands mid-flight never changes
//! what an in-progress search computes against. Callers poll the
//! returned [`PathOperation`] or block on it with a timeout.

use crate::core::WorldPoint;
use crate::error::{NavError, Result};
use crate::map::{NavMap, Snapshot};
use crate::planning::astar::{GridSearch, PathFailure, PathResult, SearchConfig};
use crate::planning::simplify::turn_points;
use crate::query::NearestPointQuery;
use crossbeam_channel::{bounded, unbounded, Receiver, Sender};
use log::{debug, info, warn};
use parking_lot::Mutex;
use std::sync::atomic::{AtomicBool, AtomicU8, Ordering};
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::Duration;

/// Lifecycle of a submitted request
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum OperationState {
    Queued,
    Running,
    Succeeded,
    Failed,
    Cancelled,
}

const STATE_QUEUED: u8 = 0;
const STATE_RUNNING: u8 = 1;
const STATE_SUCCEEDED: u8 = 2;
const STATE_FAILED: u8 = 3;
const STATE_CANCELLED: u8 = 4;

fn decode_state(raw: u8) -> OperationState {
    match raw {
        STATE_QUEUED => OperationState::Queued,
        STATE_RUNNING => OperationState::Running,
        STATE_SUCCEEDED => OperationState::Succeeded,
        STATE_FAILED => OperationState::Failed,
        _ => OperationState::Cancelled,
    }
}

struct OperationInner {
    state: AtomicU8,
    cancel: AtomicBool,
    result: Mutex<Option<PathResult>>,
    /// Generation of the snapshot the search ran against
    generation: u64,
}

/// Handle to one in-flight path request.
pub struct PathOperation {
    inner: Arc<OperationInner>,
    done_rx: Receiver<()>,
}

impl std::fmt::Debug for PathOperation {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PathOperation")
            .field("state", &self.state())
            .field("generation", &self.inner.generation)
            .finish()
    }
}

impl PathOperation {
    fn finished(result: PathResult, generation: u64) -> Self {
        let state = if result.success {
            STATE_SUCCEEDED
        } else {
            STATE_FAILED
        };
        let (done_tx, done_rx) = bounded(1);
        let _ = done_tx.send(());
        Self {
            inner: Arc::new(OperationInner {
                state: AtomicU8::new(state),
                cancel: AtomicBool::new(false),
                result: Mutex::new(Some(result)),
                generation,
            }),
            done_rx,
        }
    }

    /// Current lifecycle state
    pub fn state(&self) -> OperationState {
        decode_state(self.inner.state.load(Ordering::Acquire))
    }

    /// Snapshot generation this request was bound to at submission
    pub fn generation(&self) -> u64 {
        self.inner.generation
    }

    /// Result if the request has finished, None while it is queued or
    /// running. Cancelled requests never produce a result.
    pub fn try_result(&self) -> Option<PathResult> {
        match self.state() {
            OperationState::Succeeded | OperationState::Failed => {
                self.inner.result.lock().clone()
            }
            _ => None,
        }
    }

    /// Block until the request finishes or `timeout` elapses. Returns
    /// None on timeout and on cancellation.
    pub fn wait(&self, timeout: Duration) -> Option<PathResult> {
        if let Some(result) = self.try_result() {
            return Some(result);
        }
        match self.done_rx.recv_timeout(timeout) {
            Ok(()) => self.try_result(),
            Err(_) => None,
        }
    }

    /// Request cancellation. A queued request is dropped before it
    /// runs; a running search aborts at its next cancellation check.
    /// Finished requests are unaffected.
    pub fn cancel(&self) {
        self.inner.cancel.store(true, Ordering::Release);
        // A still-queued request can be retired immediately
        let _ = self.inner.state.compare_exchange(
            STATE_QUEUED,
            STATE_CANCELLED,
            Ordering::AcqRel,
            Ordering::Acquire,
        );
    }

    /// Whether cancellation has been requested
    pub fn is_cancelled(&self) -> bool {
        self.inner.cancel.load(Ordering::Acquire)
    }
}

/// Goal handling for a request
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum GoalMode {
    /// The goal cell itself must be reachable
    Exact,
    /// Fall back to the reachable cell closest to the goal
    Nearest,
}

struct Job {
    inner: Arc<OperationInner>,
    done_tx: Sender<()>,
    snapshot: Arc<Snapshot>,
    start: WorldPoint,
    goal: WorldPoint,
    mode: GoalMode,
}

/// Planner tuning knobs
#[derive(Clone, Copy, Debug)]
pub struct PlannerConfig {
    /// Worker thread count
    pub workers: usize,
    pub search: SearchConfig,
}

impl Default for PlannerConfig {
    fn default() -> Self {
        Self {
            workers: 1,
            search: SearchConfig::default(),
        }
    }
}

/// Worker pool that executes path requests against map snapshots.
pub struct PathPlanner {
    map: NavMap,
    config: PlannerConfig,
    job_tx: Option<Sender<Job>>,
    workers: Vec<JoinHandle<()>>,
}

impl PathPlanner {
    /// Spawn the worker pool. At least one worker always runs.
    pub fn spawn(map: NavMap, config: PlannerConfig) -> Result<Self> {
        let (job_tx, job_rx) = unbounded::<Job>();
        let worker_count = config.workers.max(1);
        let mut workers = Vec::with_capacity(worker_count);

        for i in 0..worker_count {
            let rx = job_rx.clone();
            let search_config = config.search;
            let handle = thread::Builder::new()
                .name(format!("marga-plan-{}", i))
                .spawn(move || worker_loop(rx, search_config))
                .map_err(NavError::Io)?;
            workers.push(handle);
        }

        info!("[Planner] spawned {} worker(s)", worker_count);
        Ok(Self {
            map,
            config,
            job_tx: Some(job_tx),
            workers,
        })
    }

    /// Request a path whose goal cell must itself be reachable.
    pub fn find_path(&self, start: WorldPoint, goal: WorldPoint) -> PathOperation {
        self.submit(start, goal, GoalMode::Exact)
    }

    /// Request a path to the reachable point closest to `goal`. Used
    /// when the target may sit inside furniture or another region.
    pub fn find_nearest_path(&self, start: WorldPoint, goal: WorldPoint) -> PathOperation {
        self.submit(start, goal, GoalMode::Nearest)
    }

    fn submit(&self, start: WorldPoint, goal: WorldPoint, mode: GoalMode) -> PathOperation {
        let snapshot = self.map.snapshot();
        let generation = snapshot.generation();

        // Reject garbage inputs without touching the queue
        if !start.is_finite() {
            warn!("[Planner] rejected non-finite start");
            return PathOperation::finished(
                PathResult::failed(PathFailure::InvalidStart, 0),
                generation,
            );
        }
        if !goal.is_finite() {
            warn!("[Planner] rejected non-finite goal");
            return PathOperation::finished(
                PathResult::failed(PathFailure::InvalidGoal, 0),
                generation,
            );
        }

        let inner = Arc::new(OperationInner {
            state: AtomicU8::new(STATE_QUEUED),
            cancel: AtomicBool::new(false),
            result: Mutex::new(None),
            generation,
        });
        let (done_tx, done_rx) = bounded(1);

        let job = Job {
            inner: inner.clone(),
            done_tx,
            snapshot,
            start,
            goal,
            mode,
        };

        let queued = match &self.job_tx {
            Some(tx) => tx.send(job).is_ok(),
            None => false,
        };
        if !queued {
            // Pool already shut down
            inner.state.store(STATE_FAILED, Ordering::Release);
            *inner.result.lock() = Some(PathResult::failed(PathFailure::Cancelled, 0));
        }

        PathOperation { inner, done_rx }
    }

    pub fn map(&self) -> &NavMap {
        &self.map
    }

    pub fn config(&self) -> &PlannerConfig {
        &self.config
    }
}

impl Drop for PathPlanner {
    fn drop(&mut self) {
        // Close the channel so idle workers exit their recv loop
        self.job_tx.take();
        for handle in self.workers.drain(..) {
            let _ = handle.join();
        }
    }
}

fn worker_loop(rx: Receiver<Job>, search_config: SearchConfig) {
    while let Ok(job) = rx.recv() {
        execute_job(job, search_config);
    }
}

fn execute_job(job: Job, search_config: SearchConfig) {
    // A cancel that landed while queued retires the job unrun
    if job
        .inner
        .state
        .compare_exchange(
            STATE_QUEUED,
            STATE_RUNNING,
            Ordering::AcqRel,
            Ordering::Acquire,
        )
        .is_err()
    {
        debug!("[Planner] skipping cancelled request");
        return;
    }

    let result = run_search(&job, search_config);

    if job.inner.cancel.load(Ordering::Acquire)
        || result.failure == Some(PathFailure::Cancelled)
    {
        job.inner.state.store(STATE_CANCELLED, Ordering::Release);
        return;
    }

    let state = if result.success {
        STATE_SUCCEEDED
    } else {
        STATE_FAILED
    };
    *job.inner.result.lock() = Some(result);
    job.inner.state.store(state, Ordering::Release);
    let _ = job.done_tx.send(());
}

fn run_search(job: &Job, search_config: SearchConfig) -> PathResult {
    let grid = job.snapshot.grid();
    let components = job.snapshot.components();

    let start_cell = grid.world_to_grid(job.start);
    if !grid.is_walkable(start_cell) {
        return PathResult::failed(PathFailure::InvalidStart, 0);
    }
    let start_component = components.component_at(start_cell);

    let goal_cell = grid.world_to_grid(job.goal);
    let goal_cell = match job.mode {
        GoalMode::Exact => {
            if !grid.is_walkable(goal_cell) {
                return PathResult::failed(PathFailure::InvalidGoal, 0);
            }
            if components.component_at(goal_cell) != start_component {
                return PathResult::failed(PathFailure::Unreachable, 0);
            }
            goal_cell
        }
        GoalMode::Nearest => {
            if components.component_at(goal_cell) == start_component {
                goal_cell
            } else {
                let query = NearestPointQuery::new(grid, components);
                match query.closest_cell_in_component(goal_cell, start_component) {
                    Some(cell) => {
                        debug!(
                            "[Planner] goal substituted: ({},{}) -> ({},{})",
                            goal_cell.x, goal_cell.y, cell.x, cell.y
                        );
                        cell
                    }
                    None => return PathResult::failed(PathFailure::Unreachable, 0),
                }
            }
        }
    };

    let search = GridSearch::new(grid, search_config);
    let mut result = search.find_path(start_cell, goal_cell, Some(&job.inner.cancel));
    if result.success {
        result.waypoints = turn_points(&result.waypoints);
    }
    result
}
