//! Path-following behavior.
//!
//! Drives an agent along planned paths: submit a goal, poll the
//! planner from the per-frame update, then walk the waypoints with
//! rate-limited turning and a speed clamp. The follower retains the
//! last position it stood on walkable floor; when a goal turns out to
//! be unreachable it falls back to a path toward that reference point
//! instead of stalling in place.

use crate::behavior::{AgentTransform, Behavior};
use crate::core::WorldPoint;
use crate::planning::{OperationState, PathOperation, PathPlanner};
use crate::query::NearestPointQuery;
use log::{debug, info, warn};

/// Completion callback; the argument is true when the goal was reached
pub type CompletionCallback = Box<dyn FnOnce(bool) + Send>;

/// Follower tuning knobs
#[derive(Clone, Copy, Debug)]
pub struct FollowerConfig {
    /// Base walking speed in m/s
    pub move_speed: f32,
    /// Multiplier on `move_speed`, set per goal
    pub speed_modifier: f32,
    /// Turn rate limit in rad/s
    pub turn_speed: f32,
    /// Distance at which the final waypoint counts as reached
    pub stopping_distance: f32,
    /// Distance at which intermediate waypoints are consumed
    pub waypoint_tolerance: f32,
    /// Play a visible reaction (logged here) when planning fails
    pub sad_on_failure: bool,
}

impl Default for FollowerConfig {
    fn default() -> Self {
        Self {
            move_speed: 0.5,
            speed_modifier: 1.0,
            turn_speed: std::f32::consts::PI,
            stopping_distance: 0.15,
            waypoint_tolerance: 0.05,
            sad_on_failure: true,
        }
    }
}

/// What the follower is doing right now
#[derive(Debug)]
pub enum FollowState {
    Idle,
    /// Waiting on the planner
    Planning { operation: PathOperation },
    /// Walking the waypoint list
    Following {
        waypoints: Vec<WorldPoint>,
        next: usize,
    },
}

impl FollowState {
    fn name(&self) -> &'static str {
        match self {
            FollowState::Idle => "Idle",
            FollowState::Planning { .. } => "Planning",
            FollowState::Following { .. } => "Following",
        }
    }
}

/// Walks an agent toward requested goals using the shared planner.
pub struct PathFollower {
    planner: PathPlanner,
    config: FollowerConfig,
    state: FollowState,
    on_complete: Option<CompletionCallback>,
    /// Last position observed on walkable floor
    reference_point: Option<WorldPoint>,
    /// True while walking the fallback path toward the reference point
    recovering: bool,
    timer: f32,
}

impl PathFollower {
    pub fn new(planner: PathPlanner, config: FollowerConfig) -> Self {
        Self {
            planner,
            config,
            state: FollowState::Idle,
            on_complete: None,
            reference_point: None,
            recovering: false,
            timer: 0.0,
        }
    }

    /// Start walking toward `goal` at `move_speed * speed_modifier`,
    /// stopping within `stopping_distance` of it. An in-flight request
    /// or active path is abandoned without firing its callback. The
    /// goal is resolved with nearest-point fallback, so aiming at
    /// furniture walks the agent up next to it.
    pub fn run_towards(
        &mut self,
        transform: &AgentTransform,
        goal: WorldPoint,
        speed_modifier: f32,
        stopping_distance: f32,
        on_complete: Option<CompletionCallback>,
    ) {
        self.abandon_current();
        self.config.speed_modifier = speed_modifier.max(0.0);
        self.config.stopping_distance = stopping_distance.max(0.0);

        let start = self.planning_start(transform.position);
        debug!(
            "[Follower] run_towards ({:.2},{:.2},{:.2})",
            goal.x, goal.y, goal.z
        );
        let operation = self.planner.find_nearest_path(start, goal);
        self.state = FollowState::Planning { operation };
        self.on_complete = on_complete;
        self.recovering = false;
        self.timer = 0.0;
    }

    /// The point path planning starts from: the agent's own position
    /// when it stands on walkable floor, otherwise the closest walkable
    /// point to it.
    fn planning_start(&self, position: WorldPoint) -> WorldPoint {
        let snapshot = self.planner.map().snapshot();
        let grid = snapshot.grid();
        if grid.is_walkable(grid.world_to_grid(position)) {
            return position;
        }

        let components = snapshot.components();
        let query = NearestPointQuery::new(grid, components);
        match components
            .largest_component()
            .and_then(|id| query.closest_point_in_component(position, id))
        {
            Some(point) => {
                debug!(
                    "[Follower] off walkable area, planning from ({:.2},{:.2},{:.2})",
                    point.x, point.y, point.z
                );
                point
            }
            None => {
                warn!("[Follower] no walkable area near the agent");
                position
            }
        }
    }

    /// Last known-good reachable point, used as the fallback goal when
    /// the active target fails mid-behavior.
    pub fn reachable_reference_point(&self) -> Option<WorldPoint> {
        self.reference_point
    }

    /// Estimated seconds to reach `target` from `transform`, as the
    /// straight-line distance over the effective speed. Does not plan;
    /// diverges from real travel time when the path has to detour.
    pub fn duration_to_target(&self, transform: &AgentTransform, target: WorldPoint) -> f32 {
        let speed = self.effective_speed();
        if speed <= 0.0 {
            return f32::INFINITY;
        }
        transform.position.horizontal_distance(&target) / speed
    }

    /// Waypoints still ahead of the agent, for debug rendering
    pub fn remaining_path(&self) -> &[WorldPoint] {
        match &self.state {
            FollowState::Following { waypoints, next } => {
                &waypoints[(*next).min(waypoints.len())..]
            }
            _ => &[],
        }
    }

    pub fn state(&self) -> &FollowState {
        &self.state
    }

    pub fn config(&self) -> &FollowerConfig {
        &self.config
    }

    pub fn planner(&self) -> &PathPlanner {
        &self.planner
    }

    fn effective_speed(&self) -> f32 {
        self.config.move_speed * self.config.speed_modifier
    }

    fn abandon_current(&mut self) {
        if let FollowState::Planning { operation } = &self.state {
            operation.cancel();
        }
        self.state = FollowState::Idle;
        self.on_complete = None;
        self.recovering = false;
    }

    fn finish(&mut self, reached: bool) {
        if self.config.sad_on_failure && !reached {
            info!("[Follower] could not reach the goal, playing sad reaction");
        }
        self.state = FollowState::Idle;
        self.recovering = false;
        if let Some(callback) = self.on_complete.take() {
            callback(reached);
        }
    }

    /// Goal failed mid-behavior: try walking back to the last
    /// known-good point instead of stalling where we stand.
    fn begin_recovery(&mut self, position: WorldPoint) {
        let reference = match self.reference_point {
            Some(point) if !self.recovering => point,
            _ => {
                self.finish(false);
                return;
            }
        };
        debug!(
            "[Follower] goal unreachable, recovering toward ({:.2},{:.2},{:.2})",
            reference.x, reference.y, reference.z
        );
        self.recovering = true;
        let start = self.planning_start(position);
        let operation = self.planner.find_nearest_path(start, reference);
        self.state = FollowState::Planning { operation };
    }

    fn poll_planner(&mut self, position: WorldPoint) {
        let outcome = match &self.state {
            FollowState::Planning { operation } => match operation.state() {
                OperationState::Queued | OperationState::Running => return,
                OperationState::Cancelled => {
                    self.state = FollowState::Idle;
                    return;
                }
                _ => operation.try_result(),
            },
            _ => return,
        };

        match outcome {
            Some(result) if result.success && !result.waypoints.is_empty() => {
                debug!(
                    "[Follower] path ready: {} waypoints, {:.2}m",
                    result.waypoints.len(),
                    result.length_meters()
                );
                self.state = FollowState::Following {
                    waypoints: result.waypoints,
                    next: 0,
                };
            }
            Some(result) => {
                debug!("[Follower] planning failed: {:?}", result.failure);
                self.begin_recovery(position);
            }
            None => self.begin_recovery(position),
        }
    }

    fn step_along_path(&mut self, transform: &mut AgentTransform, dt: f32) {
        // Travel budget for this frame, spent across as many waypoints
        // as it reaches so a corner does not eat part of the step
        let mut budget = self.effective_speed() * dt;
        let mut turned = false;

        loop {
            let (target, is_last) = match &self.state {
                FollowState::Following { waypoints, next } => {
                    (waypoints[*next], *next + 1 == waypoints.len())
                }
                _ => break,
            };

            let distance = transform.position.horizontal_distance(&target);

            // Turn toward the current waypoint at a bounded rate, once
            // per frame
            if !turned && distance > 1e-4 {
                let desired_yaw = transform.position.yaw_to(&target);
                transform.yaw =
                    turn_towards(transform.yaw, desired_yaw, self.config.turn_speed * dt);
                turned = true;
            }

            // Step forward without overshooting the waypoint
            let step = budget.min(distance);
            if distance > 1e-4 && step > 0.0 {
                let t = step / distance;
                let next_pos = transform.position.lerp(&target, t);
                transform.position.x = next_pos.x;
                transform.position.z = next_pos.z;
                budget -= step;
            }

            let tolerance = if is_last {
                self.config.stopping_distance.max(1e-3)
            } else {
                self.config.waypoint_tolerance
            };
            if transform.position.horizontal_distance(&target) > tolerance {
                // Budget spent short of the waypoint
                break;
            }
            if is_last {
                debug!("[Follower] arrived after {:.1}s", self.timer);
                // Arriving at the recovery point still means the real
                // goal was not reached
                let reached = !self.recovering;
                self.finish(reached);
                break;
            }
            if let FollowState::Following { next, .. } = &mut self.state {
                *next += 1;
            }
            if budget <= 1e-6 {
                break;
            }
        }

        // Keep the agent on the scanned floor
        if let Some(height) = self
            .planner
            .map()
            .interpolated_height_at(transform.position)
        {
            transform.position.y = height;
        }
    }

    fn remember_reference(&mut self, position: WorldPoint) {
        let snapshot = self.planner.map().snapshot();
        let grid = snapshot.grid();
        if grid.is_walkable(grid.world_to_grid(position)) {
            self.reference_point = Some(position);
        }
    }
}

impl Behavior for PathFollower {
    fn update(&mut self, transform: &mut AgentTransform, dt: f32) {
        self.remember_reference(transform.position);
        if !self.is_running() || dt <= 0.0 {
            return;
        }
        self.timer += dt;
        self.poll_planner(transform.position);
        self.step_along_path(transform, dt);
    }

    fn is_running(&self) -> bool {
        !matches!(self.state, FollowState::Idle)
    }

    fn stop(&mut self) {
        if self.is_running() {
            debug!("[Follower] stopped while {}", self.state.name());
        }
        self.abandon_current();
    }

    fn elapsed(&self) -> f32 {
        self.timer
    }
}

/// Rotate `current` toward `target` by at most `max_delta` radians,
/// taking the short way around.
fn turn_towards(current: f32, target: f32, max_delta: f32) -> f32 {
    use std::f32::consts::{PI, TAU};
    let mut diff = (target - current) % TAU;
    if diff > PI {
        diff -= TAU;
    } else if diff < -PI {
        diff += TAU;
    }
    current + diff.clamp(-max_delta, max_delta)
}
