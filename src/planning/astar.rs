//! A* path search over the occupancy grid.
//!
//! 8-connected moves with an octile heuristic; diagonal steps cost
//! sqrt(2). Ties in the open set resolve by lowest estimated cost and
//! then insertion order, so searches are deterministic for a given
//! grid. The search checks a cancellation flag periodically so an
//! abandoned request stops burning its worker.

use crate::core::{GridCoord, WorldPoint};
use crate::grid::OccupancyGrid;
use log::{debug, trace};
use std::cmp::Ordering;
use std::collections::{BinaryHeap, HashMap};
use std::sync::atomic::{AtomicBool, Ordering as AtomicOrdering};

/// How often (in node expansions) the cancellation flag is polled.
const CANCEL_CHECK_INTERVAL: usize = 128;

/// A node in the A* open set
#[derive(Clone, Debug)]
struct SearchNode {
    coord: GridCoord,
    g_cost: f32,
    f_cost: f32,
    /// Insertion sequence for deterministic tie-breaking
    seq: u64,
}

impl Eq for SearchNode {}

impl PartialEq for SearchNode {
    fn eq(&self, other: &Self) -> bool {
        self.coord == other.coord && self.seq == other.seq
    }
}

impl Ord for SearchNode {
    fn cmp(&self, other: &Self) -> Ordering {
        // Reverse ordering for min-heap behavior; earlier insertion wins ties
        other
            .f_cost
            .partial_cmp(&self.f_cost)
            .unwrap_or(Ordering::Equal)
            .then(other.seq.cmp(&self.seq))
    }
}

impl PartialOrd for SearchNode {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

/// Search tuning knobs
#[derive(Clone, Copy, Debug)]
pub struct SearchConfig {
    /// Diagonal movement cost multiplier
    pub diagonal_cost: f32,
    /// Maximum node expansions before giving up
    pub max_iterations: usize,
}

impl Default for SearchConfig {
    fn default() -> Self {
        Self {
            diagonal_cost: std::f32::consts::SQRT_2,
            max_iterations: 200_000,
        }
    }
}

/// Why a path request did not produce a path
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum PathFailure {
    /// Start position is off-grid, occupied, or NaN
    InvalidStart,
    /// Goal position is off-grid, occupied, or NaN
    InvalidGoal,
    /// Start and goal lie in different walkable regions
    Unreachable,
    /// Search budget exhausted without reaching the goal
    NoPath,
    /// Request was cancelled before finishing
    Cancelled,
}

/// Result of a path search
#[derive(Clone, Debug)]
pub struct PathResult {
    /// Cell path from start to goal (empty on failure)
    pub path_grid: Vec<GridCoord>,
    /// World-space waypoints; simplified to turn points by the planner
    pub waypoints: Vec<WorldPoint>,
    /// Total movement cost in cell units
    pub cost: f32,
    /// Nodes expanded during the search
    pub nodes_expanded: usize,
    /// Whether a path was found
    pub success: bool,
    /// Failure kind when `success` is false
    pub failure: Option<PathFailure>,
}

impl PathResult {
    pub(crate) fn failed(failure: PathFailure, nodes_expanded: usize) -> Self {
        Self {
            path_grid: Vec::new(),
            waypoints: Vec::new(),
            cost: f32::INFINITY,
            nodes_expanded,
            success: false,
            failure: Some(failure),
        }
    }

    /// Approximate world length of the waypoint list
    pub fn length_meters(&self) -> f32 {
        if self.waypoints.len() < 2 {
            return 0.0;
        }
        self.waypoints
            .windows(2)
            .map(|w| w[0].horizontal_distance(&w[1]))
            .sum()
    }
}

/// Grid path search bound to one occupancy snapshot.
pub struct GridSearch<'a> {
    grid: &'a OccupancyGrid,
    config: SearchConfig,
}

impl<'a> GridSearch<'a> {
    pub fn new(grid: &'a OccupancyGrid, config: SearchConfig) -> Self {
        Self { grid, config }
    }

    /// Find a shortest cell path from `start` to `goal`. The optional
    /// `cancel` flag aborts the search cooperatively.
    pub fn find_path(
        &self,
        start: GridCoord,
        goal: GridCoord,
        cancel: Option<&AtomicBool>,
    ) -> PathResult {
        trace!(
            "[AStar] find_path: start=({},{}) goal=({},{})",
            start.x,
            start.y,
            goal.x,
            goal.y
        );

        if !self.grid.is_walkable(start) {
            debug!("[AStar] FAILED: InvalidStart at ({},{})", start.x, start.y);
            return PathResult::failed(PathFailure::InvalidStart, 0);
        }
        if !self.grid.is_walkable(goal) {
            debug!("[AStar] FAILED: InvalidGoal at ({},{})", goal.x, goal.y);
            return PathResult::failed(PathFailure::InvalidGoal, 0);
        }

        let mut open_set = BinaryHeap::new();
        let mut closed = vec![false; self.grid.width() * self.grid.height()];
        let mut came_from: HashMap<GridCoord, GridCoord> = HashMap::new();
        let mut g_scores: HashMap<GridCoord, f32> = HashMap::new();
        let mut seq: u64 = 0;

        open_set.push(SearchNode {
            coord: start,
            g_cost: 0.0,
            f_cost: self.heuristic(start, goal),
            seq,
        });
        g_scores.insert(start, 0.0);

        let mut nodes_expanded = 0;

        while let Some(current) = open_set.pop() {
            nodes_expanded += 1;

            // Checked on the very first expansion so short searches
            // still observe a pre-issued cancel
            if nodes_expanded % CANCEL_CHECK_INTERVAL == 1 {
                if let Some(flag) = cancel {
                    if flag.load(AtomicOrdering::Relaxed) {
                        debug!("[AStar] cancelled after {} nodes", nodes_expanded);
                        return PathResult::failed(PathFailure::Cancelled, nodes_expanded);
                    }
                }
            }

            if nodes_expanded > self.config.max_iterations {
                debug!(
                    "[AStar] FAILED: NoPath, budget exhausted ({} nodes)",
                    nodes_expanded
                );
                return PathResult::failed(PathFailure::NoPath, nodes_expanded);
            }

            if current.coord == goal {
                return self.reconstruct_path(came_from, goal, current.g_cost, nodes_expanded);
            }

            let current_idx =
                current.coord.y as usize * self.grid.width() + current.coord.x as usize;
            if closed[current_idx] {
                continue;
            }
            closed[current_idx] = true;

            for (i, neighbor) in current.coord.neighbors_8().iter().enumerate() {
                if !self.grid.is_walkable(*neighbor) {
                    continue;
                }
                let neighbor_idx =
                    neighbor.y as usize * self.grid.width() + neighbor.x as usize;
                if closed[neighbor_idx] {
                    continue;
                }

                // First 4 entries are cardinal moves, last 4 diagonal
                let move_cost = if i >= 4 { self.config.diagonal_cost } else { 1.0 };
                let tentative_g = g_scores[&current.coord] + move_cost;

                let known_g = g_scores.get(neighbor).copied().unwrap_or(f32::INFINITY);
                if tentative_g < known_g {
                    came_from.insert(*neighbor, current.coord);
                    g_scores.insert(*neighbor, tentative_g);
                    seq += 1;
                    open_set.push(SearchNode {
                        coord: *neighbor,
                        g_cost: tentative_g,
                        f_cost: tentative_g + self.heuristic(*neighbor, goal),
                        seq,
                    });
                }
            }
        }

        debug!(
            "[AStar] FAILED: NoPath after expanding {} nodes",
            nodes_expanded
        );
        PathResult::failed(PathFailure::NoPath, nodes_expanded)
    }

    /// Octile distance heuristic for 8-connected movement
    fn heuristic(&self, from: GridCoord, to: GridCoord) -> f32 {
        let dx = (from.x - to.x).abs() as f32;
        let dy = (from.y - to.y).abs() as f32;
        let min = dx.min(dy);
        let max = dx.max(dy);
        min * self.config.diagonal_cost + (max - min)
    }

    fn reconstruct_path(
        &self,
        came_from: HashMap<GridCoord, GridCoord>,
        goal: GridCoord,
        cost: f32,
        nodes_expanded: usize,
    ) -> PathResult {
        let mut path_grid = Vec::new();
        let mut current = goal;

        while let Some(&prev) = came_from.get(&current) {
            path_grid.push(current);
            current = prev;
        }
        path_grid.push(current);
        path_grid.reverse();

        let waypoints: Vec<WorldPoint> = path_grid
            .iter()
            .map(|c| self.grid.grid_to_world(*c))
            .collect();

        trace!(
            "[AStar] SUCCESS: {} cells, cost={:.2}, nodes_expanded={}",
            path_grid.len(),
            cost,
            nodes_expanded
        );

        PathResult {
            path_grid,
            waypoints,
            cost,
            nodes_expanded,
            success: true,
            failure: None,
        }
    }
}
