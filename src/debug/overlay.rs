//! Point and segment extraction for visual debugging.
//!
//! These functions turn a snapshot into plain world-space geometry the
//! host can render however it likes; nothing here draws.

use crate::core::WorldPoint;
use crate::map::Snapshot;
use serde::{Deserialize, Serialize};

/// Which overlays the host should draw.
#[derive(Clone, Copy, Debug, Serialize, Deserialize)]
#[serde(default)]
pub struct DebugFlags {
    /// Render occupied cells
    pub show_occupancy: bool,
    /// Render walkable regions colored by component
    pub show_connected_components: bool,
    /// Render the active path
    pub show_path_plan: bool,
    /// Play a visible reaction when pathing fails
    pub sad_on_pathing_failure: bool,
}

impl Default for DebugFlags {
    fn default() -> Self {
        Self {
            show_occupancy: false,
            show_connected_components: false,
            show_path_plan: true,
            sad_on_pathing_failure: true,
        }
    }
}

/// Cell centers of every occupied cell, at floor height.
pub fn occupied_points(snapshot: &Snapshot) -> Vec<WorldPoint> {
    let grid = snapshot.grid();
    let mut points = Vec::new();
    for y in 0..grid.height() as i32 {
        for x in 0..grid.width() as i32 {
            let cell = crate::core::GridCoord::new(x, y);
            if grid.is_occupied_coord(cell) {
                points.push(grid.grid_to_world(cell));
            }
        }
    }
    points
}

/// Cell centers of every labeled cell, with the component id stored in
/// the Y coordinate so a renderer can color (or stack) regions apart.
pub fn component_points(snapshot: &Snapshot) -> Vec<WorldPoint> {
    let grid = snapshot.grid();
    let components = snapshot.components();
    let mut points = Vec::new();
    for y in 0..grid.height() as i32 {
        for x in 0..grid.width() as i32 {
            let cell = crate::core::GridCoord::new(x, y);
            let id = components.component_at(cell);
            if id != crate::grid::UNLABELED {
                let mut p = grid.grid_to_world(cell);
                p.y = id as f32;
                points.push(p);
            }
        }
    }
    points
}

/// Consecutive waypoint pairs of a path, ready for line rendering.
pub fn path_segments(waypoints: &[WorldPoint]) -> Vec<(WorldPoint, WorldPoint)> {
    waypoints.windows(2).map(|w| (w[0], w[1])).collect()
}
