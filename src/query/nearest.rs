//! Nearest-reachable-point recovery.
//!
//! When a requested goal is occupied, off-grid, or in a different
//! walkable region, these queries find the closest cell the agent can
//! actually stand on. The search expands outward in Chebyshev rings
//! around the goal cell, so cost is bounded by the ring radius rather
//! than a full grid scan; within a ring, ties resolve by squared
//! Euclidean cell distance and then row-major order, keeping results
//! deterministic.

use crate::core::{GridCoord, WorldPoint};
use crate::grid::{ComponentMap, OccupancyGrid, UNLABELED};
use log::{debug, trace};
use rand::Rng;

/// Spatial queries against one (grid, components) snapshot.
pub struct NearestPointQuery<'a> {
    grid: &'a OccupancyGrid,
    components: &'a ComponentMap,
    max_radius_cells: i32,
}

impl<'a> NearestPointQuery<'a> {
    /// Create a query with the search radius bounded by the grid extent.
    pub fn new(grid: &'a OccupancyGrid, components: &'a ComponentMap) -> Self {
        let max_radius_cells = grid.width().max(grid.height()) as i32;
        Self {
            grid,
            components,
            max_radius_cells,
        }
    }

    /// Restrict the ring search to a smaller radius, in cells.
    pub fn with_max_radius(mut self, cells: i32) -> Self {
        self.max_radius_cells = cells.max(0);
        self
    }

    /// Closest walkable cell of `component` to `goal`, as a world-space
    /// cell center. None when the component has no cell within the
    /// search radius.
    pub fn closest_point_in_component(
        &self,
        goal: WorldPoint,
        component: u8,
    ) -> Option<WorldPoint> {
        if !goal.is_finite() {
            return None;
        }
        self.closest_cell_in_component(self.grid.world_to_grid(goal), component)
            .map(|c| self.grid.grid_to_world(c))
    }

    /// Closest cell to `goal` that is reachable from `source`: the
    /// target component is the one containing `source`.
    pub fn closest_point_from(&self, goal: WorldPoint, source: WorldPoint) -> Option<WorldPoint> {
        if !goal.is_finite() || !source.is_finite() {
            return None;
        }
        let component = self
            .components
            .component_at(self.grid.world_to_grid(source));
        if component == UNLABELED {
            debug!("[Nearest] source point is not on any walkable region");
            return None;
        }
        self.closest_point_in_component(goal, component)
    }

    /// Ring search in grid space. `from` may be out of bounds; the
    /// expansion starts from the nearest in-bounds cell, while distances
    /// are still measured to the original goal cell.
    pub fn closest_cell_in_component(&self, from: GridCoord, component: u8) -> Option<GridCoord> {
        if component == UNLABELED {
            return None;
        }
        let start = self.grid.clamp_coord(from);

        for radius in 0..=self.max_radius_cells {
            let mut best: Option<(i64, GridCoord)> = None;
            self.for_each_ring_cell(start, radius, |cell| {
                if self.components.component_at(cell) != component {
                    return;
                }
                let d2 = cell.distance_squared(&from);
                match best {
                    Some((best_d2, _)) if d2 >= best_d2 => {}
                    _ => best = Some((d2, cell)),
                }
            });
            if let Some((_, cell)) = best {
                trace!(
                    "[Nearest] found cell ({},{}) for component {} at ring {}",
                    cell.x,
                    cell.y,
                    component,
                    radius
                );
                return Some(cell);
            }
        }

        debug!(
            "[Nearest] no cell of component {} within {} rings",
            component, self.max_radius_cells
        );
        None
    }

    /// An interior point of the largest walkable region: the labeled
    /// cell with maximal clearance from obstacles, so idle agents are
    /// recovered to open floor rather than a component edge.
    pub fn largest_open_area_point(&self) -> Option<WorldPoint> {
        let id = self.components.largest_component()?;
        let mut best: Option<(f32, GridCoord)> = None;
        for cell in self.components.cells_of(id) {
            let clearance = self.grid.clearance_at(cell);
            match best {
                Some((best_clearance, _)) if clearance <= best_clearance => {}
                _ => best = Some((clearance, cell)),
            }
        }
        best.map(|(_, cell)| self.grid.grid_to_world(cell))
    }

    /// A random walkable point within `max_distance` of `origin`, in the
    /// same walkable region. Rejection sampling, at most `max_tries`
    /// draws. None when the origin itself is off the walkable area or no
    /// draw lands.
    pub fn random_reachable_point(
        &self,
        origin: WorldPoint,
        max_distance: f32,
        max_tries: usize,
    ) -> Option<WorldPoint> {
        if !origin.is_finite() || max_distance <= 0.0 {
            return None;
        }
        let component = self
            .components
            .component_at(self.grid.world_to_grid(origin));
        if component == UNLABELED {
            return None;
        }

        let mut rng = rand::thread_rng();
        for _ in 0..max_tries {
            let angle = rng.gen_range(0.0..std::f32::consts::TAU);
            let distance = rng.gen_range(0.0..max_distance);
            let candidate = WorldPoint::new(
                origin.x + distance * angle.sin(),
                origin.y,
                origin.z + distance * angle.cos(),
            );
            let cell = self.grid.world_to_grid(candidate);
            if self.components.component_at(cell) == component {
                return Some(self.grid.grid_to_world(cell));
            }
        }
        None
    }

    /// Visit the cells at exactly `radius` (Chebyshev) from `center`,
    /// in deterministic row-major order, skipping out-of-bounds cells.
    fn for_each_ring_cell(&self, center: GridCoord, radius: i32, mut visit: impl FnMut(GridCoord)) {
        let mut try_cell = |dx: i32, dy: i32| {
            let cell = GridCoord::new(center.x + dx, center.y + dy);
            if self.grid.is_valid_coord(cell) {
                visit(cell);
            }
        };

        if radius == 0 {
            try_cell(0, 0);
            return;
        }
        // Top and bottom rows
        for dx in -radius..=radius {
            try_cell(dx, -radius);
        }
        for dy in (-radius + 1)..radius {
            try_cell(-radius, dy);
            try_cell(radius, dy);
        }
        for dx in -radius..=radius {
            try_cell(dx, radius);
        }
    }
}
