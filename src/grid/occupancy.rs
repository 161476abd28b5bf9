//! Occupancy grid built from a horizontal slice of the room mesh.
//!
//! A cell is occupied when mesh geometry crosses the agent's height
//! slab over it, when no scanned floor covers it, or when it lies
//! within the agent radius of such a cell (obstacle inflation).
//! Rebuilding from the same mesh and parameters reproduces the same
//! occupancy bit for bit.

use crate::core::{GridCoord, RoomMesh, WorldPoint};
use log::{debug, warn};
use std::collections::VecDeque;

/// Minimum usable cell size; smaller values are clamped rather than
/// allowed to explode the grid dimensions.
const MIN_CELL_SIZE: f32 = 1e-3;

/// Parameters for slicing a mesh into an occupancy grid.
#[derive(Clone, Copy, Debug)]
pub struct GridParams {
    /// Bottom of the height slab (meters). Geometry below this is floor.
    pub start_y: f32,
    /// Top of the height slab (meters).
    pub end_y: f32,
    /// World-space minimum corner of the grid (only x/z are used)
    pub bounds_min: WorldPoint,
    /// World-space maximum corner of the grid (only x/z are used)
    pub bounds_max: WorldPoint,
    /// Cell edge length in meters
    pub cell_size: f32,
    /// Agent radius for obstacle inflation (meters)
    pub agent_radius: f32,
}

impl Default for GridParams {
    fn default() -> Self {
        Self {
            start_y: 0.1,
            end_y: 1.2,
            bounds_min: WorldPoint::new(-5.0, 0.0, -5.0),
            bounds_max: WorldPoint::new(5.0, 0.0, 5.0),
            cell_size: 0.05,
            agent_radius: 0.15,
        }
    }
}

impl GridParams {
    /// Derive bounds from the mesh's own extent.
    pub fn from_mesh_bounds(
        mesh: &RoomMesh,
        start_y: f32,
        end_y: f32,
        cell_size: f32,
        agent_radius: f32,
    ) -> Self {
        let (bounds_min, bounds_max) = mesh
            .bounds()
            .unwrap_or((WorldPoint::ZERO, WorldPoint::ZERO));
        Self {
            start_y,
            end_y,
            bounds_min,
            bounds_max,
            cell_size,
            agent_radius,
        }
    }

    fn is_degenerate(&self) -> bool {
        !self.bounds_min.is_finite()
            || !self.bounds_max.is_finite()
            || !self.start_y.is_finite()
            || !self.end_y.is_finite()
            || !self.cell_size.is_finite()
            || !self.agent_radius.is_finite()
    }
}

/// 2D boolean occupancy raster over a horizontal slice of the room,
/// plus a per-cell floor height map for vertical agent placement.
#[derive(Clone, Debug)]
pub struct OccupancyGrid {
    /// true = not walkable
    occupied: Vec<bool>,
    /// Floor height per cell (NaN where no floor was scanned)
    heights: Vec<f32>,
    /// Distance to the nearest pre-inflation obstacle, in cells
    distance_field: Vec<f32>,
    width: usize,
    height: usize,
    origin_x: f32,
    origin_z: f32,
    params: GridParams,
}

impl OccupancyGrid {
    /// Slice `mesh` between `params.start_y` and `params.end_y` into an
    /// occupancy grid. Degenerate parameters produce a 1x1 fully
    /// occupied grid instead of panicking.
    pub fn build(mesh: &RoomMesh, params: &GridParams) -> OccupancyGrid {
        if params.is_degenerate() {
            warn!("[Grid] degenerate build parameters, producing 1x1 occupied grid");
            return Self::empty(params);
        }

        let cell = params.cell_size.max(MIN_CELL_SIZE);
        let span_x = (params.bounds_max.x - params.bounds_min.x).max(0.0);
        let span_z = (params.bounds_max.z - params.bounds_min.z).max(0.0);
        let width = ((span_x / cell).ceil() as usize).max(1);
        let height = ((span_z / cell).ceil() as usize).max(1);
        let size = width * height;

        let mut grid = OccupancyGrid {
            occupied: vec![false; size],
            heights: vec![f32::NAN; size],
            distance_field: vec![f32::MAX; size],
            width,
            height,
            origin_x: params.bounds_min.x,
            origin_z: params.bounds_min.z,
            params: GridParams {
                cell_size: cell,
                ..*params
            },
        };

        grid.rasterize_floor(mesh);
        grid.rasterize_obstacles(mesh);

        // Cells outside the scanned floor are unknown and treated unsafe
        for i in 0..size {
            if grid.heights[i].is_nan() {
                grid.occupied[i] = true;
            }
        }

        grid.inflate_obstacles();

        debug!(
            "[Grid] built {}x{} cells at {:.3}m, {} walkable",
            grid.width,
            grid.height,
            cell,
            grid.occupied.iter().filter(|&&o| !o).count()
        );
        grid
    }

    /// A 1x1 fully occupied grid, used as the pre-scan placeholder.
    pub fn empty(params: &GridParams) -> OccupancyGrid {
        OccupancyGrid {
            occupied: vec![true],
            heights: vec![f32::NAN],
            distance_field: vec![0.0],
            width: 1,
            height: 1,
            origin_x: 0.0,
            origin_z: 0.0,
            params: GridParams {
                cell_size: params.cell_size.max(MIN_CELL_SIZE),
                ..*params
            },
        }
    }

    /// Grid width in cells
    #[inline]
    pub fn width(&self) -> usize {
        self.width
    }

    /// Grid height in cells
    #[inline]
    pub fn height(&self) -> usize {
        self.height
    }

    /// Physical size of each grid cell
    #[inline]
    pub fn cell_size_in_meters(&self) -> f32 {
        self.params.cell_size
    }

    /// Build parameters this grid was sliced with
    #[inline]
    pub fn params(&self) -> &GridParams {
        &self.params
    }

    /// Convert world coordinates to grid coordinates. Callers must
    /// filter the result through `is_valid_coord`; the input point is
    /// expected to be finite.
    #[inline]
    pub fn world_to_grid(&self, point: WorldPoint) -> GridCoord {
        let x = ((point.x - self.origin_x) / self.params.cell_size).floor() as i32;
        let y = ((point.z - self.origin_z) / self.params.cell_size).floor() as i32;
        GridCoord::new(x, y)
    }

    /// Convert grid coordinates to the cell center in world space.
    /// The height comes from the floor height map when available.
    #[inline]
    pub fn grid_to_world(&self, coord: GridCoord) -> WorldPoint {
        let y = self
            .height_at(coord)
            .unwrap_or(self.params.start_y);
        WorldPoint::new(
            self.origin_x + (coord.x as f32 + 0.5) * self.params.cell_size,
            y,
            self.origin_z + (coord.y as f32 + 0.5) * self.params.cell_size,
        )
    }

    /// Check if grid coordinates are within bounds
    #[inline]
    pub fn is_valid_coord(&self, coord: GridCoord) -> bool {
        coord.x >= 0
            && coord.y >= 0
            && (coord.x as usize) < self.width
            && (coord.y as usize) < self.height
    }

    /// Clamp arbitrary grid coordinates into bounds
    #[inline]
    pub fn clamp_coord(&self, coord: GridCoord) -> GridCoord {
        GridCoord::new(
            coord.x.clamp(0, self.width as i32 - 1),
            coord.y.clamp(0, self.height as i32 - 1),
        )
    }

    /// Convert grid coordinates to flat array index
    #[inline]
    pub fn coord_to_index(&self, coord: GridCoord) -> Option<usize> {
        if self.is_valid_coord(coord) {
            Some(coord.y as usize * self.width + coord.x as usize)
        } else {
            None
        }
    }

    /// Check occupancy at a world point. NaN and out-of-grid points are
    /// occupied - nothing outside the scanned room is walkable.
    pub fn is_occupied(&self, point: WorldPoint) -> bool {
        if !point.is_finite() {
            return true;
        }
        match self.coord_to_index(self.world_to_grid(point)) {
            Some(i) => self.occupied[i],
            None => true,
        }
    }

    /// Check occupancy at grid coordinates (out of bounds = occupied)
    #[inline]
    pub fn is_occupied_coord(&self, coord: GridCoord) -> bool {
        match self.coord_to_index(coord) {
            Some(i) => self.occupied[i],
            None => true,
        }
    }

    /// Walkable = in bounds and not occupied
    #[inline]
    pub fn is_walkable(&self, coord: GridCoord) -> bool {
        !self.is_occupied_coord(coord)
    }

    /// Raw occupancy slice, row-major (for overlays and determinism tests)
    pub fn occupancy_raw(&self) -> &[bool] {
        &self.occupied
    }

    /// Floor height at a cell, None where no floor was scanned
    #[inline]
    pub fn height_at(&self, coord: GridCoord) -> Option<f32> {
        let i = self.coord_to_index(coord)?;
        let h = self.heights[i];
        if h.is_nan() {
            None
        } else {
            Some(h)
        }
    }

    /// Bilinearly interpolated floor height at a world point, sampled
    /// from the four surrounding cell centers. Cells without height data
    /// fall back to the nearest covered neighbor in the sample quad.
    pub fn interpolated_height_at(&self, point: WorldPoint) -> Option<f32> {
        if !point.is_finite() {
            return None;
        }
        let cell = self.params.cell_size;
        // Position relative to the cell-center lattice
        let fx = (point.x - self.origin_x) / cell - 0.5;
        let fz = (point.z - self.origin_z) / cell - 0.5;
        let x0 = fx.floor() as i32;
        let z0 = fz.floor() as i32;
        let tx = fx - x0 as f32;
        let tz = fz - z0 as f32;

        let sample = |x: i32, z: i32| self.height_at(self.clamp_coord(GridCoord::new(x, z)));
        let corners = [
            sample(x0, z0),
            sample(x0 + 1, z0),
            sample(x0, z0 + 1),
            sample(x0 + 1, z0 + 1),
        ];
        let fallback = corners.iter().flatten().next().copied()?;
        let h = |i: usize| corners[i].unwrap_or(fallback);

        let bottom = h(0) + (h(1) - h(0)) * tx;
        let top = h(2) + (h(3) - h(2)) * tx;
        Some(bottom + (top - bottom) * tz)
    }

    /// Distance from a cell to the nearest pre-inflation obstacle,
    /// in meters. Zero on obstacle cells.
    #[inline]
    pub fn clearance_at(&self, coord: GridCoord) -> f32 {
        match self.coord_to_index(coord) {
            Some(i) => self.distance_field[i] * self.params.cell_size,
            None => 0.0,
        }
    }

    // --- build passes ---

    /// Record floor coverage and heights from triangles reaching below
    /// the slab. Coverage is decided at cell centers; a cell whose
    /// center is off the scanned floor stays unknown.
    fn rasterize_floor(&mut self, mesh: &RoomMesh) {
        let start_y = self.params.start_y;
        for tri in mesh.iter_triangles() {
            let min_y = tri[0].y.min(tri[1].y).min(tri[2].y);
            if min_y >= start_y {
                continue;
            }
            self.for_each_cell_in_bbox(&tri, |grid, coord| {
                let center_x =
                    grid.origin_x + (coord.x as f32 + 0.5) * grid.params.cell_size;
                let center_z =
                    grid.origin_z + (coord.y as f32 + 0.5) * grid.params.cell_size;
                if let Some(h) = barycentric_height(&tri, center_x, center_z) {
                    if h < start_y {
                        let i = coord.y as usize * grid.width + coord.x as usize;
                        let prev = grid.heights[i];
                        grid.heights[i] = if prev.is_nan() { h } else { prev.max(h) };
                    }
                }
            });
        }
    }

    /// Mark cells crossed by geometry inside the height slab.
    fn rasterize_obstacles(&mut self, mesh: &RoomMesh) {
        let (start_y, end_y) = (self.params.start_y, self.params.end_y);
        for tri in mesh.iter_triangles() {
            let min_y = tri[0].y.min(tri[1].y).min(tri[2].y);
            let max_y = tri[0].y.max(tri[1].y).max(tri[2].y);
            if max_y < start_y || min_y > end_y {
                continue;
            }
            let cell = self.params.cell_size;
            self.for_each_cell_in_bbox(&tri, |grid, coord| {
                let min_x = grid.origin_x + coord.x as f32 * cell;
                let min_z = grid.origin_z + coord.y as f32 * cell;
                if triangle_overlaps_cell(&tri, min_x, min_z, cell) {
                    let i = coord.y as usize * grid.width + coord.x as usize;
                    grid.occupied[i] = true;
                }
            });
        }
    }

    /// Visit every in-bounds cell under the triangle's XZ bounding box.
    fn for_each_cell_in_bbox(
        &mut self,
        tri: &[WorldPoint; 3],
        mut visit: impl FnMut(&mut Self, GridCoord),
    ) {
        let cell = self.params.cell_size;
        let min_x = tri[0].x.min(tri[1].x).min(tri[2].x);
        let max_x = tri[0].x.max(tri[1].x).max(tri[2].x);
        let min_z = tri[0].z.min(tri[1].z).min(tri[2].z);
        let max_z = tri[0].z.max(tri[1].z).max(tri[2].z);

        let x0 = (((min_x - self.origin_x) / cell).floor() as i32).max(0);
        let x1 = (((max_x - self.origin_x) / cell).floor() as i32).min(self.width as i32 - 1);
        let z0 = (((min_z - self.origin_z) / cell).floor() as i32).max(0);
        let z1 = (((max_z - self.origin_z) / cell).floor() as i32).min(self.height as i32 - 1);

        for z in z0..=z1 {
            for x in x0..=x1 {
                visit(self, GridCoord::new(x, z));
            }
        }
    }

    /// Grow occupied regions by the agent radius so a center-point
    /// planner yields collision-free paths for a finite-size agent.
    /// Brushfire BFS over 8-connected neighbors, like a cost map
    /// inflation layer.
    fn inflate_obstacles(&mut self) {
        let mut queue = VecDeque::with_capacity(self.occupied.len() / 8);
        for y in 0..self.height as i32 {
            for x in 0..self.width as i32 {
                let i = y as usize * self.width + x as usize;
                if self.occupied[i] {
                    self.distance_field[i] = 0.0;
                    queue.push_back((x, y));
                }
            }
        }

        let sqrt2 = std::f32::consts::SQRT_2;
        let neighbors = [
            (-1, 0, 1.0),
            (1, 0, 1.0),
            (0, -1, 1.0),
            (0, 1, 1.0),
            (-1, -1, sqrt2),
            (1, -1, sqrt2),
            (-1, 1, sqrt2),
            (1, 1, sqrt2),
        ];

        while let Some((x, y)) = queue.pop_front() {
            let current = self.distance_field[y as usize * self.width + x as usize];
            for &(dx, dy, step) in &neighbors {
                let nx = x + dx;
                let ny = y + dy;
                if nx < 0 || ny < 0 || nx >= self.width as i32 || ny >= self.height as i32 {
                    continue;
                }
                let ni = ny as usize * self.width + nx as usize;
                let next = current + step;
                if next < self.distance_field[ni] {
                    self.distance_field[ni] = next;
                    queue.push_back((nx, ny));
                }
            }
        }

        let radius_cells = self.params.agent_radius.max(0.0) / self.params.cell_size;
        if radius_cells > 0.0 {
            // Distances are measured center to center, which under-reads
            // the distance to the obstacle's actual edge by up to half a
            // cell; pad the threshold accordingly
            let threshold = radius_cells + 0.5;
            for i in 0..self.occupied.len() {
                if self.distance_field[i] < threshold {
                    self.occupied[i] = true;
                }
            }
        }
    }
}

/// Height of the triangle surface above the XZ point, via barycentric
/// interpolation. None when the point is outside the triangle's XZ
/// projection or the projection is degenerate.
fn barycentric_height(tri: &[WorldPoint; 3], x: f32, z: f32) -> Option<f32> {
    let (a, b, c) = (tri[0], tri[1], tri[2]);
    let denom = (b.z - c.z) * (a.x - c.x) + (c.x - b.x) * (a.z - c.z);
    if denom.abs() < 1e-12 {
        return None;
    }
    let w0 = ((b.z - c.z) * (x - c.x) + (c.x - b.x) * (z - c.z)) / denom;
    let w1 = ((c.z - a.z) * (x - c.x) + (a.x - c.x) * (z - c.z)) / denom;
    let w2 = 1.0 - w0 - w1;
    let eps = -1e-5;
    if w0 >= eps && w1 >= eps && w2 >= eps {
        Some(w0 * a.y + w1 * b.y + w2 * c.y)
    } else {
        None
    }
}

/// Conservative triangle vs cell-square overlap test in the XZ plane
/// (separating axis over the square axes and the triangle edge normals).
fn triangle_overlaps_cell(tri: &[WorldPoint; 3], min_x: f32, min_z: f32, size: f32) -> bool {
    let t = [(tri[0].x, tri[0].z), (tri[1].x, tri[1].z), (tri[2].x, tri[2].z)];
    let rect = [
        (min_x, min_z),
        (min_x + size, min_z),
        (min_x + size, min_z + size),
        (min_x, min_z + size),
    ];

    let mut axes: Vec<(f32, f32)> = vec![(1.0, 0.0), (0.0, 1.0)];
    for e in 0..3 {
        let (ax, az) = t[e];
        let (bx, bz) = t[(e + 1) % 3];
        let (ex, ez) = (bx - ax, bz - az);
        if ex.abs() > 1e-12 || ez.abs() > 1e-12 {
            axes.push((-ez, ex));
        }
    }

    for (ax, az) in axes {
        let project = |pts: &[(f32, f32)]| {
            let mut lo = f32::MAX;
            let mut hi = f32::MIN;
            for &(px, pz) in pts {
                let d = px * ax + pz * az;
                lo = lo.min(d);
                hi = hi.max(d);
            }
            (lo, hi)
        };
        let (t_lo, t_hi) = project(&t);
        let (r_lo, r_hi) = project(&rect);
        if t_hi < r_lo || r_hi < t_lo {
            return false;
        }
    }
    true
}

#[cfg(test)]
mod tests {
    use super::*;

    fn room_params(size: f32, cell: f32, radius: f32) -> GridParams {
        GridParams {
            start_y: 0.1,
            end_y: 1.0,
            bounds_min: WorldPoint::new(0.0, 0.0, 0.0),
            bounds_max: WorldPoint::new(size, 0.0, size),
            cell_size: cell,
            agent_radius: radius,
        }
    }

    #[test]
    fn test_open_floor_is_walkable() {
        let mesh = RoomMesh::floor_rect(0.0, 0.0, 4.0, 4.0, 0.0);
        let grid = OccupancyGrid::build(&mesh, &room_params(4.0, 0.1, 0.0));

        assert_eq!(grid.width(), 40);
        assert_eq!(grid.height(), 40);
        assert!(!grid.is_occupied(WorldPoint::new(2.0, 0.0, 2.0)));
    }

    #[test]
    fn test_obstacle_occupies_cells() {
        let mut mesh = RoomMesh::floor_rect(0.0, 0.0, 4.0, 4.0, 0.0);
        mesh.add_box(WorldPoint::new(1.5, 0.0, 1.5), WorldPoint::new(2.5, 1.0, 2.5));
        let grid = OccupancyGrid::build(&mesh, &room_params(4.0, 0.1, 0.0));

        assert!(grid.is_occupied(WorldPoint::new(2.0, 0.0, 2.0)));
        assert!(!grid.is_occupied(WorldPoint::new(0.5, 0.0, 0.5)));
    }

    #[test]
    fn test_inflation_grows_obstacles() {
        let mut mesh = RoomMesh::floor_rect(0.0, 0.0, 4.0, 4.0, 0.0);
        mesh.add_box(WorldPoint::new(1.9, 0.0, 1.9), WorldPoint::new(2.1, 1.0, 2.1));
        let thin = OccupancyGrid::build(&mesh, &room_params(4.0, 0.1, 0.0));
        let fat = OccupancyGrid::build(&mesh, &room_params(4.0, 0.1, 0.3));

        // A point 0.25m from the box edge: free for a point agent,
        // occupied once inflated by 0.3m
        let probe = WorldPoint::new(2.0, 0.0, 2.35);
        assert!(!thin.is_occupied(probe));
        assert!(fat.is_occupied(probe));

        // Far from the box the floor stays walkable after inflation
        assert!(!fat.is_occupied(WorldPoint::new(0.5, 0.0, 0.5)));
    }

    #[test]
    fn test_outside_scan_is_occupied() {
        let mesh = RoomMesh::floor_rect(0.0, 0.0, 2.0, 2.0, 0.0);
        // Grid bounds wider than the scanned floor
        let params = GridParams {
            bounds_max: WorldPoint::new(4.0, 0.0, 4.0),
            ..room_params(4.0, 0.1, 0.0)
        };
        let grid = OccupancyGrid::build(&mesh, &params);

        assert!(!grid.is_occupied(WorldPoint::new(1.0, 0.0, 1.0)));
        assert!(grid.is_occupied(WorldPoint::new(3.0, 0.0, 3.0)));
    }

    #[test]
    fn test_out_of_grid_and_nan_are_occupied() {
        let mesh = RoomMesh::floor_rect(0.0, 0.0, 2.0, 2.0, 0.0);
        let grid = OccupancyGrid::build(&mesh, &room_params(2.0, 0.1, 0.0));

        assert!(grid.is_occupied(WorldPoint::new(-1.0, 0.0, 1.0)));
        assert!(grid.is_occupied(WorldPoint::new(1.0, 0.0, 50.0)));
        assert!(grid.is_occupied(WorldPoint::new(f32::NAN, 0.0, 1.0)));
    }

    #[test]
    fn test_degenerate_bounds_do_not_crash() {
        let mesh = RoomMesh::floor_rect(0.0, 0.0, 2.0, 2.0, 0.0);
        let params = GridParams {
            bounds_min: WorldPoint::new(3.0, 0.0, 3.0),
            bounds_max: WorldPoint::new(3.0, 0.0, 3.0),
            ..GridParams::default()
        };
        let grid = OccupancyGrid::build(&mesh, &params);
        assert_eq!(grid.width(), 1);
        assert_eq!(grid.height(), 1);

        let nan_params = GridParams {
            bounds_min: WorldPoint::new(f32::NAN, 0.0, 0.0),
            ..GridParams::default()
        };
        let grid = OccupancyGrid::build(&mesh, &nan_params);
        assert_eq!(grid.width(), 1);
        assert!(grid.is_occupied_coord(GridCoord::new(0, 0)));
    }

    #[test]
    fn test_rebuild_is_deterministic() {
        let mut mesh = RoomMesh::floor_rect(0.0, 0.0, 5.0, 5.0, 0.0);
        mesh.add_box(WorldPoint::new(1.0, 0.0, 1.0), WorldPoint::new(2.0, 0.8, 3.0));
        let params = room_params(5.0, 0.05, 0.2);

        let a = OccupancyGrid::build(&mesh, &params);
        let b = OccupancyGrid::build(&mesh, &params);
        assert_eq!(a.occupancy_raw(), b.occupancy_raw());
    }

    #[test]
    fn test_height_queries() {
        let mesh = RoomMesh::floor_rect(0.0, 0.0, 2.0, 2.0, 0.05);
        let grid = OccupancyGrid::build(&mesh, &room_params(2.0, 0.1, 0.0));

        let coord = grid.world_to_grid(WorldPoint::new(1.0, 0.0, 1.0));
        let h = grid.height_at(coord).unwrap();
        assert!((h - 0.05).abs() < 1e-4);

        let hi = grid
            .interpolated_height_at(WorldPoint::new(1.03, 0.0, 0.97))
            .unwrap();
        assert!((hi - 0.05).abs() < 1e-3);
    }

    #[test]
    fn test_world_grid_round_trip() {
        let mesh = RoomMesh::floor_rect(0.0, 0.0, 2.0, 2.0, 0.0);
        let grid = OccupancyGrid::build(&mesh, &room_params(2.0, 0.1, 0.0));

        let coord = GridCoord::new(7, 13);
        let world = grid.grid_to_world(coord);
        assert_eq!(grid.world_to_grid(world), coord);
    }
}
