//! Shared navigation map with atomic snapshot swapping.
//!
//! Grid construction is expensive, so consumers never see a map
//! mid-build. A rebuild produces a complete [`Snapshot`] off to the
//! side and swaps it in under a short write lock. Planner workers and
//! the follower hold their own `Arc<Snapshot>` and keep computing
//! against the map they started with even while a newer one lands.

use crate::core::{RoomMesh, WorldPoint};
use crate::error::{NavError, Result};
use crate::grid::{ComponentMap, GridParams, OccupancyGrid};
use log::info;
use parking_lot::RwLock;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::Instant;

/// An immutable occupancy grid plus its component labeling. Everything
/// a query or search needs, frozen at one rebuild.
#[derive(Debug)]
pub struct Snapshot {
    grid: OccupancyGrid,
    components: ComponentMap,
    generation: u64,
}

impl Snapshot {
    pub(crate) fn empty(params: &GridParams) -> Self {
        let grid = OccupancyGrid::empty(params);
        let components = ComponentMap::label(&grid);
        Self {
            grid,
            components,
            generation: 0,
        }
    }

    fn build(mesh: &RoomMesh, params: &GridParams, generation: u64) -> Self {
        let started = Instant::now();
        let grid = OccupancyGrid::build(mesh, params);
        let components = ComponentMap::label(&grid);
        info!(
            "[NavMap] built snapshot gen={}: {}x{} cells, {} regions in {:.1}ms",
            generation,
            grid.width(),
            grid.height(),
            components.component_count(),
            started.elapsed().as_secs_f64() * 1000.0
        );
        Self {
            grid,
            components,
            generation,
        }
    }

    pub fn grid(&self) -> &OccupancyGrid {
        &self.grid
    }

    pub fn components(&self) -> &ComponentMap {
        &self.components
    }

    /// Monotonic rebuild counter, 0 for the initial empty snapshot
    pub fn generation(&self) -> u64 {
        self.generation
    }
}

struct MapInner {
    current: RwLock<Arc<Snapshot>>,
    /// Source of rebuild generations; concurrent rebuilds each mint a
    /// distinct value
    next_generation: AtomicU64,
    params: GridParams,
}

/// Handle to the shared navigation map. Cloning is cheap and all
/// clones observe the same snapshot sequence.
#[derive(Clone)]
pub struct NavMap {
    inner: Arc<MapInner>,
}

impl NavMap {
    /// Create a map with an empty placeholder snapshot. Every query
    /// against it reports occupied until the first rebuild.
    pub fn new(params: GridParams) -> Self {
        Self {
            inner: Arc::new(MapInner {
                current: RwLock::new(Arc::new(Snapshot::empty(&params))),
                next_generation: AtomicU64::new(0),
                params,
            }),
        }
    }

    /// Create a map and run the first rebuild from `mesh` immediately.
    pub fn from_mesh(mesh: &RoomMesh, params: GridParams) -> Self {
        let map = Self::new(params);
        map.rebuild(mesh);
        map
    }

    /// Rebuild the grid from `mesh` on the calling thread and swap the
    /// result in. Readers keep their old snapshot until they next call
    /// [`NavMap::snapshot`].
    pub fn rebuild(&self, mesh: &RoomMesh) {
        let generation = self.inner.next_generation.fetch_add(1, Ordering::SeqCst) + 1;
        let snapshot = Arc::new(Snapshot::build(mesh, &self.inner.params, generation));
        let mut current = self.inner.current.write();
        // Concurrent rebuilds may finish out of order; the visible
        // generation must never move backwards
        if snapshot.generation() > current.generation() {
            *current = snapshot;
        }
    }

    /// Rebuild on a background thread. The returned handle joins when
    /// the new snapshot has been swapped in.
    pub fn rebuild_async(&self, mesh: RoomMesh) -> Result<JoinHandle<()>> {
        let map = self.clone();
        thread::Builder::new()
            .name("marga-rebuild".into())
            .spawn(move || map.rebuild(&mesh))
            .map_err(NavError::Io)
    }

    /// Current snapshot. The Arc stays valid across later rebuilds.
    pub fn snapshot(&self) -> Arc<Snapshot> {
        self.inner.current.read().clone()
    }

    /// Generation of the current snapshot
    pub fn generation(&self) -> u64 {
        self.inner.current.read().generation()
    }

    /// Grid parameters the map was created with
    pub fn params(&self) -> &GridParams {
        &self.inner.params
    }

    /// Whether `point` is occupied in the current snapshot
    pub fn is_occupied(&self, point: WorldPoint) -> bool {
        self.snapshot().grid().is_occupied(point)
    }

    /// Floor height at `point` in the current snapshot
    pub fn height_at(&self, point: WorldPoint) -> Option<f32> {
        let snapshot = self.snapshot();
        let grid = snapshot.grid();
        grid.height_at(grid.world_to_grid(point))
    }

    /// Bilinearly interpolated floor height at `point`
    pub fn interpolated_height_at(&self, point: WorldPoint) -> Option<f32> {
        self.snapshot().grid().interpolated_height_at(point)
    }

    /// Edge length of one grid cell in meters
    pub fn cell_size_in_meters(&self) -> f32 {
        self.inner.params.cell_size
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn room_params(size: f32) -> GridParams {
        GridParams {
            start_y: 0.1,
            end_y: 1.0,
            bounds_min: WorldPoint::new(0.0, 0.0, 0.0),
            bounds_max: WorldPoint::new(size, 0.0, size),
            cell_size: 0.1,
            agent_radius: 0.0,
        }
    }

    #[test]
    fn test_new_map_is_fully_occupied() {
        let map = NavMap::new(room_params(4.0));
        assert_eq!(map.generation(), 0);
        assert!(map.is_occupied(WorldPoint::new(2.0, 0.0, 2.0)));
    }

    #[test]
    fn test_rebuild_bumps_generation_and_opens_floor() {
        let map = NavMap::new(room_params(4.0));
        let mesh = RoomMesh::floor_rect(0.0, 0.0, 4.0, 4.0, 0.0);
        map.rebuild(&mesh);

        assert_eq!(map.generation(), 1);
        assert!(!map.is_occupied(WorldPoint::new(2.0, 0.0, 2.0)));

        map.rebuild(&mesh);
        assert_eq!(map.generation(), 2);
    }

    #[test]
    fn test_old_snapshot_survives_rebuild() {
        let map = NavMap::from_mesh(&RoomMesh::floor_rect(0.0, 0.0, 4.0, 4.0, 0.0), room_params(4.0));
        let old = map.snapshot();
        assert_eq!(old.generation(), 1);

        let mut blocked = RoomMesh::floor_rect(0.0, 0.0, 4.0, 4.0, 0.0);
        blocked.add_box(WorldPoint::new(1.5, 0.0, 1.5), WorldPoint::new(2.5, 1.0, 2.5));
        map.rebuild(&blocked);

        // The retained snapshot still answers from the pre-rebuild grid
        let center = WorldPoint::new(2.0, 0.0, 2.0);
        assert!(!old.grid().is_occupied(center));
        assert!(map.is_occupied(center));
        assert_eq!(map.snapshot().generation(), 2);
    }

    #[test]
    fn test_rebuild_async_swaps_in() {
        let map = NavMap::new(room_params(4.0));
        let mesh = RoomMesh::floor_rect(0.0, 0.0, 4.0, 4.0, 0.0);
        map.rebuild_async(mesh).unwrap().join().unwrap();
        assert_eq!(map.generation(), 1);
        assert!(!map.is_occupied(WorldPoint::new(2.0, 0.0, 2.0)));
    }

    #[test]
    fn test_concurrent_rebuilds_mint_distinct_generations() {
        let map = NavMap::new(room_params(4.0));
        let mesh = RoomMesh::floor_rect(0.0, 0.0, 4.0, 4.0, 0.0);

        let a = map.rebuild_async(mesh.clone()).unwrap();
        let b = map.rebuild_async(mesh).unwrap();
        a.join().unwrap();
        b.join().unwrap();

        // Two rebuilds, two generations, regardless of completion order
        assert_eq!(map.generation(), 2);
    }

    #[test]
    fn test_clones_share_state() {
        let map = NavMap::new(room_params(2.0));
        let clone = map.clone();
        map.rebuild(&RoomMesh::floor_rect(0.0, 0.0, 2.0, 2.0, 0.0));
        assert_eq!(clone.generation(), 1);
    }

    #[test]
    fn test_height_queries() {
        let map = NavMap::from_mesh(
            &RoomMesh::floor_rect(0.0, 0.0, 2.0, 2.0, 0.0),
            room_params(2.0),
        );
        let h = map.height_at(WorldPoint::new(1.0, 0.5, 1.0)).unwrap();
        assert!(h.abs() < 1e-4);
        let hi = map
            .interpolated_height_at(WorldPoint::new(1.0, 0.5, 1.0))
            .unwrap();
        assert!(hi.abs() < 1e-4);
    }
}
