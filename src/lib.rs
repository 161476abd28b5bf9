//! # marga-nav
//!
//! Navigation for virtual agents in scanned indoor spaces. A room mesh
//! is sliced into a 2D occupancy grid, walkable regions are labeled by
//! connected component, and an asynchronous planner runs A* searches
//! against immutable map snapshots while a path-following behavior
//! walks the agent along the result.
//!
//! ## Quick start
//!
//! ```no_run
//! use marga_nav::behavior::{AgentTransform, Behavior, FollowerConfig, PathFollower};
//! use marga_nav::core::{RoomMesh, WorldPoint};
//! use marga_nav::grid::GridParams;
//! use marga_nav::map::NavMap;
//! use marga_nav::planning::{PathPlanner, PlannerConfig};
//!
//! let mesh = RoomMesh::floor_rect(0.0, 0.0, 5.0, 5.0, 0.0);
//! let map = NavMap::from_mesh(&mesh, GridParams::from_mesh_bounds(&mesh, 0.1, 1.2, 0.05, 0.15));
//! let planner = PathPlanner::spawn(map, PlannerConfig::default()).unwrap();
//! let mut follower = PathFollower::new(planner, FollowerConfig::default());
//!
//! let mut agent = AgentTransform::new(WorldPoint::new(0.5, 0.0, 0.5), 0.0);
//! follower.run_towards(&agent, WorldPoint::new(4.5, 0.0, 4.5), 1.0, 0.15, None);
//! loop {
//!     follower.update(&mut agent, 1.0 / 60.0);
//!     if !follower.is_running() {
//!         break;
//!     }
//! }
//! ```

pub mod behavior;
pub mod config;
pub mod core;
pub mod debug;
pub mod error;
pub mod grid;
pub mod map;
pub mod planning;
pub mod query;

pub use behavior::{AgentTransform, Behavior, FollowerConfig, PathFollower};
pub use config::NavConfig;
pub use core::{GridCoord, RoomMesh, WorldPoint};
pub use error::{NavError, Result};
pub use grid::{ComponentMap, GridParams, OccupancyGrid};
pub use map::{NavMap, Snapshot};
pub use planning::{PathFailure, PathOperation, PathPlanner, PathResult, PlannerConfig};
pub use query::NearestPointQuery;
