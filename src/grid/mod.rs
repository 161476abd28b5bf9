//! Occupancy grid construction and walkable-region labeling.

mod components;
mod occupancy;

pub use components::{ComponentMap, UNLABELED};
pub use occupancy::{GridParams, OccupancyGrid};
