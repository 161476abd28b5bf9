//! Debug visualization data for host renderers.

mod overlay;

pub use overlay::{component_points, occupied_points, path_segments, DebugFlags};
