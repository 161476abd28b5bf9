//! Fundamental types: coordinates and mesh input.

mod mesh;
mod point;

pub use mesh::RoomMesh;
pub use point::{GridCoord, WorldPoint};
