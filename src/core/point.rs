//! Point and coordinate types for room navigation.

use serde::{Deserialize, Serialize};
use std::ops::{Add, Mul, Sub};

/// Grid coordinates (integer cell indices).
///
/// `x` indexes columns along world X, `y` indexes rows along world Z.
/// Grid coordinates are internal to the navigation layer and never
/// exposed to callers of the public planning API.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub struct GridCoord {
    /// Column index
    pub x: i32,
    /// Row index
    pub y: i32,
}

impl GridCoord {
    /// Create a new grid coordinate
    #[inline]
    pub fn new(x: i32, y: i32) -> Self {
        Self { x, y }
    }

    /// Manhattan distance to another coordinate
    #[inline]
    pub fn manhattan_distance(&self, other: &GridCoord) -> i32 {
        (self.x - other.x).abs() + (self.y - other.y).abs()
    }

    /// Chebyshev distance (max of x and y distance) - the natural metric
    /// for 8-connected grids
    #[inline]
    pub fn chebyshev_distance(&self, other: &GridCoord) -> i32 {
        (self.x - other.x).abs().max((self.y - other.y).abs())
    }

    /// Squared Euclidean distance in cell units
    #[inline]
    pub fn distance_squared(&self, other: &GridCoord) -> i64 {
        let dx = (self.x - other.x) as i64;
        let dy = (self.y - other.y) as i64;
        dx * dx + dy * dy
    }

    /// Get the 4 cardinal neighbors (N, E, S, W)
    #[inline]
    pub fn neighbors_4(&self) -> [GridCoord; 4] {
        [
            GridCoord::new(self.x, self.y + 1), // North
            GridCoord::new(self.x + 1, self.y), // East
            GridCoord::new(self.x, self.y - 1), // South
            GridCoord::new(self.x - 1, self.y), // West
        ]
    }

    /// Get the 8 neighbors. The first 4 entries are the cardinal moves,
    /// the last 4 the diagonal moves.
    #[inline]
    pub fn neighbors_8(&self) -> [GridCoord; 8] {
        [
            GridCoord::new(self.x, self.y + 1),     // N
            GridCoord::new(self.x + 1, self.y),     // E
            GridCoord::new(self.x, self.y - 1),     // S
            GridCoord::new(self.x - 1, self.y),     // W
            GridCoord::new(self.x + 1, self.y + 1), // NE
            GridCoord::new(self.x + 1, self.y - 1), // SE
            GridCoord::new(self.x - 1, self.y - 1), // SW
            GridCoord::new(self.x - 1, self.y + 1), // NW
        ]
    }
}

impl Add for GridCoord {
    type Output = Self;

    #[inline]
    fn add(self, other: Self) -> Self {
        GridCoord::new(self.x + other.x, self.y + other.y)
    }
}

impl Sub for GridCoord {
    type Output = Self;

    #[inline]
    fn sub(self, other: Self) -> Self {
        GridCoord::new(self.x - other.x, self.y - other.y)
    }
}

/// World coordinates (meters, f32).
///
/// Right-handed with Y vertical, matching the host scene graph.
/// The occupancy grid discretizes the horizontal X/Z plane.
#[derive(Clone, Copy, Debug, PartialEq, Default, Serialize, Deserialize)]
pub struct WorldPoint {
    /// X coordinate in meters
    pub x: f32,
    /// Y coordinate in meters (vertical)
    pub y: f32,
    /// Z coordinate in meters
    pub z: f32,
}

impl WorldPoint {
    /// Create a new world point
    #[inline]
    pub fn new(x: f32, y: f32, z: f32) -> Self {
        Self { x, y, z }
    }

    /// Zero point (origin)
    pub const ZERO: WorldPoint = WorldPoint {
        x: 0.0,
        y: 0.0,
        z: 0.0,
    };

    /// Euclidean distance to another point
    #[inline]
    pub fn distance(&self, other: &WorldPoint) -> f32 {
        let dx = self.x - other.x;
        let dy = self.y - other.y;
        let dz = self.z - other.z;
        (dx * dx + dy * dy + dz * dz).sqrt()
    }

    /// Distance in the horizontal X/Z plane, ignoring height
    #[inline]
    pub fn horizontal_distance(&self, other: &WorldPoint) -> f32 {
        let dx = self.x - other.x;
        let dz = self.z - other.z;
        (dx * dx + dz * dz).sqrt()
    }

    /// Squared horizontal distance (faster, avoids sqrt)
    #[inline]
    pub fn horizontal_distance_squared(&self, other: &WorldPoint) -> f32 {
        let dx = self.x - other.x;
        let dz = self.z - other.z;
        dx * dx + dz * dz
    }

    /// True when all three coordinates are finite (no NaN/inf)
    #[inline]
    pub fn is_finite(&self) -> bool {
        self.x.is_finite() && self.y.is_finite() && self.z.is_finite()
    }

    /// Linear interpolation towards another point
    #[inline]
    pub fn lerp(&self, other: &WorldPoint, t: f32) -> WorldPoint {
        WorldPoint::new(
            self.x + (other.x - self.x) * t,
            self.y + (other.y - self.y) * t,
            self.z + (other.z - self.z) * t,
        )
    }

    /// Heading from this point to another in the X/Z plane,
    /// radians CCW about +Y, zero facing +Z
    #[inline]
    pub fn yaw_to(&self, other: &WorldPoint) -> f32 {
        let dx = other.x - self.x;
        let dz = other.z - self.z;
        dx.atan2(dz)
    }
}

impl Add for WorldPoint {
    type Output = Self;

    #[inline]
    fn add(self, other: Self) -> Self {
        WorldPoint::new(self.x + other.x, self.y + other.y, self.z + other.z)
    }
}

impl Sub for WorldPoint {
    type Output = Self;

    #[inline]
    fn sub(self, other: Self) -> Self {
        WorldPoint::new(self.x - other.x, self.y - other.y, self.z - other.z)
    }
}

impl Mul<f32> for WorldPoint {
    type Output = Self;

    #[inline]
    fn mul(self, scalar: f32) -> Self {
        WorldPoint::new(self.x * scalar, self.y * scalar, self.z * scalar)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_grid_coord_neighbors() {
        let c = GridCoord::new(5, 5);
        let n4 = c.neighbors_4();
        assert_eq!(n4[0], GridCoord::new(5, 6)); // N
        assert_eq!(n4[1], GridCoord::new(6, 5)); // E
        assert_eq!(n4[2], GridCoord::new(5, 4)); // S
        assert_eq!(n4[3], GridCoord::new(4, 5)); // W
    }

    #[test]
    fn test_chebyshev_distance() {
        let a = GridCoord::new(0, 0);
        let b = GridCoord::new(3, -2);
        assert_eq!(a.chebyshev_distance(&b), 3);
        assert_eq!(a.manhattan_distance(&b), 5);
    }

    #[test]
    fn test_world_point_distance() {
        let a = WorldPoint::new(0.0, 0.0, 0.0);
        let b = WorldPoint::new(3.0, 0.0, 4.0);
        assert!((a.distance(&b) - 5.0).abs() < 1e-6);
        assert!((a.horizontal_distance(&b) - 5.0).abs() < 1e-6);
    }

    #[test]
    fn test_horizontal_ignores_height() {
        let a = WorldPoint::new(0.0, 0.0, 0.0);
        let b = WorldPoint::new(1.0, 10.0, 0.0);
        assert!((a.horizontal_distance(&b) - 1.0).abs() < 1e-6);
    }

    #[test]
    fn test_is_finite() {
        assert!(WorldPoint::new(1.0, 2.0, 3.0).is_finite());
        assert!(!WorldPoint::new(f32::NAN, 0.0, 0.0).is_finite());
        assert!(!WorldPoint::new(0.0, f32::INFINITY, 0.0).is_finite());
    }

    #[test]
    fn test_yaw_to() {
        let origin = WorldPoint::ZERO;
        let forward = WorldPoint::new(0.0, 0.0, 1.0);
        let right = WorldPoint::new(1.0, 0.0, 0.0);
        assert!((origin.yaw_to(&forward) - 0.0).abs() < 1e-6);
        assert!((origin.yaw_to(&right) - std::f32::consts::FRAC_PI_2).abs() < 1e-6);
    }
}
