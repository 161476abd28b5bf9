//! Waypoint simplification.
//!
//! Raw A* output visits every cell along the route. The follower only
//! needs the turn points, so runs of near-collinear waypoints collapse
//! to their endpoints. Collinearity is judged in the horizontal plane;
//! per-cell floor heights ride along with whichever waypoints survive.

use crate::core::WorldPoint;

/// Maximum perpendicular deviation (meters) for a waypoint to count as
/// lying on the segment between its neighbors.
const COLLINEAR_TOLERANCE: f32 = 0.01;

/// Collapse near-collinear runs of waypoints down to turn points.
/// The first and last waypoints are always kept.
pub fn turn_points(waypoints: &[WorldPoint]) -> Vec<WorldPoint> {
    if waypoints.len() <= 2 {
        return waypoints.to_vec();
    }

    let mut result = Vec::with_capacity(waypoints.len());
    result.push(waypoints[0]);
    let mut anchor = waypoints[0];

    for i in 1..waypoints.len() - 1 {
        let next = waypoints[i + 1];
        if perpendicular_distance_xz(&waypoints[i], &anchor, &next) > COLLINEAR_TOLERANCE {
            result.push(waypoints[i]);
            anchor = waypoints[i];
        }
    }

    result.push(*waypoints.last().unwrap());
    result
}

/// Total horizontal length of a waypoint polyline in meters
pub fn path_length(waypoints: &[WorldPoint]) -> f32 {
    waypoints
        .windows(2)
        .map(|w| w[0].horizontal_distance(&w[1]))
        .sum()
}

/// Distance from `point` to the segment `a`-`b`, measured in the XZ plane
fn perpendicular_distance_xz(point: &WorldPoint, a: &WorldPoint, b: &WorldPoint) -> f32 {
    let seg_x = b.x - a.x;
    let seg_z = b.z - a.z;
    let len_sq = seg_x * seg_x + seg_z * seg_z;
    if len_sq < f32::EPSILON {
        return point.horizontal_distance(a);
    }

    let t = ((point.x - a.x) * seg_x + (point.z - a.z) * seg_z) / len_sq;
    let t = t.clamp(0.0, 1.0);
    let proj_x = a.x + t * seg_x;
    let proj_z = a.z + t * seg_z;
    let dx = point.x - proj_x;
    let dz = point.z - proj_z;
    (dx * dx + dz * dz).sqrt()
}
