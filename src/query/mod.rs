//! Spatial queries against a navigation snapshot.

mod nearest;

pub use nearest::NearestPointQuery;
