//! Agent behaviors driven from the host's update loop.

mod follower;

pub use follower::{CompletionCallback, FollowState, FollowerConfig, PathFollower};

use crate::core::WorldPoint;

/// Pose of the agent in world space. Yaw is radians around the Y axis,
/// zero facing +Z.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct AgentTransform {
    pub position: WorldPoint,
    pub yaw: f32,
}

impl AgentTransform {
    pub fn new(position: WorldPoint, yaw: f32) -> Self {
        Self { position, yaw }
    }
}

/// A behavior ticked once per frame by the host. Mirrors a component
/// lifecycle: started by a behavior-specific call, advanced by
/// [`Behavior::update`], and stoppable at any time.
pub trait Behavior {
    /// Advance by `dt` seconds, mutating the agent pose in place
    fn update(&mut self, transform: &mut AgentTransform, dt: f32);

    /// Whether the behavior is actively driving the agent
    fn is_running(&self) -> bool;

    /// Abort without completing. Completion callbacks do not fire.
    fn stop(&mut self);

    /// Seconds since the behavior started running
    fn elapsed(&self) -> f32;
}
