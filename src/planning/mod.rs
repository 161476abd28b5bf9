//! Path search and the asynchronous planner around it.

mod astar;
mod planner;
mod simplify;

pub use astar::{GridSearch, PathFailure, PathResult, SearchConfig};
pub use planner::{OperationState, PathOperation, PathPlanner, PlannerConfig};
pub use simplify::{path_length, turn_points};
