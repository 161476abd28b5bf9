//! End-to-end navigation scenarios on synthetic rooms.

use marga_nav::behavior::{AgentTransform, Behavior, FollowerConfig, PathFollower};
use marga_nav::core::{RoomMesh, WorldPoint};
use marga_nav::grid::GridParams;
use marga_nav::map::NavMap;
use marga_nav::planning::{
    OperationState, PathFailure, PathOperation, PathPlanner, PlannerConfig,
};
use std::time::{Duration, Instant};

fn init_logging() {
    let _ = env_logger::builder().is_test(true).try_init();
}

fn params(size: f32, cell_size: f32, agent_radius: f32) -> GridParams {
    GridParams {
        start_y: 0.1,
        end_y: 1.2,
        bounds_min: WorldPoint::new(0.0, 0.0, 0.0),
        bounds_max: WorldPoint::new(size, 0.0, size),
        cell_size,
        agent_radius,
    }
}

fn wait(op: &PathOperation) -> marga_nav::planning::PathResult {
    op.wait(Duration::from_secs(10)).expect("request timed out")
}

/// 10x10 m room with a 2x2 m central obstacle: one walkable region
/// surrounds the block and corner-to-corner paths route around it.
#[test]
fn room_with_central_obstacle() {
    init_logging();
    let mut mesh = RoomMesh::floor_rect(0.0, 0.0, 10.0, 10.0, 0.0);
    mesh.add_box(WorldPoint::new(4.0, 0.0, 4.0), WorldPoint::new(6.0, 1.0, 6.0));
    let map = NavMap::from_mesh(&mesh, params(10.0, 0.05, 0.0));

    let snapshot = map.snapshot();
    assert_eq!(snapshot.components().component_count(), 1);

    let planner = PathPlanner::spawn(map, PlannerConfig::default()).unwrap();
    let result = wait(&planner.find_path(
        WorldPoint::new(0.5, 0.0, 0.5),
        WorldPoint::new(9.5, 0.0, 9.5),
    ));
    assert!(result.success);

    let snapshot = planner.map().snapshot();
    for cell in &result.path_grid {
        assert!(snapshot.grid().is_walkable(*cell));
    }
    // Detour makes the path longer than the straight diagonal
    assert!(result.length_meters() > (9.0f32 * 9.0 * 2.0).sqrt());
}

/// Doorway narrower than the inflated agent footprint: the rooms split
/// into two components, exact paths fail, nearest paths stop at the
/// doorway threshold.
#[test]
fn narrow_doorway_splits_rooms() {
    init_logging();
    let mut mesh = RoomMesh::floor_rect(0.0, 0.0, 6.0, 6.0, 0.0);
    // Dividing wall at x = 3 with a 10 cm gap around z = 3
    mesh.add_box(WorldPoint::new(2.9, 0.0, 0.0), WorldPoint::new(3.1, 1.0, 2.95));
    mesh.add_box(WorldPoint::new(2.9, 0.0, 3.05), WorldPoint::new(3.1, 1.0, 6.0));

    // Agent radius 0.2 m cannot fit a 0.1 m doorway once inflated
    let map = NavMap::from_mesh(&mesh, params(6.0, 0.05, 0.2));
    let snapshot = map.snapshot();
    assert!(snapshot.components().component_count() >= 2);

    let start = WorldPoint::new(1.0, 0.0, 3.0);
    let goal = WorldPoint::new(5.0, 0.0, 3.0);
    let start_comp = snapshot
        .components()
        .component_at(snapshot.grid().world_to_grid(start));
    let goal_comp = snapshot
        .components()
        .component_at(snapshot.grid().world_to_grid(goal));
    assert_ne!(start_comp, goal_comp);

    let planner = PathPlanner::spawn(map, PlannerConfig::default()).unwrap();

    let exact = wait(&planner.find_path(start, goal));
    assert!(!exact.success);
    assert_eq!(exact.failure, Some(PathFailure::Unreachable));

    let nearest = wait(&planner.find_nearest_path(start, goal));
    assert!(nearest.success);
    let end = nearest.waypoints.last().unwrap();
    // Stops on the start side, as close to the wall as inflation allows
    assert!(end.x < 2.9);
    assert!(end.x > 1.5);
}

/// Cancelling right after submission produces no waypoints and no
/// completion.
#[test]
fn cancel_before_worker_starts() {
    init_logging();
    let mesh = RoomMesh::floor_rect(0.0, 0.0, 8.0, 8.0, 0.0);
    let map = NavMap::from_mesh(&mesh, params(8.0, 0.05, 0.0));
    let planner = PathPlanner::spawn(map, PlannerConfig::default()).unwrap();

    // Occupy the single worker so the victim stays queued
    let blockers: Vec<PathOperation> = (0..4)
        .map(|_| {
            planner.find_path(
                WorldPoint::new(0.5, 0.0, 0.5),
                WorldPoint::new(7.5, 0.0, 7.5),
            )
        })
        .collect();

    let victim = planner.find_path(
        WorldPoint::new(0.5, 0.0, 0.5),
        WorldPoint::new(7.5, 0.0, 0.5),
    );
    std::thread::sleep(Duration::from_millis(1));
    victim.cancel();

    for op in &blockers {
        assert!(wait(op).success);
    }

    let deadline = Instant::now() + Duration::from_secs(5);
    while victim.state() != OperationState::Cancelled && Instant::now() < deadline {
        std::thread::sleep(Duration::from_millis(1));
    }
    assert_eq!(victim.state(), OperationState::Cancelled);
    assert!(victim.try_result().is_none());
    assert!(victim.wait(Duration::from_millis(50)).is_none());
}

/// Rebuilding mid-flight never changes what a submitted request
/// computes against; requests after the rebuild see the new grid.
#[test]
fn rebuild_during_inflight_request() {
    init_logging();
    let open = RoomMesh::floor_rect(0.0, 0.0, 8.0, 8.0, 0.0);
    let map = NavMap::from_mesh(&open, params(8.0, 0.05, 0.0));
    let planner = PathPlanner::spawn(map.clone(), PlannerConfig::default()).unwrap();

    let start = WorldPoint::new(0.5, 0.0, 4.0);
    let goal = WorldPoint::new(7.5, 0.0, 4.0);
    let inflight = planner.find_path(start, goal);
    let old_gen = inflight.generation();

    // Rescan adds a full dividing wall
    let mut walled = RoomMesh::floor_rect(0.0, 0.0, 8.0, 8.0, 0.0);
    walled.add_box(WorldPoint::new(3.9, 0.0, 0.0), WorldPoint::new(4.1, 1.0, 8.0));
    map.rebuild(&walled);

    // Old snapshot had no wall, so the in-flight request succeeds
    let result = wait(&inflight);
    assert!(result.success);
    assert_eq!(inflight.generation(), old_gen);

    // A fresh request sees the wall and fails
    let after = planner.find_path(start, goal);
    assert!(after.generation() > old_gen);
    let result = wait(&after);
    assert_eq!(result.failure, Some(PathFailure::Unreachable));
}

/// A goal one cell outside the grid neither crashes nor succeeds in
/// exact mode, and snaps inside the room in nearest mode.
#[test]
fn goal_on_and_past_the_boundary() {
    init_logging();
    let mesh = RoomMesh::floor_rect(0.0, 0.0, 4.0, 4.0, 0.0);
    let map = NavMap::from_mesh(&mesh, params(4.0, 0.05, 0.0));
    let planner = PathPlanner::spawn(map, PlannerConfig::default()).unwrap();
    let start = WorldPoint::new(2.0, 0.0, 2.0);

    let outside = WorldPoint::new(4.3, 0.0, 2.0);
    let exact = wait(&planner.find_path(start, outside));
    assert!(!exact.success);
    assert_eq!(exact.failure, Some(PathFailure::InvalidGoal));

    let nearest = wait(&planner.find_nearest_path(start, outside));
    assert!(nearest.success);
    let end = nearest.waypoints.last().unwrap();
    assert!(end.x < 4.0 && end.x > 3.5);
}

/// Degenerate 1x1 room: building and labeling never crash.
#[test]
fn degenerate_room_is_harmless() {
    init_logging();
    let mesh = RoomMesh::floor_rect(0.0, 0.0, 0.04, 0.04, 0.0);
    let map = NavMap::from_mesh(&mesh, params(0.04, 0.05, 0.0));
    let snapshot = map.snapshot();
    assert!(snapshot.components().component_count() <= 1);
}

/// Full stack: follower drives the agent around furniture to a goal
/// placed on top of it.
#[test]
fn follower_reaches_point_next_to_furniture() {
    init_logging();
    let mut mesh = RoomMesh::floor_rect(0.0, 0.0, 6.0, 6.0, 0.0);
    mesh.add_box(WorldPoint::new(2.5, 0.0, 2.5), WorldPoint::new(3.5, 1.0, 3.5));
    let map = NavMap::from_mesh(&mesh, params(6.0, 0.05, 0.1));
    let planner = PathPlanner::spawn(map, PlannerConfig::default()).unwrap();
    let mut follower = PathFollower::new(
        planner,
        FollowerConfig {
            move_speed: 1.0,
            ..FollowerConfig::default()
        },
    );

    let mut agent = AgentTransform::new(WorldPoint::new(0.5, 0.0, 0.5), 0.0);
    let goal = WorldPoint::new(3.0, 0.0, 3.0);
    follower.run_towards(&agent, goal, 1.0, 0.15, None);

    let deadline = Instant::now() + Duration::from_secs(10);
    while follower.is_running() && Instant::now() < deadline {
        follower.update(&mut agent, 1.0 / 60.0);
        std::thread::sleep(Duration::from_micros(100));
    }

    assert!(!follower.is_running());
    assert!(!follower.planner().map().is_occupied(agent.position));
    assert!(agent.position.horizontal_distance(&goal) < 1.2);
}
