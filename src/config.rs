//! Configuration loading for marga-nav

use crate::behavior::FollowerConfig;
use crate::debug::DebugFlags;
use crate::error::{NavError, Result};
use crate::grid::GridParams;
use crate::planning::{PlannerConfig, SearchConfig};
use serde::Deserialize;
use std::path::Path;

/// Main configuration structure
#[derive(Clone, Debug, Deserialize, Default)]
pub struct NavConfig {
    #[serde(default)]
    pub grid: GridConfig,
    #[serde(default)]
    pub agent: AgentConfig,
    #[serde(default)]
    pub planner: PlannerSettings,
    #[serde(default)]
    pub debug: DebugFlags,
}

/// Grid slicing and resolution settings
#[derive(Clone, Debug, Deserialize)]
pub struct GridConfig {
    /// Bottom of the obstacle slab, meters above the floor (default: 0.1)
    #[serde(default = "default_start_y")]
    pub start_y: f32,

    /// Top of the obstacle slab in meters (default: 1.2)
    #[serde(default = "default_end_y")]
    pub end_y: f32,

    /// Grid cell edge length in meters (default: 0.05)
    #[serde(default = "default_cell_size")]
    pub cell_size: f32,
}

/// Agent movement and footprint settings
#[derive(Clone, Debug, Deserialize)]
pub struct AgentConfig {
    /// Agent footprint radius for obstacle inflation (default: 0.15)
    #[serde(default = "default_agent_radius")]
    pub radius: f32,

    /// Base walking speed in m/s (default: 0.5)
    #[serde(default = "default_move_speed")]
    pub move_speed: f32,

    /// Turn rate limit in rad/s (default: pi)
    #[serde(default = "default_turn_speed")]
    pub turn_speed: f32,

    /// Distance at which a goal counts as reached (default: 0.15)
    #[serde(default = "default_stopping_distance")]
    pub stopping_distance: f32,
}

/// Planner pool settings
#[derive(Clone, Debug, Deserialize)]
pub struct PlannerSettings {
    /// Worker thread count (default: 1)
    #[serde(default = "default_workers")]
    pub workers: usize,

    /// Maximum A* node expansions per request (default: 200000)
    #[serde(default = "default_max_iterations")]
    pub max_iterations: usize,
}

impl Default for GridConfig {
    fn default() -> Self {
        Self {
            start_y: default_start_y(),
            end_y: default_end_y(),
            cell_size: default_cell_size(),
        }
    }
}

impl Default for AgentConfig {
    fn default() -> Self {
        Self {
            radius: default_agent_radius(),
            move_speed: default_move_speed(),
            turn_speed: default_turn_speed(),
            stopping_distance: default_stopping_distance(),
        }
    }
}

impl Default for PlannerSettings {
    fn default() -> Self {
        Self {
            workers: default_workers(),
            max_iterations: default_max_iterations(),
        }
    }
}

// Default value functions
fn default_start_y() -> f32 {
    0.1
}
fn default_end_y() -> f32 {
    1.2
}
fn default_cell_size() -> f32 {
    0.05
}
fn default_agent_radius() -> f32 {
    0.15
}
fn default_move_speed() -> f32 {
    0.5
}
fn default_turn_speed() -> f32 {
    std::f32::consts::PI
}
fn default_stopping_distance() -> f32 {
    0.15
}
fn default_workers() -> usize {
    1
}
fn default_max_iterations() -> usize {
    200_000
}

impl NavConfig {
    /// Load configuration from a TOML file
    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .map_err(|e| NavError::Config(format!("Failed to read config file: {}", e)))?;
        let config: NavConfig = toml::from_str(&content)?;
        config.validate()?;
        Ok(config)
    }

    /// Reject settings that would produce a useless grid or a stuck agent
    pub fn validate(&self) -> Result<()> {
        if self.grid.cell_size <= 0.0 {
            return Err(NavError::Config(format!(
                "cell_size must be positive, got {}",
                self.grid.cell_size
            )));
        }
        if self.grid.end_y <= self.grid.start_y {
            return Err(NavError::Config(format!(
                "end_y ({}) must be above start_y ({})",
                self.grid.end_y, self.grid.start_y
            )));
        }
        if self.agent.radius < 0.0 {
            return Err(NavError::Config("agent radius must not be negative".into()));
        }
        if self.agent.move_speed <= 0.0 {
            return Err(NavError::Config(format!(
                "move_speed must be positive, got {}",
                self.agent.move_speed
            )));
        }
        Ok(())
    }

    /// Grid parameters with bounds taken from `mesh_min`/`mesh_max`
    pub fn grid_params(
        &self,
        mesh_min: crate::core::WorldPoint,
        mesh_max: crate::core::WorldPoint,
    ) -> GridParams {
        GridParams {
            start_y: self.grid.start_y,
            end_y: self.grid.end_y,
            bounds_min: mesh_min,
            bounds_max: mesh_max,
            cell_size: self.grid.cell_size,
            agent_radius: self.agent.radius,
        }
    }

    pub fn planner_config(&self) -> PlannerConfig {
        PlannerConfig {
            workers: self.planner.workers,
            search: SearchConfig {
                max_iterations: self.planner.max_iterations,
                ..SearchConfig::default()
            },
        }
    }

    pub fn follower_config(&self) -> FollowerConfig {
        FollowerConfig {
            move_speed: self.agent.move_speed,
            turn_speed: self.agent.turn_speed,
            stopping_distance: self.agent.stopping_distance,
            sad_on_failure: self.debug.sad_on_pathing_failure,
            ..FollowerConfig::default()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_are_valid() {
        let config = NavConfig::default();
        assert!(config.validate().is_ok());
        assert_eq!(config.planner.workers, 1);
        assert!((config.grid.cell_size - 0.05).abs() < 1e-6);
    }

    #[test]
    fn test_parse_partial_toml() {
        let config: NavConfig = toml::from_str(
            r#"
            [grid]
            cell_size = 0.1

            [agent]
            move_speed = 0.8
            "#,
        )
        .unwrap();
        assert!((config.grid.cell_size - 0.1).abs() < 1e-6);
        assert!((config.agent.move_speed - 0.8).abs() < 1e-6);
        // Untouched sections keep their defaults
        assert!((config.grid.end_y - 1.2).abs() < 1e-6);
        assert!(config.debug.show_path_plan);
    }

    #[test]
    fn test_validation_rejects_bad_slab() {
        let config: NavConfig = toml::from_str(
            r#"
            [grid]
            start_y = 1.0
            end_y = 0.5
            "#,
        )
        .unwrap();
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_validation_rejects_zero_cell_size() {
        let config: NavConfig = toml::from_str("[grid]\ncell_size = 0.0").unwrap();
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_follower_config_carries_debug_flag() {
        let config: NavConfig =
            toml::from_str("[debug]\nsad_on_pathing_failure = false").unwrap();
        assert!(!config.follower_config().sad_on_failure);
    }
}
