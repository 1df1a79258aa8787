//! Environment configuration.

use crate::model::HumanoidSpec;
use brawl::{BrawlError, Result};
use serde::{Deserialize, Serialize};
use std::path::Path;

/// Camera tracking parameters
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CameraConfig {
    /// Distance before the first tracking update
    pub initial_distance: f32,
    /// Distance when the fighters are `reference_separation` apart
    pub base_distance: f32,
    pub reference_separation: f32,
    /// Lower bound on the target distance
    pub min_distance: f32,
    /// Exponential smoothing factor in [0, 1)
    pub smoothness: f32,
}

impl Default for CameraConfig {
    fn default() -> Self {
        Self {
            initial_distance: 10.0,
            base_distance: 10.0,
            reference_separation: 6.0,
            min_distance: 2.0,
            smoothness: 0.99,
        }
    }
}

/// Configuration for the fighting environment
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct FightConfig {
    // Reward
    /// Scale applied to summed hit forces
    pub hit_scale: f32,
    /// Steps before the episode is truncated
    pub max_steps: u32,

    // Physics
    /// Physics timestep in seconds
    pub timestep: f32,
    /// Gravity along z
    pub gravity: f32,
    pub solver_iterations: usize,
    /// Whether a fighter's own limbs collide with each other
    pub self_collisions: bool,

    // Arena
    /// Half side length of the walled square
    pub arena_half_extent: f32,
    pub wall_height: f32,
    /// Initial distance between the two fighters' origins
    pub spawn_separation: f32,
    /// Uniform jitter applied to spawn x/y (meters) and yaw (radians)
    pub init_noise: f32,

    // Actuation
    /// Controls are clamped to [-ctrl_range, ctrl_range]
    pub ctrl_range: f32,
    /// Multiplier on every joint gear
    pub gear_scale: f32,

    pub camera: CameraConfig,
    pub humanoid: HumanoidSpec,
}

impl Default for FightConfig {
    fn default() -> Self {
        Self {
            hit_scale: 0.001,
            max_steps: 1000,

            timestep: 0.005,
            gravity: -9.81,
            solver_iterations: 8,
            self_collisions: false,

            arena_half_extent: 5.0,
            wall_height: 1.0,
            spawn_separation: 2.0,
            init_noise: 0.0,

            ctrl_range: 1.0,
            gear_scale: 1.0,

            camera: CameraConfig::default(),
            humanoid: HumanoidSpec::default(),
        }
    }
}

impl FightConfig {
    /// Load a config from a `.json`, `.yaml` or `.yml` file.
    ///
    /// Missing fields take their default values.
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let text = std::fs::read_to_string(path)?;
        let ext = path
            .extension()
            .and_then(|e| e.to_str())
            .unwrap_or("")
            .to_ascii_lowercase();

        let config: Self = match ext.as_str() {
            "json" => serde_json::from_str(&text)
                .map_err(|e| BrawlError::InvalidConfig(format!("{}: {}", path.display(), e)))?,
            "yaml" | "yml" => serde_yaml::from_str(&text)
                .map_err(|e| BrawlError::InvalidConfig(format!("{}: {}", path.display(), e)))?,
            _ => {
                return Err(BrawlError::InvalidConfig(format!(
                    "{}: expected a .json, .yaml or .yml file",
                    path.display()
                )))
            }
        };
        config.validate()?;
        Ok(config)
    }

    pub fn to_json(&self) -> Result<String> {
        serde_json::to_string_pretty(self).map_err(|e| BrawlError::EnvError(e.to_string()))
    }

    pub fn to_yaml(&self) -> Result<String> {
        serde_yaml::to_string(self).map_err(|e| BrawlError::EnvError(e.to_string()))
    }

    pub fn validate(&self) -> Result<()> {
        let invalid = |msg: &str| Err(BrawlError::InvalidConfig(msg.to_string()));

        if !(self.timestep > 0.0) {
            return invalid("timestep must be positive");
        }
        if self.max_steps == 0 {
            return invalid("max_steps must be positive");
        }
        if !(self.ctrl_range > 0.0) {
            return invalid("ctrl_range must be positive");
        }
        if !(self.hit_scale >= 0.0) || !(self.init_noise >= 0.0) || !(self.gear_scale >= 0.0) {
            return invalid("hit_scale, init_noise and gear_scale must be non-negative");
        }
        if self.solver_iterations == 0 {
            return invalid("solver_iterations must be positive");
        }
        if !(self.wall_height > 0.0) {
            return invalid("wall_height must be positive");
        }
        if !(self.spawn_separation > 0.0)
            || 0.5 * self.spawn_separation + self.init_noise >= self.arena_half_extent
        {
            return invalid("fighters must spawn apart and inside the arena");
        }
        let cam = &self.camera;
        if !(0.0..1.0).contains(&cam.smoothness) || !(cam.min_distance > 0.0) {
            return invalid("camera smoothness must be in [0, 1) and min_distance positive");
        }
        self.humanoid.validate()
    }

    /// Set the episode length
    pub fn with_max_steps(mut self, max_steps: u32) -> Self {
        self.max_steps = max_steps;
        self
    }

    /// Set the hit reward scale
    pub fn with_hit_scale(mut self, hit_scale: f32) -> Self {
        self.hit_scale = hit_scale;
        self
    }

    /// Set the spawn jitter
    pub fn with_init_noise(mut self, init_noise: f32) -> Self {
        self.init_noise = init_noise;
        self
    }

    pub fn with_spawn_separation(mut self, spawn_separation: f32) -> Self {
        self.spawn_separation = spawn_separation;
        self
    }

    pub fn with_self_collisions(mut self, enabled: bool) -> Self {
        self.self_collisions = enabled;
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_default_is_valid() {
        let config = FightConfig::default();
        config.validate().unwrap();
        assert_eq!(config.max_steps, 1000);
        assert_eq!(config.hit_scale, 0.001);
    }

    #[test]
    fn test_validate_rejects_bad_values() {
        assert!(FightConfig::default().with_max_steps(0).validate().is_err());
        assert!(FightConfig::default().with_hit_scale(-1.0).validate().is_err());
        assert!(FightConfig::default()
            .with_spawn_separation(20.0)
            .validate()
            .is_err());

        let mut config = FightConfig::default();
        config.timestep = f32::NAN;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_partial_yaml_fills_defaults() {
        let mut file = tempfile::Builder::new().suffix(".yaml").tempfile().unwrap();
        writeln!(file, "max_steps: 50\nhit_scale: 0.01\ncamera:\n  smoothness: 0.5").unwrap();

        let config = FightConfig::from_file(file.path()).unwrap();
        assert_eq!(config.max_steps, 50);
        assert_eq!(config.hit_scale, 0.01);
        assert_eq!(config.camera.smoothness, 0.5);
        assert_eq!(config.camera.base_distance, 10.0);
        assert_eq!(config.humanoid, HumanoidSpec::default());
    }

    #[test]
    fn test_json_file_roundtrip() {
        let config = FightConfig::default().with_max_steps(77).with_init_noise(0.1);
        let mut file = tempfile::Builder::new().suffix(".json").tempfile().unwrap();
        file.write_all(config.to_json().unwrap().as_bytes()).unwrap();

        assert_eq!(FightConfig::from_file(file.path()).unwrap(), config);
    }

    #[test]
    fn test_unknown_extension() {
        let file = tempfile::Builder::new().suffix(".toml").tempfile().unwrap();
        let err = FightConfig::from_file(file.path()).unwrap_err();
        assert!(matches!(err, BrawlError::InvalidConfig(_)));
    }

    #[test]
    fn test_invalid_file_contents_rejected() {
        let mut file = tempfile::Builder::new().suffix(".json").tempfile().unwrap();
        writeln!(file, "{{\"max_steps\": 0}}").unwrap();
        assert!(FightConfig::from_file(file.path()).is_err());
    }
}
