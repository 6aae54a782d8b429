//! Tunables for the horde simulation, loaded from TOML.

use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ConfigError {
	#[error("TOML parse error: {0}")]
	Toml(#[from] toml::de::Error),

	#[error("I/O error reading {path}: {error}")]
	Io { path: PathBuf, error: std::io::Error },

	#[error("invalid value for `{field}`: {reason}")]
	Invalid { field: &'static str, reason: String },
}

/// Simulation settings. Every field is optional in the file and falls back to its default.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct HordeSettings {
	/// Interval between background worker steps, in milliseconds.
	pub thread_tick_ms: u64,
	pub broadcast_capacity: usize,
	/// Distance at which loaded members are unloaded again.
	pub view_distance: f32,
	/// Nearest spawn distance from a player, as a fraction of `view_distance`.
	pub min_spawn_fraction: f32,
	pub max_spawn_fraction: f32,
	/// Highest combined density a single horde may carry before it splits.
	pub max_horde_density: f32,
	/// Total horde density above which populators stop creating hordes.
	pub max_world_density: f32,
	/// Per-player cap on spawned members. Zero disables the cap.
	pub max_members_per_player: usize,
	/// Main-context ticks between two member spawns of one cluster.
	pub spawn_interval_ticks: u32,
	/// Density lost per second by unloaded clusters outside their home biome.
	pub density_decay_rate: f32,
	pub merge_distance_loaded: f32,
	pub merge_distance_unloaded: f32,
	/// Range within which a loud player is noticed without line of sight.
	pub sight_distance: f32,
}

impl Default for HordeSettings {
	fn default() -> Self {
		Self {
			thread_tick_ms: 100,
			broadcast_capacity: 100,
			view_distance: 192.0,
			min_spawn_fraction: 0.8,
			max_spawn_fraction: 0.9,
			max_horde_density: 2.0,
			max_world_density: 160.0,
			max_members_per_player: 16,
			spawn_interval_ticks: 1,
			density_decay_rate: 0.001,
			merge_distance_loaded: 10.0,
			merge_distance_unloaded: 100.0,
			sight_distance: 10.0,
		}
	}
}

impl HordeSettings {
	pub fn from_toml_str(content: &str) -> Result<Self, ConfigError> {
		let settings: Self = toml::from_str(content)?;
		settings.validate()?;
		Ok(settings)
	}

	pub fn load(path: &Path) -> Result<Self, ConfigError> {
		let content = std::fs::read_to_string(path).map_err(|error| ConfigError::Io {
			path: path.to_path_buf(),
			error,
		})?;
		Self::from_toml_str(&content)
	}

	pub fn validate(&self) -> Result<(), ConfigError> {
		fn invalid(field: &'static str, reason: impl Into<String>) -> ConfigError {
			ConfigError::Invalid {
				field,
				reason: reason.into(),
			}
		}

		if self.thread_tick_ms == 0 {
			return Err(invalid("thread_tick_ms", "must be at least 1"));
		}
		if self.broadcast_capacity == 0 {
			return Err(invalid("broadcast_capacity", "must be at least 1"));
		}
		if self.spawn_interval_ticks == 0 {
			return Err(invalid("spawn_interval_ticks", "must be at least 1"));
		}
		if !(self.view_distance > 0.0) {
			return Err(invalid("view_distance", "must be positive"));
		}
		if !(0.0..=1.0).contains(&self.min_spawn_fraction) || !(0.0..=1.0).contains(&self.max_spawn_fraction) {
			return Err(invalid("min_spawn_fraction", "spawn fractions must lie in 0.0..=1.0"));
		}
		if self.min_spawn_fraction > self.max_spawn_fraction {
			return Err(invalid(
				"min_spawn_fraction",
				format!("{} exceeds max_spawn_fraction {}", self.min_spawn_fraction, self.max_spawn_fraction),
			));
		}
		if !(self.max_horde_density > 0.0) {
			return Err(invalid("max_horde_density", "must be positive"));
		}
		if !(self.max_world_density > 0.0) {
			return Err(invalid("max_world_density", "must be positive"));
		}
		if self.density_decay_rate < 0.0 {
			return Err(invalid("density_decay_rate", "must not be negative"));
		}
		Ok(())
	}

	pub fn thread_tick(&self) -> Duration {
		Duration::from_millis(self.thread_tick_ms)
	}

	pub fn min_spawn_distance(&self) -> f32 {
		self.view_distance * self.min_spawn_fraction
	}

	pub fn max_spawn_distance(&self) -> f32 {
		self.view_distance * self.max_spawn_fraction
	}
}
