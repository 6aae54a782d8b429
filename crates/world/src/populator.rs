//! Keeps the world stocked with hordes while it stays under its density budget.
//!
//! [`WorldHordePopulator`] runs on its own worker thread. It reads the same
//! player groups the tracker reads and its own feed of tracker snapshots,
//! and lets every registered [`HordePopulator`] create hordes through a
//! [`HordeSpawner`] until the total density reaches
//! [`HordeSettings::max_world_density`].

mod wilderness;
mod zone;

use horde_primitives::WorldRandom;
use horde_worker::{Subscriber, Worker};

pub use self::wilderness::WildernessPopulator;
pub use self::zone::{ZONE_RESPAWN_DELAY, ZonePopulator};
use crate::{HordeError, HordeSettings, HordeSnapshot, HordeSpawner, PlayerGroup};

/// One strategy for placing new hordes.
pub trait HordePopulator: Send {
	fn name(&self) -> &'static str;

	fn can_run(&self, _groups: &[PlayerGroup], _hordes: &[HordeSnapshot]) -> bool {
		true
	}

	/// Creates hordes through `spawner` and returns the density added.
	///
	/// `dt` is the time since this populator last ran.
	fn populate(
		&mut self,
		dt: f32,
		groups: &[PlayerGroup],
		hordes: &[HordeSnapshot],
		spawner: &HordeSpawner,
		rng: &mut WorldRandom,
	) -> Result<f32, HordeError>;
}

/// Sum of every horde's density.
pub fn world_density(hordes: &[HordeSnapshot]) -> f32 {
	hordes.iter().map(|horde| horde.density).sum()
}

/// Worker that drives the registered populators once per tracker snapshot.
pub struct WorldHordePopulator {
	max_world_density: f32,
	players: Subscriber<Vec<PlayerGroup>>,
	snapshots: Subscriber<Vec<HordeSnapshot>>,
	spawner: HordeSpawner,
	groups: Vec<PlayerGroup>,
	populators: Vec<Box<dyn HordePopulator>>,
	rng: WorldRandom,
	elapsed: f32,
}

impl std::fmt::Debug for WorldHordePopulator {
	fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
		f.debug_struct("WorldHordePopulator")
			.field("max_world_density", &self.max_world_density)
			.field("populators", &self.populators.iter().map(|populator| populator.name()).collect::<Vec<_>>())
			.finish()
	}
}

impl WorldHordePopulator {
	pub fn new(
		settings: &HordeSettings,
		players: Subscriber<Vec<PlayerGroup>>,
		snapshots: Subscriber<Vec<HordeSnapshot>>,
		spawner: HordeSpawner,
		rng: WorldRandom,
	) -> Self {
		Self {
			max_world_density: settings.max_world_density,
			players,
			snapshots,
			spawner,
			groups: Vec::new(),
			populators: Vec::new(),
			rng,
			elapsed: 0.0,
		}
	}

	pub fn register(&mut self, populator: Box<dyn HordePopulator>) {
		tracing::debug!(populator = populator.name(), "populator.registered");
		self.populators.push(populator);
	}

	pub fn reseed(&mut self, rng: WorldRandom) {
		self.rng = rng;
	}

	pub fn is_empty(&self) -> bool {
		self.populators.is_empty()
	}
}

impl Worker for WorldHordePopulator {
	fn name(&self) -> &str {
		"horde_populator"
	}

	fn update(&mut self, dt: f32) -> Result<(), String> {
		self.elapsed += dt;
		if let Some(groups) = self.players.try_get() {
			self.groups = groups;
		}
		// Hordes created last round only count once the tracker has published them.
		let Some(hordes) = self.snapshots.try_get() else {
			return Ok(());
		};

		let mut density = world_density(&hordes);
		if density >= self.max_world_density {
			tracing::trace!(density, max = self.max_world_density, "populator.saturated");
			return Ok(());
		}

		let dt = std::mem::take(&mut self.elapsed);
		for populator in &mut self.populators {
			if density >= self.max_world_density {
				break;
			}
			if !populator.can_run(&self.groups, &hordes) {
				continue;
			}
			match populator.populate(dt, &self.groups, &hordes, &self.spawner, &mut self.rng) {
				Ok(added) if added > 0.0 => {
					density += added;
					tracing::debug!(populator = populator.name(), added, density, "populator.populated");
				}
				Ok(_) => {}
				Err(HordeError::TrackerClosed) => return Err("tracker closed".to_string()),
				Err(err) => tracing::warn!(populator = populator.name(), error = %err, "populator.failed"),
			}
		}
		Ok(())
	}
}
