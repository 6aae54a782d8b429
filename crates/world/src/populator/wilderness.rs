use std::sync::Arc;

use horde_ai::zone::ZoneSource;
use horde_primitives::{Vec3, WorldRandom};

use super::HordePopulator;
use crate::{BiomeMap, HordeCluster, HordeDefinition, HordeError, HordeSnapshot, HordeSpawner, PlayerGroup};

/// Other hordes keep this many view distances of clearance from a new one.
const HORDE_CLEARANCE: f32 = 2.0;
const MIN_DENSITY: f32 = 0.2;
const MAX_DENSITY: f32 = 1.0;

/// Places single-cluster hordes in open country.
///
/// A candidate is drawn on the ring between one and two view distances
/// around a random player group, or anywhere on the map when no player is
/// online. It is dropped when it lies inside a zone, within view of a
/// player or too close to another horde.
pub struct WildernessPopulator {
	definitions: Vec<Arc<dyn HordeDefinition>>,
	zones: Arc<dyn ZoneSource>,
	biomes: Arc<dyn BiomeMap>,
	view_distance: f32,
}

impl WildernessPopulator {
	pub fn new(definitions: Vec<Arc<dyn HordeDefinition>>, zones: Arc<dyn ZoneSource>, biomes: Arc<dyn BiomeMap>, view_distance: f32) -> Self {
		Self {
			definitions,
			zones,
			biomes,
			view_distance,
		}
	}

	fn candidate(&self, groups: &[PlayerGroup], rng: &mut WorldRandom) -> Vec3 {
		let center = rng.pick(groups).and_then(PlayerGroup::center);
		match center {
			Some(center) => {
				let angle = rng.range_f32(0.0, std::f32::consts::TAU);
				let radius = rng.range_f32(self.view_distance, self.view_distance * 2.0);
				center + Vec3::new(angle.cos(), 0.0, angle.sin()) * radius
			}
			None => rng.location_in(&self.zones.world_bounds()),
		}
	}

	fn is_clear(&self, location: Vec3, groups: &[PlayerGroup], hordes: &[HordeSnapshot]) -> bool {
		self.zones.world_bounds().contains_xz(location)
			&& !self.zones.zones().iter().any(|zone| zone.bounds.contains_xz(location))
			&& !groups.iter().any(|group| group.any_within(location, self.view_distance))
			&& !hordes.iter().any(|horde| horde.location.distance(location) <= self.view_distance * HORDE_CLEARANCE)
	}
}

impl HordePopulator for WildernessPopulator {
	fn name(&self) -> &'static str {
		"wilderness"
	}

	fn can_run(&self, _groups: &[PlayerGroup], _hordes: &[HordeSnapshot]) -> bool {
		!self.definitions.is_empty()
	}

	fn populate(
		&mut self,
		_dt: f32,
		groups: &[PlayerGroup],
		hordes: &[HordeSnapshot],
		spawner: &HordeSpawner,
		rng: &mut WorldRandom,
	) -> Result<f32, HordeError> {
		let location = self.candidate(groups, rng);
		if !self.is_clear(location, groups, hordes) {
			return Ok(0.0);
		}
		let Some(definition) = rng.pick(&self.definitions).cloned() else {
			return Ok(0.0);
		};

		let density = rng.range_f32(MIN_DENSITY, MAX_DENSITY);
		let biome = self.biomes.biome_at(location);
		let id = spawner.create(location, biome, vec![HordeCluster::new(definition, density)], rng.fork())?;
		tracing::trace!(horde = %id, location = ?location, density, "populator.wilderness_spawned");
		Ok(density)
	}
}
