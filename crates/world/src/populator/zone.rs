use std::collections::HashMap;
use std::sync::Arc;

use horde_ai::zone::{Zone, ZoneId, ZoneSource};
use horde_primitives::{Vec3, WorldRandom};

use super::HordePopulator;
use crate::{HordeCluster, HordeDefinition, HordeError, HordeSnapshot, HordeSpawner, PlayerGroup};

/// Seconds before a zone that was populated may be populated again.
pub const ZONE_RESPAWN_DELAY: f32 = 600.0;

/// Fills a random zone with hordes sized by the zone's density.
///
/// The zone is skipped while a player or another horde is within its reach
/// (the length of its diagonal) or while it is still cooling down.
pub struct ZonePopulator {
	definitions: Vec<Arc<dyn HordeDefinition>>,
	zones: Arc<dyn ZoneSource>,
	respawn_delay: f32,
	min_zone_density: f32,
	clock: f32,
	last_populated: HashMap<ZoneId, f32>,
}

impl ZonePopulator {
	pub fn new(definitions: Vec<Arc<dyn HordeDefinition>>, zones: Arc<dyn ZoneSource>) -> Self {
		Self {
			definitions,
			zones,
			respawn_delay: ZONE_RESPAWN_DELAY,
			min_zone_density: 0.0,
			clock: 0.0,
			last_populated: HashMap::new(),
		}
	}

	pub fn respawn_delay(mut self, seconds: f32) -> Self {
		self.respawn_delay = seconds;
		self
	}

	/// Zones thinner than `density` are never populated.
	pub fn min_zone_density(mut self, density: f32) -> Self {
		self.min_zone_density = density;
		self
	}

	fn cooling_down(&self, zone: ZoneId) -> bool {
		self.last_populated.get(&zone).is_some_and(|&at| self.clock - at < self.respawn_delay)
	}

	fn horde_count(zone: &Zone) -> usize {
		(zone.count as f32 / zone.density).ceil().max(1.0) as usize
	}
}

fn reach(zone: &Zone) -> f32 {
	zone.bounds.size().flatten().length()
}

fn occupied(zone: &Zone, groups: &[PlayerGroup], hordes: &[HordeSnapshot]) -> bool {
	let center = zone.center();
	let reach = reach(zone);
	groups.iter().any(|group| group.any_within(center, reach)) || hordes.iter().any(|horde| horde.location.distance(center) <= reach)
}

impl HordePopulator for ZonePopulator {
	fn name(&self) -> &'static str {
		"zone"
	}

	fn can_run(&self, _groups: &[PlayerGroup], _hordes: &[HordeSnapshot]) -> bool {
		!self.definitions.is_empty() && !self.zones.zones().is_empty()
	}

	fn populate(
		&mut self,
		dt: f32,
		groups: &[PlayerGroup],
		hordes: &[HordeSnapshot],
		spawner: &HordeSpawner,
		rng: &mut WorldRandom,
	) -> Result<f32, HordeError> {
		self.clock += dt;
		let zones = Arc::clone(&self.zones);
		let Some(zone) = rng.pick(zones.zones()) else {
			return Ok(0.0);
		};
		if zone.density <= 0.0 || zone.density < self.min_zone_density || self.cooling_down(zone.id) || occupied(zone, groups, hordes) {
			return Ok(0.0);
		}

		let radius = reach(zone);
		let mut added = 0.0;
		for _ in 0..Self::horde_count(zone) {
			let Some(definition) = rng.pick(&self.definitions).cloned() else {
				break;
			};
			let angle = rng.range_f32(0.0, std::f32::consts::TAU);
			let distance = radius * rng.range_f32(0.0, 1.0).sqrt();
			let location = zone.center() + Vec3::new(angle.cos(), 0.0, angle.sin()) * distance;
			spawner.create(location, zone.biome, vec![HordeCluster::new(definition, zone.density)], rng.fork())?;
			added += zone.density;
		}

		self.last_populated.insert(zone.id, self.clock);
		tracing::debug!(zone = %zone.id, added, "populator.zone_populated");
		Ok(added)
	}
}
