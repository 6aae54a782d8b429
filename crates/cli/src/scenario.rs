//! The demo map: two biomes, a grid of zones and a couple of horde kinds.

use std::sync::Arc;

use horde_ai::zone::{BiomeId, StaticZones, Zone, ZoneId, ZoneSource};
use horde_primitives::{Bounds, ClassId, Vec3, WorldRandom};
use horde_world::populator::{HordePopulator, WildernessPopulator, ZonePopulator};
use horde_world::sandbox::{SandboxBiomes, SandboxHorde, SandboxWorld};
use horde_world::{BiomeMap, HordeCatalog, HordeCluster, HordeDefinition, HordeError, HordeId, HordeKind, TrackerHandle};

/// Side length of the square map.
pub const MAP_SIZE: f32 = 2048.0;
const ZONES_PER_SIDE: u32 = 4;

pub const FOREST: BiomeId = BiomeId(0);
pub const MARSH: BiomeId = BiomeId(1);

pub struct Scenario {
	pub biomes: Arc<SandboxBiomes>,
	pub catalog: HordeCatalog,
	zones: Arc<dyn ZoneSource>,
	definitions: Vec<Arc<dyn HordeDefinition>>,
}

impl Scenario {
	pub fn new() -> Self {
		let map = map_bounds();
		let marsh = Bounds::new(Vec3::ZERO, Vec3::new(MAP_SIZE / 2.0, 0.0, MAP_SIZE));
		let biomes = Arc::new(SandboxBiomes::new(FOREST).with_region(marsh, MARSH));
		let zones: Arc<dyn ZoneSource> = Arc::new(StaticZones::new(map, zone_grid(biomes.as_ref())));

		let definitions: Vec<Arc<dyn HordeDefinition>> = vec![
			Arc::new(
				SandboxHorde::new("walkers", HordeKind::Enemy, vec![ClassId(1), ClassId(2)])
					.wandering(Arc::clone(&zones)),
			),
			Arc::new(
				SandboxHorde::new("stalkers", HordeKind::Enemy, vec![ClassId(3)])
					.members_per_density(6.0)
					.walk_speed(3.0)
					.zone_wandering(Arc::clone(&zones)),
			),
		];
		let mut catalog = HordeCatalog::new();
		for definition in &definitions {
			catalog.register(Arc::clone(definition));
		}

		Self {
			biomes,
			catalog,
			zones,
			definitions,
		}
	}

	pub fn world(&self) -> SandboxWorld {
		SandboxWorld::new(Arc::clone(&self.biomes))
	}

	/// Scatters `count` single-cluster hordes over the map.
	pub fn seed_hordes(&self, tracker: &TrackerHandle, count: usize, rng: &mut WorldRandom) -> Result<Vec<HordeId>, HordeError> {
		let map = map_bounds();
		(0..count)
			.map(|_| {
				let location = rng.location_in(&map);
				let definition = Arc::clone(&self.definitions[rng.range(self.definitions.len())]);
				let density = rng.range_f32(0.3, 1.5);
				let biome = self.biomes.biome_at(location);
				tracker.create(location, biome, vec![HordeCluster::new(definition, density)], rng.fork())
			})
			.collect()
	}

	/// Walkers roam the wilderness around players; stalkers gather in zones.
	pub fn populators(&self, view_distance: f32) -> Vec<Box<dyn HordePopulator>> {
		let by_name = |name: &str| self.definitions.iter().filter(|definition| definition.name() == name).cloned().collect::<Vec<_>>();
		let biomes: Arc<dyn BiomeMap> = self.biomes.clone();
		let wilderness: Box<dyn HordePopulator> = Box::new(WildernessPopulator::new(by_name("walkers"), Arc::clone(&self.zones), biomes, view_distance));
		let zones: Box<dyn HordePopulator> = Box::new(ZonePopulator::new(by_name("stalkers"), Arc::clone(&self.zones)));
		vec![wilderness, zones]
	}
}

impl Default for Scenario {
	fn default() -> Self {
		Self::new()
	}
}

pub fn map_bounds() -> Bounds {
	Bounds::new(Vec3::ZERO, Vec3::new(MAP_SIZE, 0.0, MAP_SIZE))
}

fn zone_grid(biomes: &dyn BiomeMap) -> Vec<Zone> {
	let cell = MAP_SIZE / ZONES_PER_SIDE as f32;
	let mut zones = Vec::new();
	for row in 0..ZONES_PER_SIDE {
		for col in 0..ZONES_PER_SIDE {
			let min = Vec3::new(col as f32 * cell + cell / 4.0, 0.0, row as f32 * cell + cell / 4.0);
			let bounds = Bounds::new(min, min + Vec3::new(cell / 2.0, 0.0, cell / 2.0));
			zones.push(Zone {
				id: ZoneId(row * ZONES_PER_SIDE + col),
				bounds,
				density: 1.0,
				count: 4,
				biome: biomes.biome_at(bounds.center()),
			});
		}
	}
	zones
}
