use std::sync::Arc;
use std::time::{Duration, Instant};

use horde_ai::zone::{BiomeId, StaticZones};
use horde_core::HordeCore;
use horde_primitives::{ActorId, Bounds, ClassId, Vec3, WorldRandom};
use horde_worker::{RunGate, WorkerState};
use horde_world::populator::WildernessPopulator;
use horde_world::sandbox::{SandboxBiomes, SandboxHorde, SandboxWorld};
use horde_world::{HordeCluster, HordeDefinition, HordeKind, HordeSettings};
use pretty_assertions::assert_eq;

/// Ticks the main context until `f` holds or `deadline` passes.
fn tick_until(core: &mut HordeCore, world: &mut SandboxWorld, deadline: Duration, mut f: impl FnMut(&SandboxWorld) -> bool) -> bool {
	let pacing = RunGate::new();
	let start = Instant::now();
	while start.elapsed() < deadline {
		core.tick(world, 0.01);
		if f(world) {
			return true;
		}
		pacing.sleep(Duration::from_millis(2));
	}
	f(world)
}

fn walkers() -> Arc<dyn HordeDefinition> {
	Arc::new(SandboxHorde::new("walkers", HordeKind::Enemy, vec![ClassId(1)]))
}

#[test]
fn horde_follows_a_player_in_and_out_of_range() {
	let biomes = Arc::new(SandboxBiomes::default());
	let mut world = SandboxWorld::new(Arc::clone(&biomes));
	world.put_player(ActorId(1), Vec3::ZERO, 0.0);

	let settings = HordeSettings {
		thread_tick_ms: 5,
		..HordeSettings::default()
	};
	let mut core = HordeCore::new(settings, biomes);
	let id = core
		.tracker()
		.create(Vec3::new(100.0, 0.0, 0.0), BiomeId(0), vec![HordeCluster::new(walkers(), 1.0)], WorldRandom::seeded(11))
		.unwrap();
	core.start().unwrap();
	assert_ne!(core.workers()[0].state, WorkerState::Stopped);

	assert!(tick_until(&mut core, &mut world, Duration::from_secs(5), |world| world.actor_count() == 10));
	let snapshots = core.tracker().snapshots().unwrap_or_default();
	assert_eq!(snapshots.len(), 1);
	assert_eq!(snapshots[0].id, id);

	world.put_player(ActorId(1), Vec3::new(5000.0, 0.0, 0.0), 0.0);
	assert!(tick_until(&mut core, &mut world, Duration::from_secs(5), |world| world.actor_count() == 0));

	let saved = core.shutdown();
	assert_eq!(saved.len(), 1);
	assert_eq!(saved[0].clusters[0].definition, "walkers");
	assert!((saved[0].clusters[0].density - 1.0).abs() < 0.01);
}

#[test]
fn shutdown_stops_the_tracker_thread() {
	let biomes = Arc::new(SandboxBiomes::default());
	let mut core = HordeCore::new(HordeSettings::default(), biomes);
	core.start().unwrap();
	core.pause();
	assert!(core.is_paused());

	let saved = core.shutdown();
	assert!(saved.is_empty());
}

#[test]
fn registered_populator_fills_an_empty_world() {
	let biomes = Arc::new(SandboxBiomes::default());
	let mut world = SandboxWorld::new(Arc::clone(&biomes));
	world.put_player(ActorId(1), Vec3::ZERO, 0.0);

	let settings = HordeSettings {
		thread_tick_ms: 5,
		..HordeSettings::default()
	};
	let zones = Arc::new(StaticZones::new(Bounds::around(Vec3::ZERO, 4000.0), Vec::new()));
	let mut core = HordeCore::new(settings.clone(), biomes.clone()).with_seed(3);
	core.register_populator(Box::new(WildernessPopulator::new(vec![walkers()], zones, biomes, settings.view_distance)));
	core.start().unwrap();
	let mut names: Vec<String> = core.workers().into_iter().map(|record| record.name).collect();
	names.sort();
	assert_eq!(names, vec!["horde_populator".to_string(), "horde_tracker".to_string()]);

	let pacing = RunGate::new();
	let start = Instant::now();
	let mut populated = false;
	while !populated && start.elapsed() < Duration::from_secs(5) {
		core.tick(&mut world, 0.01);
		populated = core.tracker().snapshots().is_some_and(|snapshots| !snapshots.is_empty());
		pacing.sleep(Duration::from_millis(2));
	}
	assert!(populated);
	assert!(!core.shutdown().is_empty());
}
