use horde_ai::commands::{GoToTargetCommand, WanderCommand};
use horde_ai::zone::{StaticZones, Zone, ZoneId};
use horde_primitives::{ActorId, Bounds, ClassId};
use horde_worker::RequestProcessor;
use pretty_assertions::assert_eq;

use super::*;
use crate::{ClusterMember, PlayerSnapshot, World};
use crate::sandbox::{SandboxBiomes, SandboxHorde, SandboxWorld};

fn walkers() -> Arc<dyn HordeDefinition> {
	Arc::new(SandboxHorde::new("walkers", HordeKind::Enemy, vec![ClassId(1)]))
}

fn deer() -> Arc<dyn HordeDefinition> {
	Arc::new(SandboxHorde::new("deer", HordeKind::Animal, vec![ClassId(9)]))
}

fn horde(id: u64, x: f32, densities: &[f32]) -> WorldHorde {
	horde_of(id, x, walkers(), densities)
}

fn horde_of(id: u64, x: f32, definition: Arc<dyn HordeDefinition>, densities: &[f32]) -> WorldHorde {
	let clusters = densities.iter().map(|&density| HordeCluster::new(Arc::clone(&definition), density)).collect();
	WorldHorde::new(HordeId(id), Vec3::new(x, 0.0, 0.0), BiomeId(0), clusters, WorldRandom::seeded(id)).unwrap()
}

fn cluster_densities(horde: &WorldHorde) -> Vec<f32> {
	horde.clusters().iter().map(|cluster| cluster.lock().density()).collect()
}

struct Stage {
	world: SandboxWorld,
	processor: RequestProcessor<dyn World>,
	requests: WorldRequests,
	settings: HordeSettings,
	ids: MemberIdAllocator,
}

impl Stage {
	fn new() -> Self {
		let mut world = SandboxWorld::new(Arc::new(SandboxBiomes::default()));
		world.put_player(ActorId(1), Vec3::ZERO, 0.0);
		let processor = RequestProcessor::new();
		let requests = processor.sender();
		Self {
			world,
			processor,
			requests,
			settings: HordeSettings::default(),
			ids: MemberIdAllocator::new(),
		}
	}

	fn ctx(&self) -> HordeContext<'_> {
		HordeContext {
			requests: &self.requests,
			settings: &self.settings,
			ids: &self.ids,
		}
	}

	fn players(&self) -> PlayerGroup {
		PlayerGroup::new(self.world.players())
	}

	fn run(&mut self, ticks: usize) {
		for _ in 0..ticks {
			self.processor.tick(&mut self.world, 0.1);
		}
	}

	/// Spawns `horde` completely, then lets the member AI requests it queued start.
	fn spawn(&mut self, horde: &mut WorldHorde) {
		let players = self.players();
		assert_eq!(horde.spawn(self.ctx(), &players), horde.clusters().len());
		for _ in 0..200 {
			if !horde.is_spawning() {
				break;
			}
			self.run(1);
		}
		self.run(1);
		horde.check_spawn_progress(&self.requests).unwrap();
		assert!(horde.is_spawned());
	}
}

#[test]
fn horde_needs_a_cluster() {
	let result = WorldHorde::new(HordeId(1), Vec3::ZERO, BiomeId(0), Vec::new(), WorldRandom::seeded(1));
	assert!(matches!(result, Err(HordeError::Empty)));
}

#[test]
fn data_survives_serialization() {
	let mut catalog = HordeCatalog::new();
	catalog.register(walkers());

	let original = horde(4, 12.5, &[1.0, 0.25]);
	let json = serde_json::to_string(&original.data()).unwrap();
	let data: HordeData = serde_json::from_str(&json).unwrap();
	assert_eq!(data, original.data());

	let restored = WorldHorde::from_data(HordeId(5), &data, &catalog, WorldRandom::seeded(5)).unwrap();
	assert_eq!(restored.location(), Vec3::new(12.5, 0.0, 0.0));
	assert_eq!(cluster_densities(&restored), vec![1.0, 0.25]);
	assert!(restored.is_detached());
}

#[test]
fn decay_applies_only_away_from_home() {
	let biomes = SandboxBiomes::new(BiomeId(0)).with_region(Bounds::around(Vec3::new(1000.0, 0.0, 0.0), 50.0), BiomeId(1));

	let mut home = horde(1, 0.0, &[1.0]);
	home.decay(0.1, &biomes, 1.0);
	assert_eq!(home.density(), 1.0);

	let mut abroad = horde(2, 1000.0, &[1.0]);
	abroad.decay(0.1, &biomes, 1.0);
	assert!((abroad.density() - 0.9).abs() < 1e-6);
}

#[test]
fn horde_dies_with_its_last_cluster() {
	let mut horde = horde(1, 0.0, &[0.0, 0.5]);
	assert_eq!(horde.remove_dead_clusters(), 1);
	assert!(!horde.is_dead());

	horde.clusters()[0].lock().decay(1.0, 1.0);
	assert_eq!(horde.remove_dead_clusters(), 1);
	assert!(horde.is_dead());
}

#[test]
fn nearby_small_hordes_merge() {
	let settings = HordeSettings::default();
	let mut big = horde(1, 0.0, &[1.0]);
	let mut small = horde(2, 50.0, &[0.5]);
	assert!(big.can_merge_with(&small, &settings));

	big.merge(&mut small).unwrap();
	assert!(small.is_merged());
	assert!(small.clusters().is_empty());
	assert_eq!(cluster_densities(&big), vec![1.0, 0.5]);
	assert!(!big.can_merge_with(&small, &settings));
}

#[test]
fn merging_respects_distance_density_and_kind() {
	let settings = HordeSettings::default();
	let base = horde(1, 0.0, &[1.0]);

	assert!(!base.can_merge_with(&horde(2, 150.0, &[0.5]), &settings));
	assert!(!base.can_merge_with(&horde(3, 10.0, &[1.5]), &settings));

	let mut animals = horde_of(4, 10.0, deer(), &[0.5]);
	assert!(!base.can_merge_with(&animals, &settings));

	let mut base = base;
	assert!(matches!(base.merge(&mut animals), Err(HordeError::IncompatibleClusters { .. })));
	assert!(!animals.is_merged());
}

#[test]
fn spawned_hordes_merge_only_at_close_range() {
	let mut stage = Stage::new();
	let mut spawned = horde(1, 100.0, &[0.3]);
	stage.spawn(&mut spawned);
	assert!(spawned.is_spawned());

	let far = horde(2, 150.0, &[0.3]);
	let near = horde(3, 105.0, &[0.3]);
	assert!(!spawned.can_merge_with(&far, &stage.settings));
	assert!(spawned.can_merge_with(&near, &stage.settings));
}

#[test]
fn oversized_hordes_split_and_conserve_density() {
	let mut horde = horde(1, 0.0, &[1.5, 1.0, 0.8]);
	let mut next = 10;
	let split = horde.split(2.0, &mut || {
		next += 1;
		HordeId(next)
	});

	assert_eq!(cluster_densities(&horde), vec![1.5]);
	assert_eq!(split.len(), 1);
	assert_eq!(split[0].id(), HordeId(11));
	assert_eq!(cluster_densities(&split[0]), vec![1.0, 0.8]);
	assert_eq!(split[0].location(), horde.location());
}

#[test]
fn oversized_cluster_is_cut_into_equal_pieces() {
	let mut horde = horde(1, 0.0, &[5.0]);
	let mut next = 0;
	let split = horde.split(2.0, &mut || {
		next += 1;
		HordeId(next)
	});

	assert_eq!(split.len(), 2);
	let total: f32 = horde.density() + split.iter().map(WorldHorde::density).sum::<f32>();
	assert!((total - 5.0).abs() < 1e-5);
	for piece in std::iter::once(&horde).chain(split.iter()) {
		assert!(piece.density() <= 2.0);
	}
}

#[test]
fn spawned_hordes_never_split() {
	let mut stage = Stage::new();
	stage.settings.max_members_per_player = 0;
	let mut spawned = horde(1, 100.0, &[3.0]);
	stage.spawn(&mut spawned);
	assert!(spawned.split(2.0, &mut || HordeId(99)).is_empty());
}

#[test]
fn spawn_and_despawn_round_trip() {
	let mut stage = Stage::new();
	let mut horde = horde(1, 100.0, &[1.0]);
	stage.spawn(&mut horde);

	assert!(horde.is_spawned());
	assert!(!horde.is_spawning());
	assert_eq!(horde.spawned_members(), 10);
	assert_eq!(stage.processor.request_counts().get("member_ai"), Some(&10));
	assert_eq!(horde.group().member_count(), 10);

	let players = stage.players();
	assert_eq!(horde.spawn(stage.ctx(), &players), 0);

	horde.despawn(&stage.requests).unwrap();
	assert!(horde.is_despawning());
	horde.despawn(&stage.requests).unwrap();
	stage.run(11);

	assert!(horde.is_detached());
	assert_eq!(horde.spawned_members(), 0);
	assert_eq!(horde.density(), 1.0);
	assert_eq!(stage.world.actor_count(), 0);
	assert_eq!(stage.processor.request_counts().get("member_ai"), None);
}

#[test]
fn empty_spawn_is_retried() {
	let mut stage = Stage::new();
	stage.world.refuse_spawn_points(true);
	let mut horde = horde(1, 500.0, &[1.0]);

	let players = stage.players();
	assert_eq!(horde.spawn(stage.ctx(), &players), 1);
	stage.run(1);
	assert!(horde.is_spawned());

	horde.check_spawn_progress(&stage.requests).unwrap();
	assert!(horde.is_detached());
	assert_eq!(horde.spawn(stage.ctx(), &players), 1);
}

#[test]
fn partial_spawn_despawns_the_horde() {
	let mut stage = Stage::new();
	let mut horde = horde(1, 300.0, &[1.0]);

	let players = stage.players();
	horde.spawn(stage.ctx(), &players);
	stage.run(2);
	stage.world.refuse_spawn_points(true);
	stage.run(1);
	assert_eq!(horde.spawned_members(), 2);

	horde.check_spawn_progress(&stage.requests).unwrap();
	assert!(horde.is_despawning());
	stage.run(3);
	assert!(horde.is_detached());
	assert_eq!(stage.world.actor_count(), 0);
}

#[test]
fn members_follow_the_players() {
	let mut stage = Stage::new();
	let mut horde = horde(1, 100.0, &[1.0]);
	stage.spawn(&mut horde);

	let gone = PlayerGroup::new(vec![PlayerSnapshot {
		actor: ActorId(1),
		location: Vec3::new(2000.0, 0.0, 0.0),
		noise: 0.0,
	}]);
	horde.update_members(stage.ctx(), &gone);
	assert!(horde.clusters()[0].lock().members().iter().all(ClusterMember::is_awaiting_spawn_state_change));
	stage.run(1);
	assert_eq!(horde.spawned_members(), 0);
	assert_eq!(stage.world.actor_count(), 0);
	assert!(horde.is_spawned());

	let back = PlayerGroup::new(vec![PlayerSnapshot {
		actor: ActorId(1),
		location: Vec3::new(300.0, 0.0, 0.0),
		noise: 0.0,
	}]);
	horde.update_members(stage.ctx(), &back);
	stage.run(1);
	assert_eq!(horde.spawned_members(), 10);
	assert_eq!(stage.world.actor_count(), 10);
	assert!(horde.clusters()[0].lock().members().iter().all(|member| member.is_spawned() && member.is_ai_loaded()));
}

#[test]
fn position_updates_reap_the_dead() {
	let mut stage = Stage::new();
	let mut horde = horde(1, 100.0, &[1.0]);
	stage.spawn(&mut horde);
	let actor = horde.clusters()[0].lock().members()[0].actor();
	stage.world.kill(actor);

	horde.request_update(&stage.requests).unwrap();
	horde.request_update(&stage.requests).unwrap();
	assert_eq!(stage.processor.queued_len(), 1);
	stage.run(1);

	assert_eq!(horde.poll_update(), 1);
	assert_eq!(horde.poll_update(), 0);
	assert!((horde.density() - 0.9).abs() < 1e-5);
	assert_eq!(horde.spawned_members(), 9);
	assert!((horde.location().x - stage.settings.view_distance * 0.85).abs() < 1e-3);
}

#[test]
fn group_moves_only_while_detached() {
	let zones = Arc::new(StaticZones::new(Bounds::around(Vec3::ZERO, 500.0), Vec::new()));
	let wanderers: Arc<dyn HordeDefinition> = Arc::new(SandboxHorde::new("wanderers", HordeKind::Enemy, vec![ClassId(1)]).wandering(zones));

	let mut stage = Stage::new();
	let mut spawned = horde_of(1, 100.0, Arc::clone(&wanderers), &[0.2]);
	stage.spawn(&mut spawned);
	for _ in 0..50 {
		spawned.update_ai(1.0);
	}
	assert_eq!(spawned.location(), Vec3::new(100.0, 0.0, 0.0));

	let mut detached = horde_of(2, 100.0, wanderers, &[0.2]);
	detached.update_ai(0.1);
	assert!(detached.group().base_command().is_some());
}

#[test]
fn interrupt_overrides_the_wander_of_a_detached_horde() {
	let zones = Arc::new(StaticZones::new(Bounds::around(Vec3::ZERO, 500.0), Vec::new()));
	let wanderers: Arc<dyn HordeDefinition> = Arc::new(SandboxHorde::new("wanderers", HordeKind::Enemy, vec![ClassId(1)]).wandering(zones));
	let mut horde = horde_of(1, 100.0, wanderers, &[0.2]);

	horde.interrupt(vec![Box::new(GoToTargetCommand::new(Vec3::new(200.0, 0.0, 0.0))), Box::new(WanderCommand::new(5.0))]);
	assert_eq!(horde.group().interrupt_count(), 2);
	for _ in 0..10 {
		horde.update_ai(1.0);
	}
	assert!((horde.location().x - 110.0).abs() < 1e-3, "{:?}", horde.location());
}

#[test]
fn zone_wandering_hordes_head_for_a_zone() {
	let zone = Zone {
		id: ZoneId(4),
		bounds: Bounds::around(Vec3::new(300.0, 0.0, 0.0), 20.0),
		density: 1.0,
		count: 2,
		biome: BiomeId(7),
	};
	let zones = Arc::new(StaticZones::new(Bounds::around(Vec3::ZERO, 500.0), vec![zone]));
	let definition = SandboxHorde::new("roamers", HordeKind::Enemy, vec![ClassId(1)]).zone_wandering(zones);

	// The zone is in another biome, so only zone wandering ever reaches it.
	let mut generator = definition.group_commands(BiomeId(0)).unwrap();
	let mut rng = WorldRandom::seeded(2);
	let names: Vec<&str> = (0..2).filter_map(|_| generator.generate_next(&mut rng)).map(|command| command.name()).collect();
	assert!(names.contains(&"go_to_target"), "{names:?}");
}

#[test]
fn snapshot_reports_clusters() {
	let horde = horde(7, 3.0, &[1.0, 0.5]);
	let snapshot = horde.snapshot();
	assert_eq!(snapshot.id, HordeId(7));
	assert_eq!(snapshot.density, 1.5);
	assert_eq!(snapshot.clusters.len(), 2);
	assert_eq!(snapshot.clusters[0].definition, "walkers");
	assert_eq!(snapshot.clusters[0].state, SpawnState::DESPAWNED);
	assert_eq!(horde.kind(), Some(HordeKind::Enemy));
}
