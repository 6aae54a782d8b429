use horde_primitives::{ActorId, ClassId, MemberId, Vec3};
use horde_worker::Broadcast;
use pretty_assertions::assert_eq;

use super::*;
use crate::sandbox::SandboxHorde;
use crate::{HordeKind, PlayerSnapshot};

fn walkers() -> Arc<dyn HordeDefinition> {
	Arc::new(SandboxHorde::new("walkers", HordeKind::Enemy, vec![ClassId(1)]))
}

fn member(id: u64) -> ClusterMember {
	ClusterMember::spawned(MemberId(id), ClassId(1), ActorId(id as u32), Vec3::ZERO)
}

fn players(count: u32) -> PlayerGroup {
	PlayerGroup::new(
		(0..count)
			.map(|id| PlayerSnapshot {
				actor: ActorId(id),
				location: Vec3::ZERO,
				noise: 0.0,
			})
			.collect(),
	)
}

#[test]
fn members_share_the_density() {
	let mut cluster = HordeCluster::new(walkers(), 1.0);
	assert_eq!(cluster.spawn_state(), SpawnState::DESPAWNED);

	for id in 1..=10 {
		cluster.add_member(member(id));
	}
	assert!(cluster.is_spawned());
	assert_eq!(cluster.spawned_count(), 10);
	assert!((cluster.density_per_member() - 0.1).abs() < 1e-6);
	assert!((cluster.density_per_member() * cluster.members().len() as f32 - cluster.density()).abs() < 1e-5);
}

#[test]
fn last_killed_member_kills_the_cluster() {
	let mut cluster = HordeCluster::new(walkers(), 0.1);
	cluster.add_member(member(1));
	assert!(!cluster.is_dead());

	assert!(cluster.remove_member(MemberId(1), true).is_some());
	assert_eq!(cluster.density(), 0.0);
	assert!(cluster.is_dead());
	assert!(cluster.remove_member(MemberId(1), true).is_none());
}

#[test]
fn unloaded_members_keep_their_share() {
	let mut cluster = HordeCluster::new(walkers(), 1.0);
	cluster.add_member(member(1));
	cluster.add_member(member(2));

	cluster.remove_member(MemberId(1), false);
	assert_eq!(cluster.density(), 1.0);
	assert_eq!(cluster.clear_members().len(), 1);
	assert_eq!(cluster.density(), 1.0);
}

#[test]
fn decay_wears_density_down() {
	let mut cluster = HordeCluster::new(walkers(), 0.5);
	cluster.decay(0.1, 2.0);
	assert!((cluster.density() - 0.3).abs() < 1e-6);
	cluster.decay(1.0, 1.0);
	assert!(cluster.is_dead());
}

#[test]
fn second_spawn_is_rejected() {
	let mut cluster = HordeCluster::new(walkers(), 1.0);
	let progress = Broadcast::new();
	cluster.begin_spawn(progress.subscribe()).unwrap();
	assert!(cluster.is_spawning());
	assert!(matches!(cluster.begin_spawn(progress.subscribe()), Err(HordeError::AlreadySpawning)));
}

#[test]
fn generator_is_reused_while_it_fits() {
	let mut cluster = HordeCluster::new(walkers(), 1.0);
	let mut rng = WorldRandom::seeded(1);

	assert_eq!(cluster.prepare_entity_generator(&players(1), &mut rng).unwrap().member_count(1.0), 10);
	assert!(cluster.entity_generator_mut().is_some_and(|generator| generator.is_still_valid_for(&players(1))));

	let generator = cluster.prepare_entity_generator(&players(3), &mut rng).unwrap();
	assert!(generator.is_still_valid_for(&players(3)));
	assert!(!generator.is_still_valid_for(&players(1)));
}

#[test]
fn missing_generator_is_an_error() {
	let empty: Arc<dyn HordeDefinition> = Arc::new(SandboxHorde::new("nothing", HordeKind::Animal, Vec::new()));
	let mut cluster = HordeCluster::new(empty, 1.0);
	let err = cluster.prepare_entity_generator(&players(1), &mut WorldRandom::seeded(1)).err();
	assert!(matches!(err, Some(HordeError::MissingEntityGenerator("nothing"))));
}

#[test]
fn data_resolves_through_the_catalog() {
	let mut catalog = HordeCatalog::new();
	catalog.register(walkers());

	let cluster = HordeCluster::new(walkers(), 0.75);
	let restored = HordeCluster::from_data(&cluster.data(), &catalog).unwrap();
	assert_eq!(restored.definition().name(), "walkers");
	assert_eq!(restored.density(), 0.75);

	let unknown = ClusterData {
		definition: "ghosts".into(),
		density: 1.0,
	};
	assert!(matches!(HordeCluster::from_data(&unknown, &catalog), Err(HordeError::UnknownDefinition(name)) if name == "ghosts"));
}
