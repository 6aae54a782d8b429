use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};

use horde_ai::GroupExecutor;
use horde_primitives::{ActorId, ClassId, MemberId, MemberIdAllocator, Vec3, WorldRandom};
use horde_worker::RequestProcessor;
use pretty_assertions::assert_eq;

use super::*;
use crate::sandbox::{SandboxBiomes, SandboxHorde, SandboxWorld};
use crate::{Actor, ClusterSpawnState, HordeCluster, HordeDefinition, HordeError, HordeKind, HordeSettings, PlayerGroup, PlayerSnapshot, SharedCluster, SpawnState};

const ORIGIN: Vec3 = Vec3::new(100.0, 0.0, 0.0);

struct Fixture {
	world: SandboxWorld,
	processor: RequestProcessor<dyn World>,
	settings: HordeSettings,
	counter: SpawnedCounter,
}

impl Fixture {
	fn new() -> Self {
		let mut world = SandboxWorld::new(Arc::new(SandboxBiomes::default()));
		world.put_player(ActorId(1), Vec3::ZERO, 0.0);
		Self {
			world,
			processor: RequestProcessor::new(),
			settings: HordeSettings::default(),
			counter: Arc::new(AtomicUsize::new(0)),
		}
	}

	fn requests(&self) -> WorldRequests {
		self.processor.sender()
	}

	fn run(&mut self, ticks: usize) {
		for _ in 0..ticks {
			self.processor.tick(&mut self.world, 0.1);
		}
	}

	fn spawned(&self) -> usize {
		self.counter.load(Ordering::Acquire)
	}

	fn spawn_request(&self, cluster: &SharedCluster) -> ClusterSpawnRequest {
		ClusterSpawnRequest::new(
			Arc::clone(cluster),
			ORIGIN,
			PlayerGroup::new(self.world.players()),
			SpawnPlan::from_settings(&self.settings),
			MemberIdAllocator::new(),
			Arc::clone(&self.counter),
			WorldRandom::seeded(7),
		)
		.unwrap()
	}

	/// Spawns a full cluster of ten and returns it.
	fn spawned_cluster(&mut self) -> SharedCluster {
		let cluster = walkers(1.0);
		let request = self.spawn_request(&cluster);
		self.requests().submit(request).unwrap();
		self.run(10);
		assert_eq!(cluster.lock().members().len(), 10);
		cluster
	}
}

fn definition() -> Arc<dyn HordeDefinition> {
	Arc::new(SandboxHorde::new("walkers", HordeKind::Enemy, vec![ClassId(1), ClassId(2)]))
}

fn walkers(density: f32) -> SharedCluster {
	HordeCluster::new(definition(), density).shared()
}

fn first_member(cluster: &SharedCluster) -> MemberId {
	cluster.lock().members()[0].id()
}

#[test]
fn spawn_adds_one_member_per_tick() {
	let mut fixture = Fixture::new();
	let cluster = walkers(1.0);
	let request = fixture.spawn_request(&cluster);
	assert_eq!(request.size(), 10);
	assert!(cluster.lock().is_spawning());

	let mut handle = fixture.requests().track(request).unwrap();
	fixture.run(9);
	assert_eq!(cluster.lock().members().len(), 9);
	assert!(!handle.is_complete());

	fixture.run(1);
	let request = handle.try_take().unwrap().unwrap();
	assert_eq!(request.spawned(), 10);
	assert_eq!(fixture.spawned(), 10);
	assert_eq!(fixture.world.actor_count(), 10);

	let guard = cluster.lock();
	assert_eq!(guard.spawn_state(), SpawnState::SPAWNED);
	assert!((guard.density_per_member() - 0.1).abs() < 1e-6);
	assert_eq!(
		guard.spawn_progress().and_then(|progress| progress.try_get()),
		Some(ClusterSpawnState {
			spawned: 10,
			remaining: 0,
			complete: true,
		})
	);
}

#[test]
fn members_appear_between_the_spawn_distances() {
	let mut fixture = Fixture::new();
	let cluster = fixture.spawned_cluster();
	let min = fixture.settings.min_spawn_distance();
	let max = fixture.settings.max_spawn_distance();

	for member in cluster.lock().members() {
		let distance = member.location().distance(Vec3::ZERO);
		assert!(distance >= min && distance <= max, "{distance} outside {min}..={max}");
	}
}

#[test]
fn spawn_interval_spaces_members_out() {
	let mut fixture = Fixture::new();
	fixture.settings.spawn_interval_ticks = 3;
	let cluster = walkers(0.3);
	let request = fixture.spawn_request(&cluster);
	fixture.requests().submit(request).unwrap();

	fixture.run(2);
	assert_eq!(cluster.lock().members().len(), 0);
	fixture.run(1);
	assert_eq!(cluster.lock().members().len(), 1);
	fixture.run(6);
	assert_eq!(cluster.lock().members().len(), 3);
	assert_eq!(cluster.lock().spawn_state(), SpawnState::SPAWNED);
}

#[test]
fn population_cap_pauses_the_spawn() {
	let mut fixture = Fixture::new();
	fixture.world.set_max_alive(3);
	let cluster = walkers(1.0);
	let request = fixture.spawn_request(&cluster);
	let mut handle = fixture.requests().track(request).unwrap();

	fixture.run(10);
	assert_eq!(cluster.lock().members().len(), 3);
	assert!(handle.try_take().is_none());

	fixture.world.set_max_alive(usize::MAX);
	fixture.run(7);
	assert_eq!(handle.try_take().unwrap().unwrap().spawned(), 10);
}

#[test]
fn player_cap_limits_spawned_members() {
	let mut fixture = Fixture::new();
	fixture.settings.max_members_per_player = 4;
	let cluster = walkers(1.0);
	let request = fixture.spawn_request(&cluster);
	fixture.requests().submit(request).unwrap();

	fixture.run(20);
	assert_eq!(cluster.lock().members().len(), 4);
	assert_eq!(fixture.spawned(), 4);
}

#[test]
fn spawn_stops_once_the_cluster_leaves_spawning() {
	let mut fixture = Fixture::new();
	let cluster = walkers(1.0);
	let request = fixture.spawn_request(&cluster);
	let mut handle = fixture.requests().track(request).unwrap();
	fixture.run(2);

	cluster.lock().set_spawn_state(SpawnState::DESPAWNING);
	fixture.run(1);
	assert_eq!(handle.try_take().unwrap().unwrap().spawned(), 2);

	let guard = cluster.lock();
	assert_eq!(guard.spawn_state(), SpawnState::DESPAWNING);
	assert_eq!(
		guard.spawn_progress().and_then(|progress| progress.try_get()),
		Some(ClusterSpawnState {
			spawned: 2,
			remaining: 8,
			complete: true,
		})
	);
}

#[test]
fn missing_spawn_point_gives_up_only_when_players_left() {
	let mut fixture = Fixture::new();
	fixture.world.refuse_spawn_points(true);

	let near = walkers(1.0);
	let request = fixture.spawn_request(&near);
	let mut near_handle = fixture.requests().track(request).unwrap();
	fixture.run(5);
	assert!(near_handle.try_take().is_none());
	assert_eq!(near.lock().members().len(), 0);

	let far = walkers(1.0);
	let request = ClusterSpawnRequest::new(
		Arc::clone(&far),
		Vec3::new(500.0, 0.0, 0.0),
		PlayerGroup::new(fixture.world.players()),
		SpawnPlan::from_settings(&fixture.settings),
		MemberIdAllocator::new(),
		Arc::clone(&fixture.counter),
		WorldRandom::seeded(1),
	)
	.unwrap();
	let mut far_handle = fixture.requests().track(request).unwrap();
	fixture.run(1);
	assert_eq!(far_handle.try_take().unwrap().unwrap().spawned(), 0);
}

#[test]
fn spawning_twice_is_rejected() {
	let fixture = Fixture::new();
	let cluster = walkers(1.0);
	let _first = fixture.spawn_request(&cluster);
	let second = ClusterSpawnRequest::new(
		Arc::clone(&cluster),
		ORIGIN,
		PlayerGroup::new(fixture.world.players()),
		SpawnPlan::from_settings(&fixture.settings),
		MemberIdAllocator::new(),
		Arc::clone(&fixture.counter),
		WorldRandom::seeded(2),
	);
	assert!(matches!(second, Err(HordeError::AlreadySpawning)));
}

#[test]
fn despawn_removes_one_actor_per_tick_and_keeps_density() {
	let mut fixture = Fixture::new();
	let cluster = fixture.spawned_cluster();

	let request = ClusterDespawnRequest::new(std::slice::from_ref(&cluster), Arc::clone(&fixture.counter));
	assert_eq!(request.remaining(), 10);
	assert_eq!(cluster.lock().spawn_state(), SpawnState::DESPAWNING);
	let mut handle = fixture.requests().track(request).unwrap();

	fixture.run(4);
	assert_eq!(fixture.world.actor_count(), 6);
	assert_eq!(cluster.lock().members().len(), 10);

	fixture.run(6);
	assert!(handle.try_take().unwrap().is_ok());
	let guard = cluster.lock();
	assert_eq!(guard.spawn_state(), SpawnState::DESPAWNED);
	assert!(guard.members().is_empty());
	assert_eq!(guard.density(), 1.0);
	assert_eq!(fixture.world.actor_count(), 0);
	assert_eq!(fixture.spawned(), 0);
}

#[test]
fn update_reports_position_and_dead_members() {
	let mut fixture = Fixture::new();
	let cluster = fixture.spawned_cluster();
	let (victim, actor) = {
		let guard = cluster.lock();
		(guard.members()[3].id(), guard.members()[3].actor())
	};
	fixture.world.kill(actor);

	let mut handle = fixture.requests().track(ClusterUpdateRequest::new(std::slice::from_ref(&cluster))).unwrap();
	fixture.run(1);
	let update = handle.try_take().unwrap().unwrap();

	assert_eq!(update.dead(), &[(0, victim)]);
	let position = update.position().unwrap();
	let expected = fixture.settings.view_distance * (fixture.settings.min_spawn_fraction + fixture.settings.max_spawn_fraction) * 0.5;
	assert!((position.x - expected).abs() < 1e-3, "{position:?}");
	assert_eq!(position.z, 0.0);
}

#[test]
fn update_of_an_empty_horde_has_no_position() {
	let mut fixture = Fixture::new();
	let cluster = walkers(1.0);
	let mut handle = fixture.requests().track(ClusterUpdateRequest::new(&[cluster])).unwrap();
	fixture.run(1);
	assert_eq!(handle.try_take().unwrap().unwrap().position(), None);
}

#[test]
fn member_despawns_and_respawns_near_where_it_was() {
	let mut fixture = Fixture::new();
	let cluster = fixture.spawned_cluster();
	let id = first_member(&cluster);
	let (old_actor, location) = {
		let mut guard = cluster.lock();
		let member = guard.member_mut(id).unwrap();
		member.set_awaiting_spawn_state_change(true);
		(member.actor(), member.location())
	};

	let requests = fixture.requests();
	requests.submit(MemberDespawnRequest::new(Arc::clone(&cluster), id, Arc::clone(&fixture.counter))).unwrap();
	fixture.run(1);
	{
		let guard = cluster.lock();
		let member = guard.member(id).unwrap();
		assert!(!member.is_spawned());
		assert!(!member.is_awaiting_spawn_state_change());
	}
	assert_eq!(fixture.spawned(), 9);
	assert!(fixture.world.sandbox_actor(old_actor).is_none());

	cluster.lock().member_mut(id).unwrap().set_awaiting_spawn_state_change(true);
	requests.submit(MemberSpawnRequest::new(Arc::clone(&cluster), id, Arc::clone(&fixture.counter))).unwrap();
	fixture.run(1);
	let guard = cluster.lock();
	let member = guard.member(id).unwrap();
	assert!(member.is_spawned());
	assert!(!member.is_awaiting_spawn_state_change());
	assert_ne!(member.actor(), old_actor);
	assert!(member.location().distance(location) <= RESPAWN_SPREAD);
	assert_eq!(fixture.spawned(), 10);
	assert_eq!(fixture.processor.active_len(), 0);
}

#[test]
fn refused_respawn_keeps_trying() {
	let mut fixture = Fixture::new();
	let cluster = fixture.spawned_cluster();
	let id = first_member(&cluster);
	{
		let mut guard = cluster.lock();
		let member = guard.member_mut(id).unwrap();
		member.despawn(&mut fixture.world);
		member.set_awaiting_spawn_state_change(true);
	}
	fixture.world.refuse_actors(true);

	let mut handle = fixture
		.requests()
		.track(MemberSpawnRequest::new(Arc::clone(&cluster), id, Arc::clone(&fixture.counter)))
		.unwrap();
	fixture.run(3);
	assert!(handle.try_take().is_none());
	assert!(cluster.lock().member(id).unwrap().is_awaiting_spawn_state_change());

	fixture.world.refuse_actors(false);
	fixture.run(1);
	assert!(handle.try_take().unwrap().is_ok());
	assert!(cluster.lock().member(id).unwrap().is_spawned());
}

#[test]
fn respawn_is_skipped_once_the_horde_despawned() {
	let mut fixture = Fixture::new();
	let cluster = fixture.spawned_cluster();
	let id = first_member(&cluster);
	{
		let mut guard = cluster.lock();
		let member = guard.member_mut(id).unwrap();
		member.despawn(&mut fixture.world);
		member.notify_horde_despawned();
	}
	let before = fixture.world.actor_count();

	let mut handle = fixture
		.requests()
		.track(MemberSpawnRequest::new(Arc::clone(&cluster), id, Arc::clone(&fixture.counter)))
		.unwrap();
	fixture.run(1);
	assert!(handle.try_take().unwrap().is_ok());
	assert_eq!(fixture.world.actor_count(), before);
	assert!(!cluster.lock().member(id).unwrap().is_spawned());
}

#[test]
fn member_ai_runs_until_death_or_unload() {
	let mut fixture = Fixture::new();
	let requests = fixture.requests();
	let group = GroupExecutor::new(None, WorldRandom::seeded(11));
	let cluster = walkers(1.0);
	let launcher = AiLauncher::new(requests.clone(), group.clone(), Arc::clone(&cluster), definition(), fixture.settings.sight_distance, 99);

	let request = fixture.spawn_request(&cluster).on_spawn(move |member| launcher.launch(member));
	requests.submit(request).unwrap();
	fixture.run(11);
	assert_eq!(fixture.processor.request_counts().get("member_ai"), Some(&10));
	assert_eq!(group.member_count(), 10);
	assert!(cluster.lock().members().iter().all(|member| member.is_ai_loaded()));

	let (victim, actor) = {
		let guard = cluster.lock();
		(guard.members()[0].id(), guard.members()[0].actor())
	};
	fixture.world.kill(actor);
	fixture.run(1);
	assert_eq!(fixture.processor.request_counts().get("member_ai"), Some(&9));
	assert_eq!(group.member_count(), 9);

	let unloaded = cluster.lock().members()[1].id();
	assert_ne!(unloaded, victim);
	cluster.lock().member_mut(unloaded).unwrap().unload_ai();
	fixture.run(1);
	assert_eq!(fixture.processor.request_counts().get("member_ai"), Some(&8));
}

#[test]
fn relaunching_ai_retires_the_previous_request() {
	let mut fixture = Fixture::new();
	let requests = fixture.requests();
	let group = GroupExecutor::new(None, WorldRandom::seeded(11));
	let cluster = fixture.spawned_cluster();
	let launcher = AiLauncher::new(requests, group.clone(), Arc::clone(&cluster), definition(), fixture.settings.sight_distance, 5);

	let id = first_member(&cluster);
	launcher.launch(cluster.lock().member_mut(id).unwrap());
	fixture.run(1);
	assert_eq!(fixture.processor.request_counts().get("member_ai"), Some(&1));

	launcher.launch(cluster.lock().member_mut(id).unwrap());
	fixture.run(2);
	assert_eq!(fixture.processor.request_counts().get("member_ai"), Some(&1));
	assert_eq!(group.member_count(), 1);
}

#[test]
fn closed_processor_unloads_the_ai() {
	let mut fixture = Fixture::new();
	let group = GroupExecutor::new(None, WorldRandom::seeded(11));
	let cluster = fixture.spawned_cluster();
	let launcher = AiLauncher::new(fixture.requests(), group, Arc::clone(&cluster), definition(), fixture.settings.sight_distance, 5);
	fixture.processor.shutdown();

	let id = first_member(&cluster);
	launcher.launch(cluster.lock().member_mut(id).unwrap());
	assert!(!cluster.lock().member(id).unwrap().is_ai_loaded());
}

#[test]
fn launcher_sight_range_decides_whether_a_loud_player_is_heard() {
	let target_with = |sight_range: f32| {
		let mut fixture = Fixture::new();
		let group = GroupExecutor::new(None, WorldRandom::seeded(11));
		let cluster = fixture.spawned_cluster();
		let launcher = AiLauncher::new(fixture.requests(), group, Arc::clone(&cluster), definition(), sight_range, 5);

		let id = first_member(&cluster);
		let actor = {
			let mut guard = cluster.lock();
			let member = guard.member_mut(id).unwrap();
			member.sync_location(&fixture.world);
			let loud = PlayerSnapshot {
				actor: ActorId(2),
				location: member.location() + Vec3::new(30.0, 0.0, 0.0),
				noise: 1.0,
			};
			member.set_players_nearby(&[loud]);
			launcher.launch(member);
			member.actor()
		};
		fixture.run(1);
		fixture.world.sandbox_actor(actor).and_then(|actor| actor.target())
	};

	assert_eq!(target_with(HordeSettings::default().sight_distance), None);
	assert_eq!(target_with(40.0).map(|target| target.actor), Some(ActorId(2)));
}
