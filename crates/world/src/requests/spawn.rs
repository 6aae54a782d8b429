use horde_primitives::{MemberIdAllocator, Vec3, WorldRandom};
use horde_worker::{Broadcast, MainThreadRequest};

use super::{SpawnCallback, SpawnedCounter, count_spawned};
use crate::{ClusterMember, ClusterSpawnState, HordeError, HordeKind, HordeSettings, PlayerGroup, SharedCluster, SpawnState, World};

/// Distances and caps one cluster spawn works with.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SpawnPlan {
	pub min_distance: f32,
	pub max_distance: f32,
	/// Beyond this the players have left and a spawn without a valid point gives up.
	pub view_distance: f32,
	pub interval_ticks: u32,
	/// Zero disables the cap.
	pub max_members_per_player: usize,
}

impl SpawnPlan {
	pub fn from_settings(settings: &HordeSettings) -> Self {
		Self {
			min_distance: settings.min_spawn_distance(),
			max_distance: settings.max_spawn_distance(),
			view_distance: settings.view_distance,
			interval_ticks: settings.spawn_interval_ticks.max(1),
			max_members_per_player: settings.max_members_per_player,
		}
	}

	fn target_distance(&self) -> f32 {
		(self.min_distance + self.max_distance) * 0.5
	}

	fn spread(&self) -> f32 {
		(self.max_distance - self.min_distance).max(0.0) * 0.5
	}
}

/// Spawns the members of one cluster, at most one per tick.
///
/// Members appear on the ring between the spawn distances, on the side of
/// the closest player that faces the horde.
pub struct ClusterSpawnRequest {
	cluster: SharedCluster,
	kind: HordeKind,
	origin: Vec3,
	players: PlayerGroup,
	plan: SpawnPlan,
	ids: MemberIdAllocator,
	spawned: SpawnedCounter,
	progress: Broadcast<ClusterSpawnState>,
	rng: WorldRandom,
	on_spawn: Option<SpawnCallback>,
	size: usize,
	index: usize,
	succeeded: usize,
	ticks: u32,
}

impl std::fmt::Debug for ClusterSpawnRequest {
	fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
		f.debug_struct("ClusterSpawnRequest")
			.field("kind", &self.kind)
			.field("origin", &self.origin)
			.field("size", &self.size)
			.field("index", &self.index)
			.field("succeeded", &self.succeeded)
			.finish()
	}
}

impl ClusterSpawnRequest {
	/// Prepares the cluster's entity generator and puts the cluster into the spawning state.
	#[allow(clippy::too_many_arguments)]
	pub fn new(
		cluster: SharedCluster,
		origin: Vec3,
		players: PlayerGroup,
		plan: SpawnPlan,
		ids: MemberIdAllocator,
		spawned: SpawnedCounter,
		mut rng: WorldRandom,
	) -> Result<Self, HordeError> {
		let progress = Broadcast::new();
		let (kind, size) = {
			let mut guard = cluster.lock();
			if guard.is_spawning() {
				return Err(HordeError::AlreadySpawning);
			}
			let density = guard.density();
			let size = guard.prepare_entity_generator(&players, &mut rng)?.member_count(density);
			guard.begin_spawn(progress.subscribe())?;
			(guard.definition().kind(), size)
		};

		Ok(Self {
			cluster,
			kind,
			origin,
			players,
			plan,
			ids,
			spawned,
			progress,
			rng,
			on_spawn: None,
			size,
			index: 0,
			succeeded: 0,
			ticks: 0,
		})
	}

	pub fn on_spawn(mut self, callback: impl FnMut(&mut ClusterMember) + Send + 'static) -> Self {
		self.on_spawn = Some(Box::new(callback));
		self
	}

	/// Members this request set out to spawn.
	pub fn size(&self) -> usize {
		self.size
	}

	pub fn index(&self) -> usize {
		self.index
	}

	pub fn spawned(&self) -> usize {
		self.succeeded
	}

	fn cancel(&mut self, reason: &'static str) {
		tracing::debug!(kind = self.kind.as_str(), spawned = self.succeeded, size = self.size, reason, "spawn.cancelled");
		self.index = self.size;
	}

	fn publish(&self, complete: bool) {
		self.progress.update(ClusterSpawnState {
			spawned: self.succeeded,
			remaining: self.size.saturating_sub(self.succeeded),
			complete,
		});
	}
}

impl MainThreadRequest<dyn World> for ClusterSpawnRequest {
	fn tick_execute(&mut self, world: &mut (dyn World + 'static), _dt: f32) -> Result<(), String> {
		if self.index >= self.size {
			return Ok(());
		}

		let mut cluster = self.cluster.lock();
		if !cluster.is_spawning() {
			drop(cluster);
			self.cancel("cluster_left_spawning");
			return Ok(());
		}

		self.ticks += 1;
		if self.ticks < self.plan.interval_ticks {
			return Ok(());
		}
		self.ticks = 0;

		if world.actors_alive(self.kind) >= world.max_actors_alive(self.kind) {
			tracing::trace!(kind = self.kind.as_str(), "spawn.population_capped");
			return Ok(());
		}
		let cap = self.plan.max_members_per_player * self.players.len();
		if cap > 0 && self.spawned.load(std::sync::atomic::Ordering::Acquire) >= cap {
			tracing::trace!(cap, "spawn.player_capped");
			return Ok(());
		}

		let Some((player, distance)) = self.players.closest_to(self.origin) else {
			drop(cluster);
			self.cancel("no_players");
			return Ok(());
		};
		let direction = (self.origin - player.location).flatten().normalized();
		let target = player.location + direction * self.plan.target_distance();

		let Some(point) = world.find_valid_spawn_point(target, 0.0, self.plan.spread()) else {
			if distance > self.plan.view_distance {
				drop(cluster);
				self.cancel("players_out_of_view");
			} else {
				tracing::trace!(target = ?target, "spawn.no_valid_point");
			}
			return Ok(());
		};

		let definition = cluster.definition().name();
		let Some(generator) = cluster.entity_generator_mut() else {
			return Err(format!("cluster {definition} lost its entity generator"));
		};
		let class = generator.class_id(&mut self.rng);
		let id = world.next_actor_id();
		let Some(actor) = world.spawn_actor(class, id, point) else {
			tracing::warn!(class = %class, location = ?point, "spawn.actor_refused");
			return Ok(());
		};
		let location = world.actor(actor).map_or(point, |spawned| spawned.location());

		let mut member = ClusterMember::spawned(self.ids.next(), class, actor, location);
		if let Some(on_spawn) = self.on_spawn.as_mut() {
			on_spawn(&mut member);
		}
		tracing::trace!(member = %member.id(), actor = %actor, "spawn.member_added");
		cluster.add_member(member);
		drop(cluster);

		count_spawned(&self.spawned);
		self.index += 1;
		self.succeeded += 1;
		self.publish(false);
		Ok(())
	}

	fn is_done(&self) -> bool {
		self.index >= self.size
	}

	fn on_cleanup(&mut self, _world: &mut (dyn World + 'static)) {
		{
			let mut cluster = self.cluster.lock();
			if cluster.is_spawning() {
				cluster.set_spawn_state(SpawnState::SPAWNED);
			}
		}
		self.publish(true);
		tracing::debug!(kind = self.kind.as_str(), spawned = self.succeeded, size = self.size, "spawn.finished");
	}

	fn name(&self) -> &'static str {
		"cluster_spawn"
	}
}
