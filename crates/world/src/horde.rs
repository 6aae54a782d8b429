use std::fmt;
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};

use horde_ai::zone::BiomeId;
use horde_ai::{Agent, Command, GroupExecutor, Target};
use horde_primitives::{MemberIdAllocator, Vec3, WorldRandom};
use horde_worker::RequestHandle;
use serde::{Deserialize, Serialize};

use crate::requests::{
	AiLauncher, ClusterDespawnRequest, ClusterSpawnRequest, ClusterUpdateRequest, MemberDespawnRequest, MemberSpawnRequest, SpawnPlan,
	SpawnedCounter, WorldRequests, count_despawned,
};
use crate::{
	BiomeMap, ClusterData, HordeCatalog, HordeCluster, HordeDefinition, HordeError, HordeKind, HordeSettings, PlayerGroup, SharedCluster, SpawnState,
};

/// Tracker-assigned id of a horde.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct HordeId(pub u64);

impl fmt::Display for HordeId {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		write!(f, "horde#{}", self.0)
	}
}

/// Persisted form of a horde.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HordeData {
	pub location: Vec3,
	pub spawn_biome: BiomeId,
	pub clusters: Vec<ClusterData>,
}

/// Read-only view of one cluster, published by the tracker.
#[derive(Debug, Clone, PartialEq)]
pub struct ClusterSnapshot {
	pub definition: &'static str,
	pub density: f32,
	pub members: usize,
	pub spawned: usize,
	pub state: SpawnState,
}

/// Read-only view of one horde, published by the tracker.
#[derive(Debug, Clone, PartialEq)]
pub struct HordeSnapshot {
	pub id: HordeId,
	pub location: Vec3,
	pub density: f32,
	pub clusters: Vec<ClusterSnapshot>,
}

/// The horde as a single agent while none of its members are in the world.
#[derive(Debug, Clone, PartialEq)]
pub struct HordeBody {
	location: Vec3,
	walk_speed: f32,
	moving: bool,
	sleeping: bool,
	dead: bool,
}

impl HordeBody {
	pub fn new(location: Vec3, walk_speed: f32) -> Self {
		Self {
			location,
			walk_speed,
			moving: false,
			sleeping: false,
			dead: false,
		}
	}
}

impl Agent for HordeBody {
	fn move_to(&mut self, location: Vec3, dt: f32) {
		self.moving = true;
		self.location = self.location.step_toward(location, self.walk_speed * dt);
	}

	fn stop(&mut self) {
		self.moving = false;
	}

	fn is_moving(&self) -> bool {
		self.moving
	}

	fn location(&self) -> Vec3 {
		self.location
	}

	fn target(&self) -> Option<Target> {
		None
	}

	fn is_dead(&self) -> bool {
		self.dead
	}

	fn sleep(&mut self) {
		self.sleeping = true;
	}

	fn wake_up(&mut self) {
		self.sleeping = false;
	}

	fn is_sleeping(&self) -> bool {
		self.sleeping
	}
}

/// What a horde needs to issue main-context requests.
#[derive(Debug, Clone, Copy)]
pub struct HordeContext<'a> {
	pub requests: &'a WorldRequests,
	pub settings: &'a HordeSettings,
	pub ids: &'a MemberIdAllocator,
}

/// A horde living in the world: one or more clusters moving as a group.
///
/// Owned by the tracker thread. Clusters are shared with the main-context
/// requests that spawn, despawn and update their members.
pub struct WorldHorde {
	id: HordeId,
	body: HordeBody,
	spawn_biome: BiomeId,
	clusters: Vec<SharedCluster>,
	group: GroupExecutor,
	pending_update: Option<RequestHandle<ClusterUpdateRequest>>,
	spawned: SpawnedCounter,
	merged: bool,
	rng: WorldRandom,
}

impl fmt::Debug for WorldHorde {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.debug_struct("WorldHorde")
			.field("id", &self.id)
			.field("location", &self.body.location)
			.field("clusters", &self.clusters.len())
			.field("spawned", &self.spawned_members())
			.field("merged", &self.merged)
			.finish()
	}
}

impl WorldHorde {
	/// Builds a horde whose group commands come from its first cluster's definition.
	pub fn new(id: HordeId, location: Vec3, spawn_biome: BiomeId, clusters: Vec<HordeCluster>, mut rng: WorldRandom) -> Result<Self, HordeError> {
		let Some(first) = clusters.first() else {
			return Err(HordeError::Empty);
		};
		let definition = Arc::clone(first.definition());
		let group = GroupExecutor::new(definition.group_commands(spawn_biome), rng.fork());

		Ok(Self {
			id,
			body: HordeBody::new(location, definition.walk_speed()),
			spawn_biome,
			clusters: clusters.into_iter().map(HordeCluster::shared).collect(),
			group,
			pending_update: None,
			spawned: Arc::new(AtomicUsize::new(0)),
			merged: false,
			rng,
		})
	}

	pub fn from_data(id: HordeId, data: &HordeData, catalog: &HordeCatalog, rng: WorldRandom) -> Result<Self, HordeError> {
		let clusters = data
			.clusters
			.iter()
			.map(|cluster| HordeCluster::from_data(cluster, catalog))
			.collect::<Result<Vec<_>, _>>()?;
		Self::new(id, data.location, data.spawn_biome, clusters, rng)
	}

	pub fn data(&self) -> HordeData {
		HordeData {
			location: self.body.location,
			spawn_biome: self.spawn_biome,
			clusters: self.clusters.iter().map(|cluster| cluster.lock().data()).collect(),
		}
	}

	pub fn snapshot(&self) -> HordeSnapshot {
		HordeSnapshot {
			id: self.id,
			location: self.body.location,
			density: self.density(),
			clusters: self
				.clusters
				.iter()
				.map(|cluster| {
					let cluster = cluster.lock();
					ClusterSnapshot {
						definition: cluster.definition().name(),
						density: cluster.density(),
						members: cluster.members().len(),
						spawned: cluster.spawned_count(),
						state: cluster.spawn_state(),
					}
				})
				.collect(),
		}
	}

	pub fn id(&self) -> HordeId {
		self.id
	}

	pub fn location(&self) -> Vec3 {
		self.body.location
	}

	pub fn body(&self) -> &HordeBody {
		&self.body
	}

	pub fn spawn_biome(&self) -> BiomeId {
		self.spawn_biome
	}

	pub fn clusters(&self) -> &[SharedCluster] {
		&self.clusters
	}

	pub fn group(&self) -> &GroupExecutor {
		&self.group
	}

	pub fn kind(&self) -> Option<HordeKind> {
		self.clusters.first().map(|cluster| cluster.lock().definition().kind())
	}

	/// Members currently backed by a live actor.
	pub fn spawned_members(&self) -> usize {
		self.spawned.load(Ordering::Acquire)
	}

	pub fn density(&self) -> f32 {
		self.clusters.iter().map(|cluster| cluster.lock().density()).sum()
	}

	pub fn is_merged(&self) -> bool {
		self.merged
	}

	pub fn is_dead(&self) -> bool {
		self.body.dead
	}

	fn any_state(&self, flag: SpawnState) -> bool {
		self.clusters.iter().any(|cluster| cluster.lock().spawn_state().contains(flag))
	}

	pub fn is_spawning(&self) -> bool {
		self.any_state(SpawnState::SPAWNING)
	}

	pub fn is_spawned(&self) -> bool {
		self.any_state(SpawnState::SPAWNED)
	}

	pub fn is_despawning(&self) -> bool {
		self.any_state(SpawnState::DESPAWNING)
	}

	/// True when no cluster has anything in the world or on its way there.
	pub fn is_detached(&self) -> bool {
		self.clusters.iter().all(|cluster| cluster.lock().spawn_state() == SpawnState::DESPAWNED)
	}

	/// Starts a spawn for every cluster that is fully despawned. Returns how many started.
	pub fn spawn(&mut self, ctx: HordeContext<'_>, players: &PlayerGroup) -> usize {
		if self.is_despawning() {
			return 0;
		}

		let plan = SpawnPlan::from_settings(ctx.settings);
		let mut started = 0;
		for cluster in &self.clusters {
			let (ready, definition) = {
				let guard = cluster.lock();
				(guard.spawn_state() == SpawnState::DESPAWNED && !guard.is_dead(), Arc::clone(guard.definition()))
			};
			if !ready {
				continue;
			}

			let request = match ClusterSpawnRequest::new(
				Arc::clone(cluster),
				self.body.location,
				players.clone(),
				plan,
				ctx.ids.clone(),
				Arc::clone(&self.spawned),
				self.rng.fork(),
			) {
				Ok(request) => request,
				Err(err) => {
					tracing::warn!(horde = %self.id, definition = definition.name(), error = %err, "horde.spawn_failed");
					continue;
				}
			};

			let launcher = AiLauncher::new(ctx.requests.clone(), self.group.clone(), Arc::clone(cluster), definition, ctx.settings.sight_distance, self.rng.next_seed());
			let request = request.on_spawn(move |member| launcher.launch(member));
			if let Err(err) = ctx.requests.submit(request) {
				tracing::warn!(horde = %self.id, error = %err, "horde.spawn_failed");
				cluster.lock().set_spawn_state(SpawnState::DESPAWNED);
				continue;
			}
			started += 1;
		}

		if started > 0 {
			tracing::debug!(horde = %self.id, clusters = started, players = players.len(), "horde.spawning");
		}
		started
	}

	/// Removes every member's actor. No-op while detached or already despawning.
	pub fn despawn(&mut self, requests: &WorldRequests) -> Result<(), HordeError> {
		if self.is_detached() || self.is_despawning() {
			return Ok(());
		}
		self.pending_update = None;
		requests.submit(ClusterDespawnRequest::new(&self.clusters, Arc::clone(&self.spawned)))?;
		tracing::debug!(horde = %self.id, spawned = self.spawned_members(), "horde.despawning");
		Ok(())
	}

	/// Reacts to finished cluster spawns: an empty spawn is retried, a partial one despawns the horde.
	pub fn check_spawn_progress(&mut self, requests: &WorldRequests) -> Result<(), HordeError> {
		let mut partial = false;
		for cluster in &self.clusters {
			let mut cluster = cluster.lock();
			let Some(progress) = cluster.spawn_progress().and_then(|progress| progress.try_get()) else {
				continue;
			};
			if !progress.complete || cluster.spawn_state() != SpawnState::SPAWNED {
				continue;
			}
			if progress.spawned == 0 {
				tracing::debug!(horde = %self.id, definition = cluster.definition().name(), "horde.spawn_retry");
				cluster.set_spawn_state(SpawnState::DESPAWNED);
			} else if progress.remaining != 0 {
				partial = true;
			}
		}

		if partial {
			tracing::debug!(horde = %self.id, "horde.partial_spawn");
			self.despawn(requests)?;
		}
		Ok(())
	}

	/// Loads and unloads individual members as players move around them.
	///
	/// Spawned members beyond the view distance are despawned; detached ones
	/// within the maximum spawn distance come back. Spawned members without
	/// AI get a fresh AI request.
	pub fn update_members(&mut self, ctx: HordeContext<'_>, players: &PlayerGroup) {
		let view = ctx.settings.view_distance;
		let respawn = ctx.settings.max_spawn_distance();

		for cluster in &self.clusters {
			let mut guard = cluster.lock();
			if guard.spawn_state().contains(SpawnState::DESPAWNING) {
				continue;
			}
			let launcher = AiLauncher::new(ctx.requests.clone(), self.group.clone(), Arc::clone(cluster), Arc::clone(guard.definition()), ctx.settings.sight_distance, self.rng.next_seed());

			for member in guard.members_mut() {
				member.set_players_nearby(players.players());
				if member.is_awaiting_spawn_state_change() || member.is_horde_despawned() {
					continue;
				}
				let distance = member.nearby().map_or(f32::INFINITY, |(_, distance)| distance);

				let submitted = if member.is_spawned() && distance > view {
					member.set_awaiting_spawn_state_change(true);
					ctx.requests.submit(MemberDespawnRequest::new(Arc::clone(cluster), member.id(), Arc::clone(&self.spawned)))
				} else if !member.is_spawned() && distance <= respawn {
					member.set_awaiting_spawn_state_change(true);
					ctx.requests.submit(MemberSpawnRequest::new(Arc::clone(cluster), member.id(), Arc::clone(&self.spawned)))
				} else {
					if member.is_spawned() && !member.is_ai_loaded() {
						launcher.launch(member);
					}
					Ok(())
				};

				if let Err(err) = submitted {
					tracing::warn!(horde = %self.id, member = %member.id(), error = %err, "horde.member_request_failed");
					member.set_awaiting_spawn_state_change(false);
				}
			}
		}
	}

	/// Queues a position update unless one is already in flight.
	pub fn request_update(&mut self, requests: &WorldRequests) -> Result<(), HordeError> {
		if self.pending_update.is_none() {
			self.pending_update = Some(requests.track(ClusterUpdateRequest::new(&self.clusters))?);
		}
		Ok(())
	}

	/// Applies a finished position update and reaps the dead. Returns the members removed.
	pub fn poll_update(&mut self) -> usize {
		let Some(handle) = self.pending_update.as_mut() else {
			return 0;
		};
		let Some(result) = handle.try_take() else {
			return 0;
		};
		self.pending_update = None;

		let update = match result {
			Ok(update) => update,
			Err(err) => {
				tracing::warn!(horde = %self.id, error = %err, "horde.update_failed");
				return 0;
			}
		};

		if let Some(position) = update.position() {
			self.body.location = position;
		}

		let mut removed = 0;
		for &(index, id) in update.dead() {
			let Some(cluster) = self.clusters.get(index) else {
				continue;
			};
			if cluster.lock().remove_member(id, true).is_some() {
				count_despawned(&self.spawned);
				removed += 1;
			}
		}
		if removed > 0 {
			tracing::debug!(horde = %self.id, removed, density = self.density(), "horde.members_died");
		}
		removed
	}

	/// Wears down clusters that roam outside their home biome while detached.
	pub fn decay(&mut self, rate: f32, biomes: &dyn BiomeMap, dt: f32) {
		if !self.is_detached() || biomes.biome_at(self.body.location) == self.spawn_biome {
			return;
		}
		for cluster in &self.clusters {
			cluster.lock().decay(rate, dt);
		}
	}

	/// Drops dead, empty clusters. The horde dies with its last cluster.
	pub fn remove_dead_clusters(&mut self) -> usize {
		let before = self.clusters.len();
		self.clusters.retain(|cluster| {
			let cluster = cluster.lock();
			!(cluster.is_dead() && cluster.members().is_empty())
		});
		let removed = before - self.clusters.len();
		if self.clusters.is_empty() && !self.body.dead {
			self.body.dead = true;
			tracing::debug!(horde = %self.id, "horde.died");
		}
		removed
	}

	/// Runs the group's commands against the body. Only a detached horde moves as a whole.
	pub fn update_ai(&mut self, dt: f32) {
		if self.is_detached() {
			self.group.update(&mut self.body, dt);
		}
	}

	/// Replaces the group's interrupts with `commands`, first on top.
	///
	/// Loaded members are reseeded with the new top command on their next tick.
	pub fn interrupt(&mut self, commands: Vec<Box<dyn Command>>) {
		tracing::debug!(horde = %self.id, commands = commands.len(), "horde.interrupted");
		self.group.interrupt(&mut self.body, commands);
	}

	pub fn objective_score(&self) -> i32 {
		self.group.objective_score(&self.body)
	}

	fn settled(&self) -> bool {
		!self.merged
			&& !self.body.dead
			&& self.clusters.iter().all(|cluster| {
				let cluster = cluster.lock();
				let state = cluster.spawn_state();
				!state.intersects(SpawnState::SPAWNING | SpawnState::DESPAWNING)
					&& cluster.members().iter().all(|member| !member.is_awaiting_spawn_state_change())
			})
	}

	fn compatible(&self, other: &WorldHorde) -> Result<(), HordeError> {
		for mine in &self.clusters {
			let mine = Arc::clone(mine.lock().definition());
			for theirs in &other.clusters {
				let theirs = Arc::clone(theirs.lock().definition());
				if !mine.can_merge_with(theirs.as_ref()) {
					return Err(HordeError::IncompatibleClusters {
						left: mine.name(),
						right: theirs.name(),
					});
				}
			}
		}
		Ok(())
	}

	/// Whether `other` is close enough, small enough and of a compatible kind to be absorbed.
	pub fn can_merge_with(&self, other: &WorldHorde, settings: &HordeSettings) -> bool {
		if !self.settled() || !other.settled() {
			return false;
		}
		let range = if self.is_spawned() || other.is_spawned() {
			settings.merge_distance_loaded
		} else {
			settings.merge_distance_unloaded
		};
		self.body.location.distance_xz(other.body.location) <= range
			&& self.density() + other.density() <= settings.max_horde_density
			&& self.compatible(other).is_ok()
	}

	/// Moves every cluster of `other` into this horde and marks `other` as merged.
	///
	/// Spawned members of `other` lose their AI; the next member update
	/// restarts it under this horde's group.
	pub fn merge(&mut self, other: &mut WorldHorde) -> Result<(), HordeError> {
		self.compatible(other)?;

		for cluster in other.clusters.drain(..) {
			{
				let mut guard = cluster.lock();
				for member in guard.members_mut() {
					member.unload_ai();
				}
			}
			self.clusters.push(cluster);
		}
		self.spawned.fetch_add(other.spawned.swap(0, Ordering::AcqRel), Ordering::AcqRel);
		other.pending_update = None;
		other.merged = true;
		tracing::debug!(horde = %self.id, absorbed = %other.id, density = self.density(), "horde.merged");
		Ok(())
	}

	/// Breaks a detached horde above `max_density` into hordes that each fit.
	///
	/// Density is conserved: oversized clusters are cut into equal pieces and
	/// the pieces are packed in order. This horde keeps the first pack.
	pub fn split(&mut self, max_density: f32, next_id: &mut dyn FnMut() -> HordeId) -> Vec<WorldHorde> {
		if !self.is_detached() || self.density() <= max_density {
			return Vec::new();
		}

		let mut pieces: Vec<(Arc<dyn HordeDefinition>, f32)> = Vec::new();
		for cluster in self.clusters.drain(..) {
			let cluster = cluster.lock();
			let density = cluster.density();
			let parts = (density / max_density).ceil().max(1.0) as usize;
			for _ in 0..parts {
				pieces.push((Arc::clone(cluster.definition()), density / parts as f32));
			}
		}

		let mut packs: Vec<Vec<HordeCluster>> = Vec::new();
		let mut current = Vec::new();
		let mut total = 0.0;
		for (definition, density) in pieces {
			if !current.is_empty() && total + density > max_density {
				packs.push(std::mem::take(&mut current));
				total = 0.0;
			}
			current.push(HordeCluster::new(definition, density));
			total += density;
		}
		packs.push(current);

		let mut packs = packs.into_iter();
		self.clusters = packs.next().unwrap_or_default().into_iter().map(HordeCluster::shared).collect();

		let split: Vec<WorldHorde> = packs
			.filter_map(|clusters| WorldHorde::new(next_id(), self.body.location, self.spawn_biome, clusters, self.rng.fork()).ok())
			.collect();
		tracing::debug!(horde = %self.id, pieces = split.len() + 1, density = self.density(), "horde.split");
		split
	}
}

#[cfg(test)]
mod tests;
