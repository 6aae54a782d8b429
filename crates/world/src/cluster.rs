use std::sync::Arc;

use bitflags::bitflags;
use horde_primitives::{MemberId, WorldRandom};
use horde_worker::Subscriber;
use parking_lot::Mutex;
use serde::{Deserialize, Serialize};

use crate::{ClusterDensity, ClusterMember, EntityGenerator, HordeCatalog, HordeDefinition, HordeError, PlayerGroup};

bitflags! {
	/// Spawn lifecycle of a cluster. A cluster can be spawned and still spawning.
	#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
	pub struct SpawnState: u8 {
		const SPAWNED = 1;
		const SPAWNING = 1 << 1;
		const DESPAWNED = 1 << 2;
		const DESPAWNING = 1 << 3;
	}
}

/// Progress of one cluster spawn, published by the spawn request as it runs.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ClusterSpawnState {
	pub spawned: usize,
	pub remaining: usize,
	pub complete: bool,
}

/// Persisted form of a cluster.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ClusterData {
	pub definition: String,
	pub density: f32,
}

/// Cluster shared between the tracker and main-context requests.
pub type SharedCluster = Arc<Mutex<HordeCluster>>;

/// A single-definition slice of a horde.
pub struct HordeCluster {
	definition: Arc<dyn HordeDefinition>,
	density: ClusterDensity,
	members: Vec<ClusterMember>,
	entity_generator: Option<Box<dyn EntityGenerator>>,
	spawn_state: SpawnState,
	spawn_progress: Option<Subscriber<ClusterSpawnState>>,
}

impl std::fmt::Debug for HordeCluster {
	fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
		f.debug_struct("HordeCluster")
			.field("definition", &self.definition.name())
			.field("density", &self.density)
			.field("members", &self.members.len())
			.field("spawn_state", &self.spawn_state)
			.finish()
	}
}

impl HordeCluster {
	pub fn new(definition: Arc<dyn HordeDefinition>, density: f32) -> Self {
		Self {
			definition,
			density: ClusterDensity::new(density),
			members: Vec::new(),
			entity_generator: None,
			spawn_state: SpawnState::DESPAWNED,
			spawn_progress: None,
		}
	}

	pub fn from_data(data: &ClusterData, catalog: &HordeCatalog) -> Result<Self, HordeError> {
		Ok(Self::new(catalog.get(&data.definition)?, data.density))
	}

	pub fn shared(self) -> SharedCluster {
		Arc::new(Mutex::new(self))
	}

	pub fn data(&self) -> ClusterData {
		ClusterData {
			definition: self.definition.name().to_string(),
			density: self.density.density(),
		}
	}

	pub fn definition(&self) -> &Arc<dyn HordeDefinition> {
		&self.definition
	}

	pub fn density(&self) -> f32 {
		self.density.density()
	}

	pub fn density_per_member(&self) -> f32 {
		self.density.per_member()
	}

	pub fn is_dead(&self) -> bool {
		self.density.is_dead()
	}

	/// Loses density while the cluster is away from home.
	pub fn decay(&mut self, rate: f32, dt: f32) {
		self.density.remove(rate * dt);
	}

	/// Removes one member's share of the density.
	pub fn notify_density_removed(&mut self) {
		self.density.remove_member();
	}

	pub fn members(&self) -> &[ClusterMember] {
		&self.members
	}

	pub fn members_mut(&mut self) -> &mut [ClusterMember] {
		&mut self.members
	}

	pub fn member(&self, id: MemberId) -> Option<&ClusterMember> {
		self.members.iter().find(|member| member.id() == id)
	}

	pub fn member_mut(&mut self, id: MemberId) -> Option<&mut ClusterMember> {
		self.members.iter_mut().find(|member| member.id() == id)
	}

	pub fn spawned_count(&self) -> usize {
		self.members.iter().filter(|member| member.is_spawned()).count()
	}

	pub fn add_member(&mut self, member: ClusterMember) {
		self.members.push(member);
		self.density.update_per_member(self.members.len());
		if !self.is_spawned() {
			self.spawn_state |= SpawnState::SPAWNED;
		}
	}

	/// Removes a member. A killed member takes its share of the density with it.
	pub fn remove_member(&mut self, id: MemberId, killed: bool) -> Option<ClusterMember> {
		let index = self.members.iter().position(|member| member.id() == id)?;
		let member = self.members.remove(index);
		if killed {
			self.notify_density_removed();
		}
		Some(member)
	}

	/// Drops every member without touching density.
	pub fn clear_members(&mut self) -> Vec<ClusterMember> {
		std::mem::take(&mut self.members)
	}

	pub fn spawn_state(&self) -> SpawnState {
		self.spawn_state
	}

	pub fn set_spawn_state(&mut self, state: SpawnState) {
		self.spawn_state = state;
	}

	pub fn is_spawning(&self) -> bool {
		self.spawn_state.contains(SpawnState::SPAWNING)
	}

	pub fn is_spawned(&self) -> bool {
		self.spawn_state.contains(SpawnState::SPAWNED)
	}

	/// Marks the cluster as spawning. Fails if a spawn is already running.
	pub fn begin_spawn(&mut self, progress: Subscriber<ClusterSpawnState>) -> Result<(), HordeError> {
		if self.is_spawning() {
			return Err(HordeError::AlreadySpawning);
		}
		self.spawn_state = SpawnState::SPAWNING;
		self.spawn_progress = Some(progress);
		Ok(())
	}

	pub fn spawn_progress(&self) -> Option<&Subscriber<ClusterSpawnState>> {
		self.spawn_progress.as_ref()
	}

	/// Reuses the cached entity generator when it still fits `players`, otherwise builds and caches a new one.
	pub fn prepare_entity_generator(&mut self, players: &PlayerGroup, rng: &mut WorldRandom) -> Result<&mut dyn EntityGenerator, HordeError> {
		let reusable = self.entity_generator.as_ref().is_some_and(|generator| generator.is_still_valid_for(players));
		if reusable {
			if let Some(generator) = self.entity_generator.as_mut() {
				generator.set_players(players);
			}
		} else {
			let fresh = self
				.definition
				.entity_generator(players, rng)
				.ok_or(HordeError::MissingEntityGenerator(self.definition.name()))?;
			self.entity_generator = Some(fresh);
		}

		match self.entity_generator.as_deref_mut() {
			Some(generator) => Ok(generator),
			None => Err(HordeError::MissingEntityGenerator(self.definition.name())),
		}
	}

	pub fn entity_generator_mut(&mut self) -> Option<&mut (dyn EntityGenerator + 'static)> {
		self.entity_generator.as_deref_mut()
	}
}

#[cfg(test)]
mod tests;
