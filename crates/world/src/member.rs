use horde_primitives::{ActorId, ClassId, MemberId, Vec3};

use crate::{PlayerSnapshot, World};

/// One member of a cluster, with or without a live actor behind it.
///
/// While detached the member keeps its last known location and moves on its
/// own; once spawned the actor is authoritative and the cached location is
/// refreshed from it.
#[derive(Debug, Clone)]
pub struct ClusterMember {
	id: MemberId,
	class: ClassId,
	/// Reassigned on every respawn.
	actor: ActorId,
	location: Vec3,
	spawned: bool,
	awaiting_spawn_state_change: bool,
	horde_despawned: bool,
	sleeping: bool,
	ai_loaded: bool,
	/// Bumped on every AI load so a stale AI request can tell it was replaced.
	ai_epoch: u32,
	nearby: Option<(PlayerSnapshot, f32)>,
}

impl ClusterMember {
	/// A member whose actor was just spawned.
	pub fn spawned(id: MemberId, class: ClassId, actor: ActorId, location: Vec3) -> Self {
		Self {
			id,
			class,
			actor,
			location,
			spawned: true,
			awaiting_spawn_state_change: false,
			horde_despawned: false,
			sleeping: false,
			ai_loaded: false,
			ai_epoch: 0,
			nearby: None,
		}
	}

	/// A member without an actor.
	pub fn detached(id: MemberId, class: ClassId, actor: ActorId, location: Vec3) -> Self {
		Self {
			spawned: false,
			..Self::spawned(id, class, actor, location)
		}
	}

	pub fn id(&self) -> MemberId {
		self.id
	}

	pub fn class(&self) -> ClassId {
		self.class
	}

	pub fn actor(&self) -> ActorId {
		self.actor
	}

	/// Last known location.
	pub fn location(&self) -> Vec3 {
		self.location
	}

	pub fn is_spawned(&self) -> bool {
		self.spawned
	}

	pub fn is_awaiting_spawn_state_change(&self) -> bool {
		self.awaiting_spawn_state_change
	}

	pub fn set_awaiting_spawn_state_change(&mut self, awaiting: bool) {
		self.awaiting_spawn_state_change = awaiting;
	}

	pub fn is_horde_despawned(&self) -> bool {
		self.horde_despawned
	}

	/// Marks the whole horde as despawned; a respawn in flight despawns again immediately.
	pub fn notify_horde_despawned(&mut self) {
		self.horde_despawned = true;
	}

	pub fn is_ai_loaded(&self) -> bool {
		self.ai_loaded
	}

	/// Marks the AI as loaded and returns the epoch the new AI request must carry.
	pub fn load_ai(&mut self) -> u32 {
		self.ai_epoch = self.ai_epoch.wrapping_add(1);
		self.ai_loaded = true;
		self.ai_epoch
	}

	pub fn unload_ai(&mut self) {
		self.ai_loaded = false;
	}

	/// True while the AI request started at `epoch` is still the live one.
	pub fn runs_ai(&self, epoch: u32) -> bool {
		self.ai_loaded && self.ai_epoch == epoch
	}

	pub fn nearby(&self) -> Option<(PlayerSnapshot, f32)> {
		self.nearby
	}

	/// Remembers the closest of `players` for target acquisition.
	pub fn set_players_nearby(&mut self, players: &[PlayerSnapshot]) {
		let location = self.location;
		self.nearby = players
			.iter()
			.map(|player| (*player, player.location.distance(location)))
			.min_by(|a, b| a.1.total_cmp(&b.1));
	}

	/// Refreshes the cached location from the live actor.
	pub fn sync_location(&mut self, world: &dyn World) {
		if self.spawned
			&& let Some(actor) = world.actor(self.actor)
		{
			self.location = actor.location();
		}
	}

	/// Dead when spawned and the actor died or vanished. Detached members never die.
	pub fn is_dead(&self, world: &dyn World) -> bool {
		self.spawned && world.actor(self.actor).is_none_or(|actor| actor.is_dead())
	}

	/// Walks a detached member toward `target`.
	pub(crate) fn move_detached(&mut self, target: Vec3, speed: f32, dt: f32) {
		self.location = self.location.step_toward(target, speed * dt);
	}

	pub(crate) fn is_sleeping_detached(&self) -> bool {
		self.sleeping
	}

	pub(crate) fn set_sleeping_detached(&mut self, sleeping: bool) {
		self.sleeping = sleeping;
	}

	/// Removes the actor and freezes the member at its last location.
	pub fn despawn(&mut self, world: &mut dyn World) {
		if self.spawned {
			self.sync_location(world);
			world.remove_actor(self.actor);
		}
		self.spawned = false;
		self.awaiting_spawn_state_change = false;
	}

	/// Spawns a fresh actor for this member at `location`.
	///
	/// Returns false when the world refused the spawn, or when the horde was
	/// despawned in the meantime and the new actor was removed again.
	pub fn respawn(&mut self, world: &mut dyn World, location: Vec3) -> bool {
		let id = world.next_actor_id();
		let Some(actor) = world.spawn_actor(self.class, id, location) else {
			tracing::warn!(member = %self.id, location = ?self.location, "member.respawn_failed");
			self.awaiting_spawn_state_change = false;
			return false;
		};

		self.actor = actor;
		self.spawned = true;
		self.sync_location(world);

		if self.horde_despawned {
			self.despawn(world);
			return false;
		}
		self.awaiting_spawn_state_change = false;
		true
	}
}
