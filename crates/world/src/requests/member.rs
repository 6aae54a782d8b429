use horde_primitives::MemberId;
use horde_worker::MainThreadRequest;

use super::{SpawnedCounter, count_despawned, count_spawned};
use crate::{SharedCluster, World};

/// Radius searched around a detached member's last location when it respawns.
pub const RESPAWN_SPREAD: f32 = 8.0;

/// Brings one detached member back into the world near where it was left.
///
/// Done once the member is spawned with no state change pending, or once it
/// no longer needs one (removed, or its horde despawned).
#[derive(Debug)]
pub struct MemberSpawnRequest {
	cluster: SharedCluster,
	member: MemberId,
	spawned: SpawnedCounter,
	done: bool,
}

impl MemberSpawnRequest {
	/// The caller marks the member as awaiting a state change before submitting.
	pub fn new(cluster: SharedCluster, member: MemberId, spawned: SpawnedCounter) -> Self {
		Self {
			cluster,
			member,
			spawned,
			done: false,
		}
	}
}

impl MainThreadRequest<dyn World> for MemberSpawnRequest {
	fn tick_execute(&mut self, world: &mut (dyn World + 'static), _dt: f32) -> Result<(), String> {
		let mut cluster = self.cluster.lock();
		let Some(member) = cluster.member_mut(self.member) else {
			self.done = true;
			return Ok(());
		};

		if !member.is_spawned() && !member.is_horde_despawned() {
			let location = world.find_valid_spawn_point(member.location(), 0.0, RESPAWN_SPREAD).unwrap_or(member.location());
			if member.respawn(world, location) {
				count_spawned(&self.spawned);
			} else if !member.is_horde_despawned() {
				member.set_awaiting_spawn_state_change(true);
			}
		}

		self.done = member.is_horde_despawned() || (member.is_spawned() && !member.is_awaiting_spawn_state_change());
		Ok(())
	}

	fn is_done(&self) -> bool {
		self.done
	}

	fn name(&self) -> &'static str {
		"member_spawn"
	}
}

/// Removes one member's actor while leaving it in its cluster.
#[derive(Debug)]
pub struct MemberDespawnRequest {
	cluster: SharedCluster,
	member: MemberId,
	spawned: SpawnedCounter,
	done: bool,
}

impl MemberDespawnRequest {
	/// The caller marks the member as awaiting a state change before submitting.
	pub fn new(cluster: SharedCluster, member: MemberId, spawned: SpawnedCounter) -> Self {
		Self {
			cluster,
			member,
			spawned,
			done: false,
		}
	}
}

impl MainThreadRequest<dyn World> for MemberDespawnRequest {
	fn tick_execute(&mut self, world: &mut (dyn World + 'static), _dt: f32) -> Result<(), String> {
		let mut cluster = self.cluster.lock();
		let Some(member) = cluster.member_mut(self.member) else {
			self.done = true;
			return Ok(());
		};

		if member.is_spawned() {
			member.despawn(world);
			count_despawned(&self.spawned);
		} else {
			member.set_awaiting_spawn_state_change(false);
		}
		self.done = !member.is_spawned() && !member.is_awaiting_spawn_state_change();
		Ok(())
	}

	fn is_done(&self) -> bool {
		self.done
	}

	fn name(&self) -> &'static str {
		"member_despawn"
	}
}
