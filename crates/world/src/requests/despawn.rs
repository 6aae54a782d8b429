use std::collections::VecDeque;
use std::sync::Arc;

use horde_primitives::MemberId;
use horde_worker::MainThreadRequest;

use super::{SpawnedCounter, count_despawned};
use crate::{SharedCluster, SpawnState, World};

/// Removes the actors of a whole horde, one member per tick.
///
/// Members stay in their clusters while the queue drains so their AI and
/// respawn requests observe the horde despawn. The clusters are emptied on
/// cleanup; their density is kept.
pub struct ClusterDespawnRequest {
	clusters: Vec<SharedCluster>,
	queue: VecDeque<(usize, MemberId)>,
	spawned: SpawnedCounter,
}

impl std::fmt::Debug for ClusterDespawnRequest {
	fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
		f.debug_struct("ClusterDespawnRequest")
			.field("clusters", &self.clusters.len())
			.field("queued", &self.queue.len())
			.finish()
	}
}

impl ClusterDespawnRequest {
	/// Queues every current member and marks the clusters as despawning.
	pub fn new(clusters: &[SharedCluster], spawned: SpawnedCounter) -> Self {
		let mut queue = VecDeque::new();
		for (index, cluster) in clusters.iter().enumerate() {
			let mut cluster = cluster.lock();
			cluster.set_spawn_state(SpawnState::DESPAWNING);
			queue.extend(cluster.members().iter().map(|member| (index, member.id())));
		}

		Self {
			clusters: clusters.iter().map(Arc::clone).collect(),
			queue,
			spawned,
		}
	}

	pub fn remaining(&self) -> usize {
		self.queue.len()
	}
}

impl MainThreadRequest<dyn World> for ClusterDespawnRequest {
	fn tick_execute(&mut self, world: &mut (dyn World + 'static), _dt: f32) -> Result<(), String> {
		let Some((index, id)) = self.queue.pop_front() else {
			return Ok(());
		};
		let Some(cluster) = self.clusters.get(index) else {
			return Err(format!("despawn queued cluster {index} that is not tracked"));
		};

		let mut cluster = cluster.lock();
		if let Some(member) = cluster.member_mut(id) {
			if member.is_spawned() {
				member.despawn(world);
				count_despawned(&self.spawned);
			}
			member.notify_horde_despawned();
			member.unload_ai();
		}
		Ok(())
	}

	fn is_done(&self) -> bool {
		self.queue.is_empty()
	}

	fn on_cleanup(&mut self, _world: &mut (dyn World + 'static)) {
		let mut cleared = 0;
		for cluster in &self.clusters {
			let mut cluster = cluster.lock();
			cleared += cluster.clear_members().len();
			cluster.set_spawn_state(SpawnState::DESPAWNED);
		}
		tracing::debug!(clusters = self.clusters.len(), members = cleared, "despawn.finished");
	}

	fn name(&self) -> &'static str {
		"cluster_despawn"
	}
}
