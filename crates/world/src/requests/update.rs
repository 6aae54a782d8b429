use std::sync::Arc;

use horde_primitives::{MemberId, Vec3};
use horde_worker::MainThreadRequest;

use crate::{SharedCluster, World};

/// Single-shot sync of a spawned horde with its live actors.
///
/// Refreshes every spawned member's cached location, computes the horde
/// position as their mean and collects dead members for the tracker to reap.
#[derive(Debug)]
pub struct ClusterUpdateRequest {
	clusters: Vec<SharedCluster>,
	position: Option<Vec3>,
	dead: Vec<(usize, MemberId)>,
	done: bool,
}

impl ClusterUpdateRequest {
	pub fn new(clusters: &[SharedCluster]) -> Self {
		Self {
			clusters: clusters.iter().map(Arc::clone).collect(),
			position: None,
			dead: Vec::new(),
			done: false,
		}
	}

	/// Mean location of the spawned members, `None` when none were spawned.
	pub fn position(&self) -> Option<Vec3> {
		self.position
	}

	/// Dead members as `(cluster index, member)`.
	pub fn dead(&self) -> &[(usize, MemberId)] {
		&self.dead
	}
}

impl MainThreadRequest<dyn World> for ClusterUpdateRequest {
	fn tick_execute(&mut self, world: &mut (dyn World + 'static), _dt: f32) -> Result<(), String> {
		let mut locations = Vec::new();
		for (index, cluster) in self.clusters.iter().enumerate() {
			let mut cluster = cluster.lock();
			for member in cluster.members_mut() {
				if !member.is_spawned() {
					continue;
				}
				if member.is_dead(&*world) {
					self.dead.push((index, member.id()));
					continue;
				}
				member.sync_location(&*world);
				locations.push(member.location());
			}
		}

		self.position = Vec3::mean(locations);
		self.done = true;
		Ok(())
	}

	fn is_done(&self) -> bool {
		self.done
	}

	fn name(&self) -> &'static str {
		"cluster_update"
	}
}
