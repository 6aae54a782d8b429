use std::sync::Arc;

use horde_ai::{GroupExecutor, MemberExecutor};
use horde_primitives::{MemberId, WorldRandom};
use horde_worker::MainThreadRequest;

use super::WorldRequests;
use crate::{ClusterMember, HordeDefinition, MemberAgent, SharedCluster, World};

/// Ticks one member's executor once per main-context tick.
///
/// Done when the member is gone, dead, or its AI was unloaded or handed to a
/// newer request.
pub struct MemberAiRequest {
	executor: MemberExecutor,
	cluster: SharedCluster,
	member: MemberId,
	epoch: u32,
	walk_speed: f32,
	dead: bool,
	done: bool,
}

impl std::fmt::Debug for MemberAiRequest {
	fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
		f.debug_struct("MemberAiRequest")
			.field("member", &self.member)
			.field("epoch", &self.epoch)
			.field("done", &self.done)
			.finish()
	}
}

impl MemberAiRequest {
	pub fn new(executor: MemberExecutor, cluster: SharedCluster, epoch: u32, walk_speed: f32) -> Self {
		Self {
			member: executor.member(),
			executor,
			cluster,
			epoch,
			walk_speed,
			dead: false,
			done: false,
		}
	}

	pub fn executor(&self) -> &MemberExecutor {
		&self.executor
	}
}

impl MainThreadRequest<dyn World> for MemberAiRequest {
	fn tick_execute(&mut self, world: &mut (dyn World + 'static), dt: f32) -> Result<(), String> {
		let mut cluster = self.cluster.lock();
		let Some(member) = cluster.member_mut(self.member) else {
			self.done = true;
			return Ok(());
		};
		if !member.runs_ai(self.epoch) {
			self.done = true;
			return Ok(());
		}
		if member.is_dead(&*world) {
			self.dead = true;
			self.done = true;
			return Ok(());
		}

		let mut agent = MemberAgent::new(world, member, self.walk_speed);
		self.executor.update(&mut agent, dt);
		Ok(())
	}

	fn is_done(&self) -> bool {
		self.done
	}

	fn on_cleanup(&mut self, _world: &mut (dyn World + 'static)) {
		self.executor.set_loaded(false);
		if self.dead {
			self.executor.unregister();
			tracing::trace!(member = %self.member, "ai.member_died");
		}
	}

	fn name(&self) -> &'static str {
		"member_ai"
	}
}

/// Starts member AI requests for one cluster of a horde.
#[derive(Clone)]
pub struct AiLauncher {
	requests: WorldRequests,
	group: GroupExecutor,
	cluster: SharedCluster,
	definition: Arc<dyn HordeDefinition>,
	sight_range: f32,
	seed: u64,
}

impl std::fmt::Debug for AiLauncher {
	fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
		f.debug_struct("AiLauncher")
			.field("definition", &self.definition.name())
			.field("sight_range", &self.sight_range)
			.field("seed", &self.seed)
			.finish()
	}
}

impl AiLauncher {
	pub fn new(requests: WorldRequests, group: GroupExecutor, cluster: SharedCluster, definition: Arc<dyn HordeDefinition>, sight_range: f32, seed: u64) -> Self {
		Self {
			requests,
			group,
			cluster,
			definition,
			sight_range,
			seed,
		}
	}

	/// Loads the member's AI and queues the request that runs it.
	///
	/// Never locks the cluster, so callers may hold it.
	pub fn launch(&self, member: &mut ClusterMember) {
		let epoch = member.load_ai();
		let rng = WorldRandom::seeded(self.seed ^ member.id().0.rotate_left(17) ^ u64::from(epoch));
		let executor = MemberExecutor::new(member.id(), self.group.clone(), self.definition.member_commands(), self.sight_range, rng);
		let request = MemberAiRequest::new(executor, Arc::clone(&self.cluster), epoch, self.definition.walk_speed());

		if let Err(err) = self.requests.submit(request) {
			tracing::warn!(member = %member.id(), error = %err, "ai.launch_failed");
			member.unload_ai();
		}
	}
}
