use horde_ai::{Agent, NearbyPlayer, Target};
use horde_primitives::Vec3;

use crate::{ClusterMember, World};

/// A cluster member lent to the command executors for one tick.
///
/// Spawned members delegate to their actor; detached members walk their
/// cached location at `walk_speed`.
pub struct MemberAgent<'a> {
	world: &'a mut dyn World,
	member: &'a mut ClusterMember,
	walk_speed: f32,
}

impl<'a> MemberAgent<'a> {
	pub fn new(world: &'a mut dyn World, member: &'a mut ClusterMember, walk_speed: f32) -> Self {
		Self { world, member, walk_speed }
	}

	fn spawned(&self) -> bool {
		self.member.is_spawned()
	}
}

impl Agent for MemberAgent<'_> {
	fn move_to(&mut self, location: Vec3, dt: f32) {
		if !self.spawned() {
			self.member.move_detached(location, self.walk_speed, dt);
			return;
		}
		if let Some(actor) = self.world.actor_mut(self.member.actor()) {
			actor.move_to(location, dt);
		}
	}

	fn stop(&mut self) {
		if self.spawned()
			&& let Some(actor) = self.world.actor_mut(self.member.actor())
		{
			actor.stop();
		}
	}

	fn is_moving(&self) -> bool {
		self.spawned() && self.world.actor(self.member.actor()).is_some_and(|actor| actor.is_moving())
	}

	fn location(&self) -> Vec3 {
		if self.spawned()
			&& let Some(actor) = self.world.actor(self.member.actor())
		{
			return actor.location();
		}
		self.member.location()
	}

	fn target(&self) -> Option<Target> {
		if !self.spawned() {
			return None;
		}
		self.world.actor(self.member.actor()).and_then(|actor| actor.target())
	}

	fn set_target(&mut self, target: Target) {
		if self.spawned()
			&& let Some(actor) = self.world.actor_mut(self.member.actor())
		{
			actor.set_target(target);
		}
	}

	fn is_dead(&self) -> bool {
		self.member.is_dead(&*self.world)
	}

	fn sleep(&mut self) {
		match self.world.actor_mut(self.member.actor()) {
			Some(actor) if self.member.is_spawned() => actor.sleep(),
			_ => self.member.set_sleeping_detached(true),
		}
	}

	fn wake_up(&mut self) {
		match self.world.actor_mut(self.member.actor()) {
			Some(actor) if self.member.is_spawned() => actor.wake_up(),
			_ => self.member.set_sleeping_detached(false),
		}
	}

	fn is_sleeping(&self) -> bool {
		match self.world.actor(self.member.actor()) {
			Some(actor) if self.spawned() => actor.is_sleeping(),
			_ => self.member.is_sleeping_detached(),
		}
	}

	fn nearest_player(&self) -> Option<NearbyPlayer> {
		let (player, distance) = self.member.nearby()?;
		let visible = self.spawned() && self.world.actor(self.member.actor()).is_some_and(|actor| actor.can_see(player.location));
		Some(NearbyPlayer {
			target: player.as_target(),
			distance,
			visible,
			noise: player.noise,
		})
	}
}
