use std::sync::Arc;

use horde_primitives::{MemberId, WorldRandom};

use crate::executor::{AgentExecutor, Step};
use crate::{Agent, CommandGenerator, GeneratedCommand, GroupExecutor, MemberLink};

/// Noise level at which a nearby player gives themselves away.
pub const LOUD_PLAYER_NOISE: f32 = 0.85;

/// Executor for one loaded member of a group.
///
/// Runs two peer layers each tick: the member's own command stream, and a
/// mirror of the group's command. The member's own stream wins the tick while
/// it has a running command; the group layer fills the remainder.
pub struct MemberExecutor {
	member: MemberId,
	group: GroupExecutor,
	link: MemberLink,
	slot: AgentExecutor,
	own: AgentExecutor,
	own_generator: Option<Box<dyn CommandGenerator>>,
	sight_range: f32,
	rng: WorldRandom,
	loaded: bool,
}

impl std::fmt::Debug for MemberExecutor {
	fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
		f.debug_struct("MemberExecutor")
			.field("member", &self.member)
			.field("slot", &self.slot)
			.field("own", &self.own)
			.field("loaded", &self.loaded)
			.finish()
	}
}

impl MemberExecutor {
	/// Creates an executor and registers it with `group`.
	///
	/// `sight_range` is the distance within which a loud player is noticed
	/// without line of sight.
	pub fn new(member: MemberId, group: GroupExecutor, own_generator: Option<Box<dyn CommandGenerator>>, sight_range: f32, rng: WorldRandom) -> Self {
		let link = group.register(member);
		Self {
			member,
			group,
			link,
			slot: AgentExecutor::new(),
			own: AgentExecutor::new(),
			own_generator,
			sight_range,
			rng,
			loaded: true,
		}
	}

	pub fn member(&self) -> MemberId {
		self.member
	}

	pub fn group(&self) -> &GroupExecutor {
		&self.group
	}

	/// The mirrored group command.
	pub fn command(&self) -> Option<&Arc<GeneratedCommand>> {
		self.slot.command()
	}

	/// The member's own command.
	pub fn own_command(&self) -> Option<&Arc<GeneratedCommand>> {
		self.own.command()
	}

	pub fn is_loaded(&self) -> bool {
		self.loaded
	}

	pub fn set_loaded(&mut self, loaded: bool) {
		self.loaded = loaded;
	}

	/// Removes this member from the group's reseed list.
	pub fn unregister(&self) {
		self.group.release(self.member, &self.link);
	}

	pub fn update(&mut self, agent: &mut dyn Agent, dt: f32) {
		if let Some(seed) = self.link.take() {
			self.slot.set_command(agent, seed);
		}

		if let Some(nearby) = agent.nearest_player()
			&& (nearby.visible || (nearby.distance <= self.sight_range && nearby.noise >= LOUD_PLAYER_NOISE))
		{
			agent.set_target(nearby.target);
		}

		if let Some(generator) = self.own_generator.as_mut() {
			match self.own.update(agent, dt) {
				Step::Running => return,
				Step::Completed(_) => {
					let next = generator.generate_next(&mut self.rng);
					self.own.replace(next);
				}
				Step::Idle => {
					if self.own.command().is_none() {
						let next = generator.generate_next(&mut self.rng);
						self.own.replace(next);
					}
				}
			}
		}

		match self.slot.update(agent, dt) {
			Step::Running => {}
			Step::Completed(done) => {
				let next = self.group.next_command(Some(&done));
				self.slot.replace(next);
			}
			Step::Idle if self.slot.command().is_none() => {
				let next = self.group.next_command(None);
				self.slot.replace(next);
			}
			Step::Idle => {
				// Blocked on this member only: follow the group without advancing it.
				let current = self.group.command();
				if !crate::same_command(current.as_ref(), self.slot.command()) {
					self.slot.set_command(agent, current);
				}
			}
		}
	}
}

impl Drop for MemberExecutor {
	fn drop(&mut self) {
		self.group.release(self.member, &self.link);
	}
}
