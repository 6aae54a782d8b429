use std::time::Duration;

use horde_primitives::Vec3;

use crate::{Agent, Command, CommandExpiry};

/// Horizontal distance at which a move counts as arrived.
pub const MIN_DISTANCE_TO_TARGET: f32 = 10.0;

/// Moves the agent toward a fixed location.
///
/// Yields to player combat: it cannot execute while the agent is targeting a player.
#[derive(Debug, Clone)]
pub struct GoToTargetCommand {
	target: Vec3,
	expiry: Option<CommandExpiry>,
}

impl GoToTargetCommand {
	pub fn new(target: Vec3) -> Self {
		Self { target, expiry: None }
	}

	/// Command that expires `timeout` after creation.
	pub fn expiring(target: Vec3, timeout: Duration) -> Self {
		Self {
			target,
			expiry: Some(CommandExpiry::after(timeout)),
		}
	}

	pub fn target(&self) -> Vec3 {
		self.target
	}
}

impl Command for GoToTargetCommand {
	fn can_execute(&self, agent: &dyn Agent) -> bool {
		agent.target().is_none_or(|target| !target.is_player)
	}

	fn execute(&mut self, agent: &mut dyn Agent, dt: f32) {
		agent.move_to(self.target, dt);
	}

	fn is_complete(&self, agent: &dyn Agent) -> bool {
		agent.location().distance_xz(self.target) < MIN_DISTANCE_TO_TARGET
	}

	fn objective_score(&self, agent: &dyn Agent) -> i32 {
		agent.location().distance_xz(self.target).floor() as i32
	}

	fn expiry(&self) -> Option<CommandExpiry> {
		self.expiry
	}

	fn name(&self) -> &'static str {
		"go_to_target"
	}
}
