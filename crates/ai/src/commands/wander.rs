use crate::{Agent, Command};

/// Lingers in place until its wander time runs out.
#[derive(Debug, Clone)]
pub struct WanderCommand {
	wander_time: f32,
}

impl WanderCommand {
	pub fn new(wander_time: f32) -> Self {
		Self { wander_time }
	}

	pub fn wander_time(&self) -> f32 {
		self.wander_time
	}
}

impl Command for WanderCommand {
	fn can_execute(&self, _agent: &dyn Agent) -> bool {
		true
	}

	fn execute(&mut self, _agent: &mut dyn Agent, dt: f32) {
		self.wander_time -= dt;
	}

	fn is_complete(&self, _agent: &dyn Agent) -> bool {
		self.wander_time <= 0.0
	}

	fn objective_score(&self, _agent: &dyn Agent) -> i32 {
		(self.wander_time * 10.0) as i32
	}

	fn remaining_time(&self) -> Option<f32> {
		Some(self.wander_time)
	}

	fn name(&self) -> &'static str {
		"wander"
	}
}
