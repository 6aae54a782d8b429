use crate::{Agent, Command};

/// Puts the agent to sleep for a while. Any target wakes it early.
#[derive(Debug, Clone)]
pub struct SleepingCommand {
	sleep_time: f32,
}

impl SleepingCommand {
	pub fn new(sleep_time: f32) -> Self {
		Self { sleep_time }
	}

	fn wake(agent: &mut dyn Agent) {
		if agent.is_sleeping() {
			agent.wake_up();
		}
	}
}

impl Command for SleepingCommand {
	fn can_execute(&self, _agent: &dyn Agent) -> bool {
		true
	}

	fn execute(&mut self, agent: &mut dyn Agent, dt: f32) {
		self.sleep_time -= dt;
		if !agent.is_sleeping() {
			agent.sleep();
		}
	}

	fn is_complete(&self, agent: &dyn Agent) -> bool {
		self.sleep_time <= 0.0 || agent.target().is_some()
	}

	fn objective_score(&self, _agent: &dyn Agent) -> i32 {
		// Truncate before scaling.
		(self.sleep_time as i32).saturating_mul(10)
	}

	fn on_completed(&mut self, agent: &mut dyn Agent) {
		Self::wake(agent);
	}

	fn on_interrupted(&mut self, agent: &mut dyn Agent) {
		Self::wake(agent);
	}

	fn remaining_time(&self) -> Option<f32> {
		Some(self.sleep_time)
	}

	fn name(&self) -> &'static str {
		"sleeping"
	}
}
