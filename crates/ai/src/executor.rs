use std::sync::Arc;

use crate::{Agent, GeneratedCommand};

/// Result of advancing one executor slot.
#[derive(Debug, Clone)]
pub enum Step {
	/// Empty slot, or the command cannot execute against this agent right now.
	Idle,
	/// The command executed and still has work left.
	Running,
	/// The command executed and completed; the slot has been cleared.
	Completed(Arc<GeneratedCommand>),
}

impl Step {
	pub fn is_running(&self) -> bool {
		matches!(self, Self::Running)
	}
}

/// Drives a single generated-command slot against an agent.
///
/// The agent is lent on every call; the executor never owns it.
#[derive(Debug, Default)]
pub struct AgentExecutor {
	slot: Option<Arc<GeneratedCommand>>,
}

impl AgentExecutor {
	pub fn new() -> Self {
		Self::default()
	}

	pub fn command(&self) -> Option<&Arc<GeneratedCommand>> {
		self.slot.as_ref()
	}

	pub fn update(&mut self, agent: &mut dyn Agent, dt: f32) -> Step {
		let Some(generated) = self.slot.as_ref() else {
			return Step::Idle;
		};

		{
			let mut command = generated.shared().lock();
			if !command.can_execute(agent) {
				return Step::Idle;
			}
			command.execute(agent, dt);
			if !command.is_complete(agent) {
				return Step::Running;
			}
			tracing::trace!(command = command.name(), "ai.command_completed");
		}

		let generated = Arc::clone(generated);
		self.slot = None;
		generated.complete(agent);
		Step::Completed(generated)
	}

	/// Replaces the slot, interrupting the command it held.
	pub fn set_command(&mut self, agent: &mut dyn Agent, command: Option<Arc<GeneratedCommand>>) {
		if let Some(previous) = self.slot.take() {
			previous.interrupt(agent);
		}
		self.slot = command;
	}

	/// Replaces the slot without running interruption hooks.
	pub fn replace(&mut self, command: Option<Arc<GeneratedCommand>>) -> Option<Arc<GeneratedCommand>> {
		std::mem::replace(&mut self.slot, command)
	}
}

#[cfg(test)]
mod tests {
	use std::sync::Arc;
	use std::sync::atomic::{AtomicUsize, Ordering};

	use horde_primitives::Vec3;

	use super::*;
	use crate::commands::{GoToTargetCommand, SleepingCommand, WanderCommand};
	use crate::test_agent::TestAgent;

	fn counted(counter: &Arc<AtomicUsize>) -> impl Fn(&dyn crate::Command) + Send + Sync + 'static {
		let counter = Arc::clone(counter);
		move |_| {
			counter.fetch_add(1, Ordering::SeqCst);
		}
	}

	#[test]
	fn empty_slot_is_idle() {
		let mut executor = AgentExecutor::new();
		let mut agent = TestAgent::default();
		assert!(matches!(executor.update(&mut agent, 1.0), Step::Idle));
	}

	#[test]
	fn completion_runs_hooks_and_clears_slot() {
		let completed = Arc::new(AtomicUsize::new(0));
		let interrupted = Arc::new(AtomicUsize::new(0));
		let generated = GeneratedCommand::new(WanderCommand::new(1.0))
			.on_complete(counted(&completed))
			.on_interrupt(counted(&interrupted));

		let mut executor = AgentExecutor::new();
		let mut agent = TestAgent::default();
		executor.set_command(&mut agent, Some(Arc::new(generated)));

		assert!(executor.update(&mut agent, 0.5).is_running());
		assert!(matches!(executor.update(&mut agent, 0.5), Step::Completed(_)));
		assert!(executor.command().is_none());
		assert_eq!(completed.load(Ordering::SeqCst), 1);
		assert_eq!(interrupted.load(Ordering::SeqCst), 0);
	}

	#[test]
	fn set_command_interrupts_previous() {
		let interrupted = Arc::new(AtomicUsize::new(0));
		let mut executor = AgentExecutor::new();
		let mut agent = TestAgent::default();

		let sleeping = GeneratedCommand::new(SleepingCommand::new(60.0)).on_interrupt(counted(&interrupted));
		executor.set_command(&mut agent, Some(Arc::new(sleeping)));
		executor.update(&mut agent, 1.0);
		assert!(agent.sleeping);

		executor.set_command(&mut agent, Some(Arc::new(GeneratedCommand::new(WanderCommand::new(1.0)))));
		assert_eq!(interrupted.load(Ordering::SeqCst), 1);
		assert!(!agent.sleeping, "interruption hook wakes the agent");
	}

	#[test]
	fn non_executable_command_is_kept() {
		let mut executor = AgentExecutor::new();
		let mut agent = TestAgent::at(Vec3::ZERO);
		agent.target = Some(crate::Target {
			actor: horde_primitives::ActorId(9),
			location: Vec3::ZERO,
			is_player: true,
		});

		executor.replace(Some(Arc::new(GeneratedCommand::new(GoToTargetCommand::new(Vec3::new(50.0, 0.0, 0.0))))));
		assert!(matches!(executor.update(&mut agent, 1.0), Step::Idle));
		assert!(executor.command().is_some());
		assert_eq!(agent.moves, 0);
	}
}
