use std::sync::Arc;
use std::time::{Duration, Instant};

use parking_lot::Mutex;

use crate::Agent;

/// Optional deadline attached to a command when it is created.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CommandExpiry {
	pub assigned_at: Instant,
	pub timeout: Duration,
}

impl CommandExpiry {
	/// Expiry starting now.
	pub fn after(timeout: Duration) -> Self {
		Self {
			assigned_at: Instant::now(),
			timeout,
		}
	}

	pub fn has_expired_at(&self, now: Instant) -> bool {
		now.saturating_duration_since(self.assigned_at) > self.timeout
	}

	pub fn has_expired(&self) -> bool {
		self.has_expired_at(Instant::now())
	}
}

/// One unit of behavior.
///
/// Commands may carry their own progress (remaining wander time and the like)
/// and are executed against whichever agent currently holds them.
pub trait Command: Send {
	fn can_execute(&self, agent: &dyn Agent) -> bool;

	fn execute(&mut self, agent: &mut dyn Agent, dt: f32);

	fn is_complete(&self, agent: &dyn Agent) -> bool;

	/// Urgency of this command for `agent`. Lower is more urgent.
	fn objective_score(&self, agent: &dyn Agent) -> i32;

	fn on_completed(&mut self, _agent: &mut dyn Agent) {}

	fn on_interrupted(&mut self, _agent: &mut dyn Agent) {}

	fn expiry(&self) -> Option<CommandExpiry> {
		None
	}

	fn has_expired(&self) -> bool {
		self.expiry().is_some_and(|expiry| expiry.has_expired())
	}

	/// Time left for timed commands.
	fn remaining_time(&self) -> Option<f32> {
		None
	}

	fn name(&self) -> &'static str {
		std::any::type_name::<Self>()
	}
}

/// A command shared between the executors that mirror it.
pub type SharedCommand = Arc<Mutex<Box<dyn Command>>>;

/// Callback run with the command that completed or was interrupted.
pub type CommandCallback = Box<dyn Fn(&dyn Command) + Send + Sync>;

/// A command plus the completion and interruption callbacks of whoever generated it.
///
/// Executor slots hold `Arc<GeneratedCommand>`; two slots refer to the same
/// generated command exactly when their `Arc`s are pointer-equal.
pub struct GeneratedCommand {
	command: SharedCommand,
	on_complete: Option<CommandCallback>,
	on_interrupt: Option<CommandCallback>,
}

impl std::fmt::Debug for GeneratedCommand {
	fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
		f.debug_struct("GeneratedCommand")
			.field("command", &self.name())
			.field("on_complete", &self.on_complete.is_some())
			.field("on_interrupt", &self.on_interrupt.is_some())
			.finish()
	}
}

impl GeneratedCommand {
	pub fn new(command: impl Command + 'static) -> Self {
		Self::from_boxed(Box::new(command))
	}

	pub fn from_boxed(command: Box<dyn Command>) -> Self {
		Self::from_shared(Arc::new(Mutex::new(command)))
	}

	/// Wraps an existing shared command without callbacks.
	pub fn from_shared(command: SharedCommand) -> Self {
		Self {
			command,
			on_complete: None,
			on_interrupt: None,
		}
	}

	pub fn on_complete(mut self, callback: impl Fn(&dyn Command) + Send + Sync + 'static) -> Self {
		self.on_complete = Some(Box::new(callback));
		self
	}

	pub fn on_interrupt(mut self, callback: impl Fn(&dyn Command) + Send + Sync + 'static) -> Self {
		self.on_interrupt = Some(Box::new(callback));
		self
	}

	pub fn shared(&self) -> &SharedCommand {
		&self.command
	}

	pub fn name(&self) -> &'static str {
		self.command.lock().name()
	}

	pub fn objective_score(&self, agent: &dyn Agent) -> i32 {
		self.command.lock().objective_score(agent)
	}

	pub fn has_expired(&self) -> bool {
		self.command.lock().has_expired()
	}

	/// Runs the command's completion hook, then the generator's callback.
	pub(crate) fn complete(&self, agent: &mut dyn Agent) {
		let mut command = self.command.lock();
		command.on_completed(agent);
		if let Some(callback) = &self.on_complete {
			callback(&**command);
		}
	}

	/// Runs the command's interruption hook, then the generator's callback.
	pub(crate) fn interrupt(&self, agent: &mut dyn Agent) {
		let mut command = self.command.lock();
		command.on_interrupted(agent);
		if let Some(callback) = &self.on_interrupt {
			callback(&**command);
		}
	}
}

/// Slot identity: both empty, or both holding the same generated command.
pub fn same_command(a: Option<&Arc<GeneratedCommand>>, b: Option<&Arc<GeneratedCommand>>) -> bool {
	match (a, b) {
		(Some(a), Some(b)) => Arc::ptr_eq(a, b),
		(None, None) => true,
		_ => false,
	}
}
