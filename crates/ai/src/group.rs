use std::collections::{HashMap, VecDeque};
use std::sync::Arc;

use horde_primitives::{MemberId, WorldRandom};
use parking_lot::Mutex;

use crate::executor::{AgentExecutor, Step};
use crate::{Agent, Command, CommandGenerator, GeneratedCommand, SharedCommand, same_command};

/// Pending command reseed for one member, applied on the member's next update.
#[derive(Debug, Clone, Default)]
pub struct MemberLink {
	inbox: Arc<Mutex<Option<Option<Arc<GeneratedCommand>>>>>,
}

impl MemberLink {
	fn post(&self, command: Option<Arc<GeneratedCommand>>) {
		*self.inbox.lock() = Some(command);
	}

	/// Takes the pending reseed, if the group posted one since the last call.
	pub(crate) fn take(&self) -> Option<Option<Arc<GeneratedCommand>>> {
		self.inbox.lock().take()
	}
}

struct GroupState {
	base: AgentExecutor,
	/// Front is the top of the stack.
	interrupts: VecDeque<SharedCommand>,
	generator: Option<Box<dyn CommandGenerator>>,
	rng: WorldRandom,
	members: HashMap<MemberId, MemberLink>,
}

impl GroupState {
	fn command(&self) -> Option<Arc<GeneratedCommand>> {
		match self.interrupts.front() {
			Some(top) => Some(Arc::new(GeneratedCommand::from_shared(Arc::clone(top)))),
			None => self.base.command().cloned(),
		}
	}

	fn regenerate(&mut self) -> Option<Arc<GeneratedCommand>> {
		let generator = self.generator.as_mut()?;
		generator.generate_next(&mut self.rng)
	}

	/// Returns true when an interrupt consumed the tick.
	fn update_interrupts(&mut self, agent: &mut dyn Agent, dt: f32) -> bool {
		let Some(top) = self.interrupts.front() else {
			return false;
		};

		{
			let mut command = top.lock();
			if !command.can_execute(agent) {
				return false;
			}
			command.execute(agent, dt);
			if !command.is_complete(agent) {
				return true;
			}
			command.on_completed(agent);
			tracing::trace!(command = command.name(), "ai.interrupt_completed");
		}

		self.interrupts.pop_front();
		while self.interrupts.front().is_some_and(|next| next.lock().has_expired()) {
			self.interrupts.pop_front();
		}
		false
	}
}

/// Executor for a group agent, shared with the executors of its members.
///
/// Holds the group's base command slot plus an interrupt stack layered above
/// it. Clones share state.
#[derive(Clone)]
pub struct GroupExecutor {
	inner: Arc<Mutex<GroupState>>,
}

impl std::fmt::Debug for GroupExecutor {
	fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
		let state = self.inner.lock();
		f.debug_struct("GroupExecutor")
			.field("base", &state.base.command())
			.field("interrupts", &state.interrupts.len())
			.field("members", &state.members.len())
			.finish()
	}
}

impl GroupExecutor {
	pub fn new(generator: Option<Box<dyn CommandGenerator>>, rng: WorldRandom) -> Self {
		Self {
			inner: Arc::new(Mutex::new(GroupState {
				base: AgentExecutor::new(),
				interrupts: VecDeque::new(),
				generator,
				rng,
				members: HashMap::new(),
			})),
		}
	}

	/// The top interrupt wrapped as a throwaway generated command, else the base slot.
	pub fn command(&self) -> Option<Arc<GeneratedCommand>> {
		self.inner.lock().command()
	}

	/// The base slot, ignoring interrupts.
	pub fn base_command(&self) -> Option<Arc<GeneratedCommand>> {
		self.inner.lock().base.command().cloned()
	}

	pub fn interrupt_count(&self) -> usize {
		self.inner.lock().interrupts.len()
	}

	/// Replaces the whole interrupt stack (first command on top) and regenerates the base command.
	///
	/// Every registered member is reseeded with the new top command.
	pub fn interrupt(&self, agent: &mut dyn Agent, commands: Vec<Box<dyn Command>>) {
		let mut state = self.inner.lock();
		state.interrupts = commands.into_iter().map(|command| Arc::new(Mutex::new(command))).collect();

		let current = state.command();
		for link in state.members.values() {
			link.post(current.clone());
		}

		let next = state.regenerate();
		state.base.set_command(agent, next);
		tracing::debug!(interrupts = state.interrupts.len(), members = state.members.len(), "ai.group_interrupted");
	}

	/// Advances the group by one tick. Interrupts pre-empt the base command.
	pub fn update(&self, agent: &mut dyn Agent, dt: f32) {
		let mut state = self.inner.lock();
		if state.update_interrupts(agent, dt) {
			return;
		}

		match state.base.update(agent, dt) {
			Step::Running => {}
			Step::Completed(_) => {
				let next = state.regenerate();
				state.base.replace(next);
			}
			// Empty, or the base command cannot execute against the group agent.
			Step::Idle if state.base.command().is_none() || state.generator.is_some() => {
				let next = state.regenerate();
				state.base.replace(next);
			}
			Step::Idle => {}
		}
	}

	/// Pulls the group's next command for a member whose slot held `current`.
	///
	/// Pops one interrupt first. Otherwise the base command is regenerated only
	/// when it is still `current`, so the first member to notice a stale
	/// command advances it and the rest pick up the replacement.
	pub fn next_command(&self, current: Option<&Arc<GeneratedCommand>>) -> Option<Arc<GeneratedCommand>> {
		let mut state = self.inner.lock();
		if state.interrupts.pop_front().is_some()
			&& let Some(top) = state.interrupts.front()
		{
			return Some(Arc::new(GeneratedCommand::from_shared(Arc::clone(top))));
		}

		if same_command(state.base.command(), current) && state.generator.is_some() {
			let next = state.regenerate();
			state.base.replace(next);
		}
		state.base.command().cloned()
	}

	/// `score(base) - average(score(interrupts))`. Lower is more urgent.
	pub fn objective_score(&self, agent: &dyn Agent) -> i32 {
		let state = self.inner.lock();
		let base = state.base.command().map_or(0, |command| command.objective_score(agent));

		let count = state.interrupts.len() as i32;
		let interrupts = if count > 0 {
			let total: i32 = state.interrupts.iter().map(|command| command.lock().objective_score(agent)).sum();
			total / count
		} else {
			0
		};

		base - interrupts
	}

	/// Registers a member executor and seeds it with the group's current command.
	pub fn register(&self, member: MemberId) -> MemberLink {
		let mut state = self.inner.lock();
		let link = MemberLink::default();
		link.post(state.command());
		state.members.insert(member, link.clone());
		link
	}

	pub fn unregister(&self, member: MemberId) {
		self.inner.lock().members.remove(&member);
	}

	/// Unregisters `member` only while `link` is still its registration.
	pub(crate) fn release(&self, member: MemberId, link: &MemberLink) {
		let mut state = self.inner.lock();
		if state.members.get(&member).is_some_and(|current| Arc::ptr_eq(&current.inbox, &link.inbox)) {
			state.members.remove(&member);
		}
	}

	pub fn member_count(&self) -> usize {
		self.inner.lock().members.len()
	}
}
