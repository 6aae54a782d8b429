use std::sync::Arc;

use crossbeam_channel::{Receiver, Sender};
use horde_primitives::WorldRandom;

use crate::{Command, GeneratedCommand};

/// Yields the next command for an executor slot.
pub trait CommandGenerator: Send {
	fn generate_next(&mut self, rng: &mut WorldRandom) -> Option<Arc<GeneratedCommand>>;
}

/// A command emitted by a [`StateMachine`] together with the events its outcome feeds back.
pub struct Transition<E> {
	pub command: Box<dyn Command>,
	/// Event posted when the command completes.
	pub on_complete: Option<E>,
	/// Builds the event posted when the command is interrupted.
	pub on_interrupt: Option<fn(&dyn Command) -> E>,
}

impl<E> Transition<E> {
	pub fn new(command: impl Command + 'static) -> Self {
		Self {
			command: Box::new(command),
			on_complete: None,
			on_interrupt: None,
		}
	}

	pub fn on_complete(mut self, event: E) -> Self {
		self.on_complete = Some(event);
		self
	}

	pub fn on_interrupt(mut self, event: fn(&dyn Command) -> E) -> Self {
		self.on_interrupt = Some(event);
		self
	}
}

/// A per-agent state machine whose transitions pick commands.
///
/// Both functions are pure over the state: command outcomes never touch the
/// state directly, they come back as events folded in before the next transition.
pub trait StateMachine: Send {
	type State: Clone + Send;
	type Event: Clone + Send + Sync + 'static;

	/// Folds one command outcome into the state.
	fn apply(&self, state: Self::State, event: Self::Event) -> Self::State;

	/// Chooses the next command, if any.
	fn transition(&self, state: Self::State, rng: &mut WorldRandom) -> (Self::State, Option<Transition<Self::Event>>);
}

/// Outcome event tagged with the emission it belongs to.
type Tagged<E> = (u64, E);

/// [`CommandGenerator`] driving a [`StateMachine`].
///
/// Each emitted command gets a fresh epoch. Only the first event carrying the
/// current epoch is applied; events from older commands, or repeated outcomes
/// of one command reported by several mirroring executors, are dropped.
pub struct StateGenerator<M: StateMachine> {
	machine: M,
	state: M::State,
	epoch: u64,
	settled: bool,
	events_tx: Sender<Tagged<M::Event>>,
	events_rx: Receiver<Tagged<M::Event>>,
}

impl<M: StateMachine> StateGenerator<M> {
	pub fn new(machine: M, initial: M::State) -> Self {
		let (events_tx, events_rx) = crossbeam_channel::unbounded();
		Self {
			machine,
			state: initial,
			epoch: 0,
			settled: false,
			events_tx,
			events_rx,
		}
	}

	pub fn machine(&self) -> &M {
		&self.machine
	}

	/// Current state with pending outcome events applied.
	pub fn state(&mut self) -> &M::State {
		self.fold_events();
		&self.state
	}

	/// Replaces the state, discarding outcomes of previously emitted commands.
	pub fn restore(&mut self, state: M::State) {
		self.state = state;
		self.epoch = self.epoch.wrapping_add(1);
		self.settled = true;
		while self.events_rx.try_recv().is_ok() {}
	}

	fn fold_events(&mut self) {
		while let Ok((epoch, event)) = self.events_rx.try_recv() {
			if epoch != self.epoch || self.settled {
				continue;
			}
			self.settled = true;
			self.state = self.machine.apply(self.state.clone(), event);
		}
	}

	fn wrap(&self, transition: Transition<M::Event>) -> GeneratedCommand {
		let mut generated = GeneratedCommand::from_boxed(transition.command);
		let epoch = self.epoch;

		if let Some(event) = transition.on_complete {
			let tx = self.events_tx.clone();
			generated = generated.on_complete(move |_| {
				let _ = tx.send((epoch, event.clone()));
			});
		}
		if let Some(build) = transition.on_interrupt {
			let tx = self.events_tx.clone();
			generated = generated.on_interrupt(move |command| {
				let _ = tx.send((epoch, build(command)));
			});
		}
		generated
	}
}

impl<M: StateMachine> CommandGenerator for StateGenerator<M> {
	fn generate_next(&mut self, rng: &mut WorldRandom) -> Option<Arc<GeneratedCommand>> {
		self.fold_events();

		let (state, transition) = self.machine.transition(self.state.clone(), rng);
		self.state = state;

		let transition = transition?;
		self.epoch = self.epoch.wrapping_add(1);
		self.settled = false;
		Some(Arc::new(self.wrap(transition)))
	}
}
