use std::panic::{AssertUnwindSafe, catch_unwind};

use crossbeam_channel::{Receiver, TryRecvError};
use tokio::runtime::Handle;

use crate::panic::panic_message;
use crate::spawn::blocking_pool;
use crate::{RunGate, TaskClass};

/// Work computed off the main context and applied back on it.
pub trait SynchronizedJob: Send + 'static {
	/// Snapshot captured on the main context before each launch.
	type Input: Send + 'static;
	type Output: Send + 'static;

	fn name(&self) -> &str;

	/// Runs on the blocking pool. `dt` is the main-context time accumulated since the previous launch.
	fn compute(&mut self, input: Self::Input, dt: f32) -> Result<Self::Output, String>;

	/// Runs on the main context with the output of a successful [`compute`](Self::compute).
	fn on_finish(&mut self, output: Self::Output);
}

/// What [`SynchronizedTask::update`] did this tick.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TaskPoll {
	/// Paused or shut down; nothing launched.
	Gated,
	Launched,
	/// A unit is still outstanding.
	Pending,
	/// A unit finished and its output was applied.
	Finished,
	/// A unit failed, panicked or could not be launched; the job is ready to launch again.
	Faulted(String),
	/// The blocking unit was torn down without reporting back and the job is gone.
	Lost,
}

type Completion<J> = (J, Result<<J as SynchronizedJob>::Output, String>);
type PoolSource = fn() -> std::io::Result<Handle>;

enum Slot<J: SynchronizedJob> {
	Idle(J),
	Running(Receiver<Completion<J>>),
	Lost,
}

/// Runs at most one unit of `J` at a time.
///
/// Driven from the main context: every [`update`](Self::update) either
/// collects a finished unit or, when none is outstanding, launches the next
/// one. Results are never applied on the tick that launched them.
pub struct SynchronizedTask<J: SynchronizedJob> {
	slot: Slot<J>,
	gate: RunGate,
	pool: PoolSource,
	elapsed: f32,
}

impl<J: SynchronizedJob> SynchronizedTask<J> {
	pub fn new(job: J, gate: RunGate) -> Self {
		Self {
			slot: Slot::Idle(job),
			gate,
			pool: blocking_pool,
			elapsed: 0.0,
		}
	}

	/// True while a unit is running off-thread.
	pub fn is_outstanding(&self) -> bool {
		matches!(self.slot, Slot::Running(_))
	}

	/// The job, when no unit is outstanding.
	pub fn job(&self) -> Option<&J> {
		match &self.slot {
			Slot::Idle(job) => Some(job),
			_ => None,
		}
	}

	/// Collects a finished unit or launches the next one.
	///
	/// `input` is only called when a launch actually happens.
	pub fn update(&mut self, dt: f32, input: impl FnOnce() -> J::Input) -> TaskPoll {
		self.elapsed += dt;

		if let Slot::Running(rx) = &self.slot {
			return match rx.try_recv() {
				Ok((mut job, result)) => {
					let poll = match result {
						Ok(output) => {
							job.on_finish(output);
							TaskPoll::Finished
						}
						Err(err) => {
							tracing::warn!(task = job.name(), error = %err, "synchronized_task.faulted");
							TaskPoll::Faulted(err)
						}
					};
					self.slot = Slot::Idle(job);
					poll
				}
				Err(TryRecvError::Empty) => TaskPoll::Pending,
				Err(TryRecvError::Disconnected) => {
					tracing::error!("synchronized_task.lost");
					self.slot = Slot::Lost;
					TaskPoll::Lost
				}
			};
		}

		if matches!(self.slot, Slot::Lost) {
			return TaskPoll::Lost;
		}
		if self.gate.is_paused() || self.gate.is_shutdown() {
			return TaskPoll::Gated;
		}

		// The job stays idle until a pool is in hand, so a failed launch is retried next tick.
		let pool = match (self.pool)() {
			Ok(pool) => pool,
			Err(err) => {
				let task = self.job().map(|job| job.name().to_string()).unwrap_or_default();
				tracing::warn!(task = %task, error = %err, "synchronized_task.launch_failed");
				return TaskPoll::Faulted(format!("launch failed: {err}"));
			}
		};
		let Slot::Idle(mut job) = std::mem::replace(&mut self.slot, Slot::Lost) else {
			return TaskPoll::Lost;
		};
		let input = input();
		let dt = std::mem::take(&mut self.elapsed);
		let (tx, rx) = crossbeam_channel::bounded(1);

		tracing::trace!(worker_class = TaskClass::Synchronized.as_str(), task = job.name(), "worker.spawn_blocking");
		// Detached: completion is observed through `rx`.
		let _detached = pool.spawn_blocking(move || {
			let result = match catch_unwind(AssertUnwindSafe(|| job.compute(input, dt))) {
				Ok(result) => result,
				Err(payload) => Err(format!("panicked: {}", panic_message(payload.as_ref()))),
			};
			let _ = tx.send((job, result));
		});
		self.slot = Slot::Running(rx);
		TaskPoll::Launched
	}
}

#[cfg(test)]
mod tests {
	use std::time::{Duration, Instant};

	use super::*;

	#[derive(Default)]
	struct Summer {
		applied: Vec<u32>,
		fail_next: bool,
	}

	impl SynchronizedJob for Summer {
		type Input = Vec<u32>;
		type Output = u32;

		fn name(&self) -> &str {
			"summer"
		}

		fn compute(&mut self, input: Vec<u32>, _dt: f32) -> Result<u32, String> {
			if std::mem::take(&mut self.fail_next) {
				panic!("bad input");
			}
			Ok(input.iter().sum())
		}

		fn on_finish(&mut self, output: u32) {
			self.applied.push(output);
		}
	}

	fn poll_until_done(task: &mut SynchronizedTask<Summer>) -> TaskPoll {
		let gate = RunGate::new();
		let start = Instant::now();
		loop {
			match task.update(0.1, Vec::new) {
				TaskPoll::Pending => {}
				other => return other,
			}
			assert!(start.elapsed() < Duration::from_secs(5), "unit never finished");
			gate.sleep(Duration::from_millis(1));
		}
	}

	#[test]
	fn result_is_applied_on_a_later_tick() {
		let mut task = SynchronizedTask::new(Summer::default(), RunGate::new());
		assert_eq!(task.update(0.1, || vec![1, 2, 3]), TaskPoll::Launched);
		assert!(task.is_outstanding());
		assert!(task.job().is_none());

		assert_eq!(poll_until_done(&mut task), TaskPoll::Finished);
		assert!(!task.is_outstanding());
		assert_eq!(task.job().unwrap().applied, [6]);
	}

	#[test]
	fn panics_clear_the_outstanding_marker() {
		let job = Summer {
			fail_next: true,
			..Summer::default()
		};
		let mut task = SynchronizedTask::new(job, RunGate::new());
		assert_eq!(task.update(0.1, Vec::new), TaskPoll::Launched);
		assert!(matches!(poll_until_done(&mut task), TaskPoll::Faulted(msg) if msg.contains("bad input")));

		assert_eq!(task.update(0.1, || vec![4]), TaskPoll::Launched);
		assert_eq!(poll_until_done(&mut task), TaskPoll::Finished);
		assert_eq!(task.job().unwrap().applied, [4]);
	}

	#[test]
	fn paused_gate_blocks_launch() {
		let gate = RunGate::new();
		gate.pause();
		let mut task = SynchronizedTask::new(Summer::default(), gate.clone());
		let mut called = false;
		assert_eq!(
			task.update(0.1, || {
				called = true;
				Vec::new()
			}),
			TaskPoll::Gated
		);
		assert!(!called);

		gate.resume();
		assert_eq!(task.update(0.1, Vec::new), TaskPoll::Launched);
	}

	#[test]
	fn failed_launch_keeps_the_job_for_the_next_tick() {
		let mut task = SynchronizedTask::new(Summer::default(), RunGate::new());
		task.pool = || Err(std::io::Error::other("no threads left"));
		let mut called = false;
		let poll = task.update(0.1, || {
			called = true;
			Vec::new()
		});
		assert!(matches!(poll, TaskPoll::Faulted(msg) if msg.contains("no threads left")));
		assert!(!called);
		assert!(task.job().is_some());

		task.pool = blocking_pool;
		assert_eq!(task.update(0.1, || vec![2, 5]), TaskPoll::Launched);
		assert_eq!(poll_until_done(&mut task), TaskPoll::Finished);
		assert_eq!(task.job().unwrap().applied, [7]);
	}
}
