use std::panic::{AssertUnwindSafe, catch_unwind};
use std::thread::JoinHandle;
use std::time::{Duration, Instant};

use crate::panic::panic_message;
use crate::registry::WorkerState;
use crate::{RunGate, TaskClass, WorkerError, WorkerRegistry, spawn_named_thread};

/// Default interval between worker steps.
pub const DEFAULT_TICK: Duration = Duration::from_millis(100);

/// Multiplier applied to the tick interval while a worker is paused.
const PAUSED_TICK_FACTOR: u32 = 10;

/// A continuous background loop run on its own thread.
///
/// Errors returned from [`update`](Self::update) and panics inside it are
/// logged and counted; the loop keeps going.
pub trait Worker: Send + 'static {
	fn name(&self) -> &str;

	fn class(&self) -> TaskClass {
		TaskClass::Simulation
	}

	/// Runs once on the worker thread before the first step.
	fn on_start(&mut self) -> Result<(), String> {
		Ok(())
	}

	/// Extra run condition checked alongside the gate's pause flag.
	fn can_run(&self) -> bool {
		true
	}

	/// One step. `dt` is the wall time in seconds since the previous step.
	fn update(&mut self, dt: f32) -> Result<(), String>;

	/// Runs once on the worker thread after the loop exits.
	fn on_shutdown(&mut self) {}
}

/// How a worker thread finished.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum WorkerExit {
	Stopped,
	StartupFailed(String),
	/// The thread itself died outside the step boundary (start or shutdown hook).
	Panicked(String),
}

/// Owning handle for one running worker thread.
#[derive(Debug)]
pub struct WorkerHandle {
	name: String,
	gate: RunGate,
	join: JoinHandle<WorkerExit>,
}

impl WorkerHandle {
	pub fn name(&self) -> &str {
		&self.name
	}

	pub fn is_finished(&self) -> bool {
		self.join.is_finished()
	}

	/// Requests shutdown without waiting.
	pub fn signal_shutdown(&self) {
		self.gate.shutdown();
	}

	/// Requests shutdown and waits for the loop to exit.
	pub fn shutdown(self) -> WorkerExit {
		self.signal_shutdown();
		self.join()
	}

	pub(crate) fn join(self) -> WorkerExit {
		match self.join.join() {
			Ok(exit) => exit,
			Err(payload) => WorkerExit::Panicked(panic_message(payload.as_ref())),
		}
	}
}

/// Starts `worker` on a named thread under a child of `gate`.
///
/// The worker is recorded in `registry`; the returned handle is not attached
/// so callers decide who owns shutdown.
pub fn spawn_worker<W: Worker>(mut worker: W, gate: &RunGate, registry: &WorkerRegistry, tick: Duration) -> Result<WorkerHandle, WorkerError> {
	let name = worker.name().to_string();
	let class = worker.class();
	registry.register(&name, class)?;

	let gate = gate.child();
	let thread_gate = gate.clone();
	let thread_registry = registry.clone();
	let thread_name = name.clone();

	let join = spawn_named_thread(class, name.clone(), move || {
		let exit = catch_unwind(AssertUnwindSafe(|| run_loop(&mut worker, &thread_name, &thread_gate, &thread_registry, tick)))
			.unwrap_or_else(|payload| WorkerExit::Panicked(panic_message(payload.as_ref())));
		thread_registry.set_state(&thread_name, WorkerState::Stopped);
		exit
	})
	.map_err(|source| {
		registry.remove(&name);
		WorkerError::Spawn { name: name.clone(), source }
	})?;

	Ok(WorkerHandle { name, gate, join })
}

fn run_loop<W: Worker>(worker: &mut W, name: &str, gate: &RunGate, registry: &WorkerRegistry, tick: Duration) -> WorkerExit {
	if let Err(err) = worker.on_start() {
		tracing::error!(worker = name, error = %err, "worker.start_failed");
		return WorkerExit::StartupFailed(err);
	}
	registry.set_state(name, WorkerState::Running);
	tracing::debug!(worker = name, tick_ms = tick.as_millis() as u64, "worker.started");

	let mut last = Instant::now();
	while !gate.is_shutdown() {
		if gate.is_paused() || !worker.can_run() {
			registry.set_state(name, WorkerState::Paused);
			if !gate.sleep(tick * PAUSED_TICK_FACTOR) {
				break;
			}
			// Paused time is not simulation time.
			last = Instant::now();
			continue;
		}

		let now = Instant::now();
		let dt = now.duration_since(last).as_secs_f32();
		last = now;

		let fault = match catch_unwind(AssertUnwindSafe(|| worker.update(dt))) {
			Ok(Ok(())) => None,
			Ok(Err(err)) => {
				tracing::warn!(worker = name, error = %err, "worker.step_failed");
				Some(err)
			}
			Err(payload) => {
				let message = panic_message(payload.as_ref());
				tracing::error!(worker = name, panic = %message, "worker.step_panicked");
				Some(message)
			}
		};
		registry.record_step(name, fault);

		if !gate.sleep(tick) {
			break;
		}
	}

	worker.on_shutdown();
	tracing::debug!(worker = name, "worker.shutdown");
	WorkerExit::Stopped
}

#[cfg(test)]
mod tests {
	use std::sync::Arc;
	use std::sync::atomic::{AtomicUsize, Ordering};
	use std::time::{Duration, Instant};

	use super::*;

	struct Flaky {
		steps: Arc<AtomicUsize>,
		shutdowns: Arc<AtomicUsize>,
	}

	impl Worker for Flaky {
		fn name(&self) -> &str {
			"flaky"
		}

		fn update(&mut self, _dt: f32) -> Result<(), String> {
			let step = self.steps.fetch_add(1, Ordering::SeqCst);
			match step % 3 {
				0 => Err("soft failure".into()),
				1 => panic!("hard failure"),
				_ => Ok(()),
			}
		}

		fn on_shutdown(&mut self) {
			self.shutdowns.fetch_add(1, Ordering::SeqCst);
		}
	}

	fn wait_until(deadline: Duration, mut f: impl FnMut() -> bool) -> bool {
		let gate = RunGate::new();
		let start = Instant::now();
		while start.elapsed() < deadline {
			if f() {
				return true;
			}
			gate.sleep(Duration::from_millis(2));
		}
		f()
	}

	#[test]
	fn step_faults_are_contained_and_counted() {
		let steps = Arc::new(AtomicUsize::new(0));
		let shutdowns = Arc::new(AtomicUsize::new(0));
		let gate = RunGate::new();
		let registry = WorkerRegistry::new();
		let worker = Flaky {
			steps: Arc::clone(&steps),
			shutdowns: Arc::clone(&shutdowns),
		};

		let handle = spawn_worker(worker, &gate, &registry, Duration::from_millis(1)).unwrap();
		assert!(wait_until(Duration::from_secs(5), || steps.load(Ordering::SeqCst) >= 6));
		assert_eq!(handle.shutdown(), WorkerExit::Stopped);

		let record = registry.get("flaky").unwrap();
		assert_eq!(record.state, WorkerState::Stopped);
		assert!(record.faults >= 4);
		assert!(record.last_fault.is_some());
		assert_eq!(shutdowns.load(Ordering::SeqCst), 1);
	}

	struct Counter(Arc<AtomicUsize>);

	impl Worker for Counter {
		fn name(&self) -> &str {
			"counter"
		}

		fn update(&mut self, _dt: f32) -> Result<(), String> {
			self.0.fetch_add(1, Ordering::SeqCst);
			Ok(())
		}
	}

	#[test]
	fn paused_worker_does_not_step() {
		let steps = Arc::new(AtomicUsize::new(0));
		let gate = RunGate::new();
		gate.pause();
		let registry = WorkerRegistry::new();
		registry.attach(spawn_worker(Counter(Arc::clone(&steps)), &gate, &registry, Duration::from_millis(1)).unwrap());

		assert!(wait_until(Duration::from_secs(5), || registry.get("counter").is_some_and(|r| r.state == WorkerState::Paused)));
		assert_eq!(steps.load(Ordering::SeqCst), 0);

		gate.resume();
		assert!(wait_until(Duration::from_secs(5), || steps.load(Ordering::SeqCst) > 0));

		let exits = registry.shutdown_all();
		assert_eq!(exits, vec![("counter".to_string(), WorkerExit::Stopped)]);
		assert_eq!(registry.running(), 0);
	}

	struct RefusesToStart;

	impl Worker for RefusesToStart {
		fn name(&self) -> &str {
			"refuses"
		}

		fn on_start(&mut self) -> Result<(), String> {
			Err("no world".into())
		}

		fn update(&mut self, _dt: f32) -> Result<(), String> {
			unreachable!("update must not run after a failed start")
		}
	}

	#[test]
	fn failed_start_reports_exit() {
		let gate = RunGate::new();
		let registry = WorkerRegistry::new();
		let handle = spawn_worker(RefusesToStart, &gate, &registry, Duration::from_millis(1)).unwrap();
		assert_eq!(handle.join(), WorkerExit::StartupFailed("no world".into()));
	}
}
