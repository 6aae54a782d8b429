use std::sync::OnceLock;

use tokio::runtime::{Builder, Handle, Runtime};
use tokio::task::JoinHandle;

use crate::TaskClass;

/// Upper bound on concurrent synchronized units when no runtime is ambient.
const MAX_BLOCKING_THREADS: usize = 4;

static POOL: OnceLock<Runtime> = OnceLock::new();

/// The ambient runtime if there is one, otherwise the shared blocking pool.
pub(crate) fn blocking_pool() -> std::io::Result<Handle> {
	if let Ok(handle) = Handle::try_current() {
		return Ok(handle);
	}
	if let Some(runtime) = POOL.get() {
		return Ok(runtime.handle().clone());
	}

	let runtime = Builder::new_multi_thread()
		.worker_threads(1)
		.max_blocking_threads(MAX_BLOCKING_THREADS)
		.thread_name("horde-blocking")
		.build()?;
	// A racing initializer may win; its runtime is used and ours is dropped.
	Ok(POOL.get_or_init(|| runtime).handle().clone())
}

/// Runs `f` on the blocking pool.
///
/// Fails only when the pool itself cannot be created.
pub fn spawn_blocking<F, R>(class: TaskClass, f: F) -> std::io::Result<JoinHandle<R>>
where
	F: FnOnce() -> R + Send + 'static,
	R: Send + 'static,
{
	let handle = blocking_pool()?;
	tracing::trace!(worker_class = class.as_str(), "worker.spawn_blocking");
	Ok(handle.spawn_blocking(f))
}

/// Starts a dedicated OS thread named `name`.
pub fn spawn_named_thread<F, R>(class: TaskClass, name: impl Into<String>, f: F) -> std::io::Result<std::thread::JoinHandle<R>>
where
	F: FnOnce() -> R + Send + 'static,
	R: Send + 'static,
{
	let name = name.into();
	tracing::trace!(worker_class = class.as_str(), thread = %name, "worker.spawn_named_thread");
	std::thread::Builder::new().name(name).spawn(f)
}

#[cfg(test)]
mod tests {
	use std::time::Duration;

	use super::*;

	#[test]
	fn blocking_work_runs_without_an_ambient_runtime() {
		let (tx, rx) = crossbeam_channel::bounded(1);
		spawn_blocking(TaskClass::Blocking, move || tx.send(21 * 2)).unwrap();
		assert_eq!(rx.recv_timeout(Duration::from_secs(5)), Ok(42));
	}

	#[test]
	fn named_threads_carry_their_name() {
		let join = spawn_named_thread(TaskClass::Simulation, "horde-test", || std::thread::current().name().map(str::to_string)).unwrap();
		assert_eq!(join.join().unwrap().as_deref(), Some("horde-test"));
	}
}
