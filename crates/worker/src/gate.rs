use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::{Duration, Instant};

use parking_lot::{Condvar, Mutex};
use tokio_util::sync::CancellationToken;

#[derive(Debug, Default)]
struct Wake {
	lock: Mutex<()>,
	cond: Condvar,
}

/// Run/pause/shutdown gate shared by background workers.
///
/// Pausing is shared by every gate derived from the same root. Shutdown is
/// hierarchical: cancelling a root cancels every [`child`](Self::child), while
/// cancelling a child stops only that worker.
#[derive(Debug, Clone, Default)]
pub struct RunGate {
	paused: Arc<AtomicBool>,
	cancel: CancellationToken,
	wake: Arc<Wake>,
}

impl RunGate {
	pub fn new() -> Self {
		Self::default()
	}

	/// Derives a gate with its own shutdown scope that still observes the parent's pause and shutdown.
	pub fn child(&self) -> Self {
		Self {
			paused: Arc::clone(&self.paused),
			cancel: self.cancel.child_token(),
			wake: Arc::clone(&self.wake),
		}
	}

	pub fn pause(&self) {
		self.paused.store(true, Ordering::Release);
	}

	pub fn resume(&self) {
		self.paused.store(false, Ordering::Release);
		self.notify();
	}

	pub fn is_paused(&self) -> bool {
		self.paused.load(Ordering::Acquire)
	}

	/// Requests shutdown for this gate and all of its children.
	pub fn shutdown(&self) {
		{
			let _guard = self.wake.lock.lock();
			self.cancel.cancel();
		}
		self.notify();
	}

	pub fn is_shutdown(&self) -> bool {
		self.cancel.is_cancelled()
	}

	/// Returns a token that resolves when this gate is shut down.
	pub fn token(&self) -> CancellationToken {
		self.cancel.clone()
	}

	/// Sleeps for up to `duration`, waking early on shutdown.
	///
	/// Returns `false` if the gate was shut down.
	pub fn sleep(&self, duration: Duration) -> bool {
		let deadline = Instant::now() + duration;
		let mut guard = self.wake.lock.lock();
		while !self.cancel.is_cancelled() {
			if self.wake.cond.wait_until(&mut guard, deadline).timed_out() {
				break;
			}
		}
		!self.cancel.is_cancelled()
	}

	fn notify(&self) {
		self.wake.cond.notify_all();
	}
}
