use std::collections::BTreeMap;
use std::panic::{AssertUnwindSafe, catch_unwind};
use std::sync::Arc;
use std::thread::ThreadId;

use crossbeam_channel::{Receiver, Sender};
use parking_lot::RwLock;

use crate::RequestError;
use crate::panic::panic_message;
use crate::request::{Envelope, MainThreadRequest, QueuedRequest, RequestHandle};

type Queued<C> = Box<dyn QueuedRequest<C>>;

#[derive(Debug)]
struct Shared {
	main_thread: RwLock<ThreadId>,
	/// Held shared for the whole of every send, so a shutdown that takes it
	/// exclusively sees every request that made it into the queue.
	closed: RwLock<bool>,
}

/// Outcome of one [`RequestProcessor::tick`].
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct TickReport {
	/// Requests moved from the incoming queue into the active list.
	pub drained: usize,
	pub completed: usize,
	pub failed: usize,
	/// Requests still active after this tick.
	pub active: usize,
}

/// Executes [`MainThreadRequest`]s on the main context.
///
/// Producers on any thread submit through a [`RequestSender`]. Each
/// [`tick`](Self::tick) moves whatever is queued at that instant into the
/// active list, then ticks every active request once in arrival order. A
/// request enqueued while a tick is running is first ticked on the next one.
pub struct RequestProcessor<C: ?Sized> {
	tx: Sender<Queued<C>>,
	rx: Receiver<Queued<C>>,
	active: Vec<Queued<C>>,
	shared: Arc<Shared>,
}

impl<C: ?Sized> std::fmt::Debug for RequestProcessor<C> {
	fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
		f.debug_struct("RequestProcessor")
			.field("queued", &self.rx.len())
			.field("active", &self.active.len())
			.finish()
	}
}

impl<C: ?Sized> Default for RequestProcessor<C> {
	fn default() -> Self {
		Self::new()
	}
}

impl<C: ?Sized> RequestProcessor<C> {
	/// Creates a processor bound to the calling thread as the main context.
	pub fn new() -> Self {
		let (tx, rx) = crossbeam_channel::unbounded();
		Self {
			tx,
			rx,
			active: Vec::new(),
			shared: Arc::new(Shared {
				main_thread: RwLock::new(std::thread::current().id()),
				closed: RwLock::new(false),
			}),
		}
	}

	/// Rebinds the main context to the calling thread.
	pub fn bind_current_thread(&self) {
		*self.shared.main_thread.write() = std::thread::current().id();
	}

	pub fn sender(&self) -> RequestSender<C> {
		RequestSender {
			tx: self.tx.clone(),
			shared: Arc::clone(&self.shared),
		}
	}

	pub fn queued_len(&self) -> usize {
		self.rx.len()
	}

	pub fn active_len(&self) -> usize {
		self.active.len()
	}

	pub fn is_shut_down(&self) -> bool {
		*self.shared.closed.read()
	}

	/// Active requests grouped by name.
	pub fn request_counts(&self) -> BTreeMap<&'static str, usize> {
		let mut counts = BTreeMap::new();
		for request in &self.active {
			*counts.entry(request.name()).or_insert(0) += 1;
		}
		counts
	}

	/// Runs one main-context tick.
	///
	/// A request that fails or panics is logged and dropped on its own; the
	/// rest of the tick proceeds. Producers waiting on it receive the error.
	pub fn tick(&mut self, ctx: &mut C, dt: f32) -> TickReport {
		let mut report = TickReport::default();
		if self.is_shut_down() {
			return report;
		}

		let pending = self.rx.len();
		for request in self.rx.try_iter().take(pending) {
			self.active.push(request);
			report.drained += 1;
		}

		let mut finished = Vec::new();
		let mut failed = Vec::new();
		let mut still_active = Vec::with_capacity(self.active.len());

		for mut request in self.active.drain(..) {
			let name = request.name();
			let outcome = catch_unwind(AssertUnwindSafe(|| {
				request.tick(ctx, dt)?;
				if request.is_done() {
					request.cleanup(ctx);
					Ok(true)
				} else {
					Ok(false)
				}
			}));

			match outcome {
				Ok(Ok(true)) => finished.push(request),
				Ok(Ok(false)) => still_active.push(request),
				Ok(Err(message)) => {
					tracing::error!(request = name, error = %message, "request.failed");
					failed.push((request, RequestError::Failed { name, message }));
				}
				Err(payload) => {
					let message = panic_message(payload.as_ref());
					tracing::error!(request = name, panic = %message, "request.panicked");
					failed.push((request, RequestError::Panicked { name, message }));
				}
			}
		}
		self.active = still_active;

		report.completed = finished.len();
		report.failed = failed.len();
		report.active = self.active.len();

		for request in finished {
			request.complete();
		}
		for (request, err) in failed {
			request.fail(err);
		}

		report
	}

	/// Discards all queued and active work without executing it.
	///
	/// Producers parked on a discarded request wake with
	/// [`RequestError::Abandoned`]; later submissions fail with
	/// [`RequestError::Closed`]. Returns the number of discarded requests.
	pub fn shutdown(&mut self) -> usize {
		*self.shared.closed.write() = true;

		let mut abandoned = 0usize;
		for request in self.active.drain(..).chain(self.rx.try_iter()) {
			request.fail(RequestError::Abandoned);
			abandoned += 1;
		}

		tracing::debug!(abandoned, "request_processor.shutdown");
		abandoned
	}
}

/// Cloneable producer handle for a [`RequestProcessor`].
pub struct RequestSender<C: ?Sized> {
	tx: Sender<Queued<C>>,
	shared: Arc<Shared>,
}

impl<C: ?Sized> Clone for RequestSender<C> {
	fn clone(&self) -> Self {
		Self {
			tx: self.tx.clone(),
			shared: Arc::clone(&self.shared),
		}
	}
}

impl<C: ?Sized> std::fmt::Debug for RequestSender<C> {
	fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
		f.debug_struct("RequestSender").field("queued", &self.tx.len()).finish()
	}
}

impl<C: ?Sized> RequestSender<C> {
	/// True when called on the thread the processor is bound to.
	pub fn is_main_thread(&self) -> bool {
		*self.shared.main_thread.read() == std::thread::current().id()
	}

	fn enqueue<R: MainThreadRequest<C>>(&self, envelope: Envelope<R>) -> Result<(), RequestError> {
		let closed = self.shared.closed.read();
		if *closed {
			return Err(RequestError::Closed);
		}
		self.tx.send(Box::new(envelope)).map_err(|_| RequestError::Closed)
	}

	/// Fire-and-forget submission.
	pub fn submit<R: MainThreadRequest<C>>(&self, request: R) -> Result<(), RequestError> {
		self.enqueue(Envelope::new(request, None))
	}

	/// Submits a request and returns a handle that receives it back once done.
	pub fn track<R: MainThreadRequest<C>>(&self, request: R) -> Result<RequestHandle<R>, RequestError> {
		let (reply, rx) = crossbeam_channel::bounded(1);
		self.enqueue(Envelope::new(request, Some(reply)))?;
		Ok(RequestHandle::new(rx))
	}

	/// Submits a request and parks the caller until the main context finishes it.
	///
	/// Fails fast with [`RequestError::WouldDeadlock`] when called on the main
	/// context itself.
	pub fn request_and_wait<R: MainThreadRequest<C>>(&self, request: R) -> Result<R, RequestError> {
		if self.is_main_thread() {
			return Err(RequestError::WouldDeadlock);
		}
		self.track(request)?.wait()
	}
}
