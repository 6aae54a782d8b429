use crossbeam_channel::{Receiver, Sender, TryRecvError};

use crate::RequestError;

/// A unit of work that must run on the main context.
///
/// `C` is the main-context state lent to the request while it ticks; requests
/// never hold on to it between ticks. A request is ticked at least once before
/// [`is_done`](Self::is_done) is consulted, and keeps being ticked once per
/// processor tick until it reports done.
pub trait MainThreadRequest<C: ?Sized>: Send + 'static {
	/// Advances the request by one main-context tick.
	///
	/// An `Err` drops the request without running [`on_cleanup`](Self::on_cleanup).
	fn tick_execute(&mut self, ctx: &mut C, dt: f32) -> Result<(), String>;

	fn is_done(&self) -> bool;

	/// Runs once on the main context after the request reports done.
	fn on_cleanup(&mut self, _ctx: &mut C) {}

	/// Name used for logging and [`crate::RequestProcessor::request_counts`].
	fn name(&self) -> &'static str {
		std::any::type_name::<Self>()
	}
}

pub(crate) type Reply<R> = Sender<Result<R, RequestError>>;

/// Object-safe view of a queued request plus its completion channel.
pub(crate) trait QueuedRequest<C: ?Sized>: Send {
	fn tick(&mut self, ctx: &mut C, dt: f32) -> Result<(), String>;
	fn is_done(&self) -> bool;
	fn cleanup(&mut self, ctx: &mut C);
	fn name(&self) -> &'static str;
	/// Hands the finished request back to whoever is waiting on it.
	fn complete(self: Box<Self>);
	fn fail(self: Box<Self>, err: RequestError);
}

pub(crate) struct Envelope<R> {
	request: R,
	reply: Option<Reply<R>>,
}

impl<R> Envelope<R> {
	pub(crate) fn new(request: R, reply: Option<Reply<R>>) -> Self {
		Self { request, reply }
	}
}

impl<C, R> QueuedRequest<C> for Envelope<R>
where
	C: ?Sized,
	R: MainThreadRequest<C>,
{
	fn tick(&mut self, ctx: &mut C, dt: f32) -> Result<(), String> {
		self.request.tick_execute(ctx, dt)
	}

	fn is_done(&self) -> bool {
		self.request.is_done()
	}

	fn cleanup(&mut self, ctx: &mut C) {
		self.request.on_cleanup(ctx);
	}

	fn name(&self) -> &'static str {
		self.request.name()
	}

	fn complete(self: Box<Self>) {
		if let Some(reply) = self.reply {
			// Receiver gone means the producer stopped tracking; nothing to notify.
			let _ = reply.send(Ok(self.request));
		}
	}

	fn fail(self: Box<Self>, err: RequestError) {
		if let Some(reply) = self.reply {
			let _ = reply.send(Err(err));
		}
	}
}

/// Track-only view of a submitted request.
///
/// The request is handed back by value once it has been cleaned up, so any
/// output it computed on the main context can be read by the producer.
#[derive(Debug)]
pub struct RequestHandle<R> {
	rx: Receiver<Result<R, RequestError>>,
	taken: bool,
}

impl<R> RequestHandle<R> {
	pub(crate) fn new(rx: Receiver<Result<R, RequestError>>) -> Self {
		Self { rx, taken: false }
	}

	/// True once the request finished (successfully or not) and has not been taken yet.
	pub fn is_complete(&self) -> bool {
		!self.taken && !self.rx.is_empty()
	}

	/// Takes the finished request without blocking.
	///
	/// Returns `None` while the request is still pending and after the result
	/// has already been taken.
	pub fn try_take(&mut self) -> Option<Result<R, RequestError>> {
		if self.taken {
			return None;
		}
		let result = match self.rx.try_recv() {
			Ok(result) => result,
			Err(TryRecvError::Empty) => return None,
			Err(TryRecvError::Disconnected) => Err(RequestError::Abandoned),
		};
		self.taken = true;
		Some(result)
	}

	/// Blocks until the request finishes.
	///
	/// Must not be called on the main context: nothing would tick the request.
	pub fn wait(mut self) -> Result<R, RequestError> {
		if self.taken {
			return Err(RequestError::Abandoned);
		}
		self.taken = true;
		self.rx.recv().unwrap_or(Err(RequestError::Abandoned))
	}
}
