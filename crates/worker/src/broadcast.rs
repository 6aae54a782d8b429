use std::collections::VecDeque;
use std::sync::{Arc, Weak};

use parking_lot::Mutex;

/// Per-subscriber history length used by [`Broadcast::new`].
pub const DEFAULT_BROADCAST_CAPACITY: usize = 100;

type History<T> = Mutex<VecDeque<T>>;

struct Inner<T> {
	capacity: usize,
	subscribers: Mutex<Vec<Weak<History<T>>>>,
	latest: Mutex<Option<T>>,
}

/// Bounded fan-out of snapshots from one producer to many consumers.
///
/// Every subscriber owns its own bounded history. [`update`](Self::update)
/// never waits on consumers: when a history is full its oldest entry is
/// discarded. Consumers only ever care about the newest value, see
/// [`Subscriber::try_get`].
pub struct Broadcast<T> {
	inner: Arc<Inner<T>>,
}

impl<T> Clone for Broadcast<T> {
	fn clone(&self) -> Self {
		Self {
			inner: Arc::clone(&self.inner),
		}
	}
}

impl<T: Clone> Default for Broadcast<T> {
	fn default() -> Self {
		Self::new()
	}
}

impl<T> std::fmt::Debug for Broadcast<T> {
	fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
		f.debug_struct("Broadcast")
			.field("capacity", &self.inner.capacity)
			.field("subscribers", &self.inner.subscribers.lock().len())
			.finish()
	}
}

impl<T: Clone> Broadcast<T> {
	pub fn new() -> Self {
		Self::with_capacity(DEFAULT_BROADCAST_CAPACITY)
	}

	/// Creates a channel whose subscribers retain at most `capacity` values (minimum 1).
	pub fn with_capacity(capacity: usize) -> Self {
		Self {
			inner: Arc::new(Inner {
				capacity: capacity.max(1),
				subscribers: Mutex::new(Vec::new()),
				latest: Mutex::new(None),
			}),
		}
	}

	pub fn capacity(&self) -> usize {
		self.inner.capacity
	}

	/// Creates an independent subscriber.
	///
	/// A subscriber created after at least one update starts with the most
	/// recent value pending.
	pub fn subscribe(&self) -> Subscriber<T> {
		// Seeding and registering under the subscriber lock keeps a concurrent
		// update from landing between the two.
		let mut subscribers = self.inner.subscribers.lock();
		let mut history = VecDeque::with_capacity(self.inner.capacity.min(16));
		if let Some(latest) = self.inner.latest.lock().clone() {
			history.push_back(latest);
		}

		let history = Arc::new(Mutex::new(history));
		subscribers.push(Arc::downgrade(&history));
		Subscriber { history }
	}

	/// Appends `value` to every live subscriber's history.
	pub fn update(&self, value: T) {
		let mut dropped = 0usize;
		{
			let mut subscribers = self.inner.subscribers.lock();
			*self.inner.latest.lock() = Some(value.clone());
			subscribers.retain(|weak| {
				let Some(history) = weak.upgrade() else {
					return false;
				};
				let mut history = history.lock();
				if history.len() >= self.inner.capacity {
					history.pop_front();
					dropped += 1;
				}
				history.push_back(value.clone());
				true
			});
		}

		if dropped > 0 {
			tracing::trace!(dropped, capacity = self.inner.capacity, "broadcast.overflow");
		}
	}

	/// Number of subscribers that have not been dropped, as of the last update.
	pub fn subscriber_count(&self) -> usize {
		self.inner.subscribers.lock().len()
	}
}

/// Receiving side of a [`Broadcast`].
pub struct Subscriber<T> {
	history: Arc<History<T>>,
}

impl<T> std::fmt::Debug for Subscriber<T> {
	fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
		f.debug_struct("Subscriber").field("pending", &self.pending()).finish()
	}
}

impl<T> Subscriber<T> {
	/// Returns the most recent value and discards everything older.
	///
	/// Returns `None` if nothing was published since the last successful call.
	pub fn try_get(&self) -> Option<T> {
		let mut history = self.history.lock();
		let latest = history.pop_back();
		history.clear();
		latest
	}

	/// Number of values waiting in this subscriber's history.
	pub fn pending(&self) -> usize {
		self.history.lock().len()
	}
}
