use std::collections::HashMap;
use std::sync::Arc;

use parking_lot::{Mutex, RwLock};

use crate::threaded::{WorkerExit, WorkerHandle};
use crate::{TaskClass, WorkerError};

/// Lifecycle state of one registered worker.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WorkerState {
	Starting,
	Running,
	Paused,
	Stopped,
}

/// Snapshot for one registered worker.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WorkerRecord {
	pub name: String,
	pub class: TaskClass,
	pub state: WorkerState,
	/// Completed update steps, faulted ones included.
	pub steps: u64,
	pub faults: u64,
	pub last_fault: Option<String>,
}

impl WorkerRecord {
	pub fn new(name: impl Into<String>, class: TaskClass) -> Self {
		Self {
			name: name.into(),
			class,
			state: WorkerState::Starting,
			steps: 0,
			faults: 0,
			last_fault: None,
		}
	}
}

/// Registry of running workers, owned by the simulation context.
///
/// Clones share state. Records outlive their workers so the last fault stays
/// visible after shutdown.
#[derive(Debug, Default, Clone)]
pub struct WorkerRegistry {
	records: Arc<RwLock<HashMap<String, WorkerRecord>>>,
	handles: Arc<Mutex<Vec<WorkerHandle>>>,
}

impl WorkerRegistry {
	/// Creates an empty registry.
	pub fn new() -> Self {
		Self::default()
	}

	/// Inserts a fresh record, failing if a live worker already uses the name.
	pub(crate) fn register(&self, name: &str, class: TaskClass) -> Result<(), WorkerError> {
		let mut records = self.records.write();
		if records.get(name).is_some_and(|r| r.state != WorkerState::Stopped) {
			return Err(WorkerError::Duplicate(name.to_string()));
		}
		records.insert(name.to_string(), WorkerRecord::new(name, class));
		Ok(())
	}

	/// Upserts one record.
	pub fn upsert(&self, record: WorkerRecord) {
		self.records.write().insert(record.name.clone(), record);
	}

	/// Removes one record.
	pub fn remove(&self, name: &str) {
		self.records.write().remove(name);
	}

	pub(crate) fn set_state(&self, name: &str, state: WorkerState) {
		if let Some(record) = self.records.write().get_mut(name) {
			record.state = state;
		}
	}

	pub(crate) fn record_step(&self, name: &str, fault: Option<String>) {
		if let Some(record) = self.records.write().get_mut(name) {
			record.steps = record.steps.wrapping_add(1);
			record.state = WorkerState::Running;
			if let Some(fault) = fault {
				record.faults = record.faults.wrapping_add(1);
				record.last_fault = Some(fault);
			}
		}
	}

	/// Returns the record for `name`, if any.
	pub fn get(&self, name: &str) -> Option<WorkerRecord> {
		self.records.read().get(name).cloned()
	}

	/// Returns snapshots sorted by name.
	pub fn snapshots(&self) -> Vec<WorkerRecord> {
		let mut records: Vec<_> = self.records.read().values().cloned().collect();
		records.sort_by(|a, b| a.name.cmp(&b.name));
		records
	}

	/// Takes ownership of a running worker so [`Self::shutdown_all`] can stop it.
	pub fn attach(&self, handle: WorkerHandle) {
		self.handles.lock().push(handle);
	}

	/// Number of attached workers that have not been shut down.
	pub fn running(&self) -> usize {
		self.handles.lock().len()
	}

	/// Signals every attached worker to stop, then joins them in attach order.
	pub fn shutdown_all(&self) -> Vec<(String, WorkerExit)> {
		let handles = std::mem::take(&mut *self.handles.lock());
		for handle in &handles {
			handle.signal_shutdown();
		}

		handles
			.into_iter()
			.map(|handle| {
				let name = handle.name().to_string();
				let exit = handle.join();
				self.set_state(&name, WorkerState::Stopped);
				tracing::debug!(worker = %name, ?exit, "worker.stopped");
				(name, exit)
			})
			.collect()
	}
}
