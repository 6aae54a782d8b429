use std::collections::BTreeMap;
use std::sync::Arc;

use horde_worker::{
	Broadcast, RequestProcessor, RunGate, SynchronizedTask, TaskPoll, TickReport, Worker, WorkerError, WorkerExit, WorkerRecord, WorkerRegistry,
	spawn_worker,
};
use horde_primitives::WorldRandom;
use horde_world::populator::{HordePopulator, WorldHordePopulator};
use horde_world::requests::WorldRequests;
use horde_world::{BiomeMap, HordeData, HordeSettings, HordeTracker, PlayerTracker, TrackerHandle, World};

/// The simulation context.
///
/// Owns the worker registry, the run gate every worker hangs off, the
/// request processor and the player grouping task. Created on the thread
/// that will tick the world; that thread becomes the main context.
pub struct HordeCore {
	settings: HordeSettings,
	gate: RunGate,
	registry: WorkerRegistry,
	processor: RequestProcessor<dyn World>,
	players: SynchronizedTask<PlayerTracker>,
	tracker: TrackerHandle,
	/// The tracker until [`HordeCore::start`] moves it onto its thread.
	pending: Option<HordeTracker>,
	/// Populators registered before [`HordeCore::start`].
	populator: Option<WorldHordePopulator>,
	ticks: u64,
}

impl std::fmt::Debug for HordeCore {
	fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
		f.debug_struct("HordeCore")
			.field("ticks", &self.ticks)
			.field("started", &self.pending.is_none())
			.field("processor", &self.processor)
			.finish()
	}
}

impl HordeCore {
	pub fn new(settings: HordeSettings, biomes: Arc<dyn BiomeMap>) -> Self {
		let gate = RunGate::new();
		let processor = RequestProcessor::new();
		let groups = Broadcast::with_capacity(settings.broadcast_capacity);
		let players = SynchronizedTask::new(PlayerTracker::new(settings.view_distance, groups.clone()), gate.child());
		let (tracker, handle) = HordeTracker::new(settings.clone(), processor.sender(), groups.subscribe(), biomes);
		let populator = WorldHordePopulator::new(&settings, groups.subscribe(), handle.subscribe_snapshots(), handle.spawner(), WorldRandom::from_entropy());

		Self {
			settings,
			gate,
			registry: WorkerRegistry::new(),
			processor,
			players,
			tracker: handle,
			pending: Some(tracker),
			populator: Some(populator),
			ticks: 0,
		}
	}

	/// Seeds the populators' random source so runs can be replayed.
	pub fn with_seed(mut self, seed: u64) -> Self {
		if let Some(populator) = self.populator.as_mut() {
			populator.reseed(WorldRandom::seeded(seed));
		}
		self
	}

	/// Adds a populator. Ignored once [`start`](Self::start) has run.
	pub fn register_populator(&mut self, populator: Box<dyn HordePopulator>) {
		match self.populator.as_mut() {
			Some(pending) => pending.register(populator),
			None => tracing::warn!(populator = populator.name(), "horde.populator_after_start"),
		}
	}

	/// Starts the horde tracker, and the populator when any populator is registered, on their own threads.
	/// Later calls do nothing.
	pub fn start(&mut self) -> Result<(), WorkerError> {
		let Some(tracker) = self.pending.take() else {
			return Ok(());
		};
		let handle = spawn_worker(tracker, &self.gate, &self.registry, self.settings.thread_tick())?;
		self.registry.attach(handle);
		if let Some(populator) = self.populator.take().filter(|populator| !populator.is_empty()) {
			let handle = spawn_worker(populator, &self.gate, &self.registry, self.settings.thread_tick())?;
			self.registry.attach(handle);
		}
		tracing::info!(tick_ms = self.settings.thread_tick_ms, view_distance = self.settings.view_distance, "horde.started");
		Ok(())
	}

	/// One main-context tick: refreshes the player groups and runs queued requests against `world`.
	pub fn tick<W: World + 'static>(&mut self, world: &mut W, dt: f32) -> TickReport {
		self.ticks += 1;
		match self.players.update(dt, || world.players()) {
			TaskPoll::Faulted(err) => tracing::warn!(tick = self.ticks, error = %err, "horde.players_faulted"),
			TaskPoll::Lost => tracing::error!(tick = self.ticks, "horde.players_lost"),
			_ => {}
		}

		let report = self.processor.tick(world, dt);
		if report.failed > 0 {
			tracing::debug!(tick = self.ticks, failed = report.failed, active = report.active, "horde.tick_failures");
		}
		report
	}

	pub fn settings(&self) -> &HordeSettings {
		&self.settings
	}

	pub fn tracker(&self) -> &TrackerHandle {
		&self.tracker
	}

	pub fn requests(&self) -> WorldRequests {
		self.processor.sender()
	}

	pub fn ticks(&self) -> u64 {
		self.ticks
	}

	/// Pauses every worker and the player grouping. Queued requests still run.
	pub fn pause(&self) {
		self.gate.pause();
	}

	pub fn resume(&self) {
		self.gate.resume();
	}

	pub fn is_paused(&self) -> bool {
		self.gate.is_paused()
	}

	pub fn workers(&self) -> Vec<WorkerRecord> {
		self.registry.snapshots()
	}

	/// Active main-context requests by name.
	pub fn request_counts(&self) -> BTreeMap<&'static str, usize> {
		self.processor.request_counts()
	}

	/// Stops every worker, abandons queued requests and returns the hordes to persist.
	pub fn shutdown(mut self) -> Vec<HordeData> {
		self.gate.shutdown();
		for (name, exit) in self.registry.shutdown_all() {
			match exit {
				WorkerExit::Stopped => tracing::debug!(worker = %name, "horde.worker_stopped"),
				exit => tracing::warn!(worker = %name, exit = ?exit, "horde.worker_failed"),
			}
		}
		if let Some(mut tracker) = self.pending.take() {
			tracker.on_shutdown();
		}

		let abandoned = self.processor.shutdown();
		let saved = self.tracker.take_saved().unwrap_or_default();
		tracing::info!(hordes = saved.len(), abandoned, ticks = self.ticks, "horde.shutdown");
		saved
	}
}

impl Drop for HordeCore {
	fn drop(&mut self) {
		self.gate.shutdown();
	}
}
