use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

use crossbeam_channel::{Receiver, Sender};
use horde_ai::commands::{GoToTargetCommand, WanderCommand};
use horde_ai::zone::BiomeId;
use horde_primitives::{MemberIdAllocator, Vec3, WorldRandom};
use horde_worker::{Broadcast, Subscriber, Worker};

use crate::requests::WorldRequests;
use crate::{
	BiomeMap, HordeCatalog, HordeCluster, HordeContext, HordeData, HordeError, HordeId, HordeSettings, HordeSnapshot, PlayerGroup, WorldHorde,
};

/// Seconds a horde lingers where a reported event drew it.
pub const EVENT_WANDER_TIME: f32 = 30.0;

/// Something in the world that draws hordes within `distance` of `location`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct WorldEvent {
	pub location: Vec3,
	pub distance: f32,
}

impl WorldEvent {
	pub fn new(location: Vec3, distance: f32) -> Self {
		Self { location, distance }
	}

	fn reaches(&self, location: Vec3) -> bool {
		self.location.distance(location) <= self.distance
	}
}

/// Shared source of horde ids.
#[derive(Debug, Clone, Default)]
pub struct HordeIds {
	next: Arc<AtomicU64>,
}

impl HordeIds {
	pub fn next(&self) -> HordeId {
		HordeId(self.next.fetch_add(1, Ordering::AcqRel).wrapping_add(1))
	}
}

/// Cloneable way to hand new hordes to a [`HordeTracker`].
#[derive(Debug, Clone)]
pub struct HordeSpawner {
	incoming: Sender<WorldHorde>,
	ids: HordeIds,
}

impl HordeSpawner {
	pub fn next_id(&self) -> HordeId {
		self.ids.next()
	}

	/// Hands a horde to the tracker; it is picked up on the next step.
	pub fn add(&self, horde: WorldHorde) -> Result<HordeId, HordeError> {
		let id = horde.id();
		self.incoming.send(horde).map_err(|_| HordeError::TrackerClosed)?;
		Ok(id)
	}

	pub fn create(&self, location: Vec3, spawn_biome: BiomeId, clusters: Vec<HordeCluster>, rng: WorldRandom) -> Result<HordeId, HordeError> {
		self.add(WorldHorde::new(self.next_id(), location, spawn_biome, clusters, rng)?)
	}
}

/// Producer side of a running [`HordeTracker`].
#[derive(Debug)]
pub struct TrackerHandle {
	spawner: HordeSpawner,
	events: Sender<WorldEvent>,
	feed: Broadcast<Vec<HordeSnapshot>>,
	snapshots: Subscriber<Vec<HordeSnapshot>>,
	saved: Subscriber<Vec<HordeData>>,
}

impl TrackerHandle {
	pub fn next_id(&self) -> HordeId {
		self.spawner.next_id()
	}

	pub fn add(&self, horde: WorldHorde) -> Result<HordeId, HordeError> {
		self.spawner.add(horde)
	}

	pub fn create(&self, location: Vec3, spawn_biome: BiomeId, clusters: Vec<HordeCluster>, rng: WorldRandom) -> Result<HordeId, HordeError> {
		self.spawner.create(location, spawn_biome, clusters, rng)
	}

	pub fn spawner(&self) -> HordeSpawner {
		self.spawner.clone()
	}

	/// Re-creates saved hordes. Stops at the first horde whose definitions are unknown.
	pub fn restore(&self, saved: &[HordeData], catalog: &HordeCatalog, rng: &mut WorldRandom) -> Result<usize, HordeError> {
		for data in saved {
			self.add(WorldHorde::from_data(self.next_id(), data, catalog, rng.fork())?)?;
		}
		Ok(saved.len())
	}

	/// A separate feed of the snapshots, independent of [`snapshots`](Self::snapshots).
	pub fn subscribe_snapshots(&self) -> Subscriber<Vec<HordeSnapshot>> {
		self.feed.subscribe()
	}

	/// Reports an event; hordes within its reach head there on the next step.
	pub fn report(&self, event: WorldEvent) -> Result<(), HordeError> {
		self.events.send(event).map_err(|_| HordeError::TrackerClosed)
	}

	/// Latest horde snapshots published since the last call.
	pub fn snapshots(&self) -> Option<Vec<HordeSnapshot>> {
		self.snapshots.try_get()
	}

	/// Horde data published by the tracker when it shut down.
	pub fn take_saved(&self) -> Option<Vec<HordeData>> {
		self.saved.try_get()
	}
}

/// Background loop that owns every horde.
///
/// Each step decides which hordes spawn, despawn, merge or split, and
/// queues the main-context requests that carry those decisions out.
pub struct HordeTracker {
	settings: HordeSettings,
	requests: WorldRequests,
	players: Subscriber<Vec<PlayerGroup>>,
	groups: Vec<PlayerGroup>,
	incoming: Receiver<WorldHorde>,
	events: Receiver<WorldEvent>,
	hordes: Vec<WorldHorde>,
	biomes: Arc<dyn BiomeMap>,
	member_ids: MemberIdAllocator,
	ids: HordeIds,
	snapshots: Broadcast<Vec<HordeSnapshot>>,
	saved: Broadcast<Vec<HordeData>>,
}

impl std::fmt::Debug for HordeTracker {
	fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
		f.debug_struct("HordeTracker")
			.field("hordes", &self.hordes.len())
			.field("player_groups", &self.groups.len())
			.finish()
	}
}

impl HordeTracker {
	pub fn new(settings: HordeSettings, requests: WorldRequests, players: Subscriber<Vec<PlayerGroup>>, biomes: Arc<dyn BiomeMap>) -> (Self, TrackerHandle) {
		let (tx, rx) = crossbeam_channel::unbounded();
		let (events_tx, events_rx) = crossbeam_channel::unbounded();
		let ids = HordeIds::default();
		let snapshots = Broadcast::with_capacity(settings.broadcast_capacity);
		let saved = Broadcast::with_capacity(1);

		let handle = TrackerHandle {
			spawner: HordeSpawner { incoming: tx, ids: ids.clone() },
			events: events_tx,
			feed: snapshots.clone(),
			snapshots: snapshots.subscribe(),
			saved: saved.subscribe(),
		};
		let tracker = Self {
			settings,
			requests,
			players,
			groups: Vec::new(),
			incoming: rx,
			events: events_rx,
			hordes: Vec::new(),
			biomes,
			member_ids: MemberIdAllocator::new(),
			ids,
			snapshots,
			saved,
		};
		(tracker, handle)
	}

	pub fn hordes(&self) -> &[WorldHorde] {
		&self.hordes
	}

	/// Sends every horde within reach of an event toward the closest-reaching one.
	fn interrupt_for_events(&mut self, events: &[WorldEvent]) {
		for horde in &mut self.hordes {
			if horde.is_dead() {
				continue;
			}
			let location = horde.location();
			let Some(event) = events.iter().filter(|event| event.reaches(location)).min_by(|a, b| a.distance.total_cmp(&b.distance)) else {
				continue;
			};
			horde.interrupt(vec![Box::new(GoToTargetCommand::new(event.location)), Box::new(WanderCommand::new(EVENT_WANDER_TIME))]);
		}
	}

	fn merge_and_split(&mut self) {
		let len = self.hordes.len();
		for i in 0..len {
			for j in (i + 1)..len {
				let (head, tail) = self.hordes.split_at_mut(j);
				let (a, b) = (&mut head[i], &mut tail[0]);
				if !a.can_merge_with(b, &self.settings) {
					continue;
				}
				let (absorber, absorbed) = if a.objective_score() <= b.objective_score() { (a, b) } else { (b, a) };
				if let Err(err) = absorber.merge(absorbed) {
					tracing::warn!(horde = %absorber.id(), other = %absorbed.id(), error = %err, "tracker.merge_failed");
				}
			}
		}

		let max = self.settings.max_horde_density;
		let ids = &self.ids;
		let mut split = Vec::new();
		for horde in &mut self.hordes {
			if horde.is_merged() || horde.is_dead() {
				continue;
			}
			split.extend(horde.split(max, &mut || ids.next()));
		}
		self.hordes.extend(split);
	}
}

fn step_horde(horde: &mut WorldHorde, ctx: HordeContext<'_>, groups: &[PlayerGroup], biomes: &dyn BiomeMap, dt: f32) -> Result<(), HordeError> {
	let view = ctx.settings.view_distance;
	match groups.iter().find(|group| group.any_within(horde.location(), view)) {
		Some(group) => {
			horde.check_spawn_progress(ctx.requests)?;
			horde.spawn(ctx, group);
			horde.update_members(ctx, group);
		}
		None => horde.despawn(ctx.requests)?,
	}

	if horde.is_spawned() {
		horde.poll_update();
		horde.request_update(ctx.requests)?;
	} else {
		horde.decay(ctx.settings.density_decay_rate, biomes, dt);
	}

	horde.remove_dead_clusters();
	if !horde.is_dead() {
		horde.update_ai(dt);
	}
	Ok(())
}

impl Worker for HordeTracker {
	fn name(&self) -> &str {
		"horde_tracker"
	}

	fn update(&mut self, dt: f32) -> Result<(), String> {
		self.hordes.extend(self.incoming.try_iter());
		if let Some(groups) = self.players.try_get() {
			self.groups = groups;
		}
		let events: Vec<WorldEvent> = self.events.try_iter().collect();
		if !events.is_empty() {
			tracing::debug!(events = events.len(), "tracker.events");
			self.interrupt_for_events(&events);
		}

		let ctx = HordeContext {
			requests: &self.requests,
			settings: &self.settings,
			ids: &self.member_ids,
		};
		let mut faults = Vec::new();
		for horde in &mut self.hordes {
			if let Err(err) = step_horde(horde, ctx, &self.groups, self.biomes.as_ref(), dt) {
				tracing::warn!(horde = %horde.id(), error = %err, "tracker.horde_step_failed");
				faults.push(format!("{}: {err}", horde.id()));
			}
		}

		self.merge_and_split();
		let before = self.hordes.len();
		self.hordes.retain(|horde| !horde.is_dead() && !horde.is_merged());
		if self.hordes.len() != before {
			tracing::debug!(removed = before - self.hordes.len(), remaining = self.hordes.len(), "tracker.hordes_removed");
		}
		self.snapshots.update(self.hordes.iter().map(WorldHorde::snapshot).collect());

		if faults.is_empty() { Ok(()) } else { Err(faults.join("; ")) }
	}

	fn on_shutdown(&mut self) {
		self.hordes.extend(self.incoming.try_iter());
		self.hordes.retain(|horde| !horde.is_dead() && !horde.is_merged());
		let saved: Vec<HordeData> = self.hordes.iter().map(WorldHorde::data).collect();
		tracing::info!(hordes = saved.len(), "tracker.saved");
		self.saved.update(saved);
	}
}
