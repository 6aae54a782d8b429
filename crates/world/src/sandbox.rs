//! Deterministic in-memory world for tests and the headless driver.

use std::collections::{BTreeMap, HashMap};
use std::sync::Arc;

use horde_ai::zone::{BiomeId, ZoneSource};
use horde_ai::{CommandGenerator, Target};
use horde_ai::wander::{WildernessWander, ZoneWander};
use horde_primitives::{ActorId, Bounds, ClassId, Vec3, WorldRandom};

use crate::{Actor, BiomeMap, EntityGenerator, HordeDefinition, HordeKind, PlayerGroup, PlayerSnapshot, World};

/// Speed of sandbox actors in units per second.
pub const ACTOR_SPEED: f32 = 4.0;
/// How far sandbox actors can see.
pub const ACTOR_SIGHT: f32 = 24.0;

#[derive(Debug, Clone, PartialEq)]
pub struct SandboxActor {
	id: ActorId,
	class: ClassId,
	kind: HordeKind,
	location: Vec3,
	target: Option<Target>,
	moving: bool,
	sleeping: bool,
	dead: bool,
}

impl SandboxActor {
	pub fn id(&self) -> ActorId {
		self.id
	}

	pub fn class(&self) -> ClassId {
		self.class
	}

	pub fn kind(&self) -> HordeKind {
		self.kind
	}
}

impl Actor for SandboxActor {
	fn location(&self) -> Vec3 {
		self.location
	}

	fn target(&self) -> Option<Target> {
		self.target
	}

	fn set_target(&mut self, target: Target) {
		self.target = Some(target);
	}

	fn move_to(&mut self, location: Vec3, dt: f32) {
		self.moving = true;
		self.location = self.location.step_toward(location, ACTOR_SPEED * dt);
	}

	fn stop(&mut self) {
		self.moving = false;
	}

	fn is_moving(&self) -> bool {
		self.moving
	}

	fn is_dead(&self) -> bool {
		self.dead
	}

	fn sleep(&mut self) {
		self.sleeping = true;
	}

	fn wake_up(&mut self) {
		self.sleeping = false;
	}

	fn is_sleeping(&self) -> bool {
		self.sleeping
	}

	fn can_see(&self, location: Vec3) -> bool {
		self.location.distance(location) <= ACTOR_SIGHT
	}
}

/// Rectangular biome regions over a default biome. Later regions win.
#[derive(Debug, Clone, Default)]
pub struct SandboxBiomes {
	default: BiomeId,
	regions: Vec<(Bounds, BiomeId)>,
}

impl SandboxBiomes {
	pub fn new(default: BiomeId) -> Self {
		Self {
			default,
			regions: Vec::new(),
		}
	}

	pub fn with_region(mut self, bounds: Bounds, biome: BiomeId) -> Self {
		self.regions.push((bounds, biome));
		self
	}
}

impl BiomeMap for SandboxBiomes {
	fn biome_at(&self, location: Vec3) -> BiomeId {
		self.regions
			.iter()
			.rev()
			.find(|(bounds, _)| bounds.contains_xz(location))
			.map_or(self.default, |(_, biome)| *biome)
	}
}

/// A flat world where every requested spawn point is valid unless told otherwise.
#[derive(Debug)]
pub struct SandboxWorld {
	actors: BTreeMap<ActorId, SandboxActor>,
	class_kinds: HashMap<ClassId, HordeKind>,
	players: Vec<PlayerSnapshot>,
	biomes: Arc<SandboxBiomes>,
	max_alive: usize,
	next_id: u32,
	refuse_spawn_points: bool,
	refuse_actors: bool,
}

impl SandboxWorld {
	pub fn new(biomes: Arc<SandboxBiomes>) -> Self {
		Self {
			actors: BTreeMap::new(),
			class_kinds: HashMap::new(),
			players: Vec::new(),
			biomes,
			max_alive: usize::MAX,
			next_id: 1_000,
			refuse_spawn_points: false,
			refuse_actors: false,
		}
	}

	pub fn biomes(&self) -> Arc<SandboxBiomes> {
		Arc::clone(&self.biomes)
	}

	pub fn set_class_kind(&mut self, class: ClassId, kind: HordeKind) {
		self.class_kinds.insert(class, kind);
	}

	pub fn set_max_alive(&mut self, max: usize) {
		self.max_alive = max;
	}

	/// Makes `find_valid_spawn_point` fail.
	pub fn refuse_spawn_points(&mut self, refuse: bool) {
		self.refuse_spawn_points = refuse;
	}

	/// Makes `spawn_actor` fail.
	pub fn refuse_actors(&mut self, refuse: bool) {
		self.refuse_actors = refuse;
	}

	/// Adds or moves a player.
	pub fn put_player(&mut self, actor: ActorId, location: Vec3, noise: f32) {
		match self.players.iter_mut().find(|player| player.actor == actor) {
			Some(player) => {
				player.location = location;
				player.noise = noise;
			}
			None => self.players.push(PlayerSnapshot { actor, location, noise }),
		}
	}

	pub fn remove_player(&mut self, actor: ActorId) {
		self.players.retain(|player| player.actor != actor);
	}

	pub fn sandbox_actor(&self, id: ActorId) -> Option<&SandboxActor> {
		self.actors.get(&id)
	}

	pub fn actors(&self) -> impl Iterator<Item = &SandboxActor> {
		self.actors.values()
	}

	pub fn actor_count(&self) -> usize {
		self.actors.len()
	}

	pub fn kill(&mut self, id: ActorId) -> bool {
		match self.actors.get_mut(&id) {
			Some(actor) => {
				actor.dead = true;
				true
			}
			None => false,
		}
	}
}

impl World for SandboxWorld {
	fn spawn_actor(&mut self, class: ClassId, id: ActorId, location: Vec3) -> Option<ActorId> {
		if self.refuse_actors || self.actors.contains_key(&id) {
			return None;
		}
		let kind = self.class_kinds.get(&class).copied().unwrap_or(HordeKind::Enemy);
		self.actors.insert(
			id,
			SandboxActor {
				id,
				class,
				kind,
				location,
				target: None,
				moving: false,
				sleeping: false,
				dead: false,
			},
		);
		Some(id)
	}

	fn remove_actor(&mut self, id: ActorId) {
		self.actors.remove(&id);
	}

	fn actor(&self, id: ActorId) -> Option<&dyn Actor> {
		self.actors.get(&id).map(|actor| actor as &dyn Actor)
	}

	fn actor_mut(&mut self, id: ActorId) -> Option<&mut dyn Actor> {
		self.actors.get_mut(&id).map(|actor| actor as &mut dyn Actor)
	}

	fn find_valid_spawn_point(&mut self, origin: Vec3, _min: f32, _max: f32) -> Option<Vec3> {
		(!self.refuse_spawn_points).then_some(origin.flatten())
	}

	fn players(&self) -> Vec<PlayerSnapshot> {
		self.players.clone()
	}

	fn actors_alive(&self, kind: HordeKind) -> usize {
		self.actors.values().filter(|actor| actor.kind == kind && !actor.dead).count()
	}

	fn max_actors_alive(&self, _kind: HordeKind) -> usize {
		self.max_alive
	}

	fn biome_at(&self, location: Vec3) -> BiomeId {
		self.biomes.biome_at(location)
	}

	fn next_actor_id(&mut self) -> ActorId {
		self.next_id = self.next_id.wrapping_add(1);
		ActorId(self.next_id)
	}
}

/// Horde definition with a fixed class list and a fixed member count per unit of density.
#[derive(Clone)]
pub struct SandboxHorde {
	name: &'static str,
	kind: HordeKind,
	classes: Vec<ClassId>,
	members_per_density: f32,
	walk_speed: f32,
	wander: Option<SandboxWander>,
}

/// Group behaviour of a [`SandboxHorde`] while no interrupt is active.
#[derive(Clone)]
enum SandboxWander {
	Wilderness(Arc<dyn ZoneSource>),
	Zones(Arc<dyn ZoneSource>),
}

impl std::fmt::Debug for SandboxHorde {
	fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
		f.debug_struct("SandboxHorde")
			.field("name", &self.name)
			.field("kind", &self.kind)
			.field("classes", &self.classes)
			.field("members_per_density", &self.members_per_density)
			.finish()
	}
}

impl SandboxHorde {
	pub fn new(name: &'static str, kind: HordeKind, classes: Vec<ClassId>) -> Self {
		Self {
			name,
			kind,
			classes,
			members_per_density: 10.0,
			walk_speed: 1.0,
			wander: None,
		}
	}

	pub fn members_per_density(mut self, members: f32) -> Self {
		self.members_per_density = members;
		self
	}

	pub fn walk_speed(mut self, speed: f32) -> Self {
		self.walk_speed = speed;
		self
	}

	/// Wanders the wilderness of the horde's home biome over `zones`.
	pub fn wandering(mut self, zones: Arc<dyn ZoneSource>) -> Self {
		self.wander = Some(SandboxWander::Wilderness(zones));
		self
	}

	/// Moves between `zones` regardless of biome.
	pub fn zone_wandering(mut self, zones: Arc<dyn ZoneSource>) -> Self {
		self.wander = Some(SandboxWander::Zones(zones));
		self
	}
}

impl HordeDefinition for SandboxHorde {
	fn name(&self) -> &'static str {
		self.name
	}

	fn kind(&self) -> HordeKind {
		self.kind
	}

	fn entity_generator(&self, players: &PlayerGroup, _rng: &mut WorldRandom) -> Option<Box<dyn EntityGenerator>> {
		if self.classes.is_empty() {
			return None;
		}
		Some(Box::new(SandboxGenerator {
			classes: self.classes.clone(),
			members_per_density: self.members_per_density,
			players: players.len(),
		}))
	}

	fn walk_speed(&self) -> f32 {
		self.walk_speed
	}

	fn group_commands(&self, home: BiomeId) -> Option<Box<dyn CommandGenerator>> {
		match self.wander.as_ref()? {
			SandboxWander::Wilderness(zones) => Some(Box::new(WildernessWander::generator(Arc::clone(zones), home))),
			SandboxWander::Zones(zones) => Some(Box::new(ZoneWander::generator(Arc::clone(zones)))),
		}
	}
}

/// Generator built for a fixed number of players.
#[derive(Debug)]
pub struct SandboxGenerator {
	classes: Vec<ClassId>,
	members_per_density: f32,
	players: usize,
}

impl EntityGenerator for SandboxGenerator {
	fn is_still_valid_for(&self, players: &PlayerGroup) -> bool {
		self.players == players.len()
	}

	fn set_players(&mut self, players: &PlayerGroup) {
		self.players = players.len();
	}

	fn class_id(&mut self, rng: &mut WorldRandom) -> ClassId {
		rng.pick(&self.classes).copied().unwrap_or(ClassId(0))
	}

	fn member_count(&self, density: f32) -> usize {
		if density <= crate::DEAD_DENSITY {
			return 0;
		}
		((density * self.members_per_density).round() as usize).max(1)
	}
}
