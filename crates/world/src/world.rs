use horde_ai::Target;
use horde_ai::zone::BiomeId;
use horde_primitives::{ActorId, ClassId, Vec3};
use serde::{Deserialize, Serialize};

/// Population category a horde draws its members from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum HordeKind {
	Enemy,
	Animal,
}

impl HordeKind {
	pub const fn as_str(self) -> &'static str {
		match self {
			Self::Enemy => "enemy",
			Self::Animal => "animal",
		}
	}
}

/// Position of one player at the time the snapshot was taken.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PlayerSnapshot {
	pub actor: ActorId,
	pub location: Vec3,
	/// How much noise the player is making, `0.0..=1.0`.
	pub noise: f32,
}

impl PlayerSnapshot {
	pub fn as_target(&self) -> Target {
		Target {
			actor: self.actor,
			location: self.location,
			is_player: true,
		}
	}
}

/// A live actor owned by the world.
pub trait Actor {
	fn location(&self) -> Vec3;

	fn target(&self) -> Option<Target>;

	fn set_target(&mut self, target: Target);

	fn move_to(&mut self, location: Vec3, dt: f32);

	fn stop(&mut self);

	fn is_moving(&self) -> bool;

	fn is_dead(&self) -> bool;

	fn sleep(&mut self);

	fn wake_up(&mut self);

	fn is_sleeping(&self) -> bool;

	fn can_see(&self, location: Vec3) -> bool;
}

/// Biome lookup that may be queried from any thread.
pub trait BiomeMap: Send + Sync {
	fn biome_at(&self, location: Vec3) -> BiomeId;
}

/// The authoritative world. Only ever touched on the main context.
pub trait World {
	/// Creates an actor of `class` at `location`. `None` when the world refuses the spawn.
	fn spawn_actor(&mut self, class: ClassId, id: ActorId, location: Vec3) -> Option<ActorId>;

	fn remove_actor(&mut self, id: ActorId);

	fn actor(&self, id: ActorId) -> Option<&dyn Actor>;

	fn actor_mut(&mut self, id: ActorId) -> Option<&mut dyn Actor>;

	/// A walkable point between `min` and `max` away from `origin`.
	fn find_valid_spawn_point(&mut self, origin: Vec3, min: f32, max: f32) -> Option<Vec3>;

	fn players(&self) -> Vec<PlayerSnapshot>;

	fn actors_alive(&self, kind: HordeKind) -> usize;

	fn max_actors_alive(&self, kind: HordeKind) -> usize;

	fn biome_at(&self, location: Vec3) -> BiomeId;

	fn next_actor_id(&mut self) -> ActorId;
}
