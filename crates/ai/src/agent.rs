use horde_primitives::{ActorId, Vec3};

/// What an agent is currently targeting.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Target {
	pub actor: ActorId,
	pub location: Vec3,
	pub is_player: bool,
}

/// The closest player an agent can perceive.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct NearbyPlayer {
	pub target: Target,
	pub distance: f32,
	/// Line of sight to the player.
	pub visible: bool,
	/// How loud the player is, `0.0..=1.0`.
	pub noise: f32,
}

/// Something commands can be executed against: a single member actor, or a whole group.
pub trait Agent {
	fn move_to(&mut self, location: Vec3, dt: f32);

	fn stop(&mut self);

	fn is_moving(&self) -> bool;

	fn location(&self) -> Vec3;

	fn target(&self) -> Option<Target>;

	fn set_target(&mut self, _target: Target) {}

	fn is_dead(&self) -> bool;

	fn sleep(&mut self);

	fn wake_up(&mut self);

	fn is_sleeping(&self) -> bool;

	/// Closest perceivable player. Groups never perceive players directly.
	fn nearest_player(&self) -> Option<NearbyPlayer> {
		None
	}
}
