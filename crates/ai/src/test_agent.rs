use horde_primitives::Vec3;

use crate::{Agent, NearbyPlayer, Target};

/// Agent that teleports a fixed step toward its move target.
#[derive(Debug, Default)]
pub(crate) struct TestAgent {
	pub location: Vec3,
	pub speed: f32,
	pub target: Option<Target>,
	pub sleeping: bool,
	pub dead: bool,
	pub nearby: Option<NearbyPlayer>,
	pub moves: usize,
	pub wakes: usize,
}

impl TestAgent {
	pub fn at(location: Vec3) -> Self {
		Self {
			location,
			speed: 5.0,
			..Self::default()
		}
	}
}

impl Agent for TestAgent {
	fn move_to(&mut self, location: Vec3, _dt: f32) {
		self.moves += 1;
		let delta = location - self.location;
		let distance = delta.length();
		if distance <= self.speed {
			self.location = location;
		} else {
			self.location += delta * (self.speed / distance);
		}
	}

	fn stop(&mut self) {}

	fn is_moving(&self) -> bool {
		false
	}

	fn location(&self) -> Vec3 {
		self.location
	}

	fn target(&self) -> Option<Target> {
		self.target
	}

	fn set_target(&mut self, target: Target) {
		self.target = Some(target);
	}

	fn is_dead(&self) -> bool {
		self.dead
	}

	fn sleep(&mut self) {
		self.sleeping = true;
	}

	fn wake_up(&mut self) {
		self.sleeping = false;
		self.wakes += 1;
	}

	fn is_sleeping(&self) -> bool {
		self.sleeping
	}

	fn nearest_player(&self) -> Option<NearbyPlayer> {
		self.nearby
	}
}
