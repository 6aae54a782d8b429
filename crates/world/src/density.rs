use serde::{Deserialize, Serialize};

/// Density at or below which a cluster is extinct.
pub const DEAD_DENSITY: f32 = f32::EPSILON;

/// How much of a horde a cluster still represents, and each member's share of it.
///
/// Density never grows after construction. The per-member share is only
/// recomputed when the member count changes, so removing a member always
/// removes the share it was spawned with.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ClusterDensity {
	density: f32,
	per_member: f32,
}

impl ClusterDensity {
	pub fn new(density: f32) -> Self {
		let density = density.max(0.0);
		Self {
			density,
			per_member: density,
		}
	}

	pub fn density(&self) -> f32 {
		self.density
	}

	pub fn per_member(&self) -> f32 {
		self.per_member
	}

	pub fn update_per_member(&mut self, members: usize) {
		if members > 0 {
			self.per_member = self.density / members as f32;
		}
	}

	/// Removes `amount`; negative amounts are ignored.
	pub fn remove(&mut self, amount: f32) {
		self.density -= amount.max(0.0);
	}

	/// Removes one member's share.
	pub fn remove_member(&mut self) {
		self.remove(self.per_member);
	}

	pub fn is_dead(&self) -> bool {
		self.density <= DEAD_DENSITY
	}
}
