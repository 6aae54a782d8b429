use std::ops::{Add, AddAssign, Div, Mul, Sub};

use serde::{Deserialize, Serialize};

/// A position or offset in world space. `y` is the vertical axis.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Vec3 {
	pub x: f32,
	pub y: f32,
	pub z: f32,
}

impl Vec3 {
	pub const ZERO: Self = Self::new(0.0, 0.0, 0.0);

	pub const fn new(x: f32, y: f32, z: f32) -> Self {
		Self { x, y, z }
	}

	/// Returns the same point with `y` dropped to zero.
	pub const fn flatten(self) -> Self {
		Self::new(self.x, 0.0, self.z)
	}

	pub fn length(self) -> f32 {
		(self.x * self.x + self.y * self.y + self.z * self.z).sqrt()
	}

	pub fn distance(self, other: Self) -> f32 {
		(self - other).length()
	}

	/// Distance on the horizontal plane, ignoring height.
	pub fn distance_xz(self, other: Self) -> f32 {
		let dx = self.x - other.x;
		let dz = self.z - other.z;
		(dx * dx + dz * dz).sqrt()
	}

	pub fn distance_squared(self, other: Self) -> f32 {
		let d = self - other;
		d.x * d.x + d.y * d.y + d.z * d.z
	}

	/// Unit vector in the same direction. The zero vector stays zero.
	pub fn normalized(self) -> Self {
		let length = self.length();
		if length <= f32::EPSILON {
			return Self::ZERO;
		}
		self / length
	}

	/// Moves toward `target` by at most `max_step`, never overshooting.
	pub fn step_toward(self, target: Self, max_step: f32) -> Self {
		let delta = target - self;
		let distance = delta.length();
		if distance <= max_step {
			return target;
		}
		self + delta * (max_step / distance)
	}

	/// Arithmetic mean of the given points, or `None` when the iterator is empty.
	pub fn mean<I>(points: I) -> Option<Self>
	where
		I: IntoIterator<Item = Self>,
	{
		let mut sum = Self::ZERO;
		let mut count = 0usize;
		for point in points {
			sum += point;
			count += 1;
		}

		(count > 0).then(|| sum / count as f32)
	}
}

impl Add for Vec3 {
	type Output = Self;

	fn add(self, rhs: Self) -> Self {
		Self::new(self.x + rhs.x, self.y + rhs.y, self.z + rhs.z)
	}
}

impl AddAssign for Vec3 {
	fn add_assign(&mut self, rhs: Self) {
		*self = *self + rhs;
	}
}

impl Sub for Vec3 {
	type Output = Self;

	fn sub(self, rhs: Self) -> Self {
		Self::new(self.x - rhs.x, self.y - rhs.y, self.z - rhs.z)
	}
}

impl Mul<f32> for Vec3 {
	type Output = Self;

	fn mul(self, rhs: f32) -> Self {
		Self::new(self.x * rhs, self.y * rhs, self.z * rhs)
	}
}

impl Div<f32> for Vec3 {
	type Output = Self;

	fn div(self, rhs: f32) -> Self {
		Self::new(self.x / rhs, self.y / rhs, self.z / rhs)
	}
}
