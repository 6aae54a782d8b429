use serde::{Deserialize, Serialize};

use crate::Vec3;

/// Axis-aligned box in world space. `min` is inclusive, `max` exclusive.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Bounds {
	pub min: Vec3,
	pub max: Vec3,
}

impl Bounds {
	/// Creates bounds from two corners, normalising them so `min <= max` on every axis.
	pub fn new(a: Vec3, b: Vec3) -> Self {
		Self {
			min: Vec3::new(a.x.min(b.x), a.y.min(b.y), a.z.min(b.z)),
			max: Vec3::new(a.x.max(b.x), a.y.max(b.y), a.z.max(b.z)),
		}
	}

	/// Square bounds of `half_extent` around `center` on the horizontal plane.
	pub fn around(center: Vec3, half_extent: f32) -> Self {
		let offset = Vec3::new(half_extent, 0.0, half_extent);
		Self::new(center - offset, center + offset)
	}

	pub fn center(&self) -> Vec3 {
		(self.min + self.max) / 2.0
	}

	pub fn size(&self) -> Vec3 {
		self.max - self.min
	}

	/// Horizontal containment test; height is ignored.
	pub fn contains_xz(&self, point: Vec3) -> bool {
		point.x >= self.min.x && point.x < self.max.x && point.z >= self.min.z && point.z < self.max.z
	}
}

#[cfg(test)]
mod tests {
	use super::Bounds;
	use crate::Vec3;

	#[test]
	fn new_normalises_corners() {
		let bounds = Bounds::new(Vec3::new(10.0, 5.0, -2.0), Vec3::new(-10.0, 0.0, 2.0));
		assert_eq!(bounds.min, Vec3::new(-10.0, 0.0, -2.0));
		assert_eq!(bounds.max, Vec3::new(10.0, 5.0, 2.0));
	}

	#[test]
	fn contains_uses_inclusive_min_exclusive_max() {
		let bounds = Bounds::around(Vec3::ZERO, 8.0);
		assert!(bounds.contains_xz(Vec3::new(-8.0, 50.0, -8.0)));
		assert!(!bounds.contains_xz(Vec3::new(8.0, 0.0, 0.0)));
		assert_eq!(bounds.center(), Vec3::ZERO);
	}
}
