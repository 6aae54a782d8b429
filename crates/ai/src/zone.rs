use std::fmt;

use horde_primitives::{Bounds, Vec3, WorldRandom};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct ZoneId(pub u32);

impl fmt::Display for ZoneId {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		write!(f, "zone#{}", self.0)
	}
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct BiomeId(pub u32);

/// A populated area of the world hordes can wander between.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Zone {
	pub id: ZoneId,
	pub bounds: Bounds,
	pub density: f32,
	/// Number of points of interest inside the zone.
	pub count: u32,
	pub biome: BiomeId,
}

impl Zone {
	pub fn center(&self) -> Vec3 {
		self.bounds.center()
	}

	/// A point on the ring around the zone whose radius is half the zone's diagonal.
	pub fn location_outside(&self, rng: &mut WorldRandom) -> Vec3 {
		let radius = self.bounds.size().flatten().length() / 2.0;
		let angle = rng.range_f32(0.0, std::f32::consts::TAU);
		self.center() + Vec3::new(angle.cos(), 0.0, angle.sin()) * radius
	}
}

/// Read-only view of the world's zones.
pub trait ZoneSource: Send + Sync {
	fn zones(&self) -> &[Zone];

	fn biome_zones(&self, biome: BiomeId) -> Vec<&Zone> {
		self.zones().iter().filter(|zone| zone.biome == biome).collect()
	}

	/// The walkable extent of the world.
	fn world_bounds(&self) -> Bounds;
}

/// A fixed zone list, for worlds whose zones never change.
#[derive(Debug, Clone)]
pub struct StaticZones {
	zones: Vec<Zone>,
	bounds: Bounds,
}

impl StaticZones {
	pub fn new(bounds: Bounds, zones: Vec<Zone>) -> Self {
		Self { zones, bounds }
	}

	pub fn find(&self, id: ZoneId) -> Option<&Zone> {
		self.zones.iter().find(|zone| zone.id == id)
	}
}

impl ZoneSource for StaticZones {
	fn zones(&self) -> &[Zone] {
		&self.zones
	}

	fn world_bounds(&self) -> Bounds {
		self.bounds
	}
}
