//! Core value types for the horde simulation: positions, bounds, identifiers and randomness.

/// Axis-aligned world bounds.
pub mod bounds;
/// Identifier types for actors, classes and cluster members.
pub mod ids;
/// Seeded random source handed to command generators.
pub mod random;
/// Three-component world positions.
pub mod vec3;

pub use bounds::Bounds;
pub use ids::{ActorId, ClassId, MemberId, MemberIdAllocator};
pub use random::WorldRandom;
pub use vec3::Vec3;
