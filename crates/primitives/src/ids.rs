use std::fmt;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

use serde::{Deserialize, Serialize};

/// World-assigned numeric id of a live actor. Reassigned every time a member respawns.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct ActorId(pub u32);

/// Actor class (the world's archetype id for what to spawn).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct ClassId(pub u32);

/// Stable logical id of a cluster member. Survives despawn/respawn cycles.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct MemberId(pub u64);

impl fmt::Display for ActorId {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		write!(f, "actor#{}", self.0)
	}
}

impl fmt::Display for ClassId {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		write!(f, "class#{}", self.0)
	}
}

impl fmt::Display for MemberId {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		write!(f, "member#{}", self.0)
	}
}

/// Monotonic allocator for [`MemberId`]s, shared by clone.
#[derive(Debug, Default, Clone)]
pub struct MemberIdAllocator {
	next: Arc<AtomicU64>,
}

impl MemberIdAllocator {
	pub fn new() -> Self {
		Self::default()
	}

	/// Returns the next id, starting at 1.
	pub fn next(&self) -> MemberId {
		MemberId(self.next.fetch_add(1, Ordering::AcqRel).wrapping_add(1))
	}
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn allocator_is_shared_between_clones() {
		let a = MemberIdAllocator::new();
		let b = a.clone();
		assert_eq!(a.next(), MemberId(1));
		assert_eq!(b.next(), MemberId(2));
		assert_eq!(a.next(), MemberId(3));
	}
}
