//! Main-context requests that change the world population a little at a time.
//!
//! Every request here is submitted from the tracker thread and ticked by the
//! [`horde_worker::RequestProcessor`] with the world lent as `dyn World`.

mod ai;
mod despawn;
mod member;
mod spawn;
mod update;

use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};

use horde_worker::RequestSender;

pub use ai::{AiLauncher, MemberAiRequest};
pub use despawn::ClusterDespawnRequest;
pub use member::{MemberDespawnRequest, MemberSpawnRequest, RESPAWN_SPREAD};
pub use spawn::{ClusterSpawnRequest, SpawnPlan};
pub use update::ClusterUpdateRequest;

use crate::{ClusterMember, World};

/// Sender for requests against the world.
pub type WorldRequests = RequestSender<dyn World>;

/// Spawned members of one horde, shared with the requests that spawn and despawn them.
pub type SpawnedCounter = Arc<AtomicUsize>;

/// Invoked with every member a request just brought into the world.
pub type SpawnCallback = Box<dyn FnMut(&mut ClusterMember) + Send>;

pub(crate) fn count_spawned(counter: &SpawnedCounter) {
	counter.fetch_add(1, Ordering::AcqRel);
}

pub(crate) fn count_despawned(counter: &SpawnedCounter) {
	let _ = counter.fetch_update(Ordering::AcqRel, Ordering::Acquire, |n| Some(n.saturating_sub(1)));
}

#[cfg(test)]
mod tests;
