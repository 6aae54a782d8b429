//! Hordes living in a world they only touch through main-context requests.
//!
//! A [`WorldHorde`] is a set of [`HordeCluster`]s that move as one. While no
//! player is near, the horde is a single body stepped by the
//! [`HordeTracker`] on its own thread. Once players come within view
//! distance the tracker queues [`requests`] that spawn the members one by
//! one, keep their AI running and despawn them again when the players leave.
//! The [`populator`] worker tops the world up with new hordes.

mod agent;
mod cluster;
mod definition;
mod density;
mod error;
mod horde;
mod member;
mod players;
pub mod populator;
pub mod requests;
pub mod sandbox;
mod settings;
mod tracker;
mod world;

pub use agent::MemberAgent;
pub use cluster::{ClusterData, ClusterSpawnState, HordeCluster, SharedCluster, SpawnState};
pub use definition::{EntityGenerator, HordeCatalog, HordeDefinition};
pub use density::{ClusterDensity, DEAD_DENSITY};
pub use error::HordeError;
pub use horde::{ClusterSnapshot, HordeBody, HordeContext, HordeData, HordeId, HordeSnapshot, WorldHorde};
pub use member::ClusterMember;
pub use players::{PlayerGroup, PlayerTracker, group_players};
pub use settings::{ConfigError, HordeSettings};
pub use tracker::{EVENT_WANDER_TIME, HordeIds, HordeSpawner, HordeTracker, TrackerHandle, WorldEvent};
pub use world::{Actor, BiomeMap, HordeKind, PlayerSnapshot, World};
