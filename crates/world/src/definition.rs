use std::collections::HashMap;
use std::sync::Arc;

use horde_ai::CommandGenerator;
use horde_ai::zone::BiomeId;
use horde_primitives::{ClassId, WorldRandom};

use crate::{HordeError, HordeKind, PlayerGroup};

/// Picks member classes and member counts for one cluster spawn.
pub trait EntityGenerator: Send {
	/// Whether a generator built for an earlier player group still fits `players`.
	fn is_still_valid_for(&self, players: &PlayerGroup) -> bool;

	/// Rebinds a reused generator to the players it now spawns for.
	fn set_players(&mut self, _players: &PlayerGroup) {}

	fn class_id(&mut self, rng: &mut WorldRandom) -> ClassId;

	/// Members to spawn for a cluster of `density`.
	fn member_count(&self, density: f32) -> usize;
}

/// A kind of horde: what it spawns, how it moves and who it merges with.
pub trait HordeDefinition: Send + Sync {
	/// Stable name used in snapshots and persisted data.
	fn name(&self) -> &'static str;

	fn kind(&self) -> HordeKind;

	fn entity_generator(&self, players: &PlayerGroup, rng: &mut WorldRandom) -> Option<Box<dyn EntityGenerator>>;

	fn can_merge_with(&self, other: &dyn HordeDefinition) -> bool {
		self.kind() == other.kind()
	}

	/// Walking speed of unloaded members and of the horde as a whole, in units per second.
	fn walk_speed(&self) -> f32 {
		1.0
	}

	/// Command stream for the horde as a group.
	fn group_commands(&self, _home: BiomeId) -> Option<Box<dyn CommandGenerator>> {
		None
	}

	/// Per-member command stream run alongside the group's.
	fn member_commands(&self) -> Option<Box<dyn CommandGenerator>> {
		None
	}
}

/// Resolves persisted definition names back to definitions.
#[derive(Default, Clone)]
pub struct HordeCatalog {
	definitions: HashMap<&'static str, Arc<dyn HordeDefinition>>,
}

impl std::fmt::Debug for HordeCatalog {
	fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
		let mut names: Vec<_> = self.definitions.keys().collect();
		names.sort_unstable();
		f.debug_struct("HordeCatalog").field("definitions", &names).finish()
	}
}

impl HordeCatalog {
	pub fn new() -> Self {
		Self::default()
	}

	pub fn register(&mut self, definition: Arc<dyn HordeDefinition>) {
		self.definitions.insert(definition.name(), definition);
	}

	pub fn get(&self, name: &str) -> Result<Arc<dyn HordeDefinition>, HordeError> {
		self.definitions
			.get(name)
			.cloned()
			.ok_or_else(|| HordeError::UnknownDefinition(name.to_string()))
	}
}
