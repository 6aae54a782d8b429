use horde_primitives::Vec3;
use horde_worker::{Broadcast, SynchronizedJob};

use crate::PlayerSnapshot;

/// Players close enough to each other to share spawned hordes.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct PlayerGroup {
	players: Vec<PlayerSnapshot>,
}

impl PlayerGroup {
	pub fn new(players: Vec<PlayerSnapshot>) -> Self {
		Self { players }
	}

	pub fn players(&self) -> &[PlayerSnapshot] {
		&self.players
	}

	pub fn len(&self) -> usize {
		self.players.len()
	}

	pub fn is_empty(&self) -> bool {
		self.players.is_empty()
	}

	/// Closest player to `location` and the distance to them.
	pub fn closest_to(&self, location: Vec3) -> Option<(PlayerSnapshot, f32)> {
		self.players
			.iter()
			.map(|player| (*player, player.location.distance(location)))
			.min_by(|a, b| a.1.total_cmp(&b.1))
	}

	/// Mean location of the group's players.
	pub fn center(&self) -> Option<Vec3> {
		Vec3::mean(self.players.iter().map(|player| player.location))
	}

	/// True when any player is within `distance` of `location`.
	pub fn any_within(&self, location: Vec3, distance: f32) -> bool {
		self.players.iter().any(|player| player.location.distance(location) <= distance)
	}
}

/// Partitions players into groups whose members chain together within `distance` on the horizontal plane.
pub fn group_players(players: &[PlayerSnapshot], distance: f32) -> Vec<PlayerGroup> {
	let mut assigned = vec![false; players.len()];
	let mut groups = Vec::new();

	for start in 0..players.len() {
		if assigned[start] {
			continue;
		}
		assigned[start] = true;
		let mut members = vec![players[start]];
		let mut frontier = vec![start];

		while let Some(current) = frontier.pop() {
			for (index, other) in players.iter().enumerate() {
				if assigned[index] || players[current].location.distance_xz(other.location) > distance {
					continue;
				}
				assigned[index] = true;
				members.push(*other);
				frontier.push(index);
			}
		}
		groups.push(PlayerGroup::new(members));
	}
	groups
}

/// Groups players off the main context and publishes the result to the tracker.
#[derive(Debug)]
pub struct PlayerTracker {
	view_distance: f32,
	groups: Broadcast<Vec<PlayerGroup>>,
}

impl PlayerTracker {
	pub fn new(view_distance: f32, groups: Broadcast<Vec<PlayerGroup>>) -> Self {
		Self { view_distance, groups }
	}
}

impl SynchronizedJob for PlayerTracker {
	type Input = Vec<PlayerSnapshot>;
	type Output = Vec<PlayerGroup>;

	fn name(&self) -> &str {
		"player_tracker"
	}

	fn compute(&mut self, input: Vec<PlayerSnapshot>, _dt: f32) -> Result<Vec<PlayerGroup>, String> {
		Ok(group_players(&input, self.view_distance))
	}

	fn on_finish(&mut self, output: Vec<PlayerGroup>) {
		tracing::trace!(groups = output.len(), "players.grouped");
		self.groups.update(output);
	}
}
