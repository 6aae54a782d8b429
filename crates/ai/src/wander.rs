use std::sync::Arc;

use horde_primitives::{Vec3, WorldRandom};
use serde::{Deserialize, Serialize};

use crate::commands::{GoToTargetCommand, SleepingCommand, WanderCommand};
use crate::zone::{BiomeId, ZoneId, ZoneSource};
use crate::{Command, StateGenerator, StateMachine, Transition};

/// Chance that an idle wilderness horde heads for a zone of its biome.
pub const WILDERNESS_ZONE_CHANCE: f32 = 0.1;
pub const WILDERNESS_SLEEP_CHANCE: f32 = 0.7;
pub const ZONE_SLEEP_CHANCE: f32 = 0.3;

const BASE_WANDER_TIME: f32 = 100.0;
const WANDER_TIME_STEPS: usize = 48;
const WANDER_TIME_STEP: f32 = 100.0;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum WanderPhase {
	#[default]
	Idle,
	Moving,
	Wandering,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub enum WanderTarget {
	Zone(ZoneId),
	Location(Vec3),
}

#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct WanderState {
	pub phase: WanderPhase,
	pub target: Option<WanderTarget>,
	/// Wander time left at the current target.
	pub remaining: f32,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum WanderEvent {
	Arrived,
	WanderFinished,
	WanderInterrupted { remaining: f32 },
}

fn apply_wander_event(state: WanderState, event: WanderEvent) -> WanderState {
	match (state.phase, event) {
		(WanderPhase::Moving, WanderEvent::Arrived) => WanderState {
			phase: WanderPhase::Wandering,
			..state
		},
		(WanderPhase::Wandering, WanderEvent::WanderFinished) => WanderState {
			phase: WanderPhase::Idle,
			target: None,
			..state
		},
		(WanderPhase::Wandering, WanderEvent::WanderInterrupted { remaining }) => WanderState {
			phase: WanderPhase::Moving,
			remaining,
			..state
		},
		_ => state,
	}
}

fn wander_transition(state: WanderState) -> Option<Transition<WanderEvent>> {
	let transition = Transition::new(WanderCommand::new(state.remaining))
		.on_complete(WanderEvent::WanderFinished)
		.on_interrupt(|command: &dyn Command| WanderEvent::WanderInterrupted {
			remaining: command.remaining_time().unwrap_or(0.0),
		});
	Some(transition)
}

fn go_to(location: Vec3) -> Option<Transition<WanderEvent>> {
	Some(Transition::new(GoToTargetCommand::new(location)).on_complete(WanderEvent::Arrived))
}

fn wander_time(rng: &mut WorldRandom) -> f32 {
	BASE_WANDER_TIME + rng.range(WANDER_TIME_STEPS) as f32 * WANDER_TIME_STEP
}

fn give_up(mut state: WanderState) -> (WanderState, Option<Transition<WanderEvent>>) {
	state.phase = WanderPhase::Idle;
	state.target = None;
	(state, None)
}

/// Roams the open world, occasionally visiting a zone of its own biome.
pub struct WildernessWander {
	zones: Arc<dyn ZoneSource>,
	biome: BiomeId,
}

impl WildernessWander {
	pub fn new(zones: Arc<dyn ZoneSource>, biome: BiomeId) -> Self {
		Self { zones, biome }
	}

	pub fn biome(&self) -> BiomeId {
		self.biome
	}

	pub fn generator(zones: Arc<dyn ZoneSource>, biome: BiomeId) -> WildernessWanderGenerator {
		StateGenerator::new(Self::new(zones, biome), WanderState::default())
	}

	fn pick_target(&self, rng: &mut WorldRandom) -> WanderTarget {
		if rng.chance(WILDERNESS_ZONE_CHANCE)
			&& let Some(zone) = rng.pick(&self.zones.biome_zones(self.biome))
		{
			return WanderTarget::Zone(zone.id);
		}
		WanderTarget::Location(rng.location_in(&self.zones.world_bounds()))
	}
}

impl StateMachine for WildernessWander {
	type State = WanderState;
	type Event = WanderEvent;

	fn apply(&self, state: WanderState, event: WanderEvent) -> WanderState {
		apply_wander_event(state, event)
	}

	fn transition(&self, mut state: WanderState, rng: &mut WorldRandom) -> (WanderState, Option<Transition<WanderEvent>>) {
		match state.phase {
			WanderPhase::Wandering => return (state, wander_transition(state)),
			WanderPhase::Idle => {
				state.target = Some(self.pick_target(rng));
				state.phase = WanderPhase::Moving;
				state.remaining = wander_time(rng);
				if rng.chance(WILDERNESS_SLEEP_CHANCE) {
					let sleep = Transition::new(SleepingCommand::new(state.remaining));
					return (state, Some(sleep));
				}
			}
			WanderPhase::Moving => {}
		}

		match state.target {
			None => give_up(state),
			Some(WanderTarget::Location(location)) => (state, go_to(location)),
			Some(WanderTarget::Zone(id)) => {
				let Some(zone) = self.zones.zones().iter().find(|zone| zone.id == id) else {
					tracing::debug!(zone = %id, "ai.wander_zone_missing");
					return give_up(state);
				};
				let location = zone.location_outside(rng);
				state.target = Some(WanderTarget::Location(location));
				(state, go_to(location))
			}
		}
	}
}

/// Travels from zone to zone, lingering longer in busier ones.
pub struct ZoneWander {
	zones: Arc<dyn ZoneSource>,
}

impl ZoneWander {
	pub fn new(zones: Arc<dyn ZoneSource>) -> Self {
		Self { zones }
	}

	pub fn generator(zones: Arc<dyn ZoneSource>) -> ZoneWanderGenerator {
		StateGenerator::new(Self::new(zones), WanderState::default())
	}
}

impl StateMachine for ZoneWander {
	type State = WanderState;
	type Event = WanderEvent;

	fn apply(&self, state: WanderState, event: WanderEvent) -> WanderState {
		apply_wander_event(state, event)
	}

	fn transition(&self, mut state: WanderState, rng: &mut WorldRandom) -> (WanderState, Option<Transition<WanderEvent>>) {
		match state.phase {
			WanderPhase::Wandering => return (state, wander_transition(state)),
			WanderPhase::Idle => {
				let Some(zone) = rng.pick(self.zones.zones()) else {
					return give_up(state);
				};
				state.target = Some(WanderTarget::Zone(zone.id));
				state.phase = WanderPhase::Moving;
				state.remaining = wander_time(rng) + zone.count as f32 * 2.0;
				if rng.chance(ZONE_SLEEP_CHANCE) {
					let sleep = Transition::new(SleepingCommand::new(state.remaining));
					return (state, Some(sleep));
				}
			}
			WanderPhase::Moving => {}
		}

		let center = match state.target {
			Some(WanderTarget::Zone(id)) => self.zones.zones().iter().find(|zone| zone.id == id).map(|zone| zone.center()),
			Some(WanderTarget::Location(location)) => Some(location),
			None => None,
		};
		match center {
			Some(center) => (state, go_to(center)),
			None => give_up(state),
		}
	}
}

pub type WildernessWanderGenerator = StateGenerator<WildernessWander>;
pub type ZoneWanderGenerator = StateGenerator<ZoneWander>;
