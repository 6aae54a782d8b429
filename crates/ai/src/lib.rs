//! Hierarchical command execution for hordes.
//!
//! A [`Command`] is one unit of behavior executed against an [`Agent`]. A
//! [`CommandGenerator`] yields the next command when the current one finishes.
//! [`AgentExecutor`] drives a single slot; [`GroupExecutor`] layers an
//! interrupt stack over a group's base command and shares it with the
//! [`MemberExecutor`]s of every loaded member.

mod agent;
mod command;
/// Built-in commands used by wandering hordes.
pub mod commands;
mod executor;
mod generator;
mod group;
mod member;
/// Wandering state machines over world zones.
pub mod wander;
/// Read-only zone descriptors consumed by wander generators.
pub mod zone;

#[cfg(test)]
mod test_agent;

pub use agent::{Agent, NearbyPlayer, Target};
pub use command::{Command, CommandCallback, CommandExpiry, GeneratedCommand, SharedCommand, same_command};
pub use executor::{AgentExecutor, Step};
pub use generator::{CommandGenerator, StateGenerator, StateMachine, Transition};
pub use group::{GroupExecutor, MemberLink};
pub use member::{LOUD_PLAYER_NOISE, MemberExecutor};
