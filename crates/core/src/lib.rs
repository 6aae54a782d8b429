//! Runs the horde simulation for a host world.
//!
//! [`HordeCore`] owns the background workers and the main-context request
//! processor. The host calls [`HordeCore::tick`] once per frame with its
//! world; everything else happens on the workers.

pub mod logging;
mod simulation;

pub use simulation::HordeCore;
