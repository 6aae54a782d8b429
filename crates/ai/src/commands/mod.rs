mod go_to_target;
mod sleeping;
mod wander;

pub use go_to_target::{GoToTargetCommand, MIN_DISTANCE_TO_TARGET};
pub use sleeping::SleepingCommand;
pub use wander::WanderCommand;
