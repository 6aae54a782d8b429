use horde_worker::RequestError;
use thiserror::Error;

/// Structural failures surfaced by cluster and horde operations.
///
/// Transient world conditions (no spawn point, population cap) are never
/// errors; they are logged and retried on a later tick.
#[derive(Debug, Error)]
pub enum HordeError {
	#[error("cluster is already spawning")]
	AlreadySpawning,

	#[error("horde definition `{0}` produced no entity generator")]
	MissingEntityGenerator(&'static str),

	#[error("clusters `{left}` and `{right}` cannot be merged")]
	IncompatibleClusters { left: &'static str, right: &'static str },

	#[error("unknown horde definition `{0}`")]
	UnknownDefinition(String),

	#[error("horde has no clusters")]
	Empty,

	#[error("horde tracker is no longer running")]
	TrackerClosed,

	#[error("request could not be queued: {0}")]
	Request(#[from] RequestError),
}
