use thiserror::Error;

/// Errors surfaced to producers of main-context requests.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RequestError {
	/// A blocking request was issued from the main context itself, which would park the
	/// only thread able to process it.
	#[error("blocking request issued from the main context would never complete")]
	WouldDeadlock,

	/// The processor has been shut down and no longer accepts requests.
	#[error("request processor is shut down")]
	Closed,

	/// The request was discarded before completing, either by shutdown or because the
	/// processor was dropped.
	#[error("request was abandoned before completion")]
	Abandoned,

	/// The request reported a failure from `tick_execute` and was dropped.
	#[error("request {name} failed: {message}")]
	Failed {
		/// Request name as reported by [`crate::MainThreadRequest::name`].
		name: &'static str,
		/// Failure message returned by the request.
		message: String,
	},

	/// The request panicked while executing and was dropped.
	#[error("request {name} panicked: {message}")]
	Panicked {
		/// Request name as reported by [`crate::MainThreadRequest::name`].
		name: &'static str,
		/// Extracted panic payload.
		message: String,
	},
}

/// Errors from starting or registering background workers.
#[derive(Debug, Error)]
pub enum WorkerError {
	/// The OS refused to create the worker thread.
	#[error("failed to spawn worker thread {name}: {source}")]
	Spawn {
		name: String,
		#[source]
		source: std::io::Error,
	},

	/// A worker with the same name is already running in this registry.
	#[error("worker {0} is already registered")]
	Duplicate(String),
}
