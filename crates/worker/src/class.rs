/// Execution classes used for worker scheduling and observability.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TaskClass {
	/// Continuous simulation loops on dedicated threads.
	Simulation,
	/// Single-flight units whose results are applied on the main context.
	Synchronized,
	/// Blocking work executed on the shared blocking pool.
	Blocking,
}

impl TaskClass {
	pub const fn as_str(self) -> &'static str {
		match self {
			Self::Simulation => "simulation",
			Self::Synchronized => "synchronized",
			Self::Blocking => "blocking",
		}
	}
}
