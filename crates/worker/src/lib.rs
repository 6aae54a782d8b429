//! Threading primitives for the horde simulation.
//!
//! World mutations only ever run on the main context. Everything here exists
//! to get work onto or off of that context without stalling it:
//!
//! * [`RequestProcessor`] drains requests submitted from any thread and ticks
//!   them on the main context, a bounded amount per frame.
//! * [`Worker`] loops run continuously on dedicated named threads.
//! * [`SynchronizedTask`] runs one unit of work at a time on the blocking pool
//!   and hands the result back on a later main-context tick.
//! * [`Broadcast`] fans main-context snapshots out to background consumers
//!   without ever blocking the producer.

mod broadcast;
mod class;
mod error;
mod gate;
mod panic;
mod processor;
mod registry;
mod request;
mod spawn;
mod task;
mod threaded;

pub use broadcast::{Broadcast, DEFAULT_BROADCAST_CAPACITY, Subscriber};
pub use class::TaskClass;
pub use error::{RequestError, WorkerError};
pub use gate::RunGate;
pub use processor::{RequestProcessor, RequestSender, TickReport};
pub use registry::{WorkerRecord, WorkerRegistry, WorkerState};
pub use request::{MainThreadRequest, RequestHandle};
pub use spawn::{spawn_blocking, spawn_named_thread};
pub use task::{SynchronizedJob, SynchronizedTask, TaskPoll};
pub use threaded::{DEFAULT_TICK, Worker, WorkerExit, WorkerHandle, spawn_worker};
