//! Cooperative scheduler for ownerless routines.
//!
//! A [`Routine`] is advanced one [`Step`] per visit. A routine can suspend on a
//! nested routine ([`Step::Chain`]) or on host time ([`Step::Delay`]); the
//! suspended parent leaves the schedule and is re-queued once its child
//! finishes. [`Scheduler::tick`] makes one pass over the schedule per host
//! frame, and nodes appended during the pass are reached before it ends.

pub mod delay;
pub mod handle;
pub mod metrics;
pub mod registry;
pub mod routine;
pub mod runner;
pub mod types;

pub use delay::Delay;
pub use handle::RoutineHandle;
pub use metrics::SchedulerMetrics;
pub use registry::{TaskId, TaskNode, TaskRegistry};
pub use routine::{routine_fn, sequence, FnRoutine, Routine, RoutineError, Sequence, Step};
pub use runner::{new_shared_scheduler, Context, Scheduler, SharedScheduler};
pub use types::{SchedulerConfig, TickReport};
