pub mod scheduler;
pub mod update;

pub use scheduler::{
    new_shared_scheduler, routine_fn, sequence, Context, Delay, Routine, RoutineError,
    RoutineHandle, Scheduler, SchedulerConfig, SchedulerMetrics, SharedScheduler, Step,
    TickReport,
};
pub use update::{UpdateError, UpdateList};
