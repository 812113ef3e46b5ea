use std::time::Duration;

use crate::scheduler::handle::RoutineHandle;
use crate::scheduler::routine::Routine;

use super::Scheduler;

/// Handed to [`Routine::resume`] for the duration of one step.
///
/// Gives the routine the tick's elapsed time and the scheduler's ownerless
/// operations. The stepping routine is held outside the registry while it
/// runs, so starting or canceling chains from here is safe, including the
/// routine's own chain.
pub struct Context<'a> {
    scheduler: &'a mut Scheduler,
    elapsed: Duration,
}

impl<'a> Context<'a> {
    /// Build a context over `scheduler`. Useful for driving a routine by hand.
    pub fn new(scheduler: &'a mut Scheduler, elapsed: Duration) -> Self {
        Self { scheduler, elapsed }
    }

    /// Host time since the previous tick (zero for the step taken inside `start`).
    pub fn elapsed(&self) -> Duration {
        self.elapsed
    }

    /// Start a routine on the scheduler. See [`Scheduler::start`].
    pub fn start(&mut self, routine: impl Routine + 'static) -> RoutineHandle {
        self.scheduler.start(routine)
    }

    /// Cancel a chain. Nodes the current pass has not reached yet never run;
    /// canceling the chain that is stepping discards this step's result.
    pub fn cancel(&mut self, handle: RoutineHandle) -> bool {
        self.scheduler.cancel(handle)
    }

    pub fn is_active(&self, handle: RoutineHandle) -> bool {
        self.scheduler.is_active(handle)
    }

    pub fn active_count(&self) -> usize {
        self.scheduler.active_count()
    }
}
