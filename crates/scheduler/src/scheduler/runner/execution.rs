use std::panic::{catch_unwind, AssertUnwindSafe};
use std::time::Duration;

use tracing::{debug, error, warn};

use crate::scheduler::delay::Delay;
use crate::scheduler::handle::RoutineHandle;
use crate::scheduler::registry::TaskId;
use crate::scheduler::routine::{panic_message, Routine, RoutineError, Step};
use crate::scheduler::types::TickReport;

use super::{Context, Scheduler};

/// What to do with a node once the traversal has moved past it.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Settle {
    /// Stay scheduled.
    Keep,
    /// Leave the schedule but stay in the arena awaiting a chained child.
    Park,
    /// Finished normally; drop the node.
    Release,
    /// Step failed or the chain was canceled mid-step; drop the node and its
    /// paused ancestors.
    Abandon,
}

impl Scheduler {
    /// Start a routine: schedule it and take its first step immediately,
    /// with zero elapsed time. A routine that finishes or fails on that step
    /// never stays scheduled. The returned handle is valid either way.
    pub fn start(&mut self, routine: impl Routine + 'static) -> RoutineHandle {
        self.start_boxed(Box::new(routine))
    }

    pub fn start_boxed(&mut self, routine: Box<dyn Routine>) -> RoutineHandle {
        let id = self.registry.insert(routine, None);
        self.registry.push_back(id);

        let mut report = TickReport::default();
        let settle = self.step_node(id, Duration::ZERO, &mut report);
        self.settle(id, settle);

        self.metrics.record_outcomes(&report);
        self.metrics.record_start(self.registry.len());
        RoutineHandle::new(id)
    }

    /// Run one pass over the registry, stepping every scheduled node once.
    ///
    /// A node's successor is read after it has been stepped, so nodes
    /// appended during the pass (chained children, re-queued parents) are
    /// reached before the pass ends. That is also why the pass carries a step
    /// budget (`max_steps_per_tick`): a chain that keeps respawning would
    /// otherwise never let it reach the tail. Failures are contained per node
    /// and reported through `tracing`, never returned.
    pub fn tick(&mut self, elapsed: Duration) -> TickReport {
        let mut report = TickReport::default();
        let budget = self.config.step_budget();
        let mut cursor = self.registry.head();

        while let Some(id) = cursor {
            if budget.is_some_and(|max| report.steps >= max) {
                warn!(
                    steps = report.steps,
                    remaining = self.registry.len(),
                    "Step budget exhausted, deferring the rest of the pass to the next tick"
                );
                report.truncated = true;
                break;
            }
            let settle = self.step_node(id, elapsed, &mut report);
            cursor = self.registry.next(id);
            self.settle(id, settle);
        }

        self.metrics.record_tick(&report, self.registry.len());
        report
    }

    /// Advance one node and apply the chaining protocol. Appends (children,
    /// re-queued parents) happen here; removal of the node itself is left to
    /// [`Scheduler::settle`] so the caller can still read its successor.
    ///
    /// The routine is taken out of its node while it runs, so the step can
    /// reach the scheduler through its [`Context`].
    fn step_node(&mut self, id: TaskId, elapsed: Duration, report: &mut TickReport) -> Settle {
        let trace = self.config.trace_steps;
        let Some(node) = self.registry.get_mut(id) else {
            return Settle::Keep;
        };
        let Some(mut routine) = node.routine.take() else {
            return Settle::Keep;
        };

        self.metrics.record_step(routine.name());
        report.steps += 1;
        let outcome = {
            let mut cx = Context::new(self, elapsed);
            catch_unwind(AssertUnwindSafe(|| routine.resume(&mut cx)))
                .unwrap_or_else(|payload| Err(RoutineError::Panicked(panic_message(payload.as_ref()))))
        };

        let (resume_link, canceled) = match self.registry.get(id) {
            Some(node) => (node.resume_link, node.cancel_requested),
            None => return Settle::Keep,
        };
        let settle = if canceled {
            debug!(routine = routine.name(), task = %id, "Chain canceled during its own step");
            Settle::Abandon
        } else {
            self.apply_outcome(id, routine.name(), resume_link, outcome, trace, report)
        };

        if let Some(node) = self.registry.get_mut(id) {
            node.routine = Some(routine);
        }
        settle
    }

    fn apply_outcome(
        &mut self,
        id: TaskId,
        name: &str,
        resume_link: Option<TaskId>,
        outcome: Result<Step, RoutineError>,
        trace: bool,
        report: &mut TickReport,
    ) -> Settle {
        let step = match outcome {
            Ok(step) => step,
            Err(err) => {
                error!(
                    routine = name,
                    task = %id,
                    error = %err,
                    "Routine step failed, abandoning its chain"
                );
                report.failed += 1;
                return Settle::Abandon;
            }
        };

        if trace {
            debug!(routine = name, task = %id, step = step.kind(), "Routine stepped");
        }

        match step {
            Step::Continue => Settle::Keep,
            Step::Unsupported(kind) => {
                error!(
                    routine = name,
                    kind = %kind,
                    "Unsupported suspension request, the routine will continue as normal"
                );
                report.unsupported += 1;
                Settle::Keep
            }
            Step::Chain(child) => {
                self.spawn_child(id, child, report);
                Settle::Park
            }
            Step::Delay(duration) => {
                self.spawn_child(id, Box::new(Delay::new(duration)), report);
                Settle::Park
            }
            Step::Done => {
                match resume_link {
                    Some(parent) => {
                        if self.registry.push_back(parent) {
                            report.resumed += 1;
                            if trace {
                                debug!(task = %id, parent = %parent, "Routine ended, resuming parent");
                            }
                        }
                    }
                    None => report.completed += 1,
                }
                Settle::Release
            }
        }
    }

    fn spawn_child(&mut self, parent: TaskId, child: Box<dyn Routine>, report: &mut TickReport) {
        let child_id = self.registry.insert(child, Some(parent));
        self.registry.push_back(child_id);
        report.chained += 1;
        if self.config.trace_steps {
            debug!(parent = %parent, child = %child_id, "Chain started");
        }
    }

    fn settle(&mut self, id: TaskId, settle: Settle) {
        match settle {
            Settle::Keep => {}
            Settle::Park => {
                self.registry.unlink(id);
            }
            Settle::Release => {
                self.registry.release(id);
            }
            Settle::Abandon => {
                self.registry.release_chain(id);
            }
        }
    }
}
