use std::time::Duration;

use super::routine::{Routine, RoutineError, Step};
use super::runner::Context;

/// Timed-delay routine synthesized by the scheduler for [`Step::Delay`].
///
/// The first step only primes the delay: the elapsed time of the tick that
/// spawned it predates the delay. Every later step adds the tick's elapsed
/// time, and the delay reports `Done` once the accumulated time reaches the
/// target.
#[derive(Debug, Clone)]
pub struct Delay {
    target: Duration,
    accumulated: Duration,
    primed: bool,
}

impl Delay {
    pub fn new(target: Duration) -> Self {
        Self {
            target,
            accumulated: Duration::ZERO,
            primed: false,
        }
    }

    pub fn target(&self) -> Duration {
        self.target
    }

    pub fn accumulated(&self) -> Duration {
        self.accumulated
    }
}

impl Routine for Delay {
    fn name(&self) -> &str {
        "delay"
    }

    fn resume(&mut self, cx: &mut Context<'_>) -> Result<Step, RoutineError> {
        if self.primed {
            self.accumulated = self.accumulated.saturating_add(cx.elapsed());
        } else {
            self.primed = true;
        }
        if self.accumulated >= self.target {
            Ok(Step::Done)
        } else {
            Ok(Step::Continue)
        }
    }
}
