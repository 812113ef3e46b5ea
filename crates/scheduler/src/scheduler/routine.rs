use std::any::Any;
use std::collections::VecDeque;
use std::fmt;
use std::time::Duration;

use super::runner::Context;

/// Error type for a failed routine step.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum RoutineError {
    #[error("Routine failed: {0}")]
    Failed(String),
    #[error("Routine panicked: {0}")]
    Panicked(String),
}

impl RoutineError {
    /// Build a [`RoutineError::Failed`] from any displayable message.
    pub fn failed(msg: impl Into<String>) -> Self {
        Self::Failed(msg.into())
    }
}

/// Best-effort text of a caught panic payload.
pub(crate) fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(msg) = payload.downcast_ref::<&str>() {
        (*msg).to_string()
    } else if let Some(msg) = payload.downcast_ref::<String>() {
        msg.clone()
    } else {
        "non-string panic payload".to_string()
    }
}

/// Outcome of advancing a routine by one step.
pub enum Step {
    /// Stay scheduled; run again on the next visit.
    Continue,
    /// Suspend until the nested routine has run to completion.
    Chain(Box<dyn Routine>),
    /// Suspend until the given amount of host time has elapsed.
    Delay(Duration),
    /// The routine is finished and must not be resumed again.
    Done,
    /// A suspension kind this scheduler cannot honor. Treated as `Continue`.
    Unsupported(String),
}

impl Step {
    /// Chain to `routine`, boxing it.
    pub fn chain(routine: impl Routine + 'static) -> Self {
        Self::Chain(Box::new(routine))
    }

    /// Delay for `secs` seconds of host time. Negative values mean no delay.
    pub fn delay_secs(secs: f64) -> Self {
        Self::Delay(Duration::try_from_secs_f64(secs.max(0.0)).unwrap_or(Duration::MAX))
    }

    /// Short label used in logs.
    pub fn kind(&self) -> &'static str {
        match self {
            Step::Continue => "continue",
            Step::Chain(_) => "chain",
            Step::Delay(_) => "delay",
            Step::Done => "done",
            Step::Unsupported(_) => "unsupported",
        }
    }
}

impl fmt::Debug for Step {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Step::Continue => f.write_str("Continue"),
            Step::Chain(child) => f.debug_tuple("Chain").field(&child.name()).finish(),
            Step::Delay(d) => f.debug_tuple("Delay").field(d).finish(),
            Step::Done => f.write_str("Done"),
            Step::Unsupported(kind) => f.debug_tuple("Unsupported").field(kind).finish(),
        }
    }
}

/// A resumable computation the scheduler advances one step per visit.
///
/// Implementations are explicit state machines: each call to [`Routine::resume`]
/// does one slice of work and reports how the scheduler should proceed.
/// Once a routine has returned [`Step::Done`] or an error it is never resumed again.
pub trait Routine: Send {
    /// Human-readable name for logging and metrics.
    fn name(&self) -> &str {
        std::any::type_name::<Self>()
    }

    /// Advance one step. `cx` carries the host time since the previous tick
    /// (zero for the first step taken inside `start`) and lets the routine
    /// start or cancel other chains.
    fn resume(&mut self, cx: &mut Context<'_>) -> Result<Step, RoutineError>;
}

impl<R: Routine + ?Sized> Routine for Box<R> {
    fn name(&self) -> &str {
        (**self).name()
    }

    fn resume(&mut self, cx: &mut Context<'_>) -> Result<Step, RoutineError> {
        (**self).resume(cx)
    }
}

/// A routine backed by a closure.
pub struct FnRoutine<F> {
    name: String,
    f: F,
}

impl<F> Routine for FnRoutine<F>
where
    F: FnMut(&mut Context<'_>) -> Result<Step, RoutineError> + Send,
{
    fn name(&self) -> &str {
        &self.name
    }

    fn resume(&mut self, cx: &mut Context<'_>) -> Result<Step, RoutineError> {
        (self.f)(cx)
    }
}

/// Wrap a closure as a [`Routine`]. The closure owns whatever state it needs
/// between steps.
pub fn routine_fn<F>(name: impl Into<String>, f: F) -> FnRoutine<F>
where
    F: FnMut(&mut Context<'_>) -> Result<Step, RoutineError> + Send,
{
    FnRoutine { name: name.into(), f }
}

/// Plays back a fixed list of steps, then reports `Done`.
pub struct Sequence {
    name: String,
    steps: VecDeque<Step>,
}

impl Routine for Sequence {
    fn name(&self) -> &str {
        &self.name
    }

    fn resume(&mut self, _cx: &mut Context<'_>) -> Result<Step, RoutineError> {
        Ok(self.steps.pop_front().unwrap_or(Step::Done))
    }
}

pub fn sequence(name: impl Into<String>, steps: Vec<Step>) -> Sequence {
    Sequence {
        name: name.into(),
        steps: steps.into(),
    }
}
