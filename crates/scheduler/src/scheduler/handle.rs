use std::fmt;

use super::registry::TaskId;

/// Opaque reference to a routine started with [`Scheduler::start`](super::Scheduler::start).
///
/// Names the root node of the chain. The handle stays usable for the whole
/// life of the chain and afterwards: once the chain is gone, canceling it is
/// a no-op. Generation tagging keeps a stale handle from matching a node that
/// later reuses the same slot.
#[derive(Clone, Copy, PartialEq, Eq, Hash)]
pub struct RoutineHandle {
    root: TaskId,
}

impl RoutineHandle {
    pub(crate) fn new(root: TaskId) -> Self {
        Self { root }
    }

    pub(crate) fn root(self) -> TaskId {
        self.root
    }
}

impl fmt::Debug for RoutineHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "RoutineHandle({})", self.root)
    }
}
