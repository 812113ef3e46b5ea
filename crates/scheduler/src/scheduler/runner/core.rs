use std::sync::{Arc, Mutex};

use tracing::info;

use crate::scheduler::handle::RoutineHandle;
use crate::scheduler::metrics::SchedulerMetrics;
use crate::scheduler::registry::TaskRegistry;
use crate::scheduler::types::SchedulerConfig;

/// The cooperative routine scheduler.
///
/// Owns every task node. The host calls [`Scheduler::tick`] once per frame;
/// routine authors call [`Scheduler::start`] and [`Scheduler::cancel`], or
/// the same operations on the [`Context`](super::Context) a step receives.
/// All methods run synchronously on the caller's thread.
pub struct Scheduler {
    pub(super) config: SchedulerConfig,
    /// Active and paused task nodes.
    pub(super) registry: TaskRegistry,
    /// Scheduler metrics.
    pub(super) metrics: SchedulerMetrics,
}

/// Scheduler shared between threads. Every operation takes the lock, so
/// `tick`, `start` and `cancel` are serialized.
///
/// Routines must not lock the shared scheduler from inside `resume`: the
/// `tick` driving them already holds the lock. They start and cancel
/// through the [`Context`](super::Context) they are handed instead.
pub type SharedScheduler = Arc<Mutex<Scheduler>>;

/// Create a new shared scheduler.
pub fn new_shared_scheduler(config: SchedulerConfig) -> SharedScheduler {
    Arc::new(Mutex::new(Scheduler::new(config)))
}

impl Default for Scheduler {
    fn default() -> Self {
        Self::new(SchedulerConfig::default())
    }
}

impl Scheduler {
    /// Create a new scheduler with the given config.
    pub fn new(config: SchedulerConfig) -> Self {
        info!(
            initial_capacity = config.initial_capacity,
            max_steps_per_tick = config.max_steps_per_tick,
            "Scheduler created"
        );
        Self {
            registry: TaskRegistry::with_capacity(config.initial_capacity),
            metrics: SchedulerMetrics::default(),
            config,
        }
    }

    pub fn config(&self) -> &SchedulerConfig {
        &self.config
    }

    /// Get a snapshot of the current scheduler metrics.
    pub fn metrics(&self) -> SchedulerMetrics {
        self.metrics.clone()
    }

    /// Number of nodes currently scheduled (the active leaf of every chain).
    pub fn active_count(&self) -> usize {
        self.registry.len()
    }

    /// Whether the chain started under `handle` still has work left.
    pub fn is_active(&self, handle: RoutineHandle) -> bool {
        self.registry.contains(handle.root())
    }

    /// Names of the scheduled nodes, in scheduling order.
    pub fn active_routines(&self) -> Vec<String> {
        self.registry
            .iter()
            .filter_map(|id| self.registry.get(id).map(|n| n.name().to_string()))
            .collect()
    }

    /// Drop every chain without running it further. Handles issued before the
    /// clear stay stale.
    pub fn clear(&mut self) {
        info!(
            active = self.registry.len(),
            live = self.registry.live(),
            "Scheduler cleared"
        );
        self.registry.clear();
    }
}
