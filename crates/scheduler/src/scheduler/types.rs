use std::env;

use serde::{Deserialize, Serialize};

fn env_opt(key: &str) -> Option<String> {
    env::var(key).ok().filter(|s| !s.trim().is_empty())
}

fn env_parse<T: std::str::FromStr>(key: &str) -> Option<T> {
    env_opt(key).and_then(|v| v.trim().parse().ok())
}

fn env_bool(key: &str) -> Option<bool> {
    env_opt(key).map(|v| matches!(v.trim().to_ascii_lowercase().as_str(), "1" | "true" | "yes" | "on"))
}

/// Scheduler configuration, typically parsed from TOML or the environment.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SchedulerConfig {
    /// Task nodes to pre-allocate in the registry arena.
    #[serde(default = "default_initial_capacity")]
    pub initial_capacity: usize,
    /// Upper bound on steps taken in one tick. 0 = unlimited.
    #[serde(default = "default_max_steps_per_tick")]
    pub max_steps_per_tick: usize,
    /// Log every step transition at debug level.
    #[serde(default)]
    pub trace_steps: bool,
}

fn default_initial_capacity() -> usize { 64 }
fn default_max_steps_per_tick() -> usize { 10_000 }

impl Default for SchedulerConfig {
    fn default() -> Self {
        Self {
            initial_capacity: default_initial_capacity(),
            max_steps_per_tick: default_max_steps_per_tick(),
            trace_steps: false,
        }
    }
}

impl SchedulerConfig {
    /// Defaults overlaid with `OWNERLESS_*` environment variables.
    pub fn from_env() -> Self {
        Self::default().with_env_overrides()
    }

    /// Apply `OWNERLESS_INITIAL_CAPACITY`, `OWNERLESS_MAX_STEPS_PER_TICK` and
    /// `OWNERLESS_TRACE_STEPS` on top of `self`. Unparseable values are ignored.
    pub fn with_env_overrides(mut self) -> Self {
        if let Some(v) = env_parse("OWNERLESS_INITIAL_CAPACITY") {
            self.initial_capacity = v;
        }
        if let Some(v) = env_parse("OWNERLESS_MAX_STEPS_PER_TICK") {
            self.max_steps_per_tick = v;
        }
        if let Some(v) = env_bool("OWNERLESS_TRACE_STEPS") {
            self.trace_steps = v;
        }
        self
    }

    /// Step budget for one tick, `None` when unlimited.
    pub fn step_budget(&self) -> Option<usize> {
        (self.max_steps_per_tick > 0).then_some(self.max_steps_per_tick)
    }
}

/// Counters for a single scheduler pass.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct TickReport {
    /// Routine steps taken.
    pub steps: usize,
    /// Chains that ran to completion (a root node reported `Done`).
    pub completed: usize,
    /// Nested routines or delays spawned.
    pub chained: usize,
    /// Parents re-queued after their child completed.
    pub resumed: usize,
    /// Nodes removed because their step failed.
    pub failed: usize,
    /// Suspension requests treated as `Continue`.
    pub unsupported: usize,
    /// The pass stopped at the step budget before reaching the tail.
    pub truncated: bool,
}
