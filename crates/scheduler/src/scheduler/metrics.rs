use std::collections::HashMap;

use chrono::{DateTime, Utc};
use serde::Serialize;

use super::types::TickReport;

/// Scheduler operational metrics, cumulative over the scheduler's lifetime.
#[derive(Debug, Clone, Default, Serialize)]
pub struct SchedulerMetrics {
    /// Completed `tick` calls.
    pub ticks: u64,
    /// Routine steps taken, including the first step inside `start`.
    pub steps: u64,
    /// Routines started.
    pub started: u64,
    /// Chains that ran to completion. Children and delays finishing inside a
    /// chain show up as `chained`, not here.
    pub completed: u64,
    /// Nested routines and delays spawned.
    pub chained: u64,
    /// Nodes abandoned after a failed step.
    pub failed: u64,
    /// Chains removed by `cancel`.
    pub canceled: u64,
    /// Suspension requests the scheduler could not honor.
    pub unsupported: u64,
    /// Ticks that stopped at the step budget.
    pub truncated_ticks: u64,
    /// Highest number of active nodes seen after a tick or start.
    pub peak_active: usize,
    /// Wall-clock time of the last tick.
    pub last_tick: Option<DateTime<Utc>>,
    /// Steps taken by routine name.
    pub steps_by_routine: HashMap<String, u64>,
}

impl SchedulerMetrics {
    pub fn record_step(&mut self, routine: &str) {
        self.steps += 1;
        match self.steps_by_routine.get_mut(routine) {
            Some(count) => *count += 1,
            None => {
                self.steps_by_routine.insert(routine.to_string(), 1);
            }
        }
    }

    pub fn record_start(&mut self, active: usize) {
        self.started += 1;
        self.observe_active(active);
    }

    /// Fold the counters of one pass (a tick, or the first step inside
    /// `start`) into the totals. Steps are counted by [`record_step`](Self::record_step).
    pub fn record_outcomes(&mut self, report: &TickReport) {
        self.completed += report.completed as u64;
        self.chained += report.chained as u64;
        self.failed += report.failed as u64;
        self.unsupported += report.unsupported as u64;
    }

    pub fn record_tick(&mut self, report: &TickReport, active: usize) {
        self.ticks += 1;
        self.record_outcomes(report);
        if report.truncated {
            self.truncated_ticks += 1;
        }
        self.observe_active(active);
        self.last_tick = Some(Utc::now());
    }

    pub fn record_cancel(&mut self) {
        self.canceled += 1;
    }

    fn observe_active(&mut self, active: usize) {
        self.peak_active = self.peak_active.max(active);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_metrics() {
        let m = SchedulerMetrics::default();
        assert_eq!(m.ticks, 0);
        assert_eq!(m.peak_active, 0);
        assert!(m.last_tick.is_none());
        assert!(m.steps_by_routine.is_empty());
    }

    #[test]
    fn record_steps_by_name() {
        let mut m = SchedulerMetrics::default();
        m.record_step("a");
        m.record_step("a");
        m.record_step("b");
        assert_eq!(m.steps, 3);
        assert_eq!(m.steps_by_routine["a"], 2);
        assert_eq!(m.steps_by_routine["b"], 1);
    }

    #[test]
    fn record_tick_accumulates() {
        let mut m = SchedulerMetrics::default();
        let report = TickReport {
            steps: 4,
            completed: 2,
            chained: 1,
            failed: 1,
            truncated: true,
            ..TickReport::default()
        };
        m.record_tick(&report, 3);
        m.record_tick(&TickReport::default(), 1);

        assert_eq!(m.ticks, 2);
        assert_eq!(m.completed, 2);
        assert_eq!(m.chained, 1);
        assert_eq!(m.failed, 1);
        assert_eq!(m.truncated_ticks, 1);
        assert_eq!(m.peak_active, 3);
        assert!(m.last_tick.is_some());
    }

    #[test]
    fn metrics_serialize_to_json() {
        let mut m = SchedulerMetrics::default();
        m.record_start(1);
        let json = serde_json::to_value(&m).unwrap();
        assert_eq!(json["started"], 1);
        assert_eq!(json["peak_active"], 1);
    }
}
