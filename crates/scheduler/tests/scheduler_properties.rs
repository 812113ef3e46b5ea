//! End-to-end scheduling behaviour through the public API.
//!
//! Routines here record what they do into a shared trace so the tests can
//! check ordering and step counts across ticks.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use ownerless_scheduler::{
    new_shared_scheduler, routine_fn, sequence, Context, Routine, RoutineError, Scheduler,
    SchedulerConfig, Step,
};

const FRAME: Duration = Duration::from_millis(10);

type Trace = Arc<Mutex<Vec<String>>>;

fn trace() -> Trace {
    Arc::new(Mutex::new(Vec::new()))
}

fn entries(trace: &Trace) -> Vec<String> {
    trace.lock().unwrap().clone()
}

/// Finishes after `total` steps, failing instead on `fail_at` if set.
struct Counted {
    name: &'static str,
    total: usize,
    fail_at: Option<usize>,
    taken: Arc<AtomicUsize>,
}

impl Counted {
    fn new(name: &'static str, total: usize) -> (Self, Arc<AtomicUsize>) {
        let taken = Arc::new(AtomicUsize::new(0));
        let routine = Self {
            name,
            total,
            fail_at: None,
            taken: Arc::clone(&taken),
        };
        (routine, taken)
    }

    fn failing(name: &'static str, fail_at: usize) -> (Self, Arc<AtomicUsize>) {
        let (mut routine, taken) = Self::new(name, usize::MAX);
        routine.fail_at = Some(fail_at);
        (routine, taken)
    }
}

impl Routine for Counted {
    fn name(&self) -> &str {
        self.name
    }

    fn resume(&mut self, _cx: &mut Context<'_>) -> Result<Step, RoutineError> {
        let n = self.taken.fetch_add(1, Ordering::SeqCst) + 1;
        if self.fail_at == Some(n) {
            return Err(RoutineError::failed("scripted failure"));
        }
        Ok(if n >= self.total { Step::Done } else { Step::Continue })
    }
}

/// Logs `"<name>:<n>"` on each step and finishes after `total` steps.
fn traced(name: &'static str, total: usize, trace: &Trace) -> impl Routine + 'static {
    let trace = Arc::clone(trace);
    let mut n = 0;
    routine_fn(name, move |_| {
        n += 1;
        trace.lock().unwrap().push(format!("{}:{}", name, n));
        Ok(if n >= total { Step::Done } else { Step::Continue })
    })
}

#[test]
fn active_count_matches_incomplete_routines() {
    let mut scheduler = Scheduler::default();
    for total in 1..=5 {
        scheduler.start(Counted::new("r", total).0);
    }
    // start took one step each: the total == 1 routine is already gone
    assert_eq!(scheduler.active_count(), 4);

    for ticks in 1..=4 {
        scheduler.tick(FRAME);
        // after `ticks` ticks each routine has taken ticks + 1 steps
        let incomplete = (1..=5).filter(|total| *total > ticks + 1).count();
        assert_eq!(scheduler.active_count(), incomplete);
    }
}

#[test]
fn first_step_failure_is_never_observed() {
    let mut scheduler = Scheduler::default();
    let (routine, taken) = Counted::failing("bad", 1);
    let handle = scheduler.start(routine);

    assert!(!scheduler.is_active(handle));
    assert!(!scheduler.cancel(handle));
    for _ in 0..3 {
        assert_eq!(scheduler.tick(FRAME).steps, 0);
    }
    assert_eq!(taken.load(Ordering::SeqCst), 1);
}

#[test]
fn parent_absent_until_child_completes() {
    let mut scheduler = Scheduler::default();
    let (child, child_steps) = Counted::new("B", 3);
    scheduler.start(sequence("A", vec![Step::chain(child), Step::Continue, Step::Continue]));

    for _ in 0..2 {
        assert_eq!(scheduler.active_routines(), vec!["B"]);
        scheduler.tick(FRAME);
    }
    assert_eq!(scheduler.active_routines(), vec!["B"]);
    // B's third step completes it; A is re-queued and stepped in the same pass
    scheduler.tick(FRAME);
    assert_eq!(child_steps.load(Ordering::SeqCst), 3);
    assert_eq!(scheduler.active_routines(), vec!["A"]);
}

#[test]
fn cancel_reaches_through_nested_chains() {
    let mut scheduler = Scheduler::default();
    let log = trace();

    let c = traced("C", usize::MAX, &log);
    let b = sequence("B", vec![Step::chain(c), Step::Continue]);
    let mut a_steps = 0;
    let a_log = Arc::clone(&log);
    let mut b_slot = Some(b);
    let a = routine_fn("A", move |_| {
        a_steps += 1;
        a_log.lock().unwrap().push(format!("A:{}", a_steps));
        match b_slot.take() {
            Some(b) => Ok(Step::chain(b)),
            None => Ok(Step::Continue),
        }
    });

    let handle = scheduler.start(a);
    scheduler.tick(FRAME);
    scheduler.tick(FRAME);
    assert_eq!(scheduler.active_routines(), vec!["C"]);
    assert_eq!(entries(&log), vec!["A:1", "C:1", "C:2"]);

    assert!(scheduler.cancel(handle));
    assert_eq!(scheduler.active_count(), 0);
    for _ in 0..3 {
        scheduler.tick(FRAME);
    }
    assert_eq!(entries(&log), vec!["A:1", "C:1", "C:2"], "nothing in the chain runs again");
}

#[test]
fn same_tick_chain_fully_unwinds() {
    let mut scheduler = Scheduler::default();
    let log = trace();
    let child_log = Arc::clone(&log);
    let parent_log = Arc::clone(&log);
    let mut step = 0;

    scheduler.start(routine_fn("parent", move |_| {
        step += 1;
        parent_log.lock().unwrap().push(format!("parent:{}", step));
        if step == 2 {
            Ok(Step::chain(traced("child", 1, &child_log)))
        } else if step < 4 {
            Ok(Step::Continue)
        } else {
            Ok(Step::Done)
        }
    }));
    assert_eq!(entries(&log), vec!["parent:1"]);

    let report = scheduler.tick(FRAME);
    assert_eq!(entries(&log), vec!["parent:1", "parent:2", "child:1", "parent:3"]);
    assert_eq!(report.chained, 1);
    assert_eq!(report.resumed, 1);
    assert_eq!(scheduler.active_routines(), vec!["parent"]);
}

#[test]
fn chains_spawned_ahead_of_siblings_run_after_them() {
    let mut scheduler = Scheduler::default();
    let log = trace();
    scheduler.start(sequence("p", vec![Step::chain(traced("kid", 1, &log)), Step::Continue]));
    scheduler.start(traced("sib", 3, &log));
    log.lock().unwrap().clear();

    scheduler.tick(FRAME);
    // kid is ahead of sib; the parent re-queued by kid lands behind sib
    assert_eq!(entries(&log), vec!["kid:1", "sib:2"]);
    assert_eq!(scheduler.active_routines(), vec!["sib", "p"]);
}

#[test]
fn failure_is_isolated_between_routines() {
    let mut scheduler = Scheduler::default();
    let (first, first_steps) = Counted::new("first", 5);
    let (second, second_steps) = Counted::failing("second", 3);
    let (third, third_steps) = Counted::new("third", 5);
    scheduler.start(first);
    scheduler.start(second);
    scheduler.start(third);

    let mut failed = 0;
    for _ in 0..6 {
        failed += scheduler.tick(FRAME).failed;
    }

    assert_eq!(failed, 1);
    assert_eq!(second_steps.load(Ordering::SeqCst), 3);
    assert_eq!(first_steps.load(Ordering::SeqCst), 5);
    assert_eq!(third_steps.load(Ordering::SeqCst), 5);
    assert_eq!(scheduler.active_count(), 0);
}

#[test]
fn delay_completes_on_the_tick_reaching_its_duration() {
    let mut scheduler = Scheduler::default();
    let resumed = Arc::new(AtomicUsize::new(0));
    let flag = Arc::clone(&resumed);
    let mut waited = false;
    scheduler.start(routine_fn("waiter", move |_| {
        if waited {
            flag.store(1, Ordering::SeqCst);
            return Ok(Step::Done);
        }
        waited = true;
        Ok(Step::Delay(Duration::from_millis(30)))
    }));

    // the first tick primes the delay, then 10 + 10 + 10 = 30ms
    let increments = [Duration::from_millis(7), FRAME, FRAME, FRAME];
    for (i, elapsed) in increments.iter().enumerate() {
        scheduler.tick(*elapsed);
        let expect = if i == increments.len() - 1 { 1 } else { 0 };
        assert_eq!(resumed.load(Ordering::SeqCst), expect, "after tick {}", i + 1);
    }
    assert_eq!(scheduler.active_count(), 0);
}

#[test]
fn shared_scheduler_serializes_start_and_cancel_against_tick() {
    let shared = new_shared_scheduler(SchedulerConfig::default());
    let (routine, taken) = Counted::new("worker", 50);
    shared.lock().unwrap().start(routine);

    let ticker = {
        let shared = Arc::clone(&shared);
        std::thread::spawn(move || {
            for _ in 0..100 {
                shared.lock().unwrap().tick(FRAME);
                std::thread::yield_now();
            }
        })
    };
    let controller = {
        let shared = Arc::clone(&shared);
        std::thread::spawn(move || {
            let mut canceled = 0;
            for _ in 0..20 {
                let (endless, _) = Counted::new("endless", usize::MAX);
                let handle = shared.lock().unwrap().start(endless);
                std::thread::yield_now();
                if shared.lock().unwrap().cancel(handle) {
                    canceled += 1;
                }
            }
            canceled
        })
    };
    ticker.join().unwrap();
    let canceled = controller.join().unwrap();

    let scheduler = shared.lock().unwrap();
    assert_eq!(canceled, 20);
    assert_eq!(taken.load(Ordering::SeqCst), 50);
    assert_eq!(scheduler.active_count(), 0);
    let metrics = scheduler.metrics();
    assert_eq!(metrics.started, 21);
    assert_eq!(metrics.canceled, 20);
    assert_eq!(metrics.ticks, 100);
}
