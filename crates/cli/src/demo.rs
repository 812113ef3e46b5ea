//! Routines and callbacks the demo host runs.

use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;

use ownerless_scheduler::{routine_fn, Context, Routine, RoutineError, Step};
use tracing::{debug, info};

static STATIC_UPDATES: AtomicU64 = AtomicU64::new(0);

/// Stateless per-frame callback.
pub fn on_static_update() {
    let n = STATIC_UPDATES.fetch_add(1, Ordering::Relaxed) + 1;
    debug!(frame = n, "Static update");
}

pub fn static_update_count() -> u64 {
    STATIC_UPDATES.load(Ordering::Relaxed)
}

/// Logs, yields one tick, logs again.
pub fn static_routine() -> impl Routine {
    let mut started = false;
    routine_fn("static-routine", move |_| {
        if !started {
            started = true;
            info!("Static routine started");
            return Ok(Step::Continue);
        }
        info!("Static routine ended");
        Ok(Step::Done)
    })
}

/// Ticks forever with a pause between beats. Canceled by the host.
pub fn heartbeat(interval: Duration) -> impl Routine {
    let mut beats = 0u64;
    routine_fn("heartbeat", move |_| {
        beats += 1;
        debug!(beats, "Heartbeat");
        Ok(Step::Delay(interval))
    })
}

/// Multi-stage loader: chains into a fetch routine, waits, then finishes.
pub struct Loader {
    stage: LoaderStage,
    chunks: usize,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum LoaderStage {
    Fetch,
    Settle,
    Finish,
    Finished,
}

impl Loader {
    pub fn new(chunks: usize) -> Self {
        Self {
            stage: LoaderStage::Fetch,
            chunks,
        }
    }
}

impl Routine for Loader {
    fn name(&self) -> &str {
        "loader"
    }

    fn resume(&mut self, cx: &mut Context<'_>) -> Result<Step, RoutineError> {
        match self.stage {
            LoaderStage::Fetch => {
                info!(chunks = self.chunks, "Loader fetching");
                self.stage = LoaderStage::Settle;
                Ok(Step::chain(Fetch { remaining: self.chunks, received: 0 }))
            }
            LoaderStage::Settle => {
                info!("Loader fetched, settling");
                self.stage = LoaderStage::Finish;
                Ok(Step::delay_secs(0.25))
            }
            LoaderStage::Finish => {
                info!("Loader finished");
                self.stage = LoaderStage::Finished;
                cx.start(announce(self.chunks));
                Ok(Step::Done)
            }
            LoaderStage::Finished => Err(RoutineError::failed("loader resumed after finishing")),
        }
    }
}

/// Receives one chunk per step.
struct Fetch {
    remaining: usize,
    received: usize,
}

impl Routine for Fetch {
    fn name(&self) -> &str {
        "fetch"
    }

    fn resume(&mut self, _cx: &mut Context<'_>) -> Result<Step, RoutineError> {
        if self.remaining == 0 {
            return Ok(Step::Done);
        }
        self.remaining -= 1;
        self.received += 1;
        debug!(received = self.received, "Chunk received");
        Ok(Step::Continue)
    }
}

/// Fire-and-forget routine the loader leaves behind once it is done.
fn announce(chunks: usize) -> impl Routine {
    let mut announced = false;
    routine_fn("announce", move |cx| {
        if announced {
            info!(chunks, active = cx.active_count(), "Load announced");
            return Ok(Step::Done);
        }
        announced = true;
        Ok(Step::Continue)
    })
}

/// Asks for a suspension the scheduler does not support, then fails.
pub fn flaky(fail_after: u32) -> impl Routine {
    let mut steps = 0u32;
    routine_fn("flaky", move |_| {
        steps += 1;
        match steps {
            1 => Ok(Step::Unsupported("wait-for-end-of-frame".into())),
            n if n >= fail_after => Err(RoutineError::failed(format!("gave up after {} steps", n))),
            _ => Ok(Step::Continue),
        }
    })
}
