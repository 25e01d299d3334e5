//! Run timing.
//!
//! [`Stopwatch`] is a small state machine over an injected [`Clock`]. Elapsed
//! time is always recomputed as `now - origin`, so scheduling jitter in the
//! frame loop delays the display but never accumulates into the result.
//! [`FrameLoop`] drives the per-frame refresh and guarantees that no callback
//! runs once it has been cancelled or dropped.

use std::{
    sync::{
        atomic::{AtomicBool, AtomicI64, Ordering},
        Arc,
    },
    thread::{self, JoinHandle},
    time::Duration,
};

use serde::{Deserialize, Serialize};

use crate::Result;

/// Source of wall-clock time in epoch milliseconds.
pub trait Clock: Send + Sync {
    fn now_ms(&self) -> i64;
}

/// Reads the system wall clock.
#[derive(Debug, Default, Clone, Copy)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now_ms(&self) -> i64 {
        chrono::Utc::now().timestamp_millis()
    }
}

/// Hand-driven clock for deterministic timing. Clones share the same time.
#[derive(Debug, Default, Clone)]
pub struct ManualClock {
    now: Arc<AtomicI64>,
}

impl ManualClock {
    pub fn new(start_ms: i64) -> Self {
        Self {
            now: Arc::new(AtomicI64::new(start_ms)),
        }
    }

    pub fn advance(&self, delta_ms: i64) {
        self.now.fetch_add(delta_ms, Ordering::SeqCst);
    }
}

impl Clock for ManualClock {
    fn now_ms(&self) -> i64 {
        self.now.load(Ordering::SeqCst)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StopwatchState {
    #[default]
    Idle,
    Running,
    Stopped,
}

/// `idle -> running -> stopped`, with `reset` returning to idle from anywhere.
/// A stopped run cannot be resumed.
#[derive(Debug)]
pub struct Stopwatch<C: Clock = SystemClock> {
    clock: C,
    state: StopwatchState,
    origin_ms: i64,
    elapsed_ms: u64,
}

impl Stopwatch<SystemClock> {
    pub fn new() -> Self {
        Self::with_clock(SystemClock)
    }
}

impl Default for Stopwatch<SystemClock> {
    fn default() -> Self {
        Self::new()
    }
}

impl<C: Clock> Stopwatch<C> {
    pub fn with_clock(clock: C) -> Self {
        Self {
            clock,
            state: StopwatchState::Idle,
            origin_ms: 0,
            elapsed_ms: 0,
        }
    }

    pub fn state(&self) -> StopwatchState {
        self.state
    }

    /// Last published elapsed time. Frozen once stopped.
    pub fn elapsed_ms(&self) -> u64 {
        self.elapsed_ms
    }

    /// Time since the run started, read straight from the clock. Zero unless
    /// running.
    pub fn running_for_ms(&self) -> u64 {
        match self.state {
            StopwatchState::Running => self.since_origin(),
            _ => 0,
        }
    }

    /// Starts a run. Returns false unless the stopwatch was idle.
    pub fn start(&mut self) -> bool {
        if self.state != StopwatchState::Idle {
            return false;
        }
        self.origin_ms = self.clock.now_ms();
        self.elapsed_ms = 0;
        self.state = StopwatchState::Running;
        true
    }

    /// Stops a running run and returns its final time.
    pub fn stop(&mut self) -> Option<u64> {
        if self.state != StopwatchState::Running {
            return None;
        }
        self.elapsed_ms = self.since_origin();
        self.state = StopwatchState::Stopped;
        Some(self.elapsed_ms)
    }

    /// Idle starts, running stops and yields the time, stopped does nothing.
    pub fn toggle(&mut self) -> Option<u64> {
        match self.state {
            StopwatchState::Idle => {
                self.start();
                None
            }
            StopwatchState::Running => self.stop(),
            StopwatchState::Stopped => None,
        }
    }

    pub fn reset(&mut self) {
        self.elapsed_ms = 0;
        self.state = StopwatchState::Idle;
    }

    /// Per-frame refresh. Only a running stopwatch changes.
    pub fn tick(&mut self) -> u64 {
        if self.state == StopwatchState::Running {
            self.elapsed_ms = self.since_origin();
        }
        self.elapsed_ms
    }

    fn since_origin(&self) -> u64 {
        let delta = self.clock.now_ms().saturating_sub(self.origin_ms);
        u64::try_from(delta).unwrap_or(0)
    }
}

/// Renders milliseconds as `seconds.millis`, e.g. `4980` as `4.980`.
pub fn format_time(ms: u64) -> String {
    format!("{}.{:03}", ms / 1000, ms % 1000)
}

/// Background refresh loop that invokes a callback once per frame interval
/// until the callback returns false or the loop is cancelled.
///
/// Cancelling (or dropping) joins the worker, so once [`FrameLoop::cancel`]
/// returns the callback will never run again.
#[derive(Debug)]
pub struct FrameLoop {
    cancelled: Arc<AtomicBool>,
    worker: Option<JoinHandle<()>>,
}

impl FrameLoop {
    pub fn spawn<F>(interval: Duration, mut on_frame: F) -> Result<Self>
    where
        F: FnMut() -> bool + Send + 'static,
    {
        let cancelled = Arc::new(AtomicBool::new(false));
        let flag = cancelled.clone();
        let worker = thread::Builder::new()
            .name("cupstack-frames".to_string())
            .spawn(move || loop {
                thread::sleep(interval);
                if flag.load(Ordering::Acquire) || !on_frame() {
                    break;
                }
            })?;

        Ok(Self {
            cancelled,
            worker: Some(worker),
        })
    }

    /// Stops the loop and waits for an in-flight frame to finish.
    pub fn cancel(mut self) {
        self.shutdown();
    }

    fn shutdown(&mut self) {
        self.cancelled.store(true, Ordering::Release);
        if let Some(worker) = self.worker.take() {
            if worker.join().is_err() {
                tracing::warn!("frame callback panicked");
            }
        }
    }
}

impl Drop for FrameLoop {
    fn drop(&mut self) {
        self.shutdown();
    }
}
