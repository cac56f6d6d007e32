//! Injectable time source shared by caches and state machines.
//!
//! Every time-dependent component reads `now()` and the current [`Tick`] from
//! a [`Clock`] rather than from the OS directly, so tests can drive time
//! deterministically with [`ManualClock`].
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::{Duration, Instant};

use parking_lot::Mutex;

use crate::state::Tick;

/// Source of wall-clock time and the host's simulation tick counter.
pub trait Clock: Send + Sync {
    /// Current instant.
    fn now(&self) -> Instant;

    /// Current simulation tick.
    fn tick(&self) -> Tick;

    /// Moves to the next simulation tick and returns it.
    ///
    /// Called exactly once at the start of every host tick by the orchestrator.
    fn advance_tick(&self) -> Tick;
}

/// Production clock: OS monotonic time plus an atomic tick counter.
#[derive(Debug, Default)]
pub struct SystemClock {
    tick: AtomicU64,
}

impl SystemClock {
    pub fn new() -> Self {
        Self::default()
    }
}

impl Clock for SystemClock {
    fn now(&self) -> Instant {
        Instant::now()
    }

    fn tick(&self) -> Tick {
        Tick(self.tick.load(Ordering::Acquire))
    }

    fn advance_tick(&self) -> Tick {
        Tick(self.tick.fetch_add(1, Ordering::AcqRel) + 1)
    }
}

/// Deterministic clock for tests and replays.
///
/// Time only moves when [`ManualClock::advance`] is called. Ticks move through
/// [`Clock::advance_tick`] like the production clock.
#[derive(Debug)]
pub struct ManualClock {
    now: Mutex<Instant>,
    tick: AtomicU64,
}

impl ManualClock {
    pub fn new() -> Self {
        Self::starting_at(Instant::now())
    }

    pub fn starting_at(origin: Instant) -> Self {
        Self {
            now: Mutex::new(origin),
            tick: AtomicU64::new(0),
        }
    }

    /// Moves wall-clock time forward without touching the tick counter.
    pub fn advance(&self, by: Duration) {
        let mut now = self.now.lock();
        *now += by;
    }
}

impl Default for ManualClock {
    fn default() -> Self {
        Self::new()
    }
}

impl Clock for ManualClock {
    fn now(&self) -> Instant {
        *self.now.lock()
    }

    fn tick(&self) -> Tick {
        Tick(self.tick.load(Ordering::Acquire))
    }

    fn advance_tick(&self) -> Tick {
        Tick(self.tick.fetch_add(1, Ordering::AcqRel) + 1)
    }
}
