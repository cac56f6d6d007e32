//! Session-long pickup statistics.

use std::time::{Duration, Instant};

/// Counters that accumulate for the lifetime of the owning state machine.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct PickupStats {
    total: u64,
    successful: u64,
    failed: u64,
    session_start: Instant,
    last_pickup: Option<Instant>,
}

impl PickupStats {
    pub fn new(now: Instant) -> Self {
        Self {
            total: 0,
            successful: 0,
            failed: 0,
            session_start: now,
            last_pickup: None,
        }
    }

    /// Records the outcome of one finished pickup.
    pub fn record(&mut self, success: bool, now: Instant) {
        self.total += 1;
        if success {
            self.successful += 1;
        } else {
            self.failed += 1;
        }
        self.last_pickup = Some(now);
    }

    /// Clears every counter and restarts the session clock.
    pub fn reset(&mut self, now: Instant) {
        *self = Self::new(now);
    }

    pub fn total(&self) -> u64 {
        self.total
    }

    pub fn successful(&self) -> u64 {
        self.successful
    }

    pub fn failed(&self) -> u64 {
        self.failed
    }

    pub fn session_start(&self) -> Instant {
        self.session_start
    }

    pub fn last_pickup(&self) -> Option<Instant> {
        self.last_pickup
    }

    /// Success rate as a percentage (0-100); 100 before anything was recorded.
    pub fn success_rate(&self) -> f64 {
        if self.total == 0 {
            100.0
        } else {
            (self.successful as f64 / self.total as f64) * 100.0
        }
    }

    pub fn snapshot(&self, now: Instant) -> StatsSnapshot {
        StatsSnapshot {
            total: self.total,
            successful: self.successful,
            failed: self.failed,
            success_rate: self.success_rate(),
            session_duration: now.saturating_duration_since(self.session_start),
            since_last_pickup: self
                .last_pickup
                .map(|at| now.saturating_duration_since(at)),
        }
    }
}

/// Plain-data copy of [`PickupStats`] for status displays.
#[derive(Clone, Debug, PartialEq, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct StatsSnapshot {
    pub total: u64,
    pub successful: u64,
    pub failed: u64,
    pub success_rate: f64,
    pub session_duration: Duration,
    pub since_last_pickup: Option<Duration>,
}
