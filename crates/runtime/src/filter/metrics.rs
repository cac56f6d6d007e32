//! Filter engine counters.
//!
//! Tracks reloads and evaluation outcomes for status displays and debugging.

use std::sync::atomic::{AtomicU64, Ordering};

use serde::Serialize;

/// Lock-free counters updated from the tick loop and reload tasks.
#[derive(Debug, Default)]
pub struct FilterMetrics {
    /// Reloads that published a new filter set
    reloads: AtomicU64,

    /// Reloads rejected because another one held the gate
    reloads_busy: AtomicU64,

    /// Rule files dropped after exhausting read retries
    rules_dropped: AtomicU64,

    /// `should_pickup` calls that consulted the filter set
    evaluations: AtomicU64,

    /// Evaluations where at least one filter matched
    matches: AtomicU64,

    /// Per-filter evaluation errors treated as non-match
    eval_errors: AtomicU64,
}

impl FilterMetrics {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn record_reload(&self, dropped: usize) {
        self.reloads.fetch_add(1, Ordering::Relaxed);
        self.rules_dropped
            .fetch_add(dropped as u64, Ordering::Relaxed);
    }

    pub fn record_busy(&self) {
        self.reloads_busy.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_evaluation(&self, matched: bool) {
        self.evaluations.fetch_add(1, Ordering::Relaxed);
        if matched {
            self.matches.fetch_add(1, Ordering::Relaxed);
        }
    }

    pub fn record_eval_error(&self) {
        self.eval_errors.fetch_add(1, Ordering::Relaxed);
    }

    pub fn reloads(&self) -> u64 {
        self.reloads.load(Ordering::Relaxed)
    }

    pub fn evaluations(&self) -> u64 {
        self.evaluations.load(Ordering::Relaxed)
    }

    pub fn matches(&self) -> u64 {
        self.matches.load(Ordering::Relaxed)
    }

    pub fn eval_errors(&self) -> u64 {
        self.eval_errors.load(Ordering::Relaxed)
    }

    /// Returns match rate as a percentage (0-100).
    pub fn match_rate(&self) -> f64 {
        let evaluations = self.evaluations();
        if evaluations == 0 {
            0.0
        } else {
            (self.matches() as f64 / evaluations as f64) * 100.0
        }
    }

    /// Individual fields are read atomically; the snapshot as a whole is not.
    pub fn snapshot(&self) -> FilterMetricsSnapshot {
        FilterMetricsSnapshot {
            reloads: self.reloads(),
            reloads_busy: self.reloads_busy.load(Ordering::Relaxed),
            rules_dropped: self.rules_dropped.load(Ordering::Relaxed),
            evaluations: self.evaluations(),
            matches: self.matches(),
            eval_errors: self.eval_errors(),
            match_rate: self.match_rate(),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct FilterMetricsSnapshot {
    pub reloads: u64,
    pub reloads_busy: u64,
    pub rules_dropped: u64,
    pub evaluations: u64,
    pub matches: u64,
    pub eval_errors: u64,
    pub match_rate: f64,
}
