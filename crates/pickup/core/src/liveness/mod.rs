//! Death awareness and attempt limiting.
//!
//! [`DeathAwareness`] is the single object the tick loop consults before
//! acting: it composes the [`LivenessMonitor`], the per-target
//! [`AttemptTracker`] and session [`PickupStats`]. It is owned by the tick
//! loop and mutated only there.
mod attempts;
mod monitor;
mod stats;

pub use attempts::{AttemptRecord, AttemptTracker};
pub use monitor::{LivenessEvent, LivenessMonitor, LivenessState};
pub use stats::{PickupStats, StatsSnapshot};

use std::collections::HashSet;
use std::time::Instant;

use crate::config::{AttemptPolicy, LivenessConfig};
use crate::state::{Candidate, EntityId};

#[derive(Debug)]
pub struct DeathAwareness {
    monitor: LivenessMonitor,
    attempts: AttemptTracker,
    stats: PickupStats,
}

impl DeathAwareness {
    pub fn new(liveness: LivenessConfig, policy: AttemptPolicy, now: Instant) -> Self {
        Self {
            monitor: LivenessMonitor::new(liveness),
            attempts: AttemptTracker::new(policy),
            stats: PickupStats::new(now),
        }
    }

    pub fn subscribe(&mut self, subscriber: impl FnMut(LivenessEvent) + Send + 'static) {
        self.monitor.subscribe(subscriber);
    }

    pub fn poll(&mut self, now: Instant, agent_alive: bool) -> Option<LivenessEvent> {
        self.monitor.poll(now, agent_alive)
    }

    pub fn state(&self) -> LivenessState {
        self.monitor.state()
    }

    pub fn should_allow_pickup(&self) -> bool {
        self.monitor.should_allow_pickup()
    }

    pub fn is_awaiting_resume(&self) -> bool {
        self.monitor.is_awaiting_resume()
    }

    pub fn resume(&mut self) {
        self.monitor.resume();
    }

    pub fn observe(&mut self, candidate: &mut Candidate, now: Instant) {
        self.attempts.observe(candidate, now);
    }

    pub fn is_eligible(&self, candidate: &Candidate) -> bool {
        self.attempts.is_eligible(candidate)
    }

    pub fn record_attempt(&mut self, id: EntityId, now: Instant) -> u32 {
        self.attempts.record_attempt(id, now)
    }

    pub fn attempts(&self, id: EntityId) -> u32 {
        self.attempts.attempts(id)
    }

    /// Records a finished pickup; a success also drops the target's counter.
    pub fn record_outcome(&mut self, id: EntityId, success: bool, now: Instant) {
        self.stats.record(success, now);
        if success {
            self.attempts.forget(id);
        }
    }

    pub fn retain(&mut self, live: &HashSet<EntityId>) {
        self.attempts.retain(live);
    }

    pub fn on_area_change(&mut self) -> bool {
        self.attempts.on_area_change()
    }

    pub fn status_line(&self, now: Instant) -> String {
        self.monitor.status_line(now)
    }

    pub fn stats(&self) -> &PickupStats {
        &self.stats
    }

    pub fn stats_snapshot(&self, now: Instant) -> StatsSnapshot {
        self.stats.snapshot(now)
    }

    pub fn reset_stats(&mut self, now: Instant) {
        self.stats.reset(now);
    }

    pub fn monitor(&self) -> &LivenessMonitor {
        &self.monitor
    }

    pub fn tracker(&self) -> &AttemptTracker {
        &self.attempts
    }
}
