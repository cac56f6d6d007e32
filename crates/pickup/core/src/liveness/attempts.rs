//! Per-target attempt counters with idle and area-change resets.

use std::collections::{HashMap, HashSet};
use std::time::Instant;

use crate::config::AttemptPolicy;
use crate::state::{Candidate, CandidateFlags, EntityId};

/// Durable bookkeeping for one target identity.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct AttemptRecord {
    pub attempts: u32,
    pub first_seen: Instant,
    pub last_attempt: Option<Instant>,
}

/// Owns attempt records across candidate recomputation.
#[derive(Debug)]
pub struct AttemptTracker {
    policy: AttemptPolicy,
    records: HashMap<EntityId, AttemptRecord>,
}

impl AttemptTracker {
    pub fn new(policy: AttemptPolicy) -> Self {
        Self {
            policy,
            records: HashMap::new(),
        }
    }

    pub fn policy(&self) -> &AttemptPolicy {
        &self.policy
    }

    /// Stamps the durable record onto a freshly built candidate.
    ///
    /// New identities get a record with `first_seen = now`. A counter idle for
    /// `reset_after` since its last attempt starts over.
    pub fn observe(&mut self, candidate: &mut Candidate, now: Instant) {
        let reset_after = self.policy.reset_after;
        let record = self.records.entry(candidate.id).or_insert(AttemptRecord {
            attempts: 0,
            first_seen: now,
            last_attempt: None,
        });

        if let Some(last) = record.last_attempt
            && record.attempts > 0
            && now.saturating_duration_since(last) >= reset_after
        {
            tracing::debug!(
                target: "pickup::attempts",
                id = %candidate.id,
                attempts = record.attempts,
                "attempt counter idle, resetting"
            );
            record.attempts = 0;
        }

        candidate.attempts = record.attempts;
        candidate.first_seen = Some(record.first_seen);
        candidate.last_attempt = record.last_attempt;
        candidate.flags.set(
            CandidateFlags::MAX_ATTEMPTS_REACHED,
            record.attempts >= self.policy.max_attempts,
        );
    }

    /// False once the counter hit the limit, unless priority bypass applies.
    pub fn is_eligible(&self, candidate: &Candidate) -> bool {
        let attempts = self
            .records
            .get(&candidate.id)
            .map_or(candidate.attempts, |record| record.attempts);

        if attempts < self.policy.max_attempts {
            return true;
        }
        candidate.is_priority() && self.policy.priority_ignores_limit
    }

    /// Counts one interaction round against `id`; returns the new count.
    pub fn record_attempt(&mut self, id: EntityId, now: Instant) -> u32 {
        let record = self.records.entry(id).or_insert(AttemptRecord {
            attempts: 0,
            first_seen: now,
            last_attempt: None,
        });
        record.attempts += 1;
        record.last_attempt = Some(now);

        if record.attempts == self.policy.max_attempts {
            tracing::info!(
                target: "pickup::attempts",
                %id,
                max = self.policy.max_attempts,
                "attempt limit reached"
            );
        }
        record.attempts
    }

    pub fn attempts(&self, id: EntityId) -> u32 {
        self.records.get(&id).map_or(0, |record| record.attempts)
    }

    pub fn record(&self, id: EntityId) -> Option<&AttemptRecord> {
        self.records.get(&id)
    }

    /// Drops the record of a target that was picked up.
    pub fn forget(&mut self, id: EntityId) {
        self.records.remove(&id);
    }

    /// Keeps only records for identities still present in the world.
    pub fn retain(&mut self, live: &HashSet<EntityId>) {
        self.records.retain(|id, _| live.contains(id));
    }

    /// Clears every counter if the policy asks for it. Returns whether it did.
    pub fn on_area_change(&mut self) -> bool {
        if !self.policy.reset_on_area_change {
            return false;
        }
        let cleared = self.records.len();
        self.records.clear();
        tracing::debug!(target: "pickup::attempts", cleared, "area changed, attempt records cleared");
        true
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::state::{GroundLabel, ItemDetails, LabelInfo, TargetDetails, WorldPosition};
    use std::time::Duration;

    fn candidate(id: u64) -> Candidate {
        Candidate::from_label(&GroundLabel {
            id: EntityId(id),
            position: WorldPosition::ORIGIN,
            distance: 10.0,
            label: LabelInfo::default(),
            details: TargetDetails::Item(ItemDetails::new("Chaos Orb", "Currency/Chaos")),
        })
    }

    fn policy() -> AttemptPolicy {
        AttemptPolicy {
            max_attempts: 3,
            reset_after: Duration::from_secs(5),
            ..AttemptPolicy::default()
        }
    }

    #[test]
    fn limit_excludes_non_priority_candidates() {
        let mut tracker = AttemptTracker::new(policy());
        let now = Instant::now();
        let mut c = candidate(1);

        for _ in 0..3 {
            tracker.record_attempt(c.id, now);
        }
        tracker.observe(&mut c, now);

        assert_eq!(c.attempts, 3);
        assert!(c.max_attempts_reached());
        assert!(!tracker.is_eligible(&c));
    }

    #[test]
    fn priority_bypasses_limit_when_configured() {
        let mut tracker = AttemptTracker::new(policy());
        let now = Instant::now();
        let mut c = candidate(1);
        c.flags.insert(CandidateFlags::PRIORITY);

        for _ in 0..3 {
            tracker.record_attempt(c.id, now);
        }
        tracker.observe(&mut c, now);
        assert!(tracker.is_eligible(&c));

        let strict = AttemptTracker {
            policy: AttemptPolicy {
                priority_ignores_limit: false,
                ..policy()
            },
            records: tracker.records.clone(),
        };
        assert!(!strict.is_eligible(&c));
    }

    #[test]
    fn bookkeeping_carries_across_rebuilt_candidates() {
        let mut tracker = AttemptTracker::new(policy());
        let t0 = Instant::now();

        let mut first = candidate(7);
        tracker.observe(&mut first, t0);
        tracker.record_attempt(first.id, t0 + Duration::from_millis(100));

        // A fresh snapshot produces a brand-new candidate for the same identity.
        let mut rebuilt = candidate(7);
        assert_eq!(rebuilt.attempts, 0);
        tracker.observe(&mut rebuilt, t0 + Duration::from_millis(200));

        assert_eq!(rebuilt.attempts, 1);
        assert_eq!(rebuilt.first_seen, Some(t0));
        assert_eq!(rebuilt.last_attempt, Some(t0 + Duration::from_millis(100)));
    }

    #[test]
    fn idle_counters_reset() {
        let mut tracker = AttemptTracker::new(policy());
        let t0 = Instant::now();
        let mut c = candidate(1);

        for _ in 0..3 {
            tracker.record_attempt(c.id, t0);
        }
        tracker.observe(&mut c, t0 + Duration::from_secs(4));
        assert!(!tracker.is_eligible(&c));

        tracker.observe(&mut c, t0 + Duration::from_secs(5));
        assert_eq!(c.attempts, 0);
        assert!(tracker.is_eligible(&c));
    }

    #[test]
    fn area_change_clears_when_configured() {
        let now = Instant::now();

        let mut tracker = AttemptTracker::new(policy());
        tracker.record_attempt(EntityId(1), now);
        assert!(tracker.on_area_change());
        assert_eq!(tracker.attempts(EntityId(1)), 0);

        let mut keep = AttemptTracker::new(AttemptPolicy {
            reset_on_area_change: false,
            ..policy()
        });
        keep.record_attempt(EntityId(1), now);
        assert!(!keep.on_area_change());
        assert_eq!(keep.attempts(EntityId(1)), 1);
    }

    #[test]
    fn retain_prunes_vanished_identities() {
        let mut tracker = AttemptTracker::new(policy());
        let now = Instant::now();
        tracker.record_attempt(EntityId(1), now);
        tracker.record_attempt(EntityId(2), now);

        tracker.retain(&HashSet::from([EntityId(2)]));

        assert_eq!(tracker.len(), 1);
        assert_eq!(tracker.attempts(EntityId(2)), 1);
    }
}
