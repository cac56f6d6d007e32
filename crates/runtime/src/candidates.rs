//! Candidate discovery from world snapshots.

use std::sync::Arc;
use std::time::Duration;

use pickup_core::{CachedValue, Candidate, Clock, WorldSnapshot};

/// Labels within `range`, nearest first.
pub fn collect_candidates(snapshot: &WorldSnapshot, range: f32) -> Vec<Candidate> {
    let mut candidates: Vec<Candidate> = snapshot
        .labels
        .iter()
        .filter(|label| label.distance <= range)
        .map(Candidate::from_label)
        .collect();
    candidates.sort_by(|a, b| a.distance.total_cmp(&b.distance));
    candidates
}

/// Time-cached candidate list.
///
/// The list may be up to one refresh window old, so callers run it through
/// [`CandidateSource::revalidate`] against the current snapshot before use.
pub struct CandidateSource {
    range: f32,
    cache: CachedValue<Arc<Vec<Candidate>>>,
}

impl CandidateSource {
    pub const DEFAULT_REFRESH: Duration = Duration::from_millis(100);

    pub fn new<F>(range: f32, refresh: Duration, clock: Arc<dyn Clock>, mut snapshot: F) -> Self
    where
        F: FnMut() -> Option<Arc<WorldSnapshot>> + Send + 'static,
    {
        let cache = CachedValue::every(refresh, clock, move || {
            Arc::new(
                snapshot()
                    .map(|snapshot| collect_candidates(&snapshot, range))
                    .unwrap_or_default(),
            )
        });
        Self { range, cache }
    }

    pub fn range(&self) -> f32 {
        self.range
    }

    pub fn cached(&self) -> Arc<Vec<Candidate>> {
        self.cache.get_value()
    }

    pub fn force_refresh(&self) {
        self.cache.force_refresh();
    }

    /// Cached candidates that still exist in `snapshot`, with label, position
    /// and distance taken from it.
    pub fn revalidate(&self, snapshot: &WorldSnapshot) -> Vec<Candidate> {
        let cached = self.cached();
        let mut current: Vec<Candidate> = cached
            .iter()
            .filter_map(|candidate| {
                let label = snapshot.label(candidate.id)?;
                if label.distance > self.range {
                    return None;
                }
                let mut fresh = candidate.clone();
                fresh.position = label.position;
                fresh.distance = label.distance;
                fresh.label = label.label;
                fresh.details = label.details.clone();
                Some(fresh)
            })
            .collect();
        current.sort_by(|a, b| a.distance.total_cmp(&b.distance));
        current
    }
}

impl std::fmt::Debug for CandidateSource {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CandidateSource")
            .field("range", &self.range)
            .field("cache", &self.cache)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use parking_lot::Mutex;
    use pickup_core::{
        EntityId, GroundLabel, ItemDetails, LabelInfo, ManualClock, TargetDetails, WorldPosition,
    };

    fn label(id: u64, distance: f32) -> GroundLabel {
        GroundLabel {
            id: EntityId(id),
            position: WorldPosition::new(distance, 0.0, 0.0),
            distance,
            label: LabelInfo::default(),
            details: TargetDetails::Item(ItemDetails::new("Orb", "Metadata/Orb")),
        }
    }

    fn world(labels: Vec<GroundLabel>) -> WorldSnapshot {
        WorldSnapshot {
            labels,
            ..WorldSnapshot::default()
        }
    }

    #[test]
    fn collects_in_range_nearest_first() {
        let snapshot = world(vec![label(1, 300.0), label(2, 700.0), label(3, 50.0)]);
        let ids: Vec<u64> = collect_candidates(&snapshot, 600.0)
            .iter()
            .map(|candidate| candidate.id.0)
            .collect();
        assert_eq!(ids, vec![3, 1]);
    }

    #[test]
    fn revalidation_drops_vanished_and_updates_distance() {
        let clock = Arc::new(ManualClock::new());
        let shared = Arc::new(Mutex::new(Arc::new(world(vec![label(1, 100.0), label(2, 200.0)]))));
        let feed = Arc::clone(&shared);
        let source = CandidateSource::new(600.0, Duration::from_millis(100), clock, move || {
            Some(Arc::clone(&feed.lock()))
        });
        assert_eq!(source.cached().len(), 2);

        // Within the refresh window the cache is stale but revalidation is not.
        let now = world(vec![label(2, 40.0)]);
        let current = source.revalidate(&now);
        assert_eq!(current.len(), 1);
        assert_eq!(current[0].id, EntityId(2));
        assert_eq!(current[0].distance, 40.0);
    }

    #[test]
    fn missing_world_yields_no_candidates() {
        let clock = Arc::new(ManualClock::new());
        let source = CandidateSource::new(600.0, Duration::from_millis(100), clock, || None);
        assert!(source.cached().is_empty());
    }
}
