//! Nearby-portal detection.

use std::sync::Arc;
use std::time::Duration;

use pickup_core::{
    CachedValue, Clock, InteractiveKind, InteractiveObject, WorldOracle, WorldPosition,
};

/// Time-cached list of portals in the current world.
pub struct PortalDetector {
    portals: CachedValue<Arc<Vec<InteractiveObject>>>,
}

impl PortalDetector {
    pub const DEFAULT_REFRESH: Duration = Duration::from_millis(100);

    /// Builds a detector over any source of interactive objects.
    pub fn new<F>(refresh: Duration, clock: Arc<dyn Clock>, mut objects: F) -> Self
    where
        F: FnMut() -> Vec<InteractiveObject> + Send + 'static,
    {
        let portals = CachedValue::every(refresh, clock, move || {
            Arc::new(
                objects()
                    .into_iter()
                    .filter(|object| object.kind == InteractiveKind::Portal)
                    .collect(),
            )
        });
        Self { portals }
    }

    pub fn from_oracle(world: Arc<dyn WorldOracle>, refresh: Duration, clock: Arc<dyn Clock>) -> Self {
        Self::new(refresh, clock, move || {
            world
                .snapshot()
                .map(|snapshot| snapshot.interactives)
                .unwrap_or_default()
        })
    }

    /// Closest portal within `proximity` of `position`, if any.
    pub fn nearest_portal(&self, position: &WorldPosition, proximity: f32) -> Option<InteractiveObject> {
        self.portals
            .get_value()
            .iter()
            .map(|portal| (portal.position.distance_to(position), portal))
            .filter(|(distance, _)| *distance <= proximity)
            .min_by(|a, b| a.0.total_cmp(&b.0))
            .map(|(_, portal)| portal.clone())
    }

    pub fn refresh(&self) {
        self.portals.force_refresh();
    }
}

impl std::fmt::Debug for PortalDetector {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PortalDetector")
            .field("policy", &self.portals.policy())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use parking_lot::Mutex;
    use pickup_core::{EntityId, ManualClock, ScreenRect};

    fn object(id: u64, kind: InteractiveKind, x: f32) -> InteractiveObject {
        InteractiveObject {
            id: EntityId(id),
            kind,
            position: WorldPosition::new(x, 0.0, 0.0),
            screen_rect: ScreenRect::default(),
            is_targeted: false,
        }
    }

    #[test]
    fn finds_nearest_portal_within_proximity() {
        let clock = Arc::new(ManualClock::new());
        let detector = PortalDetector::new(Duration::from_millis(100), clock, || {
            vec![
                object(1, InteractiveKind::Portal, 80.0),
                object(2, InteractiveKind::Other, 5.0),
                object(3, InteractiveKind::Portal, 30.0),
            ]
        });

        let origin = WorldPosition::ORIGIN;
        assert_eq!(detector.nearest_portal(&origin, 50.0).map(|p| p.id), Some(EntityId(3)));
        assert_eq!(detector.nearest_portal(&origin, 10.0), None);
    }

    #[test]
    fn list_is_cached_for_the_refresh_window() {
        let clock = Arc::new(ManualClock::new());
        let objects = Arc::new(Mutex::new(vec![]));
        let feed = Arc::clone(&objects);
        let detector = PortalDetector::new(Duration::from_millis(100), clock.clone(), move || {
            feed.lock().clone()
        });

        assert!(detector.nearest_portal(&WorldPosition::ORIGIN, 50.0).is_none());
        objects.lock().push(object(9, InteractiveKind::Portal, 1.0));

        clock.advance(Duration::from_millis(99));
        assert!(detector.nearest_portal(&WorldPosition::ORIGIN, 50.0).is_none());

        clock.advance(Duration::from_millis(1));
        assert!(detector.nearest_portal(&WorldPosition::ORIGIN, 50.0).is_some());
    }
}
