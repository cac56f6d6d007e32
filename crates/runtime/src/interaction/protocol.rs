//! Bounded, paced interaction rounds against one target.

use std::sync::Arc;
use std::time::{Duration, Instant};

use serde::{Deserialize, Serialize};

use pickup_core::{GroundLabel, ScreenPoint, WorldSnapshot};

use super::portal::PortalDetector;
use super::task::{DeferReason, PickupTask, StepResult, TaskOutcome, TaskPhase};
use crate::api::{BridgeResult, InputBridge};

/// Interaction pacing and interference settings.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct InteractionConfig {
    /// Rounds after which a target is given up.
    pub max_rounds: u32,
    /// Minimum gap between two rounds on the same task.
    #[serde(with = "pickup_core::serde_duration")]
    pub click_interval: Duration,
    /// Pause between moving the pointer and clicking.
    #[serde(with = "pickup_core::serde_duration")]
    pub settle_delay: Duration,
    /// Targets closer than this are clicked even while the agent moves.
    pub ignore_moving_below: f32,
    /// Use the host's targeted action instead of pointer clicks.
    pub use_targeted_action: bool,
    /// World distance within which a portal is considered competing.
    pub portal_proximity: f32,
    #[serde(with = "pickup_core::serde_duration")]
    pub portal_refresh: Duration,
    /// Labels closer than this to the window edge are not clicked.
    pub window_margin: f32,
}

impl InteractionConfig {
    pub const DEFAULT_MAX_ROUNDS: u32 = 3;
    pub const DEFAULT_CLICK_INTERVAL: Duration = Duration::from_millis(150);
    pub const DEFAULT_SETTLE_DELAY: Duration = Duration::from_millis(30);
    pub const DEFAULT_IGNORE_MOVING_BELOW: f32 = 25.0;
    pub const DEFAULT_PORTAL_PROXIMITY: f32 = 150.0;
    pub const DEFAULT_WINDOW_MARGIN: f32 = 10.0;
}

impl Default for InteractionConfig {
    fn default() -> Self {
        Self {
            max_rounds: Self::DEFAULT_MAX_ROUNDS,
            click_interval: Self::DEFAULT_CLICK_INTERVAL,
            settle_delay: Self::DEFAULT_SETTLE_DELAY,
            ignore_moving_below: Self::DEFAULT_IGNORE_MOVING_BELOW,
            use_targeted_action: false,
            portal_proximity: Self::DEFAULT_PORTAL_PROXIMITY,
            portal_refresh: PortalDetector::DEFAULT_REFRESH,
            window_margin: Self::DEFAULT_WINDOW_MARGIN,
        }
    }
}

/// Turns "pick up X" into pointer actions, one step per tick.
///
/// Every gate is re-evaluated on each step, so a task that was deferred
/// simply resumes when the condition clears. The protocol itself holds no
/// per-target state; everything lives in the [`PickupTask`].
pub struct InteractionProtocol {
    config: InteractionConfig,
    bridge: Arc<dyn InputBridge>,
    portals: PortalDetector,
}

impl InteractionProtocol {
    pub fn new(config: InteractionConfig, bridge: Arc<dyn InputBridge>, portals: PortalDetector) -> Self {
        Self {
            config,
            bridge,
            portals,
        }
    }

    pub fn config(&self) -> &InteractionConfig {
        &self.config
    }

    pub fn portals(&self) -> &PortalDetector {
        &self.portals
    }

    /// Advances `task` by at most one round.
    pub fn step(&self, task: &mut PickupTask, snapshot: &WorldSnapshot, now: Instant) -> StepResult {
        if let Some(outcome) = task.outcome() {
            return StepResult::Finished(outcome);
        }

        let usable = snapshot.window.inset(self.config.window_margin);
        let Some(label) = snapshot
            .label(task.target())
            .filter(|label| label.label.is_clickable(&usable))
        else {
            tracing::debug!(
                target: "pickup::interaction",
                target_id = %task.target(),
                rounds = task.rounds(),
                "label gone, task collected"
            );
            return task.finish(TaskOutcome::Collected);
        };

        if task.rounds() >= self.config.max_rounds {
            tracing::debug!(
                target: "pickup::interaction",
                target_id = %task.target(),
                rounds = task.rounds(),
                "round limit reached"
            );
            return task.finish(TaskOutcome::Exhausted);
        }

        if snapshot.agent.is_moving && label.distance > self.config.ignore_moving_below {
            return StepResult::Deferred(DeferReason::Moving);
        }

        let center = label.label.center();
        match task.phase {
            TaskPhase::Ready => self.step_ready(task, label, center, now),
            TaskPhase::Settling { since, .. } => {
                if now.saturating_duration_since(since) < self.config.settle_delay {
                    return StepResult::Deferred(DeferReason::Settling);
                }
                if self.pacing(task, now) {
                    return StepResult::Deferred(DeferReason::Pacing);
                }
                self.click(task, center, now)
            }
            TaskPhase::Finished(outcome) => StepResult::Finished(outcome),
        }
    }

    fn step_ready(
        &self,
        task: &mut PickupTask,
        label: &GroundLabel,
        center: ScreenPoint,
        now: Instant,
    ) -> StepResult {
        let portal = self
            .portals
            .nearest_portal(&label.position, self.config.portal_proximity);

        if let Some(portal) = portal.as_ref()
            && portal.is_targeted
        {
            tracing::debug!(
                target: "pickup::interaction",
                target_id = %task.target(),
                portal = %portal.id,
                "portal holds focus, re-aiming"
            );
            return match self.bridge.move_pointer(center) {
                Ok(()) => {
                    task.phase = TaskPhase::Settling { since: now, at: center };
                    StepResult::Deferred(DeferReason::PortalFocus)
                }
                Err(error) => self.fail_round(task, now, error),
            };
        }

        if self.pacing(task, now) {
            return StepResult::Deferred(DeferReason::Pacing);
        }

        if self.config.use_targeted_action && portal.is_none() {
            let result = self.bridge.target_action(task.target());
            return self.complete(task, now, result);
        }

        if let Err(error) = self.bridge.move_pointer(center) {
            return self.fail_round(task, now, error);
        }

        if self.config.settle_delay.is_zero() {
            self.click(task, center, now)
        } else {
            task.phase = TaskPhase::Settling { since: now, at: center };
            StepResult::Deferred(DeferReason::Settling)
        }
    }

    fn pacing(&self, task: &PickupTask, now: Instant) -> bool {
        task.last_click()
            .is_some_and(|last| now.saturating_duration_since(last) < self.config.click_interval)
    }

    fn click(&self, task: &mut PickupTask, at: ScreenPoint, now: Instant) -> StepResult {
        let result = self.bridge.click(at);
        self.complete(task, now, result)
    }

    fn complete(&self, task: &mut PickupTask, now: Instant, result: BridgeResult<()>) -> StepResult {
        match result {
            Ok(()) => {
                let step = task.complete_round(now, Ok(()));
                tracing::trace!(
                    target: "pickup::interaction",
                    target_id = %task.target(),
                    round = task.rounds(),
                    "round issued"
                );
                step
            }
            Err(error) => self.fail_round(task, now, error),
        }
    }

    fn fail_round(&self, task: &mut PickupTask, now: Instant, error: crate::api::BridgeError) -> StepResult {
        tracing::warn!(
            target: "pickup::interaction",
            target_id = %task.target(),
            round = task.rounds() + 1,
            %error,
            "input bridge failed"
        );
        task.complete_round(now, Err(error))
    }
}

impl std::fmt::Debug for InteractionProtocol {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("InteractionProtocol")
            .field("config", &self.config)
            .field("portals", &self.portals)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::api::BridgeError;
    use parking_lot::Mutex;
    use pickup_core::{
        AgentState, Clock, EntityId, InteractiveKind, InteractiveObject, ItemDetails, LabelInfo,
        ManualClock, ScreenRect, TargetDetails, TargetKind, WorldPosition,
    };

    #[derive(Debug, Clone, PartialEq)]
    enum Action {
        Move(ScreenPoint),
        Click(ScreenPoint),
        Target(EntityId),
    }

    #[derive(Default)]
    struct RecordingBridge {
        actions: Mutex<Vec<Action>>,
        fail_clicks: bool,
    }

    impl RecordingBridge {
        fn clicks(&self) -> usize {
            self.actions
                .lock()
                .iter()
                .filter(|action| matches!(action, Action::Click(_) | Action::Target(_)))
                .count()
        }
    }

    impl InputBridge for RecordingBridge {
        fn move_pointer(&self, to: ScreenPoint) -> BridgeResult<()> {
            self.actions.lock().push(Action::Move(to));
            Ok(())
        }

        fn click(&self, at: ScreenPoint) -> BridgeResult<()> {
            if self.fail_clicks {
                return Err(BridgeError::Unavailable);
            }
            self.actions.lock().push(Action::Click(at));
            Ok(())
        }

        fn target_action(&self, target: EntityId) -> BridgeResult<()> {
            self.actions.lock().push(Action::Target(target));
            Ok(())
        }
    }

    const TARGET: EntityId = EntityId(7);

    fn snapshot(distance: f32) -> WorldSnapshot {
        WorldSnapshot {
            area_id: 1,
            window: ScreenRect::new(0.0, 0.0, 1920.0, 1080.0),
            agent: AgentState::default(),
            labels: vec![GroundLabel {
                id: TARGET,
                position: WorldPosition::new(distance, 0.0, 0.0),
                distance,
                label: LabelInfo {
                    rect: ScreenRect::new(900.0, 500.0, 80.0, 20.0),
                    visible: true,
                    index: Some(0),
                },
                details: TargetDetails::Item(ItemDetails::new("Chaos Orb", "Metadata/Currency/Chaos")),
            }],
            interactives: vec![],
        }
    }

    struct Fixture {
        clock: Arc<ManualClock>,
        bridge: Arc<RecordingBridge>,
        portals: Arc<Mutex<Vec<InteractiveObject>>>,
        protocol: InteractionProtocol,
    }

    fn fixture(config: InteractionConfig, bridge: RecordingBridge) -> Fixture {
        let clock = Arc::new(ManualClock::new());
        let bridge = Arc::new(bridge);
        let portals = Arc::new(Mutex::new(Vec::new()));
        let feed = Arc::clone(&portals);
        let detector = PortalDetector::new(Duration::ZERO, clock.clone(), move || feed.lock().clone());
        let protocol = InteractionProtocol::new(config, bridge.clone(), detector);
        Fixture {
            clock,
            bridge,
            portals,
            protocol,
        }
    }

    fn instant_config() -> InteractionConfig {
        InteractionConfig {
            settle_delay: Duration::ZERO,
            ..InteractionConfig::default()
        }
    }

    #[test]
    fn clicks_once_per_step_and_paces_rounds() {
        let fx = fixture(instant_config(), RecordingBridge::default());
        let world = snapshot(50.0);
        let mut task = PickupTask::new(TARGET, TargetKind::Item, fx.clock.now());

        assert_eq!(
            fx.protocol.step(&mut task, &world, fx.clock.now()),
            StepResult::RoundIssued { round: 1 }
        );
        assert_eq!(
            fx.protocol.step(&mut task, &world, fx.clock.now()),
            StepResult::Deferred(DeferReason::Pacing)
        );

        fx.clock.advance(InteractionConfig::DEFAULT_CLICK_INTERVAL);
        assert_eq!(
            fx.protocol.step(&mut task, &world, fx.clock.now()),
            StepResult::RoundIssued { round: 2 }
        );
        assert_eq!(fx.bridge.clicks(), 2);
    }

    #[test]
    fn settle_delay_splits_move_and_click() {
        let fx = fixture(InteractionConfig::default(), RecordingBridge::default());
        let world = snapshot(50.0);
        let mut task = PickupTask::new(TARGET, TargetKind::Item, fx.clock.now());

        assert_eq!(
            fx.protocol.step(&mut task, &world, fx.clock.now()),
            StepResult::Deferred(DeferReason::Settling)
        );
        assert_eq!(fx.bridge.clicks(), 0);

        fx.clock.advance(InteractionConfig::DEFAULT_SETTLE_DELAY);
        assert_eq!(
            fx.protocol.step(&mut task, &world, fx.clock.now()),
            StepResult::RoundIssued { round: 1 }
        );
        let actions = fx.bridge.actions.lock().clone();
        assert!(matches!(actions.as_slice(), [Action::Move(_), Action::Click(_)]));
    }

    #[test]
    fn missing_label_finishes_as_collected() {
        let fx = fixture(instant_config(), RecordingBridge::default());
        let mut task = PickupTask::new(TARGET, TargetKind::Item, fx.clock.now());

        let mut world = snapshot(50.0);
        world.labels.clear();
        assert_eq!(
            fx.protocol.step(&mut task, &world, fx.clock.now()),
            StepResult::Finished(TaskOutcome::Collected)
        );
        assert!(task.is_finished());
    }

    #[test]
    fn label_outside_usable_window_is_collected() {
        let fx = fixture(instant_config(), RecordingBridge::default());
        let mut task = PickupTask::new(TARGET, TargetKind::Item, fx.clock.now());

        let mut world = snapshot(50.0);
        world.labels[0].label.rect = ScreenRect::new(1915.0, 500.0, 4.0, 4.0);
        assert_eq!(
            fx.protocol.step(&mut task, &world, fx.clock.now()),
            StepResult::Finished(TaskOutcome::Collected)
        );
    }

    #[test]
    fn exhausts_after_max_rounds() {
        let fx = fixture(instant_config(), RecordingBridge::default());
        let world = snapshot(50.0);
        let mut task = PickupTask::new(TARGET, TargetKind::Item, fx.clock.now());

        for _ in 0..InteractionConfig::DEFAULT_MAX_ROUNDS {
            assert!(matches!(
                fx.protocol.step(&mut task, &world, fx.clock.now()),
                StepResult::RoundIssued { .. }
            ));
            fx.clock.advance(InteractionConfig::DEFAULT_CLICK_INTERVAL);
        }

        assert_eq!(
            fx.protocol.step(&mut task, &world, fx.clock.now()),
            StepResult::Finished(TaskOutcome::Exhausted)
        );
        assert_eq!(fx.bridge.clicks(), 3);
    }

    #[test]
    fn moving_agent_defers_without_consuming_rounds() {
        let fx = fixture(instant_config(), RecordingBridge::default());
        let mut world = snapshot(50.0);
        world.agent.is_moving = true;
        let mut task = PickupTask::new(TARGET, TargetKind::Item, fx.clock.now());

        assert_eq!(
            fx.protocol.step(&mut task, &world, fx.clock.now()),
            StepResult::Deferred(DeferReason::Moving)
        );
        assert_eq!(task.rounds(), 0);

        // Close enough to ignore movement.
        let mut near = snapshot(10.0);
        near.agent.is_moving = true;
        assert_eq!(
            fx.protocol.step(&mut task, &near, fx.clock.now()),
            StepResult::RoundIssued { round: 1 }
        );
    }

    #[test]
    fn targeted_portal_defers_and_reaims() {
        let fx = fixture(instant_config(), RecordingBridge::default());
        fx.portals.lock().push(InteractiveObject {
            id: EntityId(99),
            kind: InteractiveKind::Portal,
            position: WorldPosition::new(60.0, 0.0, 0.0),
            screen_rect: ScreenRect::new(950.0, 480.0, 60.0, 120.0),
            is_targeted: true,
        });
        let world = snapshot(50.0);
        let mut task = PickupTask::new(TARGET, TargetKind::Item, fx.clock.now());

        assert_eq!(
            fx.protocol.step(&mut task, &world, fx.clock.now()),
            StepResult::Deferred(DeferReason::PortalFocus)
        );
        assert_eq!(fx.bridge.clicks(), 0);
        assert_eq!(task.rounds(), 0);

        // Once settled the click goes out even if the portal still claims focus.
        assert_eq!(
            fx.protocol.step(&mut task, &world, fx.clock.now()),
            StepResult::RoundIssued { round: 1 }
        );
    }

    #[test]
    fn nearby_portal_disables_targeted_action() {
        let config = InteractionConfig {
            use_targeted_action: true,
            ..instant_config()
        };
        let fx = fixture(config, RecordingBridge::default());
        let world = snapshot(50.0);
        let mut task = PickupTask::new(TARGET, TargetKind::Item, fx.clock.now());

        fx.protocol.step(&mut task, &world, fx.clock.now());
        assert_eq!(fx.bridge.actions.lock().last(), Some(&Action::Target(TARGET)));

        fx.portals.lock().push(InteractiveObject {
            id: EntityId(99),
            kind: InteractiveKind::Portal,
            position: WorldPosition::new(60.0, 0.0, 0.0),
            screen_rect: ScreenRect::default(),
            is_targeted: false,
        });
        fx.clock.advance(InteractionConfig::DEFAULT_CLICK_INTERVAL);
        fx.protocol.step(&mut task, &world, fx.clock.now());
        assert!(matches!(fx.bridge.actions.lock().last(), Some(Action::Click(_))));
    }

    #[test]
    fn bridge_failure_consumes_a_round() {
        let bridge = RecordingBridge {
            fail_clicks: true,
            ..RecordingBridge::default()
        };
        let fx = fixture(instant_config(), bridge);
        let world = snapshot(50.0);
        let mut task = PickupTask::new(TARGET, TargetKind::Item, fx.clock.now());

        assert_eq!(
            fx.protocol.step(&mut task, &world, fx.clock.now()),
            StepResult::RoundFailed {
                round: 1,
                error: BridgeError::Unavailable
            }
        );
        assert_eq!(task.rounds(), 1);
    }
}
