//! Resumable per-target interaction state.

use std::time::{Duration, Instant};

use serde::Serialize;
use strum::Display;

use pickup_core::{EntityId, ScreenPoint, TargetKind};

use crate::api::BridgeError;

/// How a finished task ended.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Display, Serialize)]
pub enum TaskOutcome {
    /// The target's label is gone or unclickable: picked up, or no longer relevant.
    Collected,
    /// Every round was spent without the label disappearing.
    Exhausted,
}

impl TaskOutcome {
    pub fn is_success(self) -> bool {
        matches!(self, TaskOutcome::Collected)
    }
}

/// Why a step did not issue a round.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Display, Serialize)]
pub enum DeferReason {
    /// The agent is moving and the target is not close enough to ignore it.
    Moving,
    /// A nearby portal holds the targeting focus; the pointer was re-aimed.
    PortalFocus,
    /// The previous click was too recent.
    Pacing,
    /// Waiting for the pointer to settle before clicking.
    Settling,
}

#[derive(Clone, Debug, PartialEq)]
pub enum StepResult {
    Deferred(DeferReason),
    RoundIssued { round: u32 },
    RoundFailed { round: u32, error: BridgeError },
    Finished(TaskOutcome),
}

#[derive(Clone, Copy, Debug, PartialEq)]
pub(crate) enum TaskPhase {
    Ready,
    /// Pointer moved to `at`; click once the settle delay has passed.
    Settling { since: Instant, at: ScreenPoint },
    Finished(TaskOutcome),
}

/// One pickup in progress.
///
/// Owned by the orchestrator and stepped once per tick. Superseding a task
/// is simply replacing it; nothing else needs to be cancelled.
#[derive(Clone, Debug)]
pub struct PickupTask {
    target: EntityId,
    kind: TargetKind,
    rounds: u32,
    pub(crate) phase: TaskPhase,
    last_click: Option<Instant>,
    started_at: Instant,
}

impl PickupTask {
    pub fn new(target: EntityId, kind: TargetKind, now: Instant) -> Self {
        Self {
            target,
            kind,
            rounds: 0,
            phase: TaskPhase::Ready,
            last_click: None,
            started_at: now,
        }
    }

    pub fn target(&self) -> EntityId {
        self.target
    }

    pub fn kind(&self) -> TargetKind {
        self.kind
    }

    /// Rounds issued so far, failed ones included.
    pub fn rounds(&self) -> u32 {
        self.rounds
    }

    pub fn last_click(&self) -> Option<Instant> {
        self.last_click
    }

    pub fn started_at(&self) -> Instant {
        self.started_at
    }

    pub fn elapsed(&self, now: Instant) -> Duration {
        now.saturating_duration_since(self.started_at)
    }

    pub fn outcome(&self) -> Option<TaskOutcome> {
        match self.phase {
            TaskPhase::Finished(outcome) => Some(outcome),
            _ => None,
        }
    }

    pub fn is_finished(&self) -> bool {
        self.outcome().is_some()
    }

    pub(crate) fn finish(&mut self, outcome: TaskOutcome) -> StepResult {
        self.phase = TaskPhase::Finished(outcome);
        StepResult::Finished(outcome)
    }

    /// Counts one delivered (or rejected) interaction.
    pub(crate) fn complete_round(
        &mut self,
        now: Instant,
        result: Result<(), BridgeError>,
    ) -> StepResult {
        self.rounds += 1;
        self.last_click = Some(now);
        self.phase = TaskPhase::Ready;
        match result {
            Ok(()) => StepResult::RoundIssued { round: self.rounds },
            Err(error) => StepResult::RoundFailed {
                round: self.rounds,
                error,
            },
        }
    }
}
