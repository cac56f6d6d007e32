//! Event types for different topics.

use serde::Serialize;

use pickup_core::{EntityId, TargetKind};

use crate::filter::ReloadReport;
use crate::interaction::TaskOutcome;

/// Events emitted by the tick loop while pursuing targets.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub enum PickupEvent {
    /// A new pickup task started.
    TargetSelected {
        id: EntityId,
        name: String,
        kind: TargetKind,
        distance: f32,
    },

    /// The running task was dropped in favour of a different target.
    Superseded { previous: EntityId, next: EntityId },

    /// One click or targeted action was delivered.
    RoundIssued { id: EntityId, round: u32 },

    /// The input bridge rejected a round; the round still counts.
    RoundFailed {
        id: EntityId,
        round: u32,
        error: String,
    },

    Finished {
        id: EntityId,
        outcome: TaskOutcome,
        rounds: u32,
    },

    /// The agent moved to a different area.
    AreaChanged { area_id: u64 },
}

/// Events related to rule reloads and edits.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub enum FilterEvent {
    Reloaded(ReloadReport),

    ReloadFailed { error: String },
}
