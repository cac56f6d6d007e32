use std::time::Instant;

use bitflags::bitflags;

use super::common::{EntityId, ScreenRect, WorldPosition};
use super::item::{ItemDetails, TargetKind};
use super::world::{GroundLabel, LabelInfo, TargetDetails};

bitflags! {
    /// Per-candidate markers that survive candidate recomputation.
    #[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Default)]
    #[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
    pub struct CandidateFlags: u8 {
        /// High-value target; may bypass the attempt limit.
        const PRIORITY = 1 << 0;
        /// Attempt counter reached the configured maximum.
        const MAX_ATTEMPTS_REACHED = 1 << 1;
    }
}

/// A pickup target discovered in the current snapshot.
///
/// Built fresh on every candidate recompute. The bookkeeping fields
/// (`attempts`, `first_seen`, `last_attempt`, `flags`) are stamped back on by
/// [`crate::AttemptTracker::observe`]; nothing carries them over implicitly.
#[derive(Clone, Debug, PartialEq)]
pub struct Candidate {
    pub id: EntityId,
    pub position: WorldPosition,
    pub distance: f32,
    pub label: LabelInfo,
    pub details: TargetDetails,

    pub attempts: u32,
    pub first_seen: Option<Instant>,
    pub last_attempt: Option<Instant>,
    pub flags: CandidateFlags,
}

impl Candidate {
    pub fn from_label(label: &GroundLabel) -> Self {
        Self {
            id: label.id,
            position: label.position,
            distance: label.distance,
            label: label.label,
            details: label.details.clone(),
            attempts: 0,
            first_seen: None,
            last_attempt: None,
            flags: CandidateFlags::empty(),
        }
    }

    pub fn kind(&self) -> TargetKind {
        self.details.kind()
    }

    pub fn name(&self) -> &str {
        self.details.name()
    }

    pub fn path(&self) -> &str {
        self.details.path()
    }

    pub fn item(&self) -> Option<&ItemDetails> {
        self.details.as_item()
    }

    pub fn rect(&self) -> ScreenRect {
        self.label.rect
    }

    pub fn is_priority(&self) -> bool {
        self.flags.contains(CandidateFlags::PRIORITY)
    }

    pub fn max_attempts_reached(&self) -> bool {
        self.flags.contains(CandidateFlags::MAX_ATTEMPTS_REACHED)
    }
}
