//! Picks one target out of the eligible candidates.

use pickup_core::{Candidate, TargetKind};

/// Nearest-first selection with the container preference rule.
///
/// A container within `prefer_radius` wins outright. Otherwise the nearest
/// container only wins when it is at least as close as the nearest item.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct TargetSelector {
    prefer_radius: f32,
}

impl TargetSelector {
    pub const DEFAULT_PREFER_RADIUS: f32 = 20.0;

    pub fn new(prefer_radius: f32) -> Self {
        Self { prefer_radius }
    }

    pub fn prefer_radius(&self) -> f32 {
        self.prefer_radius
    }

    /// `eligible` may be in any order; ties keep the earlier entry.
    pub fn select<'a>(&self, eligible: &'a [Candidate]) -> Option<&'a Candidate> {
        let item = nearest(eligible, TargetKind::Item);
        let container = nearest(eligible, TargetKind::Container);

        match (item, container) {
            (_, Some(container)) if container.distance <= self.prefer_radius => Some(container),
            (Some(item), Some(container)) => {
                if container.distance <= item.distance {
                    Some(container)
                } else {
                    Some(item)
                }
            }
            (Some(item), None) => Some(item),
            (None, container) => container,
        }
    }
}

impl Default for TargetSelector {
    fn default() -> Self {
        Self::new(Self::DEFAULT_PREFER_RADIUS)
    }
}

fn nearest(candidates: &[Candidate], kind: TargetKind) -> Option<&Candidate> {
    candidates
        .iter()
        .filter(|candidate| candidate.kind() == kind)
        .fold(None, |best: Option<&Candidate>, candidate| match best {
            Some(best) if best.distance <= candidate.distance => Some(best),
            _ => Some(candidate),
        })
}
