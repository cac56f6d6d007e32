//! Per-tick world data model.
//!
//! Snapshots ([`WorldSnapshot`], [`InventorySnapshot`]) describe what the host
//! reported this tick; [`Candidate`] is the derived, filterable view of a
//! pickup target. Nothing here holds references into the host; every value is
//! owned and cheap to clone.
pub mod types;

pub use types::{
    AgentState, Candidate, CandidateFlags, ContainerDetails, EntityId, GroundLabel,
    InteractiveKind, InteractiveObject, InventoryItem, InventorySnapshot, ItemDetails,
    ItemFootprint, LabelInfo, Rarity, ScreenPoint, ScreenRect, TargetDetails, TargetKind, Tick,
    WorldPosition, WorldSnapshot,
};
