mod candidate;
mod common;
mod item;
mod world;

pub use candidate::{Candidate, CandidateFlags};
pub use common::{EntityId, ScreenPoint, ScreenRect, Tick, WorldPosition};
pub use item::{ContainerDetails, ItemDetails, ItemFootprint, Rarity, TargetKind};
pub use world::{
    AgentState, GroundLabel, InteractiveKind, InteractiveObject, InventoryItem,
    InventorySnapshot, LabelInfo, TargetDetails, WorldSnapshot,
};
