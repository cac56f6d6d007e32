//! Pure decision logic and data types for the proximity pickup loop.
//!
//! `pickup-core` holds everything that can be decided without I/O: the
//! recompute-on-demand [`cache`], the [`inventory`] bin-packing allocator, the
//! [`liveness`] and attempt-limiting state machine, and the canonical per-tick
//! data model in [`state`]. Host integrations plug in through the oracle
//! traits in [`env`]; the async runtime crate composes all of it into a tick
//! loop.
pub mod cache;
pub mod clock;
pub mod config;
pub mod env;
pub mod inventory;
pub mod liveness;
pub mod state;

#[cfg(feature = "serde")]
pub mod serde_duration;

pub use cache::{CachePolicy, CachedValue};
pub use clock::{Clock, ManualClock, SystemClock};
pub use config::{AttemptPolicy, InventoryConfig, LivenessConfig};
pub use env::{InventoryOracle, WorldOracle};
pub use inventory::{InventoryAllocator, InventoryView, Placement, SlotGrid, SlotPosition};
pub use liveness::{
    AttemptRecord, AttemptTracker, DeathAwareness, LivenessEvent, LivenessMonitor, LivenessState,
    PickupStats, StatsSnapshot,
};
pub use state::{
    AgentState, Candidate, CandidateFlags, ContainerDetails, EntityId, GroundLabel,
    InteractiveKind, InteractiveObject, InventoryItem, InventorySnapshot, ItemDetails,
    ItemFootprint, LabelInfo, Rarity, ScreenPoint, ScreenRect, TargetDetails, TargetKind, Tick,
    WorldPosition, WorldSnapshot,
};
