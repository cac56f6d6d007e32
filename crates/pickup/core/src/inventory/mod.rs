//! Two-dimensional inventory bin-packing.
//!
//! [`SlotGrid`] is the occupancy matrix rebuilt from inventory contents;
//! [`InventoryAllocator`] caches it per tick and answers "does this item fit,
//! and where" with stack merging taking precedence over free space.
mod allocator;
mod grid;

pub use allocator::{InventoryAllocator, InventoryView, Placement};
pub use grid::{SlotGrid, SlotPosition};
