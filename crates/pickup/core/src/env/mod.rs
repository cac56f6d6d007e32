//! Traits describing the live world the host exposes.
//!
//! Oracles are the read side of the host integration: the world snapshot
//! (labels, agent, interactive objects) and the inventory contents. Both may
//! be temporarily unavailable (loading screens, closed panels), so each
//! returns `Option` and callers fall back to safe defaults.
use std::sync::Arc;

use crate::state::{InventorySnapshot, WorldSnapshot};

/// Source of the per-tick world snapshot.
pub trait WorldOracle: Send + Sync {
    /// Current snapshot, or `None` when the world cannot be read right now.
    fn snapshot(&self) -> Option<WorldSnapshot>;
}

/// Source of the agent's inventory contents.
pub trait InventoryOracle: Send + Sync {
    /// Current inventory, or `None` when it cannot be read right now.
    fn inventory(&self) -> Option<InventorySnapshot>;
}

impl<T: WorldOracle + ?Sized> WorldOracle for Arc<T> {
    fn snapshot(&self) -> Option<WorldSnapshot> {
        (**self).snapshot()
    }
}

impl<T: InventoryOracle + ?Sized> InventoryOracle for Arc<T> {
    fn inventory(&self) -> Option<InventorySnapshot> {
        (**self).inventory()
    }
}
