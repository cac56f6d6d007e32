//! Decides whether, and where, a candidate item fits in the inventory.

use std::sync::Arc;

use crate::cache::CachedValue;
use crate::clock::Clock;
use crate::config::InventoryConfig;
use crate::env::InventoryOracle;
use crate::state::{InventoryItem, ItemFootprint};

use super::grid::{SlotGrid, SlotPosition};

/// Where a candidate item would go.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Placement {
    /// Merges into an existing stack whose top-left slot is `at`.
    MergeStack { at: SlotPosition },
    /// Occupies an empty block whose top-left slot is `at`.
    FreeSpace { at: SlotPosition },
}

impl Placement {
    pub fn position(&self) -> SlotPosition {
        match self {
            Placement::MergeStack { at } | Placement::FreeSpace { at } => *at,
        }
    }
}

/// Inventory contents plus the occupancy grid derived from them.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct InventoryView {
    pub items: Vec<InventoryItem>,
    pub grid: SlotGrid,
    /// False when the live inventory was unreadable and the fallback grid is in use.
    pub is_live: bool,
}

impl InventoryView {
    pub fn fallback(config: &InventoryConfig) -> Self {
        Self {
            items: Vec::new(),
            grid: SlotGrid::empty(config.fallback_rows, config.fallback_cols),
            is_live: false,
        }
    }

    /// Stack short-circuit, then a row-major free-block scan.
    ///
    /// The stack search returns the first entry in iteration order that has
    /// enough spare capacity, not the fullest one.
    pub fn find_slot(&self, footprint: &ItemFootprint) -> Option<Placement> {
        if footprint.max_stack_size > 1 {
            let stack = self.items.iter().find(|item| {
                item.type_key == footprint.type_key
                    && item.max_stack_size > 1
                    && item.spare_capacity() >= footprint.stack_size
            });
            if let Some(stack) = stack {
                return Some(Placement::MergeStack {
                    at: SlotPosition::new(stack.row, stack.col),
                });
            }
        }

        self.grid
            .find_free_block(footprint.height, footprint.width)
            .map(|at| Placement::FreeSpace { at })
    }
}

impl Default for InventoryView {
    fn default() -> Self {
        Self::fallback(&InventoryConfig::default())
    }
}

/// Tick-cached inventory view with slot search.
pub struct InventoryAllocator {
    view: CachedValue<Arc<InventoryView>>,
}

impl InventoryAllocator {
    pub fn new(
        oracle: Arc<dyn InventoryOracle>,
        config: InventoryConfig,
        clock: Arc<dyn Clock>,
    ) -> Self {
        let view = CachedValue::per_tick(clock, move || Arc::new(read_view(&*oracle, &config)));
        Self { view }
    }

    /// Current view, rebuilt at most once per tick.
    pub fn view(&self) -> Arc<InventoryView> {
        self.view.get_value()
    }

    pub fn find_slot(&self, footprint: &ItemFootprint) -> Option<Placement> {
        self.view().find_slot(footprint)
    }

    pub fn can_fit(&self, footprint: &ItemFootprint) -> bool {
        self.find_slot(footprint).is_some()
    }

    /// Re-reads the live inventory and rebuilds the grid immediately.
    pub fn refresh(&self) -> Arc<InventoryView> {
        self.view.force_refresh();
        self.view.get_value()
    }
}

fn read_view(oracle: &dyn InventoryOracle, config: &InventoryConfig) -> InventoryView {
    match oracle.inventory() {
        Some(snapshot) if snapshot.rows > 0 && snapshot.cols > 0 => InventoryView {
            grid: SlotGrid::from_items(snapshot.rows, snapshot.cols, &snapshot.items),
            items: snapshot.items,
            is_live: true,
        },
        Some(_) | None => {
            tracing::debug!(
                target: "pickup::inventory",
                rows = config.fallback_rows,
                cols = config.fallback_cols,
                "inventory unavailable, using fallback grid"
            );
            InventoryView::fallback(config)
        }
    }
}
