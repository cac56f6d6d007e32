//! Occupancy grid rebuilt from inventory contents.

use crate::state::InventoryItem;

/// Top-left slot coordinate in the inventory grid.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct SlotPosition {
    pub row: u32,
    pub col: u32,
}

impl SlotPosition {
    pub const ORIGIN: Self = Self { row: 0, col: 0 };

    pub const fn new(row: u32, col: u32) -> Self {
        Self { row, col }
    }
}

/// Row-major occupancy matrix; `0` is empty, any other value is the
/// occupancy id of the item covering the cell.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct SlotGrid {
    rows: u32,
    cols: u32,
    cells: Vec<u32>,
}

impl SlotGrid {
    pub fn empty(rows: u32, cols: u32) -> Self {
        Self {
            rows,
            cols,
            cells: vec![0; (rows as usize) * (cols as usize)],
        }
    }

    /// Builds a grid from placed items. Item `i` gets occupancy id `i + 1`.
    ///
    /// Placements reaching past the grid edge are clamped to it; an item whose
    /// origin lies outside the grid occupies nothing.
    pub fn from_items(rows: u32, cols: u32, items: &[InventoryItem]) -> Self {
        let mut grid = Self::empty(rows, cols);

        for (index, item) in items.iter().enumerate() {
            let id = index as u32 + 1;
            let row_end = item.row.saturating_add(item.height.max(1)).min(rows);
            let col_end = item.col.saturating_add(item.width.max(1)).min(cols);

            if item.row >= rows || item.col >= cols {
                tracing::debug!(
                    target: "pickup::inventory",
                    row = item.row,
                    col = item.col,
                    "inventory item placed outside the grid, ignoring"
                );
                continue;
            }

            for row in item.row..row_end {
                for col in item.col..col_end {
                    let cell = grid.index(row, col);
                    grid.cells[cell] = id;
                }
            }
        }

        grid
    }

    pub fn rows(&self) -> u32 {
        self.rows
    }

    pub fn cols(&self) -> u32 {
        self.cols
    }

    /// Occupancy id at a cell; out-of-range cells read as `None`.
    pub fn get(&self, row: u32, col: u32) -> Option<u32> {
        if row < self.rows && col < self.cols {
            Some(self.cells[self.index(row, col)])
        } else {
            None
        }
    }

    pub fn is_free(&self, row: u32, col: u32) -> bool {
        self.get(row, col) == Some(0)
    }

    pub fn free_cells(&self) -> usize {
        self.cells.iter().filter(|&&cell| cell == 0).count()
    }

    /// First top-left coordinate, in row-major order, whose `height`×`width`
    /// block is entirely empty.
    pub fn find_free_block(&self, height: u32, width: u32) -> Option<SlotPosition> {
        let height = height.max(1);
        let width = width.max(1);
        if height > self.rows || width > self.cols {
            return None;
        }

        for row in 0..=(self.rows - height) {
            for col in 0..=(self.cols - width) {
                if self.block_is_free(row, col, height, width) {
                    return Some(SlotPosition::new(row, col));
                }
            }
        }

        None
    }

    // Bails out at the first occupied cell.
    fn block_is_free(&self, row: u32, col: u32, height: u32, width: u32) -> bool {
        for r in row..row + height {
            for c in col..col + width {
                if self.cells[self.index(r, c)] != 0 {
                    return false;
                }
            }
        }
        true
    }

    fn index(&self, row: u32, col: u32) -> usize {
        (row as usize) * (self.cols as usize) + col as usize
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn every_covered_cell_carries_the_same_id() {
        let items = vec![
            InventoryItem::new("a", 0, 0, 2, 3),
            InventoryItem::new("b", 1, 4, 1, 1),
        ];
        let grid = SlotGrid::from_items(5, 12, &items);

        for row in 0..3 {
            for col in 0..2 {
                assert_eq!(grid.get(row, col), Some(1));
            }
        }
        assert_eq!(grid.get(1, 4), Some(2));
        assert_eq!(grid.get(3, 0), Some(0));
        assert_eq!(grid.free_cells(), 60 - 6 - 1);
    }

    #[test]
    fn oversized_placements_are_clamped() {
        let items = vec![
            InventoryItem::new("edge", 4, 11, 2, 4),
            InventoryItem::new("outside", 9, 20, 1, 1),
        ];
        let grid = SlotGrid::from_items(5, 12, &items);

        assert_eq!(grid.get(4, 11), Some(1));
        assert_eq!(grid.get(5, 11), None);
        assert_eq!(grid.free_cells(), 59);
    }

    #[test]
    fn free_block_scan_is_row_major() {
        let items = vec![InventoryItem::new("blocker", 0, 0, 1, 1)];
        let grid = SlotGrid::from_items(5, 12, &items);

        assert_eq!(grid.find_free_block(1, 1), Some(SlotPosition::new(0, 1)));
        assert_eq!(grid.find_free_block(5, 1), Some(SlotPosition::new(0, 1)));
        assert_eq!(grid.find_free_block(5, 12), None);
    }
}
