/// One-shot press detection per cell.
use crate::grid::{Cell, CellGrid};

use super::RawButtonState;

#[derive(Debug, Clone, Default)]
pub struct EdgeLatch {
    handled: CellGrid<bool>,
}

impl EdgeLatch {
    pub fn new() -> Self {
        Self::default()
    }

    /// True on the first tick a press is seen, false while it is held.
    /// The latch clears once the cell reads released.
    pub fn is_new_press(&mut self, cell: Cell, raw: &RawButtonState) -> bool {
        if !raw.get(cell) {
            self.handled.set(cell, false);
            return false;
        }
        if self.handled.get(cell) {
            return false;
        }
        self.handled.set(cell, true);
        true
    }

    pub fn is_latched(&self, cell: Cell) -> bool {
        self.handled.get(cell)
    }
}
