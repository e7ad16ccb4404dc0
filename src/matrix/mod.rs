/// Button matrix scanning.
///
/// Columns are driven active-high one at a time and the three row lines are
/// sampled after a short settle delay.
use crate::grid::{Cell, CellGrid, Column, Row};
use crate::time::Clock;

pub mod latch;

pub use latch::EdgeLatch;

/// Raw pressed/released snapshot of one matrix frame.
pub type RawButtonState = CellGrid<bool>;

/// GPIO lines of the matrix.
pub trait MatrixIo {
    fn set_column(&mut self, column: Column, active: bool);
    fn read_row(&mut self, row: Row) -> bool;
}

pub struct MatrixScanner {
    settle_ms: u64,
}

impl MatrixScanner {
    pub fn new(settle_ms: u64) -> Self {
        Self { settle_ms }
    }

    pub fn settle_ms(&self) -> u64 {
        self.settle_ms
    }

    /// Scan every column and return a fresh snapshot.
    pub fn scan<M: MatrixIo, C: Clock>(&self, io: &mut M, clock: &mut C) -> RawButtonState {
        let mut state = RawButtonState::default();

        for column in Column::ALL {
            for other in Column::ALL {
                io.set_column(other, other == column);
            }
            clock.sleep_ms(self.settle_ms);

            for row in Row::ALL {
                state.set(Cell::new(column, row), io.read_row(row));
            }
        }

        // Leave nothing driven so the next scan starts clean.
        for column in Column::ALL {
            io.set_column(column, false);
        }

        state
    }
}

impl Default for MatrixScanner {
    fn default() -> Self {
        Self::new(1)
    }
}
