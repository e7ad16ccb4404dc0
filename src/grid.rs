/// Grid coordinates and fixed-size per-cell storage.
///
/// Every grid in the crate is indexed `[column][row]`. The LED strip and the
/// note tables flatten a cell to `column * ROWS + row`.

pub const COLUMNS: usize = 4;
pub const ROWS: usize = 3;
pub const CELLS: usize = COLUMNS * ROWS;
pub const LAYERS: usize = 3;

/// The sequencer has one step per matrix column.
pub const STEP_COUNT: usize = COLUMNS;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum Layer {
    #[default]
    Conga,
    DrumKit,
    Melody,
}

impl Layer {
    pub const ALL: [Layer; LAYERS] = [Layer::Conga, Layer::DrumKit, Layer::Melody];

    /// Layers whose toggle state drives the step sequencer.
    pub const SEQUENCER: [Layer; 2] = [Layer::Conga, Layer::DrumKit];

    pub fn index(self) -> usize {
        self as usize
    }

    pub fn next(self) -> Layer {
        Layer::ALL[(self.index() + 1) % LAYERS]
    }

    pub fn is_sequencer(self) -> bool {
        !matches!(self, Layer::Melody)
    }

    pub fn name(self) -> &'static str {
        match self {
            Layer::Conga => "CONGA",
            Layer::DrumKit => "DRUMKIT",
            Layer::Melody => "MELODY",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Column {
    C0,
    C1,
    C2,
    C3,
}

impl Column {
    pub const ALL: [Column; COLUMNS] = [Column::C0, Column::C1, Column::C2, Column::C3];

    pub fn index(self) -> usize {
        self as usize
    }

    /// Next column, wrapping. Used as the sequencer step.
    pub fn next(self) -> Column {
        Column::ALL[(self.index() + 1) % COLUMNS]
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Row {
    R0,
    R1,
    R2,
}

impl Row {
    pub const ALL: [Row; ROWS] = [Row::R0, Row::R1, Row::R2];

    pub fn index(self) -> usize {
        self as usize
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Cell {
    pub column: Column,
    pub row: Row,
}

impl Cell {
    pub fn new(column: Column, row: Row) -> Self {
        Self { column, row }
    }

    /// Flat index shared by the LED buffer and the melody note table.
    pub fn index(self) -> usize {
        self.column.index() * ROWS + self.row.index()
    }

    /// All 12 cells, column-major.
    pub fn all() -> impl Iterator<Item = Cell> {
        Column::ALL
            .into_iter()
            .flat_map(|column| Row::ALL.into_iter().map(move |row| Cell::new(column, row)))
    }
}

/// A value per matrix cell.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CellGrid<T> {
    cells: [[T; ROWS]; COLUMNS],
}

impl<T: Copy + Default> Default for CellGrid<T> {
    fn default() -> Self {
        Self {
            cells: [[T::default(); ROWS]; COLUMNS],
        }
    }
}

impl<T: Copy> CellGrid<T> {
    pub fn filled(value: T) -> Self {
        Self {
            cells: [[value; ROWS]; COLUMNS],
        }
    }

    pub fn get(&self, cell: Cell) -> T {
        self.cells[cell.column.index()][cell.row.index()]
    }

    pub fn set(&mut self, cell: Cell, value: T) {
        self.cells[cell.column.index()][cell.row.index()] = value;
    }

    pub fn fill(&mut self, value: T) {
        for column in &mut self.cells {
            for cell in column {
                *cell = value;
            }
        }
    }
}

impl CellGrid<bool> {
    pub fn toggle(&mut self, cell: Cell) {
        let current = self.get(cell);
        self.set(cell, !current);
    }

    pub fn clear(&mut self) {
        self.fill(false);
    }

    pub fn count(&self) -> usize {
        Cell::all().filter(|&cell| self.get(cell)).count()
    }
}
