use crate::error::ConfigurationError;
use std::ops::{Index, IndexMut};

/// A `(row, column)` pair, both zero-based.
pub(crate) type Coordinate = (usize, usize);

/// Per-cell state. A fresh cell is closed, unflagged, empty and not part of the pattern.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub(crate) struct Cell {
    pub(crate) mine: bool,
    pub(crate) open: bool,
    pub(crate) flagged: bool,
    // stamped by the decorative pattern: open from the start, never mined or flagged
    pub(crate) permanent: bool,
    // only meaningful when `mine` is false
    pub(crate) adjacent_mines: u8,
}

#[derive(Debug, Copy, Clone, PartialEq)]
enum Increment {
    One,
    NegOne,
    Zero,
}

impl Increment {
    fn offset(self, value: usize, bound: usize) -> Option<usize> {
        match self {
            Self::One => Some(value + 1).filter(|&offset| offset < bound),
            Self::NegOne => value.checked_sub(1),
            Self::Zero => Some(value),
        }
    }
}

/// The Moore neighbourhood of `(row, column)`, clipped to a `rows` by `columns` grid.
pub(crate) fn adjacent(
    (row, column): Coordinate,
    rows: usize,
    columns: usize,
) -> impl Iterator<Item = Coordinate> {
    const INCREMENTS: [Increment; 3] = [Increment::NegOne, Increment::Zero, Increment::One];

    INCREMENTS
        .iter()
        .copied()
        .flat_map(|row_incr| std::iter::repeat(row_incr).zip(INCREMENTS))
        .filter_map(move |(row_incr, column_incr)| match (row_incr, column_incr) {
            (Increment::Zero, Increment::Zero) => None,
            _ => Some((
                row_incr.offset(row, rows)?,
                column_incr.offset(column, columns)?,
            )),
        })
}

/// Row-major rectangular matrix of cells.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct Board {
    cells: Vec<Cell>,
    rows: usize,
    columns: usize,
}

impl Board {
    pub(crate) fn new(rows: usize, columns: usize) -> Result<Self, ConfigurationError> {
        if rows == 0 || columns == 0 {
            return Err(ConfigurationError::EmptyBoard { rows, columns });
        }

        Ok(Self {
            cells: vec![Cell::default(); rows * columns],
            rows,
            columns,
        })
    }

    pub(crate) fn rows(&self) -> usize {
        self.rows
    }

    pub(crate) fn columns(&self) -> usize {
        self.columns
    }

    pub(crate) fn len(&self) -> usize {
        self.cells.len()
    }

    pub(crate) fn contains(&self, (row, column): Coordinate) -> bool {
        row < self.rows && column < self.columns
    }

    /// Flat index of `coordinate`. Panics when the coordinate is off the board.
    pub(crate) fn index_of(&self, coordinate: Coordinate) -> usize {
        assert!(
            self.contains(coordinate),
            "coordinate {coordinate:?} is outside a {}x{} board",
            self.rows,
            self.columns
        );
        let (row, column) = coordinate;
        row * self.columns + column
    }

    pub(crate) fn coordinate(&self, index: usize) -> Coordinate {
        (index / self.columns, index % self.columns)
    }

    pub(crate) fn get(&self, coordinate: Coordinate) -> Option<&Cell> {
        if self.contains(coordinate) {
            self.cells.get(self.index_of(coordinate))
        } else {
            None
        }
    }

    pub(crate) fn neighbors(&self, coordinate: Coordinate) -> impl Iterator<Item = Coordinate> {
        adjacent(coordinate, self.rows, self.columns)
    }

    /// Every cell with its coordinate, in row-major order.
    pub(crate) fn iter(&self) -> impl Iterator<Item = (Coordinate, &Cell)> + '_ {
        let columns = self.columns;
        self.cells
            .iter()
            .enumerate()
            .map(move |(i, cell)| ((i / columns, i % columns), cell))
    }
}

impl Index<Coordinate> for Board {
    type Output = Cell;

    fn index(&self, coordinate: Coordinate) -> &Cell {
        &self.cells[self.index_of(coordinate)]
    }
}

impl IndexMut<Coordinate> for Board {
    fn index_mut(&mut self, coordinate: Coordinate) -> &mut Cell {
        let index = self.index_of(coordinate);
        &mut self.cells[index]
    }
}
