use serde::{Deserialize, Serialize};

/// A board intersection or square, addressed row-major from the top-left.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Coord {
    pub row: usize,
    pub col: usize,
}

impl Coord {
    pub const fn new(row: usize, col: usize) -> Self {
        Self { row, col }
    }

    /// Step by a signed offset, returning `None` when the result would be
    /// negative. Upper bounds are checked by the board.
    pub fn offset(self, dr: isize, dc: isize) -> Option<Self> {
        Some(Self {
            row: self.row.checked_add_signed(dr)?,
            col: self.col.checked_add_signed(dc)?,
        })
    }
}

/// Rectangular grid of cell codes. `0` is empty; the meaning of other values
/// belongs to the rule engine that owns the board.
///
/// Serializes as a plain array of rows so clients can index `board[r][c]`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Board {
    cells: Vec<Vec<u8>>,
}

pub const EMPTY: u8 = 0;

impl Board {
    pub fn new(rows: usize, cols: usize) -> Self {
        Self {
            cells: vec![vec![EMPTY; cols]; rows],
        }
    }

    pub fn square(size: usize) -> Self {
        Self::new(size, size)
    }

    pub fn from_rows(cells: Vec<Vec<u8>>) -> Self {
        Self { cells }
    }

    pub fn rows(&self) -> usize {
        self.cells.len()
    }

    pub fn cols(&self) -> usize {
        self.cells.first().map_or(0, Vec::len)
    }

    pub fn contains(&self, at: Coord) -> bool {
        at.row < self.rows() && at.col < self.cols()
    }

    pub fn get(&self, at: Coord) -> Option<u8> {
        self.cells.get(at.row)?.get(at.col).copied()
    }

    /// Write a cell. Out-of-range writes are ignored; callers validate
    /// coordinates with [`Board::get`] or [`Board::contains`] first.
    pub fn set(&mut self, at: Coord, value: u8) {
        if let Some(cell) = self.cells.get_mut(at.row).and_then(|r| r.get_mut(at.col)) {
            *cell = value;
        }
    }

    pub fn is_empty(&self) -> bool {
        self.cells.iter().all(|row| row.iter().all(|&c| c == EMPTY))
    }

    /// Orthogonal neighbours that fall inside the board.
    pub fn neighbors(&self, at: Coord) -> impl Iterator<Item = Coord> + '_ {
        const STEPS: [(isize, isize); 4] = [(0, 1), (0, -1), (1, 0), (-1, 0)];
        STEPS
            .into_iter()
            .filter_map(move |(dr, dc)| at.offset(dr, dc))
            .filter(|c| self.contains(*c))
    }

    /// Every coordinate on the board, row-major.
    pub fn coords(&self) -> impl Iterator<Item = Coord> + '_ {
        let cols = self.cols();
        (0..self.rows()).flat_map(move |row| (0..cols).map(move |col| Coord::new(row, col)))
    }

    pub fn as_rows(&self) -> &[Vec<u8>] {
        &self.cells
    }
}
