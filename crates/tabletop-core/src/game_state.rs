use serde::{Deserialize, Serialize};

use crate::board::{Board, Coord};
use crate::game_trait::RuleEngine;
use crate::player::Side;

/// One applied action, carrying enough detail to invert it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum HistoryEntry {
    /// A stone placed on an empty cell, plus any opposing stones it removed.
    Place {
        at: Coord,
        side: Side,
        captured: Vec<Coord>,
    },
    /// A turn given up without touching the board.
    Pass { side: Side },
    /// A piece moved from one square to another, possibly taking a piece.
    Shift {
        from: Coord,
        to: Coord,
        piece: u8,
        captured_piece: u8,
        side: Side,
    },
}

impl HistoryEntry {
    pub fn side(&self) -> Side {
        match self {
            Self::Place { side, .. } | Self::Pass { side } | Self::Shift { side, .. } => *side,
        }
    }

    pub fn is_pass(&self) -> bool {
        matches!(self, Self::Pass { .. })
    }

    /// The highlight a client should draw for this entry, if any.
    pub fn last_move(&self) -> Option<LastMove> {
        match self {
            Self::Place { at, .. } => Some(LastMove::at(*at)),
            Self::Pass { .. } => None,
            Self::Shift { from, to, .. } => Some(LastMove::shift(*from, *to)),
        }
    }
}

/// Most recent move highlight. `from_*` is only present for piece moves.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct LastMove {
    pub row: usize,
    pub col: usize,
    pub from_row: Option<usize>,
    pub from_col: Option<usize>,
}

impl LastMove {
    pub fn at(at: Coord) -> Self {
        Self {
            row: at.row,
            col: at.col,
            from_row: None,
            from_col: None,
        }
    }

    pub fn shift(from: Coord, to: Coord) -> Self {
        Self {
            row: to.row,
            col: to.col,
            from_row: Some(from.row),
            from_col: Some(from.col),
        }
    }
}

/// Stones removed by each side (Go only; stays zero elsewhere).
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Captures {
    pub first: u32,
    pub second: u32,
}

impl Captures {
    pub fn get(&self, side: Side) -> u32 {
        match side {
            Side::First => self.first,
            Side::Second => self.second,
        }
    }

    pub fn add(&mut self, side: Side, n: u32) {
        match side {
            Side::First => self.first += n,
            Side::Second => self.second += n,
        }
    }

    pub fn remove(&mut self, side: Side, n: u32) {
        match side {
            Side::First => self.first = self.first.saturating_sub(n),
            Side::Second => self.second = self.second.saturating_sub(n),
        }
    }
}

/// The part of a room that rule engines read and write.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GameState {
    pub board: Board,
    pub history: Vec<HistoryEntry>,
    pub last_move: Option<LastMove>,
    pub turn: Side,
    pub captures: Captures,
    /// Board as it stood before the most recent placement, for the Go
    /// immediate-repetition check.
    pub ko_snapshot: Option<Board>,
}

impl GameState {
    pub fn new(board: Board) -> Self {
        Self {
            board,
            history: Vec::new(),
            last_move: None,
            turn: Side::First,
            captures: Captures::default(),
            ko_snapshot: None,
        }
    }

    /// Record an applied action and hand the turn to the other side.
    /// Passes keep the previous highlight.
    pub fn commit(&mut self, entry: HistoryEntry) {
        if let Some(last) = entry.last_move() {
            self.last_move = Some(last);
        }
        self.turn = entry.side().opponent();
        self.history.push(entry);
    }

    pub fn is_started(&self) -> bool {
        !self.history.is_empty()
    }

    /// Highlight derived from the current history tail.
    pub fn tail_last_move(&self) -> Option<LastMove> {
        self.history.last().and_then(HistoryEntry::last_move)
    }

    /// Pop and invert up to `count` trailing entries. The turn returns to
    /// the side that made the last popped entry, the highlight is recomputed
    /// from the new tail, and the repetition snapshot is dropped. Returns
    /// how many entries were reverted.
    pub fn rewind(&mut self, engine: &dyn RuleEngine, count: usize) -> usize {
        let mut reverted = 0;
        while reverted < count {
            let Some(entry) = self.history.pop() else {
                break;
            };
            engine.invert(self, &entry);
            self.turn = entry.side();
            reverted += 1;
        }
        self.last_move = self.tail_last_move();
        self.ko_snapshot = None;
        reverted
    }
}
