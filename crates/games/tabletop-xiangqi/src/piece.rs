use tabletop_core::board::{Board, Coord, EMPTY};
use tabletop_core::player::Side;

pub const ROWS: usize = 10;
pub const COLS: usize = 9;

/// Added to a red piece code to get the matching black one.
const BLACK_OFFSET: u8 = 7;

/// Piece types in cell-code order: red codes are `1..=7`, black `8..=14`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum PieceKind {
    General = 1,
    Advisor = 2,
    Elephant = 3,
    Horse = 4,
    Chariot = 5,
    Cannon = 6,
    Soldier = 7,
}

impl PieceKind {
    fn from_base(base: u8) -> Option<Self> {
        match base {
            1 => Some(Self::General),
            2 => Some(Self::Advisor),
            3 => Some(Self::Elephant),
            4 => Some(Self::Horse),
            5 => Some(Self::Chariot),
            6 => Some(Self::Cannon),
            7 => Some(Self::Soldier),
            _ => None,
        }
    }
}

/// Cell code for a piece. Red plays first and sits at the bottom.
pub fn code(side: Side, kind: PieceKind) -> u8 {
    match side {
        Side::First => kind as u8,
        Side::Second => kind as u8 + BLACK_OFFSET,
    }
}

/// Owner of a cell code, or `None` for empty and unknown codes.
pub fn owner(piece: u8) -> Option<Side> {
    match piece {
        1..=7 => Some(Side::First),
        8..=14 => Some(Side::Second),
        _ => None,
    }
}

pub fn kind(piece: u8) -> Option<PieceKind> {
    match owner(piece)? {
        Side::First => PieceKind::from_base(piece),
        Side::Second => PieceKind::from_base(piece - BLACK_OFFSET),
    }
}

/// Standard opening position.
pub fn initial_board() -> Board {
    use PieceKind::*;

    let back = [
        Chariot, Horse, Elephant, Advisor, General, Advisor, Elephant, Horse, Chariot,
    ];
    let mut board = Board::new(ROWS, COLS);
    for (side, back_row, cannon_row, soldier_row) in
        [(Side::First, 9, 7, 6), (Side::Second, 0, 2, 3)]
    {
        for (col, k) in back.iter().enumerate() {
            board.set(Coord::new(back_row, col), code(side, *k));
        }
        board.set(Coord::new(cannon_row, 1), code(side, Cannon));
        board.set(Coord::new(cannon_row, 7), code(side, Cannon));
        for col in (0..COLS).step_by(2) {
            board.set(Coord::new(soldier_row, col), code(side, Soldier));
        }
    }
    board
}

/// Square holding `side`'s general, if it is still on the board.
pub fn find_general(board: &Board, side: Side) -> Option<Coord> {
    let general = code(side, PieceKind::General);
    board.coords().find(|c| board.get(*c) == Some(general))
}

/// Whether `at` holds a piece belonging to `side`.
pub fn is_own(board: &Board, at: Coord, side: Side) -> bool {
    board
        .get(at)
        .filter(|&p| p != EMPTY)
        .and_then(owner)
        .is_some_and(|s| s == side)
}
