use tabletop_core::board::{Board, Coord, EMPTY};
use tabletop_core::player::Side;

use crate::piece::{PieceKind, find_general, is_own, kind, owner};

/// Rows on each side's half of the river.
fn own_half(side: Side, row: usize) -> bool {
    match side {
        Side::First => row >= 5,
        Side::Second => row <= 4,
    }
}

fn in_palace(side: Side, at: Coord) -> bool {
    let rows = match side {
        Side::First => 7..=9,
        Side::Second => 0..=2,
    };
    rows.contains(&at.row) && (3..=5).contains(&at.col)
}

/// Occupied squares strictly between two squares on one rank or file.
/// Callers must pass aligned squares.
pub fn count_between(board: &Board, from: Coord, to: Coord) -> usize {
    let occupied = |at: Coord| board.get(at).is_some_and(|p| p != EMPTY);
    if from.row == to.row {
        let (lo, hi) = (from.col.min(to.col), from.col.max(to.col));
        (lo + 1..hi)
            .filter(|&col| occupied(Coord::new(from.row, col)))
            .count()
    } else {
        let (lo, hi) = (from.row.min(to.row), from.row.max(to.row));
        (lo + 1..hi)
            .filter(|&row| occupied(Coord::new(row, from.col)))
            .count()
    }
}

/// Movement geometry for `piece` from `from` to `to`, including blocking.
/// Ownership of the target and self-check are checked elsewhere.
pub fn is_valid_move(board: &Board, piece: u8, from: Coord, to: Coord) -> bool {
    let (Some(side), Some(piece_kind)) = (owner(piece), kind(piece)) else {
        return false;
    };
    let dr = to.row as isize - from.row as isize;
    let dc = to.col as isize - from.col as isize;
    let (adr, adc) = (dr.abs(), dc.abs());
    let empty_at = |r: isize, c: isize| {
        from.offset(r, c)
            .and_then(|at| board.get(at))
            .is_some_and(|p| p == EMPTY)
    };

    match piece_kind {
        PieceKind::General => {
            if adr + adc == 1 {
                return in_palace(side, to);
            }
            // Flying general: facing the other general down a clear file.
            let facing = board
                .get(to)
                .and_then(kind)
                .is_some_and(|k| k == PieceKind::General);
            dc == 0 && facing && count_between(board, from, to) == 0
        },
        PieceKind::Advisor => adr == 1 && adc == 1 && in_palace(side, to),
        PieceKind::Elephant => {
            adr == 2 && adc == 2 && own_half(side, to.row) && empty_at(dr / 2, dc / 2)
        },
        PieceKind::Horse => match (adr, adc) {
            (2, 1) => empty_at(dr.signum(), 0),
            (1, 2) => empty_at(0, dc.signum()),
            _ => false,
        },
        PieceKind::Chariot => (dr == 0 || dc == 0) && count_between(board, from, to) == 0,
        PieceKind::Cannon => {
            if dr != 0 && dc != 0 {
                return false;
            }
            let screens = count_between(board, from, to);
            match board.get(to) {
                Some(EMPTY) => screens == 0,
                Some(_) => screens == 1,
                None => false,
            }
        },
        PieceKind::Soldier => {
            let forward = match side {
                Side::First => -1,
                Side::Second => 1,
            };
            let step_forward = dc == 0 && dr == forward;
            if own_half(side, from.row) {
                step_forward
            } else {
                step_forward || (adc == 1 && dr == 0)
            }
        },
    }
}

/// Whether any opposing piece could move onto `side`'s general.
/// A side whose general is missing is never in check.
pub fn in_check(board: &Board, side: Side) -> bool {
    let Some(general) = find_general(board, side) else {
        return false;
    };
    let attacker = side.opponent();
    board.coords().any(|from| {
        board
            .get(from)
            .filter(|&p| owner(p) == Some(attacker))
            .is_some_and(|p| is_valid_move(board, p, from, general))
    })
}

/// Copy of `board` with the piece on `from` moved to `to`.
pub fn after_move(board: &Board, from: Coord, to: Coord) -> Board {
    let mut next = board.clone();
    next.set(to, board.get(from).unwrap_or(EMPTY));
    next.set(from, EMPTY);
    next
}

/// Every move available to `side` that does not leave its own general
/// attacked.
pub fn legal_moves(board: &Board, side: Side) -> Vec<(Coord, Coord)> {
    let mut moves = Vec::new();
    for from in board.coords() {
        let Some(piece) = board.get(from).filter(|&p| owner(p) == Some(side)) else {
            continue;
        };
        for to in board.coords() {
            if to == from || is_own(board, to, side) {
                continue;
            }
            if is_valid_move(board, piece, from, to) && !in_check(&after_move(board, from, to), side)
            {
                moves.push((from, to));
            }
        }
    }
    moves
}

/// `side` is attacked and has no move that escapes.
pub fn is_checkmate(board: &Board, side: Side) -> bool {
    in_check(board, side) && legal_moves(board, side).is_empty()
}
