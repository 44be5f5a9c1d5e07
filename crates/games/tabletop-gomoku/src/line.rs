use tabletop_core::board::{Board, Coord};

/// Stones in a row needed to win.
pub const WIN_LENGTH: usize = 5;

const DIRECTIONS: [(isize, isize); 4] = [(0, 1), (1, 0), (1, 1), (1, -1)];

/// Look for a run of at least [`WIN_LENGTH`] `stone` cells through `at`.
///
/// Each of the four line directions is scanned outward from `at` both ways;
/// the first direction reaching the target returns every contiguous
/// coordinate in it, starting with `at`.
pub fn find_winning_line(board: &Board, at: Coord, stone: u8) -> Option<Vec<Coord>> {
    if board.get(at) != Some(stone) {
        return None;
    }
    for (dr, dc) in DIRECTIONS {
        let mut line = vec![at];
        line.extend(run(board, at, dr, dc, stone));
        line.extend(run(board, at, -dr, -dc, stone));
        if line.len() >= WIN_LENGTH {
            return Some(line);
        }
    }
    None
}

/// Contiguous `stone` cells stepping from `at` (exclusive) by `(dr, dc)`.
fn run(board: &Board, at: Coord, dr: isize, dc: isize, stone: u8) -> Vec<Coord> {
    let mut cells = Vec::new();
    let mut cur = at;
    while let Some(next) = cur.offset(dr, dc)
        && board.get(next) == Some(stone)
    {
        cells.push(next);
        cur = next;
    }
    cells
}
