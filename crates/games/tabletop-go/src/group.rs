use std::collections::HashSet;

use tabletop_core::board::{Board, Coord, EMPTY};

/// Every stone orthogonally connected to `at` with the same colour.
/// Empty when `at` is empty or off the board.
pub fn group_at(board: &Board, at: Coord) -> Vec<Coord> {
    let Some(stone) = board.get(at).filter(|&s| s != EMPTY) else {
        return Vec::new();
    };
    let mut seen = HashSet::from([at]);
    let mut stack = vec![at];
    let mut group = Vec::new();
    while let Some(cur) = stack.pop() {
        group.push(cur);
        for n in board.neighbors(cur) {
            if board.get(n) == Some(stone) && seen.insert(n) {
                stack.push(n);
            }
        }
    }
    group
}

/// Whether any stone of `group` touches an empty point.
pub fn has_liberty(board: &Board, group: &[Coord]) -> bool {
    group
        .iter()
        .any(|&c| board.neighbors(c).any(|n| board.get(n) == Some(EMPTY)))
}

/// Opposing stones that lose their last liberty once `at` is occupied.
/// `board` must already hold the new stone.
pub fn captured_by(board: &Board, at: Coord) -> Vec<Coord> {
    let Some(stone) = board.get(at).filter(|&s| s != EMPTY) else {
        return Vec::new();
    };
    let mut captured = Vec::new();
    let mut seen = HashSet::new();
    for n in board.neighbors(at) {
        match board.get(n) {
            Some(s) if s != EMPTY && s != stone && !seen.contains(&n) => {},
            _ => continue,
        }
        let group = group_at(board, n);
        seen.extend(group.iter().copied());
        if !has_liberty(board, &group) {
            captured.extend(group);
        }
    }
    captured
}
