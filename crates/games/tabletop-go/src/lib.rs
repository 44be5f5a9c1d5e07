pub mod group;

use tabletop_core::board::{Board, Coord, EMPTY};
use tabletop_core::game_mode::GameMode;
use tabletop_core::game_state::{Captures, GameState, HistoryEntry};
use tabletop_core::game_trait::{Action, MoveError, Outcome, RuleEngine, Score};
use tabletop_core::player::Side;

use group::{captured_by, group_at, has_liberty};

/// Compensation added to the second side's tally.
pub const KOMI: f64 = 6.5;

/// Capture-count scoring used when both sides pass in succession. The
/// second side wins exact ties.
pub fn score(captures: Captures) -> (Side, Score) {
    let score = Score {
        first: f64::from(captures.first),
        second: f64::from(captures.second) + KOMI,
    };
    let winner = if score.first > score.second {
        Side::First
    } else {
        Side::Second
    };
    (winner, score)
}

/// Go with captures, suicide prohibition and a one-move ko check.
#[derive(Debug, Default)]
pub struct Go;

impl Go {
    pub fn new() -> Self {
        Self
    }

    fn place(
        &self,
        state: &mut GameState,
        side: Side,
        at: Coord,
    ) -> Result<Option<Outcome>, MoveError> {
        match state.board.get(at) {
            None => return Err(MoveError::OutOfBounds),
            Some(EMPTY) => {},
            Some(_) => return Err(MoveError::Occupied),
        }

        let mut next = state.board.clone();
        next.set(at, side.stone());
        let captured = captured_by(&next, at);
        if captured.is_empty() && !has_liberty(&next, &group_at(&next, at)) {
            return Err(MoveError::Suicide);
        }
        for c in &captured {
            next.set(*c, EMPTY);
        }
        if state.ko_snapshot.as_ref() == Some(&next) {
            return Err(MoveError::Ko);
        }

        state.ko_snapshot = Some(std::mem::replace(&mut state.board, next));
        state.captures.add(side, captured.len() as u32);
        state.commit(HistoryEntry::Place { at, side, captured });
        Ok(None)
    }

    fn pass(&self, state: &mut GameState, side: Side) -> Option<Outcome> {
        let previous_was_pass = state.history.last().is_some_and(HistoryEntry::is_pass);
        state.commit(HistoryEntry::Pass { side });
        if !previous_was_pass {
            return None;
        }
        let (winner, score) = score(state.captures);
        Some(Outcome::Scored { winner, score })
    }
}

impl RuleEngine for Go {
    fn mode(&self) -> GameMode {
        GameMode::Go
    }

    fn new_board(&self, size: usize) -> Board {
        Board::square(size)
    }

    fn apply(
        &self,
        state: &mut GameState,
        side: Side,
        action: &Action,
    ) -> Result<Option<Outcome>, MoveError> {
        match *action {
            Action::Place { at } => self.place(state, side, at),
            Action::Pass => Ok(self.pass(state, side)),
            Action::Shift { .. } => Err(MoveError::Unsupported),
        }
    }

    fn invert(&self, state: &mut GameState, entry: &HistoryEntry) {
        if let HistoryEntry::Place { at, side, captured } = entry {
            state.board.set(*at, EMPTY);
            let restored = side.opponent().stone();
            for c in captured {
                state.board.set(*c, restored);
            }
            state.captures.remove(*side, captured.len() as u32);
        }
    }

    fn tracks_captures(&self) -> bool {
        true
    }
}
