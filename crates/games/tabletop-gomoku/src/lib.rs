pub mod line;

use tabletop_core::board::{Board, EMPTY};
use tabletop_core::game_mode::GameMode;
use tabletop_core::game_state::{GameState, HistoryEntry};
use tabletop_core::game_trait::{Action, MoveError, Outcome, RuleEngine};
use tabletop_core::player::Side;

use line::find_winning_line;

/// Five-in-a-row on a square board. No opening restrictions; overlines win.
#[derive(Debug, Default)]
pub struct Gomoku;

impl Gomoku {
    pub fn new() -> Self {
        Self
    }
}

impl RuleEngine for Gomoku {
    fn mode(&self) -> GameMode {
        GameMode::Gomoku
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
        let Action::Place { at } = *action else {
            return Err(MoveError::Unsupported);
        };
        match state.board.get(at) {
            None => return Err(MoveError::OutOfBounds),
            Some(EMPTY) => {},
            Some(_) => return Err(MoveError::Occupied),
        }

        state.board.set(at, side.stone());
        state.commit(HistoryEntry::Place {
            at,
            side,
            captured: Vec::new(),
        });

        Ok(find_winning_line(&state.board, at, side.stone())
            .map(|line| Outcome::Line { winner: side, line }))
    }

    fn invert(&self, state: &mut GameState, entry: &HistoryEntry) {
        if let HistoryEntry::Place { at, .. } = entry {
            state.board.set(*at, EMPTY);
        }
    }
}
