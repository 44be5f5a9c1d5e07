pub mod board;
pub mod game_mode;
pub mod game_state;
pub mod game_trait;
pub mod net;
pub mod player;
pub mod room;

#[cfg(any(test, feature = "test-helpers"))]
pub mod test_helpers {
    use crate::board::{Board, Coord};
    use crate::game_state::GameState;
    use crate::game_trait::{Action, MoveError, Outcome, RuleEngine};
    use crate::player::Side;

    /// Build a stone board from text rows: `.` empty, `X` first side,
    /// `O` second side. Any other character is read as empty.
    pub fn stone_board(rows: &[&str]) -> Board {
        Board::from_rows(
            rows.iter()
                .map(|row| {
                    row.chars()
                        .map(|c| match c {
                            'X' => Side::First.stone(),
                            'O' => Side::Second.stone(),
                            _ => 0,
                        })
                        .collect()
                })
                .collect(),
        )
    }

    /// A fresh state around `board` with `turn` to move.
    pub fn state_with(board: Board, turn: Side) -> GameState {
        let mut state = GameState::new(board);
        state.turn = turn;
        state
    }

    /// Place a stone for whichever side is to move.
    pub fn place(
        engine: &dyn RuleEngine,
        state: &mut GameState,
        row: usize,
        col: usize,
    ) -> Result<Option<Outcome>, MoveError> {
        let side = state.turn;
        engine.apply(
            state,
            side,
            &Action::Place {
                at: Coord::new(row, col),
            },
        )
    }

    // ================================================================
    // Rule Engine Contract Tests
    // ================================================================
    // Every RuleEngine implementation calls these from its own tests with a
    // concrete engine and a legal opening action for the first side.

    /// A legal action flips the turn and appends exactly one history entry.
    pub fn contract_apply_flips_turn(engine: &dyn RuleEngine, size: usize, opening: Action) {
        let mut state = GameState::new(engine.new_board(size));
        let outcome = engine.apply(&mut state, Side::First, &opening);
        assert!(outcome.is_ok(), "opening action must be legal: {outcome:?}");
        assert_eq!(state.turn, Side::Second, "turn must pass to the opponent");
        assert_eq!(state.history.len(), 1, "exactly one history entry");
    }

    /// A rejected action leaves the state untouched.
    pub fn contract_rejection_is_pure(engine: &dyn RuleEngine, size: usize, illegal: Action) {
        let mut state = GameState::new(engine.new_board(size));
        let before = state.clone();
        assert!(engine.apply(&mut state, Side::First, &illegal).is_err());
        assert_eq!(state, before, "rejected action must not change state");
    }

    /// Applying then inverting the opening restores the starting board.
    pub fn contract_invert_restores(engine: &dyn RuleEngine, size: usize, opening: Action) {
        let mut state = GameState::new(engine.new_board(size));
        let start = state.board.clone();
        engine
            .apply(&mut state, Side::First, &opening)
            .expect("opening action must be legal");
        state.rewind(engine, 1);
        assert_eq!(state.board, start);
        assert_eq!(state.turn, Side::First);
        assert!(state.history.is_empty());
        assert_eq!(state.last_move, None);
    }
}
