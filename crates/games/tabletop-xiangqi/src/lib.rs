pub mod piece;
pub mod rules;

use tabletop_core::board::{Board, Coord, EMPTY};
use tabletop_core::game_mode::GameMode;
use tabletop_core::game_state::{GameState, HistoryEntry};
use tabletop_core::game_trait::{Action, MoveError, Outcome, RuleEngine};
use tabletop_core::player::Side;

use piece::{initial_board, is_own, owner};
use rules::{after_move, in_check, is_checkmate, is_valid_move};

/// Chinese chess on the fixed 10x9 board. Red is the first side.
#[derive(Debug, Default)]
pub struct Xiangqi;

impl Xiangqi {
    pub fn new() -> Self {
        Self
    }

    fn shift(
        &self,
        state: &mut GameState,
        side: Side,
        from: Coord,
        to: Coord,
    ) -> Result<Option<Outcome>, MoveError> {
        let piece = state.board.get(from).ok_or(MoveError::OutOfBounds)?;
        let captured_piece = state.board.get(to).ok_or(MoveError::OutOfBounds)?;
        if piece == EMPTY || owner(piece) != Some(side) {
            return Err(MoveError::NotYourPiece);
        }
        if is_own(&state.board, to, side) {
            return Err(MoveError::OwnPieceAtTarget);
        }
        if from == to {
            return Err(MoveError::NoMovement);
        }
        if !is_valid_move(&state.board, piece, from, to) {
            return Err(MoveError::IllegalPieceMove);
        }
        let next = after_move(&state.board, from, to);
        if in_check(&next, side) {
            return Err(MoveError::SelfCheck);
        }

        state.board = next;
        state.commit(HistoryEntry::Shift {
            from,
            to,
            piece,
            captured_piece,
            side,
        });

        if is_checkmate(&state.board, side.opponent()) {
            return Ok(Some(Outcome::Checkmate { winner: side }));
        }
        Ok(None)
    }
}

impl RuleEngine for Xiangqi {
    fn mode(&self) -> GameMode {
        GameMode::Xiangqi
    }

    fn new_board(&self, _size: usize) -> Board {
        initial_board()
    }

    fn apply(
        &self,
        state: &mut GameState,
        side: Side,
        action: &Action,
    ) -> Result<Option<Outcome>, MoveError> {
        match *action {
            Action::Shift { from, to } => self.shift(state, side, from, to),
            Action::Place { .. } | Action::Pass => Err(MoveError::Unsupported),
        }
    }

    fn invert(&self, state: &mut GameState, entry: &HistoryEntry) {
        if let HistoryEntry::Shift {
            from,
            to,
            piece,
            captured_piece,
            ..
        } = entry
        {
            state.board.set(*from, *piece);
            state.board.set(*to, *captured_piece);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use piece::{PieceKind, code};
    use tabletop_core::game_state::LastMove;
    use tabletop_core::test_helpers::{
        contract_apply_flips_turn, contract_invert_restores, contract_rejection_is_pure, state_with,
    };

    fn shift(from: (usize, usize), to: (usize, usize)) -> Action {
        Action::Shift {
            from: Coord::new(from.0, from.1),
            to: Coord::new(to.0, to.1),
        }
    }

    fn with(pieces: &[(usize, usize, Side, PieceKind)]) -> Board {
        let mut board = Board::new(piece::ROWS, piece::COLS);
        for &(row, col, side, k) in pieces {
            board.set(Coord::new(row, col), code(side, k));
        }
        board
    }

    #[test]
    fn contract_apply() {
        // Central cannon opening.
        contract_apply_flips_turn(&Xiangqi, 0, shift((7, 1), (7, 4)));
    }

    #[test]
    fn contract_rejection() {
        contract_rejection_is_pure(&Xiangqi, 0, shift((0, 0), (1, 0)));
        contract_rejection_is_pure(&Xiangqi, 0, shift((9, 0), (9, 1)));
        contract_rejection_is_pure(&Xiangqi, 0, shift((9, 1), (7, 1)));
        contract_rejection_is_pure(
            &Xiangqi,
            0,
            Action::Place {
                at: Coord::new(4, 4),
            },
        );
    }

    #[test]
    fn contract_invert() {
        contract_invert_restores(&Xiangqi, 0, shift((9, 1), (7, 2)));
    }

    #[test]
    fn board_size_is_fixed() {
        let board = Xiangqi.new_board(19);
        assert_eq!(board.rows(), 10);
        assert_eq!(board.cols(), 9);
    }

    #[test]
    fn rejection_reasons_follow_validation_order() {
        let mut state = GameState::new(Xiangqi.new_board(0));
        let cases = [
            (shift((4, 4), (5, 4)), MoveError::NotYourPiece),
            (shift((0, 4), (1, 4)), MoveError::NotYourPiece),
            (shift((9, 0), (9, 1)), MoveError::OwnPieceAtTarget),
            (shift((9, 1), (8, 1)), MoveError::IllegalPieceMove),
            (shift((10, 0), (9, 0)), MoveError::OutOfBounds),
        ];
        for (action, expected) in cases {
            assert_eq!(
                Xiangqi.apply(&mut state, Side::First, &action),
                Err(expected),
                "{action:?}"
            );
        }
        assert!(state.history.is_empty());
    }

    #[test]
    fn capture_records_both_pieces_and_highlight() {
        let mut state = GameState::new(Xiangqi.new_board(0));
        Xiangqi
            .apply(&mut state, Side::First, &shift((7, 1), (0, 1)))
            .unwrap();
        assert_eq!(
            state.history.last(),
            Some(&HistoryEntry::Shift {
                from: Coord::new(7, 1),
                to: Coord::new(0, 1),
                piece: 6,
                captured_piece: 11,
                side: Side::First,
            })
        );
        assert_eq!(
            state.last_move,
            Some(LastMove::shift(Coord::new(7, 1), Coord::new(0, 1)))
        );

        state.rewind(&Xiangqi, 1);
        assert_eq!(state.board, initial_board());
    }

    #[test]
    fn moving_pinned_piece_is_self_check() {
        let board = with(&[
            (9, 4, Side::First, PieceKind::General),
            (5, 4, Side::First, PieceKind::Chariot),
            (0, 4, Side::Second, PieceKind::Chariot),
            (0, 3, Side::Second, PieceKind::General),
        ]);
        let mut state = state_with(board, Side::First);
        let before = state.clone();
        assert_eq!(
            Xiangqi.apply(&mut state, Side::First, &shift((5, 4), (5, 0))),
            Err(MoveError::SelfCheck)
        );
        assert_eq!(state, before);
    }

    #[test]
    fn exposing_generals_is_self_check() {
        let board = with(&[
            (9, 4, Side::First, PieceKind::General),
            (4, 4, Side::First, PieceKind::Soldier),
            (0, 4, Side::Second, PieceKind::General),
        ]);
        let mut state = state_with(board, Side::First);
        assert_eq!(
            Xiangqi.apply(&mut state, Side::First, &shift((4, 4), (4, 3))),
            Err(MoveError::SelfCheck)
        );
    }

    #[test]
    fn checkmate_ends_game_for_mover() {
        let board = with(&[
            (9, 3, Side::First, PieceKind::General),
            (5, 0, Side::First, PieceKind::Chariot),
            (1, 8, Side::First, PieceKind::Chariot),
            (0, 4, Side::Second, PieceKind::General),
        ]);
        let mut state = state_with(board, Side::First);
        let outcome = Xiangqi
            .apply(&mut state, Side::First, &shift((5, 0), (0, 0)))
            .unwrap();
        assert_eq!(
            outcome,
            Some(Outcome::Checkmate {
                winner: Side::First
            })
        );
        assert_eq!(state.turn, Side::Second);
    }

    #[test]
    fn plain_check_does_not_end_game() {
        let board = with(&[
            (9, 3, Side::First, PieceKind::General),
            (5, 0, Side::First, PieceKind::Chariot),
            (0, 4, Side::Second, PieceKind::General),
        ]);
        let mut state = state_with(board, Side::First);
        let outcome = Xiangqi
            .apply(&mut state, Side::First, &shift((5, 0), (0, 0)))
            .unwrap();
        assert_eq!(outcome, None);
        assert!(in_check(&state.board, Side::Second));
    }

    mod proptests {
        use super::*;
        use proptest::prelude::*;
        use rules::legal_moves;

        proptest! {
            #![proptest_config(ProptestConfig::with_cases(24))]

            #[test]
            fn legal_moves_never_leave_mover_in_check(
                picks in proptest::collection::vec(any::<prop::sample::Index>(), 1..30)
            ) {
                let mut state = GameState::new(Xiangqi.new_board(0));
                for pick in picks {
                    let side = state.turn;
                    let moves = legal_moves(&state.board, side);
                    if moves.is_empty() {
                        break;
                    }
                    let (from, to) = *pick.get(&moves);
                    let outcome = Xiangqi.apply(&mut state, side, &Action::Shift { from, to });
                    prop_assert!(outcome.is_ok(), "{:?} -> {:?}: {:?}", from, to, outcome);
                    prop_assert!(!in_check(&state.board, side));
                    if let Ok(Some(_)) = outcome {
                        break;
                    }
                }

                let len = state.history.len();
                state.rewind(&Xiangqi, len);
                prop_assert_eq!(state.board, initial_board());
                prop_assert_eq!(state.turn, Side::First);
            }
        }
    }
}
