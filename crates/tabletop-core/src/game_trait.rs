use serde::{Deserialize, Serialize};

use crate::board::{Board, Coord};
use crate::game_mode::GameMode;
use crate::game_state::{GameState, HistoryEntry};
use crate::player::Side;

/// Rules for one game mode.
///
/// The room owns turn order, membership and negotiation; an engine only sees
/// the board-level [`GameState`] and trusts that the caller has already
/// checked that `side` is the player to move.
pub trait RuleEngine: Send + Sync {
    fn mode(&self) -> GameMode;

    /// Starting position. `size` is the room's declared size; engines with a
    /// fixed board ignore it.
    fn new_board(&self, size: usize) -> Board;

    /// Validate and apply an action. On success the state has been committed
    /// (history appended, turn flipped) and a terminal outcome is returned if
    /// the action ended the game. On error the state is untouched.
    fn apply(
        &self,
        state: &mut GameState,
        side: Side,
        action: &Action,
    ) -> Result<Option<Outcome>, MoveError>;

    /// Undo the board effects of a history entry that has just been popped.
    fn invert(&self, state: &mut GameState, entry: &HistoryEntry);

    /// Whether the capture counters are meaningful for this mode.
    fn tracks_captures(&self) -> bool {
        false
    }
}

/// A player's requested action, already resolved from the wire payload.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Action {
    Place { at: Coord },
    Shift { from: Coord, to: Coord },
    Pass,
}

/// Final tallies for a scored ending.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Score {
    pub first: f64,
    pub second: f64,
}

/// How a game ended.
#[derive(Debug, Clone, PartialEq)]
pub enum Outcome {
    /// Five or more in a row through the last placed stone.
    Line { winner: Side, line: Vec<Coord> },
    /// Both sides passed; decided by score.
    Scored { winner: Side, score: Score },
    /// The side to move has no way out of check.
    Checkmate { winner: Side },
}

impl Outcome {
    pub fn winner(&self) -> Side {
        match self {
            Self::Line { winner, .. } | Self::Scored { winner, .. } | Self::Checkmate { winner } => {
                *winner
            },
        }
    }
}

/// Why an action was refused.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MoveError {
    OutOfBounds,
    Occupied,
    NotYourPiece,
    OwnPieceAtTarget,
    NoMovement,
    /// The action kind does not exist in this mode.
    Unsupported,
    Suicide,
    Ko,
    IllegalPieceMove,
    SelfCheck,
}

impl MoveError {
    /// Text shown to the mover for rule violations worth explaining.
    /// Stale or malformed actions return `None` and are dropped silently.
    pub fn user_message(self) -> Option<&'static str> {
        match self {
            Self::Suicide => Some("Illegal move: a stone may not be placed without liberties"),
            Self::Ko => Some("Illegal move: this would repeat the previous position (ko)"),
            Self::IllegalPieceMove => Some("Illegal move for that piece"),
            Self::SelfCheck => Some("Illegal move: your general would be in check"),
            Self::OutOfBounds
            | Self::Occupied
            | Self::NotYourPiece
            | Self::OwnPieceAtTarget
            | Self::NoMovement
            | Self::Unsupported => None,
        }
    }
}

impl std::fmt::Display for MoveError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::OutOfBounds => write!(f, "coordinates outside the board"),
            Self::Occupied => write!(f, "cell already occupied"),
            Self::NotYourPiece => write!(f, "no piece of the mover at the source"),
            Self::OwnPieceAtTarget => write!(f, "target holds the mover's own piece"),
            Self::NoMovement => write!(f, "source and target are the same"),
            Self::Unsupported => write!(f, "action not supported in this mode"),
            Self::Suicide => write!(f, "suicide"),
            Self::Ko => write!(f, "ko"),
            Self::IllegalPieceMove => write!(f, "illegal piece move"),
            Self::SelfCheck => write!(f, "self-check"),
        }
    }
}

impl std::error::Error for MoveError {}
