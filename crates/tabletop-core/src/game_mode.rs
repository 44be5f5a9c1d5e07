use serde::{Deserialize, Serialize};

use crate::player::Side;

/// The rule set a room plays. Fixed when the room is created.
///
/// On the wire each mode is its numeric code as a string (`"1"`, `"2"`,
/// `"3"`), which is what lobby clients send when they declare a mode.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum GameMode {
    #[serde(rename = "1")]
    Go,
    #[default]
    #[serde(rename = "2")]
    Gomoku,
    #[serde(rename = "3")]
    Xiangqi,
}

impl GameMode {
    pub const ALL: [GameMode; 3] = [GameMode::Go, GameMode::Gomoku, GameMode::Xiangqi];

    /// Human-readable name shown in lobbies and mismatch errors.
    pub fn display_name(self) -> &'static str {
        match self {
            Self::Go => "Go",
            Self::Gomoku => "Gomoku",
            Self::Xiangqi => "Xiangqi",
        }
    }

    /// Name of a side's pieces, used when a seat is empty at game end.
    pub fn side_name(self, side: Side) -> &'static str {
        match (self, side) {
            (Self::Xiangqi, Side::First) => "Red",
            (Self::Xiangqi, Side::Second) => "Black",
            (_, Side::First) => "Black",
            (_, Side::Second) => "White",
        }
    }

    /// Whether the board size is fixed by the rules rather than chosen by
    /// the room creator.
    pub fn has_fixed_board(self) -> bool {
        self == Self::Xiangqi
    }
}

impl std::fmt::Display for GameMode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.display_name())
    }
}
