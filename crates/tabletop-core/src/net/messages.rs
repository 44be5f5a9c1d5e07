use serde::{Deserialize, Serialize};

use crate::board::{Board, Coord};
use crate::game_mode::GameMode;
use crate::game_state::{Captures, LastMove};
use crate::game_trait::Score;
use crate::player::{Player, PlayerId, Role, Side};

/// Network message type discriminator.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[repr(u8)]
pub enum MessageType {
    // Client -> Server
    JoinRoom = 0x01,
    SetPlayerRole = 0x02,
    Pass = 0x03,
    MakeMove = 0x04,
    RequestUndo = 0x05,
    ConfirmUndo = 0x06,
    Surrender = 0x07,
    RequestReset = 0x08,
    ConfirmReset = 0x09,
    RequestJoinRoom = 0x0A,
    RespondJoinRequest = 0x0B,
    KickPlayer = 0x0C,

    // Server -> Client
    OnlinePlayers = 0x10,
    InitData = 0x11,
    UpdatePlayers = 0x12,
    UpdateBoard = 0x13,
    GameOver = 0x14,
    PlayerPassed = 0x15,
    GameReset = 0x16,
    ErrorMsg = 0x17,
    UndoRequested = 0x18,
    UndoSuccess = 0x19,
    UndoDeclined = 0x1A,
    ResetRequested = 0x1B,
    ResetDeclined = 0x1C,
    GameModeMismatch = 0x1D,
    JoinRequestReceived = 0x1E,
    JoinRequestDeclined = 0x1F,
    Kicked = 0x20,
}

impl MessageType {
    pub fn from_byte(b: u8) -> Option<Self> {
        match b {
            0x01 => Some(Self::JoinRoom),
            0x02 => Some(Self::SetPlayerRole),
            0x03 => Some(Self::Pass),
            0x04 => Some(Self::MakeMove),
            0x05 => Some(Self::RequestUndo),
            0x06 => Some(Self::ConfirmUndo),
            0x07 => Some(Self::Surrender),
            0x08 => Some(Self::RequestReset),
            0x09 => Some(Self::ConfirmReset),
            0x0A => Some(Self::RequestJoinRoom),
            0x0B => Some(Self::RespondJoinRequest),
            0x0C => Some(Self::KickPlayer),
            0x10 => Some(Self::OnlinePlayers),
            0x11 => Some(Self::InitData),
            0x12 => Some(Self::UpdatePlayers),
            0x13 => Some(Self::UpdateBoard),
            0x14 => Some(Self::GameOver),
            0x15 => Some(Self::PlayerPassed),
            0x16 => Some(Self::GameReset),
            0x17 => Some(Self::ErrorMsg),
            0x18 => Some(Self::UndoRequested),
            0x19 => Some(Self::UndoSuccess),
            0x1A => Some(Self::UndoDeclined),
            0x1B => Some(Self::ResetRequested),
            0x1C => Some(Self::ResetDeclined),
            0x1D => Some(Self::GameModeMismatch),
            0x1E => Some(Self::JoinRequestReceived),
            0x1F => Some(Self::JoinRequestDeclined),
            0x20 => Some(Self::Kicked),
            _ => None,
        }
    }

    /// Messages only the server may originate.
    pub fn is_server_only(self) -> bool {
        (self as u8) >= 0x10
    }
}

// ================================================================
// Client -> Server
// ================================================================

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum ClientMessage {
    JoinRoom(JoinRoomMsg),
    SetPlayerRole(SetPlayerRoleMsg),
    Pass(RoomRefMsg),
    MakeMove(MakeMoveMsg),
    RequestUndo(RoomRefMsg),
    ConfirmUndo(ConfirmMsg),
    Surrender(RoomRefMsg),
    RequestReset(RoomRefMsg),
    ConfirmReset(ConfirmMsg),
    RequestJoinRoom(RequestJoinRoomMsg),
    RespondJoinRequest(RespondJoinRequestMsg),
    KickPlayer(KickPlayerMsg),
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct JoinRoomMsg {
    pub room_key: String,
    pub username: String,
    /// Missing means Gomoku.
    pub game_mode: Option<GameMode>,
    /// Missing or zero means the server default.
    pub board_size: Option<u32>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SetPlayerRoleMsg {
    pub room_key: String,
    pub target_id: PlayerId,
    pub role: Role,
}

/// Payload for events that only name a room.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RoomRefMsg {
    pub room_key: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MakeMoveMsg {
    pub room_key: String,
    pub row: u32,
    pub col: u32,
    pub role: Role,
    /// Destination square, Xiangqi only.
    pub target_row: Option<u32>,
    pub target_col: Option<u32>,
}

/// Accept/decline answer to an undo or reset request.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConfirmMsg {
    pub room_key: String,
    pub accept: bool,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RequestJoinRoomMsg {
    pub room_key: String,
    pub username: String,
    pub game_mode: Option<GameMode>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RespondJoinRequestMsg {
    pub room_key: String,
    pub requester_id: PlayerId,
    pub accept: bool,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct KickPlayerMsg {
    pub room_key: String,
    pub target_id: PlayerId,
}

// ================================================================
// Server -> Client
// ================================================================

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum ServerMessage {
    OnlinePlayers(OnlinePlayersMsg),
    InitData(Box<InitDataMsg>),
    UpdatePlayers(UpdatePlayersMsg),
    UpdateBoard(Box<UpdateBoardMsg>),
    GameOver(GameOverMsg),
    PlayerPassed(PlayerPassedMsg),
    GameReset(GameResetMsg),
    ErrorMsg(ErrorMsg),
    UndoRequested(UndoRequestedMsg),
    UndoSuccess,
    UndoDeclined,
    ResetRequested(ResetRequestedMsg),
    ResetDeclined,
    GameModeMismatch(GameModeMismatchMsg),
    JoinRequestReceived(JoinRequestReceivedMsg),
    JoinRequestDeclined(JoinRequestDeclinedMsg),
    Kicked(KickedMsg),
}

/// One seated connection in the global lobby directory.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OnlinePlayer {
    pub username: String,
    pub room_key: String,
    pub game_mode: GameMode,
    pub game_mode_name: String,
    pub role: Role,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OnlinePlayersMsg {
    pub players: Vec<OnlinePlayer>,
}

/// Full room snapshot sent to a connection when it enters a room.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct InitDataMsg {
    pub my_id: PlayerId,
    pub room_key: String,
    pub game_mode: GameMode,
    pub board_size: u32,
    pub players: Vec<Player>,
    pub board: Board,
    pub last_move: Option<LastMove>,
    pub turn: Side,
    pub is_host: bool,
    pub is_started: bool,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UpdatePlayersMsg {
    pub players: Vec<Player>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UpdateBoardMsg {
    pub board: Board,
    pub turn: Side,
    pub last_move: Option<LastMove>,
    pub is_started: bool,
    /// Present for Go rooms only.
    pub captured_stones: Option<Captures>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GameOverMsg {
    pub winner: Side,
    pub winner_name: String,
    pub win_line: Option<Vec<Coord>>,
    pub score: Option<Score>,
    pub is_surrender: bool,
    pub loser_name: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PlayerPassedMsg {
    pub username: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GameResetMsg {
    pub message: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ErrorMsg {
    pub text: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UndoRequestedMsg {
    pub username: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResetRequestedMsg {
    pub role: Role,
    pub username: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GameModeMismatchMsg {
    pub required_mode: GameMode,
    pub required_mode_name: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct JoinRequestReceivedMsg {
    pub requester_id: PlayerId,
    pub username: String,
    pub room_key: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct JoinRequestDeclinedMsg {
    pub reason: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct KickedMsg {
    pub reason: String,
}
