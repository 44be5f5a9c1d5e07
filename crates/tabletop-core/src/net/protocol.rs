use serde::{Deserialize, Serialize};

use super::messages::{
    ClientMessage, ConfirmMsg, ErrorMsg, GameModeMismatchMsg, GameOverMsg, GameResetMsg,
    InitDataMsg, JoinRequestDeclinedMsg, JoinRequestReceivedMsg, JoinRoomMsg, KickPlayerMsg,
    KickedMsg, MakeMoveMsg, MessageType, OnlinePlayersMsg, PlayerPassedMsg, RequestJoinRoomMsg,
    ResetRequestedMsg, RespondJoinRequestMsg, RoomRefMsg, ServerMessage, SetPlayerRoleMsg,
    UndoRequestedMsg, UpdateBoardMsg, UpdatePlayersMsg,
};

/// Maximum message payload size in bytes.
pub const MAX_MESSAGE_SIZE: usize = 64 * 1024; // 64 KiB

#[derive(Debug)]
pub enum ProtocolError {
    EmptyMessage,
    UnknownMessageType(u8),
    PayloadTooLarge(usize),
    SerializeError(String),
    DeserializeError(String),
}

impl std::fmt::Display for ProtocolError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::EmptyMessage => write!(f, "empty message"),
            Self::UnknownMessageType(b) => write!(f, "unknown message type: 0x{b:02x}"),
            Self::PayloadTooLarge(size) => {
                write!(
                    f,
                    "payload too large: {size} bytes (max {MAX_MESSAGE_SIZE})"
                )
            },
            Self::SerializeError(e) => write!(f, "serialize error: {e}"),
            Self::DeserializeError(e) => write!(f, "deserialize error: {e}"),
        }
    }
}

impl std::error::Error for ProtocolError {}

/// Encode a serializable payload with a 1-byte type prefix.
pub fn encode_message<T: Serialize>(
    msg_type: MessageType,
    payload: &T,
) -> Result<Vec<u8>, ProtocolError> {
    let payload_bytes =
        rmp_serde::to_vec(payload).map_err(|e| ProtocolError::SerializeError(e.to_string()))?;
    let total = 1 + payload_bytes.len();
    if total > MAX_MESSAGE_SIZE {
        return Err(ProtocolError::PayloadTooLarge(total));
    }
    let mut buf = Vec::with_capacity(total);
    buf.push(msg_type as u8);
    buf.extend_from_slice(&payload_bytes);
    Ok(buf)
}

/// Encode a `ClientMessage` to wire format.
pub fn encode_client_message(msg: &ClientMessage) -> Result<Vec<u8>, ProtocolError> {
    match msg {
        ClientMessage::JoinRoom(m) => encode_message(MessageType::JoinRoom, m),
        ClientMessage::SetPlayerRole(m) => encode_message(MessageType::SetPlayerRole, m),
        ClientMessage::Pass(m) => encode_message(MessageType::Pass, m),
        ClientMessage::MakeMove(m) => encode_message(MessageType::MakeMove, m),
        ClientMessage::RequestUndo(m) => encode_message(MessageType::RequestUndo, m),
        ClientMessage::ConfirmUndo(m) => encode_message(MessageType::ConfirmUndo, m),
        ClientMessage::Surrender(m) => encode_message(MessageType::Surrender, m),
        ClientMessage::RequestReset(m) => encode_message(MessageType::RequestReset, m),
        ClientMessage::ConfirmReset(m) => encode_message(MessageType::ConfirmReset, m),
        ClientMessage::RequestJoinRoom(m) => encode_message(MessageType::RequestJoinRoom, m),
        ClientMessage::RespondJoinRequest(m) => {
            encode_message(MessageType::RespondJoinRequest, m)
        },
        ClientMessage::KickPlayer(m) => encode_message(MessageType::KickPlayer, m),
    }
}

/// Encode a `ServerMessage` to wire format.
pub fn encode_server_message(msg: &ServerMessage) -> Result<Vec<u8>, ProtocolError> {
    match msg {
        ServerMessage::OnlinePlayers(m) => encode_message(MessageType::OnlinePlayers, m),
        ServerMessage::InitData(m) => encode_message(MessageType::InitData, m),
        ServerMessage::UpdatePlayers(m) => encode_message(MessageType::UpdatePlayers, m),
        ServerMessage::UpdateBoard(m) => encode_message(MessageType::UpdateBoard, m),
        ServerMessage::GameOver(m) => encode_message(MessageType::GameOver, m),
        ServerMessage::PlayerPassed(m) => encode_message(MessageType::PlayerPassed, m),
        ServerMessage::GameReset(m) => encode_message(MessageType::GameReset, m),
        ServerMessage::ErrorMsg(m) => encode_message(MessageType::ErrorMsg, m),
        ServerMessage::UndoRequested(m) => encode_message(MessageType::UndoRequested, m),
        ServerMessage::UndoSuccess => encode_message(MessageType::UndoSuccess, &()),
        ServerMessage::UndoDeclined => encode_message(MessageType::UndoDeclined, &()),
        ServerMessage::ResetRequested(m) => encode_message(MessageType::ResetRequested, m),
        ServerMessage::ResetDeclined => encode_message(MessageType::ResetDeclined, &()),
        ServerMessage::GameModeMismatch(m) => encode_message(MessageType::GameModeMismatch, m),
        ServerMessage::JoinRequestReceived(m) => {
            encode_message(MessageType::JoinRequestReceived, m)
        },
        ServerMessage::JoinRequestDeclined(m) => {
            encode_message(MessageType::JoinRequestDeclined, m)
        },
        ServerMessage::Kicked(m) => encode_message(MessageType::Kicked, m),
    }
}

/// Extract the message type byte from raw wire data.
pub fn decode_message_type(data: &[u8]) -> Result<MessageType, ProtocolError> {
    if data.is_empty() {
        return Err(ProtocolError::EmptyMessage);
    }
    MessageType::from_byte(data[0]).ok_or(ProtocolError::UnknownMessageType(data[0]))
}

/// Decode a MessagePack payload (bytes after the type prefix).
pub fn decode_payload<T: for<'de> Deserialize<'de>>(data: &[u8]) -> Result<T, ProtocolError> {
    if data.is_empty() {
        return Err(ProtocolError::EmptyMessage);
    }
    rmp_serde::from_slice(&data[1..]).map_err(|e| ProtocolError::DeserializeError(e.to_string()))
}

/// Decode raw wire data into a `ClientMessage`.
pub fn decode_client_message(data: &[u8]) -> Result<ClientMessage, ProtocolError> {
    let msg_type = decode_message_type(data)?;
    match msg_type {
        MessageType::JoinRoom => Ok(ClientMessage::JoinRoom(decode_payload::<JoinRoomMsg>(
            data,
        )?)),
        MessageType::SetPlayerRole => Ok(ClientMessage::SetPlayerRole(decode_payload::<
            SetPlayerRoleMsg,
        >(data)?)),
        MessageType::Pass => Ok(ClientMessage::Pass(decode_payload::<RoomRefMsg>(data)?)),
        MessageType::MakeMove => Ok(ClientMessage::MakeMove(decode_payload::<MakeMoveMsg>(
            data,
        )?)),
        MessageType::RequestUndo => Ok(ClientMessage::RequestUndo(
            decode_payload::<RoomRefMsg>(data)?,
        )),
        MessageType::ConfirmUndo => Ok(ClientMessage::ConfirmUndo(
            decode_payload::<ConfirmMsg>(data)?,
        )),
        MessageType::Surrender => Ok(ClientMessage::Surrender(decode_payload::<RoomRefMsg>(
            data,
        )?)),
        MessageType::RequestReset => Ok(ClientMessage::RequestReset(
            decode_payload::<RoomRefMsg>(data)?,
        )),
        MessageType::ConfirmReset => Ok(ClientMessage::ConfirmReset(
            decode_payload::<ConfirmMsg>(data)?,
        )),
        MessageType::RequestJoinRoom => Ok(ClientMessage::RequestJoinRoom(decode_payload::<
            RequestJoinRoomMsg,
        >(data)?)),
        MessageType::RespondJoinRequest => Ok(ClientMessage::RespondJoinRequest(
            decode_payload::<RespondJoinRequestMsg>(data)?,
        )),
        MessageType::KickPlayer => Ok(ClientMessage::KickPlayer(
            decode_payload::<KickPlayerMsg>(data)?,
        )),
        _ => Err(ProtocolError::UnknownMessageType(data[0])),
    }
}

/// Decode raw wire data into a `ServerMessage`.
pub fn decode_server_message(data: &[u8]) -> Result<ServerMessage, ProtocolError> {
    let msg_type = decode_message_type(data)?;
    match msg_type {
        MessageType::OnlinePlayers => Ok(ServerMessage::OnlinePlayers(decode_payload::<
            OnlinePlayersMsg,
        >(data)?)),
        MessageType::InitData => Ok(ServerMessage::InitData(Box::new(decode_payload::<
            InitDataMsg,
        >(data)?))),
        MessageType::UpdatePlayers => Ok(ServerMessage::UpdatePlayers(decode_payload::<
            UpdatePlayersMsg,
        >(data)?)),
        MessageType::UpdateBoard => Ok(ServerMessage::UpdateBoard(Box::new(decode_payload::<
            UpdateBoardMsg,
        >(data)?))),
        MessageType::GameOver => Ok(ServerMessage::GameOver(decode_payload::<GameOverMsg>(
            data,
        )?)),
        MessageType::PlayerPassed => Ok(ServerMessage::PlayerPassed(decode_payload::<
            PlayerPassedMsg,
        >(data)?)),
        MessageType::GameReset => Ok(ServerMessage::GameReset(decode_payload::<GameResetMsg>(
            data,
        )?)),
        MessageType::ErrorMsg => Ok(ServerMessage::ErrorMsg(decode_payload::<ErrorMsg>(data)?)),
        MessageType::UndoRequested => Ok(ServerMessage::UndoRequested(decode_payload::<
            UndoRequestedMsg,
        >(data)?)),
        MessageType::UndoSuccess => Ok(ServerMessage::UndoSuccess),
        MessageType::UndoDeclined => Ok(ServerMessage::UndoDeclined),
        MessageType::ResetRequested => Ok(ServerMessage::ResetRequested(decode_payload::<
            ResetRequestedMsg,
        >(data)?)),
        MessageType::ResetDeclined => Ok(ServerMessage::ResetDeclined),
        MessageType::GameModeMismatch => Ok(ServerMessage::GameModeMismatch(decode_payload::<
            GameModeMismatchMsg,
        >(data)?)),
        MessageType::JoinRequestReceived => Ok(ServerMessage::JoinRequestReceived(
            decode_payload::<JoinRequestReceivedMsg>(data)?,
        )),
        MessageType::JoinRequestDeclined => Ok(ServerMessage::JoinRequestDeclined(
            decode_payload::<JoinRequestDeclinedMsg>(data)?,
        )),
        MessageType::Kicked => Ok(ServerMessage::Kicked(decode_payload::<KickedMsg>(data)?)),
        _ => Err(ProtocolError::UnknownMessageType(data[0])),
    }
}
