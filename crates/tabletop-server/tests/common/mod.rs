use std::net::SocketAddr;
use std::time::Duration;

use futures::{SinkExt, StreamExt};
use tokio::net::TcpStream;
use tokio_tungstenite::tungstenite::Message;
use tokio_tungstenite::{MaybeTlsStream, WebSocketStream};

use tabletop_core::game_mode::GameMode;
use tabletop_core::net::messages::{
    ClientMessage, InitDataMsg, JoinRoomMsg, MakeMoveMsg, RoomRefMsg, ServerMessage,
};
use tabletop_core::net::protocol::{decode_server_message, encode_client_message};
use tabletop_core::player::Role;

use tabletop_server::build_app;
use tabletop_server::config::ServerConfig;

pub type WsStream = WebSocketStream<MaybeTlsStream<TcpStream>>;

pub struct TestServer {
    pub addr: SocketAddr,
    _shutdown: tokio::task::JoinHandle<()>,
}

impl TestServer {
    pub async fn new() -> Self {
        Self::from_config(ServerConfig::default()).await
    }

    /// Server whose post-game resets fire after `ms` milliseconds.
    pub async fn with_reset_delay(ms: u64) -> Self {
        let mut config = ServerConfig::default();
        config.rooms.reset_delay_ms = ms;
        config.rooms.surrender_reset_delay_ms = ms;
        Self::from_config(config).await
    }

    pub async fn from_config(config: ServerConfig) -> Self {
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();

        let (app, _state) = build_app(config);

        let handle = tokio::spawn(async move {
            axum::serve(listener, app).await.unwrap();
        });

        // Give the server a moment to start accepting
        tokio::time::sleep(Duration::from_millis(20)).await;

        Self {
            addr,
            _shutdown: handle,
        }
    }

    pub fn base_url(&self) -> String {
        format!("http://{}", self.addr)
    }

    pub fn ws_url(&self) -> String {
        format!("ws://{}/ws", self.addr)
    }
}

/// Connect a WebSocket client and consume the directory sent on connect.
pub async fn ws_connect(url: &str) -> WsStream {
    let (mut stream, _) = tokio_tungstenite::connect_async(url).await.unwrap();
    match ws_read_server_msg(&mut stream).await {
        ServerMessage::OnlinePlayers(_) => {},
        other => panic!("Expected OnlinePlayers, got: {other:?}"),
    }
    stream
}

/// Read raw binary data from a WebSocket stream (5s timeout).
pub async fn ws_read_raw(stream: &mut WsStream) -> Vec<u8> {
    let deadline = Duration::from_secs(5);
    tokio::time::timeout(deadline, async {
        loop {
            match stream.next().await {
                Some(Ok(Message::Binary(data))) => return data.to_vec(),
                Some(Ok(Message::Close(_))) => panic!("WebSocket closed unexpectedly"),
                Some(Err(e)) => panic!("WebSocket error: {e}"),
                None => panic!("WebSocket stream ended"),
                _ => continue,
            }
        }
    })
    .await
    .expect("Timed out waiting for WebSocket message")
}

/// Try to read raw binary data, returning None on timeout.
pub async fn ws_try_read_raw(stream: &mut WsStream, timeout_ms: u64) -> Option<Vec<u8>> {
    let deadline = Duration::from_millis(timeout_ms);
    tokio::time::timeout(deadline, async {
        loop {
            match stream.next().await {
                Some(Ok(Message::Binary(data))) => return data.to_vec(),
                Some(Ok(Message::Close(_))) | Some(Err(_)) | None => {
                    panic!("WebSocket error or closed")
                },
                _ => continue,
            }
        }
    })
    .await
    .ok()
}

/// Read the next ServerMessage from a WebSocket stream (5s timeout).
pub async fn ws_read_server_msg(stream: &mut WsStream) -> ServerMessage {
    let data = ws_read_raw(stream).await;
    decode_server_message(&data).unwrap()
}

/// Skip messages until one satisfies `pred` (5s timeout per message).
pub async fn ws_expect(
    stream: &mut WsStream,
    pred: impl Fn(&ServerMessage) -> bool,
) -> ServerMessage {
    loop {
        let msg = ws_read_server_msg(stream).await;
        if pred(&msg) {
            return msg;
        }
    }
}

/// Read everything that arrives within `quiet_ms` of the previous message.
pub async fn ws_drain(stream: &mut WsStream, quiet_ms: u64) -> Vec<ServerMessage> {
    let mut out = Vec::new();
    while let Some(data) = ws_try_read_raw(stream, quiet_ms).await {
        out.push(decode_server_message(&data).unwrap());
    }
    out
}

/// Send a ClientMessage from a WS stream.
pub async fn ws_send_client_msg(stream: &mut WsStream, msg: &ClientMessage) {
    let encoded = encode_client_message(msg).unwrap();
    stream.send(Message::Binary(encoded.into())).await.unwrap();
}

/// Join (or create) a room and return the snapshot. Later messages from the
/// join, such as the roster and directory, are left unread.
pub async fn ws_join(
    stream: &mut WsStream,
    room_key: &str,
    username: &str,
    mode: GameMode,
    board_size: u32,
) -> InitDataMsg {
    let msg = ClientMessage::JoinRoom(JoinRoomMsg {
        room_key: room_key.to_string(),
        username: username.to_string(),
        game_mode: Some(mode),
        board_size: Some(board_size),
    });
    ws_send_client_msg(stream, &msg).await;
    match ws_expect(stream, |m| matches!(m, ServerMessage::InitData(_))).await {
        ServerMessage::InitData(init) => *init,
        _ => unreachable!(),
    }
}

pub fn room_ref(room_key: &str) -> RoomRefMsg {
    RoomRefMsg {
        room_key: room_key.to_string(),
    }
}

pub async fn ws_place(stream: &mut WsStream, room_key: &str, role: Role, row: u32, col: u32) {
    let msg = ClientMessage::MakeMove(MakeMoveMsg {
        room_key: room_key.to_string(),
        row,
        col,
        role,
        target_row: None,
        target_col: None,
    });
    ws_send_client_msg(stream, &msg).await;
}

pub async fn ws_shift(
    stream: &mut WsStream,
    room_key: &str,
    role: Role,
    from: (u32, u32),
    to: (u32, u32),
) {
    let msg = ClientMessage::MakeMove(MakeMoveMsg {
        room_key: room_key.to_string(),
        row: from.0,
        col: from.1,
        role,
        target_row: Some(to.0),
        target_col: Some(to.1),
    });
    ws_send_client_msg(stream, &msg).await;
}
