#[allow(dead_code)]
mod common;

use futures::SinkExt;
use tokio_tungstenite::tungstenite::Message;

use tabletop_core::board::Coord;
use tabletop_core::game_mode::GameMode;
use tabletop_core::game_state::LastMove;
use tabletop_core::net::messages::{
    ClientMessage, ConfirmMsg, JoinRoomMsg, KickPlayerMsg, RequestJoinRoomMsg, RespondJoinRequestMsg,
    ServerMessage, SetPlayerRoleMsg,
};
use tabletop_core::net::protocol::encode_server_message;
use tabletop_core::player::{Role, Side};

use common::{
    TestServer, WsStream, room_ref, ws_connect, ws_drain, ws_expect, ws_join, ws_place,
    ws_read_server_msg, ws_send_client_msg, ws_shift, ws_try_read_raw,
};

async fn duel(server: &TestServer, key: &str, mode: GameMode, size: u32) -> (WsStream, WsStream) {
    let mut a = ws_connect(&server.ws_url()).await;
    let mut b = ws_connect(&server.ws_url()).await;
    ws_join(&mut a, key, "alice", mode, size).await;
    ws_join(&mut b, key, "bob", mode, size).await;
    ws_drain(&mut a, 100).await;
    ws_drain(&mut b, 100).await;
    (a, b)
}

fn is_board(msg: &ServerMessage) -> bool {
    matches!(msg, ServerMessage::UpdateBoard(_))
}

/// Board update after which `side` is to move.
fn turn_of(side: Side) -> impl Fn(&ServerMessage) -> bool {
    move |msg| matches!(msg, ServerMessage::UpdateBoard(u) if u.turn == side)
}

#[tokio::test]
async fn first_move_lands_and_passes_turn() {
    let server = TestServer::new().await;
    let mut a = ws_connect(&server.ws_url()).await;
    let mut b = ws_connect(&server.ws_url()).await;

    let init_a = ws_join(&mut a, "R1", "alice", GameMode::Gomoku, 15).await;
    assert!(init_a.is_host);
    assert_eq!(init_a.board_size, 15);
    assert_eq!(init_a.players[0].role, Role::First);

    let init_b = ws_join(&mut b, "R1", "bob", GameMode::Gomoku, 15).await;
    assert!(!init_b.is_host);
    assert_eq!(init_b.players.len(), 2);
    assert_eq!(init_b.players[1].role, Role::Second);
    ws_drain(&mut a, 100).await;
    ws_drain(&mut b, 100).await;

    ws_place(&mut a, "R1", Role::First, 7, 7).await;
    match ws_expect(&mut b, is_board).await {
        ServerMessage::UpdateBoard(update) => {
            assert_eq!(update.board.get(Coord::new(7, 7)), Some(1));
            assert_eq!(update.turn, Side::Second);
            assert!(update.is_started);
            assert_eq!(update.last_move, Some(LastMove::at(Coord::new(7, 7))));
        },
        _ => unreachable!(),
    }
    let rest = ws_drain(&mut a, 200).await;
    assert!(
        !rest
            .iter()
            .any(|m| matches!(m, ServerMessage::GameOver(_)))
    );
}

#[tokio::test]
async fn go_capture_removes_stone_and_counts() {
    let server = TestServer::new().await;
    let (mut a, mut b) = duel(&server, "GO", GameMode::Go, 9).await;

    ws_place(&mut a, "GO", Role::First, 1, 0).await;
    ws_expect(&mut b, turn_of(Side::Second)).await;
    ws_place(&mut b, "GO", Role::Second, 0, 0).await;
    ws_expect(&mut a, turn_of(Side::First)).await;
    ws_place(&mut a, "GO", Role::First, 0, 1).await;

    let capture = |m: &ServerMessage| {
        matches!(m, ServerMessage::UpdateBoard(u) if u.captured_stones.is_some_and(|c| c.first > 0))
    };
    match ws_expect(&mut b, capture).await {
        ServerMessage::UpdateBoard(update) => {
            assert_eq!(update.board.get(Coord::new(0, 0)), Some(0));
            let captures = update.captured_stones.unwrap();
            assert_eq!(captures.first, 1);
            assert_eq!(captures.second, 0);
        },
        _ => unreachable!(),
    }
}

#[tokio::test]
async fn checkmate_ends_game_and_resets_with_roles_swapped() {
    let server = TestServer::with_reset_delay(200).await;
    let (mut red, mut black) = duel(&server, "XQ", GameMode::Xiangqi, 0).await;

    // Double cannon mate on the centre file.
    let line = [
        ((7, 1), (7, 4)),
        ((0, 0), (1, 0)),
        ((7, 4), (3, 4)),
        ((1, 0), (0, 0)),
        ((7, 7), (4, 7)),
        ((0, 0), (1, 0)),
        ((4, 7), (4, 4)),
    ];
    for (ply, (from, to)) in line.into_iter().enumerate() {
        let (mover, role, next) = if ply % 2 == 0 {
            (&mut red, Role::First, Side::Second)
        } else {
            (&mut black, Role::Second, Side::First)
        };
        ws_shift(mover, "XQ", role, from, to).await;
        ws_expect(mover, turn_of(next)).await;
    }

    for stream in [&mut red, &mut black] {
        match ws_expect(stream, |m| matches!(m, ServerMessage::GameOver(_))).await {
            ServerMessage::GameOver(over) => {
                assert_eq!(over.winner, Side::First);
                assert_eq!(over.winner_name, "alice");
                assert!(!over.is_surrender);
            },
            _ => unreachable!(),
        }
    }

    match ws_expect(&mut black, |m| matches!(m, ServerMessage::UpdatePlayers(_))).await {
        ServerMessage::UpdatePlayers(update) => {
            let alice = update.players.iter().find(|p| p.username == "alice").unwrap();
            let bob = update.players.iter().find(|p| p.username == "bob").unwrap();
            assert_eq!(alice.role, Role::Second);
            assert_eq!(bob.role, Role::First);
        },
        _ => unreachable!(),
    }
    match ws_expect(&mut black, is_board).await {
        ServerMessage::UpdateBoard(update) => {
            assert!(!update.is_started);
            assert_eq!(update.turn, Side::First);
            assert_eq!(update.board.get(Coord::new(7, 1)), Some(6));
        },
        _ => unreachable!(),
    }
    ws_expect(&mut black, |m| matches!(m, ServerMessage::GameReset(_))).await;
}

#[tokio::test]
async fn non_host_role_change_is_ignored() {
    let server = TestServer::new().await;
    let (mut a, mut b) = duel(&server, "R1", GameMode::Gomoku, 15).await;

    let msg = ClientMessage::SetPlayerRole(SetPlayerRoleMsg {
        room_key: "R1".to_string(),
        target_id: 1,
        role: Role::Spectator,
    });
    ws_send_client_msg(&mut b, &msg).await;

    assert!(ws_try_read_raw(&mut a, 200).await.is_none());
    assert!(ws_try_read_raw(&mut b, 50).await.is_none());

    // Host still plays first.
    ws_place(&mut a, "R1", Role::First, 3, 3).await;
    ws_expect(&mut b, is_board).await;
}

#[tokio::test]
async fn join_request_accepted_by_host() {
    let server = TestServer::new().await;
    let mut host = ws_connect(&server.ws_url()).await;
    let init = ws_join(&mut host, "R2", "alice", GameMode::Go, 13).await;
    ws_drain(&mut host, 100).await;

    let mut guest = ws_connect(&server.ws_url()).await;
    let request = ClientMessage::RequestJoinRoom(RequestJoinRoomMsg {
        room_key: "r2".to_string(),
        username: "bob".to_string(),
        game_mode: Some(GameMode::Go),
    });
    ws_send_client_msg(&mut guest, &request).await;

    let requester_id = match ws_expect(&mut host, |m| {
        matches!(m, ServerMessage::JoinRequestReceived(_))
    })
    .await
    {
        ServerMessage::JoinRequestReceived(req) => {
            assert_eq!(req.username, "bob");
            assert_eq!(req.room_key, "R2");
            req.requester_id
        },
        _ => unreachable!(),
    };
    assert_ne!(requester_id, init.my_id);

    let answer = ClientMessage::RespondJoinRequest(RespondJoinRequestMsg {
        room_key: "R2".to_string(),
        requester_id,
        accept: true,
    });
    ws_send_client_msg(&mut host, &answer).await;

    match ws_expect(&mut guest, |m| matches!(m, ServerMessage::InitData(_))).await {
        ServerMessage::InitData(init) => {
            assert_eq!(init.my_id, requester_id);
            assert!(!init.is_host);
            assert_eq!(init.board_size, 13);
            assert_eq!(init.players[1].role, Role::Second);
        },
        _ => unreachable!(),
    }
}

#[tokio::test]
async fn join_request_declines() {
    let server = TestServer::new().await;
    let mut host = ws_connect(&server.ws_url()).await;
    ws_join(&mut host, "R3", "alice", GameMode::Go, 9).await;
    ws_drain(&mut host, 100).await;

    let mut guest = ws_connect(&server.ws_url()).await;
    for (key, mode) in [("NOPE", GameMode::Go), ("R3", GameMode::Xiangqi)] {
        let request = ClientMessage::RequestJoinRoom(RequestJoinRoomMsg {
            room_key: key.to_string(),
            username: "bob".to_string(),
            game_mode: Some(mode),
        });
        ws_send_client_msg(&mut guest, &request).await;
        match ws_expect(&mut guest, |_| true).await {
            ServerMessage::JoinRequestDeclined(_) => {},
            other => panic!("Expected JoinRequestDeclined, got: {other:?}"),
        }
    }
    assert!(ws_try_read_raw(&mut host, 100).await.is_none());
}

#[tokio::test]
async fn mode_mismatch_on_direct_join() {
    let server = TestServer::new().await;
    let mut a = ws_connect(&server.ws_url()).await;
    ws_join(&mut a, "R4", "alice", GameMode::Go, 9).await;

    let mut b = ws_connect(&server.ws_url()).await;
    ws_send_client_msg(
        &mut b,
        &ClientMessage::JoinRoom(JoinRoomMsg {
            room_key: "R4".to_string(),
            username: "bob".to_string(),
            game_mode: Some(GameMode::Gomoku),
            board_size: None,
        }),
    )
    .await;
    match ws_expect(&mut b, |m| matches!(m, ServerMessage::GameModeMismatch(_))).await {
        ServerMessage::GameModeMismatch(m) => {
            assert_eq!(m.required_mode, GameMode::Go);
            assert_eq!(m.required_mode_name, "Go");
        },
        _ => unreachable!(),
    }
}

#[tokio::test]
async fn undo_round_trip() {
    let server = TestServer::new().await;
    let (mut a, mut b) = duel(&server, "R5", GameMode::Gomoku, 15).await;

    ws_place(&mut a, "R5", Role::First, 7, 7).await;
    ws_expect(&mut b, is_board).await;
    ws_drain(&mut a, 100).await;
    ws_drain(&mut b, 100).await;

    ws_send_client_msg(&mut a, &ClientMessage::RequestUndo(room_ref("R5"))).await;
    ws_expect(&mut b, |m| matches!(m, ServerMessage::UndoRequested(_))).await;

    let accept = ClientMessage::ConfirmUndo(ConfirmMsg {
        room_key: "R5".to_string(),
        accept: true,
    });
    ws_send_client_msg(&mut b, &accept).await;

    match ws_expect(&mut a, is_board).await {
        ServerMessage::UpdateBoard(update) => {
            assert!(!update.is_started);
            assert_eq!(update.turn, Side::First);
            assert_eq!(update.board.get(Coord::new(7, 7)), Some(0));
        },
        _ => unreachable!(),
    }
    ws_expect(&mut a, |m| matches!(m, ServerMessage::UndoSuccess)).await;
}

#[tokio::test]
async fn reset_vote_needs_both_players() {
    let server = TestServer::new().await;
    let (mut a, mut b) = duel(&server, "R6", GameMode::Gomoku, 15).await;

    ws_place(&mut a, "R6", Role::First, 7, 7).await;
    ws_expect(&mut b, is_board).await;

    ws_send_client_msg(&mut a, &ClientMessage::RequestReset(room_ref("R6"))).await;
    match ws_expect(&mut b, |m| matches!(m, ServerMessage::ResetRequested(_))).await {
        ServerMessage::ResetRequested(req) => {
            assert_eq!(req.username, "alice");
            assert_eq!(req.role, Role::First);
        },
        _ => unreachable!(),
    }

    let accept = ClientMessage::ConfirmReset(ConfirmMsg {
        room_key: "R6".to_string(),
        accept: true,
    });
    ws_send_client_msg(&mut b, &accept).await;
    ws_expect(&mut a, |m| matches!(m, ServerMessage::GameReset(_))).await;
}

#[tokio::test]
async fn host_disconnect_transfers_host() {
    let server = TestServer::new().await;
    let (a, mut b) = duel(&server, "R7", GameMode::Gomoku, 15).await;

    drop(a);
    match ws_expect(&mut b, |m| matches!(m, ServerMessage::UpdatePlayers(_))).await {
        ServerMessage::UpdatePlayers(update) => {
            assert_eq!(update.players.len(), 1);
            assert_eq!(update.players[0].username, "bob");
            assert!(update.players[0].is_host);
        },
        _ => unreachable!(),
    }
}

#[tokio::test]
async fn host_kicks_player() {
    let server = TestServer::new().await;
    let mut a = ws_connect(&server.ws_url()).await;
    let mut b = ws_connect(&server.ws_url()).await;
    ws_join(&mut a, "R8", "alice", GameMode::Gomoku, 15).await;
    let init_b = ws_join(&mut b, "R8", "bob", GameMode::Gomoku, 15).await;
    ws_drain(&mut a, 100).await;

    let kick = ClientMessage::KickPlayer(KickPlayerMsg {
        room_key: "R8".to_string(),
        target_id: init_b.my_id,
    });
    ws_send_client_msg(&mut a, &kick).await;

    ws_expect(&mut b, |m| matches!(m, ServerMessage::Kicked(_))).await;
    match ws_expect(&mut a, |m| matches!(m, ServerMessage::UpdatePlayers(_))).await {
        ServerMessage::UpdatePlayers(update) => assert_eq!(update.players.len(), 1),
        _ => unreachable!(),
    }
}

#[tokio::test]
async fn directory_lists_seated_players() {
    let server = TestServer::new().await;
    let mut a = ws_connect(&server.ws_url()).await;
    ws_join(&mut a, "R9", "alice", GameMode::Xiangqi, 0).await;

    let (mut late, _) = tokio_tungstenite::connect_async(server.ws_url()).await.unwrap();
    match ws_read_server_msg(&mut late).await {
        ServerMessage::OnlinePlayers(dir) => {
            assert_eq!(dir.players.len(), 1);
            assert_eq!(dir.players[0].username, "alice");
            assert_eq!(dir.players[0].room_key, "R9");
            assert_eq!(dir.players[0].game_mode, GameMode::Xiangqi);
            assert_eq!(dir.players[0].role, Role::First);
        },
        other => panic!("Expected OnlinePlayers, got: {other:?}"),
    }
}

#[tokio::test]
async fn server_only_messages_are_ignored() {
    let server = TestServer::new().await;
    let (mut a, mut b) = duel(&server, "R10", GameMode::Gomoku, 15).await;

    let forged = encode_server_message(&ServerMessage::UndoSuccess).unwrap();
    a.send(Message::Binary(forged.into())).await.unwrap();
    a.send(Message::Binary(vec![0xFF, 0x00].into())).await.unwrap();
    assert!(ws_try_read_raw(&mut b, 200).await.is_none());

    // The connection is still usable.
    ws_place(&mut a, "R10", Role::First, 0, 0).await;
    ws_expect(&mut b, is_board).await;
}
