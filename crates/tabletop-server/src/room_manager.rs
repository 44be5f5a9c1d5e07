use std::collections::BTreeMap;
use std::collections::btree_map::Entry;
use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError, RwLock, RwLockReadGuard, RwLockWriteGuard};

use bytes::Bytes;
use tokio::sync::mpsc;
use tokio::task::AbortHandle;
use uuid::Uuid;

use tabletop_core::game_mode::GameMode;
use tabletop_core::net::messages::{
    ClientMessage, JoinRequestDeclinedMsg, JoinRoomMsg, OnlinePlayersMsg,
    RequestJoinRoomMsg, ServerMessage,
};
use tabletop_core::net::protocol::encode_server_message;
use tabletop_core::player::{PlayerId, sanitize_username};
use tabletop_core::room::normalize_room_key;

use crate::config::{RoomsConfig, ServerConfig};
use crate::game_registry::ServerGameRegistry;
use crate::room::{Dispatch, ResetKind, Room, resolve_action};

/// Per-player sender for outbound WebSocket binary messages.
/// Bounded by `limits.player_message_buffer` so a slow client cannot grow
/// memory without limit. Uses `Bytes` for zero-copy cloning when
/// broadcasting to several players.
pub type PlayerSender = mpsc::Sender<Bytes>;

/// Tracks a connected player's outbound channel.
struct ConnectedPlayer {
    sender: PlayerSender,
}

struct RoomEntry {
    room: Room,
    /// Identity of this incarnation of the key. A delayed reset only fires
    /// against the room it was scheduled for.
    epoch: Uuid,
    /// Pending post-game reset.
    reset_task: Option<AbortHandle>,
}

type RoomSlot = Arc<Mutex<RoomEntry>>;

/// Snapshot counters for the health endpoint.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RoomStats {
    pub rooms: usize,
    pub players: usize,
}

/// Owns every room and every live connection.
///
/// Each room sits behind its own mutex so unrelated rooms never wait on
/// each other. Locks are always taken in the order room map, room,
/// connection table. Creating and deleting rooms takes the map for writing;
/// everything else only reads it.
pub struct RoomManager {
    rooms: RwLock<BTreeMap<String, RoomSlot>>,
    connections: RwLock<HashMap<PlayerId, ConnectedPlayer>>,
    next_player_id: AtomicU64,
    registry: ServerGameRegistry,
    settings: RoomsConfig,
    max_username_len: usize,
}

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

fn read<T>(lock: &RwLock<T>) -> RwLockReadGuard<'_, T> {
    lock.read().unwrap_or_else(PoisonError::into_inner)
}

fn write<T>(lock: &RwLock<T>) -> RwLockWriteGuard<'_, T> {
    lock.write().unwrap_or_else(PoisonError::into_inner)
}

fn encode(msg: &ServerMessage) -> Option<Bytes> {
    match encode_server_message(msg) {
        Ok(data) => Some(Bytes::from(data)),
        Err(e) => {
            tracing::error!(error = %e, "Failed to encode server message");
            None
        },
    }
}

fn push(connections: &HashMap<PlayerId, ConnectedPlayer>, player_id: PlayerId, data: Bytes) {
    if let Some(conn) = connections.get(&player_id)
        && let Err(e) = conn.sender.try_send(data)
    {
        tracing::debug!(player_id, error = %e, "Skipping message to slow client");
    }
}

impl RoomManager {
    pub fn new(registry: ServerGameRegistry, config: &ServerConfig) -> Self {
        Self {
            rooms: RwLock::new(BTreeMap::new()),
            connections: RwLock::new(HashMap::new()),
            next_player_id: AtomicU64::new(1),
            registry,
            settings: config.rooms.clone(),
            max_username_len: config.limits.max_username_len,
        }
    }

    /// Number of game modes this build can host.
    pub fn available_games(&self) -> usize {
        self.registry.available_games()
    }

    // ================================================================
    // Connections
    // ================================================================

    /// Register a new connection and send it the current directory.
    pub fn connect(&self, sender: PlayerSender) -> PlayerId {
        let player_id = self.next_player_id.fetch_add(1, Ordering::Relaxed);
        write(&self.connections).insert(player_id, ConnectedPlayer { sender });
        tracing::debug!(player_id, "Connection registered");
        self.send_to(player_id, &self.directory());
        player_id
    }

    /// Remove a connection and everything it was part of: memberships,
    /// pending join requests and open negotiations. Rooms left empty are
    /// deleted along with any scheduled reset.
    pub fn disconnect(&self, player_id: PlayerId) {
        write(&self.connections).remove(&player_id);

        let mut left_any = false;
        {
            let mut rooms = write(&self.rooms);
            let mut emptied = Vec::new();
            for (key, slot) in rooms.iter() {
                let mut entry = lock(slot);
                entry.room.drop_pending(player_id);
                if !entry.room.is_member(player_id) {
                    continue;
                }
                let out = entry.room.leave(player_id);
                self.deliver(&entry.room, out);
                left_any = true;
                if entry.room.is_empty() {
                    if let Some(task) = entry.reset_task.take() {
                        task.abort();
                    }
                    emptied.push(key.clone());
                }
            }
            for key in emptied {
                rooms.remove(&key);
                tracing::info!(room = %key, "Room closed");
            }
        }
        tracing::debug!(player_id, "Connection removed");
        if left_any {
            self.broadcast_directory();
        }
    }

    pub fn is_online(&self, player_id: PlayerId) -> bool {
        read(&self.connections).contains_key(&player_id)
    }

    pub fn connection_count(&self) -> usize {
        read(&self.connections).len()
    }

    pub fn stats(&self) -> RoomStats {
        let rooms = read(&self.rooms);
        let players = rooms
            .values()
            .map(|slot| lock(slot).room.players().len())
            .sum();
        RoomStats {
            rooms: rooms.len(),
            players,
        }
    }

    // ================================================================
    // Outbound
    // ================================================================

    fn send_to(&self, player_id: PlayerId, msg: &ServerMessage) {
        if let Some(data) = encode(msg) {
            push(&read(&self.connections), player_id, data);
        }
    }

    /// Send a room operation's messages while the room is still locked, so
    /// broadcasts reach exactly the members at send time.
    fn deliver(&self, room: &Room, out: Vec<Dispatch>) -> Vec<ResetKind> {
        let mut resets = Vec::new();
        let connections = read(&self.connections);
        for dispatch in out {
            match dispatch {
                Dispatch::ToPlayer(player_id, msg) => {
                    if let Some(data) = encode(&msg) {
                        push(&connections, player_id, data);
                    }
                },
                Dispatch::ToRoom(msg) => {
                    if let Some(data) = encode(&msg) {
                        for player in room.players() {
                            push(&connections, player.id, data.clone());
                        }
                    }
                },
                Dispatch::ScheduleReset(kind) => resets.push(kind),
                // Collected by the caller.
                Dispatch::Directory => {},
            }
        }
        resets
    }

    /// Every seated player across all rooms, grouped by room key.
    pub fn directory(&self) -> ServerMessage {
        let rooms = read(&self.rooms);
        let players = rooms
            .values()
            .flat_map(|slot| lock(slot).room.directory_entries().collect::<Vec<_>>())
            .collect();
        ServerMessage::OnlinePlayers(OnlinePlayersMsg { players })
    }

    fn broadcast_directory(&self) {
        let Some(data) = encode(&self.directory()) else {
            return;
        };
        for (&player_id, conn) in read(&self.connections).iter() {
            if let Err(e) = conn.sender.try_send(data.clone()) {
                tracing::debug!(player_id, error = %e, "Skipping directory to slow client");
            }
        }
    }

    // ================================================================
    // Inbound
    // ================================================================

    /// Route one decoded client message.
    pub fn handle_message(self: &Arc<Self>, player_id: PlayerId, msg: ClientMessage) {
        match msg {
            ClientMessage::JoinRoom(m) => self.join(player_id, m),
            ClientMessage::RequestJoinRoom(m) => self.request_join(player_id, m),
            ClientMessage::SetPlayerRole(m) => {
                self.with_room(&m.room_key, |room| {
                    room.set_role(player_id, m.target_id, m.role)
                });
            },
            ClientMessage::Pass(m) => {
                self.with_room(&m.room_key, |room| room.pass(player_id));
            },
            ClientMessage::MakeMove(m) => {
                let action = resolve_action(&m);
                self.with_room(&m.room_key, |room| {
                    room.make_move(player_id, m.role, action)
                });
            },
            ClientMessage::RequestUndo(m) => {
                self.with_room(&m.room_key, |room| room.request_undo(player_id));
            },
            ClientMessage::ConfirmUndo(m) => {
                self.with_room(&m.room_key, |room| room.confirm_undo(player_id, m.accept));
            },
            ClientMessage::Surrender(m) => {
                self.with_room(&m.room_key, |room| room.surrender(player_id));
            },
            ClientMessage::RequestReset(m) => {
                self.with_room(&m.room_key, |room| room.request_reset(player_id));
            },
            ClientMessage::ConfirmReset(m) => {
                self.with_room(&m.room_key, |room| room.confirm_reset(player_id, m.accept));
            },
            ClientMessage::RespondJoinRequest(m) => {
                let online = self.is_online(m.requester_id);
                self.with_room(&m.room_key, |room| {
                    room.respond_join(player_id, m.requester_id, m.accept, online)
                });
            },
            ClientMessage::KickPlayer(m) => {
                self.with_room(&m.room_key, |room| room.kick(player_id, m.target_id));
            },
        }
    }

    /// Run `op` against an existing room. Returns false, doing nothing, when
    /// the key names no room.
    fn with_room(
        self: &Arc<Self>,
        raw_key: &str,
        op: impl FnOnce(&mut Room) -> Vec<Dispatch>,
    ) -> bool {
        let Some(key) = normalize_room_key(raw_key) else {
            return false;
        };
        let directory = {
            let rooms = read(&self.rooms);
            let Some(slot) = rooms.get(&key) else {
                tracing::debug!(room = %key, "Message for unknown room");
                return false;
            };
            let mut entry = lock(slot);
            let out = op(&mut entry.room);
            self.settle(&mut entry, out)
        };
        if directory {
            self.broadcast_directory();
        }
        true
    }

    /// Deliver `out` and arm any reset it asked for. Caller holds the room.
    /// Returns whether the directory needs re-sending once it is released.
    fn settle(self: &Arc<Self>, entry: &mut RoomEntry, out: Vec<Dispatch>) -> bool {
        let directory = out.contains(&Dispatch::Directory);
        for kind in self.deliver(&entry.room, out) {
            self.schedule_reset(entry, kind);
        }
        directory
    }

    fn join(self: &Arc<Self>, player_id: PlayerId, msg: JoinRoomMsg) {
        let Some(key) = normalize_room_key(&msg.room_key) else {
            tracing::debug!(player_id, "Ignoring join with an invalid room key");
            return;
        };
        let Some(username) = sanitize_username(&msg.username, self.max_username_len) else {
            tracing::debug!(player_id, "Ignoring join with an invalid username");
            return;
        };
        let mode = msg.game_mode.unwrap_or_default();

        let directory = {
            let mut rooms = write(&self.rooms);
            let slot = match rooms.entry(key.clone()) {
                Entry::Occupied(e) => Arc::clone(e.get()),
                Entry::Vacant(v) => {
                    let Some(engine) = self.registry.create(mode) else {
                        tracing::debug!(
                            player_id,
                            %mode,
                            "Ignoring join for an unregistered mode"
                        );
                        return;
                    };
                    let size = self.settings.board_size(msg.board_size);
                    tracing::info!(room = %key, %mode, size, "Room created");
                    let entry = RoomEntry {
                        room: Room::new(key, size, engine, player_id),
                        epoch: Uuid::new_v4(),
                        reset_task: None,
                    };
                    Arc::clone(v.insert(Arc::new(Mutex::new(entry))))
                },
            };
            let mut entry = lock(&slot);
            let out = entry.room.join(player_id, username, mode);
            self.settle(&mut entry, out)
        };
        if directory {
            self.broadcast_directory();
        }
    }

    fn request_join(self: &Arc<Self>, player_id: PlayerId, msg: RequestJoinRoomMsg) {
        let Some(username) = sanitize_username(&msg.username, self.max_username_len) else {
            self.send_to(player_id, &declined("Invalid username"));
            return;
        };
        let mode = msg.game_mode.unwrap_or_default();
        let found = self.with_room(&msg.room_key, |room| {
            let host_online = self.is_online(room.host_id());
            room.request_join(player_id, username, mode, host_online)
        });
        if !found {
            self.send_to(player_id, &declined("The room does not exist"));
        }
    }

    // ================================================================
    // Post-game reset
    // ================================================================

    fn schedule_reset(self: &Arc<Self>, entry: &mut RoomEntry, kind: ResetKind) {
        let delay = match kind {
            ResetKind::Finished => self.settings.reset_delay(),
            ResetKind::Surrender => self.settings.surrender_reset_delay(),
        };
        let manager = Arc::clone(self);
        let key = entry.room.key().to_string();
        let epoch = entry.epoch;
        let task = tokio::spawn(async move {
            tokio::time::sleep(delay).await;
            manager.complete_scheduled_reset(&key, epoch, kind);
        });
        if let Some(previous) = entry.reset_task.replace(task.abort_handle()) {
            previous.abort();
        }
        tracing::info!(room = %entry.room.key(), ?kind, ?delay, "Game over, reset scheduled");
    }

    /// Fire a delayed reset. The room is looked up again by key; a deleted
    /// or re-created room is left alone.
    fn complete_scheduled_reset(&self, key: &str, epoch: Uuid, kind: ResetKind) {
        let rooms = read(&self.rooms);
        let Some(slot) = rooms.get(key) else {
            tracing::debug!(room = key, "Scheduled reset for a closed room");
            return;
        };
        let mut entry = lock(slot);
        if entry.epoch != epoch {
            tracing::debug!(room = key, "Scheduled reset for a replaced room");
            return;
        }
        entry.reset_task = None;
        let out = entry.room.complete_reset(kind);
        if !out.is_empty() {
            tracing::info!(room = key, "Board reset");
        }
        self.deliver(&entry.room, out);
    }
}

fn declined(reason: &str) -> ServerMessage {
    ServerMessage::JoinRequestDeclined(JoinRequestDeclinedMsg {
        reason: reason.to_string(),
    })
}
