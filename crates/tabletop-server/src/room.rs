use std::collections::{BTreeMap, BTreeSet};

use tabletop_core::game_mode::GameMode;
use tabletop_core::game_state::GameState;
use tabletop_core::game_trait::{Action, Outcome, RuleEngine};
use tabletop_core::net::messages::{
    ErrorMsg, GameModeMismatchMsg, GameOverMsg, GameResetMsg, InitDataMsg,
    JoinRequestDeclinedMsg, JoinRequestReceivedMsg, KickedMsg, MakeMoveMsg, OnlinePlayer,
    PlayerPassedMsg, ResetRequestedMsg, ServerMessage, UndoRequestedMsg, UpdateBoardMsg,
    UpdatePlayersMsg,
};
use tabletop_core::board::Coord;
use tabletop_core::player::{Player, PlayerId, Role, Side};

/// Side effects of a room operation, delivered by the room manager once the
/// operation has finished mutating state.
#[derive(Debug, Clone, PartialEq)]
pub enum Dispatch {
    /// Unicast to one connection.
    ToPlayer(PlayerId, ServerMessage),
    /// Broadcast to every current member of the room.
    ToRoom(ServerMessage),
    /// Re-send the global directory of seated players.
    Directory,
    /// Start the delayed post-game reset.
    ScheduleReset(ResetKind),
}

/// Why a finished game is waiting to be cleared.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ResetKind {
    Finished,
    Surrender,
}

impl ResetKind {
    pub fn message(self) -> &'static str {
        match self {
            Self::Finished => "Game over. The board has been reset and roles swapped.",
            Self::Surrender => "Your opponent surrendered. Roles have been swapped!",
        }
    }
}

const MANUAL_RESET_MESSAGE: &str = "The board has been reset";

#[derive(Debug, Clone, PartialEq, Eq)]
struct PendingJoin {
    username: String,
}

/// Map a move payload onto an engine action. A destination square makes
/// it a piece move; otherwise it is a placement.
pub fn resolve_action(msg: &MakeMoveMsg) -> Action {
    let from = Coord::new(msg.row as usize, msg.col as usize);
    match (msg.target_row, msg.target_col) {
        (Some(row), Some(col)) => Action::Shift {
            from,
            to: Coord::new(row as usize, col as usize),
        },
        _ => Action::Place { at: from },
    }
}

/// One authoritative game session: seating, turn order, the rule engine
/// and the undo/reset/join negotiations layered on top of it.
///
/// Every operation validates its caller and returns the messages it wants
/// sent. An empty list is a silent rejection.
pub struct Room {
    key: String,
    mode: GameMode,
    board_size: usize,
    engine: Box<dyn RuleEngine>,
    game: GameState,
    players: Vec<Player>,
    host_id: PlayerId,
    reset_votes: BTreeSet<PlayerId>,
    undo_requester: Option<PlayerId>,
    game_over: bool,
    pending_requests: BTreeMap<PlayerId, PendingJoin>,
}

impl Room {
    pub fn new(
        key: String,
        board_size: usize,
        engine: Box<dyn RuleEngine>,
        creator: PlayerId,
    ) -> Self {
        let game = GameState::new(engine.new_board(board_size));
        let board_size = if engine.mode().has_fixed_board() {
            game.board.cols()
        } else {
            board_size
        };
        Self {
            key,
            mode: engine.mode(),
            board_size,
            engine,
            game,
            players: Vec::new(),
            host_id: creator,
            reset_votes: BTreeSet::new(),
            undo_requester: None,
            game_over: false,
            pending_requests: BTreeMap::new(),
        }
    }

    pub fn key(&self) -> &str {
        &self.key
    }

    pub fn mode(&self) -> GameMode {
        self.mode
    }

    pub fn players(&self) -> &[Player] {
        &self.players
    }

    pub fn host_id(&self) -> PlayerId {
        self.host_id
    }

    pub fn game(&self) -> &GameState {
        &self.game
    }

    pub fn is_game_over(&self) -> bool {
        self.game_over
    }

    pub fn is_empty(&self) -> bool {
        self.players.is_empty()
    }

    pub fn is_member(&self, id: PlayerId) -> bool {
        self.player(id).is_some()
    }

    pub fn has_pending_request(&self, id: PlayerId) -> bool {
        self.pending_requests.contains_key(&id)
    }

    pub fn undo_requester(&self) -> Option<PlayerId> {
        self.undo_requester
    }

    pub fn reset_votes(&self) -> impl Iterator<Item = PlayerId> + '_ {
        self.reset_votes.iter().copied()
    }

    fn player(&self, id: PlayerId) -> Option<&Player> {
        self.players.iter().find(|p| p.id == id)
    }

    fn player_mut(&mut self, id: PlayerId) -> Option<&mut Player> {
        self.players.iter_mut().find(|p| p.id == id)
    }

    fn holder_of(&self, side: Side) -> Option<&Player> {
        let role = side.role();
        self.players.iter().find(|p| p.role == role)
    }

    /// Active members other than `id`.
    fn other_active(&self, id: PlayerId) -> impl Iterator<Item = &Player> + '_ {
        self.players
            .iter()
            .filter(move |p| p.role.is_active() && p.id != id)
    }

    fn active_count(&self) -> usize {
        self.players.iter().filter(|p| p.role.is_active()).count()
    }

    /// First free side, or spectator once both are taken.
    fn next_free_role(&self) -> Role {
        if self.active_count() >= 2 {
            return Role::Spectator;
        }
        if self.players.iter().any(|p| p.role == Role::First) {
            Role::Second
        } else {
            Role::First
        }
    }

    // ================================================================
    // Snapshots
    // ================================================================

    pub fn roster(&self) -> ServerMessage {
        ServerMessage::UpdatePlayers(UpdatePlayersMsg {
            players: self.players.clone(),
        })
    }

    pub fn board_update(&self) -> ServerMessage {
        ServerMessage::UpdateBoard(Box::new(UpdateBoardMsg {
            board: self.game.board.clone(),
            turn: self.game.turn,
            last_move: self.game.last_move,
            is_started: self.game.is_started(),
            captured_stones: self
                .engine
                .tracks_captures()
                .then_some(self.game.captures),
        }))
    }

    fn init_data(&self, id: PlayerId) -> ServerMessage {
        ServerMessage::InitData(Box::new(InitDataMsg {
            my_id: id,
            room_key: self.key.clone(),
            game_mode: self.mode,
            board_size: self.board_size as u32,
            players: self.players.clone(),
            board: self.game.board.clone(),
            last_move: self.game.last_move,
            turn: self.game.turn,
            is_host: self.host_id == id,
            is_started: self.game.is_started(),
        }))
    }

    /// This room's rows in the global directory.
    pub fn directory_entries(&self) -> impl Iterator<Item = OnlinePlayer> + '_ {
        self.players.iter().map(|p| OnlinePlayer {
            username: p.username.clone(),
            room_key: self.key.clone(),
            game_mode: self.mode,
            game_mode_name: self.mode.display_name().to_string(),
            role: p.role,
        })
    }

    fn mode_mismatch(&self) -> ServerMessage {
        ServerMessage::GameModeMismatch(GameModeMismatchMsg {
            required_mode: self.mode,
            required_mode_name: self.mode.display_name().to_string(),
        })
    }

    // ================================================================
    // Membership
    // ================================================================

    /// Direct join. Rejoining is idempotent; the snapshot is sent again.
    pub fn join(&mut self, id: PlayerId, username: String, mode: GameMode) -> Vec<Dispatch> {
        if mode != self.mode {
            return vec![Dispatch::ToPlayer(id, self.mode_mismatch())];
        }
        self.pending_requests.remove(&id);
        if self.players.is_empty() {
            self.host_id = id;
        }
        if !self.is_member(id) {
            self.seat(id, username);
        }
        self.welcome(id)
    }

    fn seat(&mut self, id: PlayerId, username: String) {
        let role = self.next_free_role();
        tracing::info!(player_id = id, room = %self.key, ?role, "Player seated");
        self.players.push(Player {
            id,
            username,
            role,
            is_host: self.host_id == id,
        });
    }

    fn welcome(&self, id: PlayerId) -> Vec<Dispatch> {
        vec![
            Dispatch::ToPlayer(id, self.init_data(id)),
            Dispatch::ToRoom(self.roster()),
            Dispatch::ToPlayer(id, self.board_update()),
            Dispatch::Directory,
        ]
    }

    /// Host-only seat change, allowed until the first move.
    pub fn set_role(&mut self, requester: PlayerId, target: PlayerId, role: Role) -> Vec<Dispatch> {
        if requester != self.host_id {
            tracing::debug!(player_id = requester, room = %self.key, "Role change from non-host");
            return Vec::new();
        }
        if self.game.is_started() {
            return vec![Dispatch::ToPlayer(
                requester,
                error_msg("The game is in progress; roles cannot be changed"),
            )];
        }
        if !self.is_member(target) {
            return Vec::new();
        }
        if role.is_active() {
            for p in &mut self.players {
                if p.role == role && p.id != target {
                    p.role = Role::Spectator;
                }
            }
        }
        if let Some(p) = self.player_mut(target) {
            p.role = role;
        }
        vec![Dispatch::ToRoom(self.roster()), Dispatch::Directory]
    }

    /// Host removes another member.
    pub fn kick(&mut self, requester: PlayerId, target: PlayerId) -> Vec<Dispatch> {
        if requester != self.host_id || requester == target || !self.is_member(target) {
            return Vec::new();
        }
        let mut out = vec![Dispatch::ToPlayer(
            target,
            ServerMessage::Kicked(KickedMsg {
                reason: "You were removed from the room by the host".to_string(),
            }),
        )];
        out.extend(self.leave(target));
        out.push(Dispatch::Directory);
        out
    }

    /// Remove a member and settle everything that depended on them: open
    /// negotiations are treated as declined, host authority moves to the
    /// first remaining player and pending join requests follow it.
    pub fn leave(&mut self, id: PlayerId) -> Vec<Dispatch> {
        self.pending_requests.remove(&id);
        let Some(index) = self.players.iter().position(|p| p.id == id) else {
            return Vec::new();
        };
        let departed = self.players.remove(index);
        let mut out = Vec::new();

        match self.undo_requester {
            Some(requester) if requester == id => self.undo_requester = None,
            Some(requester) if departed.role.is_active() => {
                self.undo_requester = None;
                out.push(Dispatch::ToPlayer(requester, ServerMessage::UndoDeclined));
            },
            _ => {},
        }

        if departed.role.is_active() && !self.reset_votes.is_empty() {
            self.reset_votes.remove(&id);
            for voter in std::mem::take(&mut self.reset_votes) {
                out.push(Dispatch::ToPlayer(voter, ServerMessage::ResetDeclined));
            }
        }

        if self.players.is_empty() {
            return out;
        }

        if self.host_id == id {
            self.host_id = self.players[0].id;
            self.players[0].is_host = true;
            tracing::info!(room = %self.key, new_host = self.host_id, "Host transferred");
            for (&requester_id, request) in &self.pending_requests {
                out.push(Dispatch::ToPlayer(
                    self.host_id,
                    self.join_request_notice(requester_id, &request.username),
                ));
            }
        }

        out.push(Dispatch::ToRoom(self.roster()));
        out
    }

    /// Forget a pending join request from a departed connection.
    pub fn drop_pending(&mut self, id: PlayerId) {
        self.pending_requests.remove(&id);
    }

    // ================================================================
    // Join approval
    // ================================================================

    fn join_request_notice(&self, requester_id: PlayerId, username: &str) -> ServerMessage {
        ServerMessage::JoinRequestReceived(JoinRequestReceivedMsg {
            requester_id,
            username: username.to_string(),
            room_key: self.key.clone(),
        })
    }

    /// Queue a request for the host's approval. `host_online` reports
    /// whether the host still has a live connection.
    pub fn request_join(
        &mut self,
        id: PlayerId,
        username: String,
        mode: GameMode,
        host_online: bool,
    ) -> Vec<Dispatch> {
        let reason = if mode != self.mode {
            Some(format!(
                "Game mode mismatch: this room plays {}",
                self.mode.display_name()
            ))
        } else if self.is_member(id) {
            Some("You are already in this room".to_string())
        } else if self.pending_requests.contains_key(&id) {
            Some("Your request is already waiting for approval".to_string())
        } else if !host_online {
            Some("The host is not online".to_string())
        } else {
            None
        };
        if let Some(reason) = reason {
            return vec![Dispatch::ToPlayer(id, join_declined(reason))];
        }

        let notice = self.join_request_notice(id, &username);
        self.pending_requests.insert(id, PendingJoin { username });
        vec![Dispatch::ToPlayer(self.host_id, notice)]
    }

    /// Host's answer to a queued request. `requester_online` reports whether
    /// the requester is still connected.
    pub fn respond_join(
        &mut self,
        host: PlayerId,
        requester: PlayerId,
        accept: bool,
        requester_online: bool,
    ) -> Vec<Dispatch> {
        if host != self.host_id {
            return Vec::new();
        }
        let Some(request) = self.pending_requests.remove(&requester) else {
            return Vec::new();
        };
        if !requester_online || self.is_member(requester) {
            return Vec::new();
        }
        if !accept {
            return vec![Dispatch::ToPlayer(
                requester,
                join_declined("The host declined your request to join".to_string()),
            )];
        }
        self.seat(requester, request.username);
        self.welcome(requester)
    }

    // ================================================================
    // Turn dispatch
    // ================================================================

    /// Apply a move claimed by `id` playing as `role`.
    pub fn make_move(&mut self, id: PlayerId, role: Role, action: Action) -> Vec<Dispatch> {
        if self.game_over {
            return Vec::new();
        }
        let Some(player) = self.player(id) else {
            return Vec::new();
        };
        if player.role != role || role.side() != Some(self.game.turn) {
            tracing::debug!(player_id = id, room = %self.key, "Move out of turn");
            return Vec::new();
        }
        self.apply(id, action)
    }

    /// Give up the turn (capture game only; other engines refuse).
    pub fn pass(&mut self, id: PlayerId) -> Vec<Dispatch> {
        let Some(role) = self.player(id).map(|p| p.role) else {
            return Vec::new();
        };
        self.make_move(id, role, Action::Pass)
    }

    fn apply(&mut self, id: PlayerId, action: Action) -> Vec<Dispatch> {
        let side = self.game.turn;
        let outcome = match self.engine.apply(&mut self.game, side, &action) {
            Ok(outcome) => outcome,
            Err(e) => {
                tracing::debug!(player_id = id, room = %self.key, error = %e, "Move rejected");
                return e
                    .user_message()
                    .map(|text| vec![Dispatch::ToPlayer(id, error_msg(text))])
                    .unwrap_or_default();
            },
        };

        let mut out = vec![Dispatch::ToRoom(self.board_update())];
        if action == Action::Pass {
            let username = self
                .player(id)
                .map(|p| p.username.clone())
                .unwrap_or_default();
            out.push(Dispatch::ToRoom(ServerMessage::PlayerPassed(
                PlayerPassedMsg { username },
            )));
        } else if self.mode == GameMode::Gomoku && self.game.history.len() == 1 {
            out.push(Dispatch::ToRoom(self.roster()));
        }
        if let Some(outcome) = outcome {
            out.extend(self.finish(&outcome));
        }
        out
    }

    // ================================================================
    // Game end
    // ================================================================

    fn winner_name(&self, side: Side) -> String {
        self.holder_of(side).map_or_else(
            || self.mode.side_name(side).to_string(),
            |p| p.username.clone(),
        )
    }

    fn finish(&mut self, outcome: &Outcome) -> Vec<Dispatch> {
        let winner = outcome.winner();
        let (win_line, score) = match outcome {
            Outcome::Line { line, .. } => (Some(line.clone()), None),
            Outcome::Scored { score, .. } => (None, Some(*score)),
            Outcome::Checkmate { .. } => (None, None),
        };
        let msg = GameOverMsg {
            winner,
            winner_name: self.winner_name(winner),
            win_line,
            score,
            is_surrender: false,
            loser_name: None,
        };
        self.end_game(msg, ResetKind::Finished)
    }

    /// Concede on behalf of an active player.
    pub fn surrender(&mut self, id: PlayerId) -> Vec<Dispatch> {
        if self.game_over {
            return Vec::new();
        }
        let Some((side, loser)) = self
            .player(id)
            .and_then(|p| p.role.side().map(|s| (s, p.username.clone())))
        else {
            return Vec::new();
        };
        let winner = side.opponent();
        let msg = GameOverMsg {
            winner,
            winner_name: self.winner_name(winner),
            win_line: None,
            score: None,
            is_surrender: true,
            loser_name: Some(loser),
        };
        self.end_game(msg, ResetKind::Surrender)
    }

    fn end_game(&mut self, msg: GameOverMsg, kind: ResetKind) -> Vec<Dispatch> {
        self.game_over = true;
        tracing::info!(
            room = %self.key,
            mode = %self.mode,
            winner = ?msg.winner,
            surrender = msg.is_surrender,
            "Game over"
        );
        for p in &mut self.players {
            p.role = match p.role {
                Role::First => Role::Second,
                Role::Second => Role::First,
                Role::Spectator => Role::Spectator,
            };
        }
        vec![
            Dispatch::ToRoom(ServerMessage::GameOver(msg)),
            Dispatch::Directory,
            Dispatch::ScheduleReset(kind),
        ]
    }

    fn reset_game(&mut self) {
        self.game = GameState::new(self.engine.new_board(self.board_size));
        self.game_over = false;
        self.reset_votes.clear();
        self.undo_requester = None;
    }

    /// The delayed reset after a finished game. A room that is no longer
    /// over has already been reset and is left alone.
    pub fn complete_reset(&mut self, kind: ResetKind) -> Vec<Dispatch> {
        if !self.game_over {
            return Vec::new();
        }
        self.reset_game();
        tracing::info!(room = %self.key, "Board reset after game");
        vec![
            Dispatch::ToRoom(self.roster()),
            Dispatch::ToRoom(self.board_update()),
            Dispatch::ToRoom(game_reset(kind.message())),
        ]
    }

    // ================================================================
    // Undo negotiation
    // ================================================================

    pub fn request_undo(&mut self, id: PlayerId) -> Vec<Dispatch> {
        if self.game_over || !self.game.is_started() {
            return Vec::new();
        }
        let Some(player) = self.player(id).filter(|p| p.role.is_active()) else {
            return Vec::new();
        };
        let username = player.username.clone();
        let opponent = self.other_active(id).next().map(|p| p.id);
        match opponent {
            Some(opponent) => {
                self.undo_requester = Some(id);
                vec![Dispatch::ToPlayer(
                    opponent,
                    ServerMessage::UndoRequested(UndoRequestedMsg { username }),
                )]
            },
            None => {
                self.undo_requester = None;
                vec![Dispatch::ToPlayer(
                    id,
                    error_msg("There is no opponent to respond to the undo request"),
                )]
            },
        }
    }

    pub fn confirm_undo(&mut self, id: PlayerId, accept: bool) -> Vec<Dispatch> {
        let Some(requester) = self.undo_requester else {
            return Vec::new();
        };
        if id == requester || self.game_over {
            return Vec::new();
        }
        if !self.player(id).is_some_and(|p| p.role.is_active()) {
            return Vec::new();
        }
        self.undo_requester = None;
        if !accept {
            return vec![Dispatch::ToPlayer(requester, ServerMessage::UndoDeclined)];
        }
        let Some(requester_side) = self.player(requester).map(|p| p.role.side()) else {
            return Vec::new();
        };

        // On the requester's own turn the opponent has replied, so both
        // moves go.
        let count = if requester_side == Some(self.game.turn) {
            2
        } else {
            1
        };
        let reverted = self.game.rewind(self.engine.as_ref(), count);
        tracing::info!(room = %self.key, reverted, "Undo accepted");
        vec![
            Dispatch::ToRoom(self.board_update()),
            Dispatch::ToRoom(ServerMessage::UndoSuccess),
        ]
    }

    // ================================================================
    // Reset negotiation
    // ================================================================

    fn manual_reset(&mut self) -> Vec<Dispatch> {
        self.reset_game();
        tracing::info!(room = %self.key, "Board reset by agreement");
        vec![
            Dispatch::ToRoom(self.board_update()),
            Dispatch::ToRoom(game_reset(MANUAL_RESET_MESSAGE)),
        ]
    }

    pub fn request_reset(&mut self, id: PlayerId) -> Vec<Dispatch> {
        if self.game_over {
            return Vec::new();
        }
        let Some(request) = self.player(id).filter(|p| p.role.is_active()).map(|p| {
            ServerMessage::ResetRequested(ResetRequestedMsg {
                role: p.role,
                username: p.username.clone(),
            })
        }) else {
            return Vec::new();
        };
        if self.active_count() < 2 {
            return self.manual_reset();
        }
        if !self.reset_votes.insert(id) {
            return Vec::new();
        }
        if self.reset_votes.len() >= self.active_count() {
            return self.manual_reset();
        }
        self.other_active(id)
            .filter(|p| !self.reset_votes.contains(&p.id))
            .map(|p| Dispatch::ToPlayer(p.id, request.clone()))
            .collect()
    }

    pub fn confirm_reset(&mut self, id: PlayerId, accept: bool) -> Vec<Dispatch> {
        if self.game_over || self.reset_votes.is_empty() || self.reset_votes.contains(&id) {
            return Vec::new();
        }
        if !self.player(id).is_some_and(|p| p.role.is_active()) {
            return Vec::new();
        }
        if !accept {
            return std::mem::take(&mut self.reset_votes)
                .into_iter()
                .map(|voter| Dispatch::ToPlayer(voter, ServerMessage::ResetDeclined))
                .collect();
        }
        self.reset_votes.insert(id);
        if self.reset_votes.len() >= self.active_count() {
            return self.manual_reset();
        }
        Vec::new()
    }
}

fn error_msg(text: &str) -> ServerMessage {
    ServerMessage::ErrorMsg(ErrorMsg {
        text: text.to_string(),
    })
}

fn join_declined(reason: String) -> ServerMessage {
    ServerMessage::JoinRequestDeclined(JoinRequestDeclinedMsg { reason })
}

fn game_reset(message: &str) -> ServerMessage {
    ServerMessage::GameReset(GameResetMsg {
        message: message.to_string(),
    })
}
