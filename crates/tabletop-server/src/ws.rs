use std::sync::Arc;
use std::sync::atomic::Ordering;

use axum::extract::ws::{Message, WebSocket};
use axum::extract::{State, WebSocketUpgrade};
use axum::response::{IntoResponse, Response};
use bytes::Bytes;
use futures::{SinkExt, StreamExt};
use tokio::sync::mpsc;

use tabletop_core::net::protocol::{MAX_MESSAGE_SIZE, decode_client_message, decode_message_type};
use tabletop_core::player::PlayerId;

use crate::error::AppError;
use crate::state::{AppState, ConnectionGuard};

pub async fn ws_handler(
    State(state): State<AppState>,
    ws: WebSocketUpgrade,
) -> Result<Response, AppError> {
    let max_ws = state.config.limits.max_ws_connections;
    let current = state.ws_connection_count.load(Ordering::Relaxed);
    if current >= max_ws {
        tracing::warn!(current, max = max_ws, "WS connection limit reached");
        return Err(AppError::Unavailable(
            "Too many connections, try again later".to_string(),
        ));
    }

    Ok(ws
        .max_message_size(MAX_MESSAGE_SIZE)
        .on_upgrade(move |socket| handle_socket(socket, state))
        .into_response())
}

async fn handle_socket(socket: WebSocket, state: AppState) {
    let _guard = ConnectionGuard::new(Arc::clone(&state.ws_connection_count));
    let (ws_sender, mut ws_receiver) = socket.split();

    let (tx, rx) = mpsc::channel::<Bytes>(state.config.limits.player_message_buffer);
    let player_id = state.rooms.connect(tx);
    tracing::info!(player_id, "Player connected");

    spawn_writer(ws_sender, rx);

    read_loop(&mut ws_receiver, &state, player_id).await;

    // Leaving every room also settles any negotiation the player was part of.
    state.rooms.disconnect(player_id);
    tracing::info!(player_id, "Player disconnected");
}

fn spawn_writer(
    mut ws_sender: futures::stream::SplitSink<WebSocket, Message>,
    mut rx: mpsc::Receiver<Bytes>,
) {
    tokio::spawn(async move {
        while let Some(data) = rx.recv().await {
            if ws_sender.send(Message::Binary(data)).await.is_err() {
                break;
            }
        }
    });
}

/// Per-connection rate limiter (token bucket).
struct RateLimiter {
    tokens: f64,
    last_refill: tokio::time::Instant,
    max_tokens: f64,
    refill_rate: f64, // tokens per second
}

impl RateLimiter {
    fn new(max_tokens: f64, refill_rate: f64) -> Self {
        Self {
            tokens: max_tokens,
            last_refill: tokio::time::Instant::now(),
            max_tokens,
            refill_rate,
        }
    }

    /// Returns true if the message is allowed; false if rate-limited.
    fn allow(&mut self) -> bool {
        let now = tokio::time::Instant::now();
        let elapsed = now.duration_since(self.last_refill).as_secs_f64();
        self.tokens = (self.tokens + elapsed * self.refill_rate).min(self.max_tokens);
        self.last_refill = now;

        if self.tokens >= 1.0 {
            self.tokens -= 1.0;
            true
        } else {
            false
        }
    }
}

async fn read_loop(
    ws_receiver: &mut futures::stream::SplitStream<WebSocket>,
    state: &AppState,
    player_id: PlayerId,
) {
    let rate = state.config.limits.ws_rate_limit_per_sec;
    let mut rate_limiter = RateLimiter::new(rate, rate);

    while let Some(Ok(msg)) = ws_receiver.next().await {
        let data = match msg {
            Message::Binary(d) => d,
            Message::Close(_) => break,
            _ => continue,
        };

        if !rate_limiter.allow() {
            tracing::warn!(player_id, "Rate limited");
            continue;
        }

        if data.is_empty() || data.len() > MAX_MESSAGE_SIZE {
            continue;
        }

        let msg_type = match decode_message_type(&data) {
            Ok(t) => t,
            Err(e) => {
                tracing::debug!(player_id, error = %e, "Unreadable message type");
                continue;
            },
        };

        if msg_type.is_server_only() {
            tracing::warn!(player_id, ?msg_type, "Rejected server-only message from client");
            continue;
        }

        match decode_client_message(&data) {
            Ok(client_msg) => state.rooms.handle_message(player_id, client_msg),
            Err(e) => {
                tracing::debug!(player_id, ?msg_type, error = %e, "Malformed client message");
            },
        }
    }
}
