use std::sync::atomic::Ordering;

use axum::Json;
use axum::extract::State;
use serde::Serialize;

use crate::error::AppError;
use crate::state::AppState;

/// Structured health check response.
#[derive(Serialize)]
pub struct HealthResponse {
    pub status: &'static str,
    pub version: &'static str,
    pub connections: ConnectionInfo,
    pub rooms: RoomInfo,
}

#[derive(Serialize)]
pub struct ConnectionInfo {
    pub websocket: usize,
}

#[derive(Serialize)]
pub struct RoomInfo {
    pub active: usize,
    pub players: usize,
}

/// Server status, connection count and room occupancy as JSON.
pub async fn health_check(State(state): State<AppState>) -> Json<HealthResponse> {
    let ws = state.ws_connection_count.load(Ordering::Relaxed);
    let stats = state.rooms.stats();

    Json(HealthResponse {
        status: "healthy",
        version: env!("CARGO_PKG_VERSION"),
        connections: ConnectionInfo { websocket: ws },
        rooms: RoomInfo {
            active: stats.rooms,
            players: stats.players,
        },
    })
}

/// Ready once at least one game mode is compiled in.
pub async fn readiness_check(State(state): State<AppState>) -> Result<&'static str, AppError> {
    if state.rooms.available_games() == 0 {
        return Err(AppError::Unavailable("no games registered".to_string()));
    }
    Ok("ready")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn health_response_serializes() {
        let resp = HealthResponse {
            status: "healthy",
            version: "0.1.0",
            connections: ConnectionInfo { websocket: 5 },
            rooms: RoomInfo {
                active: 1,
                players: 3,
            },
        };
        let json = serde_json::to_string(&resp).unwrap();
        assert!(json.contains("\"healthy\""));
        assert!(json.contains("\"websocket\":5"));
        assert!(json.contains("\"active\":1"));
    }
}
