use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};

use crate::config::ServerConfig;
use crate::game_registry::ServerGameRegistry;
use crate::room_manager::RoomManager;

#[derive(Clone)]
pub struct AppState {
    pub rooms: Arc<RoomManager>,
    pub ws_connection_count: Arc<AtomicUsize>,
    pub config: Arc<ServerConfig>,
}

impl AppState {
    pub fn new(config: ServerConfig) -> Self {
        let rooms = RoomManager::new(ServerGameRegistry::new(), &config);
        Self {
            rooms: Arc::new(rooms),
            ws_connection_count: Arc::new(AtomicUsize::new(0)),
            config: Arc::new(config),
        }
    }
}

/// Counts a live WebSocket connection for as long as it is held.
pub struct ConnectionGuard {
    counter: Arc<AtomicUsize>,
}

impl ConnectionGuard {
    pub fn new(counter: Arc<AtomicUsize>) -> Self {
        counter.fetch_add(1, Ordering::Relaxed);
        Self { counter }
    }
}

impl Drop for ConnectionGuard {
    fn drop(&mut self) {
        self.counter.fetch_sub(1, Ordering::Relaxed);
    }
}
