use std::time::Duration;

use serde::Deserialize;

use tabletop_core::player::MAX_USERNAME_LEN;

/// Top-level server configuration, loaded from `tabletop.toml`.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    pub listen_addr: String,
    pub web_root: String,
    pub limits: LimitsConfig,
    pub rooms: RoomsConfig,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            listen_addr: "0.0.0.0:3000".to_string(),
            web_root: "public".to_string(),
            limits: LimitsConfig::default(),
            rooms: RoomsConfig::default(),
        }
    }
}

/// Infrastructure limits (connection caps, buffer sizes, rate limits).
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct LimitsConfig {
    pub max_ws_connections: usize,
    pub ws_rate_limit_per_sec: f64,
    pub player_message_buffer: usize,
    pub max_username_len: usize,
}

impl Default for LimitsConfig {
    fn default() -> Self {
        Self {
            max_ws_connections: 200,
            ws_rate_limit_per_sec: 30.0,
            player_message_buffer: 256,
            max_username_len: MAX_USERNAME_LEN,
        }
    }
}

/// Board sizing and post-game timing.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct RoomsConfig {
    /// Used when a join omits the size or sends zero.
    pub default_board_size: usize,
    pub min_board_size: usize,
    pub max_board_size: usize,
    /// Delay before a finished game is cleared for the next one.
    pub reset_delay_ms: u64,
    pub surrender_reset_delay_ms: u64,
}

impl Default for RoomsConfig {
    fn default() -> Self {
        Self {
            default_board_size: 15,
            min_board_size: 5,
            max_board_size: 25,
            reset_delay_ms: 3000,
            surrender_reset_delay_ms: 2000,
        }
    }
}

impl RoomsConfig {
    /// Resolve a client-declared board size.
    pub fn board_size(&self, requested: Option<u32>) -> usize {
        match requested {
            None | Some(0) => self.default_board_size,
            Some(n) => (n as usize).clamp(self.min_board_size, self.max_board_size),
        }
    }

    pub fn reset_delay(&self) -> Duration {
        Duration::from_millis(self.reset_delay_ms)
    }

    pub fn surrender_reset_delay(&self) -> Duration {
        Duration::from_millis(self.surrender_reset_delay_ms)
    }
}

impl ServerConfig {
    /// Validate configuration, exiting on values the server cannot run with.
    pub fn validate(&self) {
        if self.listen_addr.parse::<std::net::SocketAddr>().is_err() {
            tracing::error!(
                addr = %self.listen_addr,
                "listen_addr is not a valid socket address"
            );
            std::process::exit(1);
        }

        if self.limits.max_ws_connections == 0 {
            tracing::error!("limits.max_ws_connections must be > 0");
            std::process::exit(1);
        }
        if self.limits.ws_rate_limit_per_sec <= 0.0 {
            tracing::error!("limits.ws_rate_limit_per_sec must be > 0");
            std::process::exit(1);
        }
        if self.limits.player_message_buffer == 0 {
            tracing::error!("limits.player_message_buffer must be > 0");
            std::process::exit(1);
        }
        if self.limits.max_username_len == 0 {
            tracing::error!("limits.max_username_len must be > 0");
            std::process::exit(1);
        }

        if self.rooms.min_board_size == 0 || self.rooms.min_board_size > self.rooms.max_board_size
        {
            tracing::error!(
                min = self.rooms.min_board_size,
                max = self.rooms.max_board_size,
                "rooms.min_board_size must be > 0 and <= rooms.max_board_size"
            );
            std::process::exit(1);
        }
        if !(self.rooms.min_board_size..=self.rooms.max_board_size)
            .contains(&self.rooms.default_board_size)
        {
            tracing::error!(
                size = self.rooms.default_board_size,
                "rooms.default_board_size must lie within the min/max bounds"
            );
            std::process::exit(1);
        }
        if self.rooms.surrender_reset_delay_ms > self.rooms.reset_delay_ms {
            tracing::warn!(
                "rooms.surrender_reset_delay_ms is longer than rooms.reset_delay_ms"
            );
        }
    }

    /// Load config from `tabletop.toml` if it exists, then apply env var overrides.
    pub fn load() -> Self {
        let mut config = match std::fs::read_to_string("tabletop.toml") {
            Ok(content) => match toml::from_str::<ServerConfig>(&content) {
                Ok(cfg) => {
                    tracing::info!("Loaded configuration from tabletop.toml");
                    cfg
                },
                Err(e) => {
                    tracing::warn!("Failed to parse tabletop.toml: {e}, using defaults");
                    ServerConfig::default()
                },
            },
            Err(_) => {
                tracing::info!("No tabletop.toml found, using defaults");
                ServerConfig::default()
            },
        };

        if let Ok(addr) = std::env::var("TABLETOP_LISTEN_ADDR")
            && !addr.is_empty()
        {
            config.listen_addr = addr;
        }
        if let Ok(root) = std::env::var("TABLETOP_WEB_ROOT")
            && !root.is_empty()
        {
            config.web_root = root;
        }
        if let Ok(val) = std::env::var("TABLETOP_MAX_WS_CONNECTIONS")
            && let Ok(n) = val.parse::<usize>()
        {
            config.limits.max_ws_connections = n;
        }
        if let Ok(val) = std::env::var("TABLETOP_WS_RATE_LIMIT")
            && let Ok(n) = val.parse::<f64>()
        {
            config.limits.ws_rate_limit_per_sec = n;
        }
        if let Ok(val) = std::env::var("TABLETOP_RESET_DELAY_MS")
            && let Ok(n) = val.parse::<u64>()
        {
            config.rooms.reset_delay_ms = n;
        }
        if let Ok(val) = std::env::var("TABLETOP_SURRENDER_RESET_DELAY_MS")
            && let Ok(n) = val.parse::<u64>()
        {
            config.rooms.surrender_reset_delay_ms = n;
        }

        config
    }
}
