use serde::{Deserialize, Serialize};

/// Connection identity. Allocated by the server when a socket connects and
/// unique for the lifetime of the process.
pub type PlayerId = u64;

/// Seat assignment within a room.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(into = "u8", try_from = "u8")]
pub enum Role {
    #[default]
    Spectator,
    First,
    Second,
}

impl Role {
    /// The side this role plays for, or `None` for spectators.
    pub fn side(self) -> Option<Side> {
        match self {
            Self::Spectator => None,
            Self::First => Some(Side::First),
            Self::Second => Some(Side::Second),
        }
    }

    pub fn is_active(self) -> bool {
        self != Self::Spectator
    }
}

impl From<Role> for u8 {
    fn from(role: Role) -> u8 {
        match role {
            Role::Spectator => 0,
            Role::First => 1,
            Role::Second => 2,
        }
    }
}

impl TryFrom<u8> for Role {
    type Error = String;

    fn try_from(value: u8) -> Result<Self, Self::Error> {
        match value {
            0 => Ok(Self::Spectator),
            1 => Ok(Self::First),
            2 => Ok(Self::Second),
            other => Err(format!("invalid role: {other}")),
        }
    }
}

/// One of the two competing seats. Turn ownership is always a `Side`, which
/// keeps the "turn is never 0" invariant in the type system.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(into = "u8", try_from = "u8")]
pub enum Side {
    First,
    Second,
}

impl Side {
    pub fn opponent(self) -> Self {
        match self {
            Self::First => Self::Second,
            Self::Second => Self::First,
        }
    }

    pub fn role(self) -> Role {
        match self {
            Self::First => Role::First,
            Self::Second => Role::Second,
        }
    }

    /// Cell value used for this side's stones on Go and Gomoku boards.
    pub fn stone(self) -> u8 {
        u8::from(self)
    }
}

impl From<Side> for u8 {
    fn from(side: Side) -> u8 {
        match side {
            Side::First => 1,
            Side::Second => 2,
        }
    }
}

impl TryFrom<u8> for Side {
    type Error = String;

    fn try_from(value: u8) -> Result<Self, Self::Error> {
        match value {
            1 => Ok(Self::First),
            2 => Ok(Self::Second),
            other => Err(format!("invalid side: {other}")),
        }
    }
}

/// A connection seated in a room.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Player {
    pub id: PlayerId,
    pub username: String,
    pub role: Role,
    /// Mirrors the room's host id; kept in sync by the room.
    pub is_host: bool,
}

/// Maximum accepted username length in bytes.
pub const MAX_USERNAME_LEN: usize = 32;

/// Trim a client-supplied username and reject empty, oversized, or
/// control-character names.
pub fn sanitize_username(raw: &str, max_len: usize) -> Option<String> {
    let name = raw.trim();
    if name.is_empty() || name.len() > max_len || name.chars().any(|c| c.is_control()) {
        return None;
    }
    Some(name.to_string())
}
