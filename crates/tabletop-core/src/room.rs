/// Maximum accepted room key length in bytes, after normalization.
pub const MAX_ROOM_KEY_LEN: usize = 64;

/// Normalize a client-supplied room key: surrounding whitespace is dropped
/// and ASCII letters are upper-cased, so `" r1 "` and `"R1"` name the same
/// room. Returns `None` for empty, oversized, or control-character keys.
pub fn normalize_room_key(raw: &str) -> Option<String> {
    let key = raw.trim();
    if key.is_empty() || key.len() > MAX_ROOM_KEY_LEN || key.chars().any(|c| c.is_control()) {
        return None;
    }
    Some(key.to_ascii_uppercase())
}
