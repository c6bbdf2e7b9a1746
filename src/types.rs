//! Basic type definitions for the chat server
//!
//! Provides newtype wrappers for type safety:
//! - `SessionId`: UUID-based unique session identifier
//! - `RoomName`: non-empty, whitespace-free room name

use uuid::Uuid;

/// Unique session identifier (newtype pattern)
///
/// Usernames are not unique, so every connected session gets its own id.
/// Implements Hash and Eq for use as HashMap keys.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SessionId(pub Uuid);

impl SessionId {
    /// Create a new random session ID
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl Default for SessionId {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Display for SessionId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Room name, the key of the room directory
///
/// Names come from whitespace-split command tokens, so they never
/// contain whitespace and are never empty.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct RoomName(String);

impl RoomName {
    /// Parse a room name from a command token
    ///
    /// Returns None for empty or whitespace-containing input.
    pub fn parse(name: &str) -> Option<Self> {
        if name.is_empty() || name.chars().any(char::is_whitespace) {
            None
        } else {
            Some(Self(name.to_string()))
        }
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for RoomName {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_session_id_unique() {
        let id1 = SessionId::new();
        let id2 = SessionId::new();
        assert_ne!(id1, id2);
    }

    #[test]
    fn test_room_name_parse() {
        assert_eq!(RoomName::parse("lobby").unwrap().as_str(), "lobby");
        assert!(RoomName::parse("").is_none());
        assert!(RoomName::parse("two words").is_none());
    }

    #[test]
    fn test_room_name_is_case_sensitive() {
        assert_ne!(RoomName::parse("Lobby"), RoomName::parse("lobby"));
    }
}
