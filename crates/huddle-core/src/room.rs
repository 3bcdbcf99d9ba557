//! Room abstraction for Huddle.
//!
//! A room is a named set of registered sessions. Rooms are owned by the hub's
//! coordinator and never shared, so they need no interior locking.

use std::collections::HashMap;
use tracing::debug;

use crate::session::{Session, SessionToken};

/// Maximum room id length.
pub const MAX_ROOM_ID_LENGTH: usize = 256;

/// A room identifier.
pub type RoomId = String;

/// Validate a room id.
///
/// # Errors
///
/// Returns an error message if the room id is invalid.
pub fn validate_room_id(id: &str) -> Result<(), &'static str> {
    if id.is_empty() {
        return Err("Room id cannot be empty");
    }
    if id.len() > MAX_ROOM_ID_LENGTH {
        return Err("Room id too long");
    }
    if id.chars().any(char::is_control) {
        return Err("Room id contains control characters");
    }
    Ok(())
}

/// A room and its current members.
#[derive(Debug)]
pub struct Room {
    id: RoomId,
    name: String,
    /// Members keyed by session id.
    members: HashMap<String, Session>,
}

impl Room {
    /// Create an empty room.
    #[must_use]
    pub fn new(id: impl Into<RoomId>, name: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            members: HashMap::new(),
        }
    }

    /// Get the room id.
    #[must_use]
    pub fn id(&self) -> &str {
        &self.id
    }

    /// Get the display name.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Number of members.
    #[must_use]
    pub fn len(&self) -> usize {
        self.members.len()
    }

    /// Check if the room has no members.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.members.is_empty()
    }

    /// Check if a session id is registered.
    #[must_use]
    pub fn contains(&self, session_id: &str) -> bool {
        self.members.contains_key(session_id)
    }

    /// Add a session.
    ///
    /// A session whose id is already present is handed back untouched.
    pub fn insert(&mut self, session: Session) -> Result<(), Session> {
        let session_id = session.binding().session_id.clone();
        if self.members.contains_key(&session_id) {
            return Err(session);
        }

        debug!(room = %self.id, session = %session_id, "Session added");
        self.members.insert(session_id, session);
        Ok(())
    }

    /// Remove a session, if the registered entry carries `token`.
    ///
    /// A different connection that reused the same session id is left alone.
    pub fn remove(&mut self, session_id: &str, token: SessionToken) -> Option<Session> {
        match self.members.get(session_id) {
            Some(existing) if existing.token() == token => {
                debug!(room = %self.id, session = %session_id, "Session removed");
                self.members.remove(session_id)
            }
            _ => None,
        }
    }

    /// Iterate over the members.
    pub fn members(&self) -> impl Iterator<Item = &Session> {
        self.members.values()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::session::SessionBinding;
    use huddle_transport::memory;

    fn session(id: &str, identity: &str) -> Session {
        let (_peer, _reader, writer) = memory::pair(1);
        let (session, _queue) = Session::new(SessionBinding::new(id, "r1", identity), writer, 4);
        session
    }

    #[test]
    fn test_room_creation() {
        let room = Room::new("r1", "Lobby");
        assert_eq!(room.id(), "r1");
        assert_eq!(room.name(), "Lobby");
        assert!(room.is_empty());
    }

    #[test]
    fn test_room_insert_remove() {
        let mut room = Room::new("r1", "Lobby");

        let s1 = session("s1", "alice");
        let token = s1.token();
        assert!(room.insert(s1).is_ok());
        assert!(room.insert(session("s2", "bob")).is_ok());
        assert_eq!(room.len(), 2);

        // Same id from another connection is rejected
        assert!(room.insert(session("s1", "alice")).is_err());
        assert_eq!(room.len(), 2);

        assert!(room.remove("s1", token).is_some());
        assert!(!room.contains("s1"));
        assert!(room.remove("s1", token).is_none());
    }

    #[test]
    fn test_room_remove_checks_token() {
        let mut room = Room::new("r1", "Lobby");
        let first = session("s1", "alice");
        let stale = session("s1", "alice").token();
        room.insert(first).unwrap();

        assert!(room.remove("s1", stale).is_none());
        assert!(room.contains("s1"));
    }

    #[test]
    fn test_room_id_validation() {
        assert!(validate_room_id("lobby").is_ok());
        assert!(validate_room_id("").is_err());
        assert!(validate_room_id("bad\nid").is_err());

        let long_id = "a".repeat(MAX_ROOM_ID_LENGTH + 1);
        assert!(validate_room_id(&long_id).is_err());
    }
}
