//! Read-only room listing.
//!
//! The coordinator mirrors every membership change into the directory during
//! the same step that performs it. Listing handlers read snapshots from here
//! concurrently without going through the coordinator.

use dashmap::DashMap;
use serde::Serialize;
use std::collections::BTreeMap;

use crate::room::RoomId;

/// A room as reported by [`RoomDirectory::rooms`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RoomInfo {
    /// Room id.
    pub id: String,
    /// Display name.
    pub name: String,
}

/// A session as reported by [`RoomDirectory::sessions`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SessionInfo {
    /// Session id.
    pub id: String,
    /// Identity the session joined with.
    pub username: String,
}

#[derive(Debug)]
struct Listing {
    name: String,
    /// session id -> identity
    members: BTreeMap<String, String>,
}

/// Snapshot store behind the listing operations.
#[derive(Debug, Default)]
pub struct RoomDirectory {
    rooms: DashMap<RoomId, Listing>,
}

impl RoomDirectory {
    /// Create an empty directory.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    pub(crate) fn put_room(&self, id: &str, name: &str) {
        self.rooms.insert(
            id.to_string(),
            Listing {
                name: name.to_string(),
                members: BTreeMap::new(),
            },
        );
    }

    pub(crate) fn add_session(&self, room_id: &str, session_id: &str, identity: &str) {
        if let Some(mut listing) = self.rooms.get_mut(room_id) {
            listing
                .members
                .insert(session_id.to_string(), identity.to_string());
        }
    }

    pub(crate) fn remove_session(&self, room_id: &str, session_id: &str) {
        if let Some(mut listing) = self.rooms.get_mut(room_id) {
            listing.members.remove(session_id);
        }
    }

    /// All rooms, ordered by id.
    #[must_use]
    pub fn rooms(&self) -> Vec<RoomInfo> {
        let mut rooms: Vec<RoomInfo> = self
            .rooms
            .iter()
            .map(|entry| RoomInfo {
                id: entry.key().clone(),
                name: entry.name.clone(),
            })
            .collect();
        rooms.sort_by(|a, b| a.id.cmp(&b.id));
        rooms
    }

    /// Sessions registered in a room, ordered by session id.
    ///
    /// An unknown room yields an empty list.
    #[must_use]
    pub fn sessions(&self, room_id: &str) -> Vec<SessionInfo> {
        self.rooms
            .get(room_id)
            .map(|listing| {
                listing
                    .members
                    .iter()
                    .map(|(id, username)| SessionInfo {
                        id: id.clone(),
                        username: username.clone(),
                    })
                    .collect()
            })
            .unwrap_or_default()
    }

    /// Number of rooms.
    #[must_use]
    pub fn room_count(&self) -> usize {
        self.rooms.len()
    }
}
