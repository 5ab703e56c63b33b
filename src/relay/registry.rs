//! Room registry
//!
//! Owns the mapping from room id to member connections and the table of all
//! live connections. Rooms are created lazily on first join and deleted the
//! instant their member set empties; a room key is present iff its member
//! set is non-empty. All mutation goes through `join`/`leave` — the raw
//! member sets are never exposed.

use super::connection::Connection;
use super::message::Message;
use crate::error::{RelayError, Result};
use dashmap::DashMap;
use serde::Serialize;
use std::collections::HashSet;
use std::sync::Arc;

/// Handle to a connection shared between the registry and its socket tasks
pub type ConnectionHandle = Arc<tokio::sync::RwLock<Connection>>;

/// Registry of rooms and live connections
///
/// Mutations against the same room key are serialized by the map's shard
/// locks, so a broadcast never iterates a member set mid-mutation and two
/// concurrent leaves cannot both miss the empty-room deletion.
pub struct RoomRegistry {
    /// Map of connection ID to connection handle
    connections: DashMap<String, ConnectionHandle>,
    /// Map of room ID to member connection IDs
    rooms: DashMap<String, HashSet<String>>,
    /// Maximum number of connections allowed (0 = unlimited)
    max_connections: usize,
}

impl RoomRegistry {
    /// Create a registry with no connection limit
    pub fn new() -> Self {
        Self::with_max_connections(0)
    }

    /// Create a registry with a maximum connection limit (0 = unlimited)
    pub fn with_max_connections(max_connections: usize) -> Self {
        Self {
            connections: DashMap::new(),
            rooms: DashMap::new(),
            max_connections,
        }
    }

    /// Whether the connection limit has been reached
    pub fn at_capacity(&self) -> bool {
        self.max_connections > 0 && self.connections.len() >= self.max_connections
    }

    /// Register a new connection
    pub async fn register(&self, conn: ConnectionHandle) -> Result<()> {
        if self.at_capacity() {
            return Err(RelayError::service_unavailable(format!(
                "connection limit ({}) reached",
                self.max_connections
            )));
        }

        let conn_id = conn.read().await.id().to_string();
        self.connections.insert(conn_id, conn);
        Ok(())
    }

    /// Remove a connection from the registry
    ///
    /// Also prunes any room membership the connection still holds, so
    /// registry state converges even if a caller skipped `leave`.
    pub async fn unregister(&self, conn_id: &str) {
        if let Some((_, conn)) = self.connections.remove(conn_id) {
            let room = conn.read().await.room().map(String::from);
            if let Some(room) = room {
                self.leave(conn_id, &room);
            }
        }
    }

    /// Get a connection by ID
    pub fn get(&self, conn_id: &str) -> Option<ConnectionHandle> {
        self.connections.get(conn_id).map(|entry| entry.clone())
    }

    /// Add a connection to a room, creating the room if absent
    ///
    /// Returns the resulting member count. Re-joining a room the connection
    /// is already in leaves the count unchanged.
    pub fn join(&self, conn_id: &str, room: &str) -> usize {
        let mut members = self.rooms.entry(room.to_string()).or_default();
        members.insert(conn_id.to_string());
        members.len()
    }

    /// Remove a connection from a room's member set
    ///
    /// Returns `Some(remaining)` if the room survives, `None` if it was
    /// removed because it emptied — or never existed. Leaving a room one is
    /// not in is a no-op, never an error.
    pub fn leave(&self, conn_id: &str, room: &str) -> Option<usize> {
        let remaining = match self.rooms.get_mut(room) {
            Some(mut members) => {
                members.remove(conn_id);
                members.len()
            }
            None => return None,
        };

        if remaining == 0 {
            // Atomic remove-if: a join racing in here repopulates the set
            // and the deletion backs off.
            self.rooms.remove_if(room, |_, members| members.is_empty());
            None
        } else {
            Some(remaining)
        }
    }

    /// Current member count of a room, zero if absent
    pub fn size(&self, room: &str) -> usize {
        self.rooms.get(room).map(|members| members.len()).unwrap_or(0)
    }

    /// Number of active rooms
    pub fn room_count(&self) -> usize {
        self.rooms.len()
    }

    /// Number of live connections
    pub fn connection_count(&self) -> usize {
        self.connections.len()
    }

    /// Deliver a message to every member of a room except `exclude`
    ///
    /// Connections whose channel has closed are skipped silently; an
    /// individual send failure is logged and never aborts delivery to the
    /// remaining members or removes anyone from the room — cleanup belongs
    /// to the connection's own close path.
    pub fn broadcast(&self, room: &str, msg: Message, exclude: Option<&str>) {
        // Snapshot the member list so delivery happens outside the room's
        // shard lock.
        let member_ids: Vec<String> = match self.rooms.get(room) {
            Some(members) => members.iter().cloned().collect(),
            None => return,
        };

        for member_id in member_ids {
            if exclude == Some(member_id.as_str()) {
                continue;
            }
            let Some(conn) = self.get(&member_id) else {
                continue;
            };
            let Ok(conn) = conn.try_read() else {
                tracing::debug!(conn_id = %member_id, room = %room, "connection busy, skipping delivery");
                continue;
            };
            if !conn.is_open() {
                continue;
            }
            if let Err(error) = conn.send(msg.clone()) {
                tracing::warn!(conn_id = %member_id, room = %room, %error, "failed to deliver message");
            }
        }
    }

    /// Serialize a value to JSON and broadcast it to a room
    pub fn broadcast_json<T: Serialize>(
        &self,
        room: &str,
        data: &T,
        exclude: Option<&str>,
    ) -> Result<()> {
        let json = serde_json::to_string(data)
            .map_err(|e| RelayError::internal(format!("Failed to serialize JSON: {e}")))?;
        self.broadcast(room, Message::Text(json), exclude);
        Ok(())
    }
}

impl Default for RoomRegistry {
    fn default() -> Self {
        Self::new()
    }
}
