//! Per-message relay decision logic
//!
//! For every inbound text frame: a well-formed join associates the
//! connection with a room and announces the membership change; anything
//! else is forwarded verbatim to the sender's current room, excluding the
//! sender; a message from a connection that never joined is dropped.
//! Malformed data is logged and ignored — it never closes the connection.

use super::message::{Message, RoomEvent};
use super::registry::{ConnectionHandle, RoomRegistry};
use super::socket::SocketHandler;
use async_trait::async_trait;
use serde_json::Value;
use std::sync::Arc;

/// Routes inbound messages to room joins or broadcasts
pub struct RelayRouter {
    registry: Arc<RoomRegistry>,
}

impl RelayRouter {
    pub fn new(registry: Arc<RoomRegistry>) -> Self {
        Self { registry }
    }

    /// Apply the relay decision procedure to one inbound text payload
    pub async fn route(&self, conn: &ConnectionHandle, text: &str) {
        let payload: Value = match serde_json::from_str(text) {
            Ok(payload) => payload,
            Err(error) => {
                tracing::warn!(%error, "discarding malformed signaling message");
                return;
            }
        };

        if let Some(room) = join_target(&payload) {
            self.join(conn, &room).await;
            return;
        }

        let (conn_id, room) = {
            let conn = conn.read().await;
            (conn.id().to_string(), conn.room().map(String::from))
        };
        match room {
            Some(room) => {
                self.registry
                    .broadcast(&room, Message::Text(text.to_string()), Some(&conn_id));
            }
            None => {
                tracing::debug!(conn_id = %conn_id, "discarding message from connection outside any room");
            }
        }
    }

    /// Associate the connection with `room` and announce the membership change
    ///
    /// A join while already in a different room leaves that room first, with
    /// the same peer-left notification a disconnect would produce, so the
    /// connection's room pointer and the registry's member sets never drift
    /// apart. Re-joining the current room is idempotent for membership but
    /// re-sends the notifications.
    async fn join(&self, conn: &ConnectionHandle, room: &str) {
        let (conn_id, previous) = {
            let conn = conn.read().await;
            (conn.id().to_string(), conn.room().map(String::from))
        };

        if let Some(previous) = previous.filter(|previous| previous != room) {
            self.leave_and_notify(&conn_id, &previous);
        }

        let count = self.registry.join(&conn_id, room);
        conn.write().await.set_room(Some(room.to_string()));
        tracing::info!(conn_id = %conn_id, room = %room, count, "connection joined room");

        {
            let conn = conn.read().await;
            let event = RoomEvent::UserCount {
                room_id: room.to_string(),
                count,
            };
            if let Err(error) = conn.send_json(&event) {
                tracing::warn!(conn_id = %conn_id, room = %room, %error, "failed to send room count to joiner");
            }
        }

        let event = RoomEvent::PeerJoined {
            room_id: room.to_string(),
            count,
        };
        if let Err(error) = self.registry.broadcast_json(room, &event, Some(&conn_id)) {
            tracing::error!(room = %room, %error, "failed to announce new peer");
        }
    }

    /// Tear down a connection's room state when its transport goes away
    ///
    /// Clean closes and transport errors take the same path: leave the room
    /// (if any), tell the survivors, drop the connection from the registry.
    /// If the departure emptied the room there is no one left to tell.
    pub async fn close(&self, conn: &ConnectionHandle) {
        let (conn_id, room) = {
            let conn = conn.read().await;
            (conn.id().to_string(), conn.room().map(String::from))
        };

        if let Some(room) = room {
            self.leave_and_notify(&conn_id, &room);
        }
        self.registry.unregister(&conn_id).await;
        tracing::info!(conn_id = %conn_id, "client disconnected");
    }

    fn leave_and_notify(&self, conn_id: &str, room: &str) {
        match self.registry.leave(conn_id, room) {
            Some(remaining) => {
                let event = RoomEvent::PeerLeft {
                    room_id: room.to_string(),
                    count: remaining,
                };
                if let Err(error) = self.registry.broadcast_json(room, &event, None) {
                    tracing::error!(room = %room, %error, "failed to announce departed peer");
                }
            }
            None => {
                tracing::info!(room = %room, "room removed (empty)");
            }
        }
    }
}

/// Extract the target room from a join message, if that is what this is
///
/// Requires `type == "join"` and a non-empty string `roomId`. Anything else
/// — including a join with a missing or empty room — is not a join and falls
/// through to the relay path.
fn join_target(payload: &Value) -> Option<String> {
    if payload.get("type")?.as_str()? != "join" {
        return None;
    }
    let room = payload.get("roomId")?.as_str()?;
    if room.is_empty() {
        None
    } else {
        Some(room.to_string())
    }
}

#[async_trait]
impl SocketHandler for RelayRouter {
    async fn on_connect(&self, conn: &ConnectionHandle) {
        let conn_id = conn.read().await.id().to_string();
        tracing::info!(conn_id = %conn_id, "client connected");
    }

    async fn on_message(&self, conn: &ConnectionHandle, msg: Message) {
        match msg {
            Message::Text(text) => self.route(conn, &text).await,
            // The signaling protocol is JSON text; binary frames are ignored
            _ => {}
        }
    }

    async fn on_disconnect(&self, conn: &ConnectionHandle) {
        self.close(conn).await;
    }
}
