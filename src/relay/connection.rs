//! Per-connection record
//!
//! `Connection` pairs a client's outbound channel with the relay-side state
//! that matters for routing: a unique id and the room the connection is
//! currently associated with (at most one at a time).

use super::message::Message;
use crate::error::{RelayError, Result};
use serde::Serialize;
use tokio::sync::mpsc;

/// A connected client: outbound send path plus current room association
pub struct Connection {
    /// Unique connection identifier
    id: String,
    /// Room this connection is currently in, if any
    room: Option<String>,
    /// Channel sender feeding the connection's WebSocket write task
    sender: mpsc::Sender<Message>,
}

impl Connection {
    pub(crate) fn new(id: String, sender: mpsc::Sender<Message>) -> Self {
        Self {
            id,
            room: None,
            sender,
        }
    }

    /// Get the connection ID
    pub fn id(&self) -> &str {
        &self.id
    }

    /// Get the room this connection is currently associated with
    pub fn room(&self) -> Option<&str> {
        self.room.as_deref()
    }

    /// Set or clear the current room association
    ///
    /// Only the lifecycle/routing layer calls this; the registry's member
    /// sets are kept in step by `RoomRegistry::join`/`leave`.
    pub(crate) fn set_room(&mut self, room: Option<String>) {
        self.room = room;
    }

    /// Whether the outbound channel is still open
    pub fn is_open(&self) -> bool {
        !self.sender.is_closed()
    }

    /// Queue a message for delivery to this connection
    ///
    /// Best-effort and non-blocking: a full buffer or closed channel is an
    /// error for the caller to log, never something to wait out. A peer too
    /// slow to drain its buffer is treated the same as a peer that is gone.
    pub fn send(&self, msg: Message) -> Result<()> {
        self.sender
            .try_send(msg)
            .map_err(|_| RelayError::delivery("outbound channel full or closed"))
    }

    /// Queue a text message
    pub fn send_text(&self, text: impl Into<String>) -> Result<()> {
        self.send(Message::Text(text.into()))
    }

    /// Queue a JSON message
    pub fn send_json<T: Serialize>(&self, data: &T) -> Result<()> {
        let json = serde_json::to_string(data)
            .map_err(|e| RelayError::internal(format!("Failed to serialize JSON: {e}")))?;
        self.send_text(json)
    }
}
