//! WebSocket upgrade handling and per-connection plumbing
//!
//! Bridges transport-level connect/message/close events into handler calls.
//! Each accepted socket gets a fresh connection record, a bounded outbound
//! channel drained by a dedicated write task, and a sequential read loop —
//! messages from one connection are always processed in arrival order.

use super::connection::Connection;
use super::message::Message;
use super::registry::{ConnectionHandle, RoomRegistry};
use crate::error::RelayError;
use axum::{
    Router,
    extract::ws::{WebSocket, WebSocketUpgrade},
    response::Response,
    routing::get,
};
use async_trait::async_trait;
use futures::{SinkExt, StreamExt};
use std::sync::Arc;
use tokio::sync::mpsc;
use uuid::Uuid;

/// Outbound buffer per connection; a peer that falls this far behind starts
/// losing messages instead of stalling broadcasts.
const OUTBOUND_BUFFER: usize = 256;

/// Handler for WebSocket connection lifecycle events
#[async_trait]
pub trait SocketHandler: Send + Sync + 'static {
    /// Called once the upgrade is complete and the connection is registered
    async fn on_connect(&self, conn: &ConnectionHandle);

    /// Called for every data frame received from the client
    async fn on_message(&self, conn: &ConnectionHandle, msg: Message);

    /// Called when the connection closes, cleanly or not
    async fn on_disconnect(&self, conn: &ConnectionHandle);
}

/// Create the WebSocket route
pub fn ws<H>(path: &str, handler: H, registry: Arc<RoomRegistry>) -> Router
where
    H: SocketHandler,
{
    let handler = Arc::new(handler);
    Router::new().route(
        path,
        get(move |upgrade: WebSocketUpgrade| {
            let handler = handler.clone();
            let registry = registry.clone();

            async move {
                if registry.at_capacity() {
                    return Err(RelayError::service_unavailable("connection limit reached"));
                }
                Ok::<Response, RelayError>(
                    upgrade.on_upgrade(move |socket| handle_socket(socket, handler, registry)),
                )
            }
        }),
    )
}

/// Drive one WebSocket connection from registration to teardown
async fn handle_socket<H: SocketHandler>(
    socket: WebSocket,
    handler: Arc<H>,
    registry: Arc<RoomRegistry>,
) {
    let conn_id = Uuid::new_v4().to_string();
    let (tx, mut rx) = mpsc::channel::<Message>(OUTBOUND_BUFFER);
    let (mut ws_sender, mut ws_receiver) = socket.split();

    let conn: ConnectionHandle = Arc::new(tokio::sync::RwLock::new(Connection::new(
        conn_id.clone(),
        tx,
    )));

    if let Err(error) = registry.register(conn.clone()).await {
        tracing::warn!(conn_id = %conn_id, %error, "rejecting connection");
        let _ = ws_sender.close().await;
        return;
    }

    handler.on_connect(&conn).await;

    // Write task: drain the outbound channel into the socket.
    let send_task = tokio::spawn(async move {
        while let Some(msg) = rx.recv().await {
            if ws_sender.send(msg.into_ws()).await.is_err() {
                break;
            }
        }
    });

    // Read loop runs inline so frames from this connection are handled
    // strictly in order.
    while let Some(result) = ws_receiver.next().await {
        match result {
            Ok(ws_msg) => match Message::from_ws(ws_msg) {
                Message::Ping(data) => {
                    let _ = conn.read().await.send(Message::Pong(data));
                }
                Message::Pong(_) => {}
                Message::Close(_) => break,
                msg => handler.on_message(&conn, msg).await,
            },
            Err(error) => {
                // Transport errors take the same teardown path as a clean
                // close; they are never fatal to the server.
                tracing::warn!(conn_id = %conn_id, %error, "websocket receive error");
                break;
            }
        }
    }

    handler.on_disconnect(&conn).await;
    send_task.abort();
}
