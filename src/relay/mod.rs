//! The room membership and broadcast engine
//!
//! Three pieces cooperate here:
//!
//! - [`RoomRegistry`] owns the room-to-members mapping and the connection
//!   table; rooms exist exactly as long as they have members.
//! - [`RelayRouter`] decides what each inbound message means: a join
//!   (membership bookkeeping plus notifications) or an opaque payload to
//!   fan out to the sender's room, excluding the sender.
//! - [`ws`] wires both to Axum's WebSocket upgrade and runs the
//!   per-connection send/receive tasks.
//!
//! The relay never validates payload contents beyond the `type`
//! discriminator; everything that is not a join is forwarded verbatim.

mod connection;
mod message;
mod registry;
mod router;
mod socket;

#[cfg(test)]
mod tests;

pub use connection::Connection;
pub use message::{CloseFrame, Message, RoomEvent};
pub use registry::{ConnectionHandle, RoomRegistry};
pub use router::RelayRouter;
pub use socket::{SocketHandler, ws};
