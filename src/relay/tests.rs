use super::connection::Connection;
use super::message::{Message, RoomEvent};
use super::registry::{ConnectionHandle, RoomRegistry};
use super::router::RelayRouter;
use crate::error::RelayError;
use std::sync::Arc;
use tokio::sync::mpsc;

fn connection(id: &str) -> (ConnectionHandle, mpsc::Receiver<Message>) {
    let (tx, rx) = mpsc::channel::<Message>(16);
    let conn = Arc::new(tokio::sync::RwLock::new(Connection::new(
        id.to_string(),
        tx,
    )));
    (conn, rx)
}

fn recv_text(rx: &mut mpsc::Receiver<Message>) -> String {
    match rx.try_recv().expect("expected a pending message") {
        Message::Text(text) => text,
        other => panic!("unexpected frame: {other:?}"),
    }
}

fn recv_event(rx: &mut mpsc::Receiver<Message>) -> RoomEvent {
    serde_json::from_str(&recv_text(rx)).expect("expected a room event")
}

fn drain(rx: &mut mpsc::Receiver<Message>) {
    while rx.try_recv().is_ok() {}
}

#[tokio::test]
async fn join_creates_room_and_reports_count() {
    let registry = RoomRegistry::new();

    assert_eq!(registry.join("a", "room-1"), 1);
    assert_eq!(registry.size("room-1"), 1);
    assert_eq!(registry.room_count(), 1);

    assert_eq!(registry.join("b", "room-1"), 2);
    assert_eq!(registry.size("room-1"), 2);

    // Re-joining the same room does not duplicate the member
    assert_eq!(registry.join("b", "room-1"), 2);
    assert_eq!(registry.size("room-1"), 2);
}

#[tokio::test]
async fn leaving_last_member_removes_the_room() {
    let registry = RoomRegistry::new();
    registry.join("a", "room-1");

    assert_eq!(registry.leave("a", "room-1"), None);
    assert_eq!(registry.size("room-1"), 0);
    assert_eq!(registry.room_count(), 0);
}

#[tokio::test]
async fn leave_of_unknown_room_or_member_is_a_noop() {
    let registry = RoomRegistry::new();

    assert_eq!(registry.leave("a", "missing"), None);

    registry.join("a", "room-1");
    registry.join("b", "room-1");
    // "c" was never a member; the others are untouched
    assert_eq!(registry.leave("c", "room-1"), Some(2));
    assert_eq!(registry.size("room-1"), 2);
}

#[tokio::test]
async fn leave_with_survivors_reports_remaining_count() {
    let registry = RoomRegistry::new();
    registry.join("a", "room-1");
    registry.join("b", "room-1");
    registry.join("c", "room-1");

    assert_eq!(registry.leave("a", "room-1"), Some(2));
    assert_eq!(registry.size("room-1"), 2);
    assert_eq!(registry.room_count(), 1);
}

#[tokio::test]
async fn broadcast_excludes_the_sender() {
    let registry = RoomRegistry::new();
    let (conn_a, mut rx_a) = connection("a");
    let (conn_b, mut rx_b) = connection("b");
    let (conn_c, mut rx_c) = connection("c");

    registry.register(conn_a).await.unwrap();
    registry.register(conn_b).await.unwrap();
    registry.register(conn_c).await.unwrap();
    registry.join("a", "room-1");
    registry.join("b", "room-1");
    registry.join("c", "room-1");

    registry.broadcast("room-1", Message::Text("hello".to_string()), Some("a"));

    assert_eq!(recv_text(&mut rx_b), "hello");
    assert_eq!(recv_text(&mut rx_c), "hello");
    assert!(rx_a.try_recv().is_err());
}

#[tokio::test]
async fn broadcast_skips_closed_connections() {
    let registry = RoomRegistry::new();
    let (conn_a, mut rx_a) = connection("a");
    let (conn_b, rx_b) = connection("b");

    registry.register(conn_a).await.unwrap();
    registry.register(conn_b).await.unwrap();
    registry.join("a", "room-1");
    registry.join("b", "room-1");

    // "b" is gone from the transport's perspective but still a member
    drop(rx_b);
    registry.broadcast("room-1", Message::Text("still here?".to_string()), None);

    assert_eq!(recv_text(&mut rx_a), "still here?");
    // Skipped, not removed: only a lifecycle event prunes membership
    assert_eq!(registry.size("room-1"), 2);
}

#[tokio::test]
async fn broadcast_to_absent_room_does_nothing() {
    let registry = RoomRegistry::new();
    registry.broadcast("nowhere", Message::Text("void".to_string()), None);
    assert_eq!(registry.room_count(), 0);
}

#[tokio::test]
async fn connection_limit_is_enforced() {
    let registry = RoomRegistry::with_max_connections(1);
    let (conn_a, _rx_a) = connection("a");
    let (conn_b, _rx_b) = connection("b");

    assert!(registry.register(conn_a).await.is_ok());
    let result = registry.register(conn_b.clone()).await;
    assert!(matches!(result, Err(RelayError::ServiceUnavailable(_))));
    assert_eq!(registry.connection_count(), 1);

    registry.unregister("a").await;
    assert!(registry.register(conn_b).await.is_ok());
    assert_eq!(registry.connection_count(), 1);
}

#[tokio::test]
async fn unregister_prunes_lingering_membership() {
    let registry = RoomRegistry::new();
    let (conn_a, _rx_a) = connection("a");
    conn_a.write().await.set_room(Some("room-1".to_string()));

    registry.register(conn_a).await.unwrap();
    registry.join("a", "room-1");

    registry.unregister("a").await;
    assert_eq!(registry.size("room-1"), 0);
    assert_eq!(registry.room_count(), 0);
}

#[tokio::test]
async fn join_notifies_joiner_and_peers() {
    let registry = Arc::new(RoomRegistry::new());
    let router = RelayRouter::new(registry.clone());
    let (conn_a, mut rx_a) = connection("a");
    let (conn_b, mut rx_b) = connection("b");
    registry.register(conn_a.clone()).await.unwrap();
    registry.register(conn_b.clone()).await.unwrap();

    router.route(&conn_a, r#"{"type":"join","roomId":"room-1"}"#).await;
    assert_eq!(
        recv_event(&mut rx_a),
        RoomEvent::UserCount {
            room_id: "room-1".to_string(),
            count: 1
        }
    );

    router.route(&conn_b, r#"{"type":"join","roomId":"room-1"}"#).await;
    assert_eq!(
        recv_event(&mut rx_b),
        RoomEvent::UserCount {
            room_id: "room-1".to_string(),
            count: 2
        }
    );
    assert_eq!(
        recv_event(&mut rx_a),
        RoomEvent::PeerJoined {
            room_id: "room-1".to_string(),
            count: 2
        }
    );
    // The joiner never receives its own peer-joined
    assert!(rx_b.try_recv().is_err());
}

#[tokio::test]
async fn relay_payload_reaches_everyone_but_the_sender() {
    let registry = Arc::new(RoomRegistry::new());
    let router = RelayRouter::new(registry.clone());
    let (conn_a, mut rx_a) = connection("a");
    let (conn_b, mut rx_b) = connection("b");
    let (conn_c, mut rx_c) = connection("c");
    for conn in [&conn_a, &conn_b, &conn_c] {
        registry.register(conn.clone()).await.unwrap();
    }
    router.route(&conn_a, r#"{"type":"join","roomId":"room-1"}"#).await;
    router.route(&conn_b, r#"{"type":"join","roomId":"room-1"}"#).await;
    router.route(&conn_c, r#"{"type":"join","roomId":"room-1"}"#).await;
    drain(&mut rx_a);
    drain(&mut rx_b);
    drain(&mut rx_c);

    let offer = r#"{"type":"offer","sdp":"v=0..."}"#;
    router.route(&conn_a, offer).await;

    assert_eq!(recv_text(&mut rx_b), offer);
    assert_eq!(recv_text(&mut rx_c), offer);
    assert!(rx_a.try_recv().is_err());
}

#[tokio::test]
async fn message_before_any_join_is_dropped() {
    let registry = Arc::new(RoomRegistry::new());
    let router = RelayRouter::new(registry.clone());
    let (conn_a, mut rx_a) = connection("a");
    registry.register(conn_a.clone()).await.unwrap();

    router.route(&conn_a, r#"{"type":"offer","sdp":"v=0..."}"#).await;

    assert!(rx_a.try_recv().is_err());
    assert_eq!(registry.room_count(), 0);
}

#[tokio::test]
async fn malformed_message_is_ignored_and_connection_survives() {
    let registry = Arc::new(RoomRegistry::new());
    let router = RelayRouter::new(registry.clone());
    let (conn_a, mut rx_a) = connection("a");
    let (conn_b, mut rx_b) = connection("b");
    registry.register(conn_a.clone()).await.unwrap();
    registry.register(conn_b.clone()).await.unwrap();
    router.route(&conn_a, r#"{"type":"join","roomId":"room-1"}"#).await;
    router.route(&conn_b, r#"{"type":"join","roomId":"room-1"}"#).await;
    drain(&mut rx_a);
    drain(&mut rx_b);

    router.route(&conn_a, "this is not json{").await;

    assert!(rx_a.try_recv().is_err());
    assert!(rx_b.try_recv().is_err());
    assert!(conn_a.read().await.is_open());
    assert_eq!(registry.size("room-1"), 2);
}

#[tokio::test]
async fn join_with_empty_room_id_is_not_a_join() {
    let registry = Arc::new(RoomRegistry::new());
    let router = RelayRouter::new(registry.clone());
    let (conn_a, mut rx_a) = connection("a");
    registry.register(conn_a.clone()).await.unwrap();

    // Not in a room yet, so this is dropped rather than relayed
    router.route(&conn_a, r#"{"type":"join","roomId":""}"#).await;

    assert!(rx_a.try_recv().is_err());
    assert_eq!(registry.room_count(), 0);
}

#[tokio::test]
async fn join_without_room_id_relays_like_any_payload() {
    let registry = Arc::new(RoomRegistry::new());
    let router = RelayRouter::new(registry.clone());
    let (conn_a, mut rx_a) = connection("a");
    let (conn_b, mut rx_b) = connection("b");
    registry.register(conn_a.clone()).await.unwrap();
    registry.register(conn_b.clone()).await.unwrap();
    router.route(&conn_a, r#"{"type":"join","roomId":"room-1"}"#).await;
    router.route(&conn_b, r#"{"type":"join","roomId":"room-1"}"#).await;
    drain(&mut rx_a);
    drain(&mut rx_b);

    router.route(&conn_a, r#"{"type":"join"}"#).await;

    assert_eq!(recv_text(&mut rx_b), r#"{"type":"join"}"#);
    assert!(rx_a.try_recv().is_err());
}

#[tokio::test]
async fn joining_a_second_room_leaves_the_first() {
    let registry = Arc::new(RoomRegistry::new());
    let router = RelayRouter::new(registry.clone());
    let (conn_a, mut rx_a) = connection("a");
    let (conn_b, mut rx_b) = connection("b");
    registry.register(conn_a.clone()).await.unwrap();
    registry.register(conn_b.clone()).await.unwrap();
    router.route(&conn_a, r#"{"type":"join","roomId":"room-1"}"#).await;
    router.route(&conn_b, r#"{"type":"join","roomId":"room-1"}"#).await;
    drain(&mut rx_a);
    drain(&mut rx_b);

    router.route(&conn_b, r#"{"type":"join","roomId":"room-2"}"#).await;

    // The old room is pruned and its survivor notified
    assert_eq!(
        recv_event(&mut rx_a),
        RoomEvent::PeerLeft {
            room_id: "room-1".to_string(),
            count: 1
        }
    );
    assert_eq!(
        recv_event(&mut rx_b),
        RoomEvent::UserCount {
            room_id: "room-2".to_string(),
            count: 1
        }
    );
    assert_eq!(registry.size("room-1"), 1);
    assert_eq!(registry.size("room-2"), 1);
    assert_eq!(conn_b.read().await.room(), Some("room-2"));
}

#[tokio::test]
async fn disconnect_notifies_survivors() {
    let registry = Arc::new(RoomRegistry::new());
    let router = RelayRouter::new(registry.clone());
    let (conn_a, mut rx_a) = connection("a");
    let (conn_b, mut rx_b) = connection("b");
    let (conn_c, mut rx_c) = connection("c");
    for conn in [&conn_a, &conn_b, &conn_c] {
        registry.register(conn.clone()).await.unwrap();
    }
    router.route(&conn_a, r#"{"type":"join","roomId":"room-1"}"#).await;
    router.route(&conn_b, r#"{"type":"join","roomId":"room-1"}"#).await;
    router.route(&conn_c, r#"{"type":"join","roomId":"room-1"}"#).await;
    drain(&mut rx_a);
    drain(&mut rx_b);
    drain(&mut rx_c);

    router.close(&conn_c).await;

    let expected = RoomEvent::PeerLeft {
        room_id: "room-1".to_string(),
        count: 2,
    };
    assert_eq!(recv_event(&mut rx_a), expected);
    assert_eq!(recv_event(&mut rx_b), expected);
    // The departing connection receives nothing
    assert!(rx_c.try_recv().is_err());
    assert_eq!(registry.size("room-1"), 2);
    assert_eq!(registry.connection_count(), 2);
}

#[tokio::test]
async fn disconnect_of_last_member_removes_the_room_silently() {
    let registry = Arc::new(RoomRegistry::new());
    let router = RelayRouter::new(registry.clone());
    let (conn_a, mut rx_a) = connection("a");
    registry.register(conn_a.clone()).await.unwrap();
    router.route(&conn_a, r#"{"type":"join","roomId":"room-1"}"#).await;
    drain(&mut rx_a);

    router.close(&conn_a).await;

    assert!(rx_a.try_recv().is_err());
    assert_eq!(registry.room_count(), 0);
    assert_eq!(registry.connection_count(), 0);
}

#[tokio::test]
async fn disconnect_without_room_only_unregisters() {
    let registry = Arc::new(RoomRegistry::new());
    let router = RelayRouter::new(registry.clone());
    let (conn_a, _rx_a) = connection("a");
    registry.register(conn_a.clone()).await.unwrap();

    router.close(&conn_a).await;

    assert_eq!(registry.connection_count(), 0);
    assert_eq!(registry.room_count(), 0);
}
