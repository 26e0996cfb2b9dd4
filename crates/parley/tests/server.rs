//! Integration tests for the chat server over real WebSocket connections.
//!
//! Each test starts a server on a random port, connects tungstenite
//! clients, and drives the protocol end to end. Grace-period tests use
//! short windows (hundreds of milliseconds) instead of the production
//! default, with receive timeouts generous enough to stay deterministic.

use std::time::Duration;

use futures_util::{SinkExt, StreamExt};
use parley::prelude::*;
use tokio_tungstenite::tungstenite::Message as WsMessage;

// =========================================================================
// Test fixtures
// =========================================================================

/// Accepts tokens of the form `tok-<user id>`.
struct PrefixVerifier;

impl TokenVerifier for PrefixVerifier {
    async fn verify(&self, token: &str) -> Result<UserId, AuthError> {
        if token.is_empty() {
            return Err(AuthError::MissingToken);
        }
        match token.strip_prefix("tok-") {
            Some(user_id) => Ok(UserId::from(user_id)),
            None => Err(AuthError::InvalidToken),
        }
    }
}

type ClientWs = tokio_tungstenite::WebSocketStream<
    tokio_tungstenite::MaybeTlsStream<tokio::net::TcpStream>,
>;
type TestService = ChatService<PrefixVerifier, MemoryStore, JsonCodec>;

fn uid(id: &str) -> UserId {
    UserId::from(id)
}

/// A grace window long enough that it never fires inside a test.
fn long_grace() -> Duration {
    Duration::from_secs(600)
}

/// Starts a server seeded with Alice/Bob/Carol/Dave and returns its
/// address plus the service handle.
async fn start_server(grace: Duration) -> (String, TestService) {
    let store = MemoryStore::new();
    for (id, name) in [
        ("u-1", "Alice"),
        ("u-2", "Bob"),
        ("u-3", "Carol"),
        ("u-4", "Dave"),
    ] {
        store
            .add_user(UserSummary {
                id: uid(id),
                name: name.into(),
                email: format!("{}@example.com", name.to_lowercase()),
            })
            .await;
    }

    let server = ChatServerBuilder::new()
        .bind("127.0.0.1:0")
        .session_config(SessionConfig {
            grace_period: grace,
        })
        .build(PrefixVerifier, store)
        .await
        .expect("server should build");

    let addr = server
        .local_addr()
        .expect("should have local addr")
        .to_string();
    let service = server.service();

    tokio::spawn(async move {
        let _ = server.run().await;
    });

    // Give the accept loop a moment to start.
    tokio::time::sleep(Duration::from_millis(10)).await;
    (addr, service)
}

async fn connect_raw(addr: &str) -> ClientWs {
    let (ws, _) = tokio_tungstenite::connect_async(format!("ws://{addr}"))
        .await
        .expect("should connect");
    ws
}

async fn send_frame(ws: &mut ClientWs, frame: serde_json::Value) {
    ws.send(WsMessage::Text(frame.to_string().into()))
        .await
        .expect("client send should succeed");
}

async fn handshake(ws: &mut ClientWs, token: serde_json::Value) {
    send_frame(
        ws,
        serde_json::json!({
            "event": "handshake",
            "data": { "version": 1, "token": token }
        }),
    )
    .await;
}

/// Receives the next server event, failing the test after 2 seconds.
async fn recv_event(ws: &mut ClientWs) -> ServerEvent {
    loop {
        let msg = tokio::time::timeout(Duration::from_secs(2), ws.next())
            .await
            .expect("timed out waiting for an event")
            .expect("connection closed while waiting for an event")
            .expect("websocket error while waiting for an event");
        match msg {
            WsMessage::Text(text) => {
                return serde_json::from_str(&text).expect("undecodable server event")
            }
            WsMessage::Binary(data) => {
                return serde_json::from_slice(&data).expect("undecodable server event")
            }
            _ => continue,
        }
    }
}

/// Asserts that no event arrives within the window.
async fn expect_silence(ws: &mut ClientWs, window: Duration) {
    match tokio::time::timeout(window, ws.next()).await {
        Err(_) => {} // timed out: silence, as expected
        Ok(Some(Ok(msg))) if matches!(msg, WsMessage::Text(_) | WsMessage::Binary(_)) => {
            panic!("expected silence, got {msg:?}")
        }
        Ok(_) => {} // close/ping frames are not events
    }
}

/// Connects and completes the handshake, consuming the `connected` ack.
async fn connect_as(addr: &str, token: &str) -> ClientWs {
    let mut ws = connect_raw(addr).await;
    handshake(&mut ws, serde_json::json!(token)).await;
    match recv_event(&mut ws).await {
        ServerEvent::Connected { .. } => ws,
        other => panic!("expected connected, got {other:?}"),
    }
}

fn private_message(recipient: &str, text: &str) -> serde_json::Value {
    serde_json::json!({
        "event": "private-message",
        "data": { "recipientId": recipient, "message": text }
    })
}

fn room_message(room_id: &RoomId, text: &str) -> serde_json::Value {
    serde_json::json!({
        "event": "room-message",
        "data": { "roomId": room_id, "message": text }
    })
}

// =========================================================================
// Handshake and authentication
// =========================================================================

#[tokio::test]
async fn test_handshake_valid_token_yields_connected() {
    let (addr, _service) = start_server(long_grace()).await;
    let mut ws = connect_raw(&addr).await;

    handshake(&mut ws, serde_json::json!("tok-u-1")).await;

    match recv_event(&mut ws).await {
        ServerEvent::Connected { user } => {
            assert_eq!(user.id, uid("u-1"));
            assert_eq!(user.name, "Alice");
            assert_eq!(user.email, "alice@example.com");
        }
        other => panic!("expected connected, got {other:?}"),
    }
}

#[tokio::test]
async fn test_handshake_missing_token_rejects_and_closes() {
    let (addr, _service) = start_server(long_grace()).await;
    let mut ws = connect_raw(&addr).await;

    handshake(&mut ws, serde_json::json!(null)).await;

    match recv_event(&mut ws).await {
        ServerEvent::Error { message } => {
            assert_eq!(message, "Authentication error: Token missing");
        }
        other => panic!("expected error, got {other:?}"),
    }
    // The connection is closed after the rejection.
    let next = tokio::time::timeout(Duration::from_secs(2), ws.next())
        .await
        .expect("timed out waiting for close");
    match next {
        None | Some(Ok(WsMessage::Close(_))) | Some(Err(_)) => {}
        other => panic!("expected close, got {other:?}"),
    }
}

#[tokio::test]
async fn test_handshake_invalid_token_rejected() {
    let (addr, _service) = start_server(long_grace()).await;
    let mut ws = connect_raw(&addr).await;

    handshake(&mut ws, serde_json::json!("garbage")).await;

    match recv_event(&mut ws).await {
        ServerEvent::Error { message } => {
            assert_eq!(message, "Authentication error: Invalid token");
        }
        other => panic!("expected error, got {other:?}"),
    }
}

#[tokio::test]
async fn test_handshake_unknown_user_rejected() {
    let (addr, _service) = start_server(long_grace()).await;
    let mut ws = connect_raw(&addr).await;

    handshake(&mut ws, serde_json::json!("tok-u-999")).await;

    match recv_event(&mut ws).await {
        ServerEvent::Error { message } => {
            assert_eq!(message, "Authentication error: User not found");
        }
        other => panic!("expected error, got {other:?}"),
    }
}

// =========================================================================
// Direct messages
// =========================================================================

#[tokio::test]
async fn test_direct_message_delivered_live_with_expanded_sender() {
    let (addr, _service) = start_server(long_grace()).await;
    let mut alice = connect_as(&addr, "tok-u-1").await;
    let mut bob = connect_as(&addr, "tok-u-2").await;

    send_frame(&mut alice, private_message("u-2", "hey bob")).await;

    match recv_event(&mut bob).await {
        ServerEvent::NewMessage(msg) => {
            assert_eq!(msg.message, "hey bob");
            assert_eq!(msg.sender.id, uid("u-1"));
            assert_eq!(msg.sender.name, "Alice");
            assert_eq!(msg.sender.email, "alice@example.com");
            assert_eq!(
                msg.target,
                MessageTarget::Direct {
                    recipient: uid("u-2")
                }
            );
        }
        other => panic!("expected new-message, got {other:?}"),
    }
    match recv_event(&mut alice).await {
        ServerEvent::MessageSent(msg) => assert_eq!(msg.message, "hey bob"),
        other => panic!("expected message-sent, got {other:?}"),
    }
}

#[tokio::test]
async fn test_direct_message_reaches_all_recipient_sessions() {
    let (addr, _service) = start_server(long_grace()).await;
    let mut alice = connect_as(&addr, "tok-u-1").await;
    let mut bob_laptop = connect_as(&addr, "tok-u-2").await;
    let mut bob_phone = connect_as(&addr, "tok-u-2").await;

    send_frame(&mut alice, private_message("u-2", "ping")).await;

    assert!(matches!(
        recv_event(&mut bob_laptop).await,
        ServerEvent::NewMessage(_)
    ));
    assert!(matches!(
        recv_event(&mut bob_phone).await,
        ServerEvent::NewMessage(_)
    ));
}

#[tokio::test]
async fn test_offline_direct_message_persists_without_retroactive_delivery() {
    let (addr, service) = start_server(long_grace()).await;
    let mut alice = connect_as(&addr, "tok-u-1").await;

    // Bob is offline; the message must persist anyway.
    send_frame(&mut alice, private_message("u-2", "see you later")).await;
    assert!(matches!(
        recv_event(&mut alice).await,
        ServerEvent::MessageSent(_)
    ));

    let history = service
        .direct_history(&uid("u-1"), &uid("u-2"))
        .await
        .expect("history should succeed");
    assert_eq!(history.len(), 1);
    assert_eq!(history[0].message, "see you later");
    assert_eq!(history[0].sender.id, uid("u-1"));

    // When Bob shows up, nothing is replayed over the live channel.
    let mut bob = connect_as(&addr, "tok-u-2").await;
    expect_silence(&mut bob, Duration::from_millis(300)).await;
}

#[tokio::test]
async fn test_direct_history_ascending_and_immutable() {
    let (addr, service) = start_server(long_grace()).await;
    let mut alice = connect_as(&addr, "tok-u-1").await;
    let mut bob = connect_as(&addr, "tok-u-2").await;

    for text in ["one", "two", "three"] {
        send_frame(&mut alice, private_message("u-2", text)).await;
        // Wait for the confirmation so ordering is by our send order.
        assert!(matches!(
            recv_event(&mut alice).await,
            ServerEvent::MessageSent(_)
        ));
    }
    // Bob's queue holds the three live deliveries before his own
    // confirmation shows up.
    send_frame(&mut bob, private_message("u-1", "four")).await;
    for _ in 0..3 {
        assert!(matches!(
            recv_event(&mut bob).await,
            ServerEvent::NewMessage(_)
        ));
    }
    assert!(matches!(
        recv_event(&mut bob).await,
        ServerEvent::MessageSent(_)
    ));

    let history = service
        .direct_history(&uid("u-2"), &uid("u-1"))
        .await
        .expect("history should succeed");

    let bodies: Vec<&str> = history.iter().map(|m| m.message.as_str()).collect();
    assert_eq!(bodies, vec!["one", "two", "three", "four"]);
    for msg in &history {
        assert!(
            matches!(msg.target, MessageTarget::Direct { .. }),
            "kind and target never change after creation"
        );
    }
}

// =========================================================================
// Room messages
// =========================================================================

#[tokio::test]
async fn test_room_message_fans_out_to_other_members_only() {
    let (addr, service) = start_server(long_grace()).await;
    let room = service
        .create_room(&uid("u-1"), "general", "", vec![uid("u-2"), uid("u-3")], false)
        .await
        .expect("room should be created");

    let mut alice = connect_as(&addr, "tok-u-1").await;
    let mut bob = connect_as(&addr, "tok-u-2").await;
    let mut carol = connect_as(&addr, "tok-u-3").await;
    let mut dave = connect_as(&addr, "tok-u-4").await; // not a member

    send_frame(&mut alice, room_message(&room.id, "hi")).await;

    for member in [&mut bob, &mut carol] {
        match recv_event(member).await {
            ServerEvent::NewRoomMessage(msg) => {
                assert_eq!(msg.message, "hi");
                assert_eq!(msg.sender.id, uid("u-1"));
                assert_eq!(msg.sender.name, "Alice");
                assert_eq!(
                    msg.target,
                    MessageTarget::Room {
                        room_id: room.id.clone()
                    }
                );
            }
            other => panic!("expected new-room-message, got {other:?}"),
        }
    }
    match recv_event(&mut alice).await {
        ServerEvent::MessageSent(msg) => assert_eq!(msg.message, "hi"),
        other => panic!("expected message-sent, got {other:?}"),
    }

    // Exactly one delivery per member, none to the sender or outsiders.
    expect_silence(&mut bob, Duration::from_millis(300)).await;
    expect_silence(&mut carol, Duration::from_millis(300)).await;
    expect_silence(&mut alice, Duration::from_millis(300)).await;
    expect_silence(&mut dave, Duration::from_millis(300)).await;
}

#[tokio::test]
async fn test_non_member_room_send_rejected_and_not_persisted() {
    let (addr, service) = start_server(long_grace()).await;
    let room = service
        .create_room(&uid("u-1"), "members-only", "", vec![], true)
        .await
        .expect("room should be created");

    let mut dave = connect_as(&addr, "tok-u-4").await;
    send_frame(&mut dave, room_message(&room.id, "let me in")).await;

    match recv_event(&mut dave).await {
        ServerEvent::Error { message } => {
            assert_eq!(message, "You are not a member of this room");
        }
        other => panic!("expected error, got {other:?}"),
    }

    let history = service
        .room_history(&uid("u-1"), &room.id)
        .await
        .expect("history should succeed");
    assert!(history.is_empty(), "rejected message must not be persisted");
}

// =========================================================================
// Explicit join/leave of room channels
// =========================================================================

#[tokio::test]
async fn test_explicit_join_and_leave_emit_presence_events() {
    let (addr, service) = start_server(long_grace()).await;
    let room = service
        .create_room(&uid("u-1"), "general", "", vec![uid("u-2")], false)
        .await
        .expect("room should be created");

    let mut alice = connect_as(&addr, "tok-u-1").await;
    let mut bob = connect_as(&addr, "tok-u-2").await;

    send_frame(
        &mut alice,
        serde_json::json!({
            "event": "join-room",
            "data": { "roomId": room.id }
        }),
    )
    .await;

    match recv_event(&mut alice).await {
        ServerEvent::RoomJoined { room_id, name } => {
            assert_eq!(room_id, room.id);
            assert_eq!(name, "general");
        }
        other => panic!("expected room-joined, got {other:?}"),
    }
    match recv_event(&mut bob).await {
        ServerEvent::UserJoinedRoom { room_id, user } => {
            assert_eq!(room_id, room.id);
            assert_eq!(user.id, uid("u-1"));
        }
        other => panic!("expected user-joined-room, got {other:?}"),
    }

    send_frame(
        &mut alice,
        serde_json::json!({
            "event": "leave-room",
            "data": { "roomId": room.id }
        }),
    )
    .await;

    match recv_event(&mut alice).await {
        ServerEvent::RoomLeft { room_id, name } => {
            assert_eq!(room_id, room.id);
            assert_eq!(name, "general");
        }
        other => panic!("expected room-left, got {other:?}"),
    }
    match recv_event(&mut bob).await {
        ServerEvent::UserLeftRoom { room_id, user } => {
            assert_eq!(room_id, room.id);
            assert_eq!(user.id, uid("u-1"));
        }
        other => panic!("expected user-left-room, got {other:?}"),
    }

    // Alice's session is detached: Bob's messages no longer reach her,
    // though her membership is intact.
    send_frame(&mut bob, room_message(&room.id, "still there?")).await;
    assert!(matches!(
        recv_event(&mut bob).await,
        ServerEvent::MessageSent(_)
    ));
    expect_silence(&mut alice, Duration::from_millis(300)).await;
}

#[tokio::test]
async fn test_join_room_requires_membership() {
    let (addr, service) = start_server(long_grace()).await;
    let room = service
        .create_room(&uid("u-1"), "general", "", vec![], false)
        .await
        .expect("room should be created");

    let mut dave = connect_as(&addr, "tok-u-4").await;
    send_frame(
        &mut dave,
        serde_json::json!({
            "event": "join-room",
            "data": { "roomId": room.id }
        }),
    )
    .await;

    match recv_event(&mut dave).await {
        ServerEvent::Error { message } => {
            assert_eq!(message, "You are not a member of this room");
        }
        other => panic!("expected error, got {other:?}"),
    }
}

// =========================================================================
// Membership changes over the service facade
// =========================================================================

#[tokio::test]
async fn test_create_room_notifies_online_members() {
    let (addr, service) = start_server(long_grace()).await;
    let mut alice = connect_as(&addr, "tok-u-1").await;
    let mut bob = connect_as(&addr, "tok-u-2").await;

    service
        .create_room(&uid("u-1"), "planning", "sprint planning", vec![uid("u-2")], false)
        .await
        .expect("room should be created");

    for ws in [&mut alice, &mut bob] {
        match recv_event(ws).await {
            ServerEvent::RoomAdded { room, message } => {
                assert_eq!(room.name, "planning");
                assert_eq!(message, "You've been added to planning by Alice");
            }
            other => panic!("expected room-added, got {other:?}"),
        }
    }
}

#[tokio::test]
async fn test_add_members_notifies_only_the_new_members() {
    let (addr, service) = start_server(long_grace()).await;
    let room = service
        .create_room(&uid("u-1"), "ops", "", vec![], false)
        .await
        .expect("room should be created");

    // The room predates both connections, so neither has pending events.
    let mut alice = connect_as(&addr, "tok-u-1").await;
    let mut carol = connect_as(&addr, "tok-u-3").await;

    let updated = service
        .add_members(&room.id, &uid("u-1"), vec![uid("u-3")])
        .await
        .expect("add should succeed");
    assert!(updated.is_member(&uid("u-3")));

    match recv_event(&mut carol).await {
        ServerEvent::RoomAdded { room, message } => {
            assert_eq!(room.id, updated.id);
            assert_eq!(message, "You've been added to ops by Alice");
        }
        other => panic!("expected room-added, got {other:?}"),
    }
    expect_silence(&mut alice, Duration::from_millis(300)).await;
}

#[tokio::test]
async fn test_add_members_requires_creator_via_service() {
    let (_addr, service) = start_server(long_grace()).await;
    let room = service
        .create_room(&uid("u-1"), "ops", "", vec![uid("u-2")], false)
        .await
        .expect("room should be created");

    let result = service
        .add_members(&room.id, &uid("u-2"), vec![uid("u-3")])
        .await;

    assert!(matches!(result, Err(ChatError::Authorization(_))));
}

#[tokio::test]
async fn test_membership_leave_notifies_room_and_detaches_sessions() {
    let (addr, service) = start_server(long_grace()).await;
    let room = service
        .create_room(&uid("u-1"), "general", "", vec![uid("u-2")], false)
        .await
        .expect("room should be created");

    let mut alice = connect_as(&addr, "tok-u-1").await;
    let mut bob = connect_as(&addr, "tok-u-2").await;

    service
        .leave_room(&room.id, &uid("u-2"))
        .await
        .expect("leave should succeed");

    // Everyone still on the channel hears it — including the leaver's
    // own session, which is detached right after.
    for ws in [&mut alice, &mut bob] {
        match recv_event(ws).await {
            ServerEvent::RoomMemberLeft {
                room_id,
                user_id,
                user_name,
            } => {
                assert_eq!(room_id, room.id);
                assert_eq!(user_id, uid("u-2"));
                assert_eq!(user_name, "Bob");
            }
            other => panic!("expected room-member-left, got {other:?}"),
        }
    }

    send_frame(&mut alice, room_message(&room.id, "bye bob")).await;
    assert!(matches!(
        recv_event(&mut alice).await,
        ServerEvent::MessageSent(_)
    ));
    expect_silence(&mut bob, Duration::from_millis(300)).await;
}

// =========================================================================
// Disconnect grace window
// =========================================================================

#[tokio::test]
async fn test_reconnect_within_grace_resumes_silently() {
    let (addr, service) = start_server(Duration::from_secs(1)).await;
    service
        .create_room(&uid("u-1"), "general", "", vec![uid("u-2")], false)
        .await
        .expect("room should be created");

    let mut bob = connect_as(&addr, "tok-u-2").await;
    let mut alice = connect_as(&addr, "tok-u-1").await;

    alice.close(None).await.expect("close should succeed");
    // Let the server process the close before the reconnect races it.
    tokio::time::sleep(Duration::from_millis(50)).await;

    // Alice comes back well inside the window.
    let mut alice = connect_as(&addr, "tok-u-1").await;
    match recv_event(&mut alice).await {
        ServerEvent::ReconnectionSuccessful { message } => {
            assert_eq!(message, "Reconnected to chat");
        }
        other => panic!("expected reconnection-successful, got {other:?}"),
    }
    // Exactly one resume notice, and nothing else pending.
    expect_silence(&mut alice, Duration::from_millis(300)).await;

    // Bob never hears a departure — wait out the original window.
    expect_silence(&mut bob, Duration::from_millis(1500)).await;
}

#[tokio::test]
async fn test_grace_expiry_announces_departure_exactly_once() {
    let (addr, service) = start_server(Duration::from_millis(200)).await;
    service
        .create_room(&uid("u-1"), "general", "", vec![uid("u-2")], false)
        .await
        .expect("room should be created");

    let mut bob = connect_as(&addr, "tok-u-2").await;
    let mut alice = connect_as(&addr, "tok-u-1").await;

    alice.close(None).await.expect("close should succeed");

    match recv_event(&mut bob).await {
        ServerEvent::UserPermanentlyDisconnected { user_id, user_name } => {
            assert_eq!(user_id, uid("u-1"));
            assert_eq!(user_name, "Alice");
        }
        other => panic!("expected user-permanently-disconnected, got {other:?}"),
    }
    expect_silence(&mut bob, Duration::from_millis(500)).await;
}

#[tokio::test]
async fn test_rapid_disconnect_reconnect_disconnect_announces_once() {
    // The stale-timer race: the first disconnect's timer must not fire
    // after a reconnect already consumed its record, and the second
    // disconnect announces exactly once.
    let (addr, service) = start_server(Duration::from_millis(400)).await;
    service
        .create_room(&uid("u-1"), "general", "", vec![uid("u-2")], false)
        .await
        .expect("room should be created");

    let mut bob = connect_as(&addr, "tok-u-2").await;

    let mut alice = connect_as(&addr, "tok-u-1").await;
    alice.close(None).await.expect("close should succeed");
    tokio::time::sleep(Duration::from_millis(50)).await;

    // Reconnect inside the first window...
    let mut alice = connect_as(&addr, "tok-u-1").await;
    assert!(matches!(
        recv_event(&mut alice).await,
        ServerEvent::ReconnectionSuccessful { .. }
    ));
    // ...and drop again immediately.
    alice.close(None).await.expect("close should succeed");

    match recv_event(&mut bob).await {
        ServerEvent::UserPermanentlyDisconnected { user_id, .. } => {
            assert_eq!(user_id, uid("u-1"));
        }
        other => panic!("expected user-permanently-disconnected, got {other:?}"),
    }
    // The stale first timer and the consumed record must yield nothing
    // further.
    expect_silence(&mut bob, Duration::from_millis(800)).await;
}

// =========================================================================
// Validation and malformed frames
// =========================================================================

#[tokio::test]
async fn test_validation_errors_leave_the_session_usable() {
    let (addr, _service) = start_server(long_grace()).await;
    let mut alice = connect_as(&addr, "tok-u-1").await;
    let mut bob = connect_as(&addr, "tok-u-2").await;

    send_frame(&mut alice, private_message("u-2", "")).await;
    match recv_event(&mut alice).await {
        ServerEvent::Error { message } => {
            assert_eq!(message, "Recipient ID and message are required");
        }
        other => panic!("expected error, got {other:?}"),
    }

    send_frame(&mut alice, room_message(&RoomId::from(""), "hello")).await;
    match recv_event(&mut alice).await {
        ServerEvent::Error { message } => {
            assert_eq!(message, "Room ID and message are required");
        }
        other => panic!("expected error, got {other:?}"),
    }

    // The connection survived both rejections.
    send_frame(&mut alice, private_message("u-2", "still here")).await;
    assert!(matches!(
        recv_event(&mut alice).await,
        ServerEvent::MessageSent(_)
    ));
    assert!(matches!(
        recv_event(&mut bob).await,
        ServerEvent::NewMessage(_)
    ));
}

#[tokio::test]
async fn test_undecodable_frame_reports_invalid_payload() {
    let (addr, _service) = start_server(long_grace()).await;
    let mut alice = connect_as(&addr, "tok-u-1").await;

    alice
        .send(WsMessage::Text("not json".into()))
        .await
        .expect("send should succeed");

    match recv_event(&mut alice).await {
        ServerEvent::Error { message } => {
            assert_eq!(message, "Invalid request payload");
        }
        other => panic!("expected error, got {other:?}"),
    }
}

// =========================================================================
// Service queries
// =========================================================================

#[tokio::test]
async fn test_online_users_distinct_across_devices() {
    let (addr, service) = start_server(long_grace()).await;
    let _alice = connect_as(&addr, "tok-u-1").await;
    let _bob_laptop = connect_as(&addr, "tok-u-2").await;
    let _bob_phone = connect_as(&addr, "tok-u-2").await;

    let mut names: Vec<String> = service
        .online_users()
        .await
        .into_iter()
        .map(|u| u.name)
        .collect();
    names.sort();

    assert_eq!(names, vec!["Alice", "Bob"]);
}

#[tokio::test]
async fn test_chat_partners_resolved_to_summaries() {
    let (addr, service) = start_server(long_grace()).await;
    let mut alice = connect_as(&addr, "tok-u-1").await;

    send_frame(&mut alice, private_message("u-2", "hi bob")).await;
    assert!(matches!(
        recv_event(&mut alice).await,
        ServerEvent::MessageSent(_)
    ));
    send_frame(&mut alice, private_message("u-3", "hi carol")).await;
    assert!(matches!(
        recv_event(&mut alice).await,
        ServerEvent::MessageSent(_)
    ));

    let partners = service
        .chat_partners(&uid("u-1"))
        .await
        .expect("partners should resolve");
    let names: Vec<&str> = partners.iter().map(|u| u.name.as_str()).collect();

    assert_eq!(names, vec!["Bob", "Carol"]);
}

#[tokio::test]
async fn test_direct_history_unknown_user_is_not_found() {
    let (_addr, service) = start_server(long_grace()).await;

    let result = service.direct_history(&uid("u-1"), &uid("u-999")).await;

    assert!(matches!(result, Err(ChatError::NotFound(_))));
}

#[tokio::test]
async fn test_room_history_requires_membership() {
    let (_addr, service) = start_server(long_grace()).await;
    let room = service
        .create_room(&uid("u-1"), "general", "", vec![], false)
        .await
        .expect("room should be created");

    let result = service.room_history(&uid("u-4"), &room.id).await;

    assert!(matches!(result, Err(ChatError::Authorization(_))));
}
