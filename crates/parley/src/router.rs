//! Message router: validation, persistence, and best-effort delivery.
//!
//! Both send paths follow the same discipline: validate, persist, *then*
//! deliver. The store write happening strictly before any live delivery
//! is what lets a client trust that a message it just saw arrive will
//! also be in the next history fetch — there is no window where a
//! message is visible live but not durable.

use std::sync::Arc;

use parley_protocol::{Codec, MessageTarget, RoomId, ServerEvent, UserId, UserSummary};
use parley_room::RoomError;
use parley_session::{ChannelKey, SessionId, TokenVerifier};
use parley_store::NewMessage;

use crate::server::ServerState;
use crate::{ChatError, ChatStore};

/// Sends a direct message to one user.
///
/// No authorization beyond being authenticated: anyone may message
/// anyone, and the message persists whether or not the recipient is
/// online. Delivery fans out to every live session on the recipient's
/// personal channel; the issuing session alone gets the `message-sent`
/// echo.
pub(crate) async fn send_direct<V, S, C>(
    state: &Arc<ServerState<V, S, C>>,
    session_id: &SessionId,
    sender: &UserSummary,
    recipient_id: &UserId,
    body: &str,
) -> Result<(), ChatError>
where
    V: TokenVerifier,
    S: ChatStore,
    C: Codec,
{
    if recipient_id.is_empty() || body.is_empty() {
        return Err(ChatError::Validation(
            "Recipient ID and message are required".into(),
        ));
    }

    // Persist first; a store failure aborts before anyone hears anything.
    let message = state
        .store
        .create_message(NewMessage {
            sender: sender.id.clone(),
            target: MessageTarget::Direct {
                recipient: recipient_id.clone(),
            },
            body: body.to_string(),
        })
        .await?;

    let expanded = message.expand(sender.clone());
    let registry = state.registry.lock().await;
    registry.broadcast(
        &ChannelKey::Personal(recipient_id.clone()),
        &ServerEvent::NewMessage(expanded.clone()),
        None,
    );
    registry.send_to_session(session_id, ServerEvent::MessageSent(expanded));

    tracing::debug!(
        message_id = %message.id,
        sender = %sender.id,
        recipient = %recipient_id,
        "direct message routed"
    );
    Ok(())
}

/// Sends a message into a room.
///
/// Membership is the sole authorization gate; a non-member's message is
/// rejected before anything is persisted. On success the room channel
/// receives `new-room-message` — except the issuing session, which gets
/// the `message-sent` confirmation instead.
pub(crate) async fn send_room<V, S, C>(
    state: &Arc<ServerState<V, S, C>>,
    session_id: &SessionId,
    sender: &UserSummary,
    room_id: &RoomId,
    body: &str,
) -> Result<(), ChatError>
where
    V: TokenVerifier,
    S: ChatStore,
    C: Codec,
{
    if room_id.is_empty() || body.is_empty() {
        return Err(ChatError::Validation(
            "Room ID and message are required".into(),
        ));
    }

    if !state.rooms.is_member(room_id, &sender.id).await? {
        return Err(RoomError::NotAMember(sender.id.clone(), room_id.clone()).into());
    }

    let message = state
        .store
        .create_message(NewMessage {
            sender: sender.id.clone(),
            target: MessageTarget::Room {
                room_id: room_id.clone(),
            },
            body: body.to_string(),
        })
        .await?;

    let expanded = message.expand(sender.clone());
    let registry = state.registry.lock().await;
    registry.broadcast(
        &ChannelKey::Room(room_id.clone()),
        &ServerEvent::NewRoomMessage(expanded.clone()),
        Some(session_id),
    );
    registry.send_to_session(session_id, ServerEvent::MessageSent(expanded));

    tracing::debug!(
        message_id = %message.id,
        sender = %sender.id,
        %room_id,
        "room message routed"
    );
    Ok(())
}
