//! Presence operations: explicit channel joins/leaves and the disconnect
//! grace window.
//!
//! Auto-joining at connection time lives in the handler (it is part of
//! activation); this module owns what happens *after* a session is
//! active — the client-requested `join-room`/`leave-room` operations and
//! the timed path from a dropped transport to a departure announcement.

use std::sync::Arc;

use parley_protocol::{Codec, RoomId, ServerEvent, UserId, UserSummary};
use parley_session::{ChannelKey, SessionId, TokenVerifier};
use tokio::time::sleep;

use crate::server::ServerState;
use crate::{ChatError, ChatStore};

/// Attaches a session to a room's live channel, on request.
///
/// This is not a membership grant — the membership must already exist
/// (`is_member` is the gate), this just makes the current session a
/// delivery target for the room. The other sessions on the channel learn
/// about the arrival; the requester gets a confirmation.
pub(crate) async fn join_room<V, S, C>(
    state: &Arc<ServerState<V, S, C>>,
    session_id: &SessionId,
    user: &UserSummary,
    room_id: &RoomId,
) -> Result<(), ChatError>
where
    V: TokenVerifier,
    S: ChatStore,
    C: Codec,
{
    if room_id.is_empty() {
        return Err(ChatError::Validation("Room ID is required".into()));
    }
    let room = state.rooms.member_room(room_id, &user.id).await?;

    let mut registry = state.registry.lock().await;
    let key = ChannelKey::Room(room.id.clone());
    registry.join_channel(session_id, key.clone());
    registry.broadcast(
        &key,
        &ServerEvent::UserJoinedRoom {
            room_id: room.id.clone(),
            user: user.clone(),
        },
        Some(session_id),
    );
    registry.send_to_session(
        session_id,
        ServerEvent::RoomJoined {
            room_id: room.id.clone(),
            name: room.name.clone(),
        },
    );

    tracing::info!(user_id = %user.id, room_id = %room.id, "session joined room channel");
    Ok(())
}

/// Detaches a session from a room's live channel, on request.
///
/// Membership is untouched — the user still belongs to the room and can
/// re-attach later; this session just stops receiving the room's traffic.
pub(crate) async fn leave_room<V, S, C>(
    state: &Arc<ServerState<V, S, C>>,
    session_id: &SessionId,
    user: &UserSummary,
    room_id: &RoomId,
) -> Result<(), ChatError>
where
    V: TokenVerifier,
    S: ChatStore,
    C: Codec,
{
    if room_id.is_empty() {
        return Err(ChatError::Validation("Room ID is required".into()));
    }
    let room = state.rooms.member_room(room_id, &user.id).await?;

    let mut registry = state.registry.lock().await;
    let key = ChannelKey::Room(room.id.clone());
    registry.leave_channel(session_id, &key);
    // The session is already off the channel, so no `except` is needed —
    // but the user's other sessions legitimately hear about this one.
    registry.broadcast(
        &key,
        &ServerEvent::UserLeftRoom {
            room_id: room.id.clone(),
            user: user.clone(),
        },
        None,
    );
    registry.send_to_session(
        session_id,
        ServerEvent::RoomLeft {
            room_id: room.id.clone(),
            name: room.name.clone(),
        },
    );

    tracing::info!(user_id = %user.id, room_id = %room.id, "session left room channel");
    Ok(())
}

/// Detaches a closed session and arms its grace timer.
///
/// Called from the handler's drop guard, so it runs on every exit path.
/// The disconnect itself (channel removal + record write) happens under
/// the registry lock; the timer then sleeps outside any lock and calls
/// [`announce_if_expired`] with the session id it was armed for.
pub(crate) fn begin_grace<V, S, C>(
    state: Arc<ServerState<V, S, C>>,
    session_id: SessionId,
) where
    V: TokenVerifier,
    S: ChatStore,
    C: Codec,
{
    tokio::spawn(async move {
        let (record, grace) = {
            let mut registry = state.registry.lock().await;
            (registry.disconnect(&session_id), registry.grace_period())
        };
        let Some(record) = record else {
            // Session was never registered or already gone.
            return;
        };

        let user_id = record.user.id.clone();
        sleep(grace).await;
        announce_if_expired(&state, user_id, session_id).await;
    });
}

/// Resolves a fired grace timer: if the disconnect record still exists
/// and still belongs to this session, the user is gone for real and
/// their rooms are told. A consumed or superseded record makes the timer
/// a no-op — the stale-timer guard lives in the registry's `expire`.
pub(crate) async fn announce_if_expired<V, S, C>(
    state: &Arc<ServerState<V, S, C>>,
    user_id: UserId,
    session_id: SessionId,
) where
    V: TokenVerifier,
    S: ChatStore,
    C: Codec,
{
    let record = {
        let mut registry = state.registry.lock().await;
        registry.expire(&user_id, &session_id)
    };
    let Some(record) = record else {
        return;
    };

    // The interested listeners are the rooms the user belongs to; their
    // attached sessions get the announcement.
    let rooms = match state.rooms.rooms_for(&user_id).await {
        Ok(rooms) => rooms,
        Err(e) => {
            tracing::warn!(
                %user_id,
                error = %e,
                "could not list rooms for departure announcement"
            );
            return;
        }
    };

    let event = ServerEvent::UserPermanentlyDisconnected {
        user_id: record.user.id.clone(),
        user_name: record.user.name.clone(),
    };
    let registry = state.registry.lock().await;
    for room in &rooms {
        registry.broadcast(&ChannelKey::Room(room.id.clone()), &event, None);
    }
    tracing::info!(%user_id, rooms = rooms.len(), "permanent disconnect announced");
}
