//! Per-connection handler: handshake, authentication, and the request loop.
//!
//! Each accepted connection gets its own Tokio task running this handler.
//! The flow is the session lifecycle, phase by phase:
//!   1. `Connecting` — receive the handshake frame, verify the token,
//!      resolve the user. No chat handler runs before this succeeds.
//!   2. `Authenticated` — spawn the outbound writer, register the
//!      session, join the personal channel and every room channel.
//!   3. `Active` — loop: receive frames, dispatch, report per-request
//!      errors to this session only.
//!   4. `Disconnected` — on exit the drop guard detaches the session and
//!      starts the grace window.

use std::sync::Arc;
use std::time::Duration;

use parley_protocol::{ClientEvent, Codec, ProtocolError, ServerEvent, UserSummary};
use parley_session::{
    AuthError, ChannelKey, SessionId, SessionPhase, TokenVerifier,
};
use parley_transport::{Connection, WebSocketConnection};
use tokio::sync::mpsc;

use crate::server::{ServerState, PROTOCOL_VERSION};
use crate::{presence, router, ChatError, ChatStore};

/// How long a fresh connection has to present its handshake frame.
/// The only pre-authentication timeout; once a session is active, idle
/// connections are left alone — a quiet chat tab is not an error.
const HANDSHAKE_TIMEOUT: Duration = Duration::from_secs(5);

/// Drop guard that detaches the session and starts the grace window when
/// the handler exits — on clean close, on error, or on panic alike.
///
/// `Drop` is synchronous, so the actual work happens in a spawned task;
/// the registry lock inside decides every disconnect/reconnect race.
struct SessionGuard<V: TokenVerifier, S: ChatStore, C: Codec> {
    session_id: SessionId,
    state: Arc<ServerState<V, S, C>>,
}

impl<V: TokenVerifier, S: ChatStore, C: Codec> Drop for SessionGuard<V, S, C> {
    fn drop(&mut self) {
        presence::begin_grace(Arc::clone(&self.state), self.session_id.clone());
    }
}

/// Handles a single connection from accept to close.
pub(crate) async fn handle_connection<V, S, C>(
    conn: WebSocketConnection,
    state: Arc<ServerState<V, S, C>>,
) -> Result<(), ChatError>
where
    V: TokenVerifier,
    S: ChatStore,
    C: Codec + Clone,
{
    let conn_id = conn.id();
    tracing::debug!(%conn_id, "handling new connection");
    let mut phase = SessionPhase::Connecting;

    // --- Phase: Connecting → Authenticated ---
    let user = match authenticate(&conn, &state).await {
        Ok(user) => user,
        Err(err) => {
            // One final error event so the client knows why, then the
            // connection is done. No session was ever registered.
            let _ = send_event(
                &conn,
                &state.codec,
                &ServerEvent::Error {
                    message: err.client_message(),
                },
            )
            .await;
            let _ = conn.close().await;
            return Err(err);
        }
    };
    debug_assert!(phase.can_transition_to(SessionPhase::Authenticated));
    phase = SessionPhase::Authenticated;
    tracing::info!(%conn_id, user_id = %user.id, "connection authenticated");

    // --- Outbound writer task ---
    // Handlers and broadcasts push events into this channel; the writer
    // owns the socket's send half. A slow or dead client therefore never
    // blocks whoever is delivering to it.
    let (events_tx, mut events_rx) = mpsc::unbounded_channel::<ServerEvent>();
    let conn = Arc::new(conn);
    {
        let conn = Arc::clone(&conn);
        let codec = state.codec.clone();
        tokio::spawn(async move {
            while let Some(event) = events_rx.recv().await {
                let bytes = match codec.encode(&event) {
                    Ok(bytes) => bytes,
                    Err(e) => {
                        tracing::warn!(error = %e, "failed to encode outbound event");
                        continue;
                    }
                };
                if conn.send(&bytes).await.is_err() {
                    break;
                }
            }
        });
    }

    // --- Phase: Authenticated → Active ---
    // Fetch the user's rooms first, then take the registry lock once:
    // registration, the personal channel, every room channel, and the
    // grace-record consumption land in a single critical section.
    let rooms = match state.rooms.rooms_for(&user.id).await {
        Ok(rooms) => rooms,
        Err(e) => {
            let err = ChatError::from(e);
            let _ = conn.close().await;
            return Err(err);
        }
    };
    let outcome = {
        let mut registry = state.registry.lock().await;
        let outcome = registry.register(user.clone(), events_tx.clone());
        for room in &rooms {
            registry.join_channel(
                &outcome.session_id,
                ChannelKey::Room(room.id.clone()),
            );
        }
        outcome
    };
    debug_assert!(phase.can_transition_to(SessionPhase::Active));
    phase = SessionPhase::Active;

    let session_id = outcome.session_id.clone();
    let _guard = SessionGuard {
        session_id: session_id.clone(),
        state: Arc::clone(&state),
    };

    let _ = events_tx.send(ServerEvent::Connected { user: user.clone() });
    if outcome.resumed {
        // The disconnect record was consumed during registration: this
        // connection resumes the same logical presence, and nobody was
        // told the user left.
        let _ = events_tx.send(ServerEvent::ReconnectionSuccessful {
            message: "Reconnected to chat".into(),
        });
    }

    // --- Phase: Active — the request loop ---
    loop {
        let data = match conn.recv().await {
            Ok(Some(data)) => data,
            Ok(None) => {
                tracing::info!(user_id = %user.id, %session_id, "connection closed");
                break;
            }
            Err(e) => {
                tracing::debug!(user_id = %user.id, error = %e, "recv error");
                break;
            }
        };

        let event: ClientEvent = match state.codec.decode(&data) {
            Ok(event) => event,
            Err(e) => {
                tracing::debug!(user_id = %user.id, error = %e, "undecodable frame");
                let _ = events_tx.send(ServerEvent::Error {
                    message: "Invalid request payload".into(),
                });
                continue;
            }
        };

        if let Err(err) = dispatch(&state, &session_id, &user, event).await {
            if err.is_fatal() {
                tracing::debug!(
                    user_id = %user.id,
                    error = %err,
                    "fatal error in request loop"
                );
                break;
            }
            // Authorization, validation, not-found, persistence: report
            // to the requesting session; nobody else is affected.
            let _ = events_tx.send(ServerEvent::Error {
                message: err.client_message(),
            });
        }
    }

    debug_assert!(phase.can_transition_to(SessionPhase::Disconnected));
    phase = SessionPhase::Disconnected;
    tracing::debug!(%conn_id, user_id = %user.id, %phase, "handler finished");

    // _guard drops here → the session detaches and its grace timer arms.
    Ok(())
}

/// Receives and validates the handshake, then resolves the caller to a
/// user. Any failure here rejects the connection attempt.
async fn authenticate<V, S, C>(
    conn: &WebSocketConnection,
    state: &Arc<ServerState<V, S, C>>,
) -> Result<UserSummary, ChatError>
where
    V: TokenVerifier,
    S: ChatStore,
    C: Codec,
{
    let data = match tokio::time::timeout(HANDSHAKE_TIMEOUT, conn.recv()).await {
        Ok(Ok(Some(data))) => data,
        Ok(Ok(None)) => {
            return Err(ProtocolError::InvalidMessage(
                "connection closed before handshake".into(),
            )
            .into());
        }
        Ok(Err(e)) => return Err(ChatError::Transport(e)),
        Err(_) => {
            return Err(
                ProtocolError::InvalidMessage("handshake timed out".into()).into()
            );
        }
    };

    let event: ClientEvent = state.codec.decode(&data)?;
    let (version, token) = match event {
        ClientEvent::Handshake { version, token } => (version, token),
        _ => {
            return Err(ProtocolError::InvalidMessage(
                "first message must be handshake".into(),
            )
            .into());
        }
    };

    if version != PROTOCOL_VERSION {
        return Err(ProtocolError::InvalidMessage(format!(
            "version mismatch: expected {PROTOCOL_VERSION}, got {version}"
        ))
        .into());
    }

    // An absent or empty token is an authentication failure in its own
    // right, reported as such rather than as a malformed frame.
    let token = token
        .filter(|t| !t.is_empty())
        .ok_or(AuthError::MissingToken)?;
    let user_id = state.auth.verify(&token).await?;

    // The token names a user; the directory must still know them.
    state
        .store
        .find_by_id(&user_id)
        .await?
        .ok_or_else(|| AuthError::UserNotFound.into())
}

/// Routes one decoded client event to its operation.
async fn dispatch<V, S, C>(
    state: &Arc<ServerState<V, S, C>>,
    session_id: &SessionId,
    user: &UserSummary,
    event: ClientEvent,
) -> Result<(), ChatError>
where
    V: TokenVerifier,
    S: ChatStore,
    C: Codec,
{
    match event {
        ClientEvent::Handshake { .. } => {
            tracing::debug!(user_id = %user.id, "ignoring repeated handshake");
            Ok(())
        }
        ClientEvent::PrivateMessage {
            recipient_id,
            message,
        } => router::send_direct(state, session_id, user, &recipient_id, &message).await,
        ClientEvent::RoomMessage { room_id, message } => {
            router::send_room(state, session_id, user, &room_id, &message).await
        }
        ClientEvent::JoinRoom { room_id } => {
            presence::join_room(state, session_id, user, &room_id).await
        }
        ClientEvent::LeaveRoom { room_id } => {
            presence::leave_room(state, session_id, user, &room_id).await
        }
    }
}

/// Sends one event straight down the connection — used before the writer
/// task exists (handshake rejections).
async fn send_event<C: Codec>(
    conn: &WebSocketConnection,
    codec: &C,
    event: &ServerEvent,
) -> Result<(), ChatError> {
    let bytes = codec.encode(event)?;
    conn.send(&bytes).await.map_err(ChatError::Transport)
}
