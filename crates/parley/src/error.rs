//! Unified error type for the chat server.

use parley_protocol::ProtocolError;
use parley_room::RoomError;
use parley_session::AuthError;
use parley_store::StoreError;
use parley_transport::TransportError;

/// Top-level error covering every way a chat operation can fail.
///
/// The variants fall into two groups with different blast radii:
///
/// - **Per-request** ([`Authorization`](Self::Authorization),
///   [`Validation`](Self::Validation), [`NotFound`](Self::NotFound),
///   [`Persistence`](Self::Persistence)) — reported to the requesting
///   session as an `error` event; the connection stays open and no other
///   session is affected.
/// - **Fatal** ([`Auth`](Self::Auth), [`Transport`](Self::Transport),
///   [`Protocol`](Self::Protocol)) — the connection is done; auth
///   failures additionally get one final `error` event before the close.
#[derive(Debug, thiserror::Error)]
pub enum ChatError {
    /// Authentication failed at connection time. Terminates the
    /// connection attempt; no session is ever registered.
    #[error(transparent)]
    Auth(#[from] AuthError),

    /// A membership or creator check failed.
    #[error("{0}")]
    Authorization(String),

    /// The request payload was malformed or missing required fields.
    #[error("{0}")]
    Validation(String),

    /// A referenced room or user does not exist.
    #[error("{0}")]
    NotFound(String),

    /// The store could not complete the operation. Not retried — the
    /// requester is told and may try again.
    #[error(transparent)]
    Persistence(#[from] StoreError),

    /// A transport-level failure (bind, send, receive).
    #[error(transparent)]
    Transport(#[from] TransportError),

    /// A protocol-level failure during connection establishment.
    #[error(transparent)]
    Protocol(#[from] ProtocolError),
}

impl ChatError {
    /// Whether this error ends the connection (vs. being reported to the
    /// session, which carries on).
    pub fn is_fatal(&self) -> bool {
        matches!(
            self,
            Self::Auth(_) | Self::Transport(_) | Self::Protocol(_)
        )
    }

    /// The message carried by the `error` event for this failure.
    pub fn client_message(&self) -> String {
        match self {
            // Backend details stay in the logs; the client gets the
            // stable message it already knows how to display.
            Self::Persistence(_) => "Failed to send message".to_string(),
            other => other.to_string(),
        }
    }
}

/// Room errors fold into the taxonomy by what they mean, not where they
/// came from: a missing room is not-found, a failed membership or creator
/// check is an authorization failure, an empty name or empty add-set is a
/// validation failure.
impl From<RoomError> for ChatError {
    fn from(err: RoomError) -> Self {
        let message = err.to_string();
        match err {
            RoomError::NotFound(_) => Self::NotFound(message),
            RoomError::NotAMember(..) | RoomError::NotCreator(..) => {
                Self::Authorization(message)
            }
            RoomError::NameRequired | RoomError::NoNewMembers => {
                Self::Validation(message)
            }
            RoomError::Store(e) => Self::Persistence(e),
        }
    }
}
