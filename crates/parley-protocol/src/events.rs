//! The event vocabulary spoken over a live chat connection.
//!
//! Both directions use the same envelope shape — an `event` tag naming the
//! event and a `data` object carrying its payload:
//!
//! ```json
//! { "event": "room-message", "data": { "roomId": "r-1", "message": "hi" } }
//! { "event": "new-room-message", "data": { "id": "m-1", ... } }
//! ```
//!
//! [`ClientEvent`] is what the server accepts; [`ServerEvent`] is what it
//! emits. Event names are kebab-case and payload fields camelCase; both
//! are fixed by already-deployed clients.

use serde::{Deserialize, Serialize};

use crate::{ExpandedMessage, RoomId, RoomSummary, UserId, UserSummary};

// ---------------------------------------------------------------------------
// ClientEvent — requests from a connected client
// ---------------------------------------------------------------------------

/// An event sent by a client over its live connection.
///
/// The first frame on any connection must be `handshake`; everything else
/// is rejected until authentication has completed.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(
    tag = "event",
    content = "data",
    rename_all = "kebab-case",
    rename_all_fields = "camelCase"
)]
pub enum ClientEvent {
    /// Client → server: "here is who I am."
    ///
    /// `version` guards against incompatible clients; `token` is the
    /// bearer credential the connection authenticator verifies. A missing
    /// token is an authentication failure, not a protocol error — the
    /// field is optional so the failure can be reported as such.
    Handshake {
        version: u32,
        token: Option<String>,
    },

    /// Send a direct message to one user.
    PrivateMessage {
        recipient_id: UserId,
        message: String,
    },

    /// Send a message to a room the sender is a member of.
    RoomMessage { room_id: RoomId, message: String },

    /// Attach this session to the live channel of a room the user already
    /// belongs to. This is not a membership request — membership is
    /// granted through room creation or `add_members` only.
    JoinRoom { room_id: RoomId },

    /// Detach this session from a room's live channel. Membership is
    /// unaffected.
    LeaveRoom { room_id: RoomId },
}

// ---------------------------------------------------------------------------
// ServerEvent — everything the server pushes to clients
// ---------------------------------------------------------------------------

/// An event pushed by the server to a live session.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(
    tag = "event",
    content = "data",
    rename_all = "kebab-case",
    rename_all_fields = "camelCase"
)]
pub enum ServerEvent {
    /// Handshake accepted; the session is live. Carries the authenticated
    /// user so the client can confirm whose session this is.
    Connected { user: UserSummary },

    /// A direct message delivered to the recipient's personal channel.
    NewMessage(ExpandedMessage),

    /// A room message delivered to the other members' sessions.
    NewRoomMessage(ExpandedMessage),

    /// Confirmation to the sender that their message was persisted,
    /// carrying the message as stored.
    MessageSent(ExpandedMessage),

    /// The user was put into a room (at creation or by the creator
    /// adding them). `message` is a human-readable notice.
    RoomAdded { room: RoomSummary, message: String },

    /// Confirmation of an explicit `join-room` request.
    RoomJoined { room_id: RoomId, name: String },

    /// Confirmation of an explicit `leave-room` request.
    RoomLeft { room_id: RoomId, name: String },

    /// Another member attached a session to the room's live channel.
    UserJoinedRoom { room_id: RoomId, user: UserSummary },

    /// Another member detached a session from the room's live channel.
    UserLeftRoom { room_id: RoomId, user: UserSummary },

    /// A member permanently left the room (membership change, not a
    /// channel detach).
    RoomMemberLeft {
        room_id: RoomId,
        user_id: UserId,
        user_name: String,
    },

    /// The session reconnected within the grace window and resumed the
    /// user's presence; no departure was announced.
    ReconnectionSuccessful { message: String },

    /// A user's grace window expired without a reconnect — they are gone
    /// for real.
    UserPermanentlyDisconnected { user_id: UserId, user_name: String },

    /// A request was rejected. The connection stays open (except for
    /// authentication failures, which close it after this event).
    Error { message: String },
}

// =========================================================================
// Tests
// =========================================================================
