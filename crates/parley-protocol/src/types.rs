//! Core wire types shared by every layer of Parley.
//!
//! Everything in this module either travels on the wire (serialized as
//! JSON and sent over the live connection) or identifies something that
//! does. The field names and casing here are load-bearing: connected
//! clients match on them, so the serde attributes below are part of the
//! public contract, not cosmetics.

use serde::{Deserialize, Serialize};
use std::fmt;

// ---------------------------------------------------------------------------
// Identity types
// ---------------------------------------------------------------------------

/// A unique identifier for a user.
///
/// User ids are minted by the external user directory and are opaque to
/// this system — we store, compare, and route by them, never parse them.
/// The newtype keeps a `UserId` from being confused with a `RoomId` even
/// though both are strings underneath.
///
/// `#[serde(transparent)]` makes a `UserId` serialize as its inner string
/// (`"u-42"`), not as a wrapper object.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct UserId(pub String);

impl UserId {
    /// Returns `true` if the id is the empty string.
    ///
    /// Clients can (and do) send empty ids; validation treats an empty id
    /// the same as a missing one.
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl fmt::Display for UserId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<&str> for UserId {
    fn from(id: &str) -> Self {
        Self(id.to_string())
    }
}

impl From<String> for UserId {
    fn from(id: String) -> Self {
        Self(id)
    }
}

/// A unique identifier for a chat room.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct RoomId(pub String);

impl RoomId {
    /// Returns `true` if the id is the empty string.
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl fmt::Display for RoomId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<&str> for RoomId {
    fn from(id: &str) -> Self {
        Self(id.to_string())
    }
}

impl From<String> for RoomId {
    fn from(id: String) -> Self {
        Self(id)
    }
}

/// A unique identifier for a persisted message, minted by the store.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct MessageId(pub String);

impl fmt::Display for MessageId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<&str> for MessageId {
    fn from(id: &str) -> Self {
        Self(id.to_string())
    }
}

// ---------------------------------------------------------------------------
// UserSummary
// ---------------------------------------------------------------------------

/// The public projection of a user: id, display name, email.
///
/// This is what "sender expanded" means everywhere in the protocol — the
/// user directory owns the full user record; the chat layer only ever
/// reads this summary and attaches it to outbound events.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserSummary {
    pub id: UserId,
    pub name: String,
    pub email: String,
}

// ---------------------------------------------------------------------------
// MessageTarget — direct or room?
// ---------------------------------------------------------------------------

/// Where a message is addressed: exactly one of a recipient user or a room.
///
/// The tagged union makes the "maybe recipient, maybe roomId" pair of
/// optional fields unrepresentable: a message cannot be constructed with
/// both or neither. On the wire this serializes as a `kind` discriminator
/// plus the matching field:
///
/// ```json
/// { "kind": "direct", "recipient": "u-2" }
/// { "kind": "room", "roomId": "r-1" }
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "lowercase", rename_all_fields = "camelCase")]
pub enum MessageTarget {
    /// Addressed to a single user's personal channel.
    Direct { recipient: UserId },

    /// Addressed to every member of a room.
    Room { room_id: RoomId },
}

impl MessageTarget {
    /// The discriminator value, as it appears on the wire.
    pub fn kind(&self) -> &'static str {
        match self {
            Self::Direct { .. } => "direct",
            Self::Room { .. } => "room",
        }
    }
}

// ---------------------------------------------------------------------------
// ExpandedMessage
// ---------------------------------------------------------------------------

/// A persisted message as delivered to clients: sender expanded to a
/// [`UserSummary`], target flattened next to the body.
///
/// Both live delivery (`new-message`, `new-room-message`, `message-sent`)
/// and the history queries return this same shape, so a client renders a
/// just-received message and a fetched-history message with one code path.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ExpandedMessage {
    pub id: MessageId,
    pub sender: UserSummary,
    #[serde(flatten)]
    pub target: MessageTarget,
    pub message: String,
    /// Milliseconds since the Unix epoch, assigned by the store at
    /// persistence time. History queries sort ascending on this field.
    pub created_at: u64,
}

// ---------------------------------------------------------------------------
// RoomSummary
// ---------------------------------------------------------------------------

/// The projection of a room carried by `room-added` notifications.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RoomSummary {
    pub id: RoomId,
    pub name: String,
    pub description: String,
    pub is_private: bool,
    pub creator: UserId,
}

// =========================================================================
// Tests
// =========================================================================
