//! Durable entities: the records the store persists.

use std::collections::HashSet;

use parley_protocol::{
    ExpandedMessage, MessageId, MessageTarget, RoomId, RoomSummary, UserId,
    UserSummary,
};
use serde::{Deserialize, Serialize};

// ---------------------------------------------------------------------------
// Message
// ---------------------------------------------------------------------------

/// A persisted chat message.
///
/// Immutable once written: the id, sender, target, body, and timestamp
/// are all fixed at creation. There is no update path anywhere in the
/// store traits, which is what makes the history guarantees possible —
/// a message a client saw delivered live is byte-for-byte the message a
/// later history fetch returns.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Message {
    pub id: MessageId,
    pub sender: UserId,
    /// Exactly one of a recipient user or a room, tagged by kind.
    pub target: MessageTarget,
    pub body: String,
    /// Milliseconds since the Unix epoch, assigned by the store.
    pub created_at: u64,
}

impl Message {
    /// Projects this message into its wire shape, attaching the already-
    /// resolved sender summary.
    ///
    /// The caller supplies the summary because it usually has one at hand
    /// (the sending session carries its own user), saving a directory
    /// round-trip on the hot path.
    pub fn expand(&self, sender: UserSummary) -> ExpandedMessage {
        ExpandedMessage {
            id: self.id.clone(),
            sender,
            target: self.target.clone(),
            message: self.body.clone(),
            created_at: self.created_at,
        }
    }
}

/// A message about to be persisted — everything except what the store
/// mints (id and timestamp).
#[derive(Debug, Clone)]
pub struct NewMessage {
    pub sender: UserId,
    pub target: MessageTarget,
    pub body: String,
}

// ---------------------------------------------------------------------------
// Room
// ---------------------------------------------------------------------------

/// A persisted chat room.
///
/// Invariant: `creator` is always contained in `members` — enforced at
/// creation (the creator is force-included) and on every leave (the
/// creator role is reassigned or the room deleted before the invariant
/// could break). Membership is a set; the order members were added in
/// carries no meaning.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Room {
    pub id: RoomId,
    pub name: String,
    pub description: String,
    pub creator: UserId,
    pub members: HashSet<UserId>,
    pub is_private: bool,
    /// Milliseconds since the Unix epoch.
    pub created_at: u64,
    /// Bumped by the store on every update.
    pub updated_at: u64,
}

impl Room {
    /// Returns `true` if the user is a member of this room.
    pub fn is_member(&self, user_id: &UserId) -> bool {
        self.members.contains(user_id)
    }

    /// Projects this room into the summary carried by notifications.
    pub fn summary(&self) -> RoomSummary {
        RoomSummary {
            id: self.id.clone(),
            name: self.name.clone(),
            description: self.description.clone(),
            is_private: self.is_private,
            creator: self.creator.clone(),
        }
    }
}

/// A room about to be persisted.
///
/// `members` may or may not already contain the creator; the room
/// service force-includes the creator before this reaches the store.
#[derive(Debug, Clone)]
pub struct NewRoom {
    pub name: String,
    pub description: String,
    pub creator: UserId,
    pub members: HashSet<UserId>,
    pub is_private: bool,
}
