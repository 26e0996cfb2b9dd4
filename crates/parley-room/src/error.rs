//! Error types for room operations.

use parley_protocol::{RoomId, UserId};
use parley_store::StoreError;

/// Errors that can occur during room operations.
///
/// The display strings are what clients receive in `error` events, so
/// they match the messages clients already handle; the id fields exist
/// for logs and tests, not for the wire.
#[derive(Debug, thiserror::Error)]
pub enum RoomError {
    /// The room does not exist.
    #[error("Chat room not found")]
    NotFound(RoomId),

    /// The user is not a member of the room, which forbids the attempted
    /// operation (send, history read, join, leave).
    #[error("You are not a member of this room")]
    NotAMember(UserId, RoomId),

    /// Only the room's creator may add members.
    #[error("Only the room creator can add members")]
    NotCreator(UserId, RoomId),

    /// A room cannot be created without a name.
    #[error("Room name is required")]
    NameRequired,

    /// After dropping unknown users and existing members, nothing was
    /// left to add.
    #[error("No new valid members to add")]
    NoNewMembers,

    /// The store could not complete the operation.
    #[error(transparent)]
    Store(#[from] StoreError),
}
