//! Persistence boundary for Parley.
//!
//! The chat core treats durable storage as an external service: messages
//! and rooms are written through the traits defined here, and user
//! identities are only ever read. This crate defines:
//!
//! 1. **Entities** ([`Message`], [`Room`]) — the durable records.
//! 2. **Traits** ([`UserDirectory`], [`MessageStore`], [`RoomStore`]) —
//!    the query and mutation shapes the core depends on.
//! 3. **[`MemoryStore`]** — an in-process reference implementation used
//!    by tests and the demo server.
//!
//! # How it fits in the stack
//!
//! ```text
//! Router / room service (above)  ← persist-then-broadcast, membership reads
//!     ↕
//! Store layer (this crate)       ← durable create/read, user lookups
//!     ↕
//! Protocol layer (below)         ← provides the id and summary types
//! ```
//!
//! A database-backed implementation lives outside this workspace; every
//! trait method suspends only the calling task, so a slow backend stalls
//! one session's handler, never the server.
//!
//! Every method returns a `Send` future explicitly — connection handlers
//! run in spawned tasks, and a store that is only generic `S` must still
//! be awaitable there.

use std::future::Future;

mod entities;
mod error;
mod memory;

pub use entities::{Message, NewMessage, NewRoom, Room};
pub use error::StoreError;
pub use memory::MemoryStore;

use parley_protocol::{RoomId, UserId, UserSummary};

/// Read-only access to user identities.
///
/// The user directory is owned elsewhere (account management, sign-up,
/// password handling all live outside the chat system). Chat only needs
/// to resolve an id to a displayable summary — and to learn that an id
/// doesn't resolve at all.
pub trait UserDirectory: Send + Sync + 'static {
    /// Looks up a user by id. `Ok(None)` means the id does not exist;
    /// an `Err` means the directory itself could not answer.
    fn find_by_id(
        &self,
        id: &UserId,
    ) -> impl Future<Output = Result<Option<UserSummary>, StoreError>> + Send;
}

/// Durable create/read for chat messages.
pub trait MessageStore: Send + Sync + 'static {
    /// Persists a new message, minting its id and creation timestamp.
    ///
    /// Once this returns `Ok`, the message is durable — live delivery
    /// may still fail without affecting it.
    fn create_message(
        &self,
        new: NewMessage,
    ) -> impl Future<Output = Result<Message, StoreError>> + Send;

    /// All direct messages between two users, in both directions,
    /// ascending by creation time.
    fn direct_history(
        &self,
        a: &UserId,
        b: &UserId,
    ) -> impl Future<Output = Result<Vec<Message>, StoreError>> + Send;

    /// All messages addressed to a room, ascending by creation time.
    fn room_history(
        &self,
        room_id: &RoomId,
    ) -> impl Future<Output = Result<Vec<Message>, StoreError>> + Send;

    /// The distinct users this user has exchanged direct messages with.
    fn chat_partners(
        &self,
        user: &UserId,
    ) -> impl Future<Output = Result<Vec<UserId>, StoreError>> + Send;
}

/// Durable create/read/update/delete for room records.
pub trait RoomStore: Send + Sync + 'static {
    /// Persists a new room, minting its id and timestamps.
    fn create_room(
        &self,
        new: NewRoom,
    ) -> impl Future<Output = Result<Room, StoreError>> + Send;

    /// Looks up a room by id.
    fn room(
        &self,
        id: &RoomId,
    ) -> impl Future<Output = Result<Option<Room>, StoreError>> + Send;

    /// Replaces a room record, bumping its update timestamp. Returns the
    /// record as stored.
    fn update_room(
        &self,
        room: Room,
    ) -> impl Future<Output = Result<Room, StoreError>> + Send;

    /// Deletes a room record. Deleting an absent room is a no-op.
    fn delete_room(
        &self,
        id: &RoomId,
    ) -> impl Future<Output = Result<(), StoreError>> + Send;

    /// All rooms the user is a member of, most recently updated first.
    fn rooms_for(
        &self,
        user: &UserId,
    ) -> impl Future<Output = Result<Vec<Room>, StoreError>> + Send;
}
