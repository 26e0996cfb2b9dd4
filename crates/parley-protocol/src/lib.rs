//! Wire protocol for Parley.
//!
//! This crate defines the "language" that chat clients and the server
//! speak:
//!
//! - **Types** ([`UserId`], [`ExpandedMessage`], [`MessageTarget`], …) —
//!   the identities and payload structures that travel on the wire.
//! - **Events** ([`ClientEvent`], [`ServerEvent`]) — the tagged request
//!   and push vocabularies of a live connection.
//! - **Codec** ([`Codec`] trait, [`JsonCodec`]) — how events become bytes
//!   and back.
//! - **Errors** ([`ProtocolError`]) — what can go wrong in between.
//!
//! The protocol layer sits between transport (raw frames) and the chat
//! core (sessions, rooms, routing). It knows nothing about who is
//! connected or who belongs to which room — it only fixes shapes.

mod codec;
mod error;
mod events;
mod types;

pub use codec::Codec;
#[cfg(feature = "json")]
pub use codec::JsonCodec;
pub use error::ProtocolError;
pub use events::{ClientEvent, ServerEvent};
pub use types::{
    ExpandedMessage, MessageId, MessageTarget, RoomId, RoomSummary, UserId,
    UserSummary,
};
