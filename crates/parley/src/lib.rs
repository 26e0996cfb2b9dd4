//! # Parley
//!
//! Real-time chat over WebSockets: authenticated persistent connections,
//! room-membership-scoped routing, best-effort delivery to live sessions,
//! and a disconnect grace window that tells a WiFi blip apart from a real
//! departure.
//!
//! The embedding application provides two things — a [`TokenVerifier`]
//! (the same credential rule its HTTP layer uses) and a store — and gets
//! back a running chat server plus a [`ChatService`] handle for the
//! operations that arrive over HTTP rather than the live connection
//! (room creation, history queries, online-user listings).
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use parley::prelude::*;
//!
//! # struct MyVerifier;
//! # impl TokenVerifier for MyVerifier {
//! #     async fn verify(&self, t: &str) -> Result<UserId, AuthError> {
//! #         Ok(UserId::from(t))
//! #     }
//! # }
//! # async fn run() -> Result<(), ChatError> {
//! let store = MemoryStore::new();
//! let server = ChatServerBuilder::new()
//!     .bind("0.0.0.0:8080")
//!     .build(MyVerifier, store)
//!     .await?;
//! let service = server.service(); // hand this to the HTTP layer
//! server.run().await
//! # }
//! ```

mod error;
mod handler;
mod presence;
mod router;
mod server;
mod service;

pub use error::ChatError;
pub use server::{ChatServer, ChatServerBuilder, PROTOCOL_VERSION};
pub use service::ChatService;

use parley_store::{MessageStore, RoomStore, UserDirectory};

/// Everything the chat server needs from persistence, as one bound.
///
/// Implemented automatically for any type that provides all three store
/// traits and is cheaply cloneable (handles sharing one backend, the way
/// [`MemoryStore`](parley_store::MemoryStore) and connection pools do).
pub trait ChatStore:
    UserDirectory + MessageStore + RoomStore + Clone + Send + Sync + 'static
{
}

impl<T> ChatStore for T where
    T: UserDirectory + MessageStore + RoomStore + Clone + Send + Sync + 'static
{
}

/// The common imports for embedding applications and tests.
pub mod prelude {
    pub use crate::{
        ChatError, ChatServer, ChatServerBuilder, ChatService, ChatStore,
        PROTOCOL_VERSION,
    };
    pub use parley_protocol::{
        ClientEvent, ExpandedMessage, JsonCodec, MessageId, MessageTarget,
        RoomId, RoomSummary, ServerEvent, UserId, UserSummary,
    };
    pub use parley_room::{LeaveOutcome, RoomError, RoomService};
    pub use parley_session::{AuthError, SessionConfig, TokenVerifier};
    pub use parley_store::{MemoryStore, Message, NewMessage, Room};
}
