//! Live-session management for Parley.
//!
//! This crate owns everything about a user's *presence* — as opposed to
//! their durable identity (the user directory) or their messages (the
//! store):
//!
//! 1. **Authentication** — validating who a connection belongs to
//!    ([`TokenVerifier`] trait, [`AuthError`])
//! 2. **Session tracking** — which sessions are live, which channels each
//!    is joined to ([`SessionRegistry`])
//! 3. **Reconnection** — the disconnect grace window that lets a brief
//!    network drop go unannounced ([`DisconnectRecord`], [`SessionConfig`])
//!
//! # How it fits in the stack
//!
//! ```text
//! Router / presence ops (above)  ← broadcast targeting, grace timers
//!     ↕
//! Session layer (this crate)     ← who is live, on which channels
//!     ↕
//! Protocol layer (below)         ← provides UserId, ServerEvent types
//! ```

#![allow(async_fn_in_trait)]

mod auth;
mod error;
mod registry;
mod session;

pub use auth::TokenVerifier;
pub use error::AuthError;
pub use registry::{
    DisconnectRecord, EventSender, RegisterOutcome, SessionRegistry,
};
pub use session::{ChannelKey, Session, SessionConfig, SessionId, SessionPhase};
