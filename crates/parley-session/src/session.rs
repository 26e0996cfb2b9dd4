//! Session types: what the server knows about one live connection.
//!
//! A session is one authenticated connection instance — distinct from
//! the durable user identity. One user with three browser tabs open has
//! one identity and three sessions, each tracked separately here.

use std::collections::HashSet;
use std::fmt;
use std::time::Duration;

use parley_protocol::{RoomId, UserId, UserSummary};
use rand::Rng;

// ---------------------------------------------------------------------------
// SessionConfig
// ---------------------------------------------------------------------------

/// Configuration for session lifecycle behavior.
#[derive(Debug, Clone)]
pub struct SessionConfig {
    /// How long a disconnected user has to reconnect before their
    /// departure is announced to the rooms they belong to.
    ///
    /// Default: 10 seconds — long enough to ride out a WiFi blip or a
    /// page reload, short enough that co-members learn about a real
    /// departure promptly.
    pub grace_period: Duration,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            grace_period: Duration::from_secs(10),
        }
    }
}

// ---------------------------------------------------------------------------
// SessionId
// ---------------------------------------------------------------------------

/// A unique identifier for one live session.
///
/// Minted by the server at registration; never sent by clients. Its one
/// correctness-critical job is the stale-timer guard: a grace timer may
/// only expire the disconnect record created by *its own* session, and
/// session ids are what make "its own" checkable.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct SessionId(pub String);

impl SessionId {
    /// Generates a fresh random session id (32 hex chars, 128 bits).
    pub fn generate() -> Self {
        let mut rng = rand::rng();
        let bytes: [u8; 16] = rng.random();
        Self(bytes.iter().map(|b| format!("{b:02x}")).collect())
    }
}

impl fmt::Display for SessionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

// ---------------------------------------------------------------------------
// SessionPhase
// ---------------------------------------------------------------------------

/// The lifecycle of one session, as an explicit state machine.
///
/// ```text
/// Connecting ──→ Authenticated ──→ Active ──→ Disconnected
///                                    ↑              │
///                                    │        (grace expires:
///                              (a NEW session    departure
///                               resumes the      announced)
///                               user's presence)
/// ```
///
/// - **Connecting**: transport accepted, nothing known about the caller.
/// - **Authenticated**: token verified, identity resolved; not yet
///   registered, no channels joined.
/// - **Active**: registered, personal channel and room channels joined;
///   the only phase in which chat requests are handled.
/// - **Disconnected**: transport closed. Terminal *for this session* —
///   a reconnecting client gets a brand-new session that consumes the
///   old one's disconnect record; the old session object is never
///   revived.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionPhase {
    Connecting,
    Authenticated,
    Active,
    Disconnected,
}

impl SessionPhase {
    /// The phase that follows this one, or `None` from the terminal phase.
    pub fn next(self) -> Option<Self> {
        match self {
            Self::Connecting => Some(Self::Authenticated),
            Self::Authenticated => Some(Self::Active),
            Self::Active => Some(Self::Disconnected),
            Self::Disconnected => None,
        }
    }

    /// Returns `true` if transitioning to `target` is valid. Phases move
    /// strictly forward; there is no way back to an earlier phase.
    pub fn can_transition_to(self, target: Self) -> bool {
        self.next() == Some(target)
    }

    /// Returns `true` if chat requests may be handled in this phase.
    pub fn is_active(&self) -> bool {
        matches!(self, Self::Active)
    }
}

impl fmt::Display for SessionPhase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Connecting => write!(f, "Connecting"),
            Self::Authenticated => write!(f, "Authenticated"),
            Self::Active => write!(f, "Active"),
            Self::Disconnected => write!(f, "Disconnected"),
        }
    }
}

// ---------------------------------------------------------------------------
// ChannelKey
// ---------------------------------------------------------------------------

/// A named broadcast scope that sessions can be joined to.
///
/// Two kinds exist: every user has a **personal** channel (all of their
/// live sessions; this is where direct messages and personal
/// notifications land) and every room has a **room** channel (the
/// sessions that receive that room's traffic).
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum ChannelKey {
    /// All live sessions of one user.
    Personal(UserId),
    /// The sessions currently attached to one room.
    Room(RoomId),
}

impl fmt::Display for ChannelKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Personal(user_id) => write!(f, "user:{user_id}"),
            Self::Room(room_id) => write!(f, "room:{room_id}"),
        }
    }
}

// ---------------------------------------------------------------------------
// Session
// ---------------------------------------------------------------------------

/// The registry's record of one live session.
#[derive(Debug, Clone)]
pub struct Session {
    /// This session's unique id.
    pub id: SessionId,

    /// The authenticated user, resolved at handshake time and read-only
    /// for the life of the session.
    pub user: UserSummary,

    /// The channels this session is currently joined to. Maintained by
    /// the registry; removal from all of them is atomic with disconnect.
    pub channels: HashSet<ChannelKey>,
}

// =========================================================================
// Tests
// =========================================================================
