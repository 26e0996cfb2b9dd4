//! The session registry: tracks all live sessions and their channels.
//!
//! This is the central piece of the presence layer. It's responsible for:
//! - Registering sessions when connections authenticate
//! - Mapping users to their live sessions (several per user is fine)
//! - Channel membership — which sessions receive which broadcasts
//! - Disconnect records and the reconnection grace window
//! - Removing a session from everything, atomically, on disconnect
//!
//! # Concurrency note
//!
//! `SessionRegistry` is NOT thread-safe by itself — it uses plain
//! `HashMap`s, not concurrent ones. This is intentional: the registry is
//! owned by the server state behind a single `tokio::sync::Mutex`, and
//! every mutation path (connection handlers, grace timers, the service
//! facade) funnels through that one lock. The disconnect/reconnect race
//! is then decided by lock order alone, which keeps it auditable.

use std::collections::{HashMap, HashSet};
use std::time::Instant;

use parley_protocol::{ServerEvent, UserId, UserSummary};
use tokio::sync::mpsc;

use crate::{ChannelKey, Session, SessionConfig, SessionId};

/// Channel sender for delivering outbound events to one session.
///
/// Unbounded on purpose: a handler must never suspend because one
/// recipient's writer task is slow. Memory pressure from a truly stuck
/// client ends when its connection dies and the sender is dropped.
pub type EventSender = mpsc::UnboundedSender<ServerEvent>;

/// What the registry remembers about a user who just lost their
/// connection.
///
/// Exists only during the grace window: written on disconnect, removed
/// either by a reconnect (consumed) or by the grace timer (expired). At
/// most one per user — a newer disconnect replaces an older record, and
/// the `session_id` inside is what lets the older record's timer
/// recognize it has been superseded.
#[derive(Debug, Clone)]
pub struct DisconnectRecord {
    /// The session whose closing created this record.
    pub session_id: SessionId,
    /// The departed user, kept whole so the expiry announcement can name
    /// them after their sessions are gone.
    pub user: UserSummary,
    /// When the disconnect happened.
    pub since: Instant,
}

/// The result of registering a new session.
#[derive(Debug, Clone)]
pub struct RegisterOutcome {
    /// The freshly minted session id.
    pub session_id: SessionId,
    /// `true` if this registration consumed a pending disconnect record —
    /// i.e. the user came back within the grace window and resumed their
    /// presence rather than newly appearing.
    pub resumed: bool,
}

struct SessionEntry {
    session: Session,
    sender: EventSender,
}

/// Tracks every live session, the channels each is joined to, and the
/// disconnect records of users inside their grace window.
///
/// ## Lifecycle
///
/// ```text
/// register() ──→ join_channel()/leave_channel() ──→ disconnect()
///     ↑                                                  │
///     │                                         (record written,
///     │                                          timer armed by caller)
///     │                                                  │
///     └──(new connection consumes the record)──←─────────┤
///                                                        ▼
///                                                   expire()
///                                          (guarded by session id)
/// ```
pub struct SessionRegistry {
    /// All live sessions, keyed by session id.
    sessions: HashMap<SessionId, SessionEntry>,

    /// Index from user id to that user's live sessions. A user with two
    /// devices has two entries in the set; both receive everything
    /// addressed to the personal channel.
    user_sessions: HashMap<UserId, HashSet<SessionId>>,

    /// Broadcast scopes: which sessions receive events for each key.
    /// Kept in sync with each session's own channel set.
    channels: HashMap<ChannelKey, HashSet<SessionId>>,

    /// Users currently inside their grace window, keyed by user id.
    disconnects: HashMap<UserId, DisconnectRecord>,

    /// Configuration (grace period).
    config: SessionConfig,
}

impl SessionRegistry {
    /// Creates a new, empty registry with the given config.
    pub fn new(config: SessionConfig) -> Self {
        Self {
            sessions: HashMap::new(),
            user_sessions: HashMap::new(),
            channels: HashMap::new(),
            disconnects: HashMap::new(),
            config,
        }
    }

    /// The configured reconnection grace period.
    pub fn grace_period(&self) -> std::time::Duration {
        self.config.grace_period
    }

    // -- Registration and teardown ----------------------------------------

    /// Registers a new live session for an authenticated user.
    ///
    /// The session starts joined to the user's personal channel. If the
    /// user has a pending disconnect record, it is consumed here — this
    /// is the sole mechanism by which a brief network drop resumes the
    /// same logical presence — and `resumed` reports that to the caller
    /// so it can notify the new session.
    pub fn register(
        &mut self,
        user: UserSummary,
        sender: EventSender,
    ) -> RegisterOutcome {
        let session_id = SessionId::generate();
        let personal = ChannelKey::Personal(user.id.clone());

        let session = Session {
            id: session_id.clone(),
            user: user.clone(),
            channels: HashSet::from([personal.clone()]),
        };

        self.channels
            .entry(personal)
            .or_default()
            .insert(session_id.clone());
        self.user_sessions
            .entry(user.id.clone())
            .or_default()
            .insert(session_id.clone());
        self.sessions
            .insert(session_id.clone(), SessionEntry { session, sender });

        // A pending record means this user dropped moments ago and is now
        // back: consume the record so the armed timer finds nothing.
        let resumed = self.disconnects.remove(&user.id).is_some();

        tracing::info!(
            user_id = %user.id,
            %session_id,
            resumed,
            "session registered"
        );

        RegisterOutcome {
            session_id,
            resumed,
        }
    }

    /// Removes a session and begins its user's grace window.
    ///
    /// The session is detached from every channel it was joined to in the
    /// same call — there is no window in which a dead session can still
    /// be a broadcast target. A disconnect record for the user is written
    /// (replacing any older one), and returned so the caller can arm the
    /// grace timer against exactly this record.
    ///
    /// Returns `None` if the session is unknown (already disconnected).
    pub fn disconnect(&mut self, session_id: &SessionId) -> Option<DisconnectRecord> {
        let entry = self.sessions.remove(session_id)?;

        for key in &entry.session.channels {
            if let Some(members) = self.channels.get_mut(key) {
                members.remove(session_id);
                if members.is_empty() {
                    self.channels.remove(key);
                }
            }
        }

        let user_id = entry.session.user.id.clone();
        if let Some(sessions) = self.user_sessions.get_mut(&user_id) {
            sessions.remove(session_id);
            if sessions.is_empty() {
                self.user_sessions.remove(&user_id);
            }
        }

        let record = DisconnectRecord {
            session_id: session_id.clone(),
            user: entry.session.user,
            since: Instant::now(),
        };
        self.disconnects.insert(user_id.clone(), record.clone());

        tracing::info!(
            %user_id,
            %session_id,
            "session disconnected, grace window started"
        );

        Some(record)
    }

    /// Resolves a fired grace timer.
    ///
    /// The record must still exist for this user AND still reference the
    /// session whose disconnect armed the timer. Both checks matter: the
    /// record is gone if the user reconnected (consumed), and it names a
    /// different session if the user reconnected *and disconnected again*
    /// before this older timer fired. Either way the timer is stale and
    /// must do nothing.
    ///
    /// Returns the removed record when the expiry is genuine — the caller
    /// then announces the permanent departure. Exactly one timer can ever
    /// get `Some` for a given record, because the record is removed here.
    pub fn expire(
        &mut self,
        user_id: &UserId,
        session_id: &SessionId,
    ) -> Option<DisconnectRecord> {
        let owns_record = self
            .disconnects
            .get(user_id)
            .is_some_and(|record| &record.session_id == session_id);
        if !owns_record {
            if self.disconnects.contains_key(user_id) {
                tracing::debug!(
                    %user_id,
                    %session_id,
                    "stale grace timer ignored (newer disconnect owns the record)"
                );
            }
            return None;
        }

        let record = self.disconnects.remove(user_id);
        tracing::info!(
            %user_id,
            %session_id,
            "grace window expired, user permanently disconnected"
        );
        record
    }

    // -- Channel membership ------------------------------------------------

    /// Joins a session to a channel. Returns `false` if the session is
    /// unknown. Joining a channel twice is a no-op.
    pub fn join_channel(&mut self, session_id: &SessionId, key: ChannelKey) -> bool {
        let Some(entry) = self.sessions.get_mut(session_id) else {
            return false;
        };
        entry.session.channels.insert(key.clone());
        self.channels.entry(key).or_default().insert(session_id.clone());
        true
    }

    /// Detaches a session from a channel. Returns `false` if the session
    /// is unknown or wasn't joined.
    pub fn leave_channel(&mut self, session_id: &SessionId, key: &ChannelKey) -> bool {
        let Some(entry) = self.sessions.get_mut(session_id) else {
            return false;
        };
        if !entry.session.channels.remove(key) {
            return false;
        }
        if let Some(members) = self.channels.get_mut(key) {
            members.remove(session_id);
            if members.is_empty() {
                self.channels.remove(key);
            }
        }
        true
    }

    /// Detaches every one of a user's live sessions from a channel.
    ///
    /// Used when a user's *membership* ends (they left the room) — their
    /// open connections must stop receiving that room's traffic without
    /// being disconnected.
    pub fn leave_channel_for_user(&mut self, user_id: &UserId, key: &ChannelKey) {
        let session_ids: Vec<SessionId> = self
            .user_sessions
            .get(user_id)
            .map(|s| s.iter().cloned().collect())
            .unwrap_or_default();
        for session_id in session_ids {
            self.leave_channel(&session_id, key);
        }
    }

    /// The ids of the sessions currently joined to a channel.
    pub fn channel_sessions(&self, key: &ChannelKey) -> Vec<SessionId> {
        self.channels
            .get(key)
            .map(|members| members.iter().cloned().collect())
            .unwrap_or_default()
    }

    // -- Delivery ----------------------------------------------------------

    /// Pushes an event to one session. Returns `false` (after a logged
    /// warning) if the session is gone or its writer has shut down —
    /// delivery is best-effort by design, the caller never fails on it.
    pub fn send_to_session(&self, session_id: &SessionId, event: ServerEvent) -> bool {
        let Some(entry) = self.sessions.get(session_id) else {
            tracing::warn!(%session_id, "dropping event for unknown session");
            return false;
        };
        if entry.sender.send(event).is_err() {
            tracing::warn!(
                %session_id,
                user_id = %entry.session.user.id,
                "dropping event: session writer closed"
            );
            return false;
        }
        true
    }

    /// Broadcasts an event to every session on a channel, optionally
    /// skipping one (the originator). Returns how many sessions the event
    /// was handed to.
    ///
    /// Not atomic: a session whose writer closed mid-broadcast is skipped
    /// with a warning and the rest still receive the event.
    pub fn broadcast(
        &self,
        key: &ChannelKey,
        event: &ServerEvent,
        except: Option<&SessionId>,
    ) -> usize {
        let Some(members) = self.channels.get(key) else {
            return 0;
        };
        let mut delivered = 0;
        for session_id in members {
            if Some(session_id) == except {
                continue;
            }
            if let Some(entry) = self.sessions.get(session_id) {
                if entry.sender.send(event.clone()).is_ok() {
                    delivered += 1;
                } else {
                    tracing::warn!(
                        %session_id,
                        channel = %key,
                        "dropping broadcast: session writer closed"
                    );
                }
            }
        }
        delivered
    }

    // -- Queries -----------------------------------------------------------

    /// Looks up the user behind a session.
    pub fn session_user(&self, session_id: &SessionId) -> Option<&UserSummary> {
        self.sessions.get(session_id).map(|e| &e.session.user)
    }

    /// Returns `true` if the user has at least one live session.
    pub fn is_online(&self, user_id: &UserId) -> bool {
        self.user_sessions.contains_key(user_id)
    }

    /// The distinct users with at least one live session.
    pub fn online_users(&self) -> Vec<UserSummary> {
        let mut users: Vec<UserSummary> = Vec::with_capacity(self.user_sessions.len());
        for session_ids in self.user_sessions.values() {
            if let Some(first) = session_ids.iter().next() {
                if let Some(entry) = self.sessions.get(first) {
                    users.push(entry.session.user.clone());
                }
            }
        }
        users
    }

    /// Returns the number of live sessions (not users).
    pub fn len(&self) -> usize {
        self.sessions.len()
    }

    /// Returns `true` if no sessions are live.
    pub fn is_empty(&self) -> bool {
        self.sessions.is_empty()
    }
}

impl Default for SessionRegistry {
    fn default() -> Self {
        Self::new(SessionConfig::default())
    }
}

// =========================================================================
// Tests
// =========================================================================
