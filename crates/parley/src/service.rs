//! `ChatService`: the operations that arrive outside the live connection.
//!
//! Room creation, membership changes, and the history queries are issued
//! by the surrounding HTTP API on behalf of an already-authenticated
//! user. This facade runs them against the same state the live
//! connections use, so mutations notify online users immediately — a
//! room created over HTTP shows up as a `room-added` event on its
//! members' open connections.

use std::collections::HashMap;
use std::sync::Arc;

use parley_protocol::{
    Codec, ExpandedMessage, RoomId, ServerEvent, UserId, UserSummary,
};
use parley_room::LeaveOutcome;
use parley_session::{ChannelKey, TokenVerifier};
use parley_store::{Message, Room};

use crate::server::ServerState;
use crate::{ChatError, ChatStore};

/// Handle for issuing chat operations from outside a live connection.
///
/// Obtained from [`ChatServer::service`](crate::ChatServer::service);
/// cheap to clone and safe to share with request handlers.
pub struct ChatService<V: TokenVerifier, S: ChatStore, C: Codec> {
    state: Arc<ServerState<V, S, C>>,
}

impl<V: TokenVerifier, S: ChatStore, C: Codec> Clone for ChatService<V, S, C> {
    fn clone(&self) -> Self {
        Self {
            state: Arc::clone(&self.state),
        }
    }
}

impl<V, S, C> ChatService<V, S, C>
where
    V: TokenVerifier,
    S: ChatStore,
    C: Codec,
{
    pub(crate) fn new(state: Arc<ServerState<V, S, C>>) -> Self {
        Self { state }
    }

    // -- Rooms --------------------------------------------------------------

    /// Creates a room on behalf of `creator`, who becomes a member
    /// regardless of whether they listed themselves.
    ///
    /// Every member with a live session is notified with `room-added` on
    /// their personal channel, naming the room and who put them in it.
    pub async fn create_room(
        &self,
        creator: &UserId,
        name: &str,
        description: &str,
        initial_members: Vec<UserId>,
        is_private: bool,
    ) -> Result<Room, ChatError> {
        let creator_user = self.require_user(creator).await?;
        let room = self
            .state
            .rooms
            .create_room(creator, name, description, initial_members, is_private)
            .await?;

        self.notify_added(&room, room.members.iter(), &creator_user)
            .await;
        Ok(room)
    }

    /// Adds members to a room on behalf of its creator.
    ///
    /// Returns the updated room; only the users actually added (unknown
    /// ids and existing members are dropped) receive `room-added`.
    pub async fn add_members(
        &self,
        room_id: &RoomId,
        requester: &UserId,
        candidates: Vec<UserId>,
    ) -> Result<Room, ChatError> {
        let requester_user = self.require_user(requester).await?;
        let (room, added) = self
            .state
            .rooms
            .add_members(room_id, requester, candidates)
            .await?;

        self.notify_added(&room, added.iter(), &requester_user).await;
        Ok(room)
    }

    /// Removes the user from a room's membership.
    ///
    /// The room channel hears `room-member-left`, after which the
    /// leaver's live sessions are detached from it — an ex-member's open
    /// connections must not keep receiving the room's traffic. If the
    /// leaver was the creator, the role moves to a remaining member, or
    /// the room is deleted when nobody remains; the returned
    /// [`LeaveOutcome`] says which.
    pub async fn leave_room(
        &self,
        room_id: &RoomId,
        user_id: &UserId,
    ) -> Result<LeaveOutcome, ChatError> {
        let user = self.require_user(user_id).await?;
        let outcome = self.state.rooms.leave(room_id, user_id).await?;

        let key = ChannelKey::Room(room_id.clone());
        let mut registry = self.state.registry.lock().await;
        registry.broadcast(
            &key,
            &ServerEvent::RoomMemberLeft {
                room_id: room_id.clone(),
                user_id: user_id.clone(),
                user_name: user.name.clone(),
            },
            None,
        );
        registry.leave_channel_for_user(user_id, &key);
        Ok(outcome)
    }

    /// The rooms the user belongs to, most recently updated first.
    pub async fn rooms_for(&self, user_id: &UserId) -> Result<Vec<Room>, ChatError> {
        Ok(self.state.rooms.rooms_for(user_id).await?)
    }

    /// Fetches one room; the requester must be a member.
    pub async fn room(
        &self,
        requester: &UserId,
        room_id: &RoomId,
    ) -> Result<Room, ChatError> {
        Ok(self.state.rooms.member_room(room_id, requester).await?)
    }

    // -- History ------------------------------------------------------------

    /// The direct-message conversation between the requester and another
    /// user, both directions, ascending by creation time, senders
    /// expanded.
    pub async fn direct_history(
        &self,
        requester: &UserId,
        other: &UserId,
    ) -> Result<Vec<ExpandedMessage>, ChatError> {
        // The conversation partner must exist; the requester was already
        // authenticated by whoever is calling us.
        self.require_user(other).await?;

        let messages = self.state.store.direct_history(requester, other).await?;
        self.expand_all(messages).await
    }

    /// A room's message history, ascending by creation time, senders
    /// expanded. Membership-gated like every other room read.
    pub async fn room_history(
        &self,
        requester: &UserId,
        room_id: &RoomId,
    ) -> Result<Vec<ExpandedMessage>, ChatError> {
        self.state.rooms.member_room(room_id, requester).await?;

        let messages = self.state.store.room_history(room_id).await?;
        self.expand_all(messages).await
    }

    /// The distinct users the requester has exchanged direct messages
    /// with, as displayable summaries.
    pub async fn chat_partners(
        &self,
        requester: &UserId,
    ) -> Result<Vec<UserSummary>, ChatError> {
        let partner_ids = self.state.store.chat_partners(requester).await?;
        let mut partners = Vec::with_capacity(partner_ids.len());
        for id in partner_ids {
            match self.state.store.find_by_id(&id).await? {
                Some(user) => partners.push(user),
                None => {
                    tracing::warn!(user_id = %id, "skipping vanished chat partner")
                }
            }
        }
        Ok(partners)
    }

    // -- Presence -----------------------------------------------------------

    /// The distinct users with at least one live session right now.
    pub async fn online_users(&self) -> Vec<UserSummary> {
        self.state.registry.lock().await.online_users()
    }

    // -- Internals ----------------------------------------------------------

    /// Resolves a user id that must exist for the operation to make sense.
    async fn require_user(&self, user_id: &UserId) -> Result<UserSummary, ChatError> {
        self.state
            .store
            .find_by_id(user_id)
            .await?
            .ok_or_else(|| ChatError::NotFound("User not found".into()))
    }

    /// Pushes `room-added` to each listed user's personal channel.
    async fn notify_added<'a>(
        &self,
        room: &Room,
        users: impl Iterator<Item = &'a UserId>,
        actor: &UserSummary,
    ) {
        let event = ServerEvent::RoomAdded {
            room: room.summary(),
            message: format!("You've been added to {} by {}", room.name, actor.name),
        };
        let registry = self.state.registry.lock().await;
        for user_id in users {
            registry.broadcast(&ChannelKey::Personal(user_id.clone()), &event, None);
        }
    }

    /// Expands a batch of stored messages, resolving each sender once.
    /// Messages whose sender no longer resolves are dropped with a
    /// warning rather than failing the whole query.
    async fn expand_all(
        &self,
        messages: Vec<Message>,
    ) -> Result<Vec<ExpandedMessage>, ChatError> {
        let mut senders: HashMap<UserId, Option<UserSummary>> = HashMap::new();
        let mut expanded = Vec::with_capacity(messages.len());
        for message in messages {
            if !senders.contains_key(&message.sender) {
                let summary = self.state.store.find_by_id(&message.sender).await?;
                if summary.is_none() {
                    tracing::warn!(
                        sender = %message.sender,
                        "skipping history message from unknown sender"
                    );
                }
                senders.insert(message.sender.clone(), summary);
            }
            if let Some(Some(sender)) = senders.get(&message.sender) {
                expanded.push(message.expand(sender.clone()));
            }
        }
        Ok(expanded)
    }
}
