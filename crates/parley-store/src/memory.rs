//! In-memory store: the reference implementation of the persistence traits.
//!
//! Backs the test suites and the demo server. Everything lives in one
//! mutex-guarded block so the trait methods stay trivially atomic; no
//! lock is held across an await point.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::{SystemTime, UNIX_EPOCH};

use parley_protocol::{MessageId, MessageTarget, RoomId, UserId, UserSummary};
use tokio::sync::Mutex;

use crate::{
    Message, MessageStore, NewMessage, NewRoom, Room, RoomStore, StoreError,
    UserDirectory,
};

/// An in-process store for users, messages, and rooms.
///
/// Cheap to clone — clones share the same underlying data, so the server
/// state and the room service can each hold a handle to one store.
#[derive(Clone, Default)]
pub struct MemoryStore {
    inner: Arc<Mutex<Inner>>,
}

#[derive(Default)]
struct Inner {
    users: HashMap<UserId, UserSummary>,
    /// Messages in insertion order, which is also creation order — the
    /// history queries rely on this for their ascending sort.
    messages: Vec<Message>,
    rooms: HashMap<RoomId, Room>,
    next_message_id: u64,
    next_room_id: u64,
}

impl MemoryStore {
    /// Creates a new, empty store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers a user in the directory.
    ///
    /// Account creation is out of scope for the chat system; tests and
    /// the demo seed their users through this instead.
    pub async fn add_user(&self, user: UserSummary) {
        let mut inner = self.inner.lock().await;
        inner.users.insert(user.id.clone(), user);
    }
}

/// Current wall-clock time in milliseconds since the Unix epoch.
fn now_millis() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_millis() as u64)
        .unwrap_or(0)
}

impl UserDirectory for MemoryStore {
    async fn find_by_id(&self, id: &UserId) -> Result<Option<UserSummary>, StoreError> {
        let inner = self.inner.lock().await;
        Ok(inner.users.get(id).cloned())
    }
}

impl MessageStore for MemoryStore {
    async fn create_message(&self, new: NewMessage) -> Result<Message, StoreError> {
        let mut inner = self.inner.lock().await;
        inner.next_message_id += 1;
        let message = Message {
            id: MessageId(format!("m-{}", inner.next_message_id)),
            sender: new.sender,
            target: new.target,
            body: new.body,
            created_at: now_millis(),
        };
        inner.messages.push(message.clone());
        Ok(message)
    }

    async fn direct_history(
        &self,
        a: &UserId,
        b: &UserId,
    ) -> Result<Vec<Message>, StoreError> {
        let inner = self.inner.lock().await;
        let mut history: Vec<Message> = inner
            .messages
            .iter()
            .filter(|m| match &m.target {
                MessageTarget::Direct { recipient } => {
                    (&m.sender == a && recipient == b)
                        || (&m.sender == b && recipient == a)
                }
                MessageTarget::Room { .. } => false,
            })
            .cloned()
            .collect();
        // Insertion order already matches creation order; the stable sort
        // keeps it for equal timestamps.
        history.sort_by_key(|m| m.created_at);
        Ok(history)
    }

    async fn room_history(&self, room_id: &RoomId) -> Result<Vec<Message>, StoreError> {
        let inner = self.inner.lock().await;
        let mut history: Vec<Message> = inner
            .messages
            .iter()
            .filter(|m| {
                matches!(&m.target, MessageTarget::Room { room_id: r } if r == room_id)
            })
            .cloned()
            .collect();
        history.sort_by_key(|m| m.created_at);
        Ok(history)
    }

    async fn chat_partners(&self, user: &UserId) -> Result<Vec<UserId>, StoreError> {
        let inner = self.inner.lock().await;
        let mut partners = Vec::new();
        for message in &inner.messages {
            let other = match &message.target {
                MessageTarget::Direct { recipient } if &message.sender == user => {
                    recipient
                }
                MessageTarget::Direct { recipient }
                    if recipient == user && &message.sender != user =>
                {
                    &message.sender
                }
                _ => continue,
            };
            if !partners.contains(other) {
                partners.push(other.clone());
            }
        }
        Ok(partners)
    }
}

impl RoomStore for MemoryStore {
    async fn create_room(&self, new: NewRoom) -> Result<Room, StoreError> {
        let mut inner = self.inner.lock().await;
        inner.next_room_id += 1;
        let now = now_millis();
        let room = Room {
            id: RoomId(format!("r-{}", inner.next_room_id)),
            name: new.name,
            description: new.description,
            creator: new.creator,
            members: new.members,
            is_private: new.is_private,
            created_at: now,
            updated_at: now,
        };
        inner.rooms.insert(room.id.clone(), room.clone());
        Ok(room)
    }

    async fn room(&self, id: &RoomId) -> Result<Option<Room>, StoreError> {
        let inner = self.inner.lock().await;
        Ok(inner.rooms.get(id).cloned())
    }

    async fn update_room(&self, mut room: Room) -> Result<Room, StoreError> {
        let mut inner = self.inner.lock().await;
        room.updated_at = now_millis();
        inner.rooms.insert(room.id.clone(), room.clone());
        Ok(room)
    }

    async fn delete_room(&self, id: &RoomId) -> Result<(), StoreError> {
        let mut inner = self.inner.lock().await;
        inner.rooms.remove(id);
        Ok(())
    }

    async fn rooms_for(&self, user: &UserId) -> Result<Vec<Room>, StoreError> {
        let inner = self.inner.lock().await;
        let mut rooms: Vec<Room> = inner
            .rooms
            .values()
            .filter(|room| room.is_member(user))
            .cloned()
            .collect();
        rooms.sort_by(|a, b| b.updated_at.cmp(&a.updated_at));
        Ok(rooms)
    }
}

// =========================================================================
// Tests
// =========================================================================
