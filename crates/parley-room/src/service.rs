//! Room service: membership rules over the durable room store.

use std::collections::HashSet;

use parley_protocol::{RoomId, UserId};
use parley_store::{NewRoom, Room, RoomStore, UserDirectory};

use crate::RoomError;

/// What happened when a user left a room.
///
/// The service reports the shape of the change; the caller decides who
/// to notify. Every variant carries the room as it looked *for the
/// notification* — post-change for the surviving variants, the final
/// pre-delete record for [`LeaveOutcome::Deleted`] (so the announcement
/// can still name the room).
#[derive(Debug, Clone)]
pub enum LeaveOutcome {
    /// A non-creator member left; the room carries on.
    Left { room: Room },

    /// The creator left but other members remain: one of them was
    /// promoted to creator. The creator role is never orphaned while a
    /// room has members.
    CreatorReassigned { room: Room, new_creator: UserId },

    /// The creator was the last member; the room was deleted.
    Deleted { room: Room },
}

impl LeaveOutcome {
    /// The room involved, whichever way the leave went.
    pub fn room(&self) -> &Room {
        match self {
            Self::Left { room }
            | Self::CreatorReassigned { room, .. }
            | Self::Deleted { room } => room,
        }
    }
}

/// Owns the membership rules for chat rooms.
///
/// All state lives in the store; the service is freely cloneable and
/// safe to call from any task. Mutations are read-modify-write against
/// the store — fine for a single server process, which is the deployment
/// model here.
#[derive(Clone)]
pub struct RoomService<S> {
    store: S,
}

impl<S> RoomService<S>
where
    S: RoomStore + UserDirectory + Clone,
{
    /// Creates a service over the given store.
    pub fn new(store: S) -> Self {
        Self { store }
    }

    /// Creates a room owned by `creator`.
    ///
    /// The creator is unconditionally a member, whether or not they
    /// listed themselves in `initial_members`. Other initial members are
    /// taken as given — validation against the user directory happens
    /// only on [`add_members`](Self::add_members), matching how rooms
    /// have always been created here.
    ///
    /// # Errors
    /// [`RoomError::NameRequired`] if the name is empty or whitespace.
    pub async fn create_room(
        &self,
        creator: &UserId,
        name: &str,
        description: &str,
        initial_members: Vec<UserId>,
        is_private: bool,
    ) -> Result<Room, RoomError> {
        if name.trim().is_empty() {
            return Err(RoomError::NameRequired);
        }

        let mut members: HashSet<UserId> = initial_members.into_iter().collect();
        members.insert(creator.clone());

        let room = self
            .store
            .create_room(NewRoom {
                name: name.trim().to_string(),
                description: description.trim().to_string(),
                creator: creator.clone(),
                members,
                is_private,
            })
            .await?;

        tracing::info!(room_id = %room.id, %creator, "room created");
        Ok(room)
    }

    /// Returns `true` if the user is a member of the room.
    ///
    /// An unknown room has no members, so this answers `false` rather
    /// than erroring — callers that need to distinguish use
    /// [`room`](Self::room).
    pub async fn is_member(
        &self,
        room_id: &RoomId,
        user_id: &UserId,
    ) -> Result<bool, RoomError> {
        Ok(self
            .store
            .room(room_id)
            .await?
            .is_some_and(|room| room.is_member(user_id)))
    }

    /// Fetches a room by id.
    ///
    /// # Errors
    /// [`RoomError::NotFound`] if it doesn't exist.
    pub async fn room(&self, room_id: &RoomId) -> Result<Room, RoomError> {
        self.store
            .room(room_id)
            .await?
            .ok_or_else(|| RoomError::NotFound(room_id.clone()))
    }

    /// Fetches a room, requiring the requester to be a member.
    ///
    /// The membership gate for history reads and channel joins.
    ///
    /// # Errors
    /// [`RoomError::NotFound`] / [`RoomError::NotAMember`].
    pub async fn member_room(
        &self,
        room_id: &RoomId,
        user_id: &UserId,
    ) -> Result<Room, RoomError> {
        let room = self.room(room_id).await?;
        if !room.is_member(user_id) {
            return Err(RoomError::NotAMember(user_id.clone(), room_id.clone()));
        }
        Ok(room)
    }

    /// Adds members to a room. Creator-only.
    ///
    /// Candidate ids that don't resolve in the user directory, or that
    /// are already members, are silently dropped. Returns the updated
    /// room together with the ids actually added — the caller notifies
    /// exactly those users.
    ///
    /// # Errors
    /// [`RoomError::NotFound`], [`RoomError::NotCreator`], and
    /// [`RoomError::NoNewMembers`] when the surviving set is empty.
    pub async fn add_members(
        &self,
        room_id: &RoomId,
        requester: &UserId,
        candidates: Vec<UserId>,
    ) -> Result<(Room, Vec<UserId>), RoomError> {
        let mut room = self.room(room_id).await?;

        if &room.creator != requester {
            return Err(RoomError::NotCreator(requester.clone(), room_id.clone()));
        }

        let mut added = Vec::new();
        for candidate in candidates {
            if room.is_member(&candidate) || added.contains(&candidate) {
                continue;
            }
            if self.store.find_by_id(&candidate).await?.is_none() {
                tracing::debug!(
                    room_id = %room.id,
                    user_id = %candidate,
                    "dropping unknown user from add-members request"
                );
                continue;
            }
            added.push(candidate);
        }

        if added.is_empty() {
            return Err(RoomError::NoNewMembers);
        }

        room.members.extend(added.iter().cloned());
        let room = self.store.update_room(room).await?;

        tracing::info!(
            room_id = %room.id,
            added = added.len(),
            "members added to room"
        );
        Ok((room, added))
    }

    /// Removes a user from a room's membership.
    ///
    /// A departing creator hands the room to an arbitrary remaining
    /// member; a creator leaving an otherwise-empty room deletes it.
    ///
    /// # Errors
    /// [`RoomError::NotFound`] / [`RoomError::NotAMember`].
    pub async fn leave(
        &self,
        room_id: &RoomId,
        user_id: &UserId,
    ) -> Result<LeaveOutcome, RoomError> {
        let mut room = self.room(room_id).await?;

        if !room.is_member(user_id) {
            return Err(RoomError::NotAMember(user_id.clone(), room_id.clone()));
        }

        if &room.creator == user_id {
            let successor = room.members.iter().find(|m| *m != user_id).cloned();
            match successor {
                Some(new_creator) => {
                    room.members.remove(user_id);
                    room.creator = new_creator.clone();
                    let room = self.store.update_room(room).await?;
                    tracing::info!(
                        room_id = %room.id,
                        %user_id,
                        %new_creator,
                        "creator left room, role reassigned"
                    );
                    Ok(LeaveOutcome::CreatorReassigned { room, new_creator })
                }
                None => {
                    self.store.delete_room(room_id).await?;
                    tracing::info!(
                        room_id = %room.id,
                        %user_id,
                        "last member left, room deleted"
                    );
                    Ok(LeaveOutcome::Deleted { room })
                }
            }
        } else {
            room.members.remove(user_id);
            let room = self.store.update_room(room).await?;
            tracing::info!(room_id = %room.id, %user_id, "member left room");
            Ok(LeaveOutcome::Left { room })
        }
    }

    /// All rooms the user belongs to, most recently updated first.
    pub async fn rooms_for(&self, user_id: &UserId) -> Result<Vec<Room>, RoomError> {
        Ok(self.store.rooms_for(user_id).await?)
    }
}
