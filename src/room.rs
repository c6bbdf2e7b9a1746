//! Room struct definition
//!
//! Represents a chat room with an ordered member list.
//! The first member is always the owner; members keep join order.

use std::sync::Arc;

use crate::session::Session;
use crate::types::{RoomName, SessionId};

/// Result of removing a member from a room
#[derive(Debug)]
pub enum Departure {
    /// The member was the last one, the room should be deleted
    Emptied,
    /// The owner left and the given member now owns the room
    Promoted(Arc<Session>),
    /// A non-owner left
    Left,
    /// The session was not a member
    NotMember,
}

/// Display snapshot of one room member
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MemberInfo {
    pub username: String,
    pub remote_addr: String,
    pub is_owner: bool,
}

impl std::fmt::Display for MemberInfo {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{} ({})", self.username, self.remote_addr)?;
        if self.is_owner {
            f.write_str(" [owner]")?;
        }
        Ok(())
    }
}

/// Chat room
///
/// Members are stored in join order. Ownership passes to the
/// longest-tenured remaining member when the owner leaves.
#[derive(Debug)]
pub struct Room {
    /// Room name for identification
    pub name: RoomName,
    /// Members in join order, owner first
    members: Vec<Arc<Session>>,
}

impl Room {
    /// Create a new room owned by the given session
    pub fn new(name: RoomName, owner: Arc<Session>) -> Self {
        Self {
            name,
            members: vec![owner],
        }
    }

    /// Current owner of the room
    pub fn owner(&self) -> Option<&Arc<Session>> {
        self.members.first()
    }

    /// Check if the given session owns this room
    pub fn is_owner(&self, id: SessionId) -> bool {
        self.owner().is_some_and(|owner| owner.id == id)
    }

    /// Check if a session is in this room
    pub fn contains(&self, id: SessionId) -> bool {
        self.members.iter().any(|m| m.id == id)
    }

    /// Append a member at the end of the join order
    pub fn add_member(&mut self, session: Arc<Session>) {
        self.members.push(session);
    }

    /// Remove a member, promoting the next oldest if the owner left
    pub fn remove_member(&mut self, id: SessionId) -> Departure {
        let Some(pos) = self.members.iter().position(|m| m.id == id) else {
            return Departure::NotMember;
        };
        self.members.remove(pos);

        match self.members.first() {
            None => Departure::Emptied,
            Some(next) if pos == 0 => Departure::Promoted(next.clone()),
            Some(_) => Departure::Left,
        }
    }

    /// Remove every member, returning them in join order
    pub fn drain_members(&mut self) -> Vec<Arc<Session>> {
        std::mem::take(&mut self.members)
    }

    /// Members in join order
    pub fn members(&self) -> &[Arc<Session>] {
        &self.members
    }

    /// Display snapshot of the member list
    pub fn member_infos(&self) -> Vec<MemberInfo> {
        self.members
            .iter()
            .enumerate()
            .map(|(i, m)| MemberInfo {
                username: m.username.clone(),
                remote_addr: m.remote_addr.clone(),
                is_owner: i == 0,
            })
            .collect()
    }

    /// Get the number of members in the room
    pub fn member_count(&self) -> usize {
        self.members.len()
    }
}
