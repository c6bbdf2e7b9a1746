//! Room directory
//!
//! Process-wide mapping from room name to room, plus the session -> room
//! membership map. Every read or write happens under one lock held for the
//! whole operation, so structural changes never interleave.
//!
//! Operations never write to a connection while holding the lock. They
//! return the notices to send, and callers deliver them afterwards with
//! [`deliver`]. Broadcasts snapshot the member list under the lock and
//! write after releasing it.

use std::collections::HashMap;
use std::sync::Arc;

use tokio::sync::Mutex;
use tracing::{debug, info, warn};

use crate::error::RoomError;
use crate::message::ServerMessage;
use crate::room::{Departure, MemberInfo, Room};
use crate::session::Session;
use crate::types::{RoomName, SessionId};

/// A message addressed to one session
#[derive(Debug)]
pub struct Notice {
    pub to: Arc<Session>,
    pub message: ServerMessage,
}

/// Successful directory operation
///
/// `reply` goes to the requester, `notices` to other sessions.
#[derive(Debug)]
pub struct Outcome {
    pub reply: ServerMessage,
    pub notices: Vec<Notice>,
}

impl Outcome {
    fn reply_only(reply: ServerMessage) -> Self {
        Self {
            reply,
            notices: Vec::new(),
        }
    }
}

/// A session's current room
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Membership {
    pub room: RoomName,
    pub is_owner: bool,
}

/// Display snapshot of one room
#[derive(Debug, Clone)]
pub struct RoomSummary {
    pub name: RoomName,
    pub members: Vec<MemberInfo>,
}

#[derive(Debug, Default)]
struct DirectoryState {
    /// All active rooms: RoomName -> Room
    rooms: HashMap<RoomName, Room>,
    /// Session to room mapping for fast lookup: SessionId -> RoomName
    memberships: HashMap<SessionId, RoomName>,
}

/// Shared registry of all rooms and their membership
#[derive(Debug, Default)]
pub struct RoomDirectory {
    state: Mutex<DirectoryState>,
}

impl RoomDirectory {
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a room with the requester as sole member and owner
    pub async fn create(&self, name: RoomName, requester: &Arc<Session>) -> Result<Outcome, RoomError> {
        let mut state = self.state.lock().await;

        // Disconnect cancels before it leaves, so a closed session seen
        // here has already been cleaned up
        if requester.is_closed() {
            return Err(RoomError::SessionClosed);
        }
        if let Some(current) = state.memberships.get(&requester.id) {
            return Err(RoomError::AlreadyInRoom(current.clone()));
        }
        if state.rooms.contains_key(&name) {
            return Err(RoomError::RoomExists(name));
        }

        state
            .rooms
            .insert(name.clone(), Room::new(name.clone(), requester.clone()));
        state.memberships.insert(requester.id, name.clone());

        info!("{} created room {}", requester, name);
        debug!("Total rooms: {}", state.rooms.len());

        Ok(Outcome::reply_only(ServerMessage::RoomCreated { room: name }))
    }

    /// Delete a room owned by the requester, evicting every member
    pub async fn delete(&self, name: RoomName, requester: &Arc<Session>) -> Result<Outcome, RoomError> {
        let mut guard = self.state.lock().await;
        let state = &mut *guard;

        let Some(current) = state.memberships.get(&requester.id) else {
            return Err(RoomError::NotInRoom);
        };
        let Some(room) = state.rooms.get(&name) else {
            return Err(RoomError::RoomNotFound(name));
        };
        if *current != name || !room.is_owner(requester.id) {
            return Err(RoomError::NotOwner(name));
        }

        let mut notices = Vec::new();
        if let Some(mut room) = state.rooms.remove(&name) {
            for member in room.drain_members() {
                state.memberships.remove(&member.id);
                if member.id != requester.id {
                    notices.push(Notice {
                        to: member,
                        message: ServerMessage::Evicted { room: name.clone() },
                    });
                }
            }
        }

        info!(
            "{} deleted room {} and evicted {} other member(s)",
            requester,
            name,
            notices.len()
        );
        debug!("Total rooms: {}", state.rooms.len());

        Ok(Outcome {
            reply: ServerMessage::RoomDeleted { room: name },
            notices,
        })
    }

    /// Append the requester to an existing room
    ///
    /// Prior members are notified; the requester is not.
    pub async fn join(&self, name: RoomName, requester: &Arc<Session>) -> Result<Outcome, RoomError> {
        let mut guard = self.state.lock().await;
        let state = &mut *guard;

        if requester.is_closed() {
            return Err(RoomError::SessionClosed);
        }
        if let Some(current) = state.memberships.get(&requester.id) {
            return Err(RoomError::AlreadyInRoom(current.clone()));
        }
        let Some(room) = state.rooms.get_mut(&name) else {
            return Err(RoomError::RoomNotFound(name));
        };

        let notices = room
            .members()
            .iter()
            .map(|member| Notice {
                to: member.clone(),
                message: ServerMessage::MemberJoined {
                    username: requester.username.clone(),
                },
            })
            .collect();

        room.add_member(requester.clone());
        state.memberships.insert(requester.id, name.clone());

        info!("{} joined room {} ({} members)", requester, name, room.member_count());

        Ok(Outcome {
            reply: ServerMessage::RoomJoined { room: name },
            notices,
        })
    }

    /// Remove the requester from their room
    ///
    /// Deletes the room when it becomes empty. If the owner leaves, the
    /// longest-tenured remaining member is promoted and told so.
    pub async fn leave(&self, requester: &Arc<Session>) -> Result<Outcome, RoomError> {
        let mut guard = self.state.lock().await;
        let state = &mut *guard;

        let Some(name) = state.memberships.remove(&requester.id) else {
            return Err(RoomError::NotInRoom);
        };
        let reply = ServerMessage::RoomLeft { room: name.clone() };

        let Some(room) = state.rooms.get_mut(&name) else {
            warn!("{} was mapped to missing room {}", requester, name);
            return Ok(Outcome::reply_only(reply));
        };

        let departure = room.remove_member(requester.id);
        let left_notice = |member: &Arc<Session>| Notice {
            to: member.clone(),
            message: ServerMessage::MemberLeft {
                username: requester.username.clone(),
            },
        };

        let notices = match departure {
            Departure::Emptied => {
                state.rooms.remove(&name);
                info!("{} left room {}, room deleted (empty)", requester, name);
                debug!("Total rooms: {}", state.rooms.len());
                Vec::new()
            }
            Departure::Promoted(owner) => {
                info!("{} left room {}, {} is the new owner", requester, name, owner);
                let mut notices: Vec<_> = room.members().iter().map(left_notice).collect();
                notices.push(Notice {
                    to: owner,
                    message: ServerMessage::Promoted { room: name.clone() },
                });
                notices
            }
            Departure::Left => {
                info!("{} left room {}", requester, name);
                room.members().iter().map(left_notice).collect()
            }
            Departure::NotMember => {
                warn!("{} was mapped to room {} but not in its member list", requester, name);
                Vec::new()
            }
        };

        Ok(Outcome { reply, notices })
    }

    /// Current room and owner flag of a session
    pub async fn membership(&self, id: SessionId) -> Option<Membership> {
        let state = self.state.lock().await;
        let room = state.memberships.get(&id)?;
        let is_owner = state.rooms.get(room).is_some_and(|r| r.is_owner(id));
        Some(Membership {
            room: room.clone(),
            is_owner,
        })
    }

    /// Members of the requester's own room, in join order
    pub async fn members(&self, requester: &Arc<Session>) -> Result<(RoomName, Vec<MemberInfo>), RoomError> {
        let state = self.state.lock().await;
        let name = state
            .memberships
            .get(&requester.id)
            .ok_or(RoomError::NotInRoom)?;
        let room = state
            .rooms
            .get(name)
            .ok_or_else(|| RoomError::RoomNotFound(name.clone()))?;
        Ok((name.clone(), room.member_infos()))
    }

    /// Members of the named room, in join order
    pub async fn members_of(&self, name: &RoomName) -> Result<Vec<MemberInfo>, RoomError> {
        let state = self.state.lock().await;
        state
            .rooms
            .get(name)
            .map(Room::member_infos)
            .ok_or_else(|| RoomError::RoomNotFound(name.clone()))
    }

    /// All rooms with their members, sorted by name
    pub async fn snapshot(&self) -> Vec<RoomSummary> {
        let state = self.state.lock().await;
        let mut rooms: Vec<_> = state
            .rooms
            .values()
            .map(|room| RoomSummary {
                name: room.name.clone(),
                members: room.member_infos(),
            })
            .collect();
        rooms.sort_by(|a, b| a.name.cmp(&b.name));
        rooms
    }

    /// Check if a room exists
    pub async fn contains(&self, name: &RoomName) -> bool {
        self.state.lock().await.rooms.contains_key(name)
    }

    /// Number of rooms
    pub async fn len(&self) -> usize {
        self.state.lock().await.rooms.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.state.lock().await.rooms.is_empty()
    }

    /// Send `<sender>: <text>` to every member of the named room
    ///
    /// Returns how many members the line was delivered to.
    pub async fn broadcast(&self, name: &RoomName, sender_username: &str, text: &str) -> Result<usize, RoomError> {
        let recipients = {
            let state = self.state.lock().await;
            let room = state
                .rooms
                .get(name)
                .ok_or_else(|| RoomError::RoomNotFound(name.clone()))?;
            room.members().to_vec()
        };

        Ok(fan_out(&recipients, &chat(sender_username, text)).await)
    }

    /// Broadcast a chat line to the sender's own room, sender included
    pub async fn broadcast_from(&self, sender: &Arc<Session>, text: &str) -> Result<usize, RoomError> {
        let (name, recipients) = {
            let state = self.state.lock().await;
            let name = state
                .memberships
                .get(&sender.id)
                .ok_or(RoomError::NotInRoom)?;
            let room = state
                .rooms
                .get(name)
                .ok_or_else(|| RoomError::RoomNotFound(name.clone()))?;
            (name.clone(), room.members().to_vec())
        };

        debug!("{} -> room {} ({} members)", sender, name, recipients.len());
        Ok(fan_out(&recipients, &chat(&sender.username, text)).await)
    }
}

fn chat(from: &str, content: &str) -> ServerMessage {
    ServerMessage::Chat {
        from: from.to_string(),
        content: content.to_string(),
    }
}

/// Write one message to each recipient in order
///
/// A failed write is logged and skipped.
async fn fan_out(recipients: &[Arc<Session>], msg: &ServerMessage) -> usize {
    let line = msg.to_string();
    let mut delivered = 0;
    for recipient in recipients {
        match recipient.send_line(&line).await {
            Ok(()) => delivered += 1,
            Err(e) => warn!("Broadcast to {} failed: {}", recipient, e),
        }
    }
    delivered
}

/// Deliver notices produced by a directory operation
///
/// Must be called after the operation returned, never under the lock.
pub async fn deliver(notices: Vec<Notice>) {
    for notice in notices {
        if let Err(e) = notice.to.send(&notice.message).await {
            warn!("Notice to {} failed: {}", notice.to, e);
        }
    }
}
