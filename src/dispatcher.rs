//! Per-session command dispatcher
//!
//! Parses one inbound line, runs the matching directory operation and
//! writes the reply back. The session is in a room or not; that state
//! lives in the room directory, so each line is handled independently.

use std::sync::Arc;

use tracing::debug;

use crate::directory::{deliver, Outcome, RoomDirectory};
use crate::error::{AppError, RoomError};
use crate::message::{Command, ServerMessage};
use crate::session::Session;

pub struct CommandDispatcher {
    rooms: Arc<RoomDirectory>,
    session: Arc<Session>,
}

impl CommandDispatcher {
    pub fn new(rooms: Arc<RoomDirectory>, session: Arc<Session>) -> Self {
        Self { rooms, session }
    }

    /// Handle one inbound line
    ///
    /// Command errors are answered and swallowed. Only failures writing to
    /// this session's own connection are returned.
    pub async fn dispatch(&self, line: &str) -> Result<(), AppError> {
        if line.trim().is_empty() {
            return Ok(());
        }

        match self.execute(line).await {
            Ok(()) => Ok(()),
            Err(e) if e.is_fatal() => Err(e),
            Err(e) => {
                debug!("Command from {} rejected: {}", self.session, e);
                self.session.send(&ServerMessage::from(e)).await
            }
        }
    }

    async fn execute(&self, line: &str) -> Result<(), AppError> {
        let session = &self.session;

        match Command::parse(line)? {
            Command::Create(name) => self.finish(self.rooms.create(name, session).await).await,
            Command::Delete(name) => self.finish(self.rooms.delete(name, session).await).await,
            Command::Join(name) => self.finish(self.rooms.join(name, session).await).await,
            Command::Leave => self.finish(self.rooms.leave(session).await).await,
            Command::Me => {
                let membership = self.rooms.membership(session.id).await;
                session
                    .send(&ServerMessage::Me {
                        username: session.username.clone(),
                        remote_addr: session.remote_addr.clone(),
                        is_owner: membership.as_ref().is_some_and(|m| m.is_owner),
                        room: membership.map(|m| m.room),
                    })
                    .await
            }
            Command::Anyone => {
                let (room, members) = self.rooms.members(session).await?;
                session.send(&ServerMessage::Members { room, members }).await
            }
            Command::Help => session.send(&ServerMessage::Help).await,
            Command::Say(text) => match self.rooms.broadcast_from(session, &text).await {
                Ok(_) => Ok(()),
                Err(RoomError::NotInRoom) => session.send(&ServerMessage::JoinRoomFirst).await,
                Err(e) => Err(e.into()),
            },
        }
    }

    /// Reply to the requester, then notify everyone else
    async fn finish(&self, result: Result<Outcome, RoomError>) -> Result<(), AppError> {
        let outcome = result?;
        let replied = self.session.send(&outcome.reply).await;
        deliver(outcome.notices).await;
        replied
    }
}
