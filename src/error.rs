//! Error types for the chat server
//!
//! Defines room directory errors and application-level errors.
//! Uses thiserror for ergonomic error definitions.

use thiserror::Error;

use crate::types::RoomName;

/// Room directory errors
///
/// Every variant is recoverable: it is reported back to the requesting
/// session and never ends its loop.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RoomError {
    /// Session is already a member of a room
    #[error("You are already in room '{0}', please leave it first")]
    AlreadyInRoom(RoomName),

    /// Session is not a member of any room
    #[error("You are not in a room")]
    NotInRoom,

    /// Session is not the owner of the room
    #[error("You are not the owner of room '{0}'")]
    NotOwner(RoomName),

    /// A room with that name already exists
    #[error("Room '{0}' already exists, use -join {0} to join it")]
    RoomExists(RoomName),

    /// No room with that name exists
    #[error("Room '{0}' does not exist")]
    RoomNotFound(RoomName),

    /// Requester's connection is already closed
    #[error("Your connection is closed")]
    SessionClosed,
}

/// Application-level errors
///
/// Covers both fatal errors (session termination) and
/// business errors (send error message to client).
#[derive(Debug, Error)]
pub enum AppError {
    /// Room directory rejected the operation
    #[error(transparent)]
    Room(#[from] RoomError),

    /// A command was sent without its required argument
    #[error("Missing argument, usage: {usage}")]
    MissingArgument { usage: &'static str },

    /// Operator console did not recognise the command
    #[error("Unknown command '{0}', type help for a list of commands")]
    UnknownCommand(String),

    /// Username is empty or whitespace only
    #[error("Username must contain at least one non-whitespace character")]
    EmptyUsername,

    /// Inbound line exceeded the configured maximum length
    #[error("Line too long, the maximum is {0} bytes")]
    LineTooLong(usize),

    /// The session's connection was closed (fatal)
    #[error("Connection closed")]
    ConnectionClosed,

    /// Read or write failure on the transport (fatal)
    #[error("Transport error: {0}")]
    Transport(#[from] std::io::Error),
}

impl AppError {
    /// Whether this error ends the session that produced it
    pub fn is_fatal(&self) -> bool {
        matches!(self, AppError::ConnectionClosed | AppError::Transport(_))
    }
}
