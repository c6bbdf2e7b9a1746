//! Message protocol definitions
//!
//! Line-oriented text protocol. Client lines are split on whitespace and
//! the first token selects a command; anything else is a chat message.
//! Server lines are rendered through `Display`.

use crate::error::AppError;
use crate::room::MemberInfo;
use crate::types::RoomName;

/// Usage strings for commands taking a room argument
pub const CREATE_USAGE: &str = "-create <room>";
pub const DELETE_USAGE: &str = "-delete <room>";
pub const JOIN_USAGE: &str = "-join <room>";

/// Command list sent on connect and in reply to `-help`
const COMMANDS: &[(&str, &str)] = &[
    (CREATE_USAGE, "Create and join a new chat room"),
    (DELETE_USAGE, "Delete a room (must be its owner)"),
    (JOIN_USAGE, "Join an existing room"),
    ("-leave", "Leave your current room"),
    ("-me", "Show your current user information"),
    ("-anyone", "List all members in your current room"),
    ("-help", "Show this help message"),
];

/// Client → Server command
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    /// Create a room and become its owner
    Create(RoomName),
    /// Delete a room owned by the sender
    Delete(RoomName),
    /// Join an existing room
    Join(RoomName),
    /// Leave the current room
    Leave,
    /// Show own session info
    Me,
    /// List members of the current room
    Anyone,
    /// Show the command list
    Help,
    /// Plain chat line for the current room
    Say(String),
}

impl Command {
    /// Parse one inbound line
    ///
    /// Argument count is checked before use: a missing room name yields
    /// `AppError::MissingArgument`. Extra tokens are ignored.
    pub fn parse(line: &str) -> Result<Command, AppError> {
        let line = line.trim_end_matches(['\r', '\n']);
        let mut tokens = line.split_whitespace();

        let cmd = match tokens.next() {
            Some("-create") => Command::Create(room_arg(tokens.next(), CREATE_USAGE)?),
            Some("-delete") => Command::Delete(room_arg(tokens.next(), DELETE_USAGE)?),
            Some("-join") => Command::Join(room_arg(tokens.next(), JOIN_USAGE)?),
            Some("-leave") => Command::Leave,
            Some("-me") => Command::Me,
            Some("-anyone") => Command::Anyone,
            Some("-help") => Command::Help,
            _ => Command::Say(line.to_string()),
        };
        Ok(cmd)
    }
}

fn room_arg(token: Option<&str>, usage: &'static str) -> Result<RoomName, AppError> {
    token
        .and_then(RoomName::parse)
        .ok_or(AppError::MissingArgument { usage })
}

/// Server → Client message
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ServerMessage {
    /// Handshake prompt
    UsernamePrompt,
    /// Handshake completed
    Welcome { username: String },
    /// Command list
    Help,
    /// Room created successfully
    RoomCreated { room: RoomName },
    /// Room deleted by the requester
    RoomDeleted { room: RoomName },
    /// Room joined successfully
    RoomJoined { room: RoomName },
    /// Requester left their room
    RoomLeft { room: RoomName },
    /// Another member joined the room
    MemberJoined { username: String },
    /// Another member left the room
    MemberLeft { username: String },
    /// Receiver became the room owner
    Promoted { room: RoomName },
    /// Receiver was removed because the room was deleted
    Evicted { room: RoomName },
    /// Chat message from a room member
    Chat { from: String, content: String },
    /// Own session info
    Me {
        username: String,
        remote_addr: String,
        room: Option<RoomName>,
        is_owner: bool,
    },
    /// Members of a room
    Members { room: RoomName, members: Vec<MemberInfo> },
    /// Chat attempted outside a room
    JoinRoomFirst,
    /// Operator removed the session
    Kicked,
    /// Error occurred
    Error { message: String },
}

impl std::fmt::Display for ServerMessage {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ServerMessage::UsernamePrompt => write!(f, "Please enter your username:"),
            ServerMessage::Welcome { username } => {
                write!(f, "Welcome to the chat, {}!", username)
            }
            ServerMessage::Help => {
                writeln!(f, "Available commands:")?;
                for (i, (cmd, description)) in COMMANDS.iter().enumerate() {
                    if i > 0 {
                        writeln!(f)?;
                    }
                    write!(f, "{:<20} - {}", cmd, description)?;
                }
                Ok(())
            }
            ServerMessage::RoomCreated { room } => write!(
                f,
                "Successfully created room '{}'! Your messages now go to this room.",
                room
            ),
            ServerMessage::RoomDeleted { room } => write!(f, "Room '{}' deleted.", room),
            ServerMessage::RoomJoined { room } => write!(
                f,
                "Joined room '{}'! Your messages now go to this room.",
                room
            ),
            ServerMessage::RoomLeft { room } => write!(f, "You left room '{}'.", room),
            ServerMessage::MemberJoined { username } => {
                write!(f, "{} has joined the room!", username)
            }
            ServerMessage::MemberLeft { username } => write!(f, "{} has left the room.", username),
            ServerMessage::Promoted { room } => {
                write!(f, "You have been promoted to the owner of room '{}'!", room)
            }
            ServerMessage::Evicted { room } => write!(
                f,
                "Room '{}' was deleted by its owner, you are no longer in a room.",
                room
            ),
            ServerMessage::Chat { from, content } => write!(f, "{}: {}", from, content),
            ServerMessage::Me {
                username,
                remote_addr,
                room,
                is_owner,
            } => {
                let room = room.as_ref().map(RoomName::as_str).unwrap_or("none");
                write!(
                    f,
                    "You are: {} ({}), room: {}, owner: {}",
                    username, remote_addr, room, is_owner
                )
            }
            ServerMessage::Members { room, members } => {
                write!(f, "Room '{}' members:", room)?;
                for member in members {
                    write!(f, "\n  {}", member)?;
                }
                Ok(())
            }
            ServerMessage::JoinRoomFirst => write!(
                f,
                "You must join a room first before chatting, type -help if you need help."
            ),
            ServerMessage::Kicked => write!(f, "You have been kicked by the server operator."),
            ServerMessage::Error { message } => write!(f, "Error: {}", message),
        }
    }
}

/// Convert AppError to ServerMessage for client notification
impl From<AppError> for ServerMessage {
    fn from(err: AppError) -> Self {
        ServerMessage::Error {
            message: err.to_string(),
        }
    }
}
