//! Operator console
//!
//! Reads administrative commands from a local line source (stdin in the
//! binary) concurrently with client handling.

use tokio::io::{AsyncBufRead, AsyncBufReadExt, AsyncWrite, AsyncWriteExt};
use tracing::{info, warn};

use crate::error::AppError;
use crate::server::ChatServer;

const KICK_USAGE: &str = "kick <username>";

const COMMANDS: &[(&str, &str)] = &[
    ("list-users", "List every connected user"),
    ("list-rooms", "List every room and its members"),
    (KICK_USAGE, "Disconnect every user with that name"),
    ("stop", "Stop accepting connections and exit"),
    ("help", "Show this help message"),
];

/// Operator command
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum OperatorCommand {
    Stop,
    ListUsers,
    ListRooms,
    Kick(String),
    Help,
}

impl OperatorCommand {
    /// Parse one trimmed console line
    pub fn parse(line: &str) -> Result<Self, AppError> {
        let mut tokens = line.split_whitespace();
        match tokens.next() {
            Some("stop") => Ok(Self::Stop),
            Some("list-users") => Ok(Self::ListUsers),
            Some("list-rooms") => Ok(Self::ListRooms),
            Some("help") => Ok(Self::Help),
            Some("kick") => tokens
                .next()
                .map(|name| Self::Kick(name.to_string()))
                .ok_or(AppError::MissingArgument { usage: KICK_USAGE }),
            Some(other) => Err(AppError::UnknownCommand(other.to_string())),
            None => Err(AppError::UnknownCommand(String::new())),
        }
    }
}

pub struct OperatorConsole {
    server: ChatServer,
}

impl OperatorConsole {
    pub fn new(server: ChatServer) -> Self {
        Self { server }
    }

    /// Run until `stop`, end of input, or shutdown from elsewhere
    pub async fn run<R, W>(&self, input: R, mut output: W) -> std::io::Result<()>
    where
        R: AsyncBufRead + Unpin,
        W: AsyncWrite + Unpin,
    {
        let mut lines = input.lines();

        loop {
            let line = tokio::select! {
                _ = self.server.stopped() => break,
                line = lines.next_line() => line?,
            };
            let Some(line) = line else {
                info!("Operator input closed");
                break;
            };
            let line = line.trim();
            if line.is_empty() {
                continue;
            }

            let mut stop = false;
            let reply = match OperatorCommand::parse(line) {
                Ok(cmd) => {
                    stop = cmd == OperatorCommand::Stop;
                    self.execute(cmd).await
                }
                Err(e) => {
                    warn!("Operator command rejected: {}", e);
                    format!("Error: {}", e)
                }
            };

            output.write_all(reply.as_bytes()).await?;
            output.write_all(b"\n").await?;
            output.flush().await?;

            if stop {
                break;
            }
        }

        Ok(())
    }

    /// Run one command and render its output
    pub async fn execute(&self, cmd: OperatorCommand) -> String {
        match cmd {
            OperatorCommand::Stop => {
                self.server.stop();
                "Server stopping".to_string()
            }
            OperatorCommand::ListUsers => self.list_users().await,
            OperatorCommand::ListRooms => self.list_rooms().await,
            OperatorCommand::Kick(username) => {
                let kicked = self.server.kick(&username).await;
                info!("Operator kicked {} session(s) named '{}'", kicked, username);
                if kicked == 0 {
                    format!("No user named '{}'", username)
                } else {
                    format!("Kicked {} session(s) named '{}'", kicked, username)
                }
            }
            OperatorCommand::Help => COMMANDS
                .iter()
                .map(|(cmd, description)| format!("{:<18} - {}", cmd, description))
                .collect::<Vec<_>>()
                .join("\n"),
        }
    }

    async fn list_users(&self) -> String {
        let sessions = self.server.sessions().snapshot().await;
        if sessions.is_empty() {
            return "No users connected".to_string();
        }

        let mut out = format!("{} user(s) connected:", sessions.len());
        for session in sessions {
            out.push_str(&format!("\n  {} ({})", session.username, session.remote_addr));
            if let Some(membership) = self.server.rooms().membership(session.id).await {
                out.push_str(&format!(", room: {}", membership.room));
                if membership.is_owner {
                    out.push_str(" [owner]");
                }
            }
        }
        out
    }

    async fn list_rooms(&self) -> String {
        let rooms = self.server.rooms().snapshot().await;
        if rooms.is_empty() {
            return "No rooms".to_string();
        }

        let mut out = format!("{} room(s):", rooms.len());
        for room in rooms {
            out.push_str(&format!("\n  {} ({} members)", room.name, room.members.len()));
            for member in room.members {
                out.push_str(&format!("\n    {}", member));
            }
        }
        out
    }
}
