//! Room-based TCP Chat Server Library
//!
//! A multi-user chat server speaking a line-oriented text protocol.
//! Clients pick a username, then create, join, leave and delete rooms
//! and chat with everyone in their room. A local operator console can
//! list users and rooms, kick users and stop the server.
//!
//! # Features
//! - Username handshake
//! - Named rooms with an owner (first member in join order)
//! - Ownership passes to the longest-tenured member when the owner leaves
//! - Best-effort broadcast to every room member
//! - Operator console: `list-users`, `list-rooms`, `kick`, `stop`
//!
//! # Architecture
//! Shared state lives in two lock-encapsulated services:
//! - `RoomDirectory` owns rooms and memberships; every operation runs
//!   under one lock and hands back the notices to send afterwards
//! - `SessionRegistry` tracks every live session for the operator
//! - Each connection runs its own task: handshake, then a read loop
//!   feeding the `CommandDispatcher`
//!
//! # Example
//! ```ignore
//! use tokio::net::TcpListener;
//! use room_chat::{ChatServer, ServerConfig};
//!
//! #[tokio::main]
//! async fn main() {
//!     let config = ServerConfig::default();
//!     let listener = TcpListener::bind(&config.bind_addr).await.unwrap();
//!     ChatServer::new(config).run(listener).await;
//! }
//! ```

pub mod config;
pub mod console;
pub mod directory;
pub mod dispatcher;
pub mod error;
pub mod handler;
pub mod message;
pub mod registry;
pub mod room;
pub mod server;
pub mod session;
pub mod types;

// Re-export main types for convenience
pub use config::ServerConfig;
pub use console::{OperatorCommand, OperatorConsole};
pub use directory::{Membership, RoomDirectory};
pub use dispatcher::CommandDispatcher;
pub use error::{AppError, RoomError};
pub use handler::handle_connection;
pub use message::{Command, ServerMessage};
pub use registry::SessionRegistry;
pub use room::{MemberInfo, Room};
pub use server::ChatServer;
pub use session::Session;
pub use types::{RoomName, SessionId};
