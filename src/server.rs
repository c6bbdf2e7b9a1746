//! ChatServer implementation
//!
//! Owns the shared state (room directory and session registry), the
//! accept loop, and the shutdown signal. Cheap to clone; every connection
//! task and the operator console hold a clone.

use std::sync::Arc;
use std::time::Duration;

use tokio::net::TcpListener;
use tokio_util::sync::CancellationToken;
use tracing::{error, info};

use crate::config::ServerConfig;
use crate::directory::{deliver, RoomDirectory};
use crate::handler::handle_connection;
use crate::message::ServerMessage;
use crate::registry::SessionRegistry;
use crate::session::Session;

/// How long a kicked session gets to receive its notice
const KICK_NOTICE_TIMEOUT: Duration = Duration::from_secs(1);

#[derive(Debug, Clone)]
pub struct ChatServer {
    rooms: Arc<RoomDirectory>,
    sessions: Arc<SessionRegistry>,
    shutdown: CancellationToken,
    config: Arc<ServerConfig>,
}

impl ChatServer {
    /// Create a server with empty registries
    pub fn new(config: ServerConfig) -> Self {
        Self {
            rooms: Arc::new(RoomDirectory::new()),
            sessions: Arc::new(SessionRegistry::new()),
            shutdown: CancellationToken::new(),
            config: Arc::new(config),
        }
    }

    pub fn rooms(&self) -> &Arc<RoomDirectory> {
        &self.rooms
    }

    pub fn sessions(&self) -> &Arc<SessionRegistry> {
        &self.sessions
    }

    pub fn config(&self) -> &ServerConfig {
        &self.config
    }

    /// Signal shutdown: the accept loop and operator console stop
    ///
    /// Running sessions are not interrupted.
    pub fn stop(&self) {
        info!("Shutdown requested");
        self.shutdown.cancel();
    }

    pub fn is_stopped(&self) -> bool {
        self.shutdown.is_cancelled()
    }

    /// Resolves once shutdown has been signalled
    pub async fn stopped(&self) {
        self.shutdown.cancelled().await
    }

    /// Run the accept loop until shutdown
    ///
    /// Each accepted connection gets its own task.
    pub async fn run(&self, listener: TcpListener) {
        if let Ok(addr) = listener.local_addr() {
            info!("Chat server listening on {}", addr);
        }

        loop {
            tokio::select! {
                _ = self.shutdown.cancelled() => break,
                accepted = listener.accept() => match accepted {
                    Ok((stream, addr)) => {
                        info!("New connection from {}", addr);
                        let server = self.clone();

                        // Spawn handler task for each connection
                        tokio::spawn(async move {
                            if let Err(e) = handle_connection(stream, addr.to_string(), server).await {
                                error!("Connection handler error for {}: {}", addr, e);
                            }
                        });
                    }
                    Err(e) => {
                        error!("Failed to accept connection: {}", e);
                    }
                },
            }
        }

        info!("Accept loop stopped");
    }

    /// Tear down a session: cancel, unregister, leave its room, close
    ///
    /// Runs once per session; later calls return immediately. The session
    /// is cancelled before leaving, so a command it is still dispatching
    /// cannot put it back into a room afterwards.
    pub async fn disconnect(&self, session: &Arc<Session>) {
        if !session.retire() {
            return;
        }

        session.cancel();
        self.sessions.unregister(session.id).await;
        if let Ok(outcome) = self.rooms.leave(session).await {
            deliver(outcome.notices).await;
        }
        session.close().await;

        info!("{} disconnected", session);
    }

    /// Disconnect every session with the given username
    ///
    /// Returns the number of sessions kicked.
    pub async fn kick(&self, username: &str) -> usize {
        let targets = self.sessions.find(username).await;
        for session in &targets {
            info!("Kicking {}", session);
            let _ = tokio::time::timeout(KICK_NOTICE_TIMEOUT, session.send(&ServerMessage::Kicked)).await;
            self.disconnect(session).await;
        }
        targets.len()
    }
}
