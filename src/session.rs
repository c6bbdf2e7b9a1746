//! Session struct definition
//!
//! Represents one connected, authenticated client: its identity,
//! username, and the write half of its connection.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Instant;

use tokio::io::{AsyncWrite, AsyncWriteExt};
use tokio::sync::Mutex;
use tokio_util::sync::{CancellationToken, WaitForCancellationFuture};

use crate::error::AppError;
use crate::message::ServerMessage;
use crate::types::SessionId;

/// Write half of a session's connection
pub type ConnectionWriter = Box<dyn AsyncWrite + Send + Unpin>;

/// Connected client information
///
/// Everything here is fixed at connect time. Room membership is tracked
/// by the room directory, not by the session.
pub struct Session {
    /// Unique identifier for this session
    pub id: SessionId,
    /// Username given during the handshake
    pub username: String,
    /// Peer address of the underlying connection
    pub remote_addr: String,
    /// Time the handshake completed
    pub connected_at: Instant,
    /// Server → Client byte stream
    writer: Mutex<ConnectionWriter>,
    /// Cancelled when the connection is closed
    closed: CancellationToken,
    /// Set once disconnect cleanup has run
    retired: AtomicBool,
}

impl Session {
    /// Create a new session owning the given connection writer
    pub fn new<W>(username: impl Into<String>, remote_addr: impl Into<String>, writer: W) -> Arc<Self>
    where
        W: AsyncWrite + Send + Unpin + 'static,
    {
        Arc::new(Self {
            id: SessionId::new(),
            username: username.into(),
            remote_addr: remote_addr.into(),
            connected_at: Instant::now(),
            writer: Mutex::new(Box::new(writer)),
            closed: CancellationToken::new(),
            retired: AtomicBool::new(false),
        })
    }

    /// Write one line of text to this session
    ///
    /// A trailing newline is appended when missing.
    /// Returns an error if the connection is closed or the write fails.
    /// A write blocked on a peer that never reads is abandoned as soon as
    /// the session is cancelled, releasing the writer.
    pub async fn send_line(&self, text: &str) -> Result<(), AppError> {
        if self.closed.is_cancelled() {
            return Err(AppError::ConnectionClosed);
        }

        tokio::select! {
            _ = self.closed.cancelled() => Err(AppError::ConnectionClosed),
            written = self.write_line(text) => written,
        }
    }

    async fn write_line(&self, text: &str) -> Result<(), AppError> {
        let mut writer = self.writer.lock().await;
        writer.write_all(text.as_bytes()).await?;
        if !text.ends_with('\n') {
            writer.write_all(b"\n").await?;
        }
        writer.flush().await?;
        Ok(())
    }

    /// Render and send a server message
    pub async fn send(&self, msg: &ServerMessage) -> Result<(), AppError> {
        self.send_line(&msg.to_string()).await
    }

    /// Mark the connection closed without touching the writer
    ///
    /// Wakes the session's read loop, aborts pending writes and makes
    /// room operations reject this session.
    pub fn cancel(&self) {
        self.closed.cancel();
    }

    /// Close the connection
    ///
    /// Cancels the session, then shuts down the write half. Pending
    /// writes give the writer up on cancellation, so this never waits on
    /// a peer that stopped reading.
    pub async fn close(&self) {
        self.closed.cancel();
        let mut writer = self.writer.lock().await;
        let _ = writer.shutdown().await;
    }

    /// Check if the connection has been closed
    pub fn is_closed(&self) -> bool {
        self.closed.is_cancelled()
    }

    /// Resolves once the connection has been closed
    pub fn closed(&self) -> WaitForCancellationFuture<'_> {
        self.closed.cancelled()
    }

    /// Mark this session as retired
    ///
    /// Returns true only for the first caller, so disconnect cleanup
    /// runs exactly once no matter which path triggers it.
    pub fn retire(&self) -> bool {
        !self.retired.swap(true, Ordering::AcqRel)
    }
}

impl std::fmt::Debug for Session {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Session")
            .field("id", &self.id)
            .field("username", &self.username)
            .field("remote_addr", &self.remote_addr)
            .field("closed", &self.is_closed())
            .finish()
    }
}

impl std::fmt::Display for Session {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}@{}", self.username, self.remote_addr)
    }
}
