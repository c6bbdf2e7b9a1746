//! Connection handler
//!
//! Handles individual client connections: username handshake,
//! line framing, and the read loop feeding the command dispatcher.

use futures_util::StreamExt;
use tokio::io::{AsyncRead, AsyncWrite, AsyncWriteExt};
use tokio_util::codec::{FramedRead, LinesCodec, LinesCodecError};
use tracing::{debug, info, warn};

use crate::dispatcher::CommandDispatcher;
use crate::error::AppError;
use crate::message::ServerMessage;
use crate::server::ChatServer;
use crate::session::Session;

/// Handle a new connection
///
/// Works over any duplex byte stream. Performs the username handshake,
/// registers the session, then dispatches lines until EOF, a read error,
/// or the connection being closed by a kick. Disconnect cleanup always
/// runs before returning.
pub async fn handle_connection<S>(stream: S, peer_addr: String, server: ChatServer) -> Result<(), AppError>
where
    S: AsyncRead + AsyncWrite + Send + 'static,
{
    debug!("New connection from {}", peer_addr);

    let (reader, mut writer) = tokio::io::split(stream);
    let codec = LinesCodec::new_with_max_length(server.config().max_line_length);
    let mut lines = FramedRead::new(reader, codec);

    let Some(username) = handshake(&mut lines, &mut writer, &server).await? else {
        debug!("{} left during handshake", peer_addr);
        return Ok(());
    };

    let session = Session::new(username, peer_addr, writer);
    server.sessions().register(session.clone()).await;
    info!("{} connected", session);

    let result = run_session(&mut lines, &session, &server).await;

    server.disconnect(&session).await;
    result
}

/// Dispatch lines until the connection ends
async fn run_session<R>(
    lines: &mut FramedRead<R, LinesCodec>,
    session: &std::sync::Arc<Session>,
    server: &ChatServer,
) -> Result<(), AppError>
where
    R: AsyncRead + Unpin,
{
    let welcome = ServerMessage::Welcome {
        username: session.username.clone(),
    };
    session.send(&welcome).await?;
    session.send(&ServerMessage::Help).await?;

    let dispatcher = CommandDispatcher::new(server.rooms().clone(), session.clone());

    loop {
        let next = tokio::select! {
            _ = session.closed() => {
                debug!("Connection of {} closed by server", session);
                return Ok(());
            }
            next = lines.next() => next,
        };

        match next {
            Some(Ok(line)) => {
                debug!("Line from {}: {}", session, line);
                match dispatcher.dispatch(&line).await {
                    Err(AppError::ConnectionClosed) => return Ok(()),
                    other => other?,
                }
            }
            Some(Err(LinesCodecError::MaxLineLengthExceeded)) => {
                // The framed reader stops after a decode error
                warn!("{} sent an over-long line, closing", session);
                let err = AppError::LineTooLong(server.config().max_line_length);
                let _ = session.send(&ServerMessage::from(err)).await;
                return Ok(());
            }
            Some(Err(LinesCodecError::Io(e))) => return Err(e.into()),
            None => {
                debug!("{} reached end of stream", session);
                return Ok(());
            }
        }
    }
}

/// Prompt until a non-blank username arrives
///
/// Returns None if the stream ends first or the line is too long.
async fn handshake<R, W>(
    lines: &mut FramedRead<R, LinesCodec>,
    writer: &mut W,
    server: &ChatServer,
) -> Result<Option<String>, AppError>
where
    R: AsyncRead + Unpin,
    W: AsyncWrite + Unpin,
{
    loop {
        write_line(writer, &ServerMessage::UsernamePrompt).await?;

        let line = match lines.next().await {
            None => return Ok(None),
            Some(Ok(line)) => line,
            Some(Err(LinesCodecError::MaxLineLengthExceeded)) => {
                let err = AppError::LineTooLong(server.config().max_line_length);
                write_line(writer, &ServerMessage::from(err)).await?;
                return Ok(None);
            }
            Some(Err(LinesCodecError::Io(e))) => return Err(e.into()),
        };

        let username = line.trim();
        if username.is_empty() {
            warn!("Rejected empty username");
            write_line(writer, &ServerMessage::from(AppError::EmptyUsername)).await?;
            continue;
        }
        return Ok(Some(username.to_string()));
    }
}

async fn write_line<W>(writer: &mut W, msg: &ServerMessage) -> Result<(), AppError>
where
    W: AsyncWrite + Unpin,
{
    writer.write_all(format!("{}\n", msg).as_bytes()).await?;
    writer.flush().await?;
    Ok(())
}
