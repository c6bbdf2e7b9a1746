//! Room Chat Server - Entry Point
//!
//! Starts the TCP listener, the operator console and the accept loop.

use tokio::io::BufReader;
use tokio::net::TcpListener;
use tracing::{error, info};
use tracing_subscriber::EnvFilter;

use room_chat::{ChatServer, OperatorConsole, ServerConfig};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Initialize logging with environment filter
    // Use RUST_LOG env var to control log level
    // e.g., RUST_LOG=debug or RUST_LOG=room_chat=trace
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("room_chat=info")),
        )
        .init();

    // Bind address from command line, line limit from environment
    let config = ServerConfig::from_env();

    // Start TCP listener
    let listener = TcpListener::bind(&config.bind_addr).await?;
    info!("Room Chat Server listening on {}", config.bind_addr);

    let server = ChatServer::new(config);

    // Operator console on stdin
    let console = OperatorConsole::new(server.clone());
    let console_task = tokio::spawn(async move {
        let stdin = BufReader::new(tokio::io::stdin());
        if let Err(e) = console.run(stdin, tokio::io::stdout()).await {
            error!("Operator console error: {}", e);
        }
    });
    info!("Operator console started, type help for commands");

    // Connection accept loop
    server.run(listener).await;

    // Only `stop` ends the accept loop, so the console has returned too
    let _ = console_task.await;

    info!("Server stopped");
    Ok(())
}
