//! Room Chat line client
//!
//! Connects to the server, forwards stdin lines and prints server lines.

use std::env;

use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};
use tokio::net::TcpStream;
use tracing::{debug, info};
use tracing_subscriber::EnvFilter;

use room_chat::config::DEFAULT_ADDR;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("room_chat_client=warn")),
        )
        .with_writer(std::io::stderr)
        .init();

    let addr = env::args()
        .nth(1)
        .unwrap_or_else(|| DEFAULT_ADDR.to_string());

    let stream = TcpStream::connect(&addr).await?;
    info!("Connected to {}", addr);
    let (reader, mut writer) = stream.into_split();

    // Server -> stdout
    let mut read_task = tokio::spawn(async move {
        let mut lines = BufReader::new(reader).lines();
        let mut stdout = tokio::io::stdout();
        while let Ok(Some(line)) = lines.next_line().await {
            if stdout.write_all(format!("{}\n", line).as_bytes()).await.is_err() {
                break;
            }
            let _ = stdout.flush().await;
        }
        debug!("Server closed the connection");
    });

    // Stdin -> server
    let write_task = tokio::spawn(async move {
        let mut lines = BufReader::new(tokio::io::stdin()).lines();
        while let Ok(Some(line)) = lines.next_line().await {
            if writer.write_all(format!("{}\n", line).as_bytes()).await.is_err() {
                break;
            }
        }
        let _ = writer.shutdown().await;
        debug!("Input closed");
    });

    // After input ends the server closes the session, which ends the read side
    tokio::select! {
        _ = &mut read_task => {}
        _ = write_task => {
            let _ = read_task.await;
        }
    }

    // Stdin may still be blocked in a read
    std::process::exit(0);
}
