//! Integration tests driving the full line protocol over in-memory pipes.

use std::time::Duration;

use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader, DuplexStream, ReadHalf, WriteHalf};
use tokio::task::JoinHandle;
use tokio::time::timeout;

use room_chat::{handle_connection, AppError, ChatServer, OperatorConsole, RoomName, ServerConfig};

const WAIT: Duration = Duration::from_secs(2);

/// One connected client, talking to the server through a duplex pipe
struct TestClient {
    reader: BufReader<ReadHalf<DuplexStream>>,
    writer: WriteHalf<DuplexStream>,
    task: JoinHandle<Result<(), AppError>>,
}

impl TestClient {
    /// Open a connection without completing the handshake
    fn open(server: &ChatServer, peer: &str) -> Self {
        Self::open_with_capacity(server, peer, 16 * 1024)
    }

    /// Open a connection whose pipe buffers at most `capacity` bytes
    fn open_with_capacity(server: &ChatServer, peer: &str, capacity: usize) -> Self {
        let (client, remote) = tokio::io::duplex(capacity);
        let task = tokio::spawn(handle_connection(remote, peer.to_string(), server.clone()));
        let (reader, writer) = tokio::io::split(client);
        Self {
            reader: BufReader::new(reader),
            writer,
            task,
        }
    }

    /// Connect and log in, consuming the prompt, welcome and help text
    async fn connect(server: &ChatServer, username: &str) -> Self {
        Self::connect_with_capacity(server, username, 16 * 1024).await
    }

    async fn connect_with_capacity(server: &ChatServer, username: &str, capacity: usize) -> Self {
        let mut client = Self::open_with_capacity(server, &format!("{}-addr", username), capacity);
        assert_eq!(client.recv().await, "Please enter your username:");
        client.send(username).await;
        assert!(client.recv().await.starts_with("Welcome"));
        client.recv_until("-help").await;
        client
    }

    async fn send(&mut self, line: &str) {
        self.writer.write_all(format!("{}\n", line).as_bytes()).await.unwrap();
        self.writer.flush().await.unwrap();
    }

    /// Next line, or None at end of stream
    async fn try_recv(&mut self) -> Option<String> {
        let mut line = String::new();
        let n = timeout(WAIT, self.reader.read_line(&mut line))
            .await
            .expect("timed out waiting for a line")
            .unwrap();
        (n > 0).then(|| line.trim_end().to_string())
    }

    async fn recv(&mut self) -> String {
        self.try_recv().await.expect("connection closed")
    }

    /// Skip lines until one contains the needle
    async fn recv_until(&mut self, needle: &str) -> String {
        loop {
            let line = self.recv().await;
            if line.contains(needle) {
                return line;
            }
        }
    }

    /// Read until the server closes the connection
    async fn recv_eof(&mut self) -> Vec<String> {
        let mut lines = Vec::new();
        while let Some(line) = self.try_recv().await {
            lines.push(line);
        }
        lines
    }
}

fn server() -> ChatServer {
    ChatServer::new(ServerConfig::default())
}

fn lobby() -> RoomName {
    RoomName::parse("lobby").unwrap()
}

#[tokio::test]
async fn test_lobby_scenario() {
    let server = server();
    let mut alice = TestClient::connect(&server, "alice").await;

    alice.send("-create lobby").await;
    assert!(alice.recv().await.contains("lobby"));

    let mut bob = TestClient::connect(&server, "bob").await;
    bob.send("-join lobby").await;
    assert!(bob.recv().await.contains("Joined room 'lobby'"));
    assert_eq!(alice.recv().await, "bob has joined the room!");

    bob.send("hello").await;
    assert_eq!(bob.recv().await, "bob: hello");
    assert_eq!(alice.recv().await, "bob: hello");

    alice.send("-leave").await;
    assert_eq!(alice.recv().await, "You left room 'lobby'.");
    assert_eq!(bob.recv().await, "alice has left the room.");
    assert!(bob.recv().await.contains("promoted to the owner of room 'lobby'"));

    bob.send("-delete lobby").await;
    assert_eq!(bob.recv().await, "Room 'lobby' deleted.");
    assert!(!server.rooms().contains(&lobby()).await);

    bob.send("-me").await;
    assert_eq!(bob.recv().await, "You are: bob (bob-addr), room: none, owner: false");
}

#[tokio::test]
async fn test_operator_kick_promotes_remaining_member() {
    let server = server();
    let mut alice = TestClient::connect(&server, "alice").await;
    let mut bob = TestClient::connect(&server, "bob").await;

    alice.send("-create lobby").await;
    alice.recv().await;
    bob.send("-join lobby").await;
    bob.recv().await;
    alice.recv().await;

    let mut output = Vec::new();
    OperatorConsole::new(server.clone())
        .run(&b"kick alice\n"[..], &mut output)
        .await
        .unwrap();
    assert!(String::from_utf8(output).unwrap().contains("Kicked 1 session(s)"));

    let last = alice.recv_eof().await;
    assert_eq!(last, ["You have been kicked by the server operator."]);
    timeout(WAIT, alice.task).await.unwrap().unwrap().unwrap();

    assert_eq!(bob.recv().await, "alice has left the room.");
    assert!(bob.recv().await.contains("promoted"));

    let members = server.rooms().members_of(&lobby()).await.unwrap();
    assert_eq!(members.len(), 1);
    assert_eq!(members[0].username, "bob");
    assert!(members[0].is_owner);
    assert_eq!(server.sessions().len().await, 1);
}

#[tokio::test]
async fn test_disconnect_cleans_up_room() {
    let server = server();
    let mut alice = TestClient::connect(&server, "alice").await;
    let mut bob = TestClient::connect(&server, "bob").await;

    alice.send("-create lobby").await;
    alice.recv().await;
    bob.send("-join lobby").await;
    bob.recv().await;

    // Closing the client side ends alice's read loop
    drop(alice.writer);
    drop(alice.reader);
    timeout(WAIT, alice.task).await.unwrap().unwrap().unwrap();

    assert_eq!(bob.recv().await, "alice has left the room.");
    assert!(bob.recv().await.contains("promoted"));
    assert_eq!(server.sessions().len().await, 1);

    bob.send("-leave").await;
    bob.recv().await;
    assert!(server.rooms().is_empty().await);
}

#[tokio::test]
async fn test_empty_username_is_rejected() {
    let server = server();
    let mut client = TestClient::open(&server, "anon-addr");

    assert_eq!(client.recv().await, "Please enter your username:");
    client.send("   ").await;
    assert_eq!(
        client.recv().await,
        "Error: Username must contain at least one non-whitespace character"
    );
    assert_eq!(client.recv().await, "Please enter your username:");
    assert!(server.sessions().is_empty().await);

    client.send("  carol  ").await;
    assert_eq!(client.recv().await, "Welcome to the chat, carol!");
    assert_eq!(server.sessions().find("carol").await.len(), 1);
}

#[tokio::test]
async fn test_missing_arguments_keep_session_alive() {
    let server = server();
    let mut alice = TestClient::connect(&server, "alice").await;

    for (line, usage) in [
        ("-create", "-create <room>"),
        ("-delete", "-delete <room>"),
        ("-join", "-join <room>"),
    ] {
        alice.send(line).await;
        assert_eq!(alice.recv().await, format!("Error: Missing argument, usage: {}", usage));
    }

    alice.send("-create lobby").await;
    assert!(alice.recv().await.contains("lobby"));
}

#[tokio::test]
async fn test_single_room_membership() {
    let server = server();
    let mut alice = TestClient::connect(&server, "alice").await;

    alice.send("-create lobby").await;
    alice.recv().await;

    alice.send("-create attic").await;
    assert!(alice.recv().await.contains("already in room 'lobby'"));
    alice.send("-join lobby").await;
    assert!(alice.recv().await.contains("already in room 'lobby'"));
    assert_eq!(server.rooms().len().await, 1);
}

#[tokio::test]
async fn test_chat_requires_room_and_reaches_everyone() {
    let server = server();
    let mut alice = TestClient::connect(&server, "alice").await;
    let mut bob = TestClient::connect(&server, "bob").await;
    let mut carol = TestClient::connect(&server, "carol").await;

    carol.send("anyone home?").await;
    assert!(carol.recv().await.contains("must join a room first"));

    alice.send("-create lobby").await;
    alice.recv().await;
    bob.send("-join lobby").await;
    bob.recv().await;
    alice.recv().await;

    alice.send("hi   there").await;
    assert_eq!(alice.recv().await, "alice: hi   there");
    assert_eq!(bob.recv().await, "alice: hi   there");

    // carol is outside the room and hears nothing
    carol.send("-me").await;
    assert!(carol.recv().await.starts_with("You are: carol"));
}

#[tokio::test]
async fn test_over_long_line_closes_session() {
    let server = ChatServer::new(ServerConfig {
        max_line_length: 16,
        ..ServerConfig::default()
    });
    let mut alice = TestClient::connect(&server, "alice").await;

    alice.send(&"x".repeat(64)).await;
    let last = alice.recv_eof().await;
    assert_eq!(last, ["Error: Line too long, the maximum is 16 bytes"]);
    timeout(WAIT, alice.task).await.unwrap().unwrap().unwrap();
    assert!(server.sessions().is_empty().await);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_kick_during_create_leaves_no_room() {
    for _ in 0..20 {
        let server = server();
        let mut alice = TestClient::connect(&server, "alice").await;

        // The kick races the command the session is dispatching
        alice.send("-create lobby").await;
        let operator = server.clone();
        let kick = tokio::spawn(async move { operator.kick("alice").await });

        assert_eq!(timeout(WAIT, kick).await.unwrap().unwrap(), 1);
        let last = alice.recv_eof().await;
        assert!(last.iter().any(|l| l == "You have been kicked by the server operator."));
        timeout(WAIT, alice.task).await.unwrap().unwrap().unwrap();

        assert!(server.rooms().is_empty().await);
        assert!(server.sessions().is_empty().await);
    }
}

#[tokio::test]
async fn test_kick_session_stalling_a_broadcast() {
    let server = server();
    let mut bob = TestClient::connect(&server, "bob").await;
    bob.send("-create lobby").await;
    bob.recv().await;

    let mut slow = TestClient::connect_with_capacity(&server, "slow", 64).await;
    slow.send("-join lobby").await;
    assert!(slow.recv().await.contains("Joined room 'lobby'"));
    assert_eq!(bob.recv().await, "slow has joined the room!");

    // slow stops reading, so the fan-out blocks once its pipe is full
    let text = "y".repeat(200);
    bob.send(&text).await;
    assert_eq!(bob.recv().await, format!("bob: {}", text));
    tokio::time::sleep(Duration::from_millis(50)).await;

    let mut output = Vec::new();
    timeout(
        Duration::from_secs(5),
        OperatorConsole::new(server.clone()).run(&b"kick slow\n"[..], &mut output),
    )
    .await
    .expect("kick hung on a stalled session")
    .unwrap();
    assert!(String::from_utf8(output).unwrap().contains("Kicked 1 session(s) named 'slow'"));

    timeout(WAIT, slow.task).await.unwrap().unwrap().unwrap();
    assert_eq!(bob.recv().await, "slow has left the room.");

    bob.send("-me").await;
    let me = bob.recv().await;
    assert!(me.starts_with("You are: bob"));
    assert!(me.contains("lobby"));

    let members = server.rooms().members_of(&lobby()).await.unwrap();
    assert_eq!(members.len(), 1);
    assert_eq!(members[0].username, "bob");
    assert_eq!(server.sessions().len().await, 1);
}
