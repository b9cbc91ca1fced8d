//! End-to-end broadcast tests through the public API.
//!
//! These drive the full stack — switchboard, registry, router, and one
//! coordinator per connection — over an in-memory transport, verifying
//! the wire-visible behavior: handshake text, fan-out with sender
//! exclusion, per-recipient ordering, and lifecycle cleanup.

use std::io;
use std::time::Duration;

use async_trait::async_trait;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;

use parley_chat::connection::{Connection, ConnectionReader, ConnectionWriter};
use parley_chat::coordinator::Coordinator;
use parley_chat::{ChatError, Switchboard, SwitchboardHandle};

struct ChannelReader {
    rx: mpsc::UnboundedReceiver<String>,
}

#[async_trait]
impl ConnectionReader for ChannelReader {
    async fn read_line(&mut self) -> io::Result<Option<String>> {
        Ok(self.rx.recv().await)
    }
}

struct ChannelWriter {
    tx: mpsc::UnboundedSender<String>,
}

#[async_trait]
impl ConnectionWriter for ChannelWriter {
    async fn write_line(&mut self, line: &str) -> io::Result<()> {
        self.tx
            .send(format!("{}\n", line))
            .map_err(|_| io::Error::from(io::ErrorKind::BrokenPipe))
    }

    async fn write_raw(&mut self, text: &str) -> io::Result<()> {
        self.tx
            .send(text.to_string())
            .map_err(|_| io::Error::from(io::ErrorKind::BrokenPipe))
    }
}

struct ChannelConnection {
    reader: ChannelReader,
    writer: ChannelWriter,
    label: String,
}

impl Connection for ChannelConnection {
    type Reader = ChannelReader;
    type Writer = ChannelWriter;

    fn peer_label(&self) -> String {
        self.label.clone()
    }

    fn split(self) -> (ChannelReader, ChannelWriter) {
        (self.reader, self.writer)
    }
}

/// One simulated client: a line sender, a line receiver, and the task
/// running its coordinator.
struct Client {
    input: mpsc::UnboundedSender<String>,
    output: mpsc::UnboundedReceiver<String>,
    task: JoinHandle<Result<(), ChatError>>,
}

impl Client {
    /// Connect and complete the handshake as `name`.
    async fn join(switchboard: &SwitchboardHandle, name: &str) -> Self {
        let mut client = Self::connect(switchboard, name);
        client.input.send(name.to_string()).unwrap();

        assert_eq!(client.next_line().await, "Welcome to the chat server!\n");
        assert_eq!(client.next_line().await, "What's your name > ");
        assert_eq!(client.next_line().await, format!("{} > ", name));
        client
    }

    fn connect(switchboard: &SwitchboardHandle, label: &str) -> Self {
        let (input_tx, input_rx) = mpsc::unbounded_channel();
        let (output_tx, output_rx) = mpsc::unbounded_channel();
        let conn = ChannelConnection {
            reader: ChannelReader { rx: input_rx },
            writer: ChannelWriter { tx: output_tx },
            label: label.to_string(),
        };
        let mut coordinator = Coordinator::new(switchboard.clone());
        let task = tokio::spawn(async move { coordinator.run(conn).await });
        Self {
            input: input_tx,
            output: output_rx,
            task,
        }
    }

    fn say(&self, line: &str) {
        self.input.send(line.to_string()).unwrap();
    }

    async fn next_line(&mut self) -> String {
        tokio::time::timeout(Duration::from_secs(2), self.output.recv())
            .await
            .expect("timed out waiting for a line")
            .expect("connection output closed")
    }

    /// Drop the input side (EOF) and wait for the coordinator to finish.
    async fn disconnect(self) -> Result<(), ChatError> {
        drop(self.input);
        self.task.await.expect("coordinator task panicked")
    }
}

async fn wait_for_count(switchboard: &SwitchboardHandle, expected: usize) {
    let deadline = tokio::time::Instant::now() + Duration::from_secs(2);
    loop {
        if switchboard.count().await.unwrap() == expected {
            return;
        }
        assert!(
            tokio::time::Instant::now() < deadline,
            "count never reached {}",
            expected
        );
        tokio::time::sleep(Duration::from_millis(5)).await;
    }
}

#[tokio::test]
async fn test_two_user_broadcast() {
    let switchboard = Switchboard::spawn_default();
    let alice = Client::join(&switchboard, "Alice").await;
    let mut bob = Client::join(&switchboard, "Bob").await;

    alice.say("hi");
    assert_eq!(bob.next_line().await, "Alice > hi\n");

    // Alice never hears her own message: her next output is the
    // channel closing on disconnect, not an echoed line.
    let mut alice = alice;
    drop(alice.input);
    assert!(alice.output.recv().await.is_none());
    alice.task.await.unwrap().unwrap();
    wait_for_count(&switchboard, 1).await;
}

#[tokio::test]
async fn test_three_user_fanout() {
    let switchboard = Switchboard::spawn_default();
    let alice = Client::join(&switchboard, "Alice").await;
    let mut bob = Client::join(&switchboard, "Bob").await;
    let mut cara = Client::join(&switchboard, "Cara").await;
    wait_for_count(&switchboard, 3).await;

    alice.say("hi");
    assert_eq!(bob.next_line().await, "Alice > hi\n");
    assert_eq!(cara.next_line().await, "Alice > hi\n");
}

#[tokio::test]
async fn test_per_recipient_ordering() {
    let switchboard = Switchboard::spawn_default();
    let alice = Client::join(&switchboard, "Alice").await;
    let mut bob = Client::join(&switchboard, "Bob").await;
    let mut cara = Client::join(&switchboard, "Cara").await;
    wait_for_count(&switchboard, 3).await;

    for i in 1..=5 {
        alice.say(&format!("m{}", i));
    }

    for recipient in [&mut bob, &mut cara] {
        for i in 1..=5 {
            assert_eq!(recipient.next_line().await, format!("Alice > m{}\n", i));
        }
    }
}

#[tokio::test]
async fn test_duplicate_name_is_turned_away() {
    let switchboard = Switchboard::spawn_default();
    let _max = Client::join(&switchboard, "Max").await;
    wait_for_count(&switchboard, 1).await;

    let mut imposter = Client::connect(&switchboard, "peer-2");
    imposter.input.send("Max".to_string()).unwrap();
    assert_eq!(imposter.next_line().await, "Welcome to the chat server!\n");
    assert_eq!(imposter.next_line().await, "What's your name > ");
    assert_eq!(
        imposter.next_line().await,
        "cannot join: user 'Max' is already registered\n"
    );

    imposter.task.await.unwrap().unwrap();
    assert_eq!(switchboard.count().await.unwrap(), 1);
}

#[tokio::test]
async fn test_disconnect_then_rejoin_with_same_name() {
    let switchboard = Switchboard::spawn_default();
    let alice = Client::join(&switchboard, "Alice").await;
    let mut bob = Client::join(&switchboard, "Bob").await;
    wait_for_count(&switchboard, 2).await;

    alice.disconnect().await.unwrap();
    wait_for_count(&switchboard, 1).await;

    // The identity is free again; messages flow to the new session.
    let alice2 = Client::join(&switchboard, "Alice").await;
    wait_for_count(&switchboard, 2).await;
    alice2.say("back");
    assert_eq!(bob.next_line().await, "Alice > back\n");
}

#[tokio::test]
async fn test_eof_before_name_registers_nothing() {
    let switchboard = Switchboard::spawn_default();
    let client = Client::connect(&switchboard, "peer-1");
    drop(client.input);
    client.task.await.unwrap().unwrap();
    assert_eq!(switchboard.count().await.unwrap(), 0);
}

#[tokio::test]
async fn test_messages_do_not_cross_sessions_after_leave() {
    let switchboard = Switchboard::spawn_default();
    let alice = Client::join(&switchboard, "Alice").await;
    let mut bob = Client::join(&switchboard, "Bob").await;
    let cara = Client::join(&switchboard, "Cara").await;
    wait_for_count(&switchboard, 3).await;

    cara.disconnect().await.unwrap();
    wait_for_count(&switchboard, 2).await;

    // Broadcast after Cara left still reaches Bob.
    alice.say("anyone there?");
    assert_eq!(bob.next_line().await, "Alice > anyone there?\n");
}
