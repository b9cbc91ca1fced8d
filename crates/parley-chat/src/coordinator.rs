//! Per-connection lifecycle: handshake, registration, message
//! ingestion, and teardown.
//!
//! One coordinator drives one connection through
//! `Connecting → Handshaking → Active → Closing → Closed`. In the
//! active state two loops run concurrently: the read loop (on the
//! coordinator's own task) turns each incoming line into a routed
//! message, while a spawned write loop drains the connection's sink
//! back to the transport in FIFO order. Teardown unregisters the user
//! exactly once and joins the write loop, so no task outlives the
//! connection.

use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

use crate::connection::{Connection, ConnectionReader, ConnectionWriter};
use crate::error::ChatError;
use crate::message::{Message, Username};
use crate::sink::{OutboundSink, SinkReceiver, DEFAULT_SINK_CAPACITY};
use crate::switchboard::SwitchboardHandle;

/// Greeting written on connect.
pub const WELCOME_LINE: &str = "Welcome to the chat server!";

/// Prompt for the display name; no trailing newline.
pub const NAME_PROMPT: &str = "What's your name > ";

/// Lifecycle states of one connection.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConnectionState {
    Connecting,
    Handshaking,
    Active,
    Closing,
    Closed,
}

pub struct Coordinator {
    switchboard: SwitchboardHandle,
    sink_capacity: usize,
    state: ConnectionState,
}

impl Coordinator {
    pub fn new(switchboard: SwitchboardHandle) -> Self {
        Self::with_sink_capacity(switchboard, DEFAULT_SINK_CAPACITY)
    }

    pub fn with_sink_capacity(switchboard: SwitchboardHandle, sink_capacity: usize) -> Self {
        Self {
            switchboard,
            sink_capacity,
            state: ConnectionState::Connecting,
        }
    }

    pub fn state(&self) -> ConnectionState {
        self.state
    }

    /// Drive the connection to completion.
    ///
    /// Returns once both loops have terminated and the user, if it was
    /// registered, has been unregistered. A transport error on the
    /// read side is surfaced to the caller after teardown; it is never
    /// fatal beyond this connection.
    pub async fn run<C: Connection>(&mut self, conn: C) -> Result<(), ChatError> {
        let peer = conn.peer_label();
        let (mut reader, mut writer) = conn.split();

        self.state = ConnectionState::Handshaking;
        let (user, sink, receiver) = match self.handshake(&mut reader, &mut writer, &peer).await {
            Ok(Some(admitted)) => admitted,
            Ok(None) => {
                self.state = ConnectionState::Closed;
                return Ok(());
            }
            Err(e) => {
                self.state = ConnectionState::Closed;
                return Err(e);
            }
        };

        self.state = ConnectionState::Active;
        info!(user = %user, peer = %peer, "user joined");

        let prompt = writer.write_raw(&format!("{} > ", user)).await;
        let mut write_task = spawn_write_loop(writer, receiver, user.clone());
        let mut write_done = false;

        let read_result = if let Err(e) = prompt {
            Err(e)
        } else {
            self.read_loop(&mut reader, &user, &mut write_task, &mut write_done)
                .await
        };

        self.state = ConnectionState::Closing;

        // Close the sink before awaiting the unregister reply: the
        // switchboard may be blocked mid-route on this connection's
        // full queue, and only a released send lets it reach the
        // unregister command. This is the only teardown path for a
        // registered user, so the unregister runs exactly once.
        sink.close();
        match self.switchboard.unregister(user.clone()).await {
            Ok(()) => {}
            Err(e) => warn!(user = %user, error = %e, "unregister during teardown failed"),
        }

        if !write_done {
            let _ = write_task.await;
        }

        self.state = ConnectionState::Closed;
        info!(user = %user, peer = %peer, "user left");

        read_result.map_err(ChatError::from)
    }

    /// Greet the peer and read its display name.
    ///
    /// Returns `None` when the connection should close without an
    /// active phase: EOF before a name arrived, or a rejected
    /// registration (duplicate or empty name), which is reported to
    /// the client first.
    async fn handshake<R, W>(
        &self,
        reader: &mut R,
        writer: &mut W,
        peer: &str,
    ) -> Result<Option<(Username, OutboundSink, SinkReceiver)>, ChatError>
    where
        R: ConnectionReader,
        W: ConnectionWriter,
    {
        writer.write_line(WELCOME_LINE).await?;
        writer.write_raw(NAME_PROMPT).await?;

        let name = match reader.read_line().await? {
            Some(line) => line.trim().to_string(),
            None => {
                debug!(peer = %peer, "connection closed during handshake");
                return Ok(None);
            }
        };

        let user = Username::new(name);
        let (sink, receiver) = OutboundSink::channel(self.sink_capacity);
        match self.switchboard.register(user.clone(), sink.clone()).await {
            Ok(()) => Ok(Some((user, sink, receiver))),
            Err(e) if e.is_rejection() => {
                warn!(peer = %peer, error = %e, "handshake rejected");
                writer.write_line(&format!("cannot join: {}", e)).await?;
                Ok(None)
            }
            Err(e) => Err(e),
        }
    }

    /// Turn each incoming line into a routed message until EOF, a read
    /// error, or the write loop terminating on its own (sink closed or
    /// transport write failure).
    async fn read_loop<R>(
        &self,
        reader: &mut R,
        user: &Username,
        write_task: &mut JoinHandle<()>,
        write_done: &mut bool,
    ) -> Result<(), std::io::Error>
    where
        R: ConnectionReader,
    {
        loop {
            tokio::select! {
                read = reader.read_line() => match read {
                    Ok(Some(line)) => {
                        let message = Message::now(user.clone(), line);
                        if let Err(e) = self.switchboard.route(user.clone(), message).await {
                            warn!(user = %user, error = %e, "routing stopped");
                            return Ok(());
                        }
                    }
                    Ok(None) => {
                        debug!(user = %user, "peer closed the connection");
                        return Ok(());
                    }
                    Err(e) => return Err(e),
                },
                _ = &mut *write_task, if !*write_done => {
                    *write_done = true;
                    debug!(user = %user, "write loop ended, closing connection");
                    return Ok(());
                }
            }
        }
    }
}

/// Drain the sink to the transport in FIFO order until the sink closes
/// or a write fails. A failed write is a delivery failure for this
/// recipient only: it is logged, the sink is closed so further router
/// pushes become no-ops, and the loop ends.
fn spawn_write_loop<W>(mut writer: W, mut receiver: SinkReceiver, user: Username) -> JoinHandle<()>
where
    W: ConnectionWriter + 'static,
{
    tokio::spawn(async move {
        while let Some(message) = receiver.recv().await {
            if let Err(e) = writer.write_line(&message.render()).await {
                warn!(recipient = %user, error = %e, "delivery failed, stopping write loop");
                receiver.close();
                break;
            }
        }
    })
}
