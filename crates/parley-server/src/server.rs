//! TCP listener and transport plumbing.
//!
//! Accepts connections, wraps each socket in a [`TcpConnection`], and
//! hands it to a per-connection [`Coordinator`]. Accept errors are
//! logged and the loop keeps going; no single connection's failure
//! stops the server.

use std::io;
use std::net::SocketAddr;

use anyhow::{Context, Result};
use async_trait::async_trait;
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};
use tokio::net::tcp::{OwnedReadHalf, OwnedWriteHalf};
use tokio::net::{TcpListener, TcpStream};
use tracing::{debug, error, info, warn};

use parley_chat::connection::{Connection, ConnectionReader, ConnectionWriter};
use parley_chat::coordinator::Coordinator;
use parley_chat::{Switchboard, SwitchboardHandle};

use crate::config::ServerConfig;

/// Bind the listener and serve until the process is terminated.
pub async fn start(config: ServerConfig) -> Result<()> {
    let listener = TcpListener::bind(config.listen_addr)
        .await
        .with_context(|| format!("failed to bind {}", config.listen_addr))?;
    info!(addr = %config.listen_addr, "Listening for chat connections");

    let switchboard = Switchboard::spawn_default();
    serve(listener, switchboard, config.sink_capacity).await
}

/// Accept loop, separated from [`start`] so tests can drive it against
/// an ephemeral-port listener.
async fn serve(
    listener: TcpListener,
    switchboard: SwitchboardHandle,
    sink_capacity: usize,
) -> Result<()> {
    loop {
        let (stream, peer) = match listener.accept().await {
            Ok(accepted) => accepted,
            Err(e) => {
                error!(error = %e, "Failed to accept connection");
                continue;
            }
        };
        info!(peer = %peer, "Accepted connection");

        let switchboard = switchboard.clone();
        tokio::spawn(async move {
            let mut coordinator = Coordinator::with_sink_capacity(switchboard.clone(), sink_capacity);
            if let Err(e) = coordinator.run(TcpConnection::new(stream, peer)).await {
                warn!(peer = %peer, error = %e, "Connection ended with error");
            }
            if let Ok(active) = switchboard.count().await {
                debug!(active, "Active registrations");
            }
        });
    }
}

/// A newline-delimited text connection over TCP.
pub struct TcpConnection {
    stream: TcpStream,
    peer: SocketAddr,
}

impl TcpConnection {
    pub fn new(stream: TcpStream, peer: SocketAddr) -> Self {
        Self { stream, peer }
    }
}

impl Connection for TcpConnection {
    type Reader = TcpConnectionReader;
    type Writer = TcpConnectionWriter;

    fn peer_label(&self) -> String {
        self.peer.to_string()
    }

    fn split(self) -> (TcpConnectionReader, TcpConnectionWriter) {
        let (read_half, write_half) = self.stream.into_split();
        (
            TcpConnectionReader {
                reader: BufReader::new(read_half),
            },
            TcpConnectionWriter { writer: write_half },
        )
    }
}

pub struct TcpConnectionReader {
    reader: BufReader<OwnedReadHalf>,
}

#[async_trait]
impl ConnectionReader for TcpConnectionReader {
    async fn read_line(&mut self) -> io::Result<Option<String>> {
        let mut line = String::new();
        let n = self.reader.read_line(&mut line).await?;
        if n == 0 {
            return Ok(None);
        }
        while line.ends_with('\n') || line.ends_with('\r') {
            line.pop();
        }
        Ok(Some(line))
    }
}

pub struct TcpConnectionWriter {
    writer: OwnedWriteHalf,
}

#[async_trait]
impl ConnectionWriter for TcpConnectionWriter {
    async fn write_line(&mut self, line: &str) -> io::Result<()> {
        self.writer.write_all(line.as_bytes()).await?;
        self.writer.write_all(b"\n").await?;
        self.writer.flush().await
    }

    async fn write_raw(&mut self, text: &str) -> io::Result<()> {
        self.writer.write_all(text.as_bytes()).await?;
        self.writer.flush().await
    }
}
