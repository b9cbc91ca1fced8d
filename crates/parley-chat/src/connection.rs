//! The transport capability supplied to the core.
//!
//! The core never touches sockets directly: it is handed something
//! that can read lines, write lines, and name its peer. The server
//! binary implements these traits over TCP; tests implement them over
//! in-memory channels.

use std::io;

use async_trait::async_trait;

/// Reading half of a connection. `read_line` strips the trailing
/// newline and yields `None` on a clean EOF.
#[async_trait]
pub trait ConnectionReader: Send {
    async fn read_line(&mut self) -> io::Result<Option<String>>;
}

/// Writing half of a connection.
#[async_trait]
pub trait ConnectionWriter: Send {
    /// Write `line` followed by a newline delimiter.
    async fn write_line(&mut self, line: &str) -> io::Result<()>;

    /// Write text verbatim; prompts carry no trailing newline.
    async fn write_raw(&mut self, text: &str) -> io::Result<()>;
}

/// A full-duplex connection that can be split into independent halves,
/// one per lifecycle loop. Dropping a half closes it.
pub trait Connection: Send {
    type Reader: ConnectionReader + Send + 'static;
    type Writer: ConnectionWriter + Send + 'static;

    /// Remote identity for logs (e.g. the peer socket address).
    fn peer_label(&self) -> String;

    fn split(self) -> (Self::Reader, Self::Writer);
}
