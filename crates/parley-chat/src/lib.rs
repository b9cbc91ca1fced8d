//! # parley-chat
//!
//! The core of the Parley chat server: a connection registry plus a
//! message router, with a per-connection coordinator driving handshake,
//! message ingestion, and teardown.
//!
//! ## Architecture
//!
//! All membership state lives behind a single [`Switchboard`] task that
//! owns the [`registry::Registry`] and processes register/unregister/
//! route commands sequentially from one queue. Sequential processing is
//! what guarantees that every recipient observes messages in the order
//! the router was invoked, without any locking.
//!
//! Each connection runs two tasks: a read loop (inside
//! [`coordinator::Coordinator::run`]) that turns incoming lines into
//! routed messages, and a spawned write loop that drains the
//! connection's bounded [`OutboundSink`] back to the transport. Closing
//! the sink is the sole stop signal for the write loop.
//!
//! The transport itself is abstracted behind the [`connection`] traits;
//! the server binary supplies a TCP implementation, tests supply an
//! in-memory one.

pub mod connection;
pub mod coordinator;
pub mod error;
pub mod message;
pub mod registry;
pub mod router;
pub mod sink;
pub mod switchboard;

pub use error::ChatError;
pub use message::{Message, Username};
pub use sink::{Delivery, OutboundSink, SinkReceiver, DEFAULT_SINK_CAPACITY};
pub use switchboard::{Switchboard, SwitchboardHandle};
