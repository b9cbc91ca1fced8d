//! The switchboard: a single task owning the registry and serializing
//! every register, unregister, and broadcast.
//!
//! Commands arrive over one bounded queue and are processed strictly
//! in order by the task that owns the [`Registry`]. That ownership is
//! the whole concurrency story: no lock protects the membership map
//! because only this task ever touches it, and fan-out ordering per
//! recipient falls out of sequential command processing.

use tokio::sync::{mpsc, oneshot};
use tracing::debug;

use crate::error::ChatError;
use crate::message::{Message, Username};
use crate::registry::Registry;
use crate::router::Router;
use crate::sink::OutboundSink;

/// Default depth of the command queue.
pub const DEFAULT_COMMAND_CAPACITY: usize = 256;

enum Command {
    Register {
        user: Username,
        sink: OutboundSink,
        reply: oneshot::Sender<Result<(), ChatError>>,
    },
    Unregister {
        user: Username,
        reply: oneshot::Sender<Result<(), ChatError>>,
    },
    Route {
        sender: Username,
        message: Message,
    },
    Count {
        reply: oneshot::Sender<usize>,
    },
}

/// The switchboard task state. Constructed and spawned via
/// [`Switchboard::spawn`]; never shared.
pub struct Switchboard {
    registry: Registry,
    router: Router,
    commands: mpsc::Receiver<Command>,
}

/// Cloneable handle to the switchboard task. Dropping every handle
/// stops the task.
#[derive(Debug, Clone)]
pub struct SwitchboardHandle {
    tx: mpsc::Sender<Command>,
}

impl Switchboard {
    /// Spawn the switchboard task with the given command queue depth.
    pub fn spawn(command_capacity: usize) -> SwitchboardHandle {
        let (tx, commands) = mpsc::channel(command_capacity);
        let switchboard = Switchboard {
            registry: Registry::new(),
            router: Router::new(),
            commands,
        };
        tokio::spawn(switchboard.run());
        SwitchboardHandle { tx }
    }

    pub fn spawn_default() -> SwitchboardHandle {
        Self::spawn(DEFAULT_COMMAND_CAPACITY)
    }

    async fn run(mut self) {
        while let Some(command) = self.commands.recv().await {
            match command {
                Command::Register { user, sink, reply } => {
                    let _ = reply.send(self.registry.register(user, sink));
                }
                Command::Unregister { user, reply } => {
                    let _ = reply.send(self.registry.unregister(&user));
                }
                Command::Route { sender, message } => {
                    let snapshot = self.registry.snapshot();
                    self.router.route(&snapshot, &sender, &message).await;
                }
                Command::Count { reply } => {
                    let _ = reply.send(self.registry.count());
                }
            }
        }
        debug!("switchboard task stopped");
    }
}

impl SwitchboardHandle {
    /// Register a user with its delivery sink.
    pub async fn register(&self, user: Username, sink: OutboundSink) -> Result<(), ChatError> {
        let (reply, response) = oneshot::channel();
        self.tx
            .send(Command::Register { user, sink, reply })
            .await
            .map_err(|_| ChatError::SwitchboardClosed)?;
        response.await.map_err(|_| ChatError::SwitchboardClosed)?
    }

    /// Remove a user, closing its sink exactly once.
    pub async fn unregister(&self, user: Username) -> Result<(), ChatError> {
        let (reply, response) = oneshot::channel();
        self.tx
            .send(Command::Unregister { user, reply })
            .await
            .map_err(|_| ChatError::SwitchboardClosed)?;
        response.await.map_err(|_| ChatError::SwitchboardClosed)?
    }

    /// Enqueue a broadcast. Completion means the command was accepted;
    /// the fan-out itself happens on the switchboard task, in command
    /// order relative to every other route call.
    pub async fn route(&self, sender: Username, message: Message) -> Result<(), ChatError> {
        self.tx
            .send(Command::Route { sender, message })
            .await
            .map_err(|_| ChatError::SwitchboardClosed)
    }

    /// Number of active registrations.
    pub async fn count(&self) -> Result<usize, ChatError> {
        let (reply, response) = oneshot::channel();
        self.tx
            .send(Command::Count { reply })
            .await
            .map_err(|_| ChatError::SwitchboardClosed)?;
        response.await.map_err(|_| ChatError::SwitchboardClosed)
    }
}
