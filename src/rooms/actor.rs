use tokio::{sync::mpsc, task::JoinHandle};
use tracing::debug;
use uuid::Uuid;

use crate::{db::{MessageStore, NewMessage}, ChatError, ChatResult};

use super::{msg::{JoinRequest, ServerEvent}, registry::ConnectionId, room::{BroadcastRoom, Outbox}};

enum Command {
    Connect(ConnectionId, Outbox),
    Join(ConnectionId, JoinRequest),
    Send(ConnectionId, NewMessage),
    Disconnect(ConnectionId),
}

/// Cloneable handle to the room task. Every connection event goes through one
/// queue and is handled to completion before the next, so the room has a
/// single writer and one total message order.
#[derive(Clone)]
pub struct RoomHandle {
    tx: mpsc::UnboundedSender<Command>,
}

impl RoomHandle {
    pub fn spawn(store: MessageStore) -> (Self, JoinHandle<()>) {
        let (tx, rx) = mpsc::unbounded_channel();
        let task = tokio::spawn(run(BroadcastRoom::new(store), rx));
        (Self { tx }, task)
    }

    /// Opens a connection. The receiver yields every event addressed to it.
    pub fn connect(&self) -> ChatResult<(ConnectionId, mpsc::UnboundedReceiver<ServerEvent>)> {
        let connection_id = Uuid::now_v7();
        let (outbox, inbox) = mpsc::unbounded_channel();
        self.command(Command::Connect(connection_id, outbox))?;
        Ok((connection_id, inbox))
    }

    pub fn join(&self, connection_id: ConnectionId, req: JoinRequest) -> ChatResult<()> {
        self.command(Command::Join(connection_id, req))
    }

    pub fn send(&self, connection_id: ConnectionId, msg: NewMessage) -> ChatResult<()> {
        self.command(Command::Send(connection_id, msg))
    }

    pub fn disconnect(&self, connection_id: ConnectionId) -> ChatResult<()> {
        self.command(Command::Disconnect(connection_id))
    }

    fn command(&self, command: Command) -> ChatResult<()> {
        self.tx.send(command).map_err(|_| ChatError::RoomClosed)
    }
}

async fn run(mut room: BroadcastRoom, mut rx: mpsc::UnboundedReceiver<Command>) {
    while let Some(command) = rx.recv().await {
        let result = match command {
            Command::Connect(connection_id, outbox) => {
                room.connect(connection_id, outbox);
                Ok(())
            }
            Command::Join(connection_id, req) => room.join(connection_id, req).await,
            Command::Send(connection_id, msg) => room.send(connection_id, msg).await,
            Command::Disconnect(connection_id) => {
                room.disconnect(connection_id);
                Ok(())
            }
        };

        if let Err(err) = result {
            debug!(error = %err, "ignored room event");
        }
    }

    debug!("room closed");
}
