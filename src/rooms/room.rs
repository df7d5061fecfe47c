use std::collections::HashMap;

use tokio::sync::mpsc;
use tracing::{debug, info, warn};

use crate::{db::{Message, MessageStore, NewMessage}, ChatError, ChatResult};

use super::{history, msg::{normalize_user_name, JoinRequest, ServerEvent}, registry::{ConnectionId, SessionRegistry}};

/// Per-connection outbound queue, drained by that connection's writer task.
pub type Outbox = mpsc::UnboundedSender<ServerEvent>;

/// The single chat room shared by both profiles.
///
/// Every method takes `&mut self`; the room is owned by one task
/// ([`super::actor`]) so publishes never interleave.
pub struct BroadcastRoom {
    store: MessageStore,
    sessions: SessionRegistry,
    outboxes: HashMap<ConnectionId, Outbox>,
}

impl BroadcastRoom {
    pub fn new(store: MessageStore) -> Self {
        Self {
            store,
            sessions: SessionRegistry::default(),
            outboxes: HashMap::new(),
        }
    }

    #[cfg(test)]
    pub(crate) fn sessions(&self) -> &SessionRegistry {
        &self.sessions
    }

    pub fn connect(&mut self, connection_id: ConnectionId, outbox: Outbox) {
        info!(%connection_id, "user connected");
        self.outboxes.insert(connection_id, outbox);
    }

    /// Registers the session and queues its history before anything published later.
    pub async fn join(&mut self, connection_id: ConnectionId, JoinRequest { profile, user_name }: JoinRequest) -> ChatResult<()> {
        let Some(outbox) = self.outboxes.get(&connection_id) else {
            return Err(ChatError::UnknownSession(connection_id));
        };

        let history = match history::resolve_history(&self.store, profile, user_name.as_deref()).await {
            Ok(history) => history,
            Err(err) => {
                warn!(%connection_id, error = %err, "failed to load history, replaying none");
                Vec::new()
            }
        };

        let _ = outbox.send(ServerEvent::HistoryLoaded(history));
        self.sessions.register(connection_id, profile, user_name);
        info!(%connection_id, %profile, "user joined");

        Ok(())
    }

    /// Persists the message, then queues it to every joined session.
    pub async fn publish(&mut self, NewMessage { profile, text, display_time, user_name }: NewMessage) -> ChatResult<Message> {
        if text.trim().is_empty() {
            return Err(ChatError::EmptyText);
        }

        let message = self.store.append(NewMessage {
            profile,
            text,
            display_time,
            user_name: normalize_user_name(user_name),
        }).await?;

        for connection_id in self.sessions.connection_ids() {
            let delivered = self.outboxes
                .get(&connection_id)
                .is_some_and(|outbox| outbox.send(ServerEvent::MessageReceived(message.clone())).is_ok());
            if !delivered {
                debug!(%connection_id, id = message.id, "dropped message for closed connection");
            }
        }

        info!(id = message.id, %profile, recipients = self.sessions.len(), "message sent");
        Ok(message)
    }

    /// A `send` from a connection. Failures go back to the sender as `send-failed`.
    pub async fn send(&mut self, connection_id: ConnectionId, msg: NewMessage) -> ChatResult<()> {
        if self.sessions.lookup(connection_id).is_none() {
            return Err(ChatError::UnknownSession(connection_id));
        }

        if let Err(err) = self.publish(msg).await {
            warn!(%connection_id, error = %err, "send failed");
            if let Some(outbox) = self.outboxes.get(&connection_id) {
                let _ = outbox.send(ServerEvent::SendFailed { reason: err.to_string() });
            }
        }

        Ok(())
    }

    pub fn disconnect(&mut self, connection_id: ConnectionId) {
        self.sessions.unregister(connection_id);
        if self.outboxes.remove(&connection_id).is_some() {
            info!(%connection_id, "user disconnected");
        }
    }
}
