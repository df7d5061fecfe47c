use std::collections::HashMap;

use uuid::Uuid;

use crate::db::Profile;

pub type ConnectionId = Uuid;

/// Identity a connection declared when it joined.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Session {
    pub connection_id: ConnectionId,
    pub profile: Profile,
    pub user_name: Option<String>,
}

/// Joined sessions keyed by connection. Lives inside the room actor, so no locking.
#[derive(Debug, Default)]
pub struct SessionRegistry {
    sessions: HashMap<ConnectionId, Session>,
}

impl SessionRegistry {
    /// Re-registering a connection replaces its identity.
    pub fn register(&mut self, connection_id: ConnectionId, profile: Profile, user_name: Option<String>) {
        self.sessions.insert(connection_id, Session { connection_id, profile, user_name });
    }

    pub fn lookup(&self, connection_id: ConnectionId) -> Option<&Session> {
        self.sessions.get(&connection_id)
    }

    pub fn unregister(&mut self, connection_id: ConnectionId) -> Option<Session> {
        self.sessions.remove(&connection_id)
    }

    pub fn connection_ids(&self) -> impl Iterator<Item = ConnectionId> + '_ {
        self.sessions.keys().copied()
    }

    pub fn len(&self) -> usize {
        self.sessions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.sessions.is_empty()
    }
}
