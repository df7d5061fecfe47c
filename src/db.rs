use std::{fmt, str::FromStr, sync::{atomic::{AtomicI64, Ordering}, Arc}};

use serde::{Deserialize, Serialize};
use sqlx::{sqlite::{SqliteConnectOptions, SqliteJournalMode, SqlitePoolOptions, SqliteSynchronous}, SqlitePool};

use crate::{ChatError, ChatResult};

const SCHEMA: &str = r#"
CREATE TABLE IF NOT EXISTS messages (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    profile TEXT NOT NULL,
    text TEXT NOT NULL,
    displayTime TEXT NOT NULL,
    timestamp INTEGER NOT NULL,
    userName TEXT
);
CREATE INDEX IF NOT EXISTS idx_messages_timestamp ON messages (timestamp);
CREATE INDEX IF NOT EXISTS idx_messages_user_name ON messages (userName);
"#;

const SELECT_MESSAGE: &str = "SELECT id,profile,text,displayTime,timestamp,userName FROM messages";

type MessageRow = (i64, String, String, String, i64, Option<String>);

/// One of the two fixed chat surfaces.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Profile {
    Profile1,
    Profile2,
}

impl Profile {
    pub fn as_str(&self) -> &'static str {
        match self {
            Profile::Profile1 => "profile1",
            Profile::Profile2 => "profile2",
        }
    }
}

impl fmt::Display for Profile {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Profile {
    type Err = ChatError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "profile1" => Ok(Profile::Profile1),
            "profile2" => Ok(Profile::Profile2),
            other => Err(ChatError::UnknownProfile(other.to_owned())),
        }
    }
}

/// A stored chat message. `id` and `timestamp` are assigned by the store.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Message {
    pub id: i64,
    pub profile: Profile,
    pub text: String,
    pub display_time: String,
    pub user_name: Option<String>,
    pub timestamp: i64,
}

impl TryFrom<MessageRow> for Message {
    type Error = ChatError;

    fn try_from((id, profile, text, display_time, timestamp, user_name): MessageRow) -> ChatResult<Self> {
        Ok(Message {
            id,
            profile: profile.parse()?,
            text,
            display_time,
            user_name,
            timestamp,
        })
    }
}

/// The client-supplied part of a message, as carried by a `send` event.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewMessage {
    pub profile: Profile,
    #[serde(alias = "message")]
    pub text: String,
    #[serde(alias = "time")]
    pub display_time: String,
    #[serde(default)]
    pub user_name: Option<String>,
}

pub fn now_millis() -> i64 {
    (time::OffsetDateTime::now_utc().unix_timestamp_nanos() / 1_000_000) as i64
}

/// Append-only message log backed by SQLite.
///
/// Cloning is cheap; clones share the pool and the timestamp clock.
#[derive(Debug, Clone)]
pub struct MessageStore {
    pool: SqlitePool,
    last_timestamp: Arc<AtomicI64>,
}

impl MessageStore {
    /// Opens (creating if missing) the database at `url` and ensures the schema.
    pub async fn connect(url: &str) -> ChatResult<Self> {
        let options = SqliteConnectOptions::from_str(url)?
            .create_if_missing(true)
            .journal_mode(SqliteJournalMode::Wal)
            .synchronous(SqliteSynchronous::Full);

        let pool = SqlitePoolOptions::new()
            .max_connections(16)
            .connect_with(options)
            .await?;

        Self::with_pool(pool).await
    }

    /// A private in-memory database, used by tests.
    pub async fn in_memory() -> ChatResult<Self> {
        let options = SqliteConnectOptions::from_str("sqlite::memory:")?;

        // every connection to :memory: is its own database, so pin exactly one
        let pool = SqlitePoolOptions::new()
            .max_connections(1)
            .min_connections(1)
            .idle_timeout(None)
            .max_lifetime(None)
            .connect_with(options)
            .await?;

        Self::with_pool(pool).await
    }

    async fn with_pool(pool: SqlitePool) -> ChatResult<Self> {
        sqlx::raw_sql(SCHEMA).execute(&pool).await?;

        let (last,): (Option<i64>,) = sqlx::query_as("SELECT MAX(timestamp) FROM messages")
            .fetch_one(&pool)
            .await?;

        // a row stamped ahead of the wall clock must not drag new stamps into the future
        let seed = last.unwrap_or(0).min(now_millis());

        Ok(Self {
            pool,
            last_timestamp: Arc::new(AtomicI64::new(seed)),
        })
    }

    /// Stores `msg` stamped with the current time. Returns only once the row is committed.
    pub async fn append(&self, msg: NewMessage) -> ChatResult<Message> {
        let now = now_millis();
        let previous = self.last_timestamp.fetch_max(now, Ordering::SeqCst);
        self.append_at(msg, now.max(previous)).await
    }

    /// Stores `msg` with a caller-chosen timestamp, bypassing the clock.
    pub(crate) async fn append_at(&self, NewMessage { profile, text, display_time, user_name }: NewMessage, timestamp: i64) -> ChatResult<Message> {
        let id = sqlx::query("INSERT INTO messages (profile,text,displayTime,timestamp,userName) VALUES (?,?,?,?,?)")
            .bind(profile.as_str())
            .bind(&text)
            .bind(&display_time)
            .bind(timestamp)
            .bind(user_name.as_deref())
            .execute(&self.pool)
            .await?
            .last_insert_rowid();

        Ok(Message {
            id,
            profile,
            text,
            display_time,
            user_name,
            timestamp,
        })
    }

    pub async fn list_all(&self) -> ChatResult<Vec<Message>> {
        let rows: Vec<MessageRow> = sqlx::query_as(&format!("{SELECT_MESSAGE} ORDER BY timestamp,id"))
            .fetch_all(&self.pool)
            .await?;

        rows.into_iter().map(Message::try_from).collect()
    }

    pub async fn list_by_user(&self, user_name: &str) -> ChatResult<Vec<Message>> {
        let rows: Vec<MessageRow> = sqlx::query_as(&format!("{SELECT_MESSAGE} WHERE userName=? ORDER BY timestamp,id"))
            .bind(user_name)
            .fetch_all(&self.pool)
            .await?;

        rows.into_iter().map(Message::try_from).collect()
    }

    /// Deletes every message with `timestamp < horizon` and returns how many went.
    pub async fn purge_older_than(&self, horizon: i64) -> ChatResult<u64> {
        Ok(
            sqlx::query("DELETE FROM messages WHERE timestamp<?")
                .bind(horizon)
                .execute(&self.pool)
                .await?
                .rows_affected()
        )
    }

    pub async fn close(&self) {
        self.pool.close().await;
    }
}
