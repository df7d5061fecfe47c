use std::time::Duration;

use tokio::{task::JoinHandle, time::{self, MissedTickBehavior}};
use tracing::{error, info};

use crate::{db::{now_millis, MessageStore}, ChatResult};

/// Messages older than this are purged.
pub const RETENTION: Duration = Duration::from_secs(7 * 24 * 60 * 60);
pub const SWEEP_PERIOD: Duration = Duration::from_secs(24 * 60 * 60);

pub async fn sweep_once(store: &MessageStore, now: i64) -> ChatResult<u64> {
    store.purge_older_than(now - RETENTION.as_millis() as i64).await
}

/// Sweeps immediately, then every [`SWEEP_PERIOD`]. A failed sweep is logged
/// and the next tick tries again.
pub fn spawn(store: MessageStore) -> JoinHandle<()> {
    tokio::spawn(async move {
        let mut ticker = time::interval(SWEEP_PERIOD);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

        loop {
            ticker.tick().await;
            match sweep_once(&store, now_millis()).await {
                Ok(purged) => info!(purged, "retention sweep finished"),
                Err(err) => error!(error = %err, "retention sweep failed"),
            }
        }
    })
}

#[cfg(test)]
mod tests {
    use crate::db::{NewMessage, Profile};

    use super::*;

    const DAY: i64 = 24 * 60 * 60 * 1000;

    fn note(text: &str) -> NewMessage {
        NewMessage {
            profile: Profile::Profile1,
            text: text.to_owned(),
            display_time: "6:30 AM".to_owned(),
            user_name: None,
        }
    }

    #[tokio::test]
    async fn sweep_drops_week_old_messages() {
        let store = MessageStore::in_memory().await.unwrap();
        let now = now_millis();

        store.append_at(note("stale"), now - 8 * DAY).await.unwrap();
        let fresh = store.append_at(note("fresh"), now - DAY).await.unwrap();

        assert_eq!(sweep_once(&store, now).await.unwrap(), 1);
        assert_eq!(store.list_all().await.unwrap(), vec![fresh]);
        assert_eq!(sweep_once(&store, now).await.unwrap(), 0);
    }

    #[tokio::test]
    async fn sweep_failure_does_not_panic() {
        let store = MessageStore::in_memory().await.unwrap();
        store.close().await;

        assert!(sweep_once(&store, now_millis()).await.is_err());
    }

    #[tokio::test]
    async fn spawned_sweeper_runs_at_start() {
        let store = MessageStore::in_memory().await.unwrap();
        store.append_at(note("ancient"), 0).await.unwrap();

        let task = spawn(store.clone());
        for _ in 0..200 {
            if store.list_all().await.unwrap().is_empty() {
                break;
            }
            time::sleep(Duration::from_millis(10)).await;
        }
        task.abort();

        assert!(store.list_all().await.unwrap().is_empty());
    }
}
