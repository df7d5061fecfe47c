use crate::{db::{Message, MessageStore, Profile}, ChatResult};

/// History replayed to a session on join: its own messages when it has a
/// user name, everything otherwise. `profile` does not narrow the result;
/// the room is shared by both profiles.
pub async fn resolve_history(
    store: &MessageStore,
    profile: Profile,
    user_name: Option<&str>,
) -> ChatResult<Vec<Message>> {
    tracing::debug!(%profile, ?user_name, "resolving history");

    match user_name {
        Some(user_name) => store.list_by_user(user_name).await,
        None => store.list_all().await,
    }
}
