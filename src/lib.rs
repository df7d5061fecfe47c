pub mod config;
pub mod db;
pub mod logging;
pub mod rooms;
pub mod sweeper;

use axum::{extract::FromRef, Router};
use tower_http::{cors::CorsLayer, trace::TraceLayer};
use uuid::Uuid;

use rooms::RoomHandle;

#[derive(Clone, FromRef)]
pub struct AppState {
    pub room: RoomHandle,
}

pub fn app(app_state: AppState) -> Router {
    Router::new()
        .merge(rooms::router())
        .with_state(app_state)
        .layer(CorsLayer::permissive())
        .layer(TraceLayer::new_for_http())
}

pub type ChatResult<T> = Result<T, ChatError>;

#[derive(Debug, thiserror::Error)]
pub enum ChatError {
    #[error("message text is empty")]
    EmptyText,

    #[error("storage: {0}")]
    Storage(#[from] sqlx::Error),

    #[error("unknown profile {0:?}")]
    UnknownProfile(String),

    #[error("no session for connection {0}")]
    UnknownSession(Uuid),

    #[error("room is closed")]
    RoomClosed,
}
