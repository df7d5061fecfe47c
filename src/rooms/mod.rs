mod actor;
pub mod history;
pub mod msg;
pub mod registry;
pub mod room;
mod ws;

use axum::{routing::get, Router};

use crate::AppState;

pub use actor::RoomHandle;

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/ws", get(ws::room_ws))
}
