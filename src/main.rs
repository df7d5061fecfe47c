use anyhow::Context;
use lockchat::{config::Config, db::MessageStore, logging, rooms::RoomHandle, sweeper, AppState};
use tracing::info;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenv::dotenv().ok();
    logging::init_tracing();

    let config = Config::from_env()?;

    let store = MessageStore::connect(&config.database_url)
        .await
        .with_context(|| format!("opening {}", config.database_url))?;

    let sweeper = sweeper::spawn(store.clone());
    let (room, _room_task) = RoomHandle::spawn(store.clone());

    let app = lockchat::app(AppState { room });

    let listener = tokio::net::TcpListener::bind(("0.0.0.0", config.port))
        .await
        .with_context(|| format!("binding port {}", config.port))?;
    info!(port = config.port, "server running");

    axum::serve(listener, app)
        .with_graceful_shutdown(async {
            let _ = tokio::signal::ctrl_c().await;
            info!("shutting down");
        })
        .await?;

    sweeper.abort();
    store.close().await;
    Ok(())
}
