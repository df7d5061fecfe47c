use axum::{debug_handler, extract::{ws::{Message as WsMessage, WebSocket}, State, WebSocketUpgrade}, response::IntoResponse};
use futures_util::{SinkExt, StreamExt};
use tracing::{debug, warn};

use super::{msg::ClientEvent, RoomHandle};

#[debug_handler(state = crate::AppState)]
pub async fn room_ws(
    State(room): State<RoomHandle>,

    ws: WebSocketUpgrade,
) -> impl IntoResponse {
    ws.on_upgrade(move |stream| handle_socket(room, stream))
}

async fn handle_socket(room: RoomHandle, stream: WebSocket) {
    let Ok((connection_id, mut outbox)) = room.connect() else {
        warn!("room is closed, dropping connection");
        return;
    };
    let (mut sender, mut receiver) = stream.split();

    let mut broadcast_task = tokio::spawn(async move {
        while let Some(event) = outbox.recv().await {
            let text = match serde_json::to_string(&event) {
                Ok(text) => text,
                Err(err) => {
                    warn!(%connection_id, error = %err, "failed to encode event");
                    continue;
                }
            };
            if sender.send(WsMessage::Text(text.into())).await.is_err() {
                break;
            }
        }
    });

    loop {
        tokio::select! {
            frame = receiver.next() => {
                let Some(Ok(frame)) = frame else {
                    break;
                };

                let event = match frame {
                    WsMessage::Text(text) => serde_json::from_str::<ClientEvent>(text.as_str()),
                    WsMessage::Close(_) => break,
                    _ => continue,
                };

                let result = match event {
                    Ok(ClientEvent::Join(req)) => room.join(connection_id, req),
                    Ok(ClientEvent::Send(msg)) => room.send(connection_id, msg),
                    Err(err) => {
                        debug!(%connection_id, error = %err, "ignoring malformed frame");
                        continue;
                    }
                };
                if result.is_err() {
                    break;
                }
            }
            _ = &mut broadcast_task => break,
        }
    }

    let _ = room.disconnect(connection_id);
    broadcast_task.abort();
}
