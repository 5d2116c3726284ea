use axum::{
    extract::{
        State, WebSocketUpgrade,
        ws::{Message, WebSocket},
    },
    response::Response,
};
use chrono::Utc;
use futures::{SinkExt, StreamExt};

use crate::{broadcast::Broadcaster, state::AppState};

/// Upgrades the request to a realtime event stream.
#[axum::debug_handler]
pub async fn ws_handler(ws: WebSocketUpgrade, State(state): State<AppState>) -> Response {
    ws.on_upgrade(move |socket| handle_socket(socket, state.broadcaster))
}

/// Forwards broadcast frames to one client until it goes away.
///
/// Inbound frames are ignored; the channel is server-to-client only.
async fn handle_socket(socket: WebSocket, broadcaster: Broadcaster) {
    let (client_id, mut frames) = broadcaster.subscribe().await;
    tracing::info!("🔌 Client connected via WebSocket: {}", client_id);

    let (mut ws_tx, mut ws_rx) = socket.split();

    let send_task = tokio::spawn(async move {
        while let Some(frame) = frames.recv().await {
            if ws_tx.send(Message::Text(frame.into())).await.is_err() {
                tracing::debug!("WebSocket send failed, client disconnected");
                break;
            }
        }
    });

    while let Some(result) = ws_rx.next().await {
        match result {
            Ok(Message::Close(_)) => break,
            Ok(_) => continue,
            Err(e) => {
                tracing::warn!(client_id = %client_id, "WebSocket error: {}", e);
                break;
            }
        }
    }

    send_task.abort();
    if let Some(conn) = broadcaster.unsubscribe(&client_id).await {
        let connected_for = Utc::now() - conn.connected_at;
        tracing::info!(
            "🔌 Client disconnected: {} (connected for {}s)",
            client_id,
            connected_for.num_seconds()
        );
    }
}
