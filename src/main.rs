mod config;
mod error;
mod handlers;
mod keepalive;
mod room;
mod types;

use std::sync::Arc;

use axum::Router;
use axum::extract::ws::{Message, WebSocket};
use axum::extract::{State, WebSocketUpgrade};
use axum::http::{HeaderValue, Method};
use axum::response::IntoResponse;
use axum::routing::get;
use futures::stream::SplitSink;
use futures::{SinkExt, StreamExt};
use tokio::sync::Mutex;
use tower_http::cors::CorsLayer;
use tracing_subscriber::EnvFilter;

use crate::room::{RoomCommand, RoomEvent, RoomHandle};
use crate::types::{ClientEnvelope, ServerMsg};

#[derive(Clone)]
struct AppState {
    room: RoomHandle,
}

// ─── Routes ───────────────────────────────────────────────────────

async fn index() -> impl IntoResponse {
    "storyshuffle server is awake"
}

async fn ws_handler(ws: WebSocketUpgrade, State(state): State<AppState>) -> impl IntoResponse {
    ws.on_upgrade(move |socket| handle_socket(socket, state.room))
}

async fn handle_socket(socket: WebSocket, room: RoomHandle) {
    let (sender, mut receiver) = socket.split();
    let sender = Arc::new(Mutex::new(sender));

    let connection_id = uuid::Uuid::new_v4().to_string();
    tracing::info!("WebSocket connected: {}", connection_id);

    // Subscribe before joining so the first room update is not missed.
    let mut event_rx = room.event_tx.subscribe();

    let sender_clone = sender.clone();
    let connection_id_clone = connection_id.clone();

    let event_task = tokio::spawn(async move {
        loop {
            match event_rx.recv().await {
                Ok(event) => {
                    let msg = match &event {
                        RoomEvent::SendTo { connection_id, msg } if *connection_id == connection_id_clone => msg,
                        RoomEvent::SendTo { .. } => continue,
                        RoomEvent::Broadcast { msg } => msg,
                    };

                    if let Ok(json) = serde_json::to_string(msg) {
                        let mut s = sender_clone.lock().await;
                        if s.send(Message::Text(json.into())).await.is_err() {
                            return;
                        }
                    }
                }
                Err(tokio::sync::broadcast::error::RecvError::Lagged(n)) => {
                    tracing::warn!("Socket {} lagged behind by {} events", connection_id_clone, n);
                    continue;
                }
                Err(tokio::sync::broadcast::error::RecvError::Closed) => return,
            }
        }
    });

    send_msg(&sender, &ServerMsg::Connected {
        socket_id: connection_id.clone(),
    }).await;

    let _ = room.cmd_tx.send(RoomCommand::Connect {
        connection_id: connection_id.clone(),
    }).await;

    // Process incoming messages
    while let Some(Ok(msg)) = receiver.next().await {
        let Message::Text(text) = msg else { continue };

        let envelope: ClientEnvelope = match serde_json::from_str(&text) {
            Ok(m) => m,
            Err(e) => {
                tracing::warn!("Invalid message from {}: {}", connection_id, e);
                continue;
            }
        };

        let _ = room.cmd_tx.send(RoomCommand::Event {
            connection_id: connection_id.clone(),
            event: envelope.event,
            data: envelope.data,
        }).await;
    }

    // Socket disconnected
    tracing::info!("WebSocket disconnected: {}", connection_id);
    event_task.abort();

    let _ = room.cmd_tx.send(RoomCommand::Disconnect {
        connection_id,
    }).await;
}

async fn send_msg(
    sender: &Arc<Mutex<SplitSink<WebSocket, Message>>>,
    msg: &ServerMsg,
) {
    if let Ok(json) = serde_json::to_string(msg) {
        let mut s = sender.lock().await;
        let _ = s.send(Message::Text(json.into())).await;
    }
}

fn cors_layer(origin: &str) -> Result<CorsLayer, axum::http::header::InvalidHeaderValue> {
    Ok(CorsLayer::new()
        .allow_origin(origin.parse::<HeaderValue>()?)
        .allow_methods([Method::GET])
        .allow_credentials(true))
}

fn app(state: AppState, cors: CorsLayer) -> Router {
    Router::new()
        .route("/", get(index))
        .route("/ws", get(ws_handler))
        .layer(cors)
        .with_state(state)
}

// ─── Main ─────────────────────────────────────────────────────────

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let config = config::load()?;
    tracing::info!("Starting in {:?} mode, allowing origin {}", config.mode, config.client_origin);

    if let Some(url) = config.keepalive_url.clone() {
        keepalive::spawn(url, config.keepalive_interval)?;
    }

    let state = AppState {
        room: room::spawn_room(),
    };
    let router = app(state, cors_layer(&config.client_origin)?);

    let listener = tokio::net::TcpListener::bind(format!("0.0.0.0:{}", config.port)).await?;

    tracing::info!("Storyshuffle server running on port {}", config.port);

    axum::serve(listener, router).await?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    const ORIGIN: &str = "http://localhost:5173";

    async fn serve() -> String {
        let state = AppState {
            room: room::spawn_room(),
        };
        let router = app(state, cors_layer(ORIGIN).unwrap());
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            let _ = axum::serve(listener, router).await;
        });
        format!("http://{}", addr)
    }

    #[tokio::test]
    async fn test_index_is_reachable() {
        let url = serve().await;
        let resp = reqwest::get(&url).await.unwrap();

        assert_eq!(resp.status(), reqwest::StatusCode::OK);
        assert_eq!(resp.text().await.unwrap(), "storyshuffle server is awake");
    }

    #[tokio::test]
    async fn test_cors_allows_configured_origin() {
        let url = serve().await;
        let resp = reqwest::Client::new()
            .get(&url)
            .header("origin", ORIGIN)
            .send()
            .await
            .unwrap();

        let headers = resp.headers();
        assert_eq!(headers.get("access-control-allow-origin").unwrap(), ORIGIN);
        assert_eq!(headers.get("access-control-allow-credentials").unwrap(), "true");
    }

    #[test]
    fn test_cors_rejects_invalid_origin() {
        assert!(cors_layer("bad\norigin").is_err());
    }
}
