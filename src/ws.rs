//! WebSocket transport adapter.
//!
//! One task per connection: assigns the sid, runs the gateway's connect
//! handshake, then multiplexes broadcast fan-out and inbound client frames.
//! All chat semantics live in the gateway; this module only moves frames.

use axum::{
    extract::{
        ws::{Message, WebSocket, WebSocketUpgrade},
        State,
    },
    response::IntoResponse,
};
use futures::{sink::SinkExt, stream::StreamExt};
use std::sync::Arc;
use ulid::Ulid;

use crate::gateway::Gateway;

/// WebSocket upgrade handler
pub async fn ws_handler(
    ws: WebSocketUpgrade,
    State(gateway): State<Arc<Gateway>>,
) -> impl IntoResponse {
    tracing::info!("WebSocket connection request");
    ws.on_upgrade(move |socket| handle_socket(socket, gateway))
}

/// Handle individual WebSocket connection
async fn handle_socket(socket: WebSocket, gateway: Arc<Gateway>) {
    let sid = Ulid::new().to_string();
    let (mut sender, mut receiver) = socket.split();

    // Must subscribe before the connect handshake; broadcasts sent while
    // this connection is registering would otherwise be missed
    let mut events = gateway.subscribe();

    for event in gateway.handle_connect(&sid).await {
        if let Ok(json) = serde_json::to_string(&event) {
            if sender.send(Message::Text(json.into())).await.is_err() {
                tracing::error!("Failed to send connect ack to {}", sid);
                gateway.handle_disconnect(&sid).await;
                return;
            }
        }
    }

    loop {
        tokio::select! {
            // Fan-out from the gateway's broadcast channel
            broadcast_msg = events.recv() => {
                if let Ok(event) = broadcast_msg {
                    if let Ok(json) = serde_json::to_string(&event) {
                        if sender.send(Message::Text(json.into())).await.is_err() {
                            break;
                        }
                    }
                }
            }

            // Inbound client frames
            ws_msg = receiver.next() => {
                match ws_msg {
                    Some(Ok(Message::Text(text))) => {
                        tracing::debug!("Received frame from {}: {}", sid, text);

                        if let Some(reply) = gateway.handle_frame(&sid, &text).await {
                            if let Ok(json) = serde_json::to_string(&reply) {
                                if sender.send(Message::Text(json.into())).await.is_err() {
                                    tracing::error!("Failed to send reply to {}", sid);
                                    break;
                                }
                            }
                        }
                    }
                    Some(Ok(Message::Close(_))) => {
                        tracing::info!("WebSocket closed by {}", sid);
                        break;
                    }
                    Some(Ok(Message::Ping(data))) => {
                        if sender.send(Message::Pong(data)).await.is_err() {
                            break;
                        }
                    }
                    Some(Ok(_)) => {}
                    Some(Err(e)) => {
                        tracing::error!("WebSocket error for {}: {}", sid, e);
                        break;
                    }
                    None => break,
                }
            }
        }
    }

    gateway.handle_disconnect(&sid).await;
}
