//! WebSocket subscription handler.
//!
//! A connected client receives the room's backlog first, then live pushes.
//! Subscription happens before the backlog read, so a message published in
//! between appears in both; every frame carries the sequence number and
//! clients deduplicate by it.

use std::sync::Arc;

use axum::extract::ws::{Message as WsMessage, Utf8Bytes, WebSocket};
use axum::extract::{Path, State, WebSocketUpgrade};
use axum::response::Response;
use futures::stream::SplitSink;
use futures::{SinkExt, StreamExt};

use relief_grid_core::{ActorId, RoomId};
use relief_grid_hub::MessageHub;
use relief_grid_store::{Message, Store};

use crate::auth::{AuthUser, TokenVerifier};
use crate::error::ApiError;
use crate::handlers::rooms::{parse_room, MessageResponse};
use crate::state::GatewayState;

/// WebSocket connection handler.
///
/// Validates the room and upgrades the connection; the socket then streams
/// backlog frames followed by live fan-out frames until the client
/// disconnects.
///
/// # Errors
///
/// Returns `BadRequest` for an unknown room id.
pub async fn websocket_handler<S, V>(
    ws: WebSocketUpgrade,
    State(state): State<Arc<GatewayState<S, V>>>,
    Path(room): Path<String>,
    user: AuthUser,
) -> Result<Response, ApiError>
where
    S: Store + 'static,
    V: TokenVerifier + 'static,
{
    let room = parse_room(&room)?;
    let hub = Arc::clone(&state.hub);

    tracing::info!(room = %room, uid = %user.uid, "WebSocket subscription initiated");

    Ok(ws.on_upgrade(move |socket| handle_socket(socket, hub, room, user.uid)))
}

/// Drive one subscriber connection after upgrade.
async fn handle_socket<S: Store + 'static>(
    socket: WebSocket,
    hub: Arc<MessageHub<S>>,
    room: RoomId,
    uid: ActorId,
) {
    // Subscribe before reading the backlog so no message can fall between
    // the two; the overlap is resolved by client-side sequence dedup.
    let (subscription, mut live) = hub.subscribe(room);

    let backlog = match hub.history(room, 0).await {
        Ok(backlog) => backlog,
        Err(e) => {
            tracing::error!(room = %room, error = %e, "Backlog read failed, closing socket");
            return;
        }
    };

    let (mut sink, mut stream) = socket.split();

    for message in backlog {
        if send_frame(&mut sink, &message).await.is_err() {
            return;
        }
    }

    loop {
        tokio::select! {
            pushed = live.recv() => {
                let Some(pushed) = pushed else { break };
                if send_frame(&mut sink, &pushed).await.is_err() {
                    break;
                }
            }
            incoming = stream.next() => {
                // Publishing goes through the REST endpoint; inbound frames
                // only matter for detecting disconnect.
                match incoming {
                    Some(Ok(WsMessage::Close(_))) | Some(Err(_)) | None => break,
                    Some(Ok(_)) => {}
                }
            }
        }
    }

    subscription.release();
    tracing::debug!(room = %room, uid = %uid, "WebSocket subscription ended");
}

/// Serialize a message and push it to the client.
async fn send_frame(
    sink: &mut SplitSink<WebSocket, WsMessage>,
    message: &Message,
) -> Result<(), ()> {
    let frame = MessageResponse::from(message.clone());
    let json = serde_json::to_string(&frame).map_err(|_| ())?;
    sink.send(WsMessage::Text(Utf8Bytes::from(json)))
        .await
        .map_err(|_| ())
}
