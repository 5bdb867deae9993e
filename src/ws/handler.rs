//! WebSocket upgrade handler

use axum::{
    extract::{
        ws::{Message, WebSocket, WebSocketUpgrade},
        State,
    },
    response::Response,
};
use futures::{SinkExt, StreamExt};
use tokio::sync::{broadcast, mpsc};
use tracing::{debug, error, info, warn};
use uuid::Uuid;

use crate::app::AppState;
use crate::game::{PlayerInput, RoomCommand};
use crate::util::rate_limit::PlayerRateLimiter;
use crate::util::time::unix_millis;
use crate::ws::protocol::{ClientMsg, ServerMsg};

/// Every connection currently lands in this room
pub const DEFAULT_ROOM_ID: &str = "default-room";

/// Longest display name kept after trimming
const MAX_NAME_CHARS: usize = 24;

/// WebSocket upgrade handler
pub async fn ws_handler(ws: WebSocketUpgrade, State(state): State<AppState>) -> Response {
    ws.on_upgrade(move |socket| handle_socket(socket, state))
}

/// Handle the upgraded WebSocket connection
async fn handle_socket(socket: WebSocket, state: AppState) {
    let player_id = Uuid::new_v4();
    info!(player_id = %player_id, "New WebSocket connection");

    let (mut ws_sink, ws_stream) = socket.split();

    let (room, ack) = match state.room_registry.join(DEFAULT_ROOM_ID, player_id).await {
        Ok(joined) => joined,
        Err(e) => {
            error!(player_id = %player_id, error = %e, "Failed to join room");
            let _ = send_msg(
                &mut ws_sink,
                &ServerMsg::Error {
                    code: "room_unavailable".to_string(),
                    message: e.to_string(),
                },
            )
            .await;
            return;
        }
    };

    debug!(player_id = %player_id, room_id = %room.id, "Joined room");

    if let Err(e) = send_msg(&mut ws_sink, &ack.welcome).await {
        debug!(player_id = %player_id, error = %e, "Failed to send initial state");
        let _ = room.command_tx.send(RoomCommand::Leave { player_id }).await;
        return;
    }

    run_session(player_id, ws_sink, ws_stream, room.command_tx.clone(), ack.snapshots).await;

    info!(player_id = %player_id, "WebSocket connection closed");
}

/// Run the WebSocket session with read/write split
async fn run_session(
    player_id: Uuid,
    mut ws_sink: futures::stream::SplitSink<WebSocket, Message>,
    mut ws_stream: futures::stream::SplitStream<WebSocket>,
    command_tx: mpsc::Sender<RoomCommand>,
    mut snapshot_rx: broadcast::Receiver<ServerMsg>,
) {
    let rate_limiter = PlayerRateLimiter::new();

    // Spawn writer task: broadcast snapshots -> WebSocket
    let writer_handle = tokio::spawn(async move {
        loop {
            match snapshot_rx.recv().await {
                Ok(msg) => {
                    if let Err(e) = send_msg(&mut ws_sink, &msg).await {
                        debug!(player_id = %player_id, error = %e, "WebSocket send failed");
                        break;
                    }
                }
                Err(broadcast::error::RecvError::Lagged(n)) => {
                    warn!(
                        player_id = %player_id,
                        lagged_count = n,
                        "Client lagged, skipping {} snapshots", n
                    );
                    // Continue - don't disconnect for lag
                }
                Err(broadcast::error::RecvError::Closed) => {
                    debug!(player_id = %player_id, "Snapshot channel closed");
                    break;
                }
            }
        }
    });

    // Reader loop: WebSocket -> room task
    while let Some(result) = ws_stream.next().await {
        match result {
            Ok(Message::Text(text)) => {
                if !rate_limiter.check_input() {
                    warn!(player_id = %player_id, "Rate limited input message");
                    continue;
                }

                match serde_json::from_str::<ClientMsg>(&text).map(sanitize) {
                    Ok(None) => {
                        debug!(player_id = %player_id, "Dropping empty name change");
                    }
                    Ok(Some(client_msg)) => {
                        let input = PlayerInput {
                            player_id,
                            msg: client_msg,
                            received_at: unix_millis(),
                        };

                        if command_tx.send(RoomCommand::Input(input)).await.is_err() {
                            debug!(player_id = %player_id, "Room channel closed");
                            break;
                        }
                    }
                    Err(e) => {
                        debug!(player_id = %player_id, error = %e, "Dropping malformed client message");
                    }
                }
            }
            Ok(Message::Binary(_)) => {
                warn!(player_id = %player_id, "Received binary message, ignoring");
            }
            Ok(Message::Ping(_)) | Ok(Message::Pong(_)) => {}
            Ok(Message::Close(_)) => {
                info!(player_id = %player_id, "Client initiated close");
                break;
            }
            Err(e) => {
                debug!(player_id = %player_id, error = %e, "WebSocket error");
                break;
            }
        }
    }

    // Signal disconnect to the room
    let _ = command_tx.send(RoomCommand::Leave { player_id }).await;

    writer_handle.abort();
}

/// Boundary clean-up of client-provided values before they reach the room.
/// A name change with nothing left after trimming is dropped.
fn sanitize(msg: ClientMsg) -> Option<ClientMsg> {
    match msg {
        ClientMsg::SetName { name } => sanitize_name(&name).map(|name| ClientMsg::SetName { name }),
        other => Some(other),
    }
}

/// Trimmed, length-capped display name; None when nothing is left
pub fn sanitize_name(raw: &str) -> Option<String> {
    let name: String = raw
        .trim()
        .chars()
        .filter(|c| !c.is_control())
        .take(MAX_NAME_CHARS)
        .collect();
    let name = name.trim_end().to_string();
    (!name.is_empty()).then_some(name)
}

/// Send a message over WebSocket
async fn send_msg(
    sink: &mut futures::stream::SplitSink<WebSocket, Message>,
    msg: &ServerMsg,
) -> Result<(), String> {
    let json = serde_json::to_string(msg).map_err(|e| e.to_string())?;
    sink.send(Message::Text(json))
        .await
        .map_err(|e| e.to_string())
}
