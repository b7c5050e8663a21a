use axum::extract::ws::{Message, WebSocket, WebSocketUpgrade};
use axum::extract::State;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use futures_util::stream::SplitSink;
use futures_util::{SinkExt, StreamExt};
use std::sync::Arc;
use tokio::sync::{mpsc, oneshot, Semaphore};

use crate::config::ServerConfig;
use crate::error::SessionError;
use crate::hub::HubCommand;
use crate::registry::ConnectionId;
use crate::relay::ClientLink;
use iceage_shared::config::is_valid_room_code;
use iceage_shared::protocol::{ClientMsg, CreateRoomAck, JoinRoomAck, ServerMsg};

/// Frames above this size close the connection.
pub const MAX_MESSAGE_SIZE: usize = 1024;
/// Malformed frames tolerated before the connection is closed.
pub const MAX_PARSE_ERRORS: u32 = 5;

/// Shared app state passed to each WebSocket handler
#[derive(Clone)]
pub struct AppState {
    pub hub_tx: mpsc::Sender<HubCommand>,
    pub connection_semaphore: Arc<Semaphore>,
    pub shot_buffer: usize,
}

impl AppState {
    pub fn new(hub_tx: mpsc::Sender<HubCommand>, config: &ServerConfig) -> Self {
        Self {
            hub_tx,
            connection_semaphore: Arc::new(Semaphore::new(config.max_connections)),
            shot_buffer: config.shot_buffer,
        }
    }
}

/// HTTP handler for WebSocket upgrade
pub async fn ws_handler(ws: WebSocketUpgrade, State(app_state): State<AppState>) -> Response {
    let permit = match app_state.connection_semaphore.clone().try_acquire_owned() {
        Ok(permit) => permit,
        Err(_) => {
            tracing::warn!("Connection limit reached, refusing upgrade");
            return StatusCode::SERVICE_UNAVAILABLE.into_response();
        }
    };

    ws.max_message_size(MAX_MESSAGE_SIZE)
        .on_upgrade(move |socket| async move {
            handle_socket(socket, app_state).await;
            drop(permit);
        })
        .into_response()
}

async fn handle_socket(socket: WebSocket, app_state: AppState) {
    let (mut sink, mut stream) = socket.split();
    let (link, mut receivers) = ClientLink::channel(app_state.shot_buffer);

    // Register with the hub
    let (resp_tx, resp_rx) = oneshot::channel();
    if app_state
        .hub_tx
        .send(HubCommand::Connect {
            link,
            response: resp_tx,
        })
        .await
        .is_err()
    {
        tracing::error!("Failed to send Connect command");
        return;
    }
    let my_id = match resp_rx.await {
        Ok(id) => id,
        Err(_) => {
            tracing::error!("Failed to receive connection id");
            return;
        }
    };

    tracing::info!(conn = my_id, "Client connected");

    let mut parse_errors = 0u32;

    loop {
        tokio::select! {
            // Client -> Server
            msg = stream.next() => {
                match msg {
                    Some(Ok(Message::Text(text))) => {
                        match serde_json::from_str::<ClientMsg>(&text) {
                            Ok(client_msg) => {
                                if !handle_client_msg(&app_state, &mut sink, my_id, client_msg).await {
                                    break;
                                }
                            }
                            Err(e) => {
                                parse_errors += 1;
                                tracing::debug!(conn = my_id, "Unparseable message: {}", e);
                                if parse_errors >= MAX_PARSE_ERRORS {
                                    tracing::warn!(conn = my_id, "Too many malformed messages, closing");
                                    break;
                                }
                            }
                        }
                    }
                    Some(Ok(Message::Close(_))) | None => break,
                    Some(Err(e)) => {
                        tracing::debug!(conn = my_id, "Socket error: {}", e);
                        break;
                    }
                    _ => {} // Ignore ping/pong/binary
                }
            }

            // Server -> Client (lifecycle notices, never dropped)
            Some(notice) = receivers.notices.recv() => {
                if !send_msg(&mut sink, &notice).await {
                    break;
                }
            }

            // Server -> Client (shots, in order)
            Some(shot) = receivers.shots.recv() => {
                if !send_msg(&mut sink, &shot).await {
                    break;
                }
            }

            // Server -> Client (latest orientation only)
            changed = receivers.orientation.changed() => {
                if changed.is_err() {
                    break;
                }
                let sample = *receivers.orientation.borrow_and_update();
                if let Some(data) = sample {
                    if !send_msg(&mut sink, &ServerMsg::GyroUpdate(data)).await {
                        break;
                    }
                }
            }
        }
    }

    // Cleanup on disconnect
    let _ = app_state
        .hub_tx
        .send(HubCommand::Disconnect { conn: my_id })
        .await;
    tracing::info!(conn = my_id, "Client disconnected");
}

/// Forward one client message to the hub. Returns false when the socket
/// should close.
async fn handle_client_msg(
    app_state: &AppState,
    sink: &mut SplitSink<WebSocket, Message>,
    my_id: ConnectionId,
    msg: ClientMsg,
) -> bool {
    match msg {
        ClientMsg::CreateRoom => {
            let (tx, rx) = oneshot::channel();
            if app_state
                .hub_tx
                .send(HubCommand::CreateRoom {
                    conn: my_id,
                    response: tx,
                })
                .await
                .is_err()
            {
                return false;
            }
            let ack = match rx.await {
                Ok(Ok(code)) => CreateRoomAck::ok(code),
                Ok(Err(e)) => CreateRoomAck::err(e.to_string()),
                Err(_) => return false,
            };
            send_msg(sink, &ServerMsg::CreateRoomResult(ack)).await
        }
        ClientMsg::JoinRoom { room_code } => {
            if !is_valid_room_code(&room_code) {
                tracing::debug!(conn = my_id, "Rejecting malformed room code {:?}", room_code);
                let ack = JoinRoomAck::err(SessionError::RoomNotFound.to_string());
                return send_msg(sink, &ServerMsg::JoinRoomResult(ack)).await;
            }
            let (tx, rx) = oneshot::channel();
            if app_state
                .hub_tx
                .send(HubCommand::JoinRoom {
                    conn: my_id,
                    code: room_code,
                    response: tx,
                })
                .await
                .is_err()
            {
                return false;
            }
            let ack = match rx.await {
                Ok(Ok(())) => JoinRoomAck::ok(),
                Ok(Err(e)) => JoinRoomAck::err(e.to_string()),
                Err(_) => return false,
            };
            send_msg(sink, &ServerMsg::JoinRoomResult(ack)).await
        }
        ClientMsg::GyroData(data) => app_state
            .hub_tx
            .send(HubCommand::Gyro { conn: my_id, data })
            .await
            .is_ok(),
        ClientMsg::Shoot => app_state
            .hub_tx
            .send(HubCommand::Shoot { conn: my_id })
            .await
            .is_ok(),
    }
}

async fn send_msg(sink: &mut SplitSink<WebSocket, Message>, msg: &ServerMsg) -> bool {
    match serde_json::to_string(msg) {
        Ok(json) => sink.send(Message::Text(json.into())).await.is_ok(),
        Err(e) => {
            tracing::error!("Failed to serialize {:?}: {}", msg, e);
            true
        }
    }
}
