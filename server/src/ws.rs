use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::Arc;

use axum::extract::ws::{Message, WebSocket, WebSocketUpgrade};
use axum::extract::State;
use axum::response::IntoResponse;
use futures_util::{SinkExt, StreamExt};
use hoops_shared::protocol::{ClientMsg, ServerMsg, SessionId};
use tokio::sync::{broadcast, mpsc, oneshot};

use crate::config::ServerConfig;
use crate::game_loop::{GameCommand, JoinAck};
use crate::lobby::LobbyBroadcast;
use crate::registry::normalize_lobby_id;

/// Shared app state passed to each WebSocket handler
#[derive(Clone)]
pub struct AppState {
    pub game_tx: mpsc::Sender<GameCommand>,
    pub next_session_id: Arc<AtomicU32>,
    pub max_message_bytes: usize,
}

impl AppState {
    pub fn new(game_tx: mpsc::Sender<GameCommand>, config: &ServerConfig) -> Self {
        Self {
            game_tx,
            next_session_id: Arc::new(AtomicU32::new(1)),
            max_message_bytes: config.max_message_bytes,
        }
    }
}

/// HTTP handler for WebSocket upgrade
pub async fn ws_handler(
    ws: WebSocketUpgrade,
    State(app_state): State<AppState>,
) -> impl IntoResponse {
    ws.on_upgrade(|socket| handle_socket(socket, app_state))
}

/// The lobby a connection is bound to, plus its event feed
struct Membership {
    lobby_id: String,
    events: broadcast::Receiver<LobbyBroadcast>,
}

async fn handle_socket(socket: WebSocket, app_state: AppState) {
    let (mut sink, mut stream) = socket.split();
    let session_id = app_state.next_session_id.fetch_add(1, Ordering::Relaxed);
    let mut membership: Option<Membership> = None;

    tracing::info!("Session {} connected", session_id);

    loop {
        tokio::select! {
            // Client -> Server
            msg = stream.next() => {
                let text = match msg {
                    Some(Ok(Message::Text(text))) => text,
                    Some(Ok(Message::Close(_))) | None => break,
                    Some(Err(e)) => {
                        tracing::debug!("Session {} socket error: {}", session_id, e);
                        break;
                    }
                    _ => continue, // Ignore ping/pong/binary
                };

                if text.len() > app_state.max_message_bytes {
                    tracing::debug!("Session {} sent oversized message ({} bytes)", session_id, text.len());
                    continue;
                }
                let client_msg = match serde_json::from_str::<ClientMsg>(&text) {
                    Ok(msg) => msg,
                    Err(e) => {
                        tracing::debug!("Session {} sent malformed message: {}", session_id, e);
                        continue;
                    }
                };

                match client_msg {
                    ClientMsg::Join { lobby_id } => {
                        let Some(lobby_id) = normalize_lobby_id(&lobby_id) else {
                            tracing::debug!("Session {} sent a blank lobby id", session_id);
                            continue;
                        };
                        if let Some(old) = membership.take() {
                            let _ = app_state
                                .game_tx
                                .send(GameCommand::Leave { lobby_id: old.lobby_id, session_id })
                                .await;
                        }

                        let Some(ack) = join_lobby(&app_state, lobby_id.clone(), session_id).await else {
                            break;
                        };
                        if !send_msg(&mut sink, &ServerMsg::Init(ack.init)).await {
                            // Still registered in the lobby; cleanup below needs the id
                            membership = Some(Membership { lobby_id, events: ack.events });
                            break;
                        }
                        membership = Some(Membership { lobby_id, events: ack.events });
                    }
                    other => {
                        let Some(current) = &membership else {
                            tracing::debug!("Session {} sent a message before joining", session_id);
                            continue;
                        };
                        let lobby_id = current.lobby_id.clone();
                        let cmd = match other {
                            ClientMsg::Input(input) => GameCommand::Input { lobby_id, session_id, input },
                            ClientMsg::BallUpdate(update) => GameCommand::BallUpdate { lobby_id, session_id, update },
                            ClientMsg::ClaimBall => GameCommand::ClaimBall { lobby_id, session_id },
                            ClientMsg::ReleaseBall(release) => GameCommand::ReleaseBall { lobby_id, session_id, release },
                            ClientMsg::Join { .. } => continue,
                        };
                        if app_state.game_tx.send(cmd).await.is_err() {
                            tracing::error!("Game loop is gone, closing session {}", session_id);
                            break;
                        }
                    }
                }
            }

            // Server -> Client (lobby broadcast)
            result = next_event(&mut membership) => {
                match result {
                    Ok(event) => {
                        if !send_msg(&mut sink, &ServerMsg::from(event)).await {
                            break;
                        }
                    }
                    Err(broadcast::error::RecvError::Lagged(n)) => {
                        tracing::warn!("Session {} lagged by {} messages", session_id, n);
                        // Continue - the next world_state supersedes what was dropped
                    }
                    Err(broadcast::error::RecvError::Closed) => break,
                }
            }
        }
    }

    // Cleanup on disconnect
    if let Some(current) = membership {
        let _ = app_state
            .game_tx
            .send(GameCommand::Leave {
                lobby_id: current.lobby_id,
                session_id,
            })
            .await;
    }
    tracing::info!("Session {} disconnected", session_id);
}

async fn join_lobby(app_state: &AppState, lobby_id: String, session_id: SessionId) -> Option<JoinAck> {
    let (resp_tx, resp_rx) = oneshot::channel();
    if app_state
        .game_tx
        .send(GameCommand::Join {
            lobby_id,
            session_id,
            response: resp_tx,
        })
        .await
        .is_err()
    {
        tracing::error!("Failed to send Join command");
        return None;
    }

    match resp_rx.await {
        Ok(ack) => Some(ack),
        Err(_) => {
            tracing::error!("Failed to receive init");
            None
        }
    }
}

/// Wait for the next lobby event, or forever while not in a lobby.
async fn next_event(
    membership: &mut Option<Membership>,
) -> Result<LobbyBroadcast, broadcast::error::RecvError> {
    match membership {
        Some(current) => current.events.recv().await,
        None => std::future::pending().await,
    }
}

/// Serialize and send one message. Returns false once the socket is gone.
async fn send_msg<S>(sink: &mut S, msg: &ServerMsg) -> bool
where
    S: SinkExt<Message> + Unpin,
{
    let json = match serde_json::to_string(msg) {
        Ok(json) => json,
        Err(e) => {
            tracing::error!("Failed to serialize server message: {}", e);
            return true;
        }
    };
    sink.send(Message::Text(json.into())).await.is_ok()
}
