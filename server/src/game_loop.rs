use crate::config::ServerConfig;
use crate::lobby::{LobbyBroadcast, TickOutcome};
use crate::registry::LobbyRegistry;
use hoops_shared::protocol::{
    BallUpdateMsg, InitMsg, InputMsg, LobbySummary, ReleaseBallMsg, SessionId,
};
use std::time::{Duration, Instant};
use tokio::sync::{broadcast, mpsc, oneshot};

/// Reply to a successful join
pub struct JoinAck {
    pub init: InitMsg,
    pub events: broadcast::Receiver<LobbyBroadcast>,
}

/// Commands from client connections to the game loop
pub enum GameCommand {
    Join {
        lobby_id: String,
        session_id: SessionId,
        response: oneshot::Sender<JoinAck>,
    },
    Leave {
        lobby_id: String,
        session_id: SessionId,
    },
    Input {
        lobby_id: String,
        session_id: SessionId,
        input: InputMsg,
    },
    BallUpdate {
        lobby_id: String,
        session_id: SessionId,
        update: BallUpdateMsg,
    },
    ClaimBall {
        lobby_id: String,
        session_id: SessionId,
    },
    ReleaseBall {
        lobby_id: String,
        session_id: SessionId,
        release: ReleaseBallMsg,
    },
    ListLobbies {
        response: oneshot::Sender<Vec<LobbySummary>>,
    },
}

/// Run the main game loop. Owns every lobby.
pub async fn run_game_loop(mut cmd_rx: mpsc::Receiver<GameCommand>, server_config: ServerConfig) {
    let mut registry = LobbyRegistry::new(&server_config);

    let max_delta = server_config.max_tick_delta_secs;
    let lobby_ttl = server_config.empty_lobby_ttl_secs.map(Duration::from_secs);

    let mut tick_interval = tokio::time::interval(server_config.tick_period());
    tick_interval.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Skip);

    loop {
        tokio::select! {
            _ = tick_interval.tick() => {
                let now = Instant::now();
                tick_all(&mut registry, now, max_delta);

                if let Some(ttl) = lobby_ttl {
                    for id in registry.prune_empty(now, ttl) {
                        tracing::info!("Removed empty lobby {}", id);
                    }
                }
            }

            Some(cmd) = cmd_rx.recv() => {
                handle_command(&mut registry, cmd, Instant::now());
            }

            else => break,
        }
    }

    tracing::info!("Game loop ended");
}

/// Offer one tick to every lobby.
pub fn tick_all(registry: &mut LobbyRegistry, now: Instant, max_delta: f64) {
    for lobby in registry.lobbies_mut() {
        if let TickOutcome::Skipped { delta } = lobby.tick(now, max_delta) {
            tracing::warn!(
                "Lobby {} skipped a {:.0}ms frame",
                lobby.id(),
                delta * 1000.0
            );
        }
    }
}

/// Apply one command to the registry.
pub fn handle_command(registry: &mut LobbyRegistry, cmd: GameCommand, now: Instant) {
    match cmd {
        GameCommand::Join {
            lobby_id,
            session_id,
            response,
        } => {
            let lobby = registry.get_or_create(&lobby_id, now);
            let (init, events) = lobby.join(session_id);
            tracing::info!(
                "Player {} joined lobby {} ({} players)",
                session_id,
                lobby_id,
                lobby.player_count()
            );
            if response.send(JoinAck { init, events }).is_err() {
                // Connection vanished while waiting
                lobby.leave(session_id, now);
            }
        }
        GameCommand::Leave {
            lobby_id,
            session_id,
        } => {
            if let Some(lobby) = registry.get_mut(&lobby_id) {
                if lobby.leave(session_id, now) {
                    tracing::info!("Player {} left lobby {}", session_id, lobby_id);
                }
            }
        }
        GameCommand::Input {
            lobby_id,
            session_id,
            input,
        } => {
            let applied = registry
                .get_mut(&lobby_id)
                .is_some_and(|lobby| lobby.apply_input(session_id, &input));
            if !applied {
                tracing::debug!("Input from {} outside lobby {}", session_id, lobby_id);
            }
        }
        GameCommand::BallUpdate {
            lobby_id,
            session_id,
            update,
        } => {
            if let Some(lobby) = registry.get_mut(&lobby_id) {
                if let Err(e) = lobby.apply_ball_update(session_id, &update) {
                    tracing::debug!("Ignored ball_update from {}: {:?}", session_id, e);
                }
            }
        }
        GameCommand::ClaimBall {
            lobby_id,
            session_id,
        } => {
            if let Some(lobby) = registry.get_mut(&lobby_id) {
                match lobby.claim_ball(session_id) {
                    Ok(()) => tracing::debug!("Player {} claimed the ball", session_id),
                    Err(e) => tracing::debug!("Ignored claim_ball from {}: {:?}", session_id, e),
                }
            }
        }
        GameCommand::ReleaseBall {
            lobby_id,
            session_id,
            release,
        } => {
            if let Some(lobby) = registry.get_mut(&lobby_id) {
                if let Err(e) = lobby.release_ball(session_id, &release) {
                    tracing::debug!("Ignored release_ball from {}: {:?}", session_id, e);
                }
            }
        }
        GameCommand::ListLobbies { response } => {
            let _ = response.send(registry.list());
        }
    }
}
