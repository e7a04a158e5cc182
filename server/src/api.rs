use axum::extract::State;
use axum::http::StatusCode;
use axum::routing::get;
use axum::{Json, Router};
use hoops_shared::protocol::LobbySummary;
use tokio::sync::oneshot;
use tower_http::cors::CorsLayer;

use crate::game_loop::GameCommand;
use crate::ws::{ws_handler, AppState};

/// `/ws` for play, `/api/lobbies` for discovery.
pub fn router(app_state: AppState) -> Router {
    Router::new()
        .route("/ws", get(ws_handler))
        .route("/api/lobbies", get(list_lobbies))
        .layer(CorsLayer::permissive())
        .with_state(app_state)
}

/// Every lobby with its current player count.
pub async fn list_lobbies(
    State(app_state): State<AppState>,
) -> Result<Json<Vec<LobbySummary>>, StatusCode> {
    let (resp_tx, resp_rx) = oneshot::channel();
    if app_state
        .game_tx
        .send(GameCommand::ListLobbies { response: resp_tx })
        .await
        .is_err()
    {
        tracing::error!("Failed to send ListLobbies command");
        return Err(StatusCode::SERVICE_UNAVAILABLE);
    }
    resp_rx
        .await
        .map(Json)
        .map_err(|_| StatusCode::SERVICE_UNAVAILABLE)
}
