use axum::{extract::State, routing::post, Json, Router};
use serde::Deserialize;
use serde_json::{json, Value};
use tracing::{debug, error};

use crate::{error::ApiError, state::AppState};
use duel_shared::services::game_session_service::QueueJoinResult;

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct JoinQueueRequest {
    pub player_id: String,
    pub connection_id: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LeaveQueueRequest {
    pub player_id: String,
}

pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/queue/join", post(join_queue))
        .route("/queue/leave", post(leave_queue))
}

async fn join_queue(
    State(state): State<AppState>,
    Json(payload): Json<JoinQueueRequest>,
) -> Result<Json<QueueJoinResult>, ApiError> {
    let player_id = payload.player_id.trim();
    if player_id.is_empty() {
        return Err(ApiError::ValidationError("playerId is required".to_string()));
    }

    // Prefer the player's live socket so match events reach it.
    let connection_id = match payload.connection_id.filter(|c| !c.is_empty()) {
        Some(connection_id) => connection_id,
        None => state
            .session_service
            .notifications()
            .get_connection_id(player_id)
            .await
            .unwrap_or_else(|| format!("http_{}", player_id)),
    };

    let result = state
        .session_service
        .join_queue(player_id, &connection_id)
        .await
        .map_err(|e| {
            error!("Failed to join queue for player {}: {}", player_id, e);
            ApiError::from(e)
        })?;

    debug!("Player {} joined queue via HTTP", player_id);
    Ok(Json(result))
}

async fn leave_queue(
    State(state): State<AppState>,
    Json(payload): Json<LeaveQueueRequest>,
) -> Json<Value> {
    let removed = state.session_service.leave_queue(&payload.player_id).await;
    debug!("Player {} left queue: {}", payload.player_id, removed);
    Json(json!({ "removed": removed }))
}
