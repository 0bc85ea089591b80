use axum::{
    extract::{Path, Query, State},
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use serde::{Deserialize, Serialize};
use tracing::error;

use crate::{error::ApiError, state::AppState};
use duel_shared::models::turn::Turn;

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GameQuery {
    pub user_id: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SubmitTurnRequest {
    pub user_id: String,
    pub message: String,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SubmitTurnResponse {
    pub turn: Turn,
    pub is_game_complete: bool,
}

pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/game/{game_id}", get(get_game))
        .route("/game/{game_id}/submit-turn", post(submit_turn))
}

/// With `userId` this is the rejoin view for that player; without it, the
/// whole game with every turn.
async fn get_game(
    State(state): State<AppState>,
    Path(game_id): Path<String>,
    Query(query): Query<GameQuery>,
) -> Result<Response, ApiError> {
    match query.user_id.filter(|id| !id.is_empty()) {
        Some(user_id) => {
            let view = state
                .session_service
                .join_game_room(&game_id, &user_id)
                .await?;
            Ok(Json(view).into_response())
        }
        None => {
            let details = state.session_service.get_game(&game_id).await?;
            Ok(Json(details).into_response())
        }
    }
}

async fn submit_turn(
    State(state): State<AppState>,
    Path(game_id): Path<String>,
    Json(payload): Json<SubmitTurnRequest>,
) -> Result<Json<SubmitTurnResponse>, ApiError> {
    let submission = state
        .session_service
        .submit_turn(&game_id, &payload.user_id, &payload.message)
        .await
        .map_err(|e| {
            error!(
                "Turn from {} in game {} rejected: {}",
                payload.user_id, game_id, e
            );
            ApiError::from(e)
        })?;

    Ok(Json(SubmitTurnResponse {
        is_game_complete: submission.game.is_finished(),
        turn: submission.turn,
    }))
}
