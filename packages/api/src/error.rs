use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use duel_shared::services::errors::{
    game_engine_errors::GameEngineError, game_session_service_errors::GameSessionServiceError,
    matchmaking_service_errors::MatchmakingServiceError,
};
use serde_json::json;

#[derive(Debug)]
pub enum ApiError {
    GameSessionService(GameSessionServiceError),
    ValidationError(String),
}

impl From<GameSessionServiceError> for ApiError {
    fn from(error: GameSessionServiceError) -> Self {
        ApiError::GameSessionService(error)
    }
}

impl From<GameEngineError> for ApiError {
    fn from(error: GameEngineError) -> Self {
        ApiError::GameSessionService(error.into())
    }
}

impl From<MatchmakingServiceError> for ApiError {
    fn from(error: MatchmakingServiceError) -> Self {
        ApiError::GameSessionService(error.into())
    }
}

impl ApiError {
    pub fn status(&self) -> StatusCode {
        match self {
            ApiError::ValidationError(_) => StatusCode::BAD_REQUEST,

            ApiError::GameSessionService(GameSessionServiceError::Matchmaking(err)) => match err {
                MatchmakingServiceError::ValidationError(_) => StatusCode::BAD_REQUEST,
                MatchmakingServiceError::AlreadyQueued(_) => StatusCode::CONFLICT,
            },

            ApiError::GameSessionService(GameSessionServiceError::Engine(err)) => match err {
                GameEngineError::MessageTooLong { .. } => StatusCode::BAD_REQUEST,
                GameEngineError::GameNotFound(_) => StatusCode::NOT_FOUND,
                GameEngineError::PlayerNotInGame(_) | GameEngineError::NotAPlayer(_) => {
                    StatusCode::FORBIDDEN
                }
                GameEngineError::InvalidState(_) | GameEngineError::TurnLimitReached { .. } => {
                    StatusCode::CONFLICT
                }
                GameEngineError::GenerationFailed(_) => StatusCode::BAD_GATEWAY,
                GameEngineError::NoScenarioTemplates | GameEngineError::Ledger(_) => {
                    StatusCode::INTERNAL_SERVER_ERROR
                }
            },
        }
    }

    pub fn code(&self) -> &'static str {
        match self {
            ApiError::ValidationError(_) => "VALIDATION_ERROR",
            ApiError::GameSessionService(err) => err.code(),
        }
    }
}

impl std::fmt::Display for ApiError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ApiError::ValidationError(msg) => write!(f, "{}", msg),
            ApiError::GameSessionService(err) => write!(f, "{}", err),
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let body = json!({
            "error": self.to_string(),
            "code": self.code(),
        });
        (self.status(), Json(body)).into_response()
    }
}
