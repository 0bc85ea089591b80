use crate::services::errors::game_engine_errors::GameEngineError;
use crate::services::errors::matchmaking_service_errors::MatchmakingServiceError;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum GameSessionServiceError {
    Engine(GameEngineError),
    Matchmaking(MatchmakingServiceError),
}

impl GameSessionServiceError {
    pub fn code(&self) -> &'static str {
        match self {
            GameSessionServiceError::Engine(err) => err.code(),
            GameSessionServiceError::Matchmaking(err) => err.code(),
        }
    }
}

impl std::fmt::Display for GameSessionServiceError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            GameSessionServiceError::Engine(err) => write!(f, "{}", err),
            GameSessionServiceError::Matchmaking(err) => write!(f, "{}", err),
        }
    }
}

impl std::error::Error for GameSessionServiceError {}

impl From<GameEngineError> for GameSessionServiceError {
    fn from(err: GameEngineError) -> Self {
        GameSessionServiceError::Engine(err)
    }
}

impl From<MatchmakingServiceError> for GameSessionServiceError {
    fn from(err: MatchmakingServiceError) -> Self {
        GameSessionServiceError::Matchmaking(err)
    }
}
