use crate::repositories::errors::game_repository_errors::GameRepositoryError;
use crate::repositories::errors::scenario_repository_errors::ScenarioRepositoryError;
use crate::repositories::errors::turn_repository_errors::TurnRepositoryError;
use crate::services::errors::oracle_errors::OracleError;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum GameEngineError {
    /// The game is no longer accepting turns.
    InvalidState(String),
    MessageTooLong { limit: usize, actual: usize },
    PlayerNotInGame(String),
    TurnLimitReached { limit: u32 },
    /// The oracle could not produce a reply, summary or verdict.
    GenerationFailed(String),
    GameNotFound(String),
    /// A spectator asked for a player-only view.
    NotAPlayer(String),
    NoScenarioTemplates,
    Ledger(String),
}

impl GameEngineError {
    /// Stable reason code reported to clients.
    pub fn code(&self) -> &'static str {
        match self {
            GameEngineError::InvalidState(_) => "INVALID_STATE",
            GameEngineError::MessageTooLong { .. } => "MESSAGE_TOO_LONG",
            GameEngineError::PlayerNotInGame(_) => "PLAYER_NOT_IN_GAME",
            GameEngineError::TurnLimitReached { .. } => "TURN_LIMIT_REACHED",
            GameEngineError::GenerationFailed(_) => "GENERATION_FAILED",
            GameEngineError::GameNotFound(_) => "GAME_NOT_FOUND",
            GameEngineError::NotAPlayer(_) => "NOT_A_PLAYER",
            GameEngineError::NoScenarioTemplates => "NO_SCENARIO_TEMPLATES",
            GameEngineError::Ledger(_) => "LEDGER_ERROR",
        }
    }
}

impl std::fmt::Display for GameEngineError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            GameEngineError::InvalidState(game_id) => {
                write!(f, "Game {} is not in progress", game_id)
            }
            GameEngineError::MessageTooLong { limit, actual } => {
                write!(f, "Message exceeds {} characters ({})", limit, actual)
            }
            GameEngineError::PlayerNotInGame(player_id) => {
                write!(f, "Player {} is not in this game", player_id)
            }
            GameEngineError::TurnLimitReached { limit } => {
                write!(f, "Turn limit of {} reached for this phase", limit)
            }
            GameEngineError::GenerationFailed(msg) => write!(f, "Generation failed: {}", msg),
            GameEngineError::GameNotFound(game_id) => write!(f, "Game {} not found", game_id),
            GameEngineError::NotAPlayer(player_id) => {
                write!(f, "Player {} is spectating", player_id)
            }
            GameEngineError::NoScenarioTemplates => write!(f, "No scenario templates available"),
            GameEngineError::Ledger(msg) => write!(f, "Ledger error: {}", msg),
        }
    }
}

impl std::error::Error for GameEngineError {}

impl From<GameRepositoryError> for GameEngineError {
    fn from(err: GameRepositoryError) -> Self {
        GameEngineError::Ledger(err.to_string())
    }
}

impl From<TurnRepositoryError> for GameEngineError {
    fn from(err: TurnRepositoryError) -> Self {
        GameEngineError::Ledger(err.to_string())
    }
}

impl From<ScenarioRepositoryError> for GameEngineError {
    fn from(err: ScenarioRepositoryError) -> Self {
        GameEngineError::Ledger(err.to_string())
    }
}

impl From<OracleError> for GameEngineError {
    fn from(err: OracleError) -> Self {
        GameEngineError::GenerationFailed(err.to_string())
    }
}
