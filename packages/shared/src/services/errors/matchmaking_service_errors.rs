use std::fmt;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MatchmakingServiceError {
    AlreadyQueued(String),
    ValidationError(String),
}

impl MatchmakingServiceError {
    pub fn code(&self) -> &'static str {
        match self {
            MatchmakingServiceError::AlreadyQueued(_) => "ALREADY_QUEUED",
            MatchmakingServiceError::ValidationError(_) => "VALIDATION_ERROR",
        }
    }
}

impl fmt::Display for MatchmakingServiceError {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            MatchmakingServiceError::AlreadyQueued(player_id) => {
                write!(f, "Player {} is already in the queue", player_id)
            }
            MatchmakingServiceError::ValidationError(msg) => write!(f, "Validation error: {}", msg),
        }
    }
}

impl std::error::Error for MatchmakingServiceError {}
