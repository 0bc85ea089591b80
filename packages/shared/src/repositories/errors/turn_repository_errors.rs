#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TurnRepositoryError {
    /// A turn with the same game, player, phase and number is already stored.
    AlreadyExists,
    Serialization(String),
    DynamoDb(String),
}

impl std::fmt::Display for TurnRepositoryError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            TurnRepositoryError::AlreadyExists => write!(f, "Turn already exists"),
            TurnRepositoryError::Serialization(msg) => {
                write!(f, "Serialization error: {}", msg)
            }
            TurnRepositoryError::DynamoDb(msg) => write!(f, "DynamoDB error: {}", msg),
        }
    }
}

impl std::error::Error for TurnRepositoryError {}
