#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConnectionRepositoryError {
    ConnectionNotFound(String),
    SendFailed(String),
}

impl std::fmt::Display for ConnectionRepositoryError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ConnectionRepositoryError::ConnectionNotFound(id) => {
                write!(f, "Connection not found: {}", id)
            }
            ConnectionRepositoryError::SendFailed(msg) => write!(f, "Send failed: {}", msg),
        }
    }
}

impl std::error::Error for ConnectionRepositoryError {}
