use std::time::Duration;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum OracleError {
    Timeout(Duration),
    Transport(String),
    Api { status: u16, body: String },
    InvalidResponse(String),
}

impl OracleError {
    /// Whether another attempt could plausibly succeed.
    pub fn is_retryable(&self) -> bool {
        match self {
            OracleError::Timeout(_) | OracleError::Transport(_) => true,
            OracleError::Api { status, .. } => *status == 429 || *status >= 500,
            OracleError::InvalidResponse(_) => false,
        }
    }
}

impl std::fmt::Display for OracleError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            OracleError::Timeout(after) => {
                write!(f, "Oracle call timed out after {}ms", after.as_millis())
            }
            OracleError::Transport(msg) => write!(f, "Oracle transport error: {}", msg),
            OracleError::Api { status, body } => {
                write!(f, "Oracle API error {}: {}", status, body)
            }
            OracleError::InvalidResponse(msg) => write!(f, "Invalid oracle response: {}", msg),
        }
    }
}

impl std::error::Error for OracleError {}
