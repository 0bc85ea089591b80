#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ScenarioRepositoryError {
    Unavailable(String),
}

impl std::fmt::Display for ScenarioRepositoryError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ScenarioRepositoryError::Unavailable(msg) => {
                write!(f, "Scenario catalog unavailable: {}", msg)
            }
        }
    }
}

impl std::error::Error for ScenarioRepositoryError {}
