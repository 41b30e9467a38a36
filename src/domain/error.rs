use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SchedulerStateError {
    #[error("A monitoring job is already running")]
    AlreadyRunning,

    #[error("No monitoring job is running")]
    NotRunning,
}

#[derive(Debug, Error)]
pub enum DomainError {
    #[error("Fetch error: {0}")]
    Fetch(String),

    #[error("Embedding error: {0}")]
    Embedding(String),

    #[error("Pattern store error: {0}")]
    PatternStore(String),

    #[error("Invalid input: {0}")]
    Validation(String),

    #[error(transparent)]
    Scheduler(#[from] SchedulerStateError),

    #[error("Narrative error: {0}")]
    Narrative(String),

    #[error("Database error: {0}")]
    Database(String),

    #[error("Parse error: {0}")]
    Parse(String),
}

impl DomainError {
    /// HTTP status an outer request layer should answer with.
    pub fn status_code(&self) -> u16 {
        match self {
            DomainError::Validation(_) | DomainError::Scheduler(_) => 400,
            _ => 500,
        }
    }
}

impl From<&str> for DomainError {
    fn from(s: &str) -> Self {
        DomainError::Validation(s.to_string())
    }
}
