use thiserror::Error;

#[derive(Error, Debug)]
pub enum CagnotteError {
    #[error("Database error: {0}")]
    Db(#[from] rusqlite::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Invalid month '{0}': expected YYYY-MM")]
    InvalidMonth(String),

    #[error("Invalid date '{0}': expected YYYY-MM-DD")]
    InvalidDate(String),

    #[error("Invalid amount: {0}")]
    InvalidAmount(String),

    #[error("Unknown project: {0}")]
    UnknownProject(String),

    #[error("Unknown account: {0}")]
    UnknownAccount(String),

    #[error("Project '{0}' has insufficient data for a suggestion: {1}")]
    InsufficientProjectData(String, String),

    #[error("Settings error: {0}")]
    Settings(String),

    #[error("{0}")]
    Other(String),
}

pub type Result<T> = std::result::Result<T, CagnotteError>;
