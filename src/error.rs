use rusqlite::ErrorCode;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum PlacementError {
    #[error("Database error: {0}")]
    Database(rusqlite::Error),

    #[error("Store temporarily unavailable: {0}")]
    TransientStore(String),

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Invalid data: {0}")]
    Validation(String),

    #[error("Student not eligible: {0}")]
    NotEligible(String),

    #[error("Already applied: {0}")]
    AlreadyApplied(String),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

impl PlacementError {
    /// Busy or locked store; the caller may retry the whole operation.
    pub fn is_transient(&self) -> bool {
        matches!(self, PlacementError::TransientStore(_))
    }

    pub fn is_not_found(&self) -> bool {
        matches!(self, PlacementError::NotFound(_))
    }
}

impl From<rusqlite::Error> for PlacementError {
    fn from(err: rusqlite::Error) -> Self {
        match &err {
            rusqlite::Error::SqliteFailure(code, _)
                if matches!(
                    code.code,
                    ErrorCode::DatabaseBusy | ErrorCode::DatabaseLocked
                ) =>
            {
                PlacementError::TransientStore(err.to_string())
            }
            _ => PlacementError::Database(err),
        }
    }
}

pub type Result<T> = std::result::Result<T, PlacementError>;
