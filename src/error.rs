use std::path::PathBuf;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("Database not initialized at {0}. Run 'batch-apply init' first.")]
    NotInitialized(PathBuf),

    #[error("No application record for job {0}")]
    MissingRecord(String),

    #[error("Invalid row: {0}")]
    InvalidRow(String),

    #[error("SQLite error: {0}")]
    Sqlite(#[from] rusqlite::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Failure of one step of the apply protocol.
#[derive(Debug, Error)]
pub enum AutomationError {
    #[error("browser session unavailable: {0}")]
    Session(String),

    #[error("navigation to {url} failed: {message}")]
    Navigation { url: String, message: String },

    #[error("element not found: {0}")]
    ElementNotFound(String),

    #[error("form fill failed: {0}")]
    FormFill(String),

    #[error("screenshot failed: {0}")]
    Screenshot(String),

    #[error("submit failed: {0}")]
    Submit(String),
}
