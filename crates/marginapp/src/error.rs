use thiserror::Error;

#[derive(Error, Debug)]
pub enum MarginError {
    /// The import document is malformed or misses a required field.
    #[error("Invalid export document: {0}")]
    InvalidFormat(String),

    /// A save was requested on a page with no discoverable tools.
    #[error("No content found on this page")]
    NoContentFound,

    /// Leaving text-only view without a captured page structure.
    #[error("Cannot restore the original page: no structure snapshot was captured")]
    RestoreFailure,

    #[error("Storage error: {0}")]
    Storage(String),

    #[error("Tool not found: {0}")]
    ToolNotFound(String),

    #[error("Suggestion not found: {0}")]
    SuggestionNotFound(String),

    #[error("Markup error: {0}")]
    Markup(String),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

pub type Result<T> = std::result::Result<T, MarginError>;
