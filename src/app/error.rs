use thiserror::Error;

#[derive(Error, Debug)]
pub enum GenError {
    #[error("Database error: {0}")]
    Database(#[from] rusqlite::Error),

    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Invalid URL: {0}")]
    InvalidUrl(#[from] url::ParseError),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Invalid selector: {0}")]
    Selector(String),

    #[error("Parse error: {0}")]
    Parse(String),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("{0}")]
    Other(String),
}

impl GenError {
    /// Short variant name, used as the exception type in debug envelopes.
    pub fn kind(&self) -> &'static str {
        match self {
            GenError::Database(_) => "DatabaseError",
            GenError::Http(_) => "HttpError",
            GenError::Json(_) => "JsonError",
            GenError::InvalidUrl(_) => "InvalidUrl",
            GenError::Io(_) => "IoError",
            GenError::Selector(_) => "SelectorError",
            GenError::Parse(_) => "ParseError",
            GenError::Config(_) => "ConfigError",
            GenError::Other(_) => "Error",
        }
    }
}

pub type Result<T> = std::result::Result<T, GenError>;
