//! Error Types for the tool kit

use thiserror::Error;

pub type Result<T> = std::result::Result<T, ToolkitError>;

#[derive(Error, Debug)]
pub enum ToolkitError {
    #[error("Search error: {0}")]
    Search(String),

    #[error("Search backend not configured: {0}")]
    SearchUnavailable(String),

    #[error("{path} has no valid file type. Received .{received}, expected .{expected}")]
    UnsupportedFile {
        path: String,
        received: String,
        expected: &'static str,
    },

    #[error("Query error: {0}")]
    Query(String),

    #[error("Web session is closed")]
    SessionClosed,

    #[error("HTTP {status} from {url}")]
    HttpStatus { status: u16, url: String },

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Network error: {0}")]
    Network(#[from] reqwest::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

impl From<ToolkitError> for agent_core::AgentError {
    fn from(err: ToolkitError) -> Self {
        agent_core::AgentError::ToolExecution(err.to_string())
    }
}
