//! Error Types

use thiserror::Error;

/// Result type alias for agent operations
pub type Result<T> = std::result::Result<T, AgentError>;

/// Agent error types
#[derive(Error, Debug)]
pub enum AgentError {
    /// Tool subsystem failed to start; the registry stays uninitialized
    #[error("Tool registry initialization failed: {0}")]
    RegistryInit(String),

    /// Model requested a tool that is not in the registry
    #[error("Tool not found: {0}")]
    ToolNotFound(String),

    /// Model returned something the loop cannot interpret
    #[error("Invalid model response: {0}")]
    InvalidModelResponse(String),

    /// Provider throttled the request
    #[error("Rate limited: {0}")]
    RateLimited(String),

    /// LLM provider error
    #[error("Provider error: {0}")]
    Provider(String),

    /// Provider unavailable or not responding
    #[error("Provider unavailable: {0}")]
    ProviderUnavailable(String),

    /// A model call or tool call exceeded its deadline
    #[error("Timed out after {0}s")]
    Timeout(u64),

    /// Tool validation failed
    #[error("Tool validation error: {0}")]
    ToolValidation(String),

    /// Tool execution failed
    #[error("Tool execution error: {0}")]
    ToolExecution(String),

    /// Prompt asset could not be loaded
    #[error("Prompt asset {path}: {source}")]
    Prompt {
        path: String,
        #[source]
        source: std::io::Error,
    },

    /// Session / history invariant violated
    #[error("Session error: {0}")]
    Session(String),

    /// Configuration error
    #[error("Configuration error: {0}")]
    Config(String),

    /// Authentication failed
    #[error("Authentication failed: {0}")]
    Auth(String),

    /// Generic IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON serialization error
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// Other/unknown error
    #[error("{0}")]
    Other(String),
}

impl AgentError {
    /// Only rate limits are retried, and only by the outer wrapper.
    pub fn is_retryable(&self) -> bool {
        matches!(self, AgentError::RateLimited(_))
    }

    /// Convert to a user-friendly message
    pub fn user_message(&self) -> String {
        match self {
            AgentError::RegistryInit(msg) => format!("The agent tools failed to start: {}", msg),
            AgentError::ToolNotFound(name) => format!("The model asked for an unknown tool '{}'.", name),
            AgentError::InvalidModelResponse(_) => "The AI service returned a response the agent could not interpret.".into(),
            AgentError::RateLimited(_) => "The AI service is rate limiting requests. Please wait a moment.".into(),
            AgentError::Provider(msg) => format!("The AI service encountered an error: {}", msg),
            AgentError::ProviderUnavailable(_) => "The AI service is currently unavailable. Please try again.".into(),
            AgentError::Timeout(secs) => format!("The request did not complete within {}s.", secs),
            AgentError::Auth(_) => "Authentication with the AI service failed. Please check your credentials.".into(),
            other => format!("Agent failure: {}", other),
        }
    }
}

impl From<anyhow::Error> for AgentError {
    fn from(err: anyhow::Error) -> Self {
        AgentError::Other(err.to_string())
    }
}
