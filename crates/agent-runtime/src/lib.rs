//! # agent-runtime
//!
//! Concrete model invokers for the agent loop.
//!
//! ## Providers
//!
//! - **OpenAI** (default): chat completions with native function calling
//! - **Ollama**: local inference, tool calls through the text protocol
//!
//! ## Usage
//!
//! ```rust,ignore
//! use agent_runtime::OpenAiProvider;
//!
//! let provider = OpenAiProvider::from_env()?;
//! let agent = Agent::builder()
//!     .provider(Arc::new(provider))
//!     .build()?;
//! ```

pub mod openai;
pub mod protocol;

#[cfg(feature = "ollama")]
pub mod ollama;

#[cfg(feature = "ollama")]
pub use ollama::OllamaProvider;
pub use openai::OpenAiProvider;

use std::sync::Arc;

use agent_core::{AgentError, LlmProvider, Result};

/// Pick the provider named by `LLM_PROVIDER` (default `openai`)
pub fn provider_from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Arc<dyn LlmProvider>> {
    let name = lookup("LLM_PROVIDER").unwrap_or_else(|| "openai".into());
    match name.trim().to_ascii_lowercase().as_str() {
        "openai" => Ok(Arc::new(OpenAiProvider::from_config(openai::OpenAiConfig::from_lookup(&lookup)?)?)),
        #[cfg(feature = "ollama")]
        "ollama" => Ok(Arc::new(OllamaProvider::from_config(ollama::OllamaConfig::from_lookup(&lookup)))),
        other => Err(AgentError::Config(format!("unknown LLM_PROVIDER '{}'", other))),
    }
}

pub fn provider_from_env() -> Result<Arc<dyn LlmProvider>> {
    provider_from_lookup(|key| std::env::var(key).ok())
}

// Re-export core types for convenience
pub use agent_core::{Agent, Message, Role, Session, Tool, ToolRegistry};

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_unknown_provider_is_rejected() {
        let err = provider_from_lookup(|k| (k == "LLM_PROVIDER").then(|| "carrier-pigeon".to_string()))
            .err()
            .unwrap();
        assert!(matches!(err, AgentError::Config(msg) if msg.contains("carrier-pigeon")));
    }

    #[test]
    fn test_openai_needs_a_key() {
        let err = provider_from_lookup(|_| None).err().unwrap();
        assert!(matches!(err, AgentError::Config(_)));
    }

    #[cfg(feature = "ollama")]
    #[test]
    fn test_ollama_selected() {
        assert!(provider_from_lookup(|k| (k == "LLM_PROVIDER").then(|| "Ollama".to_string())).is_ok());
    }
}
