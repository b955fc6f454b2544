//! LLM Provider Strategy Pattern
//!
//! Defines a common interface for all LLM providers (OpenAI-compatible, Ollama, etc.)
//! allowing the agent to work with any backend without code changes.
//!
//! ## Usage
//!
//! ```rust,ignore
//! use agent_core::provider::{BoundModel, GenerationOptions};
//!
//! // Bind a provider to the registered tool set
//! let model = BoundModel::new(provider, registry.schemas(), options, timeout);
//!
//! // One call, one new assistant entry
//! let completion = model.invoke(history.messages()).await?;
//! ```

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::time::Duration;

use crate::error::{AgentError, Result};
use crate::message::Message;
use crate::tool::ToolSchema;

/// Configuration for LLM generation
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct GenerationOptions {
    /// Model identifier (e.g., "gpt-4o", "llama3.2")
    pub model: String,

    /// Temperature for sampling (0.0 = deterministic, 1.0 = creative)
    #[serde(default = "default_temperature")]
    pub temperature: f32,

    /// Maximum tokens to generate
    #[serde(default = "default_max_tokens")]
    pub max_tokens: u32,

    /// Top-p nucleus sampling
    #[serde(default = "default_top_p")]
    pub top_p: f32,

    /// Stop sequences
    #[serde(default)]
    pub stop_sequences: Vec<String>,
}

fn default_temperature() -> f32 { 0.5 }
fn default_max_tokens() -> u32 { 2048 }
fn default_top_p() -> f32 { 0.9 }

impl Default for GenerationOptions {
    fn default() -> Self {
        Self {
            model: "gpt-4o".into(),
            temperature: default_temperature(),
            max_tokens: default_max_tokens(),
            top_p: default_top_p(),
            stop_sequences: Vec::new(),
        }
    }
}

/// Response from an LLM completion
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct Completion {
    /// The new conversation entry; the loop only accepts assistant entries
    pub message: Message,

    /// Model that generated this response
    pub model: String,

    /// Token usage statistics (if available)
    pub usage: Option<TokenUsage>,

    /// Finish reason
    pub finish_reason: Option<FinishReason>,
}

/// Token usage statistics
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct TokenUsage {
    pub prompt_tokens: u32,
    pub completion_tokens: u32,
    pub total_tokens: u32,
}

/// Reason for completion finishing
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum FinishReason {
    Stop,
    Length,
    ToolUse,
    ContentFilter,
    Error,
}

/// Information about a model
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct ModelInfo {
    pub id: String,
    pub name: String,
    pub context_length: Option<u32>,
}

/// Strategy trait for LLM providers
///
/// Implement this trait to add support for new LLM backends.
/// The agent works exclusively through this interface. Implementations must
/// report provider throttling as [`AgentError::RateLimited`].
#[async_trait]
pub trait LlmProvider: Send + Sync {
    /// Check if the provider is available and configured correctly
    async fn health_check(&self) -> Result<bool>;

    /// Generate exactly one new entry from the history, offering `tools` to the model
    async fn complete(
        &self,
        messages: &[Message],
        tools: &[ToolSchema],
        options: &GenerationOptions,
    ) -> Result<Completion>;

    /// List available models
    async fn list_models(&self) -> Result<Vec<ModelInfo>>;
}

/// A provider bound to a fixed tool set, with a per-call deadline.
#[derive(Clone)]
pub struct BoundModel {
    provider: Arc<dyn LlmProvider>,
    tools: Arc<[ToolSchema]>,
    options: GenerationOptions,
    timeout: Duration,
}

impl BoundModel {
    pub fn new(
        provider: Arc<dyn LlmProvider>,
        tools: Vec<ToolSchema>,
        options: GenerationOptions,
        timeout: Duration,
    ) -> Self {
        Self {
            provider,
            tools: tools.into(),
            options,
            timeout,
        }
    }

    pub async fn invoke(&self, messages: &[Message]) -> Result<Completion> {
        tokio::time::timeout(
            self.timeout,
            self.provider.complete(messages, &self.tools, &self.options),
        )
        .await
        .map_err(|_| AgentError::Timeout(self.timeout.as_secs()))?
    }

    pub fn tools(&self) -> &[ToolSchema] {
        &self.tools
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::{Scripted, ScriptedProvider};

    #[test]
    fn test_generation_options_defaults() {
        let opts = GenerationOptions::default();
        assert_eq!(opts.temperature, 0.5);
        assert_eq!(opts.max_tokens, 2048);
        assert_eq!(opts.model, "gpt-4o");
    }

    #[tokio::test]
    async fn test_bound_model_passes_tools() {
        let provider = Arc::new(ScriptedProvider::new(vec![Scripted::reply(Message::assistant("ok"))]));
        let schema = ToolSchema {
            name: "divide".into(),
            description: "Divide a by b".into(),
            parameters: Vec::new(),
            category: None,
            has_side_effects: false,
        };
        let model = BoundModel::new(provider.clone(), vec![schema], GenerationOptions::default(), Duration::from_secs(5));

        let completion = model.invoke(&[Message::user("hi")]).await.unwrap();
        assert_eq!(completion.message, Message::assistant("ok"));
        assert_eq!(provider.offered_tools(), vec![vec!["divide".to_string()]]);
    }

    #[tokio::test(start_paused = true)]
    async fn test_bound_model_times_out() {
        let provider = Arc::new(ScriptedProvider::new(vec![Scripted::Hang]));
        let model = BoundModel::new(provider, Vec::new(), GenerationOptions::default(), Duration::from_secs(15));

        let err = model.invoke(&[Message::user("hi")]).await.unwrap_err();
        assert!(matches!(err, AgentError::Timeout(15)));
    }
}
