//! Ollama LLM Provider
//!
//! Implementation of `LlmProvider` for local Ollama inference. Tool calls go
//! through the text protocol in [`crate::protocol`].

use std::collections::HashMap;

use agent_core::{
    error::{AgentError, Result},
    message::Message,
    provider::{Completion, FinishReason, GenerationOptions, LlmProvider, ModelInfo},
    tool::ToolSchema,
};
use async_trait::async_trait;
use ollama_rs::{
    generation::chat::{request::ChatMessageRequest, ChatMessage, MessageRole},
    models::ModelOptions,
    Ollama,
};

use crate::protocol;

/// Ollama provider configuration
#[derive(Clone, Debug)]
pub struct OllamaConfig {
    /// Ollama host URL
    pub host: String,

    /// Ollama port
    pub port: u16,
}

impl Default for OllamaConfig {
    fn default() -> Self {
        Self {
            host: "http://localhost".into(),
            port: 11434,
        }
    }
}

impl OllamaConfig {
    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let defaults = Self::default();
        Self {
            host: lookup("OLLAMA_HOST").unwrap_or(defaults.host),
            port: lookup("OLLAMA_PORT")
                .and_then(|p| p.parse().ok())
                .unwrap_or(defaults.port),
        }
    }
}

/// Ollama LLM provider
pub struct OllamaProvider {
    client: Ollama,
    config: OllamaConfig,
}

impl OllamaProvider {
    /// Create a new Ollama provider with custom host/port
    pub fn new(host: impl Into<String>, port: u16) -> Self {
        Self::from_config(OllamaConfig {
            host: host.into(),
            port,
        })
    }

    /// Create from configuration
    pub fn from_config(config: OllamaConfig) -> Self {
        Self {
            client: Ollama::new(config.host.clone(), config.port),
            config,
        }
    }

    /// Create from environment variables
    pub fn from_env() -> Self {
        Self::from_config(OllamaConfig::from_env())
    }

    pub fn config(&self) -> &OllamaConfig {
        &self.config
    }

    /// Convert agent messages to Ollama format.
    ///
    /// Tool descriptions are appended to the system entry; tool calls and
    /// results are rendered as text.
    fn convert_messages(messages: &[Message], tools: &[ToolSchema]) -> Vec<ChatMessage> {
        let mut call_names: HashMap<&str, &str> = HashMap::new();
        let mut converted = Vec::with_capacity(messages.len());

        for message in messages {
            let chat = match message {
                Message::System { content } => {
                    let mut prompt = content.clone();
                    if !tools.is_empty() {
                        prompt.push_str("\n\n");
                        prompt.push_str(&protocol::describe_tools(tools));
                    }
                    ChatMessage::new(MessageRole::System, prompt)
                }
                Message::User { content } => ChatMessage::new(MessageRole::User, content.clone()),
                Message::Assistant(reply) => {
                    for call in &reply.tool_calls {
                        call_names.insert(call.id.as_str(), call.name.as_str());
                    }
                    ChatMessage::new(MessageRole::Assistant, protocol::render_assistant(reply))
                }
                // Tool results appear as user context
                Message::Tool { tool_call_id, content } => ChatMessage::new(
                    MessageRole::User,
                    protocol::render_tool_result(call_names.get(tool_call_id.as_str()).copied(), content),
                ),
            };
            converted.push(chat);
        }
        converted
    }

    /// Build Ollama generation options
    fn build_options(opts: &GenerationOptions) -> ModelOptions {
        let options = ModelOptions::default()
            .temperature(opts.temperature)
            .top_p(opts.top_p)
            .num_predict(opts.max_tokens as i32);
        if opts.stop_sequences.is_empty() {
            options
        } else {
            options.stop(opts.stop_sequences.clone())
        }
    }
}

#[async_trait]
impl LlmProvider for OllamaProvider {
    async fn health_check(&self) -> Result<bool> {
        match self.client.list_local_models().await {
            Ok(_) => Ok(true),
            Err(e) => {
                tracing::warn!("Ollama health check failed: {}", e);
                Ok(false)
            }
        }
    }

    async fn complete(
        &self,
        messages: &[Message],
        tools: &[ToolSchema],
        options: &GenerationOptions,
    ) -> Result<Completion> {
        let request = ChatMessageRequest::new(
            options.model.clone(),
            Self::convert_messages(messages, tools),
        )
        .options(Self::build_options(options));

        tracing::debug!(model = %options.model, messages = messages.len(), "Sending Ollama chat request");

        let response = self
            .client
            .send_chat_messages(request)
            .await
            .map_err(|e| AgentError::Provider(e.to_string()))?;

        let reply = protocol::parse_reply(&response.message.content)?.with_model(options.model.clone());
        let finish_reason = if reply.has_tool_calls() {
            FinishReason::ToolUse
        } else {
            FinishReason::Stop
        };

        Ok(Completion {
            message: Message::Assistant(reply),
            model: options.model.clone(),
            usage: None,
            finish_reason: Some(finish_reason),
        })
    }

    async fn list_models(&self) -> Result<Vec<ModelInfo>> {
        let models = self
            .client
            .list_local_models()
            .await
            .map_err(|e| AgentError::ProviderUnavailable(e.to_string()))?;

        Ok(models
            .into_iter()
            .map(|m| ModelInfo {
                id: m.name.clone(),
                name: m.name,
                context_length: None, // Not exposed by Ollama API
            })
            .collect())
    }
}
