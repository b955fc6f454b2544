//! Test support: a scripted model invoker that records what it was asked.

use async_trait::async_trait;
use std::collections::VecDeque;
use std::sync::{Mutex, PoisonError};

use crate::error::{AgentError, Result};
use crate::message::Message;
use crate::provider::{Completion, FinishReason, GenerationOptions, LlmProvider, ModelInfo};
use crate::tool::{ToolCall, ToolSchema};

/// One scripted provider response
#[derive(Clone, Debug)]
pub enum Scripted {
    Reply(Message),
    RateLimited,
    Fail(String),
    /// Never completes; exercises deadlines
    Hang,
}

impl Scripted {
    pub fn reply(message: Message) -> Self {
        Scripted::Reply(message)
    }

    pub fn answer(text: &str) -> Self {
        Scripted::Reply(Message::assistant(text))
    }

    /// An assistant entry requesting a single tool call
    pub fn call(id: &str, name: &str, args: serde_json::Value) -> Self {
        Scripted::Reply(Message::assistant_with_calls("", vec![ToolCall::new(id, name, args)]))
    }
}

/// Provider that replays a script, then repeats an optional fallback.
#[derive(Default)]
pub struct ScriptedProvider {
    script: Mutex<VecDeque<Scripted>>,
    fallback: Option<Scripted>,
    requests: Mutex<Vec<Vec<Message>>>,
    offered: Mutex<Vec<Vec<String>>>,
}

impl ScriptedProvider {
    pub fn new(script: Vec<Scripted>) -> Self {
        Self {
            script: Mutex::new(script.into()),
            ..Default::default()
        }
    }

    /// Always answer with the same response
    pub fn repeating(response: Scripted) -> Self {
        Self {
            fallback: Some(response),
            ..Default::default()
        }
    }

    pub fn then_repeat(mut self, response: Scripted) -> Self {
        self.fallback = Some(response);
        self
    }

    /// Number of `complete` calls so far
    pub fn call_count(&self) -> usize {
        self.requests.lock().unwrap_or_else(PoisonError::into_inner).len()
    }

    /// Every history passed to `complete`, in call order
    pub fn requests(&self) -> Vec<Vec<Message>> {
        self.requests.lock().unwrap_or_else(PoisonError::into_inner).clone()
    }

    /// Tool names offered on each call
    pub fn offered_tools(&self) -> Vec<Vec<String>> {
        self.offered.lock().unwrap_or_else(PoisonError::into_inner).clone()
    }

    fn next(&self) -> Option<Scripted> {
        self.script
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .pop_front()
            .or_else(|| self.fallback.clone())
    }
}

#[async_trait]
impl LlmProvider for ScriptedProvider {
    async fn health_check(&self) -> Result<bool> {
        Ok(true)
    }

    async fn complete(
        &self,
        messages: &[Message],
        tools: &[ToolSchema],
        options: &GenerationOptions,
    ) -> Result<Completion> {
        self.requests
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(messages.to_vec());
        self.offered
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(tools.iter().map(|t| t.name.clone()).collect());

        match self.next() {
            Some(Scripted::Reply(message)) => {
                let finish_reason = match &message {
                    Message::Assistant(reply) if reply.has_tool_calls() => FinishReason::ToolUse,
                    _ => FinishReason::Stop,
                };
                Ok(Completion {
                    message,
                    model: options.model.clone(),
                    usage: None,
                    finish_reason: Some(finish_reason),
                })
            }
            Some(Scripted::RateLimited) => Err(AgentError::RateLimited("scripted 429".into())),
            Some(Scripted::Fail(msg)) => Err(AgentError::Provider(msg)),
            Some(Scripted::Hang) => std::future::pending().await,
            None => Err(AgentError::Provider("script exhausted".into())),
        }
    }

    async fn list_models(&self) -> Result<Vec<ModelInfo>> {
        Ok(vec![ModelInfo {
            id: "scripted".into(),
            name: "scripted".into(),
            context_length: None,
        }])
    }
}
