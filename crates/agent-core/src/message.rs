//! Conversation Messages
//!
//! Typed conversation entries and the append-only history the loop threads
//! through every step.

use serde::{Deserialize, Serialize};

use crate::error::{AgentError, Result};
use crate::tool::ToolCall;

/// Role of a message sender
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    /// System prompt/instructions
    System,
    /// User input
    User,
    /// Assistant (LLM) response
    Assistant,
    /// Tool result (injected as context)
    Tool,
}

impl std::fmt::Display for Role {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Role::System => write!(f, "system"),
            Role::User => write!(f, "user"),
            Role::Assistant => write!(f, "assistant"),
            Role::Tool => write!(f, "tool"),
        }
    }
}

/// A model-produced turn. An empty `tool_calls` makes it a candidate final answer.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct AssistantMessage {
    /// Text content
    pub content: String,

    /// Tool invocations requested by the model, in request order
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub tool_calls: Vec<ToolCall>,

    /// Model that generated this
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub model: Option<String>,
}

impl AssistantMessage {
    pub fn has_tool_calls(&self) -> bool {
        !self.tool_calls.is_empty()
    }

    pub fn with_model(mut self, model: impl Into<String>) -> Self {
        self.model = Some(model.into());
        self
    }
}

/// A single entry in a conversation
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(tag = "role", rename_all = "lowercase")]
pub enum Message {
    System { content: String },
    User { content: String },
    Assistant(AssistantMessage),
    Tool { tool_call_id: String, content: String },
}

impl Message {
    /// Create a system message
    pub fn system(content: impl Into<String>) -> Self {
        Message::System { content: content.into() }
    }

    /// Create a user message
    pub fn user(content: impl Into<String>) -> Self {
        Message::User { content: content.into() }
    }

    /// Create an assistant message carrying a final answer
    pub fn assistant(content: impl Into<String>) -> Self {
        Message::Assistant(AssistantMessage {
            content: content.into(),
            ..Default::default()
        })
    }

    /// Create an assistant message requesting tool calls
    pub fn assistant_with_calls(content: impl Into<String>, tool_calls: Vec<ToolCall>) -> Self {
        Message::Assistant(AssistantMessage {
            content: content.into(),
            tool_calls,
            model: None,
        })
    }

    /// Create a tool result message
    pub fn tool(tool_call_id: impl Into<String>, content: impl Into<String>) -> Self {
        Message::Tool {
            tool_call_id: tool_call_id.into(),
            content: content.into(),
        }
    }

    pub fn role(&self) -> Role {
        match self {
            Message::System { .. } => Role::System,
            Message::User { .. } => Role::User,
            Message::Assistant(_) => Role::Assistant,
            Message::Tool { .. } => Role::Tool,
        }
    }

    pub fn content(&self) -> &str {
        match self {
            Message::System { content }
            | Message::User { content }
            | Message::Tool { content, .. } => content,
            Message::Assistant(reply) => &reply.content,
        }
    }

    pub fn as_assistant(&self) -> Option<&AssistantMessage> {
        match self {
            Message::Assistant(reply) => Some(reply),
            _ => None,
        }
    }
}

/// Append-only conversation history.
///
/// Entries can only be appended, with one exception: a missing system entry
/// may be placed at the head once. Tool results must answer a call made by
/// the latest assistant entry.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "Vec<Message>", into = "Vec<Message>")]
pub struct History {
    messages: Vec<Message>,
}

impl History {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_system_prompt(prompt: impl Into<String>) -> Self {
        Self {
            messages: vec![Message::system(prompt)],
        }
    }

    /// Append an entry, rejecting anything that would break the history invariants.
    pub fn push(&mut self, message: Message) -> Result<()> {
        match &message {
            Message::System { .. } if !self.messages.is_empty() => {
                return Err(AgentError::Session(
                    "system entry must be the first and only system entry".into(),
                ));
            }
            Message::Tool { tool_call_id, .. } => {
                let answered = self
                    .last_assistant()
                    .is_some_and(|reply| reply.tool_calls.iter().any(|call| &call.id == tool_call_id));
                if !answered {
                    return Err(AgentError::Session(format!(
                        "tool result '{}' has no matching assistant tool call",
                        tool_call_id
                    )));
                }
            }
            _ => {}
        }
        self.messages.push(message);
        Ok(())
    }

    /// Place the system prompt at the head if none is present. Returns true if inserted.
    pub fn ensure_system(&mut self, prompt: impl Into<String>) -> bool {
        if self.has_system() {
            return false;
        }
        self.messages.insert(0, Message::system(prompt));
        true
    }

    pub fn has_system(&self) -> bool {
        matches!(self.messages.first(), Some(Message::System { .. }))
    }

    /// Get all messages
    pub fn messages(&self) -> &[Message] {
        &self.messages
    }

    /// Get the last message
    pub fn last(&self) -> Option<&Message> {
        self.messages.last()
    }

    pub fn last_assistant(&self) -> Option<&AssistantMessage> {
        self.messages.iter().rev().find_map(Message::as_assistant)
    }

    /// The first user request at or after entry `start`
    pub fn first_user_since(&self, start: usize) -> Option<&str> {
        self.messages.iter().skip(start).find_map(|m| match m {
            Message::User { content } => Some(content.as_str()),
            _ => None,
        })
    }

    /// Number of messages
    pub fn len(&self) -> usize {
        self.messages.len()
    }

    /// Check if empty
    pub fn is_empty(&self) -> bool {
        self.messages.is_empty()
    }
}

impl TryFrom<Vec<Message>> for History {
    type Error = AgentError;

    fn try_from(messages: Vec<Message>) -> Result<Self> {
        let mut history = History::new();
        for message in messages {
            history.push(message)?;
        }
        Ok(history)
    }
}

impl From<History> for Vec<Message> {
    fn from(history: History) -> Self {
        history.messages
    }
}
