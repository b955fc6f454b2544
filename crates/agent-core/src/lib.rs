//! # agent-core
//!
//! Tool-augmented agent loop with a provider-agnostic model invoker and a
//! lazily built, shared tool registry.
//!
//! ## Architecture
//!
//! ```text
//! ┌──────────────────────────────────────────────────────────────┐
//! │                         Agent                                │
//! │  ┌─────────────┐  ┌──────────────┐  ┌─────────────────────┐  │
//! │  │  Reasoning  │  │   ToolBox    │  │   BoundModel        │  │
//! │  │    Loop     │──│  (once-only) │──│   (LlmProvider)     │  │
//! │  └─────────────┘  └──────────────┘  └─────────────────────┘  │
//! │         │                │                                   │
//! │  ┌─────────────┐  ┌──────────────┐  ┌─────────────────────┐  │
//! │  │ Verification│  │  Dispatcher  │  │   RetryPolicy       │  │
//! │  └─────────────┘  └──────────────┘  └─────────────────────┘  │
//! └──────────────────────────────────────────────────────────────┘
//! ```
//!
//! The `LlmProvider` trait enables swapping between OpenAI-compatible
//! services, Ollama, or any other backend without changing agent logic.

pub mod dispatch;
pub mod error;
pub mod message;
pub mod prompt;
pub mod provider;
pub mod reasoning;
pub mod retry;
pub mod session;
pub mod tool;
pub mod toolbox;
pub mod verify;

#[cfg(any(test, feature = "testing"))]
pub mod testing;

pub use error::{AgentError, Result};
pub use message::{AssistantMessage, History, Message, Role};
pub use prompt::PromptAssets;
pub use provider::{BoundModel, GenerationOptions, LlmProvider};
pub use reasoning::{should_use_tool, Agent, AgentBuilder, AgentConfig, Route};
pub use retry::RetryPolicy;
pub use session::{MemorySessionStore, Session, SessionId, SessionState, SessionStore};
pub use tool::{ParameterSchema, Tool, ToolCall, ToolRegistry, ToolResult, ToolSchema};
pub use toolbox::{ToolBox, ToolSource, Toolset};
