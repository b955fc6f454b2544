//! Reasoning Loop
//!
//! A bounded request/act loop with a forced exit and a mandatory
//! post-hoc correction step:
//!
//! ```text
//!   Prepare ──▶ Agent ──tool calls, budget left──▶ Tools ──┐
//!                 ▲                                         │
//!                 └─────────────────────────────────────────┘
//!               Agent ──final answer or budget spent──▶ Verify ──▶ Done
//! ```
//!
//! The budget check runs before the tool-call check, so an over-budget turn
//! goes to `Verify` even when the model still asks for a tool.

use std::collections::HashSet;
use std::path::PathBuf;
use std::str::FromStr;
use std::sync::Arc;
use std::time::Duration;

use crate::dispatch::ToolDispatcher;
use crate::error::{AgentError, Result};
use crate::message::{AssistantMessage, Message};
use crate::prompt::PromptAssets;
use crate::provider::{GenerationOptions, LlmProvider};
use crate::retry::RetryPolicy;
use crate::session::{Session, SessionId, SessionState, SessionStore};
use crate::tool::Tool;
use crate::toolbox::{ToolBox, ToolSource, Toolset};
use crate::verify::VerificationPass;

/// Agent configuration
#[derive(Clone, Debug)]
pub struct AgentConfig {
    /// Tool-calling turns allowed before the loop is forced to verify
    pub max_iterations: u32,

    /// Outer retry policy for rate-limited invocations
    pub retry: RetryPolicy,

    /// Generation options
    pub generation: GenerationOptions,

    /// Deadline for one model call
    pub model_timeout: Duration,

    /// Deadline for one tool call
    pub tool_timeout: Duration,

    /// System prompt and double-check instruction
    pub prompts: PromptAssets,
}

impl Default for AgentConfig {
    fn default() -> Self {
        Self {
            max_iterations: 7,
            retry: RetryPolicy::default(),
            generation: GenerationOptions::default(),
            model_timeout: Duration::from_secs(15),
            tool_timeout: Duration::from_secs(60),
            prompts: PromptAssets::default(),
        }
    }
}

impl AgentConfig {
    /// Read the configuration from the process environment
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Build the configuration from any key lookup; unset keys keep their defaults.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self> {
        let defaults = Self::default();

        let mut generation = defaults.generation;
        if let Some(model) = lookup("MODEL_NAME").filter(|m| !m.trim().is_empty()) {
            generation.model = model;
        }
        generation.temperature = parse_var(&lookup, "MODEL_TEMPERATURE", generation.temperature)?;

        let retry = RetryPolicy::new(
            parse_var(&lookup, "MAX_RETRIES", defaults.retry.max_retries)?,
            Duration::from_millis(parse_var(&lookup, "RETRY_BASE_DELAY_MS", 1000u64)?),
        );

        let prompts = match lookup("PROMPTS_DIR") {
            Some(dir) => PromptAssets::from_dir(PathBuf::from(dir)),
            None => defaults.prompts,
        };

        Ok(Self {
            max_iterations: parse_var(&lookup, "MAX_ITERATIONS", defaults.max_iterations)?,
            retry,
            generation,
            model_timeout: Duration::from_secs(parse_var(&lookup, "MODEL_TIMEOUT_SECS", 15u64)?),
            tool_timeout: Duration::from_secs(parse_var(&lookup, "TOOL_TIMEOUT_SECS", 60u64)?),
            prompts,
        })
    }
}

fn parse_var<T>(lookup: &impl Fn(&str) -> Option<String>, key: &str, default: T) -> Result<T>
where
    T: FromStr,
    T::Err: std::fmt::Display,
{
    match lookup(key) {
        None => Ok(default),
        Some(raw) => raw
            .trim()
            .parse()
            .map_err(|e| AgentError::Config(format!("{}={:?}: {}", key, raw, e))),
    }
}

/// Where control goes after an agent step
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Route {
    Tools,
    Verify,
}

/// Route after an agent step. Budget exhaustion wins over pending tool calls.
pub fn should_use_tool(state: &SessionState, max_iterations: u32) -> Route {
    if state.iteration > max_iterations {
        return Route::Verify;
    }
    match state.history.last() {
        Some(Message::Assistant(reply)) if reply.has_tool_calls() => Route::Tools,
        _ => Route::Verify,
    }
}

/// The main Agent struct
pub struct Agent {
    toolbox: Arc<ToolBox>,
    config: AgentConfig,
}

impl Agent {
    pub fn new(toolbox: Arc<ToolBox>, config: AgentConfig) -> Self {
        Self { toolbox, config }
    }

    pub fn builder() -> AgentBuilder {
        AgentBuilder::new()
    }

    /// Run one loop invocation for `query` against `state`, from Prepare to Done.
    ///
    /// On error the state keeps whatever was appended before the failure.
    pub async fn run(&self, state: &mut SessionState, query: &str) -> Result<String> {
        let toolset = self.prepare(state).await?;
        state.history.push(Message::user(query))?;

        loop {
            self.agent_step(&toolset, state).await?;
            match should_use_tool(state, self.config.max_iterations) {
                Route::Tools => {
                    tracing::debug!(iteration = state.iteration, "Agent -> Tools");
                    ToolDispatcher::new(toolset.registry(), self.config.tool_timeout)
                        .dispatch(state)
                        .await?;
                }
                Route::Verify => {
                    if state.iteration > self.config.max_iterations {
                        tracing::warn!(
                            iteration = state.iteration,
                            max_iterations = self.config.max_iterations,
                            "Iteration budget spent, forcing verification"
                        );
                    }
                    tracing::debug!(iteration = state.iteration, "Agent -> Verify");
                    break;
                }
            }
        }

        let instructions = self.config.prompts.verification_instructions().await?;
        VerificationPass::new(toolset.model(), instructions).run(state).await
    }

    /// Answer a single question on a fresh state, without retries
    pub async fn ask(&self, query: &str) -> Result<String> {
        let mut state = SessionState::new();
        self.run(&mut state, query).await
    }

    /// Answer a single question, re-running the whole loop on rate limits
    pub async fn call(&self, query: &str) -> Result<String> {
        self.config.retry.run(move || self.ask(query)).await
    }

    /// Continue the conversation thread `id`, checkpointing its history once the loop completes.
    ///
    /// Rate-limited attempts are re-run from the last checkpoint. Callers must
    /// not run two invocations against the same id concurrently.
    pub async fn ask_in_session(&self, store: &dyn SessionStore, id: &SessionId, query: &str) -> Result<String> {
        let mut session = store.load(id)?.unwrap_or_else(|| Session::with_id(id.clone()));
        let checkpoint = session.history.clone();
        let agent = self;

        let (answer, state) = self
            .config
            .retry
            .run(move || {
                let history = checkpoint.clone();
                async move {
                    let mut state = SessionState::resume(history);
                    let answer = agent.run(&mut state, query).await?;
                    Ok((answer, state))
                }
            })
            .await?;

        session.checkpoint(state.history);
        store.save(&session)?;
        tracing::debug!(session = %session.id, messages = session.message_count(), "Session checkpointed");
        Ok(answer)
    }

    /// Initialize the tool box, place the system prompt at the head of history,
    /// and start a fresh iteration budget.
    async fn prepare(&self, state: &mut SessionState) -> Result<Arc<Toolset>> {
        let toolset = self.toolbox.ensure_initialized().await?;
        if !state.history.has_system() {
            let prompt = self.config.prompts.system_prompt().await?;
            state.history.ensure_system(prompt);
        }
        state.iteration = 0;
        state.turn_start = state.history.len();
        tracing::debug!(messages = state.history.len(), iteration = state.iteration, "Prepared");
        Ok(toolset)
    }

    /// One model call, appending exactly one assistant entry.
    async fn agent_step(&self, toolset: &Toolset, state: &mut SessionState) -> Result<()> {
        let completion = toolset.model().invoke(state.history.messages()).await?;
        let reply = match completion.message {
            Message::Assistant(reply) => reply,
            other => {
                return Err(AgentError::InvalidModelResponse(format!(
                    "expected an assistant entry, got {}",
                    other.role()
                )))
            }
        };
        check_reply(&reply)?;

        if reply.has_tool_calls() {
            state.iteration += 1;
        }
        tracing::debug!(
            iteration = state.iteration,
            tool_calls = reply.tool_calls.len(),
            model = %completion.model,
            "Agent step"
        );
        state.history.push(Message::Assistant(reply))?;
        Ok(())
    }

    pub fn toolbox(&self) -> &Arc<ToolBox> {
        &self.toolbox
    }

    pub fn config(&self) -> &AgentConfig {
        &self.config
    }
}

/// A reply must carry final text or well-formed tool calls.
fn check_reply(reply: &AssistantMessage) -> Result<()> {
    if !reply.has_tool_calls() {
        if reply.content.trim().is_empty() {
            return Err(AgentError::InvalidModelResponse(
                "reply has neither text nor tool calls".into(),
            ));
        }
        return Ok(());
    }

    let mut seen = HashSet::new();
    for call in &reply.tool_calls {
        if call.id.is_empty() || call.name.is_empty() {
            return Err(AgentError::InvalidModelResponse(
                "tool call is missing its id or name".into(),
            ));
        }
        if !seen.insert(call.id.as_str()) {
            return Err(AgentError::InvalidModelResponse(format!(
                "duplicate tool call id '{}'",
                call.id
            )));
        }
    }
    Ok(())
}

/// Builder for Agent configuration
pub struct AgentBuilder {
    provider: Option<Arc<dyn LlmProvider>>,
    tools: Vec<Arc<dyn Tool>>,
    sources: Vec<Arc<dyn ToolSource>>,
    config: AgentConfig,
}

impl Default for AgentBuilder {
    fn default() -> Self {
        Self::new()
    }
}

impl AgentBuilder {
    pub fn new() -> Self {
        Self {
            provider: None,
            tools: Vec::new(),
            sources: Vec::new(),
            config: AgentConfig::default(),
        }
    }

    pub fn provider(mut self, provider: Arc<dyn LlmProvider>) -> Self {
        self.provider = Some(provider);
        self
    }

    pub fn tool<T: Tool + 'static>(mut self, tool: T) -> Self {
        self.tools.push(Arc::new(tool));
        self
    }

    pub fn tools(mut self, tools: impl IntoIterator<Item = Arc<dyn Tool>>) -> Self {
        self.tools.extend(tools);
        self
    }

    /// Add an external tool collection, loaded when the tool box is first built
    pub fn source(mut self, source: Arc<dyn ToolSource>) -> Self {
        self.sources.push(source);
        self
    }

    pub fn config(mut self, config: AgentConfig) -> Self {
        self.config = config;
        self
    }

    pub fn prompts(mut self, prompts: PromptAssets) -> Self {
        self.config.prompts = prompts;
        self
    }

    pub fn model(mut self, model: impl Into<String>) -> Self {
        self.config.generation.model = model.into();
        self
    }

    pub fn temperature(mut self, temp: f32) -> Self {
        self.config.generation.temperature = temp;
        self
    }

    pub fn max_iterations(mut self, max: u32) -> Self {
        self.config.max_iterations = max;
        self
    }

    pub fn retry(mut self, retry: RetryPolicy) -> Self {
        self.config.retry = retry;
        self
    }

    pub fn build(self) -> Result<Agent> {
        let provider = self
            .provider
            .ok_or_else(|| AgentError::Config("Provider is required".into()))?;

        let toolbox = ToolBox::new(
            provider,
            self.tools,
            self.sources,
            self.config.generation.clone(),
            self.config.model_timeout,
        );
        Ok(Agent::new(Arc::new(toolbox), self.config))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::session::MemorySessionStore;
    use crate::testing::{Scripted, ScriptedProvider};
    use crate::tool::{ParameterSchema, ToolCall, ToolResult, ToolSchema};
    use async_trait::async_trait;
    use serde_json::json;
    use std::collections::HashMap;

    struct LookupTool;

    #[async_trait]
    impl Tool for LookupTool {
        fn schema(&self) -> ToolSchema {
            ToolSchema {
                name: "lookup".into(),
                description: "Look up a key".into(),
                parameters: vec![ParameterSchema::required("key", "string", "what to look up")],
                category: None,
                has_side_effects: false,
            }
        }

        async fn execute(&self, call: &ToolCall) -> Result<ToolResult> {
            let key = call.str_arg("key").unwrap_or_default();
            Ok(ToolResult::success("lookup", format!("value of {}", key)))
        }
    }

    fn agent(provider: Arc<ScriptedProvider>) -> Agent {
        Agent::builder()
            .provider(provider)
            .tool(LookupTool)
            .prompts(PromptAssets::inline("You are a careful assistant.", "Reply with the answer only."))
            .retry(RetryPolicy::new(3, Duration::from_millis(10)))
            .build()
            .unwrap()
    }

    fn lookup(id: &str) -> Scripted {
        Scripted::call(id, "lookup", json!({"key": "k"}))
    }

    fn system_count(state: &SessionState) -> usize {
        state
            .history
            .messages()
            .iter()
            .filter(|m| matches!(m, Message::System { .. }))
            .count()
    }

    #[test]
    fn test_budget_checked_before_tool_calls() {
        let mut state = SessionState::new();
        state.history.push(Message::user("go")).unwrap();
        state
            .history
            .push(Message::assistant_with_calls("", vec![ToolCall::new("c1", "lookup", json!({}))]))
            .unwrap();

        state.iteration = 7;
        assert_eq!(should_use_tool(&state, 7), Route::Tools);
        state.iteration = 8;
        assert_eq!(should_use_tool(&state, 7), Route::Verify);

        state.iteration = 1;
        state.history.push(Message::tool("c1", "done")).unwrap();
        state.history.push(Message::assistant("final")).unwrap();
        assert_eq!(should_use_tool(&state, 7), Route::Verify);
    }

    #[test]
    fn test_config_from_lookup() {
        let vars: HashMap<&str, &str> = [
            ("MAX_ITERATIONS", "3"),
            ("MAX_RETRIES", "5"),
            ("RETRY_BASE_DELAY_MS", "250"),
            ("MODEL_NAME", "llama3.2"),
            ("MODEL_TEMPERATURE", "0.1"),
            ("TOOL_TIMEOUT_SECS", "9"),
        ]
        .into_iter()
        .collect();

        let config = AgentConfig::from_lookup(|k| vars.get(k).map(|v| v.to_string())).unwrap();

        assert_eq!(config.max_iterations, 3);
        assert_eq!(config.retry, RetryPolicy::new(5, Duration::from_millis(250)));
        assert_eq!(config.generation.model, "llama3.2");
        assert_eq!(config.generation.temperature, 0.1);
        assert_eq!(config.model_timeout, Duration::from_secs(15));
        assert_eq!(config.tool_timeout, Duration::from_secs(9));
    }

    #[test]
    fn test_config_rejects_garbage() {
        let err = AgentConfig::from_lookup(|k| (k == "MAX_ITERATIONS").then(|| "seven".to_string())).unwrap_err();
        assert!(matches!(err, AgentError::Config(msg) if msg.contains("MAX_ITERATIONS")));
    }

    #[tokio::test]
    async fn test_single_tool_round_trip() {
        let provider = Arc::new(ScriptedProvider::new(vec![
            lookup("c1"),
            Scripted::answer("The value is value of k"),
            Scripted::answer("value of k"),
        ]));
        let agent = agent(provider.clone());
        let mut state = SessionState::new();

        let answer = agent.run(&mut state, "What is k?").await.unwrap();

        assert_eq!(answer, "value of k");
        assert_eq!(state.iteration, 1);
        let roles: Vec<String> = state.history.messages().iter().map(|m| m.role().to_string()).collect();
        assert_eq!(roles, vec!["system", "user", "assistant", "tool", "assistant", "assistant"]);
        assert_eq!(state.history.messages()[3].content(), "value of k");

        // model sees the full history on agent steps and a single entry on verify
        let requests = provider.requests();
        assert_eq!(requests.len(), 3);
        assert_eq!(requests[0].len(), 2);
        assert_eq!(requests[1].len(), 4);
        assert_eq!(requests[2].len(), 1);
    }

    #[tokio::test]
    async fn test_budget_exhaustion_forces_verify() {
        let mut script: Vec<Scripted> = (1..=8).map(|i| lookup(&format!("c{}", i))).collect();
        script.push(Scripted::answer("gave up"));
        let provider = Arc::new(ScriptedProvider::new(script));
        let agent = agent(provider.clone());
        let mut state = SessionState::new();

        let answer = agent.run(&mut state, "loop forever").await.unwrap();

        assert_eq!(answer, "gave up");
        assert_eq!(state.iteration, 8);
        assert_eq!(provider.call_count(), 9);
        let tool_results = state
            .history
            .messages()
            .iter()
            .filter(|m| matches!(m, Message::Tool { .. }))
            .count();
        assert_eq!(tool_results, 7);
        // the eighth request was never dispatched
        let pending = &state.history.messages()[state.history.len() - 2];
        assert!(pending.as_assistant().is_some_and(|a| a.has_tool_calls()));
    }

    #[tokio::test]
    async fn test_reused_state_gets_a_fresh_budget() {
        let mut script: Vec<Scripted> = (1..=8).map(|i| lookup(&format!("c{}", i))).collect();
        script.push(Scripted::answer("gave up"));
        script.extend([
            lookup("d1"),
            Scripted::answer("The value is value of k"),
            Scripted::answer("value of k"),
        ]);
        let provider = Arc::new(ScriptedProvider::new(script));
        let agent = agent(provider.clone());
        let mut state = SessionState::new();
        let tool_results = |state: &SessionState| {
            state
                .history
                .messages()
                .iter()
                .filter(|m| matches!(m, Message::Tool { .. }))
                .count()
        };

        agent.run(&mut state, "loop forever").await.unwrap();
        assert_eq!(state.iteration, 8);
        assert_eq!(tool_results(&state), 7);

        let answer = agent.run(&mut state, "What is k?").await.unwrap();

        assert_eq!(answer, "value of k");
        assert_eq!(state.iteration, 1);
        assert_eq!(tool_results(&state), 8);
        assert_eq!(provider.call_count(), 12);
        // the second verify call is built from the second request
        let verify = provider.requests().pop().unwrap();
        assert!(verify[0].content().contains("What is k?"));
        assert!(!verify[0].content().contains("loop forever"));
    }

    #[tokio::test]
    async fn test_non_assistant_reply_is_invalid() {
        let provider = Arc::new(ScriptedProvider::new(vec![Scripted::reply(Message::user("I am not the model"))]));
        let agent = agent(provider);

        let err = agent.ask("hello").await.unwrap_err();
        assert!(matches!(err, AgentError::InvalidModelResponse(_)));
    }

    #[tokio::test]
    async fn test_duplicate_call_ids_are_invalid() {
        let reply = Message::assistant_with_calls(
            "",
            vec![
                ToolCall::new("same", "lookup", json!({"key": "a"})),
                ToolCall::new("same", "lookup", json!({"key": "b"})),
            ],
        );
        let provider = Arc::new(ScriptedProvider::new(vec![Scripted::reply(reply)]));
        let agent = agent(provider);
        let mut state = SessionState::new();

        let err = agent.run(&mut state, "hello").await.unwrap_err();
        assert!(matches!(err, AgentError::InvalidModelResponse(msg) if msg.contains("same")));
        assert_eq!(state.iteration, 0);
        assert!(matches!(state.history.last(), Some(Message::User { .. })));
    }

    #[tokio::test]
    async fn test_existing_system_entry_is_kept() {
        let provider = Arc::new(ScriptedProvider::new(vec![Scripted::answer("hi"), Scripted::answer("hi")]));
        let agent = Agent::builder()
            .provider(provider)
            .prompts(PromptAssets {
                system: crate::prompt::PromptAsset::File("/nonexistent/system.md".into()),
                verification: crate::prompt::PromptAsset::Inline("check".into()),
            })
            .build()
            .unwrap();
        let mut state = SessionState::resume(crate::message::History::with_system_prompt("earlier persona"));

        agent.run(&mut state, "hello").await.unwrap();

        assert_eq!(system_count(&state), 1);
        assert_eq!(state.history.messages()[0].content(), "earlier persona");
    }

    #[tokio::test]
    async fn test_session_keeps_one_system_entry() {
        let provider = Arc::new(ScriptedProvider::repeating(Scripted::answer("ok")));
        let agent = agent(provider);
        let store = MemorySessionStore::new();
        let id = SessionId::from_string("thread-1");

        for query in ["first", "second", "third"] {
            assert_eq!(agent.ask_in_session(&store, &id, query).await.unwrap(), "ok");
        }

        let session = store.load(&id).unwrap().unwrap();
        let state = SessionState::resume(session.history);
        assert_eq!(system_count(&state), 1);
        assert!(matches!(state.history.messages()[0], Message::System { .. }));
        // system + 3 x (user, candidate, verified)
        assert_eq!(state.history.len(), 10);
    }

    #[tokio::test]
    async fn test_failed_invocation_leaves_checkpoint_untouched() {
        let provider = Arc::new(ScriptedProvider::new(vec![
            Scripted::answer("ok"),
            Scripted::answer("ok"),
            Scripted::Fail("upstream 500".into()),
        ]));
        let agent = agent(provider);
        let store = MemorySessionStore::new();
        let id = SessionId::from_string("thread-2");

        agent.ask_in_session(&store, &id, "first").await.unwrap();
        let err = agent.ask_in_session(&store, &id, "second").await.unwrap_err();

        assert!(matches!(err, AgentError::Provider(_)));
        assert_eq!(store.load(&id).unwrap().unwrap().history.len(), 4);
    }

    #[tokio::test(start_paused = true)]
    async fn test_call_retries_rate_limits() {
        let provider = Arc::new(ScriptedProvider::new(vec![
            Scripted::RateLimited,
            Scripted::answer("24.4"),
            Scripted::answer("24.4"),
        ]));
        let agent = agent(provider.clone());

        assert_eq!(agent.call("What is 12.2 divided by 0.5?").await.unwrap(), "24.4");
        assert_eq!(provider.call_count(), 3);
    }

    #[tokio::test]
    async fn test_builder_requires_provider() {
        assert!(matches!(Agent::builder().build(), Err(AgentError::Config(_))));
    }
}
