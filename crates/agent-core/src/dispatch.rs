//! Tool Dispatch
//!
//! Resolves the latest assistant entry's tool calls against the registry and
//! appends one tool result per call, in request order.

use std::sync::Arc;
use std::time::Duration;

use crate::error::{AgentError, Result};
use crate::message::Message;
use crate::session::SessionState;
use crate::tool::{Tool, ToolCall, ToolRegistry};

pub struct ToolDispatcher<'a> {
    registry: &'a ToolRegistry,
    timeout: Duration,
}

impl<'a> ToolDispatcher<'a> {
    pub fn new(registry: &'a ToolRegistry, timeout: Duration) -> Self {
        Self { registry, timeout }
    }

    /// Run every requested call and append its result. Returns the number of results appended.
    ///
    /// All names are resolved before anything runs, so an unknown tool fails
    /// the step without appending any result.
    pub async fn dispatch(&self, state: &mut SessionState) -> Result<usize> {
        let calls = match state.history.last() {
            Some(Message::Assistant(reply)) if reply.has_tool_calls() => reply.tool_calls.clone(),
            _ => {
                return Err(AgentError::InvalidModelResponse(
                    "tool dispatch requires an assistant entry with tool calls".into(),
                ))
            }
        };

        let resolved = calls
            .into_iter()
            .map(|call| self.registry.resolve(&call.name).map(|tool| (call, tool)))
            .collect::<Result<Vec<_>>>()?;

        let count = resolved.len();
        for (call, tool) in resolved {
            let text = self.invoke(tool, &call).await;
            state.history.push(Message::tool(call.id, text))?;
        }
        Ok(count)
    }

    /// Tool failures of any kind come back as text for the model to read.
    async fn invoke(&self, tool: Arc<dyn Tool>, call: &ToolCall) -> String {
        tracing::debug!(tool = %call.name, call_id = %call.id, "Executing tool");

        if let Err(e) = tool.validate(call) {
            tracing::warn!(tool = %call.name, error = %e, "Tool arguments rejected");
            return format!("Error: {}", e);
        }

        match tokio::time::timeout(self.timeout, tool.execute(call)).await {
            Ok(Ok(result)) => {
                if !result.success {
                    tracing::debug!(tool = %call.name, output = %result.output, "Tool reported failure");
                }
                result.to_text()
            }
            Ok(Err(e)) => {
                tracing::warn!(tool = %call.name, error = %e, "Tool execution failed");
                format!("Error: {}", e)
            }
            Err(_) => {
                let secs = self.timeout.as_secs();
                tracing::warn!(tool = %call.name, timeout_secs = secs, "Tool timed out");
                format!("Error: tool '{}' timed out after {}s", call.name, secs)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tool::{ParameterSchema, ToolResult, ToolSchema};
    use async_trait::async_trait;

    /// Echoes `x`, fails on `fail`, hangs on `hang`.
    struct EchoTool;

    #[async_trait]
    impl Tool for EchoTool {
        fn schema(&self) -> ToolSchema {
            ToolSchema {
                name: "echo".into(),
                description: "echoes x".into(),
                parameters: vec![ParameterSchema::required("x", "string", "payload")],
                category: None,
                has_side_effects: false,
            }
        }

        async fn execute(&self, call: &ToolCall) -> crate::Result<ToolResult> {
            match call.str_arg("x") {
                Some("fail") => Err(AgentError::ToolExecution("boom".into())),
                Some("hang") => std::future::pending().await,
                Some(x) => Ok(ToolResult::success("echo", x)),
                None => Ok(ToolResult::failure("echo", "no x")),
            }
        }
    }

    fn registry() -> ToolRegistry {
        let mut registry = ToolRegistry::new();
        registry.register(EchoTool);
        registry
    }

    fn state_with_calls(calls: Vec<ToolCall>) -> SessionState {
        let mut state = SessionState::new();
        state.history.push(Message::user("go")).unwrap();
        state.history.push(Message::assistant_with_calls("", calls)).unwrap();
        state
    }

    fn echo(id: &str, x: &str) -> ToolCall {
        ToolCall::new(id, "echo", serde_json::json!({ "x": x }))
    }

    #[tokio::test]
    async fn test_results_follow_request_order() {
        let registry = registry();
        let dispatcher = ToolDispatcher::new(&registry, Duration::from_secs(5));
        let mut state = state_with_calls(vec![echo("c1", "first"), echo("c2", "second"), echo("c3", "third")]);

        assert_eq!(dispatcher.dispatch(&mut state).await.unwrap(), 3);

        let results: Vec<(String, String)> = state.history.messages()[2..]
            .iter()
            .map(|m| match m {
                Message::Tool { tool_call_id, content } => (tool_call_id.clone(), content.clone()),
                other => panic!("expected tool result, got {:?}", other),
            })
            .collect();
        assert_eq!(
            results,
            vec![
                ("c1".to_string(), "first".to_string()),
                ("c2".to_string(), "second".to_string()),
                ("c3".to_string(), "third".to_string()),
            ]
        );
    }

    #[tokio::test]
    async fn test_tool_errors_become_text() {
        let registry = registry();
        let dispatcher = ToolDispatcher::new(&registry, Duration::from_secs(5));
        let mut state = state_with_calls(vec![
            echo("c1", "fail"),
            ToolCall::new("c2", "echo", serde_json::json!({})),
        ]);

        dispatcher.dispatch(&mut state).await.unwrap();

        assert_eq!(state.history.messages()[2].content(), "Error: Tool execution error: boom");
        assert!(state.history.messages()[3].content().contains("Missing required parameter: x"));
    }

    #[tokio::test(start_paused = true)]
    async fn test_hung_tool_is_time_boxed() {
        let registry = registry();
        let dispatcher = ToolDispatcher::new(&registry, Duration::from_secs(60));
        let mut state = state_with_calls(vec![echo("c1", "hang"), echo("c2", "after")]);

        dispatcher.dispatch(&mut state).await.unwrap();

        assert!(state.history.messages()[2].content().contains("timed out"));
        assert_eq!(state.history.messages()[3].content(), "after");
    }

    #[tokio::test]
    async fn test_unknown_tool_appends_nothing() {
        let registry = registry();
        let dispatcher = ToolDispatcher::new(&registry, Duration::from_secs(5));
        let mut state = state_with_calls(vec![
            echo("c1", "would run"),
            ToolCall::new("c2", "launch_rocket", serde_json::json!({})),
        ]);

        let err = dispatcher.dispatch(&mut state).await.unwrap_err();

        assert!(matches!(err, AgentError::ToolNotFound(name) if name == "launch_rocket"));
        assert_eq!(state.history.len(), 2);
        assert!(matches!(state.history.last(), Some(Message::Assistant(_))));
    }

    #[tokio::test]
    async fn test_requires_pending_calls() {
        let registry = registry();
        let dispatcher = ToolDispatcher::new(&registry, Duration::from_secs(5));
        let mut state = SessionState::new();
        state.history.push(Message::assistant("done")).unwrap();

        assert!(matches!(
            dispatcher.dispatch(&mut state).await,
            Err(AgentError::InvalidModelResponse(_))
        ));
    }
}
