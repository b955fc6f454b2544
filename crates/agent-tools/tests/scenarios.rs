//! End-to-end loop runs with the calculator tools and a scripted model.

use std::sync::Arc;

use serde_json::json;

use agent_core::testing::{Scripted, ScriptedProvider};
use agent_core::{Agent, AgentError, Message, PromptAssets, SessionState, Tool, ToolCall};
use agent_tools::tools::ArithmeticTool;

fn calculator_agent(provider: Arc<ScriptedProvider>) -> Agent {
    Agent::builder()
        .provider(provider)
        .tools(ArithmeticTool::all().into_iter().map(|t| Arc::new(t) as Arc<dyn Tool>))
        .prompts(PromptAssets::inline(
            "You are a general AI assistant. Use tools for arithmetic.",
            "Answer with only the final number.",
        ))
        .build()
        .unwrap()
}

fn tool_outputs(state: &SessionState) -> Vec<String> {
    state
        .history
        .messages()
        .iter()
        .filter(|m| matches!(m, Message::Tool { .. }))
        .map(|m| m.content().to_string())
        .collect()
}

#[tokio::test]
async fn test_single_division() {
    let provider = Arc::new(ScriptedProvider::new(vec![
        Scripted::call("c1", "divide", json!({"a": 12.2, "b": 0.5})),
        Scripted::answer("12.2 divided by 0.5 is 24.4"),
        Scripted::answer("24.4"),
    ]));
    let agent = calculator_agent(provider.clone());
    let mut state = SessionState::new();

    let answer = agent.run(&mut state, "What is 12.2 divided by 0.5?").await.unwrap();

    assert_eq!(answer, "24.4");
    assert_eq!(tool_outputs(&state), vec!["24.4"]);
    assert_eq!(provider.call_count(), 3);
    assert_eq!(provider.offered_tools()[0], vec!["divide", "multiply", "subtract", "sum"]);
}

#[tokio::test]
async fn test_chained_operations() {
    let provider = Arc::new(ScriptedProvider::new(vec![
        Scripted::reply(Message::assistant_with_calls(
            "",
            vec![
                ToolCall::new("c1", "multiply", json!({"a": 12, "b": 3})),
                ToolCall::new("c2", "divide", json!({"a": 15, "b": 5})),
            ],
        )),
        Scripted::call("c3", "sum", json!({"a": 36, "b": 10})),
        Scripted::call("c4", "subtract", json!({"a": 46, "b": 3})),
        Scripted::answer("The result is 43.0"),
        Scripted::answer("43.0"),
    ]));
    let agent = calculator_agent(provider.clone());
    let mut state = SessionState::new();

    let answer = agent
        .run(&mut state, "Multiply 12 by 3, add 10, then subtract 15 divided by 5")
        .await
        .unwrap();

    assert_eq!(answer, "43.0");
    assert_eq!(state.iteration, 3);
    assert_eq!(tool_outputs(&state), vec!["36.0", "3.0", "46.0", "43.0"]);
    assert_eq!(provider.call_count(), 5);
}

#[tokio::test]
async fn test_model_that_never_stops_calling_tools() {
    let provider = Arc::new(
        ScriptedProvider::new(Vec::new()).then_repeat(Scripted::call("c1", "sum", json!({"a": 1, "b": 1}))),
    );
    let agent = calculator_agent(provider.clone());
    let mut state = SessionState::new();

    // the verify pass is handed the unanswered tool request and gets one back too
    let answer = agent.run(&mut state, "Keep adding").await.unwrap();

    assert_eq!(answer, "");
    assert_eq!(state.iteration, 8);
    assert_eq!(tool_outputs(&state).len(), 7);
    let last = state.history.last().and_then(Message::as_assistant).unwrap();
    assert!(!last.has_tool_calls());
    assert_eq!(provider.call_count(), 9);
}

#[tokio::test]
async fn test_budget_exhaustion_then_formatted_answer() {
    let mut script: Vec<Scripted> = (0..8)
        .map(|i| Scripted::call(&format!("c{}", i), "sum", json!({"a": i, "b": 1})))
        .collect();
    script.push(Scripted::answer("8.0"));
    let provider = Arc::new(ScriptedProvider::new(script));
    let agent = calculator_agent(provider.clone());
    let mut state = SessionState::new();

    let answer = agent.run(&mut state, "Count up").await.unwrap();

    assert_eq!(answer, "8.0");
    assert_eq!(state.iteration, 8);
    assert_eq!(tool_outputs(&state).len(), 7);
    assert_eq!(provider.call_count(), 9);
}

#[tokio::test]
async fn test_unknown_tool_fails_the_invocation() {
    let provider = Arc::new(ScriptedProvider::new(vec![Scripted::call(
        "c1",
        "square_root",
        json!({"a": 16}),
    )]));
    let agent = calculator_agent(provider);
    let mut state = SessionState::new();

    let err = agent.run(&mut state, "What is the square root of 16?").await.unwrap_err();

    assert!(matches!(err, AgentError::ToolNotFound(name) if name == "square_root"));
    assert!(matches!(state.history.last(), Some(Message::Assistant(_))));
    assert!(tool_outputs(&state).is_empty());
}

#[tokio::test]
async fn test_division_by_zero_is_reported_to_the_model() {
    let provider = Arc::new(ScriptedProvider::new(vec![
        Scripted::call("c1", "divide", json!({"a": 1, "b": 0})),
        Scripted::answer("That division is undefined."),
        Scripted::answer("undefined"),
    ]));
    let agent = calculator_agent(provider);
    let mut state = SessionState::new();

    let answer = agent.run(&mut state, "What is 1 divided by 0?").await.unwrap();

    assert_eq!(answer, "undefined");
    assert_eq!(tool_outputs(&state), vec!["Error: Cannot divide by zero"]);
}

#[tokio::test]
async fn test_parenthesized_expression_one_tool_per_turn() {
    let provider = Arc::new(ScriptedProvider::new(vec![
        Scripted::call("c1", "multiply", json!({"a": 12, "b": 3})),
        Scripted::call("c2", "divide", json!({"a": 15, "b": 5})),
        Scripted::call("c3", "subtract", json!({"a": 36, "b": 3})),
        Scripted::call("c4", "sum", json!({"a": 33, "b": 10})),
        Scripted::answer("(12*3) - (15/5) + (8+2) = 43.0"),
        Scripted::answer("43.0"),
    ]));
    let agent = calculator_agent(provider.clone());
    let mut state = SessionState::new();

    let answer = agent.run(&mut state, "Calculate (12*3) - (15/5) + (8+2)").await.unwrap();

    assert_eq!(answer, "43.0");
    assert_eq!(state.iteration, 4);
    assert_eq!(tool_outputs(&state), vec!["36.0", "3.0", "33.0", "43.0"]);
    assert_eq!(provider.call_count(), 6);
    let verify = provider.requests().pop().unwrap();
    assert_eq!(verify.len(), 1);
    assert!(verify[0].content().contains("Calculate (12*3) - (15/5) + (8+2)"));
}

#[tokio::test]
async fn test_same_state_answers_two_questions() {
    let provider = Arc::new(ScriptedProvider::new(vec![
        Scripted::call("c1", "divide", json!({"a": 12.2, "b": 0.5})),
        Scripted::answer("24.4"),
        Scripted::answer("24.4"),
        Scripted::call("c2", "multiply", json!({"a": 24.4, "b": 2})),
        Scripted::answer("48.8"),
        Scripted::answer("48.8"),
    ]));
    let agent = calculator_agent(provider.clone());
    let mut state = SessionState::new();

    assert_eq!(agent.run(&mut state, "What is 12.2 divided by 0.5?").await.unwrap(), "24.4");
    let answer = agent.run(&mut state, "Now double it").await.unwrap();

    assert_eq!(answer, "48.8");
    assert_eq!(state.iteration, 1);
    assert_eq!(tool_outputs(&state), vec!["24.4", "48.8"]);
    assert_eq!(provider.call_count(), 6);
}
