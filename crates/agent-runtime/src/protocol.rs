//! Text Tool-Call Protocol
//!
//! For models without native function calling. Tools are described in the
//! system prompt and the model requests them with fenced blocks:
//!
//! ````text
//! ```tool
//! {"tool": "divide", "arguments": {"a": 12.2, "b": 0.5}}
//! ```
//! ````
//!
//! Several blocks in one reply become several calls, in order.

use agent_core::{
    error::{AgentError, Result},
    message::AssistantMessage,
    tool::{ToolCall, ToolSchema},
};
use serde::{Deserialize, Serialize};

const TOOL_FENCE: &str = "```tool";
const FENCE_END: &str = "```";

/// Prompt section describing the available tools and the request format
pub fn describe_tools(tools: &[ToolSchema]) -> String {
    let mut prompt = String::from("## Available Tools\n\n");
    prompt.push_str("You can use the following tools by responding with a JSON block:\n\n");
    prompt.push_str("```tool\n{\"tool\": \"tool_name\", \"arguments\": {\"arg\": \"value\"}}\n```\n\n");
    prompt.push_str("Use one block per tool call. Tool results arrive in the next user message.\n\n");

    for schema in tools {
        prompt.push_str(&format!("### {}\n", schema.name));
        prompt.push_str(&format!("{}\n", schema.description));

        if !schema.parameters.is_empty() {
            prompt.push_str("**Parameters:**\n");
            for param in &schema.parameters {
                let required = if param.required { " (required)" } else { "" };
                prompt.push_str(&format!(
                    "- `{}` ({}){}: {}\n",
                    param.name, param.param_type, required, param.description
                ));
            }
        }
        prompt.push('\n');
    }

    prompt
}

#[derive(Debug, Serialize, Deserialize)]
struct ToolBlock {
    #[serde(alias = "name")]
    tool: String,
    #[serde(default)]
    arguments: serde_json::Value,
}

/// Split a raw model reply into its text and the tool calls it requests.
///
/// A fenced block that is not a valid call makes the whole reply invalid.
pub fn parse_reply(content: &str) -> Result<AssistantMessage> {
    let mut text = String::new();
    let mut calls = Vec::new();
    let mut rest = content;

    while let Some(start) = rest.find(TOOL_FENCE) {
        text.push_str(&rest[..start]);
        let after_marker = &rest[start + TOOL_FENCE.len()..];
        let end = after_marker.find(FENCE_END).ok_or_else(|| {
            AgentError::InvalidModelResponse("unterminated ```tool block".into())
        })?;
        let block: ToolBlock = serde_json::from_str(after_marker[..end].trim())
            .map_err(|e| AgentError::InvalidModelResponse(format!("malformed tool block: {}", e)))?;
        calls.push(into_call(block, calls.len()));
        rest = &after_marker[end + FENCE_END.len()..];
    }
    text.push_str(rest);

    // Fallback: a bare JSON object with a "tool" key
    if calls.is_empty() {
        if let Some(block) = parse_inline(content) {
            calls.push(into_call(block, 0));
            text.clear();
        }
    }

    Ok(AssistantMessage {
        content: text.trim().to_string(),
        tool_calls: calls,
        model: None,
    })
}

fn parse_inline(content: &str) -> Option<ToolBlock> {
    let trimmed = content.trim();
    if !trimmed.starts_with('{') || !trimmed.contains(r#""tool""#) {
        return None;
    }
    serde_json::from_str(trimmed).ok()
}

fn into_call(block: ToolBlock, index: usize) -> ToolCall {
    let id = format!("call_{}_{}", index, uuid::Uuid::new_v4().simple());
    ToolCall::new(id, block.tool, block.arguments)
}

/// Render an assistant entry back into the text the model originally produced
pub fn render_assistant(reply: &AssistantMessage) -> String {
    let mut out = reply.content.clone();
    for call in &reply.tool_calls {
        let block = ToolBlock {
            tool: call.name.clone(),
            arguments: serde_json::Value::Object(call.arguments.clone().into_iter().collect()),
        };
        let json = serde_json::to_string(&block).unwrap_or_default();
        if !out.is_empty() {
            out.push('\n');
        }
        out.push_str(&format!("{}\n{}\n{}", TOOL_FENCE, json, FENCE_END));
    }
    out
}

/// Render a tool result as context for the next model turn
pub fn render_tool_result(tool_name: Option<&str>, content: &str) -> String {
    match tool_name {
        Some(name) => format!("[Tool '{}' returned]\n{}", name, content),
        None => format!("[Tool returned]\n{}", content),
    }
}
