//! List formatting tool

use async_trait::async_trait;

use agent_core::{tool::ParameterSchema, Result as CoreResult, Tool, ToolCall, ToolResult, ToolSchema};

/// Alphabetize items by their first word and join them with ", "
pub fn sort_items_and_format<S: AsRef<str>>(items: &[S]) -> String {
    let mut sorted: Vec<&str> = items.iter().map(AsRef::as_ref).collect();
    sorted.sort_by_cached_key(|item| item.split_whitespace().next().unwrap_or("").to_lowercase());
    sorted.join(", ")
}

pub struct SortItemsTool;

#[async_trait]
impl Tool for SortItemsTool {
    fn schema(&self) -> ToolSchema {
        ToolSchema {
            name: "sort_items_and_format".into(),
            description: "Alphabetize a list of words or phrases and return them as one comma-separated line.".into(),
            parameters: vec![ParameterSchema::required("items", "array", "Words to be sorted")],
            category: Some("text".into()),
            has_side_effects: false,
        }
    }

    async fn execute(&self, call: &ToolCall) -> CoreResult<ToolResult> {
        let items: Vec<String> = match call.arguments.get("items") {
            Some(serde_json::Value::Array(values)) => values
                .iter()
                .map(|v| match v {
                    serde_json::Value::String(s) => s.clone(),
                    other => other.to_string(),
                })
                .collect(),
            // a single comma-separated string is accepted too
            Some(serde_json::Value::String(joined)) => joined
                .split(',')
                .map(str::trim)
                .filter(|s| !s.is_empty())
                .map(String::from)
                .collect(),
            _ => return Ok(ToolResult::failure("sort_items_and_format", "'items' must be a list of strings")),
        };

        Ok(ToolResult::success("sort_items_and_format", sort_items_and_format(&items)))
    }
}
