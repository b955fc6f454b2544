//! Web Search Tool

use std::sync::Arc;

use async_trait::async_trait;

use agent_core::{tool::ParameterSchema, Result as CoreResult, Tool, ToolCall, ToolResult, ToolSchema};

use crate::search::SearchClient;

const DEFAULT_MAX_RESULTS: usize = 4;

/// Tool returning the search backend's synthesized answer
pub struct WebSearchTool {
    client: Arc<dyn SearchClient>,
}

impl WebSearchTool {
    pub fn new(client: Arc<dyn SearchClient>) -> Self {
        Self { client }
    }
}

#[async_trait]
impl Tool for WebSearchTool {
    fn schema(&self) -> ToolSchema {
        ToolSchema {
            name: "web_search".into(),
            description: "Run a web search to find information on the internet. Returns a short answer.".into(),
            parameters: vec![
                ParameterSchema::required("query", "string", "Question to find out about"),
                ParameterSchema::optional("max_results", "integer", "Top search results allowed")
                    .with_default(serde_json::json!(DEFAULT_MAX_RESULTS)),
            ],
            category: Some("search".into()),
            has_side_effects: false,
        }
    }

    async fn execute(&self, call: &ToolCall) -> CoreResult<ToolResult> {
        let query = call.str_arg("query").unwrap_or_default().trim();
        if query.is_empty() {
            return Ok(ToolResult::failure("web_search", "query must not be empty"));
        }
        let max_results = call
            .number_arg("max_results")
            .filter(|n| *n >= 1.0)
            .map_or(DEFAULT_MAX_RESULTS, |n| n as usize);

        match self.client.search(query, max_results).await {
            Ok(found) => {
                let text = found.answer.clone().unwrap_or_else(|| "No answers found.".into());
                let data = serde_json::to_value(&found)?;
                Ok(ToolResult::success("web_search", text).with_data(data))
            }
            Err(e) => {
                tracing::warn!(backend = self.client.name(), error = %e, "Web search failed");
                Ok(ToolResult::failure("web_search", e.to_string()))
            }
        }
    }
}
