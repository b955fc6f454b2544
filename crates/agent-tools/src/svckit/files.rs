//! File Reader Tools
//!
//! `handle_text` returns a .txt file verbatim; `handle_json` returns a .json
//! file re-serialized so the model sees normalized JSON.

use std::path::Path;

use async_trait::async_trait;

use agent_core::{tool::ParameterSchema, Result as CoreResult, Tool, ToolCall, ToolResult, ToolSchema};

use crate::error::{Result, ToolkitError};

pub(crate) fn check_extension(path: &str, expected: &'static str) -> Result<()> {
    let received = Path::new(path)
        .extension()
        .and_then(|e| e.to_str())
        .unwrap_or("")
        .to_ascii_lowercase();
    if received == expected {
        Ok(())
    } else {
        Err(ToolkitError::UnsupportedFile {
            path: path.to_string(),
            received,
            expected,
        })
    }
}

pub async fn read_text(path: &str) -> Result<String> {
    check_extension(path, "txt")?;
    Ok(tokio::fs::read_to_string(path).await?)
}

pub async fn read_json(path: &str) -> Result<serde_json::Value> {
    check_extension(path, "json")?;
    let raw = tokio::fs::read_to_string(path).await?;
    Ok(serde_json::from_str(&raw)?)
}

fn file_path_param(extension: &str) -> ParameterSchema {
    ParameterSchema::required(
        "file_path",
        "string",
        format!("Path to the file. It must have extension .{}", extension),
    )
}

pub struct HandleTextTool;

#[async_trait]
impl Tool for HandleTextTool {
    fn schema(&self) -> ToolSchema {
        ToolSchema {
            name: "handle_text".into(),
            description: "Read a .txt file and return its text.".into(),
            parameters: vec![file_path_param("txt")],
            category: Some("files".into()),
            has_side_effects: false,
        }
    }

    async fn execute(&self, call: &ToolCall) -> CoreResult<ToolResult> {
        let path = call.str_arg("file_path").unwrap_or_default();
        Ok(match read_text(path).await {
            Ok(text) => ToolResult::success("handle_text", text),
            Err(e) => ToolResult::failure("handle_text", e.to_string()),
        })
    }
}

pub struct HandleJsonTool;

#[async_trait]
impl Tool for HandleJsonTool {
    fn schema(&self) -> ToolSchema {
        ToolSchema {
            name: "handle_json".into(),
            description: "Read a .json file and return the parsed JSON object.".into(),
            parameters: vec![file_path_param("json")],
            category: Some("files".into()),
            has_side_effects: false,
        }
    }

    async fn execute(&self, call: &ToolCall) -> CoreResult<ToolResult> {
        let path = call.str_arg("file_path").unwrap_or_default();
        let value = match read_json(path).await {
            Ok(value) => value,
            Err(e) => return Ok(ToolResult::failure("handle_json", e.to_string())),
        };
        let text = serde_json::to_string(&value)?;
        Ok(ToolResult::success("handle_json", text).with_data(value))
    }
}
