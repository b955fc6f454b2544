//! Code Executor Tool
//!
//! Runs model-written Python in a subprocess with a hard timeout.

use std::process::Stdio;
use std::time::Duration;

use async_trait::async_trait;
use tokio::process::Command;

use agent_core::{tool::ParameterSchema, Result as CoreResult, Tool, ToolCall, ToolResult, ToolSchema};

/// Configuration for the code executor
#[derive(Clone, Debug)]
pub struct CodeExecutorConfig {
    /// Interpreter binary
    pub program: String,
    /// Flag that makes the interpreter take code as an argument
    pub code_flag: String,
    pub timeout: Duration,
}

impl Default for CodeExecutorConfig {
    fn default() -> Self {
        Self {
            program: "python3".into(),
            code_flag: "-c".into(),
            timeout: Duration::from_secs(5),
        }
    }
}

pub struct CodeExecutorTool {
    config: CodeExecutorConfig,
}

impl Default for CodeExecutorTool {
    fn default() -> Self {
        Self::new(CodeExecutorConfig::default())
    }
}

impl CodeExecutorTool {
    pub fn new(config: CodeExecutorConfig) -> Self {
        Self { config }
    }
}

#[async_trait]
impl Tool for CodeExecutorTool {
    fn schema(&self) -> ToolSchema {
        ToolSchema {
            name: "code_executor".into(),
            description: "Run Python code and return what it prints. Use print() for any value you need back.".into(),
            parameters: vec![ParameterSchema::required(
                "src_code",
                "string",
                "Python source code, with normal line breaks and indentation",
            )],
            category: Some("code".into()),
            has_side_effects: true,
        }
    }

    async fn execute(&self, call: &ToolCall) -> CoreResult<ToolResult> {
        let code = call.str_arg("src_code").unwrap_or_default();

        let mut cmd = Command::new(&self.config.program);
        cmd.arg(&self.config.code_flag)
            .arg(code)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true);

        tracing::debug!(program = %self.config.program, bytes = code.len(), "Running code");

        let output = match tokio::time::timeout(self.config.timeout, cmd.output()).await {
            Ok(Ok(output)) => output,
            Ok(Err(e)) => return Ok(ToolResult::failure("code_executor", format!("Execution failed: {}", e))),
            Err(_) => {
                return Ok(ToolResult::failure(
                    "code_executor",
                    format!("Execution timed out after {}s", self.config.timeout.as_secs()),
                ))
            }
        };

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            return Ok(ToolResult::failure("code_executor", stderr.trim()));
        }

        let stdout = String::from_utf8_lossy(&output.stdout);
        let stdout = stdout.trim();
        let text = if stdout.is_empty() {
            "Code Executed with no output."
        } else {
            stdout
        };
        Ok(ToolResult::success("code_executor", text))
    }
}
