//! Calculator Tools
//!
//! `sum`, `subtract`, `multiply` and `divide` over two numbers.

use async_trait::async_trait;

use agent_core::{tool::ParameterSchema, Result as CoreResult, Tool, ToolCall, ToolResult, ToolSchema};

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Operation {
    Sum,
    Subtract,
    Multiply,
    Divide,
}

impl Operation {
    pub const ALL: [Operation; 4] = [
        Operation::Sum,
        Operation::Subtract,
        Operation::Multiply,
        Operation::Divide,
    ];

    pub fn name(self) -> &'static str {
        match self {
            Operation::Sum => "sum",
            Operation::Subtract => "subtract",
            Operation::Multiply => "multiply",
            Operation::Divide => "divide",
        }
    }

    fn description(self) -> &'static str {
        match self {
            Operation::Sum => "Add b to a. Example: sum(3.0, 1.5) = 4.5",
            Operation::Subtract => "Subtract b from a. Example: subtract(3.0, 1.5) = 1.5",
            Operation::Multiply => "Multiply a by b. Example: multiply(3.0, 1.5) = 4.5",
            Operation::Divide => "Divide a by b. Example: divide(3.0, 1.5) = 2.0",
        }
    }

    /// `None` when the result is undefined
    pub fn apply(self, a: f64, b: f64) -> Option<f64> {
        match self {
            Operation::Sum => Some(a + b),
            Operation::Subtract => Some(a - b),
            Operation::Multiply => Some(a * b),
            Operation::Divide if b == 0.0 => None,
            Operation::Divide => Some(a / b),
        }
    }
}

/// Render a result the way a float prints: `24.4`, and `43.0` for integral values.
pub fn format_number(value: f64) -> String {
    if value.is_finite() && value.fract() == 0.0 && value.abs() < 1e16 {
        format!("{:.1}", value)
    } else {
        value.to_string()
    }
}

/// One arithmetic operation exposed as a tool
pub struct ArithmeticTool {
    op: Operation,
}

impl ArithmeticTool {
    pub fn new(op: Operation) -> Self {
        Self { op }
    }

    /// All four calculator tools
    pub fn all() -> Vec<ArithmeticTool> {
        Operation::ALL.into_iter().map(Self::new).collect()
    }
}

#[async_trait]
impl Tool for ArithmeticTool {
    fn schema(&self) -> ToolSchema {
        ToolSchema {
            name: self.op.name().into(),
            description: self.op.description().into(),
            parameters: vec![
                ParameterSchema::required("a", "number", "First operand"),
                ParameterSchema::required("b", "number", "Second operand"),
            ],
            category: Some("math".into()),
            has_side_effects: false,
        }
    }

    async fn execute(&self, call: &ToolCall) -> CoreResult<ToolResult> {
        let name = self.op.name();
        let (Some(a), Some(b)) = (call.number_arg("a"), call.number_arg("b")) else {
            return Ok(ToolResult::failure(name, "Both 'a' and 'b' must be numbers"));
        };

        Ok(match self.op.apply(a, b) {
            Some(value) => ToolResult::success(name, format_number(value)).with_data(serde_json::json!(value)),
            None => ToolResult::failure(name, "Cannot divide by zero"),
        })
    }
}
