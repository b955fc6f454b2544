//! Table Tools
//!
//! `read_table` loads a .csv file and shows it to the model as a markdown
//! table. `query_table` filters the rows of a .csv file with a small
//! comparison language (`accuracy > 0.1 and model == "llama"`) and can
//! narrow the columns.

use std::cmp::Ordering;

use async_trait::async_trait;
use serde::Serialize;

use agent_core::{tool::ParameterSchema, Result as CoreResult, Tool, ToolCall, ToolResult, ToolSchema};

use super::files::check_extension;
use crate::error::{Result, ToolkitError};

/// Rows shown to the model before the rendering is cut short
const MAX_RENDERED_ROWS: usize = 50;

#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct Table {
    pub columns: Vec<String>,
    pub rows: Vec<Vec<String>>,
}

impl Table {
    pub fn parse(raw: &[u8]) -> Result<Self> {
        let mut reader = csv::ReaderBuilder::new().trim(csv::Trim::All).from_reader(raw);
        let columns = reader.headers()?.iter().map(str::to_string).collect();
        let rows = reader
            .records()
            .map(|record| record.map(|r| r.iter().map(str::to_string).collect()))
            .collect::<std::result::Result<Vec<Vec<String>>, _>>()?;
        Ok(Self { columns, rows })
    }

    pub fn shape(&self) -> (usize, usize) {
        (self.rows.len(), self.columns.len())
    }

    fn column_index(&self, name: &str) -> Result<usize> {
        self.columns
            .iter()
            .position(|c| c == name)
            .ok_or_else(|| ToolkitError::Query(format!("unknown column '{}'", name)))
    }

    /// Keep the rows matching every clause of `query`. An empty query keeps all rows.
    pub fn filter(&self, query: &str) -> Result<Self> {
        let clauses = parse_query(query)?
            .into_iter()
            .map(|clause| Ok((self.column_index(&clause.column)?, clause)))
            .collect::<Result<Vec<_>>>()?;

        let rows = self
            .rows
            .iter()
            .filter(|row| {
                clauses
                    .iter()
                    .all(|(idx, clause)| row.get(*idx).is_some_and(|cell| clause.matches(cell)))
            })
            .cloned()
            .collect();
        Ok(Self {
            columns: self.columns.clone(),
            rows,
        })
    }

    /// Narrow the table to `names`, in the order given
    pub fn select(&self, names: &[&str]) -> Result<Self> {
        let indices = names
            .iter()
            .map(|name| self.column_index(name))
            .collect::<Result<Vec<_>>>()?;
        Ok(Self {
            columns: indices.iter().map(|&i| self.columns[i].clone()).collect(),
            rows: self
                .rows
                .iter()
                .map(|row| indices.iter().map(|&i| row.get(i).cloned().unwrap_or_default()).collect())
                .collect(),
        })
    }

    pub fn to_markdown(&self) -> String {
        let (rows, cols) = self.shape();
        let mut out = format!("shape: ({}, {})\n", rows, cols);
        out.push_str(&format!("| {} |\n", self.columns.join(" | ")));
        out.push_str(&format!("|{}\n", " --- |".repeat(cols)));
        for row in self.rows.iter().take(MAX_RENDERED_ROWS) {
            out.push_str(&format!("| {} |\n", row.join(" | ")));
        }
        if rows > MAX_RENDERED_ROWS {
            out.push_str(&format!("... {} more rows\n", rows - MAX_RENDERED_ROWS));
        }
        out.trim_end().to_string()
    }
}

#[derive(Clone, Copy, Debug, PartialEq)]
enum Comparison {
    Eq,
    Ne,
    Gt,
    Ge,
    Lt,
    Le,
}

impl Comparison {
    const OPERATORS: [(&'static str, Comparison); 6] = [
        (">=", Comparison::Ge),
        ("<=", Comparison::Le),
        ("==", Comparison::Eq),
        ("!=", Comparison::Ne),
        (">", Comparison::Gt),
        ("<", Comparison::Lt),
    ];

    fn accepts(self, ordering: Ordering) -> bool {
        match self {
            Comparison::Eq => ordering == Ordering::Equal,
            Comparison::Ne => ordering != Ordering::Equal,
            Comparison::Gt => ordering == Ordering::Greater,
            Comparison::Ge => ordering != Ordering::Less,
            Comparison::Lt => ordering == Ordering::Less,
            Comparison::Le => ordering != Ordering::Greater,
        }
    }
}

#[derive(Clone, Debug, PartialEq)]
struct Clause {
    column: String,
    op: Comparison,
    value: String,
}

impl Clause {
    fn matches(&self, cell: &str) -> bool {
        let ordering = match (cell.parse::<f64>(), self.value.parse::<f64>()) {
            (Ok(a), Ok(b)) => match a.partial_cmp(&b) {
                Some(ordering) => ordering,
                None => return false,
            },
            _ => cell.cmp(self.value.as_str()),
        };
        self.op.accepts(ordering)
    }
}

fn parse_clause(text: &str) -> Result<Clause> {
    let (at, symbol, op) = Comparison::OPERATORS
        .iter()
        .filter_map(|(symbol, op)| text.find(symbol).map(|at| (at, *symbol, *op)))
        // leftmost operator, preferring ">=" over ">" at the same spot
        .min_by_key(|(at, symbol, _)| (*at, std::cmp::Reverse(symbol.len())))
        .ok_or_else(|| ToolkitError::Query(format!("no comparison in '{}'", text)))?;

    let column = text[..at].trim().trim_matches('`').to_string();
    let value = text[at + symbol.len()..].trim().trim_matches(['"', '\'']).to_string();
    if column.is_empty() {
        return Err(ToolkitError::Query(format!("missing column in '{}'", text)));
    }
    Ok(Clause { column, op, value })
}

fn parse_query(query: &str) -> Result<Vec<Clause>> {
    if query.trim().is_empty() {
        return Ok(Vec::new());
    }
    query.split(" and ").map(parse_clause).collect()
}

pub async fn read_table(path: &str) -> Result<Table> {
    check_extension(path, "csv")?;
    let raw = tokio::fs::read(path).await?;
    Table::parse(&raw)
}

fn table_result(name: &str, table: &Table) -> CoreResult<ToolResult> {
    let data = serde_json::to_value(table)?;
    Ok(ToolResult::success(name, table.to_markdown()).with_data(data))
}

pub struct ReadTableTool;

#[async_trait]
impl Tool for ReadTableTool {
    fn schema(&self) -> ToolSchema {
        ToolSchema {
            name: "read_table".into(),
            description: "Read a .csv file and return it as a table with its shape.".into(),
            parameters: vec![ParameterSchema::required(
                "file_path",
                "string",
                "Path to the file. It must have extension .csv",
            )],
            category: Some("files".into()),
            has_side_effects: false,
        }
    }

    async fn execute(&self, call: &ToolCall) -> CoreResult<ToolResult> {
        let path = call.str_arg("file_path").unwrap_or_default();
        match read_table(path).await {
            Ok(table) => table_result("read_table", &table),
            Err(e) => Ok(ToolResult::failure("read_table", e.to_string())),
        }
    }
}

pub struct QueryTableTool;

impl QueryTableTool {
    async fn run(path: &str, query: &str, columns: &str) -> Result<Table> {
        let table = read_table(path).await?.filter(query)?;
        let names: Vec<&str> = columns.split(',').map(str::trim).filter(|c| !c.is_empty()).collect();
        if names.is_empty() {
            Ok(table)
        } else {
            table.select(&names)
        }
    }
}

#[async_trait]
impl Tool for QueryTableTool {
    fn schema(&self) -> ToolSchema {
        ToolSchema {
            name: "query_table".into(),
            description: "Filter the rows of a .csv file and optionally keep only some columns. \
                          Conditions look like `accuracy > 0.1` and may be joined with `and`."
                .into(),
            parameters: vec![
                ParameterSchema::required("file_path", "string", "Path to the file. It must have extension .csv"),
                ParameterSchema::optional("query", "string", "Row conditions, e.g. `accuracy > 0.1 and model == llama`")
                    .with_default(serde_json::json!("")),
                ParameterSchema::optional("columns", "string", "Comma-separated columns to keep")
                    .with_default(serde_json::json!("")),
            ],
            category: Some("files".into()),
            has_side_effects: false,
        }
    }

    async fn execute(&self, call: &ToolCall) -> CoreResult<ToolResult> {
        let path = call.str_arg("file_path").unwrap_or_default();
        let query = call.str_arg("query").unwrap_or_default();
        let columns = call.str_arg("columns").unwrap_or_default();

        tracing::debug!(path = %path, query = %query, "Querying table");
        match Self::run(path, query, columns).await {
            Ok(table) => table_result("query_table", &table),
            Err(e) => Ok(ToolResult::failure("query_table", e.to_string())),
        }
    }
}
