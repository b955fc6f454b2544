//! Service Kit - Agent Tools
//!
//! Local tools that implement `agent_core::Tool`.

mod calculator;
mod code_executor;
mod files;
mod post_processing;
mod tables;
mod web_search;

pub use calculator::{format_number, ArithmeticTool, Operation};
pub use code_executor::{CodeExecutorConfig, CodeExecutorTool};
pub use files::{read_json, read_text, HandleJsonTool, HandleTextTool};
pub use post_processing::{sort_items_and_format, SortItemsTool};
pub use tables::{read_table, QueryTableTool, ReadTableTool, Table};
pub use web_search::WebSearchTool;
