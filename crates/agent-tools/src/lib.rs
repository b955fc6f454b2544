//! # agent-tools
//!
//! The tool kit offered to the agent: arithmetic, list formatting, file
//! readers, csv tables, a Python code runner, answer-style web search, and a page
//! fetcher that lives behind a shared web session.
//!
//! Local tools are plain values. The page fetcher comes from
//! [`web::WebToolSource`], which the tool box loads on first use and shuts
//! down with the process.

pub mod error;
pub mod search;
pub mod svckit;
pub mod web;

use std::sync::Arc;

use agent_core::Tool;

pub use error::{Result, ToolkitError};
pub use search::{client_from_lookup, SearchClient};
pub use web::{WebConfig, WebToolSource};

/// Re-export tools for easy registration
pub mod tools {
    pub use crate::svckit::{
        ArithmeticTool, CodeExecutorTool, HandleJsonTool, HandleTextTool, Operation, QueryTableTool, ReadTableTool,
        SortItemsTool, WebSearchTool,
    };
    pub use crate::web::FetchPageTool;
}

/// Every local tool, with web search routed through `search`
pub fn local_tools(search: Arc<dyn SearchClient>) -> Vec<Arc<dyn Tool>> {
    let mut tools: Vec<Arc<dyn Tool>> = svckit::ArithmeticTool::all()
        .into_iter()
        .map(|tool| Arc::new(tool) as Arc<dyn Tool>)
        .collect();
    tools.push(Arc::new(svckit::SortItemsTool));
    tools.push(Arc::new(svckit::HandleTextTool));
    tools.push(Arc::new(svckit::HandleJsonTool));
    tools.push(Arc::new(svckit::ReadTableTool));
    tools.push(Arc::new(svckit::QueryTableTool));
    tools.push(Arc::new(svckit::CodeExecutorTool::default()));
    tools.push(Arc::new(svckit::WebSearchTool::new(search)));
    tools
}
