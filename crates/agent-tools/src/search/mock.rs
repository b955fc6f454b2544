//! Mock Search Client
//!
//! For testing and demo purposes. Answers from a fixed table.

use std::collections::HashMap;

use async_trait::async_trait;

use super::{SearchAnswer, SearchClient};
use crate::error::Result;

#[derive(Default)]
pub struct MockSearchClient {
    answers: HashMap<String, String>,
}

impl MockSearchClient {
    pub fn new() -> Self {
        Self::default()
    }

    /// Answer `query` (case-insensitive) with `answer`
    pub fn with_answer(mut self, query: &str, answer: &str) -> Self {
        self.answers.insert(query.to_lowercase(), answer.to_string());
        self
    }
}

#[async_trait]
impl SearchClient for MockSearchClient {
    async fn search(&self, query: &str, _max_results: usize) -> Result<SearchAnswer> {
        Ok(SearchAnswer {
            answer: self.answers.get(&query.to_lowercase()).cloned(),
            hits: Vec::new(),
        })
    }

    fn name(&self) -> &str {
        "mock"
    }
}
