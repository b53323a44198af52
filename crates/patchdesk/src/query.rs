//! JSONPath queries over a document, shaped for the query tool.

use std::time::Instant;

use indexmap::IndexMap;
use patchdesk_json_path::{JsonPathEval, JsonPathParser};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::debug;

/// Appended to parse errors so the assistant retries with a fixed query.
pub const RETRY_HINT: &str = " Call this again with correct query";

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct QuerySpec {
    pub query: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub include_values: bool,
}

impl QuerySpec {
    pub fn new(query: impl Into<String>) -> Self {
        Self { query: query.into(), description: String::new(), include_values: false }
    }

    pub fn with_values(mut self) -> Self {
        self.include_values = true;
        self
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct QueryResult {
    pub query: String,
    pub description: String,
    pub include_values: bool,
    pub success: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    /// Matched locations as JSON Pointers. Values are `null` unless the
    /// query asked for them.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub matches: Option<IndexMap<String, Value>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub execution_time: Option<String>,
}

impl QueryResult {
    pub fn match_count(&self) -> usize {
        self.matches.as_ref().map_or(0, IndexMap::len)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct QuerySummary {
    pub total_queries: usize,
    pub successful_queries: usize,
    pub total_matches: usize,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct JsonPathResult {
    pub success: bool,
    pub file_path: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    pub queries: Vec<QueryResult>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub summary: Option<QuerySummary>,
}

impl JsonPathResult {
    pub fn failed(file_path: impl Into<String>, error: impl Into<String>) -> Self {
        Self { success: false, file_path: file_path.into(), error: Some(error.into()), queries: Vec::new(), summary: None }
    }
}

/// Run one query. Parse failures are reported in the result, not raised.
pub fn execute_query(doc: &Value, spec: &QuerySpec) -> QueryResult {
    let started = Instant::now();
    let mut result = QueryResult {
        query: spec.query.clone(),
        description: spec.description.clone(),
        include_values: spec.include_values,
        success: false,
        error: None,
        matches: None,
        execution_time: None,
    };

    let path = match JsonPathParser::parse(&spec.query) {
        Ok(path) => path,
        Err(err) => {
            debug!(query = %spec.query, error = %err, "query did not parse");
            result.error = Some(format!("{err}{RETRY_HINT}"));
            return result;
        }
    };

    let matches: IndexMap<String, Value> = JsonPathEval::eval_matches(&path, doc)
        .into_iter()
        .map(|m| {
            let value = if spec.include_values { m.value.clone() } else { Value::Null };
            (m.pointer(), value)
        })
        .collect();

    result.success = true;
    result.matches = Some(matches);
    result.execution_time = Some(format!("{}ms", started.elapsed().as_millis()));
    result
}

/// Run every query against one document.
pub fn run_queries(file_path: impl Into<String>, doc: &Value, specs: &[QuerySpec]) -> JsonPathResult {
    let queries: Vec<QueryResult> = specs.iter().map(|spec| execute_query(doc, spec)).collect();
    let summary = QuerySummary {
        total_queries: queries.len(),
        successful_queries: queries.iter().filter(|q| q.success).count(),
        total_matches: queries.iter().map(QueryResult::match_count).sum(),
    };
    JsonPathResult { success: true, file_path: file_path.into(), error: None, queries, summary: Some(summary) }
}
