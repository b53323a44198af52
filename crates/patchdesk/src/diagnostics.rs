//! Form schema diagnostics: duplicate and badly formed field names.
//!
//! A field is any object whose `component` and `name` members are both
//! truthy: not null, `false`, `0` or the empty string.

use indexmap::IndexMap;
use patchdesk_json_path::{JsonPath, JsonPathEval, JsonPathParser, ParseError};
use regex::Regex;
use serde::Serialize;
use serde_json::Value;
use tracing::debug;

/// Query selecting every field object in a schema.
pub const FIELD_QUERY: &str = "$..[*][?(@.component && @.name)]";

/// Default rule for field names: an identifier.
pub const DEFAULT_FIELD_NAME_PATTERN: &str = "^[a-zA-Z_][a-zA-Z0-9_]*$";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FieldInfo {
    pub name: String,
    pub component: String,
    pub pointer: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DiagnosticIssue {
    pub paths: Vec<String>,
    /// Component of the first field seen with this name.
    pub component: String,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Diagnostics {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub duplicated_names: Option<IndexMap<String, DiagnosticIssue>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub invalid_names: Option<IndexMap<String, DiagnosticIssue>>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DiagnosticSummary {
    pub total_issues: usize,
    pub duplicate_count: usize,
    pub invalid_count: usize,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(untagged)]
pub enum DiagnosticOutcome {
    Report {
        success: bool,
        diagnostics: Diagnostics,
        summary: DiagnosticSummary,
    },
    Failed {
        success: bool,
        #[serde(rename = "jsonError")]
        json_error: String,
        file_path: String,
    },
}

impl DiagnosticOutcome {
    pub fn is_success(&self) -> bool {
        matches!(self, DiagnosticOutcome::Report { .. })
    }
}

/// Checks field names against a configurable pattern.
#[derive(Debug, Clone)]
pub struct SchemaDiagnoser {
    field_query: JsonPath,
    name_pattern: Regex,
}

fn is_truthy(v: &Value) -> bool {
    match v {
        Value::Null => false,
        Value::Bool(b) => *b,
        Value::Number(n) => n.as_f64().is_some_and(|f| f != 0.0),
        Value::String(s) => !s.is_empty(),
        Value::Array(_) | Value::Object(_) => true,
    }
}

fn as_label(v: &Value) -> String {
    match v {
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}

impl SchemaDiagnoser {
    pub fn new(name_pattern: Regex) -> Result<Self, ParseError> {
        Ok(Self { field_query: JsonPathParser::parse(FIELD_QUERY)?, name_pattern })
    }

    pub fn is_valid_field_name(&self, name: &str) -> bool {
        !name.is_empty() && self.name_pattern.is_match(name)
    }

    pub fn extract_fields(&self, doc: &Value) -> Vec<FieldInfo> {
        JsonPathEval::eval_matches(&self.field_query, doc)
            .into_iter()
            .filter_map(|m| {
                let obj = m.value.as_object()?;
                let name = obj.get("name").filter(|v| is_truthy(v))?;
                let component = obj.get("component").filter(|v| is_truthy(v))?;
                Some(FieldInfo {
                    name: as_label(name),
                    component: as_label(component),
                    pointer: m.pointer(),
                })
            })
            .collect()
    }

    /// Diagnose a parsed document.
    pub fn diagnose(&self, doc: &Value) -> (Diagnostics, DiagnosticSummary) {
        let fields = self.extract_fields(doc);

        let mut groups: IndexMap<&str, Vec<&FieldInfo>> = IndexMap::new();
        for field in &fields {
            groups.entry(field.name.as_str()).or_default().push(field);
        }

        let issue = |group: &[&FieldInfo]| DiagnosticIssue {
            paths: group.iter().map(|f| f.pointer.clone()).collect(),
            component: group[0].component.clone(),
        };
        let duplicated: IndexMap<String, DiagnosticIssue> = groups
            .iter()
            .filter(|(_, group)| group.len() > 1)
            .map(|(name, group)| (name.to_string(), issue(group.as_slice())))
            .collect();
        let invalid: IndexMap<String, DiagnosticIssue> = groups
            .iter()
            .filter(|(name, _)| !self.is_valid_field_name(name))
            .map(|(name, group)| (name.to_string(), issue(group.as_slice())))
            .collect();

        let summary = DiagnosticSummary {
            total_issues: duplicated.len() + invalid.len(),
            duplicate_count: duplicated.len(),
            invalid_count: invalid.len(),
        };
        debug!(fields = fields.len(), issues = summary.total_issues, "diagnosed form schema");
        let diagnostics = Diagnostics {
            duplicated_names: (!duplicated.is_empty()).then_some(duplicated),
            invalid_names: (!invalid.is_empty()).then_some(invalid),
        };
        (diagnostics, summary)
    }

    /// Diagnose document text, reporting parse failures in the outcome.
    pub fn diagnose_text(&self, text: &str, file_path: &str) -> DiagnosticOutcome {
        match serde_json::from_str::<Value>(text) {
            Ok(doc) => {
                let (diagnostics, summary) = self.diagnose(&doc);
                DiagnosticOutcome::Report { success: true, diagnostics, summary }
            }
            Err(err) => DiagnosticOutcome::Failed {
                success: false,
                json_error: err.to_string(),
                file_path: file_path.to_string(),
            },
        }
    }
}
