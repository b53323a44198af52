//! Assistant-facing tool handlers.
//!
//! Each handler resolves the target file through [`EditorState`], runs the
//! JSON work, and folds every failure into a serializable response the
//! assistant can act on. Only [`json_repair`] writes to the editor.

use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::{info, warn};

use crate::config::Config;
use crate::diagnostics::DiagnosticOutcome;
use crate::document::NOT_VALID_JSON;
use crate::editor::{require_json_file, EditorState, ToolError};
use crate::json_patch::{OperationBatch, RawOperation};
use crate::query::{run_queries, JsonPathResult, QuerySpec};
use crate::repair::{repair_document, RepairError, RepairOutcome};
use crate::validate::validate_batch;

pub const OPEN_FILE_INSTRUCTION: &str = "Please use a file that is currently open in the editor.";
pub const JSON_FILE_INSTRUCTION: &str = "Only use JSON files for patch operations.";
pub const REPAIR_FIRST_INSTRUCTION: &str =
    "The document is not valid JSON. Repair it before suggesting patch operations.";
pub const SUGGESTED_INSTRUCTION: &str = "Your changes are suggested to user. User will apply this later";
pub const INVALID_JSON_CONTENT: &str = "Invalid JSON content";

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SuggestPatchArgs {
    pub file_path: String,
    pub description: String,
    pub operations: Vec<RawOperation>,
}

impl SuggestPatchArgs {
    /// Decode the wire operations into a batch a review session can open.
    pub fn batch(&self) -> OperationBatch {
        OperationBatch::from_raw(&self.file_path, &self.description, &self.operations)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ToolResponse {
    pub success: bool,
    pub errors: Vec<String>,
    pub instructions: String,
}

impl ToolResponse {
    fn failure(errors: Vec<String>, instructions: impl Into<String>) -> Self {
        Self { success: false, errors, instructions: instructions.into() }
    }
}

impl From<ToolError> for ToolResponse {
    fn from(err: ToolError) -> Self {
        let instructions = match err {
            ToolError::FileNotOpen(_) => OPEN_FILE_INSTRUCTION,
            ToolError::WrongFileType { .. } => JSON_FILE_INSTRUCTION,
        };
        ToolResponse::failure(vec![err.to_string()], instructions)
    }
}

/// `"Operations 2, 4 failed validation. ..."` for 0-based `failed`.
pub fn regenerate_instruction(failed: &[usize]) -> String {
    let list = failed.iter().map(|i| (i + 1).to_string()).collect::<Vec<_>>().join(", ");
    format!(
        "Operations {list} failed validation. Only regenerate these failed operations. \
         Do not include the successful operations."
    )
}

/// Validate a proposed batch against the open file.
///
/// On success the caller opens a review session from [`SuggestPatchArgs::batch`].
pub fn suggest_json_patch<E: EditorState + ?Sized>(
    editor: &E,
    args: &SuggestPatchArgs,
    config: &Config,
) -> ToolResponse {
    let file = match require_json_file(editor, &args.file_path, &config.editor.json_languages) {
        Ok(file) => file,
        Err(err) => {
            warn!(file = %args.file_path, error = %err, "patch suggestion rejected");
            return err.into();
        }
    };

    let validation = validate_batch(&file.content, &args.batch());
    if validation.document_error.is_some() {
        return ToolResponse::failure(vec![NOT_VALID_JSON.to_string()], REPAIR_FIRST_INSTRUCTION);
    }
    if !validation.overall_valid {
        let failed = validation.failed_indices();
        info!(file = %args.file_path, failed = failed.len(), "patch suggestion partially invalid");
        return ToolResponse::failure(validation.errors(), regenerate_instruction(&failed));
    }

    info!(file = %args.file_path, operations = args.operations.len(), "patch suggestion accepted");
    ToolResponse { success: true, errors: Vec::new(), instructions: SUGGESTED_INSTRUCTION.to_string() }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct QueryArgs {
    pub file_path: String,
    pub queries: Vec<QuerySpec>,
}

pub fn query_json_path<E: EditorState + ?Sized>(editor: &E, args: &QueryArgs, config: &Config) -> JsonPathResult {
    let file = match require_json_file(editor, &args.file_path, &config.editor.json_languages) {
        Ok(file) => file,
        Err(err) => return JsonPathResult::failed(&args.file_path, err.to_string()),
    };
    match serde_json::from_str::<Value>(&file.content) {
        Ok(doc) => run_queries(&args.file_path, &doc, &args.queries),
        Err(_) => JsonPathResult::failed(&args.file_path, INVALID_JSON_CONTENT),
    }
}

pub fn diagnose_form_schema<E: EditorState + ?Sized>(
    editor: &E,
    file_path: &str,
    config: &Config,
) -> DiagnosticOutcome {
    let failed = |json_error: String| DiagnosticOutcome::Failed {
        success: false,
        json_error,
        file_path: file_path.to_string(),
    };
    let file = match require_json_file(editor, file_path, &config.editor.json_languages) {
        Ok(file) => file,
        Err(err) => return failed(err.to_string()),
    };
    match config.diagnoser() {
        Ok(diagnoser) => diagnoser.diagnose_text(&file.content, file_path),
        Err(err) => failed(err.to_string()),
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RepairArgs {
    pub file_path: String,
    /// Full repair response carrying the `<edits>` block.
    pub response: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RepairToolResult {
    pub success: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub outcome: Option<RepairOutcome>,
}

impl RepairToolResult {
    fn failed(error: impl Into<String>) -> Self {
        Self { success: false, message: None, error: Some(error.into()), outcome: None }
    }
}

/// Repair the open file with a response from the repair model.
///
/// Succeeds only when the edits were written and the result parses. A file
/// that already parses is left alone and reported as a success.
pub fn json_repair<E: EditorState + ?Sized>(editor: &mut E, args: &RepairArgs, config: &Config) -> RepairToolResult {
    let outcome = match repair_document(editor, &args.file_path, &args.response, &config.editor.json_languages) {
        Ok(outcome) => outcome,
        Err(RepairError::AlreadyValid) => {
            return RepairToolResult {
                success: true,
                message: Some(RepairError::AlreadyValid.to_string()),
                error: None,
                outcome: None,
            };
        }
        Err(err) => {
            warn!(file = %args.file_path, error = %err, "repair rejected");
            return RepairToolResult::failed(err.to_string());
        }
    };

    let error = if !outcome.parse.success {
        Some(format!("Parse failed: {}", outcome.parse.errors.join(", ")))
    } else if let Some(apply) = outcome.apply.as_ref().filter(|apply| !apply.success) {
        Some(apply.errors.join(", "))
    } else {
        outcome.validation.error.clone()
    };
    RepairToolResult { success: error.is_none(), message: None, error, outcome: Some(outcome) }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::editor::{Language, Workspace};

    fn workspace() -> Workspace {
        let mut ws = Workspace::new();
        ws.open_file("form.json", r#"{"a":1,"fields":[{"component":"input","name":"a b"}]}"#);
        ws.open_file("notes.md", "# hi");
        ws.open_file("broken.json", "{");
        ws
    }

    fn args(path: &str, ops: Vec<RawOperation>) -> SuggestPatchArgs {
        SuggestPatchArgs { file_path: path.into(), description: "edit".into(), operations: ops }
    }

    #[test]
    fn file_not_open() {
        let res = suggest_json_patch(&workspace(), &args("nope.json", vec![]), &Config::default());
        assert!(!res.success);
        assert_eq!(res.errors, vec!["File \"nope.json\" is not currently open in the editor"]);
        assert_eq!(res.instructions, OPEN_FILE_INSTRUCTION);
    }

    #[test]
    fn wrong_file_type() {
        let res = suggest_json_patch(&workspace(), &args("notes.md", vec![]), &Config::default());
        assert_eq!(res.errors, vec!["File \"notes.md\" is not a JSON file (detected: markdown)"]);
        assert_eq!(res.instructions, JSON_FILE_INSTRUCTION);
    }

    #[test]
    fn broken_document() {
        let ops = vec![RawOperation::new("add", "/x").with_value("1")];
        let res = suggest_json_patch(&workspace(), &args("broken.json", ops), &Config::default());
        assert_eq!(res.errors, vec!["Original content is not valid JSON"]);
        assert_eq!(res.instructions, REPAIR_FIRST_INSTRUCTION);
    }

    #[test]
    fn partial_failure_lists_one_based_indices() {
        let ops = vec![
            RawOperation::new("add", "/b").with_value("2"),
            RawOperation::new("remove", "/missing"),
            RawOperation::new("replace", "/a").with_value("3"),
            RawOperation::new("test", "/a").with_value("1"),
        ];
        let res = suggest_json_patch(&workspace(), &args("form.json", ops), &Config::default());
        assert!(!res.success);
        assert_eq!(res.errors.len(), 2);
        assert!(res.errors[0].starts_with("Operation 2: "));
        assert!(res.errors[1].starts_with("Operation 4: "));
        assert_eq!(
            res.instructions,
            "Operations 2, 4 failed validation. Only regenerate these failed operations. \
             Do not include the successful operations."
        );
    }

    #[test]
    fn success_does_not_touch_editor() {
        let ws = workspace();
        let ops = vec![RawOperation::new("add", "/b").with_value("2")];
        let res = suggest_json_patch(&ws, &args("form.json", ops), &Config::default());
        assert!(res.success);
        assert!(res.errors.is_empty());
        assert_eq!(res.instructions, SUGGESTED_INSTRUCTION);
        assert!(!ws.file("form.json").unwrap().is_dirty);
    }

    #[test]
    fn languages_follow_config() {
        let mut ws = Workspace::new();
        ws.open_file("tsconfig.jsonc", "{}");
        let mut config = Config::default();
        config.editor.json_languages = vec![Language::Json];
        let res = suggest_json_patch(&ws, &args("tsconfig.jsonc", vec![]), &config);
        assert_eq!(res.instructions, JSON_FILE_INSTRUCTION);
    }

    #[test]
    fn query_tool_reports_invalid_document() {
        let q = QueryArgs { file_path: "broken.json".into(), queries: vec![QuerySpec::new("$")] };
        let res = query_json_path(&workspace(), &q, &Config::default());
        assert!(!res.success);
        assert_eq!(res.error.as_deref(), Some(INVALID_JSON_CONTENT));
        assert!(res.queries.is_empty());
    }

    #[test]
    fn query_tool_runs_queries() {
        let q = QueryArgs { file_path: "form.json".into(), queries: vec![QuerySpec::new("$.a").with_values()] };
        let res = query_json_path(&workspace(), &q, &Config::default());
        assert!(res.success);
        assert_eq!(res.queries[0].matches.as_ref().unwrap()["/a"], serde_json::json!(1));
    }

    #[test]
    fn diagnose_tool_flags_invalid_names() {
        let outcome = diagnose_form_schema(&workspace(), "form.json", &Config::default());
        match outcome {
            DiagnosticOutcome::Report { summary, .. } => assert_eq!(summary.invalid_count, 1),
            other => panic!("unexpected {other:?}"),
        }
        assert!(!diagnose_form_schema(&workspace(), "broken.json", &Config::default()).is_success());
    }

    fn repair_args(path: &str, response: &str) -> RepairArgs {
        RepairArgs { file_path: path.into(), response: response.into() }
    }

    #[test]
    fn repair_tool_fixes_broken_file() {
        let mut ws = workspace();
        let res = json_repair(
            &mut ws,
            &repair_args("broken.json", "<edits><old_text>{</old_text><new_text>{}</new_text></edits>"),
            &Config::default(),
        );
        assert!(res.success);
        assert_eq!(res.error, None);
        assert!(res.outcome.unwrap().written);
        assert_eq!(ws.file_content("broken.json"), Some("{}"));
    }

    #[test]
    fn repair_tool_reports_valid_file_without_writing() {
        let mut ws = workspace();
        let res = json_repair(
            &mut ws,
            &repair_args("form.json", "<edits><old_text>1</old_text><new_text>2</new_text></edits>"),
            &Config::default(),
        );
        let v = serde_json::to_value(&res).unwrap();
        assert_eq!(v, serde_json::json!({"success": true, "message": "JSON is already valid - no repair needed"}));
        assert!(!ws.file("form.json").unwrap().is_dirty);
    }

    #[test]
    fn repair_tool_refuses_other_languages() {
        let mut ws = workspace();
        let res = json_repair(&mut ws, &repair_args("notes.md", "<edits></edits>"), &Config::default());
        assert!(!res.success);
        assert_eq!(res.error.as_deref(), Some("File is not JSON (detected: markdown)"));
        assert_eq!(ws.file_content("notes.md"), Some("# hi"));
    }

    #[test]
    fn repair_tool_surfaces_edit_failures() {
        let mut ws = workspace();
        let missing = json_repair(&mut ws, &repair_args("broken.json", "no edits here"), &Config::default());
        assert_eq!(missing.error.as_deref(), Some("Parse failed: No <edits> section found in response"));
        let unmatched = json_repair(
            &mut ws,
            &repair_args("broken.json", "<edits><old_text>zzz</old_text><new_text>{}</new_text></edits>"),
            &Config::default(),
        );
        assert_eq!(unmatched.error.as_deref(), Some("Edit 1: old_text not found in content"));
        assert_eq!(ws.file_content("broken.json"), Some("{"));
    }
}
