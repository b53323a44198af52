//! Search-and-replace repair protocol for documents that fail to parse.
//!
//! A repair response carries one `<edits>` block of `<old_text>` /
//! `<new_text>` pairs. Edits apply in order, each against the result of
//! the previous one.

use std::sync::LazyLock;

use regex::Regex;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::{debug, info, warn};

use crate::document::{validate_json, JsonValidation};
use crate::editor::{require_json_file, EditorError, EditorState, Language, ToolError};

static EDITS_BLOCK: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"(?s)<edits>(.*?)</edits>").expect("edits pattern"));
static OLD_TEXT: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?s)<old_text>(.*?)</old_text>").expect("old_text pattern"));
static NEW_TEXT: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?s)<new_text>(.*?)</new_text>").expect("new_text pattern"));

const OPEN_TAG: &str = "<edits>";
const CLOSE_TAG: &str = "</edits>";

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum RepairError {
    #[error("Missing prompt or content")]
    MissingContent,
    #[error("File is not JSON (detected: {0})")]
    NotJson(Language),
    #[error("JSON is already valid - no repair needed")]
    AlreadyValid,
    #[error(transparent)]
    Editor(#[from] EditorError),
}

impl From<ToolError> for RepairError {
    fn from(err: ToolError) -> Self {
        match err {
            ToolError::FileNotOpen(path) => RepairError::Editor(EditorError::FileNotOpen(path)),
            ToolError::WrongFileType { language, .. } => RepairError::NotJson(language),
        }
    }
}

/// Repair request as posted by the editor.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RepairRequest {
    pub content: String,
    #[serde(default)]
    pub error: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub knowledge_base: Option<String>,
}

impl RepairRequest {
    pub fn validate(&self) -> Result<(), RepairError> {
        if self.content.is_empty() {
            return Err(RepairError::MissingContent);
        }
        Ok(())
    }

    /// Prompt asking for edits in the `<edits>` format.
    pub fn prompt(&self) -> String {
        let mut out = String::from(
            "Respond only with edits that fix the JSON syntax errors, in this format:\n\n\
             <edits>\n<old_text>\nEXACT TEXT TO REPLACE\n</old_text>\n<new_text>\nREPLACEMENT\n</new_text>\n</edits>\n\n\
             Rules:\n\
             - old_text must match the document exactly, including indentation, and cannot be empty\n\
             - include just enough context to make old_text unique\n\
             - edits are applied in order, each on the result of the previous one\n\
             - fix syntax only and keep the data structure unchanged\n",
        );
        if let Some(kb) = self.knowledge_base.as_deref().filter(|kb| !kb.trim().is_empty()) {
            out.push_str("\n<knowledge_base>\n");
            out.push_str(kb);
            out.push_str("\n</knowledge_base>\n");
        }
        out.push_str("\n<json_content>\n");
        out.push_str(&self.content);
        out.push_str("\n</json_content>\n\n<error_description>\nJSON Parse Error: ");
        out.push_str(&self.error);
        out.push_str("\n</error_description>\n\nStart your response with <edits>.");
        out
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SearchReplaceEdit {
    pub old_text: String,
    pub new_text: String,
    /// Position of the pair in the response, 0-based.
    pub index: usize,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct EditParseResult {
    pub success: bool,
    pub edits: Vec<SearchReplaceEdit>,
    pub errors: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct EditApplyResult {
    pub success: bool,
    pub result: String,
    pub errors: Vec<String>,
}

fn captures(re: &Regex, text: &str) -> Vec<String> {
    re.captures_iter(text).map(|c| c[1].trim().to_string()).collect()
}

/// Parse the first `<edits>` block of a response.
pub fn parse_edits(response: &str) -> EditParseResult {
    let Some(block) = EDITS_BLOCK.captures(response) else {
        return EditParseResult {
            success: false,
            edits: Vec::new(),
            errors: vec!["No <edits> section found in response".to_string()],
        };
    };
    let body = &block[1];
    let old_texts = captures(&OLD_TEXT, body);
    let new_texts = captures(&NEW_TEXT, body);

    let mut errors = Vec::new();
    if old_texts.len() != new_texts.len() {
        errors.push(format!(
            "Mismatched edit pairs: {} old_text, {} new_text",
            old_texts.len(),
            new_texts.len()
        ));
    }

    let mut edits = Vec::new();
    for (index, (old_text, new_text)) in old_texts.into_iter().zip(new_texts).enumerate() {
        if old_text.is_empty() {
            errors.push(format!("Edit {}: old_text cannot be empty", index + 1));
            continue;
        }
        edits.push(SearchReplaceEdit { old_text, new_text, index });
    }
    debug!(edits = edits.len(), errors = errors.len(), "parsed edit block");
    EditParseResult { success: errors.is_empty(), edits, errors }
}

/// Apply edits in order, replacing the first occurrence of each old text.
/// Missing old texts are reported and skipped.
pub fn apply_edits(content: &str, edits: &[SearchReplaceEdit]) -> EditApplyResult {
    let mut result = content.to_string();
    let mut errors = Vec::new();
    for edit in edits {
        if !result.contains(&edit.old_text) {
            errors.push(format!("Edit {}: old_text not found in content", edit.index + 1));
            continue;
        }
        result = result.replacen(&edit.old_text, &edit.new_text, 1);
    }
    EditApplyResult { success: errors.is_empty(), result, errors }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StreamState {
    Pending,
    Complete(EditParseResult),
}

/// Accumulates a streamed response and parses it once the edit block has
/// closed.
#[derive(Debug, Clone, Default)]
pub struct StreamingEditParser {
    buffer: String,
    done: bool,
}

impl StreamingEditParser {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn buffer(&self) -> &str {
        &self.buffer
    }

    fn block_closed(&self) -> bool {
        self.buffer
            .find(OPEN_TAG)
            .is_some_and(|start| self.buffer[start + OPEN_TAG.len()..].contains(CLOSE_TAG))
    }

    /// Feed one chunk. Chunks after completion are buffered but ignored.
    pub fn push(&mut self, chunk: &str) -> StreamState {
        self.buffer.push_str(chunk);
        if self.done || !self.block_closed() {
            return StreamState::Pending;
        }
        self.done = true;
        StreamState::Complete(parse_edits(&self.buffer))
    }

    /// Parse whatever arrived, at end of stream.
    pub fn finish(self) -> EditParseResult {
        parse_edits(&self.buffer)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RepairOutcome {
    pub parse: EditParseResult,
    /// Absent when parsing failed.
    pub apply: Option<EditApplyResult>,
    /// Whether the live document was rewritten.
    pub written: bool,
    /// State of the live document after the attempt.
    pub validation: JsonValidation,
}

/// Apply a repair response to the live document at `path`.
///
/// The file must be open with one of the `allowed` languages and must not
/// parse already. The document is written only when parsing and every edit
/// succeed.
pub fn repair_document<E: EditorState + ?Sized>(
    editor: &mut E,
    path: &str,
    response: &str,
    allowed: &[Language],
) -> Result<RepairOutcome, RepairError> {
    let current = require_json_file(&*editor, path, allowed)?.content.clone();
    if validate_json(&current).is_valid {
        debug!(path, "repair skipped, document already parses");
        return Err(RepairError::AlreadyValid);
    }

    let parse = parse_edits(response);
    if !parse.success {
        warn!(path, errors = ?parse.errors, "repair response did not parse");
        return Ok(RepairOutcome { validation: validate_json(&current), parse, apply: None, written: false });
    }

    let apply = apply_edits(&current, &parse.edits);
    if !apply.success {
        warn!(path, errors = ?apply.errors, "repair edits did not apply");
        return Ok(RepairOutcome { validation: validate_json(&current), parse, apply: Some(apply), written: false });
    }

    editor.set_file_content(path, apply.result.clone())?;
    let validation = validate_json(&apply.result);
    info!(path, edits = parse.edits.len(), valid = validation.is_valid, "repair applied");
    Ok(RepairOutcome { parse, apply: Some(apply), written: true, validation })
}
