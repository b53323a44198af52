//! patchdesk: JSON Patch validation, preview and review for an
//! AI-assisted JSON editor.
//!
//! An assistant proposes a batch of RFC 6902 operations against an open
//! document. The batch is validated per operation against a pristine
//! snapshot, previewed without mutation, and then reviewed one operation at
//! a time with apply, reject and undo.
//!
//! Alongside the patch flow: JSONPath queries, form schema diagnostics and
//! a search-and-replace repair protocol for documents that no longer parse.

// Document model and patch core
pub mod document;
pub mod json_patch;
pub mod validate;
pub mod preview;

// Editor seam and review workflow
pub mod editor;
pub mod review;

// Assistant tool surfaces
pub mod query;
pub mod diagnostics;
pub mod repair;
pub mod tool;

// Ambient
pub mod config;
pub mod credential;
pub mod preferences;
pub mod cli;

pub use document::{DocumentError, JsonDocument};
pub use editor::{EditorState, Workspace};
pub use json_patch::{OperationBatch, PatchError, PatchOperation, RawOperation};
pub use preview::{preview, PatchPreview};
pub use review::{OperationStatus, ReviewSession};
pub use validate::{validate, validate_batch, BatchValidation, Validity};
