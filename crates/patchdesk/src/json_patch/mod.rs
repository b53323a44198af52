//! JSON Patch (RFC 6902) operations.
//!
//! Supported operations: `add`, `remove`, `replace`, `move`, `copy`. The
//! `test` operation is not an authoring kind and is rejected by both codecs.

pub mod types;
pub mod apply;
pub mod codec;

pub use types::{OperationBatch, Path, PatchError, PatchOperation};
pub use apply::{apply_op, apply_ops};
pub use codec::json::{from_json, from_json_patch, to_json, to_json_patch};
pub use codec::wire::{decode_value, RawOperation};
