//! Validation functions for JSON Pointer.

use crate::JsonPointerError;

/// Maximum allowed pointer string length.
const MAX_POINTER_LENGTH: usize = 1024;

/// Maximum allowed path depth.
const MAX_PATH_LENGTH: usize = 256;

/// Validate a pointer string: empty (root) or starting with `/`, at most
/// 1024 bytes.
///
/// ```
/// use patchdesk_json_pointer::validate_json_pointer;
///
/// validate_json_pointer("").unwrap();
/// validate_json_pointer("/foo/bar").unwrap();
/// validate_json_pointer("foo").unwrap_err();
/// ```
pub fn validate_json_pointer(pointer: &str) -> Result<(), JsonPointerError> {
    if pointer.is_empty() {
        return Ok(());
    }
    if !pointer.starts_with('/') {
        return Err(JsonPointerError::PointerInvalid);
    }
    if pointer.len() > MAX_POINTER_LENGTH {
        return Err(JsonPointerError::PointerTooLong);
    }
    Ok(())
}

/// Validate the depth of a parsed path (at most 256 steps).
pub fn validate_path(path: &[String]) -> Result<(), JsonPointerError> {
    if path.len() > MAX_PATH_LENGTH {
        return Err(JsonPointerError::PathTooLong);
    }
    Ok(())
}
