//! Type definitions for JSON Pointer.

/// A single unescaped reference token.
pub type PathStep = String;

/// A parsed JSON Pointer. The empty path addresses the document root.
pub type Path = Vec<PathStep>;
