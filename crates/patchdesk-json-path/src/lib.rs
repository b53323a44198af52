//! JSONPath (RFC 9535) subset.
//!
//! Parses query text into an AST and evaluates it against a
//! `serde_json::Value`, producing either plain value references or
//! [`Match`]es that carry each node's JSON Pointer location.
//!
//! Function extensions (`length()`, `match()` and friends) are not
//! supported and are rejected at parse time.
//!
//! # Example
//!
//! ```
//! use patchdesk_json_path::{JsonPathEval, JsonPathParser};
//! use serde_json::json;
//!
//! let path = JsonPathParser::parse("$.store.books[*].author").unwrap();
//! let doc = json!({
//!     "store": {
//!         "books": [
//!             {"author": "Nigel Rees", "title": "Sayings of the Century"},
//!             {"author": "Evelyn Waugh", "title": "Sword of Honour"}
//!         ]
//!     }
//! });
//!
//! let matches = JsonPathEval::eval_matches(&path, &doc);
//! assert_eq!(matches.len(), 2);
//! assert_eq!(matches[1].pointer(), "/store/books/1/author");
//! ```

mod types;
pub use types::*;

mod parser;
pub use parser::{JsonPathParser, ParseError};

mod eval;
pub use eval::JsonPathEval;

mod util;
pub use util::json_path_to_string;

/// Parse and evaluate in one step.
pub fn query<'a>(query: &str, doc: &'a serde_json::Value) -> Result<Vec<Match<'a>>, ParseError> {
    let path = JsonPathParser::parse(query)?;
    Ok(JsonPathEval::eval_matches(&path, doc))
}
