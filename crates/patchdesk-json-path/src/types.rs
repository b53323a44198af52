//! JSONPath AST and match types.

use serde_json::Value;

/// A selector inside a segment.
#[derive(Debug, Clone, PartialEq)]
pub enum Selector {
    /// `.name`, `['key']`
    Name(String),
    /// `[0]`, `[-1]`
    Index(isize),
    /// `[start:end:step]`
    Slice { start: Option<isize>, end: Option<isize>, step: Option<isize> },
    /// `.*`, `[*]`
    Wildcard,
    /// `[?(@.price < 10)]` or `[?@.price < 10]`
    Filter(FilterExpression),
}

/// One segment: either a child segment or a descendant (`..`) segment.
#[derive(Debug, Clone, PartialEq)]
pub struct PathSegment {
    pub selectors: Vec<Selector>,
    pub recursive: bool,
}

impl PathSegment {
    pub fn new(selectors: Vec<Selector>, recursive: bool) -> Self {
        Self { selectors, recursive }
    }
}

/// A parsed JSONPath query.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct JsonPath {
    pub segments: Vec<PathSegment>,
}

impl JsonPath {
    pub fn new(segments: Vec<PathSegment>) -> Self {
        Self { segments }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum FilterExpression {
    Comparison { operator: ComparisonOperator, left: ValueExpression, right: ValueExpression },
    Logical { operator: LogicalOperator, left: Box<FilterExpression>, right: Box<FilterExpression> },
    /// `@.name`, `$.flag`: true when the query selects at least one node.
    Existence { relative: bool, path: JsonPath },
    Paren(Box<FilterExpression>),
    Negation(Box<FilterExpression>),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ComparisonOperator {
    Equal,
    NotEqual,
    Less,
    LessEqual,
    Greater,
    GreaterEqual,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogicalOperator {
    And,
    Or,
}

/// Comparable operand of a filter comparison.
#[derive(Debug, Clone, PartialEq)]
pub enum ValueExpression {
    Literal(Value),
    /// A singular query relative to `@` (`relative: true`) or to `$`.
    Query { relative: bool, path: JsonPath },
}

/// A component of a normalized path.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PathComponent {
    Key(String),
    Index(usize),
}

/// One node selected by a query, with its location in the document.
#[derive(Debug, Clone, PartialEq)]
pub struct Match<'a> {
    pub path: Vec<PathComponent>,
    pub value: &'a Value,
}

impl Match<'_> {
    /// The location as an RFC 6901 pointer, e.g. `/fields/0/name`.
    pub fn pointer(&self) -> String {
        let mut out = String::new();
        for component in &self.path {
            out.push('/');
            match component {
                PathComponent::Key(key) => {
                    out.push_str(&patchdesk_json_pointer::escape_component(key))
                }
                PathComponent::Index(idx) => out.push_str(&idx.to_string()),
            }
        }
        out
    }
}
