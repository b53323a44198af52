//! JSONPath formatting helpers.

use crate::types::{ComparisonOperator, FilterExpression, JsonPath, LogicalOperator, PathSegment, Selector, ValueExpression};

/// Render a parsed path back to query text.
///
/// The output re-parses to an equal AST.
pub fn json_path_to_string(path: &JsonPath) -> String {
    let mut out = String::from("$");
    write_segments(&mut out, path);
    out
}

fn write_segments(out: &mut String, path: &JsonPath) {
    for segment in &path.segments {
        write_segment(out, segment);
    }
}

fn write_segment(out: &mut String, segment: &PathSegment) {
    if segment.recursive {
        out.push_str("..");
    }
    match segment.selectors.as_slice() {
        [Selector::Name(name)] if is_identifier(name) => {
            if !segment.recursive {
                out.push('.');
            }
            out.push_str(name);
        }
        [Selector::Wildcard] => {
            if !segment.recursive {
                out.push('.');
            }
            out.push('*');
        }
        selectors => {
            out.push('[');
            for (i, selector) in selectors.iter().enumerate() {
                if i > 0 {
                    out.push(',');
                }
                write_selector(out, selector);
            }
            out.push(']');
        }
    }
}

fn write_selector(out: &mut String, selector: &Selector) {
    match selector {
        Selector::Name(name) => {
            out.push('\'');
            out.push_str(&escape_single_quoted(name));
            out.push('\'');
        }
        Selector::Index(index) => out.push_str(&index.to_string()),
        Selector::Slice { start, end, step } => {
            if let Some(v) = start {
                out.push_str(&v.to_string());
            }
            out.push(':');
            if let Some(v) = end {
                out.push_str(&v.to_string());
            }
            if let Some(v) = step {
                out.push(':');
                out.push_str(&v.to_string());
            }
        }
        Selector::Wildcard => out.push('*'),
        Selector::Filter(expr) => {
            out.push('?');
            write_filter(out, expr);
        }
    }
}

fn write_filter(out: &mut String, expr: &FilterExpression) {
    match expr {
        FilterExpression::Comparison { operator, left, right } => {
            write_value(out, left);
            out.push_str(match operator {
                ComparisonOperator::Equal => " == ",
                ComparisonOperator::NotEqual => " != ",
                ComparisonOperator::Less => " < ",
                ComparisonOperator::LessEqual => " <= ",
                ComparisonOperator::Greater => " > ",
                ComparisonOperator::GreaterEqual => " >= ",
            });
            write_value(out, right);
        }
        FilterExpression::Logical { operator, left, right } => {
            write_filter(out, left);
            out.push_str(match operator {
                LogicalOperator::And => " && ",
                LogicalOperator::Or => " || ",
            });
            write_filter(out, right);
        }
        FilterExpression::Existence { relative, path } => write_query(out, *relative, path),
        FilterExpression::Paren(inner) => {
            out.push('(');
            write_filter(out, inner);
            out.push(')');
        }
        FilterExpression::Negation(inner) => {
            out.push('!');
            write_filter(out, inner);
        }
    }
}

fn write_value(out: &mut String, expr: &ValueExpression) {
    match expr {
        ValueExpression::Literal(serde_json::Value::String(s)) => {
            out.push('\'');
            out.push_str(&escape_single_quoted(s));
            out.push('\'');
        }
        ValueExpression::Literal(v) => out.push_str(&v.to_string()),
        ValueExpression::Query { relative, path } => write_query(out, *relative, path),
    }
}

fn write_query(out: &mut String, relative: bool, path: &JsonPath) {
    out.push(if relative { '@' } else { '$' });
    write_segments(out, path);
}

fn is_identifier(name: &str) -> bool {
    let mut chars = name.chars();
    match chars.next() {
        Some(c) if c.is_alphabetic() || c == '_' => {}
        _ => return false,
    }
    chars.all(|c| c.is_alphanumeric() || c == '_' || c == '-')
}

fn escape_single_quoted(input: &str) -> String {
    let mut out = String::with_capacity(input.len());
    for ch in input.chars() {
        match ch {
            '\\' => out.push_str("\\\\"),
            '\'' => out.push_str("\\'"),
            '\n' => out.push_str("\\n"),
            '\t' => out.push_str("\\t"),
            '\r' => out.push_str("\\r"),
            _ => out.push(ch),
        }
    }
    out
}
