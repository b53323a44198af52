//! JSONPath parser.
//!
//! Supports root `$`, dot and bracket child access, wildcards, indices,
//! slices, unions, descendant segments (`..`), and filters with
//! comparisons, existence tests, `&&`, `||`, `!` and parentheses. Filters
//! may be written RFC style (`[?@.a > 1]`) or with the common outer
//! parentheses (`[?(@.a > 1)]`).

use serde_json::{Number, Value};
use thiserror::Error;

use crate::types::*;

/// Largest integer an index or slice bound may use (I-JSON range).
const MAX_SAFE_INTEGER: i64 = (1 << 53) - 1;

#[derive(Debug, Error, Clone, PartialEq)]
pub enum ParseError {
    #[error("Expected root identifier '$' at start")]
    ExpectedRoot,
    #[error("Unexpected character '{ch}' at position {pos}")]
    UnexpectedChar { ch: char, pos: usize },
    #[error("Unexpected end of input")]
    UnexpectedEnd,
    #[error("Invalid escape sequence at position {0}")]
    InvalidEscape(usize),
    #[error("Invalid number at position {0}")]
    InvalidNumber(usize),
    #[error("Unclosed string starting at position {0}")]
    UnclosedString(usize),
    #[error("Invalid selector at position {0}")]
    InvalidSelector(usize),
    #[error("Comparison operand must be a singular query or literal at position {0}")]
    InvalidOperand(usize),
}

/// JSONPath parser.
pub struct JsonPathParser<'a> {
    input: &'a str,
    pos: usize,
}

impl<'a> JsonPathParser<'a> {
    /// Parse a complete JSONPath query.
    pub fn parse(input: &'a str) -> Result<JsonPath, ParseError> {
        let mut parser = Self { input, pos: 0 };
        let input = parser.input.trim_end();
        parser.input = input;
        if parser.peek() != Some('$') {
            return Err(ParseError::ExpectedRoot);
        }
        parser.advance();
        let segments = parser.parse_segments(false)?;
        if let Some(ch) = parser.peek() {
            return Err(ParseError::UnexpectedChar { ch, pos: parser.pos });
        }
        Ok(JsonPath::new(segments))
    }

    /// Parse segments until input ends or, inside a filter, until a token
    /// that cannot continue a query.
    fn parse_segments(&mut self, in_filter: bool) -> Result<Vec<PathSegment>, ParseError> {
        let mut segments = Vec::new();
        loop {
            if in_filter {
                self.skip_whitespace();
            }
            match self.peek() {
                Some('.') => {
                    self.advance();
                    if self.peek() == Some('.') {
                        self.advance();
                        let selectors = self.parse_descendant_selectors()?;
                        segments.push(PathSegment::new(selectors, true));
                    } else if self.peek() == Some('*') {
                        self.advance();
                        segments.push(PathSegment::new(vec![Selector::Wildcard], false));
                    } else {
                        let name = self.parse_identifier()?;
                        segments.push(PathSegment::new(vec![Selector::Name(name)], false));
                    }
                }
                Some('[') => {
                    let selectors = self.parse_bracket_selectors()?;
                    segments.push(PathSegment::new(selectors, false));
                }
                _ => break,
            }
        }
        Ok(segments)
    }

    fn parse_descendant_selectors(&mut self) -> Result<Vec<Selector>, ParseError> {
        match self.peek() {
            Some('*') => {
                self.advance();
                Ok(vec![Selector::Wildcard])
            }
            Some('[') => self.parse_bracket_selectors(),
            _ => Ok(vec![Selector::Name(self.parse_identifier()?)]),
        }
    }

    fn parse_bracket_selectors(&mut self) -> Result<Vec<Selector>, ParseError> {
        self.expect('[')?;
        let mut selectors = Vec::new();
        loop {
            self.skip_whitespace();
            selectors.push(self.parse_bracket_selector()?);
            self.skip_whitespace();
            match self.peek() {
                Some(',') => self.advance(),
                Some(']') => {
                    self.advance();
                    return Ok(selectors);
                }
                Some(ch) => return Err(ParseError::UnexpectedChar { ch, pos: self.pos }),
                None => return Err(ParseError::UnexpectedEnd),
            }
        }
    }

    fn parse_bracket_selector(&mut self) -> Result<Selector, ParseError> {
        match self.peek() {
            Some('\'') | Some('"') => Ok(Selector::Name(self.parse_string()?)),
            Some('*') => {
                self.advance();
                Ok(Selector::Wildcard)
            }
            Some(':') | Some('-') | Some('0'..='9') => self.parse_index_or_slice(),
            Some('?') => {
                self.advance();
                Ok(Selector::Filter(self.parse_logical_or()?))
            }
            Some(_) => Err(ParseError::InvalidSelector(self.pos)),
            None => Err(ParseError::UnexpectedEnd),
        }
    }

    fn parse_index_or_slice(&mut self) -> Result<Selector, ParseError> {
        let start = self.parse_optional_integer()?;
        self.skip_whitespace();
        if self.peek() != Some(':') {
            return start.map(Selector::Index).ok_or(ParseError::InvalidSelector(self.pos));
        }
        self.advance();
        let end = self.parse_optional_integer()?;
        self.skip_whitespace();
        let step = if self.peek() == Some(':') {
            self.advance();
            self.parse_optional_integer()?
        } else {
            None
        };
        Ok(Selector::Slice { start, end, step })
    }

    fn parse_optional_integer(&mut self) -> Result<Option<isize>, ParseError> {
        self.skip_whitespace();
        if !matches!(self.peek(), Some('0'..='9') | Some('-')) {
            return Ok(None);
        }
        let start = self.pos;
        if self.peek() == Some('-') {
            self.advance();
        }
        while matches!(self.peek(), Some('0'..='9')) {
            self.advance();
        }
        self.input[start..self.pos]
            .parse::<i64>()
            .ok()
            .filter(|n| (-MAX_SAFE_INTEGER..=MAX_SAFE_INTEGER).contains(n))
            .and_then(|n| isize::try_from(n).ok())
            .map(Some)
            .ok_or(ParseError::InvalidNumber(start))
    }

    fn parse_identifier(&mut self) -> Result<String, ParseError> {
        let start = self.pos;
        match self.peek() {
            Some(c) if c.is_alphabetic() || c == '_' => self.advance(),
            Some(ch) => return Err(ParseError::UnexpectedChar { ch, pos: self.pos }),
            None => return Err(ParseError::UnexpectedEnd),
        }
        while let Some(c) = self.peek() {
            if c.is_alphanumeric() || c == '_' || c == '-' {
                self.advance();
            } else {
                break;
            }
        }
        Ok(self.input[start..self.pos].to_string())
    }

    fn parse_string(&mut self) -> Result<String, ParseError> {
        let start = self.pos;
        let quote = self.peek().ok_or(ParseError::UnexpectedEnd)?;
        self.advance();

        let mut result = String::new();
        loop {
            match self.peek() {
                None => return Err(ParseError::UnclosedString(start)),
                Some(c) if c == quote => {
                    self.advance();
                    return Ok(result);
                }
                Some('\\') => {
                    let escape_pos = self.pos;
                    self.advance();
                    let decoded = match self.peek() {
                        Some('n') => '\n',
                        Some('t') => '\t',
                        Some('r') => '\r',
                        Some('b') => '\u{8}',
                        Some('f') => '\u{c}',
                        Some('/') => '/',
                        Some('\\') => '\\',
                        Some('\'') => '\'',
                        Some('"') => '"',
                        Some('u') => {
                            let hex = self.input.get(self.pos + 1..self.pos + 5).ok_or(ParseError::InvalidEscape(escape_pos))?;
                            let code = u32::from_str_radix(hex, 16).map_err(|_| ParseError::InvalidEscape(escape_pos))?;
                            self.pos += 4;
                            char::from_u32(code).ok_or(ParseError::InvalidEscape(escape_pos))?
                        }
                        _ => return Err(ParseError::InvalidEscape(escape_pos)),
                    };
                    result.push(decoded);
                    self.advance();
                }
                Some(c) => {
                    result.push(c);
                    self.advance();
                }
            }
        }
    }

    // ── Filter expressions ────────────────────────────────────────────────

    fn parse_logical_or(&mut self) -> Result<FilterExpression, ParseError> {
        let mut left = self.parse_logical_and()?;
        self.skip_whitespace();
        while self.peek_str("||") {
            self.advance_by(2);
            let right = self.parse_logical_and()?;
            left = FilterExpression::Logical {
                operator: LogicalOperator::Or,
                left: Box::new(left),
                right: Box::new(right),
            };
            self.skip_whitespace();
        }
        Ok(left)
    }

    fn parse_logical_and(&mut self) -> Result<FilterExpression, ParseError> {
        let mut left = self.parse_unary()?;
        self.skip_whitespace();
        while self.peek_str("&&") {
            self.advance_by(2);
            let right = self.parse_unary()?;
            left = FilterExpression::Logical {
                operator: LogicalOperator::And,
                left: Box::new(left),
                right: Box::new(right),
            };
            self.skip_whitespace();
        }
        Ok(left)
    }

    fn parse_unary(&mut self) -> Result<FilterExpression, ParseError> {
        self.skip_whitespace();
        if self.peek() == Some('!') && !self.peek_str("!=") {
            self.advance();
            let expr = self.parse_unary()?;
            return Ok(FilterExpression::Negation(Box::new(expr)));
        }
        if self.peek() == Some('(') {
            self.advance();
            let expr = self.parse_logical_or()?;
            self.skip_whitespace();
            self.expect(')')?;
            return Ok(FilterExpression::Paren(Box::new(expr)));
        }
        self.parse_comparison_or_test()
    }

    fn parse_comparison_or_test(&mut self) -> Result<FilterExpression, ParseError> {
        let operand_pos = self.pos;
        let left = self.parse_value_expression()?;
        self.skip_whitespace();

        if let Some((operator, len)) = self.peek_comparison_operator() {
            self.advance_by(len);
            let right_pos = self.pos;
            let right = self.parse_value_expression()?;
            for (operand, pos) in [(&left, operand_pos), (&right, right_pos)] {
                if let ValueExpression::Query { path, .. } = operand {
                    if !is_singular(path) {
                        return Err(ParseError::InvalidOperand(pos));
                    }
                }
            }
            return Ok(FilterExpression::Comparison { operator, left, right });
        }

        match left {
            ValueExpression::Query { relative, path } => Ok(FilterExpression::Existence { relative, path }),
            ValueExpression::Literal(_) => Err(ParseError::InvalidOperand(operand_pos)),
        }
    }

    fn parse_value_expression(&mut self) -> Result<ValueExpression, ParseError> {
        self.skip_whitespace();
        match self.peek() {
            Some('@') | Some('$') => {
                let relative = self.peek() == Some('@');
                self.advance();
                let segments = self.parse_segments(true)?;
                Ok(ValueExpression::Query { relative, path: JsonPath::new(segments) })
            }
            Some('\'') | Some('"') => Ok(ValueExpression::Literal(Value::String(self.parse_string()?))),
            Some('-') | Some('0'..='9') => self.parse_number_literal(),
            _ => {
                for (word, value) in [("true", Value::Bool(true)), ("false", Value::Bool(false)), ("null", Value::Null)] {
                    if self.peek_str(word) {
                        self.advance_by(word.len());
                        return Ok(ValueExpression::Literal(value));
                    }
                }
                match self.peek() {
                    Some(_) => Err(ParseError::InvalidSelector(self.pos)),
                    None => Err(ParseError::UnexpectedEnd),
                }
            }
        }
    }

    fn parse_number_literal(&mut self) -> Result<ValueExpression, ParseError> {
        let start = self.pos;
        if self.peek() == Some('-') {
            self.advance();
        }
        if !matches!(self.peek(), Some('0'..='9')) {
            return Err(ParseError::InvalidNumber(start));
        }
        while matches!(self.peek(), Some('0'..='9')) {
            self.advance();
        }
        let mut is_float = false;
        if self.peek() == Some('.') {
            is_float = true;
            self.advance();
            if !matches!(self.peek(), Some('0'..='9')) {
                return Err(ParseError::InvalidNumber(start));
            }
            while matches!(self.peek(), Some('0'..='9')) {
                self.advance();
            }
        }
        if matches!(self.peek(), Some('e') | Some('E')) {
            is_float = true;
            self.advance();
            if matches!(self.peek(), Some('+') | Some('-')) {
                self.advance();
            }
            if !matches!(self.peek(), Some('0'..='9')) {
                return Err(ParseError::InvalidNumber(start));
            }
            while matches!(self.peek(), Some('0'..='9')) {
                self.advance();
            }
        }

        let text = &self.input[start..self.pos];
        let number = if is_float {
            text.parse::<f64>().ok().and_then(Number::from_f64)
        } else {
            text.parse::<i64>().ok().map(Number::from)
        };
        number
            .map(|n| ValueExpression::Literal(Value::Number(n)))
            .ok_or(ParseError::InvalidNumber(start))
    }

    fn peek_comparison_operator(&self) -> Option<(ComparisonOperator, usize)> {
        const OPERATORS: [(&str, ComparisonOperator); 6] = [
            ("==", ComparisonOperator::Equal),
            ("!=", ComparisonOperator::NotEqual),
            ("<=", ComparisonOperator::LessEqual),
            (">=", ComparisonOperator::GreaterEqual),
            ("<", ComparisonOperator::Less),
            (">", ComparisonOperator::Greater),
        ];
        OPERATORS
            .iter()
            .find(|(token, _)| self.peek_str(token))
            .map(|(token, operator)| (*operator, token.len()))
    }

    // ── Cursor ────────────────────────────────────────────────────────────

    fn peek(&self) -> Option<char> {
        self.input[self.pos..].chars().next()
    }

    fn peek_str(&self, s: &str) -> bool {
        self.input[self.pos..].starts_with(s)
    }

    fn advance(&mut self) {
        if let Some(c) = self.peek() {
            self.pos += c.len_utf8();
        }
    }

    fn advance_by(&mut self, n: usize) {
        for _ in 0..n {
            self.advance();
        }
    }

    fn expect(&mut self, expected: char) -> Result<(), ParseError> {
        match self.peek() {
            Some(c) if c == expected => {
                self.advance();
                Ok(())
            }
            Some(ch) => Err(ParseError::UnexpectedChar { ch, pos: self.pos }),
            None => Err(ParseError::UnexpectedEnd),
        }
    }

    fn skip_whitespace(&mut self) {
        while matches!(self.peek(), Some(c) if c.is_whitespace()) {
            self.advance();
        }
    }
}

/// A singular query selects at most one node: only names and indices, no
/// descendant segments.
fn is_singular(path: &JsonPath) -> bool {
    path.segments.iter().all(|segment| {
        !segment.recursive
            && segment.selectors.len() == 1
            && matches!(segment.selectors[0], Selector::Name(_) | Selector::Index(_))
    })
}
