//! JSONPath evaluator.

use std::cmp::Ordering;

use serde_json::Value;

use crate::types::*;

/// JSONPath evaluator.
pub struct JsonPathEval;

impl JsonPathEval {
    /// Evaluate a JSONPath against a JSON document.
    ///
    /// Returns references to matching values in document order.
    pub fn eval<'a>(path: &JsonPath, doc: &'a Value) -> Vec<&'a Value> {
        Self::eval_matches(path, doc).into_iter().map(|m| m.value).collect()
    }

    /// Evaluate a JSONPath and keep the location of every match.
    pub fn eval_matches<'a>(path: &JsonPath, doc: &'a Value) -> Vec<Match<'a>> {
        Self::eval_from(path, doc, doc)
    }

    fn eval_from<'a>(path: &JsonPath, start: &'a Value, root: &'a Value) -> Vec<Match<'a>> {
        let mut nodes = vec![Match { path: Vec::new(), value: start }];

        for segment in &path.segments {
            let mut next = Vec::new();
            for node in &nodes {
                if segment.recursive {
                    Self::eval_descendants(node.value, &segment.selectors, &node.path, root, &mut next);
                } else {
                    for selector in &segment.selectors {
                        Self::eval_selector(node.value, selector, &node.path, root, &mut next);
                    }
                }
            }
            nodes = next;
        }

        nodes
    }

    fn eval_descendants<'a>(
        value: &'a Value,
        selectors: &[Selector],
        current_path: &[PathComponent],
        root: &'a Value,
        out: &mut Vec<Match<'a>>,
    ) {
        for selector in selectors {
            Self::eval_selector(value, selector, current_path, root, out);
        }
        for (component, child) in children(value) {
            let child_path = extend(current_path, component);
            Self::eval_descendants(child, selectors, &child_path, root, out);
        }
    }

    fn eval_selector<'a>(
        value: &'a Value,
        selector: &Selector,
        current_path: &[PathComponent],
        root: &'a Value,
        out: &mut Vec<Match<'a>>,
    ) {
        match selector {
            Selector::Name(name) => {
                if let Some(child) = value.as_object().and_then(|map| map.get(name)) {
                    out.push(Match { path: extend(current_path, PathComponent::Key(name.clone())), value: child });
                }
            }
            Selector::Index(index) => {
                if let Value::Array(arr) = value {
                    if let Some(idx) = resolve_index(*index, arr.len()) {
                        out.push(Match { path: extend(current_path, PathComponent::Index(idx)), value: &arr[idx] });
                    }
                }
            }
            Selector::Wildcard => {
                for (component, child) in children(value) {
                    out.push(Match { path: extend(current_path, component), value: child });
                }
            }
            Selector::Slice { start, end, step } => {
                if let Value::Array(arr) = value {
                    for idx in slice_indices(*start, *end, *step, arr.len()) {
                        out.push(Match { path: extend(current_path, PathComponent::Index(idx)), value: &arr[idx] });
                    }
                }
            }
            Selector::Filter(expr) => {
                for (component, child) in children(value) {
                    if Self::eval_filter(expr, child, root) {
                        out.push(Match { path: extend(current_path, component), value: child });
                    }
                }
            }
        }
    }

    fn eval_filter(expr: &FilterExpression, current: &Value, root: &Value) -> bool {
        match expr {
            FilterExpression::Existence { relative, path } => {
                let start = if *relative { current } else { root };
                !Self::eval_from(path, start, root).is_empty()
            }
            FilterExpression::Comparison { operator, left, right } => {
                let left = Self::eval_value_expr(left, current, root);
                let right = Self::eval_value_expr(right, current, root);
                compare(*operator, left.as_ref(), right.as_ref())
            }
            FilterExpression::Logical { operator, left, right } => match operator {
                LogicalOperator::And => Self::eval_filter(left, current, root) && Self::eval_filter(right, current, root),
                LogicalOperator::Or => Self::eval_filter(left, current, root) || Self::eval_filter(right, current, root),
            },
            FilterExpression::Negation(expr) => !Self::eval_filter(expr, current, root),
            FilterExpression::Paren(expr) => Self::eval_filter(expr, current, root),
        }
    }

    /// `None` stands for the empty node list ("Nothing").
    fn eval_value_expr(expr: &ValueExpression, current: &Value, root: &Value) -> Option<Value> {
        match expr {
            ValueExpression::Literal(v) => Some(v.clone()),
            ValueExpression::Query { relative, path } => {
                let start = if *relative { current } else { root };
                Self::eval_from(path, start, root).first().map(|m| m.value.clone())
            }
        }
    }
}

fn children(value: &Value) -> Vec<(PathComponent, &Value)> {
    match value {
        Value::Object(map) => map.iter().map(|(k, v)| (PathComponent::Key(k.clone()), v)).collect(),
        Value::Array(arr) => arr.iter().enumerate().map(|(i, v)| (PathComponent::Index(i), v)).collect(),
        _ => Vec::new(),
    }
}

fn extend(path: &[PathComponent], component: PathComponent) -> Vec<PathComponent> {
    let mut out = Vec::with_capacity(path.len() + 1);
    out.extend_from_slice(path);
    out.push(component);
    out
}

fn resolve_index(index: isize, len: usize) -> Option<usize> {
    let idx = if index < 0 { len as isize + index } else { index };
    if idx >= 0 && (idx as usize) < len {
        Some(idx as usize)
    } else {
        None
    }
}

fn slice_indices(start: Option<isize>, end: Option<isize>, step: Option<isize>, len: usize) -> Vec<usize> {
    let len = len as isize;
    let step = step.unwrap_or(1);
    let normalize = |i: isize| if i >= 0 { i } else { len + i };
    let mut indices = Vec::new();

    if step > 0 {
        let lower = normalize(start.unwrap_or(0)).clamp(0, len);
        let upper = normalize(end.unwrap_or(len)).clamp(0, len);
        let mut i = lower;
        while i < upper {
            indices.push(i as usize);
            let Some(next) = i.checked_add(step) else { break };
            i = next;
        }
    } else if step < 0 {
        let upper = start.map(normalize).unwrap_or(len - 1).clamp(-1, len - 1);
        let lower = end.map(normalize).unwrap_or(-1).clamp(-1, len - 1);
        let mut i = upper;
        while lower < i {
            indices.push(i as usize);
            let Some(next) = i.checked_add(step) else { break };
            i = next;
        }
    }

    indices
}

fn compare(operator: ComparisonOperator, left: Option<&Value>, right: Option<&Value>) -> bool {
    match operator {
        ComparisonOperator::Equal => equals(left, right),
        ComparisonOperator::NotEqual => !equals(left, right),
        ComparisonOperator::Less => less(left, right),
        ComparisonOperator::LessEqual => less(left, right) || equals(left, right),
        ComparisonOperator::Greater => less(right, left),
        ComparisonOperator::GreaterEqual => less(right, left) || equals(left, right),
    }
}

fn equals(left: Option<&Value>, right: Option<&Value>) -> bool {
    match (left, right) {
        (None, None) => true,
        (Some(l), Some(r)) => values_equal(l, r),
        _ => false,
    }
}

/// Structural equality where numbers compare by value, so `1` equals `1.0`.
fn values_equal(a: &Value, b: &Value) -> bool {
    match (a, b) {
        (Value::Number(x), Value::Number(y)) => x.as_f64() == y.as_f64(),
        (Value::Array(x), Value::Array(y)) => x.len() == y.len() && x.iter().zip(y).all(|(a, b)| values_equal(a, b)),
        (Value::Object(x), Value::Object(y)) => {
            x.len() == y.len() && x.iter().all(|(k, v)| y.get(k).is_some_and(|w| values_equal(v, w)))
        }
        _ => a == b,
    }
}

fn less(left: Option<&Value>, right: Option<&Value>) -> bool {
    match (left, right) {
        (Some(Value::Number(a)), Some(Value::Number(b))) => match (a.as_f64(), b.as_f64()) {
            (Some(a), Some(b)) => a.partial_cmp(&b) == Some(Ordering::Less),
            _ => false,
        },
        (Some(Value::String(a)), Some(Value::String(b))) => a < b,
        _ => false,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::JsonPathParser;
    use serde_json::json;

    fn eval(query: &str, doc: &Value) -> Vec<Value> {
        let path = JsonPathParser::parse(query).unwrap();
        JsonPathEval::eval(&path, doc).into_iter().cloned().collect()
    }

    #[test]
    fn slice_positive_step() {
        let doc = json!([0, 1, 2, 3, 4, 5]);
        assert_eq!(eval("$[1:4]", &doc), vec![json!(1), json!(2), json!(3)]);
        assert_eq!(eval("$[::2]", &doc), vec![json!(0), json!(2), json!(4)]);
        assert_eq!(eval("$[-2:]", &doc), vec![json!(4), json!(5)]);
        assert_eq!(eval("$[4:100]", &doc), vec![json!(4), json!(5)]);
    }

    #[test]
    fn slice_negative_and_zero_step() {
        let doc = json!([0, 1, 2, 3]);
        assert_eq!(eval("$[::-1]", &doc), vec![json!(3), json!(2), json!(1), json!(0)]);
        assert_eq!(eval("$[2:0:-1]", &doc), vec![json!(2), json!(1)]);
        assert!(eval("$[::0]", &doc).is_empty());
    }

    #[test]
    fn slice_with_huge_step_stops_at_bound() {
        assert_eq!(slice_indices(Some(1), None, Some(isize::MAX), 3), vec![1]);
        assert_eq!(slice_indices(Some(-1), None, Some(isize::MIN + 1), 3), vec![2]);
        assert_eq!(eval("$[1::9007199254740991]", &json!([1, 2, 3])), vec![json!(2)]);
        assert_eq!(eval("$[::-9007199254740991]", &json!([1, 2, 3])), vec![json!(3)]);
    }

    #[test]
    fn negative_index_counts_from_end() {
        let doc = json!(["a", "b", "c"]);
        assert_eq!(eval("$[-1]", &doc), vec![json!("c")]);
        assert!(eval("$[-4]", &doc).is_empty());
        assert!(eval("$[3]", &doc).is_empty());
    }

    #[test]
    fn descendants_visit_node_before_children() {
        let doc = json!({"a": {"a": 1}, "b": [{"a": 2}]});
        assert_eq!(eval("$..a", &doc), vec![json!({"a": 1}), json!(1), json!(2)]);
    }

    #[test]
    fn filter_compares_numbers_across_representations() {
        let doc = json!([{"n": 1}, {"n": 2.0}, {"n": "2"}]);
        assert_eq!(eval("$[?@.n == 2]", &doc), vec![json!({"n": 2.0})]);
        assert_eq!(eval("$[?@.n >= 1.0]", &doc).len(), 2);
    }

    #[test]
    fn filter_missing_member_semantics() {
        let doc = json!([{"a": 1}, {"b": 2}]);
        assert_eq!(eval("$[?@.a != 1]", &doc), vec![json!({"b": 2})]);
        assert_eq!(eval("$[?@.a == @.missing]", &doc), vec![json!({"b": 2})]);
        assert_eq!(eval("$[?@.x == @.y]", &doc).len(), 2);
        assert!(eval("$[?@.a < 5 && @.b < 5]", &doc).is_empty());
    }

    #[test]
    fn filter_root_reference() {
        let doc = json!({"limit": 3, "items": [{"v": 1}, {"v": 5}]});
        assert_eq!(eval("$.items[?@.v < $.limit]", &doc), vec![json!({"v": 1})]);
    }

    #[test]
    fn filter_over_object_members() {
        let doc = json!({"x": {"on": true}, "y": {"on": false}, "z": 3});
        assert_eq!(eval("$[?@.on == true]", &doc), vec![json!({"on": true})]);
        assert_eq!(eval("$[?@.on]", &doc).len(), 2);
        assert_eq!(eval("$[?!@.on]", &doc), vec![json!(3)]);
    }

    #[test]
    fn filter_string_ordering_and_structural_equality() {
        let doc = json!([{"s": "apple", "t": [1, 2]}, {"s": "pear", "t": [1, 2.0]}]);
        assert_eq!(eval("$[?@.s < 'banana']", &doc).len(), 1);
        let path = JsonPathParser::parse("$[?@.t == $[0].t]").unwrap();
        assert_eq!(JsonPathEval::eval(&path, &doc).len(), 2);
    }

    #[test]
    fn matches_carry_locations() {
        let doc = json!({"fields": [{"name": "a"}, {"name": "b"}]});
        let path = JsonPathParser::parse("$.fields[*].name").unwrap();
        let pointers: Vec<String> = JsonPathEval::eval_matches(&path, &doc).iter().map(Match::pointer).collect();
        assert_eq!(pointers, vec!["/fields/0/name", "/fields/1/name"]);
    }
}
