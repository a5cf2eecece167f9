use once_cell::sync::Lazy;
use regex::Regex;
use serde_json::Value;
use thiserror::Error;

use crate::domain::Payload;

static QUERY_REGEX: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^\$(?:\.[A-Za-z0-9_\-]+|\['[^']*'\]|\[\d+\])+$").expect("valid query regex")
});
static SEGMENT_REGEX: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"\.([A-Za-z0-9_\-]+)|\['([^']*)'\]|\[(\d+)\]").expect("valid segment regex")
});

#[derive(Debug, Clone, PartialEq, Eq)]
enum Segment {
    Key(String),
    Index(usize),
}

#[derive(Debug, Error)]
pub enum QueryError {
    #[error("not a query expression: {0}")]
    Syntax(String),
    #[error("array index out of range: {0}")]
    Index(String),
    #[error("nested value is not valid JSON: {0}")]
    Nested(#[from] serde_json::Error),
}

/// Returns true when `text` is a `$.path` style query rather than literal text.
pub fn is_query(text: &str) -> bool {
    QUERY_REGEX.is_match(text)
}

/// Resolves a display template against a message.
///
/// Empty templates yield `fallback`, queries are evaluated (falling back when
/// they find nothing or fail) and anything else is returned verbatim.
pub fn resolve(payload: &Payload, template: Option<&str>, fallback: &str) -> String {
    let template = match template {
        Some(text) if !text.is_empty() => text,
        _ => return fallback.to_string(),
    };
    if !is_query(template) {
        return template.to_string();
    }
    match query(payload, template) {
        Ok(Some(value)) => value,
        Ok(None) => fallback.to_string(),
        Err(err) => {
            tracing::debug!(target: "push", error = %err, template, "template query failed");
            fallback.to_string()
        }
    }
}

/// Evaluates a query and returns the scalar it points at, if any.
///
/// String values met on the way are parsed as JSON before descending, since
/// push providers flatten nested objects into strings.
pub fn query(payload: &Payload, expr: &str) -> Result<Option<String>, QueryError> {
    let segments = parse_segments(expr)?;
    let mut current = Value::Object(payload.as_map().clone());
    for segment in segments {
        if let Value::String(raw) = &current {
            current = serde_json::from_str(raw)?;
        }
        current = match step(current, &segment) {
            Some(next) => next,
            None => return Ok(None),
        };
    }
    Ok(scalar_text(current))
}

fn parse_segments(expr: &str) -> Result<Vec<Segment>, QueryError> {
    if !is_query(expr) {
        return Err(QueryError::Syntax(expr.to_string()));
    }
    SEGMENT_REGEX
        .captures_iter(&expr[1..])
        .map(|caps| {
            if let Some(name) = caps.get(1).or_else(|| caps.get(2)) {
                Ok(Segment::Key(name.as_str().to_string()))
            } else {
                let raw = caps.get(3).map(|m| m.as_str()).unwrap_or_default();
                raw.parse::<usize>()
                    .map(Segment::Index)
                    .map_err(|_| QueryError::Index(raw.to_string()))
            }
        })
        .collect()
}

fn step(value: Value, segment: &Segment) -> Option<Value> {
    match (value, segment) {
        (Value::Object(mut map), Segment::Key(key)) => map.remove(key),
        (Value::Array(items), Segment::Index(index)) => items.into_iter().nth(*index),
        _ => None,
    }
}

fn scalar_text(value: Value) -> Option<String> {
    match value {
        Value::String(text) => Some(text),
        Value::Number(number) => Some(number.to_string()),
        Value::Bool(flag) => Some(flag.to_string()),
        Value::Null | Value::Array(_) | Value::Object(_) => None,
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    fn payload() -> Payload {
        Payload::from_iter([
            ("message", json!("Hello there")),
            ("badge", json!(3)),
            ("urgent", json!(true)),
            ("sender name", json!("Alice")),
            ("data", json!(r#"{"title":"From data","tags":["a","b"]}"#)),
            ("nested", json!({"inner": {"text": "deep"}})),
        ])
    }

    #[test]
    fn empty_template_uses_fallback() {
        assert_eq!(resolve(&payload(), Some(""), "X"), "X");
        assert_eq!(resolve(&payload(), None, "X"), "X");
    }

    #[test]
    fn literal_text_is_returned_verbatim() {
        assert_eq!(resolve(&payload(), Some("Hello"), "fb"), "Hello");
        assert_eq!(resolve(&Payload::default(), Some("Hello"), ""), "Hello");
        assert_eq!(resolve(&payload(), Some("$5 off today"), "fb"), "$5 off today");
        assert_eq!(resolve(&payload(), Some("$"), "fb"), "$");
    }

    #[test]
    fn queries_extract_scalars() {
        let p = payload();
        assert_eq!(resolve(&p, Some("$.message"), "fb"), "Hello there");
        assert_eq!(resolve(&p, Some("$.badge"), "fb"), "3");
        assert_eq!(resolve(&p, Some("$.urgent"), "fb"), "true");
        assert_eq!(resolve(&p, Some("$['sender name']"), "fb"), "Alice");
        assert_eq!(resolve(&p, Some("$.nested.inner.text"), "fb"), "deep");
    }

    #[test]
    fn stringified_json_is_descended_into() {
        let p = payload();
        assert_eq!(resolve(&p, Some("$.data.title"), "fb"), "From data");
        assert_eq!(resolve(&p, Some("$.data.tags[1]"), "fb"), "b");
    }

    #[test]
    fn missing_or_non_scalar_values_fall_back() {
        let p = payload();
        assert_eq!(resolve(&p, Some("$.absent"), "fb"), "fb");
        assert_eq!(resolve(&p, Some("$.nested"), "fb"), "fb");
        assert_eq!(resolve(&p, Some("$.data.tags[9]"), "fb"), "fb");
    }

    #[test]
    fn evaluation_errors_fall_back() {
        // "Hello there" is not JSON, so descending into it fails.
        assert!(query(&payload(), "$.message.text").is_err());
        assert_eq!(resolve(&payload(), Some("$.message.text"), "fb"), "fb");
    }
}
