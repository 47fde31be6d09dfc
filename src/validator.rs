use crate::error::{FieldViolation, ReportError, SchemaValidationError};
use crate::models::{InterviewReport, IntrospectionReport, Report, ReportKind};
use crate::schema::{Bounds, ReportSchema, Shape};
use serde_json::Value;
use std::collections::HashSet;
use tracing::{debug, warn};

/// Whatever an evaluation mode returned, before any checking
#[derive(Debug, Clone, PartialEq)]
pub enum RawResult {
    Text(String),
    Structured(Value),
}

impl From<Value> for RawResult {
    fn from(value: Value) -> Self {
        match value {
            Value::String(text) => RawResult::Text(text),
            other => RawResult::Structured(other),
        }
    }
}

impl From<String> for RawResult {
    fn from(text: String) -> Self {
        RawResult::Text(text)
    }
}

/// Turn a raw agent result into a typed report of the given kind.
///
/// Unparseable text is a [`ReportError::Format`]; parseable JSON that breaks
/// the contract is a [`ReportError::Validation`] carrying every violation.
pub fn validate(raw: RawResult, kind: ReportKind) -> Result<Report, ReportError> {
    let value = parse_raw(raw)?;
    if !value.is_object() {
        return Err(ReportError::Format(format!(
            "expected a JSON object, got {}",
            json_type(&value)
        )));
    }

    let schema = ReportSchema::for_kind(kind);
    let violations = check_value(&value, &schema);
    if !violations.is_empty() {
        return Err(SchemaValidationError { violations }.into());
    }

    let report = match kind {
        ReportKind::Introspection => {
            serde_json::from_value::<IntrospectionReport>(value).map(Report::Introspection)
        }
        ReportKind::Interview => {
            serde_json::from_value::<InterviewReport>(value).map(Report::Interview)
        }
    }
    .map_err(|e| SchemaValidationError {
        violations: vec![FieldViolation {
            path: "(root)".to_string(),
            expected: "a well-formed report".to_string(),
            actual: e.to_string(),
        }],
    })?;

    warn_unmatched_scores(&report, &schema);
    Ok(report)
}

/// Check a parsed value against a schema, collecting all violations
pub fn check_value(value: &Value, schema: &ReportSchema) -> Vec<FieldViolation> {
    let mut violations = Vec::new();
    check(value, &schema.root, "", &mut violations);
    violations
}

fn parse_raw(raw: RawResult) -> Result<Value, ReportError> {
    match raw {
        RawResult::Structured(value) => Ok(value),
        RawResult::Text(text) => parse_json_response(&text),
    }
}

/// Parse JSON from agent text, handling fenced or embedded JSON
fn parse_json_response(response: &str) -> Result<Value, ReportError> {
    match serde_json::from_str(response.trim()) {
        Ok(parsed) => Ok(parsed),
        Err(e) => {
            debug!(error = %e, "agent output is not bare JSON, looking for an embedded object");
            try_extract_embedded_json(strip_code_fence(response))
        }
    }
}

fn strip_code_fence(response: &str) -> &str {
    let trimmed = response.trim();
    match trimmed.strip_prefix("```") {
        Some(rest) => {
            let body = rest.trim_start_matches("json");
            body.strip_suffix("```").unwrap_or(body)
        }
        None => trimmed,
    }
}

/// Try to extract JSON that might be embedded in text
fn try_extract_embedded_json(response: &str) -> Result<Value, ReportError> {
    match response.find('{') {
        Some(start) => match response.rfind('}') {
            Some(end) if end > start => serde_json::from_str(&response[start..=end])
                .map_err(|e| ReportError::Format(format!("failed to parse extracted JSON: {}", e))),
            _ => Err(ReportError::Format(
                "found opening brace but no closing brace in response".to_string(),
            )),
        },
        None => Err(ReportError::Format("no JSON found in response".to_string())),
    }
}

fn check(value: &Value, shape: &Shape, path: &str, violations: &mut Vec<FieldViolation>) {
    match shape {
        Shape::String => {
            if !value.is_string() {
                violations.push(violation(path, shape.expected(), value));
            }
        }
        Shape::Integer => {
            if value.as_i64().is_none() {
                violations.push(violation(path, shape.expected(), value));
            }
        }
        Shape::Number(bounds) => check_number(value, bounds, path, violations),
        Shape::StringOrObject => {
            if !(value.is_string() || value.is_object()) {
                violations.push(violation(path, shape.expected(), value));
            }
        }
        Shape::List { item, unique_by } => {
            let Some(items) = value.as_array() else {
                violations.push(violation(path, shape.expected(), value));
                return;
            };
            for (index, element) in items.iter().enumerate() {
                check(element, item, &format!("{}[{}]", path, index), violations);
            }
            if let Some(key) = unique_by {
                check_unique(items, key, path, violations);
            }
        }
        Shape::Record { fields, .. } => {
            let Some(object) = value.as_object() else {
                violations.push(violation(path, shape.expected(), value));
                return;
            };
            for field in fields {
                let field_path = join(path, field.name);
                match object.get(field.name) {
                    Some(field_value) => check(field_value, &field.shape, &field_path, violations),
                    None => violations.push(FieldViolation {
                        path: field_path,
                        expected: field.shape.expected(),
                        actual: "missing".to_string(),
                    }),
                }
            }
        }
        Shape::ScoreMap(bounds) => {
            let Some(object) = value.as_object() else {
                violations.push(violation(path, shape.expected(), value));
                return;
            };
            for (key, score) in object {
                check_number(score, bounds, &join(path, key), violations);
            }
        }
    }
}

fn check_number(value: &Value, bounds: &Bounds, path: &str, violations: &mut Vec<FieldViolation>) {
    match value.as_f64() {
        Some(number) if bounds.contains(number) => {}
        _ => violations.push(violation(path, bounds.describe(), value)),
    }
}

fn check_unique(items: &[Value], key: &str, path: &str, violations: &mut Vec<FieldViolation>) {
    let mut seen = HashSet::new();
    for (index, item) in items.iter().enumerate() {
        if let Some(id) = item.get(key) {
            if !seen.insert(id.to_string()) {
                violations.push(violation(
                    &format!("{}[{}].{}", path, index, key),
                    format!("{} unique within {}", key, path),
                    id,
                ));
            }
        }
    }
}

fn warn_unmatched_scores(report: &Report, schema: &ReportSchema) {
    let unmatched = report.unmatched_score_keys();
    if !unmatched.is_empty() {
        warn!(
            field = schema.score_field(),
            keys = ?unmatched,
            "score keys do not match any declared name"
        );
    }
}

fn violation(path: &str, expected: String, actual: &Value) -> FieldViolation {
    FieldViolation {
        path: if path.is_empty() { "(root)".to_string() } else { path.to_string() },
        expected,
        actual: actual.to_string(),
    }
}

fn join(path: &str, name: &str) -> String {
    if path.is_empty() {
        name.to_string()
    } else {
        format!("{}.{}", path, name)
    }
}

fn json_type(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}
