//! Assertions over captured responses

use regex::Regex;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::fmt;

use super::template::{self, Bindings};
use crate::common::Result;
use crate::http::ResponseCapture;

/// A predicate over one response
///
/// In YAML each assertion is a single-key map, e.g. `status: 200` or
/// `field_type: { path: available, kind: number }`.
#[derive(Deserialize, Serialize, Debug, Clone, PartialEq)]
#[serde(rename_all = "snake_case")]
pub enum Assertion {
    /// Status code equals
    Status(u16),
    /// Status code is one of
    StatusIn(Vec<u16>),
    /// Body has a field at this path
    HasField(String),
    /// Body field equals a value (numbers compare by value, not by spelling)
    FieldEquals { path: String, value: Value },
    /// Body field has this JSON type
    FieldType { path: String, kind: JsonKind },
    /// Header value matches a regular expression
    HeaderMatches { name: String, pattern: String },
}

/// JSON value types
#[derive(Deserialize, Serialize, Debug, Clone, Copy, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum JsonKind {
    Null,
    Bool,
    Number,
    String,
    Array,
    Object,
}

impl JsonKind {
    pub fn of(value: &Value) -> Self {
        match value {
            Value::Null => JsonKind::Null,
            Value::Bool(_) => JsonKind::Bool,
            Value::Number(_) => JsonKind::Number,
            Value::String(_) => JsonKind::String,
            Value::Array(_) => JsonKind::Array,
            Value::Object(_) => JsonKind::Object,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            JsonKind::Null => "null",
            JsonKind::Bool => "bool",
            JsonKind::Number => "number",
            JsonKind::String => "string",
            JsonKind::Array => "array",
            JsonKind::Object => "object",
        }
    }
}

impl fmt::Display for JsonKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Expected vs. actual for a failed assertion
#[derive(Debug, Clone, PartialEq)]
pub struct Mismatch {
    pub assertion: String,
    pub expected: String,
    pub actual: String,
}

impl fmt::Display for Mismatch {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}: expected {}, got {}",
            self.assertion, self.expected, self.actual
        )
    }
}

impl Assertion {
    pub fn has_field(path: impl Into<String>) -> Self {
        Assertion::HasField(path.into())
    }

    pub fn field_equals(path: impl Into<String>, value: impl Into<Value>) -> Self {
        Assertion::FieldEquals {
            path: path.into(),
            value: value.into(),
        }
    }

    pub fn field_type(path: impl Into<String>, kind: JsonKind) -> Self {
        Assertion::FieldType {
            path: path.into(),
            kind,
        }
    }

    pub fn header_matches(name: impl Into<String>, pattern: impl Into<String>) -> Self {
        Assertion::HeaderMatches {
            name: name.into(),
            pattern: pattern.into(),
        }
    }

    /// Short human-readable form, used as the label of a mismatch
    pub fn describe(&self) -> String {
        match self {
            Assertion::Status(code) => format!("status == {}", code),
            Assertion::StatusIn(codes) => format!("status in {}", format_codes(codes)),
            Assertion::HasField(path) => format!("body has '{}'", path),
            Assertion::FieldEquals { path, value } => format!("body.{} == {}", path, value),
            Assertion::FieldType { path, kind } => format!("body.{} is {}", path, kind),
            Assertion::HeaderMatches { name, pattern } => {
                format!("header '{}' matches /{}/", name, pattern)
            }
        }
    }

    /// Placeholders this assertion consumes
    pub fn placeholders(&self) -> Vec<String> {
        match self {
            Assertion::FieldEquals { value, .. } => template::value_placeholders(value),
            Assertion::HeaderMatches { pattern, .. } => template::placeholders(pattern),
            _ => Vec::new(),
        }
    }

    /// Substitute bound values into the expected side
    pub fn render(&self, bindings: &Bindings) -> Result<Assertion> {
        Ok(match self {
            Assertion::FieldEquals { path, value } => Assertion::FieldEquals {
                path: path.clone(),
                value: template::render_value(value, bindings)?,
            },
            Assertion::HeaderMatches { name, pattern } => Assertion::HeaderMatches {
                name: name.clone(),
                pattern: template::render_str(pattern, bindings)?,
            },
            other => other.clone(),
        })
    }

    /// Check the assertion against a response
    pub fn evaluate(&self, response: &ResponseCapture) -> std::result::Result<(), Mismatch> {
        let mismatch = |expected: String, actual: String| Mismatch {
            assertion: self.describe(),
            expected,
            actual,
        };

        match self {
            Assertion::Status(code) => {
                if response.status == *code {
                    Ok(())
                } else {
                    Err(mismatch(code.to_string(), status_with_body(response)))
                }
            }
            Assertion::StatusIn(codes) => {
                if codes.contains(&response.status) {
                    Ok(())
                } else {
                    Err(mismatch(
                        format!("one of {}", format_codes(codes)),
                        status_with_body(response),
                    ))
                }
            }
            Assertion::HasField(path) => match field(response, path) {
                Ok(_) => Ok(()),
                Err(actual) => Err(mismatch(format!("field '{}'", path), actual)),
            },
            Assertion::FieldEquals { path, value } => match field(response, path) {
                Ok(actual) if values_match(actual, value) => Ok(()),
                Ok(actual) => Err(mismatch(value.to_string(), actual.to_string())),
                Err(actual) => Err(mismatch(value.to_string(), actual)),
            },
            Assertion::FieldType { path, kind } => match field(response, path) {
                Ok(actual) if JsonKind::of(actual) == *kind => Ok(()),
                Ok(actual) => Err(mismatch(
                    kind.to_string(),
                    format!("{} {}", JsonKind::of(actual), actual),
                )),
                Err(actual) => Err(mismatch(kind.to_string(), actual)),
            },
            Assertion::HeaderMatches { name, pattern } => {
                let re = Regex::new(pattern).map_err(|e| {
                    mismatch(
                        format!("valid pattern /{}/", pattern),
                        format!("invalid pattern: {}", e),
                    )
                })?;
                match response.header(name) {
                    Some(value) if re.is_match(value) => Ok(()),
                    Some(value) => Err(mismatch(format!("/{}/", pattern), format!("'{}'", value))),
                    None => Err(mismatch(
                        format!("/{}/", pattern),
                        format!("no '{}' header", name),
                    )),
                }
            }
        }
    }
}

/// Find a field or explain why it is not there
fn field<'a>(response: &'a ResponseCapture, path: &str) -> std::result::Result<&'a Value, String> {
    if response.json().is_none() {
        return Err(format!("non-JSON body {}", response.body_excerpt()));
    }
    response
        .field(path)
        .ok_or_else(|| format!("no field '{}' in {}", path, response.body_excerpt()))
}

/// JSON equality where `1`, `1.0` and `1u64` are the same number
fn values_match(actual: &Value, expected: &Value) -> bool {
    match (actual, expected) {
        (Value::Number(a), Value::Number(b)) => {
            if let (Some(x), Some(y)) = (a.as_i64(), b.as_i64()) {
                x == y
            } else if let (Some(x), Some(y)) = (a.as_u64(), b.as_u64()) {
                x == y
            } else {
                a.as_f64() == b.as_f64()
            }
        }
        _ => actual == expected,
    }
}

fn status_with_body(response: &ResponseCapture) -> String {
    format!("{} ({})", response.status, response.body_excerpt())
}

fn format_codes(codes: &[u16]) -> String {
    let list: Vec<String> = codes.iter().map(u16::to_string).collect();
    format!("[{}]", list.join(", "))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::http::ResponseBody;
    use serde_json::json;

    fn inventory() -> ResponseCapture {
        ResponseCapture::new(
            200,
            ResponseBody::Json(json!({"available": 12, "pending": 3, "sold": "7"})),
        )
        .with_header("Content-Type", "application/json; charset=utf-8")
    }

    #[test]
    fn test_status_assertions() {
        let response = inventory();
        assert!(Assertion::Status(200).evaluate(&response).is_ok());
        assert!(Assertion::StatusIn(vec![400, 404]).evaluate(&response).is_err());

        let miss = Assertion::Status(404).evaluate(&response).unwrap_err();
        assert_eq!(miss.expected, "404");
        assert!(miss.actual.starts_with("200 ("));
    }

    #[test]
    fn test_field_type_reports_actual_kind() {
        let response = inventory();
        assert!(Assertion::field_type("available", JsonKind::Number)
            .evaluate(&response)
            .is_ok());

        let miss = Assertion::field_type("sold", JsonKind::Number)
            .evaluate(&response)
            .unwrap_err();
        assert_eq!(miss.expected, "number");
        assert_eq!(miss.actual, "string \"7\"");
    }

    #[test]
    fn test_field_equals_compares_numbers_by_value() {
        let response = ResponseCapture::new(200, ResponseBody::Json(json!({"id": 1.0})));
        assert!(Assertion::field_equals("id", 1).evaluate(&response).is_ok());
        assert!(Assertion::field_equals("id", 2).evaluate(&response).is_err());
    }

    #[test]
    fn test_missing_field_on_text_body() {
        let response = ResponseCapture::new(500, ResponseBody::Text("boom".to_string()));
        let miss = Assertion::has_field("id").evaluate(&response).unwrap_err();
        assert_eq!(miss.actual, "non-JSON body boom");
    }

    #[test]
    fn test_header_matches() {
        let response = inventory();
        assert!(Assertion::header_matches("content-type", "application/json")
            .evaluate(&response)
            .is_ok());
        assert!(Assertion::header_matches("content-type", "text/html")
            .evaluate(&response)
            .is_err());

        let miss = Assertion::header_matches("x-request-id", ".+")
            .evaluate(&response)
            .unwrap_err();
        assert_eq!(miss.actual, "no 'x-request-id' header");

        let miss = Assertion::header_matches("content-type", "(")
            .evaluate(&response)
            .unwrap_err();
        assert!(miss.actual.starts_with("invalid pattern"));
    }

    #[test]
    fn test_render_substitutes_expected_value() {
        let mut bindings = Bindings::new();
        bindings.insert("pet_id".to_string(), json!(42));
        let rendered = Assertion::field_equals("id", "{{pet_id}}")
            .render(&bindings)
            .unwrap();
        assert_eq!(rendered, Assertion::field_equals("id", 42));
    }

    #[test]
    fn test_yaml_shapes() {
        let yaml = r#"
- status: 200
- status_in: [400, 404]
- has_field: name
- field_equals: { path: message, value: Pet not found }
- field_type: { path: sold, kind: number }
- header_matches: { name: content-type, pattern: application/json }
"#;
        let parsed: Vec<Assertion> = serde_yaml::from_str(yaml).unwrap();
        assert_eq!(
            parsed,
            vec![
                Assertion::Status(200),
                Assertion::StatusIn(vec![400, 404]),
                Assertion::has_field("name"),
                Assertion::field_equals("message", "Pet not found"),
                Assertion::field_type("sold", JsonKind::Number),
                Assertion::header_matches("content-type", "application/json"),
            ]
        );
    }
}
