//! Captured HTTP responses

use serde_json::Value;
use std::collections::BTreeMap;

/// Longest body excerpt shown in diagnostics
const BODY_EXCERPT_LEN: usize = 200;

/// Response body as captured
#[derive(Debug, Clone, PartialEq)]
pub enum ResponseBody {
    Empty,
    Json(Value),
    Text(String),
}

impl ResponseBody {
    /// Classify raw body bytes. Anything that parses as JSON is JSON,
    /// regardless of the declared content type.
    pub fn from_bytes(bytes: &[u8]) -> Self {
        if bytes.iter().all(u8::is_ascii_whitespace) {
            return ResponseBody::Empty;
        }
        match serde_json::from_slice(bytes) {
            Ok(value) => ResponseBody::Json(value),
            Err(_) => ResponseBody::Text(String::from_utf8_lossy(bytes).into_owned()),
        }
    }
}

/// Status, headers and body of one response. Read-only once captured.
#[derive(Debug, Clone, PartialEq)]
pub struct ResponseCapture {
    pub status: u16,
    /// Header names are lowercase; repeated headers are joined with ", "
    pub headers: BTreeMap<String, String>,
    pub body: ResponseBody,
}

impl ResponseCapture {
    pub fn new(status: u16, body: ResponseBody) -> Self {
        Self {
            status,
            headers: BTreeMap::new(),
            body,
        }
    }

    pub fn with_header(mut self, name: &str, value: &str) -> Self {
        self.append_header(name, value);
        self
    }

    /// Record a header, merging repeats
    pub fn append_header(&mut self, name: &str, value: &str) {
        self.headers
            .entry(name.to_ascii_lowercase())
            .and_modify(|existing| {
                existing.push_str(", ");
                existing.push_str(value);
            })
            .or_insert_with(|| value.to_string());
    }

    /// Case-insensitive header lookup
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers
            .get(&name.to_ascii_lowercase())
            .map(String::as_str)
    }

    pub fn json(&self) -> Option<&Value> {
        match &self.body {
            ResponseBody::Json(value) => Some(value),
            _ => None,
        }
    }

    /// Look up a body field by dotted path
    pub fn field(&self, path: &str) -> Option<&Value> {
        self.json().and_then(|body| lookup(body, path))
    }

    /// Short description of the body for failure messages
    pub fn body_excerpt(&self) -> String {
        let text = match &self.body {
            ResponseBody::Empty => return "<empty body>".to_string(),
            ResponseBody::Json(value) => value.to_string(),
            ResponseBody::Text(text) => text.clone(),
        };
        if text.chars().count() > BODY_EXCERPT_LEN {
            let cut: String = text.chars().take(BODY_EXCERPT_LEN).collect();
            format!("{}...", cut)
        } else {
            text
        }
    }
}

/// Resolve a dotted path (`category.name`, `tags.0.id`) inside a JSON value.
/// An empty path or `$` is the value itself.
pub fn lookup<'a>(value: &'a Value, path: &str) -> Option<&'a Value> {
    let path = path.trim();
    if path.is_empty() || path == "$" {
        return Some(value);
    }

    path.split('.').try_fold(value, |current, segment| match current {
        Value::Object(map) => map.get(segment),
        Value::Array(items) => segment.parse::<usize>().ok().and_then(|i| items.get(i)),
        _ => None,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_body_classification() {
        assert_eq!(ResponseBody::from_bytes(b""), ResponseBody::Empty);
        assert_eq!(ResponseBody::from_bytes(b"  \n"), ResponseBody::Empty);
        assert_eq!(
            ResponseBody::from_bytes(br#"{"id": 1}"#),
            ResponseBody::Json(json!({"id": 1}))
        );
        assert_eq!(
            ResponseBody::from_bytes(b"<html>oops</html>"),
            ResponseBody::Text("<html>oops</html>".to_string())
        );
    }

    #[test]
    fn test_lookup_nested_paths() {
        let pet = json!({
            "id": 7,
            "category": {"id": 1, "name": "dog"},
            "tags": [{"id": 1, "name": "friendly"}]
        });
        assert_eq!(lookup(&pet, "id"), Some(&json!(7)));
        assert_eq!(lookup(&pet, "category.name"), Some(&json!("dog")));
        assert_eq!(lookup(&pet, "tags.0.name"), Some(&json!("friendly")));
        assert_eq!(lookup(&pet, "tags.1.name"), None);
        assert_eq!(lookup(&pet, "id.value"), None);
        assert_eq!(lookup(&pet, "$"), Some(&pet));
    }

    #[test]
    fn test_headers_are_case_insensitive_and_merged() {
        let capture = ResponseCapture::new(200, ResponseBody::Empty)
            .with_header("Content-Type", "application/json")
            .with_header("Vary", "Accept")
            .with_header("vary", "Origin");
        assert_eq!(capture.header("content-type"), Some("application/json"));
        assert_eq!(capture.header("VARY"), Some("Accept, Origin"));
        assert_eq!(capture.header("x-missing"), None);
    }

    #[test]
    fn test_body_excerpt_truncates() {
        let capture = ResponseCapture::new(200, ResponseBody::Text("A".repeat(500)));
        let excerpt = capture.body_excerpt();
        assert!(excerpt.ends_with("..."));
        assert_eq!(excerpt.len(), BODY_EXCERPT_LEN + 3);
    }
}
