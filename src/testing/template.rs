//! `{{name}}` placeholders
//!
//! Values flow between steps only through placeholders: a step that captures
//! `pet_id` makes `{{pet_id}}` available to the steps after it.

use serde_json::Value;
use std::collections::BTreeMap;

use crate::common::{Error, Result};
use crate::http::ResponseCapture;

/// Values visible to a step, by name
pub type Bindings = BTreeMap<String, Value>;

/// Prefix that lets a log line read from the current response body
const BODY_PREFIX: &str = "body";

/// Names referenced by placeholders in a string, in order of appearance
pub fn placeholders(text: &str) -> Vec<String> {
    scan(text)
        .into_iter()
        .filter_map(|piece| match piece {
            Piece::Placeholder(name) => Some(name.to_string()),
            Piece::Literal(_) => None,
        })
        .collect()
}

/// Names referenced anywhere inside a JSON value (object keys excluded)
pub fn value_placeholders(value: &Value) -> Vec<String> {
    let mut names = Vec::new();
    collect_value_placeholders(value, &mut names);
    names
}

fn collect_value_placeholders(value: &Value, names: &mut Vec<String>) {
    match value {
        Value::String(s) => names.extend(placeholders(s)),
        Value::Array(items) => {
            for item in items {
                collect_value_placeholders(item, names);
            }
        }
        Value::Object(map) => {
            for item in map.values() {
                collect_value_placeholders(item, names);
            }
        }
        _ => {}
    }
}

/// Interpolate bound values into a string
pub fn render_str(text: &str, bindings: &Bindings) -> Result<String> {
    substitute(text, |name| {
        bindings
            .get(name)
            .map(to_text)
            .ok_or_else(|| Error::Unbound(name.to_string()))
    })
}

/// Render placeholders inside a JSON value
///
/// A string that is exactly one placeholder is replaced by the bound value
/// itself, keeping its JSON type, so `"{{pet_id}}"` becomes a number when
/// `pet_id` is a number.
pub fn render_value(value: &Value, bindings: &Bindings) -> Result<Value> {
    match value {
        Value::String(s) => {
            if let Some(name) = sole_placeholder(s) {
                return bindings
                    .get(name)
                    .cloned()
                    .ok_or_else(|| Error::Unbound(name.to_string()));
            }
            render_str(s, bindings).map(Value::String)
        }
        Value::Array(items) => items
            .iter()
            .map(|item| render_value(item, bindings))
            .collect::<Result<Vec<_>>>()
            .map(Value::Array),
        Value::Object(map) => {
            let mut rendered = serde_json::Map::with_capacity(map.len());
            for (key, item) in map {
                rendered.insert(key.clone(), render_value(item, bindings)?);
            }
            Ok(Value::Object(rendered))
        }
        other => Ok(other.clone()),
    }
}

/// Render a log line. Besides bound values, `{{status}}`, `{{body}}` and
/// `{{body.<path>}}` read from the response. Missing values never fail a
/// log line; they render as `<missing>`.
pub fn render_log(text: &str, bindings: &Bindings, response: &ResponseCapture) -> String {
    let mut out = String::with_capacity(text.len());
    for piece in scan(text) {
        let name = match piece {
            Piece::Literal(literal) => {
                out.push_str(literal);
                continue;
            }
            Piece::Placeholder(name) => name,
        };
        let value = if name == "status" {
            Some(response.status.to_string())
        } else if name == BODY_PREFIX {
            Some(response.body_excerpt())
        } else if let Some(path) = name.strip_prefix("body.") {
            response.field(path).map(to_text)
        } else {
            bindings.get(name).map(to_text)
        };
        out.push_str(value.as_deref().unwrap_or("<missing>"));
    }
    out
}

/// Whether a placeholder name reads from the response rather than bindings
pub fn is_response_reference(name: &str) -> bool {
    name == "status" || name == BODY_PREFIX || name.starts_with("body.")
}

fn sole_placeholder(text: &str) -> Option<&str> {
    let inner = text.trim().strip_prefix("{{")?.strip_suffix("}}")?;
    if inner.contains("{{") || inner.contains("}}") {
        return None;
    }
    Some(inner.trim())
}

fn to_text(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}

/// Piece of a template string
#[derive(Debug, PartialEq)]
enum Piece<'a> {
    Literal(&'a str),
    /// Trimmed name between `{{` and `}}`
    Placeholder(&'a str),
}

/// Split `text` into literals and placeholders.
/// An unterminated `{{` is kept literally.
fn scan(text: &str) -> Vec<Piece<'_>> {
    let mut pieces = Vec::new();
    let mut rest = text;

    while let Some(start) = rest.find("{{") {
        let after_open = &rest[start + 2..];
        let Some(end) = after_open.find("}}") else {
            break;
        };
        if start > 0 {
            pieces.push(Piece::Literal(&rest[..start]));
        }
        pieces.push(Piece::Placeholder(after_open[..end].trim()));
        rest = &after_open[end + 2..];
    }

    if !rest.is_empty() {
        pieces.push(Piece::Literal(rest));
    }
    pieces
}

/// Replace every placeholder in `text` with `resolve(name)`
fn substitute<F>(text: &str, mut resolve: F) -> Result<String>
where
    F: FnMut(&str) -> Result<String>,
{
    let mut out = String::with_capacity(text.len());
    for piece in scan(text) {
        match piece {
            Piece::Literal(literal) => out.push_str(literal),
            Piece::Placeholder(name) => out.push_str(&resolve(name)?),
        }
    }
    Ok(out)
}
