//! Value helpers and template functions.

use chrono::{DateTime, Utc};
use serde_json::Value;

use crate::error::RenderError;

/// Functions callable from templates, by name.
const FUNCTIONS: &[&str] = &["humanDate", "eq"];

/// Resolves a function name to its static form, if it exists.
pub(crate) fn function(name: &str) -> Option<&'static str> {
    FUNCTIONS.iter().copied().find(|f| *f == name)
}

pub(crate) fn call(func: &'static str, args: &[Value]) -> Result<Value, RenderError> {
    match func {
        "humanDate" => match args {
            [value] => human_date(value).map(Value::String),
            _ => Err(RenderError::Function {
                name: func,
                message: format!("wrong number of args: want 1 got {}", args.len()),
            }),
        },
        "eq" => match args {
            [first, rest @ ..] if !rest.is_empty() => {
                Ok(Value::Bool(rest.iter().any(|other| other == first)))
            }
            _ => Err(RenderError::Function {
                name: func,
                message: format!("wrong number of args: want at least 2 got {}", args.len()),
            }),
        },
        _ => Err(RenderError::Function {
            name: func,
            message: "not defined".to_string(),
        }),
    }
}

/// Formats an RFC 3339 timestamp as `02 Jan 2006 at 15:04` in UTC. Null
/// and the empty string render as the empty string.
fn human_date(value: &Value) -> Result<String, RenderError> {
    let text = match value {
        Value::Null => return Ok(String::new()),
        Value::String(s) if s.is_empty() => return Ok(String::new()),
        Value::String(s) => s,
        other => {
            return Err(RenderError::Function {
                name: "humanDate",
                message: format!("expected a timestamp, got {}", kind(other)),
            })
        }
    };
    let parsed = DateTime::parse_from_rfc3339(text).map_err(|err| RenderError::Function {
        name: "humanDate",
        message: err.to_string(),
    })?;
    Ok(parsed
        .with_timezone(&Utc)
        .format("%d %b %Y at %H:%M")
        .to_string())
}

pub(crate) fn kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "bool",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}

pub(crate) fn is_truthy(value: &Value) -> bool {
    match value {
        Value::Null => false,
        Value::Bool(b) => *b,
        Value::Number(n) => n.as_f64().is_some_and(|f| f != 0.0),
        Value::String(s) => !s.is_empty(),
        Value::Array(items) => !items.is_empty(),
        Value::Object(map) => !map.is_empty(),
    }
}

pub(crate) fn stringify(value: &Value) -> String {
    match value {
        Value::Null => String::new(),
        Value::Bool(b) => b.to_string(),
        Value::Number(n) => n.to_string(),
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}

pub(crate) fn escape_html_into(out: &mut String, s: &str) {
    for ch in s.chars() {
        match ch {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&#34;"),
            '\'' => out.push_str("&#39;"),
            '\0' => out.push('\u{FFFD}'),
            c => out.push(c),
        }
    }
}
