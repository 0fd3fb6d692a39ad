//! Escaping of values interpolated into Kotlin source.

use serde_json::Value as JsonValue;

/// Escapes text for use inside a Kotlin `"..."` literal, including `$` templates.
pub fn escape_string_literal(raw: &str) -> String {
    let mut out = String::with_capacity(raw.len());
    for ch in raw.chars() {
        match ch {
            '\\' => out.push_str("\\\\"),
            '"' => out.push_str("\\\""),
            '\n' => out.push_str("\\n"),
            '\r' => out.push_str("\\r"),
            '\t' => out.push_str("\\t"),
            '\u{8}' => out.push_str("\\b"),
            '\u{c}' => out.push_str("\\f"),
            '$' => out.push_str("\\$"),
            other => out.push(other),
        }
    }
    out
}

/// Breaks comment delimiters so text cannot close or nest a block comment.
pub fn escape_comment(raw: &str) -> String {
    raw.replace("/*", "/\\*").replace("*/", "*\\/")
}

/// Kotlin literal for a JSON scalar; `null` renders as an empty string.
pub fn format_literal(value: &JsonValue) -> String {
    match value {
        JsonValue::Null => String::new(),
        JsonValue::String(text) => format!("\"{}\"", escape_string_literal(text)),
        JsonValue::Bool(flag) => flag.to_string(),
        JsonValue::Number(number) => number.to_string(),
        other => format!("\"{}\"", escape_string_literal(&other.to_string())),
    }
}
