//! Kotlin identifier formatting and registry keys.

use std::collections::HashMap;

use serde_json::Value as JsonValue;

use crate::naming::{replace_special_characters, split_into_words, to_camel_case, to_pascal_case};

/// Every top-level Kotlin declaration shares this scope.
pub const TYPES_SCOPE: &str = "types";
pub const METHOD_SCOPE: &str = "method";

const KOTLIN_KEYWORDS: &[&str] = &[
    "as",
    "break",
    "class",
    "continue",
    "do",
    "else",
    "false",
    "for",
    "fun",
    "if",
    "in",
    "interface",
    "is",
    "null",
    "object",
    "package",
    "return",
    "super",
    "this",
    "throw",
    "true",
    "try",
    "typealias",
    "typeof",
    "val",
    "var",
    "when",
    "while",
];

pub fn is_kotlin_keyword(text: &str) -> bool {
    KOTLIN_KEYWORDS.contains(&text)
}

/// PascalCase class name, `_`-guarded against digits and keywords, then prefixed.
///
/// A name with no letters or digits becomes `_`.
pub fn format_class_name(prefix: &str, name: &str) -> String {
    let trimmed = name.trim();
    if trimmed.is_empty() && !prefix.is_empty() {
        return prefix.to_string();
    }
    let formatted = or_placeholder(to_pascal_case(&sanitize(trimmed)));
    format!("{prefix}{}", guard_identifier(formatted, trimmed))
}

/// camelCase property name; `_` when nothing usable is left.
pub fn format_property_name(name: &str) -> String {
    let trimmed = name.trim();
    let formatted = or_placeholder(to_camel_case(&sanitize(trimmed)));
    guard_identifier(formatted, trimmed)
}

/// `camel(prefix) + Pascal(name)`, e.g. `trackUserSignedUp`.
pub fn format_method_name(prefix: &str, name: &str) -> String {
    if prefix.is_empty() {
        return format_property_name(name);
    }
    let body = to_pascal_case(&sanitize(name.trim()));
    format!("{}{}", to_camel_case(prefix), body)
}

/// UPPER_SNAKE_CASE enum constant, e.g. `smartTV` → `SMART_TV`.
pub fn format_enum_value(value: &JsonValue) -> String {
    let raw = literal_text(value);
    let trimmed = raw.trim();
    let words = split_into_words(&replace_special_characters(trimmed, " "));
    let joined = words
        .iter()
        .map(|word| word.to_uppercase())
        .collect::<Vec<_>>()
        .join("_");
    if joined.is_empty() {
        return "_".to_string();
    }
    guard_identifier(joined, trimmed)
}

/// Subclass name for a variant match value, e.g. `true` → `Case_True`.
pub fn format_case_name(value: &JsonValue) -> String {
    format_class_name("Case", &literal_text(value))
}

/// Text of a JSON value without string quotes.
pub fn literal_text(value: &JsonValue) -> String {
    match value {
        JsonValue::String(text) => text.clone(),
        other => other.to_string(),
    }
}

fn sanitize(name: &str) -> String {
    replace_special_characters(name, " ")
}

fn or_placeholder(formatted: String) -> String {
    if formatted.is_empty() {
        "_".to_string()
    } else {
        formatted
    }
}

fn guard_identifier(formatted: String, original: &str) -> String {
    let starts_with_digit = formatted.chars().next().is_some_and(|c| c.is_ascii_digit());
    let mut out = formatted;
    if starts_with_digit {
        out.insert(0, '_');
    }
    if is_kotlin_keyword(&original.to_lowercase()) {
        out.insert(0, '_');
    }
    out
}

/// Registry id per distinct definition sharing a name.
///
/// The first definition seen for `name` gets `<prefix>:<name>`; later,
/// structurally different ones get `<prefix>:<name>#2`, `#3`, ...
pub struct DefinitionKeys<T> {
    prefix: &'static str,
    by_name: HashMap<String, Vec<T>>,
}

impl<T: PartialEq + Clone> DefinitionKeys<T> {
    pub fn new(prefix: &'static str) -> Self {
        Self {
            prefix,
            by_name: HashMap::new(),
        }
    }

    pub fn key(&mut self, name: &str, definition: &T) -> String {
        let seen = self.by_name.entry(name.to_string()).or_default();
        let idx = match seen.iter().position(|known| known == definition) {
            Some(idx) => idx,
            None => {
                seen.push(definition.clone());
                seen.len() - 1
            }
        };
        if idx == 0 {
            format!("{}:{}", self.prefix, name)
        } else {
            format!("{}:{}#{}", self.prefix, name, idx + 1)
        }
    }
}
