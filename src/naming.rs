//! Identifier allocation and case conversion shared by every code generator.
//!
//! [`NameRegistry`] hands out names that are unique within a scope. The same
//! id always gets the name it was first given, so generators can ask for a
//! type's name from any call site without threading it around.

use std::collections::{HashMap, HashSet};
use std::sync::OnceLock;

use regex::Regex;

use crate::error::TyperError;

/// Picks a replacement for `name` given every name already used in the scope.
pub type CollisionHandler = Box<dyn Fn(&str, &[String]) -> String + Send + Sync>;

#[derive(Default)]
struct Scope {
    by_id: HashMap<String, String>,
    used: Vec<String>,
    used_set: HashSet<String>,
}

/// Scope-partitioned identifier registry. Build one per generation run.
pub struct NameRegistry {
    scopes: HashMap<String, Scope>,
    handler: CollisionHandler,
}

impl Default for NameRegistry {
    fn default() -> Self {
        Self::new(Box::new(default_collision_handler))
    }
}

impl NameRegistry {
    pub fn new(handler: CollisionHandler) -> Self {
        Self {
            scopes: HashMap::new(),
            handler,
        }
    }

    /// Binds `id` to a name in `scope`, or returns the name it already holds.
    pub fn register_name(
        &mut self,
        id: &str,
        scope: &str,
        proposed: &str,
    ) -> Result<String, TyperError> {
        if id.is_empty() {
            return Err(TyperError::NameRegistryError("id cannot be empty".to_string()));
        }
        if scope.is_empty() {
            return Err(TyperError::NameRegistryError(format!(
                "scope cannot be empty (id '{id}')"
            )));
        }
        if proposed.is_empty() {
            return Err(TyperError::NameRegistryError(format!(
                "name cannot be empty (id '{id}', scope '{scope}')"
            )));
        }

        let state = self.scopes.entry(scope.to_string()).or_default();
        if let Some(existing) = state.by_id.get(id) {
            return Ok(existing.clone());
        }

        let name = if state.used_set.contains(proposed) {
            let candidate = (self.handler)(proposed, &state.used);
            if candidate.is_empty() || state.used_set.contains(&candidate) {
                return Err(TyperError::NameRegistryError(format!(
                    "collision handler returned unusable name '{candidate}' for '{proposed}' in scope '{scope}'"
                )));
            }
            candidate
        } else {
            proposed.to_string()
        };

        state.by_id.insert(id.to_string(), name.clone());
        state.used_set.insert(name.clone());
        state.used.push(name.clone());
        Ok(name)
    }

    /// Name bound to `id` in `scope`, if any.
    pub fn lookup(&self, id: &str, scope: &str) -> Option<&str> {
        self.scopes
            .get(scope)
            .and_then(|state| state.by_id.get(id))
            .map(String::as_str)
    }
}

/// Appends the smallest positive integer that yields an unused name.
pub fn default_collision_handler(name: &str, existing: &[String]) -> String {
    let used: HashSet<&str> = existing.iter().map(String::as_str).collect();
    let mut suffix = 1usize;
    loop {
        let candidate = format!("{name}{suffix}");
        if !used.contains(candidate.as_str()) {
            return candidate;
        }
        suffix += 1;
    }
}

// ── Case conversion ────────────────────────────────────────────────────────

/// Splits on `_ - . whitespace`, lower→upper, digit→upper and acronym boundaries.
pub fn split_into_words(input: &str) -> Vec<String> {
    if input.is_empty() {
        return Vec::new();
    }
    let normalized = delimiter_regex().replace_all(input, " ");
    let normalized = camel_boundary_regex().replace_all(&normalized, "$1 $2");
    let normalized = digit_upper_regex().replace_all(&normalized, "$1 $2");
    let normalized = acronym_regex().replace_all(&normalized, "$1 $2");
    normalized.split_whitespace().map(str::to_string).collect()
}

/// `user_id` → `UserId`, `XMLHttp` → `XmlHttp`.
pub fn to_pascal_case(input: &str) -> String {
    split_into_words(input)
        .iter()
        .map(|word| capitalize(word))
        .collect()
}

/// `user_id` → `userId`.
pub fn to_camel_case(input: &str) -> String {
    let words = split_into_words(input);
    let mut out = String::new();
    for (idx, word) in words.iter().enumerate() {
        if idx == 0 {
            out.push_str(&word.to_lowercase());
        } else {
            out.push_str(&capitalize(word));
        }
    }
    out
}

/// Replaces every character that is not a letter, digit, `_` or whitespace.
pub fn replace_special_characters(input: &str, replacement: &str) -> String {
    special_character_regex()
        .replace_all(input, regex::NoExpand(replacement))
        .into_owned()
}

fn capitalize(word: &str) -> String {
    let mut chars = word.chars();
    match chars.next() {
        Some(first) => first
            .to_uppercase()
            .chain(chars.as_str().to_lowercase().chars())
            .collect(),
        None => String::new(),
    }
}

fn delimiter_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"[_\-\s\.]+").expect("valid delimiter regex"))
}

fn camel_boundary_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"([a-z])([A-Z])").expect("valid camel boundary regex"))
}

fn digit_upper_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"([0-9])([A-Z])").expect("valid digit boundary regex"))
}

fn acronym_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"([A-Z]+)([A-Z][a-z])").expect("valid acronym regex"))
}

fn special_character_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"[^\pL\pN_\s]").expect("valid special character regex"))
}
