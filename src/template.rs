//! Placeholder expansion for generated source files.
//!
//! Templates are plain text with `{{VAR}}` or `{{VAR:default}}` placeholders.
//! Every variable passed in must be used by the template, and every
//! placeholder without a default must be supplied.

use std::collections::{BTreeMap, BTreeSet};
use std::sync::OnceLock;

use regex::Regex;

use crate::error::TyperError;

/// Variables for one render call, keyed by placeholder name.
pub type TemplateVars = BTreeMap<&'static str, String>;

/// Expands every placeholder in `template`.
///
/// `template_name` only labels error messages.
pub fn render_template(
    template_name: &str,
    template: &str,
    vars: &TemplateVars,
) -> Result<String, TyperError> {
    let allowed = collect_placeholders(template);
    for key in vars.keys() {
        if !allowed.contains(*key) {
            return Err(TyperError::TemplateError(format!(
                "unexpected template variable '{}' for template '{}'; allowed: {}",
                key,
                template_name,
                format_allowed_vars(&allowed)
            )));
        }
    }

    let mut rendered = String::with_capacity(template.len());
    let mut cursor = 0usize;

    for captures in placeholder_scan_regex().captures_iter(template) {
        let Some(full) = captures.get(0) else {
            continue;
        };
        let Some(name_match) = captures.get(1) else {
            continue;
        };

        rendered.push_str(&template[cursor..full.start()]);

        let name = name_match.as_str();
        match vars.get(name) {
            Some(value) => rendered.push_str(value),
            None => match captures.get(2) {
                Some(default) => rendered.push_str(default.as_str()),
                None => {
                    return Err(TyperError::TemplateError(format!(
                        "missing required template variable '{}' in template '{}'",
                        name, template_name
                    )))
                }
            },
        }

        cursor = full.end();
    }

    rendered.push_str(&template[cursor..]);
    Ok(rendered)
}

fn collect_placeholders(template: &str) -> BTreeSet<String> {
    placeholder_scan_regex()
        .captures_iter(template)
        .filter_map(|captures| captures.get(1).map(|m| m.as_str().to_string()))
        .collect()
}

fn format_allowed_vars(vars: &BTreeSet<String>) -> String {
    if vars.is_empty() {
        "(none)".to_string()
    } else {
        vars.iter().cloned().collect::<Vec<_>>().join(", ")
    }
}

fn placeholder_scan_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(r"\{\{\s*([A-Za-z_][A-Za-z0-9_]*)(?::(.*?))?\s*\}\}")
            .expect("valid placeholder scan regex")
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn vars(pairs: &[(&'static str, &str)]) -> TemplateVars {
        pairs.iter().map(|(k, v)| (*k, v.to_string())).collect()
    }

    #[test]
    fn substitutes_values_and_defaults() {
        let out = render_template(
            "t",
            "package {{PACKAGE}}\n// {{BANNER:generated}}\n",
            &vars(&[("PACKAGE", "com.example")]),
        )
        .unwrap();
        assert_eq!(out, "package com.example\n// generated\n");
    }

    #[test]
    fn multi_line_values_are_inserted_verbatim() {
        let out = render_template("t", "a\n{{BODY}}\nz", &vars(&[("BODY", "b\nc")])).unwrap();
        assert_eq!(out, "a\nb\nc\nz");
    }

    #[test]
    fn missing_variable_without_default_fails() {
        let err = render_template("main", "{{PACKAGE}}", &TemplateVars::new()).unwrap_err();
        assert!(
            err.to_string().contains("missing required template variable 'PACKAGE'"),
            "got: {err}"
        );
    }

    #[test]
    fn unexpected_variable_fails() {
        let err = render_template("main", "{{A}}", &vars(&[("A", "1"), ("B", "2")])).unwrap_err();
        assert!(err.to_string().contains("unexpected template variable 'B'"), "got: {err}");
        assert!(err.to_string().contains("allowed: A"), "got: {err}");
    }

    #[test]
    fn single_braces_are_left_alone() {
        let out = render_template("t", "fun f() { {{X}} }", &vars(&[("X", "g()")])).unwrap();
        assert_eq!(out, "fun f() { g() }");
    }
}
