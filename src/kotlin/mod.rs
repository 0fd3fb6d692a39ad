//! Kotlin code generation for the RudderStack Kotlin SDK.
//!
//! The plan is first lowered into a [`context::KotlinContext`] (names, types,
//! members) and then rendered through `templates/kotlin/Main.kt.tmpl` into a
//! single `Main.kt`.

pub mod analytics;
pub mod context;
pub mod escape;
pub mod multitype;
pub mod naming;
pub mod render;
pub mod types;
pub mod variants;

use std::collections::BTreeMap;
use std::sync::OnceLock;

use regex::Regex;
use serde::Deserialize;
use tracing::info;

use crate::error::TyperError;
use crate::generator::{GenerateOptions, GeneratedFile, Generator, OptionDescription};
use crate::plan::TrackingPlan;

use self::context::KotlinContext;
use self::types::KotlinBuilder;

pub const PLATFORM: &str = "kotlin";

pub const DEFAULT_PACKAGE_NAME: &str = "com.rudderstack.ruddertyper";

pub const OPTIONS: &[OptionDescription] = &[OptionDescription {
    name: "packageName",
    description: "Kotlin package for the generated file",
    default: Some(DEFAULT_PACKAGE_NAME),
}];

/// Typed Kotlin platform options.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(deny_unknown_fields, rename_all = "camelCase")]
pub struct KotlinOptions {
    #[serde(default = "default_package_name")]
    pub package_name: String,
}

fn default_package_name() -> String {
    DEFAULT_PACKAGE_NAME.to_string()
}

impl Default for KotlinOptions {
    fn default() -> Self {
        Self {
            package_name: default_package_name(),
        }
    }
}

impl KotlinOptions {
    /// Decodes `key=value` options and validates them.
    pub fn from_raw(raw: &BTreeMap<String, String>) -> Result<Self, TyperError> {
        let value = serde_json::to_value(raw)?;
        let options: KotlinOptions = serde_json::from_value(value)
            .map_err(|e| TyperError::ConfigError(format!("invalid kotlin options: {e}")))?;
        options.validate()?;
        Ok(options)
    }

    pub fn validate(&self) -> Result<(), TyperError> {
        if !package_name_regex().is_match(&self.package_name) {
            return Err(TyperError::ConfigError(format!(
                "invalid packageName '{}'; expected dot-separated lowercase identifiers such as {}",
                self.package_name, DEFAULT_PACKAGE_NAME
            )));
        }
        Ok(())
    }
}

fn package_name_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(r"^[a-z][a-z0-9_]*(\.[a-z][a-z0-9_]*)*$").expect("valid package name regex")
    })
}

#[derive(Debug, Clone, Default)]
pub struct KotlinGenerator {
    options: KotlinOptions,
}

impl KotlinGenerator {
    pub fn from_raw_options(raw: &BTreeMap<String, String>) -> Result<Self, TyperError> {
        Ok(Self {
            options: KotlinOptions::from_raw(raw)?,
        })
    }

    /// Lowers `plan` into the render model without producing source.
    pub fn build_context(
        &self,
        plan: &TrackingPlan,
        rudder_cli_version: &str,
    ) -> Result<KotlinContext, TyperError> {
        let mut builder = KotlinBuilder::new();
        builder.process_plan(plan)?;
        let mut ctx = builder.into_context();
        ctx.event_context = analytics::event_context(&plan.metadata, rudder_cli_version);
        Ok(ctx)
    }
}

impl Generator for KotlinGenerator {
    fn platform(&self) -> &'static str {
        PLATFORM
    }

    fn generate(
        &self,
        plan: &TrackingPlan,
        options: &GenerateOptions,
    ) -> Result<Vec<GeneratedFile>, TyperError> {
        let ctx = self.build_context(plan, &options.rudder_cli_version)?;
        let content = render::render_main_file(&ctx, &self.options.package_name)?;
        info!(
            platform = PLATFORM,
            package = %self.options.package_name,
            bytes = content.len(),
            "generated {}",
            render::MAIN_FILE_NAME
        );
        Ok(vec![GeneratedFile {
            path: render::MAIN_FILE_NAME.to_string(),
            content,
        }])
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn raw(pairs: &[(&str, &str)]) -> BTreeMap<String, String> {
        pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect()
    }

    #[test]
    fn default_package_name_applies() {
        let options = KotlinOptions::from_raw(&BTreeMap::new()).unwrap();
        assert_eq!(options.package_name, "com.rudderstack.ruddertyper");
    }

    #[test]
    fn custom_package_name_is_validated() {
        let options = KotlinOptions::from_raw(&raw(&[("packageName", "com.acme.analytics")])).unwrap();
        assert_eq!(options.package_name, "com.acme.analytics");

        let err = KotlinOptions::from_raw(&raw(&[("packageName", "Com.Acme")])).unwrap_err();
        assert!(err.to_string().contains("invalid packageName 'Com.Acme'"), "got: {err}");
        let err = KotlinOptions::from_raw(&raw(&[("packageName", "com..acme")])).unwrap_err();
        assert!(matches!(err, TyperError::ConfigError(_)));
    }

    #[test]
    fn unknown_option_is_rejected() {
        let err = KotlinOptions::from_raw(&raw(&[("package", "x")])).unwrap_err();
        let message = err.to_string();
        assert!(message.contains("unknown field `package`"), "got: {message}");
        assert!(message.contains("packageName"), "got: {message}");
    }

    #[test]
    fn empty_plan_still_renders_wrapper() {
        let plan = TrackingPlan {
            name: "Empty".to_string(),
            rules: Vec::new(),
            metadata: Default::default(),
        };
        let files = KotlinGenerator::default()
            .generate(&plan, &GenerateOptions::new(PLATFORM))
            .unwrap();
        assert_eq!(files.len(), 1);
        assert_eq!(files[0].path, "Main.kt");
        assert!(files[0].content.contains("class RudderAnalytics"));
        assert!(files[0].content.contains("put(\"platform\", \"kotlin\")"));
    }
}
