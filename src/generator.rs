//! Platform generator registry and shared output types.

use std::collections::BTreeMap;

use serde::Serialize;

use crate::error::TyperError;
use crate::kotlin::{self, KotlinGenerator};
use crate::plan::TrackingPlan;

/// One output file, relative to the output directory.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct GeneratedFile {
    pub path: String,
    pub content: String,
}

/// Options for one generation run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GenerateOptions {
    /// Version embedded in the generated `ruddertyper` context.
    pub rudder_cli_version: String,
    pub platform: String,
    /// Raw `key=value` platform options, validated by the platform.
    pub platform_options: BTreeMap<String, String>,
}

impl GenerateOptions {
    pub fn new(platform: impl Into<String>) -> Self {
        Self {
            rudder_cli_version: env!("CARGO_PKG_VERSION").to_string(),
            platform: platform.into(),
            platform_options: BTreeMap::new(),
        }
    }

    pub fn with_option(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.platform_options.insert(key.into(), value.into());
        self
    }
}

/// A platform-specific code generator.
pub trait Generator {
    fn platform(&self) -> &'static str;

    /// Produces every file for `plan`; fails as a whole or not at all.
    fn generate(
        &self,
        plan: &TrackingPlan,
        options: &GenerateOptions,
    ) -> Result<Vec<GeneratedFile>, TyperError>;
}

/// Documentation for one platform option.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OptionDescription {
    pub name: &'static str,
    pub description: &'static str,
    pub default: Option<&'static str>,
}

pub const SUPPORTED_PLATFORMS: &[&str] = &[kotlin::PLATFORM];

/// Builds the generator for `platform` after validating its options.
pub fn generator_for_platform(
    platform: &str,
    raw_options: &BTreeMap<String, String>,
) -> Result<Box<dyn Generator>, TyperError> {
    match platform {
        kotlin::PLATFORM => Ok(Box::new(KotlinGenerator::from_raw_options(raw_options)?)),
        other => Err(unsupported_platform(other)),
    }
}

/// Options accepted by `platform`.
pub fn available_options(platform: &str) -> Result<&'static [OptionDescription], TyperError> {
    match platform {
        kotlin::PLATFORM => Ok(kotlin::OPTIONS),
        other => Err(unsupported_platform(other)),
    }
}

/// Parses repeated `key=value` arguments; later keys win.
pub fn parse_option_pairs<S: AsRef<str>>(
    pairs: &[S],
) -> Result<BTreeMap<String, String>, TyperError> {
    let mut options = BTreeMap::new();
    for pair in pairs {
        let pair = pair.as_ref();
        let Some((key, value)) = pair.split_once('=') else {
            return Err(TyperError::ConfigError(format!(
                "invalid option '{pair}'; expected key=value"
            )));
        };
        let key = key.trim();
        if key.is_empty() {
            return Err(TyperError::ConfigError(format!(
                "invalid option '{pair}'; key cannot be empty"
            )));
        }
        options.insert(key.to_string(), value.trim().to_string());
    }
    Ok(options)
}

fn unsupported_platform(platform: &str) -> TyperError {
    TyperError::ConfigError(format!(
        "unsupported platform '{platform}'; supported: {}",
        SUPPORTED_PLATFORMS.join(", ")
    ))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_option_pairs() {
        let options = parse_option_pairs(&["packageName=com.example", " a = b=c "]).unwrap();
        assert_eq!(options["packageName"], "com.example");
        assert_eq!(options["a"], "b=c");
    }

    #[test]
    fn rejects_malformed_pairs() {
        let err = parse_option_pairs(&["packageName"]).unwrap_err();
        assert!(err.to_string().contains("expected key=value"), "got: {err}");
        let err = parse_option_pairs(&["=x"]).unwrap_err();
        assert!(err.to_string().contains("key cannot be empty"), "got: {err}");
    }

    #[test]
    fn unknown_platform_lists_supported_ones() {
        let err = generator_for_platform("swift", &BTreeMap::new()).err().unwrap();
        assert!(err.to_string().contains("unsupported platform 'swift'; supported: kotlin"), "got: {err}");
        assert!(available_options("swift").is_err());
    }

    #[test]
    fn kotlin_options_are_listed() {
        let options = available_options("kotlin").unwrap();
        assert_eq!(options[0].name, "packageName");
        assert_eq!(options[0].default, Some("com.rudderstack.ruddertyper"));
    }
}
