//! Error definitions for all `rudder_typer` pipeline stages.

use thiserror::Error;

#[derive(Debug, Error)]
/// Top-level error type returned by public APIs.
pub enum TyperError {
    /// Unresolvable or malformed `$ref` (for example `#/$defs/Missing`).
    #[error("reference error: {0}")]
    ReferenceError(String),
    /// Schema shape failure (unknown type token, array without `items`, ...).
    #[error("schema error: {0}")]
    SchemaError(String),
    /// Identity section absent at some nesting level or not an object schema.
    #[error("identity section error: {0}")]
    IdentitySectionError(String),
    /// Malformed discriminated-union definition.
    #[error("variant error: {0}")]
    VariantError(String),
    /// IR shape the code generator cannot express.
    #[error("emission error: {0}")]
    EmissionError(String),
    /// Invalid generator configuration or platform selection.
    #[error("config error: {0}")]
    ConfigError(String),
    /// Empty id, scope or name passed to the name registry.
    #[error("name registry error: {0}")]
    NameRegistryError(String),
    /// Template placeholder failure while rendering output.
    #[error("template error: {0}")]
    TemplateError(String),
    /// Tracking plan payload could not be loaded.
    #[error("provider error: {0}")]
    ProviderError(String),
    /// Generated file rejected or not persisted.
    #[error("write error: {0}")]
    WriteError(String),
    /// Filesystem I/O error from CLI or callers that propagate I/O.
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
    /// Malformed JSON input.
    #[error("json error: {0}")]
    Json(#[from] serde_json::Error),
    /// An inner error annotated with positional context (event, property, `$ref`).
    #[error("{context}: {source}")]
    Context {
        context: String,
        source: Box<TyperError>,
    },
}

impl TyperError {
    /// Wraps `self` with a context label; the label is shown before the inner message.
    pub fn context(self, context: impl Into<String>) -> Self {
        TyperError::Context {
            context: context.into(),
            source: Box::new(self),
        }
    }

    /// Returns the innermost error, skipping every context layer.
    pub fn root_cause(&self) -> &TyperError {
        match self {
            TyperError::Context { source, .. } => source.root_cause(),
            other => other,
        }
    }
}

/// Annotates the error side of a `Result` with lazily built context.
pub trait ResultExt<T> {
    fn with_context<F, S>(self, context: F) -> Result<T, TyperError>
    where
        F: FnOnce() -> S,
        S: Into<String>;
}

impl<T> ResultExt<T> for Result<T, TyperError> {
    fn with_context<F, S>(self, context: F) -> Result<T, TyperError>
    where
        F: FnOnce() -> S,
        S: Into<String>,
    {
        self.map_err(|err| err.context(context()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn context_chain_renders_outer_to_inner() {
        let err = TyperError::SchemaError("unknown type 'date'".to_string())
            .context("property 'created'")
            .context("event 'Order Placed'");
        assert_eq!(
            err.to_string(),
            "event 'Order Placed': property 'created': schema error: unknown type 'date'"
        );
        assert!(matches!(err.root_cause(), TyperError::SchemaError(_)));
    }

    #[test]
    fn result_ext_wraps_only_errors() {
        let ok: Result<u8, TyperError> = Ok(1);
        assert_eq!(ok.with_context(|| "never used").ok(), Some(1));

        let err: Result<u8, TyperError> =
            Err(TyperError::ReferenceError("#/$defs/x".to_string()));
        let wrapped = err.with_context(|| "custom type 'y'").unwrap_err();
        assert!(wrapped.to_string().starts_with("custom type 'y': reference error"));
    }
}
