//! Tracking plan sources and the JSON Schema plan provider.
//!
//! The catalog service serves a "tracking plan with schemas" payload; this
//! module models that payload and turns it into a [`TrackingPlan`]. Fetching
//! over the network is left to callers: a payload can come from a file or be
//! handed over in memory.

use std::fs;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use serde_json::Value as JsonValue;
use tracing::{debug, info};

use crate::error::{ResultExt, TyperError};
use crate::jsonschema::parse_event_rule;
use crate::plan::{PlanMetadata, TrackingPlan};

/// Catalog payload for one tracking plan.
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TrackingPlanWithSchemas {
    pub id: String,
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    pub version: u64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub url: Option<String>,
    #[serde(default)]
    pub events: Vec<TrackingPlanEventSchema>,
}

/// Catalog payload for one event and its rules document.
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TrackingPlanEventSchema {
    pub name: String,
    #[serde(default)]
    pub description: String,
    pub event_type: String,
    pub identity_section: String,
    /// JSON Schema document: `{ "$schema", "type", "properties", "$defs" }`.
    pub rules: JsonValue,
}

/// Supplies the raw catalog payload.
pub trait TrackingPlanSource {
    fn fetch(&self) -> Result<TrackingPlanWithSchemas, TyperError>;
}

impl TrackingPlanSource for TrackingPlanWithSchemas {
    fn fetch(&self) -> Result<TrackingPlanWithSchemas, TyperError> {
        Ok(self.clone())
    }
}

/// Reads a catalog payload previously saved as JSON.
#[derive(Debug, Clone)]
pub struct FileTrackingPlanSource {
    path: PathBuf,
}

impl FileTrackingPlanSource {
    pub fn new(path: impl AsRef<Path>) -> Self {
        Self {
            path: path.as_ref().to_path_buf(),
        }
    }
}

impl TrackingPlanSource for FileTrackingPlanSource {
    fn fetch(&self) -> Result<TrackingPlanWithSchemas, TyperError> {
        let input = fs::read_to_string(&self.path).map_err(|e| {
            TyperError::ProviderError(format!(
                "failed to read '{}': {e}",
                self.path.display()
            ))
        })?;
        serde_json::from_str(&input).map_err(|e| {
            TyperError::ProviderError(format!(
                "invalid tracking plan payload in '{}': {e}",
                self.path.display()
            ))
        })
    }
}

/// Produces the IR consumed by generators.
pub trait PlanProvider {
    fn tracking_plan(&self) -> Result<TrackingPlan, TyperError>;
}

/// Builds a [`TrackingPlan`] by parsing each event's JSON Schema rules.
pub struct JsonSchemaPlanProvider<S> {
    source: S,
}

impl<S: TrackingPlanSource> JsonSchemaPlanProvider<S> {
    pub fn new(source: S) -> Self {
        Self { source }
    }
}

impl<S: TrackingPlanSource> PlanProvider for JsonSchemaPlanProvider<S> {
    fn tracking_plan(&self) -> Result<TrackingPlan, TyperError> {
        let payload = self.source.fetch()?;
        build_tracking_plan(&payload)
            .with_context(|| format!("tracking plan '{}'", payload.id))
    }
}

/// Parses every event of a catalog payload; the first failure aborts.
pub fn build_tracking_plan(payload: &TrackingPlanWithSchemas) -> Result<TrackingPlan, TyperError> {
    let mut rules = Vec::with_capacity(payload.events.len());
    for event in &payload.events {
        let rule = parse_event_rule(event)?;
        debug!(
            event = %rule.event.name,
            event_type = %rule.event.event_type,
            section = %rule.section,
            properties = rule.schema.properties.len(),
            "parsed event rule"
        );
        rules.push(rule);
    }
    info!(
        plan = %payload.id,
        version = payload.version,
        events = rules.len(),
        "parsed tracking plan"
    );

    Ok(TrackingPlan {
        name: payload.name.clone(),
        rules,
        metadata: PlanMetadata {
            tracking_plan_id: payload.id.clone(),
            tracking_plan_version: payload.version,
            url: payload.url.clone(),
        },
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn payload() -> TrackingPlanWithSchemas {
        serde_json::from_value(json!({
            "id": "tp_1",
            "name": "Checkout",
            "version": 7,
            "creationType": "backend",
            "events": [{
                "id": "ev_1",
                "name": "Order Placed",
                "eventType": "track",
                "identitySection": "properties",
                "rules": {
                    "$schema": "https://json-schema.org/draft/2020-12/schema",
                    "type": "object",
                    "properties": {
                        "properties": {
                            "type": "object",
                            "properties": { "total": { "type": "number" } },
                            "required": ["total"]
                        }
                    }
                }
            }]
        }))
        .unwrap()
    }

    #[test]
    fn payload_ignores_unknown_catalog_fields() {
        let payload = payload();
        assert_eq!(payload.version, 7);
        assert_eq!(payload.events[0].description, "");
        assert_eq!(payload.events[0].identity_section, "properties");
    }

    #[test]
    fn provider_fills_metadata_and_rules() {
        let plan = JsonSchemaPlanProvider::new(payload()).tracking_plan().unwrap();
        assert_eq!(plan.name, "Checkout");
        assert_eq!(plan.metadata.tracking_plan_id, "tp_1");
        assert_eq!(plan.metadata.tracking_plan_version, 7);
        assert_eq!(plan.rules.len(), 1);
        assert!(plan.rules[0].schema.properties["total"].required);
    }

    #[test]
    fn provider_errors_carry_plan_and_event_context() {
        let mut payload = payload();
        payload.events[0].identity_section = "traits".to_string();
        let err = JsonSchemaPlanProvider::new(payload).tracking_plan().unwrap_err();
        let message = err.to_string();
        assert!(
            message.starts_with("tracking plan 'tp_1': event 'Order Placed': identity section error"),
            "got: {message}"
        );
    }

    #[test]
    fn file_source_reports_missing_file() {
        let source = FileTrackingPlanSource::new("/nonexistent/plan.json");
        let err = source.fetch().unwrap_err();
        assert!(err.to_string().contains("failed to read '/nonexistent/plan.json'"), "got: {err}");
    }
}
