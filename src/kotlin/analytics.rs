//! Methods of the generated `RudderAnalytics` wrapper.

use tracing::{debug, warn};

use crate::error::TyperError;
use crate::plan::{EventRule, EventType, IdentitySection, PlanMetadata};

use super::context::{KotlinMethod, KotlinMethodArgument, SdkArgumentValue, SdkCall, SdkCallArgument};
use super::escape::escape_string_literal;
use super::naming::{format_method_name, METHOD_SCOPE};
use super::types::{event_id, KotlinBuilder};
use super::PLATFORM;

impl KotlinBuilder {
    /// Builds the wrapper method for `rule`, or `None` when the rule gets none.
    pub(super) fn analytics_method(
        &mut self,
        rule: &EventRule,
        class_name: &str,
    ) -> Result<Option<KotlinMethod>, TyperError> {
        let event_type = rule.event.event_type;
        if !event_type.accepts_section(rule.section) {
            warn!(
                event = %rule.event.name,
                event_type = %event_type,
                section = %rule.section,
                "skipping method: section does not apply to event type"
            );
            return Ok(None);
        }

        let (proposed, sdk_method, mut arguments, mut sdk_arguments) = match event_type {
            EventType::Track => (
                format_method_name("track", &rule.event.name),
                "track",
                Vec::new(),
                vec![literal_argument("name", &rule.event.name)],
            ),
            EventType::Identify => (
                "identify".to_string(),
                "identify",
                vec![string_argument("userId", Some("\"\""))],
                vec![parameter_argument("userId")],
            ),
            EventType::Group => (
                "group".to_string(),
                "group",
                vec![string_argument("groupId", None)],
                vec![parameter_argument("groupId")],
            ),
            EventType::Screen => (
                "screen".to_string(),
                "screen",
                vec![
                    string_argument("screenName", None),
                    string_argument("category", Some("\"\"")),
                ],
                vec![parameter_argument("screenName"), parameter_argument("category")],
            ),
            EventType::Page => {
                debug!(event = %rule.event.name, "page events have no wrapper method");
                return Ok(None);
            }
        };

        let name = self
            .registry
            .register_name(&event_id(rule), METHOD_SCOPE, &proposed)?;

        let param = match rule.section {
            IdentitySection::Properties => "properties",
            IdentitySection::Traits | IdentitySection::ContextTraits => "traits",
        };
        let mut context_payload = None;
        if has_payload(rule) {
            arguments.push(KotlinMethodArgument {
                name: param.to_string(),
                type_name: class_name.to_string(),
                default: None,
            });
            if rule.section == IdentitySection::ContextTraits {
                context_payload = Some(param.to_string());
            } else {
                sdk_arguments.push(SdkCallArgument {
                    name: param.to_string(),
                    value: SdkArgumentValue::Serialized(param.to_string()),
                });
            }
        }

        Ok(Some(KotlinMethod {
            name,
            comment: rule.event.description.clone(),
            arguments,
            sdk_call: SdkCall {
                method_name: sdk_method,
                arguments: sdk_arguments,
            },
            context_payload,
        }))
    }
}

/// A payload parameter exists when the schema has properties or is open.
///
/// A variant also needs one: its sealed class is the only way to send the
/// case members, even when the base schema is empty and closed.
fn has_payload(rule: &EventRule) -> bool {
    !rule.schema.is_empty() || rule.schema.additional_properties || !rule.variants.is_empty()
}

fn string_argument(name: &str, default: Option<&str>) -> KotlinMethodArgument {
    KotlinMethodArgument {
        name: name.to_string(),
        type_name: "String".to_string(),
        default: default.map(str::to_string),
    }
}

fn parameter_argument(name: &str) -> SdkCallArgument {
    SdkCallArgument {
        name: name.to_string(),
        value: SdkArgumentValue::Parameter(name.to_string()),
    }
}

fn literal_argument(name: &str, value: &str) -> SdkCallArgument {
    SdkCallArgument {
        name: name.to_string(),
        value: SdkArgumentValue::Literal(value.to_string()),
    }
}

/// Entries of the `ruddertyper` object sent with every event.
pub(super) fn event_context(metadata: &PlanMetadata, cli_version: &str) -> Vec<(String, String)> {
    let quoted = |text: &str| format!("\"{}\"", escape_string_literal(text));
    let mut entries = vec![
        ("platform".to_string(), quoted(PLATFORM)),
        ("rudderCLIVersion".to_string(), quoted(cli_version)),
        ("trackingPlanId".to_string(), quoted(&metadata.tracking_plan_id)),
        (
            "trackingPlanVersion".to_string(),
            metadata.tracking_plan_version.to_string(),
        ),
    ];
    if let Some(url) = &metadata.url {
        entries.push(("trackingPlanUrl".to_string(), quoted(url)));
    }
    entries
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::plan::{Event, ObjectSchema, Variant, VariantCase, VariantKind};
    use serde_json::json;

    fn rule(event_type: EventType, name: &str, section: IdentitySection, schema: ObjectSchema) -> EventRule {
        EventRule {
            event: Event {
                event_type,
                name: name.to_string(),
                description: "Doc".to_string(),
            },
            section,
            schema,
            variants: Vec::new(),
        }
    }

    fn open() -> ObjectSchema {
        ObjectSchema {
            additional_properties: true,
            ..ObjectSchema::empty_closed()
        }
    }

    #[test]
    fn track_method_passes_event_name_and_properties() {
        let mut builder = KotlinBuilder::new();
        let method = builder
            .analytics_method(
                &rule(EventType::Track, "User \"Signed\" Up", IdentitySection::Properties, open()),
                "TrackUserSignedUpProperties",
            )
            .unwrap()
            .unwrap();
        assert_eq!(method.name, "trackUserSignedUp");
        assert_eq!(method.sdk_call.method_name, "track");
        assert_eq!(
            method.sdk_call.arguments[0].value,
            SdkArgumentValue::Literal("User \"Signed\" Up".to_string())
        );
        assert_eq!(method.arguments[0].name, "properties");
        assert_eq!(method.arguments[0].type_name, "TrackUserSignedUpProperties");
    }

    #[test]
    fn fixed_leading_parameters_per_event_type() {
        let mut builder = KotlinBuilder::new();
        let identify = builder
            .analytics_method(&rule(EventType::Identify, "", IdentitySection::Traits, open()), "IdentifyTraits")
            .unwrap()
            .unwrap();
        assert_eq!(identify.arguments[0].name, "userId");
        assert_eq!(identify.arguments[0].default.as_deref(), Some("\"\""));
        assert_eq!(identify.arguments[1].name, "traits");

        let screen = builder
            .analytics_method(&rule(EventType::Screen, "", IdentitySection::Properties, open()), "ScreenProperties")
            .unwrap()
            .unwrap();
        let names: Vec<_> = screen.arguments.iter().map(|a| a.name.as_str()).collect();
        assert_eq!(names, vec!["screenName", "category", "properties"]);

        let group = builder
            .analytics_method(
                &rule(EventType::Group, "", IdentitySection::Traits, ObjectSchema::empty_closed()),
                "GroupTraits",
            )
            .unwrap()
            .unwrap();
        assert_eq!(group.arguments.len(), 1);
        assert_eq!(group.sdk_call.arguments.len(), 1);
    }

    #[test]
    fn variant_on_closed_empty_base_keeps_payload() {
        let mut viewed = rule(EventType::Track, "Viewed", IdentitySection::Properties, ObjectSchema::empty_closed());
        let mut builder = KotlinBuilder::new();
        let plain = builder
            .analytics_method(&viewed, "TrackViewedProperties")
            .unwrap()
            .unwrap();
        assert!(plain.arguments.is_empty());

        viewed.event.name = "Viewed Variant".to_string();
        viewed.variants = vec![Variant {
            kind: VariantKind::Discriminator,
            discriminator: "kind".to_string(),
            cases: vec![VariantCase {
                display_name: None,
                description: None,
                match_values: vec![json!("a")],
                schema: ObjectSchema::empty_closed(),
            }],
            default_schema: None,
        }];
        let method = builder
            .analytics_method(&viewed, "TrackViewedVariantProperties")
            .unwrap()
            .unwrap();
        assert_eq!(method.arguments.len(), 1);
        assert_eq!(method.arguments[0].type_name, "TrackViewedVariantProperties");
        assert_eq!(
            method.sdk_call.arguments[1].value,
            SdkArgumentValue::Serialized("properties".to_string())
        );
    }

    #[test]
    fn context_traits_go_to_custom_context() {
        let mut builder = KotlinBuilder::new();
        let method = builder
            .analytics_method(
                &rule(EventType::Identify, "", IdentitySection::ContextTraits, open()),
                "IdentifyContextTraits",
            )
            .unwrap()
            .unwrap();
        assert_eq!(method.context_payload.as_deref(), Some("traits"));
        assert_eq!(method.sdk_call.arguments.len(), 1);
    }

    #[test]
    fn page_and_mismatched_sections_are_skipped() {
        let mut builder = KotlinBuilder::new();
        let page = builder
            .analytics_method(&rule(EventType::Page, "", IdentitySection::Properties, open()), "PageProperties")
            .unwrap();
        assert!(page.is_none());

        let mismatched = builder
            .analytics_method(&rule(EventType::Track, "X", IdentitySection::Traits, open()), "TrackXTraits")
            .unwrap();
        assert!(mismatched.is_none());
    }

    #[test]
    fn event_context_includes_url_only_when_set() {
        let mut metadata = PlanMetadata {
            tracking_plan_id: "plan_1".to_string(),
            tracking_plan_version: 3,
            url: None,
        };
        let entries = event_context(&metadata, "1.0.0");
        assert_eq!(entries.len(), 4);
        assert_eq!(entries[3], ("trackingPlanVersion".to_string(), "3".to_string()));

        metadata.url = Some("https://app.example.com/plans/plan_1".to_string());
        let entries = event_context(&metadata, "1.0.0");
        assert_eq!(entries[4].1, "\"https://app.example.com/plans/plan_1\"");
    }
}
