//! JSON Schema rules documents to tracking plan IR.
//!
//! Each event carries a rules document of the form
//! `{ "properties": { "<section>": <object schema> }, "$defs": { ... } }`.
//! The identity-section node becomes the rule's [`ObjectSchema`]; a nested
//! `allOf`/`if`/`then` block on the same node becomes its [`Variant`].

use serde_json::{Map as JsonMap, Value as JsonValue};

use crate::custom_types::CustomTypeResolver;
use crate::error::{ResultExt, TyperError};
use crate::plan::{
    Event, EventRule, EventType, IdentitySection, ObjectSchema, PrimitiveType, Property,
    PropertyConfig, PropertySchema, PropertyType, Variant, VariantCase, VariantKind,
};
use crate::provider::TrackingPlanEventSchema;

// ── Public API ─────────────────────────────────────────────────────────────

/// Result of interpreting a single schema node.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct TypeDefinition {
    /// Source order; empty when the node declares no `type`.
    pub types: Vec<PropertyType>,
    pub item_types: Vec<PropertyType>,
    pub config: Option<PropertyConfig>,
    pub schema: Option<ObjectSchema>,
}

/// Interprets one schema node: `$ref`, `enum`, `type`, nested object, array items.
pub fn parse_type_definition(
    node: &JsonValue,
    resolver: &mut CustomTypeResolver<'_>,
) -> Result<TypeDefinition, TyperError> {
    let obj = node.as_object().ok_or_else(|| {
        TyperError::SchemaError(format!(
            "type definition must be an object, got {}",
            json_kind(node)
        ))
    })?;

    if let Some(reference) = obj.get("$ref") {
        let reference = reference.as_str().ok_or_else(|| {
            TyperError::ReferenceError("'$ref' must be a string".to_string())
        })?;
        let custom_type = resolver.resolve_ref(reference)?;
        return Ok(TypeDefinition {
            types: vec![PropertyType::Custom(custom_type)],
            ..TypeDefinition::default()
        });
    }

    let mut definition = TypeDefinition {
        config: parse_enum_config(obj)?,
        ..TypeDefinition::default()
    };

    let primitives = parse_type_tokens(obj.get("type"))?;

    if primitives.contains(&PrimitiveType::Object) {
        definition.schema = Some(parse_object_schema(node, resolver, true)?);
    }

    if primitives.contains(&PrimitiveType::Array) {
        let items = obj.get("items").ok_or_else(|| {
            TyperError::SchemaError("array type requires 'items'".to_string())
        })?;
        definition.item_types = parse_item_types(items, resolver).with_context(|| "items")?;
    }

    definition.types = primitives.into_iter().map(PropertyType::Primitive).collect();
    Ok(definition)
}

/// Parses `properties`/`required`/`additionalProperties` of an object node.
///
/// `default_additional` applies when neither `additionalProperties` nor
/// `unevaluatedProperties` is present: `true` for ordinary schemas, `false`
/// for variant cases.
pub fn parse_object_schema(
    node: &JsonValue,
    resolver: &mut CustomTypeResolver<'_>,
    default_additional: bool,
) -> Result<ObjectSchema, TyperError> {
    let obj = node.as_object().ok_or_else(|| {
        TyperError::SchemaError(format!(
            "object schema must be an object, got {}",
            json_kind(node)
        ))
    })?;

    let required = parse_required(obj)?;

    let mut schema = ObjectSchema {
        properties: Default::default(),
        additional_properties: resolve_additional_properties(obj, default_additional)?,
    };

    let Some(properties) = obj.get("properties") else {
        return Ok(schema);
    };
    let properties = properties.as_object().ok_or_else(|| {
        TyperError::SchemaError("'properties' must be an object".to_string())
    })?;

    for (name, prop_node) in properties {
        let prop_schema = parse_property_schema(name, prop_node, required.contains(name), resolver)
            .with_context(|| format!("property '{name}'"))?;
        schema.properties.insert(name.clone(), prop_schema);
    }

    Ok(schema)
}

/// Parses one event from the catalog payload into an [`EventRule`].
pub fn parse_event_rule(event: &TrackingPlanEventSchema) -> Result<EventRule, TyperError> {
    parse_event_rule_inner(event).with_context(|| format!("event '{}'", event.name))
}

/// Reads the `allOf[allOf[{if, then}]]` discriminated-union encoding from `node`.
pub fn parse_variants(
    node: &JsonValue,
    resolver: &mut CustomTypeResolver<'_>,
) -> Result<Vec<Variant>, TyperError> {
    let Some(outer) = node.get("allOf") else {
        return Ok(Vec::new());
    };
    let outer = outer
        .as_array()
        .ok_or_else(|| TyperError::VariantError("'allOf' must be an array".to_string()))?;
    if outer.len() > 1 {
        return Err(TyperError::VariantError(format!(
            "only one variant is supported per type; found {}",
            outer.len()
        )));
    }
    let Some(entry) = outer.first() else {
        return Ok(Vec::new());
    };
    let Some(cases) = entry.get("allOf") else {
        return Ok(Vec::new());
    };
    let cases = cases.as_array().ok_or_else(|| {
        TyperError::VariantError("variant 'allOf' must be an array of cases".to_string())
    })?;

    Ok(vec![parse_variant_cases(cases, resolver)?])
}

// ── Event rules ────────────────────────────────────────────────────────────

fn parse_event_rule_inner(event: &TrackingPlanEventSchema) -> Result<EventRule, TyperError> {
    let event_type: EventType = event.event_type.parse()?;
    let section: IdentitySection = event.identity_section.parse()?;

    let rules = event.rules.as_object().ok_or_else(|| {
        TyperError::SchemaError(format!(
            "'rules' must be an object, got {}",
            json_kind(&event.rules)
        ))
    })?;

    let empty_defs = JsonMap::new();
    let defs = match rules.get("$defs") {
        None => &empty_defs,
        Some(JsonValue::Object(defs)) => defs,
        Some(other) => {
            return Err(TyperError::SchemaError(format!(
                "'$defs' must be an object, got {}",
                json_kind(other)
            )))
        }
    };

    let mut resolver = CustomTypeResolver::new(defs);
    resolver.resolve_all()?;

    let node = locate_identity_section(rules, section)?;
    ensure_object_node(node, section)?;

    let schema = parse_object_schema(node, &mut resolver, true)?;
    let variants = parse_variants(node, &mut resolver)?;

    Ok(EventRule {
        event: Event {
            event_type,
            name: event.name.clone(),
            description: event.description.clone(),
        },
        section,
        schema,
        variants,
    })
}

fn locate_identity_section<'a>(
    rules: &'a JsonMap<String, JsonValue>,
    section: IdentitySection,
) -> Result<&'a JsonValue, TyperError> {
    let path: &[&str] = match section {
        IdentitySection::Properties => &["properties", "properties"],
        IdentitySection::Traits => &["properties", "traits"],
        IdentitySection::ContextTraits => &["properties", "context", "properties", "traits"],
    };

    let mut current = rules;
    for (idx, segment) in path.iter().enumerate() {
        let walked = path[..=idx].join(".");
        let value = current.get(*segment).ok_or_else(|| {
            TyperError::IdentitySectionError(format!(
                "identity section '{section}' not found: missing '{segment}' at 'rules.{walked}'"
            ))
        })?;
        if idx + 1 == path.len() {
            return Ok(value);
        }
        current = value.as_object().ok_or_else(|| {
            TyperError::IdentitySectionError(format!(
                "identity section '{section}': 'rules.{walked}' must be an object"
            ))
        })?;
    }

    Err(TyperError::IdentitySectionError(format!(
        "identity section '{section}' has an empty lookup path"
    )))
}

fn ensure_object_node(node: &JsonValue, section: IdentitySection) -> Result<(), TyperError> {
    let obj = node.as_object().ok_or_else(|| {
        TyperError::IdentitySectionError(format!(
            "identity section '{section}' must be an object schema, got {}",
            json_kind(node)
        ))
    })?;
    if let Some(type_value) = obj.get("type") {
        let primitives = parse_type_tokens(Some(type_value))?;
        if !primitives.contains(&PrimitiveType::Object) {
            return Err(TyperError::IdentitySectionError(format!(
                "identity section '{section}' must be of type object"
            )));
        }
    }
    Ok(())
}

// ── Properties ─────────────────────────────────────────────────────────────

fn parse_property_schema(
    name: &str,
    node: &JsonValue,
    required: bool,
    resolver: &mut CustomTypeResolver<'_>,
) -> Result<PropertySchema, TyperError> {
    let definition = parse_type_definition(node, resolver)?;

    let types = if definition.types.is_empty() {
        vec![PropertyType::Primitive(PrimitiveType::Any)]
    } else {
        definition.types
    };

    Ok(PropertySchema {
        property: Property {
            name: name.to_string(),
            description: description_of(node),
            types,
            item_types: definition.item_types,
            config: definition.config,
        },
        required,
        schema: definition.schema,
    })
}

fn parse_item_types(
    items: &JsonValue,
    resolver: &mut CustomTypeResolver<'_>,
) -> Result<Vec<PropertyType>, TyperError> {
    let obj = items.as_object().ok_or_else(|| {
        TyperError::SchemaError(format!("'items' must be an object, got {}", json_kind(items)))
    })?;

    if let Some(reference) = obj.get("$ref") {
        let reference = reference.as_str().ok_or_else(|| {
            TyperError::ReferenceError("'$ref' must be a string".to_string())
        })?;
        return Ok(vec![PropertyType::Custom(resolver.resolve_ref(reference)?)]);
    }

    let Some(type_value) = obj.get("type") else {
        return Err(TyperError::SchemaError(
            "'items' must declare 'type' or '$ref'".to_string(),
        ));
    };

    let primitives = parse_type_tokens(Some(type_value))?;
    if primitives.is_empty() {
        return Ok(vec![PropertyType::Primitive(PrimitiveType::Any)]);
    }
    Ok(primitives.into_iter().map(PropertyType::Primitive).collect())
}

fn parse_type_tokens(value: Option<&JsonValue>) -> Result<Vec<PrimitiveType>, TyperError> {
    match value {
        None => Ok(Vec::new()),
        Some(JsonValue::String(token)) => Ok(vec![token.parse()?]),
        Some(JsonValue::Array(tokens)) => tokens
            .iter()
            .map(|token| match token {
                JsonValue::String(token) => token.parse(),
                other => Err(TyperError::SchemaError(format!(
                    "'type' entries must be strings, got {}",
                    json_kind(other)
                ))),
            })
            .collect(),
        Some(other) => Err(TyperError::SchemaError(format!(
            "'type' must be a string or an array of strings, got {}",
            json_kind(other)
        ))),
    }
}

fn parse_enum_config(obj: &JsonMap<String, JsonValue>) -> Result<Option<PropertyConfig>, TyperError> {
    match obj.get("enum") {
        None => Ok(None),
        Some(JsonValue::Array(values)) => Ok(Some(PropertyConfig {
            enum_values: Some(values.clone()),
        })),
        Some(other) => Err(TyperError::SchemaError(format!(
            "'enum' must be an array, got {}",
            json_kind(other)
        ))),
    }
}

fn parse_required(obj: &JsonMap<String, JsonValue>) -> Result<Vec<String>, TyperError> {
    let Some(required) = obj.get("required") else {
        return Ok(Vec::new());
    };
    let required = required.as_array().ok_or_else(|| {
        TyperError::SchemaError(format!(
            "'required' must be an array of strings, got {}",
            json_kind(required)
        ))
    })?;
    required
        .iter()
        .map(|entry| {
            entry.as_str().map(str::to_string).ok_or_else(|| {
                TyperError::SchemaError(format!(
                    "'required' entries must be strings, got {}",
                    json_kind(entry)
                ))
            })
        })
        .collect()
}

fn resolve_additional_properties(
    obj: &JsonMap<String, JsonValue>,
    default: bool,
) -> Result<bool, TyperError> {
    for key in ["additionalProperties", "unevaluatedProperties"] {
        match obj.get(key) {
            None => continue,
            Some(JsonValue::Bool(flag)) => return Ok(*flag),
            // A sub-schema still admits extra keys.
            Some(JsonValue::Object(_)) => return Ok(true),
            Some(other) => {
                return Err(TyperError::SchemaError(format!(
                    "'{key}' must be a boolean or a schema, got {}",
                    json_kind(other)
                )))
            }
        }
    }
    Ok(default)
}

// ── Variants ───────────────────────────────────────────────────────────────

fn parse_variant_cases(
    cases: &[JsonValue],
    resolver: &mut CustomTypeResolver<'_>,
) -> Result<Variant, TyperError> {
    let mut discriminator: Option<String> = None;
    let mut regular = Vec::new();
    let mut default_schema = None;

    for (idx, case) in cases.iter().enumerate() {
        let case_obj = case.as_object().ok_or_else(|| {
            TyperError::VariantError(format!("case {idx} must be an object"))
        })?;
        let condition = case_obj
            .get("if")
            .ok_or_else(|| TyperError::VariantError(format!("case {idx} is missing 'if'")))?;
        let then = case_obj
            .get("then")
            .ok_or_else(|| TyperError::VariantError(format!("case {idx} is missing 'then'")))?;

        let condition_props = condition
            .get("properties")
            .and_then(JsonValue::as_object)
            .ok_or_else(|| {
                TyperError::VariantError(format!("case {idx}: 'if' must declare 'properties'"))
            })?;
        let mut condition_iter = condition_props.iter();
        let Some((name, matcher)) = condition_iter.next() else {
            return Err(TyperError::VariantError(format!(
                "case {idx}: 'if.properties' must name the discriminator"
            )));
        };
        if condition_iter.next().is_some() {
            return Err(TyperError::VariantError(format!(
                "case {idx}: 'if.properties' must name exactly one discriminator"
            )));
        }

        match &discriminator {
            None => discriminator = Some(name.clone()),
            Some(existing) if existing != name => {
                return Err(TyperError::VariantError(format!(
                    "case {idx} uses discriminator '{name}' but earlier cases use '{existing}'"
                )))
            }
            Some(_) => {}
        }

        let schema = parse_object_schema(then, resolver, false)
            .with_context(|| format!("variant case {idx}"))?;

        if matcher.get("not").is_some() {
            if default_schema.is_some() {
                return Err(TyperError::VariantError(format!(
                    "case {idx}: more than one default ('not') case"
                )));
            }
            default_schema = Some(schema);
        } else if let Some(values) = matcher.get("enum") {
            let values = values.as_array().ok_or_else(|| {
                TyperError::VariantError(format!("case {idx}: 'enum' must be an array"))
            })?;
            if values.is_empty() {
                return Err(TyperError::VariantError(format!(
                    "case {idx}: 'enum' must list at least one value"
                )));
            }
            regular.push(VariantCase {
                display_name: string_field(case_obj, "title"),
                description: string_field(case_obj, "description")
                    .or_else(|| then.as_object().and_then(|t| string_field(t, "description"))),
                match_values: values.clone(),
                schema,
            });
        } else {
            return Err(TyperError::VariantError(format!(
                "case {idx}: discriminator '{name}' condition must use 'enum' or 'not'"
            )));
        }
    }

    let Some(discriminator) = discriminator else {
        return Err(TyperError::VariantError("variant declares no cases".to_string()));
    };
    if regular.is_empty() {
        return Err(TyperError::VariantError(format!(
            "variant on '{discriminator}' has no 'enum' cases"
        )));
    }

    Ok(Variant {
        kind: VariantKind::Discriminator,
        discriminator,
        cases: regular,
        default_schema,
    })
}

// ── Helpers ────────────────────────────────────────────────────────────────

fn description_of(node: &JsonValue) -> String {
    node.get("description")
        .and_then(JsonValue::as_str)
        .unwrap_or_default()
        .to_string()
}

fn string_field(obj: &JsonMap<String, JsonValue>, key: &str) -> Option<String> {
    obj.get(key).and_then(JsonValue::as_str).map(str::to_string)
}

fn json_kind(value: &JsonValue) -> &'static str {
    match value {
        JsonValue::Null => "null",
        JsonValue::Bool(_) => "boolean",
        JsonValue::Number(_) => "number",
        JsonValue::String(_) => "string",
        JsonValue::Array(_) => "array",
        JsonValue::Object(_) => "object",
    }
}
