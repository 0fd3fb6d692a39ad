//! Target-neutral expansion of variants and multi-type unions into subclasses.
//!
//! Generators render the result; this module decides which subclasses exist,
//! which members each one has, and where the discriminator lives.

use std::collections::BTreeMap;

use serde_json::Value as JsonValue;

use crate::error::TyperError;
use crate::naming::NameRegistry;
use crate::plan::{ObjectSchema, PrimitiveType, Property, PropertyType, Variant};

// ── Variants ───────────────────────────────────────────────────────────────

/// A property after merging a base schema with one case schema.
#[derive(Debug, Clone, PartialEq)]
pub struct MergedProperty {
    pub name: String,
    pub property: Property,
    pub required: bool,
}

#[derive(Debug, Clone, PartialEq)]
pub struct VariantSubclass {
    pub name: String,
    pub description: Option<String>,
    /// Constructor members in name order. Only the default subclass lists the
    /// discriminator here.
    pub constructor: Vec<MergedProperty>,
    /// Literal the discriminator is fixed to; `None` for the default subclass.
    pub discriminator_value: Option<JsonValue>,
}

impl VariantSubclass {
    pub fn is_default(&self) -> bool {
        self.discriminator_value.is_none()
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct MaterializedVariant {
    /// Abstract member on the parent type; always required.
    pub discriminator: MergedProperty,
    /// One subclass per match value, then exactly one default subclass.
    pub subclasses: Vec<VariantSubclass>,
}

pub const DEFAULT_SUBCLASS_NAME: &str = "Default";

/// Expands the single variant of a type into its subclasses.
///
/// `case_name` proposes a subclass name for a match value; proposals are
/// registered in scope `subclass:<parent_id>` so distinct values that format
/// to the same identifier still get distinct names.
pub fn materialize_variant(
    parent_id: &str,
    base_schema: &ObjectSchema,
    variants: &[Variant],
    registry: &mut NameRegistry,
    case_name: &dyn Fn(&JsonValue) -> String,
) -> Result<MaterializedVariant, TyperError> {
    let variant = match variants {
        [] => {
            return Err(TyperError::VariantError(
                "no variant to materialize".to_string(),
            ))
        }
        [variant] => variant,
        more => {
            return Err(TyperError::VariantError(format!(
                "multiple variants per type are not supported; found {}",
                more.len()
            )))
        }
    };

    let discriminator = find_discriminator(base_schema, variant)?;
    let scope = format!("subclass:{parent_id}");
    let mut subclasses = Vec::new();

    for (case_idx, case) in variant.cases.iter().enumerate() {
        for (value_idx, value) in case.match_values.iter().enumerate() {
            let name = registry.register_name(
                &format!("case:{case_idx}:{value_idx}"),
                &scope,
                &case_name(value),
            )?;
            subclasses.push(VariantSubclass {
                name,
                description: case.description.clone().or_else(|| case.display_name.clone()),
                constructor: merge_properties(base_schema, &case.schema, Some(&variant.discriminator)),
                discriminator_value: Some(value.clone()),
            });
        }
    }

    let empty = ObjectSchema::empty_closed();
    let default_schema = variant.default_schema.as_ref().unwrap_or(&empty);
    let name = registry.register_name("default", &scope, DEFAULT_SUBCLASS_NAME)?;
    let mut constructor = merge_properties(base_schema, default_schema, None);
    let slot = constructor
        .iter()
        .position(|member| member.name >= variant.discriminator);
    match slot {
        Some(idx) if constructor[idx].name == variant.discriminator => {
            constructor[idx].required = true;
        }
        // Declared only in case schemas; the default still takes it as a parameter.
        Some(idx) => constructor.insert(idx, discriminator.clone()),
        None => constructor.push(discriminator.clone()),
    }
    subclasses.push(VariantSubclass {
        name,
        description: Some("Default case".to_string()),
        constructor,
        discriminator_value: None,
    });

    Ok(MaterializedVariant {
        discriminator,
        subclasses,
    })
}

/// Merges base and case properties; `required = base || case`.
///
/// When `hoisted` names the discriminator it is left out of the result.
pub fn merge_properties(
    base: &ObjectSchema,
    case: &ObjectSchema,
    hoisted: Option<&str>,
) -> Vec<MergedProperty> {
    let mut merged: BTreeMap<&str, MergedProperty> = BTreeMap::new();
    for schema in [base, case] {
        for (name, prop_schema) in &schema.properties {
            merged
                .entry(name.as_str())
                .and_modify(|existing| existing.required |= prop_schema.required)
                .or_insert_with(|| MergedProperty {
                    name: name.clone(),
                    property: prop_schema.property.clone(),
                    required: prop_schema.required,
                });
        }
    }
    merged
        .into_values()
        .filter(|member| Some(member.name.as_str()) != hoisted)
        .collect()
}

fn find_discriminator(
    base: &ObjectSchema,
    variant: &Variant,
) -> Result<MergedProperty, TyperError> {
    let declared = std::iter::once(base)
        .chain(variant.cases.iter().map(|case| &case.schema))
        .chain(variant.default_schema.iter())
        .find_map(|schema| schema.properties.get(&variant.discriminator));

    let Some(prop_schema) = declared else {
        return Err(TyperError::VariantError(format!(
            "discriminator '{}' is not declared as a property",
            variant.discriminator
        )));
    };

    Ok(MergedProperty {
        name: variant.discriminator.clone(),
        property: prop_schema.property.clone(),
        required: true,
    })
}

// ── Multi-type unions ──────────────────────────────────────────────────────

/// How a union member's value becomes a JSON element.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum JsonRepresentation {
    /// Scalar wrapped as a JSON primitive.
    Primitive,
    /// Already a JSON object.
    PassThrough,
    /// List wrapped in a JSON array.
    ArrayWrap,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct UnionMember {
    pub primitive: PrimitiveType,
    pub name: &'static str,
    pub representation: JsonRepresentation,
}

/// One member per primitive in `types`, in source order.
pub fn materialize_union(types: &[PropertyType]) -> Result<Vec<UnionMember>, TyperError> {
    let mut members: Vec<UnionMember> = Vec::with_capacity(types.len());
    for property_type in types {
        let primitive = match property_type {
            PropertyType::Primitive(primitive) => *primitive,
            PropertyType::Custom(custom) => {
                return Err(TyperError::EmissionError(format!(
                    "custom type '{}' is not supported inside a multi-type union",
                    custom.name
                )))
            }
        };
        let member = union_member(primitive)?;
        if !members.contains(&member) {
            members.push(member);
        }
    }
    Ok(members)
}

fn union_member(primitive: PrimitiveType) -> Result<UnionMember, TyperError> {
    let (name, representation) = match primitive {
        PrimitiveType::String => ("StringValue", JsonRepresentation::Primitive),
        PrimitiveType::Integer => ("IntegerValue", JsonRepresentation::Primitive),
        PrimitiveType::Number => ("NumberValue", JsonRepresentation::Primitive),
        PrimitiveType::Boolean => ("BooleanValue", JsonRepresentation::Primitive),
        PrimitiveType::Object => ("ObjectValue", JsonRepresentation::PassThrough),
        PrimitiveType::Array => ("ArrayValue", JsonRepresentation::ArrayWrap),
        PrimitiveType::Any => {
            return Err(TyperError::EmissionError(
                "'any' is not supported inside a multi-type union".to_string(),
            ))
        }
    };
    Ok(UnionMember {
        primitive,
        name,
        representation,
    })
}

/// Picks the union member able to hold `value`; integers prefer `IntegerValue`.
pub fn member_for_literal<'m>(members: &'m [UnionMember], value: &JsonValue) -> Option<&'m UnionMember> {
    let find = |primitive| members.iter().find(|member| member.primitive == primitive);
    match value {
        JsonValue::String(_) => find(PrimitiveType::String),
        JsonValue::Bool(_) => find(PrimitiveType::Boolean),
        JsonValue::Number(number) if number.is_f64() => find(PrimitiveType::Number),
        JsonValue::Number(_) => find(PrimitiveType::Integer).or_else(|| find(PrimitiveType::Number)),
        JsonValue::Array(_) => find(PrimitiveType::Array),
        JsonValue::Object(_) => find(PrimitiveType::Object),
        JsonValue::Null => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::plan::{PropertySchema, VariantCase, VariantKind};
    use serde_json::json;
    use std::sync::Arc;

    fn prop(name: &str, required: bool) -> (String, PropertySchema) {
        (
            name.to_string(),
            PropertySchema {
                property: Property {
                    name: name.to_string(),
                    description: String::new(),
                    types: vec![PropertyType::Primitive(PrimitiveType::String)],
                    item_types: Vec::new(),
                    config: None,
                },
                required,
                schema: None,
            },
        )
    }

    fn schema(props: Vec<(String, PropertySchema)>, additional: bool) -> ObjectSchema {
        ObjectSchema {
            properties: props.into_iter().collect(),
            additional_properties: additional,
        }
    }

    fn case(values: Vec<JsonValue>, props: Vec<(String, PropertySchema)>) -> VariantCase {
        VariantCase {
            display_name: None,
            description: None,
            match_values: values,
            schema: schema(props, false),
        }
    }

    fn variant(cases: Vec<VariantCase>, default_schema: Option<ObjectSchema>) -> Variant {
        Variant {
            kind: VariantKind::Discriminator,
            discriminator: "kind".to_string(),
            cases,
            default_schema,
        }
    }

    fn name_case(value: &JsonValue) -> String {
        format!("Case{}", value.as_str().unwrap_or("X").to_uppercase())
    }

    #[test]
    fn one_subclass_per_match_value_plus_default() {
        let base = schema(vec![prop("kind", true), prop("id", false)], true);
        let variants = vec![variant(
            vec![
                case(vec![json!("a"), json!("b")], vec![prop("x", true)]),
                case(vec![json!("c")], vec![]),
            ],
            None,
        )];
        let mut registry = NameRegistry::default();
        let result = materialize_variant("T", &base, &variants, &mut registry, &name_case).unwrap();

        let names: Vec<_> = result.subclasses.iter().map(|s| s.name.as_str()).collect();
        assert_eq!(names, vec!["CaseA", "CaseB", "CaseC", "Default"]);
        assert_eq!(result.subclasses.iter().filter(|s| s.is_default()).count(), 1);
        assert_eq!(result.discriminator.name, "kind");
        assert!(result.discriminator.required);

        let case_a = &result.subclasses[0];
        let members: Vec<_> = case_a.constructor.iter().map(|m| m.name.as_str()).collect();
        assert_eq!(members, vec!["id", "x"]);
        assert_eq!(case_a.discriminator_value, Some(json!("a")));

        let default = &result.subclasses[3];
        let members: Vec<_> = default.constructor.iter().map(|m| m.name.as_str()).collect();
        assert_eq!(members, vec!["id", "kind"]);
        assert!(default.constructor[1].required);
    }

    #[test]
    fn default_takes_discriminator_declared_only_in_cases() {
        let base = schema(vec![prop("id", false), prop("zone", false)], true);
        let variants = vec![variant(
            vec![case(vec![json!("a")], vec![prop("kind", true), prop("x", true)])],
            None,
        )];
        let mut registry = NameRegistry::default();
        let result = materialize_variant("T", &base, &variants, &mut registry, &name_case).unwrap();

        let case_a = &result.subclasses[0];
        let members: Vec<_> = case_a.constructor.iter().map(|m| m.name.as_str()).collect();
        assert_eq!(members, vec!["id", "x", "zone"]);

        let default = &result.subclasses[1];
        assert!(default.is_default());
        let members: Vec<_> = default.constructor.iter().map(|m| m.name.as_str()).collect();
        assert_eq!(members, vec!["id", "kind", "zone"]);
        assert!(default.constructor[1].required);
    }

    #[test]
    fn case_requirement_overrides_optional_base() {
        let base = schema(vec![prop("kind", true), prop("email", false)], true);
        let variants = vec![variant(vec![case(vec![json!("a")], vec![prop("email", true)])], None)];
        let mut registry = NameRegistry::default();
        let result = materialize_variant("T", &base, &variants, &mut registry, &name_case).unwrap();
        assert!(result.subclasses[0].constructor[0].required);
        assert!(!result.subclasses[1].constructor[0].required);
    }

    #[test]
    fn colliding_case_names_are_suffixed() {
        let base = schema(vec![prop("kind", true)], true);
        let variants = vec![variant(vec![case(vec![json!("a"), json!("A")], vec![])], None)];
        let mut registry = NameRegistry::default();
        let result = materialize_variant("T", &base, &variants, &mut registry, &name_case).unwrap();
        assert_eq!(result.subclasses[0].name, "CaseA");
        assert_eq!(result.subclasses[1].name, "CaseA1");
    }

    #[test]
    fn rejects_multiple_variants_and_undeclared_discriminator() {
        let base = schema(vec![prop("kind", true)], true);
        let one = variant(vec![case(vec![json!("a")], vec![])], None);
        let mut registry = NameRegistry::default();
        let err = materialize_variant("T", &base, &[one.clone(), one.clone()], &mut registry, &name_case)
            .unwrap_err();
        assert!(err.to_string().contains("found 2"), "got: {err}");

        let bare = schema(vec![], true);
        let err = materialize_variant("U", &bare, &[one], &mut registry, &name_case).unwrap_err();
        assert!(err.to_string().contains("'kind' is not declared"), "got: {err}");
    }

    #[test]
    fn union_members_follow_source_order() {
        let members = materialize_union(&[
            PropertyType::Primitive(PrimitiveType::Boolean),
            PropertyType::Primitive(PrimitiveType::String),
            PropertyType::Primitive(PrimitiveType::Array),
            PropertyType::Primitive(PrimitiveType::Object),
        ])
        .unwrap();
        let names: Vec<_> = members.iter().map(|m| m.name).collect();
        assert_eq!(names, vec!["BooleanValue", "StringValue", "ArrayValue", "ObjectValue"]);
        assert_eq!(members[2].representation, JsonRepresentation::ArrayWrap);
        assert_eq!(members[3].representation, JsonRepresentation::PassThrough);
    }

    #[test]
    fn union_rejects_custom_types() {
        let custom = Arc::new(crate::plan::CustomType {
            name: "Email".to_string(),
            description: String::new(),
            base_type: PrimitiveType::String,
            schema: None,
            item_types: Vec::new(),
            config: None,
            variants: Vec::new(),
        });
        let err = materialize_union(&[
            PropertyType::Primitive(PrimitiveType::String),
            PropertyType::Custom(custom),
        ])
        .unwrap_err();
        assert!(matches!(err, TyperError::EmissionError(_)));
    }

    #[test]
    fn literal_selects_matching_member() {
        let members = materialize_union(&[
            PropertyType::Primitive(PrimitiveType::Number),
            PropertyType::Primitive(PrimitiveType::Integer),
            PropertyType::Primitive(PrimitiveType::Boolean),
        ])
        .unwrap();
        assert_eq!(member_for_literal(&members, &json!(3)).unwrap().name, "IntegerValue");
        assert_eq!(member_for_literal(&members, &json!(1.5)).unwrap().name, "NumberValue");
        assert_eq!(member_for_literal(&members, &json!(true)).unwrap().name, "BooleanValue");
        assert!(member_for_literal(&members, &json!("x")).is_none());
    }
}
