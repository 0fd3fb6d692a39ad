//! Sealed classes for discriminated variants.

use serde_json::Value as JsonValue;

use crate::error::{ResultExt, TyperError};
use crate::materialize::{materialize_variant, member_for_literal, materialize_union, MergedProperty};
use crate::plan::{ObjectSchema, PrimitiveType, Property, PropertyType, Variant};

use super::context::{JsonElementSource, KotlinProperty, KotlinSealedClass, KotlinSealedSubclass};
use super::escape::format_literal;
use super::naming::{format_case_name, format_property_name, literal_text};
use super::types::{string_enum, KotlinBuilder};

impl KotlinBuilder {
    /// Sealed class `name` with one subclass per match value plus `Default`.
    ///
    /// The discriminator is an abstract member on the parent. Case subclasses
    /// fix it in their body; the default subclass takes it as a parameter.
    pub(super) fn variant_sealed_class(
        &mut self,
        name: String,
        comment: &str,
        base: &ObjectSchema,
        variants: &[Variant],
    ) -> Result<KotlinSealedClass, TyperError> {
        let materialized =
            materialize_variant(&name, base, variants, &mut self.registry, &format_case_name)?;
        let discriminator = &materialized.discriminator;

        let field_name = self.registry.register_name(
            &discriminator.name,
            &format!("field:{name}"),
            &format_property_name(&discriminator.name),
        )?;
        let discriminator_type = self.field_type(&discriminator.property)?;
        let abstract_member = KotlinProperty {
            name: field_name.clone(),
            serial_name: discriminator.name.clone(),
            type_name: discriminator_type.clone(),
            comment: discriminator.property.description.clone(),
            is_abstract: true,
            ..KotlinProperty::default()
        };

        let mut subclasses = Vec::with_capacity(materialized.subclasses.len());
        for subclass in &materialized.subclasses {
            let field_scope = format!("field:{name}.{}", subclass.name);
            // Reserve the inherited member name before the subclass's own fields.
            self.registry
                .register_name(&discriminator.name, &field_scope, &field_name)?;

            let mut properties = Vec::with_capacity(subclass.constructor.len());
            for member in &subclass.constructor {
                let mut property = self.member_property(member, &field_scope)?;
                if member.name == discriminator.name {
                    property.is_override = true;
                }
                properties.push(property);
            }

            let body_properties = match &subclass.discriminator_value {
                Some(value) => {
                    let literal = self
                        .discriminator_literal(&discriminator.property, &discriminator_type, value)
                        .with_context(|| format!("variant case '{}'", literal_text(value)))?;
                    vec![KotlinProperty {
                        default: Some(literal),
                        is_override: true,
                        is_abstract: false,
                        ..abstract_member.clone()
                    }]
                }
                None => Vec::new(),
            };

            subclasses.push(KotlinSealedSubclass {
                name: subclass.name.clone(),
                comment: subclass.description.clone().unwrap_or_default(),
                properties,
                body_properties,
                json_element: JsonElementSource::Members,
            });
        }

        Ok(KotlinSealedClass {
            name,
            comment: comment.to_string(),
            properties: vec![abstract_member],
            subclasses,
        })
    }

    fn member_property(
        &mut self,
        member: &MergedProperty,
        field_scope: &str,
    ) -> Result<KotlinProperty, TyperError> {
        let name = self.registry.register_name(
            &member.name,
            field_scope,
            &format_property_name(&member.name),
        )?;
        Ok(KotlinProperty {
            name,
            serial_name: member.name.clone(),
            type_name: self.field_type(&member.property)?,
            comment: member.property.description.clone(),
            nullable: !member.required,
            default: (!member.required).then(|| "null".to_string()),
            ..KotlinProperty::default()
        })
    }

    /// Kotlin expression fixing the discriminator of a case subclass.
    pub(super) fn discriminator_literal(
        &mut self,
        property: &Property,
        type_name: &str,
        value: &JsonValue,
    ) -> Result<String, TyperError> {
        if value.is_null() {
            return Err(TyperError::EmissionError(
                "null cannot be used as a discriminator value".to_string(),
            ));
        }

        if let Some(values) = string_enum(property.config.as_ref()) {
            return self.enum_member_literal(type_name, values, value);
        }

        match property.types.as_slice() {
            [PropertyType::Custom(custom_type)] => {
                if let Some(values) = string_enum(custom_type.config.as_ref()) {
                    let enum_name = self.custom_type_name(custom_type)?;
                    return self.enum_member_literal(&enum_name, values, value);
                }
                Ok(scalar_literal(Some(custom_type.base_type), value))
            }
            [PropertyType::Primitive(primitive)] => Ok(scalar_literal(Some(*primitive), value)),
            [] => Ok(scalar_literal(None, value)),
            many => {
                let members = materialize_union(many)?;
                let Some(member) = member_for_literal(&members, value) else {
                    return Err(TyperError::EmissionError(format!(
                        "discriminator value {value} does not match any type of property '{}'",
                        property.name
                    )));
                };
                Ok(format!(
                    "{type_name}.{}({})",
                    member.name,
                    scalar_literal(Some(member.primitive), value)
                ))
            }
        }
    }

    fn enum_member_literal(
        &mut self,
        enum_name: &str,
        values: &[JsonValue],
        value: &JsonValue,
    ) -> Result<String, TyperError> {
        if !values.contains(value) {
            return Err(TyperError::EmissionError(format!(
                "discriminator value {value} is not a member of enum {enum_name}"
            )));
        }
        let constant = self.enum_constant(enum_name, value)?;
        Ok(format!("{enum_name}.{constant}"))
    }
}

/// `Double` needs a decimal point even when the JSON value is integral.
fn scalar_literal(primitive: Option<PrimitiveType>, value: &JsonValue) -> String {
    let literal = format_literal(value);
    match (primitive, value) {
        (Some(PrimitiveType::Number), JsonValue::Number(number)) if !number.is_f64() => {
            format!("{literal}.0")
        }
        _ => literal,
    }
}
