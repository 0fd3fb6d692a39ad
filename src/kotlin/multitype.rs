//! Sealed classes for properties and array items holding one of several types.

use crate::error::TyperError;
use crate::materialize::{materialize_union, JsonRepresentation, UnionMember};
use crate::plan::PropertyType;

use super::context::{JsonElementSource, KotlinProperty, KotlinSealedClass, KotlinSealedSubclass};
use super::types::{kotlin_primitive, KotlinBuilder};

impl KotlinBuilder {
    /// Adds a sealed class with one `<Type>Value` subclass per union member.
    pub(super) fn push_union(
        &mut self,
        name: String,
        comment: String,
        types: &[PropertyType],
    ) -> Result<(), TyperError> {
        let members = materialize_union(types)?;
        let sealed = KotlinSealedClass {
            name,
            comment,
            properties: Vec::new(),
            subclasses: members.iter().map(union_subclass).collect(),
        };
        self.ctx.sealed_classes.push(sealed);
        Ok(())
    }
}

fn union_subclass(member: &UnionMember) -> KotlinSealedSubclass {
    let expression = match member.representation {
        JsonRepresentation::Primitive => "JsonPrimitive(value)",
        JsonRepresentation::PassThrough => "value",
        JsonRepresentation::ArrayWrap => "JsonArray(value)",
    };
    KotlinSealedSubclass {
        name: member.name.to_string(),
        comment: format!("Represents a '{}' value", member.primitive),
        properties: vec![KotlinProperty {
            name: "value".to_string(),
            serial_name: "value".to_string(),
            type_name: kotlin_primitive(member.primitive).to_string(),
            ..KotlinProperty::default()
        }],
        body_properties: Vec::new(),
        json_element: JsonElementSource::Expression(expression.to_string()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::plan::PrimitiveType;

    #[test]
    fn one_subclass_per_member() {
        let mut builder = KotlinBuilder::new();
        builder
            .push_union(
                "PropertyFlag".to_string(),
                "Flag".to_string(),
                &[
                    PropertyType::Primitive(PrimitiveType::Boolean),
                    PropertyType::Primitive(PrimitiveType::String),
                    PropertyType::Primitive(PrimitiveType::Array),
                ],
            )
            .unwrap();

        let sealed = &builder.ctx.sealed_classes[0];
        assert!(sealed.properties.is_empty());
        let names: Vec<_> = sealed.subclasses.iter().map(|s| s.name.as_str()).collect();
        assert_eq!(names, vec!["BooleanValue", "StringValue", "ArrayValue"]);
        assert_eq!(sealed.subclasses[0].properties[0].type_name, "Boolean");
        assert_eq!(sealed.subclasses[0].comment, "Represents a 'boolean' value");
        assert_eq!(
            sealed.subclasses[2].json_element,
            JsonElementSource::Expression("JsonArray(value)".to_string())
        );
    }

    #[test]
    fn any_in_union_is_an_emission_error() {
        let mut builder = KotlinBuilder::new();
        let err = builder
            .push_union(
                "PropertyX".to_string(),
                String::new(),
                &[
                    PropertyType::Primitive(PrimitiveType::String),
                    PropertyType::Primitive(PrimitiveType::Any),
                ],
            )
            .unwrap_err();
        assert!(err.to_string().contains("'any' is not supported"), "got: {err}");
    }
}
